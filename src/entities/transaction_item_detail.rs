use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient usage snapshot for one sale line: what was actually deducted
/// from inventory, in base units, with the product name frozen at sale time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_item_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub transaction_item_id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub unit_id: Option<i64>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction_item::Entity",
        from = "Column::TransactionItemId",
        to = "super::transaction_item::Column::Id"
    )]
    TransactionItem,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionItem.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
