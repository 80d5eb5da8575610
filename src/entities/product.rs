use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw material / ingredient. Stock is tracked per branch in base units of
/// `base_unit_id`; alternate units convert through `product_units`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub category: Option<String>,
    pub base_unit_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::BaseUnitId",
        to = "super::unit::Column::Id"
    )]
    BaseUnit,
    #[sea_orm(has_many = "super::product_unit::Entity")]
    ProductUnit,
    #[sea_orm(has_many = "super::menu_item::Entity")]
    MenuItem,
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventory,
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BaseUnit.def()
    }
}

impl Related<super::product_unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductUnit.def()
    }
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
