use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Unit of measure reference data (e.g. "pcs", "pack", "kg").
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_unit::Entity")]
    ProductUnit,
}

impl Related<super::product_unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductUnit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
