use crate::{
    db::DbPool,
    entities::{product, product_unit, ProductUnit},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Converts quantities expressed in an alternate unit into a product's base
/// unit, through the product's `product_units` conversion rows.
#[derive(Clone)]
pub struct UnitConversionService {
    db: Arc<DbPool>,
}

impl UnitConversionService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Converts `quantity` of `unit_id` into base units of `product`.
    ///
    /// A missing `unit_id`, or one equal to the product's base unit, passes
    /// the quantity through unchanged. An unmapped non-base unit fails with
    /// `ConversionNotFound`.
    #[instrument(skip(self, product), fields(product_id = product.id))]
    pub async fn to_base_units(
        &self,
        product: &product::Model,
        unit_id: Option<i64>,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        let unit_id = match unit_id {
            None => return Ok(quantity),
            Some(id) if Some(id) == product.base_unit_id => return Ok(quantity),
            Some(id) => id,
        };

        let conversion = ProductUnit::find()
            .filter(product_unit::Column::ProductId.eq(product.id))
            .filter(product_unit::Column::UnitId.eq(unit_id))
            .one(&*self.db)
            .await?;

        match conversion {
            Some(conv) => Ok(quantity * conv.conversion_value),
            None => Err(ServiceError::ConversionNotFound {
                product_id: product.id,
                unit_id,
            }),
        }
    }

    /// Legacy-compatible variant used by manual stock adjustment: an
    /// unmapped unit falls back to the raw quantity instead of failing.
    /// Known risk — a typo'd unit silently produces a wrong stock delta.
    pub async fn to_base_units_or_raw(
        &self,
        product: &product::Model,
        unit_id: Option<i64>,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        match self.to_base_units(product, unit_id, quantity).await {
            Ok(converted) => Ok(converted),
            Err(ServiceError::ConversionNotFound {
                product_id,
                unit_id,
            }) => {
                warn!(
                    product_id,
                    unit_id, quantity, "No unit conversion found, using raw quantity"
                );
                Ok(quantity)
            }
            Err(e) => Err(e),
        }
    }
}
