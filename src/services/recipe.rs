use crate::{
    db::DbPool,
    entities::{menu, menu_item, product, MenuItem, Product},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

/// Cashier-supplied ingredient line for a flexible menu.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IngredientLineInput {
    pub product_id: i64,
    pub quantity: i32,
}

/// Effective ingredient line for a single sale of a menu, in base units.
/// The quantity is per one menu unit; scaling by the ordered quantity is
/// the checkout engine's job.
#[derive(Debug, Clone)]
pub struct ResolvedIngredient {
    pub product_id: i64,
    pub product_name: String,
    pub unit_id: Option<i64>,
    pub quantity: i32,
}

/// Resolves a menu's effective composition for one sale.
#[derive(Clone)]
pub struct RecipeService {
    db: Arc<DbPool>,
}

impl RecipeService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Produces the effective ingredient list for one sale of `menu`.
    ///
    /// Fixed menus use their recipe lines and ignore anything the cashier
    /// sent. Flexible menus use the supplied lines, which must be non-empty
    /// (after dropping zero quantities) and sum to the menu's
    /// `default_quantity`.
    #[instrument(skip(self, menu, supplied), fields(menu_id = menu.id))]
    pub async fn resolve(
        &self,
        menu: &menu::Model,
        supplied: &[IngredientLineInput],
    ) -> Result<Vec<ResolvedIngredient>, ServiceError> {
        if !menu.is_flexible {
            return self.resolve_fixed(menu).await;
        }

        let lines = validate_flexible_lines(menu.default_quantity, supplied)?;
        self.hydrate_products(lines).await
    }

    async fn resolve_fixed(&self, menu: &menu::Model) -> Result<Vec<ResolvedIngredient>, ServiceError> {
        let recipe = MenuItem::find()
            .filter(menu_item::Column::MenuId.eq(menu.id))
            .order_by_asc(menu_item::Column::Id)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        if recipe.is_empty() {
            return Err(ServiceError::InvalidComposition(format!(
                "Menu '{}' has no recipe lines",
                menu.name
            )));
        }

        recipe
            .into_iter()
            .map(|(item, prod)| {
                let prod = prod.ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Product {} referenced by menu '{}' not found",
                        item.product_id, menu.name
                    ))
                })?;
                Ok(ResolvedIngredient {
                    product_id: prod.id,
                    product_name: prod.name,
                    unit_id: prod.base_unit_id,
                    quantity: item.quantity,
                })
            })
            .collect()
    }

    async fn hydrate_products(
        &self,
        lines: Vec<(i64, i32)>,
    ) -> Result<Vec<ResolvedIngredient>, ServiceError> {
        let ids: Vec<i64> = lines.iter().map(|(id, _)| *id).collect();
        let products: HashMap<i64, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        lines
            .into_iter()
            .map(|(product_id, quantity)| {
                let prod = products.get(&product_id).ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", product_id))
                })?;
                Ok(ResolvedIngredient {
                    product_id,
                    product_name: prod.name.clone(),
                    unit_id: prod.base_unit_id,
                    quantity,
                })
            })
            .collect()
    }
}

/// Validates a flexible-menu composition: drops zero-quantity lines, then
/// requires a non-empty set whose quantities sum to `default_quantity`.
fn validate_flexible_lines(
    default_quantity: i32,
    supplied: &[IngredientLineInput],
) -> Result<Vec<(i64, i32)>, ServiceError> {
    let lines: Vec<(i64, i32)> = supplied
        .iter()
        .filter(|l| l.quantity > 0)
        .map(|l| (l.product_id, l.quantity))
        .collect();

    if lines.is_empty() {
        return Err(ServiceError::InvalidComposition(
            "A flexible menu requires at least one ingredient line".to_string(),
        ));
    }

    let supplied_total: i32 = lines.iter().map(|(_, q)| q).sum();
    if supplied_total != default_quantity {
        return Err(ServiceError::InvalidComposition(format!(
            "Composition total {} does not match the required quantity {}",
            supplied_total, default_quantity
        )));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn line(product_id: i64, quantity: i32) -> IngredientLineInput {
        IngredientLineInput {
            product_id,
            quantity,
        }
    }

    #[rstest]
    #[case(3, vec![(1, 2), (2, 1)])]
    #[case(3, vec![(1, 3)])]
    #[case(5, vec![(1, 1), (2, 1), (3, 3)])]
    fn accepts_compositions_matching_the_required_total(
        #[case] default_quantity: i32,
        #[case] lines: Vec<(i64, i32)>,
    ) {
        let supplied: Vec<_> = lines.iter().map(|(p, q)| line(*p, *q)).collect();
        let resolved = validate_flexible_lines(default_quantity, &supplied).unwrap();
        assert_eq!(resolved, lines);
    }

    #[rstest]
    #[case(3, vec![(1, 1), (2, 1)])] // sums to 2
    #[case(3, vec![(1, 2), (2, 2)])] // sums to 4
    fn rejects_compositions_off_the_required_total(
        #[case] default_quantity: i32,
        #[case] lines: Vec<(i64, i32)>,
    ) {
        let supplied: Vec<_> = lines.iter().map(|(p, q)| line(*p, *q)).collect();
        assert_matches!(
            validate_flexible_lines(default_quantity, &supplied),
            Err(ServiceError::InvalidComposition(_))
        );
    }

    #[test]
    fn zero_quantity_lines_are_dropped_silently() {
        let supplied = vec![line(1, 2), line(2, 0), line(3, 1)];
        let resolved = validate_flexible_lines(3, &supplied).unwrap();
        assert_eq!(resolved, vec![(1, 2), (3, 1)]);
    }

    #[test]
    fn empty_composition_is_rejected() {
        assert_matches!(
            validate_flexible_lines(3, &[]),
            Err(ServiceError::InvalidComposition(_))
        );
        // all-zero lines collapse to empty
        assert_matches!(
            validate_flexible_lines(3, &[line(1, 0)]),
            Err(ServiceError::InvalidComposition(_))
        );
    }
}
