//! Shipping-method eligibility for carts.
//!
//! A cart resolves to the subset of its shop's active shipping methods that
//! every product in the cart can ship with. A product with restriction rows
//! permits only the listed methods; a product without rows permits all of
//! them. A cart whose products span more than one shop has no single shop
//! that could ship it, so it resolves to no methods at all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use portobello_core::{ProductId, ShippingMethodId, ShopId};

use crate::db::{ProductRepository, ShippingRepository};
use crate::error::AppError;
use crate::models::{Product, ShippingMethod};
use crate::state::AppState;

/// The shop shared by every product, or `None` if the products span shops.
#[must_use]
pub fn single_shop(products: &[Product]) -> Option<ShopId> {
    let mut shops = products.iter().map(|product| product.shop_id);
    let first = shops.next()?;
    shops.all(|shop| shop == first).then_some(first)
}

/// Filter a shop's methods down to those every cart product permits.
///
/// `restricted` holds an entry per product that has restriction rows; the
/// value is that product's allowed method set. Products without rows are
/// absent and impose no constraint.
#[must_use]
pub fn eligible_methods(
    methods: Vec<ShippingMethod>,
    restricted: &HashMap<ProductId, HashSet<ShippingMethodId>>,
) -> Vec<ShippingMethod> {
    methods
        .into_iter()
        .filter(|method| {
            restricted
                .values()
                .all(|allowed| allowed.contains(&method.id))
        })
        .collect()
}

/// Build the per-product restriction map from raw restriction rows.
#[must_use]
pub fn restriction_map(
    rows: &[(ProductId, ShippingMethodId)],
) -> HashMap<ProductId, HashSet<ShippingMethodId>> {
    let mut map: HashMap<ProductId, HashSet<ShippingMethodId>> = HashMap::new();
    for (product_id, method_id) in rows {
        map.entry(*product_id).or_default().insert(*method_id);
    }
    map
}

/// Resolve the shipping methods valid for a whole cart.
///
/// Returns the empty set for carts that span shops. Unknown product IDs are
/// a caller error, not an empty result.
///
/// # Errors
///
/// Returns `AppError::NotFound` if any product ID does not exist, or a
/// database error from the lookups.
#[instrument(skip(state), fields(products = product_ids.len()))]
pub async fn shipping_options(
    state: &AppState,
    product_ids: &[ProductId],
) -> Result<Vec<ShippingMethod>, AppError> {
    let distinct: Vec<ProductId> = {
        let mut seen = HashSet::new();
        product_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    };

    if distinct.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let products = ProductRepository::new(state.pool()).get_many(&distinct).await?;
    if products.len() != distinct.len() {
        return Err(AppError::NotFound("product in cart".to_string()));
    }

    let Some(shop_id) = single_shop(&products) else {
        return Ok(Vec::new());
    };

    let methods = active_methods_cached(state, shop_id).await?;

    let rows = ShippingRepository::new(state.pool())
        .restrictions_for_products(&distinct)
        .await?;
    let restricted = restriction_map(&rows);

    Ok(eligible_methods(methods.as_ref().clone(), &restricted))
}

/// A shop's active methods, read through the per-shop cache.
pub(crate) async fn active_methods_cached(
    state: &AppState,
    shop_id: ShopId,
) -> Result<Arc<Vec<ShippingMethod>>, AppError> {
    state
        .method_cache()
        .try_get_with(shop_id, async {
            ShippingRepository::new(state.pool())
                .list_active(shop_id)
                .await
                .map(Arc::new)
        })
        .await
        .map_err(|e| AppError::Internal(format!("shipping method lookup failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn method(id: i64) -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new(id),
            shop_id: ShopId::new(1),
            name: format!("method-{id}"),
            carrier: None,
            rate: Decimal::new(500, 2),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(id: i64, shop: i64) -> Product {
        Product {
            id: ProductId::new(id),
            shop_id: ShopId::new(shop),
            title: format!("product-{id}"),
            description: None,
            price: Decimal::new(1000, 2),
            currency: "USD".to_string(),
            status: portobello_core::ProductStatus::Active,
            inventory: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ids(methods: &[ShippingMethod]) -> Vec<i64> {
        methods.iter().map(|m| m.id.as_i64()).collect()
    }

    #[test]
    fn unrestricted_cart_gets_all_methods() {
        let methods = vec![method(1), method(2), method(3)];
        let restricted = HashMap::new();

        assert_eq!(ids(&eligible_methods(methods, &restricted)), vec![1, 2, 3]);
    }

    #[test]
    fn result_is_intersection_across_restricted_products() {
        let methods = vec![method(1), method(2), method(3)];

        let rows = vec![
            // Product 10 allows methods 1 and 2.
            (ProductId::new(10), ShippingMethodId::new(1)),
            (ProductId::new(10), ShippingMethodId::new(2)),
            // Product 11 allows methods 2 and 3.
            (ProductId::new(11), ShippingMethodId::new(2)),
            (ProductId::new(11), ShippingMethodId::new(3)),
        ];
        let restricted = restriction_map(&rows);

        assert_eq!(ids(&eligible_methods(methods, &restricted)), vec![2]);
    }

    #[test]
    fn unrestricted_product_imposes_no_constraint() {
        let methods = vec![method(1), method(2)];

        // Product 10 is restricted to method 1; product 11 has no rows and
        // is therefore absent from the map.
        let rows = vec![(ProductId::new(10), ShippingMethodId::new(1))];
        let restricted = restriction_map(&rows);

        assert_eq!(ids(&eligible_methods(methods, &restricted)), vec![1]);
    }

    #[test]
    fn disjoint_restrictions_yield_empty_set() {
        let methods = vec![method(1), method(2)];

        let rows = vec![
            (ProductId::new(10), ShippingMethodId::new(1)),
            (ProductId::new(11), ShippingMethodId::new(2)),
        ];
        let restricted = restriction_map(&rows);

        assert!(eligible_methods(methods, &restricted).is_empty());
    }

    #[test]
    fn single_shop_detects_mixed_carts() {
        let same = vec![product(1, 7), product(2, 7)];
        assert_eq!(single_shop(&same), Some(ShopId::new(7)));

        let mixed = vec![product(1, 7), product(2, 8)];
        assert_eq!(single_shop(&mixed), None);

        assert_eq!(single_shop(&[]), None);
    }
}
