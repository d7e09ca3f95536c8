//! Order and order item repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use portobello_core::{
    CouponId, OrderId, OrderStatus, ProductId, ShippingMethodId, ShopId, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem, Page, PageQuery};

const SORT_WHITELIST: &[(&str, &str)] = &[
    ("created_at", "created_at"),
    ("total", "total"),
    ("status", "status"),
];

const ORDER_COLUMNS: &str = "id, number, user_id, guest_email, shop_id, status, currency, \
                             subtotal, discount_total, tax_total, shipping_total, total, \
                             shipping_method_id, coupon_id, shipping_country, shipping_region, \
                             created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, title, unit_price, quantity, line_total";

/// Parameters for inserting an order header.
#[derive(Debug)]
pub struct CreateOrder<'a> {
    pub number: &'a str,
    pub user_id: Option<UserId>,
    pub guest_email: Option<&'a str>,
    pub shop_id: ShopId,
    pub currency: &'a str,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
    pub shipping_method_id: ShippingMethodId,
    pub coupon_id: Option<CouponId>,
    pub shipping_country: &'a str,
    pub shipping_region: Option<&'a str>,
}

/// Line item snapshot to insert with an order.
#[derive(Debug)]
pub struct CreateOrderItem<'a> {
    pub product_id: ProductId,
    pub title: &'a str,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order header inside a checkout transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        params: CreateOrder<'_>,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (number, user_id, guest_email, shop_id, currency,
                                 subtotal, discount_total, tax_total, shipping_total, total,
                                 shipping_method_id, coupon_id, shipping_country, shipping_region)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(params.number)
        .bind(params.user_id)
        .bind(params.guest_email)
        .bind(params.shop_id)
        .bind(params.currency)
        .bind(params.subtotal)
        .bind(params.discount_total)
        .bind(params.tax_total)
        .bind(params.shipping_total)
        .bind(params.total)
        .bind(params.shipping_method_id)
        .bind(params.coupon_id)
        .bind(params.shipping_country)
        .bind(params.shipping_region)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order number"))?;

        Ok(order)
    }

    /// Insert line item snapshots inside a checkout transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn insert_items(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        order_id: OrderId,
        items: &[CreateOrderItem<'_>],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let mut inserted = Vec::with_capacity(items.len());

        for item in items {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                "INSERT INTO order_items (order_id, product_id, title, unit_price, quantity, line_total)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.title)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total)
            .fetch_one(&mut **tx)
            .await?;

            inserted.push(row);
        }

        Ok(inserted)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Get an order's line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Whether an order contains a line item for a given product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn contains_product(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM order_items WHERE order_id = $1 AND product_id = $2
             )",
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// List a customer's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        query: &PageQuery,
    ) -> Result<Page<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(rows, total, query))
    }

    /// List a shop's orders for the vendor dashboard, paginated, optionally
    /// filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
        query: &PageQuery,
        status: Option<OrderStatus>,
    ) -> Result<Page<Order>, RepositoryError> {
        let column = query.sort_column(SORT_WHITELIST, "created_at");
        let dir = query.dir().as_sql();

        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE shop_id = $1 AND ($2::order_status IS NULL OR status = $2)
             ORDER BY {column} {dir}
             LIMIT $3 OFFSET $4"
        ))
        .bind(shop_id)
        .bind(status)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders
             WHERE shop_id = $1 AND ($2::order_status IS NULL OR status = $2)",
        )
        .bind(shop_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(rows, total, query))
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Move a shop-scoped order from `paid` to `fulfilled`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is missing, belongs
    /// to another shop, or is not in `paid` status.
    pub async fn fulfill(&self, shop_id: ShopId, id: OrderId) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'fulfilled', updated_at = NOW()
             WHERE id = $1 AND shop_id = $2 AND status = 'paid'
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
