//! Seed the database with demo marketplace data.
//!
//! Creates a demo vendor owning one shop with a small catalog, three
//! shipping methods (one product restricted to a single method, so the
//! cart eligibility filter has something to bite on), platform tax rates,
//! and a platform-wide welcome coupon. Safe to re-run: seeding is skipped
//! when the demo shop already exists.

use rust_decimal::Decimal;
use tracing::info;

use super::{CommandError, connect, hash_password, random_password};

const DEMO_VENDOR_EMAIL: &str = "vendor@demo.portobello.market";
const DEMO_SHOP_NAME: &str = "Meridian Goods";
const DEMO_SHOP_SLUG: &str = "meridian-goods";

/// Seed demo data.
///
/// # Errors
///
/// Returns `CommandError::Database` when any insert fails; the whole seed
/// runs in one transaction, so a failure leaves nothing behind.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM shops WHERE slug = $1")
        .bind(DEMO_SHOP_SLUG)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        info!("Demo shop '{DEMO_SHOP_SLUG}' already exists; nothing to do");
        return Ok(());
    }

    let password = random_password();
    let password_hash = hash_password(&password)?;

    let mut tx = pool.begin().await?;

    let vendor_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, name, role)
         VALUES ($1, $2, $3, 'vendor')
         RETURNING id",
    )
    .bind(DEMO_VENDOR_EMAIL)
    .bind(&password_hash)
    .bind("Demo Vendor")
    .fetch_one(&mut *tx)
    .await?;

    let shop_id: i64 = sqlx::query_scalar(
        "INSERT INTO shops (vendor_id, name, slug) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(vendor_id)
    .bind(DEMO_SHOP_NAME)
    .bind(DEMO_SHOP_SLUG)
    .fetch_one(&mut *tx)
    .await?;

    // Catalog: three live products and one draft. The skillet is the heavy
    // item used below to demonstrate shipping restrictions.
    let products: &[(&str, &str, Decimal, &str, i32)] = &[
        (
            "Waxed Canvas Tote",
            "Heavy 18oz duck canvas, brass hardware.",
            Decimal::new(48_00, 2),
            "active",
            120,
        ),
        (
            "Enamel Camp Mug",
            "12oz, speckled, campfire safe.",
            Decimal::new(19_50, 2),
            "active",
            200,
        ),
        (
            "Cast Iron Skillet",
            "10 inch, pre-seasoned.",
            Decimal::new(64_00, 2),
            "active",
            35,
        ),
        (
            "Linen Apron",
            "Stonewashed, cross-back straps.",
            Decimal::new(39_00, 2),
            "draft",
            0,
        ),
    ];

    let mut product_ids = Vec::with_capacity(products.len());
    for (title, description, price, status, inventory) in products {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (shop_id, title, description, price, status, inventory)
             VALUES ($1, $2, $3, $4, $5::product_status, $6)
             RETURNING id",
        )
        .bind(shop_id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(status)
        .bind(inventory)
        .fetch_one(&mut *tx)
        .await?;
        product_ids.push(id);
    }

    let methods: &[(&str, &str, Decimal)] = &[
        ("Standard Post", "USPS", Decimal::new(5_00, 2)),
        ("Express Courier", "DHL", Decimal::new(14_50, 2)),
        ("Freight", "XPO", Decimal::new(29_00, 2)),
    ];

    let mut method_ids = Vec::with_capacity(methods.len());
    for (name, carrier, rate) in methods {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO shipping_methods (shop_id, name, carrier, rate)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(shop_id)
        .bind(name)
        .bind(carrier)
        .bind(rate)
        .fetch_one(&mut *tx)
        .await?;
        method_ids.push(id);
    }

    // The skillet only ships by freight; everything else is unrestricted.
    if let (Some(&skillet_id), Some(&freight_id)) = (product_ids.get(2), method_ids.get(2)) {
        sqlx::query(
            "INSERT INTO product_shipping_restrictions (product_id, shipping_method_id)
             VALUES ($1, $2)",
        )
        .bind(skillet_id)
        .bind(freight_id)
        .execute(&mut *tx)
        .await?;
    }

    let tax_rates: &[(&str, Option<&str>, Decimal, bool)] = &[
        ("US", None, Decimal::new(6_500, 3), false),
        ("US", Some("CA"), Decimal::new(7_250, 3), false),
        ("GB", None, Decimal::new(20_000, 3), true),
    ];
    for (country, region, rate, inclusive) in tax_rates {
        sqlx::query(
            "INSERT INTO tax_rates (country, region, rate, inclusive)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(country)
        .bind(region)
        .bind(rate)
        .bind(inclusive)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO coupons (shop_id, code, kind, value, usage_limit)
         VALUES (NULL, 'WELCOME10', 'percentage', $1, 1000)",
    )
    .bind(Decimal::new(10_00, 2))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Seeded demo shop '{DEMO_SHOP_SLUG}' (shop id {shop_id})");
    info!("  {} products, {} shipping methods", products.len(), methods.len());
    info!("  3 tax rates, 1 platform coupon (WELCOME10)");
    info!("Demo vendor login: {DEMO_VENDOR_EMAIL}");
    // Shown once; only the argon2 hash is stored.
    #[allow(clippy::print_stdout)]
    {
        println!("Demo vendor password: {password}");
    }

    Ok(())
}
