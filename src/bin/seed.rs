use artisan_shop_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    ensure_customer(&pool, "A001", "admin@artisan-shop.local", "admin", "Retail").await?;
    ensure_customer(&pool, "C001", "buyer@artisan-shop.local", "customer", "Retail").await?;
    ensure_customer(&pool, "W001", "boutique@artisan-shop.local", "customer", "Wholesale").await?;
    seed_products(&pool).await?;
    seed_shipping_methods(&pool).await?;

    println!("Seed completed");
    Ok(())
}

async fn ensure_customer(
    pool: &sqlx::PgPool,
    c_id: &str,
    email: &str,
    role: &str,
    account_type: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (c_id, first_name, last_name, email, role, account_type, is_approved, is_verified)
        VALUES ($1, $2, 'Seed', $3, $4, $5, TRUE, TRUE)
        ON CONFLICT (c_id) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(c_id)
    .bind(c_id)
    .bind(email)
    .bind(role)
    .bind(account_type)
    .execute(pool)
    .await?;

    println!("Ensured customer {c_id} (role={role})");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = [
        ("P010", "Hand-woven Dhaka Shawl", "Loom-woven wool shawl", 1000, 5, false),
        ("P011", "Singing Bowl", "Hand-hammered bronze bowl", 2500, 12, false),
        ("P012", "Felt Slippers", "Boiled-wool slippers", 800, 30, true),
        ("P013", "Lokta Paper Journal", "Handmade paper, custom cover text", 450, 60, true),
    ];

    for (id, name, desc, price, quantity, customizable) in products {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, name, description, price, quantity, is_customizable)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(desc)
        .bind(Decimal::from(price))
        .bind(quantity)
        .bind(customizable)
        .execute(pool)
        .await?;
    }

    for (size, stock) in [("S", 10), ("M", 12), ("L", 8)] {
        sqlx::query(
            r#"
            INSERT INTO product_variations (id, product_id, size, stock)
            VALUES ($1, 'P012', $2, $3)
            ON CONFLICT (product_id, size) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(size)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_shipping_methods(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for (name, price) in [("Standard", 350), ("Express", 700), ("Pickup", 0)] {
        sqlx::query(
            "INSERT INTO shipping_methods (name, price) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(Decimal::from(price))
        .execute(pool)
        .await?;
    }
    println!("Seeded shipping methods");
    Ok(())
}
