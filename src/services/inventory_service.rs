//! Stock counters for products and their size variations.
//!
//! Variation stock is a sub-allocation of product stock: an order for a sized
//! item draws from both counters, and each must stay at or above zero.

use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::{admin::InventoryAdjustRequest, products::ProductList},
    entity::{
        product_variations::{
            ActiveModel as VariationActive, Column as VariationCol, Entity as ProductVariations,
        },
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::LowStockQuery,
    state::AppState,
};

/// Take `quantity` units off the product, and off its `size` variation when given.
///
/// Each decrement is a conditional update, so two concurrent orders can never
/// drive a counter below zero.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: &str,
    size: Option<&str>,
    quantity: i32,
) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(format!(
            "Invalid quantity for product {product_id}"
        )));
    }

    let updated = Products::update_many()
        .col_expr(ProdCol::Quantity, Expr::col(ProdCol::Quantity).sub(quantity))
        .filter(ProdCol::ProductId.eq(product_id))
        .filter(ProdCol::Quantity.gte(quantity))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        let exists = Products::find_by_id(product_id.to_string()).one(conn).await?;
        return Err(match exists {
            Some(_) => AppError::InsufficientStock {
                product_id: product_id.to_string(),
            },
            None => AppError::ProductNotFound(product_id.to_string()),
        });
    }

    if let Some(size) = size {
        let updated = ProductVariations::update_many()
            .col_expr(VariationCol::Stock, Expr::col(VariationCol::Stock).sub(quantity))
            .filter(VariationCol::ProductId.eq(product_id))
            .filter(VariationCol::Size.eq(size))
            .filter(VariationCol::Stock.gte(quantity))
            .exec(conn)
            .await?;

        if updated.rows_affected == 0 {
            let variation = ProductVariations::find()
                .filter(VariationCol::ProductId.eq(product_id))
                .filter(VariationCol::Size.eq(size))
                .one(conn)
                .await?;
            return Err(match variation {
                Some(_) => AppError::InsufficientStock {
                    product_id: format!("{product_id} (size {size})"),
                },
                None => AppError::BadRequest(format!(
                    "Size {size} is not available for product {product_id}"
                )),
            });
        }
    }

    tracing::debug!(product_id, size, quantity, "stock decremented");
    Ok(())
}

/// Stock level after a manual adjustment, or `None` when it would drop below
/// zero or leave the counter's range.
pub fn adjusted_level(current: i32, delta: i32) -> Option<i32> {
    current.checked_add(delta).filter(|level| *level >= 0)
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Quantity.lte(threshold))
        .order_by_asc(ProdCol::Quantity)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Manual restock or write-off. A sized adjustment moves both counters together.
pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    product_id: &str,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(product_id.to_string())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_quantity = adjusted_level(product.quantity, payload.delta)
        .ok_or_else(|| AppError::BadRequest("stock cannot be negative".into()))?;

    if let Some(size) = payload.size.as_deref() {
        let variation = ProductVariations::find()
            .filter(VariationCol::ProductId.eq(product_id))
            .filter(VariationCol::Size.eq(size))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let new_stock = adjusted_level(variation.stock, payload.delta)
            .ok_or_else(|| AppError::BadRequest("variation stock cannot be negative".into()))?;
        let mut active: VariationActive = variation.into();
        active.stock = Set(new_stock);
        active.update(&txn).await?;
    }

    let mut active: ProductActive = product.into();
    active.quantity = Set(new_quantity);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(&user.customer_id),
        "inventory_adjust",
        "products",
        serde_json::json!({
            "product_id": updated.product_id,
            "delta": payload.delta,
            "size": payload.size,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Product::from(updated),
        Some(Meta::empty()),
    ))
}
