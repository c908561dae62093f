use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::{
    audit,
    dto::checkout::{OrderWithDetails, PaymentUpdateRequest},
    entity::{
        order_details::{Column as DetailCol, Entity as OrderDetails},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        transactions::{Column as TransactionCol, Entity as Transactions},
    },
    error::{AppError, AppResult},
    models::{Order, OrderDetail},
    response::{ApiResponse, Meta},
    services::checkout_service::{STATUS_AWAITING_PAYMENT, STATUS_PENDING},
    state::AppState,
};

pub const PAYMENT_STATUSES: [&str; 4] = ["Pending", "Paid", "Failed", "Refunded"];

pub fn validate_payment_status(status: &str) -> AppResult<()> {
    if PAYMENT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid payment status {status}")))
    }
}

/// Order status after a payment update; only a confirmed payment moves the order on.
pub fn order_status_after_payment(current: &str, payment_status: &str) -> String {
    if payment_status == "Paid" && current == STATUS_AWAITING_PAYMENT {
        STATUS_PENDING.to_string()
    } else {
        current.to_string()
    }
}

pub async fn get_order(state: &AppState, order_id: &str) -> AppResult<ApiResponse<OrderWithDetails>> {
    let order = Orders::find_by_id(order_id.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order.order_id.as_str()))
        .order_by_asc(DetailCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderDetail::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithDetails {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_payment(
    state: &AppState,
    order_id: &str,
    payload: PaymentUpdateRequest,
) -> AppResult<ApiResponse<Order>> {
    validate_payment_status(&payload.payment_status)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id.to_string())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let next_status = order_status_after_payment(&order.order_status, &payload.payment_status);
    let mut active: OrderActive = order.into();
    active.payment_status = Set(payload.payment_status.clone());
    active.order_status = Set(next_status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let mut update = Transactions::update_many()
        .col_expr(TransactionCol::Status, Expr::value(payload.payment_status.clone()))
        .col_expr(TransactionCol::UpdatedAt, Expr::value(Utc::now()));
    if let Some(gateway_id) = payload.transaction_id.as_ref() {
        update = update.col_expr(
            TransactionCol::GatewayTransactionId,
            Expr::value(gateway_id.clone()),
        );
    }
    let touched = update
        .filter(TransactionCol::OrderId.eq(order.order_id.as_str()))
        .exec(&txn)
        .await?;
    if touched.rows_affected == 0 {
        tracing::warn!(order_id = %order.order_id, "payment update found no transaction record");
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.order_id,
        payment_status = %order.payment_status,
        "payment status updated"
    );

    audit::record(
        &state.pool,
        Some(&order.customer_id),
        "payment_updated",
        "orders",
        serde_json::json!({
            "order_id": order.order_id,
            "payment_status": order.payment_status,
            "transaction_id": payload.transaction_id,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment status updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}
