use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::checkout::{
        CustomerAddresses, OrderWithDetails, PaymentUpdateRequest, PlaceOrderRequest,
        PlaceOrderResponse,
    },
    error::AppResult,
    middleware::auth::MaybeAuthUser,
    models::Order,
    response::{ApiResponse, Meta},
    services::{address_service, checkout_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/place-order", post(place_order))
        .route("/order/{order_id}", get(get_order))
        .route("/order/{order_id}/payment", put(update_payment))
        .route("/customer/{customer_id}/addresses", get(customer_addresses))
}

#[utoipa::path(
    post,
    path = "/api/checkout/place-order",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<PlaceOrderResponse>),
        (status = 400, description = "Insufficient stock, COD limit exceeded or invalid request"),
        (status = 500, description = "Internal Server Error"),
    ),
    tag = "Checkout"
)]
pub async fn place_order(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PlaceOrderResponse>>)> {
    let placed = checkout_service::place_order(&state, user.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Order placed successfully",
            placed,
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/checkout/order/{order_id}",
    params(("order_id" = String, Path, description = "Order id, e.g. O001")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithDetails>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Checkout"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let resp = order_service::get_order(&state, &order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/checkout/order/{order_id}/payment",
    params(("order_id" = String, Path, description = "Order id")),
    request_body = PaymentUpdateRequest,
    responses(
        (status = 200, description = "Payment status recorded", body = ApiResponse<Order>),
        (status = 400, description = "Unknown payment status"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Checkout"
)]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(payload): Json<PaymentUpdateRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_payment(&state, &order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/checkout/customer/{customer_id}/addresses",
    params(("customer_id" = String, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer with stored addresses", body = ApiResponse<CustomerAddresses>),
        (status = 404, description = "Customer not found"),
    ),
    tag = "Checkout"
)]
pub async fn customer_addresses(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> AppResult<Json<ApiResponse<CustomerAddresses>>> {
    let resp = address_service::customer_addresses(&state, &customer_id).await?;
    Ok(Json(resp))
}
