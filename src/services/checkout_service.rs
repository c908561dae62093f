//! Order placement: one unit of work covering customer, addresses, order,
//! line items and stock, followed by best-effort bookkeeping and the invoice
//! email once the commit has succeeded.

use reqwest::Url;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::checkout::{CustomerInfo, OrderItemInput, PlaceOrderRequest, PlaceOrderResponse},
    entity::{
        customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers, Model as CustomerModel},
        order_details::ActiveModel as OrderDetailActive,
        orders::{ActiveModel as OrderActive, Model as OrderModel},
        shipping_methods::{ActiveModel as ShippingActive, Column as ShippingCol, Entity as ShippingMethods},
    },
    error::{AppError, AppResult},
    invoice::{Invoice, InvoiceLine},
    middleware::auth::AuthUser,
    services::{
        address_service::{AddressType, resolve_address},
        bookkeeping::{self, Bookkeeping},
        inventory_service::decrement_stock,
        order_id::next_order_id,
    },
    state::AppState,
};

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_AWAITING_PAYMENT: &str = "Awaiting Payment";

/// Attempts at inserting the order row before a duplicate id is treated as fatal.
const ORDER_INSERT_ROUNDS: usize = 3;

/// Width of the `payment_method` columns.
const MAX_PAYMENT_METHOD_LEN: usize = 32;

/// Amounts recomputed from the line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

pub fn is_cash_on_delivery(method: &str) -> bool {
    let method = method.trim();
    ["cod", "cash_on_delivery", "cash on delivery", "cash-on-delivery"]
        .iter()
        .any(|alias| method.eq_ignore_ascii_case(alias))
}

/// `(order_status, payment_status)` for a freshly placed order.
pub fn initial_statuses(payment_method: &str) -> (&'static str, &'static str) {
    if is_cash_on_delivery(payment_method) {
        (STATUS_PENDING, STATUS_PENDING)
    } else {
        (STATUS_AWAITING_PAYMENT, STATUS_PENDING)
    }
}

pub fn line_total(item: &OrderItemInput) -> Decimal {
    item.price * Decimal::from(item.quantity) + item.customization_fee.unwrap_or_default()
}

/// Reject a request before anything is written.
pub fn validate_order(payload: &PlaceOrderRequest, cod_limit: Decimal) -> AppResult<Totals> {
    if payload.order_items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }
    let method = payload.payment_info.method.trim();
    if method.is_empty() {
        return Err(AppError::BadRequest("Payment method is required".into()));
    }
    if method.chars().count() > MAX_PAYMENT_METHOD_LEN {
        return Err(AppError::BadRequest(format!(
            "Payment method must be at most {MAX_PAYMENT_METHOD_LEN} characters"
        )));
    }
    if payload.shipping_method.name.trim().is_empty() {
        return Err(AppError::BadRequest("Shipping method is required".into()));
    }

    for item in &payload.order_items {
        if item.product_id.trim().is_empty() {
            return Err(AppError::BadRequest("Order item is missing a product id".into()));
        }
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity for product {}",
                item.product_id
            )));
        }
        let fee = item.customization_fee.unwrap_or_default();
        if item.price < Decimal::ZERO || fee < Decimal::ZERO {
            return Err(AppError::BadRequest(format!(
                "Invalid price for product {}",
                item.product_id
            )));
        }
    }

    let summary = &payload.order_summary;
    if summary.shipping_fee < Decimal::ZERO || summary.discount < Decimal::ZERO {
        return Err(AppError::BadRequest("Invalid order summary".into()));
    }

    let subtotal: Decimal = payload.order_items.iter().map(line_total).sum();
    if subtotal != summary.subtotal {
        return Err(AppError::BadRequest(format!(
            "Order subtotal {} does not match items total {subtotal}",
            summary.subtotal
        )));
    }

    let total = subtotal + summary.shipping_fee - summary.discount;
    if total < Decimal::ZERO {
        return Err(AppError::BadRequest("Discount exceeds order value".into()));
    }
    if total != summary.total {
        return Err(AppError::BadRequest(format!(
            "Order total {} does not match computed total {total}",
            summary.total
        )));
    }

    if is_cash_on_delivery(&payload.payment_info.method) && total > cod_limit {
        return Err(AppError::BadRequest(format!(
            "Cash on Delivery is not available for orders above {cod_limit}"
        )));
    }

    Ok(Totals {
        subtotal,
        shipping_fee: summary.shipping_fee,
        discount: summary.discount,
        total,
    })
}

/// Redirect target for methods paid through a gateway; COD has none.
pub fn payment_url(
    gateway_base: &str,
    payment_method: &str,
    order_id: &str,
    total: Decimal,
) -> Option<String> {
    if is_cash_on_delivery(payment_method) {
        return None;
    }
    let method = payment_method.trim().to_ascii_lowercase().replace(' ', "-");
    let mut url = match Url::parse(gateway_base) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(gateway = gateway_base, error = %err, "payment gateway url is invalid");
            return None;
        }
    };
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&method);
    url.query_pairs_mut()
        .append_pair("orderId", order_id)
        .append_pair("amount", &total.to_string());
    Some(url.into())
}

pub fn guest_customer_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("G-{}", raw[..8].to_ascii_uppercase())
}

pub async fn place_order(
    state: &AppState,
    auth: Option<&AuthUser>,
    payload: PlaceOrderRequest,
) -> AppResult<PlaceOrderResponse> {
    let totals = validate_order(&payload, state.checkout.cod_limit)?;

    let txn = state.orm.begin().await?;
    let placed = match write_order(&txn, auth, &payload, totals).await {
        Ok(placed) => placed,
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(error = %rollback_err, "checkout rollback failed");
            }
            tracing::info!(error = %err, "checkout rolled back");
            return Err(err);
        }
    };
    txn.commit().await?;

    let order = &placed.order;
    tracing::info!(
        order_id = %order.order_id,
        customer_id = %order.customer_id,
        total = %order.total_amount,
        "order placed"
    );

    bookkeeping::run_all(&state.orm, bookkeeping_tasks(&payload, &placed)).await;

    audit::record(
        &state.pool,
        Some(&order.customer_id),
        "order_placed",
        "orders",
        serde_json::json!({ "order_id": order.order_id, "total": order.total_amount }),
    )
    .await;

    state.mailer.enqueue(build_invoice(&payload, &placed, totals));

    let redirect = payment_url(
        &state.checkout.payment_gateway_url,
        &order.payment_method,
        &order.order_id,
        order.total_amount,
    );

    Ok(PlaceOrderResponse {
        success: true,
        order_id: order.order_id.clone(),
        payment_url: redirect,
        discount_applied: totals.discount > Decimal::ZERO,
    })
}

pub struct PlacedOrder {
    pub order: OrderModel,
    pub customer: CustomerModel,
}

/// Everything inside the unit of work. The caller owns commit and rollback.
async fn write_order(
    txn: &DatabaseTransaction,
    auth: Option<&AuthUser>,
    payload: &PlaceOrderRequest,
    totals: Totals,
) -> AppResult<PlacedOrder> {
    let customer = resolve_customer(txn, auth, &payload.customer_info).await?;

    let shipping_address_id = resolve_address(
        txn,
        &customer.c_id,
        AddressType::Shipping,
        &payload.shipping_address,
    )
    .await?;
    let billing_fields = payload
        .billing_address
        .as_ref()
        .unwrap_or(&payload.shipping_address);
    let billing_address_id =
        resolve_address(txn, &customer.c_id, AddressType::Billing, billing_fields).await?;

    let shipping_method_id =
        resolve_shipping_method(txn, &payload.shipping_method.name, totals.shipping_fee).await?;

    let (order_status, payment_status) = initial_statuses(&payload.payment_info.method);
    let draft = OrderActive {
        order_id: NotSet,
        customer_id: Set(customer.c_id.clone()),
        shipping_address_id: Set(shipping_address_id),
        billing_address_id: Set(billing_address_id),
        order_status: Set(order_status.to_string()),
        payment_status: Set(payment_status.to_string()),
        total_amount: Set(totals.total),
        payment_method: Set(payload.payment_info.method.trim().to_string()),
        assigned_artisan: Set(None),
        shipping_method_id: Set(Some(shipping_method_id)),
        pickup_location: Set(payload.pickup_location.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let order = insert_order(txn, draft).await?;

    for item in &payload.order_items {
        OrderDetailActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.order_id.clone()),
            product_id: Set(item.product_id.clone()),
            size: Set(item.size.clone()),
            quantity: Set(item.quantity),
            price_at_purchase: Set(item.price),
            customization: Set(item.customization.clone()),
            customization_fee: Set(item.customization_fee.unwrap_or_default()),
            created_at: NotSet,
        }
        .insert(txn)
        .await
        .map_err(|err| product_reference_error(err, &item.product_id))?;

        decrement_stock(txn, &item.product_id, item.size.as_deref(), item.quantity).await?;
    }

    Ok(PlacedOrder { order, customer })
}

/// Bearer subject first, then email, then a new guest record.
async fn resolve_customer<C: ConnectionTrait>(
    conn: &C,
    auth: Option<&AuthUser>,
    info: &CustomerInfo,
) -> AppResult<CustomerModel> {
    if let Some(user) = auth {
        if let Some(customer) = Customers::find_by_id(user.customer_id.clone()).one(conn).await? {
            return Ok(customer);
        }
        tracing::debug!(customer_id = %user.customer_id, "token subject not found, falling back to email");
    }

    let email = info.email.trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("Customer email is required".into()));
    }

    if let Some(customer) = Customers::find()
        .filter(CustomerCol::Email.eq(email))
        .one(conn)
        .await?
    {
        return Ok(customer);
    }

    let guest = CustomerActive {
        c_id: Set(guest_customer_id()),
        first_name: Set(info.first_name.trim().to_string()),
        last_name: Set(info.last_name.trim().to_string()),
        email: Set(email.to_string()),
        phone: Set(info.phone.clone()),
        account_type: Set("Retail".into()),
        role: Set("customer".into()),
        is_approved: Set(false),
        is_verified: Set(false),
        is_guest: Set(true),
        order_count: Set(0),
        total_spent: Set(Decimal::ZERO),
        last_order_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    tracing::info!(customer_id = %guest.c_id, "guest customer created");
    Ok(guest)
}

async fn resolve_shipping_method<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    price: Decimal,
) -> AppResult<i32> {
    let name = name.trim();
    if let Some(method) = ShippingMethods::find()
        .filter(ShippingCol::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(method.id);
    }

    ShippingMethods::insert(ShippingActive {
        id: NotSet,
        name: Set(name.to_string()),
        price: Set(price),
        created_at: NotSet,
    })
    .on_conflict(OnConflict::column(ShippingCol::Name).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    let method = ShippingMethods::find()
        .filter(ShippingCol::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("shipping method {name} vanished")))?;
    tracing::info!(shipping_method = %name, id = method.id, "shipping method created");
    Ok(method.id)
}

/// Insert the order under a savepoint so a duplicate id only costs a retry.
async fn insert_order(txn: &DatabaseTransaction, draft: OrderActive) -> AppResult<OrderModel> {
    let mut round = 0;
    loop {
        round += 1;
        let order_id = next_order_id(txn).await?;
        let mut active = draft.clone();
        active.order_id = Set(order_id.clone());

        let savepoint = txn.begin().await?;
        match active.insert(&savepoint).await {
            Ok(order) => {
                savepoint.commit().await?;
                return Ok(order);
            }
            Err(err) if is_unique_violation(&err) && round < ORDER_INSERT_ROUNDS => {
                savepoint.rollback().await?;
                tracing::warn!(order_id = %order_id, round, "order id collided, regenerating");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn product_reference_error(err: DbErr, product_id: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::ProductNotFound(product_id.to_string())
        }
        _ => err.into(),
    }
}

fn bookkeeping_tasks(payload: &PlaceOrderRequest, placed: &PlacedOrder) -> Vec<Bookkeeping> {
    let payment = &payload.payment_info;
    vec![
        Bookkeeping::RecordTransaction {
            order_id: placed.order.order_id.clone(),
            amount: placed.order.total_amount,
            payment_method: placed.order.payment_method.clone(),
            gateway: payment.gateway.clone(),
        },
        Bookkeeping::RememberPaymentMethod {
            customer_id: placed.customer.c_id.clone(),
            method_type: placed.order.payment_method.clone(),
            last_four: payment.card_last_four.clone(),
            brand: payment.card_brand.clone(),
            expiry: payment.card_expiry.clone(),
        },
        Bookkeeping::UpdateCustomerStats {
            customer_id: placed.customer.c_id.clone(),
            order_total: placed.order.total_amount,
        },
    ]
}

fn build_invoice(payload: &PlaceOrderRequest, placed: &PlacedOrder, totals: Totals) -> Invoice {
    Invoice {
        order_id: placed.order.order_id.clone(),
        recipient: placed.customer.email.clone(),
        customer_name: format!("{} {}", placed.customer.first_name, placed.customer.last_name)
            .trim()
            .to_string(),
        payment_method: placed.order.payment_method.clone(),
        lines: payload
            .order_items
            .iter()
            .map(|item| InvoiceLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: item.price,
                customization_fee: item.customization_fee.unwrap_or_default(),
            })
            .collect(),
        shipping_fee: totals.shipping_fee,
        discount: totals.discount,
        total: totals.total,
    }
}
