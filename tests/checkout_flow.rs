use std::collections::HashSet;

use artisan_shop_api::{
    config::CheckoutSettings,
    db::{create_pool, run_migrations},
    dto::{
        admin::InventoryAdjustRequest,
        checkout::{
            AddressInput, CustomerInfo, OrderItemInput, OrderSummary, PaymentInfo,
            PaymentUpdateRequest, PlaceOrderRequest, ShippingMethodInput,
        },
    },
    entity::{
        customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
        payment_methods::{Column as PaymentMethodCol, Entity as PaymentMethods},
        order_details::{Column as DetailCol, Entity as OrderDetails},
        orders::{Column as OrderCol, Entity as Orders},
        product_variations::{
            ActiveModel as VariationActive, Column as VariationCol, Entity as ProductVariations,
        },
        products::{ActiveModel as ProductActive, Entity as Products},
        transactions::{Column as TransactionCol, Entity as Transactions},
        addresses::Entity as Addresses,
    },
    error::AppError,
    mailer::InvoiceMailer,
    middleware::auth::AuthUser,
    routes::params::LowStockQuery,
    services::{
        address_service::{AddressType, resolve_address},
        bookkeeping::{self, Bookkeeping},
        checkout_service, inventory_service, order_service,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

// Each test works on its own products and customers, so the suite can share
// one database and run in parallel without truncating tables.

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run checkout flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(
        pool,
        CheckoutSettings::default(),
        InvoiceMailer::disabled(),
    )))
}

fn unique(prefix: &str) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &raw[..12])
}

async fn create_product(state: &AppState, price: i64, quantity: i32) -> anyhow::Result<String> {
    let product = ProductActive {
        product_id: Set(unique("P")),
        name: Set(unique("Test Shawl")),
        description: Set(Some("A product for testing".into())),
        price: Set(Decimal::from(price)),
        quantity: Set(quantity),
        is_customizable: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.product_id)
}

async fn create_variation(
    state: &AppState,
    product_id: &str,
    size: &str,
    stock: i32,
) -> anyhow::Result<()> {
    VariationActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id.to_string()),
        size: Set(size.to_string()),
        stock: Set(stock),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(())
}

async fn stock_of(state: &AppState, product_id: &str) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id.to_string())
        .one(&state.orm)
        .await?
        .expect("product exists");
    Ok(product.quantity)
}

async fn variation_stock(state: &AppState, product_id: &str, size: &str) -> anyhow::Result<i32> {
    let variation = ProductVariations::find()
        .filter(VariationCol::ProductId.eq(product_id))
        .filter(VariationCol::Size.eq(size))
        .one(&state.orm)
        .await?
        .expect("variation exists");
    Ok(variation.stock)
}

fn item(product_id: &str, quantity: i32, price: i64) -> OrderItemInput {
    OrderItemInput {
        product_id: product_id.to_string(),
        quantity,
        price: Decimal::from(price),
        size: None,
        customization: None,
        customization_fee: None,
    }
}

fn address() -> AddressInput {
    AddressInput {
        street: "12 Loom Lane".into(),
        city: "Kathmandu".into(),
        district: "Bagmati".into(),
        postal_code: "44600".into(),
        country: "Nepal".into(),
    }
}

fn order_request(
    email: &str,
    items: Vec<OrderItemInput>,
    shipping_fee: Decimal,
    method: &str,
) -> PlaceOrderRequest {
    let subtotal: Decimal = items.iter().map(checkout_service::line_total).sum();
    PlaceOrderRequest {
        customer_info: CustomerInfo {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.to_string(),
            phone: Some("9800000000".into()),
        },
        shipping_address: address(),
        billing_address: None,
        order_items: items,
        order_summary: OrderSummary {
            subtotal,
            shipping_fee,
            discount: Decimal::ZERO,
            total: subtotal + shipping_fee,
        },
        payment_info: PaymentInfo {
            method: method.to_string(),
            gateway: None,
            card_last_four: None,
            card_brand: None,
            card_expiry: None,
        },
        shipping_method: ShippingMethodInput {
            name: "Standard".into(),
        },
        pickup_location: None,
    }
}

fn email() -> String {
    format!("{}@example.com", unique("buyer"))
}

#[tokio::test]
async fn cod_order_decrements_stock_and_records_line_item() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 1000, 5).await?;
    let buyer = email();

    let placed = checkout_service::place_order(
        &state,
        None,
        order_request(&buyer, vec![item(&product_id, 3, 1000)], Decimal::from(350), "cod"),
    )
    .await?;

    assert!(placed.success);
    assert!(placed.order_id.starts_with('O'));
    assert!(placed.payment_url.is_none());
    assert!(!placed.discount_applied);
    assert_eq!(stock_of(&state, &product_id).await?, 2);

    let order = Orders::find_by_id(placed.order_id.clone())
        .one(&state.orm)
        .await?
        .expect("order stored");
    assert_eq!(order.order_status, "Pending");
    assert_eq!(order.payment_status, "Pending");
    assert_eq!(order.total_amount, Decimal::from(3350));
    assert!(order.shipping_method_id.is_some());

    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(placed.order_id.as_str()))
        .all(&state.orm)
        .await?;
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].product_id, product_id);
    assert_eq!(details[0].quantity, 3);
    assert_eq!(details[0].price_at_purchase, Decimal::from(1000));

    let customer = Customers::find()
        .filter(CustomerCol::Email.eq(buyer.as_str()))
        .one(&state.orm)
        .await?
        .expect("guest created");
    assert!(customer.c_id.starts_with("G-"));
    assert!(customer.is_guest);
    assert_eq!(customer.order_count, 1);
    assert_eq!(customer.total_spent, Decimal::from(3350));
    assert!(customer.last_order_at.is_some());

    let transactions = Transactions::find()
        .filter(TransactionCol::OrderId.eq(placed.order_id.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(transactions, 1);

    Ok(())
}

#[tokio::test]
async fn over_request_is_rejected_without_partial_writes() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let plenty = create_product(&state, 200, 10).await?;
    let scarce = create_product(&state, 300, 1).await?;
    let buyer = email();

    let err = checkout_service::place_order(
        &state,
        None,
        order_request(
            &buyer,
            vec![item(&plenty, 4, 200), item(&scarce, 2, 300)],
            Decimal::from(100),
            "cod",
        ),
    )
    .await
    .unwrap_err();

    match err {
        AppError::InsufficientStock { product_id } => assert_eq!(product_id, scarce),
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    assert_eq!(stock_of(&state, &plenty).await?, 10);
    assert_eq!(stock_of(&state, &scarce).await?, 1);
    let customer = Customers::find()
        .filter(CustomerCol::Email.eq(buyer.as_str()))
        .one(&state.orm)
        .await?;
    assert!(customer.is_none(), "guest creation must roll back with the order");

    Ok(())
}

#[tokio::test]
async fn stock_never_goes_negative_across_placements() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 100, 4).await?;
    let buyer = email();

    let mut accepted = 0;
    for _ in 0..4 {
        let outcome = checkout_service::place_order(
            &state,
            None,
            order_request(&buyer, vec![item(&product_id, 2, 100)], Decimal::ZERO, "cod"),
        )
        .await;
        match outcome {
            Ok(_) => accepted += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
        assert!(stock_of(&state, &product_id).await? >= 0);
    }

    assert_eq!(accepted, 2);
    assert_eq!(stock_of(&state, &product_id).await?, 0);
    Ok(())
}

async fn place_concurrently(
    state: &AppState,
    product_id: &str,
    buyers: usize,
) -> anyhow::Result<Vec<Result<String, AppError>>> {
    let mut handles = Vec::new();
    for _ in 0..buyers {
        let state = state.clone();
        let request = order_request(&email(), vec![item(product_id, 1, 100)], Decimal::ZERO, "cod");
        handles.push(tokio::spawn(async move {
            checkout_service::place_order(&state, None, request)
                .await
                .map(|placed| placed.order_id)
        }));
    }

    let mut outcomes = Vec::with_capacity(buyers);
    for handle in handles {
        outcomes.push(handle.await?);
    }
    Ok(outcomes)
}

#[tokio::test]
async fn concurrent_placements_all_succeed_with_distinct_ids() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 100, 100).await?;

    let mut ids = HashSet::new();
    for outcome in place_concurrently(&state, &product_id, 12).await? {
        match outcome {
            Ok(order_id) => assert!(ids.insert(order_id), "duplicate order id"),
            Err(err) => panic!("concurrent placement failed: {err:?}"),
        }
    }

    assert_eq!(ids.len(), 12);
    assert_eq!(stock_of(&state, &product_id).await?, 88);
    Ok(())
}

#[tokio::test]
async fn concurrent_placements_never_oversell() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 100, 5).await?;

    let mut ids = HashSet::new();
    for outcome in place_concurrently(&state, &product_id, 12).await? {
        match outcome {
            Ok(order_id) => assert!(ids.insert(order_id), "duplicate order id"),
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(ids.len(), 5);
    assert_eq!(stock_of(&state, &product_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn sequential_placements_get_distinct_ids() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 50, 100).await?;
    let buyer = email();

    let mut ids = HashSet::new();
    for _ in 0..5 {
        let placed = checkout_service::place_order(
            &state,
            None,
            order_request(&buyer, vec![item(&product_id, 1, 50)], Decimal::ZERO, "cod"),
        )
        .await?;
        ids.insert(placed.order_id);
    }
    assert_eq!(ids.len(), 5);
    Ok(())
}

#[tokio::test]
async fn cod_limit_is_inclusive() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 4650, 10).await?;

    let at_limit = order_request(
        &email(),
        vec![item(&product_id, 1, 4650)],
        Decimal::from(350),
        "cod",
    );
    checkout_service::place_order(&state, None, at_limit).await?;
    assert_eq!(stock_of(&state, &product_id).await?, 9);

    let mut over = order_request(
        &email(),
        vec![item(&product_id, 1, 4650)],
        Decimal::new(35001, 2),
        "cod",
    );
    over.order_summary.total = Decimal::new(500001, 2);
    let err = checkout_service::place_order(&state, None, over)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, &product_id).await?, 9);
    Ok(())
}

#[tokio::test]
async fn address_is_reused_until_a_field_changes() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 10, 10).await?;
    let buyer = email();
    checkout_service::place_order(
        &state,
        None,
        order_request(&buyer, vec![item(&product_id, 1, 10)], Decimal::ZERO, "cod"),
    )
    .await?;
    let customer = Customers::find()
        .filter(CustomerCol::Email.eq(buyer.as_str()))
        .one(&state.orm)
        .await?
        .expect("guest created");

    let first = resolve_address(&state.orm, &customer.c_id, AddressType::Shipping, &address()).await?;
    let again = resolve_address(&state.orm, &customer.c_id, AddressType::Shipping, &address()).await?;
    assert_eq!(first, again);

    let mut moved = address();
    moved.postal_code = "44700".into();
    let changed = resolve_address(&state.orm, &customer.c_id, AddressType::Shipping, &moved).await?;
    assert_ne!(first, changed);
    assert!(Addresses::find_by_id(first).one(&state.orm).await?.is_some());

    let listed = artisan_shop_api::services::address_service::customer_addresses(&state, &customer.c_id)
        .await?
        .data
        .expect("addresses");
    assert_eq!(listed.addresses[0].id, changed);
    Ok(())
}

#[tokio::test]
async fn sized_orders_draw_from_both_counters() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 800, 10).await?;
    create_variation(&state, &product_id, "M", 2).await?;

    let mut sized = item(&product_id, 2, 800);
    sized.size = Some("M".into());
    checkout_service::place_order(
        &state,
        None,
        order_request(&email(), vec![sized.clone()], Decimal::ZERO, "cod"),
    )
    .await?;
    assert_eq!(stock_of(&state, &product_id).await?, 8);
    assert_eq!(variation_stock(&state, &product_id, "M").await?, 0);

    let err = checkout_service::place_order(
        &state,
        None,
        order_request(&email(), vec![sized], Decimal::ZERO, "cod"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(stock_of(&state, &product_id).await?, 8);
    Ok(())
}

#[tokio::test]
async fn failed_statistics_do_not_touch_the_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 100, 10).await?;
    let placed = checkout_service::place_order(
        &state,
        None,
        order_request(&email(), vec![item(&product_id, 1, 100)], Decimal::ZERO, "cod"),
    )
    .await?;

    let outcomes = bookkeeping::run_all(
        &state.orm,
        vec![
            Bookkeeping::UpdateCustomerStats {
                customer_id: unique("missing"),
                order_total: Decimal::from(100),
            },
            Bookkeeping::RecordTransaction {
                order_id: placed.order_id.clone(),
                amount: Decimal::from(100),
                payment_method: "cod".into(),
                gateway: None,
            },
        ],
    )
    .await;

    assert!(!outcomes[0].succeeded);
    assert!(outcomes[1].succeeded);
    assert!(
        Orders::find_by_id(placed.order_id.clone())
            .one(&state.orm)
            .await?
            .is_some()
    );
    assert_eq!(stock_of(&state, &product_id).await?, 9);
    Ok(())
}

#[tokio::test]
async fn card_payment_confirmation_moves_order_to_pending() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 2500, 3).await?;
    let mut request = order_request(&email(), vec![item(&product_id, 1, 2500)], Decimal::from(350), "esewa");
    request.payment_info.gateway = Some("esewa".into());

    let placed = checkout_service::place_order(&state, None, request).await?;
    assert!(placed.payment_url.is_some());

    let order = Orders::find()
        .filter(OrderCol::OrderId.eq(placed.order_id.as_str()))
        .one(&state.orm)
        .await?
        .expect("order stored");
    assert_eq!(order.order_status, "Awaiting Payment");

    let updated = order_service::update_payment(
        &state,
        &placed.order_id,
        PaymentUpdateRequest {
            payment_status: "Paid".into(),
            transaction_id: Some("ESW-123".into()),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.payment_status, "Paid");
    assert_eq!(updated.order_status, "Pending");

    let transaction = Transactions::find()
        .filter(TransactionCol::OrderId.eq(placed.order_id.as_str()))
        .one(&state.orm)
        .await?
        .expect("transaction recorded");
    assert_eq!(transaction.status, "Paid");
    assert_eq!(transaction.gateway_transaction_id.as_deref(), Some("ESW-123"));

    let missing = order_service::get_order(&state, "O-does-not-exist").await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    Ok(())
}

async fn create_customer(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let customer = CustomerActive {
        c_id: Set(unique("C")),
        first_name: Set("Grace".into()),
        last_name: Set("Hopper".into()),
        email: Set(email()),
        phone: Set(None),
        account_type: Set("Retail".into()),
        role: Set(role.to_string()),
        is_approved: Set(true),
        is_verified: Set(true),
        is_guest: Set(false),
        order_count: Set(0),
        total_spent: Set(Decimal::ZERO),
        last_order_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser {
        customer_id: customer.c_id,
        role: customer.role,
    })
}

fn card_payment(last_four: &str) -> PaymentInfo {
    PaymentInfo {
        method: "card".into(),
        gateway: Some("stripe".into()),
        card_last_four: Some(last_four.into()),
        card_brand: Some("Visa".into()),
        card_expiry: Some("12/30".into()),
    }
}

#[tokio::test]
async fn signed_in_buyer_orders_under_their_own_account() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 300, 5).await?;
    let buyer = create_customer(&state, "customer").await?;

    // The form email differs from the account email; the token subject wins.
    let form_email = email();
    let placed = checkout_service::place_order(
        &state,
        Some(&buyer),
        order_request(&form_email, vec![item(&product_id, 1, 300)], Decimal::ZERO, "cod"),
    )
    .await?;

    let order = Orders::find_by_id(placed.order_id.clone())
        .one(&state.orm)
        .await?
        .expect("order stored");
    assert_eq!(order.customer_id, buyer.customer_id);

    let guest = Customers::find()
        .filter(CustomerCol::Email.eq(form_email.as_str()))
        .one(&state.orm)
        .await?;
    assert!(guest.is_none(), "no guest record for a signed-in buyer");

    let account = Customers::find_by_id(buyer.customer_id.clone())
        .one(&state.orm)
        .await?
        .expect("account exists");
    assert_eq!(account.order_count, 1);
    Ok(())
}

#[tokio::test]
async fn latest_card_becomes_the_only_default() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, 400, 5).await?;
    let buyer = create_customer(&state, "customer").await?;

    for last_four in ["4242", "1881"] {
        let mut request =
            order_request(&email(), vec![item(&product_id, 1, 400)], Decimal::ZERO, "card");
        request.payment_info = card_payment(last_four);
        checkout_service::place_order(&state, Some(&buyer), request).await?;
    }

    let methods = PaymentMethods::find()
        .filter(PaymentMethodCol::CustomerId.eq(buyer.customer_id.as_str()))
        .all(&state.orm)
        .await?;
    assert_eq!(methods.len(), 2);

    let defaults: Vec<_> = methods.iter().filter(|m| m.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].last_four.as_deref(), Some("1881"));

    // Paying again with the first card promotes it back.
    let mut request = order_request(&email(), vec![item(&product_id, 1, 400)], Decimal::ZERO, "card");
    request.payment_info = card_payment("4242");
    checkout_service::place_order(&state, Some(&buyer), request).await?;

    let defaults = PaymentMethods::find()
        .filter(PaymentMethodCol::CustomerId.eq(buyer.customer_id.as_str()))
        .filter(PaymentMethodCol::IsDefault.eq(true))
        .all(&state.orm)
        .await?;
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].last_four.as_deref(), Some("4242"));
    Ok(())
}

#[tokio::test]
async fn admin_adjusts_stock_and_sees_low_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_customer(&state, "admin").await?;
    let shopper = create_customer(&state, "customer").await?;
    let product_id = create_product(&state, 800, 3).await?;
    create_variation(&state, &product_id, "L", 2).await?;

    let denied = inventory_service::adjust_inventory(
        &state,
        &shopper,
        &product_id,
        InventoryAdjustRequest {
            delta: 5,
            size: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let restocked = inventory_service::adjust_inventory(
        &state,
        &admin,
        &product_id,
        InventoryAdjustRequest {
            delta: 4,
            size: Some("L".into()),
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(restocked.quantity, 7);
    assert_eq!(variation_stock(&state, &product_id, "L").await?, 6);

    let too_far = inventory_service::adjust_inventory(
        &state,
        &admin,
        &product_id,
        InventoryAdjustRequest {
            delta: -8,
            size: None,
        },
    )
    .await;
    assert!(matches!(too_far, Err(AppError::BadRequest(_))));

    let overflow = inventory_service::adjust_inventory(
        &state,
        &admin,
        &product_id,
        InventoryAdjustRequest {
            delta: i32::MAX,
            size: None,
        },
    )
    .await;
    assert!(matches!(overflow, Err(AppError::BadRequest(_))));

    // A sized write-off larger than the variation holds leaves both counters alone.
    let sized_too_far = inventory_service::adjust_inventory(
        &state,
        &admin,
        &product_id,
        InventoryAdjustRequest {
            delta: -7,
            size: Some("L".into()),
        },
    )
    .await;
    assert!(matches!(sized_too_far, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, &product_id).await?, 7);
    assert_eq!(variation_stock(&state, &product_id, "L").await?, 6);

    inventory_service::adjust_inventory(
        &state,
        &admin,
        &product_id,
        InventoryAdjustRequest {
            delta: -7,
            size: None,
        },
    )
    .await?;
    assert_eq!(stock_of(&state, &product_id).await?, 0);

    let low = inventory_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(100),
            threshold: Some(0),
        },
    )
    .await?
    .data
    .expect("low stock list");
    assert!(low.items.iter().any(|p| p.product_id == product_id));

    let forbidden = inventory_service::list_low_stock(
        &state,
        &shopper,
        LowStockQuery {
            page: None,
            per_page: None,
            threshold: None,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));
    Ok(())
}
