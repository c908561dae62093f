use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{InventoryAdjustRequest, UpdateOrderStatusRequest},
        checkout::{
            AddressInput, CustomerAddresses, CustomerInfo, OrderItemInput, OrderList,
            OrderSummary, OrderWithDetails, PaymentInfo, PaymentUpdateRequest, PlaceOrderRequest,
            PlaceOrderResponse, ShippingMethodInput,
        },
        products::{ProductList, ProductWithVariations},
    },
    models::{Address, Customer, Order, OrderDetail, Product, ProductVariation},
    response::{ApiResponse, Meta},
    routes::{admin, checkout, health, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        checkout::place_order,
        checkout::get_order,
        checkout::update_payment,
        checkout::customer_addresses,
        products::list_products,
        products::get_product,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            Customer,
            Address,
            Product,
            ProductVariation,
            Order,
            OrderDetail,
            CustomerInfo,
            AddressInput,
            OrderItemInput,
            OrderSummary,
            PaymentInfo,
            ShippingMethodInput,
            PlaceOrderRequest,
            PlaceOrderResponse,
            PaymentUpdateRequest,
            OrderWithDetails,
            CustomerAddresses,
            OrderList,
            ProductList,
            ProductWithVariations,
            UpdateOrderStatusRequest,
            InventoryAdjustRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<PlaceOrderResponse>,
            ApiResponse<OrderWithDetails>,
            ApiResponse<CustomerAddresses>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<ProductList>,
            ApiResponse<Product>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Checkout", description = "Order placement and order lookup"),
        (name = "Products", description = "Catalog reads"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
