use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    addresses::Model as AddressModel, customers::Model as CustomerModel,
    order_details::Model as OrderDetailModel, orders::Model as OrderModel,
    product_variations::Model as VariationModel, products::Model as ProductModel,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub c_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub account_type: String,
    pub is_approved: bool,
    pub is_verified: bool,
    pub is_guest: bool,
    pub order_count: i32,
    pub total_spent: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub customer_id: String,
    pub address_type: String,
    pub street: String,
    pub city: String,
    pub district: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub is_customizable: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariation {
    pub id: Uuid,
    pub product_id: String,
    pub size: String,
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub order_status: String,
    pub payment_status: String,
    pub total_amount: Decimal,
    pub payment_method: String,
    pub assigned_artisan: Option<String>,
    pub shipping_method_id: Option<i32>,
    pub pickup_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_id: String,
    pub product_id: String,
    pub size: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub customization: Option<String>,
    pub customization_fee: Decimal,
}

impl From<CustomerModel> for Customer {
    fn from(model: CustomerModel) -> Self {
        Self {
            c_id: model.c_id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            account_type: model.account_type,
            is_approved: model.is_approved,
            is_verified: model.is_verified,
            is_guest: model.is_guest,
            order_count: model.order_count,
            total_spent: model.total_spent,
            last_order_at: model.last_order_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<AddressModel> for Address {
    fn from(model: AddressModel) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            address_type: model.address_type,
            street: model.street,
            city: model.city,
            district: model.district,
            postal_code: model.postal_code,
            country: model.country,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            product_id: model.product_id,
            name: model.name,
            description: model.description,
            price: model.price,
            quantity: model.quantity,
            is_customizable: model.is_customizable,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<VariationModel> for ProductVariation {
    fn from(model: VariationModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            size: model.size,
            stock: model.stock,
        }
    }
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            order_id: model.order_id,
            customer_id: model.customer_id,
            shipping_address_id: model.shipping_address_id,
            billing_address_id: model.billing_address_id,
            order_status: model.order_status,
            payment_status: model.payment_status,
            total_amount: model.total_amount,
            payment_method: model.payment_method,
            assigned_artisan: model.assigned_artisan,
            shipping_method_id: model.shipping_method_id,
            pickup_location: model.pickup_location,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderDetailModel> for OrderDetail {
    fn from(model: OrderDetailModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            size: model.size,
            quantity: model.quantity,
            price_at_purchase: model.price_at_purchase,
            customization: model.customization,
            customization_fee: model.customization_fee,
        }
    }
}
