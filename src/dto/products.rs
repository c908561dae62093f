use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Product, ProductVariation};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductWithVariations {
    pub product: Product,
    pub variations: Vec<ProductVariation>,
}
