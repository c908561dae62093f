use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    dto::products::{ProductList, ProductWithVariations},
    entity::{
        product_variations::{Column as VariationCol, Entity as ProductVariations},
        products::{Column, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Product, ProductVariation},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

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
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_product(
    state: &AppState,
    product_id: &str,
) -> AppResult<ApiResponse<ProductWithVariations>> {
    let product = Products::find_by_id(product_id.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let variations = ProductVariations::find()
        .filter(VariationCol::ProductId.eq(product_id))
        .order_by_asc(VariationCol::Size)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductVariation::from)
        .collect();

    Ok(ApiResponse::success(
        "Product",
        ProductWithVariations {
            product: product.into(),
            variations,
        },
        None,
    ))
}
