use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::catalog::{CatalogQuery, CreateProductRequest, UpdateProductRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::CurrentActor;
use crate::models::{ListProductsFilter, Product};
use crate::utils::ValidatedJson;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/products",
    params(CatalogQuery),
    responses((status = 200, description = "Products and services", body = Vec<Product>)),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let filter = ListProductsFilter::from(query);
    Ok(Json(state.store.list_products(actor.company_id(), &filter).await?))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid price or VAT rate", body = ErrorResponse),
        (status = 402, description = "Plan limit reached", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog.create_product(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog.get_product(actor.company_id(), product_id).await?))
}

#[utoipa::path(
    put,
    path = "/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    let product = state
        .catalog
        .update_product(&actor, product_id, &req.into())
        .await?;
    Ok(Json(product))
}

/// Deactivate a product. Existing line items keep their copy of its details.
#[utoipa::path(
    delete,
    path = "/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deactivated", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog.delete_product(&actor, product_id).await?))
}
