use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::middleware::auth::AffiliateId;
use crate::modules::inventory::models::{AdjustStockRequest, CreateStockItemRequest};
use crate::modules::inventory::services::StockService;

#[derive(Debug, Deserialize)]
pub struct ListStockQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// Add a stock item
/// POST /stock
pub async fn add_item(
    service: web::Data<Arc<StockService>>,
    affiliate: AffiliateId,
    request: web::Json<CreateStockItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item = service.add_item(&affiliate.0, request.into_inner()).await?;

    Ok(HttpResponse::Created().json(item))
}

/// List stock for the authenticated affiliate
/// GET /stock
pub async fn list_items(
    service: web::Data<Arc<StockService>>,
    affiliate: AffiliateId,
    query: web::Query<ListStockQuery>,
) -> Result<HttpResponse, AppError> {
    let items = service
        .list_items(&affiliate.0, query.limit, query.offset)
        .await?;

    Ok(HttpResponse::Ok().json(items))
}

/// Manually adjust a stock quantity (restock or shrinkage)
/// PATCH /stock/{id}
pub async fn adjust_item(
    service: web::Data<Arc<StockService>>,
    affiliate: AffiliateId,
    path: web::Path<String>,
    request: web::Json<AdjustStockRequest>,
) -> Result<HttpResponse, AppError> {
    let item = service
        .adjust(&affiliate.0, &path.into_inner(), request.delta)
        .await?;

    Ok(HttpResponse::Ok().json(item))
}

/// Configure stock routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stock")
            .route("", web::post().to(add_item))
            .route("", web::get().to(list_items))
            .route("/{id}", web::patch().to(adjust_item)),
    );
}
