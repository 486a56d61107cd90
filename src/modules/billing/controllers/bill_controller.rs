use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::middleware::auth::AffiliateId;
use crate::modules::billing::models::CreateBillRequest;
use crate::modules::billing::services::BillService;

/// Query parameters for listing bills
#[derive(Debug, Deserialize)]
pub struct ListBillsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Create a new bill
/// POST /bills
pub async fn create_bill(
    service: web::Data<Arc<BillService>>,
    affiliate: AffiliateId,
    request: web::Json<CreateBillRequest>,
) -> Result<HttpResponse, AppError> {
    let bill = service
        .create_bill(&affiliate.0, request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(bill))
}

/// Get a bill by its bill number
/// GET /bills/{bill_number}
pub async fn get_bill(
    service: web::Data<Arc<BillService>>,
    affiliate: AffiliateId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let bill = service.get_bill(&affiliate.0, &path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(bill))
}

/// List bills for the authenticated affiliate
/// GET /bills
pub async fn list_bills(
    service: web::Data<Arc<BillService>>,
    affiliate: AffiliateId,
    query: web::Query<ListBillsQuery>,
) -> Result<HttpResponse, AppError> {
    let bills = service
        .list_bills(&affiliate.0, query.limit, query.offset)
        .await?;

    Ok(HttpResponse::Ok().json(bills))
}

/// Replace a bill's items and discount; the bill number never changes
/// PUT /bills/{bill_number}
pub async fn update_bill(
    service: web::Data<Arc<BillService>>,
    affiliate: AffiliateId,
    path: web::Path<String>,
    request: web::Json<CreateBillRequest>,
) -> Result<HttpResponse, AppError> {
    let bill = service
        .update_bill(&affiliate.0, &path.into_inner(), request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(bill))
}

/// Display breakdown of a bill
/// GET /bills/{bill_number}/breakdown
pub async fn get_breakdown(
    service: web::Data<Arc<BillService>>,
    affiliate: AffiliateId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = service
        .get_breakdown(&affiliate.0, &path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Configure bill routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bills")
            .route("", web::post().to(create_bill))
            .route("", web::get().to(list_bills))
            .route("/{bill_number}", web::get().to(get_bill))
            .route("/{bill_number}", web::put().to(update_bill))
            .route("/{bill_number}/breakdown", web::get().to(get_breakdown)),
    );
}
