use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use sha2::{Digest, Sha256};
use sqlx::{MySqlPool, Row};

use crate::core::AppError;

/// Authenticated affiliate id, extracted from request extensions
#[derive(Debug, Clone)]
pub struct AffiliateId(pub String);

impl FromRequest for AffiliateId {
    type Error = Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let affiliate = req.extensions().get::<AffiliateId>().cloned();
        ready(affiliate.ok_or_else(|| {
            Error::from(AppError::unauthorized("Request is not authenticated"))
        }))
    }
}

/// SHA-256 hex digest used to store and look up API keys
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

/// API key authentication middleware: resolves `X-API-Key` to an affiliate
pub struct ApiKeyAuth {
    pool: MySqlPool,
}

impl ApiKeyAuth {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddleware {
            service: Rc::new(service),
            pool: self.pool.clone(),
        }))
    }
}

pub struct ApiKeyAuthMiddleware<S> {
    service: Rc<S>,
    pool: MySqlPool,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let pool = self.pool.clone();

        Box::pin(async move {
            // Health probe stays unauthenticated
            let path = req.path();
            if path == "/health" || path == "/" {
                return svc.call(req).await;
            }

            let api_key = req
                .headers()
                .get("X-API-Key")
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| Error::from(AppError::unauthorized("Missing X-API-Key header")))?;

            let affiliate_id = lookup_affiliate(&pool, api_key)
                .await
                .map_err(Error::from)?;

            req.extensions_mut().insert(AffiliateId(affiliate_id));

            svc.call(req).await
        })
    }
}

async fn lookup_affiliate(pool: &MySqlPool, api_key: &str) -> Result<String, AppError> {
    let digest = hash_api_key(api_key);

    let row = sqlx::query("SELECT id FROM affiliates WHERE api_key_hash = ? AND approved = 1")
        .bind(&digest)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(row.try_get("id")?),
        None => Err(AppError::unauthorized("Invalid API key")),
    }
}
