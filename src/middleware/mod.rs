pub mod auth;
pub mod request_id;

pub use auth::{hash_api_key, AffiliateId, ApiKeyAuth};
pub use request_id::RequestId;
