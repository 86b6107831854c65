/// HTTP surface for bridge-service
///
/// Thin wrappers over the content index, recommendation lifecycle and example
/// matcher. The member id arrives in the `X-Member-Id` header, set by the
/// gateway after authentication.
pub mod content;
pub mod examples;
pub mod health;
pub mod recommendations;

use actix_web::{web, HttpRequest};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{ExampleStore, ThresholdSource};
use crate::error::{AppError, Result};
use crate::services::{ContentIndex, ExampleMatcher, RecommendationService};

pub const MEMBER_ID_HEADER: &str = "X-Member-Id";
pub const API_PREFIX: &str = "/api/v1/bridge";
pub const MAX_LIMIT: i64 = 100;

/// Shared state for every handler
pub struct BridgeState {
    pub content: Arc<ContentIndex>,
    pub recommendations: Arc<RecommendationService>,
    pub examples: Arc<dyn ExampleStore>,
    pub matcher: Arc<ExampleMatcher>,
    pub thresholds: Arc<dyn ThresholdSource>,
}

/// Register every bridge route under the API prefix
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(API_PREFIX)
            .service(content::search_content)
            .service(content::recent_content)
            .service(content::high_support_content)
            .service(content::content_context)
            .service(content::upsert_content)
            .service(content::delete_content)
            .service(content::get_thresholds)
            .service(content::update_thresholds)
            .service(recommendations::get_active)
            .service(recommendations::get_history)
            .service(recommendations::get_stats)
            .service(recommendations::generate)
            .service(recommendations::transition)
            // similar must be registered before the {id} routes
            .service(examples::find_similar)
            .service(examples::create_example)
            .service(examples::get_example)
            .service(examples::rate_example)
            .service(examples::set_ideal_response)
            .service(examples::set_status),
    );
}

/// Member id from the identity header
pub fn member_id(req: &HttpRequest) -> Result<Uuid> {
    let raw = req
        .headers()
        .get(MEMBER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation(format!("missing {} header", MEMBER_ID_HEADER)))?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("invalid {} header", MEMBER_ID_HEADER)))
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIMIT)
}


#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn member_id_requires_valid_header() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((MEMBER_ID_HEADER, id.to_string()))
            .to_http_request();
        assert_eq!(member_id(&req).unwrap(), id);

        let missing = TestRequest::default().to_http_request();
        assert!(matches!(member_id(&missing), Err(AppError::Validation(_))));

        let garbled = TestRequest::default()
            .insert_header((MEMBER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(matches!(member_id(&garbled), Err(AppError::Validation(_))));
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(1000), MAX_LIMIT);
    }
}
