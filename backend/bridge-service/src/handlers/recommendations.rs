/// Recommendation API handlers
///
/// Every route is scoped to the member in `X-Member-Id`; another member's
/// recommendation looks exactly like a missing one.
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{clamp_limit, member_id, BridgeState};
use crate::error::{AppError, Result};
use crate::models::{Recommendation, RecommendationFilter, RecommendationStatus, RecommendationType};

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<RecommendationStatus>,
    #[serde(rename = "type")]
    pub rec_type: Option<RecommendationType>,
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_stats_days")]
    pub since_days: i64,
}

fn default_limit() -> i64 {
    5
}

fn default_history_limit() -> i64 {
    20
}

fn default_stats_days() -> i64 {
    30
}

#[derive(Debug, Serialize)]
pub struct RecommendationListResponse {
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
}

impl From<Vec<Recommendation>> for RecommendationListResponse {
    fn from(recommendations: Vec<Recommendation>) -> Self {
        let count = recommendations.len();
        Self {
            recommendations,
            count,
        }
    }
}

/// GET /api/v1/bridge/recommendations
/// Active (pending, under nudge cap) recommendations, best first
#[get("/recommendations")]
pub async fn get_active(
    req: HttpRequest,
    query: web::Query<ActiveQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let member_id = member_id(&req)?;
    let recs = state
        .recommendations
        .active(member_id, clamp_limit(query.limit))
        .await?;
    Ok(HttpResponse::Ok().json(RecommendationListResponse::from(recs)))
}

/// GET /api/v1/bridge/recommendations/history
#[get("/recommendations/history")]
pub async fn get_history(
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let member_id = member_id(&req)?;
    let filter = RecommendationFilter {
        status: query.status,
        rec_type: query.rec_type,
        limit: Some(clamp_limit(query.limit)),
    };
    let recs = state.recommendations.list(member_id, &filter).await?;
    Ok(HttpResponse::Ok().json(RecommendationListResponse::from(recs)))
}

/// GET /api/v1/bridge/recommendations/stats
/// Platform-wide counts, for operators
#[get("/recommendations/stats")]
pub async fn get_stats(
    query: web::Query<StatsQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let stats = state
        .recommendations
        .statistics(query.since_days.max(1))
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// POST /api/v1/bridge/recommendations/generate
#[post("/recommendations/generate")]
pub async fn generate(req: HttpRequest, state: web::Data<BridgeState>) -> Result<HttpResponse> {
    let member_id = member_id(&req)?;
    let recs = state.recommendations.generate_for_member(member_id).await?;
    Ok(HttpResponse::Ok().json(RecommendationListResponse::from(recs)))
}

/// POST /api/v1/bridge/recommendations/{id}/{action}
///
/// `action` is one of `shown`, `acted-on`, `dismissed` or `nudge`. A
/// transition the state machine does not allow returns the row unchanged.
#[post("/recommendations/{id}/{action}")]
pub async fn transition(
    req: HttpRequest,
    path: web::Path<(Uuid, String)>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let member_id = member_id(&req)?;
    let (id, action) = path.into_inner();

    let owned = state
        .recommendations
        .get(id)
        .await?
        .filter(|rec| rec.member_id == member_id)
        .is_some();
    if !owned {
        return Err(AppError::NotFound(format!("recommendation {}", id)));
    }

    let updated = match action.as_str() {
        "shown" => {
            state
                .recommendations
                .transition(id, RecommendationStatus::Shown)
                .await?
        }
        "acted-on" => {
            state
                .recommendations
                .transition(id, RecommendationStatus::ActedOn)
                .await?
        }
        "dismissed" => {
            state
                .recommendations
                .transition(id, RecommendationStatus::Dismissed)
                .await?
        }
        "nudge" => state.recommendations.nudge(id).await?,
        other => {
            return Err(AppError::Validation(format!(
                "unknown recommendation action: {}",
                other
            )))
        }
    };

    debug!(id = %id, action = %action, "Recommendation action applied");
    // Deleted between the ownership check and the update
    let rec = updated.ok_or_else(|| AppError::NotFound(format!("recommendation {}", id)))?;
    Ok(HttpResponse::Ok().json(rec))
}
