/// Content index API handlers
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{clamp_limit, BridgeState};
use crate::error::{AppError, Result};
use crate::models::{
    ContentDocument, ContentSearchResult, ContentType, Engagement, IndexedContent, SearchOptions,
    TrustThresholds, TrustTier,
};
use crate::services::content_index::DEFAULT_QUERY_LIMIT;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    /// Comma separated content types
    pub types: Option<String>,
    pub min_trust: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_hours")]
    pub hours: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct HighSupportQuery {
    #[serde(default = "default_min_sp")]
    pub min_sp: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub q: String,
    pub limit: Option<usize>,
}

fn default_limit() -> i64 {
    10
}

fn default_recent_hours() -> i64 {
    48
}

fn default_min_sp() -> i64 {
    5
}

#[derive(Debug, Deserialize)]
pub struct UpsertContentRequest {
    #[serde(flatten)]
    pub document: ContentDocument,
    #[serde(default)]
    pub engagement: Engagement,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ContentSearchResult>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContentListResponse {
    pub items: Vec<IndexedContent>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContentContextResponse {
    pub items: Vec<IndexedContent>,
    pub prompt: String,
}

fn parse_types(raw: Option<&str>) -> Result<Option<Vec<ContentType>>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    raw.split(',')
        .map(|t| t.trim().parse::<ContentType>())
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// GET /api/v1/bridge/content/search
#[get("/content/search")]
pub async fn search_content(
    query: web::Query<SearchQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let min_trust_tier = query
        .min_trust
        .as_deref()
        .map(str::parse::<TrustTier>)
        .transpose()?;

    let options = SearchOptions {
        types: parse_types(query.types.as_deref())?,
        min_trust_tier,
        limit: clamp_limit(query.limit),
        offset: query.offset.max(0),
    };

    let results = state.content.search(&query.q, &options).await?;
    let count = results.len();
    Ok(HttpResponse::Ok().json(SearchResponse { results, count }))
}

/// GET /api/v1/bridge/content/recent
#[get("/content/recent")]
pub async fn recent_content(
    query: web::Query<RecentQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let items = state
        .content
        .recent(query.hours, clamp_limit(query.limit))
        .await?;
    let count = items.len();
    Ok(HttpResponse::Ok().json(ContentListResponse { items, count }))
}

/// GET /api/v1/bridge/content/high-support
#[get("/content/high-support")]
pub async fn high_support_content(
    query: web::Query<HighSupportQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let items = state
        .content
        .high_support(query.min_sp, clamp_limit(query.limit))
        .await?;
    let count = items.len();
    Ok(HttpResponse::Ok().json(ContentListResponse { items, count }))
}

/// GET /api/v1/bridge/content/context
/// Content chosen for a question plus the rendered prompt block
#[get("/content/context")]
pub async fn content_context(
    query: web::Query<ContextQuery>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
    let items = state.content.content_for_query(&query.q, limit).await?;
    let prompt = crate::services::content_index::format_content_block(&items);
    Ok(HttpResponse::Ok().json(ContentContextResponse { items, prompt }))
}

/// POST /api/v1/bridge/content
#[post("/content")]
pub async fn upsert_content(
    body: web::Json<UpsertContentRequest>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let UpsertContentRequest {
        document,
        engagement,
    } = body.into_inner();

    if document.content_id.trim().is_empty() {
        return Err(AppError::Validation("content_id is required".to_string()));
    }

    let content = state.content.upsert(document, engagement).await?;
    Ok(HttpResponse::Ok().json(content))
}

/// DELETE /api/v1/bridge/content/{type}/{id}
#[delete("/content/{content_type}/{content_id}")]
pub async fn delete_content(
    path: web::Path<(String, String)>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let (content_type, content_id) = path.into_inner();
    let content_type: ContentType = content_type.parse()?;
    let removed = state.content.remove(content_type, &content_id).await?;
    debug!(content_type = %content_type, content_id = %content_id, removed, "Delete content");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": removed })))
}

/// GET /api/v1/bridge/settings/trust-thresholds
#[get("/settings/trust-thresholds")]
pub async fn get_thresholds(state: web::Data<BridgeState>) -> Result<HttpResponse> {
    let thresholds = state.thresholds.thresholds().await?;
    Ok(HttpResponse::Ok().json(thresholds))
}

/// PUT /api/v1/bridge/settings/trust-thresholds
/// Takes effect on the next upsert; stored rows are not reclassified.
#[put("/settings/trust-thresholds")]
pub async fn update_thresholds(
    body: web::Json<TrustThresholds>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let thresholds = body.into_inner().sanitized();
    state.thresholds.update_thresholds(&thresholds).await?;
    Ok(HttpResponse::Ok().json(thresholds))
}
