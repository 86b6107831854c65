/// Curated example API handlers
use actix_web::{get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clamp_limit, BridgeState};
use crate::error::{AppError, Result};
use crate::models::{ExampleRatings, ExampleStatus, SimilarQuery, TrainingExample};

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub q: String,
    pub status: Option<ExampleStatus>,
    #[serde(default = "default_similar_limit")]
    pub limit: i64,
}

fn default_similar_limit() -> i64 {
    3
}

#[derive(Debug, Deserialize)]
pub struct CreateExampleRequest {
    pub question: String,
    pub bridge_response: String,
}

#[derive(Debug, Deserialize)]
pub struct IdealResponseRequest {
    pub ideal_response: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ExampleStatus,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub examples: Vec<TrainingExample>,
    pub count: usize,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("example {}", id))
}

/// GET /api/v1/bridge/examples/similar
#[get("/examples/similar")]
pub async fn find_similar(
    query: web::Query<SimilarParams>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let options = SimilarQuery {
        status: query.status.unwrap_or(ExampleStatus::Approved),
        limit: clamp_limit(query.limit),
    };
    let examples = state.matcher.find_similar(&query.q, &options).await?;
    let count = examples.len();
    Ok(HttpResponse::Ok().json(SimilarResponse { examples, count }))
}

/// POST /api/v1/bridge/examples
#[post("/examples")]
pub async fn create_example(
    body: web::Json<CreateExampleRequest>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    if body.question.trim().is_empty() {
        return Err(AppError::Validation("question is required".to_string()));
    }

    let example = TrainingExample::new(body.question, body.bridge_response);
    state.examples.create(&example).await?;
    Ok(HttpResponse::Created().json(example))
}

/// GET /api/v1/bridge/examples/{id}
#[get("/examples/{id}")]
pub async fn get_example(
    path: web::Path<Uuid>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let example = state.examples.get(id).await?.ok_or_else(|| not_found(id))?;
    Ok(HttpResponse::Ok().json(example))
}

/// POST /api/v1/bridge/examples/{id}/rating
#[post("/examples/{id}/rating")]
pub async fn rate_example(
    path: web::Path<Uuid>,
    body: web::Json<ExampleRatings>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let example = state
        .examples
        .rate(id, body.into_inner())
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(HttpResponse::Ok().json(example))
}

/// PUT /api/v1/bridge/examples/{id}/ideal-response
#[put("/examples/{id}/ideal-response")]
pub async fn set_ideal_response(
    path: web::Path<Uuid>,
    body: web::Json<IdealResponseRequest>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let example = state
        .examples
        .set_ideal_response(id, body.ideal_response.trim())
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(HttpResponse::Ok().json(example))
}

/// PUT /api/v1/bridge/examples/{id}/status
#[put("/examples/{id}/status")]
pub async fn set_status(
    path: web::Path<Uuid>,
    body: web::Json<StatusRequest>,
    state: web::Data<BridgeState>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let example = state
        .examples
        .set_status(id, body.status)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(HttpResponse::Ok().json(example))
}

#[cfg(test)]
mod tests {
    use crate::handlers::{configure, test_support};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn curated_example_becomes_findable() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/bridge/examples")
            .set_json(json!({
                "question": "How do I start a cooperative?",
                "bridge_response": "I am not sure."
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/bridge/examples/{}/rating", id))
            .set_json(json!({ "helpfulness": 1, "accuracy": 2, "tone": 3 }))
            .to_request();
        let rated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rated["status"], "reviewed");
        assert_eq!(rated["quality_score"], 40);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/bridge/examples/{}/ideal-response", id))
            .set_json(json!({ "ideal_response": "Gather founding members, then draft bylaws for the cooperative." }))
            .to_request();
        test::call_service(&app, req).await;

        // Not approved yet
        let req = test::TestRequest::get()
            .uri("/api/v1/bridge/examples/similar?q=cooperative")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 0);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/bridge/examples/{}/status", id))
            .set_json(json!({ "status": "approved" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/bridge/examples/similar?q=How%20do%20I%20start%20a%20cooperative%3F")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["examples"][0]["id"], id.as_str());
    }

    #[actix_rt::test]
    async fn unknown_example_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/bridge/examples/{}", uuid::Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
