use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::EngineError;
use crate::models::{
    ApiResponse, BatchRecommendationsRequest, CachedRecommendationsQuery, DateRange, ErrorResponse,
    GenerateRecommendationsRequest, HealthResponse, PerformanceQuery, RecordOutcomeRequest,
    RecordOutcomeResponse, SimilarCandidatesQuery,
};
use crate::services::{CandidateInput, RecommendationService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
}

/// Configure all recommendation routes
///
/// Literal segments are registered before `{candidate_id}` so they are not
/// swallowed by it.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/recommendations", web::post().to(generate_recommendations))
        .route("/recommendations/performance", web::get().to(performance_report))
        .route("/recommendations/batch", web::post().to(batch_recommendations))
        .route("/recommendations/events", web::post().to(record_outcome))
        .route(
            "/recommendations/internship/{internship_id}/candidates",
            web::get().to(similar_candidates),
        )
        .route("/recommendations/{candidate_id}", web::get().to(cached_recommendations))
        .route(
            "/recommendations/{candidate_id}/cache",
            web::delete().to(invalidate_cache),
        );
}

fn validation_failed(message: impl ToString) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        success: false,
        error: "validation_error".to_string(),
        message: message.to_string(),
        status_code: 400,
    })
}

/// Map engine errors onto status codes
fn error_status(e: &EngineError) -> StatusCode {
    match e {
        EngineError::Validation(_) | EngineError::BatchEmpty | EngineError::BatchTooLarge { .. } => {
            StatusCode::BAD_REQUEST
        }
        EngineError::CandidateNotFound(_) | EngineError::InternshipNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ComputationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Aborted(_) | EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &EngineError) -> HttpResponse {
    let status = error_status(e);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    }

    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        error: e.code().to_string(),
        message: e.to_string(),
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.service.health_check().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Generate recommendations
///
/// POST /api/v1/recommendations
///
/// Request body carries exactly one of `candidateId` or `candidateProfile`:
/// ```json
/// {
///   "candidateId": "string",
///   "limit": 5,
///   "forceRefresh": false
/// }
/// ```
async fn generate_recommendations(
    state: web::Data<AppState>,
    req: web::Json<GenerateRecommendationsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for generate request: {:?}", errors);
        return validation_failed(errors);
    }

    let req = req.into_inner();
    let input = match (req.candidate_id, req.candidate_profile) {
        (Some(id), None) => CandidateInput::Id(id),
        (None, Some(profile)) => CandidateInput::Profile(profile.into_candidate()),
        _ => return validation_failed("exactly one of candidateId or candidateProfile is required"),
    };

    match state
        .service
        .generate_recommendations(input, req.limit, req.force_refresh.unwrap_or(false))
        .await
    {
        Ok(generated) => {
            let count = generated.recommendations.matches.len();
            tracing::info!(
                "Returning {} recommendations for {} (cached: {})",
                count,
                generated.recommendations.candidate_id,
                generated.cached
            );
            HttpResponse::Ok().json(ApiResponse::with_meta(
                generated.recommendations,
                count,
                Some(generated.cached),
            ))
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/recommendations/{candidate_id}?limit&refresh
async fn cached_recommendations(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CachedRecommendationsQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    let candidate_id = path.into_inner();
    match state
        .service
        .get_cached_recommendations(&candidate_id, query.limit, query.refresh.unwrap_or(false))
        .await
    {
        Ok(generated) => {
            let count = generated.recommendations.matches.len();
            HttpResponse::Ok().json(ApiResponse::with_meta(
                generated.recommendations,
                count,
                Some(generated.cached),
            ))
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/recommendations/internship/{internship_id}/candidates?limit
async fn similar_candidates(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<SimilarCandidatesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    match state.service.get_similar_candidates(&path.into_inner(), query.limit).await {
        Ok(ranked) => {
            let count = ranked.len();
            HttpResponse::Ok().json(ApiResponse::with_meta(ranked, count, None))
        }
        Err(e) => error_response(&e),
    }
}

/// Batch recommendations
///
/// POST /api/v1/recommendations/batch
///
/// ```json
/// {
///   "candidateIds": ["string"],
///   "limit": 5
/// }
/// ```
async fn batch_recommendations(
    state: web::Data<AppState>,
    req: web::Json<BatchRecommendationsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.service.batch_recommendations(&req.candidate_ids, req.limit).await {
        Ok(report) => {
            let count = report.summary.successful;
            HttpResponse::Ok().json(ApiResponse::with_meta(report, count, None))
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/recommendations/performance?from&to
async fn performance_report(
    state: web::Data<AppState>,
    query: web::Query<PerformanceQuery>,
) -> impl Responder {
    let range = DateRange::from(query.into_inner());

    match state.service.performance_report(range).await {
        Ok(report) => HttpResponse::Ok().json(ApiResponse::ok(report)),
        Err(e) => error_response(&e),
    }
}

/// Record a recommendation outcome
///
/// POST /api/v1/recommendations/events
///
/// ```json
/// {
///   "candidateId": "string",
///   "internshipId": "string",
///   "outcome": "applied|accepted|dropped",
///   "matchScore": 72
/// }
/// ```
async fn record_outcome(
    state: web::Data<AppState>,
    req: web::Json<RecordOutcomeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.service.record_outcome(req.into_inner().into_event()).await {
        Ok(event_id) => HttpResponse::Ok().json(RecordOutcomeResponse {
            success: true,
            event_id: event_id.to_string(),
        }),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/v1/recommendations/{candidate_id}/cache
async fn invalidate_cache(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.service.invalidate_candidate(&path.into_inner()).await {
        Ok(invalidated) => HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
            "invalidated": invalidated
        }))),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (EngineError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (EngineError::BatchEmpty, StatusCode::BAD_REQUEST),
            (EngineError::BatchTooLarge { size: 60, max: 50 }, StatusCode::BAD_REQUEST),
            (EngineError::CandidateNotFound("c".to_string()), StatusCode::NOT_FOUND),
            (EngineError::InternshipNotFound("i".to_string()), StatusCode::NOT_FOUND),
            (
                EngineError::ComputationTimeout {
                    candidate_id: "c".to_string(),
                    timeout_ms: 10,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (EngineError::Aborted("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(error_response(&error).status(), status, "{:?}", error);
        }
    }
}
