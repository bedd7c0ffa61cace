use actix_web::{web, HttpRequest, HttpResponse, Responder};

use crate::models::{HealthResponse, MatchListResponse, MatchResponse, RespondMatchRequest};
use crate::routes::{authenticate, ApiError, AppState};

/// Configure health and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches", web::get().to(list_matches))
        .route("/matches", web::post().to(compute_matches))
        .route("/matches/{id}", web::patch().to(respond_to_match));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Every match the caller takes part in
///
/// GET /api/v1/matches
async fn list_matches(
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;

    let matches = state.matcher.matches_for(user_id).await?;
    Ok(HttpResponse::Ok().json(MatchListResponse::for_viewer(&matches, user_id)))
}

/// Run the matching pipeline for the caller
///
/// POST /api/v1/matches
///
/// Returns only the matches created by this run.
async fn compute_matches(
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;

    tracing::info!("Computing matches for user {}", user_id);
    let start = std::time::Instant::now();

    let result = state.matcher.compute_matches(user_id).await?;

    tracing::info!(
        "Created {} matches for user {} out of {} candidates in {}ms",
        result.matches.len(),
        user_id,
        result.total_candidates,
        start.elapsed().as_millis()
    );

    Ok(HttpResponse::Ok().json(MatchListResponse::for_viewer(&result.matches, user_id)))
}

/// Accept or reject a pending match
///
/// PATCH /api/v1/matches/{id}
///
/// Request body:
/// ```json
/// { "status": "accepted" }
/// ```
///
/// Anything other than the receiving user answering a pending match is a 404.
async fn respond_to_match(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    path: web::Path<i64>,
    req: web::Json<RespondMatchRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;

    let updated = state
        .matcher
        .respond_to_match(path.into_inner(), user_id, req.status)
        .await?;

    Ok(HttpResponse::Ok().json(MatchResponse::for_viewer(&updated, user_id)))
}
