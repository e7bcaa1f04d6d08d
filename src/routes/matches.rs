use actix_web::{web, HttpResponse};

use crate::models::{HealthResponse, PartnerResponse, StopResponse, UserActionRequest, UserId};
use crate::routes::{validated, ApiError, AppState};

/// Configure health and matchmaking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/match/find", web::post().to(find_match))
        .route("/match/stop", web::post().to(stop_match))
        .route("/match/partner/{user_id}", web::get().to(current_partner))
        .route("/match/stats", web::get().to(match_stats));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = match state.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Start searching for a partner
///
/// POST /api/v1/match/find
///
/// Request body:
/// ```json
/// { "userId": 42 }
/// ```
///
/// Response: `{"status":"paired","partnerId":7,"sessionId":"..."}` or
/// `{"status":"queued"}`
async fn find_match(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let outcome = state.matcher.request_match(req.user_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Leave the current chat or the queue
///
/// POST /api/v1/match/stop
async fn stop_match(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let released_partner_id = state.matcher.request_stop(req.user_id).await?;
    Ok(HttpResponse::Ok().json(StopResponse {
        released_partner_id,
    }))
}

/// GET /api/v1/match/partner/{user_id}
async fn current_partner(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let partner_id = state.matcher.current_partner(user_id).await?;

    Ok(HttpResponse::Ok().json(PartnerResponse {
        user_id,
        partner_id,
    }))
}

/// GET /api/v1/match/stats
async fn match_stats(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.matcher.stats().await?))
}
