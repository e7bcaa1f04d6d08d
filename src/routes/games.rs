use actix_web::{web, HttpResponse};

use crate::games::{truth_or_dare, GameError};
use crate::models::{AnswerRequest, PromptResponse, TruthOrDareRequest, UserActionRequest, UserId};
use crate::routes::{validated, ApiError, AppState};

/// Configure mini-game routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/games/quiz", web::post().to(start_quiz))
        .route("/games/answer", web::post().to(answer))
        .route("/games/truth-or-dare", web::post().to(draw_prompt));
}

async fn partner_of(state: &AppState, user_id: UserId) -> Result<UserId, ApiError> {
    state
        .matcher
        .current_partner(user_id)
        .await?
        .ok_or_else(|| GameError::NotPaired(user_id).into())
}

/// POST /api/v1/games/quiz
async fn start_quiz(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let partner_id = partner_of(&state, req.user_id).await?;
    let question = state.games.start_quiz(req.user_id, partner_id).await?;
    Ok(HttpResponse::Ok().json(question))
}

/// POST /api/v1/games/answer
///
/// Request body:
/// ```json
/// { "userId": 42, "answer": "mars" }
/// ```
async fn answer(
    state: web::Data<AppState>,
    req: web::Json<AnswerRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let partner_id = partner_of(&state, req.user_id).await?;
    let outcome = state
        .games
        .answer(req.user_id, partner_id, &req.answer)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/v1/games/truth-or-dare
async fn draw_prompt(
    state: web::Data<AppState>,
    req: web::Json<TruthOrDareRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    partner_of(&state, req.user_id).await?;
    Ok(HttpResponse::Ok().json(PromptResponse {
        kind: req.choice,
        prompt: truth_or_dare(req.choice).to_string(),
    }))
}
