// Route exports
pub mod games;
pub mod matches;
pub mod profiles;

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::core::{MatchError, Matcher};
use crate::games::{GameError, GameRegistry};
use crate::models::ErrorResponse;
use crate::services::{ProfileError, ProfileService, ProfileStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub profiles: ProfileService,
    pub matcher: Matcher,
    pub games: Arc<GameRegistry>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(profiles::configure)
            .configure(games::configure),
    );
}

/// Handler error rendered as a JSON `ErrorResponse`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::Match(e) => match e {
                MatchError::ProfileNotFound(_) => "profile_not_found",
                MatchError::ProfileIncomplete => "profile_incomplete",
                MatchError::AlreadyPaired => "already_paired",
                MatchError::AlreadyQueued => "already_queued",
                MatchError::StateConflict(_) => "state_conflict",
                MatchError::Store(_) => "store_error",
            },
            ApiError::Profile(e) => match e {
                ProfileError::NotFound(_) => "profile_not_found",
                ProfileError::InvalidAge(_) => "invalid_age",
                ProfileError::InvalidAgeRange { .. } => "invalid_age_range",
                ProfileError::IncompleteLocation => "invalid_location",
                ProfileError::Store(_) => "store_error",
            },
            ApiError::Game(e) => match e {
                GameError::NotPaired(_) => "not_paired",
                GameError::QuizAlreadyRunning => "quiz_running",
                GameError::NoActiveQuiz => "no_active_quiz",
                GameError::Throttled(_) => "throttled",
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Match(e) => match e {
                MatchError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
                MatchError::ProfileIncomplete => StatusCode::UNPROCESSABLE_ENTITY,
                MatchError::AlreadyPaired
                | MatchError::AlreadyQueued
                | MatchError::StateConflict(_) => StatusCode::CONFLICT,
                MatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Profile(e) => match e {
                ProfileError::NotFound(_) => StatusCode::NOT_FOUND,
                ProfileError::InvalidAge(_)
                | ProfileError::InvalidAgeRange { .. }
                | ProfileError::IncompleteLocation => StatusCode::BAD_REQUEST,
                ProfileError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Game(e) => match e {
                GameError::NotPaired(_) | GameError::QuizAlreadyRunning => StatusCode::CONFLICT,
                GameError::NoActiveQuiz => StatusCode::NOT_FOUND,
                GameError::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// Run `validator` rules on a request body
pub(crate) fn validated<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate().map_err(|errors| {
        tracing::info!("Validation failed: field_errors={:?}", errors);
        ApiError::Validation(errors.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StoreError;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ApiError::from(MatchError::ProfileIncomplete), 422),
            (ApiError::from(MatchError::AlreadyQueued), 409),
            (ApiError::from(MatchError::StateConflict("x".into())), 409),
            (ApiError::from(MatchError::ProfileNotFound(4)), 404),
            (
                ApiError::from(MatchError::Store(StoreError::InvalidData("x".into()))),
                500,
            ),
            (ApiError::from(ProfileError::InvalidAgeRange { min: 40, max: 20 }), 400),
            (ApiError::from(GameError::Throttled(2)), 429),
            (ApiError::Validation("bad".into()), 400),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code().as_u16(), status, "{}", error);
        }
    }
}
