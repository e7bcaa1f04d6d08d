use actix_web::{web, HttpResponse};

use crate::models::{Coordinates, CreateUserRequest, LocationRequest, UpdateProfileRequest, UserId};
use crate::routes::{validated, ApiError, AppState};
use crate::services::{LocationInput, ProfileError};

/// Configure profile registration routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users", web::post().to(create_user))
        .route("/users/{user_id}", web::get().to(get_user))
        .route("/users/{user_id}", web::patch().to(update_user))
        .route("/users/{user_id}/location", web::put().to(set_location));
}

/// Create a profile on first contact; repeated calls return the stored profile
///
/// POST /api/v1/users
async fn create_user(
    state: web::Data<AppState>,
    req: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let user = state.profiles.register(req.user_id).await?;
    Ok(HttpResponse::Created().json(user))
}

async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
) -> Result<HttpResponse, ApiError> {
    let user = state.profiles.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PATCH /api/v1/users/{user_id}
///
/// Request body (every field optional):
/// ```json
/// { "gender": "female", "age": 24, "prefGender": "any", "prefAgeMin": 20, "prefAgeMax": 30, "radiusKm": 25 }
/// ```
async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let user = state.profiles.update(path.into_inner(), &req).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PUT /api/v1/users/{user_id}/location
///
/// Either `{"latitude": -6.9, "longitude": 107.6}` or `{"city": "bandung"}`
async fn set_location(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    req: web::Json<LocationRequest>,
) -> Result<HttpResponse, ApiError> {
    validated(&*req)?;

    let req = req.into_inner();
    let input = match (req.latitude, req.longitude, req.city) {
        (Some(latitude), Some(longitude), _) => {
            LocationInput::Coordinates(Coordinates::new(latitude, longitude))
        }
        (None, None, Some(city)) if !city.trim().is_empty() => LocationInput::City(city),
        _ => return Err(ProfileError::IncompleteLocation.into()),
    };

    let user = state.profiles.set_location(path.into_inner(), input).await?;
    Ok(HttpResponse::Ok().json(user))
}
