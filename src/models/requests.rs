use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::games::PromptKind;
use crate::models::domain::{Gender, GenderPreference, UserId};

/// Request to register a user on first contact
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub gender: Option<Gender>,
    #[validate(range(min = 10, max = 120))]
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default, alias = "pref_gender", rename = "prefGender")]
    pub pref_gender: Option<GenderPreference>,
    #[validate(range(min = 10, max = 120))]
    #[serde(default, alias = "pref_age_min", rename = "prefAgeMin")]
    pub pref_age_min: Option<u8>,
    #[validate(range(min = 10, max = 120))]
    #[serde(default, alias = "pref_age_max", rename = "prefAgeMax")]
    pub pref_age_max: Option<u8>,
    #[serde(default, alias = "radius_km", rename = "radiusKm")]
    pub radius_km: Option<u16>,
}

/// Location update: either GPS coordinates or a manually typed city
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    #[serde(default)]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    #[serde(default)]
    pub longitude: Option<f64>,
    #[validate(length(min = 1, max = 100))]
    #[serde(default)]
    pub city: Option<String>,
}

/// Request carrying only the acting user, used by find/stop/quiz
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserActionRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
}

/// Answer to the current quiz question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
    #[validate(length(min = 1, max = 200))]
    pub answer: String,
}

/// Truth-or-dare draw
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TruthOrDareRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
    pub choice: PromptKind,
}
