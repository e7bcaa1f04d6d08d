// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, Candidate, Coordinates, Gender, GenderPreference, Pairing, Preferences,
    ProfileField, QueueEntry, User, UserId, UserStatus, MAX_AGE, MIN_AGE, UNKNOWN_CITY,
};
pub use requests::{
    AnswerRequest, CreateUserRequest, LocationRequest, TruthOrDareRequest, UpdateProfileRequest,
    UserActionRequest,
};
pub use responses::{ErrorResponse, HealthResponse, PartnerResponse, PromptResponse, StopResponse};
