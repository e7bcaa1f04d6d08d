use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable numeric user identifier supplied by the chat platform
pub type UserId = i64;

/// Youngest age accepted for a profile or a preference bound
pub const MIN_AGE: u8 = 10;
/// Oldest age accepted for a profile or a preference bound
pub const MAX_AGE: u8 = 120;
/// City recorded when reverse geocoding cannot resolve a location
pub const UNKNOWN_CITY: &str = "Unknown";

/// Declared gender of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Partner gender a user is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender_preference", rename_all = "lowercase")]
pub enum GenderPreference {
    Male,
    Female,
    #[default]
    #[serde(alias = "all")]
    Any,
}

impl GenderPreference {
    #[inline]
    pub fn accepts(self, gender: Gender) -> bool {
        match self {
            GenderPreference::Any => true,
            GenderPreference::Male => gender == Gender::Male,
            GenderPreference::Female => gender == Gender::Female,
        }
    }
}

/// Matchmaking lifecycle state of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Idle,
    Searching,
    Chatting,
}

/// Geographic coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to another point in kilometers
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        crate::core::distance::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Partner preferences declared by a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "prefGender")]
    pub gender: GenderPreference,
    #[serde(rename = "prefAgeMin")]
    pub min_age: u8,
    #[serde(rename = "prefAgeMax")]
    pub max_age: u8,
    /// Maximum partner distance in kilometers, 0 means unlimited
    #[serde(rename = "radiusKm")]
    pub radius_km: u16,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            gender: GenderPreference::Any,
            min_age: 18,
            max_age: 50,
            radius_km: 0,
        }
    }
}

impl Preferences {
    /// Whether someone with the given gender and age satisfies these preferences
    #[inline]
    pub fn accepts(&self, gender: Gender, age: u8) -> bool {
        self.gender.accepts(gender) && age >= self.min_age && age <= self.max_age
    }
}

/// Persistent user profile and matchmaking state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub gender: Gender,
    pub age: Option<u8>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub status: UserStatus,
    #[serde(rename = "partnerId")]
    pub partner_id: Option<UserId>,
    pub preferences: Preferences,
}

impl User {
    /// A freshly created profile: idle, nothing declared yet
    pub fn new(user_id: UserId, preferences: Preferences) -> Self {
        Self {
            user_id,
            gender: Gender::Unknown,
            age: None,
            location: None,
            coordinates: None,
            status: UserStatus::Idle,
            partner_id: None,
            preferences,
        }
    }

    /// Gender, age and location are all declared
    pub fn is_complete(&self) -> bool {
        self.gender != Gender::Unknown
            && self.age.is_some()
            && self.location.as_deref().is_some_and(|city| !city.is_empty())
    }

    /// Apply a single typed field update
    pub fn apply(&mut self, field: &ProfileField) {
        match field {
            ProfileField::Gender(gender) => self.gender = *gender,
            ProfileField::Age(age) => self.age = Some(*age),
            ProfileField::Location(city) => self.location = Some(city.clone()),
            ProfileField::Coordinates(coords) => self.coordinates = *coords,
            ProfileField::PrefGender(pref) => self.preferences.gender = *pref,
            ProfileField::PrefAgeMin(age) => self.preferences.min_age = *age,
            ProfileField::PrefAgeMax(age) => self.preferences.max_age = *age,
            ProfileField::RadiusKm(radius) => self.preferences.radius_km = *radius,
        }
    }
}

/// The closed set of profile attributes a registration flow may set.
///
/// Status and partner are owned by the pairing engine and deliberately absent.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileField {
    Gender(Gender),
    Age(u8),
    Location(String),
    Coordinates(Option<Coordinates>),
    PrefGender(GenderPreference),
    PrefAgeMin(u8),
    PrefAgeMax(u8),
    RadiusKm(u16),
}

impl ProfileField {
    /// Human-readable name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ProfileField::Gender(_) => "gender",
            ProfileField::Age(_) => "age",
            ProfileField::Location(_) => "location",
            ProfileField::Coordinates(_) => "coordinates",
            ProfileField::PrefGender(_) => "pref_gender",
            ProfileField::PrefAgeMin(_) => "pref_age_min",
            ProfileField::PrefAgeMax(_) => "pref_age_max",
            ProfileField::RadiusKm(_) => "radius_km",
        }
    }
}

/// A user waiting in the match queue.
///
/// Gender and age are a snapshot taken at enqueue time and are not refreshed
/// when the profile changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub gender: Gender,
    pub age: u8,
    #[serde(rename = "enqueuedAt")]
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Snapshot a profile for queueing, `None` if the age is not declared
    pub fn snapshot(user: &User) -> Option<Self> {
        Some(Self {
            user_id: user.user_id,
            gender: user.gender,
            age: user.age?,
            enqueued_at: Utc::now(),
        })
    }
}

/// A queued user joined with their live profile attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub user_id: UserId,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub gender: Gender,
    pub age: u8,
    pub preferences: Preferences,
}

/// One side of an active chat link; the reciprocal record always exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "partnerId")]
    pub partner_id: UserId,
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    #[serde(rename = "pairedAt")]
    pub paired_at: DateTime<Utc>,
}

impl Pairing {
    /// The record seen from the partner's side
    pub fn reciprocal(&self) -> Pairing {
        Pairing {
            user_id: self.partner_id,
            partner_id: self.user_id,
            ..*self
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
