use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    Coordinates, Preferences, ProfileField, UpdateProfileRequest, User, UserId, MAX_AGE, MIN_AGE,
    UNKNOWN_CITY,
};
use crate::services::geocoding::{title_case, ReverseGeocoder};
use crate::services::store::{ProfileStore, StoreError};

/// Errors raised while registering or editing a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found for user {0}")]
    NotFound(UserId),

    #[error("Age {0} is outside the allowed range")]
    InvalidAge(u8),

    #[error("Invalid age range: minimum {min} is greater than maximum {max}")]
    InvalidAgeRange { min: u8, max: u8 },

    #[error("Location needs both latitude and longitude, or a city name")]
    IncompleteLocation,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// How a user's location was supplied
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(Coordinates),
    City(String),
}

/// Profile registration on top of the profile store.
///
/// Writes go through the typed `ProfileField` updates only; status and
/// partner are never touched here.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    defaults: Preferences,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
        defaults: Preferences,
    ) -> Self {
        Self {
            store,
            geocoder,
            defaults,
        }
    }

    /// Create the profile on first contact; an existing profile is returned as is
    pub async fn register(&self, user_id: UserId) -> Result<User, ProfileError> {
        let user = self
            .store
            .create_default_profile(user_id, self.defaults)
            .await?;
        tracing::info!("Registered user {}", user_id);
        Ok(user)
    }

    pub async fn get(&self, user_id: UserId) -> Result<User, ProfileError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or(ProfileError::NotFound(user_id))
    }

    /// Apply a partial update.
    ///
    /// The resulting preferred age range is checked against the stored bound
    /// when only one side is supplied.
    pub async fn update(
        &self,
        user_id: UserId,
        request: &UpdateProfileRequest,
    ) -> Result<User, ProfileError> {
        let current = self.get(user_id).await?;

        let ages = [request.age, request.pref_age_min, request.pref_age_max];
        if let Some(age) = ages
            .into_iter()
            .flatten()
            .find(|age| !(MIN_AGE..=MAX_AGE).contains(age))
        {
            return Err(ProfileError::InvalidAge(age));
        }

        let min = request.pref_age_min.unwrap_or(current.preferences.min_age);
        let max = request.pref_age_max.unwrap_or(current.preferences.max_age);
        if min > max {
            return Err(ProfileError::InvalidAgeRange { min, max });
        }

        let fields = [
            request.gender.map(ProfileField::Gender),
            request.age.map(ProfileField::Age),
            request.pref_gender.map(ProfileField::PrefGender),
            request.pref_age_min.map(ProfileField::PrefAgeMin),
            request.pref_age_max.map(ProfileField::PrefAgeMax),
            request.radius_km.map(ProfileField::RadiusKm),
        ];

        for field in fields.into_iter().flatten() {
            self.store.upsert_profile_field(user_id, field).await?;
        }

        self.get(user_id).await
    }

    /// Record a location.
    ///
    /// Coordinates are reverse geocoded into a city (`"Unknown"` when the
    /// lookup fails or finds nothing). A typed city is title-cased and clears
    /// any stored coordinates.
    pub async fn set_location(
        &self,
        user_id: UserId,
        input: LocationInput,
    ) -> Result<User, ProfileError> {
        self.get(user_id).await?;

        match input {
            LocationInput::Coordinates(coords) => {
                let city = self.resolve_city(coords).await;
                self.store
                    .upsert_profile_field(user_id, ProfileField::Coordinates(Some(coords)))
                    .await?;
                self.store
                    .upsert_profile_field(user_id, ProfileField::Location(city))
                    .await?;
            }
            LocationInput::City(city) => {
                self.store
                    .upsert_profile_field(user_id, ProfileField::Location(title_case(city.trim())))
                    .await?;
                self.store
                    .upsert_profile_field(user_id, ProfileField::Coordinates(None))
                    .await?;
            }
        }

        self.get(user_id).await
    }

    async fn resolve_city(&self, coords: Coordinates) -> String {
        let Some(geocoder) = &self.geocoder else {
            return UNKNOWN_CITY.to_string();
        };

        match geocoder
            .city_for_coordinates(coords.latitude, coords.longitude)
            .await
        {
            Ok(Some(city)) => city,
            Ok(None) => UNKNOWN_CITY.to_string(),
            Err(e) => {
                tracing::warn!("Reverse geocoding failed, using {}: {}", UNKNOWN_CITY, e);
                UNKNOWN_CITY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, GenderPreference};
    use crate::services::geocoding::GeocodingError;
    use crate::services::memory::MemoryStore;
    use async_trait::async_trait;

    struct FixedGeocoder(Option<&'static str>);

    #[async_trait]
    impl ReverseGeocoder for FixedGeocoder {
        async fn city_for_coordinates(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<Option<String>, GeocodingError> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct FailingGeocoder;

    #[async_trait]
    impl ReverseGeocoder for FailingGeocoder {
        async fn city_for_coordinates(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<Option<String>, GeocodingError> {
            Err(GeocodingError::ApiError("down".to_string()))
        }
    }

    fn service(geocoder: Option<Arc<dyn ReverseGeocoder>>) -> ProfileService {
        ProfileService::new(Arc::new(MemoryStore::new()), geocoder, Preferences::default())
    }

    #[tokio::test]
    async fn test_update_applies_only_supplied_fields() {
        let service = service(None);
        service.register(1).await.unwrap();

        let request = UpdateProfileRequest {
            gender: Some(Gender::Male),
            age: Some(27),
            pref_gender: Some(GenderPreference::Female),
            ..Default::default()
        };
        let user = service.update(1, &request).await.unwrap();

        assert_eq!(user.gender, Gender::Male);
        assert_eq!(user.age, Some(27));
        assert_eq!(user.preferences.gender, GenderPreference::Female);
        assert_eq!(user.preferences.min_age, 18);
        assert_eq!(user.preferences.max_age, 50);
    }

    #[tokio::test]
    async fn test_update_rejects_inverted_age_range() {
        let service = service(None);
        service.register(1).await.unwrap();

        let request = UpdateProfileRequest {
            pref_age_min: Some(60),
            ..Default::default()
        };
        let result = service.update(1, &request).await;
        assert!(matches!(
            result,
            Err(ProfileError::InvalidAgeRange { min: 60, max: 50 })
        ));

        let user = service.get(1).await.unwrap();
        assert_eq!(user.preferences.min_age, 18);
    }

    #[tokio::test]
    async fn test_update_rejects_age_outside_bounds() {
        let service = service(None);
        service.register(1).await.unwrap();

        let request = UpdateProfileRequest {
            age: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            service.update(1, &request).await,
            Err(ProfileError::InvalidAge(9))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let service = service(None);
        let result = service.update(5, &UpdateProfileRequest::default()).await;
        assert!(matches!(result, Err(ProfileError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_coordinates_are_reverse_geocoded() {
        let service = service(Some(Arc::new(FixedGeocoder(Some("Bandung")))));
        service.register(1).await.unwrap();

        let user = service
            .set_location(1, LocationInput::Coordinates(Coordinates::new(-6.9, 107.6)))
            .await
            .unwrap();

        assert_eq!(user.location.as_deref(), Some("Bandung"));
        assert_eq!(user.coordinates, Some(Coordinates::new(-6.9, 107.6)));
    }

    #[tokio::test]
    async fn test_geocoding_miss_or_failure_records_unknown() {
        for geocoder in [
            Arc::new(FixedGeocoder(None)) as Arc<dyn ReverseGeocoder>,
            Arc::new(FailingGeocoder),
        ] {
            let service = service(Some(geocoder));
            service.register(1).await.unwrap();

            let user = service
                .set_location(1, LocationInput::Coordinates(Coordinates::new(0.0, 0.0)))
                .await
                .unwrap();
            assert_eq!(user.location.as_deref(), Some(UNKNOWN_CITY));
        }
    }

    #[tokio::test]
    async fn test_manual_city_clears_coordinates() {
        let service = service(Some(Arc::new(FixedGeocoder(Some("Bandung")))));
        service.register(1).await.unwrap();
        service
            .set_location(1, LocationInput::Coordinates(Coordinates::new(-6.9, 107.6)))
            .await
            .unwrap();

        let user = service
            .set_location(1, LocationInput::City("  surabaya ".to_string()))
            .await
            .unwrap();

        assert_eq!(user.location.as_deref(), Some("Surabaya"));
        assert_eq!(user.coordinates, None);
    }
}
