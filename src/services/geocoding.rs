use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::services::cache::{CacheKey, CacheManager};

/// Errors that can occur when reverse geocoding
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Turns GPS coordinates into a city name
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `None` when the service knows no settlement at that point
    async fn city_for_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, GeocodingError>;
}

/// Address keys tried in order, most specific first
const CITY_KEYS: [&str; 5] = ["city", "town", "village", "county", "state"];

/// Client for a Nominatim-compatible reverse geocoding API
pub struct GeocodingClient {
    base_url: String,
    user_agent: String,
    client: Client,
    cache: Option<Arc<CacheManager>>,
}

impl GeocodingClient {
    /// Create a new geocoding client
    pub fn new(
        base_url: String,
        user_agent: String,
        timeout: Duration,
    ) -> Result<Self, GeocodingError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            user_agent,
            client,
            cache: None,
        })
    }

    /// Cache resolved cities, keyed by rounded coordinates
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocodingError> {
        let url = format!("{}/reverse", self.base_url.trim_end_matches('/'));
        let (lat, lon) = (latitude.to_string(), longitude.to_string());

        tracing::debug!("Reverse geocoding ({}, {})", latitude, longitude);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("zoom", "10"),
            ])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodingError::ApiError(format!(
                "Reverse geocoding failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        if !json.is_object() {
            return Err(GeocodingError::InvalidResponse(
                "Expected a JSON object".into(),
            ));
        }

        Ok(extract_city(&json))
    }
}

#[async_trait]
impl ReverseGeocoder for GeocodingClient {
    async fn city_for_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, GeocodingError> {
        let key = CacheKey::geocode(latitude, longitude);

        if let Some(cache) = &self.cache {
            if let Ok(city) = cache.get::<String>(&key).await {
                return Ok(Some(city));
            }
        }

        let city = self.lookup(latitude, longitude).await?;

        if let (Some(cache), Some(city)) = (&self.cache, &city) {
            if let Err(e) = cache.set(&key, city).await {
                tracing::warn!("Failed to cache geocoding result: {}", e);
            }
        }

        Ok(city)
    }
}

/// Pick the most specific settlement name from a reverse geocoding response
fn extract_city(json: &Value) -> Option<String> {
    let address = json.get("address")?;

    CITY_KEYS
        .iter()
        .filter_map(|key| address.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(title_case)
}

/// Upper-case the first letter of every word and lower-case the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("kota bandung"), "Kota Bandung");
        assert_eq!(title_case("JAKARTA SELATAN"), "Jakarta Selatan");
        assert_eq!(title_case("saint-étienne"), "Saint-Étienne");
    }

    #[test]
    fn test_extract_city_prefers_specific_keys() {
        let response = json!({
            "address": { "town": "cimahi", "state": "West Java" }
        });
        assert_eq!(extract_city(&response), Some("Cimahi".to_string()));

        let response = json!({
            "address": { "city": "  ", "county": "bogor" }
        });
        assert_eq!(extract_city(&response), Some("Bogor".to_string()));

        assert_eq!(extract_city(&json!({ "error": "Unable to geocode" })), None);
    }

    #[tokio::test]
    async fn test_city_for_coordinates_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("lat".into(), "-6.9".into()),
                mockito::Matcher::UrlEncoded("lon".into(), "107.6".into()),
                mockito::Matcher::UrlEncoded("format".into(), "jsonv2".into()),
                mockito::Matcher::UrlEncoded("addressdetails".into(), "1".into()),
                mockito::Matcher::UrlEncoded("zoom".into(), "10".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"address":{"city":"bandung","country":"Indonesia"}}"#)
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(CacheManager::in_memory(100, 60));
        let client = GeocodingClient::new(
            server.url(),
            "anon-match-test".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_cache(cache);

        let city = client.city_for_coordinates(-6.9, 107.6).await.unwrap();
        assert_eq!(city, Some("Bandung".to_string()));

        // Second lookup is served from the cache
        let city = client.city_for_coordinates(-6.9, 107.6).await.unwrap();
        assert_eq!(city, Some("Bandung".to_string()));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_city_for_coordinates_reports_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = GeocodingClient::new(
            server.url(),
            "anon-match-test".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let result = client.city_for_coordinates(1.0, 2.0).await;
        assert!(matches!(result, Err(GeocodingError::ApiError(_))));
    }
}
