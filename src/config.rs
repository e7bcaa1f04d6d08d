use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::MatcherSettings;
use crate::models::{GenderPreference, Preferences, MAX_AGE, MIN_AGE};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub geocoding: GeocodingSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub games: GamesSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Where profiles, queue entries and pairings live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// L2 cache; without it geocoding results are cached in-process only
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            endpoint: default_geocoding_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoding_timeout(),
        }
    }
}

fn default_true() -> bool { true }
fn default_geocoding_endpoint() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_user_agent() -> String { format!("anon-match/{}", env!("CARGO_PKG_VERSION")) }
fn default_geocoding_timeout() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default)]
    pub mutual_preferences: bool,
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
    #[serde(default)]
    pub default_pref_gender: GenderPreference,
    #[serde(default = "default_pref_age_min")]
    pub default_pref_age_min: u8,
    #[serde(default = "default_pref_age_max")]
    pub default_pref_age_max: u8,
    #[serde(default)]
    pub default_radius_km: u16,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            mutual_preferences: false,
            max_commit_retries: default_max_commit_retries(),
            default_pref_gender: GenderPreference::Any,
            default_pref_age_min: default_pref_age_min(),
            default_pref_age_max: default_pref_age_max(),
            default_radius_km: 0,
        }
    }
}

fn default_max_commit_retries() -> u32 { 3 }
fn default_pref_age_min() -> u8 { 18 }
fn default_pref_age_max() -> u8 { 50 }

impl MatchingSettings {
    /// Preferences given to newly created profiles
    pub fn default_preferences(&self) -> Preferences {
        Preferences {
            gender: self.default_pref_gender,
            min_age: self.default_pref_age_min,
            max_age: self.default_pref_age_max,
            radius_km: self.default_radius_km,
        }
    }

    pub fn matcher_settings(&self) -> MatcherSettings {
        MatcherSettings {
            mutual_preferences: self.mutual_preferences,
            max_commit_retries: self.max_commit_retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GamesSettings {
    #[serde(default = "default_answer_cooldown")]
    pub answer_cooldown_secs: u64,
}

impl Default for GamesSettings {
    fn default() -> Self {
        Self {
            answer_cooldown_secs: default_answer_cooldown(),
        }
    }
}

fn default_answer_cooldown() -> u64 { 2 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    /// `LOG_LEVEL` / `LOG_FORMAT` style overrides win over configured values
    pub fn with_overrides(mut self, level: Option<String>, format: Option<String>) -> Self {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = format.filter(|f| !f.trim().is_empty()) {
            self.format = format;
        }
        self
    }

    pub fn is_pretty(&self) -> bool {
        self.format.eq_ignore_ascii_case("pretty")
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with ANONMATCH__)
    /// 4. DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ANONMATCH__SERVER__PORT -> server.port
            .add_source(environment());

        with_database_url(builder)?.build()?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment());

        with_database_url(builder)?.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url (or DATABASE_URL) is required for the postgres backend".to_string(),
            ));
        }

        let matching = &self.matching;
        for (name, age) in [
            ("default_pref_age_min", matching.default_pref_age_min),
            ("default_pref_age_max", matching.default_pref_age_max),
        ] {
            if !(MIN_AGE..=MAX_AGE).contains(&age) {
                return Err(ConfigError::Message(format!(
                    "matching.{} ({}) must be within {}-{}",
                    name, age, MIN_AGE, MAX_AGE
                )));
            }
        }

        if matching.default_pref_age_min > matching.default_pref_age_max {
            return Err(ConfigError::Message(format!(
                "matching.default_pref_age_min ({}) exceeds default_pref_age_max ({})",
                matching.default_pref_age_min, matching.default_pref_age_max
            )));
        }

        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix("ANONMATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// The conventional DATABASE_URL wins over any configured url
fn with_database_url(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => builder.set_override("database.url", url),
        Err(_) => Ok(builder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_matching() {
        let matching = MatchingSettings::default();
        assert!(!matching.mutual_preferences);
        assert_eq!(matching.max_commit_retries, 3);
        assert_eq!(matching.default_preferences(), Preferences::default());
    }

    #[test]
    fn test_default_logging() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "json");
    }

    #[test]
    fn test_load_from_minimal_file() {
        let path = std::env::temp_dir().join(format!("anon-match-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[matching]
mutual_preferences = true
default_pref_gender = "female"

[games]
answer_cooldown_secs = 0
"#
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.database.backend, StoreBackend::Memory);
        assert!(settings.geocoding.enabled);
        assert!(settings.matching.mutual_preferences);
        assert_eq!(
            settings.matching.default_preferences().gender,
            GenderPreference::Female
        );
        assert_eq!(settings.games.answer_cooldown_secs, 0);
    }

    fn memory_settings() -> Settings {
        Settings {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: None,
            },
            database: DatabaseSettings::default(),
            cache: CacheSettings::default(),
            geocoding: GeocodingSettings::default(),
            matching: MatchingSettings::default(),
            games: GamesSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let mut settings = memory_settings();
        assert!(settings.validate().is_ok());

        settings.database.backend = StoreBackend::Postgres;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_age_bounds_are_validated() {
        let mut settings = memory_settings();
        settings.matching.default_pref_age_min = 5;
        assert!(settings.validate().is_err());

        let mut settings = memory_settings();
        settings.matching.default_pref_age_max = 121;
        assert!(settings.validate().is_err());

        let mut settings = memory_settings();
        settings.matching.default_pref_age_min = 40;
        settings.matching.default_pref_age_max = 30;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_logging_overrides() {
        let configured = LoggingSettings {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        };

        let kept = configured.clone().with_overrides(None, Some(" ".to_string()));
        assert_eq!(kept.level, "warn");
        assert!(kept.is_pretty());

        let overridden = configured.with_overrides(Some("debug".to_string()), Some("json".to_string()));
        assert_eq!(overridden.level, "debug");
        assert!(!overridden.is_pretty());
    }

    #[test]
    fn test_logging_section_is_read() {
        let path = std::env::temp_dir().join(format!("anon-match-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[server]\nhost = \"127.0.0.1\"\nport = 9000\n\n[logging]\nlevel = \"debug\"\nformat = \"pretty\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.is_pretty());
    }
}
