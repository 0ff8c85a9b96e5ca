//! Configuration management for snwacademy.
//!
//! Configuration is loaded with figment from defaults, a TOML file and
//! `SNW_`-prefixed environment variables.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "snwacademy";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "formations.db";

/// Longest accepted admin session lifetime (one year).
pub const MAX_SESSION_TTL_HOURS: u32 = 24 * 365;

/// Largest accepted change feed buffer.
pub const MAX_FEED_CAPACITY: usize = 1 << 16;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SNW_`, sections split on `__`,
///    e.g. `SNW_LISTING__PREVIEW_COUNT=6`)
/// 2. TOML config file at `~/.config/snwacademy/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Formations listing configuration.
    pub listing: ListingConfig,
    /// Change feed configuration.
    pub feed: FeedConfig,
    /// Admin access configuration.
    pub admin: AdminConfig,
    /// Static site content.
    pub site: SiteConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/snwacademy/formations.db`
    pub database_path: Option<PathBuf>,
}

/// Formations listing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Number of formations shown before the "show all" toggle.
    pub preview_count: usize,
}

/// Change feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Buffered change events per subscriber before it is told to resync.
    pub capacity: usize,
    /// How often to look for commits made by other processes.
    /// Set to 0 to only observe local mutations.
    pub poll_interval_ms: u64,
}

/// Admin access configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Email the admin logs in with.
    pub email: String,
    /// BLAKE3 hex digest of the admin password (see `snw admin hash-password`).
    /// Login is refused while unset.
    pub password_hash: Option<String>,
    /// Session lifetime in hours.
    pub session_ttl_hours: u32,
}

/// Contact details and links rendered on the landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Academy display name.
    pub academy_name: String,
    /// City line shown in the footer.
    pub city: String,
    /// Postal address.
    pub address: String,
    /// Phone number as displayed.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// Opening hours.
    pub hours: String,
    /// WhatsApp number in international format, digits only.
    pub whatsapp_number: String,
    /// Prefilled WhatsApp message.
    pub whatsapp_message: String,
    /// Facebook page URL.
    pub facebook_url: String,
    /// Instagram profile URL.
    pub instagram_url: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { preview_count: 3 }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@snw-academy.ma".to_string(),
            password_hash: None,
            session_ttl_hours: 12,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            academy_name: "SNW Academy".to_string(),
            city: "Casablanca, Maroc".to_string(),
            address: "34 el rahal meskinni, Casablanca, Morocco".to_string(),
            phone: "0675-813557".to_string(),
            email: "souhailnadiri8@gmail.com".to_string(),
            hours: "du Lundi au Vendredi, 9h - 18h".to_string(),
            whatsapp_number: "212704784731".to_string(),
            whatsapp_message:
                "Bonjour, je souhaite avoir plus d'informations sur vos formations.".to_string(),
            facebook_url: "https://www.facebook.com/61553848922554".to_string(),
            instagram_url: "https://www.instagram.com/snw_academy/".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SNW_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.listing.preview_count == 0 {
            return Err(invalid("listing.preview_count must be greater than 0"));
        }

        if self.feed.capacity == 0 {
            return Err(invalid("feed.capacity must be greater than 0"));
        }
        if self.feed.capacity > MAX_FEED_CAPACITY {
            return Err(invalid(format!(
                "feed.capacity must be at most {MAX_FEED_CAPACITY}"
            )));
        }

        if self.admin.session_ttl_hours == 0 {
            return Err(invalid("admin.session_ttl_hours must be greater than 0"));
        }
        if self.admin.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(invalid(format!(
                "admin.session_ttl_hours must be at most {MAX_SESSION_TTL_HOURS}"
            )));
        }

        let email = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .map_err(|e| Error::internal(e.to_string()))?;
        if !email.is_match(&self.admin.email) {
            return Err(invalid(format!(
                "admin.email is not a valid address: {}",
                self.admin.email
            )));
        }

        if let Some(hash) = &self.admin.password_hash {
            let hex = Regex::new(r"^[0-9a-f]{64}$").map_err(|e| Error::internal(e.to_string()))?;
            if !hex.is_match(hash) {
                return Err(invalid(
                    "admin.password_hash must be a 64-character lowercase BLAKE3 hex digest",
                ));
            }
        }

        if !self.site.whatsapp_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("site.whatsapp_number must contain digits only"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the change poll interval, or `None` when polling is disabled.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        if self.feed.poll_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.feed.poll_interval_ms))
        }
    }

    /// Get the session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.admin.session_ttl_hours))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.listing.preview_count, 3);
        assert_eq!(config.feed.capacity, 64);
        assert!(config.admin.password_hash.is_none());
        assert_eq!(config.site.academy_name, "SNW Academy");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_preview_count() {
        let mut config = Config::default();
        config.listing.preview_count = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("preview_count"));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.admin.session_ttl_hours = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session_ttl_hours"));
    }

    #[test]
    fn test_validate_huge_ttl() {
        let mut config = Config::default();
        config.admin.session_ttl_hours = u32::MAX;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session_ttl_hours must be at most 8760"));

        config.admin.session_ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_huge_feed_capacity() {
        let mut config = Config::default();
        config.feed.capacity = usize::MAX;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("feed.capacity"));

        config.feed.capacity = MAX_FEED_CAPACITY;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_email() {
        let mut config = Config::default();
        config.admin.email = "not-an-email".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("admin.email"));
    }

    #[test]
    fn test_validate_password_hash() {
        let mut config = Config::default();
        config.admin.password_hash = Some("plaintext".to_string());
        assert!(config.validate().is_err());

        config.admin.password_hash = Some(crate::auth::hash_password("secret"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_whatsapp_number() {
        let mut config = Config::default();
        config.site.whatsapp_number = "+212 70".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("formations.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_poll_interval() {
        let mut config = Config::default();
        assert_eq!(config.poll_interval(), Some(Duration::from_millis(1000)));

        config.feed.poll_interval_ms = 0;
        assert!(config.poll_interval().is_none());
    }

    #[test]
    fn test_session_ttl() {
        assert_eq!(Config::default().session_ttl(), chrono::Duration::hours(12));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("snwacademy"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[listing]\npreview_count = 6\n\n[site]\nphone = \"0600-000000\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.listing.preview_count, 6);
        assert_eq!(config.site.phone, "0600-000000");
        assert_eq!(config.site.academy_name, "SNW Academy");
    }

    #[test]
    fn test_listing_config_deserialize() {
        let listing: ListingConfig = serde_json::from_str(r#"{"preview_count": 9}"#).unwrap();
        assert_eq!(listing.preview_count, 9);
    }
}
