//! Configuration for Skydeck
//!
//! CLI arguments and environment variable handling using clap.
//! Every flag can also be set from the environment (or a `.env` file).

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::{ApiKeyValidator, SessionValidator};
use crate::feeds::FeedConfig;
use crate::records::RecordServiceConfig;
use crate::types::SkydeckError;

/// Skydeck - records API for the astronomy/weather/news dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "skydeck")]
#[command(about = "Records API and feed proxy for the Skydeck dashboard")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:4000")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store fallback, dev login, default secrets)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "skydeck")]
    pub mongodb_db: String,

    /// Shared application key expected in the X-API-Key header
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Secret used to verify session tokens (at least 32 characters)
    #[arg(long, env = "SESSION_SECRET")]
    pub session_secret: Option<String>,

    /// Lifetime of sessions minted by the dev login, in seconds
    #[arg(long, env = "SESSION_EXPIRY_SECONDS", default_value = "86400")]
    pub session_expiry_seconds: u64,

    /// Dashboard origin, used for CORS and the logout redirect
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    /// NASA APOD API key
    #[arg(long, env = "NASA_API_KEY", default_value = "DEMO_KEY")]
    pub nasa_api_key: String,

    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY")]
    pub openweather_api_key: Option<String>,

    /// Astronomy picture of the day endpoint
    #[arg(long, env = "NASA_API_URL", default_value = "https://api.nasa.gov/planetary/apod")]
    pub nasa_api_url: String,

    /// Current weather endpoint
    #[arg(
        long,
        env = "WEATHER_API_URL",
        default_value = "https://api.openweathermap.org/data/2.5/weather"
    )]
    pub weather_api_url: String,

    /// Space news articles endpoint
    #[arg(
        long,
        env = "NEWS_API_URL",
        default_value = "https://api.spaceflightnewsapi.net/v4/articles/"
    )]
    pub news_api_url: String,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Maximum number of records returned by a list call
    #[arg(long, env = "RECORD_LIST_LIMIT", default_value = "20")]
    pub record_list_limit: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.api_key.as_deref().map_or(true, str::is_empty) {
                return Err("API_KEY is required in production mode".to_string());
            }
            if self.session_secret.is_none() {
                return Err("SESSION_SECRET is required in production mode".to_string());
            }
        }

        if self.record_list_limit <= 0 {
            return Err("RECORD_LIST_LIMIT must be positive".to_string());
        }

        Ok(())
    }

    /// Build the session validator (dev secret when none is configured in dev mode)
    pub fn session_validator(&self) -> Result<SessionValidator, SkydeckError> {
        match (&self.session_secret, self.dev_mode) {
            (Some(secret), _) => {
                SessionValidator::new(secret.clone(), self.session_expiry_seconds)
            }
            (None, true) => Ok(SessionValidator::new_dev()),
            (None, false) => Err(SkydeckError::Config(
                "SESSION_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Settings injected into the record service
    pub fn record_service_config(&self) -> RecordServiceConfig {
        let api_key = match (&self.api_key, self.dev_mode) {
            (Some(key), _) => Some(key.clone()),
            (None, true) => Some("dev-api-key".to_string()),
            (None, false) => None,
        };

        RecordServiceConfig {
            api_keys: ApiKeyValidator::new(api_key),
            list_limit: self.record_list_limit,
        }
    }

    /// Settings for the upstream feed proxy
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            nasa_url: self.nasa_api_url.clone(),
            nasa_api_key: self.nasa_api_key.clone(),
            weather_url: self.weather_api_url.clone(),
            weather_api_key: self.openweather_api_key.clone().unwrap_or_default(),
            news_url: self.news_api_url.clone(),
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}
