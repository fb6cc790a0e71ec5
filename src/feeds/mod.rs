//! Feed proxy
//!
//! Thin pass-through to the public APIs the dashboard reads: NASA APOD,
//! OpenWeatherMap current weather and the Spaceflight News API. Keys stay
//! on the server; the browser only ever talks to us.
//!
//! Responses are relayed as JSON. Only two pieces of shaping happen here:
//! OpenWeatherMap reports lookup failures inside a 200 body (`cod`), and the
//! news API wraps articles in a paginated envelope.

use std::time::Duration;

use hyper::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, error, info};

/// Upstream endpoints and credentials
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub nasa_url: String,
    pub nasa_api_key: String,
    pub weather_url: String,
    pub weather_api_key: String,
    pub news_url: String,
    /// Per-request timeout for upstream calls
    pub timeout: Duration,
}

/// Articles requested from the news API
const NEWS_LIMIT: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("City parameter required")]
    MissingCity,

    /// Upstream answered but refused the lookup (unknown city, bad key)
    #[error("{0}")]
    Rejected(String),

    /// Could not reach the upstream or read its body
    #[error("{0}")]
    Transport(String),
}

impl FeedError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCity | Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_json_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// HTTP client for the upstream feeds
#[derive(Debug, Clone)]
pub struct FeedClient {
    config: FeedConfig,
    http_client: reqwest::Client,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("skydeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    /// Astronomy picture of the day; `count` asks for that many random entries
    pub async fn nasa(&self, count: Option<&str>) -> Result<Value, FeedError> {
        let mut query = vec![("api_key", self.config.nasa_api_key.as_str())];
        if let Some(count) = count.filter(|c| !c.is_empty()) {
            query.push(("count", count));
        }

        let body = self.get_json(&self.config.nasa_url, &query).await.map_err(|e| {
            error!(error = %e, "NASA proxy failed");
            e
        })?;
        info!("NASA data loaded");
        Ok(body)
    }

    /// Current weather for a city, metric units
    pub async fn weather(&self, city: Option<&str>) -> Result<Value, FeedError> {
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(FeedError::MissingCity)?;

        let query = [
            ("q", city),
            ("appid", self.config.weather_api_key.as_str()),
            ("units", "metric"),
        ];
        let body = self
            .get_json(&self.config.weather_url, &query)
            .await
            .map_err(|e| {
                error!(error = %e, "Weather proxy failed");
                e
            })?;

        let body = check_weather_response(body)?;
        info!(city = %city, "Weather data loaded");
        Ok(body)
    }

    /// Latest spaceflight news articles
    pub async fn news(&self) -> Result<Value, FeedError> {
        let limit = NEWS_LIMIT.to_string();
        let body = self
            .get_json(&self.config.news_url, &[("limit", limit.as_str())])
            .await
            .map_err(|e| {
                error!(error = %e, "News proxy failed");
                e
            })?;

        let articles = extract_news_articles(body);
        info!(
            count = articles.as_array().map(Vec::len).unwrap_or(0),
            "News data loaded"
        );
        Ok(articles)
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FeedError> {
        debug!(url = %url, "Fetching upstream feed");

        let response = self.http_client.get(url).query(query).send().await?;
        Ok(response.json::<Value>().await?)
    }
}

/// Turn an OpenWeatherMap error body into `Rejected`.
///
/// The API puts its own status in `cod`: the number 200 on success, usually
/// a string such as `"404"` on failure. A missing or blank `cod` passes.
pub fn check_weather_response(body: Value) -> Result<Value, FeedError> {
    let ok = match body.get("cod") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Number(n)) => n.as_u64() == Some(200) || n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if ok {
        return Ok(body);
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Weather lookup failed")
        .to_string();
    Err(FeedError::Rejected(message))
}

/// Unwrap the paginated envelope if there is one
pub fn extract_news_articles(mut body: Value) -> Value {
    match body.get_mut("results") {
        Some(results) if !results.is_null() => results.take(),
        _ => body,
    }
}
