// Flight search API client
// One call = one origin/destination/date-pair query against the offers search endpoint

use crate::offer::RawOffer;
use crate::windows::DateWindow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

pub const PRODUCTION_BASE_URL: &str = "https://api.amadeus.com";
pub const TEST_BASE_URL: &str = "https://test.api.amadeus.com";

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";

// Refresh the access token this long before the server-side expiry
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Invalid response body: {0}")]
    DecodeError(String),

    #[error("No offers for {origin}->{destination} on {departure_date}")]
    NoResults {
        origin: String,
        destination: String,
        departure_date: String,
    },

    #[error("Client initialization error: {0}")]
    InitError(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::DecodeError(err.to_string())
        } else {
            SearchError::NetworkError(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub window: DateWindow,
    pub adults: u32,
    pub currency: String,
}

impl SearchQuery {
    pub fn new(origin: &str, destination: &str, window: DateWindow, currency: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            window,
            adults: 1,
            currency: currency.to_string(),
        }
    }

    fn no_results(&self) -> SearchError {
        SearchError::NoResults {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_date: self.window.departure_date.to_string(),
        }
    }
}

#[async_trait]
pub trait FlightSearchClient: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawOffer>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct AmadeusConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_ms: u64,
    pub max_offers: u32,
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            base_url: PRODUCTION_BASE_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: 30_000,
            max_offers: 250,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlightOffersResponse {
    data: Vec<RawOffer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorBody {
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorEntry {
    title: Option<String>,
    detail: Option<String>,
}

// Best-effort human message out of an error response body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next())
        .and_then(|e| match (e.title, e.detail) {
            (Some(title), Some(detail)) => Some(format!("{}: {}", title, detail)),
            (title, detail) => title.or(detail),
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn status_error(status: reqwest::StatusCode, body: &str) -> SearchError {
    let message = error_message(body);
    match status.as_u16() {
        401 | 403 => SearchError::AuthError(message),
        429 => SearchError::RateLimitExceeded(message),
        code => SearchError::ApiResponseError {
            status_code: code,
            message,
        },
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct AmadeusClient {
    config: AmadeusConfig,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusClient {
    pub fn new(config: AmadeusConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SearchError::InitError(e.to_string()))?;

        Ok(Self {
            config,
            http,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn access_token(&self) -> Result<String, SearchError> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|token| Instant::now() < token.expires_at)
            .map(|token| token.value.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        debug!("Requesting new API access token");
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::AuthError(format!(
                "{} - {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *self.token.lock() = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl FlightSearchClient for AmadeusClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawOffer>, SearchError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(self.url(FLIGHT_OFFERS_PATH))
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", query.origin.clone()),
                ("destinationLocationCode", query.destination.clone()),
                ("departureDate", query.window.departure_date.to_string()),
                ("returnDate", query.window.return_date.to_string()),
                ("adults", query.adults.to_string()),
                ("currencyCode", query.currency.clone()),
                ("max", self.config.max_offers.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            // Token revoked or expired early; next call fetches a fresh one
            self.token.lock().take();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: FlightOffersResponse = response.json().await?;
        if body.data.is_empty() {
            return Err(query.no_results());
        }
        Ok(body.data)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_query_defaults_to_one_adult() {
        let window = DateWindow::starting(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        let query = SearchQuery::new("YYZ", "ZRH", window, "CAD");
        assert_eq!(query.adults, 1);
        assert_eq!(query.currency, "CAD");
    }

    #[test]
    fn test_error_message_from_api_body() {
        let body = r#"{"errors":[{
            "status": 400,
            "code": 477,
            "title": "INVALID FORMAT",
            "detail": "departureDate is in the past"
        }]}"#;
        assert_eq!(
            error_message(body),
            "INVALID FORMAT: departureDate is in the past"
        );
        assert_eq!(error_message("upstream timeout\n"), "upstream timeout");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(reqwest::StatusCode::UNAUTHORIZED, ""),
            SearchError::AuthError(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            SearchError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_GATEWAY, ""),
            SearchError::ApiResponseError { status_code: 502, .. }
        ));
    }

    #[test]
    fn test_decode_flight_offers_response() {
        let body = r#"{
            "meta": { "count": 1 },
            "data": [
                { "id": "1", "price": { "currency": "CAD", "total": "412.10" }, "itineraries": [] }
            ],
            "dictionaries": {}
        }"#;
        let response: FlightOffersResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].currency(), Some("CAD"));
    }

    #[test]
    fn test_decode_token_response() {
        let body = r#"{
            "type": "amadeusOAuth2Token",
            "username": "me",
            "access_token": "abc123",
            "expires_in": 1799,
            "state": "approved"
        }"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.expires_in, 1799);
    }

    #[test]
    fn test_client_builds_urls_without_double_slash() {
        let client = AmadeusClient::new(AmadeusConfig {
            base_url: format!("{}/", TEST_BASE_URL),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.url(FLIGHT_OFFERS_PATH),
            "https://test.api.amadeus.com/v2/shopping/flight-offers"
        );
    }
}
