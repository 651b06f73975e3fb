//! HTTP client for the Climatix IC REST API.
//!
//! `ApiClient` performs exactly one attempt per call. Token handling and the
//! retry/re-login loop live in [`crate::auth::Session`].

use std::fmt;

use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;

use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

pub const TOKEN_PATH: &str = "/Token";
pub const PLANTS_PATH: &str = "/Plants";
pub const DATAPOINTS_PATH: &str = "/DataPoints";
pub const VALUES_PATH: &str = "/DataPoints/Values";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Body of an outgoing request.
#[derive(Clone)]
pub enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

impl fmt::Debug for RequestBody {
    // Form bodies carry the password grant, so only field names are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Form(fields) => f
                .debug_tuple("Form")
                .field(&fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
                .finish(),
            RequestBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

/// A single API call, replayable across retry attempts.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_form(path: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Form(fields),
        }
    }

    pub fn put_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Json(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// API client for Climatix IC.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client carrying the configured header set on every request.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(Self::default_headers(config)?)
            .build()?;

        Ok(Self::from_reqwest(&config.api_url, client))
    }

    /// Wrap an existing reqwest client.
    pub fn from_reqwest(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_headers(config: &Config) -> Result<header::HeaderMap, ApiError> {
        fn value(name: &str, raw: &str) -> Result<header::HeaderValue, ApiError> {
            header::HeaderValue::from_str(raw)
                .map_err(|e| ApiError::Config(format!("header {}: {}", name, e)))
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            value("Accept-Language", &config.accept_language)?,
        );
        headers.insert(header::CONTENT_TYPE, value("Content-Type", &config.content_type)?);
        headers.insert(header::USER_AGENT, value("User-Agent", &config.user_agent)?);

        if let Some(ref key) = config.subscription_key {
            let mut key = value(SUBSCRIPTION_KEY_HEADER, key)?;
            key.set_sensitive(true);
            headers.insert(SUBSCRIPTION_KEY_HEADER, key);
        }

        for (name, raw) in &config.extra_headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Config(format!("header name {:?}: {}", name, e)))?;
            headers.insert(name.clone(), value(name.as_str(), raw)?);
        }

        Ok(headers)
    }

    /// Send one attempt of `request` and parse the JSON response.
    pub async fn execute(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, path = %request.path, "Sending request");

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(ref fields) => builder.form(fields),
            RequestBody::Json(ref value) => builder.body(
                serde_json::to_vec(value)
                    .map_err(|e| ApiError::InvalidResponse(format!("unserializable body: {}", e)))?,
            ),
        };

        let response = Self::check_response(builder.send().await?).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{} returned malformed JSON: {}", request.path, e))
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_body_debug_hides_values() {
        let request = ApiRequest::post_form(
            TOKEN_PATH,
            vec![
                ("grant_type".to_string(), "password".to_string()),
                ("password".to_string(), "hunter2".to_string()),
            ],
        );
        let debug = format!("{:?}", request);
        assert!(debug.contains("grant_type"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_default_headers() {
        let config = Config {
            subscription_key: Some("secret-key".to_string()),
            extra_headers: [("X-Trace".to_string(), "1".to_string())].into_iter().collect(),
            ..Config::default()
        };
        let headers = ApiClient::default_headers(&config).unwrap();

        assert_eq!(headers[header::ACCEPT], "application/json");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(headers[SUBSCRIPTION_KEY_HEADER], "secret-key");
        assert!(headers[SUBSCRIPTION_KEY_HEADER].is_sensitive());
        assert_eq!(headers["x-trace"], "1");
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let config = Config {
            user_agent: "bad\nagent".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            ApiClient::default_headers(&config),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::from_reqwest("http://localhost:1234/", Client::new());
        assert_eq!(client.base_url(), "http://localhost:1234");
    }
}
