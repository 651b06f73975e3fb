//! Session manager: bearer token lifecycle, plant discovery and the
//! retry/re-login loop every API call goes through.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::client::{PLANTS_PATH, TOKEN_PATH};
use crate::api::{ApiClient, ApiError, ApiRequest, RetryPolicy};
use crate::config::Config;
use crate::models::{Plant, PlantsResponse};

use super::credentials::Credentials;
use super::store::{FileTokenStore, TokenStore};
use super::token::{SessionToken, TokenResponse};

/// Where the session stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    NoToken,
    Valid,
    /// Token exists but is inside the refresh margin or past expiry.
    ExpiringSoon,
    /// The API rejected the credentials; no further logins are attempted.
    Unauthenticated,
}

#[derive(Default)]
struct AuthSlot {
    token: Option<SessionToken>,
    /// The token store is only consulted on the first login of a session.
    store_consulted: bool,
    rejected: Option<String>,
    /// Set once the API has accepted the password in this session.
    password_accepted: bool,
}

pub struct Session {
    api: ApiClient,
    credentials: Credentials,
    store: Box<dyn TokenStore>,
    retry: RetryPolicy,
    refresh_margin: Duration,
    tz: Tz,
    auth: Mutex<AuthSlot>,
    plant_id: OnceLock<String>,
}

impl Session {
    /// Session persisting its token to the configured token file.
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, ApiError> {
        let path = config
            .token_path()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Self::with_store(config, credentials, Box::new(FileTokenStore::new(path)))
    }

    pub fn with_store(
        config: &Config,
        credentials: Credentials,
        store: Box<dyn TokenStore>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new(config)?,
            credentials,
            store,
            retry: config.retry_policy(),
            refresh_margin: config.refresh_margin(),
            tz: config.tz()?,
            auth: Mutex::new(AuthSlot::default()),
            plant_id: OnceLock::new(),
        })
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    pub async fn state(&self) -> AuthState {
        let slot = self.auth.lock().await;
        if slot.rejected.is_some() {
            return AuthState::Unauthenticated;
        }
        match slot.token {
            None => AuthState::NoToken,
            Some(ref token) if token.needs_refresh_at(Utc::now(), self.refresh_margin) => {
                AuthState::ExpiringSoon
            }
            Some(_) => AuthState::Valid,
        }
    }

    /// Whether a password grant succeeded in this session. A login served
    /// from the token store leaves this false.
    pub async fn password_accepted(&self) -> bool {
        self.auth.lock().await.password_accepted
    }

    pub async fn token_expires_at(&self) -> Option<DateTime<Tz>> {
        self.auth.lock().await.token.as_ref().map(|t| t.expires_at())
    }

    /// Reuse a stored token if one is still valid, otherwise exchange the
    /// credentials for a new one; then resolve the plant id.
    pub async fn login(&self) -> Result<(), ApiError> {
        let mut slot = self.auth.lock().await;
        self.login_locked(&mut slot, true).await
    }

    /// Log in again if there is no token or it is inside the refresh margin.
    /// A valid token causes no network traffic.
    pub async fn validate_and_refresh(&self) -> Result<(), ApiError> {
        self.fresh_token().await.map(|_| ())
    }

    /// Drop the in-memory token and the persisted copy.
    pub async fn clear_token(&self) -> Result<(), ApiError> {
        let mut slot = self.auth.lock().await;
        slot.token = None;
        slot.store_consulted = true;
        self.store
            .clear()
            .map_err(|e| ApiError::Config(format!("clearing token store: {:#}", e)))
    }

    /// The plant id, discovering it first if no login has resolved it yet.
    pub async fn plant_id(&self) -> Result<String, ApiError> {
        if let Some(id) = self.plant_id.get() {
            return Ok(id.clone());
        }
        let plants = self.plants().await?;
        self.adopt_plant(plants)
    }

    /// All plants registered to the account.
    pub async fn plants(&self) -> Result<Vec<Plant>, ApiError> {
        let value = self.request(&ApiRequest::get(PLANTS_PATH)).await?;
        parse_plants(value)
    }

    /// Issue `request` with a valid token and the retry policy: one pass of
    /// attempts, a fresh login when the pass is exhausted, then one more pass.
    pub async fn request(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let started = Instant::now();
        let mut attempts = 0;

        let token = self.fresh_token().await?;
        let err = match self
            .run_pass(request, Some(token.access_token()), started, &mut attempts)
            .await
        {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() || e.is_auth_failure() => e,
            Err(e) => return Err(e),
        };

        if !self.retry.has_budget(started) {
            return Err(ApiError::Unreachable {
                attempts,
                reason: err.to_string(),
            });
        }

        warn!(path = %request.path, error = %err, "Max retries reached, logging in again");
        let token = self.relogin().await?;

        match self
            .run_pass(request, Some(token.access_token()), started, &mut attempts)
            .await
        {
            Ok(value) => Ok(value),
            Err(e) if e.is_retryable() => Err(ApiError::Unreachable {
                attempts,
                reason: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    // ===== Token lifecycle =====

    async fn fresh_token(&self) -> Result<SessionToken, ApiError> {
        let mut slot = self.auth.lock().await;
        match slot.token {
            Some(ref token) if !token.needs_refresh_at(Utc::now(), self.refresh_margin) => {
                return Ok(token.clone());
            }
            Some(_) => info!("Token about to expire, logging in again"),
            None => debug!("No token yet, logging in"),
        }

        self.login_locked(&mut slot, true).await?;
        slot.token
            .clone()
            .ok_or_else(|| ApiError::Unauthenticated("login produced no token".to_string()))
    }

    async fn relogin(&self) -> Result<SessionToken, ApiError> {
        let mut slot = self.auth.lock().await;
        // A token the API stopped answering to must not be revived from disk.
        slot.store_consulted = true;
        self.login_locked(&mut slot, false).await?;
        slot.token
            .clone()
            .ok_or_else(|| ApiError::Unauthenticated("login produced no token".to_string()))
    }

    async fn login_locked(&self, slot: &mut AuthSlot, allow_stored: bool) -> Result<(), ApiError> {
        if let Some(ref reason) = slot.rejected {
            return Err(ApiError::Unauthenticated(reason.clone()));
        }

        let stored = if allow_stored && !slot.store_consulted {
            slot.store_consulted = true;
            self.stored_token()
        } else {
            None
        };

        let token = match stored {
            Some(token) => token,
            None => {
                let token = self.exchange_password(slot).await?;
                slot.password_accepted = true;
                token
            }
        };
        let bearer = token.access_token().to_string();
        slot.token = Some(token);

        if self.plant_id.get().is_none() {
            // Failure here leaves the session authenticated; plant_id() retries lazily.
            if let Err(e) = self.resolve_plant(&bearer).await {
                warn!(error = %e, "Could not resolve plant id during login");
            }
        }
        Ok(())
    }

    fn stored_token(&self) -> Option<SessionToken> {
        let persisted = match self.store.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = ?e, "Token store unreadable, logging in");
                return None;
            }
        };

        match SessionToken::from_persisted(&persisted, self.tz) {
            Ok(token) if !token.needs_refresh_at(Utc::now(), self.refresh_margin) => {
                info!(expires_at = %token.expires_at(), "Using stored token");
                Some(token)
            }
            Ok(token) if token.is_expired_at(Utc::now()) => {
                info!("Stored token expired, logging in");
                None
            }
            Ok(_) => {
                info!("Stored token about to expire, logging in");
                None
            }
            Err(e) => {
                warn!(error = %e, "Stored token damaged, logging in");
                None
            }
        }
    }

    async fn exchange_password(&self, slot: &mut AuthSlot) -> Result<SessionToken, ApiError> {
        info!(username = %self.credentials.username(), "Logging in");
        let request = ApiRequest::post_form(
            TOKEN_PATH,
            vec![
                ("grant_type".to_string(), "password".to_string()),
                ("username".to_string(), self.credentials.username().to_string()),
                ("password".to_string(), self.credentials.password().to_string()),
            ],
        );

        let mut attempts = 0;
        let value = match self.run_pass(&request, None, Instant::now(), &mut attempts).await {
            Ok(value) => value,
            Err(e @ (ApiError::BadRequest(_) | ApiError::Unauthorized)) => {
                let reason = format!("credentials rejected: {}", e);
                error!(username = %self.credentials.username(), "Login rejected");
                slot.token = None;
                slot.rejected = Some(reason.clone());
                return Err(ApiError::Unauthenticated(reason));
            }
            Err(e) if e.is_retryable() => {
                return Err(ApiError::Unreachable {
                    attempts,
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        let response: TokenResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("token response: {}", e)))?;
        let token = SessionToken::from_response(response, self.tz, Utc::now())?;

        if let Err(e) = self.store.save(&token.to_persisted()) {
            warn!(error = ?e, "Failed to persist token");
        }
        info!(expires_at = %token.expires_at(), "Login successful");
        Ok(token)
    }

    async fn resolve_plant(&self, bearer: &str) -> Result<String, ApiError> {
        let mut attempts = 0;
        let value = self
            .run_pass(&ApiRequest::get(PLANTS_PATH), Some(bearer), Instant::now(), &mut attempts)
            .await?;
        self.adopt_plant(parse_plants(value)?)
    }

    fn adopt_plant(&self, plants: Vec<Plant>) -> Result<String, ApiError> {
        let first = plants
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse("account has no plants".to_string()))?;
        if self.plant_id.set(first.id.clone()).is_ok() {
            info!(plant_id = %first.id, "Resolved plant");
        }
        self.plant_id.get().cloned().ok_or(ApiError::PlantUnresolved)
    }

    // ===== Retry loop =====

    /// One pass of up to `max_attempts` attempts. Returns the last error when
    /// the pass ends without success.
    async fn run_pass(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        started: Instant,
        attempts: &mut u32,
    ) -> Result<Value, ApiError> {
        let mut pass_attempts = 0;
        loop {
            pass_attempts += 1;
            *attempts += 1;

            let err = match self.api.execute(request, bearer).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            error!(path = %request.path, attempt = pass_attempts, error = %err, "Request failed");
            if pass_attempts >= self.retry.max_attempts || !self.retry.has_budget(started) {
                return Err(err);
            }

            warn!(delay_secs = self.retry.delay.as_secs(), "Retrying");
            tokio::time::sleep(self.retry.delay).await;
        }
    }
}

fn parse_plants(value: Value) -> Result<Vec<Plant>, ApiError> {
    let response: PlantsResponse = serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("plants response: {}", e)))?;
    Ok(response.items)
}
