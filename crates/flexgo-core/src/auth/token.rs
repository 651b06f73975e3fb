use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Wall-clock format of `tokenExpires` in the token file.
const PERSISTED_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BEARER_PREFIX: &str = "Bearer ";

/// Response of the password grant.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// RFC 2822 timestamp, e.g. `Tue, 03 Nov 2026 10:00:00 GMT`.
    #[serde(rename = ".expires")]
    pub expires: Option<String>,
    pub expires_in: Option<i64>,
}

/// Token as mirrored to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedToken {
    /// Full `Authorization` value, including the `Bearer ` prefix.
    pub token: String,
    #[serde(rename = "tokenExpires")]
    pub token_expires: String,
}

/// Bearer token plus its absolute expiry in the reference time zone.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    access_token: String,
    expires_at: DateTime<Tz>,
}

impl SessionToken {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Tz>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub(crate) fn from_response(
        response: TokenResponse,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self, ApiError> {
        let expires_at = match (response.expires.as_deref(), response.expires_in) {
            (Some(raw), _) => DateTime::parse_from_rfc2822(raw)
                .map_err(|e| ApiError::InvalidResponse(format!("token expiry {:?}: {}", raw, e)))?
                .with_timezone(&tz),
            (None, Some(seconds)) => Duration::try_seconds(seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    ApiError::InvalidResponse(format!("token lifetime {}s out of range", seconds))
                })?
                .with_timezone(&tz),
            (None, None) => {
                return Err(ApiError::InvalidResponse(
                    "token response has no expiry".to_string(),
                ))
            }
        };

        Ok(Self::new(response.access_token, expires_at))
    }

    pub fn from_persisted(persisted: &PersistedToken, tz: Tz) -> Result<Self, ApiError> {
        let raw = persisted.token.trim();
        let access_token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw);
        if access_token.is_empty() {
            return Err(ApiError::InvalidResponse("persisted token is empty".to_string()));
        }

        let naive = NaiveDateTime::parse_from_str(&persisted.token_expires, PERSISTED_EXPIRY_FORMAT)
            .map_err(|e| {
                ApiError::InvalidResponse(format!(
                    "persisted expiry {:?}: {}",
                    persisted.token_expires, e
                ))
            })?;
        // Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
        let expires_at = tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
            ApiError::InvalidResponse(format!(
                "persisted expiry {:?} does not exist in {}",
                persisted.token_expires, tz
            ))
        })?;

        Ok(Self::new(access_token, expires_at))
    }

    pub fn to_persisted(&self) -> PersistedToken {
        PersistedToken {
            token: format!("{}{}", BEARER_PREFIX, self.access_token),
            token_expires: self.expires_at.format(PERSISTED_EXPIRY_FORMAT).to_string(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Tz> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once `now` is inside `margin` of the expiry.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now >= self.expires_at - margin
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at.with_timezone(&Utc) - now).num_minutes().max(0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
