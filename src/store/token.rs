//! Access token cache with refresh-before-expiry.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;

/// Refresh this long before the token actually expires.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 600;

/// A token as returned by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Holds at most one token.
///
/// The mutex is held across a refresh, so concurrent callers that find the
/// token stale wait for the first caller's refresh instead of issuing their own.
#[derive(Debug)]
pub struct TokenCache {
    margin: Duration,
    state: Mutex<Option<CachedToken>>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS))
    }
}

impl TokenCache {
    pub fn new(margin: Duration) -> Self {
        Self {
            margin,
            state: Mutex::new(None),
        }
    }

    pub fn get_valid_token<F>(&self, refresh: F) -> Result<String, StoreError>
    where
        F: FnOnce() -> Result<IssuedToken, StoreError>,
    {
        self.get_valid_token_at(Utc::now(), refresh)
    }

    /// Return the cached token unless it expires within the margin of `now`,
    /// in which case `refresh` is called and its token cached.
    pub fn get_valid_token_at<F>(&self, now: DateTime<Utc>, refresh: F) -> Result<String, StoreError>
    where
        F: FnOnce() -> Result<IssuedToken, StoreError>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = state.as_ref() {
            if now < cached.expires_at - self.margin {
                return Ok(cached.token.clone());
            }
        }

        let issued = refresh()?;
        *state = Some(CachedToken {
            token: issued.token.clone(),
            expires_at: now + issued.expires_in,
        });
        Ok(issued.token)
    }

    /// Drop the cached token so the next call refreshes.
    pub fn invalidate(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
