use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};

/// Rate limit counters reported by GitHub, either from the `x-ratelimit-*`
/// headers of a response or from the `/rate_limit` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RateLimit {
    pub limit: Option<u32>,
    pub remaining: u32,
    /// Epoch seconds at which the window resets
    pub reset: i64,
}

impl RateLimit {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.reset, 0).single()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GitHub answered {status}: {message}")]
    Transient {
        status: u16,
        message: String,
        rate_limit: Option<RateLimit>,
    },

    #[error("could not reach GitHub: {0}")]
    Network(String),

    #[error("malformed response from GitHub: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Any 429, or a 403 sent once the rate limit window is exhausted.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            FetchError::Transient { status: 429, .. } => true,
            FetchError::Transient {
                status: 403,
                rate_limit: Some(limit),
                ..
            } => limit.is_exhausted(),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transient { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            FetchError::Transient { rate_limit, .. } => rate_limit.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn transient(status: u16, remaining: Option<u32>) -> FetchError {
        FetchError::Transient {
            status,
            message: "nope".to_string(),
            rate_limit: remaining.map(|remaining| RateLimit {
                limit: Some(60),
                remaining,
                reset: 1_700_000_000,
            }),
        }
    }

    #[test]
    fn test_rate_limited_needs_exhausted_window() {
        assert!(transient(403, Some(0)).is_rate_limited());
        assert!(!transient(403, Some(12)).is_rate_limited());
        assert!(!transient(403, None).is_rate_limited());
        assert!(transient(429, None).is_rate_limited());
        assert!(transient(429, Some(12)).is_rate_limited());
        assert!(!transient(500, Some(0)).is_rate_limited());
        assert!(!FetchError::Malformed("x".into()).is_rate_limited());
    }

    #[test]
    fn test_reset_at() {
        let err = transient(403, Some(0));
        let reset = err.rate_limit().and_then(|r| r.reset_at()).unwrap();
        assert_eq!(reset.timestamp(), 1_700_000_000);
        assert_eq!(err.status(), Some(403));
    }
}
