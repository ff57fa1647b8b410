pub mod rate_limit;
pub mod steam;

use std::collections::HashMap;

use thiserror::Error;

pub use rate_limit::{Clock, RateLimiter, SystemClock};
pub use steam::SteamClient;

/// Errors at the playtime-source boundary.
///
/// The recorder treats every variant as non-fatal for the cycle, but the
/// split matters for logging and for callers that want to retry.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Timeout, connection failure, or non-200 status. Retryable.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered but the payload did not parse.
    #[error("source returned invalid data: {0}")]
    InvalidData(String),

    /// Missing API key or user id; retrying cannot help.
    #[error("source misconfigured: {0}")]
    Misconfigured(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::InvalidData(err.to_string())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

/// Achievement detail as reported by the source, before it is written to
/// the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAchievement {
    pub title: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub unlocked: bool,
    /// `YYYY-MM-DD` unlock date, when the source reports one.
    pub unlock_date: Option<String>,
}

/// A catalog/telemetry backend the recorder can sample.
///
/// `fetch_library_playtime` is one batched call for the whole library;
/// implementations rate-limit themselves.
pub trait PlaytimeSource: Send + Sync {
    /// Cumulative minutes per external game id.
    fn fetch_library_playtime(&self) -> Result<HashMap<i64, u32>, SourceError>;

    /// Full achievement detail for one game.
    fn fetch_achievements(&self, app_id: i64) -> Result<Vec<SourceAchievement>, SourceError>;
}
