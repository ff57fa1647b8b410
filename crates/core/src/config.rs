use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};

use crate::error::{Error, Result};

/// Threshold below which a day-over-day hours delta is treated as
/// floating-point noise rather than actual play.
pub const DEFAULT_PLAYED_EPSILON_HOURS: f64 = 0.1;

/// Minimum spacing between calls to the playtime source.
pub const DEFAULT_SOURCE_MIN_INTERVAL: Duration = Duration::from_millis(1200);

/// Request timeout for a single source call. Keeps a stuck call from
/// blocking the daily timer.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine configuration, read from the environment by the server binary.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub db_path: PathBuf,
    pub steam_api_key: String,
    pub steam_user_id: String,
    /// Minutes east of UTC for the reference timezone that decides
    /// calendar-day boundaries. Default is -300 (US Eastern standard).
    pub reference_offset_minutes: i32,
    /// Wall-clock time of day, in the reference timezone, at which the
    /// scheduled snapshot fires.
    pub run_time: NaiveTime,
    pub played_epsilon_hours: f64,
    pub source_timeout: Duration,
    pub source_min_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/gametracker.db"),
            steam_api_key: String::new(),
            steam_user_id: String::new(),
            reference_offset_minutes: -300,
            run_time: NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
            played_epsilon_hours: DEFAULT_PLAYED_EPSILON_HOURS,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            source_min_interval: DEFAULT_SOURCE_MIN_INTERVAL,
        }
    }
}

impl TrackerConfig {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset. `STEAM_API_KEY` and `STEAM_USER_ID` may be
    /// empty; the source adapter reports itself misconfigured at call time.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("GAMETRACKER_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var("STEAM_API_KEY") {
            config.steam_api_key = key;
        }
        if let Ok(id) = std::env::var("STEAM_USER_ID") {
            config.steam_user_id = id;
        }
        if let Ok(raw) = std::env::var("GAMETRACKER_UTC_OFFSET_MINUTES") {
            config.reference_offset_minutes = raw.parse().map_err(|_| {
                Error::InvalidInput(format!("GAMETRACKER_UTC_OFFSET_MINUTES: '{raw}'"))
            })?;
        }
        if let Ok(raw) = std::env::var("GAMETRACKER_RUN_TIME") {
            config.run_time = NaiveTime::parse_from_str(&raw, "%H:%M")
                .map_err(|_| Error::InvalidInput(format!("GAMETRACKER_RUN_TIME: '{raw}'")))?;
        }
        if let Ok(raw) = std::env::var("GAMETRACKER_PLAYED_EPSILON") {
            config.played_epsilon_hours = raw
                .parse()
                .map_err(|_| Error::InvalidInput(format!("GAMETRACKER_PLAYED_EPSILON: '{raw}'")))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.reference_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::InvalidInput(format!(
                "UTC offset out of range: {} minutes",
                self.reference_offset_minutes
            )));
        }
        if !(self.played_epsilon_hours > 0.0) {
            return Err(Error::InvalidInput(format!(
                "played epsilon must be positive, got {}",
                self.played_epsilon_hours
            )));
        }
        Ok(())
    }

    /// The fixed reference offset as a chrono timezone.
    pub fn reference_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.reference_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_offset_is_us_eastern_standard() {
        let config = TrackerConfig::default();
        assert_eq!(config.reference_offset_minutes, -300);
        assert_eq!(config.reference_offset().utc_minus_local(), 300 * 60);
    }

    #[test]
    fn test_validate_rejects_out_of_range_offset() {
        let config = TrackerConfig {
            reference_offset_minutes: 24 * 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive_epsilon() {
        let config = TrackerConfig {
            played_epsilon_hours: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
