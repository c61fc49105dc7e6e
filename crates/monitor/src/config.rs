use std::time::Duration;

use chrono::FixedOffset;

use linewatch_client::api::{ClientConfig, DEFAULT_BASE_URL};
use linewatch_core::catalog::LineCatalog;
use linewatch_sync::poller::DEFAULT_POLL_INTERVAL;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const SECS_PER_HOUR: i32 = 3_600;

/// `LINE_IDS` value that asks the backend which lines exist.
pub const DISCOVER_LINES: &str = "auto";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("LINE_IDS is invalid: {0}")]
    LineIds(#[from] linewatch_core::error::CoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Which lines the store syncs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSource {
    Fixed(LineCatalog),
    /// Ask the backend at startup.
    Discover,
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    /// `None` when `REQUEST_TIMEOUT_SECS=0`.
    pub request_timeout: Option<Duration>,
    pub lines: LineSource,
    pub log_format: LogFormat,
    /// Offset used when printing timestamps.
    pub display_offset: FixedOffset,
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `LINEWATCH_API_URL`        | `http://localhost:3000` |
    /// | `POLL_INTERVAL_SECS`       | `15`                    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30` (`0` disables)     |
    /// | `LINE_IDS`                 | `1,2,3,4,5` or `auto`   |
    /// | `LOG_FORMAT`               | `text` (or `json`)      |
    /// | `DISPLAY_UTC_OFFSET_HOURS` | `0`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = var("LINEWATCH_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let poll_secs: u64 = parse_or(
            var("POLL_INTERVAL_SECS"),
            "POLL_INTERVAL_SECS",
            "a positive integer",
            DEFAULT_POLL_INTERVAL.as_secs(),
        )?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_SECS",
                expected: "a positive integer",
                value: "0".into(),
            });
        }

        let timeout_secs: u64 = parse_or(
            var("REQUEST_TIMEOUT_SECS"),
            "REQUEST_TIMEOUT_SECS",
            "a non-negative integer",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let lines = match var("LINE_IDS") {
            None => LineSource::Fixed(LineCatalog::default()),
            Some(raw) if raw.eq_ignore_ascii_case(DISCOVER_LINES) => LineSource::Discover,
            Some(raw) => LineSource::Fixed(LineCatalog::parse_ids(&raw)?),
        };

        let log_format = match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    expected: "'text' or 'json'",
                    value: other.to_string(),
                })
            }
        };

        let offset_hours: i32 = parse_or(
            var("DISPLAY_UTC_OFFSET_HOURS"),
            "DISPLAY_UTC_OFFSET_HOURS",
            "a whole number of hours between -23 and 23",
            0,
        )?;
        let display_offset = offset_hours
            .checked_mul(SECS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                var: "DISPLAY_UTC_OFFSET_HOURS",
                expected: "a whole number of hours between -23 and 23",
                value: offset_hours.to_string(),
            })?;

        Ok(Self {
            api_url,
            poll_interval: Duration::from_secs(poll_secs),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            lines,
            log_format,
            display_offset,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.lines, LineSource::Fixed(LineCatalog::default()));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.display_offset.local_minus_utc(), 0);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("LINEWATCH_API_URL", "http://backend:8080"),
            ("POLL_INTERVAL_SECS", "30"),
            ("REQUEST_TIMEOUT_SECS", "0"),
            ("LINE_IDS", "2, 4"),
            ("LOG_FORMAT", "JSON"),
            ("DISPLAY_UTC_OFFSET_HOURS", "-3"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "http://backend:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.lines, LineSource::Fixed(LineCatalog::from_ids([2, 4])));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.display_offset.local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("POLL_INTERVAL_SECS", "  "), ("LINE_IDS", "")]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.lines, LineSource::Fixed(LineCatalog::default()));
    }

    #[test]
    fn line_discovery() {
        assert_eq!(load(&[("LINE_IDS", "auto")]).unwrap().lines, LineSource::Discover);
    }

    #[test]
    fn invalid_values() {
        assert_matches!(
            load(&[("POLL_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid { var: "POLL_INTERVAL_SECS", .. })
        );
        assert_matches!(
            load(&[("REQUEST_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::Invalid { var: "REQUEST_TIMEOUT_SECS", .. })
        );
        assert_matches!(load(&[("LINE_IDS", "1,x")]), Err(ConfigError::LineIds(_)));
        assert_matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        );
        for hours in ["30", "1193047", "-1193047"] {
            assert_matches!(
                load(&[("DISPLAY_UTC_OFFSET_HOURS", hours)]),
                Err(ConfigError::Invalid { var: "DISPLAY_UTC_OFFSET_HOURS", .. })
            );
        }
    }
}
