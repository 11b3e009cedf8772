//! Buffer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bufw::DEFAULT_TIMEOUT;

/// Construction options for a [`Bufw`](crate::Bufw).
///
/// Deserializes from JSON (or any serde format) with the timeout given
/// either as a duration string or as nanoseconds:
///
/// ```
/// use giztoy_bufw::{Bufw, Config};
/// use std::time::Duration;
///
/// let config: Config = serde_json::from_str(r#"{"sync": true, "timeout": "250ms"}"#).unwrap();
/// assert_eq!(config.timeout, Duration::from_millis(250));
///
/// let buf = Bufw::with_config(&config);
/// assert!(buf.is_sync());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enables the write rendezvous.
    pub sync: bool,
    /// Wait timeout. Ignored unless `sync` is set.
    #[serde(with = "timeout_serde")]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sync: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Returns a config with synchronization enabled and the default timeout.
    pub fn synchronized() -> Self {
        Config {
            sync: true,
            ..Config::default()
        }
    }

    /// Sets the wait timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

mod timeout_serde {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::duration::{format_duration, parse_duration};

    /// Accepted encodings of a timeout.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimeout {
        Text(String),
        Nanos(u64),
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = RawTimeout::deserialize(deserializer).map_err(|_| {
            D::Error::custom("timeout: expected a duration string like \"100ms\" or non-negative nanoseconds")
        })?;
        match raw {
            RawTimeout::Text(text) => {
                parse_duration(&text).map_err(|e| D::Error::custom(format_args!("timeout: {}", e)))
            }
            RawTimeout::Nanos(nanos) => Ok(Duration::from_nanos(nanos)),
        }
    }
}
