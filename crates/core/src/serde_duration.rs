//! Serde adapters for `Duration` fields in configuration files
//!
//! TOML has no duration type, so durations are written as plain integers.
//! Use `#[serde(with = "partnersell_core::serde_duration::secs")]` or
//! `#[serde(with = "partnersell_core::serde_duration::millis")]`.

/// Whole seconds
pub mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serialize as integer seconds
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    /// Deserialize from integer seconds
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Whole milliseconds
pub mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serialize as integer milliseconds
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    /// Deserialize from integer milliseconds
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Optional whole seconds
pub mod option_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serialize as optional integer seconds
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    /// Deserialize from optional integer seconds
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Timings {
        #[serde(with = "super::secs")]
        timeout: Duration,
        #[serde(with = "super::millis")]
        delay: Duration,
        #[serde(default, with = "super::option_secs")]
        attempt_timeout: Option<Duration>,
    }

    #[test]
    fn test_durations_from_toml() {
        let timings: Timings = toml::from_str("timeout = 30\ndelay = 250\n").unwrap();
        assert_eq!(timings.timeout, Duration::from_secs(30));
        assert_eq!(timings.delay, Duration::from_millis(250));
        assert_eq!(timings.attempt_timeout, None);
    }

    #[test]
    fn test_durations_to_json() {
        let timings = Timings {
            timeout: Duration::from_secs(5),
            delay: Duration::from_millis(100),
            attempt_timeout: Some(Duration::from_secs(60)),
        };
        let json = serde_json::to_value(&timings).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"timeout": 5, "delay": 100, "attempt_timeout": 60})
        );
    }
}
