//! Driver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

/// Timing and naming knobs for the driver.
///
/// Every field has a default, so a host can deserialize a partial document.
/// Durations are expressed in milliseconds.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use yeelight_driver::DriverConfig;
///
/// let config: DriverConfig = serde_json::from_str(r#"{"settle_delay": 300}"#).unwrap();
/// assert_eq!(config.settle_delay, Duration::from_millis(300));
/// assert_eq!(config.debounce_interval, Duration::from_millis(200));
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Minimum spacing between two calls to the same bulb.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub debounce_interval: Duration,
    /// Wait after an implicit power-on before a color or temperature command;
    /// bulbs reject those right after a power change.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub settle_delay: Duration,
    /// How long an undiscovered device may stay silent before it is marked unavailable.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub registration_grace: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub search_interval: Duration,
    /// How long one search listens for replies.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub search_listen: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub command_timeout: Duration,
    pub search_target: String,
    /// Name offered during pairing for bulbs without one.
    pub default_name: String,
    /// Reject light modes other than `color` and `temperature` instead of
    /// treating them as `color`.
    pub strict_light_mode: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            debounce_interval: Duration::from_millis(200),
            settle_delay: Duration::from_millis(150),
            registration_grace: Duration::from_millis(1000),
            search_interval: Duration::from_secs(10),
            search_listen: Duration::from_secs(2),
            command_timeout: Duration::from_secs(2),
            search_target: String::from("wifi_bulb"),
            default_name: String::from("Yeelight"),
            strict_light_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: DriverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DriverConfig::default());
    }

    #[test]
    fn test_durations_are_milliseconds() {
        let config: DriverConfig = serde_json::from_str(
            r#"{"debounce_interval": 50, "search_interval": 60000, "strict_light_mode": true}"#,
        )
        .unwrap();
        assert_eq!(config.debounce_interval, Duration::from_millis(50));
        assert_eq!(config.search_interval, Duration::from_secs(60));
        assert!(config.strict_light_mode);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["settle_delay"], 150);
    }
}
