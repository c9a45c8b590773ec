//! Capability names and values exchanged with the host.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::types::LightMode;

/// A capability the driver exposes for every bulb.
///
/// The string forms match the host platform's capability ids.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use yeelight_driver::Capability;
///
/// assert_eq!(Capability::from_str("onoff").unwrap(), Capability::OnOff);
/// assert_eq!(Capability::LightHue.as_ref(), "light_hue");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumIter, EnumString,
)]
pub enum Capability {
    #[serde(rename = "onoff")]
    #[strum(serialize = "onoff")]
    OnOff,
    #[serde(rename = "dim")]
    #[strum(serialize = "dim")]
    Dim,
    #[serde(rename = "light_hue")]
    #[strum(serialize = "light_hue")]
    LightHue,
    #[serde(rename = "light_saturation")]
    #[strum(serialize = "light_saturation")]
    LightSaturation,
    #[serde(rename = "light_temperature")]
    #[strum(serialize = "light_temperature")]
    LightTemperature,
    #[serde(rename = "light_mode")]
    #[strum(serialize = "light_mode")]
    LightMode,
}

/// A capability value as the host sees it.
///
/// Serialized untagged so it maps directly onto JSON booleans, numbers and
/// strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CapabilityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CapabilityValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        CapabilityValue::Bool(value)
    }
}

impl From<f64> for CapabilityValue {
    fn from(value: f64) -> Self {
        CapabilityValue::Number(value)
    }
}

impl From<LightMode> for CapabilityValue {
    fn from(value: LightMode) -> Self {
        CapabilityValue::Text(value.to_string())
    }
}

impl From<&str> for CapabilityValue {
    fn from(value: &str) -> Self {
        CapabilityValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_capability_names_match_serde() {
        for capability in Capability::iter() {
            let json = serde_json::to_value(capability).unwrap();
            assert_eq!(json.as_str(), Some(capability.as_ref()));
        }
    }

    #[test]
    fn test_value_from_json() {
        let values: Vec<CapabilityValue> =
            serde_json::from_str(r#"[true, 0.25, "temperature"]"#).unwrap();
        assert_eq!(values[0].as_bool(), Some(true));
        assert_eq!(values[1].as_number(), Some(0.25));
        assert_eq!(values[2].as_str(), Some("temperature"));
        assert_eq!(values[2].as_number(), None);
    }
}
