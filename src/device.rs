//! Device identity and cached capability state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilityValue};
use crate::types::LightMode;

/// Stable key for a device session: the bulb id plus the bridge/network it
/// was paired through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub id: String,
    #[serde(default)]
    pub bridge_id: Option<String>,
}

impl DeviceIdentity {
    pub fn new(id: &str) -> Self {
        DeviceIdentity {
            id: id.to_string(),
            bridge_id: None,
        }
    }

    pub fn with_bridge(id: &str, bridge_id: &str) -> Self {
        DeviceIdentity {
            id: id.to_string(),
            bridge_id: Some(bridge_id.to_string()),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bridge_id {
            Some(bridge) => write!(f, "{}@{}", self.id, bridge),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Last known capability values of a bulb.
///
/// Fields stay `None` until the first successful set; hue and saturation start
/// at full scale so the first color command has something to pair with.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub onoff: Option<bool>,
    pub dim: Option<f64>,
    pub light_hue: f64,
    pub light_saturation: f64,
    pub light_temperature: Option<f64>,
    pub light_mode: Option<LightMode>,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            onoff: None,
            dim: None,
            light_hue: 1.0,
            light_saturation: 1.0,
            light_temperature: None,
            light_mode: None,
        }
    }
}

impl DeviceState {
    /// Whether the bulb is known to be on.
    pub fn is_on(&self) -> bool {
        self.onoff == Some(true)
    }

    /// Read one capability from the cache.
    pub fn get(&self, capability: Capability) -> Option<CapabilityValue> {
        match capability {
            Capability::OnOff => self.onoff.map(CapabilityValue::from),
            Capability::Dim => self.dim.map(CapabilityValue::from),
            Capability::LightHue => Some(self.light_hue.into()),
            Capability::LightSaturation => Some(self.light_saturation.into()),
            Capability::LightTemperature => self.light_temperature.map(CapabilityValue::from),
            Capability::LightMode => self.light_mode.map(CapabilityValue::from),
        }
    }

    /// Force the tracked mode, if any, and report whether it was tracked.
    pub(crate) fn force_mode(&mut self, mode: LightMode) -> bool {
        match &mut self.light_mode {
            Some(current) => {
                *current = mode;
                true
            }
            None => false,
        }
    }
}
