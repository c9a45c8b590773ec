//! Alert and effect properties driven by flow actions.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Alert state of a device.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Alert {
    #[default]
    None,
    Select,
}

/// Running effect on a device.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Effect {
    #[default]
    None,
    /// Endless cycle through the hue wheel
    ColorLoop,
}

/// Alert/effect pair last applied by a flow action.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowProperties {
    pub alert: Alert,
    pub effect: Effect,
}
