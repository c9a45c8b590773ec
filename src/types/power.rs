//! Power mode for light control.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

/// Power state for a light, spelled the way the bulb expects it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PowerMode {
    /// Turn the light on
    On,
    /// Turn the light off
    Off,
}
