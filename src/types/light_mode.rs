//! Color mode tracking.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Which channel the bulb is currently rendering.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use yeelight_driver::LightMode;
///
/// assert_eq!(LightMode::from_str("temperature").unwrap(), LightMode::Temperature);
/// assert_eq!(LightMode::Color.to_string(), "color");
/// assert!(LightMode::from_str("disco").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LightMode {
    /// Hue/saturation output
    Color,
    /// White output at a color temperature
    Temperature,
}
