//! Hue and Saturation color representation.

use serde::{Deserialize, Serialize};

/// Hue and Saturation as understood by the bulb's `set_hsv` command.
///
/// - Hue: the color angle on the color wheel (0-359 degrees)
/// - Saturation: the intensity of the color (0-100 percent)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueSaturation {
    hue: u16,
    saturation: u8,
}

impl HueSaturation {
    const MAX_HUE: u16 = 359;
    const MAX_SATURATION: u8 = 100;

    /// Create a new HueSaturation with the given values.
    ///
    /// Returns `None` if values are outside valid ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::HueSaturation;
    ///
    /// assert!(HueSaturation::create(0, 100).is_some());
    /// assert!(HueSaturation::create(359, 50).is_some());
    /// assert!(HueSaturation::create(360, 50).is_none());
    /// assert!(HueSaturation::create(180, 101).is_none());
    /// ```
    pub fn create(hue: u16, saturation: u8) -> Option<Self> {
        if hue <= Self::MAX_HUE && saturation <= Self::MAX_SATURATION {
            Some(HueSaturation { hue, saturation })
        } else {
            None
        }
    }

    /// Convert normalized hue and saturation (both 0..1) to device units.
    ///
    /// Hue scales to 0-359 and saturation to 0-100; out-of-range input is clamped.
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::HueSaturation;
    ///
    /// let hs = HueSaturation::from_normalized(0.5, 1.0);
    /// assert_eq!(hs.hue(), 180);
    /// assert_eq!(hs.saturation(), 100);
    ///
    /// let hs = HueSaturation::from_normalized(1.0, 0.333);
    /// assert_eq!(hs.hue(), 359);
    /// assert_eq!(hs.saturation(), 33);
    /// ```
    pub fn from_normalized(hue: f64, saturation: f64) -> Self {
        let max_hue = f64::from(Self::MAX_HUE);
        let max_sat = f64::from(Self::MAX_SATURATION);
        HueSaturation {
            hue: (hue * max_hue).round().clamp(0.0, max_hue) as u16,
            saturation: (saturation * max_sat).round().clamp(0.0, max_sat) as u8,
        }
    }

    /// Get the hue value.
    pub fn hue(&self) -> u16 {
        self.hue
    }

    /// Get the saturation value.
    pub fn saturation(&self) -> u8 {
        self.saturation
    }
}
