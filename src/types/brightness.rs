//! Brightness control for Yeelight bulbs.

use serde::{Deserialize, Serialize};

/// Brightness level from 0 to 100 percent, as sent to the bulb.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Brightness {
    pub(crate) value: u8,
}

impl Brightness {
    const MAX: u8 = 100;

    pub fn new() -> Self {
        Brightness { value: Self::MAX }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Returns None if value is above 100.
    pub fn create(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Brightness { value })
        } else {
            None
        }
    }

    /// Convert a normalized dim level (0..1) to a percentage.
    ///
    /// Out-of-range input is clamped.
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::Brightness;
    ///
    /// assert_eq!(Brightness::from_dim(0.0).value(), 0);
    /// assert_eq!(Brightness::from_dim(0.456).value(), 46);
    /// assert_eq!(Brightness::from_dim(1.0).value(), 100);
    /// assert_eq!(Brightness::from_dim(3.0).value(), 100);
    /// ```
    pub fn from_dim(dim: f64) -> Self {
        Brightness {
            value: (dim * f64::from(Self::MAX)).round().clamp(0.0, f64::from(Self::MAX)) as u8,
        }
    }
}
