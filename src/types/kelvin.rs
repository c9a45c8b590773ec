//! Color temperature control.

use serde::{Deserialize, Serialize};

/// Color temperature in Kelvin, with valid values from 1700K to 6500K.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Kelvin {
    pub const MIN: u16 = 1700;
    pub const MAX: u16 = 6500;

    /// Create a new Kelvin with the coolest value (6500K).
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::Kelvin;
    ///
    /// assert_eq!(Kelvin::new().kelvin(), 6500);
    /// ```
    pub fn new() -> Self {
        Kelvin { kelvin: Self::MAX }
    }

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the valid range (1700-6500).
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::Kelvin;
    ///
    /// assert!(Kelvin::create(1699).is_none());
    /// assert!(Kelvin::create(1700).is_some());
    /// assert!(Kelvin::create(6500).is_some());
    /// assert!(Kelvin::create(6501).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&kelvin) {
            Some(Kelvin { kelvin })
        } else {
            None
        }
    }

    /// Map a normalized temperature (0..1) onto the Kelvin range, inverted:
    /// 0.0 is the coolest white (6500K) and 1.0 the warmest (1700K).
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::Kelvin;
    ///
    /// assert_eq!(Kelvin::from_normalized(0.0).kelvin(), 6500);
    /// assert_eq!(Kelvin::from_normalized(0.5).kelvin(), 4100);
    /// assert_eq!(Kelvin::from_normalized(1.0).kelvin(), 1700);
    /// ```
    pub fn from_normalized(temperature: f64) -> Self {
        let max = f64::from(Self::MAX);
        let min = f64::from(Self::MIN);
        Kelvin {
            kelvin: (max - temperature * (max - min)).round().clamp(min, max) as u16,
        }
    }
}
