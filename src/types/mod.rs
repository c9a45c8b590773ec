//! Value types for light control parameters.

mod brightness;
mod flow;
mod hue_saturation;
mod kelvin;
mod light_mode;
mod power;

pub use brightness::Brightness;
pub use flow::{Alert, Effect, FlowProperties};
pub use hue_saturation::HueSaturation;
pub use kelvin::Kelvin;
pub use light_mode::LightMode;
pub use power::PowerMode;
