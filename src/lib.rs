//! # yeelight_driver
//!
//! An async driver that exposes Yeelight Wi-Fi bulbs to a home-automation host
//! as devices with `onoff`, `dim`, `light_hue`, `light_saturation`,
//! `light_temperature` and `light_mode` capabilities.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use yeelight_driver::{DeviceIdentity, Driver, DriverConfig, YeelightDiscovery};
//!
//! async fn run(host: Arc<dyn yeelight_driver::Host>) -> Result<(), yeelight_driver::Error> {
//!     let config = DriverConfig::default();
//!     let driver = Driver::new(Arc::new(YeelightDiscovery::new(&config)), host, config);
//!     driver.start();
//!
//!     let desk = DeviceIdentity::new("0x000000000015243f");
//!     driver.added(&desk);
//!     driver.capabilities().set_dim(&desk, 0.4).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! - **Discovery**: [`YeelightDiscovery`] searches the LAN periodically and keeps a
//!   [`yeelight::Bulb`] handle per bulb. The engine only sees the
//!   [`DiscoveryAdapter`] and [`LiveHandle`] traits.
//! - **Registry**: [`Registry`] pairs host devices with live handles, waits for
//!   late discovery and reports availability through the [`Host`].
//! - **Capabilities**: [`Controller`] serves get/set calls from cached
//!   [`DeviceState`], spacing commands per bulb with the [`Scheduler`].
//! - **Lifecycle**: [`Driver`] wires everything and implements the host's
//!   init/added/deleted/renamed hooks and pairing.
//!
//! ## Communication
//!
//! Bulbs answer an SSDP-like search on `239.255.255.250:1982` and take
//! newline-delimited JSON commands over TCP (port 55443 by default). "LAN
//! Control" must be enabled for each bulb in the Yeelight app.

mod adapter;
mod capability;
mod config;
mod controller;
mod device;
mod driver;
mod errors;
#[cfg(test)]
mod fake;
mod host;
mod registry;
pub mod runtime;
mod scheduler;
mod types;
pub mod yeelight;

pub use adapter::{DiscoveryAdapter, LiveHandle};
pub use capability::{Capability, CapabilityValue};
pub use config::DriverConfig;
pub use controller::Controller;
pub use device::{DeviceIdentity, DeviceState};
pub use driver::{Driver, PairCandidate, PairData, PairEvent};
pub use errors::Error;
pub use host::Host;
pub use registry::{Registry, Session, UNREACHABLE};
pub use scheduler::Scheduler;
pub use types::{
    Alert, Brightness, Effect, FlowProperties, HueSaturation, Kelvin, LightMode, PowerMode,
};
pub use yeelight::YeelightDiscovery;
