//! Seams to the discovery/transport layer.
//!
//! The engine never talks to the network itself. It looks bulbs up through a
//! [`DiscoveryAdapter`] and issues commands on the [`LiveHandle`]s it hands out.
//! [`crate::yeelight::YeelightDiscovery`] is the LAN implementation.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::errors::Error;
use crate::types::{Brightness, HueSaturation, Kelvin};

type Result<T> = std::result::Result<T, Error>;

/// An online device as seen by the discovery layer.
///
/// Handles are shared (`Arc`) and may be replaced when a bulb reappears at a
/// new address, so sessions never own them.
pub trait LiveHandle: Send + Sync + 'static {
    /// Device id as advertised on the network.
    fn id(&self) -> &str;

    /// Query the bulb's current property values.
    fn get_values(&self) -> impl Future<Output = Result<Map<String, Value>>> + Send;

    /// Name stored on the bulb, if one was set.
    fn get_name(&self) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Device id as reported by the bulb.
    fn get_id(&self) -> impl Future<Output = Result<String>> + Send;

    fn set_name(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    fn turn_on(&self) -> impl Future<Output = Result<()>> + Send;

    fn turn_off(&self) -> impl Future<Output = Result<()>> + Send;

    fn set_brightness(&self, brightness: Brightness) -> impl Future<Output = Result<()>> + Send;

    fn set_hsv(&self, color: HueSaturation) -> impl Future<Output = Result<()>> + Send;

    fn set_color_temperature(&self, kelvin: Kelvin) -> impl Future<Output = Result<()>> + Send;

    /// Start an endless hue cycle on the bulb.
    fn start_color_flow(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stop any running color flow.
    fn stop_color_flow(&self) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to property pushes from the bulb.
    fn notifications(&self) -> broadcast::Receiver<Value>;
}

/// Network scan and lookup of live devices.
pub trait DiscoveryAdapter: Send + Sync + 'static {
    type Handle: LiveHandle;

    /// Run one scan for devices matching `target`.
    fn search(&self, target: &str) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to "device found" events.
    ///
    /// Only events emitted after the call are delivered.
    fn subscribe(&self) -> broadcast::Receiver<Arc<Self::Handle>>;

    fn get_by_id(&self, id: &str) -> Option<Arc<Self::Handle>>;

    fn get_all(&self) -> Vec<Arc<Self::Handle>>;
}
