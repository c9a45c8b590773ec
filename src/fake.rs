//! In-memory adapter, bulb and host used by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use tokio::sync::broadcast;

use crate::adapter::{DiscoveryAdapter, LiveHandle};
use crate::capability::{Capability, CapabilityValue};
use crate::device::DeviceIdentity;
use crate::errors::Error;
use crate::host::Host;
use crate::runtime::{Instant, lock};
use crate::types::{Brightness, HueSaturation, Kelvin};

type Result<T> = std::result::Result<T, Error>;

/// A command the fake bulb received.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    GetValues,
    SetName(String),
    TurnOn,
    TurnOff,
    SetBrightness(u8),
    SetHsv(u16, u8),
    SetColorTemperature(u16),
    StartColorFlow,
    StopColorFlow,
}

pub(crate) struct FakeBulb {
    id: String,
    name: Mutex<Option<String>>,
    calls: Mutex<Vec<(Instant, Call)>>,
    reject: Mutex<Option<String>>,
    notifications: broadcast::Sender<Value>,
}

impl FakeBulb {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(FakeBulb {
            id: id.to_string(),
            name: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            reject: Mutex::new(None),
            notifications: broadcast::channel(16).0,
        })
    }

    pub(crate) fn named(id: &str, name: &str) -> Arc<Self> {
        let bulb = Self::new(id);
        *lock(&bulb.name) = Some(name.to_string());
        bulb
    }

    /// Commands received so far, without timestamps; diagnostics queries are skipped.
    pub(crate) fn calls(&self) -> Vec<Call> {
        lock(&self.calls)
            .iter()
            .map(|(_, call)| call.clone())
            .filter(|call| *call != Call::GetValues)
            .collect()
    }

    pub(crate) fn timed_calls(&self) -> Vec<(Instant, Call)> {
        lock(&self.calls)
            .iter()
            .filter(|(_, call)| *call != Call::GetValues)
            .cloned()
            .collect()
    }

    pub(crate) fn value_queries(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(_, call)| *call == Call::GetValues)
            .count()
    }

    /// Make every following command fail with the given message.
    pub(crate) fn reject_with(&self, message: &str) {
        *lock(&self.reject) = Some(message.to_string());
    }

    pub(crate) fn push(&self, payload: Value) {
        let _ = self.notifications.send(payload);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.notifications.receiver_count()
    }

    fn record(&self, method: &str, call: Call) -> Result<()> {
        lock(&self.calls).push((Instant::now(), call));
        match lock(&self.reject).as_ref() {
            Some(message) => Err(Error::Protocol {
                method: method.to_string(),
                code: -1,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl LiveHandle for FakeBulb {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_values(&self) -> Result<Map<String, Value>> {
        self.record("get_prop", Call::GetValues)?;
        let values = json!({"power": "off", "bright": "100"});
        Ok(values.as_object().cloned().unwrap_or_default())
    }

    async fn get_name(&self) -> Result<Option<String>> {
        Ok(lock(&self.name).clone())
    }

    async fn get_id(&self) -> Result<String> {
        Ok(self.id.clone())
    }

    async fn set_name(&self, name: &str) -> Result<()> {
        self.record("set_name", Call::SetName(name.to_string()))?;
        *lock(&self.name) = Some(name.to_string());
        Ok(())
    }

    async fn turn_on(&self) -> Result<()> {
        self.record("set_power", Call::TurnOn)
    }

    async fn turn_off(&self) -> Result<()> {
        self.record("set_power", Call::TurnOff)
    }

    async fn set_brightness(&self, brightness: Brightness) -> Result<()> {
        self.record("set_bright", Call::SetBrightness(brightness.value()))
    }

    async fn set_hsv(&self, color: HueSaturation) -> Result<()> {
        self.record("set_hsv", Call::SetHsv(color.hue(), color.saturation()))
    }

    async fn set_color_temperature(&self, kelvin: Kelvin) -> Result<()> {
        self.record("set_ct_abx", Call::SetColorTemperature(kelvin.kelvin()))
    }

    async fn start_color_flow(&self) -> Result<()> {
        self.record("start_cf", Call::StartColorFlow)
    }

    async fn stop_color_flow(&self) -> Result<()> {
        self.record("stop_cf", Call::StopColorFlow)
    }

    fn notifications(&self) -> broadcast::Receiver<Value> {
        self.notifications.subscribe()
    }
}

pub(crate) struct FakeAdapter {
    bulbs: Mutex<HashMap<String, Arc<FakeBulb>>>,
    found: broadcast::Sender<Arc<FakeBulb>>,
    searches: Mutex<Vec<String>>,
}

impl FakeAdapter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(FakeAdapter {
            bulbs: Mutex::new(HashMap::new()),
            found: broadcast::channel(16).0,
            searches: Mutex::new(Vec::new()),
        })
    }

    /// Make a bulb known without announcing it.
    pub(crate) fn insert(&self, bulb: Arc<FakeBulb>) {
        lock(&self.bulbs).insert(bulb.id.clone(), bulb);
    }

    /// Make a bulb known and emit a found event for it.
    pub(crate) fn discover(&self, bulb: Arc<FakeBulb>) {
        self.insert(Arc::clone(&bulb));
        let _ = self.found.send(bulb);
    }

    pub(crate) fn searches(&self) -> Vec<String> {
        lock(&self.searches).clone()
    }

    pub(crate) fn found_listeners(&self) -> usize {
        self.found.receiver_count()
    }
}

impl DiscoveryAdapter for FakeAdapter {
    type Handle = FakeBulb;

    async fn search(&self, target: &str) -> Result<()> {
        lock(&self.searches).push(target.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<FakeBulb>> {
        self.found.subscribe()
    }

    fn get_by_id(&self, id: &str) -> Option<Arc<FakeBulb>> {
        lock(&self.bulbs).get(id).cloned()
    }

    fn get_all(&self) -> Vec<Arc<FakeBulb>> {
        let mut bulbs: Vec<_> = lock(&self.bulbs).values().cloned().collect();
        bulbs.sort_by(|a, b| a.id.cmp(&b.id));
        bulbs
    }
}

/// Something the driver told the host.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostEvent {
    Available(String),
    Unavailable(String, String),
    Realtime(String, Capability, CapabilityValue),
}

#[derive(Default)]
pub(crate) struct RecordingHost {
    events: Mutex<Vec<(Instant, HostEvent)>>,
}

impl RecordingHost {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<HostEvent> {
        lock(&self.events).iter().map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn timed_events(&self) -> Vec<(Instant, HostEvent)> {
        lock(&self.events).clone()
    }

    fn record(&self, event: HostEvent) {
        lock(&self.events).push((Instant::now(), event));
    }
}

impl Host for RecordingHost {
    fn set_available(&self, identity: &DeviceIdentity) {
        self.record(HostEvent::Available(identity.id.clone()));
    }

    fn set_unavailable(&self, identity: &DeviceIdentity, reason: &str) {
        self.record(HostEvent::Unavailable(identity.id.clone(), reason.to_string()));
    }

    fn realtime(&self, identity: &DeviceIdentity, capability: Capability, value: CapabilityValue) {
        self.record(HostEvent::Realtime(identity.id.clone(), capability, value));
    }
}
