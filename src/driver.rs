//! Host lifecycle hooks, pairing and the periodic search loop.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::adapter::{DiscoveryAdapter, LiveHandle};
use crate::config::DriverConfig;
use crate::controller::Controller;
use crate::device::DeviceIdentity;
use crate::errors::Error;
use crate::host::Host;
use crate::registry::Registry;
use crate::runtime::{self, TaskGuard, lock};

type Result<T> = std::result::Result<T, Error>;

/// A bulb offered to the user while pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCandidate {
    pub name: String,
    pub data: PairData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairData {
    pub id: String,
}

/// A request arriving on the pairing socket.
#[derive(Debug)]
pub enum PairEvent {
    /// List every bulb currently on the network.
    ListDevices(oneshot::Sender<Result<Vec<PairCandidate>>>),
    /// The pairing view closed.
    Disconnect,
}

/// Entry point the host talks to.
///
/// Wires the discovery adapter, session registry and capability controller
/// together and exposes the host's lifecycle hooks.
///
/// # Example
///
/// ```ignore
/// let driver = Driver::new(Arc::new(YeelightDiscovery::new(&config)), host, config);
/// driver.start();
/// driver.init(&paired_devices);
/// driver.capabilities().set_onoff(&identity, true).await?;
/// ```
pub struct Driver<A: DiscoveryAdapter> {
    config: DriverConfig,
    adapter: Arc<A>,
    registry: Arc<Registry<A>>,
    controller: Controller<A>,
    search: Mutex<Option<TaskGuard>>,
}

impl<A: DiscoveryAdapter> Driver<A> {
    pub fn new(adapter: Arc<A>, host: Arc<dyn Host>, config: DriverConfig) -> Self {
        let registry = Registry::new(
            Arc::clone(&adapter),
            Arc::clone(&host),
            config.registration_grace,
        );
        let controller = Controller::new(Arc::clone(&registry), host, &config);
        Driver {
            config,
            adapter,
            registry,
            controller,
            search: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn registry(&self) -> &Arc<Registry<A>> {
        &self.registry
    }

    /// Capability get/set entry points.
    pub fn capabilities(&self) -> &Controller<A> {
        &self.controller
    }

    /// Start searching the network periodically. Does nothing if already running.
    pub fn start(&self) {
        let mut search = lock(&self.search);
        if search.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let adapter = Arc::clone(&self.adapter);
        let target = self.config.search_target.clone();
        let every = self.config.search_interval;
        info!("searching for {} every {:?}", target, every);
        *search = Some(runtime::spawn(async move {
            loop {
                if let Err(e) = adapter.search(&target).await {
                    warn!("search for {} failed: {}", target, e);
                }
                runtime::sleep(every).await;
            }
        }));
    }

    pub fn stop(&self) {
        if lock(&self.search).take().is_some() {
            info!("search stopped");
        }
    }

    pub fn is_searching(&self) -> bool {
        lock(&self.search)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Register every device the host already knows.
    ///
    /// Returns once every registration was issued; devices not yet on the
    /// network keep waiting for discovery in the background.
    pub fn init(&self, devices: &[DeviceIdentity]) {
        debug!("init with {} devices", devices.len());
        for identity in devices {
            self.registry.register(identity);
        }
    }

    pub fn added(&self, identity: &DeviceIdentity) {
        debug!("added {}", identity);
        self.registry.register(identity);
    }

    pub fn deleted(&self, identity: &DeviceIdentity) {
        debug!("deleted {}", identity);
        self.registry.unregister(identity);
    }

    /// Forward a rename to the bulb. Failures are logged; the host has no
    /// channel to receive them.
    pub async fn renamed(&self, identity: &DeviceIdentity, name: &str) {
        debug!("renamed {} to {:?}", identity, name);
        let handle = match self.registry.handle(identity) {
            Ok(handle) => handle,
            Err(e) => {
                error!("cannot rename {}: {}", identity, e);
                return;
            }
        };
        if let Err(e) = handle.set_name(name).await {
            error!("rename of {} failed: {}", identity, e);
        }
    }

    /// Every bulb currently known to discovery, as pairing candidates.
    pub async fn list_devices(&self) -> Result<Vec<PairCandidate>> {
        let handles = self.adapter.get_all();
        let default_name = &self.config.default_name;
        futures::future::try_join_all(handles.iter().map(|handle| async move {
            let (name, id) = futures::try_join!(handle.get_name(), handle.get_id())?;
            Ok::<_, Error>(PairCandidate {
                name: name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| default_name.clone()),
                data: PairData { id },
            })
        }))
        .await
    }

    /// Serve a pairing socket until it disconnects or closes.
    pub async fn pair(&self, mut socket: mpsc::Receiver<PairEvent>) {
        debug!("pairing started");
        while let Some(event) = socket.recv().await {
            match event {
                PairEvent::ListDevices(reply) => {
                    let devices = self.list_devices().await;
                    if reply.send(devices).is_err() {
                        debug!("pairing client left before the device list was ready");
                    }
                }
                PairEvent::Disconnect => break,
            }
        }
        debug!("pairing ended");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fake::{Call, FakeAdapter, FakeBulb, HostEvent, RecordingHost};
    use crate::registry::UNREACHABLE;

    fn driver() -> (Arc<FakeAdapter>, Arc<RecordingHost>, Driver<FakeAdapter>) {
        let adapter = FakeAdapter::new();
        let host = RecordingHost::new();
        let driver = Driver::new(Arc::clone(&adapter), host.clone(), DriverConfig::default());
        (adapter, host, driver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_registers_known_and_waits_for_missing() {
        let (adapter, host, driver) = driver();
        adapter.insert(FakeBulb::new("a"));
        adapter.insert(FakeBulb::new("b"));

        let devices = [
            DeviceIdentity::new("a"),
            DeviceIdentity::new("b"),
            DeviceIdentity::new("c"),
        ];
        driver.init(&devices);
        assert_eq!(driver.registry().len(), 2);
        assert!(driver.registry().is_pending(&devices[2]));

        runtime::sleep(Duration::from_millis(1500)).await;
        let events = host.events();
        assert!(events.contains(&HostEvent::Available("a".into())));
        assert!(events.contains(&HostEvent::Available("b".into())));
        assert!(events.contains(&HostEvent::Unavailable("c".into(), UNREACHABLE.into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_added_then_deleted() {
        let (adapter, _host, driver) = driver();
        adapter.insert(FakeBulb::new("a"));
        let identity = DeviceIdentity::new("a");

        driver.added(&identity);
        assert!(driver.capabilities().get_onoff(&identity).is_ok());

        driver.deleted(&identity);
        assert!(driver.capabilities().get_onoff(&identity).is_err());
        assert!(driver.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renamed() {
        let (adapter, _host, driver) = driver();
        let bulb = FakeBulb::new("a");
        adapter.insert(bulb.clone());
        let identity = DeviceIdentity::new("a");
        driver.added(&identity);

        driver.renamed(&identity, "Desk").await;
        assert_eq!(bulb.calls(), vec![Call::SetName("Desk".into())]);

        // Unknown devices are only logged.
        driver.renamed(&DeviceIdentity::new("ghost"), "Nope").await;

        bulb.reject_with("busy");
        driver.renamed(&identity, "Shelf").await;
        assert_eq!(bulb.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_devices() {
        let (adapter, _host, driver) = driver();
        adapter.insert(FakeBulb::named("0x01", "Kitchen"));
        adapter.insert(FakeBulb::new("0x02"));
        adapter.insert(FakeBulb::named("0x03", ""));

        let devices = driver.list_devices().await.unwrap();
        let names: Vec<_> = devices
            .iter()
            .map(|d| (d.name.as_str(), d.data.id.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Kitchen", "0x01"),
                ("Yeelight", "0x02"),
                ("Yeelight", "0x03")
            ]
        );

        let json = serde_json::to_value(&devices[0]).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Kitchen", "data": {"id": "0x01"}}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_socket() {
        let (adapter, _host, driver) = driver();
        adapter.insert(FakeBulb::named("0x01", "Hall"));

        let (socket, events) = mpsc::channel(4);
        let client = async move {
            let (reply, devices) = oneshot::channel();
            socket.send(PairEvent::ListDevices(reply)).await.unwrap();
            let devices = devices.await.unwrap().unwrap();
            socket.send(PairEvent::Disconnect).await.unwrap();
            devices
        };

        let ((), devices) = tokio::join!(driver.pair(events), client);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Hall");
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_search() {
        let (adapter, _host, driver) = driver();
        driver.start();
        driver.start();
        assert!(driver.is_searching());

        runtime::sleep(Duration::from_secs(25)).await;
        assert_eq!(adapter.searches(), vec!["wifi_bulb"; 3]);

        driver.stop();
        assert!(!driver.is_searching());
        runtime::sleep(Duration::from_secs(30)).await;
        assert_eq!(adapter.searches().len(), 3);
    }
}
