//! Device sessions and their reconciliation with discovery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::adapter::{DiscoveryAdapter, LiveHandle};
use crate::device::{DeviceIdentity, DeviceState};
use crate::errors::Error;
use crate::host::Host;
use crate::runtime::{self, TaskGuard, lock};
use crate::types::FlowProperties;

type Result<T> = std::result::Result<T, Error>;

/// Reason reported to the host when a device never showed up.
pub const UNREACHABLE: &str = "unreachable";

/// A registered device: its identity, cached state and current live handle.
pub struct Session<H> {
    identity: DeviceIdentity,
    pub(crate) state: DeviceState,
    pub(crate) flow: FlowProperties,
    handle: Arc<H>,
    _listener: TaskGuard,
}

impl<H> Session<H> {
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn flow(&self) -> &FlowProperties {
        &self.flow
    }

    pub fn handle(&self) -> &Arc<H> {
        &self.handle
    }
}

/// A device the host knows about but discovery has not reported yet.
struct PendingRegistration {
    identity: DeviceIdentity,
    _grace: TaskGuard,
}

struct Inner<H> {
    sessions: HashMap<String, Session<H>>,
    pending: HashMap<String, PendingRegistration>,
}

/// Owns every device session, keyed by device id.
///
/// Sessions are created by [`Registry::register`] once the adapter can hand
/// out a live handle, and dropped by [`Registry::unregister`]. Dropping a
/// session stops its notification listener.
///
/// The registry follows the adapter's found stream for its whole life: a
/// pending device is attached when it shows up, and a registered device
/// switches to the new handle when its bulb is announced again.
pub struct Registry<A: DiscoveryAdapter> {
    adapter: Arc<A>,
    host: Arc<dyn Host>,
    grace: Duration,
    inner: Mutex<Inner<A::Handle>>,
    _discovery: TaskGuard,
}

impl<A: DiscoveryAdapter> Registry<A> {
    /// Must be called from within a tokio runtime.
    pub fn new(adapter: Arc<A>, host: Arc<dyn Host>, grace: Duration) -> Arc<Self> {
        Arc::new_cyclic(|registry: &Weak<Self>| {
            let discovery = runtime::spawn(follow_discovery(registry.clone(), adapter.subscribe()));
            Registry {
                adapter,
                host,
                grace,
                inner: Mutex::new(Inner {
                    sessions: HashMap::new(),
                    pending: HashMap::new(),
                }),
                _discovery: discovery,
            }
        })
    }

    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        lock(&self.inner).sessions.contains_key(&identity.id)
    }

    /// Whether the device is registered with the host but still waiting for discovery.
    pub fn is_pending(&self, identity: &DeviceIdentity) -> bool {
        lock(&self.inner).pending.contains_key(&identity.id)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a session and read from it.
    pub fn resolve<R>(
        &self,
        identity: &DeviceIdentity,
        read: impl FnOnce(&Session<A::Handle>) -> R,
    ) -> Result<R> {
        let inner = lock(&self.inner);
        inner
            .sessions
            .get(&identity.id)
            .map(read)
            .ok_or_else(|| Error::invalid_device(&identity.id))
    }

    /// Look up a session and mutate it.
    pub fn update<R>(
        &self,
        identity: &DeviceIdentity,
        write: impl FnOnce(&mut Session<A::Handle>) -> R,
    ) -> Result<R> {
        let mut inner = lock(&self.inner);
        inner
            .sessions
            .get_mut(&identity.id)
            .map(write)
            .ok_or_else(|| Error::invalid_device(&identity.id))
    }

    pub fn handle(&self, identity: &DeviceIdentity) -> Result<Arc<A::Handle>> {
        self.resolve(identity, |session| Arc::clone(&session.handle))
    }

    pub fn state(&self, identity: &DeviceIdentity) -> Result<DeviceState> {
        self.resolve(identity, |session| session.state.clone())
    }

    /// Bind a device to its live handle, or wait for discovery to report it.
    ///
    /// Safe to call repeatedly: a registered device keeps its cached state and
    /// picks up the current handle, and a device already waiting for discovery
    /// keeps its existing wait.
    pub fn register(self: &Arc<Self>, identity: &DeviceIdentity) {
        debug!("register {}", identity);
        if let Some(handle) = self.adapter.get_by_id(&identity.id) {
            self.attach(identity, handle);
            return;
        }

        self.wait_for_discovery(identity);
        // A bulb announced between the lookup and the wait being recorded was
        // skipped by the found stream but is already known to the adapter.
        if let Some(handle) = self.adapter.get_by_id(&identity.id) {
            self.attach(identity, handle);
        }
    }

    /// Drop a device's session and any pending discovery wait.
    ///
    /// Returns `false` if nothing was registered under that identity.
    pub fn unregister(&self, identity: &DeviceIdentity) -> bool {
        let (session, pending) = {
            let mut inner = lock(&self.inner);
            (
                inner.sessions.remove(&identity.id),
                inner.pending.remove(&identity.id),
            )
        };
        let removed = session.is_some() || pending.is_some();
        debug!("unregister {} (known: {})", identity, removed);
        removed
    }

    /// Attach a freshly announced handle if its device is registered or pending.
    fn refresh(&self, handle: Arc<A::Handle>) {
        let identity = {
            let inner = lock(&self.inner);
            let id = handle.id();
            inner
                .sessions
                .get(id)
                .map(|session| session.identity.clone())
                .or_else(|| inner.pending.get(id).map(|wait| wait.identity.clone()))
        };
        match identity {
            Some(identity) => self.attach(&identity, handle),
            None => debug!("ignoring announcement of unregistered {}", handle.id()),
        }
    }

    /// Re-read every known device from the adapter.
    fn refresh_all(&self) {
        let ids: Vec<String> = {
            let inner = lock(&self.inner);
            inner
                .sessions
                .keys()
                .chain(inner.pending.keys())
                .cloned()
                .collect()
        };
        for id in ids {
            if let Some(handle) = self.adapter.get_by_id(&id) {
                self.refresh(handle);
            }
        }
    }

    fn attach(&self, identity: &DeviceIdentity, handle: Arc<A::Handle>) {
        let mut inner = lock(&self.inner);
        let pending = inner.pending.remove(&identity.id);

        let unchanged = inner
            .sessions
            .get(&identity.id)
            .is_some_and(|session| Arc::ptr_eq(&session.handle, &handle));
        if unchanged {
            debug!("{} already registered", identity);
            return;
        }

        let (state, flow) = match inner.sessions.remove(&identity.id) {
            Some(previous) => (previous.state, previous.flow),
            None => (DeviceState::default(), FlowProperties::default()),
        };
        let listener = runtime::spawn(log_notifications(identity.clone(), handle.notifications()));
        inner.sessions.insert(
            identity.id.clone(),
            Session {
                identity: identity.clone(),
                state,
                flow,
                handle: Arc::clone(&handle),
                _listener: listener,
            },
        );
        drop(inner);
        drop(pending);

        info!("registered {}", identity);
        self.host.set_available(identity);

        let id = identity.clone();
        runtime::spawn_detached(async move {
            match handle.get_values().await {
                Ok(values) => debug!("got values for {}: {:?}", id, values),
                Err(e) => debug!("could not read values for {}: {}", id, e),
            }
        });
    }

    fn wait_for_discovery(self: &Arc<Self>, identity: &DeviceIdentity) {
        let mut inner = lock(&self.inner);
        if inner.pending.contains_key(&identity.id) {
            debug!("{} is already waiting for discovery", identity);
            return;
        }
        debug!("{} not discovered yet, waiting", identity);

        let registry = Arc::downgrade(self);
        let watched = identity.clone();
        let grace = self.grace;
        let timer = runtime::spawn(async move {
            runtime::sleep(grace).await;
            let Some(registry) = registry.upgrade() else {
                return;
            };
            if !registry.contains(&watched) {
                warn!("{} did not show up within {:?}", watched, grace);
                registry.host.set_unavailable(&watched, UNREACHABLE);
            }
        });

        inner.pending.insert(
            identity.id.clone(),
            PendingRegistration {
                identity: identity.clone(),
                _grace: timer,
            },
        );
    }
}

async fn follow_discovery<A: DiscoveryAdapter>(
    registry: Weak<Registry<A>>,
    mut found: broadcast::Receiver<Arc<A::Handle>>,
) {
    loop {
        let event = found.recv().await;
        let Some(registry) = registry.upgrade() else {
            return;
        };
        match event {
            Ok(handle) => registry.refresh(handle),
            Err(RecvError::Lagged(skipped)) => {
                warn!("missed {} discovery events, rereading known devices", skipped);
                registry.refresh_all();
            }
            Err(RecvError::Closed) => return,
        }
    }
}

async fn log_notifications(identity: DeviceIdentity, mut notifications: broadcast::Receiver<Value>) {
    loop {
        match notifications.recv().await {
            Ok(payload) => debug!("notification from {}: {}", identity, payload),
            Err(RecvError::Lagged(skipped)) => {
                debug!("dropped {} notifications from {}", skipped, identity)
            }
            Err(RecvError::Closed) => return,
        }
    }
}
