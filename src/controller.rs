//! Capability reads and debounced writes.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::adapter::{DiscoveryAdapter, LiveHandle};
use crate::capability::{Capability, CapabilityValue};
use crate::config::DriverConfig;
use crate::device::{DeviceIdentity, DeviceState};
use crate::errors::Error;
use crate::host::Host;
use crate::registry::Registry;
use crate::runtime;
use crate::scheduler::Scheduler;
use crate::types::{Alert, Brightness, Effect, FlowProperties, HueSaturation, Kelvin, LightMode};

type Result<T> = std::result::Result<T, Error>;

/// Temperature applied when switching to temperature mode before any
/// temperature was ever set.
const DEFAULT_TEMPERATURE: f64 = 0.5;

/// Translates capability calls into bulb commands.
///
/// Reads come from the session cache and never touch the network. Writes
/// update the cache, then go through the per-device [`Scheduler`] so a bulb
/// sees at most one command per debounce interval.
///
/// Color and temperature writes switch a dark bulb on first, report that to
/// the host, and wait for the bulb to settle before sending the color.
pub struct Controller<A: DiscoveryAdapter> {
    registry: Arc<Registry<A>>,
    scheduler: Scheduler,
    host: Arc<dyn Host>,
    debounce: Duration,
    settle: Duration,
    strict_mode: bool,
}

impl<A: DiscoveryAdapter> Controller<A> {
    pub fn new(registry: Arc<Registry<A>>, host: Arc<dyn Host>, config: &DriverConfig) -> Self {
        Controller {
            registry,
            scheduler: Scheduler::new(),
            host,
            debounce: config.debounce_interval,
            settle: config.settle_delay,
            strict_mode: config.strict_light_mode,
        }
    }

    /// Read any capability by name. `None` means it was never set.
    pub fn get(
        &self,
        identity: &DeviceIdentity,
        capability: Capability,
    ) -> Result<Option<CapabilityValue>> {
        self.read(identity, |state| state.get(capability))
    }

    pub fn get_onoff(&self, identity: &DeviceIdentity) -> Result<Option<bool>> {
        self.read(identity, |state| state.onoff)
    }

    pub fn get_dim(&self, identity: &DeviceIdentity) -> Result<Option<f64>> {
        self.read(identity, |state| state.dim)
    }

    pub fn get_light_hue(&self, identity: &DeviceIdentity) -> Result<f64> {
        self.read(identity, |state| state.light_hue)
    }

    pub fn get_light_saturation(&self, identity: &DeviceIdentity) -> Result<f64> {
        self.read(identity, |state| state.light_saturation)
    }

    pub fn get_light_temperature(&self, identity: &DeviceIdentity) -> Result<Option<f64>> {
        self.read(identity, |state| state.light_temperature)
    }

    pub fn get_light_mode(&self, identity: &DeviceIdentity) -> Result<Option<LightMode>> {
        self.read(identity, |state| state.light_mode)
    }

    /// Write any capability by name.
    ///
    /// Returns the applied value. A value of the wrong shape for the
    /// capability is rejected with [`Error::InvalidValue`].
    pub async fn set(
        &self,
        identity: &DeviceIdentity,
        capability: Capability,
        value: &CapabilityValue,
    ) -> Result<CapabilityValue> {
        match capability {
            Capability::OnOff => {
                let on = value
                    .as_bool()
                    .ok_or_else(|| Error::invalid_value(capability, "expected a boolean"))?;
                self.set_onoff(identity, on).await.map(Into::into)
            }
            Capability::Dim => {
                let dim = number(capability, value)?;
                self.set_dim(identity, dim).await.map(Into::into)
            }
            Capability::LightHue => {
                let hue = number(capability, value)?;
                self.set_light_hue(identity, hue).await.map(Into::into)
            }
            Capability::LightSaturation => {
                let saturation = number(capability, value)?;
                self.set_light_saturation(identity, saturation)
                    .await
                    .map(Into::into)
            }
            Capability::LightTemperature => {
                let temperature = number(capability, value)?;
                self.set_light_temperature(identity, temperature)
                    .await
                    .map(Into::into)
            }
            Capability::LightMode => {
                let mode = value
                    .as_str()
                    .ok_or_else(|| Error::invalid_value(capability, "expected a mode name"))?;
                self.set_light_mode(identity, mode).await.map(Into::into)
            }
        }
    }

    pub async fn set_onoff(&self, identity: &DeviceIdentity, on: bool) -> Result<bool> {
        self.debounced(identity, self.apply_onoff(identity, on)).await
    }

    /// Set brightness (0..1). Also derives and broadcasts the power state.
    pub async fn set_dim(&self, identity: &DeviceIdentity, dim: f64) -> Result<f64> {
        self.debounced(identity, self.apply_dim(identity, dim)).await
    }

    pub async fn set_light_hue(&self, identity: &DeviceIdentity, hue: f64) -> Result<f64> {
        self.debounced(identity, self.apply_hue(identity, hue)).await
    }

    pub async fn set_light_saturation(
        &self,
        identity: &DeviceIdentity,
        saturation: f64,
    ) -> Result<f64> {
        self.debounced(identity, self.apply_saturation(identity, saturation))
            .await
    }

    /// Set color temperature (0 = coolest, 1 = warmest).
    pub async fn set_light_temperature(
        &self,
        identity: &DeviceIdentity,
        temperature: f64,
    ) -> Result<f64> {
        self.debounced(identity, self.apply_temperature(identity, temperature))
            .await
    }

    /// Switch mode and replay the cached hue or temperature.
    ///
    /// `temperature` replays the temperature. Any other name replays the hue,
    /// unless the driver was configured with `strict_light_mode`, in which case
    /// names other than `color` are rejected.
    pub async fn set_light_mode(&self, identity: &DeviceIdentity, mode: &str) -> Result<LightMode> {
        // Rejected names never take a debounce slot.
        let mode = self.parse_mode(identity, mode)?;
        self.debounced(identity, self.apply_light_mode(identity, mode))
            .await
    }

    /// Start an endless color loop on the bulb.
    pub async fn start_color_loop(&self, identity: &DeviceIdentity) -> Result<()> {
        self.debounced(identity, self.apply_flow(identity, Effect::ColorLoop))
            .await
    }

    pub async fn stop_color_loop(&self, identity: &DeviceIdentity) -> Result<()> {
        self.debounced(identity, self.apply_flow(identity, Effect::None))
            .await
    }

    pub fn flow(&self, identity: &DeviceIdentity) -> Result<FlowProperties> {
        self.registry.resolve(identity, |session| *session.flow())
    }

    fn read<R>(&self, identity: &DeviceIdentity, read: impl FnOnce(&DeviceState) -> R) -> Result<R> {
        self.registry.resolve(identity, |session| read(session.state()))
    }

    async fn debounced<F, T>(&self, identity: &DeviceIdentity, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.registry.contains(identity) {
            return Err(Error::invalid_device(&identity.id));
        }
        self.scheduler
            .schedule(&identity.id, self.debounce, call)
            .await
    }

    async fn apply_onoff(&self, identity: &DeviceIdentity, on: bool) -> Result<bool> {
        debug!("set onoff {} = {}", identity, on);
        let handle = self.registry.update(identity, |session| {
            session.state.onoff = Some(on);
            Arc::clone(session.handle())
        })?;

        if on {
            handle.turn_on().await?;
        } else {
            handle.turn_off().await?;
        }
        Ok(on)
    }

    async fn apply_dim(&self, identity: &DeviceIdentity, dim: f64) -> Result<f64> {
        debug!("set dim {} = {}", identity, dim);
        let on = dim > 0.0;
        let handle = self.registry.update(identity, |session| {
            session.state.dim = Some(dim);
            session.state.onoff = Some(on);
            Arc::clone(session.handle())
        })?;
        self.host.realtime(identity, Capability::OnOff, on.into());

        handle.set_brightness(Brightness::from_dim(dim)).await?;
        Ok(dim)
    }

    async fn apply_hue(&self, identity: &DeviceIdentity, hue: f64) -> Result<f64> {
        debug!("set light_hue {} = {}", identity, hue);
        let handle = self
            .prepare(identity, LightMode::Color, |state| state.light_hue = hue)
            .await?;
        let saturation = self.read(identity, |state| state.light_saturation)?;

        handle
            .set_hsv(HueSaturation::from_normalized(hue, saturation))
            .await?;
        Ok(hue)
    }

    async fn apply_saturation(&self, identity: &DeviceIdentity, saturation: f64) -> Result<f64> {
        debug!("set light_saturation {} = {}", identity, saturation);
        let handle = self
            .prepare(identity, LightMode::Color, |state| {
                state.light_saturation = saturation
            })
            .await?;
        let hue = self.read(identity, |state| state.light_hue)?;

        handle
            .set_hsv(HueSaturation::from_normalized(hue, saturation))
            .await?;
        Ok(saturation)
    }

    async fn apply_temperature(&self, identity: &DeviceIdentity, temperature: f64) -> Result<f64> {
        debug!("set light_temperature {} = {}", identity, temperature);
        let handle = self
            .prepare(identity, LightMode::Temperature, |state| {
                state.light_temperature = Some(temperature)
            })
            .await?;
        let current = self.read(identity, |state| {
            state.light_temperature.unwrap_or(temperature)
        })?;

        handle
            .set_color_temperature(Kelvin::from_normalized(current))
            .await?;
        Ok(temperature)
    }

    fn parse_mode(&self, identity: &DeviceIdentity, requested: &str) -> Result<LightMode> {
        match LightMode::from_str(requested) {
            Ok(mode) => Ok(mode),
            Err(_) if self.strict_mode => Err(Error::invalid_value(
                Capability::LightMode,
                &format!("unknown mode {requested:?}"),
            )),
            Err(_) => {
                warn!("unknown light mode {:?} for {}, using color", requested, identity);
                Ok(LightMode::Color)
            }
        }
    }

    async fn apply_light_mode(&self, identity: &DeviceIdentity, mode: LightMode) -> Result<LightMode> {
        debug!("set light_mode {} = {}", identity, mode);
        let (hue, temperature) = self.registry.update(identity, |session| {
            session.state.light_mode = Some(mode);
            (session.state.light_hue, session.state.light_temperature)
        })?;

        match mode {
            LightMode::Temperature => {
                self.apply_temperature(identity, temperature.unwrap_or(DEFAULT_TEMPERATURE))
                    .await?;
            }
            LightMode::Color => {
                self.apply_hue(identity, hue).await?;
            }
        }
        Ok(mode)
    }

    /// Update the cache for a color or temperature write and make sure the
    /// bulb is lit before the command goes out.
    async fn prepare(
        &self,
        identity: &DeviceIdentity,
        mode: LightMode,
        write: impl FnOnce(&mut DeviceState),
    ) -> Result<Arc<A::Handle>> {
        let (handle, mode_forced, lit) = self.registry.update(identity, |session| {
            write(&mut session.state);
            let forced = session.state.force_mode(mode);
            (Arc::clone(session.handle()), forced, session.state.is_on())
        })?;

        if mode_forced {
            self.host.realtime(identity, Capability::LightMode, mode.into());
        }

        if !lit {
            self.apply_onoff(identity, true).await?;
            self.host.realtime(identity, Capability::OnOff, true.into());
            runtime::sleep(self.settle).await;
        }
        Ok(handle)
    }

    async fn apply_flow(&self, identity: &DeviceIdentity, effect: Effect) -> Result<()> {
        debug!("set effect {} = {}", identity, effect);
        let handle = self.registry.update(identity, |session| {
            session.flow = FlowProperties {
                alert: Alert::None,
                effect,
            };
            Arc::clone(session.handle())
        })?;

        match effect {
            Effect::ColorLoop => handle.start_color_flow().await,
            Effect::None => handle.stop_color_flow().await,
        }
    }
}

fn number(capability: Capability, value: &CapabilityValue) -> Result<f64> {
    match value.as_number() {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(Error::invalid_value(capability, "expected a finite number")),
    }
}
