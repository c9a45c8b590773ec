//! Outbound calls into the host platform.

use crate::capability::{Capability, CapabilityValue};
use crate::device::DeviceIdentity;

/// Notifications the driver sends to the host. All calls are fire-and-forget.
pub trait Host: Send + Sync + 'static {
    /// The device was found on the network and is ready for commands.
    fn set_available(&self, identity: &DeviceIdentity);

    /// The device could not be reached.
    fn set_unavailable(&self, identity: &DeviceIdentity, reason: &str);

    /// A capability changed as a side effect of another call.
    fn realtime(&self, identity: &DeviceIdentity, capability: Capability, value: CapabilityValue);
}
