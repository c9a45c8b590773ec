//! Yeelight LAN transport: multicast discovery and the JSON command channel.

mod bulb;
mod discovery;
mod protocol;

pub use bulb::Bulb;
pub use discovery::YeelightDiscovery;
pub use protocol::{Advertisement, COMMAND_PORT, MULTICAST_ADDR, search_request};
