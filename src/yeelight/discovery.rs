//! Bulb discovery via UDP multicast search.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use super::bulb::Bulb;
use super::protocol::{Advertisement, MULTICAST_ADDR, search_request};
use crate::adapter::{DiscoveryAdapter, LiveHandle};
use crate::config::DriverConfig;
use crate::errors::Error;
use crate::runtime::{self, Instant, lock};

type Result<T> = std::result::Result<T, Error>;

const FOUND_CAPACITY: usize = 32;

/// Keeps every bulb seen on the network and announces new ones.
///
/// A bulb that answers from a new address gets a fresh [`Bulb`] handle and is
/// announced again, so registered sessions reconnect to the new address.
///
/// # Examples
///
/// ```ignore
/// let discovery = YeelightDiscovery::new(&DriverConfig::default());
/// discovery.search("wifi_bulb").await?;
/// for bulb in discovery.get_all() {
///     println!("{} at {}", bulb.id(), bulb.addr());
/// }
/// ```
#[derive(Debug)]
pub struct YeelightDiscovery {
    bulbs: Mutex<HashMap<String, Arc<Bulb>>>,
    found: broadcast::Sender<Arc<Bulb>>,
    listen: Duration,
    command_timeout: Duration,
}

impl YeelightDiscovery {
    pub fn new(config: &DriverConfig) -> Self {
        let (found, _) = broadcast::channel(FOUND_CAPACITY);
        YeelightDiscovery {
            bulbs: Mutex::new(HashMap::new()),
            found,
            listen: config.search_listen,
            command_timeout: config.command_timeout,
        }
    }

    /// Record an advertisement, announcing the bulb if it is new or moved.
    pub fn observe(&self, advertisement: Advertisement) {
        let announce = {
            let mut bulbs = lock(&self.bulbs);
            let known = bulbs
                .get(&advertisement.id)
                .filter(|bulb| bulb.addr() == advertisement.location)
                .cloned();
            match known {
                Some(bulb) => {
                    bulb.refresh(advertisement);
                    None
                }
                None => {
                    let bulb = Arc::new(Bulb::new(advertisement, self.command_timeout));
                    bulbs.insert(bulb.id().to_string(), Arc::clone(&bulb));
                    Some(bulb)
                }
            }
        };

        if let Some(bulb) = announce {
            info!("found {} at {}", bulb.id(), bulb.addr());
            // No receivers is fine; nothing is waiting for this bulb.
            let _ = self.found.send(bulb);
        }
    }

    fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) {
        let text = match String::from_utf8(datagram.to_vec()) {
            Ok(text) => text,
            Err(e) => {
                debug!("ignoring reply from {}: {}", from, Error::Utf8Decode(e));
                return;
            }
        };
        match Advertisement::parse(&text) {
            Ok(advertisement) => self.observe(advertisement),
            Err(e) => debug!("ignoring reply from {}: {}", from, e),
        }
    }
}

impl DiscoveryAdapter for YeelightDiscovery {
    type Handle = Bulb;

    async fn search(&self, target: &str) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::socket("bind", e))?;

        socket
            .send_to(search_request(target).as_bytes(), MULTICAST_ADDR)
            .await
            .map_err(|e| Error::socket("send_to", e))?;

        let start = Instant::now();
        let mut buffer = [0u8; 2048];
        while start.elapsed() < self.listen {
            let remaining = self.listen.saturating_sub(start.elapsed());
            match runtime::timeout(remaining, socket.recv_from(&mut buffer)).await {
                Ok(Ok((size, from))) => self.handle_datagram(&buffer[..size], from),
                Ok(Err(e)) => debug!("recv_from failed during search: {}", e),
                Err(_) => break,
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<Bulb>> {
        self.found.subscribe()
    }

    fn get_by_id(&self, id: &str) -> Option<Arc<Bulb>> {
        lock(&self.bulbs).get(id).cloned()
    }

    fn get_all(&self) -> Vec<Arc<Bulb>> {
        let mut bulbs: Vec<_> = lock(&self.bulbs).values().cloned().collect();
        bulbs.sort_by(|a, b| a.id().cmp(b.id()));
        bulbs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(id: &str, location: &str) -> Vec<u8> {
        format!("HTTP/1.1 200 OK\r\nLocation: yeelight://{location}\r\nid: {id}\r\nbright: 40\r\n")
            .into_bytes()
    }

    fn from() -> SocketAddr {
        "192.168.1.2:1982".parse().unwrap()
    }

    #[test]
    fn test_new_bulbs_are_announced() {
        let discovery = YeelightDiscovery::new(&DriverConfig::default());
        let mut found = discovery.subscribe();

        discovery.handle_datagram(&reply("0x2", "192.168.1.2:55443"), from());
        discovery.handle_datagram(&reply("0x1", "192.168.1.3:55443"), from());

        assert_eq!(found.try_recv().unwrap().id(), "0x2");
        assert_eq!(found.try_recv().unwrap().id(), "0x1");
        let ids: Vec<_> = discovery
            .get_all()
            .iter()
            .map(|bulb| bulb.id().to_string())
            .collect();
        assert_eq!(ids, vec!["0x1", "0x2"]);
    }

    #[test]
    fn test_repeated_reply_refreshes_without_announcing() {
        let discovery = YeelightDiscovery::new(&DriverConfig::default());
        discovery.handle_datagram(&reply("0x1", "192.168.1.2:55443"), from());
        let first = discovery.get_by_id("0x1").unwrap();

        let mut found = discovery.subscribe();
        let update = "HTTP/1.1 200 OK\r\nLocation: yeelight://192.168.1.2:55443\r\nid: 0x1\r\nbright: 90\r\n";
        discovery.handle_datagram(update.as_bytes(), from());

        assert!(found.try_recv().is_err());
        assert!(Arc::ptr_eq(&first, &discovery.get_by_id("0x1").unwrap()));
        assert_eq!(first.advertisement().bright, Some(90));
    }

    #[test]
    fn test_moved_bulb_gets_new_handle() {
        let discovery = YeelightDiscovery::new(&DriverConfig::default());
        discovery.handle_datagram(&reply("0x1", "192.168.1.2:55443"), from());
        let first = discovery.get_by_id("0x1").unwrap();

        let mut found = discovery.subscribe();
        discovery.handle_datagram(&reply("0x1", "192.168.1.9:55443"), from());

        let moved = found.try_recv().unwrap();
        assert!(!Arc::ptr_eq(&first, &moved));
        assert_eq!(moved.addr(), "192.168.1.9:55443".parse().unwrap());
        assert_eq!(discovery.get_all().len(), 1);
    }

    #[test]
    fn test_garbage_is_ignored() {
        let discovery = YeelightDiscovery::new(&DriverConfig::default());
        discovery.handle_datagram(&[0xff, 0xfe, 0x00], from());
        discovery.handle_datagram(b"HTTP/1.1 200 OK\r\nid: 0x1\r\n", from());
        discovery.handle_datagram(search_request("wifi_bulb").as_bytes(), from());
        assert!(discovery.get_all().is_empty());
    }
}
