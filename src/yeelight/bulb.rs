use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, oneshot};

use super::protocol::{
    Advertisement, COLOR_LOOP_FLOW, Command, Message, PROPS, Reply, TRANSITION_EFFECT,
    TRANSITION_MS,
};
use crate::adapter::LiveHandle;
use crate::errors::Error;
use crate::runtime::{self, AsyncMutex, TaskGuard, lock};
use crate::types::{Brightness, HueSaturation, Kelvin, PowerMode};

type Result<T> = std::result::Result<T, Error>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

const NOTIFICATION_CAPACITY: usize = 16;

/// A Yeelight bulb reachable over its LAN command port.
///
/// The TCP connection is opened lazily on the first command and reopened
/// after it drops. Replies are matched to commands by id; property pushes go
/// to [`LiveHandle::notifications`] subscribers.
#[derive(Debug)]
pub struct Bulb {
    id: String,
    advertisement: Arc<Mutex<Advertisement>>,
    command_timeout: Duration,
    next_id: AtomicU64,
    connection: AsyncMutex<Option<Connection>>,
    pending: Pending,
    notifications: broadcast::Sender<Value>,
}

#[derive(Debug)]
struct Connection {
    writer: OwnedWriteHalf,
    reader: TaskGuard,
}

impl Bulb {
    pub fn new(advertisement: Advertisement, command_timeout: Duration) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Bulb {
            id: advertisement.id.clone(),
            advertisement: Arc::new(Mutex::new(advertisement)),
            command_timeout,
            next_id: AtomicU64::new(1),
            connection: AsyncMutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            notifications,
        }
    }

    /// Command endpoint of the bulb.
    pub fn addr(&self) -> SocketAddr {
        lock(&self.advertisement).location
    }

    /// Last known advertisement, including pushed property changes.
    pub fn advertisement(&self) -> Advertisement {
        lock(&self.advertisement).clone()
    }

    /// Replace the cached advertisement with a fresher one from discovery.
    pub(crate) fn refresh(&self, advertisement: Advertisement) {
        *lock(&self.advertisement) = advertisement;
    }

    async fn set_power(&self, power: PowerMode) -> Result<()> {
        self.send(
            "set_power",
            vec![
                json!(power.as_ref()),
                json!(TRANSITION_EFFECT),
                json!(TRANSITION_MS),
            ],
        )
        .await?;
        lock(&self.advertisement).power = Some(power == PowerMode::On);
        Ok(())
    }

    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Vec<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = Command { id, method, params }.to_line()?;

        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        if let Err(e) = self.write(&line).await {
            lock(&self.pending).remove(&id);
            return Err(e);
        }
        debug!("{} <- {}", self.id, line.trim_end());

        let reply = match runtime::timeout(self.command_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(Error::ConnectionClosed(self.addr().to_string())),
            Err(_) => {
                lock(&self.pending).remove(&id);
                return Err(Error::timed_out("receive"));
            }
        };
        reply.into_result(method)
    }

    async fn write(&self, line: &str) -> Result<()> {
        let mut connection = self.connection.lock().await;
        let mut conn = match connection.take() {
            Some(conn) if !conn.reader.is_finished() => conn,
            _ => self.connect().await?,
        };

        // A failed write drops the connection; the next command reconnects.
        conn.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::socket("send", e))?;
        *connection = Some(conn);
        Ok(())
    }

    async fn connect(&self) -> Result<Connection> {
        let addr = self.addr();
        debug!("connecting to {} at {}", self.id, addr);
        let stream = runtime::timeout(self.command_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::timed_out("connect"))?
            .map_err(|e| Error::socket("connect", e))?;

        let (reader, writer) = stream.into_split();
        let reader = runtime::spawn(read_replies(
            self.id.clone(),
            reader,
            Arc::clone(&self.pending),
            self.notifications.clone(),
            Arc::clone(&self.advertisement),
        ));
        Ok(Connection { writer, reader })
    }
}

async fn read_replies(
    id: String,
    reader: OwnedReadHalf,
    pending: Pending,
    notifications: broadcast::Sender<Value>,
    advertisement: Arc<Mutex<Advertisement>>,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("{} closed the connection", id);
                break;
            }
            Err(e) => {
                warn!("reading from {} failed: {}", id, e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("{} -> {}", id, line);

        match serde_json::from_str::<Message>(line) {
            Ok(Message::Reply(reply)) => {
                let waiter = lock(&pending).remove(&reply.id);
                match waiter {
                    Some(waiter) => {
                        let _ = waiter.send(reply);
                    }
                    None => debug!("{} answered unknown command {}", id, reply.id),
                }
            }
            Ok(Message::Notification { method, params }) => {
                if method != "props" {
                    debug!("{} sent unhandled {}", id, method);
                    continue;
                }
                lock(&advertisement).apply_props(&params);
                let _ = notifications.send(Value::Object(params));
            }
            Err(e) => warn!("unreadable line from {}: {}", id, Error::JsonLoad(e)),
        }
    }

    // Dropping the senders fails every command still waiting on this connection.
    lock(&pending).clear();
}

impl LiveHandle for Bulb {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_values(&self) -> Result<Map<String, Value>> {
        let params = PROPS.iter().map(|prop| json!(prop)).collect();
        let result = self.send("get_prop", params).await?;
        let values: Map<String, Value> = PROPS
            .iter()
            .map(|prop| prop.to_string())
            .zip(result)
            .collect();
        lock(&self.advertisement).apply_props(&values);
        Ok(values)
    }

    async fn get_name(&self) -> Result<Option<String>> {
        let result = self.send("get_prop", vec![json!("name")]).await?;
        let name = result
            .first()
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(String::from);
        lock(&self.advertisement).name = name.clone();
        Ok(name)
    }

    async fn get_id(&self) -> Result<String> {
        Ok(self.id.clone())
    }

    async fn set_name(&self, name: &str) -> Result<()> {
        self.send("set_name", vec![json!(name)]).await?;
        lock(&self.advertisement).name = Some(name.to_string()).filter(|name| !name.is_empty());
        Ok(())
    }

    async fn turn_on(&self) -> Result<()> {
        self.set_power(PowerMode::On).await
    }

    async fn turn_off(&self) -> Result<()> {
        self.set_power(PowerMode::Off).await
    }

    async fn set_brightness(&self, brightness: Brightness) -> Result<()> {
        // The bulb only accepts 1..=100.
        let bright = brightness.value().max(1);
        self.send(
            "set_bright",
            vec![json!(bright), json!(TRANSITION_EFFECT), json!(TRANSITION_MS)],
        )
        .await?;
        lock(&self.advertisement).bright = Some(bright);
        Ok(())
    }

    async fn set_hsv(&self, color: HueSaturation) -> Result<()> {
        self.send(
            "set_hsv",
            vec![
                json!(color.hue()),
                json!(color.saturation()),
                json!(TRANSITION_EFFECT),
                json!(TRANSITION_MS),
            ],
        )
        .await?;
        Ok(())
    }

    async fn set_color_temperature(&self, kelvin: Kelvin) -> Result<()> {
        self.send(
            "set_ct_abx",
            vec![
                json!(kelvin.kelvin()),
                json!(TRANSITION_EFFECT),
                json!(TRANSITION_MS),
            ],
        )
        .await?;
        Ok(())
    }

    async fn start_color_flow(&self) -> Result<()> {
        self.send("start_cf", vec![json!(0), json!(1), json!(COLOR_LOOP_FLOW)])
            .await?;
        Ok(())
    }

    async fn stop_color_flow(&self) -> Result<()> {
        self.send("stop_cf", Vec::new()).await?;
        Ok(())
    }

    fn notifications(&self) -> broadcast::Receiver<Value> {
        self.notifications.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    fn advertisement(location: SocketAddr) -> Advertisement {
        let text = format!("HTTP/1.1 200 OK\r\nLocation: yeelight://{location}\r\nid: 0x42\r\n");
        Advertisement::parse(&text).unwrap()
    }

    /// Accepts one connection and answers each command with `respond`.
    async fn serve<F>(respond: F) -> (SocketAddr, tokio::task::JoinHandle<Vec<Value>>)
    where
        F: Fn(&Value) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let mut received = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let command: Value = serde_json::from_str(&line).unwrap();
                for reply in respond(&command) {
                    writer.write_all(reply.as_bytes()).await.unwrap();
                }
                received.push(command);
            }
            received
        });
        (addr, server)
    }

    #[tokio::test]
    async fn test_commands_and_replies() {
        let (addr, server) = serve(|command| {
            let id = &command["id"];
            let reply = match command["method"].as_str() {
                Some("get_prop") => json!({"id": id, "result": ["on", "80", "", "", "", "", "2", "desk"]}),
                Some("set_hsv") => {
                    json!({"id": id, "error": {"code": -1, "message": "unsupported method"}})
                }
                _ => json!({"id": id, "result": ["ok"]}),
            };
            vec![format!("{reply}\r\n")]
        })
        .await;

        let bulb = Bulb::new(advertisement(addr), Duration::from_secs(2));
        bulb.turn_on().await.unwrap();
        bulb.set_brightness(Brightness::create(0).unwrap()).await.unwrap();

        let values = bulb.get_values().await.unwrap();
        assert_eq!(values["bright"], json!("80"));
        assert_eq!(values["name"], json!("desk"));
        assert_eq!(bulb.advertisement().name.as_deref(), Some("desk"));

        let err = bulb
            .set_hsv(HueSaturation::create(120, 50).unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Protocol {
                method: "set_hsv".into(),
                code: -1,
                message: "unsupported method".into(),
            }
        );

        drop(bulb);
        let received = server.await.unwrap();
        assert_eq!(received[0]["method"], "set_power");
        assert_eq!(received[0]["params"], json!(["on", "smooth", 300]));
        assert_eq!(received[1]["params"], json!([1, "smooth", 300]));
        assert_eq!(received[3]["params"], json!([120, 50, "smooth", 300]));
    }

    #[tokio::test]
    async fn test_property_push() {
        let (addr, _server) = serve(|command| {
            vec![
                format!("{}\r\n", json!({"method": "props", "params": {"power": "off"}})),
                format!("{}\r\n", json!({"id": command["id"], "result": ["ok"]})),
            ]
        })
        .await;

        let bulb = Bulb::new(advertisement(addr), Duration::from_secs(2));
        let mut notifications = bulb.notifications();
        bulb.stop_color_flow().await.unwrap();

        assert_eq!(notifications.recv().await.unwrap(), json!({"power": "off"}));
        assert_eq!(bulb.advertisement().power, Some(false));
    }

    #[tokio::test]
    async fn test_silent_bulb_times_out() {
        let (addr, _server) = serve(|_| Vec::new()).await;

        let bulb = Bulb::new(advertisement(addr), Duration::from_millis(100));
        let err = bulb.turn_off().await.unwrap_err();
        assert_eq!(err, Error::timed_out("receive"));
        assert!(lock(&bulb.pending).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_bulb() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let bulb = Bulb::new(advertisement(addr), Duration::from_secs(2));
        assert!(matches!(
            bulb.turn_on().await,
            Err(Error::Socket { .. })
        ));
    }
}
