//! Yeelight LAN protocol messages.
//!
//! Discovery is an SSDP-like exchange over UDP multicast; commands are JSON
//! objects, one per line, over TCP.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

pub const MULTICAST_ADDR: &str = "239.255.255.250:1982";
pub const COMMAND_PORT: u16 = 55443;

pub(crate) const TRANSITION_EFFECT: &str = "smooth";
pub(crate) const TRANSITION_MS: u32 = 300;

/// Properties read by `get_values`.
pub(crate) const PROPS: [&str; 8] = [
    "power",
    "bright",
    "ct",
    "rgb",
    "hue",
    "sat",
    "color_mode",
    "name",
];

/// Endless hue cycle: red, green, blue, two seconds each, full brightness.
pub(crate) const COLOR_LOOP_FLOW: &str = "2000,1,16711680,100,2000,1,65280,100,2000,1,255,100";

/// The search request sent to the multicast group.
pub fn search_request(target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\nHOST: {MULTICAST_ADDR}\r\nMAN: \"ssdp:discover\"\r\nST: {target}\r\n"
    )
}

/// A bulb's answer to a search (or its periodic NOTIFY).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    pub id: String,
    pub location: SocketAddr,
    pub model: Option<String>,
    pub fw_ver: Option<String>,
    #[serde(default)]
    pub support: Vec<String>,
    pub power: Option<bool>,
    pub bright: Option<u8>,
    pub color_mode: Option<u8>,
    pub ct: Option<u16>,
    pub rgb: Option<u32>,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub name: Option<String>,
}

impl Advertisement {
    /// Parse the header block of a search reply.
    ///
    /// # Examples
    ///
    /// ```
    /// use yeelight_driver::yeelight::Advertisement;
    ///
    /// let reply = "HTTP/1.1 200 OK\r\n\
    ///              Location: yeelight://192.168.1.239:55443\r\n\
    ///              id: 0x000000000015243f\r\n\
    ///              power: on\r\n";
    /// let ad = Advertisement::parse(reply).unwrap();
    /// assert_eq!(ad.id, "0x000000000015243f");
    /// assert_eq!(ad.location.port(), 55443);
    /// assert_eq!(ad.power, Some(true));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let status = lines.next().unwrap_or_default();
        if !(status.starts_with("HTTP/1.1 200") || status.starts_with("NOTIFY")) {
            return Err(Error::InvalidAdvertisement(format!(
                "unexpected status line {status:?}"
            )));
        }

        let mut id = None;
        let mut location = None;
        let mut ad = Advertisement {
            id: String::new(),
            location: SocketAddr::from(([0, 0, 0, 0], COMMAND_PORT)),
            model: None,
            fw_ver: None,
            support: Vec::new(),
            power: None,
            bright: None,
            color_mode: None,
            ct: None,
            rgb: None,
            hue: None,
            sat: None,
            name: None,
        };

        for line in lines {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "location" => location = Some(parse_location(value)?),
                "id" => id = Some(value.to_string()),
                "model" => ad.model = Some(value.to_string()),
                "fw_ver" => ad.fw_ver = Some(value.to_string()),
                "support" => ad.support = value.split_whitespace().map(String::from).collect(),
                "power" => ad.power = parse_power(value),
                "bright" => ad.bright = value.parse().ok(),
                "color_mode" => ad.color_mode = value.parse().ok(),
                "ct" => ad.ct = value.parse().ok(),
                "rgb" => ad.rgb = value.parse().ok(),
                "hue" => ad.hue = value.parse().ok(),
                "sat" => ad.sat = value.parse().ok(),
                "name" => ad.name = Some(value.to_string()).filter(|name| !name.is_empty()),
                _ => {}
            }
        }

        ad.id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidAdvertisement("missing id".to_string()))?;
        ad.location =
            location.ok_or_else(|| Error::InvalidAdvertisement("missing location".to_string()))?;
        Ok(ad)
    }

    pub fn supports(&self, method: &str) -> bool {
        self.support.iter().any(|m| m == method)
    }

    /// Fold a property push or `get_prop` result into the cached values.
    pub(crate) fn apply_props(&mut self, props: &Map<String, Value>) {
        for (key, value) in props {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match key.as_str() {
                "power" => self.power = parse_power(&text),
                "bright" => self.bright = text.parse().ok(),
                "color_mode" => self.color_mode = text.parse().ok(),
                "ct" => self.ct = text.parse().ok(),
                "rgb" => self.rgb = text.parse().ok(),
                "hue" => self.hue = text.parse().ok(),
                "sat" => self.sat = text.parse().ok(),
                "name" => self.name = Some(text).filter(|name| !name.is_empty()),
                _ => {}
            }
        }
    }
}

fn parse_location(value: &str) -> Result<SocketAddr> {
    value
        .strip_prefix("yeelight://")
        .and_then(|addr| addr.parse().ok())
        .ok_or_else(|| Error::InvalidAdvertisement(format!("bad location {value:?}")))
}

fn parse_power(value: &str) -> Option<bool> {
    match value {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

/// An outgoing command line.
#[derive(Debug, Serialize)]
pub(crate) struct Command<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Vec<Value>,
}

impl Command<'_> {
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self).map_err(Error::JsonDump)?;
        line.push_str("\r\n");
        Ok(line)
    }
}

/// An incoming line: either the reply to a command or an unsolicited push.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Message {
    Reply(Reply),
    Notification {
        method: String,
        params: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Reply {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<ReplyError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReplyError {
    pub code: i64,
    pub message: String,
}

impl Reply {
    pub fn into_result(self, method: &str) -> Result<Vec<Value>> {
        match self.error {
            Some(error) => Err(Error::Protocol {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or_default()),
        }
    }
}
