use std::string::FromUtf8Error;

use crate::capability::Capability;

/// All error types that can occur while driving Yeelight bulbs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device is not registered with the driver (unknown or not yet discovered).
    #[error("invalid_device: {0}")]
    InvalidDevice(String),

    /// The bulb rejected a command.
    #[error("bulb rejected {method} (code {code}): {message}")]
    Protocol {
        method: String,
        code: i64,
        message: String,
    },

    /// A capability received a value it cannot apply.
    #[error("invalid value for {capability}: {reason}")]
    InvalidValue {
        capability: Capability,
        reason: String,
    },

    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A network socket operation failed while communicating with a bulb.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// A datagram or line from a bulb contained invalid UTF-8.
    #[error("utf8 decoding error: {0:?}")]
    Utf8Decode(FromUtf8Error),

    /// A discovery response could not be understood.
    #[error("invalid advertisement: {0}")]
    InvalidAdvertisement(String),

    /// The command connection closed before the bulb replied.
    #[error("connection to {0} closed")]
    ConnectionClosed(String),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new invalid device error
    pub fn invalid_device(id: &str) -> Self {
        Error::InvalidDevice(id.to_string())
    }

    /// Create a new invalid value error
    pub fn invalid_value(capability: Capability, reason: &str) -> Self {
        Error::InvalidValue {
            capability,
            reason: reason.to_string(),
        }
    }

    /// Create a new timeout error for the given socket action
    pub fn timed_out(action: &str) -> Self {
        Error::socket(
            action,
            std::io::Error::new(std::io::ErrorKind::TimedOut, format!("{action} timeout")),
        )
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
