//! Socket
//!
//! The single game-server connection. [`Socket`] is the seam the bridge
//! talks to; [`WebSocketConnection`] is the tokio-tungstenite implementation.
//!
//! There is no reconnection: once a connection reaches `Closed` it stays
//! there and further sends fail.

mod connection;

use std::fmt;

pub use connection::WebSocketConnection;

use crate::error::SocketError;
use crate::port::{Handler, Payload, Subscription};

/// WebSocket ready states (matching browser API)
pub const WS_CONNECTING: u32 = 0;
pub const WS_OPEN: u32 = 1;
pub const WS_CLOSING: u32 = 2;
pub const WS_CLOSED: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    pub fn from_u32(state: u32) -> Self {
        match state {
            WS_CONNECTING => Self::Connecting,
            WS_OPEN => Self::Open,
            WS_CLOSING => Self::Closing,
            _ => Self::Closed,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Connecting => WS_CONNECTING,
            Self::Open => WS_OPEN,
            Self::Closing => WS_CLOSING,
            Self::Closed => WS_CLOSED,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// A text-frame transport with handler registration.
pub trait Socket: Send + Sync {
    /// Register a handler for every inbound text frame.
    fn on_message(&self, handler: Handler) -> Subscription;

    /// Send one text frame. Nothing is queued while the socket is not open.
    fn send(&self, payload: Payload) -> Result<(), SocketError>;

    fn ready_state(&self) -> ReadyState;
}
