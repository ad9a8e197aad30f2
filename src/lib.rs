//! # port_bridge
//!
//! Hosts a compiled browser application inside an embedded Boa engine and
//! wires it to a game server:
//!
//! - the page location's `room` and `playerName` parameters become the
//!   application's startup flags,
//! - every text frame from the single WebSocket goes to the `websocketIn` port,
//! - every message on the `websocketOut` port is sent as one text frame,
//! - every message on the `copyToClipboard` port is copied to the clipboard.
//!
//! The socket is never reconnected. When it closes the application stops
//! hearing from the server.
//!
//! ```no_run
//! use clap::Parser;
//! use port_bridge::{HostConfig, bootstrap};
//!
//! let config = HostConfig::parse_from(["port-bridge", "--bundle", "dist/main.js"]);
//! let page = bootstrap(&config).expect("page failed to start");
//! // ... run until shutdown
//! page.shutdown();
//! ```

pub mod app;
pub mod asset_cache;
pub mod bootstrap;
pub mod bridge;
pub mod clipboard;
pub mod config;
pub mod dom;
pub mod error;
pub mod flags;
pub mod js;
pub mod port;
pub mod runtime;
pub mod socket;

pub use app::{AppHandle, Bundle, BundleKind, JsApplication, MountOptions, PortNames};
pub use bootstrap::{Page, bootstrap, bootstrap_with_clipboard};
pub use bridge::Bridge;
pub use config::HostConfig;
pub use error::{BootstrapError, ClipboardError, SocketError};
pub use flags::{Location, StartupConfig};
pub use port::{Handler, Payload, Subscribers, Subscription};
pub use socket::{ReadyState, Socket, WebSocketConnection};
