use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::app::{
    BundleKind, DEFAULT_CLIPBOARD_PORT, DEFAULT_INBOUND_PORT, DEFAULT_OUTBOUND_PORT, MountOptions,
    PortNames,
};

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_LOCATION: &str = "http://localhost:3000/";
pub const DEFAULT_MOUNT_POINT: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClipboardKind {
    /// The platform clipboard tool (pbcopy, clip, wl-copy or xclip)
    System,
    /// Keep copied text in memory
    Memory,
}

/// Host a compiled browser application and bridge its ports to a game server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct HostConfig {
    /// Application bundle, a file path or an http(s) URL
    #[arg(long, env = "PORT_BRIDGE_BUNDLE", default_value = "dist/main.js")]
    pub bundle: String,

    /// Load the bundle as an ES module instead of a classic script
    #[arg(long)]
    pub module: bool,

    /// Global expression whose `init` starts the application
    #[arg(long, default_value = "Elm.Main")]
    pub entry: String,

    /// Page location; its query carries the `room` and `playerName` flags
    #[arg(long, env = "PORT_BRIDGE_LOCATION", default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// Game server WebSocket endpoint
    #[arg(long, env = "PORT_BRIDGE_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Id of the element the application is mounted on
    #[arg(long, default_value = DEFAULT_MOUNT_POINT)]
    pub mount_point: String,

    /// Ids of the elements present in the page
    #[arg(long = "page-element", default_value = DEFAULT_MOUNT_POINT)]
    pub page_elements: Vec<String>,

    /// Port that receives socket messages
    #[arg(long, default_value = DEFAULT_INBOUND_PORT)]
    pub inbound_port: String,

    /// Port whose messages are sent to the socket
    #[arg(long, default_value = DEFAULT_OUTBOUND_PORT)]
    pub outbound_port: String,

    /// Port whose messages are copied to the clipboard
    #[arg(long, default_value = DEFAULT_CLIPBOARD_PORT)]
    pub clipboard_port: String,

    /// Clipboard backend
    #[arg(long, value_enum, default_value_t = ClipboardKind::System)]
    pub clipboard: ClipboardKind,

    /// Directory for the background asset cache; disabled when unset
    #[arg(long, env = "PORT_BRIDGE_ASSET_CACHE")]
    pub asset_cache: Option<PathBuf>,

    /// Extra asset URLs to prefetch into the cache
    #[arg(long = "cache-asset")]
    pub cached_assets: Vec<String>,
}

impl HostConfig {
    pub fn bundle_kind(&self) -> BundleKind {
        if self.module {
            BundleKind::Module
        } else {
            BundleKind::Script
        }
    }

    pub fn port_names(&self) -> PortNames {
        PortNames {
            inbound: self.inbound_port.clone(),
            outbound: self.outbound_port.clone(),
            clipboard: self.clipboard_port.clone(),
        }
    }

    pub fn mount_options(&self) -> MountOptions {
        MountOptions {
            mount_point: self.mount_point.clone(),
            entry: self.entry.clone(),
            ports: self.port_names(),
        }
    }

    /// Everything the asset cache should prefetch: the bundle plus extras.
    pub fn assets(&self) -> Vec<String> {
        std::iter::once(self.bundle.clone())
            .chain(self.cached_assets.iter().cloned())
            .collect()
    }
}
