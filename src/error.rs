//! Error types for startup, the socket and the clipboard.
//!
//! Startup errors are fatal and bubble up to `main`. Socket and clipboard
//! errors are only ever logged by the bridge.

use std::process::ExitStatus;

use thiserror::Error;

use crate::socket::ReadyState;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid page location {location:?}: {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("mount point #{0} not found in document")]
    MissingMountPoint(String),

    #[error("invalid application entry point {0:?}")]
    InvalidEntry(String),

    #[error("failed to read bundle {path}: {source}")]
    BundleRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch bundle {url}: {source}")]
    BundleFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("JS engine error: {0}")]
    Engine(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("failed to encode startup flags: {0}")]
    Flags(#[from] serde_json::Error),

    #[error("asset cache error: {0}")]
    AssetCache(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("WebSocket is not open (state: {0})")]
    NotOpen(ReadyState),

    #[error("WebSocket connection is gone")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("nothing is selected")]
    NothingSelected,

    #[error("no clipboard command available on this platform")]
    Unavailable,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to {program}: {source}")]
    Write {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
}
