//! Bootstrap
//!
//! Builds the page once at startup: flags, document, engine, mounted
//! application, socket, bridge, clipboard and asset cache. The resulting
//! [`Page`] owns all of them for the rest of the process.

use std::sync::Arc;

use crate::app::{Bundle, JsApplication};
use crate::asset_cache::{AssetCache, register_asset_cache};
use crate::bridge::Bridge;
use crate::clipboard::{
    ClipboardAdapter, ClipboardBackend, CommandClipboard, MemoryClipboard, NoClipboard,
    attach_clipboard,
};
use crate::config::{ClipboardKind, HostConfig};
use crate::dom::Document;
use crate::error::BootstrapError;
use crate::flags::{Location, StartupConfig};
use crate::js::{DomExtension, JsEngine, JsEngineBuilder, PortsExtension};
use crate::port::Subscription;
use crate::socket::{ReadyState, Socket, WebSocketConnection};

/// Everything that lives for the lifetime of the page.
pub struct Page {
    config: StartupConfig,
    document: Document,
    app: Arc<JsApplication>,
    socket: Arc<WebSocketConnection>,
    bridge: Bridge,
    clipboard: Subscription,
    engine: JsEngine,
}

impl Page {
    pub fn config(&self) -> &StartupConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn app(&self) -> &Arc<JsApplication> {
        &self.app
    }

    pub fn socket_state(&self) -> ReadyState {
        self.socket.ready_state()
    }

    /// Close the socket and stop the engine.
    pub fn shutdown(self) {
        log::info!("Shutting down page");
        self.bridge.detach();
        self.clipboard.cancel();
        self.socket.close();
        self.engine.shutdown();
    }
}

/// Clipboard backend selected by the configuration.
pub fn clipboard_backend(kind: ClipboardKind) -> Arc<dyn ClipboardBackend> {
    match kind {
        ClipboardKind::Memory => Arc::new(MemoryClipboard::new()),
        ClipboardKind::System => match CommandClipboard::detect() {
            Some(backend) => Arc::new(backend),
            None => {
                log::warn!("No clipboard tool found, copy requests will be ignored");
                Arc::new(NoClipboard)
            }
        },
    }
}

pub fn bootstrap(host: &HostConfig) -> Result<Page, BootstrapError> {
    bootstrap_with_clipboard(host, clipboard_backend(host.clipboard))
}

pub fn bootstrap_with_clipboard(
    host: &HostConfig,
    clipboard: Arc<dyn ClipboardBackend>,
) -> Result<Page, BootstrapError> {
    let location = Location::parse(&host.location)?;
    let config = StartupConfig::from_location(location.url());
    log::info!(
        "Starting page at {} (joining room: {}, room: {:?}, opponent: {:?})",
        config.host,
        config.joining_room,
        config.room_id,
        config.opponent_name
    );

    let document = Document::with_elements(host.page_elements.iter().cloned());

    let asset_cache = match &host.asset_cache {
        Some(dir) => Some(AssetCache::open(dir)?),
        None => None,
    };

    let options = host.mount_options();
    let ports = options.ports.registry();

    let engine = JsEngineBuilder::new()
        .with_extension(DomExtension::new(document.clone(), location.clone()))
        .with_extension(PortsExtension::new(ports.clone()))
        .with_asset_cache(asset_cache.clone())
        .start()?;

    let bundle = Bundle::load(&host.bundle, host.bundle_kind(), asset_cache.as_ref())?;
    let app = Arc::new(JsApplication::mount(
        &engine, &document, ports, &bundle, &options, &config,
    )?);

    let socket =
        Arc::new(WebSocketConnection::new(&host.server_url).with_origin(location.origin()));
    let bridge = Bridge::attach(socket.clone(), app.clone());

    let adapter = Arc::new(ClipboardAdapter::new(document.clone(), clipboard));
    let clipboard = attach_clipboard(app.as_ref(), adapter);

    // Handlers are in place before the first frame can arrive.
    socket.connect();

    if let Some(cache) = asset_cache {
        drop(register_asset_cache(cache, host.assets()));
    }

    Ok(Page {
        config,
        document,
        app,
        socket,
        bridge,
        clipboard,
        engine,
    })
}
