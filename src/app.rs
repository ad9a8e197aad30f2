//! Application Mount
//!
//! Loads the compiled application into the JS engine, calls its
//! `init({ node, flags })` and exposes the resulting port handle to the host.
//!
//! Only the port contract matters here: one inbound port fed with socket
//! payloads, one outbound port carrying messages for the socket and one
//! carrying text to copy.

use crate::asset_cache::{self, AssetCache};
use crate::dom::Document;
use crate::error::BootstrapError;
use crate::flags::StartupConfig;
use crate::js::{JsEngine, JsEngineClient, PortRegistry};
use crate::port::{Handler, Payload, Subscription};
use crate::runtime::TOKIO;

pub const DEFAULT_INBOUND_PORT: &str = "websocketIn";
pub const DEFAULT_OUTBOUND_PORT: &str = "websocketOut";
pub const DEFAULT_CLIPBOARD_PORT: &str = "copyToClipboard";

/// The three-port contract of a mounted application.
pub trait AppHandle: Send + Sync {
    /// Deliver a payload to the inbound port. Never blocks.
    fn send_inbound(&self, payload: Payload);

    /// Observe messages the application wants sent to the network.
    fn subscribe_outbound(&self, handler: Handler) -> Subscription;

    /// Observe text the application wants copied.
    fn subscribe_clipboard(&self, handler: Handler) -> Subscription;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNames {
    pub inbound: String,
    pub outbound: String,
    pub clipboard: String,
}

impl Default for PortNames {
    fn default() -> Self {
        Self {
            inbound: DEFAULT_INBOUND_PORT.to_string(),
            outbound: DEFAULT_OUTBOUND_PORT.to_string(),
            clipboard: DEFAULT_CLIPBOARD_PORT.to_string(),
        }
    }
}

impl PortNames {
    /// Registry for the two outbound ports.
    pub fn registry(&self) -> PortRegistry {
        PortRegistry::new([self.outbound.clone(), self.clipboard.clone()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Id of the element the application is mounted on.
    pub mount_point: String,
    /// Global expression whose `init` starts the application, e.g. `Elm.Main`.
    pub entry: String,
    pub ports: PortNames,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            mount_point: "root".to_string(),
            entry: "Elm.Main".to_string(),
            ports: PortNames::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Classic script that defines the entry point globally.
    Script,
    /// ES module; it must still expose the entry point on `globalThis`.
    Module,
}

/// The compiled application source.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub name: String,
    pub source: String,
    pub kind: BundleKind,
}

impl Bundle {
    pub fn script(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            kind: BundleKind::Script,
        }
    }

    pub fn module(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            kind: BundleKind::Module,
        }
    }

    /// Read the bundle from a path or fetch it from an http(s) URL.
    ///
    /// A failed fetch is served from the asset cache when it has a copy.
    /// Must not be called from inside an async runtime when `location` is remote.
    pub fn load(
        location: &str,
        kind: BundleKind,
        cache: Option<&AssetCache>,
    ) -> Result<Self, BootstrapError> {
        let source = if asset_cache::is_remote(location) {
            match TOKIO.block_on(asset_cache::fetch_text(location)) {
                Ok(body) => body,
                Err(source) => match cache.and_then(|c| c.lookup(location)) {
                    Some(body) => {
                        log::warn!("Bundle fetch failed ({}), using cached copy", source);
                        body
                    }
                    None => {
                        return Err(BootstrapError::BundleFetch {
                            url: location.to_string(),
                            source,
                        });
                    }
                },
            }
        } else {
            std::fs::read_to_string(location).map_err(|source| BootstrapError::BundleRead {
                path: location.to_string(),
                source,
            })?
        };

        log::info!("Loaded bundle {} ({} bytes)", location, source.len());
        Ok(Self {
            name: location.to_string(),
            source,
            kind,
        })
    }
}

/// An application running inside the JS engine.
pub struct JsApplication {
    client: JsEngineClient,
    ports: PortRegistry,
    names: PortNames,
}

impl JsApplication {
    /// Load `bundle` and start the application on the mount point.
    ///
    /// `ports` must be the registry installed in `engine` through
    /// [`PortsExtension`](crate::js::PortsExtension).
    pub fn mount(
        engine: &JsEngine,
        document: &Document,
        ports: PortRegistry,
        bundle: &Bundle,
        options: &MountOptions,
        config: &StartupConfig,
    ) -> Result<Self, BootstrapError> {
        if !document.has_element(&options.mount_point) {
            return Err(BootstrapError::MissingMountPoint(options.mount_point.clone()));
        }
        let script = mount_script(options, config)?;
        let client = engine.client();

        let loaded = match bundle.kind {
            BundleKind::Script => client.evaluate(bundle.source.as_str()),
            BundleKind::Module => {
                client.load_esm_module(bundle.name.as_str(), bundle.source.as_str())
            }
        };
        loaded.map_err(BootstrapError::Script)?;

        client.evaluate(script).map_err(BootstrapError::Script)?;

        log::info!(
            "Mounted {} on #{} (joining room: {})",
            options.entry,
            options.mount_point,
            config.joining_room
        );

        Ok(Self {
            client,
            ports,
            names: options.ports.clone(),
        })
    }
}

impl AppHandle for JsApplication {
    fn send_inbound(&self, payload: Payload) {
        match delivery_script(&self.names.inbound, &payload) {
            Ok(script) => self.client.execute(script),
            Err(e) => log::error!("Failed to encode inbound payload: {}", e),
        }
    }

    fn subscribe_outbound(&self, handler: Handler) -> Subscription {
        self.ports.subscribe(&self.names.outbound, handler)
    }

    fn subscribe_clipboard(&self, handler: Handler) -> Subscription {
        self.ports.subscribe(&self.names.clipboard, handler)
    }
}

/// A dotted path of identifiers, e.g. `Elm.Main`.
fn is_valid_entry(entry: &str) -> bool {
    !entry.is_empty()
        && entry.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

fn mount_script(options: &MountOptions, config: &StartupConfig) -> Result<String, BootstrapError> {
    if !is_valid_entry(&options.entry) {
        return Err(BootstrapError::InvalidEntry(options.entry.clone()));
    }

    let mount_point = serde_json::to_string(&options.mount_point)?;
    let inbound = serde_json::to_string(&options.ports.inbound)?;
    let outbound = serde_json::to_string(&options.ports.outbound)?;
    let clipboard = serde_json::to_string(&options.ports.clipboard)?;

    Ok(format!(
        r#"
(function() {{
    var node = document.getElementById({mount_point});
    if (!node) {{
        throw new Error('Mount point not found: #' + {mount_point});
    }}

    var app = {entry}.init({{ node: node, flags: {flags} }});
    var ports = (app && app.ports) || {{}};

    globalThis.__port_deliver = function(name, value) {{
        var port = ports[name];
        if (!port || typeof port.send !== 'function') {{
            console.warn('[Ports] Application has no inbound port', name);
            return;
        }}
        port.send(value);
    }};

    if (!ports[{inbound}]) {{
        console.warn('[Ports] Application has no inbound port', {inbound});
    }}

    [{outbound}, {clipboard}].forEach(function(name) {{
        var port = ports[name];
        if (!port || typeof port.subscribe !== 'function') {{
            console.warn('[Ports] Application has no outbound port', name);
            return;
        }}
        port.subscribe(function(value) {{
            __port_emit(name, typeof value === 'string' ? value : JSON.stringify(value));
        }});
    }});
}})();
"#,
        entry = options.entry,
        flags = config.to_json()?,
    ))
}

fn delivery_script(port: &str, payload: &Payload) -> Result<String, serde_json::Error> {
    Ok(format!(
        "__port_deliver({}, {});",
        serde_json::to_string(port)?,
        serde_json::to_string(payload.as_str())?
    ))
}
