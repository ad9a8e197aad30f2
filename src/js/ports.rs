//! Port natives
//!
//! The application's outbound ports are wired to `__port_emit(name, value)`
//! at mount time; this module routes each call to the Rust subscribers of
//! that port.

use std::collections::HashMap;
use std::sync::Arc;

use boa_engine::{Context, JsError, JsString, JsValue, NativeFunction};
use boa_gc::{Finalize, Trace, empty_trace};

use crate::js::{JsEngineClient, JsEngineExtension};
use crate::port::{Handler, Payload, Subscribers, Subscription};

/// Outbound ports by name. The set of names is fixed at construction.
#[derive(Clone, Default, Finalize)]
pub struct PortRegistry {
    ports: Arc<HashMap<String, Subscribers>>,
}

// Holds no GC-managed values.
unsafe impl Trace for PortRegistry {
    empty_trace!();
}

impl PortRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ports = names
            .into_iter()
            .map(|name| (name.into(), Subscribers::new()))
            .collect();
        Self {
            ports: Arc::new(ports),
        }
    }

    pub fn subscribe(&self, name: &str, handler: Handler) -> Subscription {
        match self.ports.get(name) {
            Some(subscribers) => subscribers.subscribe(handler),
            None => {
                log::warn!("[Ports] No outbound port named {}", name);
                Subscription::detached()
            }
        }
    }

    /// Deliver a value published by the application. False for unknown ports.
    pub fn emit(&self, name: &str, payload: &Payload) -> bool {
        match self.ports.get(name) {
            Some(subscribers) => {
                subscribers.emit(payload);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }
}

pub struct PortsExtension {
    registry: PortRegistry,
}

impl PortsExtension {
    pub fn new(registry: PortRegistry) -> Self {
        Self { registry }
    }
}

impl JsEngineExtension for PortsExtension {
    fn register(&self, context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
        // __port_emit(name: string, value: string) -> void
        context.register_global_callable(
            JsString::from("__port_emit"),
            2,
            NativeFunction::from_copy_closure_with_captures(
                |_this: &JsValue, args: &[JsValue], registry: &PortRegistry, _ctx: &mut Context| {
                    let name = args
                        .first()
                        .and_then(|v| v.as_string())
                        .map(|s| s.to_std_string_escaped())
                        .unwrap_or_default();
                    let value = args
                        .get(1)
                        .and_then(|v| v.as_string())
                        .map(|s| s.to_std_string_escaped())
                        .unwrap_or_default();

                    log::debug!("[Ports] {} emitted {} bytes", name, value.len());
                    if !registry.emit(&name, &Payload::from(value)) {
                        log::warn!("[Ports] Dropped value for unknown port {}", name);
                    }
                    Ok(JsValue::undefined())
                },
                self.registry.clone(),
            ),
        )?;

        log::info!("Registered port native functions");
        Ok(())
    }
}
