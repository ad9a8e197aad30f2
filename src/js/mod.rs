//! JavaScript Engine Module
//!
//! A Boa JS engine running on its own thread, driven by commands.
//! Extensions install host functionality (DOM lookups, port natives)
//! before the application bundle is evaluated.

mod builder;
mod client;
mod engine;
mod esm;
mod ports;
mod shim;

pub use builder::{JsEngineBuilder, JsEngineExtension};
pub use client::JsEngineClient;
pub use engine::{JsCommand, JsEngine, Reply};
pub use ports::{PortRegistry, PortsExtension};
pub use shim::DomExtension;
