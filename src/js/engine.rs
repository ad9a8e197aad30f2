//! JavaScript Engine
//!
//! Runs the Boa runtime on a dedicated thread. The command queue is the
//! application's event loop: each command runs to completion, then pending
//! jobs are flushed. An idle tick keeps timers moving when nothing arrives.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::{Context, JsError, Module, Source};

use crate::js::JsEngineClient;
use crate::js::esm::FetchModuleLoader;

const IDLE_TICK: Duration = Duration::from_millis(16);

/// Completion channel for commands the caller waits on.
pub type Reply = mpsc::Sender<Result<(), String>>;

/// Commands that can be sent to the JS engine thread.
#[derive(Debug)]
pub enum JsCommand {
    /// Execute a script and forget about it.
    Execute { source: String },
    /// Execute a script and report whether it threw.
    Evaluate { source: String, reply: Reply },
    /// Load, link and evaluate an ES module.
    LoadEsmModule {
        name: String,
        source: String,
        reply: Reply,
    },
    /// Run pending jobs and timers.
    FlushEventLoop,
    /// Shutdown the JS engine.
    Shutdown,
}

pub(crate) type ContextBuilder =
    Box<dyn FnOnce() -> Result<(Context, Rc<FetchModuleLoader>), JsError> + Send>;

/// JavaScript engine with dedicated worker thread.
pub struct JsEngine {
    client: JsEngineClient,
    handle: Option<JoinHandle<()>>,
}

impl JsEngine {
    /// Spawn the engine thread and wait until its context is built.
    pub(crate) fn start(
        client: JsEngineClient,
        receiver: Receiver<JsCommand>,
        context_builder: ContextBuilder,
    ) -> Result<Self, String> {
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("js-engine".to_string())
            .spawn(move || {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    run_js_loop(receiver, context_builder, ready_tx);
                }));

                if let Err(e) = result {
                    log::error!("JS engine panicked: {:?}", e);
                }
            })
            .map_err(|e| format!("failed to spawn JS engine thread: {}", e))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                client,
                handle: Some(handle),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err("JS engine thread exited during startup".to_string()),
        }
    }

    /// Get a client handle for communicating with the engine.
    pub fn client(&self) -> JsEngineClient {
        self.client.clone()
    }

    /// Stop the engine and wait for its thread.
    pub fn shutdown(mut self) {
        self.client.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("JS engine thread did not stop cleanly");
            }
        }
    }
}

impl Drop for JsEngine {
    fn drop(&mut self) {
        self.client.shutdown();
    }
}

/// Main loop for the JS engine thread.
fn run_js_loop(
    receiver: Receiver<JsCommand>,
    context_builder: ContextBuilder,
    ready: mpsc::Sender<Result<(), String>>,
) {
    log::info!("JS engine thread started");

    let (mut context, loader) = match context_builder() {
        Ok(built) => built,
        Err(e) => {
            log::error!("Failed to initialize JS runtime: {}", e);
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    log::info!("JS runtime initialized");

    loop {
        match receiver.recv_timeout(IDLE_TICK) {
            Ok(JsCommand::Execute { source }) => {
                log::debug!("Executing script ({} bytes)", source.len());

                if let Err(e) = context.eval(Source::from_bytes(source.as_bytes())) {
                    log::error!("Failed to execute script: {}", e);
                }

                flush_event_loop(&mut context);
            }
            Ok(JsCommand::Evaluate { source, reply }) => {
                log::info!("Evaluating script ({} bytes)...", source.len());

                let result = context
                    .eval(Source::from_bytes(source.as_bytes()))
                    .map(|_| ())
                    .map_err(|e| e.to_string());

                flush_event_loop(&mut context);
                let _ = reply.send(result);
            }
            Ok(JsCommand::LoadEsmModule {
                name,
                source,
                reply,
            }) => {
                log::info!("Loading ES module {} ({} bytes)...", name, source.len());

                let result =
                    load_module(&mut context, &loader, &name, &source).map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
            Ok(JsCommand::FlushEventLoop) | Err(RecvTimeoutError::Timeout) => {
                flush_event_loop(&mut context);
            }
            Ok(JsCommand::Shutdown) => {
                log::info!("JS engine shutting down");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("All JS engine clients dropped");
                break;
            }
        }
    }

    log::info!("JS engine thread stopped");
}

fn load_module(
    context: &mut Context,
    loader: &FetchModuleLoader,
    name: &str,
    source: &str,
) -> Result<(), JsError> {
    let source = Source::from_bytes(source.as_bytes()).with_path(Path::new(name));
    let module = Module::parse(source, None, context)?;
    loader.insert(name, module.clone());

    let promise = module.load_link_evaluate(context);
    flush_event_loop(context);

    match promise.state() {
        PromiseState::Fulfilled(_) => Ok(()),
        PromiseState::Rejected(err) => Err(JsError::from_opaque(err)),
        PromiseState::Pending => {
            log::warn!("ES module {} still pending after the first flush", name);
            Ok(())
        }
    }
}

/// Flush the event loop: run microtasks (Jobs) and due macrotasks (timers).
fn flush_event_loop(context: &mut Context) {
    if let Err(e) = context.run_jobs() {
        if let Some(e) = e.as_opaque() {
            let msg = e.to_json(context).unwrap_or_default();
            log::error!("Error running Boa jobs: {:?}", msg);
        } else {
            log::error!("Error running Boa jobs: {:?}", e);
        }
    }
}
