use std::sync::mpsc;

use crate::js::{JsCommand, Reply};

/// Client handle for communicating with the JS engine thread.
///
/// Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct JsEngineClient {
    sender: mpsc::Sender<JsCommand>,
}

impl JsEngineClient {
    pub(crate) fn new(sender: mpsc::Sender<JsCommand>) -> Self {
        Self { sender }
    }

    /// Send a tick command to flush the JS event loop.
    pub fn flush_event_loop(&self) {
        if let Err(e) = self.sender.send(JsCommand::FlushEventLoop) {
            log::warn!("Failed to send flush event loop command: {}", e);
        }
    }

    /// Queue a script. Returns immediately.
    pub fn execute(&self, source: impl Into<String>) {
        if let Err(e) = self.sender.send(JsCommand::Execute {
            source: source.into(),
        }) {
            log::error!("Failed to send execute command: {}", e);
        }
    }

    /// Run a script and wait for it to finish.
    pub fn evaluate(&self, source: impl Into<String>) -> Result<(), String> {
        let source = source.into();
        self.request(|reply| JsCommand::Evaluate { source, reply })
    }

    /// Load an ES module and wait for its evaluation.
    pub fn load_esm_module(
        &self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), String> {
        let name = name.into();
        let source = source.into();
        self.request(|reply| JsCommand::LoadEsmModule {
            name,
            source,
            reply,
        })
    }

    /// Shutdown the JS engine.
    pub fn shutdown(&self) {
        let _ = self.sender.send(JsCommand::Shutdown);
    }

    fn request(&self, command: impl FnOnce(Reply) -> JsCommand) -> Result<(), String> {
        let (reply, response) = mpsc::channel();
        self.sender
            .send(command(reply))
            .map_err(|e| format!("JS engine is not running: {}", e))?;
        response
            .recv()
            .map_err(|_| "JS engine stopped before replying".to_string())?
    }
}
