//! Clipboard Adapter
//!
//! Copies text the way a page without the async clipboard API does: an
//! off-screen read-only `textarea` is appended to the body, its contents are
//! selected, the platform copy command runs, and the element is removed.
//! Removal happens in `Drop`, so it runs whatever the copy command does.
//!
//! Failures are logged and never reported back to the application.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::app::AppHandle;
use crate::dom::{Document, Element, NodeId};
use crate::error::ClipboardError;
use crate::port::{Payload, Subscription};

const OFFSCREEN_STYLE: &str = "position: absolute; left: -9999px";

/// Runs the platform copy command for the selected text.
pub trait ClipboardBackend: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// In-process clipboard, used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        if let Ok(mut contents) = self.contents.lock() {
            *contents = Some(text.to_owned());
        }
        Ok(())
    }
}

/// Pipes the text into the system clipboard tool.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The usual clipboard tool for the current platform.
    pub fn detect() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::new("pbcopy", &[]))
        } else if cfg!(target_os = "windows") {
            Some(Self::new("clip", &[]))
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Some(Self::new("wl-copy", &[]))
        } else if std::env::var_os("DISPLAY").is_some() {
            Some(Self::new("xclip", &["-selection", "clipboard"]))
        } else {
            None
        }
    }
}

impl ClipboardBackend for CommandClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ClipboardError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|source| ClipboardError::Write {
                    program: self.program.clone(),
                    source,
                })?;
        }

        let status = child.wait().map_err(|source| ClipboardError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }
}

/// Used when no clipboard tool is available; every copy fails quietly.
#[derive(Debug, Default)]
pub struct NoClipboard;

impl ClipboardBackend for NoClipboard {
    fn copy(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }
}

/// A `textarea` attached for the duration of one copy.
struct TransientInput<'a> {
    document: &'a Document,
    node: NodeId,
}

impl<'a> TransientInput<'a> {
    fn attach(document: &'a Document, text: &str) -> Self {
        let element = Element::new("textarea")
            .with_value(text)
            .with_attribute("readonly", "")
            .with_style(OFFSCREEN_STYLE);
        let node = document.append_child(element);
        Self { document, node }
    }

    fn select(&self) -> bool {
        self.document.select(self.node)
    }
}

impl Drop for TransientInput<'_> {
    fn drop(&mut self) {
        self.document.remove_child(self.node);
    }
}

pub struct ClipboardAdapter {
    document: Document,
    backend: Arc<dyn ClipboardBackend>,
}

impl ClipboardAdapter {
    pub fn new(document: Document, backend: Arc<dyn ClipboardBackend>) -> Self {
        Self { document, backend }
    }

    pub fn copy(&self, text: &str) {
        let input = TransientInput::attach(&self.document, text);

        let result = if input.select() {
            match self.document.selection() {
                Some(selected) => self.backend.copy(&selected),
                None => Err(ClipboardError::NothingSelected),
            }
        } else {
            Err(ClipboardError::NothingSelected)
        };

        match result {
            Ok(()) => log::debug!("[Clipboard] Copied {} bytes", text.len()),
            Err(e) => log::debug!("[Clipboard] Copy failed: {}", e),
        }
    }
}

/// Serve every request published on the application's clipboard port.
pub fn attach_clipboard(app: &dyn AppHandle, adapter: Arc<ClipboardAdapter>) -> Subscription {
    app.subscribe_clipboard(Arc::new(move |payload: &Payload| {
        adapter.copy(payload.as_str());
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingClipboard;

    impl ClipboardBackend for RejectingClipboard {
        fn copy(&self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable)
        }
    }

    /// Records how the document looked while the copy command ran.
    struct InspectingClipboard {
        document: Document,
        textareas_during_copy: Mutex<Vec<usize>>,
    }

    impl ClipboardBackend for InspectingClipboard {
        fn copy(&self, _text: &str) -> Result<(), ClipboardError> {
            self.textareas_during_copy
                .lock()
                .unwrap()
                .push(self.document.count_by_tag("textarea"));
            Ok(())
        }
    }

    #[test_log::test]
    fn copies_exact_text_and_leaves_no_element() {
        let document = Document::with_elements(["root"]);
        let backend = Arc::new(MemoryClipboard::new());
        let adapter = ClipboardAdapter::new(document.clone(), backend.clone());

        assert_eq!(document.count_by_tag("textarea"), 0);
        adapter.copy("http://localhost:3000/?room=game42");

        assert_eq!(
            backend.contents().as_deref(),
            Some("http://localhost:3000/?room=game42")
        );
        assert_eq!(document.count_by_tag("textarea"), 0);
        assert_eq!(document.len(), 1);
        assert_eq!(document.selection(), None);
    }

    #[test_log::test]
    fn element_exists_only_during_the_copy() {
        let document = Document::new();
        let backend = Arc::new(InspectingClipboard {
            document: document.clone(),
            textareas_during_copy: Mutex::new(Vec::new()),
        });
        let adapter = ClipboardAdapter::new(document.clone(), backend.clone());

        adapter.copy("one");
        adapter.copy("two");

        assert_eq!(*backend.textareas_during_copy.lock().unwrap(), vec![1, 1]);
        assert!(document.is_empty());
    }

    #[test_log::test]
    fn rejected_copy_still_removes_element() {
        let document = Document::new();
        let adapter = ClipboardAdapter::new(document.clone(), Arc::new(RejectingClipboard));

        adapter.copy("nope");

        assert!(document.is_empty());
    }

    #[test_log::test]
    fn empty_string_is_copied() {
        let backend = Arc::new(MemoryClipboard::new());
        let adapter = ClipboardAdapter::new(Document::new(), backend.clone());
        adapter.copy("");
        assert_eq!(backend.contents().as_deref(), Some(""));
    }

    #[test_log::test]
    fn missing_command_is_a_spawn_error() {
        let backend = CommandClipboard::new("port-bridge-no-such-clipboard-tool", &[]);
        let err = backend.copy("x").unwrap_err();
        assert!(matches!(err, ClipboardError::Spawn { .. }));
    }
}
