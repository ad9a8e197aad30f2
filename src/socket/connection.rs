//! WebSocket connection backed by tokio-tungstenite.
//!
//! Inbound text frames are pushed to registered handlers from the reader
//! task, in arrival order. Outbound frames go through an unbounded queue to
//! a writer task, in send order.

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use crate::error::SocketError;
use crate::port::{Handler, Payload, Subscribers, Subscription};
use crate::runtime::TOKIO;
use crate::socket::{ReadyState, Socket, WS_CLOSED, WS_CLOSING, WS_CONNECTING, WS_OPEN};

enum Outgoing {
    Text(String),
    Close,
}

/// The one game-server connection of a page.
pub struct WebSocketConnection {
    url: String,
    origin: Option<String>,
    sender: mpsc::UnboundedSender<Outgoing>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Outgoing>>>,
    ready_state: Arc<AtomicU32>,
    handlers: Subscribers,
}

impl WebSocketConnection {
    /// Create the connection object. No I/O happens until [`connect`](Self::connect).
    pub fn new(url: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            origin: None,
            sender,
            receiver: Mutex::new(Some(receiver)),
            ready_state: Arc::new(AtomicU32::new(WS_CONNECTING)),
            handlers: Subscribers::new(),
        }
    }

    /// Send an `Origin` header, as a browser would for the page's origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start connecting on the shared runtime.
    ///
    /// Only the first call before any [`close`](Self::close) does anything.
    /// The returned handle finishes when the connection ends for good.
    pub fn connect(&self) -> Option<JoinHandle<()>> {
        let receiver = self.receiver.lock().ok().and_then(|mut guard| guard.take());
        let Some(receiver) = receiver else {
            log::warn!("[WebSocket] {} was already connected or closed", self.url);
            return None;
        };

        Some(TOKIO.spawn(run_connection(
            self.url.clone(),
            self.origin.clone(),
            receiver,
            self.ready_state.clone(),
            self.handlers.clone(),
        )))
    }

    /// Start the closing handshake. The connection is never reopened.
    pub fn close(&self) {
        let never_connected = self
            .receiver
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .is_some();
        if never_connected {
            log::info!("[WebSocket] Closed {} before connecting", self.url);
            self.ready_state.store(WS_CLOSED, Ordering::SeqCst);
            return;
        }

        let previous = self.ready_state.swap(WS_CLOSING, Ordering::SeqCst);
        if previous == WS_CLOSED {
            self.ready_state.store(WS_CLOSED, Ordering::SeqCst);
            return;
        }
        log::info!("[WebSocket] Closing {}", self.url);
        let _ = self.sender.send(Outgoing::Close);
    }
}

impl Socket for WebSocketConnection {
    fn on_message(&self, handler: Handler) -> Subscription {
        self.handlers.subscribe(handler)
    }

    fn send(&self, payload: Payload) -> Result<(), SocketError> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(SocketError::NotOpen(state));
        }
        self.sender
            .send(Outgoing::Text(payload.into_string()))
            .map_err(|_| SocketError::Closed)
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u32(self.ready_state.load(Ordering::SeqCst))
    }
}

async fn run_connection(
    url: String,
    origin: Option<String>,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    ready_state: Arc<AtomicU32>,
    handlers: Subscribers,
) {
    log::info!("[WebSocket] Connecting to {}", url);

    let mut request = match url.as_str().into_client_request() {
        Ok(req) => req,
        Err(e) => {
            log::error!("[WebSocket] Invalid request for {}: {}", url, e);
            ready_state.store(WS_CLOSED, Ordering::SeqCst);
            return;
        }
    };

    if let Some(origin) = origin {
        match origin.parse::<HeaderValue>() {
            Ok(value) => {
                request.headers_mut().insert("Origin", value);
            }
            Err(e) => log::warn!("[WebSocket] Ignoring invalid origin {}: {}", origin, e),
        }
    }

    let ws_stream = match tokio_tungstenite::connect_async(request).await {
        Ok((stream, response)) => {
            log::info!(
                "[WebSocket] Connected to {} (status: {})",
                url,
                response.status()
            );
            stream
        }
        Err(e) => {
            log::error!("[WebSocket] Connection to {} failed: {}", url, e);
            ready_state.store(WS_CLOSED, Ordering::SeqCst);
            return;
        }
    };

    // A close() issued while connecting wins over the handshake.
    if ready_state
        .compare_exchange(WS_CONNECTING, WS_OPEN, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        log::info!("[WebSocket] Closed before the handshake completed");
    }

    let (mut write, mut read) = ws_stream.split();

    let ready_state_for_send = ready_state.clone();
    let send_task = tokio::spawn(async move {
        while let Some(outgoing) = rx.recv().await {
            match outgoing {
                Outgoing::Text(msg) => {
                    if ready_state_for_send.load(Ordering::SeqCst) != WS_OPEN {
                        break;
                    }
                    if let Err(e) = write.send(Message::Text(msg.into())).await {
                        log::error!("[WebSocket] Send error: {}", e);
                        break;
                    }
                }
                Outgoing::Close => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        log::debug!("[WebSocket] Close frame not sent: {}", e);
                    }
                    break;
                }
            }
        }
    });

    while let Some(msg_result) = read.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                log::debug!("[WebSocket] Received {} bytes", text.len());
                handlers.emit(&Payload::from(text.as_str()));
            }
            Ok(Message::Binary(data)) => {
                log::debug!("[WebSocket] Ignoring binary frame ({} bytes)", data.len());
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Handled by tungstenite
            }
            Ok(Message::Close(frame)) => {
                let (code, reason): (u16, String) = frame
                    .map(|f| (f.code.into(), f.reason.to_string()))
                    .unwrap_or((1000, String::new()));
                log::info!("[WebSocket] Received close: {} {}", code, reason);
                break;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                log::error!("[WebSocket] Read error: {}", e);
                break;
            }
        }
    }

    ready_state.store(WS_CLOSED, Ordering::SeqCst);
    send_task.abort();
    log::warn!("[WebSocket] Connection to {} ended, no reconnection", url);
}
