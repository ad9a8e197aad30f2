//! Socket Bridge
//!
//! Relays raw payloads between the socket and the application:
//! socket frames go to the inbound port, outbound-port messages go to the
//! socket. Nothing is parsed, filtered, batched or retried.
//!
//! Transport failures are not handled here. When the socket closes the
//! application simply stops hearing from the server.

use std::sync::Arc;

use crate::app::AppHandle;
use crate::port::{Payload, Subscription};
use crate::socket::Socket;

/// Both relay registrations. Dropping the bridge detaches it.
#[derive(Debug)]
pub struct Bridge {
    inbound: Subscription,
    outbound: Subscription,
}

impl Bridge {
    pub fn attach(socket: Arc<dyn Socket>, app: Arc<dyn AppHandle>) -> Self {
        let app_for_socket = app.clone();
        let inbound = socket.on_message(Arc::new(move |payload: &Payload| {
            log::info!("[Bridge] socket -> app: {}", payload);
            app_for_socket.send_inbound(payload.clone());
        }));

        let socket_for_app = socket.clone();
        let outbound = app.subscribe_outbound(Arc::new(move |payload: &Payload| {
            log::info!("[Bridge] app -> socket: {}", payload);
            if let Err(e) = socket_for_app.send(payload.clone()) {
                log::warn!("[Bridge] Dropped outbound message: {}", e);
            }
        }));

        log::info!("[Bridge] Attached");
        Self { inbound, outbound }
    }

    pub fn is_attached(&self) -> bool {
        self.inbound.is_active() && self.outbound.is_active()
    }

    pub fn detach(self) {
        log::info!("[Bridge] Detached");
    }
}
