//! Ports
//!
//! Payloads and handler registration shared by the application handle and
//! the socket. Every registration returns a [`Subscription`]; dropping it
//! removes the handler.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// An opaque message. No schema is enforced at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Payload(String);

impl Payload {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Payload {
    fn from(data: String) -> Self {
        Self(data)
    }
}

impl From<&str> for Payload {
    fn from(data: &str) -> Self {
        Self(data.to_owned())
    }
}

impl AsRef<str> for Payload {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Callback invoked with every payload published on a port.
pub type Handler = Arc<dyn Fn(&Payload) + Send + Sync>;

#[derive(Default)]
struct SubscriberList {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// Fan-out list for one outbound stream.
///
/// Cheap to clone; clones share the same handlers.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<SubscriberList>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Handler) -> Subscription {
        let Ok(mut list) = self.inner.lock() else {
            log::error!("Subscriber list poisoned, handler not registered");
            return Subscription::detached();
        };

        let id = list.next_id;
        list.next_id += 1;
        list.handlers.push((id, handler));

        Subscription {
            id,
            list: Arc::downgrade(&self.inner),
        }
    }

    /// Call every handler in registration order. Returns how many ran.
    pub fn emit(&self, payload: &Payload) -> usize {
        // Handlers run outside the lock so they may subscribe or unsubscribe.
        let handlers: Vec<Handler> = match self.inner.lock() {
            Ok(list) => list.handlers.iter().map(|(_, h)| h.clone()).collect(),
            Err(_) => return 0,
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|list| list.handlers.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// De-registration capability for a handler.
#[must_use = "dropping a Subscription removes its handler"]
pub struct Subscription {
    id: u64,
    list: Weak<Mutex<SubscriberList>>,
}

impl Subscription {
    /// A subscription that is not attached to anything.
    pub fn detached() -> Self {
        Self {
            id: 0,
            list: Weak::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        let Some(list) = self.list.upgrade() else {
            return false;
        };
        let Ok(guard) = list.lock() else {
            return false;
        };
        guard.handlers.iter().any(|(id, _)| *id == self.id)
    }

    /// Remove the handler now.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            if let Ok(mut guard) = list.lock() {
                guard.handlers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: Handler = Arc::new(move |p: &Payload| {
            sink.lock().unwrap().push(p.as_str().to_owned());
        });
        (seen, handler)
    }

    #[test_log::test]
    fn emits_in_publish_order() {
        let subscribers = Subscribers::new();
        let (seen, handler) = recorder();
        let _sub = subscribers.subscribe(handler);

        for msg in ["a", "b", "c"] {
            assert_eq!(subscribers.emit(&Payload::from(msg)), 1);
        }

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test_log::test]
    fn dropping_subscription_removes_handler() {
        let subscribers = Subscribers::new();
        let (seen, handler) = recorder();
        let sub = subscribers.subscribe(handler);
        assert!(sub.is_active());

        subscribers.emit(&Payload::from("before"));
        sub.cancel();
        subscribers.emit(&Payload::from("after"));

        assert!(subscribers.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec!["before"]);
    }

    #[test_log::test]
    fn only_the_cancelled_handler_is_removed() {
        let subscribers = Subscribers::new();
        let (first, h1) = recorder();
        let (second, h2) = recorder();
        let sub1 = subscribers.subscribe(h1);
        let _sub2 = subscribers.subscribe(h2);

        drop(sub1);
        subscribers.emit(&Payload::from("x"));

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(*second.lock().unwrap(), vec!["x"]);
    }

    #[test_log::test]
    fn subscription_outliving_its_list_is_harmless() {
        let subscribers = Subscribers::new();
        let (_, handler) = recorder();
        let sub = subscribers.subscribe(handler);
        drop(subscribers);
        assert!(!sub.is_active());
    }

    #[test_log::test]
    fn payload_is_untouched() {
        let raw = "{\"type\":\"move\",\"x\":1}\n\u{1F3B2}";
        let payload = Payload::from(raw);
        assert_eq!(payload.as_str(), raw);
        assert_eq!(payload.to_string(), raw);
        assert_eq!(payload.into_string(), raw);
    }
}
