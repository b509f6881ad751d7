/// Per-channel subscriber registry
///
/// Set semantics keyed by handler identity: registering the same handler
/// `Arc` twice has no duplicating effect, so one inbound message invokes it
/// at most once. Dispatch iterates a snapshot of the current set, which
/// keeps a handler that unsubscribes itself (or a peer) mid-dispatch from
/// corrupting iteration or changing who sees the current message.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered consumer of a channel's inbound messages
///
/// Handlers run synchronously on the dispatching task, run-to-completion
/// per message; a slow handler delays the remaining handlers of the same
/// message.
pub trait ChannelHandler: Send + Sync {
    fn on_message(&self, payload: &serde_json::Value);
}

impl<F> ChannelHandler for F
where
    F: Fn(&serde_json::Value) + Send + Sync,
{
    fn on_message(&self, payload: &serde_json::Value) {
        self(payload)
    }
}

#[derive(Default)]
pub struct SubscriberRegistry {
    channels: Mutex<HashMap<String, Vec<Arc<dyn ChannelHandler>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a handler already present is left alone
    pub fn add(&self, channel: &str, handler: Arc<dyn ChannelHandler>) {
        let mut channels = self.channels.lock();
        let handlers = channels.entry(channel.to_string()).or_default();
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return;
        }
        handlers.push(handler);
    }

    /// Remove exactly this handler; absent handlers are a no-op
    pub fn remove(&self, channel: &str, handler: &Arc<dyn ChannelHandler>) {
        let mut channels = self.channels.lock();
        if let Some(handlers) = channels.get_mut(channel) {
            handlers.retain(|h| !Arc::ptr_eq(h, handler));
            if handlers.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Discard every handler registered for a channel
    pub fn drop_channel(&self, channel: &str) {
        self.channels.lock().remove(channel);
    }

    /// Snapshot of the current subscriber set for dispatch
    pub fn snapshot(&self, channel: &str) -> Vec<Arc<dyn ChannelHandler>> {
        self.channels
            .lock()
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

/// Capability returned by `subscribe`: removes exactly the handler it was
/// created for. Repeat calls are no-ops. Dropping a `Subscription` does NOT
/// unsubscribe; whoever registered the handler owns its teardown.
pub struct Subscription {
    registry: Arc<SubscriberRegistry>,
    channel: String,
    handler: Mutex<Option<Arc<dyn ChannelHandler>>>,
}

impl Subscription {
    pub(crate) fn new(
        registry: Arc<SubscriberRegistry>,
        channel: &str,
        handler: Arc<dyn ChannelHandler>,
    ) -> Self {
        Self {
            registry,
            channel: channel.to_string(),
            handler: Mutex::new(Some(handler)),
        }
    }

    pub fn unsubscribe(&self) {
        if let Some(handler) = self.handler.lock().take() {
            self.registry.remove(&self.channel, &handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> Arc<dyn ChannelHandler> {
        Arc::new(move |_payload: &serde_json::Value| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_duplicate_registration_is_deduped() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter.clone());

        registry.add("telemetry", handler.clone());
        registry.add("telemetry", handler.clone());
        assert_eq!(registry.count("telemetry"), 1);

        let payload = serde_json::json!({});
        for h in registry.snapshot("telemetry") {
            h.on_message(&payload);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = Arc::new(SubscriberRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter);

        registry.add("alerts", handler.clone());
        let subscription = Subscription::new(registry.clone(), "alerts", handler);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert_eq!(registry.count("alerts"), 0);
    }

    #[test]
    fn test_unsubscribe_removes_only_its_handler() {
        let registry = Arc::new(SubscriberRegistry::new());
        let c1 = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::new(AtomicUsize::new(0));
        let h1 = counting_handler(c1);
        let h2 = counting_handler(c2.clone());

        registry.add("alerts", h1.clone());
        registry.add("alerts", h2);
        Subscription::new(registry.clone(), "alerts", h1).unsubscribe();

        assert_eq!(registry.count("alerts"), 1);
        let payload = serde_json::json!({});
        for h in registry.snapshot("alerts") {
            h.on_message(&payload);
        }
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }
}
