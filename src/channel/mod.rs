/// Real-time channel core
///
/// Keeps named logical channels alive over unreliable transports and fans
/// inbound messages out to their subscribers.
///
/// ## Architecture
/// - `manager`: composition root mapping channel name to connection,
///   subscriber set, and reconnect timer
/// - `connection`: transport seam plus the WebSocket implementation
/// - `registry`: set-semantics subscriber registry with snapshot dispatch
///
/// ## Guarantees
/// - At most one physical connection per channel name
/// - Exactly-once delivery per inbound message to each currently-registered
///   subscriber
/// - Safe unsubscribe during dispatch
/// - Indefinite reconnection after transport closes, with at most one
///   pending timer per channel, cancelled permanently by `disconnect`
///
/// Ordering across different channels, server-side fan-out, and replay of
/// messages missed while disconnected are out of scope.
pub mod connection;
pub mod manager;
pub mod registry;

pub use connection::{ConnectionState, Transport, TransportEvent, TransportLink};
pub use manager::ChannelManager;
pub use registry::{ChannelHandler, SubscriberRegistry, Subscription};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for exercising the manager without sockets

    use super::connection::{Transport, TransportEvent, TransportLink};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct MockLink {
        url: String,
        events: mpsc::UnboundedSender<TransportEvent>,
        sent: mpsc::UnboundedReceiver<String>,
    }

    /// Records every `open` call and lets tests drive each link's event
    /// stream and inspect outbound frames.
    #[derive(Default)]
    pub struct MockTransport {
        links: Mutex<Vec<MockLink>>,
    }

    impl MockTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn open_count(&self) -> usize {
            self.links.lock().len()
        }

        pub fn url(&self, index: usize) -> String {
            self.links.lock()[index].url.clone()
        }

        /// Push an event into the link's stream; delivery failures mean the
        /// pump is already gone, which tests treat as fine
        pub fn emit(&self, index: usize, event: TransportEvent) {
            let links = self.links.lock();
            let _ = links[index].events.send(event);
        }

        /// Drain the frames the manager sent over this link
        pub fn take_sent(&self, index: usize) -> Vec<String> {
            let mut links = self.links.lock();
            let mut frames = Vec::new();
            while let Ok(frame) = links[index].sent.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self, url: &str) -> TransportLink {
            let (event_tx, events) = mpsc::unbounded_channel();
            let (outbound, sent) = mpsc::unbounded_channel();
            self.links.lock().push(MockLink {
                url: url.to_string(),
                events: event_tx,
                sent,
            });
            TransportLink { events, outbound }
        }
    }
}
