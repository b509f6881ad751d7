/// Channel manager - composition root of the real-time layer
///
/// Maps channel name to {connection, subscriber registry entry, reconnect
/// timer} and exposes connect/subscribe/send/disconnect as the only public
/// surface. Invariants per channel name: at most one live connection and at
/// most one pending reconnect timer at any instant. Removing the last
/// subscriber does not close the connection.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::RealtimeConfig;
use crate::logger::{self, LogTag};

use super::connection::{ConnectionState, Transport, TransportEvent, WsTransport};
use super::registry::{ChannelHandler, SubscriberRegistry, Subscription};

struct ChannelEntry {
    path: String,
    /// Bumped on every connection attempt; stale pump and timer tasks
    /// compare against it and stand down
    generation: u64,
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<String>>,
    pump: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

struct Inner {
    base_url: String,
    reconnect_delay: Duration,
    transport: Arc<dyn Transport>,
    channels: Mutex<HashMap<String, ChannelEntry>>,
    registry: Arc<SubscriberRegistry>,
}

/// Explicitly constructed, clonable handle over the channel map
///
/// All mutation of the map happens through these operations; subscriber
/// code never touches it directly.
#[derive(Clone)]
pub struct ChannelManager {
    inner: Arc<Inner>,
}

impl ChannelManager {
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    /// Construct over a substitute transport (tests script one)
    pub fn with_transport(config: RealtimeConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url: config.ws_base_url.trim_end_matches('/').to_string(),
                reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
                transport,
                channels: Mutex::new(HashMap::new()),
                registry: Arc::new(SubscriberRegistry::new()),
            }),
        }
    }

    /// Open the channel's connection unless one already exists
    ///
    /// Idempotent: a channel that is `Connecting` or `Open` is left alone.
    /// A channel sitting in `Closed` (waiting on its retry timer) starts a
    /// fresh attempt immediately and the pending timer becomes a no-op.
    pub fn connect(&self, channel: &str, path: &str) {
        let mut channels = self.inner.channels.lock();

        if let Some(entry) = channels.get(channel) {
            if entry.state != ConnectionState::Closed {
                return;
            }
        }

        let generation = channels.get(channel).map(|e| e.generation + 1).unwrap_or(1);
        let entry = channels
            .entry(channel.to_string())
            .or_insert_with(|| ChannelEntry {
                path: path.to_string(),
                generation: 0,
                state: ConnectionState::Closed,
                outbound: None,
                pump: None,
                reconnect: None,
            });

        if let Some(timer) = entry.reconnect.take() {
            timer.abort();
        }
        entry.path = path.to_string();
        entry.generation = generation;
        entry.state = ConnectionState::Connecting;
        entry.outbound = None;
        entry.pump = Some(Arc::clone(&self.inner).spawn_pump(
            channel.to_string(),
            path.to_string(),
            generation,
        ));
    }

    /// Register a handler for a channel's inbound messages
    ///
    /// Does not open the connection; pair with `connect` or use `attach`.
    pub fn subscribe(&self, channel: &str, handler: Arc<dyn ChannelHandler>) -> Subscription {
        self.inner.registry.add(channel, handler.clone());
        Subscription::new(Arc::clone(&self.inner.registry), channel, handler)
    }

    /// Connect and subscribe in one step
    pub fn attach(
        &self,
        channel: &str,
        path: &str,
        handler: Arc<dyn ChannelHandler>,
    ) -> Subscription {
        self.connect(channel, path);
        self.subscribe(channel, handler)
    }

    /// Deliver `payload` over the channel's connection if it is `Open`
    ///
    /// Otherwise the payload is silently dropped; outbound sends are never
    /// queued or retried.
    pub fn send(&self, channel: &str, payload: &serde_json::Value) {
        let channels = self.inner.channels.lock();
        if let Some(entry) = channels.get(channel) {
            if entry.state == ConnectionState::Open {
                if let Some(outbound) = &entry.outbound {
                    let _ = outbound.send(payload.to_string());
                }
            }
        }
    }

    /// Tear the channel down permanently
    ///
    /// Cancels the pending reconnect timer, closes the connection, and
    /// discards the channel's entire subscriber registry. The sole
    /// cancellation primitive: a timer already in flight finds the entry
    /// gone and stands down.
    pub fn disconnect(&self, channel: &str) {
        let removed = self.inner.channels.lock().remove(channel);
        if let Some(mut entry) = removed {
            if let Some(timer) = entry.reconnect.take() {
                timer.abort();
            }
            if let Some(pump) = entry.pump.take() {
                pump.abort();
            }
            // Dropping entry.outbound closes the transport writer
            logger::info(LogTag::Channel, &format!("Channel closed: {}", channel));
        }
        self.inner.registry.drop_channel(channel);
    }

    /// Disconnect every known channel (process teardown)
    pub fn disconnect_all(&self) {
        let names: Vec<String> = self.inner.channels.lock().keys().cloned().collect();
        for name in names {
            self.disconnect(&name);
        }
    }

    /// Current connection state, None for unknown channels
    pub fn state(&self, channel: &str) -> Option<ConnectionState> {
        self.inner.channels.lock().get(channel).map(|e| e.state)
    }

    /// Number of handlers currently registered for a channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner.registry.count(channel)
    }
}

impl Inner {
    /// Drive one connection attempt: open the transport, mirror its
    /// lifecycle into the entry, and fan inbound frames out to subscribers.
    fn spawn_pump(self: Arc<Self>, channel: String, path: String, generation: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let url = format!("{}/{}", self.base_url, path);
            let mut link = self.transport.open(&url).await;

            {
                let mut channels = self.channels.lock();
                match channels.get_mut(&channel) {
                    Some(entry) if entry.generation == generation => {
                        entry.outbound = Some(link.outbound.clone());
                    }
                    // Superseded or disconnected while opening
                    _ => return,
                }
            }

            while let Some(event) = link.events.recv().await {
                match event {
                    TransportEvent::Open => {
                        let mut channels = self.channels.lock();
                        if let Some(entry) = channels.get_mut(&channel) {
                            if entry.generation == generation {
                                entry.state = ConnectionState::Open;
                                logger::info(LogTag::Channel, &format!("Connected: {}", channel));
                            }
                        }
                    }
                    TransportEvent::Frame(text) => {
                        self.dispatch(&channel, &text);
                    }
                    TransportEvent::Error(reason) => {
                        // Reported only; the close event drives recovery
                        logger::error(
                            LogTag::Transport,
                            &format!("Error on {}: {}", channel, reason),
                        );
                    }
                    TransportEvent::Closed => {
                        self.handle_close(&channel, generation);
                        break;
                    }
                }
            }
        })
    }

    /// Decode one inbound frame and deliver it to every current subscriber
    ///
    /// A malformed frame fails alone: it is logged and dropped without
    /// closing the connection or affecting other channels.
    fn dispatch(&self, channel: &str, text: &str) {
        let payload: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                logger::warning(
                    LogTag::Channel,
                    &format!("Dropping undecodable frame on {}: {}", channel, e),
                );
                return;
            }
        };

        for handler in self.registry.snapshot(channel) {
            handler.on_message(&payload);
        }
    }

    /// Transport closed: mark the entry and schedule the single retry
    fn handle_close(self: &Arc<Self>, channel: &str, generation: u64) {
        let mut channels = self.channels.lock();
        let Some(entry) = channels.get_mut(channel) else {
            return;
        };
        if entry.generation != generation {
            return;
        }

        entry.state = ConnectionState::Closed;
        entry.outbound = None;
        entry.pump = None;
        logger::info(
            LogTag::Channel,
            &format!(
                "Disconnected: {} (retry in {}ms)",
                channel,
                self.reconnect_delay.as_millis()
            ),
        );

        let inner = Arc::clone(self);
        let name = channel.to_string();
        let path = entry.path.clone();
        let delay = self.reconnect_delay;
        entry.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.retry(&name, &path, generation);
        }));
    }

    /// Reconnect timer fired: start a new attempt unless the channel was
    /// disconnected or a newer attempt superseded this timer
    fn retry(self: &Arc<Self>, channel: &str, path: &str, generation: u64) {
        let mut channels = self.channels.lock();
        let Some(entry) = channels.get_mut(channel) else {
            return;
        };
        if entry.generation != generation || entry.state != ConnectionState::Closed {
            return;
        }

        let next = generation + 1;
        entry.generation = next;
        entry.state = ConnectionState::Connecting;
        entry.reconnect = None;
        entry.pump = Some(Arc::clone(self).spawn_pump(
            channel.to_string(),
            path.to_string(),
            next,
        ));
    }
}
