/// Transport seam and WebSocket implementation
///
/// A `Transport` opens one addressable bidirectional message stream and
/// reports its lifecycle through discrete events. Any transport that honors
/// the event contract is substitutable; tests script one directly.
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::logger::{self, LogTag};

/// Connection lifecycle states
///
/// `Closed` is not terminal: unless the channel was explicitly torn down,
/// the manager schedules a retry that produces a genuinely new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Events a transport reports to its owner
///
/// Errors never close the stream by themselves; the transport always follows
/// them with `Closed` when the stream actually ends.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Open,
    Frame(String),
    Error(String),
    Closed,
}

/// Handle pair for one open transport: inbound events plus an outbound
/// frame sender. Dropping the sender closes the stream.
pub struct TransportLink {
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
    pub outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin opening a stream at `url`
    ///
    /// Never fails directly: a connection that cannot be established reports
    /// `Error` followed by `Closed` through the returned link, the same
    /// sequence an established stream produces when it drops.
    async fn open(&self, url: &str) -> TransportLink;
}

/// WebSocket transport over tokio-tungstenite
///
/// Text frames carry the structured payloads; ping, pong, and binary frames
/// are ignored.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &str) -> TransportLink {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let url = url.to_string();

        tokio::spawn(async move {
            let (stream, _) = match connect_async(url.as_str()).await {
                Ok(pair) => pair,
                Err(e) => {
                    let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                    let _ = event_tx.send(TransportEvent::Closed);
                    return;
                }
            };

            let _ = event_tx.send(TransportEvent::Open);
            let (mut ws_tx, mut ws_rx) = stream.split();

            loop {
                tokio::select! {
                    frame = outbound_rx.recv() => match frame {
                        Some(text) => {
                            if let Err(e) = ws_tx.send(Message::Text(text)).await {
                                let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                                let _ = event_tx.send(TransportEvent::Closed);
                                break;
                            }
                        }
                        // Owner dropped the sender: close the stream cleanly
                        None => {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    message = ws_rx.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let _ = event_tx.send(TransportEvent::Frame(text));
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            let _ = event_tx.send(TransportEvent::Closed);
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ignore ping/pong/binary frames
                        }
                        Some(Err(e)) => {
                            let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                            let _ = event_tx.send(TransportEvent::Closed);
                            break;
                        }
                    }
                }
            }

            logger::debug(LogTag::Transport, "Stream pump finished");
        });

        TransportLink { events, outbound }
    }
}
