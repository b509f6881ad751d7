//! Real-time channel layer for fleet telemetry dashboards
//!
//! Keeps a set of named logical channels alive over WebSocket transports,
//! multiplexes many independent subscribers per channel, recovers from
//! disconnects automatically, and feeds live updates into the alert
//! notification pipeline and the telemetry series view.

pub mod alerts;
pub mod channel;
pub mod config;
pub mod errors;
pub mod logger;
pub mod notifications;
pub mod telemetry;

pub use channel::{ChannelHandler, ChannelManager, ConnectionState, Subscription};
pub use config::Config;
pub use errors::RealtimeError;
