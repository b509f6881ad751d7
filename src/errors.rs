use thiserror::Error;

/// Errors surfaced by the channel layer and its collaborators.
///
/// None of these are fatal: transport and decode failures are reported and
/// either self-heal (reconnection) or stay contained to a single message,
/// and HTTP failures are handed back to the caller as values.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
