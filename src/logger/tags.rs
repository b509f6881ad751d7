/// Log tags identifying the subsystem a message originated from

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Channel,
    Transport,
    Alerts,
    Telemetry,
    Config,
}

impl LogTag {
    /// Fixed-width tag label used in console output
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Channel => "CHANNEL",
            LogTag::Transport => "TRANSPORT",
            LogTag::Alerts => "ALERTS",
            LogTag::Telemetry => "TELEMETRY",
            LogTag::Config => "CONFIG",
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
