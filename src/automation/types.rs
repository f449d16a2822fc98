// Types and enums for device automation
use crate::template_matching::MatchResult;
use std::fmt;
use std::time::Duration;

/// What a visibility poll waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    AwaitAppear,
    AwaitDisappear,
}

/// Terminal state of one visibility poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Appeared,
    Disappeared,
    TimedOut,
    CaptureFailed,
    Cancelled,
}

impl PollOutcome {
    /// The awaited condition was observed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PollOutcome::Appeared | PollOutcome::Disappeared)
    }
}

/// Result of matching one fresh screenshot during a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Present,
    Absent,
    CaptureFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub mode: PollMode,
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSpec {
    pub fn appear(timeout: Duration, interval: Duration) -> Self {
        Self {
            mode: PollMode::AwaitAppear,
            timeout,
            interval,
        }
    }

    pub fn disappear(timeout: Duration, interval: Duration) -> Self {
        Self {
            mode: PollMode::AwaitDisappear,
            timeout,
            interval,
        }
    }
}

/// How a poll ended and what it saw on the way
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Screenshots taken, including a failed one
    pub attempts: u32,
    pub elapsed: Duration,
    /// Match from the most recent successfully matched screenshot
    pub last_match: Option<MatchResult>,
}

/// How one device's session ended when nothing went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
    /// The connected sentinel was already on screen; nothing tapped
    AlreadyConnected,
    /// Tapped connect and the connected sentinel appeared
    Connected,
    /// Tapped connect but the sentinel never appeared
    ConnectionUnconfirmed,
    ConnectButtonNotFound,
    Cancelled,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionOutcome::AlreadyConnected => "already connected",
            SessionOutcome::Connected => "connected",
            SessionOutcome::ConnectionUnconfirmed => "connection unconfirmed",
            SessionOutcome::ConnectButtonNotFound => "connect button not found",
            SessionOutcome::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}
