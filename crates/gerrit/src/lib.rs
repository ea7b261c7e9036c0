//! Gerrit event-stream supervisor.
//!
//! Reads `gerrit stream-events` over SSH, classifies each event against the
//! routing table, renders notifications, and hands them to a sink. Transient
//! failures retry forever with capped, jittered backoff; configuration
//! problems that retrying can never fix surface as [`Error::Fatal`] so the
//! process can exit non-zero.

pub mod supervisor;

pub use supervisor::ReviewStreamSupervisor;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Setup problem no retry can fix — bad key material, empty host,
    /// missing ssh binary.
    #[error("fatal gerrit setup: {0}")]
    Fatal(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Where rendered notifications go — the binary wires this to the chat
/// session.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one message, best-effort. An error here is logged by the
    /// supervisor and the event stream keeps going.
    async fn deliver(&self, channel: &str, text: &str) -> anyhow::Result<()>;
}
