//! IRC chat session.
//!
//! One spawned task owns the socket; everything else talks to it through a
//! bounded queue via [`ChatHandle`]. The actor handles registration, NickServ
//! identification, paced channel joins, nick-collision recovery, PING/PONG,
//! and reconnects with capped backoff when the connection dies. Sends are
//! best-effort at-most-once: a failed write drops the message and forces a
//! reconnect.

pub mod session;
pub mod wire;

pub use session::{ChatHandle, SessionConfig, spawn};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The server name is not a valid TLS server name.
    #[error("invalid server name for tls: {0}")]
    InvalidServerName(String),

    /// The server closed the link with an ERROR message.
    #[error("server error: {0}")]
    Server(String),

    /// The session task is gone; no more messages can be queued.
    #[error("chat session closed")]
    SessionClosed,
}
