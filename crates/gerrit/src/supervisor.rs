use std::{process::Stdio, sync::Arc, time::Duration};

use {
    rand::Rng,
    reviewrelay_config::GerritConfig,
    reviewrelay_routing::RoutingTable,
    tokio::{
        io::{AsyncBufRead, AsyncBufReadExt, BufReader},
        process::{Child, Command},
        time::sleep,
    },
    tracing::{debug, info, warn},
};

use crate::{Error, NotificationSink, Result};

const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Disconnected,
    Connecting,
    Watching,
}

/// Owns the review-event side: the SSH feed, the retry loop, and dispatch
/// into routing → formatting → the sink.
pub struct ReviewStreamSupervisor {
    config: GerritConfig,
    table: Arc<RoutingTable>,
    sink: Arc<dyn NotificationSink>,
    state: StreamState,
}

impl ReviewStreamSupervisor {
    pub fn new(
        config: GerritConfig,
        table: Arc<RoutingTable>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            table,
            sink,
            state: StreamState::Disconnected,
        }
    }

    /// Run until a fatal setup error. Transient failures reconnect forever.
    pub async fn run(mut self) -> Result<()> {
        let mut backoff = BASE_BACKOFF;

        loop {
            self.state = StreamState::Connecting;

            let mut child = match self.spawn_stream() {
                Ok(child) => child,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "failed to start gerrit stream");
                    self.state = StreamState::Disconnected;
                    backoff = Self::delay(backoff).await;
                    continue;
                },
            };

            let Some(stdout) = child.stdout.take() else {
                warn!("gerrit stream child has no stdout, retrying");
                self.state = StreamState::Disconnected;
                backoff = Self::delay(backoff).await;
                continue;
            };
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(log_stderr(stderr));
            }

            self.state = StreamState::Watching;
            info!(
                host = %self.config.host,
                port = self.config.port,
                state = ?self.state,
                "watching gerrit event stream"
            );

            let saw_events = self.watch(BufReader::new(stdout)).await;

            // The feed is gone; reap the child and start over.
            let _ = child.kill().await;
            let _ = child.wait().await;
            self.state = StreamState::Disconnected;
            if saw_events {
                backoff = BASE_BACKOFF;
            }
            warn!(state = ?self.state, "gerrit event stream disconnected");
            backoff = Self::delay(backoff).await;
        }
    }

    /// Sleep the jittered backoff, then return the next delay.
    async fn delay(backoff: Duration) -> Duration {
        let delay = with_jitter(backoff);
        debug!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
        sleep(delay).await;
        (backoff * 2).min(MAX_BACKOFF)
    }

    /// Start `ssh … gerrit stream-events`.
    ///
    /// Checks that can only ever fail the same way again (key material,
    /// host/user, the ssh binary itself) come back as [`Error::Fatal`];
    /// everything else is transient.
    fn spawn_stream(&self) -> Result<Child> {
        let config = &self.config;
        if config.host.trim().is_empty() {
            return Err(Error::Fatal("gerrit.host is not set".into()));
        }
        if config.user.trim().is_empty() {
            return Err(Error::Fatal("gerrit.user is not set".into()));
        }
        if config.key.as_os_str().is_empty() {
            return Err(Error::Fatal("gerrit.key is not set".into()));
        }
        if !config.key.is_file() {
            return Err(Error::Fatal(format!(
                "gerrit key {} is missing or unreadable",
                config.key.display()
            )));
        }

        let mut command = Command::new("ssh");
        command
            .arg("-p")
            .arg(config.port.to_string())
            .arg("-i")
            .arg(&config.key)
            .args([
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-o",
                "ServerAliveInterval=60",
            ])
            .arg(format!("{}@{}", config.user, config.host))
            .args(["gerrit", "stream-events"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Fatal("ssh binary not found on PATH".into())
            } else {
                Error::Io(e)
            }
        })
    }

    /// Consume the feed until it ends. Returns whether any line arrived, so
    /// the caller knows the connection was actually good.
    async fn watch<R: AsyncBufRead + Unpin>(&self, reader: R) -> bool {
        let mut lines = reader.lines();
        let mut saw_events = false;

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    saw_events = true;
                    self.dispatch_line(&line).await;
                },
                Ok(None) => return saw_events,
                Err(e) => {
                    warn!(error = %e, "error reading gerrit event stream");
                    return saw_events;
                },
            }
        }
    }

    /// One event through the pipeline. Nothing here can take the stream
    /// down: decode failures and sink failures are logged and skipped.
    async fn dispatch_line(&self, line: &str) {
        let event = match reviewrelay_event::decode_line(line) {
            Ok(event) => event,
            Err(reviewrelay_event::Error::EmptyLine) => return,
            Err(e) => {
                warn!(error = %e, "undecodable event, skipping");
                return;
            },
        };

        let recipients = self.table.match_event(&event);
        debug!(?recipients, "matched channels for event");
        if recipients.is_empty() {
            return;
        }

        for notification in reviewrelay_format::render(&event, &recipients, &self.table) {
            if let Err(e) = self
                .sink
                .deliver(&notification.channel, &notification.text)
                .await
            {
                warn!(
                    channel = %notification.channel,
                    error = %e,
                    "failed to deliver notification"
                );
            }
        }
    }
}

async fn log_stderr(stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(line = %line, "gerrit ssh stderr");
    }
}

fn with_jitter(base: Duration) -> Duration {
    let spread = (base.as_millis() as u64 / 4).max(1);
    base + Duration::from_millis(rand::rng().random_range(0..spread))
}
