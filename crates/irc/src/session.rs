use std::{sync::Arc, time::Duration};

use {
    rand::Rng,
    secrecy::{ExposeSecret, Secret},
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
        net::TcpStream,
        sync::mpsc,
        time::sleep,
    },
    tracing::{error, info, warn},
};

use crate::{Error, Result, wire};

/// Outbound queue depth. A full queue blocks the review-stream worker, which
/// is the intended backpressure.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay between channel joins and after each privmsg, so the server doesn't
/// flood-kick us.
const PACING: Duration = Duration::from_millis(500);

/// Pause between issuing the NickServ recovery commands and reclaiming the
/// nick, giving services time to drop the squatter.
const NICK_RECLAIM_PAUSE: Duration = Duration::from_secs(1);

/// Everything the session needs to connect and register.
#[derive(Clone)]
pub struct SessionConfig {
    pub nick: String,
    /// NickServ password.
    pub password: Secret<String>,
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    /// Connection password (`PASS`), if the server wants one.
    pub server_password: Option<Secret<String>>,
    /// Channels to join after registration.
    pub channels: Vec<String>,
}

enum SessionCommand {
    Privmsg { channel: String, text: String },
}

/// Cloneable handle to the session actor.
#[derive(Clone)]
pub struct ChatHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl ChatHandle {
    /// Queue one message. Blocks when the queue is full; errors only when the
    /// session task is gone. Queued messages are delivered at most once — a
    /// write failure drops them.
    pub async fn send(&self, channel: impl Into<String>, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(SessionCommand::Privmsg {
                channel: channel.into(),
                text: text.into(),
            })
            .await
            .map_err(|_| Error::SessionClosed)
    }
}

/// Spawn the session actor. The connection runs (and reconnects) in the
/// background until every `ChatHandle` is dropped.
pub fn spawn(config: SessionConfig) -> ChatHandle {
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    tokio::spawn(session_loop(config, rx));
    ChatHandle { tx }
}

async fn session_loop(config: SessionConfig, mut rx: mpsc::Receiver<SessionCommand>) {
    let mut backoff = BASE_BACKOFF;

    loop {
        info!(server = %config.server, port = config.port, "connecting to irc");

        match connect_and_run(&config, &mut rx, &mut backoff).await {
            Ok(()) => {
                info!("all chat handles dropped, session ending");
                return;
            },
            Err(e) => error!(error = %e, "irc session error"),
        }

        let delay = with_jitter(backoff);
        info!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
        sleep(delay).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// One connection attempt: dial, register, then run the session until the
/// link or the handle side goes away.
async fn connect_and_run(
    config: &SessionConfig,
    rx: &mut mpsc::Receiver<SessionCommand>,
    backoff: &mut Duration,
) -> Result<()> {
    let stream = TcpStream::connect((config.server.as_str(), config.port)).await?;

    if config.use_tls {
        let name = rustls::pki_types::ServerName::try_from(config.server.clone())
            .map_err(|_| Error::InvalidServerName(config.server.clone()))?;
        let stream = tls_connector().connect(name, stream).await?;
        drive(stream, config, rx, backoff).await
    } else {
        drive(stream, config, rx, backoff).await
    }
}

/// TLS connector trusting the system roots, for `force_ssl` servers.
fn tls_connector() -> tokio_rustls::TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = roots.add(cert);
    }
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    tokio_rustls::TlsConnector::from(Arc::new(tls_config))
}

async fn drive<S>(
    stream: S,
    config: &SessionConfig,
    rx: &mut mpsc::Receiver<SessionCommand>,
    backoff: &mut Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    if let Some(server_password) = &config.server_password {
        send_line(&mut writer, &wire::pass(server_password.expose_secret())).await?;
    }
    send_line(&mut writer, &wire::nick(&config.nick)).await?;
    send_line(&mut writer, &wire::user(&config.nick)).await?;

    // Outbound requests are only drained once registered; until then they
    // wait in the bounded queue.
    let mut registered = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(raw) = line? else {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "server closed the connection",
                    )));
                };
                let Some(line) = wire::parse(&raw) else { continue };
                match line.command.as_str() {
                    "PING" => {
                        let token = line.trailing().unwrap_or_default();
                        send_line(&mut writer, &wire::pong(token)).await?;
                    },
                    wire::RPL_WELCOME => {
                        info!("registered with irc server, identifying");
                        identify(&mut writer, config).await?;
                        for channel in &config.channels {
                            send_line(&mut writer, &wire::join(channel)).await?;
                            info!(channel = %channel, "joined channel");
                            sleep(PACING).await;
                        }
                        registered = true;
                        *backoff = BASE_BACKOFF;
                    },
                    wire::ERR_NICKNAMEINUSE => {
                        recover_nick(&mut writer, config).await?;
                    },
                    "ERROR" => {
                        return Err(Error::Server(
                            line.trailing().unwrap_or("server closed the link").to_string(),
                        ));
                    },
                    _ => {},
                }
            },

            command = rx.recv(), if registered => {
                match command {
                    Some(SessionCommand::Privmsg { channel, text }) => {
                        info!(channel = %channel, text = %text, "sending message");
                        send_line(&mut writer, &wire::privmsg(&channel, &text)).await?;
                        sleep(PACING).await;
                    },
                    None => return Ok(()),
                }
            },
        }
    }
}

async fn identify<W: AsyncWrite + Unpin>(writer: &mut W, config: &SessionConfig) -> Result<()> {
    let command = format!("IDENTIFY {}", config.password.expose_secret());
    send_line(writer, &wire::privmsg("NickServ", &command)).await
}

/// The configured nick is taken (likely our own ghost from a dropped
/// connection). Sidestep to a suffixed nick, ask services to clear the old
/// one, then take it back.
async fn recover_nick<W: AsyncWrite + Unpin>(writer: &mut W, config: &SessionConfig) -> Result<()> {
    warn!(nick = %config.nick, "nick in use, recovering");
    let password = config.password.expose_secret();

    send_line(writer, &wire::nick(&format!("{}_", config.nick))).await?;
    identify(writer, config).await?;
    send_line(
        writer,
        &wire::privmsg("NickServ", &format!("GHOST {} {password}", config.nick)),
    )
    .await?;
    send_line(
        writer,
        &wire::privmsg("NickServ", &format!("RELEASE {} {password}", config.nick)),
    )
    .await?;
    sleep(NICK_RECLAIM_PAUSE).await;
    send_line(writer, &wire::nick(&config.nick)).await?;

    info!(nick = %config.nick, "nick recovered");
    Ok(())
}

async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;
    Ok(())
}

fn with_jitter(base: Duration) -> Duration {
    let spread = (base.as_millis() as u64 / 4).max(1);
    base + Duration::from_millis(rand::rng().random_range(0..spread))
}
