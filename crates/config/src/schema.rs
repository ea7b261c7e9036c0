use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub irc: IrcConfig,
    pub gerrit: GerritConfig,
}

/// IRC side: where to connect and who to be.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    pub nick: String,

    /// NickServ password, also used for ghost/release recovery.
    #[serde(rename = "pass", serialize_with = "serialize_secret")]
    pub password: Secret<String>,

    pub server: String,

    /// 6697 implies TLS even without `force_ssl`.
    pub port: u16,

    pub force_ssl: bool,

    /// Optional connection password (`PASS`), distinct from the NickServ one.
    #[serde(
        serialize_with = "serialize_opt_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_password: Option<Secret<String>>,

    /// Path to the channel-map YAML file.
    pub channel_config: PathBuf,
}

impl IrcConfig {
    pub fn use_tls(&self) -> bool {
        self.force_ssl || self.port == 6697
    }
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            nick: String::new(),
            password: Secret::new(String::new()),
            server: String::new(),
            port: 6667,
            force_ssl: false,
            server_password: None,
            channel_config: PathBuf::new(),
        }
    }
}

impl std::fmt::Debug for IrcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcConfig")
            .field("nick", &self.nick)
            .field("pass", &"[REDACTED]")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("force_ssl", &self.force_ssl)
            .field("channel_config", &self.channel_config)
            .finish_non_exhaustive()
    }
}

/// Gerrit side: the SSH endpoint the event stream is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GerritConfig {
    pub user: String,

    /// Private key for the stream-events SSH session.
    pub key: PathBuf,

    pub host: String,

    pub port: u16,
}

impl Default for GerritConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            key: PathBuf::new(),
            host: String::new(),
            port: 29418,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_opt_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}
