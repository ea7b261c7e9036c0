//! Configuration loading for the relay.
//!
//! Config files: `reviewrelay.toml`, `reviewrelay.yaml`, or `reviewrelay.json`,
//! searched in `./` then `~/.config/reviewrelay/`. String values support
//! `${ENV_VAR}` substitution. The channel map (which channels care about which
//! events/projects/branches) lives in its own YAML file referenced by
//! `irc.channel_config`.

pub mod channels;
pub mod loader;
pub mod schema;

pub use {
    channels::{ChannelSubscriptions, load_channel_map, normalize_channel},
    loader::{config_dir, discover_and_load, load_config},
    schema::{GerritConfig, IrcConfig, RelayConfig},
};
