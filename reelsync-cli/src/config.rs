use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use reelsync_net::{NetConfig, DEFAULT_PORT};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    network: NetworkConfig,
}

#[derive(Deserialize, Default)]
struct NetworkConfig {
    port: Option<u16>,
    host: Option<String>,
    connect_timeout_secs: Option<u64>,
    idle_timeout_secs: Option<u64>,
    sync_on_connect: Option<bool>,
    accept_poll_ms: Option<u64>,
}

pub struct Config {
    network: NetworkConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        Self::load_from(user_config_path().as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });

        if let Some(path) = path.filter(|p| p.exists()) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge_network(&mut base.network, user.network),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        Config {
            network: base.network,
        }
    }

    pub fn port(&self) -> u16 {
        self.network.port.unwrap_or(DEFAULT_PORT)
    }

    /// Server to join when none is given on the command line.
    pub fn host(&self) -> Option<&str> {
        self.network.host.as_deref().filter(|h| !h.is_empty())
    }

    pub fn net_config(&self) -> NetConfig {
        let fallback = NetConfig::default();
        NetConfig {
            connect_timeout: self
                .network
                .connect_timeout_secs
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or(fallback.connect_timeout),
            idle_timeout: match self.network.idle_timeout_secs {
                Some(0) => None,
                Some(s) => Some(Duration::from_secs(s)),
                None => fallback.idle_timeout,
            },
            sync_on_connect: self
                .network
                .sync_on_connect
                .unwrap_or(fallback.sync_on_connect),
            accept_poll: self
                .network
                .accept_poll_ms
                .map(|ms| Duration::from_millis(ms.clamp(1, 1000)))
                .unwrap_or(fallback.accept_poll),
            ..fallback
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reelsync").join("config.toml"))
}

fn merge_network(base: &mut NetworkConfig, user: NetworkConfig) {
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.host.is_some() {
        base.host = user.host;
    }
    if user.connect_timeout_secs.is_some() {
        base.connect_timeout_secs = user.connect_timeout_secs;
    }
    if user.idle_timeout_secs.is_some() {
        base.idle_timeout_secs = user.idle_timeout_secs;
    }
    if user.sync_on_connect.is_some() {
        base.sync_on_connect = user.sync_on_connect;
    }
    if user.accept_poll_ms.is_some() {
        base.accept_poll_ms = user.accept_poll_ms;
    }
}
