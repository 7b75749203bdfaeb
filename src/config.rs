use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context, Error};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{controls::ControlValues, motion::PathPolicy};

pub const CONFIG_FILE: &str = "config.ron";

/// The Art-Net port.
pub const DEFAULT_CONTROL_NET_PORT: u16 = 6454;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub control_net: ControlNetConfig,
    pub render: RenderConfig,
    pub playback: PlaybackConfig,
    pub scenes: ScenesConfig,
    /// Control values at startup, before any slider or packet moves them
    pub controls: ControlValues,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ControlNetConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub enabled: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub path_policy: PathPolicy,
    /// Seed for the phase offsets. Taken from the OS when absent.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScenesConfig {
    pub directory: PathBuf,
    /// Write the built-in demo scenes into an empty scene directory
    pub seed_demo: bool,
}

impl Default for ControlNetConfig {
    fn default() -> Self {
        ControlNetConfig {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_CONTROL_NET_PORT,
            enabled: true,
        }
    }
}

impl ControlNetConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 1920,
            height: 1080,
            frame_rate: 60,
            path_policy: PathPolicy::default(),
            seed: None,
        }
    }
}

impl RenderConfig {
    /// Target wall-clock time per frame.
    pub fn frame_time(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            enabled: false,
            interval_secs: 5,
        }
    }
}

impl Default for ScenesConfig {
    fn default() -> Self {
        ScenesConfig {
            directory: PathBuf::from("scenes"),
            seed_demo: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = ron::from_str(&config)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        ensure!(
            config.playback.interval_secs >= 1,
            "{}: playback interval must be at least 1 second",
            path.display()
        );
        Ok(config)
    }

    /// Like `load_from`, but a missing file means "use the defaults".
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found, using the default config", path.display());
            return Ok(Config::default());
        }
        Self::load_from(path)
    }
}
