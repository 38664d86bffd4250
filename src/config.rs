use serde::Deserialize;
use std::path::Path;
use crate::error::Result;

/// 設定ファイル（TOML）
///
/// ```toml
/// [throttle]
/// upload_limit_mbit = 8
/// zero_rate_poll_ms = 100
/// burst_secs = 1.0
/// ```
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ThrottleConfig {
    /// 起動時のアップロード上限（Mbit/s）。未指定なら停止状態で起動
    pub upload_limit_mbit: Option<u64>,
    #[serde(default = "default_zero_rate_poll_ms")]
    pub zero_rate_poll_ms: u64,
    #[serde(default = "default_burst_secs")]
    pub burst_secs: f64,
}

fn default_zero_rate_poll_ms() -> u64 {
    100
}

fn default_burst_secs() -> f64 {
    1.0
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            upload_limit_mbit: None,
            zero_rate_poll_ms: default_zero_rate_poll_ms(),
            burst_secs: default_burst_secs(),
        }
    }
}

impl Config {
    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        log::debug!("loaded config from {}", path.display());
        Self::parse(&s)
    }
}
