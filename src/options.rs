use std::path::PathBuf;
use std::time::Duration;
use crate::config::ThrottleConfig;
use crate::error::{Result, TorrentError};
use crate::throttle::limiter::{LimiterPolicy, DEFAULT_BURST, DEFAULT_ZERO_RATE_POLL};

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    // 基本オプション
    pub verbose: u8,
    pub config: Option<PathBuf>,
    pub log_file: Option<PathBuf>,

    // 帯域制限オプション
    pub upload_limit: Option<u64>,
    pub zero_rate_poll: Duration,
    pub burst: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            verbose: 0,
            config: None,
            log_file: None,

            upload_limit: None, // 停止状態で起動
            zero_rate_poll: DEFAULT_ZERO_RATE_POLL,
            burst: DEFAULT_BURST,
        }
    }
}

impl Options {
    /// 設定ファイルの値を反映する（コマンドラインの値は後で上書きする）
    pub fn apply_config(&mut self, config: &ThrottleConfig) -> Result<()> {
        if let Some(mbit) = config.upload_limit_mbit {
            self.upload_limit = Some(mbit);
        }
        self.zero_rate_poll = parse_poll_ms(config.zero_rate_poll_ms)?;
        self.burst = parse_burst_secs(config.burst_secs)?;
        Ok(())
    }

    pub fn policy(&self) -> LimiterPolicy {
        LimiterPolicy {
            zero_rate_poll: self.zero_rate_poll,
            burst: self.burst,
        }
    }
}

pub fn parse_poll_ms(ms: u64) -> Result<Duration> {
    if ms == 0 {
        return Err(TorrentError::InvalidOption(
            "zero-rate poll interval must be at least 1 ms".to_string(),
        ));
    }
    Ok(Duration::from_millis(ms))
}

pub fn parse_burst_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 || secs > 3600.0 {
        return Err(TorrentError::InvalidOption(format!(
            "Invalid burst: {}. Must be between 0 and 3600 seconds",
            secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}
