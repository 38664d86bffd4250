use clap::{Parser, ArgAction};
use std::path::PathBuf;
use crate::config::Config;
use crate::error::Result;
use crate::options::{Options, parse_burst_secs, parse_poll_ms};

#[derive(Parser, Debug)]
#[command(name = "torrent-cli")]
#[command(version = "0.1.0")]
#[command(about = "Interactive torrent client shell with a runtime-adjustable upload limit", long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Read settings from a TOML FILE
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Log limit changes to the specified FILE
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    // 帯域制限オプション
    /// Initial upload limit in Mbit/s (uploads are stopped when omitted)
    #[arg(short = 'u', long = "upload-limit", value_name = "MBIT")]
    pub upload_limit: Option<u64>,

    /// How often a stopped upload re-checks the limit (ms)
    #[arg(long = "zero-rate-poll-ms", value_name = "MS")]
    pub zero_rate_poll_ms: Option<u64>,

    /// Burst capacity in seconds of the current rate
    #[arg(long = "burst-secs", value_name = "SECS")]
    pub burst_secs: Option<f64>,
}

impl Cli {
    /// CLIからOptionsに変換（設定ファイル → コマンドラインの順に適用）
    pub fn into_options(self) -> Result<Options> {
        let mut options = Options::default();

        if let Some(ref path) = self.config {
            let config = Config::load(path)?;
            options.apply_config(&config.throttle)?;
        }

        // 基本オプション
        options.verbose = self.verbose;
        options.config = self.config;
        options.log_file = self.log_file;

        // 帯域制限オプション
        if let Some(mbit) = self.upload_limit {
            options.upload_limit = Some(mbit);
        }
        if let Some(ms) = self.zero_rate_poll_ms {
            options.zero_rate_poll = parse_poll_ms(ms)?;
        }
        if let Some(secs) = self.burst_secs {
            options.burst = parse_burst_secs(secs)?;
        }

        Ok(options)
    }
}
