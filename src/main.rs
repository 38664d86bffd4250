use anyhow::Context;
use clap::Parser;
use std::io;
use torrent_cli::cli::Cli;
use torrent_cli::output;
use torrent_cli::shell::{describe_limit, Shell};
use torrent_cli::throttle::RateLimiter;

fn main() -> anyhow::Result<()> {
    // ロガーの初期化
    env_logger::init();

    // コマンドライン引数のパース
    let cli = Cli::parse();
    let options = cli.into_options().context("Failed to load options")?;

    // ログファイルの初期化（--log-file オプションが指定されている場合）
    if let Some(ref log_file_path) = options.log_file {
        match output::init_logger(log_file_path) {
            Ok(_) => {
                if options.verbose > 0 {
                    println!("Logging to file: {}", log_file_path.display());
                }
                output::log_with_timestamp("torrent-cli v0.1.0 started");
            }
            Err(e) => {
                eprintln!("Warning: Failed to initialize log file: {}", e);
            }
        }
    }

    // すべての接続で共有するリミッタ
    let limiter = RateLimiter::with_policy(options.policy());
    if let Some(mbit) = options.upload_limit {
        limiter.set_limit(mbit);
        torrent_cli::audit_log!("initial upload limit {} Mbit/s", mbit);
    }

    if options.verbose > 0 {
        println!("torrent-cli v0.1.0");
        println!("{}", describe_limit(limiter.get_limit()));
        println!("Policy: {:?}", limiter.policy());
    }

    let shell = Shell::new(limiter);
    let stdin = io::stdin();
    let stdout = io::stdout();
    shell
        .run(stdin.lock(), stdout.lock())
        .context("Shell terminated with an I/O error")?;

    Ok(())
}
