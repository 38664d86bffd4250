//! 帯域制限を操作する最小限の対話シェル
//!
//! コマンドの解析と検証は [`Command`] が行い、[`Shell`] は結果をリミッタの
//! 設定操作（`set_limit` / `stop` / `get_limit`）に振り分けるだけ。

pub mod command;

pub use command::Command;

use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use crate::error::Result;
use crate::throttle::{RateLimiter, BYTES_PER_MBIT};

pub struct Shell {
    limiter: RateLimiter,
    prompt: String,
}

impl Shell {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            prompt: "> ".to_string(),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// 入力が尽きるか `exit` が来るまでコマンドを処理する
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut out: W) -> Result<()> {
        writeln!(
            out,
            "Welcome to torrent-cli shell! Commands: set-uspeed <mbit>, stop-upload, get-uspeed, exit"
        )?;

        loop {
            write!(out, "{}", self.prompt)?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out, "\nExiting shell.")?;
                return Ok(());
            }

            match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(command)) => {
                    if self.dispatch(command, &mut out)?.is_break() {
                        return Ok(());
                    }
                }
                // 入力ミスはシェルを止めずに表示だけする
                Err(e) => writeln!(out, "{}", e)?,
            }
        }
    }

    /// コマンドを1つ実行する。`Break` ならシェルを終了する
    pub fn dispatch<W: Write>(&self, command: Command, out: &mut W) -> Result<ControlFlow<()>> {
        match command {
            Command::SetUploadSpeed(mbit) => {
                self.limiter.set_limit(mbit);
                let rate = self.limiter.get_limit();
                crate::audit_log!("upload limit set to {} Mbit/s ({} bytes/s)", mbit, rate);
                writeln!(out, "upload limit set to {} Mbit/s ({} bytes/s)", mbit, rate)?;
            }
            Command::StopUpload => {
                self.limiter.stop();
                crate::audit_log!("upload stopped");
                writeln!(out, "upload stopped")?;
            }
            Command::GetUploadSpeed => {
                writeln!(out, "{}", describe_limit(self.limiter.get_limit()))?;
            }
            Command::Exit => {
                writeln!(out, "Bye.")?;
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// 現在の上限を表示用の文字列にする
pub fn describe_limit(bytes_per_sec: u64) -> String {
    if bytes_per_sec == 0 {
        return "upload stopped (0 bytes/s)".to_string();
    }
    format!(
        "upload limit: {} bytes/s ({:.2} Mbit/s)",
        bytes_per_sec,
        bytes_per_sec as f64 / BYTES_PER_MBIT as f64
    )
}
