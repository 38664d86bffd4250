use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::error::Result;

/// 帯域制限の変更履歴を書き出すファイルロガー（--log-file）
#[derive(Clone)]
pub struct Logger {
    file: Arc<Mutex<File>>,
}

impl Logger {
    pub fn new(log_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "{}", message)?;
        file.flush()?;
        Ok(())
    }

    pub fn log_with_timestamp(&self, message: &str) -> Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.log(&format!("[{}] {}", timestamp, message))
    }
}


static GLOBAL_LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

fn global() -> MutexGuard<'static, Option<Logger>> {
    GLOBAL_LOGGER.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn init_logger(log_path: &Path) -> Result<()> {
    let logger = Logger::new(log_path)?;
    *global() = Some(logger);
    Ok(())
}

pub fn log(message: &str) {
    if let Some(logger) = global().as_ref() {
        if let Err(e) = logger.log(message) {
            ::log::warn!("failed to write log file: {}", e);
        }
    }
}

pub fn log_with_timestamp(message: &str) {
    if let Some(logger) = global().as_ref() {
        if let Err(e) = logger.log_with_timestamp(message) {
            ::log::warn!("failed to write log file: {}", e);
        }
    }
}

pub fn is_logging_enabled() -> bool {
    global().is_some()
}


#[macro_export]
macro_rules! audit_log {
    ($($arg:tt)*) => {
        if $crate::output::logger::is_logging_enabled() {
            $crate::output::logger::log_with_timestamp(&format!($($arg)*));
        }
    };
}
