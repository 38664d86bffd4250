pub mod cli;
pub mod config;
pub mod error;
pub mod options;
pub mod output;
pub mod shell;
pub mod throttle;

pub use error::{Result, TorrentError};
pub use throttle::{AsyncThrottledStream, RateLimiter, ThrottledConn};
