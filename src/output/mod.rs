pub mod logger;

pub use logger::{Logger, init_logger, log, log_with_timestamp, is_logging_enabled};
