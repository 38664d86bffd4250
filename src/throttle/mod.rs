pub mod limiter;
pub mod conn;
pub mod async_conn;

pub use limiter::{Clock, LimiterPolicy, MonoClock, RateLimiter, BYTES_PER_MBIT};
pub use conn::ThrottledConn;
pub use async_conn::AsyncThrottledStream;
