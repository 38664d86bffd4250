use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use super::RateLimiter;

/// 書き込みを帯域制限するストリームラッパー
///
/// `write` の前に必ず `RateLimiter::take(buf.len())` を呼ぶ。それ以外の操作は
/// そのまま内部ストリームに委譲する。内部ストリームのエラーは変換しない。
pub struct ThrottledConn<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S> ThrottledConn<S> {
    /// 確立済みのストリームをラップする
    pub fn new(inner: S, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// 内部ストリームへの参照を取得
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// 内部ストリームへの可変参照を取得
    ///
    /// ここから直接書き込んだバイトは帯域制限されない。
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read> Read for ThrottledConn<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Write> Write for ThrottledConn<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.limiter.take(buf.len() as u64);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// TCP固有の操作（アドレス・タイムアウト・クローズ）はそのまま転送
impl ThrottledConn<TcpStream> {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(dur)
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.inner.set_write_timeout(dur)
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.inner.shutdown(how)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::limiter::tests::ManualClock;
    use crate::throttle::LimiterPolicy;
    use std::io::{BufRead, BufReader, Cursor};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    /// 書き込み呼び出しを記録するだけのストリーム
    #[derive(Default)]
    struct RecordingStream {
        writes: Vec<Vec<u8>>,
        flushes: usize,
    }

    impl Write for RecordingStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    struct BrokenStream;

    impl Write for BrokenStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn open_limiter() -> RateLimiter {
        let limiter = RateLimiter::new();
        limiter.set_limit(8);
        limiter
    }

    #[test]
    fn test_write_is_forwarded_unchanged() -> io::Result<()> {
        let mut direct = RecordingStream::default();
        let mut conn = ThrottledConn::new(RecordingStream::default(), open_limiter());

        let payload = b"piece 42 of 1337".to_vec();
        let direct_n = direct.write(&payload)?;
        let throttled_n = conn.write(&payload)?;
        conn.flush()?;

        assert_eq!(direct_n, throttled_n);
        assert_eq!(conn.get_ref().writes, direct.writes);
        assert_eq!(conn.get_ref().flushes, 1);
        Ok(())
    }

    #[test]
    fn test_write_debits_limiter() -> io::Result<()> {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(LimiterPolicy::default(), clock);
        limiter.set_limit(8);
        let mut conn = ThrottledConn::new(RecordingStream::default(), limiter.clone());

        conn.write_all(&[0u8; 4096])?;
        assert_eq!(limiter.available(), 1_048_576.0 - 4096.0);
        Ok(())
    }

    #[test]
    fn test_write_error_propagates() {
        let mut conn = ThrottledConn::new(BrokenStream, open_limiter());
        let err = conn.write(b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "peer went away");
    }

    #[test]
    fn test_read_is_not_throttled() -> io::Result<()> {
        // レート0でも読み込みはブロックされない
        let limiter = RateLimiter::new();
        let mut conn = ThrottledConn::new(Cursor::new(b"hello".to_vec()), limiter);

        let start = Instant::now();
        let mut buf = String::new();
        conn.read_to_string(&mut buf)?;
        assert_eq!(buf, "hello");
        assert!(start.elapsed() < Duration::from_millis(50));
        Ok(())
    }

    #[test]
    fn test_write_waits_for_quota() -> io::Result<()> {
        let limiter = RateLimiter::new();
        limiter.set_limit(1);
        let mut conn = ThrottledConn::new(RecordingStream::default(), limiter);

        let start = Instant::now();
        conn.write_all(&vec![7u8; 131_072])?;
        conn.write_all(&vec![7u8; 65_536])?;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400), "too fast: {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(800), "too slow: {:?}", elapsed);
        Ok(())
    }

    #[test]
    fn test_tcp_stream_round_trip() -> io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;

        let server = thread::spawn(move || -> io::Result<String> {
            let (socket, _) = listener.accept()?;
            let mut line = String::new();
            BufReader::new(&socket).read_line(&mut line)?;
            (&socket).write_all(b"ack\n")?;
            Ok(line)
        });

        let stream = TcpStream::connect(addr)?;
        let mut conn = ThrottledConn::new(stream, open_limiter());
        assert_eq!(conn.peer_addr()?, addr);
        assert_eq!(conn.local_addr()?.ip(), addr.ip());
        conn.set_read_timeout(Some(Duration::from_secs(5)))?;
        conn.set_write_timeout(Some(Duration::from_secs(5)))?;

        conn.write_all(b"have 17\n")?;
        let mut reply = [0u8; 4];
        conn.read_exact(&mut reply)?;
        conn.shutdown(Shutdown::Both)?;

        assert_eq!(&reply, b"ack\n");
        assert_eq!(server.join().unwrap()?, "have 17\n");
        Ok(())
    }
}
