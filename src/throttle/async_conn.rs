use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

use super::RateLimiter;

/// `ThrottledConn` の tokio 版
///
/// `poll_write` はトークンが貯まるまで `Sleep` で待つ。バッファが容量を
/// 超える場合は容量分だけ書き込む（短い書き込みとして返す）。
pub struct AsyncThrottledStream<S> {
    inner: S,
    limiter: RateLimiter,
    sleep: Option<Pin<Box<Sleep>>>,
    // 取得済みでまだ書き込んでいないバイト数（Pending や短い書き込みの後に使う）
    credit: usize,
}

impl<S> AsyncThrottledStream<S> {
    pub fn new(inner: S, limiter: RateLimiter) -> Self {
        Self {
            inner,
            limiter,
            sleep: None,
            credit: 0,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for AsyncThrottledStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for AsyncThrottledStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        while this.credit == 0 && !buf.is_empty() {
            if let Some(sleep) = this.sleep.as_mut() {
                ready!(sleep.as_mut().poll(cx));
                this.sleep = None;
            }

            match this.limiter.try_take_up_to(buf.len() as u64) {
                Ok(n) => this.credit = n as usize,
                Err(wait) => {
                    log::trace!("throttle: waiting {:?} for {} bytes", wait, buf.len());
                    this.sleep = Some(Box::pin(tokio::time::sleep(wait)));
                }
            }
        }

        let len = this.credit.min(buf.len());
        let result = ready!(Pin::new(&mut this.inner).poll_write(cx, &buf[..len]));
        if let Ok(written) = &result {
            this.credit -= (*written).min(len);
        }
        Poll::Ready(result)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
