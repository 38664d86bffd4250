//! 共有トークンバケットによるアップロード帯域制限
//!
//! すべてのスロットリング接続は同じ [`RateLimiter`] ハンドルを共有し、
//! 書き込み前に [`RateLimiter::take`] でバイト数分のトークンを取得する。
//! バケットの容量は既定でレート1秒分（バースト1秒）。

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// 1 Mbit/s あたりのバイト数（1024 * 1024 / 8）
pub const BYTES_PER_MBIT: u64 = 1024 * 1024 / 8;

/// レート0のときの再確認間隔
pub const DEFAULT_ZERO_RATE_POLL: Duration = Duration::from_millis(100);

/// バケット容量（レート何秒分のバーストを許すか）
pub const DEFAULT_BURST: Duration = Duration::from_secs(1);

/// 時刻取得の抽象化（テストで時間を進めるため）
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 単調増加クロック
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoClock;

impl Clock for MonoClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// リミッタの固定ポリシー
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterPolicy {
    /// レート0の間、`take` が再確認するまで眠る時間
    pub zero_rate_poll: Duration,
    /// バケット容量 = rate * burst
    pub burst: Duration,
}

impl Default for LimiterPolicy {
    fn default() -> Self {
        LimiterPolicy {
            zero_rate_poll: DEFAULT_ZERO_RATE_POLL,
            burst: DEFAULT_BURST,
        }
    }
}

struct Bucket {
    rate: u64,   // bytes per second (0 = すべてブロック)
    tokens: f64, // 使用可能なバイト数
    last: Instant,
}

impl Bucket {
    fn capacity(&self, burst: Duration) -> f64 {
        if self.rate == 0 {
            return 0.0;
        }
        // 少なくとも1バイトは入るようにする
        (self.rate as f64 * burst.as_secs_f64()).max(1.0)
    }

    fn refill(&mut self, now: Instant, burst: Duration) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.rate as f64).min(self.capacity(burst));
    }
}

/// 帯域制限器
///
/// クローンしても同じバケットを共有する。ロックはトークン計算の間だけ保持し、
/// 待機中は解放しているので、眠っている書き込み側が `set_limit` や `stop` を
/// 妨げることはない。待機者の順序（FIFO）は保証しない。
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    policy: LimiterPolicy,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// 停止状態（レート0）の新しいリミッタを作成
    pub fn new() -> Self {
        Self::with_policy(LimiterPolicy::default())
    }

    pub fn with_policy(policy: LimiterPolicy) -> Self {
        Self::with_clock(policy, Arc::new(MonoClock))
    }

    pub fn with_clock(policy: LimiterPolicy, clock: Arc<dyn Clock>) -> Self {
        let last = clock.now();
        RateLimiter {
            bucket: Arc::new(Mutex::new(Bucket {
                rate: 0,
                tokens: 0.0,
                last,
            })),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> LimiterPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        // バケットは数値だけなので、パニックしたスレッドの後でも整合している
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// アップロード上限を Mbit/s で設定する
    ///
    /// 変更直後から新しいレートを使えるよう、バケットを満タンにする。
    pub fn set_limit(&self, mbit: u64) {
        let rate = mbit.saturating_mul(1024 * 1024) / 8;
        {
            let mut bucket = self.lock();
            bucket.rate = rate;
            bucket.tokens = bucket.capacity(self.policy.burst);
            bucket.last = self.clock.now();
        }
        log::info!("upload limit set to {} Mbit/s ({} bytes/s)", mbit, rate);
    }

    /// アップロードを停止する（レート0、残りのトークンも破棄）
    pub fn stop(&self) {
        {
            let mut bucket = self.lock();
            bucket.rate = 0;
            bucket.tokens = 0.0;
            bucket.last = self.clock.now();
        }
        log::info!("upload stopped");
    }

    /// 現在の上限（bytes/s）
    pub fn get_limit(&self) -> u64 {
        self.lock().rate
    }

    /// 現在使用可能なトークン数（計算パスを1回実行した後の値）
    pub fn available(&self) -> f64 {
        let mut bucket = self.lock();
        let now = self.clock.now();
        bucket.refill(now, self.policy.burst);
        bucket.tokens
    }

    /// 現在のバケット容量（バイト）
    pub fn capacity(&self) -> f64 {
        self.lock().capacity(self.policy.burst)
    }

    /// トークン計算を1回行い、`want` バイト（`partial` なら容量分まで）を取得する
    ///
    /// 取得できなければ、再試行までに眠るべき時間を返す。
    fn account(&self, want: u64, partial: bool) -> Result<u64, Duration> {
        let mut bucket = self.lock();
        let now = self.clock.now();
        bucket.refill(now, self.policy.burst);

        if bucket.rate == 0 {
            return Err(self.policy.zero_rate_poll);
        }

        let capacity = bucket.capacity(self.policy.burst);
        let chunk = if partial && want as f64 > capacity {
            capacity.floor() as u64
        } else {
            want
        };

        let need = chunk as f64;
        if bucket.tokens >= need {
            bucket.tokens -= need;
            return Ok(chunk);
        }

        let deficit = (need - bucket.tokens).max(0.0);
        Err(Duration::from_secs_f64(deficit / bucket.rate as f64))
    }

    /// `n` バイト分を即座に取得できれば取得する（全部か無しか）
    ///
    /// 失敗時は不足分が貯まるまでの待ち時間を返す。レート0ならポーリング間隔。
    /// `n` が容量を超える場合は何度呼んでも成功しない。
    pub fn try_take(&self, n: u64) -> Result<(), Duration> {
        self.account(n, false).map(|_| ())
    }

    /// 最大 `want` バイト（容量で頭打ち）を取得し、取得できたバイト数を返す
    pub(crate) fn try_take_up_to(&self, want: u64) -> Result<u64, Duration> {
        self.account(want, true)
    }

    /// `n` バイト分のトークンが取得できるまで呼び出しスレッドをブロックする
    ///
    /// 容量を超える要求は容量ごとに分割して取得する。期限はなく、
    /// レートが0のままなら永久にブロックする。
    pub fn take(&self, n: u64) {
        let mut remaining = n;
        loop {
            match self.try_take_up_to(remaining) {
                Ok(granted) => {
                    remaining -= granted;
                    if remaining == 0 {
                        return;
                    }
                }
                Err(wait) => {
                    log::trace!("throttle: waiting {:?} for {} bytes", wait, remaining);
                    thread::sleep(wait);
                }
            }
        }
    }

    /// [`take`](Self::take) の非同期版（tokio タスク用）
    pub async fn take_async(&self, n: u64) {
        let mut remaining = n;
        loop {
            match self.try_take_up_to(remaining) {
                Ok(granted) => {
                    remaining -= granted;
                    if remaining == 0 {
                        return;
                    }
                }
                Err(wait) => {
                    log::trace!("throttle: waiting {:?} for {} bytes", wait, remaining);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bucket = self.lock();
        f.debug_struct("RateLimiter")
            .field("rate", &bucket.rate)
            .field("tokens", &bucket.tokens)
            .field("policy", &self.policy)
            .finish()
    }
}
