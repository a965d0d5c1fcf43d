//! 時間管理サブシステム
//!
//! 応答待ちループが使用する時計とスケジューラの抽象。
//! カーネルでは TSC/HPET と自前スケジューラ、ホストでは `StdClock` を束ねる。

/// ナノ秒単位の時間
pub type Nanoseconds = u64;

/// 1秒のナノ秒数
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// 1ミリ秒のナノ秒数
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// 1マイクロ秒のナノ秒数
pub const NANOS_PER_MICRO: u64 = 1_000;

/// 時計とスケジューラの最小インターフェース
///
/// `now_ns` は単調増加であること。`delay_us` はCPUを手放さないビジーウェイト、
/// `yield_now` は自発的な譲渡、`sleep_ms` は呼び出し元を停止させる粗い待機。
pub trait Clock: Send + Sync {
    /// 単調時計の現在値
    fn now_ns(&self) -> Nanoseconds;

    /// マイクロ秒単位のビジーウェイト
    fn delay_us(&self, us: u64);

    /// スケジューラへ自発的にCPUを譲る
    fn yield_now(&self);

    /// ミリ秒単位のスリープ
    fn sleep_ms(&self, ms: u64);

    /// `since` からの経過時間
    fn elapsed_ns(&self, since: Nanoseconds) -> Nanoseconds {
        self.now_ns().saturating_sub(since)
    }
}

/// ホスト環境の時計 (std::time / std::thread)
#[cfg(any(test, feature = "std"))]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(any(test, feature = "std"))]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
impl Clock for StdClock {
    fn now_ns(&self) -> Nanoseconds {
        self.origin.elapsed().as_nanos() as Nanoseconds
    }

    fn delay_us(&self, us: u64) {
        let end = std::time::Instant::now() + std::time::Duration::from_micros(us);
        while std::time::Instant::now() < end {
            core::hint::spin_loop();
        }
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}
