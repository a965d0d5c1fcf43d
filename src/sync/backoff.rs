// ============================================================================
// src/sync/backoff.rs - Two-Tier Backoff for Response Polling
// ============================================================================
//!
//! # 二段階バックオフ
//!
//! 短いコマンドはほぼ即座に完了するため、最初はビジーウェイト + yield で
//! レイテンシを抑える。閾値を超えたらミリ秒単位のスリープに切り替え、
//! 停止したハードウェアでコアを1秒間回し続けないようにする。
//!
//! ```text
//! iteration:  0 ........ spin_iterations | spin_iterations+1 ......
//! action:     delay_us + yield_now       | sleep_ms
//! ```

use crate::time::Clock;

/// ビジーウェイト段階の反復回数（これを超えるとスリープ段階）
pub const DEFAULT_SPIN_ITERATIONS: u64 = 3000;

/// ビジーウェイト段階の1回あたりの待機 (μs)
pub const DEFAULT_SPIN_DELAY_US: u64 = 10;

/// スリープ段階の1回あたりの待機 (ms)
pub const DEFAULT_SLEEP_MS: u64 = 2;

/// バックオフの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPhase {
    /// ビジーウェイト + yield
    Spin,
    /// 粗いスリープ
    Sleep,
}

/// バックオフのチューニング値
///
/// デフォルト値は特定カーネルのスケジューラtick向けに調整された経験値であり、
/// 環境に応じて変更してよい。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// この反復インデックスまではビジーウェイト
    pub spin_iterations: u64,
    /// ビジーウェイト1回の長さ (μs)
    pub spin_delay_us: u64,
    /// スリープ1回の長さ (ms)
    pub sleep_ms: u64,
}

impl BackoffPolicy {
    pub const fn new(spin_iterations: u64, spin_delay_us: u64, sleep_ms: u64) -> Self {
        Self {
            spin_iterations,
            spin_delay_us,
            sleep_ms,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_SPIN_ITERATIONS,
            DEFAULT_SPIN_DELAY_US,
            DEFAULT_SLEEP_MS,
        )
    }
}

/// 応答待ち用バックオフ
///
/// 1回の待機呼び出しごとに生成し、ループの各反復の末尾で `wait` を呼ぶ。
#[derive(Debug, Clone)]
pub struct ResponseBackoff {
    policy: BackoffPolicy,
    iteration: u64,
    spins: u64,
    sleeps: u64,
}

impl ResponseBackoff {
    /// 新しいバックオフを作成
    #[inline]
    pub const fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            iteration: 0,
            spins: 0,
            sleeps: 0,
        }
    }

    /// 次の `wait` が取る段階
    #[inline]
    pub fn phase(&self) -> BackoffPhase {
        if self.iteration > self.policy.spin_iterations {
            BackoffPhase::Sleep
        } else {
            BackoffPhase::Spin
        }
    }

    /// 現在の段階に応じて待機し、反復カウンタを進める
    pub fn wait(&mut self, clock: &dyn Clock) -> BackoffPhase {
        let phase = self.phase();
        match phase {
            BackoffPhase::Spin => {
                clock.delay_us(self.policy.spin_delay_us);
                clock.yield_now();
                self.spins += 1;
            }
            BackoffPhase::Sleep => {
                clock.sleep_ms(self.policy.sleep_ms);
                self.sleeps += 1;
            }
        }
        self.iteration += 1;
        phase
    }

    /// これまでの反復回数
    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// ビジーウェイト回数
    #[inline]
    pub fn spins(&self) -> u64 {
        self.spins
    }

    /// スリープ回数
    #[inline]
    pub fn sleeps(&self) -> u64 {
        self.sleeps
    }

    #[inline]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// リセット
    #[inline]
    pub fn reset(&mut self) {
        self.iteration = 0;
        self.spins = 0;
        self.sleeps = 0;
    }
}

impl Default for ResponseBackoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
