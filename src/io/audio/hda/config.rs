// ============================================================================
// src/io/audio/hda/config.rs - Bus Configuration
// ============================================================================
//!
//! バス生成時に一度だけ渡される設定値。

use core::time::Duration;

use super::regs::GET_RESPONSE_TIMEOUT_MS;
use super::types::DrainMode;
use crate::sync::BackoffPolicy;

/// HDA バス設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// 応答リングの駆動モード
    pub mode: DrainMode,
    /// `get_response` の待機上限
    pub timeout: Duration,
    /// 応答待ちバックオフ
    pub backoff: BackoffPolicy,
    /// CORBRP のリセットビットがハードウェアで自動クリアされる
    pub corbrp_self_clear: bool,
}

impl BusConfig {
    pub const fn new(mode: DrainMode) -> Self {
        Self {
            mode,
            timeout: Duration::from_millis(GET_RESPONSE_TIMEOUT_MS),
            backoff: BackoffPolicy::new(
                crate::sync::DEFAULT_SPIN_ITERATIONS,
                crate::sync::DEFAULT_SPIN_DELAY_US,
                crate::sync::DEFAULT_SLEEP_MS,
            ),
            corbrp_self_clear: false,
        }
    }

    /// ポーリングモードの設定
    pub const fn polling() -> Self {
        Self::new(DrainMode::Polling)
    }

    /// 割り込み駆動モードの設定
    pub const fn interrupt_driven() -> Self {
        Self::new(DrainMode::Interrupt)
    }

    pub const fn with_mode(mut self, mode: DrainMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub const fn with_corbrp_self_clear(mut self, self_clear: bool) -> Self {
        self.corbrp_self_clear = self_clear;
        self
    }

    #[inline]
    pub fn is_polling(&self) -> bool {
        self.mode == DrainMode::Polling
    }
}

/// 割り込み駆動がデフォルト
impl Default for BusConfig {
    fn default() -> Self {
        Self::interrupt_driven()
    }
}
