// ============================================================================
// src/io/audio/hda/response.rs - Response Retrieval
// ============================================================================
//!
//! 送出済みコマンドの応答を時間制限付きで待つ。
//!
//! 各反復でレジスタロックを取り、ポーリングモードなら RIRB を吸い上げ、
//! 対象アドレスの未完了数が 0 なら格納済みの応答を返す。
//! ロックを離してから期限を確認し、二段階バックオフで待つ。
//! 外部からの起床通知は使わず、共有状態を再訪するだけで進む。
//!
//! 期限切れでもスロットは未完了のまま残す。古いコマンドの取り消しは行わない。

use core::time::Duration;
#[cfg(feature = "verbose_logging")]
use log::trace;
use log::error;

use super::bus::HdaBus;
use super::regs::MAX_CODECS;
use super::types::{HdaError, HdaResult};
use crate::sync::ResponseBackoff;
use crate::time::Nanoseconds;

/// 応答待ち1回分の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitStats {
    /// ループの反復回数（最後の確認を除く）
    pub iterations: u64,
    /// ビジーウェイト回数
    pub spins: u64,
    /// スリープ回数
    pub sleeps: u64,
    /// 待機時間
    pub elapsed_ns: Nanoseconds,
}

impl WaitStats {
    fn from_backoff(backoff: &ResponseBackoff, elapsed_ns: Nanoseconds) -> Self {
        Self {
            iterations: backoff.iteration(),
            spins: backoff.spins(),
            sleeps: backoff.sleeps(),
            elapsed_ns,
        }
    }
}

impl HdaBus {
    /// 設定済みのタイムアウトで応答を待つ
    pub fn get_response(&self, addr: u8) -> HdaResult<u32> {
        self.await_response(addr, self.config.timeout)
    }

    /// `timeout` まで応答を待つ
    pub fn await_response(&self, addr: u8, timeout: Duration) -> HdaResult<u32> {
        self.await_response_stats(addr, timeout)
            .map(|(value, _)| value)
    }

    /// `await_response` と同じだが待機の統計も返す
    pub fn await_response_stats(
        &self,
        addr: u8,
        timeout: Duration,
    ) -> HdaResult<(u32, WaitStats)> {
        if addr as usize >= MAX_CODECS {
            return Err(HdaError::InvalidAddress(addr));
        }

        let clock = &*self.clock;
        let start = clock.now_ns();
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        let deadline = start.saturating_add(timeout_ns);
        let mut backoff = ResponseBackoff::new(self.config.backoff);

        loop {
            let (resolved, queued) = {
                let mut ring = self.reg.lock();
                let queued = self.is_polling() && self.update_rirb_locked(&mut ring);
                (ring.resolved(addr), queued)
            };
            if queued {
                self.schedule_unsol();
            }
            if let Some(value) = resolved {
                let stats = WaitStats::from_backoff(&backoff, clock.elapsed_ns(start));
                return Ok((value, stats));
            }

            let now = clock.now_ns();
            if now > deadline {
                let elapsed_ns = now - start;
                let last_cmd = self.reg.lock().last_cmd(addr);
                error!(
                    "[HDA] bus {}: no response from codec {} after {} us, last cmd={:#010x}",
                    self.index(),
                    addr,
                    elapsed_ns / 1_000,
                    last_cmd
                );
                return Err(HdaError::ResponseTimeout {
                    bus: self.index(),
                    addr,
                    elapsed_ns,
                    last_cmd,
                });
            }

            #[cfg(feature = "verbose_logging")]
            trace!(
                "[HDA] bus {}: codec {} wait #{} ({:?})",
                self.index(),
                addr,
                backoff.iteration(),
                backoff.phase()
            );
            backoff.wait(clock);
        }
    }
}
