// ============================================================================
// src/io/audio/hda/rirb.rs - Response Ring State
// ============================================================================
//!
//! RIRB のソフトウェア側状態。
//!
//! コーデックアドレスごとに「未完了コマンド数」と「最後の応答値」を保持する。
//! 未完了数を減らすのは吸い上げ処理（ポーリング or 割り込み）だけで、
//! 応答待ち側は読むだけ。全てのアクセスはバスのレジスタロック下で行う。

use log::{error, warn};

use super::regs::{MAX_CODECS, MAX_RIRB_ENTRIES, UNSOL_QUEUE_SIZE};
use super::types::{RirbEntry, UnsolEvent};

// ============================================================================
// Response Ring
// ============================================================================

/// 応答リング
#[derive(Debug)]
pub struct ResponseRing {
    /// 未完了コマンド数（アドレス別）
    cmds: [u32; MAX_CODECS],
    /// 最後の応答値（アドレス別）
    res: [u32; MAX_CODECS],
    /// 最後に送ったコマンド（アドレス別、診断用）
    last_cmd: [u32; MAX_CODECS],
    /// RIRB 読み取りポインタ（ソフトウェア側）
    pub(crate) rp: u16,
    /// 最後に観測した RIRB 書き込みポインタ
    pub(crate) wp: u16,
    /// CORB/RIRB が起動済み
    pub(crate) cmd_io_ready: bool,
    /// 非請求イベントキュー
    pub(crate) unsol: UnsolQueue,
}

impl ResponseRing {
    pub const fn new() -> Self {
        Self {
            cmds: [0; MAX_CODECS],
            res: [0; MAX_CODECS],
            last_cmd: [0; MAX_CODECS],
            rp: 0,
            wp: 0,
            cmd_io_ready: false,
            unsol: UnsolQueue::new(),
        }
    }

    /// 未完了コマンド数（範囲外のアドレスは 0）
    #[inline]
    pub fn pending(&self, addr: u8) -> u32 {
        self.cmds.get(addr as usize).copied().unwrap_or(0)
    }

    /// 最後の応答値（未完了中は古い値、範囲外のアドレスは 0）
    #[inline]
    pub fn response(&self, addr: u8) -> u32 {
        self.res.get(addr as usize).copied().unwrap_or(0)
    }

    /// 最後に送ったコマンド
    #[inline]
    pub fn last_cmd(&self, addr: u8) -> u32 {
        self.last_cmd.get(addr as usize).copied().unwrap_or(0)
    }

    /// 応答が揃っていれば値を返す（範囲外のアドレスは `None`）
    #[inline]
    pub fn resolved(&self, addr: u8) -> Option<u32> {
        let slot = addr as usize;
        match self.cmds.get(slot) {
            Some(0) => Some(self.res[slot]),
            _ => None,
        }
    }

    /// コマンド送出を記録（CORB 書き込み側から呼ぶ）
    pub(crate) fn mark_issued(&mut self, addr: u8) {
        self.cmds[addr as usize] += 1;
    }

    pub(crate) fn record_cmd(&mut self, addr: u8, cmd: u32) {
        self.last_cmd[addr as usize] = cmd;
    }

    /// 応答を格納し未完了数を1つ減らす
    ///
    /// 未完了コマンドのないアドレスへの応答は破棄して `false` を返す。
    /// 割り込み経路など外部の吸い上げ処理もこれを使う。
    pub fn complete(&mut self, addr: u8, value: u32) -> bool {
        let slot = addr as usize;
        if slot >= MAX_CODECS {
            error!("[HDA] response for invalid codec address {}", addr);
            return false;
        }
        if self.cmds[slot] == 0 {
            error!(
                "[HDA] spurious response {:#x} from codec {}, last cmd={:#010x}",
                value, addr, self.last_cmd[slot]
            );
            return false;
        }
        self.res[slot] = value;
        self.cmds[slot] -= 1;
        true
    }

    /// RIRB エントリを1つ振り分ける
    ///
    /// 非請求イベントはキューに積み `true` を返す。
    pub(crate) fn dispatch(&mut self, entry: RirbEntry) -> bool {
        let addr = entry.codec_addr();
        if addr as usize >= MAX_CODECS {
            error!(
                "[HDA] invalid RIRB codec address {} ({:#x}:{:#x})",
                addr, entry.response, entry.response_ex
            );
            false
        } else if entry.is_unsolicited() {
            self.unsol.push(entry);
            true
        } else {
            self.complete(addr, entry.response);
            false
        }
    }

    /// 読み取りポインタを1つ進めて返す
    #[inline]
    pub(crate) fn advance_rp(&mut self) -> usize {
        self.rp = ((self.rp as usize + 1) % MAX_RIRB_ENTRIES) as u16;
        self.rp as usize
    }

    /// CORB/RIRB 再初期化時のリセット（最後の応答値と非請求キューは保持）
    pub(crate) fn reset_pointers(&mut self) {
        self.rp = 0;
        self.wp = 0;
        self.cmds = [0; MAX_CODECS];
    }
}

impl Default for ResponseRing {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unsolicited Event Queue
// ============================================================================

/// 非請求イベントのリングキュー
#[derive(Debug)]
pub struct UnsolQueue {
    events: [UnsolEvent; UNSOL_QUEUE_SIZE],
    rp: usize,
    wp: usize,
    dropped: u64,
}

impl UnsolQueue {
    pub const fn new() -> Self {
        Self {
            events: [RirbEntry::new(0, 0); UNSOL_QUEUE_SIZE],
            rp: 0,
            wp: 0,
            dropped: 0,
        }
    }

    /// イベントを積む（満杯なら最古を捨てる）
    pub fn push(&mut self, event: UnsolEvent) {
        let wp = (self.wp + 1) % UNSOL_QUEUE_SIZE;
        if wp == self.rp {
            self.rp = (self.rp + 1) % UNSOL_QUEUE_SIZE;
            self.dropped += 1;
            warn!("[HDA] unsolicited queue overflow, dropped {}", self.dropped);
        }
        self.wp = wp;
        self.events[wp] = event;
    }

    /// 最古のイベントを取り出す
    pub fn pop(&mut self) -> Option<UnsolEvent> {
        if self.rp == self.wp {
            return None;
        }
        self.rp = (self.rp + 1) % UNSOL_QUEUE_SIZE;
        Some(self.events[self.rp])
    }

    pub fn is_empty(&self) -> bool {
        self.rp == self.wp
    }

    pub fn len(&self) -> usize {
        (self.wp + UNSOL_QUEUE_SIZE - self.rp) % UNSOL_QUEUE_SIZE
    }

    /// 溢れて捨てたイベント数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for UnsolQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::regs::RIRB_EX_UNSOL;

    #[test]
    fn test_complete_decrements_once() {
        let mut ring = ResponseRing::new();
        ring.mark_issued(3);
        ring.mark_issued(3);
        assert_eq!(ring.pending(3), 2);
        assert_eq!(ring.resolved(3), None);

        assert!(ring.complete(3, 0x1111));
        assert_eq!(ring.resolved(3), None);
        assert!(ring.complete(3, 0x2222));
        assert_eq!(ring.resolved(3), Some(0x2222));
    }

    #[test]
    fn test_spurious_response_ignored() {
        let mut ring = ResponseRing::new();
        assert!(!ring.complete(2, 0xdead));
        assert_eq!(ring.response(2), 0);
        assert_eq!(ring.pending(2), 0);
    }

    #[test]
    fn test_out_of_range_address_reads_empty() {
        let ring = ResponseRing::new();
        for addr in [MAX_CODECS as u8, 15, u8::MAX] {
            assert_eq!(ring.pending(addr), 0);
            assert_eq!(ring.response(addr), 0);
            assert_eq!(ring.last_cmd(addr), 0);
            assert_eq!(ring.resolved(addr), None);
        }
    }

    #[test]
    fn test_dispatch_routes_unsolicited() {
        let mut ring = ResponseRing::new();
        ring.mark_issued(1);

        assert!(ring.dispatch(RirbEntry::new(0x42, RIRB_EX_UNSOL | 1)));
        assert_eq!(ring.pending(1), 1);
        assert_eq!(ring.unsol.len(), 1);

        assert!(!ring.dispatch(RirbEntry::new(0x77, 1)));
        assert_eq!(ring.resolved(1), Some(0x77));

        // address 9 is outside the ring
        assert!(!ring.dispatch(RirbEntry::new(0x1, 9)));
    }

    #[test]
    fn test_advance_rp_wraps() {
        let mut ring = ResponseRing::new();
        ring.rp = (MAX_RIRB_ENTRIES - 1) as u16;
        assert_eq!(ring.advance_rp(), 0);
    }

    #[test]
    fn test_unsol_queue_fifo_and_overflow() {
        let mut queue = UnsolQueue::new();
        assert!(queue.pop().is_none());

        for i in 0..UNSOL_QUEUE_SIZE as u32 {
            queue.push(RirbEntry::new(i, RIRB_EX_UNSOL));
        }
        assert_eq!(queue.len(), UNSOL_QUEUE_SIZE - 1);
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.pop().map(|e| e.response), Some(1));
    }
}
