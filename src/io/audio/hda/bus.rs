// ============================================================================
// src/io/audio/hda/bus.rs - HDA Command Bus
// ============================================================================
//!
//! HD Audio コマンドバス本体。
//!
//! - バスの生成と破棄（コマンドリングページの確保/返却、バス番号の払い出し）
//! - CORB/RIRB の起動・停止
//! - コマンド送出 (CORB 書き込み)
//! - 応答の吸い上げ (RIRB 読み取り、ポーリング/割り込みの両経路)
//! - 非請求イベントの配送
//!
//! ## ロック
//! - `reg`: 応答リングとリングレジスタを保護するスピンロック。
//!   ポーリング時の吸い上げ、割り込み経路の吸い上げ、コマンド送出は全てこの下で行う。
//! - `cmd_lock`: コマンドの送出〜応答受信の直列化と、コーデック/リンク/
//!   ストリームの登録表を保護する粗粒度ロック。
//!
//! ロック順序は `cmd_lock` → `reg`。逆順で取得してはならない。
//!
//! `cmd_lock` もスピンロックで、`exec_verb` は応答待ちの間（最長でタイムアウト
//! まで）これを保持し続ける。その間 `attach_*`/`detach_*`/`codec()`/
//! `process_unsol_events` はスピンして待つ。割り込みハンドラや応答待ちの
//! 最中に呼ばれる経路からこれらを使ってはならない。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::boxed::Box;
use core::mem::ManuallyDrop;
use core::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use log::{debug, error, info, trace, warn};
use spin::Mutex;

use super::config::BusConfig;
use super::global::bus_registry;
use super::io_ops::HdaIoOps;
use super::regs::*;
use super::rirb::ResponseRing;
use super::topology::Topology;
use super::types::{command_addr, DrainMode, HdaError, HdaResult, RirbEntry};
use crate::io::dma::{lfence, sfence, DmaBuffer, DmaKind};
use crate::time::Clock;

/// 非請求イベントの処理を後回しで予約するフック
///
/// 吸い上げ処理が新しいイベントを積んだとき、レジスタロックの外で呼ばれる。
/// 呼ばれた側は別のコンテキストで `HdaBus::process_unsol_events` を実行する。
/// `exec_verb` が `cmd_lock` を保持したまま呼ぶことがあるため、
/// フックの中で直接 `process_unsol_events` を呼んではならない。
pub type UnsolScheduler = Box<dyn Fn() + Send + Sync>;

/// irq 未設定
const IRQ_NONE: i64 = -1;

// ============================================================================
// HDA Bus
// ============================================================================

/// HD Audio コマンドバス
pub struct HdaBus {
    /// バス番号（プロセス内で一意）
    idx: u32,
    /// 所有デバイス名
    dev_name: String,
    /// レジスタ/DMA アクセス層
    pub(crate) io: Arc<dyn HdaIoOps>,
    /// 時計とスケジューラ
    pub(crate) clock: Arc<dyn Clock>,
    /// 設定
    pub(crate) config: BusConfig,
    /// 割り込み番号
    irq: AtomicI64,
    /// コマンドDMAが有効
    cmd_dma_state: AtomicBool,
    /// 応答リング（レジスタロック）
    pub(crate) reg: Mutex<ResponseRing>,
    /// コマンド送出と登録表の粗粒度ロック
    pub(crate) cmd_lock: Mutex<Topology>,
    /// 非請求イベントの予約フック
    unsol_sched: Option<UnsolScheduler>,
    /// コマンドリングページ (CORB: 0, RIRB: 2048)
    rb: ManuallyDrop<DmaBuffer>,
}

impl HdaBus {
    /// バスを生成
    ///
    /// コマンドリングページを確保できなければ生成自体が失敗する。
    /// CORB/RIRB はまだ動いておらず、コマンドを送る前に `init_cmd_io` が必要。
    pub fn new(
        dev_name: &str,
        io: Arc<dyn HdaIoOps>,
        clock: Arc<dyn Clock>,
        config: BusConfig,
        unsol_sched: Option<UnsolScheduler>,
    ) -> HdaResult<Self> {
        let rb = io.dma_alloc(DmaKind::Device, CMD_RING_BYTES)?;
        let idx = bus_registry().register();

        info!(
            "[HDA] bus {} ({}): {:?} mode, ring page at {:#x}",
            idx,
            dev_name,
            config.mode,
            rb.phys_addr().as_u64()
        );

        Ok(Self {
            idx,
            dev_name: String::from(dev_name),
            io,
            clock,
            config,
            irq: AtomicI64::new(IRQ_NONE),
            cmd_dma_state: AtomicBool::new(true),
            reg: Mutex::new(ResponseRing::new()),
            cmd_lock: Mutex::new(Topology::new()),
            unsol_sched,
            rb: ManuallyDrop::new(rb),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn index(&self) -> u32 {
        self.idx
    }

    pub fn dev_name(&self) -> &str {
        &self.dev_name
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    #[inline]
    pub fn mode(&self) -> DrainMode {
        self.config.mode
    }

    #[inline]
    pub fn is_polling(&self) -> bool {
        self.config.is_polling()
    }

    /// 割り込み番号（未設定なら None）
    pub fn irq(&self) -> Option<u32> {
        u32::try_from(self.irq.load(Ordering::Acquire)).ok()
    }

    pub fn set_irq(&self, irq: Option<u32>) {
        let raw = irq.map_or(IRQ_NONE, i64::from);
        self.irq.store(raw, Ordering::Release);
    }

    pub fn cmd_dma_state(&self) -> bool {
        self.cmd_dma_state.load(Ordering::Acquire)
    }

    pub fn set_cmd_dma_state(&self, enabled: bool) {
        self.cmd_dma_state.store(enabled, Ordering::Release);
    }

    /// レジスタ/DMA アクセス層
    pub fn io(&self) -> &Arc<dyn HdaIoOps> {
        &self.io
    }

    /// CORB/RIRB が起動済みか
    pub fn is_cmd_io_ready(&self) -> bool {
        self.reg.lock().cmd_io_ready
    }

    /// 応答リングをレジスタロック下で操作
    ///
    /// 外部の割り込みハンドラが独自に応答を格納する場合はこれを使う。
    pub fn with_response_ring<R>(&self, f: impl FnOnce(&mut ResponseRing) -> R) -> R {
        f(&mut self.reg.lock())
    }

    // ========================================================================
    // Command I/O Setup
    // ========================================================================

    /// CORB/RIRB を設定して DMA を開始
    pub fn init_cmd_io(&self) {
        let mut ring = self.reg.lock();

        // CORB
        let corb_addr = self.rb.phys_addr().as_u64();
        self.io.write32(REG_CORBLBASE, corb_addr as u32);
        self.io.write32(REG_CORBUBASE, (corb_addr >> 32) as u32);
        self.io.write8(REG_CORBSIZE, CORBSIZE_256);
        self.io.write16(REG_CORBWP, 0);
        self.io.write16(REG_CORBRP, CORBRP_RST);
        if !self.config.corbrp_self_clear {
            self.clear_corbrp();
        }
        self.io.write8(REG_CORBCTL, CorbCtl::RUN.bits());

        // RIRB
        ring.reset_pointers();
        let rirb_addr = self.rb.window(RIRB_OFFSET).phys_addr().as_u64();
        self.io.write32(REG_RIRBLBASE, rirb_addr as u32);
        self.io.write32(REG_RIRBUBASE, (rirb_addr >> 32) as u32);
        self.io.write8(REG_RIRBSIZE, RIRBSIZE_256);
        self.io.write16(REG_RIRBWP, RIRBWP_RST);
        self.io.write16(REG_RINTCNT, 1);
        let mut rirbctl = RirbCtl::DMA_EN;
        if !self.is_polling() {
            rirbctl |= RirbCtl::IRQ_EN;
        }
        self.io.write8(REG_RIRBCTL, rirbctl.bits());

        self.io.update32(REG_GCTL, GCTL_UNSOL, GCTL_UNSOL);
        ring.cmd_io_ready = true;
        drop(ring);

        info!(
            "[HDA] bus {}: CORB at {:#x}, RIRB at {:#x}",
            self.idx, corb_addr, rirb_addr
        );
    }

    /// CORBRP リセットのハンドシェイク
    ///
    /// RST ビットが読めるのを待ってから 0 を書き、クリアされるのを待つ。
    fn clear_corbrp(&self) {
        if !self.poll_corbrp(|rp| rp & CORBRP_RST != 0) {
            error!(
                "[HDA] bus {}: CORB reset timeout#1, CORBRP = {:#x}",
                self.idx,
                self.io.read16(REG_CORBRP)
            );
        }

        self.io.write16(REG_CORBRP, 0);
        if !self.poll_corbrp(|rp| rp == 0) {
            error!(
                "[HDA] bus {}: CORB reset timeout#2, CORBRP = {:#x}",
                self.idx,
                self.io.read16(REG_CORBRP)
            );
        }
    }

    fn poll_corbrp(&self, done: impl Fn(u16) -> bool) -> bool {
        for _ in 0..CORBRP_RESET_POLLS {
            if done(self.io.read16(REG_CORBRP)) {
                return true;
            }
            self.clock.delay_us(1);
        }
        false
    }

    /// CORB/RIRB の DMA を停止
    pub fn stop_cmd_io(&self) {
        {
            let mut ring = self.reg.lock();
            self.io.write8(REG_RIRBCTL, 0);
            self.io.write8(REG_CORBCTL, 0);
            ring.cmd_io_ready = false;
        }

        let rirb_stopped = self.wait_dma_stop(REG_RIRBCTL, RirbCtl::DMA_EN.bits());
        let corb_stopped = self.wait_dma_stop(REG_CORBCTL, CorbCtl::RUN.bits());
        if !(rirb_stopped && corb_stopped) {
            warn!(
                "[HDA] bus {}: command DMA did not stop (rirb={}, corb={})",
                self.idx, rirb_stopped, corb_stopped
            );
        }

        self.io.update32(REG_GCTL, GCTL_UNSOL, 0);
        info!("[HDA] bus {}: command I/O stopped", self.idx);
    }

    fn wait_dma_stop(&self, offset: u32, run_bit: u8) -> bool {
        for _ in 0..CMD_DMA_STOP_POLLS {
            if self.io.read8(offset) & run_bit == 0 {
                return true;
            }
            self.clock.delay_us(10);
        }
        false
    }

    // ========================================================================
    // Command Issue
    // ========================================================================

    /// コマンドを CORB に書き込む
    ///
    /// 応答は待たない。対応するアドレスの未完了数が1つ増える。
    pub fn send_command(&self, cmd: u32) -> HdaResult<()> {
        let addr = command_addr(cmd);
        if addr as usize >= MAX_CODECS {
            return Err(HdaError::InvalidAddress(addr));
        }

        let mut ring = self.reg.lock();
        if !ring.cmd_io_ready {
            return Err(HdaError::NotReady);
        }
        ring.record_cmd(addr, cmd);

        let wp = self.io.read16(REG_CORBWP);
        if wp == REG_GONE_16 {
            warn!("[HDA] bus {}: CORBWP reads {:#x}, device gone", self.idx, wp);
            return Err(HdaError::DeviceGone);
        }
        let wp = (wp as usize + 1) % MAX_CORB_ENTRIES;

        let rp = self.io.read16(REG_CORBRP);
        if wp == rp as usize {
            warn!("[HDA] bus {}: CORB full (rp={})", self.idx, rp);
            return Err(HdaError::CorbFull);
        }

        ring.mark_issued(addr);
        self.rb.write_u32(wp, cmd);
        sfence();
        self.io.write16(REG_CORBWP, wp as u16);
        Ok(())
    }

    /// コマンドを送り応答を待つ
    ///
    /// 送出から応答受信までを `cmd_lock` で直列化する。
    /// 応答が来なければタイムアウトまで `cmd_lock` を保持する。
    pub fn exec_verb(&self, cmd: u32) -> HdaResult<u32> {
        let _guard = self.cmd_lock.lock();
        self.send_command(cmd)?;
        self.get_response(command_addr(cmd))
    }

    // ========================================================================
    // Response Drain
    // ========================================================================

    /// RIRB を吸い上げる（レジスタロック保持中に呼ぶ）
    ///
    /// 非請求イベントを積んだら `true`。
    pub(crate) fn update_rirb_locked(&self, ring: &mut ResponseRing) -> bool {
        let wp = self.io.read16(REG_RIRBWP);
        if wp == REG_GONE_16 {
            warn!("[HDA] bus {}: RIRBWP reads {:#x}, device gone", self.idx, wp);
            return false;
        }
        let wp = wp & (MAX_RIRB_ENTRIES as u16 - 1);
        if wp == ring.wp {
            return false;
        }
        ring.wp = wp;
        lfence();

        let rirb = self.rb.window(RIRB_OFFSET);
        let mut queued = false;
        while ring.rp != wp {
            let rp = ring.advance_rp();
            let entry = RirbEntry::new(rirb.read_u32(rp * 2), rirb.read_u32(rp * 2 + 1));
            trace!(
                "[HDA] bus {}: rirb[{}] = {:#010x}:{:#x}",
                self.idx, rp, entry.response, entry.response_ex
            );
            queued |= ring.dispatch(entry);
        }
        queued
    }

    /// RIRB を吸い上げる
    pub fn update_rirb(&self) {
        let queued = self.update_rirb_locked(&mut self.reg.lock());
        if queued {
            self.schedule_unsol();
        }
    }

    /// 応答割り込みの処理
    ///
    /// RIRBSTS を確認・クリアし、応答があれば吸い上げる。
    /// この割り込みが RIRB 由来だった場合に `true`。
    pub fn handle_rirb_interrupt(&self) -> bool {
        let queued = {
            let mut ring = self.reg.lock();
            let status = RirbSts::from_bits_truncate(self.io.read8(REG_RIRBSTS));
            let mask = RirbSts::RINTFL | RirbSts::OIS;
            if !status.intersects(mask) {
                return false;
            }
            self.io.write8(REG_RIRBSTS, mask.bits());
            if status.contains(RirbSts::OIS) {
                warn!("[HDA] bus {}: RIRB overrun", self.idx);
            }
            status.contains(RirbSts::RINTFL) && self.update_rirb_locked(&mut ring)
        };
        if queued {
            self.schedule_unsol();
        }
        true
    }

    // ========================================================================
    // Unsolicited Events
    // ========================================================================

    pub(crate) fn schedule_unsol(&self) {
        if let Some(schedule) = &self.unsol_sched {
            schedule();
        }
    }

    /// 積まれた非請求イベントを接続中のコーデックへ配送
    ///
    /// コーデックのコールバックはレジスタロックを解放した状態で呼ぶ。
    /// 未接続アドレス宛てのイベントは捨てる。配送した数を返す。
    pub fn process_unsol_events(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(event) = self.reg.lock().unsol.pop() else {
                break;
            };
            let addr = event.codec_addr();
            match self.codec(addr) {
                Some(codec) => {
                    codec.unsol_event(event.response);
                    delivered += 1;
                }
                None => debug!(
                    "[HDA] bus {}: unsolicited event {:#x} for absent codec {}",
                    self.idx, event.response, addr
                ),
            }
        }
        delivered
    }

    /// 非請求キューに溜まっているイベント数
    pub fn pending_unsol_events(&self) -> usize {
        self.reg.lock().unsol.len()
    }
}

impl Drop for HdaBus {
    fn drop(&mut self) {
        // the controller must stop writing into the page before it is returned
        if self.reg.lock().cmd_io_ready {
            self.stop_cmd_io();
        }
        // SAFETY: rb はここ以降参照されない
        let rb = unsafe { ManuallyDrop::take(&mut self.rb) };
        self.io.dma_free(rb);
        bus_registry().unregister(self.idx);
        debug!("[HDA] bus {} ({}) released", self.idx, self.dev_name);
    }
}
