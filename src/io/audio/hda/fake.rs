// ============================================================================
// src/io/audio/hda/fake.rs - Test Doubles
// ============================================================================
//!
//! テスト用のレジスタ/DMA アクセス層と仮想時計。
//!
//! `FakeIo` はメモリ上のレジスタファイルを持ち、全アクセスを記録する。
//! DMA 領域はヒープから恒等マッピングで確保するため、コントローラ役として
//! RIRB に応答を直接書き込める。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use spin::Mutex;

use super::bus::HdaBus;
use super::config::BusConfig;
use super::io_ops::HdaIoOps;
use super::regs::*;
use super::topology::CodecDriver;
use super::types::{command_addr, HdaError, HdaResult};
use crate::io::dma::{DmaBuffer, DmaKind, HeapDmaAllocator};
use crate::time::{Clock, NANOS_PER_MICRO, NANOS_PER_MILLI, Nanoseconds};

/// レジスタ空間の大きさ
const REG_SPACE: usize = 0x100;

/// 記録されたレジスタアクセス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read { width: u8, offset: u32 },
    Write { width: u8, offset: u32, value: u32 },
}

type Responder = Box<dyn Fn(u32) -> Option<u32> + Send + Sync>;

// ============================================================================
// Fake Register Backend
// ============================================================================

pub(crate) struct FakeIo {
    regs: Mutex<[u8; REG_SPACE]>,
    log: Mutex<Vec<Access>>,
    heap: HeapDmaAllocator,
    fail_alloc: AtomicBool,
    allocs: AtomicUsize,
    frees: AtomicUsize,
    /// CORBWP 書き込みごとに呼ばれ、応答値を返すとその応答を RIRB に載せる
    responder: Mutex<Option<Responder>>,
}

fn load(regs: &[u8; REG_SPACE], offset: u32, width: u8) -> u32 {
    let start = offset as usize;
    let bytes = &regs[start..start + width as usize / 8];
    bytes
        .iter()
        .rev()
        .fold(0, |value, &byte| (value << 8) | byte as u32)
}

fn store(regs: &mut [u8; REG_SPACE], offset: u32, width: u8, value: u32) {
    let start = offset as usize;
    for (i, byte) in regs[start..start + width as usize / 8].iter_mut().enumerate() {
        *byte = (value >> (i * 8)) as u8;
    }
}

impl FakeIo {
    pub(crate) fn new() -> Self {
        Self {
            regs: Mutex::new([0; REG_SPACE]),
            log: Mutex::new(Vec::new()),
            heap: HeapDmaAllocator,
            fail_alloc: AtomicBool::new(false),
            allocs: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            responder: Mutex::new(None),
        }
    }

    fn read(&self, width: u8, offset: u32) -> u32 {
        self.log.lock().push(Access::Read { width, offset });
        load(&self.regs.lock(), offset, width)
    }

    fn write(&self, width: u8, offset: u32, value: u32) {
        self.log.lock().push(Access::Write { width, offset, value });
        {
            let mut regs = self.regs.lock();
            match offset {
                REG_RIRBSTS | REG_INTSTS | REG_STATESTS => {
                    let old = load(&regs, offset, width);
                    store(&mut regs, offset, width, old & !value);
                }
                REG_RIRBWP if value & RIRBWP_RST as u32 != 0 => {
                    store(&mut regs, offset, width, 0);
                }
                _ => store(&mut regs, offset, width, value),
            }
        }
        if offset == REG_CORBWP {
            self.respond(value as usize);
        }
    }

    fn respond(&self, wp: usize) {
        let responder = self.responder.lock();
        if let Some(responder) = responder.as_ref() {
            let cmd = self.corb_entry(wp);
            if let Some(value) = responder(cmd) {
                self.post(value, command_addr(cmd) as u32);
            }
        }
    }

    fn base(&self, lo: u32, hi: u32) -> usize {
        let regs = self.regs.lock();
        (load(&regs, lo, 32) as u64 | (load(&regs, hi, 32) as u64) << 32) as usize
    }

    /// コントローラ役として RIRB に1エントリ載せる
    fn post(&self, res: u32, res_ex: u32) {
        let mut regs = self.regs.lock();
        let base = (load(&regs, REG_RIRBLBASE, 32) as u64
            | (load(&regs, REG_RIRBUBASE, 32) as u64) << 32) as usize;
        assert_ne!(base, 0, "RIRB not programmed");

        let wp = (load(&regs, REG_RIRBWP, 16) as usize + 1) % MAX_RIRB_ENTRIES;
        let entry = (base + wp * RIRB_ENTRY_SIZE) as *mut u32;
        // SAFETY: RIRB はバスが確保した恒等マッピングの DMA 領域内
        unsafe {
            entry.write_volatile(res.to_le());
            entry.add(1).write_volatile(res_ex.to_le());
        }
        store(&mut regs, REG_RIRBWP, 16, wp as u32);
        let sts = load(&regs, REG_RIRBSTS, 8);
        store(&mut regs, REG_RIRBSTS, 8, sts | RirbSts::RINTFL.bits() as u32);
    }

    pub(crate) fn post_response(&self, codec: u8, value: u32) {
        self.post(value, codec as u32);
    }

    pub(crate) fn post_unsolicited(&self, codec: u8, value: u32) {
        self.post(value, RIRB_EX_UNSOL | codec as u32);
    }

    pub(crate) fn set_responder(&self, responder: impl Fn(u32) -> Option<u32> + Send + Sync + 'static) {
        *self.responder.lock() = Some(Box::new(responder));
    }

    /// CORB の `index` 番目のエントリ
    pub(crate) fn corb_entry(&self, index: usize) -> u32 {
        let base = self.base(REG_CORBLBASE, REG_CORBUBASE);
        assert_ne!(base, 0, "CORB not programmed");
        // SAFETY: CORB はバスが確保した恒等マッピングの DMA 領域内
        u32::from_le(unsafe { ((base + index * CORB_ENTRY_SIZE) as *const u32).read_volatile() })
    }

    // ========================================================================
    // Inspection (not logged)
    // ========================================================================

    pub(crate) fn peek8(&self, offset: u32) -> u8 {
        load(&self.regs.lock(), offset, 8) as u8
    }

    pub(crate) fn peek16(&self, offset: u32) -> u16 {
        load(&self.regs.lock(), offset, 16) as u16
    }

    pub(crate) fn peek32(&self, offset: u32) -> u32 {
        load(&self.regs.lock(), offset, 32)
    }

    pub(crate) fn poke16(&self, offset: u32, value: u16) {
        store(&mut self.regs.lock(), offset, 16, value as u32);
    }

    pub(crate) fn accesses(&self) -> Vec<Access> {
        self.log.lock().clone()
    }

    pub(crate) fn clear_log(&self) {
        self.log.lock().clear();
    }

    pub(crate) fn set_fail_alloc(&self, fail: bool) {
        self.fail_alloc.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    pub(crate) fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
}

impl HdaIoOps for FakeIo {
    fn read8(&self, offset: u32) -> u8 {
        self.read(8, offset) as u8
    }

    fn write8(&self, offset: u32, value: u8) {
        self.write(8, offset, value as u32)
    }

    fn read16(&self, offset: u32) -> u16 {
        self.read(16, offset) as u16
    }

    fn write16(&self, offset: u32, value: u16) {
        self.write(16, offset, value as u32)
    }

    fn read32(&self, offset: u32) -> u32 {
        self.read(32, offset)
    }

    fn write32(&self, offset: u32, value: u32) {
        self.write(32, offset, value)
    }

    fn dma_alloc(&self, kind: DmaKind, size: usize) -> HdaResult<DmaBuffer> {
        if self.fail_alloc.load(Ordering::SeqCst) {
            return Err(HdaError::AllocationFailure { kind, size });
        }
        let buf = self.heap.alloc(kind, size)?;
        self.allocs.fetch_add(1, Ordering::SeqCst);
        Ok(buf)
    }

    fn dma_free(&self, buf: DmaBuffer) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        self.heap.free(buf);
    }
}

// ============================================================================
// Virtual Clock
// ============================================================================

/// 待機で進む仮想時計
pub(crate) struct FakeClock {
    now: AtomicU64,
    delays: AtomicU64,
    yields: AtomicU64,
    sleeps: AtomicU64,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
            delays: AtomicU64::new(0),
            yields: AtomicU64::new(0),
            sleeps: AtomicU64::new(0),
        }
    }

    pub(crate) fn delay_calls(&self) -> u64 {
        self.delays.load(Ordering::SeqCst)
    }

    pub(crate) fn yields(&self) -> u64 {
        self.yields.load(Ordering::SeqCst)
    }

    pub(crate) fn sleep_calls(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for FakeClock {
    fn now_ns(&self) -> Nanoseconds {
        self.now.load(Ordering::SeqCst)
    }

    fn delay_us(&self, us: u64) {
        self.delays.fetch_add(1, Ordering::SeqCst);
        self.now.fetch_add(us * NANOS_PER_MICRO, Ordering::SeqCst);
    }

    fn yield_now(&self) {
        self.yields.fetch_add(1, Ordering::SeqCst);
    }

    fn sleep_ms(&self, ms: u64) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.now.fetch_add(ms * NANOS_PER_MILLI, Ordering::SeqCst);
    }
}

// ============================================================================
// Fake Codec
// ============================================================================

/// 受け取った非請求イベントを記録するだけのコーデック
pub(crate) struct FakeCodec {
    addr: u8,
    events: Mutex<Vec<u32>>,
}

impl FakeCodec {
    pub(crate) fn new(addr: u8) -> Self {
        Self {
            addr,
            events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn events(&self) -> Vec<u32> {
        self.events.lock().clone()
    }
}

impl CodecDriver for FakeCodec {
    fn address(&self) -> u8 {
        self.addr
    }

    fn unsol_event(&self, res: u32) {
        self.events.lock().push(res);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// フェイク上にバスを作り CORB/RIRB を起動する
pub(crate) fn test_bus(config: BusConfig) -> (HdaBus, Arc<FakeIo>, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock::new());
    let (bus, io) = test_bus_with_clock(config, clock.clone());
    (bus, io, clock)
}

pub(crate) fn test_bus_with_clock(
    config: BusConfig,
    clock: Arc<dyn Clock>,
) -> (HdaBus, Arc<FakeIo>) {
    let io = Arc::new(FakeIo::new());
    let bus = HdaBus::new("hda-test", io.clone(), clock, config, None).unwrap();
    bus.init_cmd_io();
    (bus, io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w1c_status_registers() {
        let io = FakeIo::new();
        store(&mut io.regs.lock(), REG_RIRBSTS, 8, 0x05);
        io.write8(REG_RIRBSTS, 0x01);
        assert_eq!(io.peek8(REG_RIRBSTS), 0x04);
    }

    #[test]
    fn test_access_log() {
        let io = FakeIo::new();
        io.write16(REG_CORBRP, CORBRP_RST);
        assert_eq!(io.read16(REG_CORBRP), CORBRP_RST);
        assert_eq!(
            io.accesses(),
            vec![
                Access::Write {
                    width: 16,
                    offset: REG_CORBRP,
                    value: CORBRP_RST as u32
                },
                Access::Read {
                    width: 16,
                    offset: REG_CORBRP
                },
            ]
        );
    }
}
