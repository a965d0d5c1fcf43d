// ============================================================================
// src/io/audio/hda/io_ops.rs - Register / DMA Access Trait
// ============================================================================
//!
//! HDA レジスタ・DMAアクセストレイト
//!
//! バス本体と応答待ちプロトコルは、ハードウェアに触れる全ての操作を
//! このトレイト経由で行う。これによりレジスタ幅やバス形態、
//! DMAバッファの確保方式を差し替えられる（テストではメモリ上の
//! レジスタファイルを持つフェイクを使う）。

use core::ptr::{read_volatile, write_volatile};

use super::types::HdaResult;
use crate::io::dma::{DmaBuffer, DmaKind, HeapDmaAllocator};

// ============================================================================
// Register Accessor Trait
// ============================================================================

/// HDA レジスタ/DMA アクセサトレイト
///
/// `offset` はコントローラのレジスタ窓の先頭からのバイトオフセット。
/// 各呼び出しは1回のハードウェアアクセスに対応し、まとめたり
/// キャッシュしたりしてはならない。
pub trait HdaIoOps: Send + Sync {
    /// 8ビット読み取り
    fn read8(&self, offset: u32) -> u8;

    /// 8ビット書き込み
    fn write8(&self, offset: u32, value: u8);

    /// 16ビット読み取り
    fn read16(&self, offset: u32) -> u16;

    /// 16ビット書き込み
    fn write16(&self, offset: u32, value: u16);

    /// 32ビット読み取り
    fn read32(&self, offset: u32) -> u32;

    /// 32ビット書き込み
    fn write32(&self, offset: u32, value: u32);

    /// DMA可能なバッファを `size` バイト以上確保
    fn dma_alloc(&self, kind: DmaKind, size: usize) -> HdaResult<DmaBuffer>;

    /// `dma_alloc` で得たバッファを返却
    fn dma_free(&self, buf: DmaBuffer);

    // ========================================================================
    // Convenience methods with default implementations
    // ========================================================================

    /// 8ビットレジスタの `mask` 部分を `set` で置き換え
    fn update8(&self, offset: u32, mask: u8, set: u8) {
        let value = self.read8(offset);
        self.write8(offset, (value & !mask) | (set & mask));
    }

    /// 32ビットレジスタの `mask` 部分を `set` で置き換え
    fn update32(&self, offset: u32, mask: u32, set: u32) {
        let value = self.read32(offset);
        self.write32(offset, (value & !mask) | (set & mask));
    }
}

// ============================================================================
// MMIO Implementation
// ============================================================================

/// メモリマップドレジスタ窓に対する実装
///
/// DMAバッファはカーネルヒープから恒等マッピング前提で確保する。
pub struct MmioOps {
    /// Memory-mapped register base address
    base: usize,
    /// DMA allocation strategy
    dma: HeapDmaAllocator,
}

impl MmioOps {
    /// Create an accessor for a mapped register window
    ///
    /// # Safety
    /// `base` はコントローラのレジスタ空間全体をカバーする、
    /// この値の生存期間中有効なマッピングの先頭であること。
    pub unsafe fn new(base: usize) -> Self {
        Self {
            base,
            dma: HeapDmaAllocator,
        }
    }

    /// Register window base address
    pub fn base(&self) -> usize {
        self.base
    }
}

impl HdaIoOps for MmioOps {
    #[inline]
    fn read8(&self, offset: u32) -> u8 {
        // SAFETY: base は new() の契約で有効なレジスタ窓。
        // read_volatile により読み取りが省略・併合されない。
        unsafe { read_volatile((self.base + offset as usize) as *const u8) }
    }

    #[inline]
    fn write8(&self, offset: u32, value: u8) {
        // SAFETY: base は new() の契約で有効なレジスタ窓。
        unsafe { write_volatile((self.base + offset as usize) as *mut u8, value) }
    }

    #[inline]
    fn read16(&self, offset: u32) -> u16 {
        // SAFETY: HDA の16ビットレジスタは2バイト境界に配置される。
        unsafe { read_volatile((self.base + offset as usize) as *const u16) }
    }

    #[inline]
    fn write16(&self, offset: u32, value: u16) {
        // SAFETY: HDA の16ビットレジスタは2バイト境界に配置される。
        unsafe { write_volatile((self.base + offset as usize) as *mut u16, value) }
    }

    #[inline]
    fn read32(&self, offset: u32) -> u32 {
        // SAFETY: HDA の32ビットレジスタは4バイト境界に配置される。
        unsafe { read_volatile((self.base + offset as usize) as *const u32) }
    }

    #[inline]
    fn write32(&self, offset: u32, value: u32) {
        // SAFETY: HDA の32ビットレジスタは4バイト境界に配置される。
        unsafe { write_volatile((self.base + offset as usize) as *mut u32, value) }
    }

    fn dma_alloc(&self, kind: DmaKind, size: usize) -> HdaResult<DmaBuffer> {
        self.dma.alloc(kind, size)
    }

    fn dma_free(&self, buf: DmaBuffer) {
        self.dma.free(buf)
    }
}
