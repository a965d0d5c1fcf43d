// ============================================================================
// src/io/dma.rs - DMA Buffer Management
// ============================================================================
//!
//! # DMAバッファ
//!
//! レジスタアクセス層 (`HdaIoOps::dma_alloc`) が返す所有ハンドル。
//! 解放は `HdaIoOps::dma_free` がハンドルを消費して行うため、
//! 同じバッファの二重解放は型レベルで表現できない。
//!
//! ハンドル自体は `Drop` でメモリを解放しない。確保した側のバックエンドへ
//! 返却するのが所有者（通常は `HdaBus`）の責務。

use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use core::fmt;
use core::ptr::NonNull;
use x86_64::PhysAddr;

use crate::io::audio::hda::{HdaError, HdaResult};

/// DMAバッファの最小アライメント
///
/// HDA 仕様は CORB/RIRB/BDL を128バイト境界に置くことを要求する。
pub const DMA_ALIGNMENT: usize = 128;

/// DMAバッファの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaKind {
    /// 連続したコヒーレントメモリ
    Device,
    /// スキャッタギャザー
    DeviceSg,
}

/// DMAバッファハンドル
pub struct DmaBuffer {
    /// 種類
    kind: DmaKind,
    /// CPUから見た領域
    area: NonNull<u8>,
    /// デバイスから見たバスアドレス
    addr: PhysAddr,
    /// レイアウト（解放時に使用）
    layout: Layout,
}

// SAFETY: DmaBuffer は確保したバックエンドが解放するまで有効な領域を指す。
// 領域へのアクセスは volatile な読み書きのみで、呼び出し側のロック
// (HdaBus のレジスタロック) で直列化される。
unsafe impl Send for DmaBuffer {}
unsafe impl Sync for DmaBuffer {}

impl DmaBuffer {
    /// 既存の領域からハンドルを組み立てる
    ///
    /// # Safety
    /// `area` は `layout` で確保され、ハンドルが返却されるまで有効であること。
    /// `addr` はデバイスから同じ領域を指すバスアドレスであること。
    pub unsafe fn from_raw_parts(
        kind: DmaKind,
        area: NonNull<u8>,
        addr: PhysAddr,
        layout: Layout,
    ) -> Self {
        Self {
            kind,
            area,
            addr,
            layout,
        }
    }

    /// 種類
    pub fn kind(&self) -> DmaKind {
        self.kind
    }

    /// バスアドレス
    pub fn phys_addr(&self) -> PhysAddr {
        self.addr
    }

    /// CPU側アドレス
    pub fn as_ptr(&self) -> *mut u8 {
        self.area.as_ptr()
    }

    /// サイズ（バイト）
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// レイアウト
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// 32ビットワードを読み取り (`index` はワード単位)
    ///
    /// デバイスが書き込んだ値を読むため volatile で読む。
    #[inline]
    pub fn read_u32(&self, index: usize) -> u32 {
        assert!((index + 1) * 4 <= self.size(), "DMA read out of bounds");
        // SAFETY: 範囲チェック済み。領域は DMA_ALIGNMENT で整列しているため
        // 4バイト境界のアクセスになる。
        let value = unsafe { (self.area.as_ptr() as *const u32).add(index).read_volatile() };
        u32::from_le(value)
    }

    /// 32ビットワードを書き込み (`index` はワード単位)
    #[inline]
    pub fn write_u32(&self, index: usize, value: u32) {
        assert!((index + 1) * 4 <= self.size(), "DMA write out of bounds");
        // SAFETY: 範囲チェック済み。領域は DMA_ALIGNMENT で整列している。
        unsafe {
            (self.area.as_ptr() as *mut u32)
                .add(index)
                .write_volatile(value.to_le())
        }
    }

    /// 先頭から `offset` バイト先を指す、同じ領域の部分ビュー
    pub fn window(&self, offset: usize) -> DmaWindow<'_> {
        assert!(offset % 4 == 0 && offset <= self.size());
        DmaWindow { buf: self, offset }
    }
}

impl fmt::Debug for DmaBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaBuffer")
            .field("kind", &self.kind)
            .field("addr", &format_args!("{:#x}", self.addr.as_u64()))
            .field("size", &self.size())
            .finish()
    }
}

/// DMAバッファ内の部分領域（CORB/RIRB のように1ページを分け合う用途）
#[derive(Clone, Copy)]
pub struct DmaWindow<'a> {
    buf: &'a DmaBuffer,
    offset: usize,
}

impl DmaWindow<'_> {
    /// 部分領域のバスアドレス
    pub fn phys_addr(&self) -> PhysAddr {
        self.buf.phys_addr() + self.offset as u64
    }

    #[inline]
    pub fn read_u32(&self, index: usize) -> u32 {
        self.buf.read_u32(self.offset / 4 + index)
    }

    #[inline]
    pub fn write_u32(&self, index: usize, value: u32) {
        self.buf.write_u32(self.offset / 4 + index, value)
    }
}

// ============================================================================
// メモリフェンス
// ============================================================================

/// SFENCE: ストアフェンス
///
/// DMA領域への書き込みを、デバイスへ通知するレジスタ書き込みより前に完了させる。
#[inline(always)]
pub fn sfence() {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: sfence は副作用のない順序付け命令
    unsafe {
        core::arch::asm!("sfence", options(nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "x86_64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::Release);
}

/// LFENCE: ロードフェンス
///
/// デバイスが書いたDMA領域を、書き込みポインタの読み取り後に読むために使う。
#[inline(always)]
pub fn lfence() {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: lfence は副作用のない順序付け命令
    unsafe {
        core::arch::asm!("lfence", options(nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "x86_64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::Acquire);
}

// ============================================================================
// ヒープベースのDMAアロケータ
// ============================================================================

/// カーネルヒープから128バイト境界のゼロ初期化領域を確保するアロケータ
///
/// 恒等マッピング（物理 = 仮想）を前提とする。x86_64 + PCIe では
/// ハードウェアがキャッシュコヒーレンシを保つため追加のフラッシュは行わない。
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapDmaAllocator;

impl HeapDmaAllocator {
    /// DMAバッファを確保
    pub fn alloc(&self, kind: DmaKind, size: usize) -> HdaResult<DmaBuffer> {
        if size == 0 {
            return Err(HdaError::AllocationFailure { kind, size });
        }
        let layout = Layout::from_size_align(size, DMA_ALIGNMENT)
            .map_err(|_| HdaError::AllocationFailure { kind, size })?;

        // SAFETY: layout はサイズ > 0、アライメントは2の冪。
        let ptr = unsafe { alloc_zeroed(layout) };
        let area = NonNull::new(ptr).ok_or(HdaError::AllocationFailure { kind, size })?;

        let addr = match PhysAddr::try_new(ptr as u64) {
            Ok(addr) => addr,
            Err(_) => {
                // SAFETY: 直前に同じ layout で確保した領域
                unsafe { dealloc(ptr, layout) };
                return Err(HdaError::AllocationFailure { kind, size });
            }
        };

        // SAFETY: area は layout で確保したばかりで、恒等マッピングのため
        // addr は同じ領域を指す。
        Ok(unsafe { DmaBuffer::from_raw_parts(kind, area, addr, layout) })
    }

    /// DMAバッファを解放
    pub fn free(&self, buf: DmaBuffer) {
        // SAFETY: buf は alloc() で同じ layout を用いて確保された。
        // 所有権を受け取るため二重解放は起こり得ない。
        unsafe { dealloc(buf.as_ptr(), buf.layout()) };
    }
}
