// ============================================================================
// src/io/audio/regs.rs - Intel High Definition Audio Register Definitions
// ============================================================================
//!
//! # Intel HD Audio レジスタ定義
//!
//! Intel High Definition Audio Specification Rev 1.0a に基づく、
//! コマンドバス（CORB/RIRB）が使用するレジスタとビット定義。

use bitflags::bitflags;

// ============================================================================
// Global Registers (Offset 0x00 - 0x2F)
// ============================================================================

/// Global Control (GCTL) - 32-bit, RW
/// Offset: 0x08
pub const REG_GCTL: u32 = 0x08;

/// State Change Status (STATESTS) - 16-bit, RW1C
/// Offset: 0x0E
pub const REG_STATESTS: u32 = 0x0E;

/// Interrupt Status (INTSTS) - 32-bit, RO/RW1C
/// Offset: 0x24
pub const REG_INTSTS: u32 = 0x24;

// ============================================================================
// CORB Registers (Offset 0x40 - 0x4F)
// ============================================================================

/// CORB Lower Base Address (CORBLBASE) - 32-bit, RW
/// Offset: 0x40
pub const REG_CORBLBASE: u32 = 0x40;

/// CORB Upper Base Address (CORBUBASE) - 32-bit, RW
/// Offset: 0x44
pub const REG_CORBUBASE: u32 = 0x44;

/// CORB Write Pointer (CORBWP) - 16-bit, RW
/// Offset: 0x48
pub const REG_CORBWP: u32 = 0x48;

/// CORB Read Pointer (CORBRP) - 16-bit, RW/RO
/// Offset: 0x4A
pub const REG_CORBRP: u32 = 0x4A;

/// CORB Control (CORBCTL) - 8-bit, RW
/// Offset: 0x4C
pub const REG_CORBCTL: u32 = 0x4C;

/// CORB Status (CORBSTS) - 8-bit, RW1C
/// Offset: 0x4D
pub const REG_CORBSTS: u32 = 0x4D;

/// CORB Size (CORBSIZE) - 8-bit, RW
/// Offset: 0x4E
pub const REG_CORBSIZE: u32 = 0x4E;

/// CORB Read Pointer Reset (CORBRPRST) - Bit 15
pub const CORBRP_RST: u16 = 1 << 15;

/// CORB Size: 256 entries
pub const CORBSIZE_256: u8 = 0x02;

bitflags! {
    /// CORBCTL (CORB Control)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CorbCtl: u8 {
        /// CORB DMA Enable (CORBRUN)
        const RUN = 1 << 1;
    }
}

// ============================================================================
// RIRB Registers (Offset 0x50 - 0x5F)
// ============================================================================

/// RIRB Lower Base Address (RIRBLBASE) - 32-bit, RW
/// Offset: 0x50
pub const REG_RIRBLBASE: u32 = 0x50;

/// RIRB Upper Base Address (RIRBUBASE) - 32-bit, RW
/// Offset: 0x54
pub const REG_RIRBUBASE: u32 = 0x54;

/// RIRB Write Pointer (RIRBWP) - 16-bit, RO
/// Offset: 0x58
pub const REG_RIRBWP: u32 = 0x58;

/// Response Interrupt Count (RINTCNT) - 16-bit, RW
/// Offset: 0x5A
pub const REG_RINTCNT: u32 = 0x5A;

/// RIRB Control (RIRBCTL) - 8-bit, RW
/// Offset: 0x5C
pub const REG_RIRBCTL: u32 = 0x5C;

/// RIRB Status (RIRBSTS) - 8-bit, RW1C
/// Offset: 0x5D
pub const REG_RIRBSTS: u32 = 0x5D;

/// RIRB Size (RIRBSIZE) - 8-bit, RW
/// Offset: 0x5E
pub const REG_RIRBSIZE: u32 = 0x5E;

/// RIRB Write Pointer Reset (RIRBWPRST) - Bit 15
pub const RIRBWP_RST: u16 = 1 << 15;

/// RIRB Size: 256 entries
pub const RIRBSIZE_256: u8 = 0x02;

bitflags! {
    /// RIRBCTL (RIRB Control)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RirbCtl: u8 {
        /// Response Interrupt Control (RINTCTL)
        const IRQ_EN = 1 << 0;
        /// RIRB DMA Enable (RIRBDMAEN)
        const DMA_EN = 1 << 1;
    }
}

bitflags! {
    /// RIRBSTS (RIRB Status, RW1C)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RirbSts: u8 {
        /// Response Interrupt Flag (RINTFL)
        const RINTFL = 1 << 0;
        /// Response Overrun Interrupt Status (RIRBOIS)
        const OIS = 1 << 2;
    }
}

// ============================================================================
// CORB/RIRB Entry Structures
// ============================================================================

/// CORB Entry: 32-bit command verb
pub const CORB_ENTRY_SIZE: usize = 4;

/// RIRB Entry: 64-bit (32-bit response + 32-bit response ex)
pub const RIRB_ENTRY_SIZE: usize = 8;

/// RIRB response_ex: codec address field (bits 0-3)
pub const RIRB_EX_CODEC_MASK: u32 = 0x0F;

/// RIRB response_ex: unsolicited response (bit 4)
pub const RIRB_EX_UNSOL: u32 = 1 << 4;

/// Register read value indicating the device has gone away
pub const REG_GONE_16: u16 = 0xFFFF;

// ============================================================================
// Buffer Sizes
// ============================================================================

/// CORB entries (256)
pub const MAX_CORB_ENTRIES: usize = 256;

/// RIRB entries (256)
pub const MAX_RIRB_ENTRIES: usize = 256;

/// Command ring page: CORB at offset 0, RIRB at offset 2048
pub const CMD_RING_BYTES: usize = 4096;

/// RIRB offset within the command ring page
pub const RIRB_OFFSET: usize = 2048;

/// Response ring slots (codec addresses 0-7)
pub const MAX_CODECS: usize = 8;

/// Unsolicited event queue depth
pub const UNSOL_QUEUE_SIZE: usize = 64;

// ============================================================================
// Timing Constants
// ============================================================================

/// Response wait timeout (milliseconds)
pub const GET_RESPONSE_TIMEOUT_MS: u64 = 1_000;

/// CORBRP reset handshake polls (1 µs apart)
pub const CORBRP_RESET_POLLS: u32 = 1_000;

/// CORB/RIRB DMA stop polls (10 µs apart)
pub const CMD_DMA_STOP_POLLS: u32 = 100;

/// Accept Unsolicited Response Enable (GCTL.UNSOL) - Bit 8
pub const GCTL_UNSOL: u32 = 1 << 8;
