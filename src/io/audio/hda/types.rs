// ============================================================================
// src/io/audio/hda/types.rs - HDA Types and Data Structures
// ============================================================================
//!
//! HDA コマンドバスで使用される型定義。
//!
//! - エラー型
//! - CORB/RIRBエントリ
//! - 応答リングの駆動モード

use core::fmt;

use super::regs::*;
use crate::io::dma::DmaKind;

// ============================================================================
// Error Types
// ============================================================================

/// HDA Driver Error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HdaError {
    /// No response for a codec address before the deadline
    ResponseTimeout {
        /// Bus index
        bus: u32,
        /// Codec address
        addr: u8,
        /// Time spent waiting
        elapsed_ns: u64,
        /// Last command issued to the address
        last_cmd: u32,
    },
    /// DMA buffer allocation failed
    AllocationFailure { kind: DmaKind, size: usize },
    /// CORB has no free entry
    CorbFull,
    /// Register reads return all-ones
    DeviceGone,
    /// Command I/O has not been started
    NotReady,
    /// Codec address outside the response ring
    InvalidAddress(u8),
    /// Key already attached
    Busy,
    /// Key not attached
    NotAttached,
}

impl HdaError {
    /// Negative POSIX errno equivalent
    pub fn errno(&self) -> i32 {
        const EIO: i32 = 5;
        const EAGAIN: i32 = 11;
        const ENOMEM: i32 = 12;
        const EBUSY: i32 = 16;
        const ENODEV: i32 = 19;
        const EINVAL: i32 = 22;

        let errno = match self {
            HdaError::ResponseTimeout { .. } | HdaError::DeviceGone | HdaError::NotReady => EIO,
            HdaError::AllocationFailure { .. } => ENOMEM,
            HdaError::CorbFull => EAGAIN,
            HdaError::InvalidAddress(_) => EINVAL,
            HdaError::Busy => EBUSY,
            HdaError::NotAttached => ENODEV,
        };
        -errno
    }
}

impl fmt::Display for HdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HdaError::ResponseTimeout {
                bus,
                addr,
                elapsed_ns,
                last_cmd,
            } => write!(
                f,
                "bus {} codec {}: response timeout after {} us (last cmd {:#010x})",
                bus,
                addr,
                elapsed_ns / 1_000,
                last_cmd
            ),
            HdaError::AllocationFailure { kind, size } => {
                write!(f, "DMA allocation failed ({:?}, {} bytes)", kind, size)
            }
            HdaError::CorbFull => write!(f, "CORB full"),
            HdaError::DeviceGone => write!(f, "device gone"),
            HdaError::NotReady => write!(f, "command I/O not started"),
            HdaError::InvalidAddress(addr) => write!(f, "invalid codec address {}", addr),
            HdaError::Busy => write!(f, "already attached"),
            HdaError::NotAttached => write!(f, "not attached"),
        }
    }
}

pub type HdaResult<T> = Result<T, HdaError>;

// ============================================================================
// CORB Entry
// ============================================================================

/// Build a CORB command entry
/// Format: [Codec Address (4)] [Node ID (8)] [Verb (20)]
#[inline]
pub fn make_corb_entry(codec_addr: u8, node_id: u8, verb: u32) -> u32 {
    ((codec_addr as u32 & 0x0F) << 28) | ((node_id as u32) << 20) | (verb & 0xFFFFF)
}

/// Codec address a CORB command is directed to
#[inline]
pub fn command_addr(cmd: u32) -> u8 {
    ((cmd >> 28) & 0x0F) as u8
}

// ============================================================================
// RIRB Entry
// ============================================================================

/// RIRB Response Entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct RirbEntry {
    /// Response data
    pub response: u32,
    /// Response extended (codec address, unsolicited flag)
    pub response_ex: u32,
}

impl RirbEntry {
    pub const fn new(response: u32, response_ex: u32) -> Self {
        Self {
            response,
            response_ex,
        }
    }

    /// Get codec address from response
    pub fn codec_addr(&self) -> u8 {
        (self.response_ex & RIRB_EX_CODEC_MASK) as u8
    }

    /// Check if this is an unsolicited response
    pub fn is_unsolicited(&self) -> bool {
        (self.response_ex & RIRB_EX_UNSOL) != 0
    }
}

/// 非請求イベント（RIRB に載った unsolicited 応答）
pub type UnsolEvent = RirbEntry;

// ============================================================================
// Drain Mode
// ============================================================================

/// 応答リングを誰が吸い上げるか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// 応答待ち側が毎回ハードウェアリングを吸い上げる
    Polling,
    /// 割り込みハンドラが吸い上げ、応答待ち側は読むだけ
    Interrupt,
}
