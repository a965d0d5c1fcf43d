//! 統一エラーハンドリングモジュール
//!
//! クレート全体で使用される統一エラー型を定義し、
//! HDA ドライバのエラーからの変換を提供します。

use core::fmt;

use crate::io::audio::hda::HdaError;

/// クレート全体の統一エラー型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// メモリ関連エラー
    Memory(MemoryError),
    /// I/O関連エラー
    Io(IoError),
    /// 一般的なエラー
    General(GeneralError),
}

/// メモリ関連エラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// DMA固有: バッファアロケーション失敗
    DmaAllocationFailed,
}

/// I/O関連エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// デバイスが見つからない
    DeviceNotFound,
    /// デバイスビジー
    DeviceBusy,
    /// タイムアウト
    Timeout,
    /// 書き込みエラー
    WriteError,
}

/// 一般的なエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralError {
    /// 無効な引数
    InvalidArgument,
    /// リソースが枯渇
    ResourceExhausted,
}

// ===== Display implementations =====

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Memory(e) => write!(f, "Memory error: {}", e),
            KernelError::Io(e) => write!(f, "I/O error: {}", e),
            KernelError::General(e) => write!(f, "General error: {}", e),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::DmaAllocationFailed => write!(f, "DMA allocation failed"),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::DeviceNotFound => write!(f, "device not found"),
            IoError::DeviceBusy => write!(f, "device busy"),
            IoError::Timeout => write!(f, "timeout"),
            IoError::WriteError => write!(f, "write error"),
        }
    }
}

impl fmt::Display for GeneralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneralError::InvalidArgument => write!(f, "invalid argument"),
            GeneralError::ResourceExhausted => write!(f, "resource exhausted"),
        }
    }
}

// ===== From implementations for sub-errors =====

impl From<MemoryError> for KernelError {
    fn from(e: MemoryError) -> Self {
        KernelError::Memory(e)
    }
}

impl From<IoError> for KernelError {
    fn from(e: IoError) -> Self {
        KernelError::Io(e)
    }
}

impl From<GeneralError> for KernelError {
    fn from(e: GeneralError) -> Self {
        KernelError::General(e)
    }
}

// ===== 既存エラー型からの変換 =====

// io::audio::hda::HdaError からの変換
impl From<HdaError> for KernelError {
    fn from(e: HdaError) -> Self {
        match e {
            HdaError::ResponseTimeout { .. } => KernelError::Io(IoError::Timeout),
            HdaError::AllocationFailure { .. } => {
                KernelError::Memory(MemoryError::DmaAllocationFailed)
            }
            HdaError::CorbFull => KernelError::Io(IoError::DeviceBusy),
            HdaError::DeviceGone => KernelError::Io(IoError::DeviceNotFound),
            HdaError::NotReady => KernelError::Io(IoError::WriteError),
            HdaError::InvalidAddress(_) => KernelError::General(GeneralError::InvalidArgument),
            HdaError::Busy => KernelError::General(GeneralError::ResourceExhausted),
            HdaError::NotAttached => KernelError::General(GeneralError::InvalidArgument),
        }
    }
}
