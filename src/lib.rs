// ============================================================================
// src/lib.rs - HD Audio Command Bus
// ============================================================================
//!
//! # HD Audio コマンドバス
//!
//! コントローラ側から CORB/RIRB リングを介してコーデックへ動詞コマンドを送り、
//! 応答を時間制限付きポーリングで受け取るためのライブラリ。
//!
//! ## モジュール構成
//! - `error` - 統一エラー型
//! - `time` - 時計/スケジューラ抽象
//! - `sync` - 応答待ちバックオフ
//! - `io::dma` - DMAバッファ
//! - `io::audio::hda` - バス本体、応答リング、レジスタアクセス層

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod error;
pub mod io;
pub mod sync;
pub mod time;

pub use error::{GeneralError, IoError, KernelError, MemoryError};
pub use io::audio::hda::{
    BusConfig, BusRegistry, CodecDriver, DrainMode, HdaBus, HdaError, HdaIoOps, HdaLink,
    HdaResult, HdaStream, MmioOps, StreamDirection, UnsolEvent, UnsolScheduler, WaitStats,
    bus_registry, command_addr, make_corb_entry,
};
pub use io::dma::{DmaBuffer, DmaKind, HeapDmaAllocator};
pub use sync::{BackoffPhase, BackoffPolicy, ResponseBackoff};
pub use time::Clock;
#[cfg(any(test, feature = "std"))]
pub use time::StdClock;
