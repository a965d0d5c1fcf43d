// ============================================================================
// src/io/audio/hda/mod.rs - HD Audio Command Bus
// ============================================================================
//!
//! # HD Audio コマンドバス
//!
//! コントローラの CORB/RIRB を介したコーデック通信の中核。
//!
//! ## 機能
//! - コマンドリングページの確保と CORB/RIRB の起動
//! - 動詞コマンドの送出
//! - 時間制限付きの応答待ち（ポーリング/割り込み駆動）
//! - 非請求イベントの配送
//! - コーデック/リンク/ストリームの登録
//!
//! ## モジュール構成
//! - `types` - エラー型、CORB/RIRBエントリ
//! - `config` - バス設定
//! - `io_ops` - レジスタ/DMA アクセストレイト
//! - `rirb` - 応答リングと非請求キュー
//! - `bus` - HdaBus の実装
//! - `response` - 応答待ちプロトコル
//! - `topology` - コーデック/リンク/ストリーム表
//! - `global` - プロセス全体のバスレジストリ
//! - `regs` - レジスタ定義（親モジュールから）

// サブモジュール
mod bus;
mod config;
mod global;
mod io_ops;
mod response;
mod rirb;
mod topology;
mod types;

#[cfg(test)]
pub(crate) mod fake;

// 親モジュールのレジスタ定義を使用
use super::regs;

// 型の再エクスポート
pub use types::{
    command_addr, make_corb_entry, DrainMode, HdaError, HdaResult, RirbEntry, UnsolEvent,
};

// バス本体の再エクスポート
pub use bus::{HdaBus, UnsolScheduler};
pub use config::BusConfig;
pub use io_ops::{HdaIoOps, MmioOps};
pub use response::WaitStats;
pub use rirb::{ResponseRing, UnsolQueue};
pub use topology::{CodecDriver, HdaLink, HdaStream, StreamDirection};

// グローバルレジストリの再エクスポート
pub use global::{bus_registry, BusRegistry};
