// ============================================================================
// src/io/audio/mod.rs - Audio Subsystem Module
// ============================================================================
//!
//! # オーディオサブシステム
//!
//! HD Audio コントローラのコマンドバス（CORB/RIRB）を提供。
//!
//! ## モジュール
//! - `hda`: バス本体、応答リング、レジスタアクセス層
//! - `regs`: HDA レジスタ定義

pub mod hda;
pub mod regs;

// Re-export main types
pub use hda::{BusConfig, DrainMode, HdaBus, HdaError, HdaIoOps, HdaResult};
