// ============================================================================
// src/io/mod.rs - I/O Subsystem
// ============================================================================
//!
//! - `dma`: DMAバッファハンドルとヒープアロケータ
//! - `audio`: HD Audio コマンドバス

pub mod audio;
pub mod dma;
