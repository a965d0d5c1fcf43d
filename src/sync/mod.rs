// ============================================================================
// src/sync/mod.rs - 同期プリミティブ
// 応答待ちループ用の二段階バックオフ
// ============================================================================

pub mod backoff;

pub use backoff::{
    BackoffPhase, BackoffPolicy, ResponseBackoff, DEFAULT_SLEEP_MS, DEFAULT_SPIN_DELAY_US,
    DEFAULT_SPIN_ITERATIONS,
};
