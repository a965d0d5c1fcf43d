// ============================================================================
// src/io/audio/hda/global.rs - Process-Wide Bus Registry
// ============================================================================
//!
//! HDA バスのグローバルレジストリ。
//!
//! バス番号はプロセス全体で単調増加し、複数のバスが並行に生成されても
//! 重複しない。レジストリ自体は初回参照時に一度だけ初期化される。

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use lazy_static::lazy_static;

/// バス番号の払い出しと生存数の管理
#[derive(Debug)]
pub struct BusRegistry {
    /// 次に払い出すバス番号
    next_index: AtomicU32,
    /// 生存中のバス数
    live: AtomicUsize,
}

impl BusRegistry {
    pub const fn new() -> Self {
        Self {
            next_index: AtomicU32::new(0),
            live: AtomicUsize::new(0),
        }
    }

    /// 新しいバス番号を払い出す
    pub fn register(&self) -> u32 {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.next_index.fetch_add(1, Ordering::SeqCst)
    }

    /// バスの破棄を記録（番号は再利用しない）
    pub fn unregister(&self, _index: u32) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    /// 生存中のバス数
    pub fn live_buses(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// これまでに払い出したバス番号の数
    pub fn issued(&self) -> u32 {
        self.next_index.load(Ordering::SeqCst)
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// グローバルバスレジストリ
    static ref BUS_REGISTRY: BusRegistry = BusRegistry::new();
}

/// グローバルバスレジストリを取得
pub fn bus_registry() -> &'static BusRegistry {
    &BUS_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_register_is_monotonic() {
        let registry = BusRegistry::new();
        assert_eq!(registry.register(), 0);
        assert_eq!(registry.register(), 1);
        assert_eq!(registry.live_buses(), 2);

        registry.unregister(0);
        assert_eq!(registry.live_buses(), 1);
        // indices are never reused
        assert_eq!(registry.register(), 2);
        assert_eq!(registry.issued(), 3);
    }

    #[test]
    fn test_concurrent_register_unique() {
        let registry = Arc::new(BusRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || (0..100).map(|_| registry.register()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
        assert_eq!(registry.issued(), 800);
    }

    #[test]
    fn test_global_registry_is_shared() {
        let a = bus_registry().register();
        let b = bus_registry().register();
        assert!(b > a);
        bus_registry().unregister(a);
        bus_registry().unregister(b);
    }
}
