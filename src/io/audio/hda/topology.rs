// ============================================================================
// src/io/audio/hda/topology.rs - Attached Codecs, Links and Streams
// ============================================================================
//!
//! バスにぶら下がるコーデック・リンク・ストリームの表。
//!
//! 列挙や設定そのものは上位層の仕事で、ここでは登録/解除のみを扱う。
//! 表はバスの粗粒度ロック (`cmd_lock`) で保護される。

use alloc::string::String;
use alloc::sync::Arc;
use hashbrown::HashMap;
use log::debug;

use super::bus::HdaBus;
use super::regs::MAX_CODECS;
use super::types::{HdaError, HdaResult};

// ============================================================================
// Codec
// ============================================================================

/// バスに接続されたコーデック
pub trait CodecDriver: Send + Sync {
    /// コーデックアドレス (0-7)
    fn address(&self) -> u8;

    /// 非請求イベントの受信
    fn unsol_event(&self, _res: u32) {}
}

// ============================================================================
// Link / Stream
// ============================================================================

/// 拡張HDAリンク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdaLink {
    /// リンク番号
    pub index: u32,
    /// 表示名
    pub name: String,
}

/// ストリームの方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDirection {
    Playback,
    Capture,
}

/// ストリーム
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdaStream {
    /// 方向
    pub direction: StreamDirection,
    /// 方向内のインデックス
    pub index: u8,
    /// ストリームタグ (1-15)
    pub stream_tag: u8,
}

impl HdaStream {
    fn key(&self) -> (StreamDirection, u8) {
        (self.direction, self.index)
    }
}

// ============================================================================
// Topology Table
// ============================================================================

#[derive(Default)]
pub(crate) struct Topology {
    codecs: HashMap<u8, Arc<dyn CodecDriver>>,
    links: HashMap<u32, Arc<HdaLink>>,
    streams: HashMap<(StreamDirection, u8), Arc<HdaStream>>,
}

impl Topology {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl HdaBus {
    // ========================================================================
    // Codecs
    // ========================================================================

    /// コーデックを接続
    pub fn attach_codec(&self, codec: Arc<dyn CodecDriver>) -> HdaResult<()> {
        let addr = codec.address();
        if addr as usize >= MAX_CODECS {
            return Err(HdaError::InvalidAddress(addr));
        }
        let mut topology = self.cmd_lock.lock();
        if topology.codecs.contains_key(&addr) {
            return Err(HdaError::Busy);
        }
        topology.codecs.insert(addr, codec);
        debug!("[HDA] bus {}: codec {} attached", self.index(), addr);
        Ok(())
    }

    /// コーデックを切り離す
    pub fn detach_codec(&self, addr: u8) -> HdaResult<Arc<dyn CodecDriver>> {
        let codec = self
            .cmd_lock
            .lock()
            .codecs
            .remove(&addr)
            .ok_or(HdaError::NotAttached)?;
        debug!("[HDA] bus {}: codec {} detached", self.index(), addr);
        Ok(codec)
    }

    pub fn codec(&self, addr: u8) -> Option<Arc<dyn CodecDriver>> {
        self.cmd_lock.lock().codecs.get(&addr).cloned()
    }

    /// 接続中のコーデックアドレスのビットマスク
    pub fn codec_mask(&self) -> u16 {
        self.cmd_lock
            .lock()
            .codecs
            .keys()
            .fold(0u16, |mask, &addr| mask | (1 << addr))
    }

    // ========================================================================
    // Links
    // ========================================================================

    pub fn attach_link(&self, link: Arc<HdaLink>) -> HdaResult<()> {
        let mut topology = self.cmd_lock.lock();
        if topology.links.contains_key(&link.index) {
            return Err(HdaError::Busy);
        }
        debug!("[HDA] bus {}: link {} ({}) attached", self.index(), link.index, link.name);
        topology.links.insert(link.index, link);
        Ok(())
    }

    pub fn detach_link(&self, index: u32) -> HdaResult<Arc<HdaLink>> {
        self.cmd_lock
            .lock()
            .links
            .remove(&index)
            .ok_or(HdaError::NotAttached)
    }

    pub fn link_count(&self) -> usize {
        self.cmd_lock.lock().links.len()
    }

    // ========================================================================
    // Streams
    // ========================================================================

    pub fn attach_stream(&self, stream: Arc<HdaStream>) -> HdaResult<()> {
        let mut topology = self.cmd_lock.lock();
        let key = stream.key();
        if topology.streams.contains_key(&key) {
            return Err(HdaError::Busy);
        }
        topology.streams.insert(key, stream);
        Ok(())
    }

    pub fn detach_stream(
        &self,
        direction: StreamDirection,
        index: u8,
    ) -> HdaResult<Arc<HdaStream>> {
        self.cmd_lock
            .lock()
            .streams
            .remove(&(direction, index))
            .ok_or(HdaError::NotAttached)
    }

    pub fn stream_count(&self) -> usize {
        self.cmd_lock.lock().streams.len()
    }
}
