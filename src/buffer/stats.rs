//! Pool statistics and diagnostic snapshots

use crate::buffer::frame::{BufferDesc, FrameTable};
use crate::types::{FrameId, PageId, StoreId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters kept by a buffer pool over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Fetches served from a resident frame
    pub hits: u64,
    /// Fetches that read the page from its store
    pub misses: u64,
    /// Valid frames reclaimed by the clock sweep
    pub evictions: u64,
    /// Dirty frames written back to their store
    pub writebacks: u64,
    /// New pages allocated through the pool
    pub allocations: u64,
    /// Pages disposed through the pool
    pub disposals: u64,
    /// Sweeps that found every frame pinned
    pub exhausted: u64,
}

impl PoolStats {
    /// Fraction of fetches served without I/O, 0.0 before the first fetch
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// State of one frame at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub store_id: Option<StoreId>,
    pub page_id: Option<PageId>,
    pub valid: bool,
    pub pin_count: u32,
    pub dirty: bool,
    pub referenced: bool,
}

impl From<&BufferDesc> for FrameInfo {
    fn from(desc: &BufferDesc) -> Self {
        FrameInfo {
            frame_id: desc.frame_id(),
            store_id: desc.tag().map(|tag| tag.store_id),
            page_id: desc.tag().map(|tag| tag.page_id),
            valid: desc.is_valid(),
            pin_count: desc.pin_count(),
            dirty: desc.is_dirty(),
            referenced: desc.is_referenced(),
        }
    }
}

/// Diagnostic dump of every frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub frames: Vec<FrameInfo>,
    pub valid_frames: usize,
}

impl PoolSnapshot {
    pub(crate) fn capture(frames: &FrameTable) -> Self {
        let frames: Vec<FrameInfo> = frames.iter().map(FrameInfo::from).collect();
        let valid_frames = frames.iter().filter(|info| info.valid).count();
        PoolSnapshot {
            frames,
            valid_frames,
        }
    }
}

impl fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for info in &self.frames {
            write!(f, "FrameNo:{} ", info.frame_id)?;
            match (info.store_id, info.page_id) {
                (Some(store_id), Some(page_id)) => {
                    write!(f, "store:{} pageNo:{} ", store_id, page_id)?
                }
                _ => write!(f, "store:- pageNo:- ")?,
            }
            writeln!(
                f,
                "valid:{} pinCnt:{} dirty:{} refbit:{}",
                info.valid, info.pin_count, info.dirty, info.referenced
            )?;
        }
        write!(f, "Total Number of Valid Frames: {}", self.valid_frames)
    }
}
