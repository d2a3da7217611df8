//! Buffer pool error definitions

use crate::infrastructure::hash_table::HashTableError;
use crate::store::StoreError;
use crate::types::{ConfigError, FrameId, PageId};
use std::error::Error;
use std::fmt;

/// Buffer manager errors
#[derive(Debug)]
pub enum BufferError {
    /// Every frame is pinned; nothing can be evicted
    PoolExhausted,
    /// Release of a page whose pin count is already zero
    PageNotPinned {
        /// Store name
        store: String,
        /// Page being released
        page_id: PageId,
        /// Frame holding it
        frame_id: FrameId,
    },
    /// Dispose or flush of a page that is still pinned
    PagePinned {
        /// Store name
        store: String,
        /// Pinned page
        page_id: PageId,
        /// Frame holding it
        frame_id: FrameId,
    },
    /// Frame state disagrees with the page table
    InconsistentState {
        /// Offending frame
        frame_id: FrameId,
        /// Its dirty flag
        dirty: bool,
        /// Its valid flag
        valid: bool,
        /// Its reference bit
        referenced: bool,
    },
    /// A page table insert hit an existing key
    AlreadyPresent(HashTableError),
    /// A page handle outlived its pin or its frame was reused
    StaleHandle {
        /// Frame the handle points at
        frame_id: FrameId,
    },
    /// The pool cannot be built from the given configuration
    InvalidConfig(String),
    /// Page store failure
    Store(StoreError),
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::PoolExhausted => write!(f, "Buffer pool exhausted: all frames are pinned"),
            BufferError::PageNotPinned {
                store,
                page_id,
                frame_id,
            } => write!(
                f,
                "Page {} of store {} in frame {} is not pinned",
                page_id, store, frame_id
            ),
            BufferError::PagePinned {
                store,
                page_id,
                frame_id,
            } => write!(
                f,
                "Page {} of store {} in frame {} is pinned",
                page_id, store, frame_id
            ),
            BufferError::InconsistentState {
                frame_id,
                dirty,
                valid,
                referenced,
            } => write!(
                f,
                "Bad buffer in frame {} (dirty: {}, valid: {}, referenced: {})",
                frame_id, dirty, valid, referenced
            ),
            BufferError::AlreadyPresent(err) => write!(f, "Page table error: {}", err),
            BufferError::StaleHandle { frame_id } => {
                write!(f, "Stale page handle for frame {}", frame_id)
            }
            BufferError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            BufferError::Store(err) => write!(f, "Page store error: {}", err),
        }
    }
}

impl Error for BufferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BufferError::AlreadyPresent(err) => Some(err),
            BufferError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for BufferError {
    fn from(err: StoreError) -> Self {
        BufferError::Store(err)
    }
}

impl From<HashTableError> for BufferError {
    fn from(err: HashTableError) -> Self {
        BufferError::AlreadyPresent(err)
    }
}

impl From<ConfigError> for BufferError {
    fn from(err: ConfigError) -> Self {
        BufferError::InvalidConfig(err.to_string())
    }
}

/// Result type for buffer pool operations
pub type BufferResult<T> = Result<T, BufferError>;
