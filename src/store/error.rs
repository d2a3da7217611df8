//! Page store error definitions

use crate::types::PageId;
use crate::vfs::VfsError;
use std::error::Error;
use std::fmt;

/// Page store error types
#[derive(Debug)]
pub enum StoreError {
    /// The page id is not allocated in the store
    InvalidPage {
        /// Store name
        store: String,
        /// Requested page
        page_id: PageId,
    },
    /// Stored bytes failed verification
    Corrupted {
        /// Store name
        store: String,
        /// Page whose slot is damaged
        page_id: PageId,
        /// What was wrong with it
        reason: String,
    },
    /// Underlying file system error
    Vfs(VfsError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidPage { store, page_id } => {
                write!(f, "Page {} is not allocated in store {}", page_id, store)
            }
            StoreError::Corrupted {
                store,
                page_id,
                reason,
            } => write!(f, "Page {} of store {} is corrupted: {}", page_id, store, reason),
            StoreError::Vfs(err) => write!(f, "VFS error: {}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Vfs(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VfsError> for StoreError {
    fn from(err: VfsError) -> Self {
        StoreError::Vfs(err)
    }
}

/// Result type for page store operations
pub type StoreResult<T> = Result<T, StoreError>;
