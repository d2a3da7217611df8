//! Page stores
//!
//! A page store is the durable home of a set of pages: the buffer pool reads
//! pages from it on a miss, writes dirty pages back to it, and asks it to
//! allocate and delete page ids. Two implementations are provided, an
//! in-memory store that journals every call and a file-backed store on top
//! of the VFS layer.

pub mod error;
pub use error::{StoreError, StoreResult};

pub mod interface;
pub use interface::PageStore;

pub mod memory;
pub use memory::{MemStore, StoreOp};

pub mod file;
pub use file::FileStore;

use crate::types::StoreId;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(1);

/// Hands out a store id no other store opened by this process has used
pub fn next_store_id() -> StoreId {
    NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Moves the id counter past `store_id` so `next_store_id` never returns it
pub(crate) fn reserve_store_id(store_id: StoreId) {
    NEXT_STORE_ID.fetch_max(store_id.saturating_add(1), Ordering::Relaxed);
}
