//! Page store interface definitions

use crate::page::Page;
use crate::store::error::StoreResult;
use crate::types::{PageId, StoreId};

/// Backing store trait
///
/// One implementation instance per underlying file or object. Methods take
/// `&self` so a store can be shared between pools; implementations guard
/// their own state.
pub trait PageStore: Send + Sync {
    /// Identity used together with a page id to key buffer pool entries.
    /// Must be unique among the stores used with one pool.
    fn store_id(&self) -> StoreId;

    /// Human readable name used in error messages
    fn name(&self) -> &str;

    /// Read an allocated page
    ///
    /// # Returns
    /// * `Ok(Page)` - the stored page, carrying `page_id`
    /// * `Err(StoreError::InvalidPage)` if `page_id` is not allocated
    fn read_page(&self, page_id: PageId) -> StoreResult<Page>;

    /// Persist a page under the id it carries
    fn write_page(&self, page: &Page) -> StoreResult<()>;

    /// Allocate a fresh, zeroed page and return it with its new id
    fn allocate_page(&self) -> StoreResult<Page>;

    /// Release a page id; later reads of it fail until it is reallocated
    fn delete_page(&self, page_id: PageId) -> StoreResult<()>;
}
