//! Clockpool: a clock-replacement buffer pool over pluggable page stores

// Global type definitions
pub mod types;

// Import various modules
pub mod buffer;
pub mod infrastructure;
pub mod page;
pub mod store;
pub mod vfs;

// Re-export buffer pool items for easier access
pub use buffer::{BufferError, BufferPool, BufferResult, PageHandle, PoolStats, StoreRef};

// Re-export page and store items for easier access
pub use page::Page;
pub use store::{FileStore, MemStore, PageStore, StoreError};
pub use types::BufferPoolConfig;

// Re-export vfs items for easier access
pub use vfs::VfsError;
pub use vfs::VfsInterface;
