//! Page module
//!
//! Contains the fixed-size Page unit exchanged between the buffer pool
//! and its page stores.

pub mod page;

// Re-export Page struct for easier access
pub use page::Page;
