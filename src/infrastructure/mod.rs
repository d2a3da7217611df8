//! Infrastructure shared by the buffer pool: the page table index and
//! logger setup.

pub mod hash_table;
pub mod logger;

pub use hash_table::{HashTableError, PageTable};
pub use logger::{setup_logger, setup_logger_with};
