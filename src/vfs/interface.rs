//! VFS interface definitions

use crate::vfs::error::VfsResult;

/// File handle trait for VFS operations
/// This trait represents a handle to an open file and provides positional I/O
pub trait FileHandle: Send + Sync {
    /// Read from the file at a specific offset
    fn pread(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize>;

    /// Write to the file at a specific offset
    fn pwrite(&self, buf: &[u8], offset: u64) -> VfsResult<usize>;

    /// Current length of the file in bytes
    fn len(&self) -> VfsResult<u64>;

    /// Flush file contents to durable storage
    fn sync(&self) -> VfsResult<()>;

    /// Close the file handle
    fn close(self: Box<Self>) -> VfsResult<()>;
}

/// VFS interface trait
/// This trait defines the interface for all VFS implementations
pub trait VfsInterface: Send + Sync {
    /// Create a new directory
    ///
    /// # Returns
    /// * `Ok(())` if the directory was created successfully
    /// * `Err(VfsError::AlreadyExists)` if it already exists
    fn create_dir(&self, path: &str) -> VfsResult<()>;

    /// Create a new, empty file and return a handle to it.
    /// An existing file at `path` is truncated.
    fn create_file(&self, path: &str) -> VfsResult<Box<dyn FileHandle>>;

    /// Open an existing file for reading and writing
    fn open_file(&self, path: &str) -> VfsResult<Box<dyn FileHandle>>;

    /// Remove an existing file
    fn remove_file(&self, path: &str) -> VfsResult<()>;

    /// Returns true if something exists at `path`
    fn exists(&self, path: &str) -> bool;
}
