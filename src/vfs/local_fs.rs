//! Local file system implementation using libc system calls

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::interface::{FileHandle, VfsInterface};
use libc::{self, c_int, c_void, mode_t, off_t, size_t};
use std::ffi::CString;

/// Local file handle implementation
pub struct LocalFileHandle {
    fd: c_int,
    path: String,
}

impl LocalFileHandle {
    /// Create a new LocalFileHandle from a file descriptor
    pub fn new(fd: c_int, path: &str) -> Self {
        LocalFileHandle {
            fd,
            path: path.to_string(),
        }
    }
}

impl FileHandle for LocalFileHandle {
    fn pread(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        let result = unsafe {
            libc::pread(
                self.fd,
                buf.as_mut_ptr() as *mut c_void,
                buf.len() as size_t,
                offset as off_t,
            )
        };

        if result < 0 {
            Err(VfsError::last_os_error("pread", &self.path))
        } else {
            Ok(result as usize)
        }
    }

    fn pwrite(&self, buf: &[u8], offset: u64) -> VfsResult<usize> {
        let result = unsafe {
            libc::pwrite(
                self.fd,
                buf.as_ptr() as *const c_void,
                buf.len() as size_t,
                offset as off_t,
            )
        };

        if result < 0 {
            Err(VfsError::last_os_error("pwrite", &self.path))
        } else {
            Ok(result as usize)
        }
    }

    fn len(&self) -> VfsResult<u64> {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::fstat(self.fd, &mut stat) };

        if result < 0 {
            Err(VfsError::last_os_error("fstat", &self.path))
        } else {
            Ok(stat.st_size as u64)
        }
    }

    fn sync(&self) -> VfsResult<()> {
        let result = unsafe { libc::fsync(self.fd) };

        if result < 0 {
            Err(VfsError::last_os_error("fsync", &self.path))
        } else {
            Ok(())
        }
    }

    fn close(mut self: Box<Self>) -> VfsResult<()> {
        let fd = std::mem::replace(&mut self.fd, -1);
        let result = unsafe { libc::close(fd) };

        if result < 0 {
            Err(VfsError::last_os_error("close", &self.path))
        } else {
            Ok(())
        }
    }
}

impl Drop for LocalFileHandle {
    fn drop(&mut self) {
        if self.fd >= 0 {
            let _ = unsafe { libc::close(self.fd) };
        }
    }
}

/// Local file system implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs {
    // LocalFs doesn't need any state
}

impl LocalFs {
    /// Create a new LocalFs instance
    pub fn new() -> Self {
        LocalFs {}
    }

    /// Open a file with the given flags and mode
    fn open_file_internal(&self, path: &str, flags: c_int, mode: mode_t) -> VfsResult<c_int> {
        // Create CString in scope so it lives during the system call
        let c_path = CString::new(path)?;

        let result = unsafe { libc::open(c_path.as_ptr(), flags, mode as libc::c_uint) };

        if result < 0 {
            Err(VfsError::last_os_error("open", path))
        } else {
            Ok(result)
        }
    }
}

impl VfsInterface for LocalFs {
    fn create_dir(&self, path: &str) -> VfsResult<()> {
        let c_path = CString::new(path)?;

        let result = unsafe { libc::mkdir(c_path.as_ptr(), 0o755) };

        if result < 0 {
            Err(VfsError::last_os_error("mkdir", path))
        } else {
            Ok(())
        }
    }

    fn create_file(&self, path: &str) -> VfsResult<Box<dyn FileHandle>> {
        let flags = libc::O_CREAT | libc::O_RDWR | libc::O_TRUNC;
        let fd = self.open_file_internal(path, flags, 0o644)?;
        Ok(Box::new(LocalFileHandle::new(fd, path)))
    }

    fn open_file(&self, path: &str) -> VfsResult<Box<dyn FileHandle>> {
        let fd = self.open_file_internal(path, libc::O_RDWR, 0)?;
        Ok(Box::new(LocalFileHandle::new(fd, path)))
    }

    fn remove_file(&self, path: &str) -> VfsResult<()> {
        let c_path = CString::new(path)?;

        let result = unsafe { libc::unlink(c_path.as_ptr()) };

        if result < 0 {
            Err(VfsError::last_os_error("unlink", path))
        } else {
            Ok(())
        }
    }

    fn exists(&self, path: &str) -> bool {
        match CString::new(path) {
            Ok(c_path) => unsafe { libc::access(c_path.as_ptr(), libc::F_OK) == 0 },
            Err(_) => false,
        }
    }
}
