//! File-backed page store
//!
//! A store file is an array of fixed-size slots, one per page id. Each slot
//! starts with a small header followed by the page payload:
//!
//! ```text
//! Offset  Size       Field
//!   0     4          magic ("CKPS")
//!   4     4          state (0 = free, 1 = in use)
//!   8     4          crc32 of the payload
//!  12     4          reserved
//!  16     PAGE_SIZE  payload
//! ```
//!
//! Page id N lives in slot N. The set of free slots is rebuilt from the slot
//! headers when a store is opened.

use crate::page::Page;
use crate::store::error::{StoreError, StoreResult};
use crate::store::interface::PageStore;
use crate::store::next_store_id;
use crate::types::{PAGE_SIZE, PageId, StoreId};
use crate::vfs::{FileHandle, VfsError, VfsInterface};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Slot header magic ("CKPS")
pub const SLOT_MAGIC: u32 = 0x434B_5053;
/// Size of the slot header in bytes
pub const SLOT_HEADER_SIZE: usize = 16;
/// Size of a slot (header + payload)
pub const SLOT_SIZE: usize = SLOT_HEADER_SIZE + PAGE_SIZE;

const SLOT_FREE: u32 = 0;
const SLOT_IN_USE: u32 = 1;

/// Decoded slot header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotHeader {
    magic: u32,
    state: u32,
    checksum: u32,
}

impl SlotHeader {
    fn in_use(payload: &[u8]) -> Self {
        Self {
            magic: SLOT_MAGIC,
            state: SLOT_IN_USE,
            checksum: crc32fast::hash(payload),
        }
    }

    fn free() -> Self {
        Self {
            magic: SLOT_MAGIC,
            state: SLOT_FREE,
            checksum: 0,
        }
    }

    fn encode(&self) -> [u8; SLOT_HEADER_SIZE] {
        let mut bytes = [0u8; SLOT_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.state.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    fn decode(bytes: &[u8]) -> Self {
        let word = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Self {
            magic: word(0),
            state: word(4),
            checksum: word(8),
        }
    }
}

struct FileState {
    file: Box<dyn FileHandle>,
    slot_count: u64,
    free_slots: BTreeSet<PageId>,
}

impl FileState {
    fn is_allocated(&self, page_id: PageId) -> bool {
        page_id < self.slot_count && !self.free_slots.contains(&page_id)
    }
}

/// File-backed page store
pub struct FileStore {
    store_id: StoreId,
    path: String,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Creates a new, empty store file at `path`, replacing any existing file
    pub fn create(vfs: Arc<dyn VfsInterface>, path: &str) -> StoreResult<Self> {
        let file = vfs.create_file(path)?;
        log::debug!("created page store file {}", path);
        Ok(Self::from_parts(path, file, 0, BTreeSet::new()))
    }

    /// Opens an existing store file and rebuilds its free slot set
    pub fn open(vfs: Arc<dyn VfsInterface>, path: &str) -> StoreResult<Self> {
        let file = vfs.open_file(path)?;
        let len = file.len()?;
        if len % SLOT_SIZE as u64 != 0 {
            return Err(StoreError::Corrupted {
                store: path.to_string(),
                page_id: len / SLOT_SIZE as u64,
                reason: format!("file length {} is not a multiple of the slot size", len),
            });
        }

        let slot_count = len / SLOT_SIZE as u64;
        let mut free_slots = BTreeSet::new();
        let mut header = [0u8; SLOT_HEADER_SIZE];
        for page_id in 0..slot_count {
            read_exact_at(file.as_ref(), &mut header, slot_offset(page_id))?;
            let decoded = SlotHeader::decode(&header);
            if decoded.magic != SLOT_MAGIC {
                return Err(StoreError::Corrupted {
                    store: path.to_string(),
                    page_id,
                    reason: format!("bad slot magic {:#x}", decoded.magic),
                });
            }
            if decoded.state == SLOT_FREE {
                free_slots.insert(page_id);
            }
        }

        log::debug!(
            "opened page store file {} ({} slots, {} free)",
            path,
            slot_count,
            free_slots.len()
        );
        Ok(Self::from_parts(path, file, slot_count, free_slots))
    }

    /// Opens `path` if it exists, otherwise creates it
    pub fn open_or_create(vfs: Arc<dyn VfsInterface>, path: &str) -> StoreResult<Self> {
        if vfs.exists(path) {
            Self::open(vfs, path)
        } else {
            Self::create(vfs, path)
        }
    }

    fn from_parts(
        path: &str,
        file: Box<dyn FileHandle>,
        slot_count: u64,
        free_slots: BTreeSet<PageId>,
    ) -> Self {
        FileStore {
            store_id: next_store_id(),
            path: path.to_string(),
            state: Mutex::new(FileState {
                file,
                slot_count,
                free_slots,
            }),
        }
    }

    /// Number of allocated pages
    pub fn page_count(&self) -> u64 {
        let state = self.state.lock();
        state.slot_count - state.free_slots.len() as u64
    }

    /// Flushes the store file to durable storage
    pub fn sync(&self) -> StoreResult<()> {
        self.state.lock().file.sync()?;
        Ok(())
    }

    /// Syncs and closes the store file
    pub fn close(self) -> StoreResult<()> {
        let state = self.state.into_inner();
        state.file.sync()?;
        state.file.close()?;
        Ok(())
    }

    fn invalid(&self, page_id: PageId) -> StoreError {
        StoreError::InvalidPage {
            store: self.path.clone(),
            page_id,
        }
    }

    fn write_slot(
        &self,
        file: &dyn FileHandle,
        page_id: PageId,
        header: SlotHeader,
        payload: &[u8],
    ) -> StoreResult<()> {
        let mut slot = vec![0u8; SLOT_SIZE];
        slot[..SLOT_HEADER_SIZE].copy_from_slice(&header.encode());
        slot[SLOT_HEADER_SIZE..].copy_from_slice(payload);
        write_all_at(file, &slot, slot_offset(page_id))?;
        Ok(())
    }
}

impl PageStore for FileStore {
    fn store_id(&self) -> StoreId {
        self.store_id
    }

    fn name(&self) -> &str {
        &self.path
    }

    fn read_page(&self, page_id: PageId) -> StoreResult<Page> {
        let state = self.state.lock();
        if !state.is_allocated(page_id) {
            return Err(self.invalid(page_id));
        }

        let mut slot = vec![0u8; SLOT_SIZE];
        read_exact_at(state.file.as_ref(), &mut slot, slot_offset(page_id))?;

        let header = SlotHeader::decode(&slot[..SLOT_HEADER_SIZE]);
        let payload = &slot[SLOT_HEADER_SIZE..];
        if header.magic != SLOT_MAGIC || header.state != SLOT_IN_USE {
            return Err(StoreError::Corrupted {
                store: self.path.clone(),
                page_id,
                reason: "slot header does not describe a page in use".to_string(),
            });
        }
        let actual = crc32fast::hash(payload);
        if actual != header.checksum {
            return Err(StoreError::Corrupted {
                store: self.path.clone(),
                page_id,
                reason: format!(
                    "checksum mismatch (stored {:#010x}, computed {:#010x})",
                    header.checksum, actual
                ),
            });
        }

        Ok(Page::from_bytes(page_id, payload))
    }

    fn write_page(&self, page: &Page) -> StoreResult<()> {
        let state = self.state.lock();
        let page_id = page.page_id();
        if !state.is_allocated(page_id) {
            return Err(self.invalid(page_id));
        }
        self.write_slot(
            state.file.as_ref(),
            page_id,
            SlotHeader::in_use(page.data()),
            page.data(),
        )
    }

    fn allocate_page(&self) -> StoreResult<Page> {
        let mut state = self.state.lock();
        let (page_id, appended) = match state.free_slots.first().copied() {
            Some(page_id) => (page_id, false),
            None => (state.slot_count, true),
        };

        let page = Page::new(page_id);
        self.write_slot(
            state.file.as_ref(),
            page_id,
            SlotHeader::in_use(page.data()),
            page.data(),
        )?;

        // Only commit the bookkeeping once the slot is on disk
        if appended {
            state.slot_count += 1;
        } else {
            state.free_slots.remove(&page_id);
        }
        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.is_allocated(page_id) {
            return Err(self.invalid(page_id));
        }
        let header = SlotHeader::free().encode();
        write_all_at(state.file.as_ref(), &header, slot_offset(page_id))?;
        state.free_slots.insert(page_id);
        Ok(())
    }
}

/// Byte offset of the slot holding `page_id`
fn slot_offset(page_id: PageId) -> u64 {
    page_id * SLOT_SIZE as u64
}

fn read_exact_at(file: &dyn FileHandle, buf: &mut [u8], offset: u64) -> StoreResult<()> {
    let mut done = 0;
    while done < buf.len() {
        let n = file.pread(&mut buf[done..], offset + done as u64)?;
        if n == 0 {
            return Err(StoreError::Vfs(VfsError::IoError(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            ))));
        }
        done += n;
    }
    Ok(())
}

fn write_all_at(file: &dyn FileHandle, buf: &[u8], offset: u64) -> StoreResult<()> {
    let mut done = 0;
    while done < buf.len() {
        let n = file.pwrite(&buf[done..], offset + done as u64)?;
        if n == 0 {
            return Err(StoreError::Vfs(VfsError::IoError(std::io::Error::from(
                std::io::ErrorKind::WriteZero,
            ))));
        }
        done += n;
    }
    Ok(())
}
