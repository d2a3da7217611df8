// Page table: a separate-chaining hash table mapping buffer tags to frames

use crate::buffer::BufferTag;
use crate::types::FrameId;
use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Seed mixed into every bucket hash
const HASH_SEED: u64 = 0x5eed_c10c;

/// Page table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashTableError {
    /// The tag is already mapped to a frame
    AlreadyPresent {
        /// Duplicate key
        tag: BufferTag,
        /// Frame the key is currently mapped to
        frame_id: FrameId,
    },
}

impl fmt::Display for HashTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashTableError::AlreadyPresent { tag, frame_id } => write!(
                f,
                "Page {} of store {} is already mapped to frame {}",
                tag.page_id, tag.store_id, frame_id
            ),
        }
    }
}

impl std::error::Error for HashTableError {}

/// Page table structure
pub struct PageTable {
    /// Array of buckets, each bucket is a chain of (tag, frame) entries
    buckets: Vec<Vec<(BufferTag, FrameId)>>,
    /// Number of entries in the table
    size: usize,
}

impl PageTable {
    /// Create a new page table with the specified number of buckets
    pub fn new(bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        PageTable {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            size: 0,
        }
    }

    /// Create a page table sized for a pool of `num_frames` frames
    pub fn for_pool(num_frames: usize) -> Self {
        Self::new(Self::bucket_count_for(num_frames))
    }

    /// Bucket count used for a pool of `num_frames` frames: 1.2 buckets per
    /// frame, plus one so a single-frame pool still gets two buckets
    pub fn bucket_count_for(num_frames: usize) -> usize {
        num_frames * 6 / 5 + 1
    }

    /// Calculate the bucket index for a given tag
    fn bucket_index(&self, tag: &BufferTag) -> usize {
        (xxh64(&tag.to_bytes(), HASH_SEED) as usize) % self.buckets.len()
    }

    /// Look up the frame holding `tag`
    pub fn lookup(&self, tag: &BufferTag) -> Option<FrameId> {
        self.buckets[self.bucket_index(tag)]
            .iter()
            .find(|(key, _)| key == tag)
            .map(|(_, frame_id)| *frame_id)
    }

    /// Map `tag` to `frame_id`. An existing mapping is never overwritten.
    pub fn insert(&mut self, tag: BufferTag, frame_id: FrameId) -> Result<(), HashTableError> {
        let index = self.bucket_index(&tag);
        let bucket = &mut self.buckets[index];
        if let Some((_, existing)) = bucket.iter().find(|(key, _)| *key == tag) {
            return Err(HashTableError::AlreadyPresent {
                tag,
                frame_id: *existing,
            });
        }
        bucket.push((tag, frame_id));
        self.size += 1;
        Ok(())
    }

    /// Remove the mapping for `tag`, returning the frame it pointed at
    pub fn remove(&mut self, tag: &BufferTag) -> Option<FrameId> {
        let index = self.bucket_index(tag);
        let bucket = &mut self.buckets[index];
        let position = bucket.iter().position(|(key, _)| key == tag)?;
        let (_, frame_id) = bucket.swap_remove(position);
        self.size -= 1;
        Some(frame_id)
    }

    /// Iterate over all (tag, frame) entries in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (BufferTag, FrameId)> + '_ {
        self.buckets.iter().flat_map(|bucket| bucket.iter().copied())
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.size = 0;
    }

    /// Get the number of entries in the table
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
