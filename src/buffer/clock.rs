//! Clock (second-chance) replacement
//!
//! The hand moves one frame per step and is never reset. A free frame is
//! taken immediately. A referenced frame loses its reference bit and is
//! skipped. An unreferenced, unpinned frame is the victim. The sweep gives up
//! once a full revolution has passed without meeting a single unpinned frame.

use crate::buffer::frame::FrameTable;
use crate::types::FrameId;

/// Result of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The frame holds no page and can be used as is
    Free(FrameId),
    /// The frame holds an unpinned page that must be evicted before reuse
    Victim(FrameId),
    /// Every frame is pinned
    Exhausted,
}

/// Clock hand over a fixed number of frames
#[derive(Debug, Clone)]
pub struct ClockHand {
    /// Position of the last inspected frame
    hand: FrameId,
    /// Number of frames the hand cycles over
    num_frames: usize,
    /// Total frames inspected over the hand's lifetime
    steps: u64,
}

impl ClockHand {
    /// Creates a hand parked on the last frame, so the first advance lands on frame 0
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "clock needs at least one frame");
        Self {
            hand: num_frames - 1,
            num_frames,
            steps: 0,
        }
    }

    /// Current position
    #[inline]
    pub fn position(&self) -> FrameId {
        self.hand
    }

    /// Total frames inspected so far
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Moves the hand one frame forward and returns the new position
    #[inline]
    pub fn advance(&mut self) -> FrameId {
        self.hand = (self.hand + 1) % self.num_frames;
        self.steps += 1;
        self.hand
    }

    /// Finds the next frame to reuse.
    ///
    /// Only reference bits are modified; evicting a victim is left to the caller.
    pub fn sweep(&mut self, frames: &mut FrameTable) -> SweepOutcome {
        debug_assert_eq!(frames.len(), self.num_frames);

        let mut inspected = 0usize;
        let mut saw_unpinned = false;
        loop {
            let frame_id = self.advance();
            inspected += 1;

            let desc = frames.desc(frame_id);
            if !desc.is_valid() {
                log::trace!("clock: frame {} is free", frame_id);
                return SweepOutcome::Free(frame_id);
            }

            let unpinned = desc.can_evict();
            saw_unpinned |= unpinned;

            if desc.is_referenced() {
                frames.set_referenced(frame_id, false);
            } else if unpinned {
                log::trace!("clock: frame {} selected as victim", frame_id);
                return SweepOutcome::Victim(frame_id);
            }

            if inspected % self.num_frames == 0 {
                if !saw_unpinned {
                    log::trace!("clock: full revolution without an unpinned frame");
                    return SweepOutcome::Exhausted;
                }
                saw_unpinned = false;
            }
        }
    }
}
