use std::sync::Arc;

use crate::foundation::core::{Eyes, Frame};

/// How a queued picture unit reaches its reel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueItemKind {
    /// Newly encoded bytes.
    Full,
    /// Bytes already correct on disk.
    Fake,
    /// Copy of the previous frame.
    Repeat,
}

/// Sort key of a queued picture unit. Ordering is `(reel, frame, eyes)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    /// Target reel.
    pub reel: usize,
    /// Frame within the reel.
    pub frame: Frame,
    /// Picture channel.
    pub eyes: Eyes,
}

/// Payload of a queued picture unit.
#[derive(Clone, Debug)]
pub struct QueueItem {
    /// How the unit is committed.
    pub kind: QueueItemKind,
    /// Encoded bytes of a FULL unit; `None` when not needed or while spilled to disk.
    pub encoded: Option<Arc<[u8]>>,
    /// Byte size (the recorded size for FAKE, the payload size for FULL).
    pub size: u64,
}

impl QueueItem {
    /// FULL unit holding `data` in memory.
    pub fn full(data: Arc<[u8]>) -> Self {
        Self {
            kind: QueueItemKind::Full,
            size: data.len() as u64,
            encoded: Some(data),
        }
    }

    /// FAKE unit of `size` bytes.
    pub fn fake(size: u64) -> Self {
        Self {
            kind: QueueItemKind::Fake,
            encoded: None,
            size,
        }
    }

    /// REPEAT unit.
    pub fn repeat() -> Self {
        Self {
            kind: QueueItemKind::Repeat,
            encoded: None,
            size: 0,
        }
    }

    /// Return `true` for a FULL unit whose bytes are currently in memory.
    pub fn in_memory(&self) -> bool {
        self.kind == QueueItemKind::Full && self.encoded.is_some()
    }
}

/// Per-reel cursor naming the last picture unit committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastWritten {
    frame: Frame,
    eyes: Eyes,
}

impl Default for LastWritten {
    fn default() -> Self {
        Self {
            frame: -1,
            eyes: Eyes::Right,
        }
    }
}

impl LastWritten {
    /// Last committed frame, `-1` before the first.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Return `true` if `key` is the unit that must be committed next.
    ///
    /// 2D units follow each other frame by frame; 3D units alternate left then right.
    pub fn next(&self, key: &QueueKey) -> bool {
        match key.eyes {
            Eyes::Both => key.frame == self.frame + 1,
            Eyes::Left => self.eyes == Eyes::Right && key.frame == self.frame + 1,
            Eyes::Right => self.eyes == Eyes::Left && key.frame == self.frame,
        }
    }

    /// Return `true` if `key` has already been committed.
    pub fn is_past(&self, key: &QueueKey) -> bool {
        match key.frame.cmp(&self.frame) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.eyes != Eyes::Left || key.eyes != Eyes::Right,
        }
    }

    /// Advance the cursor past `key`.
    pub fn update(&mut self, key: &QueueKey) {
        self.frame = key.frame;
        self.eyes = key.eyes;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/writer/queue.rs"]
mod tests;
