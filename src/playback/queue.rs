use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::AudioKind;

/// One inbound utterance waiting to be played.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioItem {
    pub kind: AudioKind,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<AudioItem>,
    tag: Option<AudioKind>,
}

/// FIFO of audio items plus the one-shot kind tag for the next enqueue.
///
/// Both live behind the same lock so a producer on another thread can tag and
/// enqueue while the sequencer pops.
#[derive(Debug, Default)]
pub struct AudioQueue {
    inner: Mutex<Inner>,
}

impl AudioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tags the next enqueued item. A second tag before that replaces the first.
    pub fn set_tag(&self, kind: AudioKind) {
        let mut inner = self.lock();
        if let Some(previous) = inner.tag.replace(kind) {
            tracing::debug!("audio tag {:?} replaced by {:?} before use", previous, kind);
        }
    }

    /// Appends a payload, consuming the pending tag. Returns the kind the item
    /// was given.
    pub fn enqueue(&self, payload: Vec<u8>) -> AudioKind {
        let mut inner = self.lock();
        let kind = inner.tag.take().unwrap_or_default();
        tracing::debug!(
            "queued {:?} audio ({} bytes), {} ahead",
            kind,
            payload.len(),
            inner.items.len()
        );
        inner.items.push_back(AudioItem { kind, payload });
        kind
    }

    pub fn pop(&self) -> Option<AudioItem> {
        self.lock().items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}
