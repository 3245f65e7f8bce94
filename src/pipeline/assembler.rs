//! Reassembles a queue of variably sized chunks into a continuous byte stream.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use super::BoundedChunkQueue;
use crate::Chunk;

/// Consumer-side position within the chunk stream.
#[derive(Default)]
struct Cursor {
    current: Option<Chunk>,
    offset: usize,
}

/// A bounded chunk queue plus the consumer's position inside the current chunk.
///
/// Producers call [`push`](Self::push). The single consumer takes
/// [`lock`](Self::lock) and walks the stream through the returned
/// [`AssemblerGuard`], crossing chunk boundaries with
/// [`advance_if_exhausted`](AssemblerGuard::advance_if_exhausted). Input and
/// output paths share this type so both cut the stream the same way.
pub struct ChunkAssembler {
    queue: BoundedChunkQueue<Chunk>,
    cursor: Mutex<Cursor>,
    exhausted: AtomicBool,
}

impl ChunkAssembler {
    /// Creates an assembler over a queue of depth `max_queue`.
    pub fn new(max_queue: usize) -> Self {
        Self {
            queue: BoundedChunkQueue::new(max_queue),
            cursor: Mutex::new(Cursor::default()),
            exhausted: AtomicBool::new(false),
        }
    }

    /// Queues a chunk, blocking while the queue is full.
    pub fn push(&self, chunk: Chunk) {
        self.queue.enqueue(chunk);
    }

    /// Signals the queue to drain.
    pub fn quit(&self) {
        self.queue.quit();
    }

    /// Returns `false` once the queue has been told to drain.
    pub fn is_active(&self) -> bool {
        self.queue.is_active()
    }

    /// Returns the number of chunks waiting in the queue, excluding the current one.
    pub fn queued(&self) -> usize {
        self.queue.size()
    }

    /// Discards every queued chunk. The current chunk, if any, is kept.
    pub fn flush(&self) -> usize {
        self.queue.clear()
    }

    /// Returns `true` once the consumer has observed the end of the stream.
    ///
    /// Never blocks, even while the consumer waits inside the queue.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Locks the consumer side.
    pub fn lock(&self) -> AssemblerGuard<'_> {
        AssemblerGuard {
            queue: &self.queue,
            cursor: self.cursor.lock(),
            exhausted: &self.exhausted,
        }
    }
}

/// Exclusive consumer access to a [`ChunkAssembler`].
pub struct AssemblerGuard<'a> {
    queue: &'a BoundedChunkQueue<Chunk>,
    cursor: MutexGuard<'a, Cursor>,
    exhausted: &'a AtomicBool,
}

impl AssemblerGuard<'_> {
    /// Ensures a current chunk with unread bytes, fetching the next one if needed.
    ///
    /// Blocks while the queue is active and empty. Returns `false` when the
    /// queue has drained; the assembler is then exhausted for good.
    pub fn advance_if_exhausted(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        if self.current_offset() < self.current_length() {
            return true;
        }

        // Zero-length chunks carry nothing; skip them.
        loop {
            match self.queue.dequeue() {
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => {
                    self.cursor.current = Some(chunk);
                    self.cursor.offset = 0;
                    return true;
                }
                None => {
                    self.cursor.current = None;
                    self.cursor.offset = 0;
                    self.exhausted.store(true, Ordering::Release);
                    tracing::debug!("chunk stream drained");
                    return false;
                }
            }
        }
    }

    /// Returns the bytes of the current chunk, or an empty slice.
    pub fn current_buffer(&self) -> &[u8] {
        self.cursor
            .current
            .as_ref()
            .map_or(&[][..], Chunk::as_bytes)
    }

    /// Returns the length of the current chunk.
    pub fn current_length(&self) -> usize {
        self.cursor.current.as_ref().map_or(0, Chunk::len)
    }

    /// Returns the read position inside the current chunk.
    pub fn current_offset(&self) -> usize {
        self.cursor.offset
    }

    /// Moves the read position forward, never past the end of the current chunk.
    pub fn advance_offset(&mut self, n: usize) {
        let length = self.current_length();
        self.cursor.offset = (self.cursor.offset + n).min(length);
    }

    /// Returns `true` once the stream has drained.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }
}
