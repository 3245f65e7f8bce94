//! Bounded blocking FIFO with a drain signal.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

struct QueueState<T> {
    items: VecDeque<T>,
    active: bool,
}

/// A thread-safe bounded FIFO connecting one producer with one consumer.
///
/// Both ends block: producers while the queue is full, consumers while it is
/// empty. [`quit`](Self::quit) turns the queue into drain mode, waking every
/// blocked thread. After that, producers never block and consumers receive
/// the remaining items followed by `None`.
pub struct BoundedChunkQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    max_depth: usize,
}

impl<T> BoundedChunkQueue<T> {
    /// Creates an active queue holding at most `max_depth` items.
    ///
    /// A depth of zero is raised to one.
    pub fn new(max_depth: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(max_depth),
                active: true,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Appends an item, blocking while the queue is active and full.
    ///
    /// Once the queue has quit this never blocks and the item is accepted
    /// even though nobody may consume it.
    pub fn enqueue(&self, item: T) {
        let mut state = self.state.lock();
        while state.active && state.items.len() >= self.max_depth {
            self.not_full.wait(&mut state);
        }
        state.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Removes the front item, blocking while the queue is active and empty.
    ///
    /// Returns `None` once the queue has quit and is empty.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.active && state.items.is_empty() {
            self.not_empty.wait(&mut state);
        }
        let item = state.items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Returns the number of queued items.
    pub fn size(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns the maximum depth.
    pub fn capacity(&self) -> usize {
        self.max_depth
    }

    /// Returns `false` once [`quit`](Self::quit) has been called.
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Switches to drain mode and wakes every blocked producer and consumer.
    pub fn quit(&self) {
        let mut state = self.state.lock();
        state.active = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Drops every queued item and returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let discarded = state.items.len();
        state.items.clear();
        self.not_full.notify_all();
        discarded
    }
}
