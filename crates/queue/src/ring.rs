//! Growable circular buffer used as the default pending-task FIFO.
//!
//! Capacity is always a power of two so that index wraparound is a mask
//! instead of a modulo. The buffer doubles before a push would take it past
//! two thirds occupancy; growing copies the live elements out in logical
//! order, so a wrapped run `[.., tail | head ..]` becomes contiguous again.

use std::fmt;

/// Smallest capacity the buffer is ever allocated with.
pub const MIN_CAPACITY: usize = 4;

/// FIFO ring buffer with amortized O(1) `push_back` / `pop_front`.
pub struct RingQueue<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingQueue<T> {
    /// Create an empty queue with the minimum capacity.
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Create an empty queue able to hold at least `capacity` slots.
    ///
    /// The actual capacity is rounded up to the next power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY).next_power_of_two();
        Self {
            slots: empty_slots(capacity),
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated (always a power of two).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append an element at the tail.
    pub fn push_back(&mut self, value: T) {
        if (self.len + 1) * 3 > self.capacity() * 2 {
            self.grow();
        }
        let tail = (self.head + self.len) & self.mask();
        self.slots[tail] = Some(value);
        self.len += 1;
    }

    /// Remove and return the element at the head, if any.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) & self.mask();
        self.len -= 1;
        if self.len == 0 {
            self.head = 0;
        }
        value
    }

    /// Peek at the element that `pop_front` would return.
    pub fn front(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            self.slots[self.head].as_ref()
        }
    }

    /// Drop every queued element, keeping the allocation.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    /// Iterate from head to tail without consuming.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mask = self.mask();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) & mask].as_ref())
    }

    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    fn grow(&mut self) {
        let new_capacity = self.capacity() * 2;
        let mut slots = empty_slots(new_capacity);
        let mask = self.mask();
        for (i, slot) in slots.iter_mut().take(self.len).enumerate() {
            *slot = self.slots[(self.head + i) & mask].take();
        }
        self.slots = slots;
        self.head = 0;
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Option<T>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || None);
    slots
}

impl<T> Default for RingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for RingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
