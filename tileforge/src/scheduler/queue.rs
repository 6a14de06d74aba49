//! Indexed priority queue for pending jobs.
//!
//! Jobs are ordered by priority (lower values first), then by enqueue order
//! (FIFO within the same priority). Unlike `std::collections::BinaryHeap`,
//! the queue tracks the heap position of every job so a pending job's
//! priority can be changed or the job removed in O(log n):
//!
//! ```text
//!   positions: JobId ──► heap index
//!   heap:      [ (priority, sequence, id) ... ]   min-heap
//! ```
//!
//! A changed priority keeps the job's original sequence number, so a job
//! promoted to an existing priority level still runs before the jobs that
//! were enqueued after it.

use std::collections::HashMap;

use crate::job::JobId;

// =============================================================================
// Heap Entry
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    id: JobId,
    priority: i32,
    sequence: u64,
}

impl HeapEntry {
    fn sort_key(&self) -> (i32, u64) {
        (self.priority, self.sequence)
    }
}

// =============================================================================
// Pending Queue
// =============================================================================

/// Min-heap of job identities with O(log n) decrease-key and removal.
///
/// The queue is not thread-safe; the scheduler wraps it in a mutex.
#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: Vec<HeapEntry>,
    positions: HashMap<JobId, usize>,
    next_sequence: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job. Returns `false` and leaves the queue unchanged if the job
    /// is already queued.
    pub fn push(&mut self, id: JobId, priority: i32) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let index = self.heap.len();
        self.heap.push(HeapEntry {
            id,
            priority,
            sequence,
        });
        self.positions.insert(id, index);
        self.sift_up(index);
        true
    }

    /// Removes and returns the most urgent job and its priority.
    pub fn pop(&mut self) -> Option<(JobId, i32)> {
        let id = self.heap.first()?.id;
        self.remove(id).map(|priority| (id, priority))
    }

    /// Returns the most urgent job without removing it.
    pub fn peek(&self) -> Option<(JobId, i32)> {
        self.heap.first().map(|e| (e.id, e.priority))
    }

    /// Sets a queued job's priority. Returns the previous priority, or `None`
    /// if the job is not queued.
    pub fn change_priority(&mut self, id: JobId, priority: i32) -> Option<i32> {
        let index = *self.positions.get(&id)?;
        let previous = self.heap[index].priority;
        self.heap[index].priority = priority;
        self.restore(index);
        Some(previous)
    }

    /// Removes a job. Returns its priority, or `None` if it was not queued.
    pub fn remove(&mut self, id: JobId) -> Option<i32> {
        let index = self.positions.remove(&id)?;
        let last = self.heap.len() - 1;
        self.heap.swap(index, last);
        let removed = self.heap.pop()?;

        if index < self.heap.len() {
            self.positions.insert(self.heap[index].id, index);
            self.restore(index);
        }
        Some(removed.priority)
    }

    pub fn priority_of(&self, id: JobId) -> Option<i32> {
        self.positions.get(&id).map(|&index| self.heap[index].priority)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes every job, returning their identities in arbitrary order.
    pub fn drain(&mut self) -> Vec<JobId> {
        self.positions.clear();
        self.heap.drain(..).map(|e| e.id).collect()
    }

    fn restore(&mut self, index: usize) {
        let index = self.sift_up(index);
        self.sift_down(index);
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].sort_key() >= self.heap[parent].sort_key() {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.heap[left].sort_key() < self.heap[smallest].sort_key() {
                smallest = left;
            }
            if right < len && self.heap[right].sort_key() < self.heap[smallest].sort_key() {
                smallest = right;
            }
            if smallest == index {
                return;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].id, a);
        self.positions.insert(self.heap[b].id, b);
    }
}

// =============================================================================
// Tests
// =============================================================================
