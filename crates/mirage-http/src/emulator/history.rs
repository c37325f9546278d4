//! Bounded per-request-type history of served application requests.

use super::types::RequestSnapshot;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Number of requests kept per request type unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Fixed-capacity buffer that drops its oldest entry on overflow.
#[derive(Debug)]
struct RingBuffer {
    entries: VecDeque<RequestSnapshot>,
    capacity: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, snapshot: RequestSnapshot) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    fn pop_newest(&mut self) -> Option<RequestSnapshot> {
        self.entries.pop_back()
    }
}

/// Per-request-type history; each operation is atomic on its own.
#[derive(Debug)]
pub struct RequestHistoryStore {
    capacity: usize,
    buffers: Mutex<HashMap<String, RingBuffer>>,
}

impl RequestHistoryStore {
    /// Create a store keeping at most `capacity` requests per type.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a request, evicting the oldest one for that type when full.
    pub fn record(&self, request_type: &str, snapshot: RequestSnapshot) {
        let mut buffers = self.buffers.lock();
        buffers
            .entry(request_type.to_string())
            .or_insert_with(|| RingBuffer::new(self.capacity))
            .push(snapshot);
    }

    /// Remove and return the most recent request of a type.
    pub fn take_last(&self, request_type: &str) -> Option<RequestSnapshot> {
        self.buffers
            .lock()
            .get_mut(request_type)
            .and_then(RingBuffer::pop_newest)
    }

    /// Drop all history for all request types.
    pub fn clear(&self) {
        self.buffers.lock().clear();
    }

    /// Number of requests currently held for a type.
    pub fn len(&self, request_type: &str) -> usize {
        self.buffers
            .lock()
            .get(request_type)
            .map(|b| b.entries.len())
            .unwrap_or(0)
    }
}

impl Default for RequestHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
