//! Short-lived cache of recently seen output chunks.
//!
//! The backend occasionally re-emits the same buffer; a chunk identical to
//! one admitted within the window is dropped.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct OutputDeduper {
    window: Duration,
    seen: VecDeque<(String, Instant)>,
}

impl OutputDeduper {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: VecDeque::new(),
        }
    }

    /// Whether `chunk` should be shown; remembers it when it is.
    pub fn admit(&mut self, chunk: &str) -> bool {
        let now = Instant::now();
        self.expire(now);
        if self.seen.iter().any(|(seen, _)| seen == chunk) {
            return false;
        }
        self.seen.push_back((chunk.to_string(), now));
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    fn expire(&mut self, now: Instant) {
        while let Some((_, at)) = self.seen.front() {
            if now.duration_since(*at) < self.window {
                break;
            }
            self.seen.pop_front();
        }
    }
}
