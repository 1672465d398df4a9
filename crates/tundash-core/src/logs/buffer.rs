// ── Bounded log ring buffer ──

use std::collections::VecDeque;
use std::sync::Arc;

use crate::model::LogEntry;

/// FIFO ring of log lines. Never holds more than `capacity` entries;
/// pushing into a full buffer evicts the oldest.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<Arc<LogEntry>>,
    capacity: usize,
    evicted_total: u64,
}

impl LogBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted_total: 0,
        }
    }

    /// Append an entry, returning the evicted one if the buffer was full.
    pub fn push(&mut self, entry: Arc<LogEntry>) -> Option<Arc<LogEntry>> {
        let evicted = if self.entries.len() >= self.capacity {
            self.evicted_total += 1;
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries evicted since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    pub fn get(&self, index: usize) -> Option<&Arc<LogEntry>> {
        self.entries.get(index)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<LogEntry>> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(n: usize) -> Arc<LogEntry> {
        Arc::new(LogEntry {
            timestamp: None,
            source: "c1".into(),
            stream: None,
            content: format!("line {n}"),
        })
    }

    #[test]
    fn five_thousand_appends_keep_the_newest_thousand() {
        let mut buffer = LogBuffer::new(1000);
        let mut evicted = Vec::new();

        for n in 0..5000 {
            if let Some(old) = buffer.push(entry(n)) {
                evicted.push(old.content.clone());
            }
            assert!(buffer.len() <= 1000);
        }

        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.evicted_total(), 4000);
        assert_eq!(evicted.len(), 4000);
        assert!(evicted.iter().enumerate().all(|(n, c)| *c == format!("line {n}")));
        assert_eq!(buffer.get(0).unwrap().content, "line 4000");
        assert_eq!(buffer.iter().last().unwrap().content, "line 4999");
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = LogBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.push(entry(0)).is_none());
        assert_eq!(buffer.push(entry(1)).unwrap().content, "line 0");
        assert_eq!(buffer.len(), 1);
    }
}
