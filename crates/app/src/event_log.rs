//! Bounded in-memory log of device value notifications.

use std::collections::VecDeque;

use scripthub_domain::event::DeviceEvent;

/// How many notifications the log keeps.
pub const EVENT_LOG_CAPACITY: usize = 1000;

/// Ring buffer of the most recent [`DeviceEvent`]s plus a lifetime counter.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<DeviceEvent>,
    capacity: usize,
    total: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn add(&mut self, event: DeviceEvent) {
        self.entries.push_back(event);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.total += 1;
    }

    /// Number of entries ever added, including evicted ones.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &DeviceEvent> {
        self.entries.iter()
    }

    /// Up to `limit` retained entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<DeviceEvent> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripthub_domain::device::ParamRef;

    fn event(n: u32) -> DeviceEvent {
        let ts = scripthub_domain::time::now();
        DeviceEvent {
            time: ts,
            time_changed: ts,
            param: ParamRef::new("LEQ0000001", "LEQ0000001:1", "LEVEL"),
            value: serde_json::json!(n),
            formatted_value: n.to_string(),
        }
    }

    #[test]
    fn should_start_empty() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.total_count(), 0);
    }

    #[test]
    fn should_keep_insertion_order() {
        let mut log = EventLog::new();
        log.add(event(1));
        log.add(event(2));
        let values: Vec<&str> = log.entries().map(|e| e.formatted_value.as_str()).collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn should_evict_oldest_when_capacity_is_exceeded() {
        let mut log = EventLog::new();
        for n in 0..1001 {
            log.add(event(n));
        }
        assert_eq!(log.len(), 1000);
        assert_eq!(log.total_count(), 1001);
        assert_eq!(log.entries().next().unwrap().formatted_value, "1");
    }

    #[test]
    fn should_return_recent_entries_newest_first() {
        let mut log = EventLog::with_capacity(3);
        for n in 0..5 {
            log.add(event(n));
        }
        let values: Vec<String> = log
            .recent(2)
            .into_iter()
            .map(|e| e.formatted_value)
            .collect();
        assert_eq!(values, vec!["4", "3"]);
    }

    #[test]
    fn should_return_everything_when_limit_exceeds_length() {
        let mut log = EventLog::new();
        log.add(event(1));
        assert_eq!(log.recent(50).len(), 1);
    }
}
