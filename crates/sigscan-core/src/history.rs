use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ScanResult, Symbol, Timeframe, UtcDateTime};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// One completed scan as remembered by the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: Uuid,
    pub symbols: Vec<Symbol>,
    pub timeframes: Vec<Timeframe>,
    pub results: Vec<ScanResult>,
    pub timestamp: UtcDateTime,
}

impl SessionEntry {
    pub fn new(symbols: Vec<Symbol>, timeframes: Vec<Timeframe>, results: Vec<ScanResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbols,
            timeframes,
            results,
            timestamp: UtcDateTime::now(),
        }
    }
}

/// Bounded scan log. The oldest entry is evicted once capacity is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    capacity: usize,
    entries: VecDeque<SessionEntry>,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SessionHistory {
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry and returns its id.
    pub fn record(&mut self, entry: SessionEntry) -> Uuid {
        let id = entry.id;
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        id
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &SessionEntry> {
        self.entries.iter().rev()
    }

    pub fn latest(&self) -> Option<&SessionEntry> {
        self.entries.back()
    }

    pub fn get(&self, id: Uuid) -> Option<&SessionEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str) -> SessionEntry {
        SessionEntry::new(
            vec![Symbol::parse(symbol).expect("valid")],
            vec![Timeframe::parse("1h").expect("valid")],
            Vec::new(),
        )
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut history = SessionHistory::with_capacity(2);
        let first = history.record(entry("AAA"));
        history.record(entry("BBB"));
        let third = history.record(entry("CCC"));

        assert_eq!(history.len(), 2);
        assert!(history.get(first).is_none());
        assert_eq!(history.latest().map(|e| e.id), Some(third));

        let order: Vec<String> = history.entries().map(|e| e.symbols[0].to_string()).collect();
        assert_eq!(order, vec!["CCC", "BBB"]);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut history = SessionHistory::default();
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
        history.record(entry("AAA"));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn survives_a_json_round_trip() {
        let mut history = SessionHistory::with_capacity(3);
        let id = history.record(entry("BTCUSDT"));
        let json = serde_json::to_string(&history).expect("serialize");
        let restored: SessionHistory = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.get(id).map(|e| e.symbols.clone()), history.get(id).map(|e| e.symbols.clone()));
    }
}
