//! Per-session conversational state: transcript plus snapshot stack.
//!
//! Entries live behind one async mutex each, so turns against the same
//! session are serialized while different sessions proceed concurrently.
//! The store evicts entries idle past a TTL and enforces a capacity bound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::info;

use crate::llm::models::ChatMessage;
use crate::table::Table;

#[derive(Debug)]
pub struct SessionState {
    pub transcript: Vec<ChatMessage>,
    pub stack: Vec<Table>,
}

impl SessionState {
    pub fn new(root: Table) -> Self {
        Self {
            transcript: Vec::new(),
            stack: vec![root],
        }
    }

    /// The active snapshot. The stack never drops below one entry, so this
    /// cannot fail for a state constructed through `new`.
    pub fn current(&self) -> &Table {
        self.stack.last().expect("snapshot stack holds at least the root")
    }

    /// Pushes a new snapshot. When the stack exceeds `max_snapshots` the
    /// oldest non-root entry is pruned so the root always survives. Caps
    /// below two are raised to two: the root and the latest snapshot are
    /// always retained.
    pub fn push_snapshot(&mut self, table: Table, max_snapshots: usize) {
        self.stack.push(table);
        let cap = max_snapshots.max(2);
        if self.stack.len() > cap {
            self.stack.remove(1);
        }
    }

    /// Pops the top snapshot; refuses to pop the root.
    pub fn pop_snapshot(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }
}

pub type SessionHandle = Arc<tokio::sync::Mutex<SessionState>>;

struct Entry {
    handle: SessionHandle,
    last_seen: Instant,
}

pub struct SessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut entries = self.entries.lock().unwrap();
        Self::evict_expired(&mut entries, self.ttl);
        entries.get_mut(id).map(|entry| {
            entry.last_seen = Instant::now();
            entry.handle.clone()
        })
    }

    /// Idempotent per id: a concurrent creator wins and everyone else gets
    /// the same shared entry.
    pub fn get_or_create(&self, id: &str, root: impl FnOnce() -> Table) -> SessionHandle {
        let mut entries = self.entries.lock().unwrap();
        Self::evict_expired(&mut entries, self.ttl);

        if let Some(entry) = entries.get_mut(id) {
            entry.last_seen = Instant::now();
            return entry.handle.clone();
        }

        if entries.len() >= self.capacity {
            Self::evict_oldest(&mut entries);
        }

        info!("Creating session {}", id);
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(SessionState::new(root())));
        entries.insert(
            id.to_string(),
            Entry {
                handle: handle.clone(),
                last_seen: Instant::now(),
            },
        );
        handle
    }

    pub fn remove(&self, id: &str) {
        self.entries.lock().unwrap().remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(entries: &mut HashMap<String, Entry>, ttl: Duration) {
        entries.retain(|_, entry| entry.last_seen.elapsed() < ttl);
    }

    fn evict_oldest(entries: &mut HashMap<String, Entry>) {
        if let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_seen)
            .map(|(id, _)| id.clone())
        {
            info!("Session store at capacity, evicting {}", oldest);
            entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> Table {
        Table::new(vec!["a".into()], vec![vec![json!(1)]])
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = SessionStore::new(Duration::from_secs(60), 8);
        let first = store.get_or_create("s1", root);
        let second = store.get_or_create("s1", || panic!("must not re-create"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_sessions_are_evicted_on_access() {
        let store = SessionStore::new(Duration::from_millis(10), 8);
        store.get_or_create("s1", root);
        std::thread::sleep(Duration::from_millis(25));
        assert!(store.get("s1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn capacity_evicts_the_idlest_session() {
        let store = SessionStore::new(Duration::from_secs(60), 2);
        store.get_or_create("old", root);
        std::thread::sleep(Duration::from_millis(5));
        store.get_or_create("new", root);
        std::thread::sleep(Duration::from_millis(5));
        store.get_or_create("newest", root);
        assert_eq!(store.len(), 2);
        assert!(store.get("old").is_none());
        assert!(store.get("newest").is_some());
    }

    #[test]
    fn stack_floor_is_the_root() {
        let mut state = SessionState::new(root());
        assert!(!state.pop_snapshot());
        state.push_snapshot(root(), 10);
        assert!(state.pop_snapshot());
        assert_eq!(state.stack.len(), 1);
    }

    #[test]
    fn snapshot_cap_prunes_oldest_non_root() {
        let mut state = SessionState::new(Table::new(vec!["a".into()], vec![vec![json!(0)]]));
        for i in 1..=5 {
            state.push_snapshot(Table::new(vec!["a".into()], vec![vec![json!(i)]]), 3);
        }
        assert_eq!(state.stack.len(), 3);
        // Root survives pruning.
        assert_eq!(state.stack[0].rows[0][0], json!(0));
        assert_eq!(state.current().rows[0][0], json!(5));
    }

    #[test]
    fn snapshot_cap_below_two_still_bounds_the_stack() {
        for cap in [0, 1] {
            let mut state = SessionState::new(Table::new(vec!["a".into()], vec![vec![json!(0)]]));
            for i in 1..=4 {
                state.push_snapshot(Table::new(vec!["a".into()], vec![vec![json!(i)]]), cap);
            }
            assert_eq!(state.stack.len(), 2);
            assert_eq!(state.stack[0].rows[0][0], json!(0));
            assert_eq!(state.current().rows[0][0], json!(4));
        }
    }
}
