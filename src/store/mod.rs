//! Bounded, durable history of classified events.
//!
//! The store keeps the most recent `capacity` events in arrival order
//! and evicts the oldest entry exactly when a new append would exceed
//! capacity. `append` is the only mutator; a mutex guards the whole
//! append-evict-persist sequence, so no observer ever sees the store
//! above capacity. Reads return snapshots, so concurrent appends can
//! never corrupt an iterating reader.
//!
//! Durability is write-through and best-effort: each append rewrites
//! the backing file, and a failed write is logged without rolling back
//! the in-memory append. In-memory state is authoritative for the
//! lifetime of the process; a restart reloads the last `capacity`
//! entries from the file.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::webhooks::{Event, EventId};

pub mod persist;

pub use persist::PersistError;

/// Append-only bounded event history with write-through persistence.
pub struct EventStore {
    path: PathBuf,
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    events: VecDeque<Event>,
    next_id: u64,
}

impl EventStore {
    /// Opens a store backed by `path`, reloading surviving history.
    ///
    /// Only the most recent `capacity` persisted events are kept. A
    /// corrupt backing file is logged and treated as empty history; it
    /// will be overwritten by the next append.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> EventStore {
        let path = path.into();
        let mut events = match persist::load_events(&path) {
            Ok(events) => events,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not load event history, starting empty");
                Vec::new()
            }
        };

        if events.len() > capacity {
            events.drain(..events.len() - capacity);
        }

        let next_id = events.iter().map(|e| e.id.0 + 1).max().unwrap_or(0);

        EventStore {
            path,
            capacity,
            inner: Mutex::new(Inner {
                events: VecDeque::from(events),
                next_id,
            }),
        }
    }

    /// Appends an event, assigning it the next monotonic id.
    ///
    /// Evicts the oldest entry when the store is full, then writes the
    /// retained history through to the backing file. A write failure
    /// is logged; the in-memory append stands regardless.
    ///
    /// Returns the event as stored (with its assigned id).
    pub fn append(&self, mut event: Event) -> Event {
        let mut inner = self.inner.lock().expect("event store lock poisoned");

        event.id = EventId(inner.next_id);
        inner.next_id += 1;

        inner.events.push_back(event.clone());
        while inner.events.len() > self.capacity {
            inner.events.pop_front();
        }

        // Write-through happens under the lock so the file never holds
        // a newer snapshot than a concurrent appender is about to write.
        let snapshot: Vec<Event> = inner.events.iter().cloned().collect();
        if let Err(e) = persist::save_events(&self.path, &snapshot) {
            warn!(
                path = %self.path.display(),
                event_id = %event.id,
                error = %e,
                "event history write failed, continuing with in-memory state"
            );
        }

        event
    }

    /// Returns a snapshot of stored events, oldest first.
    ///
    /// With a `limit`, only the most recent `limit` events are returned
    /// (still oldest first).
    pub fn list(&self, limit: Option<usize>) -> Vec<Event> {
        let inner = self.inner.lock().expect("event store lock poisoned");
        let skip = match limit {
            Some(n) if n < inner.events.len() => inner.events.len() - n,
            _ => 0,
        };
        inner.events.iter().skip(skip).cloned().collect()
    }

    /// Returns the most recently appended event, if any.
    pub fn latest(&self) -> Option<Event> {
        let inner = self.inner.lock().expect("event store lock poisoned");
        inner.events.back().cloned()
    }

    /// Current number of retained events.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("event store lock poisoned");
        inner.events.len()
    }

    /// True when no events are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    use crate::webhooks::classify;

    fn event(tag: &str) -> Event {
        let payload = json!({
            "repository": { "full_name": format!("octo/{tag}") },
            "sender": { "login": "octocat" }
        });
        classify("push", &payload, Utc::now())
    }

    #[test]
    fn append_assigns_monotonic_ids() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("events.json"), 10);

        let a = store.append(event("a"));
        let b = store.append(event("b"));
        let c = store.append(event("c"));

        assert_eq!(a.id, EventId(0));
        assert_eq!(b.id, EventId(1));
        assert_eq!(c.id, EventId(2));
    }

    #[test]
    fn capacity_evicts_oldest_in_fifo_order() {
        let dir = tempdir().unwrap();
        let capacity = 10;
        let store = EventStore::open(dir.path().join("events.json"), capacity);

        // Capacity N, append N+5: exactly the last N survive, in order.
        for i in 0..capacity + 5 {
            store.append(event(&format!("repo-{i}")));
        }

        let events = store.list(None);
        assert_eq!(events.len(), capacity);
        for (offset, event) in events.iter().enumerate() {
            assert_eq!(event.repository, format!("octo/repo-{}", offset + 5));
        }
    }

    #[test]
    fn list_limit_returns_most_recent() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("events.json"), 10);

        for i in 0..5 {
            store.append(event(&format!("repo-{i}")));
        }

        let events = store.list(Some(2));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].repository, "octo/repo-3");
        assert_eq!(events[1].repository, "octo/repo-4");

        // Limit larger than history returns everything.
        assert_eq!(store.list(Some(100)).len(), 5);
    }

    #[test]
    fn latest_returns_newest_or_none() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path().join("events.json"), 10);

        assert!(store.latest().is_none());

        store.append(event("first"));
        store.append(event("second"));

        assert_eq!(store.latest().unwrap().repository, "octo/second");
    }

    #[test]
    fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");

        {
            let store = EventStore::open(&path, 10);
            store.append(event("a"));
            store.append(event("b"));
        }

        let reopened = EventStore::open(&path, 10);
        let events = reopened.list(None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].repository, "octo/a");
        assert_eq!(events[1].repository, "octo/b");
    }

    #[test]
    fn reopen_continues_id_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");

        {
            let store = EventStore::open(&path, 10);
            store.append(event("a"));
            store.append(event("b"));
        }

        let reopened = EventStore::open(&path, 10);
        let c = reopened.append(event("c"));
        assert_eq!(c.id, EventId(2));
    }

    #[test]
    fn reopen_with_smaller_capacity_keeps_newest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");

        {
            let store = EventStore::open(&path, 10);
            for i in 0..6 {
                store.append(event(&format!("repo-{i}")));
            }
        }

        let reopened = EventStore::open(&path, 3);
        let events = reopened.list(None);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].repository, "octo/repo-3");
    }

    #[test]
    fn corrupt_backing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, b"][ definitely not json").unwrap();

        let store = EventStore::open(&path, 10);
        assert!(store.is_empty());

        // And the next append repairs the file.
        store.append(event("fresh"));
        let reopened = EventStore::open(&path, 10);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn unwritable_backing_path_keeps_in_memory_state() {
        // Point the backing file inside a path that is a file, so every
        // write fails. Appends must still succeed in memory.
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let store = EventStore::open(blocker.join("events.json"), 10);
        store.append(event("a"));
        store.append(event("b"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.latest().unwrap().repository, "octo/b");
    }

    #[test]
    fn concurrent_appends_never_exceed_capacity() {
        let dir = tempdir().unwrap();
        let capacity = 8;
        let store = Arc::new(EventStore::open(dir.path().join("events.json"), capacity));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        store.append(event(&format!("t{t}-{i}")));
                        assert!(store.list(None).len() <= capacity);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), capacity);

        // Ids are unique and the retained ids are the highest assigned.
        let ids: Vec<u64> = store.list(None).iter().map(|e| e.id.0).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), capacity);
        assert_eq!(ids, sorted, "retained events stay in arrival order");
    }

    proptest! {
        /// For any capacity and append count, the store retains exactly
        /// the last min(capacity, appended) events in arrival order.
        #[test]
        fn bounded_fifo_property(capacity in 1usize..20, appended in 0usize..50) {
            let dir = tempdir().unwrap();
            let store = EventStore::open(dir.path().join("events.json"), capacity);

            for i in 0..appended {
                store.append(event(&format!("repo-{i}")));
            }

            let events = store.list(None);
            let expected = appended.min(capacity);
            prop_assert_eq!(events.len(), expected);

            let first_kept = appended - expected;
            for (offset, event) in events.iter().enumerate() {
                prop_assert_eq!(
                    &event.repository,
                    &format!("octo/repo-{}", first_kept + offset)
                );
            }
        }
    }
}
