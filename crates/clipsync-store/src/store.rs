//! Keyed record store abstraction.
//!
//! The relay needs very little from its store: opaque records by key,
//! a sorted per-user index for time-ordered retrieval, TTLs on both,
//! and the ability to apply several writes as one atomic unit. The
//! trait mirrors that surface so backends can be swapped; the shipped
//! backend is an in-process table.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Result;

/// One mutation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Store (or replace) a record, optionally bounded by a TTL.
    PutRecord {
        key: String,
        value: Vec<u8>,
        ttl: Option<Duration>,
    },

    /// Remove a record; removing a missing key is not an error.
    DeleteRecord { key: String },

    /// Insert a member into a sorted index. A TTL refreshes the
    /// expiry of the whole index.
    IndexInsert {
        index: String,
        score: i64,
        member: String,
        ttl: Option<Duration>,
    },

    /// Remove a member from a sorted index.
    IndexRemove { index: String, member: String },
}

/// Minimal keyed store contract required by the relay.
///
/// `apply` is the only write path; a batch of [`WriteOp`]s must be
/// applied atomically so that a record and its index entry can never
/// be observed half-written.
pub trait RecordStore: Send + Sync {
    /// Fetch a record, treating an expired record as absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply a batch of writes as one atomic unit.
    fn apply(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Return up to `limit` members of a sorted index in descending
    /// `(score, member)` order.
    fn index_rev_range(&self, index: &str, limit: usize) -> Result<Vec<String>>;
}

struct Record {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

struct SortedIndex {
    // (score, member); iteration in reverse yields newest first,
    // ties resolved by the member string.
    entries: BTreeSet<(i64, String)>,
    expires_at: Option<Instant>,
}

struct Inner {
    records: HashMap<String, Record>,
    indexes: HashMap<String, SortedIndex>,
    // Test-controlled offset added to the wall clock.
    skew: Duration,
}

/// In-process [`RecordStore`] backend.
///
/// All state lives behind one mutex, which is what makes `apply`
/// trivially atomic. Expiry is lazy: reads treat anything past its
/// deadline as absent.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                indexes: HashMap::new(),
                skew: Duration::ZERO,
            }),
        }
    }

    /// Shift the store's notion of "now" forward. Lets tests cross TTL
    /// boundaries without sleeping.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.lock();
        inner.skew += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-batch; the table may hold a
        // partial batch, so refuse to continue rather than serve it.
        self.inner.lock().unwrap_or_else(|e| {
            panic!("record store mutex poisoned: {e}");
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn now(&self) -> Instant {
        Instant::now() + self.skew
    }

    fn record_live(&self, record: &Record) -> bool {
        record.expires_at.map_or(true, |at| self.now() < at)
    }

    fn index_live(&self, index: &SortedIndex) -> bool {
        index.expires_at.map_or(true, |at| self.now() < at)
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.lock();
        match inner.records.get(key) {
            Some(record) if inner.record_live(record) => Ok(Some(record.value.clone())),
            _ => Ok(None),
        }
    }

    fn apply(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut inner = self.lock();
        let now = inner.now();

        for op in ops {
            match op {
                WriteOp::PutRecord { key, value, ttl } => {
                    inner.records.insert(
                        key,
                        Record {
                            value,
                            expires_at: ttl.map(|d| now + d),
                        },
                    );
                }
                WriteOp::DeleteRecord { key } => {
                    inner.records.remove(&key);
                }
                WriteOp::IndexInsert {
                    index,
                    score,
                    member,
                    ttl,
                } => {
                    // An expired index is a fresh one.
                    let live = inner
                        .indexes
                        .get(&index)
                        .map(|i| i.expires_at.map_or(true, |at| now < at))
                        .unwrap_or(false);
                    let entry = inner.indexes.entry(index).or_insert_with(|| SortedIndex {
                        entries: BTreeSet::new(),
                        expires_at: None,
                    });
                    if !live {
                        entry.entries.clear();
                    }
                    entry.entries.insert((score, member));
                    if let Some(d) = ttl {
                        entry.expires_at = Some(now + d);
                    }
                }
                WriteOp::IndexRemove { index, member } => {
                    if let Some(entry) = inner.indexes.get_mut(&index) {
                        entry.entries.retain(|(_, m)| m != &member);
                    }
                }
            }
        }

        Ok(())
    }

    fn index_rev_range(&self, index: &str, limit: usize) -> Result<Vec<String>> {
        let inner = self.lock();
        let Some(entry) = inner.indexes.get(index) else {
            return Ok(Vec::new());
        };
        if !inner.index_live(entry) {
            return Ok(Vec::new());
        }
        Ok(entry
            .entries
            .iter()
            .rev()
            .take(limit)
            .map(|(_, member)| member.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: &str, value: &[u8], ttl: Option<Duration>) -> WriteOp {
        WriteOp::PutRecord {
            key: key.to_string(),
            value: value.to_vec(),
            ttl,
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryStore::new();
        store.apply(vec![put("k", b"v", None)]).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_record_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .apply(vec![put("k", b"v", Some(Duration::from_secs(60)))])
            .unwrap();

        store.advance(Duration::from_secs(59));
        assert!(store.get("k").unwrap().is_some());

        store.advance(Duration::from_secs(2));
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_index_rev_range_orders_by_score_then_member() {
        let store = MemoryStore::new();
        for (score, member) in [(1, "a"), (3, "b"), (2, "c"), (3, "a")] {
            store
                .apply(vec![WriteOp::IndexInsert {
                    index: "idx".to_string(),
                    score,
                    member: member.to_string(),
                    ttl: None,
                }])
                .unwrap();
        }

        let members = store.index_rev_range("idx", 10).unwrap();
        assert_eq!(members, vec!["b", "a", "c", "a"]);
    }

    #[test]
    fn test_index_rev_range_limit() {
        let store = MemoryStore::new();
        for score in 0..5 {
            store
                .apply(vec![WriteOp::IndexInsert {
                    index: "idx".to_string(),
                    score,
                    member: format!("m{score}"),
                    ttl: None,
                }])
                .unwrap();
        }
        assert_eq!(store.index_rev_range("idx", 2).unwrap(), vec!["m4", "m3"]);
    }

    #[test]
    fn test_index_ttl_refresh() {
        let store = MemoryStore::new();
        let insert = |member: &str| WriteOp::IndexInsert {
            index: "idx".to_string(),
            score: 0,
            member: member.to_string(),
            ttl: Some(Duration::from_secs(10)),
        };

        store.apply(vec![insert("old")]).unwrap();
        store.advance(Duration::from_secs(8));
        // Refreshes the whole index expiry.
        store.apply(vec![insert("new")]).unwrap();
        store.advance(Duration::from_secs(8));

        let members = store.index_rev_range("idx", 10).unwrap();
        assert!(members.contains(&"old".to_string()));
        assert!(members.contains(&"new".to_string()));

        store.advance(Duration::from_secs(3));
        assert!(store.index_rev_range("idx", 10).unwrap().is_empty());
    }

    #[test]
    fn test_atomic_batch_applies_all() {
        let store = MemoryStore::new();
        store
            .apply(vec![
                put("body", b"data", None),
                WriteOp::IndexInsert {
                    index: "idx".to_string(),
                    score: 1,
                    member: "body".to_string(),
                    ttl: None,
                },
            ])
            .unwrap();

        assert!(store.get("body").unwrap().is_some());
        assert_eq!(store.index_rev_range("idx", 1).unwrap(), vec!["body"]);
    }

    #[test]
    fn test_delete_and_index_remove() {
        let store = MemoryStore::new();
        store
            .apply(vec![
                put("k", b"v", None),
                WriteOp::IndexInsert {
                    index: "idx".to_string(),
                    score: 1,
                    member: "k".to_string(),
                    ttl: None,
                },
            ])
            .unwrap();

        store
            .apply(vec![
                WriteOp::DeleteRecord {
                    key: "k".to_string(),
                },
                WriteOp::IndexRemove {
                    index: "idx".to_string(),
                    member: "k".to_string(),
                },
            ])
            .unwrap();

        assert!(store.get("k").unwrap().is_none());
        assert!(store.index_rev_range("idx", 10).unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemoryStore::new();
        store
            .apply(vec![WriteOp::DeleteRecord {
                key: "nothing".to_string(),
            }])
            .unwrap();
    }
}
