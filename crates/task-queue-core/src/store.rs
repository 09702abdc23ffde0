//! Key/value and list primitives the task pipeline is built on.

use crate::{Result, TaskError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Expiring record store with list operations.
///
/// Every call is atomic for the key it touches. Nothing spans keys, so
/// compound operations built on top (load, modify, write) are not atomic.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Read a record, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a record, replacing any previous value and resetting its expiry
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Push onto the head of a list
    async fn lpush(&self, key: &str, value: &str) -> Result<()>;

    /// Pop from the tail of a list, `None` if empty
    async fn rpop(&self, key: &str) -> Result<Option<String>>;

    /// Length of a list, 0 if it does not exist
    async fn llen(&self, key: &str) -> Result<u64>;
}

struct Record {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, Record>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-process store. Expiry follows the tokio clock, so paused-time tests
/// can elapse a record's TTL.
///
/// Records and lists live in separate namespaces: `GET` on a list key reads
/// as absent here, where Redis answers with a WRONGTYPE error.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
    fail_writes: AtomicBool,
    fail_pushes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `set_ex` fail while every other call still succeeds
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `lpush` fail while every other call still succeeds
    pub fn set_fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a record without going through serialization
    pub fn put_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.inner.lock().records.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Snapshot of a list from head to tail
    pub fn list(&self, key: &str) -> Vec<String> {
        self.inner
            .lock()
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live records
    pub fn record_count(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .records
            .values()
            .filter(|r| r.expires_at > now)
            .count()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TaskError::Store("connection refused".to_string()));
        }
        Ok(())
    }

    fn check_flag(&self, flag: &AtomicBool, op: &str) -> Result<()> {
        self.check_online()?;
        if flag.load(Ordering::SeqCst) {
            return Err(TaskError::Store(format!("{} rejected", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check_online()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_online()?;

        let mut inner = self.inner.lock();
        let expired = match inner.records.get(key) {
            Some(record) if record.expires_at > Instant::now() => {
                return Ok(Some(record.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.records.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check_flag(&self.fail_writes, "SET")?;
        self.put_raw(key, value, ttl);
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        self.check_flag(&self.fail_pushes, "LPUSH")?;
        self.inner
            .lock()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>> {
        self.check_online()?;

        let mut inner = self.inner.lock();
        let popped = inner.lists.get_mut(key).and_then(|list| list.pop_back());
        if inner.lists.get(key).is_some_and(|list| list.is_empty()) {
            inner.lists.remove(key);
        }
        Ok(popped)
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        self.check_online()?;
        Ok(self
            .inner
            .lock()
            .lists
            .get(key)
            .map_or(0, |list| list.len() as u64))
    }
}
