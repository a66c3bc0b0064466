use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::debug;

use crate::core::{LiveError, Result, Value};
use crate::store::RemoteStore;

/// What a single key holds.
#[derive(Debug, Clone)]
enum Entry {
    Map(HashMap<String, Value>),
    Set(HashSet<Value>),
    Sorted(BTreeSet<Value>),
    Seq(VecDeque<Value>),
    Counter(i64),
}

impl Entry {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Sorted(_) => "sorted set",
            Self::Seq(_) => "sequence",
            Self::Counter(_) => "counter",
        }
    }
}

#[derive(Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    deadlines: HashMap<String, DateTime<Utc>>,
}

impl Keyspace {
    /// Drops the key if its TTL deadline has passed. Expiry is lazy: a key
    /// disappears the first time anything looks at it after the deadline.
    fn purge(&mut self, key: &str) {
        if let Some(deadline) = self.deadlines.get(key) {
            if *deadline <= Utc::now() {
                self.entries.remove(key);
                self.deadlines.remove(key);
                debug!("expired key '{}'", key);
            }
        }
    }

    fn wrong_kind(key: &str, entry: &Entry, wanted: &str) -> LiveError {
        LiveError::Store(format!(
            "key '{}' holds a {}, not a {}",
            key,
            entry.kind_name(),
            wanted
        ))
    }

    fn map_mut(&mut self, key: &str) -> Result<&mut HashMap<String, Value>> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Map(HashMap::new()))
        {
            Entry::Map(m) => Ok(m),
            other => Err(Self::wrong_kind(key, other, "map")),
        }
    }

    fn map_ref(&self, key: &str) -> Result<Option<&HashMap<String, Value>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Map(m)) => Ok(Some(m)),
            Some(other) => Err(Self::wrong_kind(key, other, "map")),
        }
    }

    fn set_mut(&mut self, key: &str) -> Result<&mut HashSet<Value>> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(HashSet::new()))
        {
            Entry::Set(s) => Ok(s),
            other => Err(Self::wrong_kind(key, other, "set")),
        }
    }

    fn set_ref(&self, key: &str) -> Result<Option<&HashSet<Value>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Set(s)) => Ok(Some(s)),
            Some(other) => Err(Self::wrong_kind(key, other, "set")),
        }
    }

    fn sorted_mut(&mut self, key: &str) -> Result<&mut BTreeSet<Value>> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Sorted(BTreeSet::new()))
        {
            Entry::Sorted(s) => Ok(s),
            other => Err(Self::wrong_kind(key, other, "sorted set")),
        }
    }

    fn sorted_ref(&self, key: &str) -> Result<Option<&BTreeSet<Value>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Sorted(s)) => Ok(Some(s)),
            Some(other) => Err(Self::wrong_kind(key, other, "sorted set")),
        }
    }

    fn seq_mut(&mut self, key: &str) -> Result<&mut VecDeque<Value>> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Seq(VecDeque::new()))
        {
            Entry::Seq(s) => Ok(s),
            other => Err(Self::wrong_kind(key, other, "sequence")),
        }
    }

    fn seq_ref(&self, key: &str) -> Result<Option<&VecDeque<Value>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Seq(s)) => Ok(Some(s)),
            Some(other) => Err(Self::wrong_kind(key, other, "sequence")),
        }
    }
}

/// In-process [`RemoteStore`]: a single keyspace behind one mutex.
///
/// The backend used by the test suite and by demos. Blocking pops park on a
/// condvar that every sequence push signals. TTLs are wall-clock deadlines
/// collected lazily on access.
pub struct MemoryStore {
    inner: Mutex<Keyspace>,
    arrivals: Condvar,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Keyspace::default()),
            arrivals: Condvar::new(),
        }
    }

    fn locked(&self, key_to_purge: &str) -> Result<MutexGuard<'_, Keyspace>> {
        let mut guard = self.inner.lock()?;
        guard.purge(key_to_purge);
        Ok(guard)
    }

    fn try_pop(guard: &mut Keyspace, key: &str, from_front: bool) -> Result<Option<Value>> {
        match guard.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::Seq(s)) => Ok(if from_front {
                s.pop_front()
            } else {
                s.pop_back()
            }),
            Some(other) => Err(Keyspace::wrong_kind(key, other, "sequence")),
        }
    }

    fn blocking_pop(
        &self,
        key: &str,
        timeout: Option<Duration>,
        from_front: bool,
    ) -> Result<Option<Value>> {
        let started = Instant::now();
        let mut guard = self.locked(key)?;
        loop {
            let popped = Self::try_pop(&mut guard, key, from_front)?;
            if popped.is_some() {
                return Ok(popped);
            }

            match timeout {
                Some(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        return Ok(None);
                    }
                    let (g, wait) = self
                        .arrivals
                        .wait_timeout(guard, limit - elapsed)
                        .map_err(|e| LiveError::Lock(e.to_string()))?;
                    guard = g;
                    guard.purge(key);
                    if wait.timed_out() {
                        // one last look before giving up
                        return Self::try_pop(&mut guard, key, from_front);
                    }
                }
                None => {
                    guard = self
                        .arrivals
                        .wait(guard)
                        .map_err(|e| LiveError::Lock(e.to_string()))?;
                    guard.purge(key);
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    fn map_get(&self, key: &str, field: &str) -> Result<Option<Value>> {
        let guard = self.locked(key)?;
        Ok(guard.map_ref(key)?.and_then(|m| m.get(field).cloned()))
    }

    fn map_put(&self, key: &str, field: &str, value: Value) -> Result<()> {
        let mut guard = self.locked(key)?;
        guard.map_mut(key)?.insert(field.to_string(), value);
        Ok(())
    }

    fn map_put_all(&self, key: &str, entries: Vec<(String, Value)>) -> Result<()> {
        let mut guard = self.locked(key)?;
        let map = guard.map_mut(key)?;
        for (field, value) in entries {
            map.insert(field, value);
        }
        Ok(())
    }

    fn map_remove(&self, key: &str, field: &str) -> Result<Option<Value>> {
        let mut guard = self.locked(key)?;
        match guard.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::Map(m)) => Ok(m.remove(field)),
            Some(other) => Err(Keyspace::wrong_kind(key, other, "map")),
        }
    }

    fn map_contains(&self, key: &str, field: &str) -> Result<bool> {
        let guard = self.locked(key)?;
        Ok(guard
            .map_ref(key)?
            .map(|m| m.contains_key(field))
            .unwrap_or(false))
    }

    fn map_len(&self, key: &str) -> Result<usize> {
        let guard = self.locked(key)?;
        Ok(guard.map_ref(key)?.map(|m| m.len()).unwrap_or(0))
    }

    fn map_entries(&self, key: &str) -> Result<Vec<(String, Value)>> {
        let guard = self.locked(key)?;
        Ok(guard
            .map_ref(key)?
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self.locked(key)?;
        guard.deadlines.remove(key);
        Ok(guard.entries.remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let guard = self.locked(key)?;
        Ok(guard.entries.contains_key(key))
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut guard = self.locked(key)?;
        if !guard.entries.contains_key(key) {
            return Ok(false);
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| LiveError::Store(format!("ttl out of range: {}", e)))?;
        guard.deadlines.insert(key.to_string(), Utc::now() + ttl);
        Ok(true)
    }

    fn incr(&self, key: &str) -> Result<i64> {
        let mut guard = self.locked(key)?;
        match guard
            .entries
            .entry(key.to_string())
            .or_insert(Entry::Counter(0))
        {
            Entry::Counter(v) => {
                *v += 1;
                Ok(*v)
            }
            other => Err(Keyspace::wrong_kind(key, other, "counter")),
        }
    }

    fn set_add(&self, key: &str, member: Value) -> Result<bool> {
        let mut guard = self.locked(key)?;
        Ok(guard.set_mut(key)?.insert(member))
    }

    fn set_remove(&self, key: &str, member: &Value) -> Result<bool> {
        let mut guard = self.locked(key)?;
        Ok(guard.set_mut(key)?.remove(member))
    }

    fn set_contains(&self, key: &str, member: &Value) -> Result<bool> {
        let guard = self.locked(key)?;
        Ok(guard
            .set_ref(key)?
            .map(|s| s.contains(member))
            .unwrap_or(false))
    }

    fn set_len(&self, key: &str) -> Result<usize> {
        let guard = self.locked(key)?;
        Ok(guard.set_ref(key)?.map(|s| s.len()).unwrap_or(0))
    }

    fn set_members(&self, key: &str) -> Result<Vec<Value>> {
        let guard = self.locked(key)?;
        Ok(guard
            .set_ref(key)?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn sorted_add(&self, key: &str, member: Value) -> Result<bool> {
        let mut guard = self.locked(key)?;
        Ok(guard.sorted_mut(key)?.insert(member))
    }

    fn sorted_remove(&self, key: &str, member: &Value) -> Result<bool> {
        let mut guard = self.locked(key)?;
        Ok(guard.sorted_mut(key)?.remove(member))
    }

    fn sorted_contains(&self, key: &str, member: &Value) -> Result<bool> {
        let guard = self.locked(key)?;
        Ok(guard
            .sorted_ref(key)?
            .map(|s| s.contains(member))
            .unwrap_or(false))
    }

    fn sorted_len(&self, key: &str) -> Result<usize> {
        let guard = self.locked(key)?;
        Ok(guard.sorted_ref(key)?.map(|s| s.len()).unwrap_or(0))
    }

    fn sorted_members(&self, key: &str) -> Result<Vec<Value>> {
        let guard = self.locked(key)?;
        Ok(guard
            .sorted_ref(key)?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn seq_push_back(&self, key: &str, value: Value) -> Result<()> {
        let mut guard = self.locked(key)?;
        guard.seq_mut(key)?.push_back(value);
        self.arrivals.notify_all();
        Ok(())
    }

    fn seq_push_front(&self, key: &str, value: Value) -> Result<()> {
        let mut guard = self.locked(key)?;
        guard.seq_mut(key)?.push_front(value);
        self.arrivals.notify_all();
        Ok(())
    }

    fn seq_pop_front(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.locked(key)?;
        match guard.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::Seq(s)) => Ok(s.pop_front()),
            Some(other) => Err(Keyspace::wrong_kind(key, other, "sequence")),
        }
    }

    fn seq_pop_back(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.locked(key)?;
        match guard.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::Seq(s)) => Ok(s.pop_back()),
            Some(other) => Err(Keyspace::wrong_kind(key, other, "sequence")),
        }
    }

    fn seq_peek_front(&self, key: &str) -> Result<Option<Value>> {
        let guard = self.locked(key)?;
        Ok(guard.seq_ref(key)?.and_then(|s| s.front().cloned()))
    }

    fn seq_peek_back(&self, key: &str) -> Result<Option<Value>> {
        let guard = self.locked(key)?;
        Ok(guard.seq_ref(key)?.and_then(|s| s.back().cloned()))
    }

    fn seq_get(&self, key: &str, index: usize) -> Result<Option<Value>> {
        let guard = self.locked(key)?;
        Ok(guard.seq_ref(key)?.and_then(|s| s.get(index).cloned()))
    }

    fn seq_set(&self, key: &str, index: usize, value: Value) -> Result<()> {
        let mut guard = self.locked(key)?;
        let seq = guard.seq_mut(key)?;
        match seq.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(LiveError::Store(format!(
                "index {} out of bounds for sequence '{}' of length {}",
                index,
                key,
                seq.len()
            ))),
        }
    }

    fn seq_len(&self, key: &str) -> Result<usize> {
        let guard = self.locked(key)?;
        Ok(guard.seq_ref(key)?.map(|s| s.len()).unwrap_or(0))
    }

    fn seq_range(&self, key: &str) -> Result<Vec<Value>> {
        let guard = self.locked(key)?;
        Ok(guard
            .seq_ref(key)?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn seq_pop_front_blocking(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>> {
        self.blocking_pop(key, timeout, true)
    }

    fn seq_pop_back_blocking(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>> {
        self.blocking_pop(key, timeout, false)
    }
}
