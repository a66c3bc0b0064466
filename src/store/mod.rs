pub mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use crate::core::{Result, Value};

/// Operations the live-object engine requires from the remote store.
///
/// One implementor per backend. The engine itself never talks to a wire
/// protocol: every live field access, collection operation and id allocation
/// lands on exactly one method of this trait. All operations are synchronous
/// and blocking; timeout and retry behavior belong to the implementor.
pub trait RemoteStore: Send + Sync {
    // ------------------------------------------------------------------
    // Keyed map (the per-object remote representation)
    // ------------------------------------------------------------------

    fn map_get(&self, key: &str, field: &str) -> Result<Option<Value>>;
    fn map_put(&self, key: &str, field: &str, value: Value) -> Result<()>;
    fn map_put_all(&self, key: &str, entries: Vec<(String, Value)>) -> Result<()>;
    fn map_remove(&self, key: &str, field: &str) -> Result<Option<Value>>;
    fn map_contains(&self, key: &str, field: &str) -> Result<bool>;
    fn map_len(&self, key: &str) -> Result<usize>;
    fn map_entries(&self, key: &str) -> Result<Vec<(String, Value)>>;

    // ------------------------------------------------------------------
    // Whole-key operations
    // ------------------------------------------------------------------

    /// Removes the key of any kind. Returns whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool>;
    fn exists(&self, key: &str) -> Result<bool>;
    /// Marks the key to disappear after `ttl`. Returns false when the key
    /// does not exist.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Atomically increments the counter at `key` and returns the new value.
    /// The first increment of a fresh key returns 1. Id allocation depends on
    /// this being a single atomic primitive at the store, never read-then-write.
    fn incr(&self, key: &str) -> Result<i64>;

    // ------------------------------------------------------------------
    // Sets
    // ------------------------------------------------------------------

    fn set_add(&self, key: &str, member: Value) -> Result<bool>;
    fn set_remove(&self, key: &str, member: &Value) -> Result<bool>;
    fn set_contains(&self, key: &str, member: &Value) -> Result<bool>;
    fn set_len(&self, key: &str) -> Result<usize>;
    fn set_members(&self, key: &str) -> Result<Vec<Value>>;

    // ------------------------------------------------------------------
    // Sorted sets, ordered by the members' natural order
    // ------------------------------------------------------------------

    fn sorted_add(&self, key: &str, member: Value) -> Result<bool>;
    fn sorted_remove(&self, key: &str, member: &Value) -> Result<bool>;
    fn sorted_contains(&self, key: &str, member: &Value) -> Result<bool>;
    fn sorted_len(&self, key: &str) -> Result<usize>;
    /// Members in ascending order.
    fn sorted_members(&self, key: &str) -> Result<Vec<Value>>;

    // ------------------------------------------------------------------
    // Sequences: one storage family backs lists, queues and deques
    // ------------------------------------------------------------------

    fn seq_push_back(&self, key: &str, value: Value) -> Result<()>;
    fn seq_push_front(&self, key: &str, value: Value) -> Result<()>;
    fn seq_pop_front(&self, key: &str) -> Result<Option<Value>>;
    fn seq_pop_back(&self, key: &str) -> Result<Option<Value>>;
    fn seq_peek_front(&self, key: &str) -> Result<Option<Value>>;
    fn seq_peek_back(&self, key: &str) -> Result<Option<Value>>;
    fn seq_get(&self, key: &str, index: usize) -> Result<Option<Value>>;
    fn seq_set(&self, key: &str, index: usize, value: Value) -> Result<()>;
    fn seq_len(&self, key: &str) -> Result<usize>;
    fn seq_range(&self, key: &str) -> Result<Vec<Value>>;

    /// Blocking pop: waits until a value arrives or `timeout` elapses.
    /// `None` timeout waits indefinitely.
    fn seq_pop_front_blocking(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>>;
    fn seq_pop_back_blocking(&self, key: &str, timeout: Option<Duration>)
    -> Result<Option<Value>>;
}
