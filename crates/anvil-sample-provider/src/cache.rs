//! Caches backing the Remote and Cached-proxy adapters.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A bounded least-recently-used cache. Used as the Remote adapter's
/// fallback when the circuit breaker is open. Capacity-bounded rather
/// than TTL-bounded: a stale cached read is preferable to an error while
/// the breaker is tripped.
pub struct BoundedLruCache<K, V>
where
 K: std::hash::Hash + Eq + Clone,
 V: Clone,
{
 capacity: usize,
 entries: DashMap<K, V>,
 order: Mutex<VecDeque<K>>,
}

impl<K, V> BoundedLruCache<K, V>
where
 K: std::hash::Hash + Eq + Clone,
 V: Clone,
{
 pub fn new(capacity: usize) -> Self {
 Self {
 capacity: capacity.max(1),
 entries: DashMap::new(),
 order: Mutex::new(VecDeque::new()),
 }
 }

 pub fn get(&self, key: &K) -> Option<V> {
 let value = self.entries().get(key).map(|v| v.clone());
 if value.is_some() {
 let mut order = self.order.lock().unwrap();
 order.retain(|k| k != key);
 order.push_back(key.clone());
 }
 value
 }

 pub fn put(&self, key: K, value: V) {
 let mut order = self.order.lock().unwrap();
 if self.entries().contains_key(&key) {
 order.retain(|k| k != &key);
 } else if self.entries().len() >= self.capacity {
 if let Some(evicted) = order.pop_front() {
 self.entries().remove(&evicted);
 }
 }
 order.push_back(key.clone());
 self.entries().insert(key, value);
 }

 pub fn invalidate(&self, key: &K) {
 self.entries().remove(key);
 self.order.lock().unwrap().retain(|k| k != key);
 }

 pub fn len(&self) -> usize {
 self.entries().len()
 }

 pub fn is_empty(&self) -> bool {
 self.entries().is_empty()
 }
}

/// A TTL-based cache entry.
struct TtlEntry<V> {
 value: V,
 expires_at: DateTime<Utc>,
}

/// Cache used by the Cached-proxy adapter: entries expire after `ttl` and
/// can additionally be invalidated early by an external update
/// notification.
pub struct TtlCache<K, V>
where
 K: std::hash::Hash + Eq + Clone,
 V: Clone,
{
 ttl: ChronoDuration,
 entries: DashMap<K, TtlEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
 K: std::hash::Hash + Eq + Clone,
 V: Clone,
{
 pub fn new(ttl: std::time::Duration) -> Self {
 Self {
 ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::zero),
 entries: DashMap::new(),
 }
 }

 pub fn get(&self, key: &K) -> Option<V> {
 let entry = self.entries().get(key)?;
 if entry.expires_at <= Utc::now() {
 drop(entry);
 self.entries().remove(key);
 return None;
 }
 Some(entry.value.clone())
 }

 pub fn put(&self, key: K, value: V) {
 self.entries().insert(
 key,
 TtlEntry {
 value,
 expires_at: Utc::now() + self.ttl,
 },
);
 }

 pub fn invalidate(&self, key: &K) {
 self.entries().remove(key);
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn lru_evicts_oldest_past_capacity() {
 let cache: BoundedLruCache<&str, i32> = BoundedLruCache::new(2);
 cache.put("a", 1);
 cache.put("b", 2);
 cache.put("c", 3);
 assert_eq!(cache.get(&"a"), None);
 assert_eq!(cache.get(&"b"), Some(2));
 assert_eq!(cache.get(&"c"), Some(3));
 }

 #[test]
 fn lru_touch_on_get_preserves_entry() {
 let cache: BoundedLruCache<&str, i32> = BoundedLruCache::new(2);
 cache.put("a", 1);
 cache.put("b", 2);
 let _ = cache.get(&"a");
 cache.put("c", 3);
 assert_eq!(cache.get(&"a"), Some(1));
 assert_eq!(cache.get(&"b"), None);
 }
}
