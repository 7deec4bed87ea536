//! Tagged, time-expiring cache storage.
//!
//! One mutex guards both the entries and the tag index, so every operation
//! is linearized against every other. Reads take the lock too: a read that
//! finds an expired entry evicts it.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::trace;

use super::index::TagIndex;
use super::keys::Tag;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "docshelf_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "docshelf_cache_miss_total";
pub const METRIC_CACHE_EXPIRED: &str = "docshelf_cache_expired_total";
pub const METRIC_CACHE_INVALIDATED: &str = "docshelf_cache_invalidated_total";

// Upper bound for deadlines whose ttl overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    tags: HashSet<Tag>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct StoreState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    index: TagIndex<K>,
}

impl<K, V> StoreState<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Drop the entry at `key` and its tag memberships.
    fn remove(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.index.remove_key_from(key, &entry.tags);
                true
            }
            None => false,
        }
    }
}

/// Key/value cache with per-entry TTL and tag-based invalidation.
///
/// Misses are a normal outcome and invalidating something absent is a no-op;
/// no operation here can fail.
pub struct TaggedStore<K, V> {
    state: Mutex<StoreState<K, V>>,
}

impl<K, V> TaggedStore<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                index: TagIndex::new(),
            }),
        }
    }

    /// Look up `key`, evicting it when its deadline has passed.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, SOURCE, "get");

        match state.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
        }

        state.remove(key);
        trace!(%key, "Evicted expired cache entry on read");
        counter!(METRIC_CACHE_EXPIRED).increment(1);
        counter!(METRIC_CACHE_MISS).increment(1);
        None
    }

    /// Install `value` at `key`, replacing any previous entry and its tags.
    ///
    /// A zero `ttl` stores an entry that is already expired for readers.
    pub fn put(&self, key: K, value: V, ttl: Duration, tags: impl IntoIterator<Item = Tag>) {
        let tags: HashSet<Tag> = tags.into_iter().collect();
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + FAR_FUTURE);

        let mut state = mutex_lock(&self.state, SOURCE, "put");
        state.remove(&key);
        state.index.insert(&key, &tags);
        trace!(%key, tag_count = tags.len(), ttl_ms = ttl.as_millis() as u64, "Cached entry");
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                tags,
            },
        );
    }

    /// Remove the entry at `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = mutex_lock(&self.state, SOURCE, "invalidate").remove(key);
        if removed {
            counter!(METRIC_CACHE_INVALIDATED).increment(1);
        }
        removed
    }

    /// Remove every entry carrying `tag`. Returns the number removed.
    pub fn invalidate_by_tag(&self, tag: &Tag) -> usize {
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate_by_tag");
        let removed = remove_tagged(&mut state, tag);
        drop(state);

        counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        removed
    }

    /// Remove every entry carrying any of `tags`. Unknown tags are skipped.
    pub fn invalidate_by_tags<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> usize {
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate_by_tags");
        let removed = tags
            .into_iter()
            .map(|tag| remove_tagged(&mut state, tag))
            .sum::<usize>();
        drop(state);

        counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        removed
    }

    /// Evict every entry whose deadline has passed. Returns the number evicted.
    pub fn clean_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, SOURCE, "clean_expired");

        let expired: Vec<K> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        drop(state);

        counter!(METRIC_CACHE_EXPIRED).increment(expired.len() as u64);
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tags with at least one key.
    pub fn tag_count(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "tag_count").index.tag_count()
    }

    /// Keys currently indexed under `tag`.
    pub fn keys_for_tag(&self, tag: &Tag) -> HashSet<K> {
        mutex_lock(&self.state, SOURCE, "keys_for_tag").index.keys(tag)
    }

    /// Tags of the entry stored at `key`, if any.
    pub fn tags_of(&self, key: &K) -> Option<HashSet<Tag>> {
        mutex_lock(&self.state, SOURCE, "tags_of")
            .entries
            .get(key)
            .map(|entry| entry.tags.clone())
    }
}

impl<K, V> Default for TaggedStore<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

fn remove_tagged<K, V>(state: &mut StoreState<K, V>, tag: &Tag) -> usize
where
    K: Eq + Hash + Clone,
{
    let keys = state.index.take(tag);
    keys.iter().filter(|key| state.remove(key)).count()
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;

    use super::*;

    type Store = TaggedStore<String, &'static str>;

    const MINUTE: Duration = Duration::from_secs(60);

    fn tags(values: &[&str]) -> Vec<Tag> {
        values.iter().map(|value| Tag::new(*value)).collect()
    }

    fn key(value: &str) -> String {
        value.to_string()
    }

    /// Every live key is indexed under each of its tags, and every indexed
    /// key is live and carries the tag.
    fn assert_index_consistent(store: &Store, keys: &[&str], all_tags: &[&str]) {
        for k in keys {
            if let Some(entry_tags) = store.tags_of(&key(k)) {
                for tag in &entry_tags {
                    assert!(
                        store.keys_for_tag(tag).contains(&key(k)),
                        "{k} missing from bucket {tag}"
                    );
                }
            }
        }
        for tag in all_tags {
            let tag = Tag::new(*tag);
            for indexed in store.keys_for_tag(&tag) {
                let entry_tags = store
                    .tags_of(&indexed)
                    .unwrap_or_else(|| panic!("{indexed} indexed under {tag} but absent"));
                assert!(entry_tags.contains(&tag));
            }
        }
    }

    #[test]
    fn get_returns_stored_value() {
        let store = Store::new();
        store.put(key("doc:1"), "a", MINUTE, tags(&["mime:image/png"]));

        assert_eq!(store.get(&key("doc:1")), Some("a"));
        assert_eq!(store.get(&key("doc:2")), None);
    }

    #[test]
    fn invalidate_by_tags_evicts_tagged_entry() {
        let store = Store::new();
        store.put(
            key("doc:1"),
            "docA",
            MINUTE,
            tags(&["mime:image/png", "userLogin:alice"]),
        );
        assert_eq!(store.get(&key("doc:1")), Some("docA"));

        let removed = store.invalidate_by_tags(&tags(&["userLogin:alice"]));

        assert_eq!(removed, 1);
        assert_eq!(store.get(&key("doc:1")), None);
        assert_eq!(store.tag_count(), 0);
    }

    #[test]
    fn zero_ttl_entry_is_never_returned() {
        let store = Store::new();
        store.put(key("doc:1"), "a", Duration::ZERO, tags(&["mime:text/plain"]));

        assert_eq!(store.get(&key("doc:1")), None);
        // The expired read also evicted the entry and its tag.
        assert!(store.is_empty());
        assert_eq!(store.tag_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_exactly_at_deadline() {
        let store = Store::new();
        let ttl = Duration::from_millis(500);
        store.put(key("doc:1"), "a", ttl, tags(&["mime:text/plain"]));

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(store.get(&key("doc:1")), Some("a"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(store.get(&key("doc:1")), None);
    }

    #[test]
    fn invalidate_by_tag_removes_all_sharers_then_noops() {
        let store = Store::new();
        store.put(key("doc:1"), "a", MINUTE, tags(&["userLogin:bob", "mime:a"]));
        store.put(key("doc:2"), "b", MINUTE, tags(&["userLogin:bob"]));
        store.put(key("doc:3"), "c", MINUTE, tags(&["userLogin:carol", "mime:a"]));

        assert_eq!(store.invalidate_by_tag(&Tag::new("userLogin:bob")), 2);
        assert_eq!(store.invalidate_by_tag(&Tag::new("userLogin:bob")), 0);

        assert_eq!(store.get(&key("doc:1")), None);
        assert_eq!(store.get(&key("doc:2")), None);
        assert_eq!(store.get(&key("doc:3")), Some("c"));
        // doc:1's other memberships were cleaned up with it.
        assert_eq!(
            store.keys_for_tag(&Tag::new("mime:a")),
            HashSet::from([key("doc:3")])
        );
        assert_index_consistent(
            &store,
            &["doc:1", "doc:2", "doc:3"],
            &["userLogin:bob", "userLogin:carol", "mime:a"],
        );
    }

    #[test]
    fn overwrite_replaces_tag_memberships() {
        let store = Store::new();
        store.put(key("k"), "v1", MINUTE, tags(&["A", "B"]));
        store.put(key("k"), "v2", MINUTE, tags(&["C"]));

        assert!(store.keys_for_tag(&Tag::new("A")).is_empty());
        assert!(store.keys_for_tag(&Tag::new("B")).is_empty());
        assert_eq!(
            store.keys_for_tag(&Tag::new("C")),
            HashSet::from([key("k")])
        );
        assert_eq!(store.tag_count(), 1);
        assert_eq!(store.get(&key("k")), Some("v2"));

        // The old tags no longer reach the entry.
        assert_eq!(store.invalidate_by_tag(&Tag::new("A")), 0);
        assert_eq!(store.get(&key("k")), Some("v2"));
    }

    #[test]
    fn invalidating_absent_things_is_noop() {
        let store = Store::new();
        assert!(!store.invalidate(&key("missing")));
        assert_eq!(store.invalidate_by_tag(&Tag::new("nothing")), 0);
        assert_eq!(store.invalidate_by_tags(&tags(&["x", "y"])), 0);

        store.put(key("k"), "v", MINUTE, tags(&["A"]));
        assert!(store.invalidate(&key("k")));
        assert!(!store.invalidate(&key("k")));
        assert_eq!(store.tag_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clean_expired_keeps_only_live_entries() {
        let store = Store::new();
        store.put(key("short"), "s", Duration::from_secs(1), tags(&["shared", "x"]));
        store.put(key("long"), "l", Duration::from_secs(10), tags(&["shared", "y"]));
        store.put(key("zero"), "z", Duration::ZERO, tags(&["x"]));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.clean_expired(), 2);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("long")), Some("l"));
        assert!(store.keys_for_tag(&Tag::new("x")).is_empty());
        assert_eq!(
            store.keys_for_tag(&Tag::new("shared")),
            HashSet::from([key("long")])
        );
        assert_index_consistent(
            &store,
            &["short", "long", "zero"],
            &["shared", "x", "y"],
        );
    }

    #[test]
    fn duplicate_tags_are_collapsed() {
        let store = Store::new();
        store.put(key("k"), "v", MINUTE, tags(&["A", "A", "A"]));

        assert_eq!(store.tags_of(&key("k")).map(|t| t.len()), Some(1));
        assert_eq!(store.invalidate_by_tags(&tags(&["A", "A"])), 1);
    }

    #[test]
    fn concurrent_mutations_keep_index_consistent() {
        let store = Arc::new(Store::new());
        let tag_names = ["t0", "t1", "t2", "t3"];

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let k = format!("k{}", (worker * 7 + i) % 16);
                        match i % 4 {
                            0 | 1 => store.put(
                                k,
                                "v",
                                MINUTE,
                                tags(&[tag_names[i % 4], tag_names[worker % 4]]),
                            ),
                            2 => {
                                store.invalidate_by_tag(&Tag::new(tag_names[worker % 4]));
                            }
                            _ => {
                                store.invalidate(&k);
                            }
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread panicked");
        }

        let keys: Vec<String> = (0..16).map(|i| format!("k{i}")).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        assert_index_consistent(&store, &key_refs, &tag_names);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = Store::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.state.lock().expect("store lock should be acquired");
            panic!("poison store lock");
        }));

        store.put(key("k"), "v", MINUTE, tags(&["A"]));
        assert_eq!(store.get(&key("k")), Some("v"));
    }
}
