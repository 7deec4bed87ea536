//! Tag → keys index.
//!
//! Secondary structure of the tagged store: it only enumerates candidates for
//! deletion and is never consulted to answer a read.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::keys::Tag;

/// Maps each tag to the keys currently carrying it.
///
/// A tag whose key set becomes empty is dropped immediately.
#[derive(Debug)]
pub(crate) struct TagIndex<K> {
    buckets: HashMap<Tag, HashSet<K>>,
}

impl<K> TagIndex<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    /// Add `key` to the bucket of every tag in `tags`.
    pub(crate) fn insert<'a>(&mut self, key: &K, tags: impl IntoIterator<Item = &'a Tag>) {
        for tag in tags {
            self.buckets
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    /// Remove `key` from the buckets of `tags`, pruning buckets left empty.
    pub(crate) fn remove_key_from<'a>(&mut self, key: &K, tags: impl IntoIterator<Item = &'a Tag>) {
        for tag in tags {
            if let Some(keys) = self.buckets.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.buckets.remove(tag);
                }
            }
        }
    }

    /// Detach the whole bucket for `tag`.
    pub(crate) fn take(&mut self, tag: &Tag) -> HashSet<K> {
        self.buckets.remove(tag).unwrap_or_default()
    }

    pub(crate) fn keys(&self, tag: &Tag) -> HashSet<K> {
        self.buckets.get(tag).cloned().unwrap_or_default()
    }

    pub(crate) fn tag_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut index = TagIndex::new();
        let png = Tag::new("mime:image/png");
        let alice = Tag::new("userLogin:alice");

        index.insert(&"doc:1", [&png, &alice]);
        index.insert(&"doc:2", [&png]);

        assert_eq!(index.keys(&png).len(), 2);
        assert_eq!(index.keys(&alice), HashSet::from(["doc:1"]));
        assert_eq!(index.tag_count(), 2);
    }

    #[test]
    fn removing_last_key_prunes_bucket() {
        let mut index = TagIndex::new();
        let png = Tag::new("mime:image/png");

        index.insert(&"doc:1", [&png]);
        index.remove_key_from(&"doc:1", [&png]);

        assert!(index.keys(&png).is_empty());
        assert_eq!(index.tag_count(), 0);
    }

    #[test]
    fn take_detaches_bucket() {
        let mut index = TagIndex::new();
        let bob = Tag::new("userLogin:bob");

        index.insert(&"doc:1", [&bob]);
        index.insert(&"doc:2", [&bob]);

        assert_eq!(index.take(&bob).len(), 2);
        assert!(index.take(&bob).is_empty());
        assert_eq!(index.tag_count(), 0);
    }

    #[test]
    fn removing_unknown_key_is_noop() {
        let mut index: TagIndex<&str> = TagIndex::new();
        let tag = Tag::new("fileName:a.txt");

        index.remove_key_from(&"missing", [&tag]);
        assert_eq!(index.tag_count(), 0);
    }
}
