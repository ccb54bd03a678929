use crate::store::DocumentId;
use std::collections::HashMap;
use xxhash_rust::xxh3::xxh3_128;

///
/// SubqueryKey
///
/// Collection plus a 128-bit fingerprint of the serialized native filter.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct SubqueryKey {
    collection: String,
    fingerprint: u128,
}

impl SubqueryKey {
    pub(crate) fn new(collection: &str, cache_key: &str) -> Self {
        Self {
            collection: collection.to_string(),
            fingerprint: xxh3_128(cache_key.as_bytes()),
        }
    }
}

///
/// SubqueryCache
///
/// Relationship-hop results memoized for one top-level translation, so a
/// constraint referenced from several branches runs once. Dropped with the
/// translation session.
///

#[derive(Debug, Default)]
pub(crate) struct SubqueryCache {
    entries: HashMap<SubqueryKey, Vec<DocumentId>>,
}

impl SubqueryCache {
    pub(crate) fn get(&self, key: &SubqueryKey) -> Option<&[DocumentId]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub(crate) fn insert(&mut self, key: SubqueryKey, ids: Vec<DocumentId>) {
        self.entries.insert(key, ids);
    }
}
