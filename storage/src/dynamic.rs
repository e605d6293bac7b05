use std::collections::HashMap;

use crate::{next_id, PhraseKey, SequenceIndex};

/// Hash-backed [`SequenceIndex`]: amortized O(1) lookups and inserts.
#[derive(Default, Clone, Debug)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "Vec<PhraseKey>", into = "Vec<PhraseKey>")
)]
pub struct DynamicIndex {
    ids: HashMap<PhraseKey, u32>,
    // id -> key
    keys: Vec<PhraseKey>,
}

impl DynamicIndex {
    pub fn new() -> DynamicIndex {
        DynamicIndex::default()
    }

    pub fn with_capacity(capacity: usize) -> DynamicIndex {
        DynamicIndex {
            ids: HashMap::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
        }
    }

    /// Keys in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u32])> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(|(id, key)| (id as u32, key.as_slice()))
    }

    #[cfg(feature = "persistence")]
    pub fn to_bytes(&self) -> postcard::Result<Vec<u8>> {
        postcard::to_stdvec(self)
    }

    #[cfg(feature = "persistence")]
    pub fn from_bytes(bytes: &[u8]) -> postcard::Result<DynamicIndex> {
        postcard::from_bytes(bytes)
    }
}

impl SequenceIndex for DynamicIndex {
    type Key<'a> = &'a [u32];

    fn lookup_or_insert(&mut self, key: &[u32]) -> u32 {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }

        let id = next_id(self.keys.len());
        let key = PhraseKey::from_slice(key);
        self.ids.insert(key.clone(), id);
        self.keys.push(key);
        id
    }

    #[inline(always)]
    fn lookup(&self, key: &[u32]) -> Option<u32> {
        self.ids.get(key).copied()
    }

    fn get(&self, id: u32) -> Option<Self::Key<'_>> {
        self.keys.get(id as usize).map(|key| key.as_slice())
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

// ids are positional, so re-inserting in order restores them
impl From<Vec<PhraseKey>> for DynamicIndex {
    fn from(keys: Vec<PhraseKey>) -> Self {
        keys.into_iter().collect()
    }
}

impl From<DynamicIndex> for Vec<PhraseKey> {
    fn from(index: DynamicIndex) -> Self {
        index.keys
    }
}

impl<K: AsRef<[u32]>> FromIterator<K> for DynamicIndex {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut index = DynamicIndex::with_capacity(iter.size_hint().0);
        for key in iter {
            index.lookup_or_insert(key.as_ref());
        }
        index
    }
}
