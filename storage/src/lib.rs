use smallvec::SmallVec;

pub mod dynamic;
pub mod trie;

pub use dynamic::DynamicIndex;
pub use trie::{ReentrantBuild, TrieIndex};

/// Owned phrase key. Most filtered phrases are short, so they stay inline.
pub type PhraseKey = SmallVec<[u32; 8]>;

/// Maps integer sequences to dense ids, assigned in first-insertion order
/// starting at zero, and back.
///
/// Implementations are not synchronized; concurrent writers must be
/// serialized by the caller.
pub trait SequenceIndex {
    type Key<'a>: AsRef<[u32]>
    where
        Self: 'a;

    /// Returns the id of `key`, assigning the next dense id if it is new.
    fn lookup_or_insert(&mut self, key: &[u32]) -> u32;

    fn lookup(&self, key: &[u32]) -> Option<u32>;

    /// Inverse of [`SequenceIndex::lookup`].
    fn get(&self, id: u32) -> Option<Self::Key<'_>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: &[u32]) -> bool {
        self.lookup(key).is_some()
    }
}

/// Next dense id for a table holding `len` entries.
#[inline(always)]
pub fn next_id(len: usize) -> u32 {
    assert!(len < u32::MAX as usize, "sequence index is full");
    len as u32
}

#[cfg(test)]
mod test {
    use super::next_id;

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(0), 0);
        assert_eq!(next_id(41), 41);
        assert_eq!(next_id(u32::MAX as usize - 1), u32::MAX - 1);
    }

    #[test]
    #[should_panic(expected = "sequence index is full")]
    fn test_next_id_overflow() {
        next_id(u32::MAX as usize);
    }
}
