use std::collections::HashMap;

use crate::{next_id, PhraseKey, SequenceIndex};

const ROOT: u32 = 0;
const NO_ID: u32 = u32::MAX;

#[derive(Debug, thiserror::Error)]
#[error("trie already holds {0} entries and must be reset before it is rebuilt")]
pub struct ReentrantBuild(pub usize);

#[derive(Clone, Copy, Debug)]
struct Node {
    parent: u32,
    token: u32,
    id: u32,
}

/// Prefix-tree [`SequenceIndex`].
///
/// Every distinct prefix is stored once as a `(parent, token)` node, so the
/// many overlapping short phrases mined from a corpus share storage. Lookups
/// walk one edge per token.
#[derive(Clone, Debug)]
pub struct TrieIndex {
    // nodes[0] is the root (the empty key)
    nodes: Vec<Node>,
    // (parent node << 32 | token) -> child node
    edges: HashMap<u64, u32>,
    // id -> node
    ids: Vec<u32>,
}

#[inline(always)]
fn edge(parent: u32, token: u32) -> u64 {
    (parent as u64) << 32 | token as u64
}

impl TrieIndex {
    pub fn new() -> TrieIndex {
        TrieIndex::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> TrieIndex {
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(Node {
            parent: ROOT,
            token: 0,
            id: NO_ID,
        });

        TrieIndex {
            nodes,
            edges: HashMap::with_capacity(capacity),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Builds a trie holding every key of `source`, inserted in ascending id
    /// order so that each key keeps the id it has in `source`.
    pub fn build_from<S: SequenceIndex>(source: &S) -> TrieIndex {
        let mut trie = TrieIndex::with_capacity(source.len());

        for id in 0..source.len() as u32 {
            let Some(key) = source.get(id) else { break };
            let assigned = trie.lookup_or_insert(key.as_ref());
            debug_assert_eq!(assigned, id, "source index ids are not dense");
        }

        trie
    }

    /// In-place variant of [`TrieIndex::build_from`]. Refuses to run on a trie
    /// that already has entries, since mixing two id spaces would break the
    /// mirror with `source`.
    pub fn fill_from<S: SequenceIndex>(&mut self, source: &S) -> Result<(), ReentrantBuild> {
        if !self.is_empty() {
            return Err(ReentrantBuild(self.len()));
        }

        *self = TrieIndex::build_from(source);
        Ok(())
    }

    /// Number of prefix nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether any indexed key starts with `prefix`.
    pub fn contains_prefix(&self, prefix: &[u32]) -> bool {
        self.find(prefix).is_some()
    }

    fn find(&self, key: &[u32]) -> Option<u32> {
        key.iter()
            .try_fold(ROOT, |node, &token| self.edges.get(&edge(node, token)).copied())
    }
}

impl Default for TrieIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceIndex for TrieIndex {
    type Key<'a> = PhraseKey;

    fn lookup_or_insert(&mut self, key: &[u32]) -> u32 {
        let mut node = ROOT;

        for &token in key {
            let next_node = self.nodes.len() as u32;
            let child = *self.edges.entry(edge(node, token)).or_insert(next_node);

            if child == next_node {
                self.nodes.push(Node {
                    parent: node,
                    token,
                    id: NO_ID,
                });
            }

            node = child;
        }

        let slot = &mut self.nodes[node as usize];
        if slot.id == NO_ID {
            slot.id = next_id(self.ids.len());
            self.ids.push(node);
        }

        slot.id
    }

    fn lookup(&self, key: &[u32]) -> Option<u32> {
        let node = self.find(key)?;
        let id = self.nodes[node as usize].id;
        (id != NO_ID).then_some(id)
    }

    fn get(&self, id: u32) -> Option<Self::Key<'_>> {
        let mut node = *self.ids.get(id as usize)?;
        let mut key = PhraseKey::new();

        while node != ROOT {
            let Node { parent, token, .. } = self.nodes[node as usize];
            key.push(token);
            node = parent;
        }

        key.reverse();
        Some(key)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
