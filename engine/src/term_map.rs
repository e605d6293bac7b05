use std::collections::HashMap;

use smartstring::alias::CompactString;

use crate::spans::Boundaries;

pub const SENTENCE_START: &str = "<s>";
pub const SENTENCE_END: &str = "</s>";

/// Whitespace tokenizer interning terms into dense `u32` ids.
#[derive(Default, Clone, Debug)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct TermMap {
    kv: HashMap<CompactString, u32>,
    terms: Vec<CompactString>,
}

impl TermMap {
    pub fn intern(&mut self, term: &str) -> u32 {
        if let Some(&id) = self.kv.get(term) {
            return id;
        }

        let id = storage::next_id(self.terms.len());
        self.kv.insert(term.into(), id);
        self.terms.push(term.into());
        id
    }

    pub fn id(&self, term: &str) -> Option<u32> {
        self.kv.get(term).copied()
    }

    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(|t| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Ids of the sentence boundary markers, interned on first use.
    pub fn boundaries(&mut self) -> Boundaries {
        Boundaries {
            start: self.intern(SENTENCE_START),
            end: self.intern(SENTENCE_END),
        }
    }

    /// Blank lines give an empty sequence.
    pub fn tokenize_line(&mut self, line: &str) -> Vec<u32> {
        line.split_whitespace().map(|t| self.intern(t)).collect()
    }

    /// Query-side tokenization: `None` if any term was never interned, since
    /// such a phrase cannot be in any index built from this map.
    pub fn lookup_phrase(&self, text: &str) -> Option<Vec<u32>> {
        text.split_whitespace().map(|t| self.id(t)).collect()
    }

    pub fn render(&self, phrase: &[u32]) -> String {
        let mut out = String::new();
        for (idx, &id) in phrase.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            match self.term(id) {
                Some(term) => out.push_str(term),
                None => out.push_str(&format!("<{id}>")),
            }
        }
        out
    }
}
