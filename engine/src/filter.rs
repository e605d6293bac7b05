use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use storage::{DynamicIndex, PhraseKey, SequenceIndex, TrieIndex};
use tracing::{debug, info, trace};

use crate::{
    gaps::{GapEnumerator, GapStats},
    spans::{spans, Boundaries},
    Error, FilterConfig, Result,
};

const PROGRESS_INTERVAL: usize = 10_000;
const PARALLEL_CHUNK: usize = 4096;

/// Handed to the progress observer after each corpus line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Zero-based number of the line just ingested.
    pub line: usize,
    /// Tokens in that line, boundary markers included.
    pub tokens: usize,
    /// Distinct phrases indexed so far.
    pub phrases: usize,
    /// Gap search counters for that line.
    pub gaps: GapStats,
}

/// Set of source phrases that feature extraction is restricted to.
///
/// Phrases are mined from a corpus or read from a list into a hash index.
/// Their ids double as shard keys: [`FilterIndex::is_in_range`] accepts a
/// phrase only if its id falls in the configured `[start, end)` range.
pub struct FilterIndex {
    table: DynamicIndex,
    trie: Option<TrieIndex>,
    start_id: u32,
    end_id: u32,
    boundaries: Boundaries,
    observer: Option<Box<dyn FnMut(&Progress) + Send>>,
}

impl Default for FilterIndex {
    fn default() -> Self {
        FilterIndex::new()
    }
}

impl FilterIndex {
    pub fn new() -> FilterIndex {
        FilterIndex {
            table: DynamicIndex::new(),
            trie: None,
            start_id: 0,
            end_id: u32::MAX,
            boundaries: Boundaries::RESERVED,
            observer: None,
        }
    }

    /// Starts from an existing phrase table, ids included.
    pub fn from_table(table: DynamicIndex) -> FilterIndex {
        FilterIndex {
            table,
            ..FilterIndex::new()
        }
    }

    pub fn set_boundary_markers(&mut self, boundaries: Boundaries) {
        self.boundaries = boundaries;
    }

    pub fn set_progress_observer(&mut self, f: impl FnMut(&Progress) + Send + 'static) {
        self.observer = Some(Box::new(f));
    }

    /// Indexes every phrase of every tokenized line. Contiguous phrases are
    /// always mined; discontinuous ones only when `config.max_span` is set.
    pub fn ingest_corpus<I, L>(&mut self, lines: I, config: &FilterConfig) -> Result<()>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u32]>,
    {
        let gaps = Self::gap_enumerator(config)?;
        let mut wrapped = Vec::new();

        for (line_no, line) in lines.into_iter().enumerate() {
            let table = &mut self.table;
            let (tokens, stats) = line_phrases(
                line.as_ref(),
                config,
                gaps.as_ref(),
                self.boundaries,
                &mut wrapped,
                |phrase| {
                    table.lookup_or_insert(phrase);
                },
            );
            self.report(line_no, tokens, stats);
        }

        info!(phrases = self.table.len(), "filtering against corpus phrases");
        Ok(())
    }

    /// Same result as [`FilterIndex::ingest_corpus`], ids included: lines are
    /// searched on the rayon pool, then inserted one at a time in line order.
    pub fn ingest_corpus_parallel<L>(&mut self, lines: &[L], config: &FilterConfig) -> Result<()>
    where
        L: AsRef<[u32]> + Sync,
    {
        let gaps = Self::gap_enumerator(config)?;
        let boundaries = self.boundaries;

        for (chunk_idx, chunk) in lines.chunks(PARALLEL_CHUNK).enumerate() {
            let mined: Vec<(Vec<PhraseKey>, usize, GapStats)> = chunk
                .par_iter()
                .map(|line| {
                    let mut phrases = Vec::new();
                    let (tokens, stats) = line_phrases(
                        line.as_ref(),
                        config,
                        gaps.as_ref(),
                        boundaries,
                        &mut Vec::new(),
                        |phrase| phrases.push(PhraseKey::from_slice(phrase)),
                    );
                    (phrases, tokens, stats)
                })
                .collect();

            for (offset, (phrases, tokens, stats)) in mined.into_iter().enumerate() {
                for phrase in phrases {
                    self.table.lookup_or_insert(&phrase);
                }
                self.report(chunk_idx * PARALLEL_CHUNK + offset, tokens, stats);
            }
        }

        info!(phrases = self.table.len(), "filtering against corpus phrases");
        Ok(())
    }

    /// Indexes pre-tokenized phrases as given.
    pub fn ingest_list<I, K>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u32]>,
    {
        for phrase in phrases {
            let phrase = phrase.as_ref();
            trace!(?phrase, "restrict to phrase");
            self.table.lookup_or_insert(phrase);
        }

        info!(phrases = self.table.len(), "filtering against phrase list");
    }

    /// Only affects [`FilterIndex::is_in_range`].
    pub fn set_range(&mut self, start_id: u32, end_id: u32) -> Result<()> {
        if start_id > end_id {
            return Err(Error::Configuration(format!(
                "empty id range {start_id}..{end_id}"
            )));
        }

        self.start_id = start_id;
        self.end_id = end_id;
        Ok(())
    }

    pub fn range(&self) -> (u32, u32) {
        (self.start_id, self.end_id)
    }

    pub fn is_in_range(&self, phrase: &[u32]) -> bool {
        self.table
            .lookup(phrase)
            .map_or(false, |id| self.start_id <= id && id < self.end_id)
    }

    /// An empty filter restricts nothing.
    pub fn allows(&self, phrase: &[u32]) -> bool {
        !self.is_enabled() || self.is_in_range(phrase)
    }

    /// Builds the trie view of the phrases indexed so far. Later insertions
    /// are not reflected until [`FilterIndex::reset_trie`] and another build.
    pub fn finalize_trie(&mut self) -> Result<&TrieIndex> {
        if let Some(trie) = &self.trie {
            return Err(storage::ReentrantBuild(trie.len()).into());
        }

        debug!(phrases = self.table.len(), "building source trie");
        let trie = TrieIndex::build_from(&self.table);
        info!(
            phrases = trie.len(),
            nodes = trie.node_count(),
            "source trie built"
        );

        Ok(&*self.trie.insert(trie))
    }

    pub fn reset_trie(&mut self) -> Option<TrieIndex> {
        self.trie.take()
    }

    pub fn source_trie(&self) -> Result<&TrieIndex> {
        self.trie.as_ref().ok_or(Error::NotFinalized)
    }

    pub fn source_table(&self) -> &DynamicIndex {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        !self.is_empty()
    }

    fn gap_enumerator(config: &FilterConfig) -> Result<Option<GapEnumerator>> {
        config.validate()?;
        match config.max_span {
            Some(_) => GapEnumerator::new(config).map(Some),
            None => Ok(None),
        }
    }

    fn report(&mut self, line: usize, tokens: usize, gaps: GapStats) {
        if line % PROGRESS_INTERVAL == 0 {
            debug!(line, phrases = self.table.len(), "filtering corpus");
        }

        if let Some(observer) = self.observer.as_mut() {
            observer(&Progress {
                line,
                tokens,
                phrases: self.table.len(),
                gaps,
            });
        }
    }
}

/// Mines the phrases of one line: discontinuous ones first when a gap search
/// is configured, then every contiguous span.
fn line_phrases(
    line: &[u32],
    config: &FilterConfig,
    gaps: Option<&GapEnumerator>,
    boundaries: Boundaries,
    wrapped: &mut Vec<u32>,
    mut emit: impl FnMut(&[u32]),
) -> (usize, GapStats) {
    let mut stats = GapStats::default();

    if let Some(gaps) = gaps {
        stats = gaps.enumerate(line, |template, phrase| {
            trace!(
                start = template.start(),
                end = template.end(),
                ?phrase,
                "restrict to discontinuous phrase"
            );
            emit(phrase);
        });
    }

    let tokens = if config.add_boundary_markers {
        boundaries.wrap(line, wrapped);
        wrapped.as_slice()
    } else {
        line
    };

    for phrase in spans(tokens, config.max_phrase_len) {
        trace!(?phrase, "restrict to phrase");
        emit(phrase);
    }

    (tokens.len(), stats)
}
