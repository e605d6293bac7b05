use std::collections::HashSet;
use std::ops::AddAssign;

use storage::PhraseKey;

use crate::{Error, FilterConfig, Result};

/// A set of positions within one line: the span `start..=end`, of which the
/// positions in `mask` are materialized and the rest are gaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhraseTemplate {
    start: usize,
    end: usize,
    // bit k set: position start + k is materialized
    mask: u64,
    // start of the open gap, end + 1 when none is open
    gap_start: usize,
    gap_count: usize,
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
    line_len: usize,
    max_phrase_len: usize,
    max_span: usize,
    max_gaps: usize,
}

impl PhraseTemplate {
    fn new(pos: usize) -> PhraseTemplate {
        PhraseTemplate {
            start: pos,
            end: pos,
            mask: 1,
            gap_start: pos + 1,
            gap_count: 0,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Last covered position, trailing gap included.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn span(&self) -> usize {
        self.end - self.start + 1
    }

    /// Number of materialized positions.
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn gap_open(&self) -> bool {
        self.gap_start <= self.end
    }

    /// Gaps closed so far, a trailing one included.
    pub fn gap_count(&self) -> usize {
        self.gap_count
    }

    /// No gap between the first and the last materialized position.
    pub fn is_contiguous(&self) -> bool {
        self.mask & self.mask.wrapping_add(1) == 0
    }

    /// Materialized positions, ascending.
    pub fn positions(&self) -> impl Iterator<Item = usize> {
        let (start, mask) = (self.start, self.mask);
        (0..self.span())
            .filter(move |k| mask >> k & 1 == 1)
            .map(move |k| start + k)
    }

    #[inline(always)]
    fn is_materialized(&self, pos: usize) -> bool {
        self.mask >> (pos - self.start) & 1 == 1
    }

    #[inline(always)]
    fn dedup_key(&self) -> (u64, usize, usize) {
        (self.mask, self.start, self.gap_start)
    }

    #[inline(always)]
    fn can_grow(&self, bounds: &Bounds) -> bool {
        self.end + 1 < bounds.line_len && self.span() < bounds.max_span
    }

    fn close_gap(&self) -> Option<PhraseTemplate> {
        if !self.gap_open() {
            return None;
        }

        // a gap reopened right after closing one is still the same gap
        let gap_count = if self.is_materialized(self.gap_start - 1) {
            self.gap_count + 1
        } else {
            self.gap_count
        };

        Some(PhraseTemplate {
            gap_start: self.end + 1,
            gap_count,
            ..*self
        })
    }

    fn extend_materialized(&self, bounds: &Bounds) -> Option<PhraseTemplate> {
        if self.gap_open() || !self.can_grow(bounds) || self.len() >= bounds.max_phrase_len {
            return None;
        }

        let end = self.end + 1;
        Some(PhraseTemplate {
            end,
            gap_start: end + 1,
            mask: self.mask | 1 << (end - self.start),
            ..*self
        })
    }

    fn extend_gap(&self, bounds: &Bounds) -> Option<PhraseTemplate> {
        if !self.can_grow(bounds) {
            return None;
        }

        let opens_new_gap = !self.gap_open() && self.is_materialized(self.end);
        if opens_new_gap && self.gap_count >= bounds.max_gaps {
            return None;
        }

        Some(PhraseTemplate {
            end: self.end + 1,
            ..*self
        })
    }
}

/// Counters for one or more gap searches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GapStats {
    /// Templates whose transitions were tried.
    pub expanded: usize,
    /// Distinct closed templates.
    pub candidates: usize,
    /// Closed templates reached again through another transition order.
    pub rejected: usize,
    /// Phrases handed to the caller.
    pub emitted: usize,
}

impl AddAssign for GapStats {
    fn add_assign(&mut self, rhs: Self) {
        self.expanded += rhs.expanded;
        self.candidates += rhs.candidates;
        self.rejected += rhs.rejected;
        self.emitted += rhs.emitted;
    }
}

/// Bounded search for discontinuous phrases in a single line.
///
/// Starting from every position, templates grow one position at a time,
/// either materializing the new position or extending a gap, and gaps are
/// closed explicitly. Every template without an open gap is a candidate;
/// reaching the same candidate twice stops its expansion. The search keeps
/// no state between lines.
#[derive(Clone, Debug)]
pub struct GapEnumerator {
    max_phrase_len: usize,
    max_span: usize,
    max_gaps: usize,
    include_contiguous: bool,
}

impl GapEnumerator {
    pub fn new(config: &FilterConfig) -> Result<GapEnumerator> {
        config.validate()?;

        let Some(max_span) = config.max_span else {
            return Err(Error::Configuration(
                "gap search needs a finite max_span".into(),
            ));
        };

        Ok(GapEnumerator {
            max_phrase_len: config.max_phrase_len,
            max_span,
            max_gaps: config.max_gaps,
            include_contiguous: false,
        })
    }

    /// Also emit templates without internal gaps. They are exactly the spans
    /// [`crate::spans::spans`] yields, so they are skipped by default.
    pub fn include_contiguous(mut self, include_contiguous: bool) -> Self {
        self.include_contiguous = include_contiguous;
        self
    }

    /// Runs the search over a line of `line_len` tokens and returns every
    /// distinct candidate, in discovery order.
    pub fn templates(&self, line_len: usize) -> (Vec<PhraseTemplate>, GapStats) {
        let bounds = Bounds {
            line_len,
            max_phrase_len: self.max_phrase_len,
            max_span: self.max_span,
            max_gaps: self.max_gaps,
        };

        let mut stats = GapStats::default();
        let mut found = Vec::new();
        let mut closed: HashSet<(u64, usize, usize)> = HashSet::new();
        let mut stack: Vec<PhraseTemplate> = (0..line_len).rev().map(PhraseTemplate::new).collect();

        while let Some(template) = stack.pop() {
            if !template.gap_open() {
                if !closed.insert(template.dedup_key()) {
                    stats.rejected += 1;
                    continue;
                }
                found.push(template);
            }

            stats.expanded += 1;
            stack.extend(
                [
                    template.close_gap(),
                    template.extend_gap(&bounds),
                    template.extend_materialized(&bounds),
                ]
                .into_iter()
                .flatten(),
            );
        }

        stats.candidates = found.len();
        (found, stats)
    }

    /// Searches `line` and hands every discontinuous phrase to `emit`, gaps
    /// elided. Nothing is emitted before the search has finished.
    pub fn enumerate(
        &self,
        line: &[u32],
        mut emit: impl FnMut(&PhraseTemplate, &[u32]),
    ) -> GapStats {
        let (templates, mut stats) = self.templates(line.len());
        let mut key = PhraseKey::new();

        for template in templates
            .iter()
            .filter(|t| self.include_contiguous || !t.is_contiguous())
        {
            key.clear();
            key.extend(template.positions().map(|pos| line[pos]));
            stats.emitted += 1;
            emit(template, key.as_slice());
        }

        stats
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::{GapEnumerator, PhraseTemplate};
    use crate::FilterConfig;

    fn enumerator(max_phrase_len: usize, max_span: usize) -> GapEnumerator {
        GapEnumerator::new(&FilterConfig::new(max_phrase_len).max_span(Some(max_span))).unwrap()
    }

    fn internal_gaps(positions: &[usize]) -> usize {
        positions.windows(2).filter(|w| w[1] - w[0] > 1).count()
    }

    fn collect(gaps: &GapEnumerator, line: &[u32]) -> Vec<Vec<u32>> {
        let mut out = Vec::new();
        gaps.enumerate(line, |_, key| out.push(key.to_vec()));
        out
    }

    #[test]
    fn test_three_tokens() {
        let gaps = enumerator(2, 3);
        assert_eq!(collect(&gaps, &[1, 2, 3]), vec![vec![1, 3]]);
    }

    #[test]
    fn test_contiguous_on_request() {
        let gaps = enumerator(2, 3).include_contiguous(true);
        let found: BTreeSet<Vec<u32>> = collect(&gaps, &[1, 2, 3]).into_iter().collect();
        let expected: BTreeSet<Vec<u32>> =
            [vec![1], vec![1, 2], vec![1, 3], vec![2], vec![2, 3], vec![3]]
                .into_iter()
                .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_short_lines() {
        let gaps = enumerator(4, 6);
        assert!(collect(&gaps, &[]).is_empty());
        assert!(collect(&gaps, &[5]).is_empty());
        assert!(collect(&gaps, &[5, 6]).is_empty());
    }

    #[test]
    fn test_bounds_respected() {
        for _ in 0..100 {
            let max_phrase_len = fastrand::usize(1..5);
            let max_span = fastrand::usize(1..8);
            let gaps = enumerator(max_phrase_len, max_span);
            let (templates, _) = gaps.templates(fastrand::usize(0..12));

            for template in templates {
                let positions: Vec<usize> = template.positions().collect();
                assert!(!template.gap_open());
                assert!(!template.is_empty());
                assert_eq!(template.len(), positions.len());
                assert!(positions.len() <= max_phrase_len);
                assert!(positions.last().unwrap() - positions[0] + 1 <= max_span);
                assert!(internal_gaps(&positions) <= 2);
            }
        }
    }

    #[test]
    fn test_max_gaps_setting() {
        let config = FilterConfig::new(5).max_span(Some(7)).max_gaps(1);
        let gaps = GapEnumerator::new(&config).unwrap();
        let (templates, _) = gaps.templates(7);

        assert!(templates
            .iter()
            .all(|t| internal_gaps(&t.positions().collect::<Vec<_>>()) <= 1));
        // a b _ c _ d needs two gaps
        assert!(!templates
            .iter()
            .any(|t| t.positions().collect::<Vec<_>>() == vec![0, 1, 3, 5]));
    }

    // every position set with at most two internal gaps that fits the
    // limits, found by brute force
    fn brute_force(
        line_len: usize,
        max_phrase_len: usize,
        max_span: usize,
    ) -> BTreeSet<Vec<usize>> {
        let mut out = BTreeSet::new();
        for start in 0..line_len {
            for width in 1..=max_span.min(line_len - start) {
                for inner in 0..1u64 << width.saturating_sub(2) {
                    let mask = if width == 1 {
                        1
                    } else {
                        1 | inner << 1 | 1 << (width - 1)
                    };
                    let positions: Vec<usize> =
                        (0..width).filter(|k| mask >> k & 1 == 1).map(|k| start + k).collect();
                    if positions.len() <= max_phrase_len && internal_gaps(&positions) <= 2 {
                        out.insert(positions);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_complete() {
        for (line_len, max_phrase_len, max_span) in
            [(1, 1, 1), (4, 2, 3), (6, 3, 5), (8, 4, 6), (9, 7, 8), (5, 5, 5)]
        {
            let (templates, _) = enumerator(max_phrase_len, max_span).templates(line_len);
            let found: BTreeSet<Vec<usize>> =
                templates.iter().map(|t| t.positions().collect()).collect();

            assert_eq!(
                found,
                brute_force(line_len, max_phrase_len, max_span),
                "line_len={line_len} max_phrase_len={max_phrase_len} max_span={max_span}"
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let line: Vec<u32> = (0..15).map(|_| fastrand::u32(0..5)).collect();
        let gaps = enumerator(4, 6);
        assert_eq!(collect(&gaps, &line), collect(&gaps, &line));
    }

    #[test]
    fn test_revisits_are_rejected() {
        let gaps = enumerator(3, 4);

        let (_, stats) = gaps.templates(3);
        assert!(stats.rejected > 0);

        let (templates, stats) = gaps.templates(10);
        assert!(stats.rejected > 0);
        assert_eq!(stats.candidates, templates.len());

        let keys: BTreeSet<(u64, usize, usize)> =
            templates.iter().map(PhraseTemplate::dedup_key).collect();
        assert_eq!(keys.len(), templates.len());
    }

    // a gap closed and reopened right away is the same gap, so states can
    // only be reached twice once a gap run of two positions fits
    #[test]
    fn test_two_tokens_have_no_revisits() {
        for max_span in [2, 3, 8] {
            let (templates, stats) = enumerator(2, max_span).templates(2);
            assert_eq!(stats.rejected, 0, "max_span={max_span}");
            assert_eq!(stats.candidates, templates.len());
        }

        let (_, stats) = enumerator(2, 2).templates(3);
        assert_eq!(stats.rejected, 0);
    }

    #[test]
    fn test_emitted_keys_elide_gaps() {
        let gaps = enumerator(3, 5);
        let line = [10, 11, 12, 13, 14];

        gaps.enumerate(&line, |template, key| {
            let expected: Vec<u32> = template.positions().map(|p| line[p]).collect();
            assert_eq!(key, expected.as_slice());
            assert!(!template.is_contiguous());
        });
    }

    #[test]
    fn test_requires_finite_span() {
        assert!(GapEnumerator::new(&FilterConfig::new(3)).is_err());
    }
}
