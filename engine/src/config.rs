use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_MAX_PHRASE_LEN: usize = 7;
pub const DEFAULT_MAX_GAPS: usize = 2;

/// Widest discontinuous template the gap search can represent; materialized
/// positions are tracked in a `u64` bitmask.
pub const MAX_TEMPLATE_SPAN: usize = u64::BITS as usize;

/// Limits for mining phrases out of a corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Max number of materialized tokens in a phrase.
    pub max_phrase_len: usize,
    /// Max extent of a discontinuous phrase, gaps included. `None` turns the
    /// gap search off.
    pub max_span: Option<usize>,
    /// Max number of gaps inside a discontinuous phrase.
    pub max_gaps: usize,
    /// Wrap every line in `<s>` ... `</s>` before enumerating spans.
    pub add_boundary_markers: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            max_phrase_len: DEFAULT_MAX_PHRASE_LEN,
            max_span: None,
            max_gaps: DEFAULT_MAX_GAPS,
            add_boundary_markers: false,
        }
    }
}

impl FilterConfig {
    pub fn new(max_phrase_len: usize) -> Self {
        FilterConfig {
            max_phrase_len,
            ..Default::default()
        }
    }

    pub fn max_span(mut self, max_span: Option<usize>) -> Self {
        self.max_span = max_span;
        self
    }

    pub fn max_gaps(mut self, max_gaps: usize) -> Self {
        self.max_gaps = max_gaps;
        self
    }

    pub fn add_boundary_markers(mut self, add_boundary_markers: bool) -> Self {
        self.add_boundary_markers = add_boundary_markers;
        self
    }

    #[inline(always)]
    pub fn discontinuous(&self) -> bool {
        self.max_span.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_phrase_len == 0 {
            return Err(Error::Configuration(
                "max_phrase_len must be at least 1".into(),
            ));
        }

        let Some(max_span) = self.max_span else {
            return Ok(());
        };

        if self.add_boundary_markers {
            return Err(Error::Configuration(
                "boundary markers cannot be combined with a finite max_span".into(),
            ));
        }

        if max_span == 0 || max_span > MAX_TEMPLATE_SPAN {
            return Err(Error::Configuration(format!(
                "max_span must be within 1..={MAX_TEMPLATE_SPAN}, got {max_span}"
            )));
        }

        Ok(())
    }
}
