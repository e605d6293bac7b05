/// Token ids wrapped around a line when boundary markers are requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Boundaries {
    pub start: u32,
    pub end: u32,
}

impl Boundaries {
    /// Ids at the top of the id space, for callers without a [`TermMap`].
    ///
    /// [`TermMap`]: crate::term_map::TermMap
    pub const RESERVED: Boundaries = Boundaries {
        start: u32::MAX - 1,
        end: u32::MAX,
    };

    pub fn wrap(&self, line: &[u32], out: &mut Vec<u32>) {
        out.clear();
        out.reserve(line.len() + 2);
        out.push(self.start);
        out.extend_from_slice(line);
        out.push(self.end);
    }
}

/// Every contiguous `line[i..=j]` with at most `max_len` tokens, by
/// increasing `i`, then increasing `j`.
pub fn spans(line: &[u32], max_len: usize) -> Spans<'_> {
    Spans {
        line,
        max_len,
        start: 0,
        end: 0,
    }
}

/// Number of spans [`spans`] yields for a line of `len` tokens.
pub fn span_count(len: usize, max_len: usize) -> usize {
    (0..len).map(|i| max_len.min(len - i)).sum()
}

pub struct Spans<'a> {
    line: &'a [u32],
    max_len: usize,
    start: usize,
    end: usize,
}

impl<'a> Iterator for Spans<'a> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        while self.start < self.line.len() {
            if self.end < self.line.len() && self.end - self.start < self.max_len {
                let span = &self.line[self.start..=self.end];
                self.end += 1;
                return Some(span);
            }

            self.start += 1;
            self.end = self.start;
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::{span_count, spans, Boundaries};

    #[test]
    fn test_order() {
        let found: Vec<&[u32]> = spans(&[1, 2, 3], 2).collect();
        assert_eq!(found, vec![&[1][..], &[1, 2][..], &[2][..], &[2, 3][..], &[3][..]]);
    }

    #[test]
    fn test_counts() {
        for _ in 0..200 {
            let len = fastrand::usize(0..40);
            let max_len = fastrand::usize(0..10);
            let line: Vec<u32> = (0..len as u32).collect();

            assert_eq!(spans(&line, max_len).count(), span_count(len, max_len));
            assert!(spans(&line, max_len).all(|s| !s.is_empty() && s.len() <= max_len));
        }
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(spans(&[], 5).count(), 0);
    }

    #[test]
    fn test_wrap() {
        let mut out = vec![42];
        Boundaries { start: 7, end: 8 }.wrap(&[1, 2], &mut out);
        assert_eq!(out, vec![7, 1, 2, 8]);
    }
}
