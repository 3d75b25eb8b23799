//! Selection and found-text marks.

use std::ops::Range;

/// A pair of source offsets. `start` is where the mark was anchored and
/// may lie after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub start: usize,
    pub end: usize,
}

impl Mark {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Anchored at `loc`, not yet extended.
    pub fn at(loc: usize) -> Self {
        Self::new(loc, loc)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The marked range in ascending order.
    pub fn range(&self) -> Range<usize> {
        if self.start <= self.end {
            self.start..self.end
        } else {
            self.end..self.start
        }
    }

    /// The marked text of `source`. Offsets are clamped to its length and
    /// rounded down to char boundaries.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let r = self.range();
        let mut start = r.start.min(source.len());
        let mut end = r.end.min(source.len());
        while !source.is_char_boundary(start) {
            start -= 1;
        }
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        &source[start..end]
    }

    /// Part of `run` covered by the mark, if any.
    pub fn overlap(&self, run: &Range<usize>) -> Option<Range<usize>> {
        let r = self.range();
        let start = r.start.max(run.start);
        let end = r.end.min(run.end);
        (start < end).then_some(start..end)
    }
}
