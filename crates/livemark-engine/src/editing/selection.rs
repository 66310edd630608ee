use crate::syntax::Span;

/// One selection range. `anchor` is where the selection started, `head`
/// is where the caret is; they are equal for a collapsed caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub anchor: usize,
    pub head: usize,
}

impl SelectionRange {
    pub const fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub const fn caret(at: usize) -> Self {
        Self {
            anchor: at,
            head: at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn span(&self) -> Span {
        Span::new(self.from(), self.to())
    }

    /// Closed-interval touch test against `[span.start, span.end]`.
    ///
    /// True when either end of the selection lies inside the span (boundaries
    /// included) or the selection covers the span entirely. A caret sitting
    /// right after a closing delimiter therefore counts as touching.
    pub fn touches(&self, span: Span) -> bool {
        let inside = |offset: usize| offset >= span.start && offset <= span.end;
        inside(self.from()) || inside(self.to()) || (self.from() <= span.start && self.to() >= span.end)
    }
}

/// Ordered set of selection ranges with one primary range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
    primary: usize,
}

impl Selection {
    /// Build a selection; an empty list becomes a caret at 0 and an out of
    /// range primary index falls back to the first range.
    pub fn new(ranges: Vec<SelectionRange>, primary: usize) -> Self {
        if ranges.is_empty() {
            return Self::caret(0);
        }
        let primary = if primary < ranges.len() { primary } else { 0 };
        Self { ranges, primary }
    }

    pub fn single(range: SelectionRange) -> Self {
        Self {
            ranges: vec![range],
            primary: 0,
        }
    }

    pub fn caret(at: usize) -> Self {
        Self::single(SelectionRange::caret(at))
    }

    pub fn primary(&self) -> SelectionRange {
        self.ranges[self.primary]
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    /// The collapsed caret position when the selection is exactly one empty range.
    pub fn single_caret(&self) -> Option<usize> {
        match self.ranges.as_slice() {
            [only] if only.is_empty() => Some(only.head),
            _ => None,
        }
    }

    /// Apply `f` to every offset in the selection.
    pub fn map(&self, mut f: impl FnMut(usize) -> usize) -> Self {
        Self {
            ranges: self
                .ranges
                .iter()
                .map(|r| SelectionRange::new(f(r.anchor), f(r.head)))
                .collect(),
            primary: self.primary,
        }
    }

    /// Clamp every offset to `len`.
    pub fn clamp(&self, len: usize) -> Self {
        self.map(|offset| offset.min(len))
    }
}

impl From<SelectionRange> for Selection {
    fn from(range: SelectionRange) -> Self {
        Selection::single(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::caret_before_start(SelectionRange::caret(1), false)]
    #[case::caret_at_start(SelectionRange::caret(2), true)]
    #[case::caret_inside(SelectionRange::caret(4), true)]
    #[case::caret_at_end(SelectionRange::caret(8), true)]
    #[case::caret_after_end(SelectionRange::caret(9), false)]
    #[case::range_covering(SelectionRange::new(0, 12), true)]
    #[case::range_ending_at_start(SelectionRange::new(0, 2), true)]
    #[case::range_before(SelectionRange::new(0, 1), false)]
    #[case::reversed_range_inside(SelectionRange::new(6, 3), true)]
    fn touch_test_is_closed_interval(#[case] selection: SelectionRange, #[case] expected: bool) {
        assert_eq!(selection.touches(Span::new(2, 8)), expected);
    }

    #[test]
    fn empty_selection_list_becomes_caret() {
        let selection = Selection::new(vec![], 3);
        assert_eq!(selection.primary(), SelectionRange::caret(0));
    }

    #[test]
    fn single_caret_requires_one_empty_range() {
        assert_eq!(Selection::caret(5).single_caret(), Some(5));
        assert_eq!(
            Selection::single(SelectionRange::new(1, 5)).single_caret(),
            None
        );
        assert_eq!(
            Selection::new(vec![SelectionRange::caret(1), SelectionRange::caret(4)], 1)
                .single_caret(),
            None
        );
    }

    #[test]
    fn primary_index_out_of_range_falls_back() {
        let selection = Selection::new(vec![SelectionRange::caret(1)], 7);
        assert_eq!(selection.primary_index(), 0);
    }
}
