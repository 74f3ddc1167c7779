//! Ordered range sets
//!
//! Every inline annotation carried by a block (inline styles, entity references,
//! highlight marks) is stored as a [`RangeSet`]: half-open character ranges tagged
//! with a value.
//!
//! Ranges that carry the same value never overlap or touch. They are coalesced after
//! every mutation, so two sets describing the same annotation always compare equal.
//! Ranges carrying different values may overlap freely.

/// A tagged, half-open character range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span<T> {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
    /// Annotation value.
    pub value: T,
}

impl<T> Span<T> {
    /// Create a new span with `[start, end)` offsets.
    pub fn new(start: usize, end: usize, value: T) -> Self {
        Self { start, end, value }
    }

    /// Check if the span contains a specific position.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Check if the span overlaps the range `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }

    /// Length of the span in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the span covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Canonical set of tagged ranges.
///
/// Spans are kept sorted by `(start, end, value)`. Insertion and deletion helpers keep
/// offsets in sync with text edits the same way for every annotation kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeSet<T> {
    spans: Vec<Span<T>>,
}

impl<T> Default for RangeSet<T> {
    fn default() -> Self {
        Self { spans: Vec::new() }
    }
}

impl<T: Ord + Clone> RangeSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary spans. Empty spans are discarded and same-value
    /// overlaps are coalesced.
    pub fn from_spans(spans: impl IntoIterator<Item = Span<T>>) -> Self {
        let mut set = Self {
            spans: spans.into_iter().collect(),
        };
        set.normalize();
        set
    }

    /// Returns `true` if the set holds no spans.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of (coalesced) spans.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Iterate spans in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, Span<T>> {
        self.spans.iter()
    }

    /// All spans in canonical order.
    pub fn spans(&self) -> &[Span<T>] {
        &self.spans
    }

    /// Tag `[start, end)` with `value`.
    pub fn insert(&mut self, start: usize, end: usize, value: T) {
        if start >= end {
            return;
        }
        self.spans.push(Span::new(start, end, value));
        self.normalize();
    }

    /// Remove `value` from `[start, end)`, splitting spans as needed.
    pub fn remove(&mut self, start: usize, end: usize, value: &T) {
        self.subtract(start, end, |v| v == value);
    }

    /// Remove every value from `[start, end)`.
    pub fn clear_range(&mut self, start: usize, end: usize) {
        self.subtract(start, end, |_| true);
    }

    /// Remove every span carrying `value`.
    pub fn remove_value(&mut self, value: &T) {
        self.spans.retain(|span| &span.value != value);
    }

    /// Keep only the spans for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Span<T>) -> bool) {
        self.spans.retain(|span| keep(span));
    }

    /// Sorted, de-duplicated values present at `pos`.
    pub fn values_at(&self, pos: usize) -> Vec<T> {
        let mut values: Vec<T> = self
            .spans
            .iter()
            .take_while(|span| span.start <= pos)
            .filter(|span| span.contains(pos))
            .map(|span| span.value.clone())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Returns `true` if `value` is present at `pos`.
    pub fn contains_value_at(&self, pos: usize, value: &T) -> bool {
        self.spans
            .iter()
            .take_while(|span| span.start <= pos)
            .any(|span| &span.value == value && span.contains(pos))
    }

    /// Spans overlapping `[start, end)`.
    pub fn query_range(&self, start: usize, end: usize) -> impl Iterator<Item = &Span<T>> {
        self.spans
            .iter()
            .take_while(move |span| span.start < end)
            .filter(move |span| span.overlaps(start, end))
    }

    /// Spans carrying `value`.
    pub fn spans_of<'a>(&'a self, value: &'a T) -> impl Iterator<Item = &'a Span<T>> + 'a {
        self.spans.iter().filter(move |span| &span.value == value)
    }

    /// Returns `true` if every position in a non-empty `[start, end)` carries `value`.
    pub fn covers(&self, start: usize, end: usize, value: &T) -> bool {
        start < end
            && self
                .spans_of(value)
                .any(|span| span.start <= start && span.end >= end)
    }

    /// Returns `true` if any span carries `value`.
    pub fn contains_value(&self, value: &T) -> bool {
        self.spans.iter().any(|span| &span.value == value)
    }

    /// Update offsets after `len` characters were inserted at `pos`.
    ///
    /// Spans starting at or after `pos` move right. Spans that strictly contain `pos`
    /// grow to include the inserted text.
    pub fn update_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for span in &mut self.spans {
            if span.start >= pos {
                span.start += len;
                span.end += len;
            } else if span.end > pos {
                span.end += len;
            }
        }
    }

    /// Update offsets after `[start, end)` was deleted. Spans inside the deleted range
    /// disappear, spans crossing it shrink.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let len = end - start;
        let map = |pos: usize| {
            if pos <= start {
                pos
            } else if pos >= end {
                pos - len
            } else {
                start
            }
        };
        for span in &mut self.spans {
            span.start = map(span.start);
            span.end = map(span.end);
        }
        self.normalize();
    }

    /// Copy of the spans within `[start, end)`, rebased so `start` becomes offset 0.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self::from_spans(self.query_range(start, end).map(|span| {
            Span::new(
                span.start.max(start) - start,
                span.end.min(end) - start,
                span.value.clone(),
            )
        }))
    }

    /// Add the spans of `other`, shifted right by `offset`.
    pub fn append(&mut self, other: &Self, offset: usize) {
        self.spans.extend(
            other
                .spans
                .iter()
                .map(|span| Span::new(span.start + offset, span.end + offset, span.value.clone())),
        );
        self.normalize();
    }

    /// Partition `[0, len)` into maximal runs carrying the same set of values.
    pub fn runs(&self, len: usize) -> Vec<(usize, usize, Vec<T>)> {
        let mut cuts: Vec<usize> = vec![0, len];
        for span in &self.spans {
            cuts.push(span.start.min(len));
            cuts.push(span.end.min(len));
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut runs: Vec<(usize, usize, Vec<T>)> = Vec::new();
        for pair in cuts.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let values = self.values_at(start);
            match runs.last_mut() {
                Some(last) if last.2 == values => last.1 = end,
                _ => runs.push((start, end, values)),
            }
        }
        runs
    }

    fn subtract(&mut self, start: usize, end: usize, mut matches: impl FnMut(&T) -> bool) {
        if start >= end {
            return;
        }
        let mut kept: Vec<Span<T>> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            if !matches(&span.value) || !span.overlaps(start, end) {
                kept.push(span);
                continue;
            }
            if span.start < start {
                kept.push(Span::new(span.start, start, span.value.clone()));
            }
            if span.end > end {
                kept.push(Span::new(end, span.end, span.value));
            }
        }
        self.spans = kept;
        self.normalize();
    }

    fn normalize(&mut self) {
        self.spans.retain(|span| span.start < span.end);
        self.spans.sort_by(|a, b| {
            a.value
                .cmp(&b.value)
                .then(a.start.cmp(&b.start))
                .then(a.end.cmp(&b.end))
        });

        let mut merged: Vec<Span<T>> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            if let Some(last) = merged.last_mut()
                && last.value == span.value
                && span.start <= last.end
            {
                last.end = last.end.max(span.end);
                continue;
            }
            merged.push(span);
        }

        merged.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(a.end.cmp(&b.end))
                .then(a.value.cmp(&b.value))
        });
        self.spans = merged;
    }
}

impl<'a, T> IntoIterator for &'a RangeSet<T> {
    type Item = &'a Span<T>;
    type IntoIter = std::slice::Iter<'a, Span<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
