use core::cell::RefCell;
use core::fmt;
use core::ops::Range;

use bumpalo::Bump;
use hashbrown::HashMap;

/// Byte range into the expression source.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span(start..end)
    }

    pub fn start(&self) -> usize {
        self.0.start
    }

    pub fn end(&self) -> usize {
        self.0.end
    }

    pub fn combine(a: &Span, b: &Span) -> Span {
        Span(a.0.start.min(b.0.start)..a.0.end.max(b.0.end))
    }

    /// 1-based line and column of the span start.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.0.start.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.0.start, self.0.end)
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(span: pest::Span<'_>) -> Self {
        Span(span.start()..span.end())
    }
}

/// Arena copy of the source plus a side table of node spans.
///
/// Nodes are keyed by address, so spans are only valid for nodes allocated
/// in the same arena as this annotation.
pub struct AnnotatedSource<'a, T> {
    pub source: &'a str,
    spans: RefCell<HashMap<*const T, Span>>,
}

impl<'a, T> AnnotatedSource<'a, T> {
    pub fn new(arena: &'a Bump, source: &str) -> Self {
        Self {
            source: arena.alloc_str(source),
            spans: RefCell::new(HashMap::new()),
        }
    }

    pub fn add_span(&self, node: &T, span: Span) {
        self.spans.borrow_mut().insert(node as *const T, span);
    }

    pub fn span_of(&self, node: &T) -> Option<Span> {
        self.spans.borrow().get(&(node as *const T)).cloned()
    }

    pub fn snippet(&self, span: Span) -> &'a str {
        &self.source[span.0]
    }
}

impl<T> fmt::Debug for AnnotatedSource<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedSource")
            .field("source", &self.source)
            .field("spans", &self.spans.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_from_one() {
        let source = "a +\n  b";
        assert_eq!(Span::new(0, 1).line_col(source), (1, 1));
        assert_eq!(Span::new(6, 7).line_col(source), (2, 3));
        assert_eq!(Span::new(99, 99).line_col(source), (2, 4));
    }

    #[test]
    fn combine_covers_both() {
        assert_eq!(
            Span::combine(&Span::new(4, 6), &Span::new(1, 2)),
            Span::new(1, 6)
        );
    }
}
