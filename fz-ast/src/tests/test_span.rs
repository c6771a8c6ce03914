use crate::ast::Span;
use miette::SourceSpan;
use pretty_assertions::assert_eq;

#[test]
fn test_span_merge_covers_both() {
    let a = Span::new(4, 10);
    let b = Span::new(12, 20);

    assert_eq!(a.merge(&b), Span::new(4, 20));
    assert_eq!(b.merge(&a), Span::new(4, 20));
}

#[test]
fn test_synthetic_spans_are_ordered() {
    let first = Span::synthetic();
    let second = Span::synthetic();

    assert!(first < second);
    assert!(first.end <= second.start);
}

#[test]
fn test_span_to_source_span() {
    let span = Span::new(7, 12);
    let source: SourceSpan = span.into();

    assert_eq!(source.offset(), 7);
    assert_eq!(source.len(), 5);
}

#[test]
fn test_span_display_prefers_line_col() {
    assert_eq!(Span::with_line_col(0, 3, (2, 5), (2, 8)).to_string(), "2:5");
    assert_eq!(Span::new(42, 50).to_string(), "@42");
}
