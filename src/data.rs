//! Annotated input data.
//!
//! The matcher and the rule framework are generic over anything that owns
//! an annotation list and knows its own extent. [`AnnotatedStringData`] is
//! the canonical implementation: a string annotated over byte offsets.

use crate::feature::FeatureStruct;
use crate::sequence::{AnnotationId, AnnotationList};
use crate::span::{IntegerSpanFactory, Offset, Span, SpanFactory};

/// The data contract consumed by matching and rule application.
pub trait AnnotatedData<O: Offset> {
    /// The full extent of the underlying data.
    fn span(&self) -> Span<O>;

    fn annotations(&self) -> &AnnotationList<O>;

    fn annotations_mut(&mut self) -> &mut AnnotationList<O>;
}

/// A string plus its annotations, over `usize` byte offsets.
#[derive(Debug, Clone)]
pub struct AnnotatedStringData {
    text: String,
    span: Span<usize>,
    annotations: AnnotationList<usize>,
}

impl AnnotatedStringData {
    pub fn new(text: impl Into<String>) -> AnnotatedStringData {
        let text = text.into();
        let span = Span::new(0, text.len());
        AnnotatedStringData { text, span, annotations: AnnotationList::new() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn factory(&self) -> IntegerSpanFactory {
        IntegerSpanFactory
    }

    /// Annotate a range of the text.
    pub fn add_annotation(&mut self, start: usize, end: usize, fs: FeatureStruct) -> AnnotationId {
        let span = self.factory().create(start, end).expect("annotation range within the text");
        self.annotations.add_span(span, fs)
    }

    /// Render the current annotation order: `render` maps each annotation
    /// to its surface text (usually its `strRep` feature) or `None` to skip
    /// it. Rewrites that relocate, insert or remove annotations show up
    /// here because rendering follows span order, not the original text.
    pub fn surface<F>(&self, render: F) -> String
    where
        F: Fn(&crate::sequence::Annotation<usize>) -> Option<String>,
    {
        let mut out = String::new();
        for id in self.annotations.iter(crate::span::Direction::LeftToRight) {
            let ann = self.annotations.get(id).expect("iterated node is live");
            if let Some(text) = render(ann) {
                out.push_str(&text);
            }
        }
        out
    }
}

impl AnnotatedData<usize> for AnnotatedStringData {
    fn span(&self) -> Span<usize> {
        self.span
    }

    fn annotations(&self) -> &AnnotationList<usize> {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut AnnotationList<usize> {
        &mut self.annotations
    }
}
