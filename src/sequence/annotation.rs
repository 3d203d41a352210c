//! Annotation nodes.
//!
//! An annotation tags one span of the underlying data with a feature
//! structure: a segment, a boundary, a morph, a word. Annotations live in an
//! [`crate::sequence::AnnotationList`] which owns the positional links;
//! parent/child tree structure is held separately as ids on the node.

use bitflags::bitflags;

use crate::feature::FeatureStruct;
use crate::span::{Offset, Span};

use super::skip_list::NodeId;

/// Handle to an annotation in its list. Stable across removal and
/// re-insertion.
pub type AnnotationId = NodeId;

bitflags! {
    /// Per-annotation markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnnotationFlags: u8 {
        /// Matching may skip this annotation.
        const OPTIONAL = 1 << 0;
        /// Rewritten during the current rule pass; bounds iterative
        /// reapplication together with the application limit.
        const DIRTY = 1 << 1;
    }
}

#[derive(Debug, Clone)]
pub struct Annotation<O> {
    span: Span<O>,
    fs: FeatureStruct,
    flags: AnnotationFlags,
    parent: Option<AnnotationId>,
    children: Vec<AnnotationId>,
    pub(crate) list_id: u64,
}

impl<O: Offset> Annotation<O> {
    /// Create a free-standing annotation; it acquires a position when added
    /// to a list.
    pub fn new(span: Span<O>, fs: FeatureStruct) -> Annotation<O> {
        Annotation { span, fs, flags: AnnotationFlags::empty(), parent: None, children: Vec::new(), list_id: 0 }
    }

    pub fn span(&self) -> Span<O> {
        self.span
    }

    pub(crate) fn set_span(&mut self, span: Span<O>) {
        self.span = span;
    }

    pub fn feature_struct(&self) -> &FeatureStruct {
        &self.fs
    }

    pub fn feature_struct_mut(&mut self) -> &mut FeatureStruct {
        &mut self.fs
    }

    pub fn set_feature_struct(&mut self, fs: FeatureStruct) {
        self.fs = fs;
    }

    pub fn flags(&self) -> AnnotationFlags {
        self.flags
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(AnnotationFlags::OPTIONAL)
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.flags.set(AnnotationFlags::OPTIONAL, optional);
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(AnnotationFlags::DIRTY)
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.flags.set(AnnotationFlags::DIRTY, dirty);
    }

    pub fn parent(&self) -> Option<AnnotationId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<AnnotationId>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[AnnotationId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<AnnotationId> {
        &mut self.children
    }
}
