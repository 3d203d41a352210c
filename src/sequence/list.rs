//! Span-ordered annotation list.
//!
//! Wraps the skip list with the annotation ordering used everywhere in this
//! crate: span start ascending, span end *descending* (so enclosing
//! annotations sort before the material they cover), then insertion id as a
//! deterministic tiebreak.
//!
//! ```text
//! "the old"  →  [word 0..3] [t 0..1] [h 1..2] [e 2..3] [bdry 3..4] [word 4..7] …
//! ```

use std::cmp::Ordering;

use crate::feature::FeatureStruct;
use crate::span::{Direction, Offset, Span};

use super::annotation::{Annotation, AnnotationId};
use super::skip_list::SkipList;

fn compare<O: Offset>(a: &Annotation<O>, b: &Annotation<O>) -> Ordering {
    a.span()
        .start()
        .cmp(&b.span().start())
        .then(b.span().end().cmp(&a.span().end()))
        .then(a.list_id.cmp(&b.list_id))
}

#[derive(Debug, Clone)]
pub struct AnnotationList<O: Offset> {
    list: SkipList<Annotation<O>>,
    next_list_id: u64,
}

impl<O: Offset> AnnotationList<O> {
    pub fn new() -> AnnotationList<O> {
        AnnotationList { list: SkipList::new(), next_list_id: 1 }
    }

    /// Deterministic skip-list levels, for reproducible tests.
    pub fn with_seed(seed: u64) -> AnnotationList<O> {
        AnnotationList { list: SkipList::with_seed(seed), next_list_id: 1 }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn levels(&self) -> usize {
        self.list.levels()
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.list.contains(id)
    }

    pub fn is_sentinel(&self, id: AnnotationId) -> bool {
        self.list.is_sentinel(id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation<O>> {
        self.list.get(id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation<O>> {
        self.list.get_mut(id)
    }

    /// Add a free-standing annotation; it acquires its position from the
    /// span ordering.
    pub fn add(&mut self, mut ann: Annotation<O>) -> AnnotationId {
        ann.list_id = self.next_list_id;
        self.next_list_id += 1;
        self.list.insert(ann, compare)
    }

    /// Convenience: build and add a leaf annotation.
    pub fn add_span(&mut self, span: Span<O>, fs: FeatureStruct) -> AnnotationId {
        self.add(Annotation::new(span, fs))
    }

    /// Add an annotation and wire up the parent/child tree: annotations
    /// strictly contained in the new span become its children, and the
    /// closest enclosing annotation (if any) becomes its parent.
    pub fn add_subsuming(&mut self, ann: Annotation<O>) -> AnnotationId {
        let span = ann.span();
        let id = self.add(ann);

        let children: Vec<AnnotationId> = self
            .iter(Direction::LeftToRight)
            .filter(|&other| other != id)
            .filter(|&other| {
                let other_ann = &self.list.get(other).expect("iterated node is live");
                other_ann.parent().is_none() && span.contains(&other_ann.span()) && other_ann.span() != span
            })
            .collect();
        for child in &children {
            if let Some(child_ann) = self.list.get_mut(*child) {
                child_ann.set_parent(Some(id));
            }
        }

        // The closest enclosing annotation precedes this one in list order.
        let mut parent = None;
        let mut cur = self.list.prev(id, Direction::LeftToRight);
        while !self.list.is_sentinel(cur) {
            let cur_ann = self.list.get(cur).expect("linked node is live");
            if cur_ann.span().contains(&span) && cur_ann.span() != span {
                parent = Some(cur);
                break;
            }
            cur = self.list.prev(cur, Direction::LeftToRight);
        }

        if let Some(ann) = self.list.get_mut(id) {
            *ann.children_mut() = children.clone();
            ann.set_parent(parent);
        }
        if let Some(parent) = parent {
            if let Some(parent_ann) = self.list.get_mut(parent) {
                parent_ann.children_mut().push(id);
            }
        }
        id
    }

    /// Unlink an annotation; it becomes free-standing (payload retained)
    /// and its tree links are detached.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        if !self.list.contains(id) {
            return false;
        }
        self.detach(id);
        self.list.remove(id)
    }

    /// Remove the annotation and free its slot, returning the payload.
    pub fn discard(&mut self, id: AnnotationId) -> Option<Annotation<O>> {
        if self.list.contains(id) {
            self.detach(id);
            self.list.remove(id);
        }
        self.list.discard(id)
    }

    /// Re-link a node previously unlinked with [`AnnotationList::remove`],
    /// positioned by its current span.
    pub fn reinsert(&mut self, id: AnnotationId) -> bool {
        self.list.reinsert(id, compare)
    }

    /// Move an annotation to a new span: unlink, update, re-link. This is
    /// the primitive relocation used by reordering rewrites.
    pub fn update_span(&mut self, id: AnnotationId, span: Span<O>) -> bool {
        let was_linked = self.list.contains(id);
        if was_linked {
            self.list.remove(id);
        }
        match self.list.get_mut(id) {
            Some(ann) => ann.set_span(span),
            None => return false,
        }
        if was_linked { self.list.reinsert(id, compare) } else { true }
    }

    /// The sentinel that precedes everything in `dir`.
    pub fn begin(&self, dir: Direction) -> AnnotationId {
        self.list.begin(dir)
    }

    /// The sentinel that follows everything in `dir`.
    pub fn end(&self, dir: Direction) -> AnnotationId {
        self.list.end(dir)
    }

    pub fn first(&self, dir: Direction) -> Option<AnnotationId> {
        self.list.first(dir)
    }

    pub fn last(&self, dir: Direction) -> Option<AnnotationId> {
        self.list.last(dir)
    }

    /// Successor in `dir`; sentinel-saturating so `Begin`/`End` swap roles
    /// transparently for right-to-left traversal.
    pub fn next(&self, id: AnnotationId, dir: Direction) -> AnnotationId {
        self.list.next(id, dir)
    }

    pub fn prev(&self, id: AnnotationId, dir: Direction) -> AnnotationId {
        self.list.prev(id, dir)
    }

    /// Skip-list descent for an annotation with exactly `probe`'s span and
    /// insertion id; `Err` carries the closest node preceding it in `dir`
    /// terms. `start` supports repeated localized lookups.
    pub fn find(
        &self,
        probe: &Annotation<O>,
        dir: Direction,
        start: Option<AnnotationId>,
    ) -> Result<AnnotationId, AnnotationId> {
        self.list.find(probe, dir, start, compare)
    }

    /// First annotation whose leading edge in `dir` equals `offset`:
    /// `Ok(id)`, or `Err` with the node the search stopped at.
    pub fn find_at(&self, offset: O, dir: Direction) -> Result<AnnotationId, AnnotationId> {
        match dir {
            Direction::LeftToRight => {
                // Descend by start offset only, then walk back over equal
                // starts so the *first* (enclosing) annotation wins.
                let probe = Annotation::new(Span::point(offset), FeatureStruct::new());
                let result =
                    self.list.find(&probe, dir, None, |a, b| a.span().start().cmp(&b.span().start()));
                match result {
                    Ok(mut id) => {
                        loop {
                            let prev = self.list.prev(id, dir);
                            if self.list.is_sentinel(prev) {
                                break;
                            }
                            let prev_ann = self.list.get(prev).expect("linked node is live");
                            if prev_ann.span().start() != offset {
                                break;
                            }
                            id = prev;
                        }
                        Ok(id)
                    }
                    Err(id) => Err(id),
                }
            }
            Direction::RightToLeft => {
                // Trailing-edge positions are not monotone under nesting,
                // so scan linearly from the right.
                let mut cur = self.list.next(self.list.begin(dir), dir);
                let mut closest = self.list.begin(dir);
                while !self.list.is_sentinel(cur) {
                    let ann = self.list.get(cur).expect("linked node is live");
                    let pos = ann.span().start_in(dir);
                    if pos == offset {
                        return Ok(cur);
                    }
                    if pos > offset {
                        closest = cur;
                    }
                    cur = self.list.next(cur, dir);
                }
                Err(closest)
            }
        }
    }

    /// Annotations wholly contained in `span`, in `dir` order.
    pub fn contained_in(&self, span: Span<O>, dir: Direction) -> Vec<AnnotationId> {
        let mut result: Vec<AnnotationId> = self
            .iter(Direction::LeftToRight)
            .filter(|&id| {
                let ann = self.list.get(id).expect("iterated node is live");
                span.contains(&ann.span())
            })
            .collect();
        if dir == Direction::RightToLeft {
            result.reverse();
        }
        result
    }

    /// Annotations whose span intersects `span` (morph boundaries crossing
    /// a rewritten region, for example).
    pub fn overlapping(&self, span: Span<O>) -> Vec<AnnotationId> {
        self.iter(Direction::LeftToRight)
            .filter(|&id| {
                let ann = self.list.get(id).expect("iterated node is live");
                ann.span().overlaps(&span)
            })
            .collect()
    }

    pub fn iter(&self, dir: Direction) -> impl Iterator<Item = AnnotationId> + '_ {
        self.list.iter(dir).map(|(id, _)| id)
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.next_list_id = 1;
    }

    /// Clear the dirty marker on every annotation (start of a rule pass).
    pub fn clear_dirty(&mut self) {
        let ids: Vec<AnnotationId> = self.iter(Direction::LeftToRight).collect();
        for id in ids {
            if let Some(ann) = self.list.get_mut(id) {
                ann.set_dirty(false);
            }
        }
    }

    fn detach(&mut self, id: AnnotationId) {
        let (parent, children) = match self.list.get(id) {
            Some(ann) => (ann.parent(), ann.children().to_vec()),
            None => return,
        };
        if let Some(parent) = parent {
            if let Some(parent_ann) = self.list.get_mut(parent) {
                parent_ann.children_mut().retain(|&child| child != id);
            }
        }
        for child in children {
            if let Some(child_ann) = self.list.get_mut(child) {
                child_ann.set_parent(None);
            }
        }
        if let Some(ann) = self.list.get_mut(id) {
            ann.set_parent(None);
            ann.children_mut().clear();
        }
    }
}

impl<O: Offset> Default for AnnotationList<O> {
    fn default() -> AnnotationList<O> {
        AnnotationList::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureStruct;

    fn spans(list: &AnnotationList<usize>, dir: Direction) -> Vec<(usize, usize)> {
        list.iter(dir)
            .map(|id| {
                let span = list.get(id).unwrap().span();
                (span.start(), span.end())
            })
            .collect()
    }

    fn add(list: &mut AnnotationList<usize>, start: usize, end: usize) -> AnnotationId {
        list.add_span(Span::new(start, end), FeatureStruct::new())
    }

    #[test]
    fn order_is_start_then_longest_first() {
        let mut list = AnnotationList::with_seed(3);
        add(&mut list, 4, 7);
        add(&mut list, 0, 3);
        add(&mut list, 0, 18);
        add(&mut list, 1, 2);

        assert_eq!(spans(&list, Direction::LeftToRight), vec![(0, 18), (0, 3), (1, 2), (4, 7)]);
        assert_eq!(spans(&list, Direction::RightToLeft), vec![(4, 7), (1, 2), (0, 3), (0, 18)]);
    }

    #[test]
    fn remove_then_contains_is_false() {
        let mut list = AnnotationList::with_seed(3);
        let id = add(&mut list, 0, 1);
        assert!(list.contains(id));
        assert!(list.remove(id));
        assert!(!list.contains(id));
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn update_span_relocates_the_node() {
        let mut list = AnnotationList::with_seed(3);
        let a = add(&mut list, 0, 1);
        add(&mut list, 1, 2);
        add(&mut list, 2, 3);

        assert!(list.update_span(a, Span::new(2, 3)));
        assert_eq!(spans(&list, Direction::LeftToRight), vec![(1, 2), (2, 3), (2, 3)]);
        assert_eq!(list.get(a).unwrap().span(), Span::new(2, 3));
    }

    #[test]
    fn find_at_returns_the_first_node_in_direction_order() {
        let mut list = AnnotationList::with_seed(3);
        add(&mut list, 0, 1);
        let word = add(&mut list, 0, 3);
        let last = add(&mut list, 2, 3);

        // Among equal starts the enclosing annotation sorts first left to
        // right; right to left the leaf at the right edge comes first.
        assert_eq!(list.find_at(0, Direction::LeftToRight), Ok(word));
        assert_eq!(list.find_at(3, Direction::RightToLeft), Ok(last));
        assert!(list.find_at(9, Direction::LeftToRight).is_err());
    }

    #[test]
    fn subsumption_builds_the_tree() {
        let mut list = AnnotationList::with_seed(3);
        let a = add(&mut list, 0, 1);
        let b = add(&mut list, 1, 2);
        let out = add(&mut list, 4, 5);
        let word = list.add_subsuming(Annotation::new(Span::new(0, 2), FeatureStruct::new()));

        assert_eq!(list.get(word).unwrap().children(), &[a, b]);
        assert_eq!(list.get(a).unwrap().parent(), Some(word));
        assert_eq!(list.get(out).unwrap().parent(), None);

        list.remove(word);
        assert_eq!(list.get(a).unwrap().parent(), None);
    }

    #[test]
    fn overlap_queries_see_crossing_annotations() {
        let mut list = AnnotationList::with_seed(3);
        let morph = add(&mut list, 0, 4);
        add(&mut list, 0, 2);
        let tail = add(&mut list, 4, 6);

        let hits = list.overlapping(Span::new(3, 5));
        assert!(hits.contains(&morph));
        assert!(hits.contains(&tail));
        assert_eq!(hits.len(), 2);

        assert_eq!(list.contained_in(Span::new(0, 4), Direction::LeftToRight).len(), 2);
    }
}
