//! The backtracking execution engine.
//!
//! One match attempt is a run of the compiled instruction program against
//! the sequence, starting at a scan position. `Split` pushes a saved
//! machine state (program counter, position, captures, bindings) onto an
//! explicit choice-point stack; failure pops it. Recursion depth is
//! therefore bounded by the program, not the input.
//!
//! ```text
//! thread ──Constraint ok──► advance ──…──► Accept ──acceptable?──► Match
//!    │ fail                                      │ rejected
//!    └◄─────────────── pop choice point ◄────────┘
//! ```

use std::collections::HashMap;

use tracing::trace;

use crate::data::AnnotatedData;
use crate::feature::VariableBindings;
use crate::pattern::Inst;
use crate::sequence::AnnotationId;
use crate::span::{Direction, Offset, Span};

use super::{Acceptable, Match, Matcher};

#[derive(Debug, Clone)]
struct Thread<O: Offset> {
    pc: usize,
    pos: AnnotationId,
    bindings: VariableBindings,
    captures: Vec<Option<Span<O>>>,
    accum: Vec<Option<Span<O>>>,
    open: Vec<usize>,
    overall: Option<Span<O>>,
}

impl<O: Offset> Matcher<O> {
    /// First visible annotation from the sequence's leading end in the
    /// matcher's direction, optionally at or past `offset`.
    pub(super) fn scan_first<D: AnnotatedData<O>>(&self, data: &D, offset: Option<O>) -> AnnotationId {
        let annotations = data.annotations();
        let dir = self.settings.direction;
        let mut cur = annotations.next(annotations.begin(dir), dir);
        while !annotations.is_sentinel(cur) {
            if let Some(ann) = annotations.get(cur) {
                let past = match offset {
                    None => true,
                    Some(offset) => match dir {
                        Direction::LeftToRight => ann.span().start() >= offset,
                        Direction::RightToLeft => ann.span().end() <= offset,
                    },
                };
                if past && (self.settings.filter)(ann) {
                    return cur;
                }
            }
            cur = annotations.next(cur, dir);
        }
        cur
    }

    /// `start` itself if visible, else the first visible annotation after
    /// it.
    pub(super) fn scan_at_or_after<D: AnnotatedData<O>>(&self, data: &D, start: AnnotationId) -> AnnotationId {
        let annotations = data.annotations();
        let dir = self.settings.direction;
        let mut cur = start;
        while !annotations.is_sentinel(cur) {
            if let Some(ann) = annotations.get(cur) {
                if (self.settings.filter)(ann) {
                    return cur;
                }
            }
            cur = annotations.next(cur, dir);
        }
        cur
    }

    /// Next visible scan position strictly after `cur`.
    pub(super) fn scan_next<D: AnnotatedData<O>>(&self, data: &D, cur: AnnotationId) -> AnnotationId {
        let annotations = data.annotations();
        let dir = self.settings.direction;
        let mut next = annotations.next(cur, dir);
        while !annotations.is_sentinel(next) {
            if let Some(ann) = annotations.get(next) {
                if (self.settings.filter)(ann) {
                    return next;
                }
            }
            next = annotations.next(next, dir);
        }
        next
    }

    /// First visible annotation that starts at or past the consumed
    /// annotation's trailing edge; this is how overlapping and nested
    /// annotations are stepped over.
    fn next_visible_after<D: AnnotatedData<O>>(&self, data: &D, consumed: AnnotationId) -> AnnotationId {
        let annotations = data.annotations();
        let dir = self.settings.direction;
        let boundary = match annotations.get(consumed) {
            Some(ann) => ann.span().end_in(dir),
            None => return annotations.end(dir),
        };
        let mut cur = annotations.next(consumed, dir);
        while !annotations.is_sentinel(cur) {
            if let Some(ann) = annotations.get(cur) {
                let past = match dir {
                    Direction::LeftToRight => ann.span().start() >= boundary,
                    Direction::RightToLeft => ann.span().end() <= boundary,
                };
                if past && (self.settings.filter)(ann) {
                    return cur;
                }
            }
            cur = annotations.next(cur, dir);
        }
        cur
    }

    /// Run the program from one scan position. With `all` set, every
    /// structural match is collected in backtracking priority order;
    /// otherwise the first acceptable match wins.
    pub(super) fn execute<D: AnnotatedData<O>>(
        &self,
        data: &D,
        scan: AnnotationId,
        all: bool,
        acceptable: Acceptable<'_, O>,
    ) -> Vec<Match<O>> {
        let annotations = data.annotations();
        let groups = self.pattern.groups.len();
        let mut saved: Vec<Thread<O>> = Vec::new();
        let mut thread = Thread {
            pc: 0,
            pos: scan,
            bindings: VariableBindings::new(),
            captures: vec![None; groups],
            accum: vec![None; groups],
            open: Vec::new(),
            overall: None,
        };
        let mut results = Vec::new();

        loop {
            match self.pattern.program[thread.pc] {
                Inst::Constraint(index) => {
                    let matched = annotations.get(thread.pos).is_some_and(|ann| {
                        self.pattern.constraints[index].is_unifiable(ann.feature_struct(), &mut thread.bindings)
                    });
                    if matched {
                        let span = annotations.get(thread.pos).map(|ann| ann.span()).expect("annotation just matched");
                        thread.overall = Some(match thread.overall {
                            Some(overall) => overall.expand_to(&span),
                            None => span,
                        });
                        for &group in &thread.open {
                            thread.accum[group] = Some(match thread.accum[group] {
                                Some(accum) => accum.expand_to(&span),
                                None => span,
                            });
                        }
                        thread.pos = self.next_visible_after(data, thread.pos);
                        thread.pc += 1;
                    } else if !backtrack(&mut thread, &mut saved) {
                        break;
                    }
                }
                Inst::Split { primary, alternate } => {
                    let mut alt = thread.clone();
                    alt.pc = alternate;
                    saved.push(alt);
                    thread.pc = primary;
                }
                Inst::Jump(target) => thread.pc = target,
                Inst::GroupStart(group) => {
                    thread.open.push(group);
                    thread.accum[group] = None;
                    thread.pc += 1;
                }
                Inst::GroupEnd(group) => {
                    thread.open.pop();
                    thread.captures[group] = thread.accum[group];
                    thread.pc += 1;
                }
                Inst::Accept { subpattern } => {
                    let end_ok = !self.settings.anchored_to_end || annotations.is_sentinel(thread.pos);
                    if end_ok {
                        let found = self.build_match(data, scan, &thread, subpattern);
                        if acceptable(&found) {
                            trace!(span = ?found.span, subpattern = ?found.subpattern, "match accepted");
                            results.push(found);
                            if !all {
                                break;
                            }
                        } else {
                            trace!(span = ?found.span, "match rejected by acceptable predicate");
                        }
                    }
                    if !backtrack(&mut thread, &mut saved) {
                        break;
                    }
                }
            }
        }
        results
    }

    fn build_match<D: AnnotatedData<O>>(
        &self,
        data: &D,
        scan: AnnotationId,
        thread: &Thread<O>,
        subpattern: Option<usize>,
    ) -> Match<O> {
        let annotations = data.annotations();
        let span = thread.overall.unwrap_or_else(|| {
            // Zero-width match: anchor at the scan annotation's leading
            // edge, or the data's trailing edge past the last annotation.
            match annotations.get(scan) {
                Some(ann) => Span::point(ann.span().start_in(self.settings.direction)),
                None => Span::point(data.span().end_in(self.settings.direction)),
            }
        });
        let mut groups = HashMap::new();
        for (index, name) in self.pattern.groups.iter().enumerate() {
            if let Some(captured) = thread.captures[index] {
                groups.insert(name.clone(), captured);
            }
        }
        Match {
            span,
            groups,
            bindings: thread.bindings.clone(),
            subpattern: subpattern.map(|index| self.pattern.subpatterns[index].clone()),
            start: scan,
            next: thread.pos,
        }
    }
}

fn backtrack<O: Offset>(thread: &mut Thread<O>, saved: &mut Vec<Thread<O>>) -> bool {
    match saved.pop() {
        Some(restored) => {
            *thread = restored;
            true
        }
        None => false,
    }
}
