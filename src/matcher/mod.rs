//! Backtracking matcher.
//!
//! Executes a compiled pattern against an annotated sequence:
//!
//! ```text
//! pattern ── compile ──► CompiledPattern (instruction program)
//!                              │
//! data ── scan positions ──► execute (engine.rs)
//!                              │  explicit choice-point stack
//!                              v
//!                    Match { span, groups, bindings }
//! ```
//!
//! The matcher never mutates the sequence or the pattern. "No match" is an
//! `Option::None`, not an error; a constraint that cannot unify with any
//! candidate fails locally and backtracks.
//!
//! Scanning is direction-aware: `RightToLeft` swaps which end is scanned
//! first and which end of every span is reported as its start. For
//! right-to-left matching the annotation filter must select
//! non-overlapping annotations (segment-level material); left-to-right
//! matching handles overlapping and nested annotations.

mod engine;


use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::data::AnnotatedData;
use crate::error::ModelError;
use crate::feature::VariableBindings;
use crate::pattern::{CompiledPattern, Pattern};
use crate::sequence::{Annotation, AnnotationId};
use crate::span::{Direction, Offset, Span};

/// Which annotations are visible to constraints.
pub type AnnotationFilter<O> = Arc<dyn Fn(&Annotation<O>) -> bool + Send + Sync>;

/// A predicate evaluated once a structural match completes; rejection
/// continues backtracking instead of stopping the search.
pub type Acceptable<'a, O> = &'a dyn Fn(&Match<O>) -> bool;

pub struct MatcherSettings<O> {
    pub direction: Direction,
    pub filter: AnnotationFilter<O>,
    pub anchored_to_start: bool,
    pub anchored_to_end: bool,
}

impl<O> Clone for MatcherSettings<O> {
    fn clone(&self) -> MatcherSettings<O> {
        MatcherSettings {
            direction: self.direction,
            filter: Arc::clone(&self.filter),
            anchored_to_start: self.anchored_to_start,
            anchored_to_end: self.anchored_to_end,
        }
    }
}

impl<O> Default for MatcherSettings<O> {
    fn default() -> MatcherSettings<O> {
        MatcherSettings {
            direction: Direction::LeftToRight,
            filter: Arc::new(|_| true),
            anchored_to_start: false,
            anchored_to_end: false,
        }
    }
}

impl<O> fmt::Debug for MatcherSettings<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherSettings")
            .field("direction", &self.direction)
            .field("filter", &"<predicate>")
            .field("anchored_to_start", &self.anchored_to_start)
            .field("anchored_to_end", &self.anchored_to_end)
            .finish()
    }
}

/// One successful match: overall span, captures, accumulated variable
/// bindings, and the position scanning should continue from.
#[derive(Debug, Clone)]
pub struct Match<O: Offset> {
    pub span: Span<O>,
    /// Group name to captured span; a group that consumed nothing has no
    /// entry.
    pub groups: HashMap<String, Span<O>>,
    pub bindings: VariableBindings,
    /// Which top-level subpattern matched, when the pattern has them.
    pub subpattern: Option<String>,
    /// The annotation the match attempt started at.
    pub start: AnnotationId,
    /// The first visible annotation after the match (sentinel if none).
    pub next: AnnotationId,
}

impl<O: Offset> Match<O> {
    pub fn group(&self, name: &str) -> Option<Span<O>> {
        self.groups.get(name).copied()
    }
}

/// Compiled pattern + settings; cheap to clone, reusable across inputs.
#[derive(Debug, Clone)]
pub struct Matcher<O: Offset> {
    pattern: Arc<CompiledPattern>,
    settings: MatcherSettings<O>,
}

impl<O: Offset> Matcher<O> {
    pub fn new(pattern: &Pattern, settings: MatcherSettings<O>) -> Result<Matcher<O>, ModelError> {
        Ok(Matcher { pattern: pattern.compile()?, settings })
    }

    pub fn from_compiled(pattern: Arc<CompiledPattern>, settings: MatcherSettings<O>) -> Matcher<O> {
        Matcher { pattern, settings }
    }

    pub fn direction(&self) -> Direction {
        self.settings.direction
    }

    pub fn settings(&self) -> &MatcherSettings<O> {
        &self.settings
    }

    pub fn pattern(&self) -> &Arc<CompiledPattern> {
        &self.pattern
    }

    pub fn is_match<D: AnnotatedData<O>>(&self, data: &D) -> bool {
        self.find(data).is_some()
    }

    pub fn is_match_at<D: AnnotatedData<O>>(&self, data: &D, offset: O) -> bool {
        self.find_at(data, offset).is_some()
    }

    /// First match scanning from the sequence's leading end.
    pub fn find<D: AnnotatedData<O>>(&self, data: &D) -> Option<Match<O>> {
        self.find_with(data, &|_| true)
    }

    pub fn find_with<D: AnnotatedData<O>>(&self, data: &D, acceptable: Acceptable<'_, O>) -> Option<Match<O>> {
        let scan = self.scan_first(data, None);
        self.find_scanning(data, scan, acceptable)
    }

    /// First match scanning from the given offset.
    pub fn find_at<D: AnnotatedData<O>>(&self, data: &D, offset: O) -> Option<Match<O>> {
        let scan = self.scan_first(data, Some(offset));
        self.find_scanning(data, scan, &|_| true)
    }

    /// First match scanning from the given annotation (inclusive).
    pub fn find_from<D: AnnotatedData<O>>(&self, data: &D, start: AnnotationId) -> Option<Match<O>> {
        self.find_from_with(data, start, &|_| true)
    }

    pub fn find_from_with<D: AnnotatedData<O>>(
        &self,
        data: &D,
        start: AnnotationId,
        acceptable: Acceptable<'_, O>,
    ) -> Option<Match<O>> {
        let scan = self.scan_at_or_after(data, start);
        self.find_scanning(data, scan, acceptable)
    }

    /// Successive non-overlapping matches: each search resumes after the
    /// previous match.
    pub fn matches<D: AnnotatedData<O>>(&self, data: &D) -> Vec<Match<O>> {
        self.matches_scanning(data, self.scan_first(data, None), &|_| true)
    }

    pub fn matches_at<D: AnnotatedData<O>>(&self, data: &D, offset: O) -> Vec<Match<O>> {
        self.matches_scanning(data, self.scan_first(data, Some(offset)), &|_| true)
    }

    pub fn matches_with<D: AnnotatedData<O>>(&self, data: &D, acceptable: Acceptable<'_, O>) -> Vec<Match<O>> {
        self.matches_scanning(data, self.scan_first(data, None), acceptable)
    }

    /// Every structural match at every scan position, in backtracking
    /// priority order per position.
    pub fn all_matches<D: AnnotatedData<O>>(&self, data: &D) -> Vec<Match<O>> {
        self.all_matches_scanning(data, self.scan_first(data, None))
    }

    pub fn all_matches_at<D: AnnotatedData<O>>(&self, data: &D, offset: O) -> Vec<Match<O>> {
        self.all_matches_scanning(data, self.scan_first(data, Some(offset)))
    }

    fn find_scanning<D: AnnotatedData<O>>(
        &self,
        data: &D,
        mut scan: AnnotationId,
        acceptable: Acceptable<'_, O>,
    ) -> Option<Match<O>> {
        let annotations = data.annotations();
        while !annotations.is_sentinel(scan) {
            if let Some(found) = self.execute(data, scan, false, acceptable).into_iter().next() {
                return Some(found);
            }
            if self.settings.anchored_to_start {
                return None;
            }
            scan = self.scan_next(data, scan);
        }
        None
    }

    fn matches_scanning<D: AnnotatedData<O>>(
        &self,
        data: &D,
        mut scan: AnnotationId,
        acceptable: Acceptable<'_, O>,
    ) -> Vec<Match<O>> {
        let annotations = data.annotations();
        let mut results = Vec::new();
        while !annotations.is_sentinel(scan) {
            match self.execute(data, scan, false, acceptable).into_iter().next() {
                Some(found) => {
                    let consumed = found.next != scan;
                    let next = found.next;
                    results.push(found);
                    scan = if consumed { next } else { self.scan_next(data, scan) };
                }
                None => {
                    if self.settings.anchored_to_start {
                        break;
                    }
                    scan = self.scan_next(data, scan);
                }
            }
        }
        results
    }

    fn all_matches_scanning<D: AnnotatedData<O>>(&self, data: &D, mut scan: AnnotationId) -> Vec<Match<O>> {
        let annotations = data.annotations();
        let mut results = Vec::new();
        while !annotations.is_sentinel(scan) {
            results.extend(self.execute(data, scan, true, &|_| true));
            if self.settings.anchored_to_start {
                break;
            }
            scan = self.scan_next(data, scan);
        }
        results
    }
}
