//! Rule application strategies.
//!
//! A [`PatternRule`] drives a [`PatternRuleSpec`] against an input:
//!
//! ```text
//! Iterative      find ─► apply ─► resume ─► find ─► …  until no match
//! Simultaneous   find ALL non-overlapping matches, then apply each
//! ```
//!
//! After every application the framework marks annotations overlapping
//! the rewritten span dirty. The application bound is the hard loop
//! guarantee: exceeding it raises [`RuleError::InfiniteLoop`] with the
//! rule's name instead of hanging.

use std::sync::Arc;

use tracing::debug;

use crate::data::AnnotatedData;
use crate::error::{ModelError, RuleError};
use crate::matcher::{Match, Matcher, MatcherSettings};
use crate::pattern::CompiledPattern;
use crate::sequence::AnnotationId;
use crate::span::{Direction, Offset, Span};

use super::spec::PatternRuleSpec;

/// How one rule's applications interleave with its own rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationMode {
    #[default]
    Iterative,
    Simultaneous,
}

/// Default bound on applications per [`PatternRule::apply`] call.
pub const DEFAULT_MAX_APPLICATIONS: usize = 1000;

pub struct PatternRule<D: AnnotatedData<O>, O: Offset> {
    spec: Box<dyn PatternRuleSpec<D, O>>,
    compiled: Arc<CompiledPattern>,
    settings: MatcherSettings<O>,
    mode: ApplicationMode,
    max_applications: usize,
}

impl<D: AnnotatedData<O>, O: Offset> PatternRule<D, O> {
    pub fn new(spec: impl PatternRuleSpec<D, O> + 'static) -> Result<PatternRule<D, O>, ModelError> {
        Self::with_settings(spec, MatcherSettings::default())
    }

    pub fn with_settings(
        spec: impl PatternRuleSpec<D, O> + 'static,
        settings: MatcherSettings<O>,
    ) -> Result<PatternRule<D, O>, ModelError> {
        let compiled = spec.pattern().compile()?;
        Ok(PatternRule {
            spec: Box::new(spec),
            compiled,
            settings,
            mode: ApplicationMode::default(),
            max_applications: DEFAULT_MAX_APPLICATIONS,
        })
    }

    pub fn with_mode(mut self, mode: ApplicationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_applications(mut self, max_applications: usize) -> Self {
        self.max_applications = max_applications;
        self
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn direction(&self) -> Direction {
        self.settings.direction
    }

    /// Apply the rule until quiescent. Returns whether it applied at
    /// least once.
    pub fn apply(&self, input: &mut D) -> Result<bool, RuleError> {
        if !self.spec.is_applicable(input) {
            return Ok(false);
        }
        input.annotations_mut().clear_dirty();
        match self.mode {
            ApplicationMode::Iterative => self.apply_iterative(input),
            ApplicationMode::Simultaneous => self.apply_simultaneous(input),
        }
    }

    fn apply_iterative(&self, input: &mut D) -> Result<bool, RuleError> {
        let matcher = Matcher::from_compiled(self.compiled.clone(), self.settings.clone());
        let mut scan: Option<AnnotationId> = None;
        let mut applications = 0usize;

        loop {
            let found = {
                let data: &D = &*input;
                let acceptable = move |candidate: &Match<O>| self.spec.match_acceptable(data, candidate);
                match scan {
                    None => matcher.find_with(data, &acceptable),
                    Some(id) => matcher.find_from_with(data, id, &acceptable),
                }
            };
            let Some(found) = found else {
                break;
            };

            applications += 1;
            if applications > self.max_applications {
                return Err(RuleError::InfiniteLoop { rule: self.spec.name().to_string(), applications });
            }

            debug!(rule = self.spec.name(), span = ?found.span, application = applications, "applying rule");
            let resume = self.spec.apply_rhs(input, &found)?;
            mark_dirty(input, found.span);
            scan = Some(match resume {
                Some(id) => id,
                None => next_after_span(input, found.span, self.settings.direction),
            });
        }

        Ok(applications > 0)
    }

    fn apply_simultaneous(&self, input: &mut D) -> Result<bool, RuleError> {
        let matcher = Matcher::from_compiled(self.compiled.clone(), self.settings.clone());
        let found_matches = {
            let data: &D = &*input;
            let acceptable = move |candidate: &Match<O>| self.spec.match_acceptable(data, candidate);
            matcher.matches_with(data, &acceptable)
        };
        debug!(rule = self.spec.name(), matches = found_matches.len(), "applying rule simultaneously");
        for found in &found_matches {
            self.spec.apply_rhs(input, found)?;
            mark_dirty(input, found.span);
        }
        Ok(!found_matches.is_empty())
    }
}

fn mark_dirty<D: AnnotatedData<O>, O: Offset>(input: &mut D, span: Span<O>) {
    let annotations = input.annotations_mut();
    for id in annotations.overlapping(span) {
        if let Some(ann) = annotations.get_mut(id) {
            ann.set_dirty(true);
        }
    }
}

/// First annotation whose leading edge in `dir` is at or past the span's
/// trailing edge: the default resume point.
fn next_after_span<D: AnnotatedData<O>, O: Offset>(input: &D, span: Span<O>, dir: Direction) -> AnnotationId {
    let annotations = input.annotations();
    let boundary = span.end_in(dir);
    let mut cur = annotations.next(annotations.begin(dir), dir);
    while !annotations.is_sentinel(cur) {
        if let Some(ann) = annotations.get(cur) {
            let past = match dir {
                Direction::LeftToRight => ann.span().start() >= boundary,
                Direction::RightToLeft => ann.span().end() <= boundary,
            };
            if past {
                return cur;
            }
        }
        cur = annotations.next(cur, dir);
    }
    cur
}
