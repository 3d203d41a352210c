//! A unification-based feature-structure pattern-matching and rewrite-rule
//! engine for annotated symbol sequences.
//!
//! The crate is the linguistic analogue of a regex engine: patterns are
//! compiled trees of constraints, groups, quantifiers and alternations;
//! matching is backtracking search over an ordered, mutable sequence of
//! annotations; successful matches drive in-place rewrites of that
//! sequence, which is then re-scanned safely without looping forever.
//!
//! ## How the parts work together
//!
//! ```text
//! FeatureSystem / FeatureStruct      constraint unification   (feature)
//!            │
//! AnnotatedData + AnnotationList     skip-list ordered nodes  (sequence, data)
//!            │
//! Pattern ── compile ──► Matcher     backtracking search      (pattern, matcher)
//!            │
//! PatternRule / RuleCascade          rewrite strategies       (rules)
//! ```
//!
//! A caller compiles a [`Pattern`], wraps it plus a rule spec into a
//! [`PatternRule`], and repeatedly applies it to a sequence; each
//! application asks the matcher for the next match, invokes the spec's
//! rewrite action, and uses the action's returned resumption point to
//! continue scanning without re-matching rewritten material.
//!
//! The engine is fully synchronous and in-memory: no I/O, no persistence,
//! no concurrency. Callers serialize access to a sequence.

pub mod data;
pub mod error;
pub mod feature;
pub mod matcher;
pub mod pattern;
pub mod rules;
pub mod sequence;
pub mod span;

#[cfg(test)]
pub(crate) mod test_support;

pub use data::{AnnotatedData, AnnotatedStringData};
pub use error::{ModelError, RuleError};
pub use feature::{
    FeatureStruct, FeatureStructBuilder, FeatureSystem, FeatureValue, SimpleValue, Variable, VariableBindings,
};
pub use matcher::{Match, Matcher, MatcherSettings};
pub use pattern::{Pattern, PatternBuilder, PatternNode};
pub use rules::{
    ApplicationMode, BatchPatternRuleSpec, CascadeMode, DefaultPatternRuleSpec, PatternRule, PatternRuleSpec,
    RuleCascade,
};
pub use sequence::{Annotation, AnnotationFlags, AnnotationId, AnnotationList};
pub use span::{Direction, IntegerSpanFactory, Offset, Span, SpanFactory};
