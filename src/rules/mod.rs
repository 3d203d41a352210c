//! Rule application framework.
//!
//! This module turns single matches into rewrite processes:
//!
//! ```text
//! PatternRuleSpec        pattern + gate + rewrite action (the seam an
//!   │                    external rule compiler implements)
//!   ├─ DefaultPatternRuleSpec   closures
//!   └─ BatchPatternRuleSpec     many specs, one merged alternation
//!          │
//!          v
//! PatternRule            iterative / simultaneous driving, dirty flags,
//!          │             application bound
//!          v
//! RuleCascade            ordered rule lists, linear / non-linear
//! ```
//!
//! The concrete rewrite shapes (feature synthesis via priority-union,
//! narrowing, epenthesis, metathesis) are expressed by rule authors
//! through [`PatternRuleSpec`]; the tests in this module exercise each of
//! them.

mod cascade;
mod rule;
mod spec;

#[cfg(test)]
mod tests;

pub use cascade::{CascadeMode, RuleCascade, DEFAULT_MAX_PASSES};
pub use rule::{ApplicationMode, PatternRule, DEFAULT_MAX_APPLICATIONS};
pub use spec::{ApplicableGate, BatchPatternRuleSpec, DefaultPatternRuleSpec, PatternRuleSpec, RhsAction};
