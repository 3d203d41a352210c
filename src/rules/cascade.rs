//! Multi-rule cascades.
//!
//! A cascade applies an ordered list of rules to the same input until no
//! rule can apply:
//!
//! ```text
//! Linear      r0 ─► r1 ─► r2            one pass, strictly forward
//! NonLinear   r0 ─► r1✓ ─► restart r0   any firing restarts the list
//! ```
//!
//! Non-linear cascades carry a pass bound; exceeding it raises the same
//! infinite-loop error as a runaway rule.

use tracing::debug;

use crate::data::AnnotatedData;
use crate::error::RuleError;
use crate::span::Offset;

use super::rule::PatternRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeMode {
    #[default]
    Linear,
    NonLinear,
}

/// Default bound on passes for non-linear cascades.
pub const DEFAULT_MAX_PASSES: usize = 100;

pub struct RuleCascade<D: AnnotatedData<O>, O: Offset> {
    name: String,
    rules: Vec<PatternRule<D, O>>,
    mode: CascadeMode,
    max_passes: usize,
}

impl<D: AnnotatedData<O>, O: Offset> RuleCascade<D, O> {
    pub fn new(rules: Vec<PatternRule<D, O>>) -> RuleCascade<D, O> {
        RuleCascade { name: "cascade".to_string(), rules, mode: CascadeMode::default(), max_passes: DEFAULT_MAX_PASSES }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mode(mut self, mode: CascadeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[PatternRule<D, O>] {
        &self.rules
    }

    /// Apply the cascade until no rule in the list can apply. Returns
    /// whether anything applied.
    pub fn apply(&self, input: &mut D) -> Result<bool, RuleError> {
        match self.mode {
            CascadeMode::Linear => {
                let mut applied = false;
                for rule in &self.rules {
                    if rule.apply(input)? {
                        debug!(cascade = self.name.as_str(), rule = rule.name(), "rule applied");
                        applied = true;
                    }
                }
                Ok(applied)
            }
            CascadeMode::NonLinear => {
                let mut applied = false;
                let mut passes = 0usize;
                loop {
                    passes += 1;
                    if passes > self.max_passes {
                        return Err(RuleError::InfiniteLoop { rule: self.name.clone(), applications: passes });
                    }
                    let mut fired = false;
                    for rule in &self.rules {
                        if rule.apply(input)? {
                            debug!(cascade = self.name.as_str(), rule = rule.name(), pass = passes, "rule applied");
                            fired = true;
                            applied = true;
                            break;
                        }
                    }
                    if !fired {
                        break;
                    }
                }
                Ok(applied)
            }
        }
    }
}
