//! Fluent construction of pattern trees.
//!
//! ```text
//! Pattern::new()
//!     .group("onset", |g| g.annotation(cons.clone()).zero_or_more())
//!     .annotation(vowel)
//!     .group("coda", |g| g.annotation(cons).zero_or_more())
//!     .value()
//! ```
//!
//! Quantifier methods apply to the most recently added node; `or()` closes
//! the current alternative and starts the next one. `value()` produces the
//! immutable [`Pattern`], ready to compile.

use crate::feature::FeatureStruct;

use super::{Pattern, PatternNode};

#[derive(Debug, Default)]
pub struct PatternBuilder {
    branches: Vec<Vec<PatternNode>>,
    current: Vec<PatternNode>,
}

impl PatternBuilder {
    pub(crate) fn new() -> PatternBuilder {
        PatternBuilder::default()
    }

    /// Append a constraint node.
    pub fn annotation(mut self, fs: FeatureStruct) -> Self {
        self.current.push(PatternNode::Constraint(fs));
        self
    }

    /// Append a named capturing group.
    pub fn group(mut self, name: &str, build: impl FnOnce(PatternBuilder) -> PatternBuilder) -> Self {
        let nodes = build(PatternBuilder::new()).into_nodes();
        self.current.push(PatternNode::Group { name: Some(name.to_string()), nodes });
        self
    }

    /// Append an anonymous group; it gets an auto-generated capture name
    /// at compile time.
    pub fn anonymous_group(mut self, build: impl FnOnce(PatternBuilder) -> PatternBuilder) -> Self {
        let nodes = build(PatternBuilder::new()).into_nodes();
        self.current.push(PatternNode::Group { name: None, nodes });
        self
    }

    /// Append a named top-level alternative (used by batched rules).
    pub fn subpattern(mut self, name: &str, build: impl FnOnce(PatternBuilder) -> PatternBuilder) -> Self {
        let nodes = build(PatternBuilder::new()).into_nodes();
        self.current.push(PatternNode::Subpattern { name: name.to_string(), nodes });
        self
    }

    /// Close the current alternative; the next nodes start a new one.
    pub fn or(mut self) -> Self {
        let branch = std::mem::take(&mut self.current);
        self.branches.push(branch);
        self
    }

    pub fn optional(self) -> Self {
        self.quantify(0, Some(1), true)
    }

    pub fn lazy_optional(self) -> Self {
        self.quantify(0, Some(1), false)
    }

    pub fn zero_or_more(self) -> Self {
        self.quantify(0, None, true)
    }

    pub fn lazy_zero_or_more(self) -> Self {
        self.quantify(0, None, false)
    }

    pub fn one_or_more(self) -> Self {
        self.quantify(1, None, true)
    }

    pub fn lazy_one_or_more(self) -> Self {
        self.quantify(1, None, false)
    }

    pub fn range(self, min: usize, max: usize) -> Self {
        self.quantify(min, Some(max), true)
    }

    pub fn lazy_range(self, min: usize, max: usize) -> Self {
        self.quantify(min, Some(max), false)
    }

    /// Finish building.
    pub fn value(self) -> Pattern {
        Pattern::from_nodes(self.into_nodes())
    }

    fn quantify(mut self, min: usize, max: Option<usize>, greedy: bool) -> Self {
        let node = self
            .current
            .pop()
            .expect("a quantifier must follow the node it repeats");
        self.current.push(PatternNode::Quantifier { min, max, greedy, node: Box::new(node) });
        self
    }

    fn into_nodes(mut self) -> Vec<PatternNode> {
        if self.branches.is_empty() {
            return self.current;
        }
        let mut branches = std::mem::take(&mut self.branches);
        branches.push(std::mem::take(&mut self.current));
        vec![PatternNode::Alternation(branches)]
    }
}
