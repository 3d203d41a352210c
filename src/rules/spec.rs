//! Rule specifications: the seam an external rule-definition layer plugs
//! into the generic application strategies.
//!
//! A [`PatternRuleSpec`] couples a pattern with a cheap applicability gate
//! and a rewrite action. The action's returned **resume node** is the
//! correctness-critical contract: resuming *before* the rewritten material
//! re-enables legitimate re-matching, resuming *after* it (the `None`
//! default) prevents a rule from endlessly re-applying to material it just
//! produced.

use crate::data::AnnotatedData;
use crate::error::{ModelError, RuleError};
use crate::matcher::Match;
use crate::pattern::{Pattern, PatternNode};
use crate::sequence::AnnotationId;
use crate::span::Offset;

/// The rewrite contract. `apply_rhs` mutates the input in place and
/// returns the node scanning should resume from; `None` means "resume
/// after the matched span".
pub trait PatternRuleSpec<D: AnnotatedData<O>, O: Offset>: Send + Sync {
    fn name(&self) -> &str {
        "rule"
    }

    fn pattern(&self) -> &Pattern;

    /// Cheap pre-check before any matching is attempted. Returning false
    /// is a silent skip, not an error.
    fn is_applicable(&self, _input: &D) -> bool {
        true
    }

    /// Evaluated once a structural match completes; rejection continues
    /// the search. This is where batched specs veto sub-rules whose gate
    /// rejects the input.
    fn match_acceptable(&self, _input: &D, _found: &Match<O>) -> bool {
        true
    }

    fn apply_rhs(&self, input: &mut D, found: &Match<O>) -> Result<Option<AnnotationId>, RuleError>;
}

pub type RhsAction<D, O> =
    Box<dyn Fn(&mut D, &Match<O>) -> Result<Option<AnnotationId>, RuleError> + Send + Sync>;
pub type ApplicableGate<D> = Box<dyn Fn(&D) -> bool + Send + Sync>;

/// A rule spec assembled from closures: the common case for rules defined
/// in code rather than by a rule compiler.
pub struct DefaultPatternRuleSpec<D, O: Offset> {
    name: String,
    pattern: Pattern,
    rhs: RhsAction<D, O>,
    gate: Option<ApplicableGate<D>>,
}

impl<D: AnnotatedData<O>, O: Offset> DefaultPatternRuleSpec<D, O> {
    pub fn new(pattern: Pattern, rhs: RhsAction<D, O>) -> DefaultPatternRuleSpec<D, O> {
        DefaultPatternRuleSpec { name: "rule".to_string(), pattern, rhs, gate: None }
    }

    pub fn with_gate(pattern: Pattern, rhs: RhsAction<D, O>, gate: ApplicableGate<D>) -> DefaultPatternRuleSpec<D, O> {
        DefaultPatternRuleSpec { name: "rule".to_string(), pattern, rhs, gate: Some(gate) }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<D: AnnotatedData<O>, O: Offset> PatternRuleSpec<D, O> for DefaultPatternRuleSpec<D, O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn is_applicable(&self, input: &D) -> bool {
        self.gate.as_ref().is_none_or(|gate| gate(input))
    }

    fn apply_rhs(&self, input: &mut D, found: &Match<O>) -> Result<Option<AnnotationId>, RuleError> {
        (self.rhs)(input, found)
    }
}

/// Merges several rule specs into one compiled alternation so a single
/// matching pass serves many candidate rules.
///
/// Each sub-spec becomes a subpattern named `rule0`, `rule1`, … and its
/// group names are prefixed `rule{i}_` to avoid collisions; the first
/// alternative that matches determines which sub-spec's action runs, with
/// group names un-prefixed again before dispatch. A sub-spec whose gate
/// rejects the current input is vetoed during matching, so an
/// inapplicable earlier rule never shadows an applicable later one.
pub struct BatchPatternRuleSpec<D: AnnotatedData<O>, O: Offset> {
    name: String,
    specs: Vec<Box<dyn PatternRuleSpec<D, O>>>,
    pattern: Pattern,
}

impl<D: AnnotatedData<O>, O: Offset> BatchPatternRuleSpec<D, O> {
    pub fn new(specs: Vec<Box<dyn PatternRuleSpec<D, O>>>) -> BatchPatternRuleSpec<D, O> {
        let nodes = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| PatternNode::Subpattern {
                name: format!("rule{index}"),
                nodes: prefix_groups(spec.pattern().nodes(), &format!("rule{index}_")),
            })
            .collect();
        BatchPatternRuleSpec { name: "batch".to_string(), specs, pattern: Pattern::from_nodes(nodes) }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn dispatch_index(&self, found: &Match<O>) -> Result<usize, RuleError> {
        found
            .subpattern
            .as_deref()
            .and_then(|name| name.strip_prefix("rule"))
            .and_then(|index| index.parse::<usize>().ok())
            .filter(|&index| index < self.specs.len())
            .ok_or_else(|| {
                RuleError::Model(ModelError::InvalidPattern("batch match carries no subpattern identity".to_string()))
            })
    }

    /// Rebuild the match as the sub-spec expects it: its own group names,
    /// no subpattern identity.
    fn demote(&self, index: usize, found: &Match<O>) -> Match<O> {
        let prefix = format!("rule{index}_");
        let mut demoted = found.clone();
        demoted.subpattern = None;
        demoted.groups = found
            .groups
            .iter()
            .filter_map(|(name, span)| name.strip_prefix(&prefix).map(|stripped| (stripped.to_string(), *span)))
            .collect();
        demoted
    }
}

impl<D: AnnotatedData<O>, O: Offset> PatternRuleSpec<D, O> for BatchPatternRuleSpec<D, O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn is_applicable(&self, input: &D) -> bool {
        self.specs.iter().any(|spec| spec.is_applicable(input))
    }

    fn match_acceptable(&self, input: &D, found: &Match<O>) -> bool {
        match self.dispatch_index(found) {
            Ok(index) => {
                self.specs[index].is_applicable(input)
                    && self.specs[index].match_acceptable(input, &self.demote(index, found))
            }
            Err(_) => false,
        }
    }

    fn apply_rhs(&self, input: &mut D, found: &Match<O>) -> Result<Option<AnnotationId>, RuleError> {
        let index = self.dispatch_index(found)?;
        let demoted = self.demote(index, found);
        self.specs[index].apply_rhs(input, &demoted)
    }
}

fn prefix_groups(nodes: &[PatternNode], prefix: &str) -> Vec<PatternNode> {
    nodes
        .iter()
        .map(|node| match node {
            PatternNode::Group { name, nodes } => PatternNode::Group {
                name: name.as_ref().map(|name| format!("{prefix}{name}")),
                nodes: prefix_groups(nodes, prefix),
            },
            PatternNode::Quantifier { min, max, greedy, node } => PatternNode::Quantifier {
                min: *min,
                max: *max,
                greedy: *greedy,
                node: Box::new(prefix_groups(std::slice::from_ref(node.as_ref()), prefix).remove(0)),
            },
            PatternNode::Alternation(branches) => PatternNode::Alternation(
                branches.iter().map(|branch| prefix_groups(branch, prefix)).collect(),
            ),
            PatternNode::Subpattern { name, nodes } => {
                PatternNode::Subpattern { name: name.clone(), nodes: prefix_groups(nodes, prefix) }
            }
            PatternNode::Constraint(fs) => PatternNode::Constraint(fs.clone()),
        })
        .collect()
}
