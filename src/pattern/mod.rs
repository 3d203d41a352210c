//! Pattern model and compiler.
//!
//! A pattern is a tree of nodes:
//!
//! ```text
//! Pattern
//! ├─ Constraint(fs)                 unify fs against one annotation
//! ├─ Group { name?, children }      record the sub-span under a name
//! ├─ Quantifier { min, max, greedy} repeat the child within [min, max]
//! ├─ Alternation [branch, …]        first branch to succeed wins
//! └─ Subpattern { name, children }  top-level alternative with identity
//!                                   (batched rules dispatch on it)
//! ```
//!
//! [`Pattern::compile`] normalizes the tree (flattens anonymous wrapper
//! groups, validates quantifier bounds, auto-names anonymous groups) and
//! lowers it to the small instruction program the matcher executes. The
//! compiled pattern is immutable and shared across matchers.

mod builder;
mod program;

pub use builder::PatternBuilder;
pub(crate) use program::Inst;

use std::sync::Arc;

use crate::error::ModelError;
use crate::feature::FeatureStruct;

/// One node of a pattern tree.
#[derive(Debug, Clone)]
pub enum PatternNode {
    /// Match one annotation whose feature structure unifies with the
    /// constraint's.
    Constraint(FeatureStruct),
    /// A capturing group; anonymous groups get an auto-generated name at
    /// compile time.
    Group { name: Option<String>, nodes: Vec<PatternNode> },
    /// Bounded repetition; `max == None` means unbounded.
    Quantifier { min: usize, max: Option<usize>, greedy: bool, node: Box<PatternNode> },
    /// Ordered alternatives; declaration order is priority order.
    Alternation(Vec<Vec<PatternNode>>),
    /// A named top-level alternative. Only valid at the root.
    Subpattern { name: String, nodes: Vec<PatternNode> },
}

/// An assembled (not yet compiled) pattern tree.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    nodes: Vec<PatternNode>,
}

impl Pattern {
    /// Start the fluent builder. This is the DSL surface rule definitions
    /// are written in; see [`PatternBuilder`].
    pub fn new() -> PatternBuilder {
        PatternBuilder::new()
    }

    pub fn from_nodes(nodes: Vec<PatternNode>) -> Pattern {
        Pattern { nodes }
    }

    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    /// Normalize, validate and lower to the matcher's instruction program.
    pub fn compile(&self) -> Result<Arc<CompiledPattern>, ModelError> {
        let nodes = normalize(self.nodes.clone());
        validate(&nodes)?;
        Ok(Arc::new(program::lower(&nodes)?))
    }
}

/// The immutable, shareable output of [`Pattern::compile`].
#[derive(Debug)]
pub struct CompiledPattern {
    pub(crate) program: Vec<Inst>,
    pub(crate) constraints: Vec<FeatureStruct>,
    pub(crate) groups: Vec<String>,
    pub(crate) subpatterns: Vec<String>,
}

impl CompiledPattern {
    pub fn group_names(&self) -> &[String] {
        &self.groups
    }

    pub fn subpattern_names(&self) -> &[String] {
        &self.subpatterns
    }
}

/// Flatten anonymous groups that wrap exactly one group; they add no
/// capture information beyond the inner group's.
fn normalize(nodes: Vec<PatternNode>) -> Vec<PatternNode> {
    nodes.into_iter().map(normalize_node).collect()
}

fn normalize_node(node: PatternNode) -> PatternNode {
    match node {
        PatternNode::Group { name, nodes } => {
            let mut nodes = normalize(nodes);
            if name.is_none() && nodes.len() == 1 && matches!(nodes[0], PatternNode::Group { .. }) {
                return nodes.remove(0);
            }
            PatternNode::Group { name, nodes }
        }
        PatternNode::Quantifier { min, max, greedy, node } => {
            PatternNode::Quantifier { min, max, greedy, node: Box::new(normalize_node(*node)) }
        }
        PatternNode::Alternation(branches) => {
            PatternNode::Alternation(branches.into_iter().map(normalize).collect())
        }
        PatternNode::Subpattern { name, nodes } => PatternNode::Subpattern { name, nodes: normalize(nodes) },
        other => other,
    }
}

fn validate(nodes: &[PatternNode]) -> Result<(), ModelError> {
    let has_subpatterns = nodes.iter().any(|node| matches!(node, PatternNode::Subpattern { .. }));
    if has_subpatterns && !nodes.iter().all(|node| matches!(node, PatternNode::Subpattern { .. })) {
        return Err(ModelError::InvalidPattern(
            "subpatterns cannot be mixed with other nodes at the pattern root".to_string(),
        ));
    }
    for node in nodes {
        validate_node(node, true)?;
    }
    Ok(())
}

fn validate_node(node: &PatternNode, top_level: bool) -> Result<(), ModelError> {
    match node {
        PatternNode::Constraint(_) => Ok(()),
        PatternNode::Group { nodes, .. } => {
            for node in nodes {
                validate_node(node, false)?;
            }
            Ok(())
        }
        PatternNode::Quantifier { min, max, node, .. } => {
            if let Some(max) = max {
                if min > max {
                    return Err(ModelError::InvalidQuantifier(format!("min {min} exceeds max {max}")));
                }
            }
            if min_consumption(node) == 0 {
                return Err(ModelError::InvalidQuantifier(
                    "quantifier body must consume at least one annotation".to_string(),
                ));
            }
            validate_node(node, false)
        }
        PatternNode::Alternation(branches) => {
            for branch in branches {
                for node in branch {
                    validate_node(node, false)?;
                }
            }
            Ok(())
        }
        PatternNode::Subpattern { nodes, .. } => {
            if !top_level {
                return Err(ModelError::InvalidPattern("subpatterns are only valid at the pattern root".to_string()));
            }
            for node in nodes {
                validate_node(node, false)?;
            }
            Ok(())
        }
    }
}

/// Fewest annotations a node can consume.
fn min_consumption(node: &PatternNode) -> usize {
    match node {
        PatternNode::Constraint(_) => 1,
        PatternNode::Group { nodes, .. } | PatternNode::Subpattern { nodes, .. } => {
            nodes.iter().map(min_consumption).sum()
        }
        PatternNode::Quantifier { min, node, .. } => min * min_consumption(node),
        PatternNode::Alternation(branches) => branches
            .iter()
            .map(|branch| branch.iter().map(min_consumption).sum())
            .min()
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureStruct;

    fn constraint() -> PatternNode {
        PatternNode::Constraint(FeatureStruct::new())
    }

    #[test]
    fn anonymous_wrapper_groups_flatten() {
        let pattern = Pattern::from_nodes(vec![PatternNode::Group {
            name: None,
            nodes: vec![PatternNode::Group { name: Some("inner".to_string()), nodes: vec![constraint()] }],
        }]);
        let compiled = pattern.compile().unwrap();
        assert_eq!(compiled.group_names(), ["inner"]);
    }

    #[test]
    fn anonymous_groups_get_stable_auto_names() {
        let pattern = Pattern::from_nodes(vec![
            PatternNode::Group { name: None, nodes: vec![constraint()] },
            PatternNode::Group { name: Some("named".to_string()), nodes: vec![constraint()] },
            PatternNode::Group { name: None, nodes: vec![constraint()] },
        ]);
        let compiled = pattern.compile().unwrap();
        assert_eq!(compiled.group_names(), ["group0", "named", "group1"]);
    }

    #[test]
    fn inverted_quantifier_bounds_are_rejected() {
        let pattern = Pattern::from_nodes(vec![PatternNode::Quantifier {
            min: 3,
            max: Some(1),
            greedy: true,
            node: Box::new(constraint()),
        }]);
        assert!(matches!(pattern.compile(), Err(ModelError::InvalidQuantifier(_))));
    }

    #[test]
    fn zero_width_quantifier_bodies_are_rejected() {
        let inner = PatternNode::Quantifier { min: 0, max: None, greedy: true, node: Box::new(constraint()) };
        let pattern = Pattern::from_nodes(vec![PatternNode::Quantifier {
            min: 0,
            max: Some(2),
            greedy: true,
            node: Box::new(PatternNode::Group { name: None, nodes: vec![inner] }),
        }]);
        assert!(matches!(pattern.compile(), Err(ModelError::InvalidQuantifier(_))));
    }

    #[test]
    fn nested_subpatterns_are_rejected() {
        let pattern = Pattern::from_nodes(vec![PatternNode::Group {
            name: None,
            nodes: vec![PatternNode::Subpattern { name: "rule0".to_string(), nodes: vec![constraint()] }],
        }]);
        assert!(matches!(pattern.compile(), Err(ModelError::InvalidPattern(_))));
    }
}
