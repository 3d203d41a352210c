//! Lowering from the pattern tree to the matcher's instruction program.
//!
//! The program is a conventional backtracking bytecode:
//!
//! ```text
//! Constraint(i)      unify constraint i against the current annotation,
//!                    advance one position on success
//! Split(a, b)        choice point: try a first, fall back to b
//! Jump(t)            unconditional
//! GroupStart(g) /    bracket the annotations consumed for capture g
//! GroupEnd(g)
//! Accept(sub?)       structural match complete
//! ```
//!
//! Greedy/lazy quantification is encoded purely in `Split` operand order:
//! greedy tries the body first, lazy tries the exit first. Bounded
//! repetition nests its optional tail so that skipping one iteration skips
//! the rest.

use crate::error::ModelError;

use super::{CompiledPattern, PatternNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inst {
    Constraint(usize),
    Split { primary: usize, alternate: usize },
    Jump(usize),
    GroupStart(usize),
    GroupEnd(usize),
    Accept { subpattern: Option<usize> },
}

pub(super) fn lower(nodes: &[PatternNode]) -> Result<CompiledPattern, ModelError> {
    let mut lowering = Lowering::default();
    let subpatterns: Vec<&PatternNode> =
        nodes.iter().filter(|node| matches!(node, PatternNode::Subpattern { .. })).collect();

    if subpatterns.is_empty() {
        lowering.lower_nodes(nodes);
        lowering.emit(Inst::Accept { subpattern: None });
    } else {
        for (index, node) in subpatterns.iter().enumerate() {
            let PatternNode::Subpattern { name, nodes } = node else { unreachable!() };
            lowering.subpatterns.push(name.clone());
            let last = index == subpatterns.len() - 1;
            if last {
                lowering.lower_nodes(nodes);
                lowering.emit(Inst::Accept { subpattern: Some(index) });
            } else {
                let split = lowering.emit(Inst::Split { primary: 0, alternate: 0 });
                let body = lowering.pc();
                lowering.lower_nodes(nodes);
                lowering.emit(Inst::Accept { subpattern: Some(index) });
                let next = lowering.pc();
                lowering.patch_split(split, body, next);
            }
        }
    }

    Ok(CompiledPattern {
        program: lowering.program,
        constraints: lowering.constraints,
        groups: lowering.groups,
        subpatterns: lowering.subpatterns,
    })
}

#[derive(Default)]
struct Lowering {
    program: Vec<Inst>,
    constraints: Vec<crate::feature::FeatureStruct>,
    groups: Vec<String>,
    subpatterns: Vec<String>,
    auto_groups: usize,
}

impl Lowering {
    fn pc(&self) -> usize {
        self.program.len()
    }

    fn emit(&mut self, inst: Inst) -> usize {
        self.program.push(inst);
        self.program.len() - 1
    }

    fn patch_split(&mut self, at: usize, primary: usize, alternate: usize) {
        self.program[at] = Inst::Split { primary, alternate };
    }

    fn patch_jump(&mut self, at: usize, target: usize) {
        self.program[at] = Inst::Jump(target);
    }

    fn lower_nodes(&mut self, nodes: &[PatternNode]) {
        for node in nodes {
            self.lower_node(node);
        }
    }

    fn lower_node(&mut self, node: &PatternNode) {
        match node {
            PatternNode::Constraint(fs) => {
                let index = self.constraints.len();
                self.constraints.push(fs.clone().frozen());
                self.emit(Inst::Constraint(index));
            }
            PatternNode::Group { name, nodes } => {
                let group = self.groups.len();
                let name = name.clone().unwrap_or_else(|| {
                    let auto = format!("group{}", self.auto_groups);
                    self.auto_groups += 1;
                    auto
                });
                self.groups.push(name);
                self.emit(Inst::GroupStart(group));
                self.lower_nodes(nodes);
                self.emit(Inst::GroupEnd(group));
            }
            PatternNode::Quantifier { min, max, greedy, node } => {
                for _ in 0..*min {
                    self.lower_node(node);
                }
                match max {
                    Some(max) => self.lower_optionals(node, max - min, *greedy),
                    None => {
                        let head = self.pc();
                        let split = self.emit(Inst::Split { primary: 0, alternate: 0 });
                        let body = self.pc();
                        self.lower_node(node);
                        self.emit(Inst::Jump(head));
                        let exit = self.pc();
                        if *greedy {
                            self.patch_split(split, body, exit);
                        } else {
                            self.patch_split(split, exit, body);
                        }
                    }
                }
            }
            PatternNode::Alternation(branches) => {
                let mut pending_jumps = Vec::new();
                for (index, branch) in branches.iter().enumerate() {
                    let last = index == branches.len() - 1;
                    if last {
                        self.lower_nodes(branch);
                    } else {
                        let split = self.emit(Inst::Split { primary: 0, alternate: 0 });
                        let body = self.pc();
                        self.lower_nodes(branch);
                        pending_jumps.push(self.emit(Inst::Jump(0)));
                        let next = self.pc();
                        self.patch_split(split, body, next);
                    }
                }
                let exit = self.pc();
                for jump in pending_jumps {
                    self.patch_jump(jump, exit);
                }
            }
            // Nested subpatterns are rejected by validation; treat the
            // node as a plain sequence if one slips through.
            PatternNode::Subpattern { nodes, .. } => self.lower_nodes(nodes),
        }
    }

    /// `(X (X (X)?)?)?`-style nesting: skipping one optional iteration
    /// skips all the ones after it.
    fn lower_optionals(&mut self, node: &PatternNode, count: usize, greedy: bool) {
        if count == 0 {
            return;
        }
        let split = self.emit(Inst::Split { primary: 0, alternate: 0 });
        let body = self.pc();
        self.lower_node(node);
        self.lower_optionals(node, count - 1, greedy);
        let exit = self.pc();
        if greedy {
            self.patch_split(split, body, exit);
        } else {
            self.patch_split(split, exit, body);
        }
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
    fn sequence_lowers_to_constraints_and_accept() {
        let compiled = lower(&[constraint(), constraint()]).unwrap();
        assert_eq!(
            compiled.program,
            vec![Inst::Constraint(0), Inst::Constraint(1), Inst::Accept { subpattern: None }]
        );
    }

    #[test]
    fn greedy_star_tries_the_body_first() {
        let star = PatternNode::Quantifier { min: 0, max: None, greedy: true, node: Box::new(constraint()) };
        let compiled = lower(&[star]).unwrap();
        assert_eq!(
            compiled.program,
            vec![
                Inst::Split { primary: 1, alternate: 3 },
                Inst::Constraint(0),
                Inst::Jump(0),
                Inst::Accept { subpattern: None },
            ]
        );
    }

    #[test]
    fn lazy_star_tries_the_exit_first() {
        let star = PatternNode::Quantifier { min: 0, max: None, greedy: false, node: Box::new(constraint()) };
        let compiled = lower(&[star]).unwrap();
        assert_eq!(compiled.program[0], Inst::Split { primary: 3, alternate: 1 });
    }

    #[test]
    fn subpatterns_accept_with_their_index() {
        let subs = [
            PatternNode::Subpattern { name: "rule0".to_string(), nodes: vec![constraint()] },
            PatternNode::Subpattern { name: "rule1".to_string(), nodes: vec![constraint()] },
        ];
        let compiled = lower(&subs).unwrap();
        assert_eq!(compiled.subpatterns, ["rule0", "rule1"]);
        assert_eq!(
            compiled.program,
            vec![
                Inst::Split { primary: 1, alternate: 3 },
                Inst::Constraint(0),
                Inst::Accept { subpattern: Some(0) },
                Inst::Constraint(1),
                Inst::Accept { subpattern: Some(1) },
            ]
        );
    }
}
