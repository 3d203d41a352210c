//! Feature structures and unification.
//!
//! A [`FeatureStruct`] maps features to values and optionally carries
//! disjunctions (ordered lists of alternative structures). Unification of
//! two structures walks every feature present in either operand:
//!
//! ```text
//! [voice:{voice+}, type:{seg}]  ⊔  [voice:{voice+,voice-}, syl:{syl-}]
//!   = [voice:{voice+}, type:{seg}, syl:{syl-}]
//!
//! [voice:{voice+}]  ⊔  [voice:{voice-}]  =  failure (empty intersection)
//! ```
//!
//! Structures follow a two-phase build pattern: mutable while a rule author
//! assembles them, then frozen once they become part of a compiled rule or
//! a value held across matches. All mutators fail fast on a frozen
//! structure, and hashing is only valid after freezing.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::error::ModelError;

use super::bindings::VariableBindings;
use super::builder::FeatureStructBuilder;
use super::system::{FeatureId, FeatureSystem};
use super::value::{FeatureValue, Variable};

fn resolve_variable(var: &Variable, bindings: &VariableBindings) -> FeatureValue {
    match bindings.get(&var.name) {
        Some(binding) => FeatureValue::Simple(binding.variable_value(var.agree)),
        None => FeatureValue::Variable(var.clone()),
    }
}

/// An ordered list of alternative structures; the first alternative whose
/// unification succeeds wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Disjunction {
    pub alternatives: Vec<FeatureStruct>,
}

/// A (possibly nested) mapping from features to values.
#[derive(Debug, Default)]
pub struct FeatureStruct {
    values: BTreeMap<FeatureId, FeatureValue>,
    disjunctions: Vec<Disjunction>,
    frozen: bool,
    hash: Option<u64>,
}

impl Clone for FeatureStruct {
    /// Cloning thaws: the copy is mutable again and recomputes its hash on
    /// the next freeze. Matches the original engine's deep-clone contract.
    fn clone(&self) -> FeatureStruct {
        FeatureStruct {
            values: self.values.clone(),
            disjunctions: self.disjunctions.clone(),
            frozen: false,
            hash: None,
        }
    }
}

impl PartialEq for FeatureStruct {
    fn eq(&self, other: &FeatureStruct) -> bool {
        self.value_equals(other)
    }
}

impl FeatureStruct {
    pub fn new() -> FeatureStruct {
        FeatureStruct::default()
    }

    /// Start a fluent builder against a feature system. This is the DSL
    /// surface rule definitions are written in; see [`FeatureStructBuilder`].
    pub fn build(system: &FeatureSystem) -> FeatureStructBuilder<'_> {
        FeatureStructBuilder::new(system)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.disjunctions.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, feature: FeatureId) -> Option<&FeatureValue> {
        self.values.get(&feature)
    }

    pub fn features(&self) -> impl Iterator<Item = (FeatureId, &FeatureValue)> {
        self.values.iter().map(|(id, value)| (*id, value))
    }

    pub fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }

    fn check_frozen(&self) -> Result<(), ModelError> {
        if self.frozen {
            return Err(ModelError::Frozen("feature structure"));
        }
        Ok(())
    }

    /// Set (or overwrite) a feature's value.
    pub fn add(&mut self, feature: FeatureId, value: FeatureValue) -> Result<(), ModelError> {
        self.check_frozen()?;
        self.values.insert(feature, value);
        Ok(())
    }

    pub fn remove(&mut self, feature: FeatureId) -> Result<(), ModelError> {
        self.check_frozen()?;
        self.values.remove(&feature);
        Ok(())
    }

    /// Append a disjunction; alternatives are tried in the order given.
    pub fn add_disjunction(&mut self, alternatives: Vec<FeatureStruct>) -> Result<(), ModelError> {
        self.check_frozen()?;
        self.disjunctions.push(Disjunction { alternatives });
        Ok(())
    }

    /// Freeze this structure (and every nested structure), computing the
    /// structural hash. Idempotent.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        for value in self.values.values_mut() {
            if let FeatureValue::Struct(fs) = value {
                fs.freeze();
            }
        }
        for disjunction in &mut self.disjunctions {
            for alternative in &mut disjunction.alternatives {
                alternative.freeze();
            }
        }
        self.hash = Some(self.structural_hash());
        self.frozen = true;
    }

    /// Consuming convenience for builder-style call sites.
    pub fn frozen(mut self) -> FeatureStruct {
        self.freeze();
        self
    }

    /// The hash computed at freeze time. Requesting it earlier is an error:
    /// a mutable structure has no stable hash.
    pub fn frozen_hash(&self) -> Result<u64, ModelError> {
        self.hash.ok_or(ModelError::NotFrozen)
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        let mut code: u64 = 23;
        for (feature, value) in &self.values {
            code = code.wrapping_mul(31).wrapping_add(feature.0 as u64);
            code = code.wrapping_mul(31).wrapping_add(value.structural_hash());
        }
        for disjunction in &self.disjunctions {
            for alternative in &disjunction.alternatives {
                code = code.wrapping_mul(31).wrapping_add(alternative.structural_hash());
            }
        }
        code
    }

    /// Structural value equality, up to variable names/polarity. Two frozen
    /// structures with different hashes are unequal without a walk.
    pub fn value_equals(&self, other: &FeatureStruct) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if let (Some(a), Some(b)) = (self.hash, other.hash) {
            if a != b {
                return false;
            }
        }
        if self.values.len() != other.values.len() || self.disjunctions.len() != other.disjunctions.len() {
            return false;
        }
        for (feature, value) in &self.values {
            match other.values.get(feature) {
                Some(other_value) if value.value_equals(other_value) => {}
                _ => return false,
            }
        }
        self.disjunctions
            .iter()
            .zip(&other.disjunctions)
            .all(|(a, b)| {
                a.alternatives.len() == b.alternatives.len()
                    && a.alternatives.iter().zip(&b.alternatives).all(|(x, y)| x.value_equals(y))
            })
    }

    /// Unify two structures into their most general common refinement.
    ///
    /// `None` is failure, never an error. Bindings accumulate into
    /// `bindings` only along the successful path: disjunction branches run
    /// on a scratch copy of the table and a failed branch's bindings are
    /// fully rolled back.
    pub fn unify(&self, other: &FeatureStruct, bindings: &mut VariableBindings) -> Option<FeatureStruct> {
        // Unifying a structure with itself is a no-op; this also gives the
        // O(1) short-circuit for shared frozen structures.
        if std::ptr::eq(self, other) {
            return Some(self.clone());
        }

        let mut result = FeatureStruct::new();
        for (feature, value) in &self.values {
            match other.values.get(feature) {
                Some(other_value) => {
                    let unified = value.unify(other_value, bindings)?;
                    result.values.insert(*feature, unified);
                }
                None => {
                    result.values.insert(*feature, value.clone());
                }
            }
        }
        for (feature, value) in &other.values {
            if !self.values.contains_key(feature) {
                result.values.insert(*feature, value.clone());
            }
        }

        for disjunction in self.disjunctions.iter().chain(&other.disjunctions) {
            result = Self::unify_disjunction(result, disjunction, bindings)?;
        }

        Some(result)
    }

    fn unify_disjunction(
        result: FeatureStruct,
        disjunction: &Disjunction,
        bindings: &mut VariableBindings,
    ) -> Option<FeatureStruct> {
        for alternative in &disjunction.alternatives {
            let mut scratch = bindings.clone();
            if let Some(unified) = result.unify(alternative, &mut scratch) {
                *bindings = scratch;
                return Some(unified);
            }
        }
        None
    }

    /// Compatibility check: do the two structures unify? Bindings are
    /// committed only if the check succeeds as a whole; a failed check
    /// leaves the table untouched.
    pub fn is_unifiable(&self, other: &FeatureStruct, bindings: &mut VariableBindings) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        // Structures without disjunctions admit a cheaper walk over the
        // shared features; disjunctive structures go through full
        // unification, whose branch search already scopes bindings.
        if self.disjunctions.is_empty() && other.disjunctions.is_empty() {
            let mut scratch = bindings.clone();
            if self.is_unifiable_definite(other, &mut scratch) {
                *bindings = scratch;
                return true;
            }
            return false;
        }
        let mut scratch = bindings.clone();
        if self.unify(other, &mut scratch).is_some() {
            *bindings = scratch;
            return true;
        }
        false
    }

    pub(crate) fn is_unifiable_with(&self, other: &FeatureStruct, bindings: &mut VariableBindings) -> bool {
        self.is_unifiable(other, bindings)
    }

    fn is_unifiable_definite(&self, other: &FeatureStruct, bindings: &mut VariableBindings) -> bool {
        for (feature, value) in &self.values {
            if let Some(other_value) = other.values.get(feature) {
                if !value.is_unifiable(other_value, bindings) {
                    return false;
                }
            }
        }
        true
    }

    /// One-way merge: `overlay` wins on conflict. Used by rewrite actions
    /// writing new feature values onto a matched annotation. Overlay
    /// variables with a binding are replaced by their polarity-adjusted
    /// binding values.
    pub fn priority_union(&mut self, overlay: &FeatureStruct, bindings: &VariableBindings) -> Result<(), ModelError> {
        self.check_frozen()?;
        for (feature, overlay_value) in &overlay.values {
            match self.values.entry(*feature) {
                Entry::Occupied(mut entry) => match (entry.get_mut(), overlay_value) {
                    (FeatureValue::Struct(target), FeatureValue::Struct(nested)) => {
                        target.priority_union(nested, bindings)?;
                    }
                    (slot, FeatureValue::Variable(var)) => {
                        *slot = resolve_variable(var, bindings);
                    }
                    (slot, _) => *slot = overlay_value.clone(),
                },
                Entry::Vacant(entry) => {
                    let value = match overlay_value {
                        FeatureValue::Variable(var) => resolve_variable(var, bindings),
                        other => other.clone(),
                    };
                    entry.insert(value);
                }
            }
        }
        Ok(())
    }

    /// Clone with every bound variable replaced by its binding, adjusted
    /// for the use site's polarity. Unbound variables are left in place.
    pub fn replace_variables(&self, bindings: &VariableBindings) -> FeatureStruct {
        let mut result = FeatureStruct::new();
        for (feature, value) in &self.values {
            let replaced = match value {
                FeatureValue::Variable(var) => match bindings.get(&var.name) {
                    Some(binding) => FeatureValue::Simple(binding.variable_value(var.agree)),
                    None => value.clone(),
                },
                FeatureValue::Struct(fs) => FeatureValue::Struct(fs.replace_variables(bindings)),
                FeatureValue::Simple(_) => value.clone(),
            };
            result.values.insert(*feature, replaced);
        }
        result.disjunctions = self.disjunctions.clone();
        result
    }

    /// True if this structure (or any nested structure) contains a
    /// variable value.
    pub fn has_variables(&self) -> bool {
        self.values.values().any(|value| match value {
            FeatureValue::Variable(_) => true,
            FeatureValue::Struct(fs) => fs.has_variables(),
            FeatureValue::Simple(_) => false,
        }) || self
            .disjunctions
            .iter()
            .any(|d| d.alternatives.iter().any(FeatureStruct::has_variables))
    }
}
