//! Feature values: symbolic sets, string sets, variables, nested structures.
//!
//! A value stored under a feature is one of:
//!
//! ```text
//! FeatureValue
//! ├─ Simple(SimpleValue)            concrete leaf value
//! │    ├─ Symbolic { mask }         subset of one feature's symbols
//! │    └─ Str { values, negated }   string set, optionally complemented
//! ├─ Variable { name, agree }       resolved through VariableBindings
//! └─ Struct(FeatureStruct)          nested structure
//! ```
//!
//! Symbolic sets use a u64 bitmask over the owning feature's declared
//! symbols; the full universe mask is carried alongside so complements
//! (`agree == false` variables, negated constraints) never need the
//! registry at unification time.

use std::collections::BTreeSet;

use super::bindings::VariableBindings;
use super::structure::FeatureStruct;
use super::system::FeatureId;

/// A pattern variable use: name plus agree polarity.
///
/// `agree == true` stands for "same value as the binding"; `false` stands
/// for "the binding's complement" (the original `Not.EqualToVariable`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub agree: bool,
}

/// A concrete leaf value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleValue {
    Symbolic { feature: FeatureId, mask: u64, universe: u64 },
    Str { values: BTreeSet<String>, negated: bool },
}

impl SimpleValue {
    pub fn symbolic(feature: FeatureId, mask: u64, universe: u64) -> SimpleValue {
        SimpleValue::Symbolic { feature, mask, universe }
    }

    pub fn string(values: impl IntoIterator<Item = String>, negated: bool) -> SimpleValue {
        SimpleValue::Str { values: values.into_iter().collect(), negated }
    }

    /// Set intersection of two leaves. `None` means the intersection is
    /// empty: a hard unification failure, not a partial match.
    pub fn intersect(&self, other: &SimpleValue) -> Option<SimpleValue> {
        match (self, other) {
            (
                SimpleValue::Symbolic { feature, mask, universe },
                SimpleValue::Symbolic { feature: other_feature, mask: other_mask, .. },
            ) => {
                if feature != other_feature {
                    return None;
                }
                let combined = mask & other_mask;
                if combined == 0 {
                    return None;
                }
                Some(SimpleValue::Symbolic { feature: *feature, mask: combined, universe: *universe })
            }
            (SimpleValue::Str { values, negated }, SimpleValue::Str { values: other_values, negated: other_negated }) => {
                let (result, result_negated) = match (negated, other_negated) {
                    (false, false) => (values & other_values, false),
                    (false, true) => (values - other_values, false),
                    (true, false) => (other_values - values, false),
                    // The complement of a union still excludes both sets.
                    (true, true) => (values | other_values, true),
                };
                if !result_negated && result.is_empty() {
                    return None;
                }
                Some(SimpleValue::Str { values: result, negated: result_negated })
            }
            _ => None,
        }
    }

    /// True if the two leaves have a non-empty intersection.
    pub fn overlaps(&self, other: &SimpleValue) -> bool {
        self.intersect(other).is_some()
    }

    /// Complement within the leaf's domain.
    pub fn negation(&self) -> SimpleValue {
        match self {
            SimpleValue::Symbolic { feature, mask, universe } => {
                SimpleValue::Symbolic { feature: *feature, mask: universe & !mask, universe: *universe }
            }
            SimpleValue::Str { values, negated } => SimpleValue::Str { values: values.clone(), negated: !negated },
        }
    }

    /// The value a variable binding stands for at a use site: the binding
    /// itself when the site agrees, its complement when it disagrees.
    pub fn variable_value(&self, agree: bool) -> SimpleValue {
        if agree { self.clone() } else { self.negation() }
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        let mut code: u64 = 23;
        match self {
            SimpleValue::Symbolic { feature, mask, .. } => {
                code = code.wrapping_mul(31).wrapping_add(feature.0 as u64);
                code = code.wrapping_mul(31).wrapping_add(*mask);
            }
            SimpleValue::Str { values, negated } => {
                code = code.wrapping_mul(31).wrapping_add(if *negated { 1 } else { 0 });
                for value in values {
                    for b in value.bytes() {
                        code = code.wrapping_mul(31).wrapping_add(b as u64);
                    }
                    code = code.wrapping_mul(31).wrapping_add(7);
                }
            }
        }
        code
    }
}

/// A value held by a feature structure under some feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Simple(SimpleValue),
    Variable(Variable),
    Struct(FeatureStruct),
}

impl FeatureValue {
    pub fn as_struct(&self) -> Option<&FeatureStruct> {
        match self {
            FeatureValue::Struct(fs) => Some(fs),
            _ => None,
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleValue> {
        match self {
            FeatureValue::Simple(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, FeatureValue::Variable(_))
    }

    /// Unify two values under the running binding table. `None` is local
    /// failure and drives backtracking in the caller.
    pub(crate) fn unify(&self, other: &FeatureValue, bindings: &mut VariableBindings) -> Option<FeatureValue> {
        match (self, other) {
            (FeatureValue::Simple(a), FeatureValue::Simple(b)) => a.intersect(b).map(FeatureValue::Simple),

            (FeatureValue::Variable(var), FeatureValue::Simple(value))
            | (FeatureValue::Simple(value), FeatureValue::Variable(var)) => {
                match bindings.get(&var.name) {
                    Some(binding) => {
                        let effective = binding.variable_value(var.agree);
                        effective.intersect(value).map(FeatureValue::Simple)
                    }
                    None => {
                        bindings.bind(var.name.clone(), value.variable_value(var.agree));
                        Some(FeatureValue::Simple(value.clone()))
                    }
                }
            }

            (FeatureValue::Variable(a), FeatureValue::Variable(b)) => {
                if a.name == b.name && a.agree == b.agree {
                    Some(FeatureValue::Variable(a.clone()))
                } else {
                    None
                }
            }

            (FeatureValue::Struct(a), FeatureValue::Struct(b)) => a.unify(b, bindings).map(FeatureValue::Struct),

            _ => None,
        }
    }

    /// Compatibility check mirroring [`FeatureValue::unify`] without
    /// building an output value.
    pub(crate) fn is_unifiable(&self, other: &FeatureValue, bindings: &mut VariableBindings) -> bool {
        match (self, other) {
            (FeatureValue::Simple(a), FeatureValue::Simple(b)) => a.overlaps(b),

            (FeatureValue::Variable(var), FeatureValue::Simple(value))
            | (FeatureValue::Simple(value), FeatureValue::Variable(var)) => match bindings.get(&var.name) {
                Some(binding) => binding.variable_value(var.agree).overlaps(value),
                None => {
                    bindings.bind(var.name.clone(), value.variable_value(var.agree));
                    true
                }
            },

            (FeatureValue::Variable(a), FeatureValue::Variable(b)) => a.name == b.name && a.agree == b.agree,

            (FeatureValue::Struct(a), FeatureValue::Struct(b)) => a.is_unifiable_with(b, bindings),

            _ => false,
        }
    }

    /// Structural equality: variables compare by name/polarity, never
    /// through the binding table.
    pub fn value_equals(&self, other: &FeatureValue) -> bool {
        match (self, other) {
            (FeatureValue::Simple(a), FeatureValue::Simple(b)) => a == b,
            (FeatureValue::Variable(a), FeatureValue::Variable(b)) => a == b,
            (FeatureValue::Struct(a), FeatureValue::Struct(b)) => a.value_equals(b),
            _ => false,
        }
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        match self {
            FeatureValue::Simple(value) => value.structural_hash(),
            FeatureValue::Variable(var) => {
                let mut code: u64 = 17;
                for b in var.name.bytes() {
                    code = code.wrapping_mul(31).wrapping_add(b as u64);
                }
                code.wrapping_mul(31).wrapping_add(if var.agree { 1 } else { 0 })
            }
            FeatureValue::Struct(fs) => fs.structural_hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(mask: u64) -> SimpleValue {
        SimpleValue::Symbolic { feature: FeatureId(0), mask, universe: 0b1111 }
    }

    #[test]
    fn symbolic_intersection_is_mask_intersection() {
        assert_eq!(sym(0b0110).intersect(&sym(0b0011)), Some(sym(0b0010)));
        assert_eq!(sym(0b1100).intersect(&sym(0b0011)), None);
    }

    #[test]
    fn negation_complements_within_universe() {
        assert_eq!(sym(0b0110).negation(), sym(0b1001));
        assert_eq!(sym(0b0110).variable_value(false), sym(0b1001));
        assert_eq!(sym(0b0110).variable_value(true), sym(0b0110));
    }

    #[test]
    fn string_sets_respect_negation() {
        let a = SimpleValue::string(["x".to_string(), "y".to_string()], false);
        let not_y = SimpleValue::string(["y".to_string()], true);
        assert_eq!(a.intersect(&not_y), Some(SimpleValue::string(["x".to_string()], false)));

        let only_y = SimpleValue::string(["y".to_string()], false);
        assert_eq!(only_y.intersect(&not_y), None);
    }

    #[test]
    fn unbound_variable_binds_polarity_adjusted_value() {
        let mut bindings = VariableBindings::new();
        let var = FeatureValue::Variable(Variable { name: "a".to_string(), agree: false });
        let value = FeatureValue::Simple(sym(0b0001));

        let result = var.unify(&value, &mut bindings).unwrap();
        assert_eq!(result, FeatureValue::Simple(sym(0b0001)));
        // Disagreeing use binds the complement, so a later agreeing use
        // sees "anything but 0b0001".
        assert_eq!(bindings.get("a"), Some(&sym(0b1110)));
    }

    #[test]
    fn bound_variable_checks_against_binding() {
        let mut bindings = VariableBindings::new();
        bindings.bind("a", sym(0b0001));

        let agree = FeatureValue::Variable(Variable { name: "a".to_string(), agree: true });
        let disagree = FeatureValue::Variable(Variable { name: "a".to_string(), agree: false });
        let same = FeatureValue::Simple(sym(0b0001));

        assert!(agree.unify(&same, &mut bindings).is_some());
        assert!(disagree.unify(&same, &mut bindings).is_none());
    }
}
