//! Fluent construction of feature structures.
//!
//! This is the DSL rule definitions are written in:
//!
//! ```text
//! FeatureStruct::build(&sys)
//!     .symbol("seg")
//!     .symbol("cons+")
//!     .feature("voice").equal_to_variable("a")
//!     .value()
//! ```
//!
//! `value()` freezes the result. Builder misuse (unknown names, `feature()`
//! without a following value method) is a programming error in the rule
//! definition and panics with a descriptive message.

use super::structure::FeatureStruct;
use super::system::{FeatureId, FeatureKind, FeatureSystem};
use super::value::{FeatureValue, SimpleValue, Variable};

pub struct FeatureStructBuilder<'a> {
    system: &'a FeatureSystem,
    fs: FeatureStruct,
    pending: Option<FeatureId>,
    negate: bool,
}

impl<'a> FeatureStructBuilder<'a> {
    pub(crate) fn new(system: &'a FeatureSystem) -> FeatureStructBuilder<'a> {
        FeatureStructBuilder { system, fs: FeatureStruct::new(), pending: None, negate: false }
    }

    /// Constrain a symbolic feature to a single symbol. The owning feature
    /// is inferred from the symbol name.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is not declared in the feature system.
    pub fn symbol(mut self, name: &str) -> Self {
        let (feature, mask) = self
            .system
            .symbol_mask(name)
            .unwrap_or_else(|| panic!("unknown symbol \"{name}\""));
        self.set(feature, mask);
        self
    }

    /// Constrain a symbolic feature to a set of symbols (disjunctive choice
    /// among enumerated values). All symbols must belong to one feature.
    pub fn symbols(mut self, names: &[&str]) -> Self {
        let mut combined: Option<(FeatureId, u64)> = None;
        for name in names {
            let (feature, mask) = self
                .system
                .symbol_mask(name)
                .unwrap_or_else(|| panic!("unknown symbol \"{name}\""));
            combined = match combined {
                None => Some((feature, mask)),
                Some((prev, acc)) => {
                    assert!(prev == feature, "symbols in one call must belong to one feature");
                    Some((prev, acc | mask))
                }
            };
        }
        if let Some((feature, mask)) = combined {
            self.set(feature, mask);
        }
        self
    }

    /// Select the feature the next value method applies to.
    pub fn feature(mut self, name: &str) -> Self {
        let id = self
            .system
            .feature(name)
            .unwrap_or_else(|| panic!("unknown feature \"{name}\""));
        self.pending = Some(id);
        self
    }

    /// Negate the next `equal_to` / `equal_to_variable`.
    pub fn not(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Give the pending feature a concrete value: a symbol name for
    /// symbolic features, a literal for string features.
    pub fn equal_to(mut self, value: &str) -> Self {
        let feature = self.take_pending("equal_to");
        let negate = std::mem::take(&mut self.negate);
        let simple = match &self.system.feature_def(feature).kind {
            FeatureKind::Symbolic { .. } => {
                let (owner, mask) = self
                    .system
                    .symbol_mask(value)
                    .unwrap_or_else(|| panic!("unknown symbol \"{value}\""));
                assert!(owner == feature, "symbol \"{value}\" does not belong to the selected feature");
                let universe = self.system.universe(feature);
                let mask = if negate { universe & !mask } else { mask };
                SimpleValue::symbolic(feature, mask, universe)
            }
            FeatureKind::String => SimpleValue::string([value.to_string()], negate),
            FeatureKind::Complex => panic!("equal_to is not valid for a complex feature"),
        };
        self.fs.add(feature, FeatureValue::Simple(simple)).expect("builder structure is mutable");
        self
    }

    /// Give the pending feature a variable value; `not()` beforehand flips
    /// the agree polarity.
    pub fn equal_to_variable(mut self, name: &str) -> Self {
        let feature = self.take_pending("equal_to_variable");
        let negate = std::mem::take(&mut self.negate);
        let variable = Variable { name: name.to_string(), agree: !negate };
        self.fs.add(feature, FeatureValue::Variable(variable)).expect("builder structure is mutable");
        self
    }

    /// Give the pending (complex) feature a nested structure.
    pub fn feature_struct(mut self, build: impl FnOnce(FeatureStructBuilder<'_>) -> FeatureStruct) -> Self {
        let feature = self.take_pending("feature_struct");
        let nested = build(FeatureStructBuilder::new(self.system));
        self.fs.add(feature, FeatureValue::Struct(nested)).expect("builder structure is mutable");
        self
    }

    /// Append a disjunction of alternative structures, tried in order.
    pub fn disjunction(mut self, alternatives: Vec<FeatureStruct>) -> Self {
        self.fs.add_disjunction(alternatives).expect("builder structure is mutable");
        self
    }

    /// Finish and freeze.
    pub fn value(mut self) -> FeatureStruct {
        assert!(self.pending.is_none(), "feature() was not followed by a value");
        self.fs.freeze();
        self.fs
    }

    /// Finish without freezing (for structures that are mutated further,
    /// e.g. annotation payloads that rules rewrite in place).
    pub fn mutable_value(self) -> FeatureStruct {
        assert!(self.pending.is_none(), "feature() was not followed by a value");
        self.fs
    }

    fn set(&mut self, feature: FeatureId, mask: u64) {
        let universe = self.system.universe(feature);
        let value = SimpleValue::symbolic(feature, mask, universe);
        self.fs.add(feature, FeatureValue::Simple(value)).expect("builder structure is mutable");
    }

    fn take_pending(&mut self, method: &str) -> FeatureId {
        self.pending.take().unwrap_or_else(|| panic!("{method}() requires a preceding feature()"))
    }
}
