//! Feature structure model: unification engine.
//!
//! This module is the constraint core of the crate. Everything a pattern
//! constraint says about an annotation, and everything a rewrite writes
//! back onto one, is expressed as a feature structure.
//!
//! ## How the parts work together
//!
//! ```text
//! FeatureSystem          declares features + symbol universes
//!      │
//!      v
//! FeatureStructBuilder   fluent assembly (rule-author surface)
//!      │  .value()
//!      v
//! FeatureStruct ──────── unify / is_unifiable ──► Option<FeatureStruct>
//!      │                       │
//!      │                       └─ VariableBindings (accumulated per match)
//!      ├─ priority_union       one-way overwrite (rewrite actions)
//!      ├─ replace_variables    substitute resolved bindings
//!      └─ freeze / frozen_hash two-phase build, hash after freeze
//! ```
//!
//! Unification failure is an `Option::None`, not an error: it drives
//! backtracking in the matcher. Only API misuse (mutating a frozen
//! structure, hashing a mutable one) raises [`crate::error::ModelError`].

mod bindings;
mod builder;
mod structure;
mod system;
mod value;


pub use bindings::VariableBindings;
pub use builder::FeatureStructBuilder;
pub use structure::{Disjunction, FeatureStruct};
pub use system::{FeatureDef, FeatureId, FeatureKind, FeatureSystem, FeatureSystemBuilder};
pub use value::{FeatureValue, SimpleValue, Variable};
