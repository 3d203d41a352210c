//! Feature and symbol registry.
//!
//! A [`FeatureSystem`] is the closed universe a grammar's feature structures
//! draw from: every feature name, and for symbolic features every symbol,
//! is declared up front. Symbolic values are stored as bitmasks over the
//! owning feature's symbol list, so a feature may declare at most 64
//! symbols.

use std::collections::HashMap;

use crate::error::ModelError;

/// Index of a feature within its [`FeatureSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub(crate) u32);

/// What kind of value a feature carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// A closed set of mutually exclusive symbols.
    Symbolic { symbols: Vec<String> },
    /// Free-form string values (e.g. a segment's surface representation).
    String,
    /// A nested feature structure.
    Complex,
}

#[derive(Debug, Clone)]
pub struct FeatureDef {
    pub name: String,
    pub kind: FeatureKind,
}

/// The registry of features and symbols shared by all structures of one
/// grammar. Built once with [`FeatureSystem::builder`], then borrowed.
#[derive(Debug, Clone, Default)]
pub struct FeatureSystem {
    features: Vec<FeatureDef>,
    by_name: HashMap<String, FeatureId>,
    // symbol name -> (owning feature, bit index)
    symbols: HashMap<String, (FeatureId, u8)>,
}

impl FeatureSystem {
    pub fn builder() -> FeatureSystemBuilder {
        FeatureSystemBuilder { system: FeatureSystem::default(), error: None }
    }

    pub fn feature(&self, name: &str) -> Option<FeatureId> {
        self.by_name.get(name).copied()
    }

    pub fn feature_def(&self, id: FeatureId) -> &FeatureDef {
        &self.features[id.0 as usize]
    }

    pub fn feature_name(&self, id: FeatureId) -> &str {
        &self.features[id.0 as usize].name
    }

    /// Resolve a symbol name to its owning feature and bit position.
    pub fn symbol(&self, name: &str) -> Option<(FeatureId, u8)> {
        self.symbols.get(name).copied()
    }

    /// Bitmask with one bit set for the named symbol.
    pub fn symbol_mask(&self, name: &str) -> Option<(FeatureId, u64)> {
        self.symbol(name).map(|(feature, bit)| (feature, 1u64 << bit))
    }

    /// Bitmask covering every symbol of a symbolic feature.
    pub fn universe(&self, id: FeatureId) -> u64 {
        match &self.features[id.0 as usize].kind {
            FeatureKind::Symbolic { symbols } => {
                if symbols.len() == 64 {
                    u64::MAX
                } else {
                    (1u64 << symbols.len()) - 1
                }
            }
            _ => 0,
        }
    }

    /// Names of the symbols present in `mask`, in declaration order.
    pub fn symbol_names(&self, id: FeatureId, mask: u64) -> Vec<&str> {
        match &self.features[id.0 as usize].kind {
            FeatureKind::Symbolic { symbols } => symbols
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1u64 << bit) != 0)
                .map(|(_, name)| name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Builder for [`FeatureSystem`]. Declaration errors (duplicate names,
/// oversized symbol sets) are deferred to [`FeatureSystemBuilder::build`].
#[derive(Debug)]
pub struct FeatureSystemBuilder {
    system: FeatureSystem,
    error: Option<ModelError>,
}

impl FeatureSystemBuilder {
    /// Declare a symbolic feature with its symbol universe.
    pub fn symbolic(mut self, name: &str, symbols: &[&str]) -> Self {
        if self.error.is_some() {
            return self;
        }
        if symbols.len() > 64 {
            self.error = Some(ModelError::TooManySymbols(name.to_string()));
            return self;
        }
        let id = match self.declare(name, FeatureKind::Symbolic { symbols: symbols.iter().map(|s| s.to_string()).collect() }) {
            Some(id) => id,
            None => return self,
        };
        for (bit, symbol) in symbols.iter().enumerate() {
            if self.system.symbols.insert(symbol.to_string(), (id, bit as u8)).is_some() {
                self.error = Some(ModelError::UnknownSymbol(format!("symbol \"{symbol}\" declared twice")));
                return self;
            }
        }
        self
    }

    /// Declare a string-valued feature.
    pub fn string(mut self, name: &str) -> Self {
        self.declare(name, FeatureKind::String);
        self
    }

    /// Declare a complex (structure-valued) feature.
    pub fn complex(mut self, name: &str) -> Self {
        self.declare(name, FeatureKind::Complex);
        self
    }

    pub fn build(self) -> Result<FeatureSystem, ModelError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.system),
        }
    }

    fn declare(&mut self, name: &str, kind: FeatureKind) -> Option<FeatureId> {
        if self.system.by_name.contains_key(name) {
            self.error = Some(ModelError::UnknownFeature(format!("feature \"{name}\" declared twice")));
            return None;
        }
        let id = FeatureId(self.system.features.len() as u32);
        self.system.features.push(FeatureDef { name: name.to_string(), kind });
        self.system.by_name.insert(name.to_string(), id);
        Some(id)
    }
}
