//! Variable binding table.
//!
//! Pattern variables (e.g. "agree in voicing with the left environment") are
//! resolved through this table, not through structural equality: a variable
//! binds the first simple value it is unified against, and later uses of the
//! same variable are checked against (or resolved from) that binding,
//! adjusted for the use site's agree polarity.

use std::collections::HashMap;

use super::value::SimpleValue;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableBindings {
    values: HashMap<String, SimpleValue>,
}

impl VariableBindings {
    pub fn new() -> VariableBindings {
        VariableBindings::default()
    }

    pub fn get(&self, name: &str) -> Option<&SimpleValue> {
        self.values.get(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: SimpleValue) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SimpleValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}
