use crate::{
    core::value::Value,
    error::{ModelError, Result},
};
use std::collections::{BTreeMap, btree_map::Entry};

/// Named values bound to `Parameter` nodes of one query.
///
/// Entries are never removed or overwritten with a different value; the
/// names stay part of the query's shape while the values vary per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: BTreeMap<String, Value>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new name. Fails if the name is already taken.
    pub fn add(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        match self.values.entry(name.into()) {
            Entry::Occupied(entry) => Err(ModelError::DuplicateParameter {
                name: entry.key().clone(),
                existing: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Bind a name unless it is already bound to an equal value.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        match self.values.get(&name) {
            Some(existing) if *existing == value => Ok(()),
            Some(existing) => Err(ModelError::DuplicateParameter {
                name,
                existing: existing.clone(),
            }),
            None => {
                self.values.insert(name, value);
                Ok(())
            }
        }
    }

    /// Insert or overwrite. Only for names whose value is derived from the
    /// name itself.
    pub(crate) fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Copy every entry of `other` into this table using [`bind`](Self::bind).
    pub fn merge(&mut self, other: &ParameterValues) -> Result<()> {
        for (name, value) in other.iter() {
            self.bind(name, value.clone())?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
