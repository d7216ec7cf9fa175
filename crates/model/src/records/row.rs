use crate::core::{identifiers::EntityType, value::Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    pub entity: EntityType,
    pub fields: BTreeMap<String, Value>,
}

impl RowData {
    pub fn new<I, K>(entity: EntityType, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        RowData {
            entity,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or(Value::Null)
    }

    /// The row as a record value, the shape bound to a lambda variable.
    pub fn to_value(&self) -> Value {
        Value::Record(self.fields.clone())
    }
}
