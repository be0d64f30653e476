use std::collections::{BTreeMap, HashMap};

use anyhow::Error;
use serde_json::Value;

use crate::entity::{Entity, EntityName, PrimaryKey};

/// Documents of one collection keyed by their primary key value.
pub type Documents = BTreeMap<String, Value>;

/// A database instance. Typically, a database instance is a JSON file on disk
/// holding one or more collections.
#[derive(Debug, Clone)]
pub struct DatabaseInstance {
    pub file_path: String,
    pub entities: Vec<Entity>,
    pub data: HashMap<EntityName, Documents>,
}

impl DatabaseInstance {
    pub fn get_or_init(&mut self, name: &EntityName) -> &mut Documents {
        self.data.entry(name.clone()).or_default()
    }
}

/// The string form of a document's primary key, used as the storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyValue(String);

impl PrimaryKeyValue {
    pub fn new(value: &Value, primary_key: &PrimaryKey) -> Result<Self, Error> {
        match value.get(primary_key.as_str()) {
            Some(Value::String(s)) => Ok(Self(s.clone())),
            Some(Value::Number(n)) => Ok(Self(n.to_string())),
            Some(_) => Err(Error::msg(format!(
                "Primary key `{}` must be a string or a number",
                primary_key.as_str()
            ))),
            None => Err(Error::msg(format!(
                "Missing primary key `{}`",
                primary_key.as_str()
            ))),
        }
    }
}

impl std::fmt::Display for PrimaryKeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
