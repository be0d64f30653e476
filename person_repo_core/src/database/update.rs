use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::PrimaryKey;

use super::{DbResult, query::Key};

/// Field modifications applied to a single document.
///
/// Assignments run first, then array appends, then increments.
///
/// ```
/// use person_repo_core::database::update::Update;
///
/// let update = Update::new()
///     .set("age", 20)
///     .push("favoriteFoods", "Hamburger")
///     .inc("__v", 1);
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Update {
    pub set: Vec<(Key, Value)>,
    pub push: Vec<(Key, Value)>,
    pub inc: Vec<(Key, i64)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        self.set.push((key.into(), value.into()));
        self
    }

    pub fn push<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        self.push.push((key.into(), value.into()));
        self
    }

    pub fn inc<K>(mut self, key: K, by: i64) -> Self
    where
        K: Into<Key>,
    {
        self.inc.push((key.into(), by));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.push.is_empty() && self.inc.is_empty()
    }

    /// Apply the update in place. On error the document may be partially
    /// modified, so callers apply it to a copy.
    pub fn apply(&self, document: &mut Value, primary_key: &PrimaryKey) -> DbResult<()> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| Error::msg("Value must be a JSON object"))?;

        let touched = self.set.iter().map(|(k, _)| k);
        let touched = touched.chain(self.push.iter().map(|(k, _)| k));
        for key in touched.chain(self.inc.iter().map(|(k, _)| k)) {
            if key.as_str() == primary_key.as_str() {
                return Err(Error::msg(format!(
                    "Cannot modify primary key `{}`",
                    primary_key.as_str()
                )));
            }
        }

        for (key, value) in &self.set {
            *field_mut(object, key)? = value.clone();
        }

        for (key, value) in &self.push {
            let field = field_mut(object, key)?;
            match field {
                Value::Null => *field = Value::Array(vec![value.clone()]),
                Value::Array(items) => items.push(value.clone()),
                _ => return Err(Error::msg(format!("Cannot push to non-array field `{key}`"))),
            }
        }

        for (key, by) in &self.inc {
            let field = field_mut(object, key)?;
            let incremented = match field {
                Value::Null => Value::from(*by),
                Value::Number(n) => match n.as_i64() {
                    Some(current) => Value::from(current.checked_add(*by).ok_or_else(|| {
                        Error::msg(format!("Increment of `{key}` overflows"))
                    })?),
                    None => Value::from(n.as_f64().unwrap_or_default() + *by as f64),
                },
                _ => {
                    return Err(Error::msg(format!(
                        "Cannot increment non-numeric field `{key}`"
                    )));
                }
            };
            *field = incremented;
        }

        Ok(())
    }
}

/// Locate a field for writing, creating intermediate objects and a null leaf
/// as needed.
fn field_mut<'a>(object: &'a mut Map<String, Value>, key: &Key) -> DbResult<&'a mut Value> {
    let mut parts = key.as_str().split('.').peekable();
    let mut current = object;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            return Ok(current.entry(part.to_string()).or_insert(Value::Null));
        }
        let next = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match next {
            Value::Object(map) => map,
            _ => return Err(Error::msg(format!("Field `{part}` of `{key}` is not an object"))),
        };
    }
    Err(Error::msg("Empty update key"))
}
