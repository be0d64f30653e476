use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct EntityName(pub String);

impl From<&str> for EntityName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct PrimaryKey(pub String);

impl PrimaryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self("_id".to_string())
    }
}

/// A collection of documents. The primary key names the field that uniquely
/// identifies a document within the collection.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: EntityName,
    pub primary_key: PrimaryKey,
}

impl Entity {
    /// Create a new entity keyed by `_id`.
    /// # Example
    /// ```rust
    /// use person_repo_core::entity::Entity;
    /// let person = Entity::new("person");
    /// assert_eq!(person.primary_key.as_str(), "_id");
    /// ```
    pub fn new(s: &str) -> Self {
        Entity {
            name: EntityName::from(s),
            primary_key: PrimaryKey::default(),
        }
    }

    pub fn primary_key(mut self, key: &str) -> Self {
        self.primary_key = PrimaryKey(key.to_string());
        self
    }
}

impl From<&str> for Entity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
