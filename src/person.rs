use std::str::FromStr;

use person_repo_macros::Collection;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::RepositoryError;

/// Store-assigned identifier of a person. Always a canonical ULID string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PersonId {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Ulid::from_string(s).map_err(|_| RepositoryError::InvalidId(s.to_string()))?;
        Ok(Self(id.to_string()))
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored person.
#[derive(Collection, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[collection(name = "person", primary_key = "_id")]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(rename = "_id")]
    pub id: PersonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
    #[serde(rename = "__v", default)]
    pub version: u64,
}

/// The fields a caller supplies when creating a person.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            age: None,
            favorite_foods: vec![],
        }
    }

    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    /// The record written by `create_person`.
    pub fn sample() -> Self {
        Self::new("John Doe").age(30).favorite_foods(["Pizza", "Burger"])
    }

    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.name.is_empty() {
            return Err(RepositoryError::Validation("`name` is required".to_string()));
        }
        Ok(())
    }

    /// True when `person` carries exactly these fields.
    pub fn describes(&self, person: &Person) -> bool {
        self.name == person.name
            && self.age == person.age
            && self.favorite_foods == person.favorite_foods
    }
}

/// The document written on insert: the caller's fields plus a fresh version.
#[derive(Serialize)]
pub(crate) struct PersonDocument<'a> {
    #[serde(flatten)]
    pub person: &'a NewPerson,
    #[serde(rename = "__v")]
    pub version: u64,
}
