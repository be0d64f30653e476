use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Key(pub String);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Query {
    Eq(Key, Value),
    Ne(Key, Value),
    Like(Key, String),
    Lt(Key, Value),
    Lte(Key, Value),
    Gt(Key, Value),
    Gte(Key, Value),
    And(Vec<Query>),
    Or(Vec<Query>),
    All,
}

impl Query {
    /// Create a new query that matches documents based on exact match. When the
    /// field holds an array, the query matches if any element is equal.
    ///
    /// ```
    /// use person_repo_core::database::query::Query;
    ///
    /// let query = Query::eq("name", "John");
    /// ```
    pub fn eq<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Eq(key.into(), value.into())
    }

    /// Create a new query that matches documents based on not equal match.
    ///
    /// ```
    /// use person_repo_core::database::query::Query;
    /// let query = Query::ne("name", "John");
    /// ```
    pub fn ne<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Ne(key.into(), value.into())
    }

    /// Create a new query that matches documents based on multiple conditions.
    ///
    /// ```
    /// use person_repo_core::database::query::Query;
    ///
    /// let query = Query::and(vec![
    ///    Query::eq("name", "John"),
    ///    Query::eq("age", 30),
    /// ]);
    /// ```
    pub fn and(queries: Vec<Query>) -> Self {
        Self::And(queries)
    }

    /// Create a new query that matches documents satisfying any condition.
    ///
    /// ```
    /// use person_repo_core::database::query::Query;
    ///
    /// let query = Query::or(vec![
    ///   Query::eq("name", "John"),
    ///   Query::eq("age", 30),
    /// ]);
    /// ```
    pub fn or(queries: Vec<Query>) -> Self {
        Self::Or(queries)
    }

    /// Create a new query that matches documents whose string field contains the value.
    ///
    /// ```
    /// use person_repo_core::database::query::Query;
    /// let query = Query::like("name", "Jo");
    /// ```
    pub fn like<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<String>,
    {
        Self::Like(key.into(), value.into())
    }

    pub fn lt<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Lt(key.into(), value.into())
    }

    pub fn lte<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Lte(key.into(), value.into())
    }

    pub fn gt<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Gt(key.into(), value.into())
    }

    pub fn gte<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Gte(key.into(), value.into())
    }

    /// Create a new query that matches all documents.
    pub fn all() -> Self {
        Self::All
    }

    /// Check if the query matches the document.
    ///
    /// ```
    /// use person_repo_core::database::query::Query;
    /// use serde_json::json;
    /// let query = Query::eq("favoriteFoods", "Pizza");
    /// let value = json!({"name": "John", "favoriteFoods": ["Pizza", "Burger"]});
    /// assert!(query.matches(&value));
    /// ```
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Eq(key, query_value) => match resolve(value, key) {
                Some(field @ Value::Array(items)) => {
                    field == query_value || items.iter().any(|item| item == query_value)
                }
                Some(field) => field == query_value,
                None => query_value.is_null(),
            },
            Self::Ne(key, query_value) => {
                !Self::Eq(key.clone(), query_value.clone()).matches(value)
            }
            Self::Like(key, needle) => any_element(value, key, |field| {
                field.as_str().is_some_and(|s| s.contains(needle.as_str()))
            }),
            Self::Lt(key, query_value) => compare_field(value, key, query_value, Ordering::is_lt),
            Self::Lte(key, query_value) => compare_field(value, key, query_value, Ordering::is_le),
            Self::Gt(key, query_value) => compare_field(value, key, query_value, Ordering::is_gt),
            Self::Gte(key, query_value) => compare_field(value, key, query_value, Ordering::is_ge),
            Self::And(queries) => queries.iter().all(|query| query.matches(value)),
            Self::Or(queries) => queries.iter().any(|query| query.matches(value)),
            Self::All => true,
        }
    }
}

/// Walk a dot separated key into nested objects.
pub fn resolve<'a>(value: &'a Value, key: &Key) -> Option<&'a Value> {
    key.as_str()
        .split('.')
        .try_fold(value, |current, part| current.as_object()?.get(part))
}

fn any_element<F>(value: &Value, key: &Key, predicate: F) -> bool
where
    F: Fn(&Value) -> bool,
{
    match resolve(value, key) {
        Some(Value::Array(items)) => items.iter().any(&predicate),
        Some(field) => predicate(field),
        None => false,
    }
}

fn compare_field<F>(value: &Value, key: &Key, query_value: &Value, accept: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    any_element(value, key, |field| {
        compare_scalars(field, query_value).is_some_and(&accept)
    })
}

/// Order two scalars of the same kind. Mixed kinds are not comparable.
pub fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn person() -> Value {
        json!({
            "_id": "01J0000000000000000000000A",
            "name": "John Doe",
            "age": 30,
            "favoriteFoods": ["Pizza", "Burger"],
            "address": {"city": "Springfield"}
        })
    }

    #[test]
    fn eq_matches_scalar_fields() {
        assert!(Query::eq("name", "John Doe").matches(&person()));
        assert!(!Query::eq("name", "Mary").matches(&person()));
        assert!(Query::eq("age", 30).matches(&person()));
    }

    #[test]
    fn eq_matches_any_array_element() {
        assert!(Query::eq("favoriteFoods", "Pizza").matches(&person()));
        assert!(Query::eq("favoriteFoods", "Burger").matches(&person()));
        assert!(!Query::eq("favoriteFoods", "Burrito").matches(&person()));
    }

    #[test]
    fn eq_matches_whole_array() {
        assert!(Query::eq("favoriteFoods", json!(["Pizza", "Burger"])).matches(&person()));
        assert!(!Query::eq("favoriteFoods", json!(["Burger", "Pizza"])).matches(&person()));
    }

    #[test]
    fn eq_null_matches_missing_field() {
        assert!(Query::eq("nickname", Value::Null).matches(&person()));
        assert!(!Query::eq("nickname", "Johnny").matches(&person()));
    }

    #[test]
    fn ne_is_negated_eq() {
        assert!(Query::ne("name", "Mary").matches(&person()));
        assert!(!Query::ne("favoriteFoods", "Pizza").matches(&person()));
        assert!(Query::ne("nickname", "Johnny").matches(&person()));
    }

    #[test]
    fn nested_keys_resolve() {
        assert!(Query::eq("address.city", "Springfield").matches(&person()));
        assert!(!Query::eq("address.zip", "12345").matches(&person()));
    }

    #[test]
    fn like_checks_substrings() {
        assert!(Query::like("name", "Doe").matches(&person()));
        assert!(Query::like("favoriteFoods", "urg").matches(&person()));
        assert!(!Query::like("age", "3").matches(&person()));
    }

    #[test]
    fn range_queries_compare_numbers_and_strings() {
        assert!(Query::lt("age", 31).matches(&person()));
        assert!(Query::lte("age", 30).matches(&person()));
        assert!(!Query::gt("age", 30).matches(&person()));
        assert!(Query::gte("age", 29.5).matches(&person()));
        assert!(Query::gt("name", "Alice").matches(&person()));
        assert!(!Query::lt("name", 5).matches(&person()));
    }

    #[test]
    fn and_or_all_combine() {
        let both = Query::and(vec![
            Query::eq("name", "John Doe"),
            Query::eq("favoriteFoods", "Pizza"),
        ]);
        assert!(both.matches(&person()));
        let either = Query::or(vec![Query::eq("name", "Mary"), Query::eq("age", 30)]);
        assert!(either.matches(&person()));
        assert!(!Query::and(vec![Query::eq("name", "Mary"), Query::All]).matches(&person()));
        assert!(Query::all().matches(&person()));
    }
}
