use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FindManyOrder {
    pub property: String,
    pub direction: OrderDirection,
}

/// Fields to keep or drop from each returned document. The primary key is
/// always kept.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, value: Value, primary_key: &str) -> Value {
        let Value::Object(object) = value else {
            return value;
        };
        let projected: Map<String, Value> = match self {
            Self::Include(fields) => object
                .into_iter()
                .filter(|(k, _)| k == primary_key || fields.contains(k))
                .collect(),
            Self::Exclude(fields) => object
                .into_iter()
                .filter(|(k, _)| k == primary_key || !fields.contains(k))
                .collect(),
        };
        Value::Object(projected)
    }
}

/// Shapes the result of a find-many request. Stages run in a fixed order:
/// sort, skip, limit, then projection.
///
/// ```
/// use person_repo_core::database::find_many_options::*;
///
/// let options = FindManyOptions::default()
///     .order_by("name", OrderDirection::Ascending)
///     .limit(2)
///     .projection(Projection::exclude(["age"]));
/// assert_eq!(options.limit, Some(2));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct FindManyOptions {
    pub skip: Option<i32>,
    pub limit: Option<i32>,
    pub order: Option<Vec<FindManyOrder>>,
    pub projection: Option<Projection>,
}

impl FindManyOptions {
    pub fn skip(mut self, skip: i32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order_by(mut self, property: &str, direction: OrderDirection) -> Self {
        self.order.get_or_insert_with(Vec::new).push(FindManyOrder {
            property: property.to_string(),
            direction,
        });
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}
