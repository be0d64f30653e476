use log::*;
use serde::{Deserialize, Serialize};

use person_repo_core::{
    database::{
        find_many_options::{FindManyOptions, OrderDirection, Projection},
        query::Query,
        update::Update,
        ReturnDocument,
    },
    entity::Entity,
};

use crate::{
    error::RepositoryError,
    person::{NewPerson, Person, PersonDocument, PersonId},
    store::Store,
};

/// Food appended by `find_edit_then_save`.
pub const EDIT_FOOD: &str = "Hamburger";
/// Age written by `find_and_update`.
pub const UPDATED_AGE: i64 = 20;
/// Name removed by `remove_many_people`.
pub const REMOVE_NAME: &str = "Mary";
/// Food filtered on by `query_chain`.
pub const QUERY_FOOD: &str = "Burrito";
/// Maximum number of people returned by the query chain.
pub const QUERY_LIMIT: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    #[serde(rename = "deletedCount")]
    pub deleted_count: usize,
}

/// Data access for the `person` collection.
///
/// Every operation returns its failure to the caller after logging it.
#[derive(Debug, Clone)]
pub struct PersonRepository {
    store: Store,
    entity: Entity,
}

fn log_failure(operation: &'static str) -> impl Fn(&RepositoryError) {
    move |err: &RepositoryError| error!("{operation} failed: {err}")
}

fn by_id(id: &PersonId) -> Query {
    Query::eq("_id", id.as_str())
}

impl PersonRepository {
    /// The store must already hold an instance registering `Person::entity()`.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            entity: Person::entity(),
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Create and save the sample person (John Doe, 30, Pizza and Burger).
    pub async fn create_person(&self) -> Result<Person, RepositoryError> {
        self.create_one(NewPerson::sample()).await
    }

    pub async fn create_one(&self, person: NewPerson) -> Result<Person, RepositoryError> {
        debug!("Creating person `{}`", person.name);
        self.insert_one(&person)
            .await
            .inspect_err(log_failure("create_one"))
    }

    async fn insert_one(&self, person: &NewPerson) -> Result<Person, RepositoryError> {
        person.validate()?;
        let document = serde_json::to_value(PersonDocument { person, version: 0 })?;
        Ok(self.store.insert_one(&self.entity, document).await?)
    }

    /// Create several people. The batch is validated up front; if any entry is
    /// invalid nothing is written.
    pub async fn create_many_people(
        &self,
        people: Vec<NewPerson>,
    ) -> Result<Vec<Person>, RepositoryError> {
        debug!("Creating {} people", people.len());
        self.insert_many(&people)
            .await
            .inspect_err(log_failure("create_many_people"))
    }

    async fn insert_many(&self, people: &[NewPerson]) -> Result<Vec<Person>, RepositoryError> {
        let mut documents = Vec::with_capacity(people.len());
        for person in people {
            person.validate()?;
            documents.push(serde_json::to_value(PersonDocument { person, version: 0 })?);
        }
        Ok(self.store.insert_many(&self.entity, documents).await?)
    }

    pub async fn find_people_by_name(&self, name: &str) -> Result<Vec<Person>, RepositoryError> {
        debug!("Finding people named `{name}`");
        self.store
            .find_many(&self.entity, Query::eq("name", name), None)
            .await
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("find_people_by_name"))
    }

    /// The first person, in store order, whose favorite foods include `food`.
    pub async fn find_one_by_food(&self, food: &str) -> Result<Option<Person>, RepositoryError> {
        debug!("Finding one person who likes `{food}`");
        self.store
            .find_one(&self.entity, Query::eq("favoriteFoods", food))
            .await
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("find_one_by_food"))
    }

    pub async fn find_person_by_id(
        &self,
        id: &PersonId,
    ) -> Result<Option<Person>, RepositoryError> {
        debug!("Finding person `{id}`");
        self.store
            .find_one(&self.entity, by_id(id))
            .await
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("find_person_by_id"))
    }

    /// Look a person up, append `Hamburger` to their favorite foods and save.
    ///
    /// The save only applies if the record still has the version that was
    /// read; otherwise the operation fails with `Conflict`.
    pub async fn find_edit_then_save(&self, id: &PersonId) -> Result<Person, RepositoryError> {
        debug!("Editing favorite foods of `{id}`");
        self.edit_then_save(id)
            .await
            .inspect_err(log_failure("find_edit_then_save"))
    }

    async fn edit_then_save(&self, id: &PersonId) -> Result<Person, RepositoryError> {
        let mut person: Person = self
            .store
            .find_one(&self.entity, by_id(id))
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        person.favorite_foods.push(EDIT_FOOD.to_string());
        self.save_versioned(&person).await
    }

    /// Write the person's fields back, provided nobody changed the record since
    /// it was read. Bumps the version on success.
    pub async fn save(&self, person: &Person) -> Result<Person, RepositoryError> {
        debug!("Saving person `{}` at version {}", person.id, person.version);
        self.save_versioned(person)
            .await
            .inspect_err(log_failure("save"))
    }

    async fn save_versioned(&self, person: &Person) -> Result<Person, RepositoryError> {
        let query = Query::and(vec![by_id(&person.id), Query::eq("__v", person.version)]);
        // A cleared age is stored as null.
        let update = Update::new()
            .set("name", person.name.as_str())
            .set("age", person.age)
            .set("favoriteFoods", person.favorite_foods.clone())
            .inc("__v", 1);
        self.store
            .update_one(&self.entity, query, update)
            .await?
            .ok_or_else(|| RepositoryError::Conflict(person.id.clone()))
    }

    /// Set the age of the first person named `name` to 20 in one atomic request
    /// and return the updated record.
    pub async fn find_and_update(&self, name: &str) -> Result<Option<Person>, RepositoryError> {
        debug!("Updating age of `{name}`");
        let update = Update::new().set("age", UPDATED_AGE).inc("__v", 1);
        self.store
            .find_one_and_update(
                &self.entity,
                Query::eq("name", name),
                update,
                ReturnDocument::After,
            )
            .await
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("find_and_update"))
    }

    /// Delete a person and return the record as it was before removal.
    pub async fn remove_by_id(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        debug!("Removing person `{id}`");
        self.store
            .find_one_and_delete(&self.entity, by_id(id))
            .await
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("remove_by_id"))
    }

    /// Delete everyone named Mary.
    pub async fn remove_many_people(&self) -> Result<DeleteSummary, RepositoryError> {
        self.remove_many_by_name(REMOVE_NAME).await
    }

    pub async fn remove_many_by_name(&self, name: &str) -> Result<DeleteSummary, RepositoryError> {
        debug!("Removing people named `{name}`");
        self.store
            .delete_many(&self.entity, Query::eq("name", name))
            .await
            .map(|deleted_count| DeleteSummary { deleted_count })
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("remove_many_by_name"))
    }

    /// Up to two people who like burritos, sorted by name, without their age.
    pub async fn query_chain(&self) -> Result<Vec<Person>, RepositoryError> {
        self.query_chain_by_food(QUERY_FOOD).await
    }

    pub async fn query_chain_by_food(&self, food: &str) -> Result<Vec<Person>, RepositoryError> {
        debug!("Running query chain for `{food}`");
        let options = FindManyOptions::default()
            .order_by("name", OrderDirection::Ascending)
            .limit(QUERY_LIMIT)
            .projection(Projection::exclude(["age"]));
        self.store
            .find_many(&self.entity, Query::eq("favoriteFoods", food), Some(options))
            .await
            .map_err(RepositoryError::from)
            .inspect_err(log_failure("query_chain"))
    }
}
