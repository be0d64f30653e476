use anyhow::Error;
use log::*;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use person_repo_core::{
    database::{
        find_many_options::FindManyOptions, instance_name::InstanceName, query::Query,
        update::Update, Database, ReturnDocument,
    },
    entity::Entity,
};

use crate::config::Config;

/// Apply `write` to `entity`'s collection and commit its instance when
/// `changed` says the result touched anything. A failed write or commit
/// restores the collection, so a failed request leaves nothing behind.
fn write_and_commit<R, W, C>(
    db: &mut Database,
    entity: &Entity,
    write: W,
    changed: C,
) -> Result<R, Error>
where
    W: FnOnce(&mut Database) -> Result<R, Error>,
    C: FnOnce(&R) -> bool,
{
    let snapshot = db.snapshot(entity)?;
    let result = write(&mut *db).and_then(|value| {
        if changed(&value) {
            let name = db.get_instance_name_by_entity(entity)?;
            db.commit(vec![name])?;
        }
        Ok(value)
    });

    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("Write to `{}` failed: {err}", entity.name);
            db.rollback(entity, snapshot)?;
            Err(err)
        }
    }
}

/// Handle to the document store. Cloning is cheap and every clone talks to
/// the same data. Writers are serialized; readers share access.
#[derive(Clone, Debug)]
pub struct Store {
    db: Arc<RwLock<Database>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a store with no instances.
    ///
    /// ```
    /// # use person_repo::Store;
    /// let store = Store::new();
    /// ```
    pub fn new() -> Self {
        debug!("Creating new store");
        Self {
            db: Arc::new(RwLock::new(Database::new())),
        }
    }

    /// Create a store and load the configured instance holding `entities`.
    pub async fn open(config: &Config, entities: Vec<Entity>) -> Result<Self, Error> {
        let store = Self::new();
        store
            .add_instance(config.instance_name.as_str(), &config.database_path, entities)
            .await?;
        Ok(store)
    }

    /// Add an instance to the store. An instance is a JSON file holding one or
    /// more collections:
    ///
    /// ```json
    /// {
    ///     "person": {"01J...": {...}, "01J...": {...}}
    /// }
    /// ```
    ///
    /// The file, and its parent directory, are created if missing.
    pub async fn add_instance<N>(
        &self,
        name: N,
        file_path: &str,
        entities: Vec<Entity>,
    ) -> Result<&Self, Error>
    where
        N: Into<InstanceName>,
    {
        let name = name.into();
        debug!("Adding instance `{name}`");
        let mut db = self.db.write().await;
        db.add_instance(&name, file_path, entities);
        db.load_instance(&name)?;
        Ok(self)
    }

    /// Insert a single document. The returned value carries the assigned id.
    pub async fn insert_one<T, K>(&self, entity: &Entity, value: K) -> Result<T, Error>
    where
        T: DeserializeOwned,
        K: Serialize,
    {
        debug!("Inserting into `{}`", entity.name);
        let value = serde_json::to_value(value)?;

        let mut db = self.db.write().await;
        let value = write_and_commit(&mut db, entity, |db| db.insert_one(entity, value), |_| true)?;
        trace!("Inserted value: {:?}", value);
        Ok(serde_json::from_value(value)?)
    }

    /// Insert several documents; either all are stored or none.
    pub async fn insert_many<T, K>(&self, entity: &Entity, values: Vec<K>) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        K: Serialize,
    {
        debug!("Inserting many into `{}`", entity.name);
        let values: Vec<Value> = values
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;

        let mut db = self.db.write().await;
        let values = write_and_commit(
            &mut db,
            entity,
            |db| db.insert_many(entity, values),
            |values| !values.is_empty(),
        )?;
        trace!("Inserted values: {:?}", values);
        let typed: Result<Vec<T>, _> = values.into_iter().map(serde_json::from_value).collect();
        Ok(typed?)
    }

    pub async fn find_one<T>(&self, entity: &Entity, query: Query) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        debug!("Finding one in `{}`", entity.name);
        let db = self.db.read().await;
        let value = db.find_one(entity, &query)?;
        trace!("Found value: {:?}", value);
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    /// Find matching documents, shaped by `find_many_options`.
    ///
    /// ```
    /// # use person_repo::*;
    /// # use anyhow::Error;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Error> {
    /// # let store = Store::new();
    /// # let person = Person::entity();
    /// # store.add_instance("doc", "./db/doc_find_many.json", vec![person.clone()]).await?;
    /// let people = store
    ///     .find_many::<Person>(
    ///         &person,
    ///         Query::eq("favoriteFoods", "Burrito"),
    ///         Some(
    ///             FindManyOptions::default()
    ///                 .order_by("name", OrderDirection::Ascending)
    ///                 .limit(2),
    ///         ),
    ///     )
    ///     .await?;
    /// assert!(people.len() <= 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_many<T>(
        &self,
        entity: &Entity,
        query: Query,
        find_many_options: Option<FindManyOptions>,
    ) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
    {
        debug!("Finding many in `{}`", entity.name);
        let db = self.db.read().await;
        let values = db.find_many(entity, &query, find_many_options)?;
        trace!("Found values: {:?}", values);
        let typed: Result<Vec<T>, _> = values.into_iter().map(serde_json::from_value).collect();
        Ok(typed?)
    }

    /// Atomically update the first matching document. Returns `None` when
    /// nothing matched.
    pub async fn find_one_and_update<T>(
        &self,
        entity: &Entity,
        query: Query,
        update: Update,
        return_document: ReturnDocument,
    ) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        debug!("Finding and updating one in `{}`", entity.name);
        let mut db = self.db.write().await;
        let value = write_and_commit(
            &mut db,
            entity,
            |db| db.find_one_and_update(entity, &query, &update, return_document),
            Option::is_some,
        )?;
        trace!("Updated value: {:?}", value);
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    /// Update the first document matching `query`. Returns `None`, and leaves
    /// the store untouched, when nothing matched.
    pub async fn update_one<T>(
        &self,
        entity: &Entity,
        query: Query,
        update: Update,
    ) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        debug!("Updating one in `{}`", entity.name);
        let mut db = self.db.write().await;
        let value = write_and_commit(
            &mut db,
            entity,
            |db| db.update_one(entity, &query, &update),
            Option::is_some,
        )?;
        trace!("Updated value: {:?}", value);
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    /// Remove the first matching document and return it as it was.
    pub async fn find_one_and_delete<T>(
        &self,
        entity: &Entity,
        query: Query,
    ) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        debug!("Finding and deleting one in `{}`", entity.name);
        let mut db = self.db.write().await;
        let value = write_and_commit(
            &mut db,
            entity,
            |db| db.find_one_and_delete(entity, &query),
            Option::is_some,
        )?;
        trace!("Deleted value: {:?}", value);
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    /// Remove every matching document. Returns how many were removed.
    pub async fn delete_many(&self, entity: &Entity, query: Query) -> Result<usize, Error> {
        debug!("Deleting many in `{}`", entity.name);
        let mut db = self.db.write().await;
        let values = write_and_commit(
            &mut db,
            entity,
            |db| db.delete_many(entity, &query),
            |values| !values.is_empty(),
        )?;
        trace!("Deleted values: {:?}", values);
        Ok(values.len())
    }
}
