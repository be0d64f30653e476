use anyhow::Error;
use chrono::{DateTime, Utc};
use database_instance::{DatabaseInstance, Documents, PrimaryKeyValue};
use find_many_options::{FindManyOptions, FindManyOrder, OrderDirection};
use fs2::FileExt;
use instance_name::InstanceName;
use log::*;
use query::{Key, Query, compare_scalars, resolve};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use ulid::{Generator, Ulid};
use update::Update;

use crate::entity::{Entity, EntityName};

pub mod database_instance;
pub mod find_many_options;
pub mod instance_name;
pub mod query;
pub mod update;

pub type DbResult<T> = Result<T, anyhow::Error>;

/// Which image of the document a find-and-modify request returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    Before,
    #[default]
    After,
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        // Missing and null values sort first.
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => compare_scalars(a, b).unwrap_or(Ordering::Equal),
    }
}

/// A database that stores multiple instances of data.
pub struct Database {
    instances: HashMap<InstanceName, DatabaseInstance>,
    ids: Generator,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Database {
            instances: HashMap::new(),
            ids: Generator::new(),
        }
    }

    pub fn add_instance(
        &mut self,
        name: &InstanceName,
        file_path: &str,
        entities: Vec<Entity>,
    ) -> &mut Self {
        let instance = DatabaseInstance {
            file_path: file_path.to_string(),
            entities,
            data: HashMap::new(),
        };
        self.instances.insert(name.clone(), instance);
        self
    }

    fn initialize_empty_data(entities: &[Entity]) -> HashMap<EntityName, Documents> {
        entities
            .iter()
            .map(|entity| (entity.name.clone(), Documents::new()))
            .collect()
    }

    pub fn load_instance(&mut self, name: &InstanceName) -> DbResult<&mut Self> {
        let instance = self
            .instances
            .get_mut(name)
            .ok_or_else(|| Error::msg("Instance not found"))?;

        let file_result = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&instance.file_path);

        match file_result {
            Ok(mut file) => {
                file.lock_exclusive()?;
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;

                let mut data = if buf.is_empty() {
                    HashMap::new()
                } else {
                    serde_json::from_slice::<HashMap<EntityName, Documents>>(&buf).map_err(|e| {
                        error!("Failed to read json from {}.", instance.file_path);
                        e
                    })?
                };
                for entity in &instance.entities {
                    data.entry(entity.name.clone()).or_default();
                }
                instance.data = data;

                FileExt::unlock(&file)?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if let Some(parent) = Path::new(&instance.file_path).parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                let mut file = fs::File::create(&instance.file_path)?;
                file.lock_exclusive()?;

                let data = Database::initialize_empty_data(&instance.entities);
                let json = serde_json::to_string(&data)?;
                file.write_all(json.as_bytes())?;
                file.sync_all()?;

                instance.data = data;
                FileExt::unlock(&file)?
            }
            Err(err) => {
                error!("Failed to open {}.", instance.file_path);
                return Err(err.into());
            }
        }

        debug!("Loaded instance `{name}` from {}", instance.file_path);
        Ok(self)
    }

    pub fn get_instance_by_entity(&self, entity: &Entity) -> Option<&DatabaseInstance> {
        self.instances
            .values()
            .find(|instance| instance.entities.contains(entity))
    }

    pub fn get_instance_by_entity_mut(&mut self, entity: &Entity) -> Option<&mut DatabaseInstance> {
        self.instances
            .values_mut()
            .find(|instance| instance.entities.contains(entity))
    }

    pub fn get_instance_name_by_entity(&self, entity: &Entity) -> Result<InstanceName, Error> {
        self.instances
            .iter()
            .find(|(_, instance)| instance.entities.contains(entity))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::msg(format!("Entity `{}` is not registered", entity.name)))
    }

    fn documents(&self, entity: &Entity) -> DbResult<Option<&Documents>> {
        let instance = self
            .get_instance_by_entity(entity)
            .ok_or_else(|| Error::msg("Entity not found"))?;
        Ok(instance.data.get(&entity.name))
    }

    fn documents_mut(&mut self, entity: &Entity) -> DbResult<&mut Documents> {
        let instance = self
            .get_instance_by_entity_mut(entity)
            .ok_or_else(|| Error::msg("Entity not found"))?;
        Ok(instance.get_or_init(&entity.name))
    }

    /// Assign a primary key and creation time to a new document.
    fn prepare_insert(&mut self, entity: &Entity, mut insert_value: Value) -> DbResult<Value> {
        let obj = insert_value
            .as_object_mut()
            .ok_or_else(|| Error::msg("Value must be a JSON object"))?;

        let mut _id: Option<Ulid> = None;
        if !obj.contains_key(entity.primary_key.as_str()) {
            let id = self
                .ids
                .generate()
                .map_err(|e| Error::msg(format!("Failed to generate id: {e}")))?;
            obj.insert(entity.primary_key.0.clone(), json!(id.to_string()));
            _id = Some(id);
        }

        if !obj.contains_key("_created_at") {
            let server_time = match _id {
                Some(id) => DateTime::<Utc>::from(id.datetime()),
                None => Utc::now(),
            };
            obj.insert("_created_at".to_string(), json!(server_time.to_rfc3339()));
        }

        Ok(insert_value)
    }

    /// Copy of a collection's documents, taken before a write so the write can
    /// be undone.
    pub fn snapshot(&self, entity: &Entity) -> DbResult<Documents> {
        Ok(self.documents(entity)?.cloned().unwrap_or_default())
    }

    /// Put a collection back to a state taken with `snapshot`.
    pub fn rollback(&mut self, entity: &Entity, documents: Documents) -> DbResult<()> {
        debug!("Rolling back `{}`", entity.name);
        *self.documents_mut(entity)? = documents;
        Ok(())
    }

    // Operations
    pub fn insert_one(&mut self, entity: &Entity, insert_value: Value) -> DbResult<Value> {
        let insert_value = self.prepare_insert(entity, insert_value)?;
        let primary_key_value = PrimaryKeyValue::new(&insert_value, &entity.primary_key)?;

        let data = self.documents_mut(entity)?;
        let key = primary_key_value.to_string();
        if data.contains_key(&key) {
            return Err(Error::msg(format!("Duplicate primary key `{key}`")));
        }
        data.insert(key, insert_value.clone());

        Ok(insert_value)
    }

    /// Insert every value or none of them.
    pub fn insert_many(
        &mut self,
        entity: &Entity,
        insert_values: Vec<Value>,
    ) -> DbResult<Vec<Value>> {
        let mut prepared = Vec::with_capacity(insert_values.len());
        for insert_value in insert_values {
            let insert_value = self.prepare_insert(entity, insert_value)?;
            let key = PrimaryKeyValue::new(&insert_value, &entity.primary_key)?.to_string();
            prepared.push((key, insert_value));
        }

        let data = self.documents_mut(entity)?;
        for (index, (key, _)) in prepared.iter().enumerate() {
            let repeated = prepared[..index].iter().any(|(other, _)| other == key);
            if repeated || data.contains_key(key) {
                return Err(Error::msg(format!("Duplicate primary key `{key}`")));
            }
        }

        let mut inserted = Vec::with_capacity(prepared.len());
        for (key, value) in prepared {
            data.insert(key, value.clone());
            inserted.push(value);
        }

        Ok(inserted)
    }

    /// The first matching document in primary key order.
    pub fn find_one(&self, entity: &Entity, query: &Query) -> DbResult<Option<Value>> {
        let Some(data) = self.documents(entity)? else {
            return Ok(None);
        };
        Ok(data.values().find(|value| query.matches(value)).cloned())
    }

    pub fn find_many(
        &self,
        entity: &Entity,
        query: &Query,
        find_many_options: Option<FindManyOptions>,
    ) -> DbResult<Vec<Value>> {
        let FindManyOptions {
            skip,
            limit,
            order,
            projection,
        } = find_many_options.unwrap_or_default();

        let Some(data) = self.documents(entity)? else {
            return Ok(vec![]);
        };

        let mut results: Vec<Value> = data
            .values()
            .filter(|value| query.matches(value))
            .cloned()
            .collect();

        self.apply_ordering(&mut results, order);
        let paginated = self.apply_skip_limit(results, skip, limit);

        Ok(match projection {
            Some(projection) => paginated
                .into_iter()
                .map(|value| projection.apply(value, entity.primary_key.as_str()))
                .collect(),
            None => paginated,
        })
    }

    fn apply_ordering(&self, data: &mut [Value], order: Option<Vec<FindManyOrder>>) {
        let Some(ordering) = order else {
            return;
        };
        // Stable sorts applied from the least significant key.
        for FindManyOrder {
            property,
            direction,
        } in ordering.iter().rev()
        {
            let key = Key::from(property.as_str());
            data.sort_by(|a, b| {
                let a_val = resolve(a, &key).unwrap_or(&Value::Null);
                let b_val = resolve(b, &key).unwrap_or(&Value::Null);
                let ord = compare_values(a_val, b_val);
                match direction {
                    OrderDirection::Ascending => ord,
                    OrderDirection::Descending => ord.reverse(),
                }
            });
        }
    }

    fn apply_skip_limit(
        &self,
        data: Vec<Value>,
        skip: Option<i32>,
        limit: Option<i32>,
    ) -> Vec<Value> {
        let skip = skip.unwrap_or(0).max(0) as usize;
        let limit = limit.map_or(usize::MAX, |limit| limit.max(0) as usize);
        data.into_iter().skip(skip).take(limit).collect()
    }

    /// Atomically modify the first matching document.
    pub fn find_one_and_update(
        &mut self,
        entity: &Entity,
        query: &Query,
        update: &Update,
        return_document: ReturnDocument,
    ) -> DbResult<Option<Value>> {
        let primary_key = entity.primary_key.clone();
        let data = self.documents_mut(entity)?;

        let Some(value) = data.values_mut().find(|value| query.matches(value)) else {
            return Ok(None);
        };

        let mut updated = value.clone();
        update.apply(&mut updated, &primary_key)?;
        let before = std::mem::replace(value, updated.clone());

        Ok(Some(match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => updated,
        }))
    }

    /// Modify the first matching document and return its new image, or `None`
    /// when nothing matched.
    pub fn update_one(
        &mut self,
        entity: &Entity,
        query: &Query,
        update: &Update,
    ) -> DbResult<Option<Value>> {
        self.find_one_and_update(entity, query, update, ReturnDocument::After)
    }

    /// Remove the first matching document and return it.
    pub fn find_one_and_delete(
        &mut self,
        entity: &Entity,
        query: &Query,
    ) -> DbResult<Option<Value>> {
        let data = self.documents_mut(entity)?;

        let matching_key = data
            .iter()
            .find(|(_, value)| query.matches(value))
            .map(|(key, _)| key.clone());

        Ok(matching_key.and_then(|key| data.remove(&key)))
    }

    pub fn delete_many(&mut self, entity: &Entity, query: &Query) -> DbResult<Vec<Value>> {
        let data = self.documents_mut(entity)?;

        let matching_keys: Vec<String> = data
            .iter()
            .filter(|(_, value)| query.matches(value))
            .map(|(key, _)| key.clone())
            .collect();

        Ok(matching_keys
            .into_iter()
            .filter_map(|key| data.remove(&key))
            .collect())
    }

    pub fn commit(&self, names: Vec<InstanceName>) -> Result<(), Error> {
        for name in names {
            let instance = self
                .instances
                .get(&name)
                .ok_or_else(|| Error::msg("Instance not found"))?;

            let original_path = PathBuf::from(&instance.file_path);
            let mut tmp_path = original_path.clone();

            // Shadow file, e.g. "people.json.tmp"
            tmp_path.set_extension("json.tmp");

            let serialized = serde_json::to_vec(&instance.data)?;

            let mut tmp_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| {
                    error!("Failed to open temp path: {tmp_path:?}");
                    e
                })?;

            tmp_file.lock_exclusive()?;
            tmp_file.write_all(&serialized)?;
            tmp_file.sync_all()?;
            FileExt::unlock(&tmp_file)?;
            drop(tmp_file);

            fs::rename(&tmp_path, &original_path)?;
            trace!("Committed instance `{name}`");
        }

        Ok(())
    }
}
