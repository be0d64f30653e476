//! Data access for a collection of people backed by an embedded JSON
//! document store.
//!
//! ```
//! use person_repo::*;
//! # use anyhow::Error;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let store = Store::new();
//! store
//!     .add_instance("people", "./db/doc_people.json", vec![Person::entity()])
//!     .await?;
//! let repository = PersonRepository::new(store);
//!
//! let john = repository.create_person().await?;
//! let found = repository.find_person_by_id(&john.id).await?;
//! assert_eq!(found, Some(john));
//! # Ok(())
//! # }
//! ```

mod completion;
mod config;
mod error;
mod person;
mod repository;
mod store;

pub use crate::{
    completion::complete,
    config::Config,
    error::RepositoryError,
    person::{NewPerson, Person, PersonId},
    repository::{
        DeleteSummary, PersonRepository, EDIT_FOOD, QUERY_FOOD, QUERY_LIMIT, REMOVE_NAME,
        UPDATED_AGE,
    },
    store::Store,
};

pub use person_repo_core::{
    database::{
        find_many_options::{FindManyOptions, FindManyOrder, OrderDirection, Projection},
        query::Query,
        update::Update,
        ReturnDocument,
    },
    entity::Entity,
};
