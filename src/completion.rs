use std::future::Future;

use crate::error::RepositoryError;

/// Run a repository operation and hand its outcome to `done`.
///
/// `done` is called exactly once, with the result on success and with the
/// error on failure.
///
/// ```
/// # use person_repo::*;
/// # use anyhow::Error;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Error> {
/// # let store = Store::new();
/// # store.add_instance("doc", "./db/doc_complete.json", vec![Person::entity()]).await?;
/// let repository = PersonRepository::new(store);
/// complete(repository.create_person(), |result| match result {
///     Ok(person) => println!("created {}", person.id),
///     Err(err) => eprintln!("failed: {err}"),
/// })
/// .await;
/// # Ok(())
/// # }
/// ```
pub async fn complete<T, F, D>(operation: F, done: D)
where
    F: Future<Output = Result<T, RepositoryError>>,
    D: FnOnce(Result<T, RepositoryError>),
{
    done(operation.await)
}
