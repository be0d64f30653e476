use anyhow::Error;
use clap::{Parser, Subcommand};
use person_repo::{NewPerson, PersonId, PersonRepository, QUERY_FOOD, REMOVE_NAME};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "person_repo", about = "Query and modify the person collection")]
pub struct Cli {
    /// Store file, overriding PERSON_REPO_DB.
    #[arg(long, global = true)]
    pub db: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save the sample person (John Doe).
    Create,
    /// Save several people given as a JSON array.
    CreateMany { people: String },
    FindByName { name: String },
    FindByFood { food: String },
    FindById { id: PersonId },
    /// Append Hamburger to a person's favorite foods.
    EditThenSave { id: PersonId },
    /// Set the age of the first person with this name to 20.
    UpdateAge { name: String },
    RemoveById { id: PersonId },
    RemoveMany {
        #[arg(long, default_value = REMOVE_NAME)]
        name: String,
    },
    /// Two people sharing a favorite food, sorted by name, without age.
    QueryChain {
        #[arg(long, default_value = QUERY_FOOD)]
        food: String,
    },
}

impl Command {
    pub async fn run(self, repository: &PersonRepository) -> Result<Value, Error> {
        let output = match self {
            Command::Create => serde_json::to_value(repository.create_person().await?)?,
            Command::CreateMany { people } => {
                let people: Vec<NewPerson> = serde_json::from_str(&people)?;
                serde_json::to_value(repository.create_many_people(people).await?)?
            }
            Command::FindByName { name } => {
                serde_json::to_value(repository.find_people_by_name(&name).await?)?
            }
            Command::FindByFood { food } => {
                serde_json::to_value(repository.find_one_by_food(&food).await?)?
            }
            Command::FindById { id } => {
                serde_json::to_value(repository.find_person_by_id(&id).await?)?
            }
            Command::EditThenSave { id } => {
                serde_json::to_value(repository.find_edit_then_save(&id).await?)?
            }
            Command::UpdateAge { name } => {
                serde_json::to_value(repository.find_and_update(&name).await?)?
            }
            Command::RemoveById { id } => {
                serde_json::to_value(repository.remove_by_id(&id).await?)?
            }
            Command::RemoveMany { name } => {
                serde_json::to_value(repository.remove_many_by_name(&name).await?)?
            }
            Command::QueryChain { food } => {
                serde_json::to_value(repository.query_chain_by_food(&food).await?)?
            }
        };
        Ok(output)
    }
}
