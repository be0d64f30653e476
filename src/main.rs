use clap::Parser;
use cli::Cli;
use log::*;
use person_repo::{Config, Person, PersonRepository, Store};

mod cli;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db.as_deref() {
        config = config.with_database_path(db);
    }
    debug!("Using store at {}", config.database_path);

    let store = Store::open(&config, vec![Person::entity()]).await?;
    let repository = PersonRepository::new(store);

    let output = cli.command.run(&repository).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
