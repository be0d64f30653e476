use std::env;

use log::*;
use serde::{Deserialize, Serialize};

pub const DATABASE_PATH_VAR: &str = "PERSON_REPO_DB";
pub const INSTANCE_NAME_VAR: &str = "PERSON_REPO_INSTANCE";

const DEFAULT_DATABASE_PATH: &str = "./db/people.json";
const DEFAULT_INSTANCE_NAME: &str = "people";

/// Where the store keeps its data.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    pub instance_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
        }
    }
}

impl Config {
    /// Read the configuration from the environment, after loading an optional
    /// `.env` file. Unset variables fall back to the defaults.
    pub fn from_env() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            debug!("No .env file loaded: {err}");
        }

        let defaults = Config::default();
        Config {
            database_path: env::var(DATABASE_PATH_VAR).unwrap_or(defaults.database_path),
            instance_name: env::var(INSTANCE_NAME_VAR).unwrap_or(defaults.instance_name),
        }
    }

    pub fn with_database_path(mut self, database_path: &str) -> Self {
        self.database_path = database_path.to_string();
        self
    }
}
