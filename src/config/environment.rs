//! Application settings loaded from environment variables.
//!
//! `.env` is read by the binary via `dotenvy` before [`AppConfig::from_env`] runs, so
//! every setting can live either in the process environment or in that file.

use crate::config::database;
use crate::errors::{Error, Result};
use std::path::PathBuf;

/// Default location of the supplier seed file.
pub const DEFAULT_SEED_FILE: &str = "config.toml";

/// Runtime settings for the ledger.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Store connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Shared admin secret (`ADMIN_PASSWORD`); the admin gate refuses everyone when unset
    pub admin_password: Option<String>,
    /// Path of the supplier seed file (`LEDGER_SEED_FILE`)
    pub seed_file: PathBuf,
}

impl AppConfig {
    /// Reads settings from the environment, applying defaults for optional values.
    pub fn from_env() -> Result<Self> {
        let database_url = database::get_database_url();
        if database_url.trim().is_empty() {
            return Err(Error::Config {
                message: "DATABASE_URL is set but empty".to_string(),
            });
        }

        let admin_password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|password| !password.is_empty());

        let seed_file = std::env::var("LEDGER_SEED_FILE")
            .map_or_else(|_| PathBuf::from(DEFAULT_SEED_FILE), PathBuf::from);

        Ok(Self {
            database_url,
            admin_password,
            seed_file,
        })
    }
}
