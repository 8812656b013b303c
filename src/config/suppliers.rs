//! Supplier seed configuration loading from config.toml
//!
//! This module provides functionality to load a list of suppliers from a TOML file
//! and create the ones that do not exist yet. It lets a fresh store start with a known
//! set of counterparties without going through the request layer.

use crate::{
    core::supplier,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire seed file
#[derive(Debug, Deserialize)]
pub struct SeedConfig {
    /// Suppliers to create when missing
    #[serde(default)]
    pub suppliers: Vec<SupplierSeed>,
}

/// Configuration for a single supplier
#[derive(Debug, Deserialize, Clone)]
pub struct SupplierSeed {
    /// Exact supplier name
    pub name: String,
    /// Starting balance
    pub initial_amount: Decimal,
    /// Live balance; defaults to the starting balance
    #[serde(default)]
    pub current_amount: Option<Decimal>,
}

/// Loads the supplier seed list from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_seed_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed file {:?}: {e}", path.as_ref()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse seed file {:?}: {e}", path.as_ref()),
    })
}

/// Creates every seeded supplier whose name is not in the store yet.
///
/// Existing suppliers are left untouched, so seeding is safe to repeat on every start.
/// Returns the number of suppliers created.
pub async fn seed_suppliers(db: &DatabaseConnection, config: &SeedConfig) -> Result<usize> {
    let mut created = 0;

    for seed in &config.suppliers {
        if supplier::get_supplier_by_name(db, seed.name.trim())
            .await?
            .is_some()
        {
            debug!(name = %seed.name, "Seeded supplier already exists");
            continue;
        }

        supplier::create_supplier(
            db,
            seed.name.clone(),
            seed.initial_amount,
            seed.current_amount.unwrap_or(seed.initial_amount),
        )
        .await?;
        created += 1;
    }

    info!(created, "Seeded suppliers");
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::report;
    use crate::test_utils::setup_test_db;
    use rust_decimal_macros::dec;

    const SEED: &str = r#"
        [[suppliers]]
        name = "Aroma"
        initial_amount = 10000.00

        [[suppliers]]
        name = "Tnuva"
        initial_amount = "2500.50"
        current_amount = "2000"
    "#;

    #[test]
    fn test_parse_seed_config() {
        let config: SeedConfig = toml::from_str(SEED).unwrap();
        assert_eq!(config.suppliers.len(), 2);
        assert_eq!(config.suppliers[0].name, "Aroma");
        assert_eq!(config.suppliers[0].initial_amount, dec!(10000));
        assert_eq!(config.suppliers[0].current_amount, None);
        assert_eq!(config.suppliers[1].initial_amount, dec!(2500.50));
        assert_eq!(config.suppliers[1].current_amount, Some(dec!(2000)));
    }

    #[test]
    fn test_missing_seed_file() {
        let result = load_seed_config("does/not/exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_seed_suppliers_is_repeatable() -> Result<()> {
        let db = setup_test_db().await?;
        let config: SeedConfig = toml::from_str(SEED).unwrap();

        assert_eq!(seed_suppliers(&db, &config).await?, 2);
        assert_eq!(seed_suppliers(&db, &config).await?, 0);

        let suppliers = report::list_suppliers(&db).await?;
        assert_eq!(suppliers.len(), 2);
        assert_eq!(suppliers[1].name, "Tnuva");
        assert_eq!(suppliers[1].current_amount, dec!(2000));

        Ok(())
    }
}
