//! Admin gate for destructive operations.
//!
//! Deleting and re-initializing suppliers is expected to sit behind a shared secret.
//! The ledger operations themselves do not check it; the request layer calls
//! [`verify_admin_password`] before dispatching them.

use crate::{
    config::environment::AppConfig,
    errors::{Error, Result},
};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Checks a submitted password against the configured admin secret.
///
/// Fails with [`Error::Config`] when no secret is configured, so an unconfigured
/// deployment never grants admin access.
pub fn verify_admin_password(config: &AppConfig, submitted: &str) -> Result<()> {
    let Some(expected) = config.admin_password.as_deref() else {
        return Err(Error::Config {
            message: "ADMIN_PASSWORD is not configured".to_string(),
        });
    };

    let matches: bool = expected.as_bytes().ct_eq(submitted.as_bytes()).into();
    if matches {
        Ok(())
    } else {
        warn!("Rejected admin password");
        Err(Error::Unauthorized)
    }
}
