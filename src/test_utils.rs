//! Shared test utilities for the supplier ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{order, report, supplier},
    entities,
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all migrations applied.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::migrate(&db).await?;
    Ok(db)
}

/// Creates a test supplier with sensible defaults.
///
/// # Defaults
/// * `initial_amount`: 1500.00
/// * `current_amount`: 1500.00
pub async fn create_test_supplier(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::supplier::Model> {
    supplier::create_supplier(
        db,
        name.to_string(),
        Decimal::new(150_000, 2),
        Decimal::new(150_000, 2),
    )
    .await
}

/// Creates a test database with one supplier named "Test Supplier".
/// Returns both the database connection and the created supplier.
pub async fn setup_with_supplier() -> Result<(DatabaseConnection, entities::supplier::Model)> {
    let db = setup_test_db().await?;
    let supplier = create_test_supplier(&db, "Test Supplier").await?;
    Ok((db, supplier))
}

/// Builds an order request with a title and orderer filled in.
pub fn new_test_order(order_id: &str, supplier_id: i64, amount: Decimal) -> order::NewOrder {
    order::NewOrder {
        order_id: order_id.to_string(),
        supplier_id,
        title: format!("Test order {order_id}"),
        category: None,
        amount,
        order_date: None,
        ordered_by: "Tester".to_string(),
        notes: None,
    }
}

/// Creates a pending test order.
pub async fn create_test_order(
    db: &DatabaseConnection,
    order_id: &str,
    supplier_id: i64,
    amount: Decimal,
) -> Result<entities::order::Model> {
    order::create_order(db, new_test_order(order_id, supplier_id, amount)).await
}

/// Asserts that a supplier's balance equals the sum of its transaction log.
pub async fn assert_consistent(db: &DatabaseConnection, supplier_id: i64) -> Result<()> {
    let check = report::reconcile_supplier(db, supplier_id).await?;
    assert!(
        check.is_consistent(),
        "supplier {supplier_id} drifted: balance {} vs log {}",
        check.current_amount,
        check.transaction_total
    );
    Ok(())
}
