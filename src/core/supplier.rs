//! Supplier ledger - owns a supplier's balance and keeps it consistent with the log.
//!
//! Every mutation here runs inside one database transaction and writes the balance
//! change and its transaction log entry together. The ledger invariant maintained by
//! this module is that a supplier's `current_amount` always equals the sum of its
//! transaction amounts since the last re-initialization: the opening entry
//! (`initial` or `initialize`) carries the starting balance and every later entry
//! carries a signed delta.

use crate::{
    core::{
        money, order,
        transaction::{self as log, LogSummary, TransactionKind},
    },
    entities::{Order, Supplier, order as order_entity, supplier, transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QuerySelect, Set, SqlErr, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// A balance change together with the log entry that records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// The supplier after the change
    pub supplier: supplier::Model,
    /// The appended transaction
    pub transaction: transaction::Model,
}

/// What a supplier deletion removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedSupplier {
    /// The supplier as it was before deletion
    pub supplier: supplier::Model,
    /// Number of orders removed with it
    pub orders_removed: u64,
    /// Number of transactions removed with it
    pub transactions_removed: u64,
}

/// Outcome of a re-initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reinitialization {
    /// The supplier with its new amounts
    pub supplier: supplier::Model,
    /// Archival order capturing the previous history, when export was requested
    pub archived_order: Option<order_entity::Model>,
    /// Number of transactions removed
    pub cleared_transactions: u64,
    /// The fresh log (the `initialize` entry, plus an adjustment if needed)
    pub transactions: Vec<transaction::Model>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("Supplier name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn duplicate_name_or(err: DbErr, name: &str) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateName {
            name: name.to_string(),
        },
        _ => Error::Database(err),
    }
}

async fn name_taken<C>(db: &C, name: &str, excluding: Option<i64>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = Supplier::find().filter(supplier::Column::Name.eq(name));
    if let Some(id) = excluding {
        query = query.filter(supplier::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

/// Loads a supplier for mutation, taking a row lock where the backend supports it.
pub(crate) async fn find_for_update<C>(db: &C, supplier_id: i64) -> Result<supplier::Model>
where
    C: ConnectionTrait,
{
    Supplier::find_by_id(supplier_id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or(Error::SupplierNotFound { id: supplier_id })
}

/// Writes the opening entry and, if the requested current balance differs from the
/// opening balance, an adjustment bridging the two.
async fn open_ledger<C>(
    db: &C,
    supplier_id: i64,
    kind: TransactionKind,
    initial_amount: Decimal,
    current_amount: Decimal,
    description: String,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    let mut entries = vec![
        log::append_transaction(db, supplier_id, kind, initial_amount, description).await?,
    ];

    if current_amount != initial_amount {
        entries.push(
            log::append_transaction(
                db,
                supplier_id,
                TransactionKind::Adjustment,
                current_amount - initial_amount,
                format!(
                    "Opening balance adjusted from {} to {}",
                    money::format_amount(initial_amount),
                    money::format_amount(current_amount)
                ),
            )
            .await?,
        );
    }

    Ok(entries)
}

/// Finds a supplier by its unique ID.
pub async fn get_supplier_by_id<C>(db: &C, supplier_id: i64) -> Result<Option<supplier::Model>>
where
    C: ConnectionTrait,
{
    Supplier::find_by_id(supplier_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a supplier by its exact (case-sensitive) name.
pub async fn get_supplier_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<supplier::Model>> {
    Supplier::find()
        .filter(supplier::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a supplier and opens its ledger.
///
/// The name is trimmed and must be non-empty and unused; both amounts must be
/// non-negative. An `initial` transaction equal to `initial_amount` is appended, plus
/// an `adjustment` when `current_amount` differs from it.
#[instrument(skip(db))]
pub async fn create_supplier(
    db: &DatabaseConnection,
    name: String,
    initial_amount: Decimal,
    current_amount: Decimal,
) -> Result<supplier::Model> {
    let name = validate_name(&name)?;
    let initial_amount = money::ensure_non_negative(initial_amount)?;
    let current_amount = money::ensure_non_negative(current_amount)?;

    let txn = db.begin().await?;

    if name_taken(&txn, &name, None).await? {
        return Err(Error::DuplicateName { name });
    }

    let now = Utc::now();
    let created = supplier::ActiveModel {
        name: Set(name.clone()),
        initial_amount: Set(initial_amount),
        current_amount: Set(current_amount),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| duplicate_name_or(e, &name))?;

    open_ledger(
        &txn,
        created.id,
        TransactionKind::Initial,
        initial_amount,
        current_amount,
        "Initial supplier setup".to_string(),
    )
    .await?;

    txn.commit().await?;
    info!(supplier_id = created.id, name = %created.name, "Created supplier");
    Ok(created)
}

/// Overwrites a supplier's name and amounts.
///
/// This is a direct set, but it stays reconciled with the log: the appended `update`
/// transaction carries the signed difference between the old and new current amount,
/// and its description records both absolute values.
#[instrument(skip(db))]
pub async fn update_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
    name: String,
    initial_amount: Decimal,
    current_amount: Decimal,
) -> Result<supplier::Model> {
    let name = validate_name(&name)?;
    let initial_amount = money::ensure_non_negative(initial_amount)?;
    let current_amount = money::ensure_non_negative(current_amount)?;

    let txn = db.begin().await?;

    let existing = find_for_update(&txn, supplier_id).await?;
    if name_taken(&txn, &name, Some(supplier_id)).await? {
        return Err(Error::DuplicateName { name });
    }

    let previous_amount = existing.current_amount;
    let mut active: supplier::ActiveModel = existing.into();
    active.name = Set(name.clone());
    active.initial_amount = Set(initial_amount);
    active.current_amount = Set(current_amount);
    active.updated_at = Set(Utc::now());
    let updated = active
        .update(&txn)
        .await
        .map_err(|e| duplicate_name_or(e, &name))?;

    log::append_transaction(
        &txn,
        supplier_id,
        TransactionKind::Update,
        current_amount - previous_amount,
        format!(
            "Supplier updated: balance set from {} to {}",
            money::format_amount(previous_amount),
            money::format_amount(current_amount)
        ),
    )
    .await?;

    txn.commit().await?;
    info!(supplier_id, "Updated supplier");
    Ok(updated)
}

/// Deletes a supplier together with all of its orders and transactions.
#[instrument(skip(db))]
pub async fn delete_supplier(db: &DatabaseConnection, supplier_id: i64) -> Result<DeletedSupplier> {
    let txn = db.begin().await?;

    let existing = find_for_update(&txn, supplier_id).await?;

    let transactions_removed = log::clear_transactions(&txn, supplier_id).await?;
    let orders_removed = Order::delete_many()
        .filter(order_entity::Column::SupplierId.eq(supplier_id))
        .exec(&txn)
        .await?
        .rows_affected;
    Supplier::delete_by_id(supplier_id).exec(&txn).await?;

    txn.commit().await?;
    info!(
        supplier_id,
        orders_removed, transactions_removed, "Deleted supplier"
    );

    Ok(DeletedSupplier {
        supplier: existing,
        orders_removed,
        transactions_removed,
    })
}

/// Resets a supplier's amounts and replaces its history with a fresh opening entry.
///
/// When `export_history` is set, the old log is first folded into one approved
/// archival order (handler `System`, category `Other`) whose amount is the sum of the
/// discarded entries. The archival order has no balance effect.
#[instrument(skip(db))]
pub async fn reinitialize_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
    new_initial_amount: Decimal,
    new_current_amount: Decimal,
    export_history: bool,
) -> Result<Reinitialization> {
    let new_initial_amount = money::ensure_non_negative(new_initial_amount)?;
    let new_current_amount = money::ensure_non_negative(new_current_amount)?;

    let txn = db.begin().await?;

    let existing = find_for_update(&txn, supplier_id).await?;

    let archived_order = if export_history {
        let summary: LogSummary = log::summarize_transactions(&txn, supplier_id).await?;
        Some(order::insert_archival_order(&txn, &existing, summary).await?)
    } else {
        None
    };

    let cleared_transactions = log::clear_transactions(&txn, supplier_id).await?;

    let mut active: supplier::ActiveModel = existing.into();
    active.initial_amount = Set(new_initial_amount);
    active.current_amount = Set(new_current_amount);
    active.updated_at = Set(Utc::now());
    let supplier = active.update(&txn).await?;

    let transactions = open_ledger(
        &txn,
        supplier_id,
        TransactionKind::Initialize,
        new_initial_amount,
        new_current_amount,
        format!(
            "Supplier re-initialized with balance {}",
            money::format_amount(new_initial_amount)
        ),
    )
    .await?;

    txn.commit().await?;
    info!(
        supplier_id,
        cleared_transactions,
        exported = archived_order.is_some(),
        "Re-initialized supplier"
    );

    Ok(Reinitialization {
        supplier,
        archived_order,
        cleared_transactions,
        transactions,
    })
}

/// Applies a signed delta to a supplier's balance and records it, inside the caller's
/// connection or database transaction.
///
/// Use this from composite operations that already hold a transaction; the balance
/// update and the log entry are then committed or rolled back together with the
/// caller's other writes.
pub async fn apply_delta_in<C>(
    db: &C,
    supplier_id: i64,
    delta: Decimal,
    kind: TransactionKind,
    description: String,
) -> Result<LedgerEntry>
where
    C: ConnectionTrait,
{
    let existing = find_for_update(db, supplier_id).await?;
    let new_amount = money::ensure_in_range(existing.current_amount + delta)?;

    let mut active: supplier::ActiveModel = existing.into();
    active.current_amount = Set(new_amount);
    active.updated_at = Set(Utc::now());
    let supplier = active.update(db).await?;

    let transaction = log::append_transaction(db, supplier_id, kind, delta, description).await?;

    Ok(LedgerEntry {
        supplier,
        transaction,
    })
}

/// Applies a signed delta to a supplier's balance and records it atomically.
#[instrument(skip(db))]
pub async fn apply_delta(
    db: &DatabaseConnection,
    supplier_id: i64,
    delta: Decimal,
    kind: TransactionKind,
    description: String,
) -> Result<LedgerEntry> {
    let txn = db.begin().await?;
    let entry = apply_delta_in(&txn, supplier_id, delta, kind, description).await?;
    txn.commit().await?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{report, transaction::get_transactions_for_supplier};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_supplier_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_supplier(&db, "   ".to_string(), dec!(10), dec!(10)).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = create_supplier(&db, "Aroma".to_string(), dec!(-1), dec!(10)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = create_supplier(&db, "Aroma".to_string(), dec!(10), dec!(-0.01)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_supplier_opens_ledger() -> Result<()> {
        let db = setup_test_db().await?;

        let supplier =
            create_supplier(&db, "Aroma".to_string(), dec!(10000.00), dec!(10000.00)).await?;
        assert_eq!(supplier.name, "Aroma");
        assert_eq!(supplier.initial_amount, dec!(10000.00));
        assert_eq!(supplier.current_amount, dec!(10000.00));

        let entries = get_transactions_for_supplier(&db, supplier.id).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind()?, TransactionKind::Initial);
        assert_eq!(entries[0].amount, dec!(10000.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_supplier_with_differing_current_amount() -> Result<()> {
        let db = setup_test_db().await?;

        let supplier = create_supplier(&db, "Tnuva".to_string(), dec!(800), dec!(650.50)).await?;
        let entries = get_transactions_for_supplier(&db, supplier.id).await?;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, dec!(800));
        assert_eq!(entries[1].kind()?, TransactionKind::Adjustment);
        assert_eq!(entries[1].amount, dec!(-149.50));
        assert_consistent(&db, supplier.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_supplier_trims_name() -> Result<()> {
        let db = setup_test_db().await?;
        let supplier = create_supplier(&db, "  Aroma ".to_string(), dec!(1), dec!(1)).await?;
        assert_eq!(supplier.name, "Aroma");
        assert!(get_supplier_by_name(&db, "Aroma").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_supplier(&db, "Aroma".to_string(), dec!(100), dec!(100)).await?;

        let result = create_supplier(&db, "Aroma".to_string(), dec!(5), dec!(5)).await;
        assert!(matches!(result, Err(Error::DuplicateName { ref name }) if name == "Aroma"));

        // Names match exactly, so a different case is a different supplier
        create_supplier(&db, "aroma".to_string(), dec!(5), dec!(5)).await?;

        let unchanged = get_supplier_by_id(&db, first.id).await?.unwrap();
        assert_eq!(unchanged, first);
        assert_eq!(get_transactions_for_supplier(&db, first.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_supplier_records_delta() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;

        let updated = update_supplier(
            &db,
            supplier.id,
            "Renamed".to_string(),
            dec!(2000),
            dec!(1200),
        )
        .await?;
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.initial_amount, dec!(2000));
        assert_eq!(updated.current_amount, dec!(1200));
        assert!(updated.updated_at >= supplier.updated_at);

        let entries = get_transactions_for_supplier(&db, supplier.id).await?;
        let last = entries.last().unwrap();
        assert_eq!(last.kind()?, TransactionKind::Update);
        assert_eq!(last.amount, dec!(-300.00));
        assert_eq!(
            last.description,
            "Supplier updated: balance set from 1500.00 to 1200.00"
        );
        assert_consistent(&db, supplier.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_update_supplier_errors() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;
        create_test_supplier(&db, "Taken").await?;

        let result = update_supplier(&db, 999, "Ghost".to_string(), dec!(1), dec!(1)).await;
        assert!(matches!(result, Err(Error::SupplierNotFound { id: 999 })));

        let result =
            update_supplier(&db, supplier.id, "Taken".to_string(), dec!(1), dec!(1)).await;
        assert!(matches!(result, Err(Error::DuplicateName { .. })));

        let result = update_supplier(&db, supplier.id, String::new(), dec!(1), dec!(1)).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        // Keeping its own name is not a conflict
        update_supplier(
            &db,
            supplier.id,
            supplier.name.clone(),
            dec!(1500),
            dec!(1500),
        )
        .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_supplier_cascades() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;
        let approved = create_test_order(&db, "ORD-1", supplier.id, dec!(100)).await?;
        crate::core::order::approve_order(&db, &approved.order_id, "Dana").await?;
        create_test_order(&db, "ORD-2", supplier.id, dec!(50)).await?;

        let deleted = delete_supplier(&db, supplier.id).await?;
        assert_eq!(deleted.orders_removed, 2);
        assert_eq!(deleted.transactions_removed, 2);

        assert!(get_supplier_by_id(&db, supplier.id).await?.is_none());
        assert!(get_transactions_for_supplier(&db, supplier.id).await?.is_empty());
        assert!(
            crate::core::order::get_order_by_id(&db, "ORD-1")
                .await?
                .is_none()
        );
        assert!(matches!(
            report::get_supplier_balance(&db, supplier.id).await,
            Err(Error::SupplierNotFound { .. })
        ));
        assert!(matches!(
            delete_supplier(&db, supplier.id).await,
            Err(Error::SupplierNotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_reinitialize_without_export() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;
        let order = create_test_order(&db, "ORD-1", supplier.id, dec!(500)).await?;
        crate::core::order::approve_order(&db, &order.order_id, "Dana").await?;

        let result = reinitialize_supplier(&db, supplier.id, dec!(300), dec!(300), false).await?;
        assert!(result.archived_order.is_none());
        assert_eq!(result.cleared_transactions, 2);
        assert_eq!(result.supplier.initial_amount, dec!(300));
        assert_eq!(result.supplier.current_amount, dec!(300));

        let entries = get_transactions_for_supplier(&db, supplier.id).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind()?, TransactionKind::Initialize);
        assert_eq!(entries[0].amount, dec!(300));

        // Business orders survive a re-initialization
        assert!(
            crate::core::order::get_order_by_id(&db, "ORD-1")
                .await?
                .is_some()
        );
        assert_consistent(&db, supplier.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_reinitialize_with_export_archives_history() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;
        let order = create_test_order(&db, "ORD-1", supplier.id, dec!(500)).await?;
        crate::core::order::approve_order(&db, &order.order_id, "Dana").await?;

        let result = reinitialize_supplier(&db, supplier.id, dec!(0), dec!(250), true).await?;

        let archived = result.archived_order.unwrap();
        assert!(archived.order_id.starts_with(&format!("HIST-{}-", supplier.id)));
        assert_eq!(archived.amount, dec!(1000.00));
        assert_eq!(archived.status, "Approved");
        assert_eq!(archived.handler.as_deref(), Some("System"));
        assert_eq!(archived.category.as_deref(), Some("Other"));
        assert!(archived.notes.unwrap().contains("2 transactions"));

        // The archival order does not touch the new balance
        assert_eq!(result.supplier.current_amount, dec!(250));
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[0].kind()?, TransactionKind::Initialize);
        assert_eq!(result.transactions[1].amount, dec!(250));
        assert_consistent(&db, supplier.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_reinitialize_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = reinitialize_supplier(&db, 42, dec!(1), dec!(1), true).await;
        assert!(matches!(result, Err(Error::SupplierNotFound { id: 42 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_updates_balance_and_log() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;

        let entry = apply_delta(
            &db,
            supplier.id,
            dec!(-1600.25),
            TransactionKind::Adjustment,
            "Manual correction".to_string(),
        )
        .await?;
        assert_eq!(entry.supplier.current_amount, dec!(-100.25));
        assert_eq!(entry.transaction.amount, dec!(-1600.25));
        assert_eq!(entry.transaction.kind()?, TransactionKind::Adjustment);
        assert_consistent(&db, supplier.id).await?;

        let missing = apply_delta(
            &db,
            999,
            dec!(1),
            TransactionKind::Adjustment,
            "Nope".to_string(),
        )
        .await;
        assert!(matches!(missing, Err(Error::SupplierNotFound { id: 999 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_rejects_balance_beyond_column_precision() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;

        let result = apply_delta(
            &db,
            supplier.id,
            dec!(99999999),
            TransactionKind::Adjustment,
            "Too much".to_string(),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let reloaded = get_supplier_by_id(&db, supplier.id).await?.unwrap();
        assert_eq!(reloaded.current_amount, dec!(1500));
        assert_consistent(&db, supplier.id).await?;

        let result =
            create_supplier(&db, "Huge".to_string(), dec!(100000000), dec!(0)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_in_rolls_back_with_caller() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;

        let txn = db.begin().await?;
        apply_delta_in(
            &txn,
            supplier.id,
            dec!(-100),
            TransactionKind::Adjustment,
            "Abandoned".to_string(),
        )
        .await?;
        txn.rollback().await?;

        let reloaded = get_supplier_by_id(&db, supplier.id).await?.unwrap();
        assert_eq!(reloaded.current_amount, dec!(1500));
        assert_eq!(get_transactions_for_supplier(&db, supplier.id).await?.len(), 1);

        Ok(())
    }
}
