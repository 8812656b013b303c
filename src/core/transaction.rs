//! Transaction log - the append-only record of balance-affecting events.
//!
//! Entries are only ever appended alongside a balance change made by the supplier
//! ledger, which is why the append and clear helpers are crate-private. Every entry
//! stores the signed delta it applied, so a supplier's balance can be rebuilt by
//! summing its log since the last re-initialization.

use std::fmt;
use std::str::FromStr;

use crate::{
    core::money,
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tag describing why a transaction was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Opening balance of a newly created supplier
    Initial,
    /// Administrative edit of a supplier
    Update,
    /// Opening balance after a re-initialization
    Initialize,
    /// Debit caused by an approved order
    OrderApproved,
    /// Correction that brings the balance to an explicitly requested value
    Adjustment,
}

impl TransactionKind {
    /// Returns the tag as stored in the `transaction_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Update => "update",
            Self::Initialize => "initialize",
            Self::OrderApproved => "order_approved",
            Self::Adjustment => "adjustment",
        }
    }

    /// Whether this entry opens a ledger, i.e. carries the starting balance.
    #[must_use]
    pub const fn is_opening(self) -> bool {
        matches!(self, Self::Initial | Self::Initialize)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initial" => Ok(Self::Initial),
            "update" => Ok(Self::Update),
            "initialize" => Ok(Self::Initialize),
            "order_approved" => Ok(Self::OrderApproved),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(Error::invalid_input(format!(
                "Unknown transaction type: {other}"
            ))),
        }
    }
}

impl transaction::Model {
    /// Parses the stored `transaction_type` tag.
    pub fn kind(&self) -> Result<TransactionKind> {
        self.transaction_type.parse()
    }
}

/// Count and signed total of a supplier's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSummary {
    /// Number of entries
    pub count: usize,
    /// Sum of all entry amounts
    pub total: Decimal,
}

/// Appends one entry to a supplier's log.
///
/// Callers must apply the same `amount` to the supplier balance within the same
/// database transaction.
pub(crate) async fn append_transaction<C>(
    db: &C,
    supplier_id: i64,
    kind: TransactionKind,
    amount: Decimal,
    description: String,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let entry = transaction::ActiveModel {
        supplier_id: Set(supplier_id),
        transaction_type: Set(kind.as_str().to_string()),
        amount: Set(money::normalize(amount)),
        description: Set(description),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let inserted = entry.insert(db).await?;
    debug!(
        supplier_id,
        transaction_id = inserted.id,
        kind = %kind,
        amount = %inserted.amount,
        "Appended transaction"
    );
    Ok(inserted)
}

/// Removes every log entry of a supplier. Used by re-initialization only.
pub(crate) async fn clear_transactions<C>(db: &C, supplier_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Transaction::delete_many()
        .filter(transaction::Column::SupplierId.eq(supplier_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Retrieves all transactions of a supplier in chronological order (oldest first).
pub async fn get_transactions_for_supplier<C>(
    db: &C,
    supplier_id: i64,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::SupplierId.eq(supplier_id))
        .order_by_asc(transaction::Column::CreatedAt)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific transaction by its ID, None if it does not exist.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Counts and sums a supplier's log.
///
/// The sum is computed with `Decimal` arithmetic rather than an SQL aggregate so the
/// result does not depend on the backend's numeric type.
pub async fn summarize_transactions<C>(db: &C, supplier_id: i64) -> Result<LogSummary>
where
    C: ConnectionTrait,
{
    let entries = get_transactions_for_supplier(db, supplier_id).await?;
    let total = entries.iter().map(|entry| entry.amount).sum::<Decimal>();
    Ok(LogSummary {
        count: entries.len(),
        total: money::normalize(total),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in [
            TransactionKind::Initial,
            TransactionKind::Update,
            TransactionKind::Initialize,
            TransactionKind::OrderApproved,
            TransactionKind::Adjustment,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!(matches!(
            "refund".parse::<TransactionKind>(),
            Err(Error::InvalidInput { .. })
        ));
        assert!(TransactionKind::Initialize.is_opening());
        assert!(!TransactionKind::OrderApproved.is_opening());
    }

    #[tokio::test]
    async fn test_get_transaction_by_id_not_found() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<transaction::Model>::new()])
            .into_connection();

        let entry = get_transaction_by_id(&db, 999).await?;
        assert!(entry.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_transactions_are_chronological() -> Result<()> {
        let (db, supplier) = setup_with_supplier().await?;
        let order = create_test_order(&db, "ORD-1", supplier.id, dec!(100.00)).await?;
        crate::core::order::approve_order(&db, &order.order_id, "Dana").await?;

        let entries = get_transactions_for_supplier(&db, supplier.id).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind()?, TransactionKind::Initial);
        assert_eq!(entries[1].kind()?, TransactionKind::OrderApproved);
        assert!(entries[0].created_at <= entries[1].created_at);

        Ok(())
    }

    #[tokio::test]
    async fn test_transactions_are_scoped_to_supplier() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_supplier(&db, "First").await?;
        let second = create_test_supplier(&db, "Second").await?;

        let found = get_transaction_by_id(&db, 1).await?.unwrap();
        assert_eq!(found.supplier_id, first.id);

        let summary = summarize_transactions(&db, second.id).await?;
        assert_eq!(summary.count, 1);
        assert_eq!(summary.total, second.current_amount);

        assert!(get_transactions_for_supplier(&db, 999).await?.is_empty());

        Ok(())
    }
}
