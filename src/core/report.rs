//! Read-only views over the ledger.
//!
//! Nothing here mutates the store; the only failures are storage errors and, for
//! per-supplier views, a missing supplier.

use crate::{
    core::{
        money,
        order::OrderStatus,
        transaction::{self as log, LogSummary},
    },
    entities::{Order, Supplier, order, supplier, transaction},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, QueryOrder, prelude::*};
use serde::Serialize;

/// A supplier's balance together with its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierBalance {
    /// The supplier, including its current balance
    pub supplier: supplier::Model,
    /// Its transactions since the last re-initialization, oldest first
    pub transactions: Vec<transaction::Model>,
}

/// Comparison of a supplier's stored balance with the sum of its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// The supplier checked
    pub supplier_id: i64,
    /// Stored balance
    #[serde(with = "crate::core::money::serde_amount")]
    pub current_amount: Decimal,
    /// Sum of all log entries
    #[serde(with = "crate::core::money::serde_amount")]
    pub transaction_total: Decimal,
    /// Number of log entries
    pub transaction_count: usize,
    /// `current_amount - transaction_total`; zero for a consistent ledger
    #[serde(with = "crate::core::money::serde_amount")]
    pub drift: Decimal,
}

impl Reconciliation {
    /// True when the stored balance matches the log.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// Store-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    /// Number of suppliers
    pub supplier_count: u64,
    /// Sum of all current balances
    #[serde(with = "crate::core::money::serde_amount")]
    pub total_balance: Decimal,
    /// Orders awaiting a decision
    pub pending_orders: u64,
}

/// Lists all suppliers, ordered by name.
pub async fn list_suppliers(db: &DatabaseConnection) -> Result<Vec<supplier::Model>> {
    Supplier::find()
        .order_by_asc(supplier::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists all orders, most recently created first.
pub async fn list_orders(db: &DatabaseConnection) -> Result<Vec<order::Model>> {
    Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::OrderId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns a supplier's current balance and its chronological history.
pub async fn get_supplier_balance(
    db: &DatabaseConnection,
    supplier_id: i64,
) -> Result<SupplierBalance> {
    let supplier = Supplier::find_by_id(supplier_id)
        .one(db)
        .await?
        .ok_or(Error::SupplierNotFound { id: supplier_id })?;
    let transactions = log::get_transactions_for_supplier(db, supplier_id).await?;

    Ok(SupplierBalance {
        supplier,
        transactions,
    })
}

/// Rebuilds a supplier's balance from its log and reports any drift.
pub async fn reconcile_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
) -> Result<Reconciliation> {
    let supplier = Supplier::find_by_id(supplier_id)
        .one(db)
        .await?
        .ok_or(Error::SupplierNotFound { id: supplier_id })?;
    let LogSummary { count, total } = log::summarize_transactions(db, supplier_id).await?;

    Ok(Reconciliation {
        supplier_id,
        current_amount: supplier.current_amount,
        transaction_total: total,
        transaction_count: count,
        drift: money::normalize(supplier.current_amount - total),
    })
}

/// Counts suppliers and pending orders and totals all balances.
pub async fn ledger_summary(db: &DatabaseConnection) -> Result<LedgerSummary> {
    let suppliers = list_suppliers(db).await?;
    let pending_orders = Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .count(db)
        .await?;

    Ok(LedgerSummary {
        supplier_count: suppliers.len() as u64,
        total_balance: money::normalize(suppliers.iter().map(|s| s.current_amount).sum()),
        pending_orders,
    })
}

/// Formats a balance view as a plain-text statement, one transaction per line.
#[must_use]
pub fn format_balance_statement(balance: &SupplierBalance) -> String {
    use std::fmt::Write;

    let mut statement = format!(
        "{} - balance {} (initial {})\n",
        balance.supplier.name,
        money::format_amount(balance.supplier.current_amount),
        money::format_amount(balance.supplier.initial_amount)
    );

    for entry in &balance.transactions {
        // write! into a String cannot fail
        let _ = writeln!(
            statement,
            "  {} | {:<14} | {:>12} | {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.transaction_type,
            money::format_amount(entry.amount),
            entry.description
        );
    }

    statement
}
