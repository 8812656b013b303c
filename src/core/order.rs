//! Order workflow - the Pending → Approved | Rejected state machine.
//!
//! Orders are created `Pending` and transition exactly once. Approval debits the
//! supplier through the ledger in the same database transaction as the status change,
//! so an order is never marked approved without its balance effect (or the reverse).
//! Rejection has no balance effect. Re-processing a terminal order is always an error.

use std::fmt;
use std::str::FromStr;

use crate::{
    core::{
        money,
        supplier::{self, LedgerEntry},
        transaction::{LogSummary, TransactionKind},
    },
    entities::{Order, order, supplier as supplier_entity, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Name recorded as handler and orderer on orders the system creates itself.
pub const SYSTEM_HANDLER: &str = "System";

/// Category given to archival orders produced by history export.
pub const ARCHIVE_CATEGORY: &str = "Other";

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Awaiting a decision
    Pending,
    /// Approved and debited (terminal)
    Approved,
    /// Rejected without balance effect (terminal)
    Rejected,
}

impl OrderStatus {
    /// Returns the status as stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Approved and Rejected allow no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            other => Err(Error::invalid_input(format!("Unknown order status: {other}"))),
        }
    }
}

impl order::Model {
    /// Parses the stored status.
    pub fn order_status(&self) -> Result<OrderStatus> {
        self.status.parse()
    }
}

/// Input for [`create_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Caller-chosen unique id, e.g. `ORD-3-1718000000`
    pub order_id: String,
    /// Supplier to debit on approval
    pub supplier_id: i64,
    /// What is being ordered
    pub title: String,
    /// Optional free-form tag
    #[serde(default)]
    pub category: Option<String>,
    /// Positive amount
    #[serde(with = "crate::core::money::serde_amount")]
    pub amount: Decimal,
    /// Business date; defaults to the creation time
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    /// Who placed the order
    pub ordered_by: String,
    /// Optional free text
    #[serde(default)]
    pub notes: Option<String>,
}

/// Everything an approval changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderApproval {
    /// The order, now approved
    pub order: order::Model,
    /// The supplier after the debit
    pub supplier: supplier_entity::Model,
    /// The `order_approved` log entry
    pub transaction: transaction::Model,
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Retrieves a specific order by its ID, None if it does not exist.
pub async fn get_order_by_id<C>(db: &C, order_id: &str) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a supplier's orders, newest first.
pub async fn list_orders_for_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::SupplierId.eq(supplier_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::OrderId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the approval queue: all pending orders, oldest first.
pub async fn list_pending_orders(db: &DatabaseConnection) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .order_by_asc(order::Column::CreatedAt)
        .order_by_asc(order::Column::OrderId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records a new pending order.
///
/// Validation runs before anything touches the store: id, title and `ordered_by`
/// must be non-blank and the amount must be positive. Then the id must be unused and
/// the supplier must exist. The id is stored exactly as given.
#[instrument(skip(db, new_order), fields(order_id = %new_order.order_id))]
pub async fn create_order(db: &DatabaseConnection, new_order: NewOrder) -> Result<order::Model> {
    if new_order.order_id.trim().is_empty() {
        return Err(Error::invalid_input("Order id cannot be empty"));
    }
    let order_id = new_order.order_id.clone();
    let title = required(&new_order.title, "Order title")?;
    let ordered_by = required(&new_order.ordered_by, "Ordered by")?;
    let amount = money::ensure_positive(new_order.amount)?;
    let supplier_id = new_order.supplier_id;

    let txn = db.begin().await?;

    if get_order_by_id(&txn, &order_id).await?.is_some() {
        return Err(Error::DuplicateOrder { order_id });
    }
    if supplier::get_supplier_by_id(&txn, supplier_id)
        .await?
        .is_none()
    {
        return Err(Error::UnknownSupplier { supplier_id });
    }

    let now = Utc::now();
    let created = order::ActiveModel {
        order_id: Set(order_id.clone()),
        supplier_id: Set(supplier_id),
        title: Set(title),
        category: Set(optional(new_order.category)),
        amount: Set(amount),
        order_date: Set(new_order.order_date.unwrap_or(now)),
        ordered_by: Set(ordered_by),
        notes: Set(optional(new_order.notes)),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        handler: Set(None),
        created_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateOrder {
            order_id: order_id.clone(),
        },
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => Error::UnknownSupplier { supplier_id },
        _ => Error::Database(e),
    })?;

    txn.commit().await?;
    info!(supplier_id, amount = %created.amount, "Created order");
    Ok(created)
}

/// Moves a pending order to a terminal status.
///
/// The update is conditional on the row still being `Pending`, so two competing
/// decisions cannot both succeed even without row locks.
async fn transition<C>(
    db: &C,
    order_id: &str,
    target: OrderStatus,
    handler: &str,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let current = Order::find_by_id(order_id.to_string())
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    let status = current.order_status()?;
    if status.is_terminal() {
        warn!(order_id, %status, "Rejected transition of processed order");
        return Err(Error::AlreadyProcessed {
            order_id: order_id.to_string(),
            status,
        });
    }

    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(target.as_str()))
        .col_expr(order::Column::Handler, Expr::value(handler))
        .filter(order::Column::OrderId.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .exec(db)
        .await?;

    let updated = get_order_by_id(db, order_id)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    if result.rows_affected == 0 {
        return Err(Error::AlreadyProcessed {
            order_id: order_id.to_string(),
            status: updated.order_status()?,
        });
    }

    Ok(updated)
}

/// Approves a pending order and debits its supplier by the order amount.
///
/// The status change and the `order_approved` ledger entry commit together.
#[instrument(skip(db))]
pub async fn approve_order(
    db: &DatabaseConnection,
    order_id: &str,
    handler: &str,
) -> Result<OrderApproval> {
    let handler = required(handler, "Handler name")?;

    let txn = db.begin().await?;

    // Supplier before order, the same lock order as supplier deletion
    let supplier_id = get_order_by_id(&txn, order_id)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            order_id: order_id.to_string(),
        })?
        .supplier_id;
    supplier::find_for_update(&txn, supplier_id).await?;

    let order = transition(&txn, order_id, OrderStatus::Approved, &handler).await?;
    let LedgerEntry {
        supplier,
        transaction,
    } = supplier::apply_delta_in(
        &txn,
        order.supplier_id,
        -order.amount,
        TransactionKind::OrderApproved,
        format!("Order {order_id} approved by {handler}"),
    )
    .await?;

    txn.commit().await?;
    info!(
        supplier_id = supplier.id,
        balance = %supplier.current_amount,
        "Approved order"
    );

    Ok(OrderApproval {
        order,
        supplier,
        transaction,
    })
}

/// Rejects a pending order. The supplier balance is not touched.
#[instrument(skip(db))]
pub async fn reject_order(
    db: &DatabaseConnection,
    order_id: &str,
    handler: &str,
) -> Result<order::Model> {
    let handler = required(handler, "Handler name")?;

    let txn = db.begin().await?;
    let order = transition(&txn, order_id, OrderStatus::Rejected, &handler).await?;
    txn.commit().await?;

    info!("Rejected order");
    Ok(order)
}

/// Folds a supplier's log into one approved archival order. Used by
/// re-initialization with history export; has no balance effect.
pub(crate) async fn insert_archival_order<C>(
    db: &C,
    supplier: &supplier_entity::Model,
    summary: LogSummary,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let noun = if summary.count == 1 {
        "transaction"
    } else {
        "transactions"
    };

    let archived = order::ActiveModel {
        order_id: Set(format!("HIST-{}-{}", supplier.id, now.timestamp_micros())),
        supplier_id: Set(supplier.id),
        title: Set(format!("Transaction history for {}", supplier.name)),
        category: Set(Some(ARCHIVE_CATEGORY.to_string())),
        amount: Set(summary.total),
        order_date: Set(now),
        ordered_by: Set(SYSTEM_HANDLER.to_string()),
        notes: Set(Some(format!(
            "Archived {} {noun} totalling {} prior to re-initialization",
            summary.count,
            money::format_amount(summary.total)
        ))),
        status: Set(OrderStatus::Approved.as_str().to_string()),
        handler: Set(Some(SYSTEM_HANDLER.to_string())),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(archived)
}
