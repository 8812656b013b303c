//! Transaction entity - An append-only log entry of a balance-affecting event.
//!
//! `amount` is always the signed delta applied to the supplier's balance, never an
//! absolute value. `transaction_type` is one of the tags in
//! [`crate::core::transaction::TransactionKind`].
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Auto-incrementing identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the supplier this transaction belongs to
    pub supplier_id: i64,
    /// Event tag: `"initial"`, `"update"`, `"initialize"`, `"order_approved"` or `"adjustment"`
    pub transaction_type: String,
    /// Signed balance delta
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(with = "crate::core::money::serde_amount")]
    pub amount: Decimal,
    /// Human-readable description of the event
    pub description: String,
    /// When the transaction was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one supplier
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "Cascade"
    )]
    Supplier,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
