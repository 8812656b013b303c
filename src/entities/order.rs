//! Order entity - A request to debit a supplier's balance, subject to approval.
//!
//! The `order_id` is supplied by the caller and stored verbatim. `status` holds one of
//! `"Pending"`, `"Approved"` or `"Rejected"`; see [`crate::core::order::OrderStatus`].

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Caller-supplied unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    /// Supplier this order debits
    pub supplier_id: i64,
    /// Short description of what is being ordered
    pub title: String,
    /// Optional free-form tag (e.g. "Drinks", "Tech")
    pub category: Option<String>,
    /// Amount debited on approval, always positive for caller-created orders
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(with = "crate::core::money::serde_amount")]
    pub amount: Decimal,
    /// Business date of the order
    pub order_date: DateTimeUtc,
    /// Who placed the order
    pub ordered_by: String,
    /// Optional free text
    pub notes: Option<String>,
    /// Lifecycle status: `"Pending"`, `"Approved"` or `"Rejected"`
    pub status: String,
    /// Who approved or rejected the order, None while pending
    pub handler: Option<String>,
    /// When the order was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one supplier
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
