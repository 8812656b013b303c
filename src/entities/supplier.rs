//! Supplier entity - A counterparty with a running balance.
//!
//! `initial_amount` is the starting balance set at creation or re-initialization,
//! `current_amount` is the live balance and may go negative once orders are approved.
//! A supplier exclusively owns its orders and transactions.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supplier database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    /// Server-assigned identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique supplier name (exact, case-sensitive match)
    #[sea_orm(unique)]
    pub name: String,
    /// Starting balance as of the last creation or re-initialization
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(with = "crate::core::money::serde_amount")]
    pub initial_amount: Decimal,
    /// Live balance
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(with = "crate::core::money::serde_amount")]
    pub current_amount: Decimal,
    /// When the supplier was created
    pub created_at: DateTimeUtc,
    /// When the supplier was last mutated
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Supplier and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One supplier has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One supplier has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
