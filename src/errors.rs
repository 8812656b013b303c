//! Unified error types for the supplier ledger.
//!
//! Every operation returns [`Result`]. Callers that need to report a failure over
//! the wire use [`Error::kind`] or convert into an [`ErrorResponse`].

use rust_decimal::Decimal;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::order::OrderStatus;

/// All failures the ledger can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing, blank or out of range
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// A monetary amount failed validation
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// No supplier with this id exists
    #[error("Supplier not found: {id}")]
    SupplierNotFound {
        /// The requested supplier id
        id: i64,
    },

    /// No order with this id exists
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The requested order id
        order_id: String,
    },

    /// Another supplier already uses this exact name
    #[error("Supplier name already exists: {name}")]
    DuplicateName {
        /// The conflicting name
        name: String,
    },

    /// An order with this id already exists
    #[error("Order already exists: {order_id}")]
    DuplicateOrder {
        /// The conflicting order id
        order_id: String,
    },

    /// An order referenced a supplier that does not exist
    #[error("Cannot create order: supplier {supplier_id} does not exist")]
    UnknownSupplier {
        /// The dangling supplier id
        supplier_id: i64,
    },

    /// Approve or reject was attempted on an order that is no longer pending
    #[error("Order {order_id} has already been processed (status: {status})")]
    AlreadyProcessed {
        /// The order that was targeted
        order_id: String,
        /// Its current terminal status
        status: OrderStatus,
    },

    /// The underlying store failed
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// The admin secret did not match
    #[error("Invalid admin password")]
    Unauthorized,
}

/// Coarse classification of an [`Error`], stable enough to map onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed, missing or out-of-range field
    InvalidInput,
    /// Referenced supplier or order is absent
    NotFound,
    /// Supplier name uniqueness violation
    DuplicateName,
    /// Order id uniqueness violation
    Duplicate,
    /// Order references a missing supplier
    SupplierNotFound,
    /// State transition on a terminal order
    AlreadyProcessed,
    /// Persistence layer failure
    StorageFailure,
    /// Missing or malformed configuration
    Configuration,
    /// Admin gate rejected the secret
    Unauthorized,
}

impl Error {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } | Self::InvalidAmount { .. } => ErrorKind::InvalidInput,
            Self::SupplierNotFound { .. } | Self::OrderNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::DuplicateOrder { .. } => ErrorKind::Duplicate,
            Self::UnknownSupplier { .. } => ErrorKind::SupplierNotFound,
            Self::AlreadyProcessed { .. } => ErrorKind::AlreadyProcessed,
            Self::Database(_) => ErrorKind::StorageFailure,
            Self::Config { .. } => ErrorKind::Configuration,
            Self::Unauthorized => ErrorKind::Unauthorized,
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Structured failure payload handed to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
