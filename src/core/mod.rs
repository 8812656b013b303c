/// Shared admin secret check for destructive operations
pub mod admin;
/// Two-decimal monetary amounts
pub mod money;
/// Order lifecycle and approval workflow
pub mod order;
/// Read-only listings, balances, and reconciliation
pub mod report;
/// Supplier ledger with balance-changing operations
pub mod supplier;
/// Append-only transaction log
pub mod transaction;
