//! Database configuration module for the supplier ledger.
//!
//! This module handles connecting to the store (`SQLite` by default, `PostgreSQL` when
//! `DATABASE_URL` points at one) and bringing its schema up to date. The schema is
//! versioned: each numbered step is additive, runs in its own database transaction and
//! records the new version in the `system_state` table, so running [`migrate`] against
//! an up-to-date store is a no-op and an older store is upgraded in place.

use crate::entities::system_state;
use crate::errors::{Error, Result};
use chrono::Utc;
use sea_orm::sea_query::{ColumnDef, ForeignKey, ForeignKeyAction, Index, Table};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DeriveIden,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info, instrument};

/// Default store used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://supplier_ledger.sqlite?mode=rwc";

/// Schema version this build expects.
pub const SCHEMA_VERSION: u32 = 2;

const SCHEMA_VERSION_KEY: &str = "schema_version";

#[derive(DeriveIden)]
enum Suppliers {
    Table,
    Id,
    Name,
    InitialAmount,
    CurrentAmount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    OrderId,
    SupplierId,
    Title,
    Category,
    Amount,
    OrderDate,
    OrderedBy,
    Notes,
    Status,
    Handler,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    SupplierId,
    TransactionType,
    Amount,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SystemState {
    Table,
    Id,
    Key,
    Value,
    UpdatedAt,
}

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the store at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Connects to the store and migrates it to [`SCHEMA_VERSION`].
///
/// The returned connection is the explicit store handle every ledger operation takes;
/// release it with `DatabaseConnection::close` on shutdown.
#[instrument(skip_all)]
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Opening database connection");
    let db = create_connection(database_url).await?;
    migrate(&db).await?;
    info!("Database ready");
    Ok(db)
}

/// Brings the schema up to [`SCHEMA_VERSION`], applying only the missing steps.
///
/// Returns the version the store is at afterwards.
pub async fn migrate(db: &DatabaseConnection) -> Result<u32> {
    create_system_state_table(db).await?;

    let mut version = current_schema_version(db).await?;
    if version > SCHEMA_VERSION {
        return Err(Error::Config {
            message: format!(
                "Database schema version {version} is newer than supported version {SCHEMA_VERSION}"
            ),
        });
    }

    while version < SCHEMA_VERSION {
        let next = version + 1;
        let txn = db.begin().await?;
        apply_step(&txn, next).await?;
        set_schema_version(&txn, next).await?;
        txn.commit().await?;
        info!(version = next, "Applied schema migration");
        version = next;
    }

    Ok(version)
}

/// Reads the recorded schema version; 0 for a fresh store.
pub async fn current_schema_version<C>(db: &C) -> Result<u32>
where
    C: ConnectionTrait,
{
    let state = system_state::Entity::find()
        .filter(system_state::Column::Key.eq(SCHEMA_VERSION_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => s.value.parse().map_err(|e| Error::Config {
            message: format!("Failed to parse schema version {:?}: {e}", s.value),
        }),
        None => Ok(0),
    }
}

async fn set_schema_version<C>(db: &C, version: u32) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let existing = system_state::Entity::find()
        .filter(system_state::Column::Key.eq(SCHEMA_VERSION_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(version.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(SCHEMA_VERSION_KEY.to_string()),
            value: Set(version.to_string()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

async fn create_system_state_table(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let table = Table::create()
        .table(SystemState::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(SystemState::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(SystemState::Key)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(SystemState::Value).string().not_null())
        .col(
            ColumnDef::new(SystemState::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned();

    db.execute(builder.build(&table)).await?;
    Ok(())
}

async fn apply_step<C>(db: &C, version: u32) -> Result<()>
where
    C: ConnectionTrait,
{
    match version {
        1 => create_base_tables(db).await,
        2 => add_order_category(db).await,
        other => Err(Error::Config {
            message: format!("No migration defined for schema version {other}"),
        }),
    }
}

/// v1: suppliers, orders (without category) and transactions.
async fn create_base_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();

    let suppliers = Table::create()
        .table(Suppliers::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Suppliers::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Suppliers::Name)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(
            ColumnDef::new(Suppliers::InitialAmount)
                .decimal_len(10, 2)
                .not_null(),
        )
        .col(
            ColumnDef::new(Suppliers::CurrentAmount)
                .decimal_len(10, 2)
                .not_null(),
        )
        .col(
            ColumnDef::new(Suppliers::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Suppliers::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned();

    let orders = Table::create()
        .table(Orders::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Orders::OrderId)
                .string()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Orders::SupplierId).big_integer().not_null())
        .col(ColumnDef::new(Orders::Title).string().not_null())
        .col(ColumnDef::new(Orders::Amount).decimal_len(10, 2).not_null())
        .col(
            ColumnDef::new(Orders::OrderDate)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new(Orders::OrderedBy).string().not_null())
        .col(ColumnDef::new(Orders::Notes).text().null())
        .col(
            ColumnDef::new(Orders::Status)
                .string_len(20)
                .not_null()
                .default("Pending"),
        )
        .col(ColumnDef::new(Orders::Handler).string().null())
        .col(
            ColumnDef::new(Orders::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk-orders-supplier_id")
                .from(Orders::Table, Orders::SupplierId)
                .to(Suppliers::Table, Suppliers::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned();

    let transactions = Table::create()
        .table(Transactions::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Transactions::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Transactions::SupplierId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(Transactions::TransactionType)
                .string_len(50)
                .not_null(),
        )
        .col(
            ColumnDef::new(Transactions::Amount)
                .decimal_len(10, 2)
                .not_null(),
        )
        .col(ColumnDef::new(Transactions::Description).text().not_null())
        .col(
            ColumnDef::new(Transactions::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk-transactions-supplier_id")
                .from(Transactions::Table, Transactions::SupplierId)
                .to(Suppliers::Table, Suppliers::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned();

    let transactions_by_supplier = Index::create()
        .name("idx-transactions-supplier_id")
        .table(Transactions::Table)
        .col(Transactions::SupplierId)
        .if_not_exists()
        .to_owned();

    let orders_by_supplier = Index::create()
        .name("idx-orders-supplier_id")
        .table(Orders::Table)
        .col(Orders::SupplierId)
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&suppliers)).await?;
    db.execute(builder.build(&orders)).await?;
    db.execute(builder.build(&transactions)).await?;
    db.execute(builder.build(&transactions_by_supplier)).await?;
    db.execute(builder.build(&orders_by_supplier)).await?;

    Ok(())
}

/// v2: orders gain an optional free-form category tag.
async fn add_order_category<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let alter = Table::alter()
        .table(Orders::Table)
        .add_column(ColumnDef::new(Orders::Category).string().null())
        .to_owned();

    db.execute(builder.build(&alter)).await?;
    Ok(())
}
