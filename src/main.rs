use dotenvy::dotenv;
use supplier_ledger::{
    config::{database, environment::AppConfig, suppliers},
    core::report,
    errors::Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = AppConfig::from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    if app_config.admin_password.is_none() {
        warn!("ADMIN_PASSWORD is not set; admin operations will be refused");
    }

    // 4. Connect and migrate
    let db = database::init_database(&app_config.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed suppliers from the seed file, if present
    if app_config.seed_file.exists() {
        let seed = suppliers::load_seed_config(&app_config.seed_file)?;
        suppliers::seed_suppliers(&db, &seed)
            .await
            .inspect_err(|e| error!("Failed to seed suppliers: {}", e))?;
    } else {
        info!(path = ?app_config.seed_file, "No seed file found, skipping seeding");
    }

    // 6. Report the state of the ledger and check every balance against its log
    let summary = report::ledger_summary(&db).await?;
    info!(
        suppliers = summary.supplier_count,
        total_balance = %summary.total_balance,
        pending_orders = summary.pending_orders,
        "Ledger ready"
    );

    for supplier in report::list_suppliers(&db).await? {
        let check = report::reconcile_supplier(&db, supplier.id).await?;
        if !check.is_consistent() {
            warn!(
                supplier = %supplier.name,
                current = %check.current_amount,
                log_total = %check.transaction_total,
                drift = %check.drift,
                "Balance does not match transaction log"
            );
        }
    }

    db.close().await?;
    Ok(())
}
