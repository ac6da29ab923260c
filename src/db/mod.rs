use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait,
};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DatastoreError;

pub mod migrator;
pub mod repositories;

pub use repositories::contact::ContactRepository;
pub use repositories::institute::InstituteRepository;
pub use repositories::project::ProjectRepository;
pub use repositories::request::{RequestRepository, RequestRow};
pub use repositories::ticket::TicketRepository;
pub use repositories::user::{UserRepository, UserSummary};

/// The single datastore connection held for one CLI invocation.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self, DatastoreError> {
        Self::connect(db_url, false).await
    }

    /// Connects and applies migrations. `echo_statements` turns on sqlx
    /// statement logging.
    pub async fn connect(db_url: &str, echo_statements: bool) -> Result<Self, DatastoreError> {
        use sea_orm_migration::MigratorTrait;

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(echo_statements);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!("Database connected & migrations applied");

        Ok(Self { conn })
    }

    /// Starts the unit of work for this invocation.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DatastoreError> {
        Ok(self.conn.begin().await?)
    }
}

/// Commits the unit of work, or rolls it back when `dry_run` is set.
pub async fn finish(txn: DatabaseTransaction, dry_run: bool) -> Result<(), DbErr> {
    if dry_run {
        debug!("Debug mode: rolling back instead of committing");
        txn.rollback().await
    } else {
        debug!("Committing database change");
        txn.commit().await
    }
}

/// RFC 3339 timestamp used for every `*_date` column.
#[must_use]
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
