//! Domain error types for account administration.

use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

use crate::services::provisioning::ProvisionError;
use crate::validation::ValidationError;

/// MySQL `ER_ACCESS_DENIED_ERROR`.
const MYSQL_ACCESS_DENIED: u16 = 1045;
/// MySQL `ER_BAD_DB_ERROR`.
const MYSQL_BAD_DB: u16 = 1049;
/// SQLite `SQLITE_CANTOPEN`.
const SQLITE_CANTOPEN: &str = "14";

/// Failures talking to the account database.
#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("Access denied: something is wrong with your database user name or password")]
    AccessDenied(#[source] DbErr),

    #[error("Database does not exist")]
    MissingDatabase(#[source] DbErr),

    #[error("Database error: {0}")]
    Other(#[source] DbErr),
}

impl DatastoreError {
    #[must_use]
    pub fn classify(err: DbErr) -> Self {
        if is_db_code(&err, MYSQL_ACCESS_DENIED) {
            Self::AccessDenied(err)
        } else if is_db_code(&err, MYSQL_BAD_DB) || is_sqlite_cantopen(&err) {
            Self::MissingDatabase(err)
        } else {
            Self::Other(err)
        }
    }
}

fn database_error(err: &DbErr) -> Option<&(dyn sea_orm::sqlx::error::DatabaseError + 'static)> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => e.as_database_error(),
        _ => None,
    }
}

fn is_db_code(err: &DbErr, number: u16) -> bool {
    database_error(err)
        .and_then(|e| e.try_downcast_ref::<sea_orm::sqlx::mysql::MySqlDatabaseError>())
        .is_some_and(|e| e.number() == number)
}

fn is_sqlite_cantopen(err: &DbErr) -> bool {
    database_error(err)
        .and_then(|e| e.code())
        .is_some_and(|code| code == SQLITE_CANTOPEN)
}

impl From<DbErr> for DatastoreError {
    fn from(err: DbErr) -> Self {
        Self::classify(err)
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Username {0} is already in use")]
    DuplicateConflict(String),

    #[error("Account provisioning failed: {0}")]
    Provisioning(#[from] ProvisionError),

    #[error(transparent)]
    Datastore(#[from] DatastoreError),

    #[error("No mmm usernames left after {0}")]
    UsernamesExhausted(String),
}

impl From<DbErr> for AccountError {
    fn from(err: DbErr) -> Self {
        Self::Datastore(DatastoreError::classify(err))
    }
}

impl AccountError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id}"))
    }
}
