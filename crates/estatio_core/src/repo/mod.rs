//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Provide one find-or-create / find-by-natural-key contract per entity.
//! - Isolate SQLite query details from service and fixture orchestration.
//!
//! # Invariants
//! - Write paths validate drafts before issuing SQL.
//! - Referenced rows are checked up front and reported as `NotFound`.
//! - A UNIQUE violation on insert is recovered by re-reading the row that
//!   won; it only surfaces as `UniquenessConflict` when that read misses.
//! - Updates compare-and-bump `version`; a stale version is reported as
//!   `OptimisticLock` and never retried here.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::validation::ValidationError;
use log::{info, warn};
use rusqlite::{Connection, ErrorCode};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod order_item_repo;
pub mod order_repo;
pub mod party_repo;
pub mod reference_repo;
pub mod relationship_repo;
pub mod tenancy_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every entity repository.
#[derive(Debug)]
pub enum RepoError {
    /// Draft failed validation; nothing was written.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// A referenced or targeted row does not exist.
    NotFound { entity: &'static str, key: String },
    /// Update was based on a stale `version`.
    OptimisticLock {
        entity: &'static str,
        id: i64,
        expected_version: i64,
    },
    /// Insert hit a UNIQUE constraint and the conflicting row could not be re-read.
    UniquenessConflict { entity: &'static str, key: String },
    /// Persisted data cannot be converted to the domain model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::OptimisticLock {
                entity,
                id,
                expected_version,
            } => write!(
                f,
                "{entity} {id} was modified concurrently (expected version {expected_version})"
            ),
            Self::UniquenessConflict { entity, key } => {
                write!(f, "{entity} with key `{key}` already exists")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that have not been migrated or lack `tables`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Returns whether a row with `id` exists in `table`.
///
/// `table` must be a compile-time table name, never user input.
pub(crate) fn row_exists(conn: &Connection, table: &'static str, id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn require_row(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
) -> RepoResult<()> {
    if row_exists(conn, table, id)? {
        return Ok(());
    }
    Err(RepoError::not_found(entity, id))
}

pub(crate) fn require_tenancy(conn: &Connection, at_path: &str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM application_tenancies WHERE path = ?1);",
        [at_path],
        |row| row.get(0),
    )?;
    if exists == 1 {
        return Ok(());
    }
    Err(RepoError::not_found("tenancy", at_path))
}

/// Returns whether an insert failed on a UNIQUE (or primary key) constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Runs the insert half of find-or-create.
///
/// On success the fresh row is loaded back through `load_inserted`. When the
/// insert loses a race on the natural key, the winner is read through
/// `lookup` instead of surfacing the constraint error.
pub(crate) fn insert_or_recover<T>(
    entity: &'static str,
    key: &str,
    insert: impl FnOnce() -> rusqlite::Result<usize>,
    load_inserted: impl FnOnce() -> RepoResult<T>,
    lookup: impl FnOnce() -> RepoResult<Option<T>>,
) -> RepoResult<T> {
    match insert() {
        Ok(_) => {
            let created = load_inserted()?;
            info!("event=find_or_create module=repo status=created entity={entity} key={key}");
            Ok(created)
        }
        Err(err) if is_unique_violation(&err) => {
            warn!(
                "event=find_or_create module=repo status=conflict_recovered entity={entity} key={key}"
            );
            lookup()?.ok_or_else(|| RepoError::UniquenessConflict {
                entity,
                key: key.to_string(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolves a zero-row versioned update into `NotFound` or `OptimisticLock`.
pub(crate) fn stale_update_error(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
    expected_version: i64,
) -> RepoError {
    match row_exists(conn, table, id) {
        Ok(true) => RepoError::OptimisticLock {
            entity,
            id,
            expected_version,
        },
        Ok(false) => RepoError::not_found(entity, id),
        Err(err) => err,
    }
}

pub(crate) fn decimal_to_db(value: Option<Decimal>) -> Option<String> {
    value.map(|amount| amount.to_string())
}

pub(crate) fn parse_decimal(column: &str, value: Option<String>) -> RepoResult<Option<Decimal>> {
    value
        .map(|text| {
            Decimal::from_str(&text).map_err(|_| {
                RepoError::InvalidData(format!("invalid decimal `{text}` in {column}"))
            })
        })
        .transpose()
}
