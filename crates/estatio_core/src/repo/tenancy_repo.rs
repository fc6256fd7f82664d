//! Application tenancy repository.
//!
//! Serves the `path -> ApplicationTenancy` lookup other entities rely on for
//! their `at_path` tag.

use crate::model::tenancy::{ApplicationTenancy, NewTenancy, TenancyId};
use crate::repo::{
    ensure_connection_ready, insert_or_recover, require_tenancy, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TENANCY_SELECT_SQL: &str = "SELECT
    id,
    path,
    name,
    parent_path,
    version
FROM application_tenancies";

pub trait TenancyRepository {
    /// Named lookup by natural key (exact match).
    fn find_by_path(&self, path: &str) -> RepoResult<Option<ApplicationTenancy>>;
    /// Returns the tenancy at `draft.path`, creating it when absent.
    fn find_or_create(&self, draft: &NewTenancy) -> RepoResult<ApplicationTenancy>;
    /// Inserts first and falls back to a lookup on a natural-key conflict.
    fn create_or_find(&self, draft: &NewTenancy) -> RepoResult<ApplicationTenancy>;
    /// Lists all tenancies ordered by path.
    fn list_tenancies(&self) -> RepoResult<Vec<ApplicationTenancy>>;
}

pub struct SqliteTenancyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTenancyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["application_tenancies"])?;
        Ok(Self { conn })
    }

    fn get_by_id(&self, id: TenancyId) -> RepoResult<ApplicationTenancy> {
        self.conn
            .query_row(
                &format!("{TENANCY_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_tenancy_row,
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("tenancy", id))
    }

    fn check_draft(&self, draft: &NewTenancy) -> RepoResult<()> {
        draft.validate()?;
        if let Some(parent_path) = draft.parent_path.as_deref() {
            require_tenancy(self.conn, parent_path)?;
        }
        Ok(())
    }

    fn insert(&self, draft: &NewTenancy) -> RepoResult<ApplicationTenancy> {
        insert_or_recover(
            "tenancy",
            &draft.path,
            || {
                self.conn.execute(
                    "INSERT INTO application_tenancies (path, name, parent_path)
                     VALUES (?1, ?2, ?3);",
                    params![
                        draft.path.as_str(),
                        draft.name.trim(),
                        draft.parent_path.as_deref()
                    ],
                )
            },
            || self.get_by_id(self.conn.last_insert_rowid()),
            || self.find_by_path(&draft.path),
        )
    }
}

impl TenancyRepository for SqliteTenancyRepository<'_> {
    fn find_by_path(&self, path: &str) -> RepoResult<Option<ApplicationTenancy>> {
        let tenancy = self
            .conn
            .query_row(
                &format!("{TENANCY_SELECT_SQL} WHERE path = ?1;"),
                [path],
                parse_tenancy_row,
            )
            .optional()?;
        Ok(tenancy)
    }

    fn find_or_create(&self, draft: &NewTenancy) -> RepoResult<ApplicationTenancy> {
        self.check_draft(draft)?;
        if let Some(existing) = self.find_by_path(&draft.path)? {
            debug!(
                "event=find_or_create module=repo status=existing entity=tenancy key={}",
                draft.path
            );
            return Ok(existing);
        }
        self.insert(draft)
    }

    fn create_or_find(&self, draft: &NewTenancy) -> RepoResult<ApplicationTenancy> {
        self.check_draft(draft)?;
        self.insert(draft)
    }

    fn list_tenancies(&self) -> RepoResult<Vec<ApplicationTenancy>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TENANCY_SELECT_SQL} ORDER BY path ASC;"))?;
        let rows = stmt.query_map([], parse_tenancy_row)?;
        let mut tenancies = Vec::new();
        for row in rows {
            tenancies.push(row?);
        }
        Ok(tenancies)
    }
}

fn parse_tenancy_row(row: &Row<'_>) -> rusqlite::Result<ApplicationTenancy> {
    Ok(ApplicationTenancy {
        id: row.get("id")?,
        path: row.get("path")?,
        name: row.get("name")?,
        parent_path: row.get("parent_path")?,
        version: row.get("version")?,
    })
}
