//! Reference data repository for charges, taxes, properties and projects.
//!
//! One implementation serves all four tables; the table is chosen from
//! `ReferenceKind` and never from caller-provided text.

use crate::model::reference::{NewReference, ReferenceEntity, ReferenceId, ReferenceKind};
use crate::repo::{
    ensure_connection_ready, insert_or_recover, require_tenancy, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait ReferenceRepository {
    /// Named lookup by natural key within one kind.
    fn find_by_reference(
        &self,
        kind: ReferenceKind,
        reference: &str,
    ) -> RepoResult<Option<ReferenceEntity>>;
    fn get(&self, kind: ReferenceKind, id: ReferenceId) -> RepoResult<Option<ReferenceEntity>>;
    fn find_or_create(&self, draft: &NewReference) -> RepoResult<ReferenceEntity>;
    fn list(&self, kind: ReferenceKind) -> RepoResult<Vec<ReferenceEntity>>;
}

pub struct SqliteReferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferenceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let tables = ReferenceKind::ALL.map(ReferenceKind::table);
        ensure_connection_ready(conn, &tables)?;
        Ok(Self { conn })
    }

    fn select_one(
        &self,
        kind: ReferenceKind,
        column: &'static str,
        value: &dyn rusqlite::ToSql,
    ) -> RepoResult<Option<ReferenceEntity>> {
        let entity = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, reference, name, at_path, version FROM {} WHERE {column} = ?1;",
                    kind.table()
                ),
                params![value],
                |row| parse_reference_row(kind, row),
            )
            .optional()?;
        Ok(entity)
    }
}

impl ReferenceRepository for SqliteReferenceRepository<'_> {
    fn find_by_reference(
        &self,
        kind: ReferenceKind,
        reference: &str,
    ) -> RepoResult<Option<ReferenceEntity>> {
        self.select_one(kind, "reference", &reference)
    }

    fn get(&self, kind: ReferenceKind, id: ReferenceId) -> RepoResult<Option<ReferenceEntity>> {
        self.select_one(kind, "id", &id)
    }

    fn find_or_create(&self, draft: &NewReference) -> RepoResult<ReferenceEntity> {
        draft.validate()?;
        require_tenancy(self.conn, &draft.at_path)?;

        if let Some(existing) = self.find_by_reference(draft.kind, &draft.reference)? {
            debug!(
                "event=find_or_create module=repo status=existing entity={} key={}",
                draft.kind.entity(),
                draft.reference
            );
            return Ok(existing);
        }

        insert_or_recover(
            draft.kind.entity(),
            &draft.reference,
            || {
                self.conn.execute(
                    &format!(
                        "INSERT INTO {} (reference, name, at_path) VALUES (?1, ?2, ?3);",
                        draft.kind.table()
                    ),
                    params![
                        draft.reference.as_str(),
                        draft.name.trim(),
                        draft.at_path.as_str()
                    ],
                )
            },
            || {
                let id = self.conn.last_insert_rowid();
                self.get(draft.kind, id)?
                    .ok_or_else(|| RepoError::not_found(draft.kind.entity(), id))
            },
            || self.find_by_reference(draft.kind, &draft.reference),
        )
    }

    fn list(&self, kind: ReferenceKind) -> RepoResult<Vec<ReferenceEntity>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, reference, name, at_path, version FROM {} ORDER BY reference ASC;",
            kind.table()
        ))?;
        let rows = stmt.query_map([], |row| parse_reference_row(kind, row))?;
        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }
}

fn parse_reference_row(kind: ReferenceKind, row: &Row<'_>) -> rusqlite::Result<ReferenceEntity> {
    Ok(ReferenceEntity {
        id: row.get("id")?,
        kind,
        reference: row.get("reference")?,
        name: row.get("name")?,
        at_path: row.get("at_path")?,
        version: row.get("version")?,
    })
}
