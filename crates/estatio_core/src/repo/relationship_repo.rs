//! Party relationship repository.
//!
//! # Invariants
//! - `(kind, from_party_id, to_party_id)` is unique.
//! - Both parties must exist before a relationship is written.

use crate::model::party::PartyId;
use crate::model::relationship::{
    NewRelationship, PartyRelationship, RelationshipId, RelationshipType,
};
use crate::model::validation::check_date_range;
use crate::repo::{
    ensure_connection_ready, insert_or_recover, require_row, stale_update_error, RepoError,
    RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, Row};

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    id,
    kind,
    from_party_id,
    to_party_id,
    description,
    start_date,
    end_date,
    version
FROM party_relationships";

pub trait RelationshipRepository {
    fn find(
        &self,
        kind: RelationshipType,
        from_party_id: PartyId,
        to_party_id: PartyId,
    ) -> RepoResult<Option<PartyRelationship>>;
    /// Returns the relationship for the draft's natural key, creating it when absent.
    fn find_or_create(&self, draft: &NewRelationship) -> RepoResult<PartyRelationship>;
    /// Relationships where the party is on either side, oldest first.
    fn list_for_party(&self, party_id: PartyId) -> RepoResult<Vec<PartyRelationship>>;
    /// Writes description and validity window back and bumps `version`.
    fn update_relationship(&self, relationship: &mut PartyRelationship) -> RepoResult<()>;
}

pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["parties", "party_relationships"])?;
        Ok(Self { conn })
    }

    fn query_relationships(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<PartyRelationship>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }
        Ok(relationships)
    }

    fn get_by_id(&self, id: RelationshipId) -> RepoResult<PartyRelationship> {
        self.query_relationships(&format!("{RELATIONSHIP_SELECT_SQL} WHERE id = ?1;"), [id])?
            .pop()
            .ok_or_else(|| RepoError::not_found("relationship", id))
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn find(
        &self,
        kind: RelationshipType,
        from_party_id: PartyId,
        to_party_id: PartyId,
    ) -> RepoResult<Option<PartyRelationship>> {
        let mut found = self.query_relationships(
            &format!(
                "{RELATIONSHIP_SELECT_SQL}
                 WHERE kind = ?1 AND from_party_id = ?2 AND to_party_id = ?3;"
            ),
            params![relationship_type_to_db(kind), from_party_id, to_party_id],
        )?;
        Ok(found.pop())
    }

    fn find_or_create(&self, draft: &NewRelationship) -> RepoResult<PartyRelationship> {
        draft.validate()?;
        require_row(self.conn, "parties", "party", draft.from_party_id)?;
        require_row(self.conn, "parties", "party", draft.to_party_id)?;

        if let Some(existing) = self.find(draft.kind, draft.from_party_id, draft.to_party_id)? {
            debug!(
                "event=find_or_create module=repo status=existing entity=relationship id={}",
                existing.id
            );
            return Ok(existing);
        }

        let key = format!(
            "{}:{}->{}",
            relationship_type_to_db(draft.kind),
            draft.from_party_id,
            draft.to_party_id
        );
        insert_or_recover(
            "relationship",
            &key,
            || {
                self.conn.execute(
                    "INSERT INTO party_relationships (
                        kind,
                        from_party_id,
                        to_party_id,
                        description,
                        start_date,
                        end_date
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![
                        relationship_type_to_db(draft.kind),
                        draft.from_party_id,
                        draft.to_party_id,
                        draft.description.as_deref(),
                        draft.start_date,
                        draft.end_date,
                    ],
                )
            },
            || self.get_by_id(self.conn.last_insert_rowid()),
            || self.find(draft.kind, draft.from_party_id, draft.to_party_id),
        )
    }

    fn list_for_party(&self, party_id: PartyId) -> RepoResult<Vec<PartyRelationship>> {
        self.query_relationships(
            &format!(
                "{RELATIONSHIP_SELECT_SQL}
                 WHERE from_party_id = ?1 OR to_party_id = ?1
                 ORDER BY id ASC;"
            ),
            [party_id],
        )
    }

    fn update_relationship(&self, relationship: &mut PartyRelationship) -> RepoResult<()> {
        check_date_range(relationship.start_date, relationship.end_date)?;
        let changed = self.conn.execute(
            "UPDATE party_relationships
             SET
                description = ?1,
                start_date = ?2,
                end_date = ?3,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4
               AND version = ?5;",
            params![
                relationship.description.as_deref(),
                relationship.start_date,
                relationship.end_date,
                relationship.id,
                relationship.version,
            ],
        )?;
        if changed == 0 {
            return Err(stale_update_error(
                self.conn,
                "party_relationships",
                "relationship",
                relationship.id,
                relationship.version,
            ));
        }
        relationship.version += 1;
        Ok(())
    }
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<PartyRelationship> {
    let kind_text: String = row.get("kind")?;
    let kind = parse_relationship_type(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid relationship kind `{kind_text}` in party_relationships.kind"
        ))
    })?;
    Ok(PartyRelationship {
        id: row.get("id")?,
        kind,
        from_party_id: row.get("from_party_id")?,
        to_party_id: row.get("to_party_id")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        version: row.get("version")?,
    })
}

fn relationship_type_to_db(kind: RelationshipType) -> &'static str {
    match kind {
        RelationshipType::Contact => "contact",
        RelationshipType::Employment => "employment",
        RelationshipType::Family => "family",
    }
}

fn parse_relationship_type(value: &str) -> Option<RelationshipType> {
    match value {
        "contact" => Some(RelationshipType::Contact),
        "employment" => Some(RelationshipType::Employment),
        "family" => Some(RelationshipType::Family),
        _ => None,
    }
}
