//! Party repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Find-or-create organisations and persons by reference.
//! - Own the communication channels attached to a party.
//!
//! # Invariants
//! - `reference` is unique; re-creating an existing reference returns the
//!   stored party untouched.
//! - Person names are derived from name parts on every write.

use crate::model::party::{
    CommunicationChannel, CommunicationChannelKind, NewCommunicationChannel, NewParty, Party,
    PartyId, PartyKind, PersonGender,
};
use crate::model::tenancy::is_visible_from;
use crate::repo::{
    ensure_connection_ready, insert_or_recover, require_row, require_tenancy,
    stale_update_error, RepoError, RepoResult,
};
use log::{debug, info};
use rusqlite::{params, Connection, Row};

const PARTY_SELECT_SQL: &str = "SELECT
    id,
    reference,
    kind,
    name,
    at_path,
    initials,
    first_name,
    last_name,
    gender,
    version
FROM parties";

const CHANNEL_SELECT_SQL: &str = "SELECT
    id,
    party_id,
    kind,
    value,
    version
FROM communication_channels";

/// Query options for listing parties.
#[derive(Debug, Clone, Default)]
pub struct PartyListQuery {
    pub kind: Option<PartyKind>,
    /// Only parties visible from this tenancy path.
    pub visible_from: Option<String>,
}

pub trait PartyRepository {
    /// Named lookup by natural key (exact, case-sensitive).
    fn find_by_reference(&self, reference: &str) -> RepoResult<Option<Party>>;
    fn get_party(&self, id: PartyId) -> RepoResult<Option<Party>>;
    /// Returns the party with `draft.reference`, creating it when absent.
    fn find_or_create(&self, draft: &NewParty) -> RepoResult<Party>;
    /// Inserts first and falls back to a lookup on a natural-key conflict.
    fn create_or_find(&self, draft: &NewParty) -> RepoResult<Party>;
    /// Writes mutable attributes back and bumps `party.version`.
    fn update_party(&self, party: &mut Party) -> RepoResult<()>;
    fn list_parties(&self, query: &PartyListQuery) -> RepoResult<Vec<Party>>;
    /// Returns the matching channel, creating it when absent.
    fn find_or_create_channel(
        &self,
        draft: &NewCommunicationChannel,
    ) -> RepoResult<CommunicationChannel>;
    fn list_channels(&self, party_id: PartyId) -> RepoResult<Vec<CommunicationChannel>>;
}

pub struct SqlitePartyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePartyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["parties", "communication_channels"])?;
        Ok(Self { conn })
    }

    fn query_parties(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Party>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut parties = Vec::new();
        while let Some(row) = rows.next()? {
            parties.push(parse_party_row(row)?);
        }
        Ok(parties)
    }

    fn check_draft(&self, draft: &NewParty) -> RepoResult<()> {
        draft.validate()?;
        require_tenancy(self.conn, &draft.at_path)
    }

    fn insert(&self, draft: &NewParty) -> RepoResult<Party> {
        insert_or_recover(
            "party",
            &draft.reference,
            || {
                self.conn.execute(
                    "INSERT INTO parties (
                        reference,
                        kind,
                        name,
                        at_path,
                        initials,
                        first_name,
                        last_name,
                        gender
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                    params![
                        draft.reference.as_str(),
                        party_kind_to_db(draft.kind),
                        draft.display_name(),
                        draft.at_path.as_str(),
                        draft.initials.as_deref(),
                        draft.first_name.as_deref(),
                        draft.last_name.as_deref(),
                        draft.gender.map(gender_to_db),
                    ],
                )
            },
            || {
                let id = self.conn.last_insert_rowid();
                self.get_party(id)?
                    .ok_or_else(|| RepoError::not_found("party", id))
            },
            || self.find_by_reference(&draft.reference),
        )
    }
}

impl PartyRepository for SqlitePartyRepository<'_> {
    fn find_by_reference(&self, reference: &str) -> RepoResult<Option<Party>> {
        let mut parties = self.query_parties(
            &format!("{PARTY_SELECT_SQL} WHERE reference = ?1;"),
            [reference],
        )?;
        Ok(parties.pop())
    }

    fn get_party(&self, id: PartyId) -> RepoResult<Option<Party>> {
        let mut parties =
            self.query_parties(&format!("{PARTY_SELECT_SQL} WHERE id = ?1;"), [id])?;
        Ok(parties.pop())
    }

    fn find_or_create(&self, draft: &NewParty) -> RepoResult<Party> {
        self.check_draft(draft)?;
        if let Some(existing) = self.find_by_reference(&draft.reference)? {
            debug!(
                "event=find_or_create module=repo status=existing entity=party key={}",
                draft.reference
            );
            return Ok(existing);
        }
        self.insert(draft)
    }

    fn create_or_find(&self, draft: &NewParty) -> RepoResult<Party> {
        self.check_draft(draft)?;
        self.insert(draft)
    }

    fn update_party(&self, party: &mut Party) -> RepoResult<()> {
        let draft = as_draft(party);
        self.check_draft(&draft)?;
        let name = draft.display_name();

        let changed = self.conn.execute(
            "UPDATE parties
             SET
                name = ?1,
                at_path = ?2,
                initials = ?3,
                first_name = ?4,
                last_name = ?5,
                gender = ?6,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7
               AND version = ?8;",
            params![
                name.as_str(),
                party.at_path.as_str(),
                party.initials.as_deref(),
                party.first_name.as_deref(),
                party.last_name.as_deref(),
                party.gender.map(gender_to_db),
                party.id,
                party.version,
            ],
        )?;

        if changed == 0 {
            return Err(stale_update_error(
                self.conn,
                "parties",
                "party",
                party.id,
                party.version,
            ));
        }

        party.name = name;
        party.version += 1;
        info!(
            "event=party_update module=repo status=ok id={} version={}",
            party.id, party.version
        );
        Ok(())
    }

    fn list_parties(&self, query: &PartyListQuery) -> RepoResult<Vec<Party>> {
        let mut parties = match query.kind {
            Some(kind) => self.query_parties(
                &format!("{PARTY_SELECT_SQL} WHERE kind = ?1 ORDER BY reference ASC;"),
                [party_kind_to_db(kind)],
            )?,
            None => self.query_parties(
                &format!("{PARTY_SELECT_SQL} ORDER BY reference ASC;"),
                params![],
            )?,
        };
        if let Some(viewer_path) = query.visible_from.as_deref() {
            parties.retain(|party| is_visible_from(viewer_path, &party.at_path));
        }
        Ok(parties)
    }

    fn find_or_create_channel(
        &self,
        draft: &NewCommunicationChannel,
    ) -> RepoResult<CommunicationChannel> {
        draft.validate()?;
        require_row(self.conn, "parties", "party", draft.party_id)?;

        let key = format!("{}:{}", draft.party_id, draft.value);
        let lookup = || -> RepoResult<Option<CommunicationChannel>> {
            let mut channels = self.query_channels(
                &format!("{CHANNEL_SELECT_SQL} WHERE party_id = ?1 AND kind = ?2 AND value = ?3;"),
                params![draft.party_id, channel_kind_to_db(draft.kind), draft.value.as_str()],
            )?;
            Ok(channels.pop())
        };

        if let Some(existing) = lookup()? {
            return Ok(existing);
        }

        insert_or_recover(
            "communication_channel",
            &key,
            || {
                self.conn.execute(
                    "INSERT INTO communication_channels (party_id, kind, value)
                     VALUES (?1, ?2, ?3);",
                    params![draft.party_id, channel_kind_to_db(draft.kind), draft.value.as_str()],
                )
            },
            || {
                let id = self.conn.last_insert_rowid();
                let mut channels = self
                    .query_channels(&format!("{CHANNEL_SELECT_SQL} WHERE id = ?1;"), [id])?;
                channels
                    .pop()
                    .ok_or_else(|| RepoError::not_found("communication_channel", id))
            },
            lookup,
        )
    }

    fn list_channels(&self, party_id: PartyId) -> RepoResult<Vec<CommunicationChannel>> {
        self.query_channels(
            &format!("{CHANNEL_SELECT_SQL} WHERE party_id = ?1 ORDER BY kind ASC, value ASC;"),
            [party_id],
        )
    }
}

impl SqlitePartyRepository<'_> {
    fn query_channels(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<CommunicationChannel>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut channels = Vec::new();
        while let Some(row) = rows.next()? {
            let kind_text: String = row.get("kind")?;
            let kind = parse_channel_kind(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid channel kind `{kind_text}` in communication_channels.kind"
                ))
            })?;
            channels.push(CommunicationChannel {
                id: row.get("id")?,
                party_id: row.get("party_id")?,
                kind,
                value: row.get("value")?,
                version: row.get("version")?,
            });
        }
        Ok(channels)
    }
}

fn as_draft(party: &Party) -> NewParty {
    NewParty {
        reference: party.reference.clone(),
        kind: party.kind,
        name: party.name.clone(),
        at_path: party.at_path.clone(),
        initials: party.initials.clone(),
        first_name: party.first_name.clone(),
        last_name: party.last_name.clone(),
        gender: party.gender,
    }
}

fn parse_party_row(row: &Row<'_>) -> RepoResult<Party> {
    let kind_text: String = row.get("kind")?;
    let kind = parse_party_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid party kind `{kind_text}` in parties.kind"))
    })?;

    let gender = match row.get::<_, Option<String>>("gender")? {
        Some(value) => Some(parse_gender(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid gender `{value}` in parties.gender"))
        })?),
        None => None,
    };

    Ok(Party {
        id: row.get("id")?,
        reference: row.get("reference")?,
        kind,
        name: row.get("name")?,
        at_path: row.get("at_path")?,
        initials: row.get("initials")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        gender,
        version: row.get("version")?,
    })
}

fn party_kind_to_db(kind: PartyKind) -> &'static str {
    match kind {
        PartyKind::Organisation => "organisation",
        PartyKind::Person => "person",
    }
}

fn parse_party_kind(value: &str) -> Option<PartyKind> {
    match value {
        "organisation" => Some(PartyKind::Organisation),
        "person" => Some(PartyKind::Person),
        _ => None,
    }
}

fn gender_to_db(gender: PersonGender) -> &'static str {
    match gender {
        PersonGender::Male => "male",
        PersonGender::Female => "female",
        PersonGender::Unknown => "unknown",
    }
}

fn parse_gender(value: &str) -> Option<PersonGender> {
    match value {
        "male" => Some(PersonGender::Male),
        "female" => Some(PersonGender::Female),
        "unknown" => Some(PersonGender::Unknown),
        _ => None,
    }
}

fn channel_kind_to_db(kind: CommunicationChannelKind) -> &'static str {
    match kind {
        CommunicationChannelKind::EmailAddress => "email_address",
        CommunicationChannelKind::PhoneNumber => "phone_number",
    }
}

fn parse_channel_kind(value: &str) -> Option<CommunicationChannelKind> {
    match value {
        "email_address" => Some(CommunicationChannelKind::EmailAddress),
        "phone_number" => Some(CommunicationChannelKind::PhoneNumber),
        _ => None,
    }
}
