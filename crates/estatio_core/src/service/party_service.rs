//! Party use-case service.
//!
//! # Responsibility
//! - Create organisations and persons through find-or-create.
//! - Attach communication channels and relationships by business codes.
//!
//! # Invariants
//! - Relationship titles are resolved before any party lookup is written.
//! - Every operation is idempotent for identical inputs.

use crate::model::party::{
    CommunicationChannel, CommunicationChannelKind, NewCommunicationChannel, NewParty, Party,
};
use crate::model::relationship::{NewRelationship, PartyRelationship, RelationshipType};
use crate::repo::party_repo::{PartyListQuery, PartyRepository};
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from party service operations.
#[derive(Debug)]
pub enum PartyServiceError {
    /// No party carries the given reference.
    PartyNotFound(String),
    /// The title matches no side of any relationship type.
    UnknownRelationshipTitle(String),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for PartyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PartyNotFound(reference) => write!(f, "party not found: {reference}"),
            Self::UnknownRelationshipTitle(title) => {
                write!(f, "unknown relationship title `{title}`")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PartyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PartyServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Party service facade over party and relationship repositories.
pub struct PartyService<P: PartyRepository, R: RelationshipRepository> {
    parties: P,
    relationships: R,
}

impl<P: PartyRepository, R: RelationshipRepository> PartyService<P, R> {
    pub fn new(parties: P, relationships: R) -> Self {
        Self {
            parties,
            relationships,
        }
    }

    pub fn find_or_create_organisation(
        &self,
        reference: &str,
        name: &str,
        at_path: &str,
    ) -> RepoResult<Party> {
        self.parties
            .find_or_create(&NewParty::organisation(reference, name, at_path))
    }

    /// Creates a person from a draft; the draft must be of kind person.
    pub fn find_or_create_person(&self, draft: &NewParty) -> RepoResult<Party> {
        self.parties.find_or_create(draft)
    }

    pub fn find_party(&self, reference: &str) -> Result<Party, PartyServiceError> {
        self.parties
            .find_by_reference(reference)?
            .ok_or_else(|| PartyServiceError::PartyNotFound(reference.to_string()))
    }

    pub fn list_parties(&self, query: &PartyListQuery) -> RepoResult<Vec<Party>> {
        self.parties.list_parties(query)
    }

    pub fn add_email_address(
        &self,
        party: &Party,
        email_address: &str,
    ) -> RepoResult<CommunicationChannel> {
        self.add_channel(party, CommunicationChannelKind::EmailAddress, email_address)
    }

    pub fn add_phone_number(
        &self,
        party: &Party,
        phone_number: &str,
    ) -> RepoResult<CommunicationChannel> {
        self.add_channel(party, CommunicationChannelKind::PhoneNumber, phone_number)
    }

    fn add_channel(
        &self,
        party: &Party,
        kind: CommunicationChannelKind,
        value: &str,
    ) -> RepoResult<CommunicationChannel> {
        self.parties.find_or_create_channel(&NewCommunicationChannel {
            party_id: party.id,
            kind,
            value: value.trim().to_string(),
        })
    }

    pub fn channels(&self, party: &Party) -> RepoResult<Vec<CommunicationChannel>> {
        self.parties.list_channels(party.id)
    }

    /// Links the party with `from_reference` to `to` using a side title.
    ///
    /// `title` may name either side (`"Contact"` or `"Contact of"`); a
    /// to-side title swaps the parties.
    pub fn relate_by_title(
        &self,
        from_reference: &str,
        to: &Party,
        title: &str,
    ) -> Result<PartyRelationship, PartyServiceError> {
        if RelationshipType::resolve_title(title).is_none() {
            return Err(PartyServiceError::UnknownRelationshipTitle(
                title.to_string(),
            ));
        }
        let from = self.find_party(from_reference)?;
        let draft = NewRelationship::from_title(title, from.id, to.id)
            .ok_or_else(|| PartyServiceError::UnknownRelationshipTitle(title.to_string()))?;
        let relationship = self.relationships.find_or_create(&draft)?;
        info!(
            "event=party_relate module=service status=ok kind={:?} from={} to={}",
            relationship.kind, from.reference, to.reference
        );
        Ok(relationship)
    }

    pub fn relationships_of(&self, party: &Party) -> RepoResult<Vec<PartyRelationship>> {
        self.relationships.list_for_party(party.id)
    }
}
