//! Party model: organisations, persons and their communication channels.
//!
//! # Responsibility
//! - Define the party record shared by organisations and persons.
//! - Derive a person's display name from its name parts.
//!
//! # Invariants
//! - `reference` is the natural key and is unique across all parties.
//! - Person-only fields are `None` for organisations.
//! - Persons always carry `last_name` and `gender`.

use crate::model::validation::{
    check_email, check_phone_number, require, require_path, require_reference, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Surrogate identity of a persisted party.
pub type PartyId = i64;

/// Surrogate identity of a persisted communication channel.
pub type CommunicationChannelId = i64;

/// Kind of party stored in the shared `parties` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Organisation,
    Person,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGender {
    Male,
    Female,
    Unknown,
}

/// Persisted party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub reference: String,
    pub kind: PartyKind,
    pub name: String,
    /// Tenancy the party belongs to.
    pub at_path: String,
    pub initials: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<PersonGender>,
    pub version: i64,
}

impl Party {
    pub fn is_person(&self) -> bool {
        self.kind == PartyKind::Person
    }
}

/// Draft for `PartyRepository::find_or_create`.
///
/// Built through [`NewParty::organisation`] or [`NewParty::person`]; the
/// optional person fields can be filled in afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParty {
    pub reference: String,
    pub kind: PartyKind,
    /// Organisation name. Ignored for persons, whose name is derived.
    pub name: String,
    pub at_path: String,
    pub initials: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<PersonGender>,
}

impl NewParty {
    pub fn organisation(
        reference: impl Into<String>,
        name: impl Into<String>,
        at_path: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            kind: PartyKind::Organisation,
            name: name.into(),
            at_path: at_path.into(),
            initials: None,
            first_name: None,
            last_name: None,
            gender: None,
        }
    }

    pub fn person(
        reference: impl Into<String>,
        at_path: impl Into<String>,
        initials: Option<&str>,
        first_name: Option<&str>,
        last_name: impl Into<String>,
        gender: PersonGender,
    ) -> Self {
        Self {
            reference: reference.into(),
            kind: PartyKind::Person,
            name: String::new(),
            at_path: at_path.into(),
            initials: initials.map(str::to_string),
            first_name: first_name.map(str::to_string),
            last_name: Some(last_name.into()),
            gender: Some(gender),
        }
    }

    /// Name that will be stored for this party.
    ///
    /// Persons are listed as `Last, First` (or just `Last`).
    pub fn display_name(&self) -> String {
        match self.kind {
            PartyKind::Organisation => self.name.trim().to_string(),
            PartyKind::Person => {
                let last = self.last_name.as_deref().unwrap_or_default().trim();
                match self.first_name.as_deref().map(str::trim) {
                    Some(first) if !first.is_empty() => format!("{last}, {first}"),
                    _ => last.to_string(),
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_reference("reference", &self.reference)?;
        require_path("at_path", &self.at_path)?;
        match self.kind {
            PartyKind::Organisation => {
                require("name", &self.name)?;
                if self.initials.is_some() {
                    return Err(ValidationError::UnexpectedField("initials"));
                }
                if self.first_name.is_some() {
                    return Err(ValidationError::UnexpectedField("first_name"));
                }
                if self.last_name.is_some() {
                    return Err(ValidationError::UnexpectedField("last_name"));
                }
                if self.gender.is_some() {
                    return Err(ValidationError::UnexpectedField("gender"));
                }
            }
            PartyKind::Person => {
                require("last_name", self.last_name.as_deref().unwrap_or_default())?;
                if self.gender.is_none() {
                    return Err(ValidationError::MissingField("gender"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationChannelKind {
    EmailAddress,
    PhoneNumber,
}

/// Persisted email address or phone number owned by a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationChannel {
    pub id: CommunicationChannelId,
    pub party_id: PartyId,
    pub kind: CommunicationChannelKind,
    pub value: String,
    pub version: i64,
}

/// Draft for `PartyRepository::find_or_create_channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommunicationChannel {
    pub party_id: PartyId,
    pub kind: CommunicationChannelKind,
    pub value: String,
}

impl NewCommunicationChannel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("value", &self.value)?;
        match self.kind {
            CommunicationChannelKind::EmailAddress => check_email(&self.value),
            CommunicationChannelKind::PhoneNumber => check_phone_number(&self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_display_name_is_last_comma_first() {
        let person = NewParty::person(
            "GVANNELLI",
            "/GB",
            Some("G"),
            Some("Gino"),
            "Vannelli",
            PersonGender::Male,
        );
        assert_eq!(person.display_name(), "Vannelli, Gino");

        let surname_only =
            NewParty::person("VANNELLI", "/GB", None, None, "Vannelli", PersonGender::Unknown);
        assert_eq!(surname_only.display_name(), "Vannelli");
    }

    #[test]
    fn organisation_rejects_person_fields() {
        let mut org = NewParty::organisation("TOPMODEL", "Topmodel Fashion", "/GB");
        assert!(org.validate().is_ok());
        org.gender = Some(PersonGender::Female);
        assert_eq!(
            org.validate(),
            Err(ValidationError::UnexpectedField("gender"))
        );
    }

    #[test]
    fn person_requires_last_name_and_gender() {
        let mut person =
            NewParty::person("GVANNELLI", "/GB", None, Some("Gino"), " ", PersonGender::Male);
        assert_eq!(
            person.validate(),
            Err(ValidationError::MissingField("last_name"))
        );
        person.last_name = Some("Vannelli".to_string());
        person.gender = None;
        assert_eq!(
            person.validate(),
            Err(ValidationError::MissingField("gender"))
        );
    }
}
