//! Party relationship model.
//!
//! A relationship is its own record `{kind, from_party, to_party}` and is
//! never embedded in either party. Each kind has two titles, one per side;
//! resolving a title yields both the kind and the direction.

use crate::model::party::PartyId;
use crate::model::validation::{check_date_range, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type RelationshipId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Organisation (from) and its contact person (to).
    Contact,
    /// Employer (from) and employee (to).
    Employment,
    /// Parent (from) and child (to).
    Family,
}

/// Which side of the relationship a title names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipDirection {
    /// The title describes the `from` party.
    From,
    /// The title describes the `to` party; parties are swapped on creation.
    To,
}

impl RelationshipType {
    pub const ALL: [Self; 3] = [Self::Contact, Self::Employment, Self::Family];

    /// Title of the `from` side.
    pub fn from_title(self) -> &'static str {
        match self {
            Self::Contact => "Contact",
            Self::Employment => "Employer",
            Self::Family => "Parent",
        }
    }

    /// Title of the `to` side.
    pub fn to_title(self) -> &'static str {
        match self {
            Self::Contact => "Contact of",
            Self::Employment => "Employee",
            Self::Family => "Child",
        }
    }

    /// Resolves a side title (case-insensitive) to a type and direction.
    pub fn resolve_title(title: &str) -> Option<(Self, RelationshipDirection)> {
        let title = title.trim();
        Self::ALL.into_iter().find_map(|kind| {
            if kind.from_title().eq_ignore_ascii_case(title) {
                Some((kind, RelationshipDirection::From))
            } else if kind.to_title().eq_ignore_ascii_case(title) {
                Some((kind, RelationshipDirection::To))
            } else {
                None
            }
        })
    }
}

/// Persisted party relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRelationship {
    pub id: RelationshipId,
    pub kind: RelationshipType,
    pub from_party_id: PartyId,
    pub to_party_id: PartyId,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub version: i64,
}

/// Draft for `RelationshipRepository::find_or_create`.
///
/// `(kind, from_party_id, to_party_id)` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub kind: RelationshipType,
    pub from_party_id: PartyId,
    pub to_party_id: PartyId,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewRelationship {
    pub fn new(kind: RelationshipType, from_party_id: PartyId, to_party_id: PartyId) -> Self {
        Self {
            kind,
            from_party_id,
            to_party_id,
            description: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Builds a draft from a side title.
    ///
    /// A `from` title keeps the parties in the given order; a `to` title
    /// means they were given from the other side and are swapped.
    pub fn from_title(title: &str, from_party_id: PartyId, to_party_id: PartyId) -> Option<Self> {
        let (kind, direction) = RelationshipType::resolve_title(title)?;
        Some(match direction {
            RelationshipDirection::From => Self::new(kind, from_party_id, to_party_id),
            RelationshipDirection::To => Self::new(kind, to_party_id, from_party_id),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from_party_id == self.to_party_id {
            return Err(ValidationError::SelfRelationship);
        }
        check_date_range(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_resolve_to_type_and_direction() {
        assert_eq!(
            RelationshipType::resolve_title("Contact"),
            Some((RelationshipType::Contact, RelationshipDirection::From))
        );
        assert_eq!(
            RelationshipType::resolve_title("contact of"),
            Some((RelationshipType::Contact, RelationshipDirection::To))
        );
        assert_eq!(
            RelationshipType::resolve_title("Employee"),
            Some((RelationshipType::Employment, RelationshipDirection::To))
        );
        assert_eq!(RelationshipType::resolve_title("Landlord"), None);
    }

    #[test]
    fn to_title_swaps_parties() {
        let draft = NewRelationship::from_title("Employee", 7, 3).unwrap();
        assert_eq!(draft.kind, RelationshipType::Employment);
        assert_eq!(draft.from_party_id, 3);
        assert_eq!(draft.to_party_id, 7);
    }

    #[test]
    fn self_relationship_is_rejected() {
        let draft = NewRelationship::new(RelationshipType::Family, 4, 4);
        assert_eq!(draft.validate(), Err(ValidationError::SelfRelationship));
    }
}
