//! Reference data referenced by order items: charges, taxes, properties
//! and projects.
//!
//! All four share one shape (`reference`, `name`, `at_path`) but live in
//! their own tables.

use crate::model::validation::{require, require_path, require_reference, ValidationError};
use serde::{Deserialize, Serialize};

pub type ReferenceId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Charge,
    Tax,
    Property,
    Project,
}

impl ReferenceKind {
    pub const ALL: [Self; 4] = [Self::Charge, Self::Tax, Self::Property, Self::Project];

    /// Table holding rows of this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Charge => "charges",
            Self::Tax => "taxes",
            Self::Property => "properties",
            Self::Project => "projects",
        }
    }

    /// Entity name used in errors and log events.
    pub fn entity(self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Tax => "tax",
            Self::Property => "property",
            Self::Project => "project",
        }
    }
}

/// Persisted reference-data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    pub id: ReferenceId,
    pub kind: ReferenceKind,
    pub reference: String,
    pub name: String,
    pub at_path: String,
    pub version: i64,
}

/// Draft for `ReferenceRepository::find_or_create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReference {
    pub kind: ReferenceKind,
    pub reference: String,
    pub name: String,
    pub at_path: String,
}

impl NewReference {
    pub fn new(
        kind: ReferenceKind,
        reference: impl Into<String>,
        name: impl Into<String>,
        at_path: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            reference: reference.into(),
            name: name.into(),
            at_path: at_path.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_reference("reference", &self.reference)?;
        require("name", &self.name)?;
        require_path("at_path", &self.at_path)
    }
}
