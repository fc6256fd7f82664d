//! Application tenancy model.
//!
//! # Responsibility
//! - Describe the hierarchical scope tag (`at_path`) attached to entities.
//! - Answer path visibility questions without touching storage.
//!
//! # Invariants
//! - `path` is unique and rooted (`/`, `/GB`, `/GB/LON`).
//! - A non-root tenancy's `parent_path` is its direct prefix.

use crate::model::validation::{require, require_path, ValidationError};
use serde::{Deserialize, Serialize};

/// Surrogate identity of a persisted tenancy.
pub type TenancyId = i64;

/// Path of the global tenancy that can see every object.
pub const ROOT_PATH: &str = "/";

/// Persisted application tenancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationTenancy {
    pub id: TenancyId,
    pub path: String,
    pub name: String,
    pub parent_path: Option<String>,
    pub version: i64,
}

impl ApplicationTenancy {
    /// Returns whether an object tagged with `at_path` is visible from this tenancy.
    pub fn can_see(&self, at_path: &str) -> bool {
        is_visible_from(&self.path, at_path)
    }
}

/// Draft for `TenancyRepository::find_or_create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenancy {
    pub path: String,
    pub name: String,
    pub parent_path: Option<String>,
}

impl NewTenancy {
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        parent_path: Option<&str>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            parent_path: parent_path.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_path("path", &self.path)?;
        require("name", &self.name)?;
        match self.parent_path.as_deref() {
            None => Ok(()),
            Some(parent) => {
                require_path("parent_path", parent)?;
                if parent_of(&self.path) == Some(parent) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidParentPath {
                        path: self.path.clone(),
                        parent_path: parent.to_string(),
                    })
                }
            }
        }
    }
}

/// Returns the direct parent of a tenancy path (`/GB/LON` -> `/GB`, `/GB` -> `/`).
pub fn parent_of(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_PATH),
        Some(index) => Some(&path[..index]),
        None => None,
    }
}

/// Returns whether `at_path` equals `viewer_path` or lies beneath it.
pub fn is_visible_from(viewer_path: &str, at_path: &str) -> bool {
    if viewer_path == ROOT_PATH || viewer_path == at_path {
        return true;
    }
    at_path
        .strip_prefix(viewer_path)
        .is_some_and(|rest| rest.starts_with('/'))
}
