//! Field-level validation rules shared by every draft type.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length of a tenancy path.
pub const MAX_PATH_LEN: usize = 255;
/// Maximum length of a party or reference-data code.
pub const MAX_REFERENCE_LEN: usize = 24;

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_\-/]+$").expect("valid reference regex"));
static TENANCY_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/([A-Za-z0-9_-]+(/[A-Za-z0-9_-]+)*)?$").expect("valid tenancy path regex")
});
static PHONE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()-]{3,}$").expect("valid phone number regex"));

/// Validation failure raised before any persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is blank.
    MissingField(&'static str),
    /// A reference code does not match `[A-Z0-9_-/]+` or is too long.
    InvalidReference { field: &'static str, value: String },
    /// A tenancy path is malformed.
    InvalidPath(String),
    /// A child tenancy's parent is not its direct prefix.
    InvalidParentPath { path: String, parent_path: String },
    /// `end` is before `start`.
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    /// A field is set on an entity kind that must not carry it.
    UnexpectedField(&'static str),
    /// Email address or phone number is malformed.
    InvalidChannelValue(String),
    /// A relationship links a party to itself.
    SelfRelationship,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is missing"),
            Self::InvalidReference { field, value } => write!(
                f,
                "`{field}` must match [A-Z0-9_-/] and be at most {MAX_REFERENCE_LEN} chars, got `{value}`"
            ),
            Self::InvalidPath(path) => write!(f, "invalid tenancy path `{path}`"),
            Self::InvalidParentPath { path, parent_path } => write!(
                f,
                "tenancy `{path}` cannot be a direct child of `{parent_path}`"
            ),
            Self::InvalidDateRange { start, end } => {
                write!(f, "end date ({end}) must be >= start date ({start})")
            }
            Self::UnexpectedField(field) => write!(f, "field `{field}` is not allowed here"),
            Self::InvalidChannelValue(value) => {
                write!(f, "invalid communication channel value `{value}`")
            }
            Self::SelfRelationship => write!(f, "a party cannot be related to itself"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_reference(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require(field, value)?;
    if value.len() > MAX_REFERENCE_LEN || !REFERENCE_RE.is_match(value) {
        return Err(ValidationError::InvalidReference {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_path(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require(field, value)?;
    if !is_valid_path(value) {
        return Err(ValidationError::InvalidPath(value.to_string()));
    }
    Ok(())
}

/// Returns whether `path` is a well-formed tenancy path such as `/` or `/GB/LON`.
pub fn is_valid_path(path: &str) -> bool {
    path.len() <= MAX_PATH_LEN && TENANCY_PATH_RE.is_match(path)
}

pub(crate) fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
    }
    Ok(())
}

pub(crate) fn check_email(value: &str) -> Result<(), ValidationError> {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidChannelValue(value.to_string())),
    }
}

pub(crate) fn check_phone_number(value: &str) -> Result<(), ValidationError> {
    if PHONE_NUMBER_RE.is_match(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidChannelValue(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_accepts_estatio_style_codes() {
        assert!(require_reference("reference", "GVANNELLI").is_ok());
        assert!(require_reference("reference", "HELLOWORLD_GB").is_ok());
        assert!(require_reference("reference", "OXF-02/A").is_ok());
    }

    #[test]
    fn reference_rejects_lowercase_and_overlong_codes() {
        assert!(matches!(
            require_reference("reference", "topmodel"),
            Err(ValidationError::InvalidReference { .. })
        ));
        assert!(matches!(
            require_reference("reference", &"X".repeat(MAX_REFERENCE_LEN + 1)),
            Err(ValidationError::InvalidReference { .. })
        ));
        assert_eq!(
            require_reference("reference", "  "),
            Err(ValidationError::MissingField("reference"))
        );
    }

    #[test]
    fn tenancy_paths_are_rooted_and_segmented() {
        assert!(is_valid_path("/"));
        assert!(is_valid_path("/GB"));
        assert!(is_valid_path("/GB/LON_1"));
        assert!(!is_valid_path("GB"));
        assert!(!is_valid_path("/GB/"));
        assert!(!is_valid_path("//GB"));
    }

    #[test]
    fn date_range_allows_open_ends() {
        let day = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2015, 12, 31).unwrap();
        assert!(check_date_range(Some(day), None).is_ok());
        assert!(check_date_range(None, Some(day)).is_ok());
        assert!(check_date_range(Some(day), Some(day)).is_ok());
        assert_eq!(
            check_date_range(Some(day), Some(earlier)),
            Err(ValidationError::InvalidDateRange {
                start: day,
                end: earlier
            })
        );
    }

    #[test]
    fn channel_values_are_checked_by_kind() {
        assert!(check_email("gino@topmodel.example").is_ok());
        assert!(check_email("gino@@topmodel.example").is_err());
        assert!(check_email("@topmodel.example").is_err());
        assert!(check_phone_number("+44 (20) 7946-0000").is_ok());
        assert!(check_phone_number("call me").is_err());
    }
}
