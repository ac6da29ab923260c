//! Input validation for account records.
//!
//! Everything here is pure: nothing touches the datastore, so a failed check
//! never leaves a partial write behind.

mod ssh_key;

pub use ssh_key::{Curve, KeyType, PublicKeyInfo, SshKeyError, validate_ssh_key};

use thiserror::Error;
use tracing::warn;

use crate::constants::accounts::{CAPACITY_WARNING_MARGIN, MMM_PREFIX, USERNAME_LENGTH};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username, must be 7 characters: {0}")]
    UsernameLength(String),

    #[error("Invalid SSH key: {0}")]
    SshKey(#[from] SshKeyError),

    #[error("This is a {domain} email address - please provide the user's institutional username")]
    InstitutionalUsernameRequired { domain: String },

    #[error("This is a {domain} email address and an mmm username was given: {username}")]
    InstitutionalMmmUsername { domain: String, username: String },

    #[error("Username {username} does not exist. The last existing MMM account is {max}")]
    MmmOutOfRange { username: String, max: u32 },

    #[error("Malformed mmm username: {0}")]
    MalformedMmm(String),
}

/// Outcome of a successful mmm range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCheck {
    /// Not an mmm username; the range does not apply.
    NotMmm,
    InRange,
    /// Within the warning margin of the last existing account.
    NearCapacity { remaining: u32 },
}

pub fn validate_username(username: &str) -> Result<&str, ValidationError> {
    if username.chars().count() != USERNAME_LENGTH {
        return Err(ValidationError::UsernameLength(username.to_string()));
    }
    Ok(username)
}

#[must_use]
pub fn is_mmm_username(username: &str) -> bool {
    username.starts_with(MMM_PREFIX)
}

/// Institutional users keep their institutional username; they are never
/// given an mmm account.
pub fn validate_ucl_policy(
    email: &str,
    username: Option<&str>,
    domain: &str,
) -> Result<(), ValidationError> {
    if !email.contains(domain) {
        return Ok(());
    }

    match username {
        None | Some("") => Err(ValidationError::InstitutionalUsernameRequired {
            domain: domain.to_string(),
        }),
        Some(name) if is_mmm_username(name) => Err(ValidationError::InstitutionalMmmUsername {
            domain: domain.to_string(),
            username: name.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

/// Checks that an mmm username is one of the role accounts that actually exist.
pub fn validate_mmm_range(username: &str, max_account_no: u32) -> Result<RangeCheck, ValidationError> {
    let Some(suffix) = username.strip_prefix(MMM_PREFIX) else {
        return Ok(RangeCheck::NotMmm);
    };

    let number: u32 = suffix
        .parse()
        .map_err(|_| ValidationError::MalformedMmm(username.to_string()))?;

    if number > max_account_no {
        return Err(ValidationError::MmmOutOfRange {
            username: username.to_string(),
            max: max_account_no,
        });
    }

    if number > max_account_no.saturating_sub(CAPACITY_WARNING_MARGIN) {
        warn!(
            "Last existing MMM role account is {}, more need to be requested from ISD User Services",
            max_account_no
        );
        return Ok(RangeCheck::NearCapacity {
            remaining: max_account_no - number,
        });
    }

    Ok(RangeCheck::InRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ccaaxyz").is_ok());
        assert!(validate_username("mmm0042").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("ccaaxy").is_err());
        assert!(validate_username("ccaaxyzz").is_err());
        assert!(validate_username("mmm00420").is_err());
    }

    #[test]
    fn test_username_length_is_counted_in_characters() {
        assert!(validate_username("jöhnsmi").is_ok());
    }

    #[test]
    fn test_ucl_policy_requires_username() {
        let err = validate_ucl_policy("a.user@ucl.ac.uk", None, "ucl.ac.uk").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InstitutionalUsernameRequired { .. }
        ));
        assert!(validate_ucl_policy("a.user@ucl.ac.uk", Some(""), "ucl.ac.uk").is_err());
    }

    #[test]
    fn test_ucl_policy_rejects_mmm_username() {
        let err = validate_ucl_policy("a.user@ucl.ac.uk", Some("mmm0101"), "ucl.ac.uk").unwrap_err();
        assert!(matches!(err, ValidationError::InstitutionalMmmUsername { .. }));
    }

    #[test]
    fn test_ucl_policy_allows_other_domains() {
        assert!(validate_ucl_policy("alice@inst.edu", None, "ucl.ac.uk").is_ok());
        assert!(validate_ucl_policy("alice@inst.edu", Some("mmm0101"), "ucl.ac.uk").is_ok());
        assert!(validate_ucl_policy("a.user@ucl.ac.uk", Some("ccaaxyz"), "ucl.ac.uk").is_ok());
    }

    #[test]
    fn test_mmm_range() {
        assert!(matches!(
            validate_mmm_range("mmm1801", 1800),
            Err(ValidationError::MmmOutOfRange { max: 1800, .. })
        ));
        assert_eq!(
            validate_mmm_range("mmm1750", 1800),
            Ok(RangeCheck::NearCapacity { remaining: 50 })
        );
        assert_eq!(validate_mmm_range("mmm1000", 1800), Ok(RangeCheck::InRange));
        assert_eq!(validate_mmm_range("mmm1800", 1800), Ok(RangeCheck::NearCapacity { remaining: 0 }));
        assert_eq!(validate_mmm_range("mmm1700", 1800), Ok(RangeCheck::InRange));
    }

    #[test]
    fn test_mmm_range_ignores_institutional_usernames() {
        assert_eq!(validate_mmm_range("ccaaxyz", 1800), Ok(RangeCheck::NotMmm));
    }

    #[test]
    fn test_mmm_range_rejects_non_numeric_suffix() {
        assert!(matches!(
            validate_mmm_range("mmmabcd", 1800),
            Err(ValidationError::MalformedMmm(_))
        ));
    }
}
