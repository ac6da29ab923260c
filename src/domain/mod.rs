//! Domain types for account administration.
//!
//! Newtypes and small value types shared by the validator, the repositories
//! and the request lifecycle.

use std::fmt;
use std::str::FromStr;

use crate::constants::status;

/// Autoincrement identifier of an account request.
///
/// # Examples
///
/// ```rust
/// use thomas::domain::RequestId;
///
/// let id = RequestId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(i32);

impl RequestId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "RequestId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RequestId> for i32 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl From<i32> for RequestId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// Status shared by users, project memberships, projects and contacts.
///
/// Rows only ever move forward: pending, then active, then deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Pending,
    Active,
    Deactivated,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => status::PENDING,
            Self::Active => status::ACTIVE,
            Self::Deactivated => status::DEACTIVATED,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            status::PENDING => Ok(Self::Pending),
            status::ACTIVE => Ok(Self::Active),
            status::DEACTIVATED => Ok(Self::Deactivated),
            other => Err(format!("Unknown account status: {other}")),
        }
    }
}

/// The person running the tool. Recorded as the approver of requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(String);

impl Operator {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Reads the operator from the login environment.
    #[must_use]
    pub fn from_env() -> Self {
        let name = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user account as supplied by the operator, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// `None` means "allocate the next mmm username".
    pub username: Option<String>,
    pub given_name: String,
    pub surname: Option<String>,
    pub email: String,
    pub ssh_key: String,
}

/// Which project, contact and cluster a new membership belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBinding {
    pub project: String,
    pub poc_id: String,
    pub cluster: String,
}

/// Field used to look for existing users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKey {
    Username,
    Email,
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Email => f.write_str("email"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_conversions() {
        let id = RequestId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(RequestId::from(42), id);
    }

    #[test]
    fn account_status_round_trips_through_str() {
        for status in [
            AccountStatus::Pending,
            AccountStatus::Active,
            AccountStatus::Deactivated,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>(), Ok(status));
        }
        assert!("approved".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn operator_keeps_name() {
        let op = Operator::new("ccspapp");
        assert_eq!(op.name(), "ccspapp");
        assert_eq!(op.to_string(), "ccspapp");
    }
}
