use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which kind of human session a credential belongs to.
///
/// Admin and merchant sessions are mutually exclusive on one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Merchant,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Merchant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Merchant => "merchant",
        }
    }

    /// The role a session of this kind excludes.
    pub fn other(&self) -> Role {
        match self {
            Role::Admin => Role::Merchant,
            Role::Merchant => Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}' (expected 'admin' or 'merchant')", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "merchant" => Ok(Role::Merchant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" merchant ".parse::<Role>().unwrap(), Role::Merchant);
    }

    #[test]
    fn rejects_unknown_role() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err, UnknownRole("superuser".to_string()));
    }

    #[test]
    fn other_is_the_opposite_role() {
        assert_eq!(Role::Admin.other(), Role::Merchant);
        assert_eq!(Role::Merchant.other(), Role::Admin);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"merchant\"").unwrap();
        assert_eq!(role, Role::Merchant);
    }
}
