//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a stored role string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// What a signed-in user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper: cart, wishlist, own account.
    #[default]
    Customer,
    /// Catalog and user management.
    Admin,
}

impl Role {
    /// Database/text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    /// Whether this role may use the admin endpoints.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_text_roundtrip() {
        for role in [Role::Customer, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role() {
        assert_eq!(
            "super_admin".parse::<Role>(),
            Err(RoleParseError("super_admin".to_owned()))
        );
    }

    #[test]
    fn test_only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Customer.is_admin());
    }
}
