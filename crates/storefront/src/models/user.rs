//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use loam_core::{Email, Role, UserId};

/// A storefront account.
///
/// Accounts created through an external sign-in provider have no
/// `user_password` row and cannot log in with credentials.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// What the user may do.
    pub role: Role,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
