//! User repository for database operations.
//!
//! Passwords live in `storefront.user_password`, so accounts without a row
//! there cannot log in with credentials.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use loam_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "u.id, u.email, u.role, u.email_verified, u.created_at, u.updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    role: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            role,
            email_verified: row.email_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user u WHERE u.email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO storefront.user AS u (email) VALUES ($1) RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?;

        let user = User::try_from(row)?;

        sqlx::query(
            r"
            INSERT INTO storefront.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(user.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            r"
            SELECT {USER_COLUMNS}, p.password_hash
            FROM storefront.user u
            LEFT JOIN storefront.user_password p ON u.id = p.user_id
            WHERE u.email = $1
            "
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Some(password_hash) = row.password_hash else {
            return Ok(None);
        };

        Ok(Some((User::try_from(row.user)?, password_hash)))
    }

    /// Change a user's role, looked up by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    pub async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE storefront.user AS u
            SET role = $2, updated_at = NOW()
            WHERE u.email = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(role.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Delete a user. Their cart, wishlist and password rows go with them.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
