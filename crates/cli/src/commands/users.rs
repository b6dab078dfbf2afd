//! User management commands.

use loam_core::{Email, Role};
use loam_storefront::db::UserRepository;

use super::{CliError, connect};

/// Change a user's role.
///
/// The user's current session keeps its old role until they sign in again.
///
/// # Errors
///
/// Returns an error if the email is invalid or no user has it.
pub async fn set_role(email: &str, role: Role) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool).set_role(&email, role).await?;

    tracing::info!(user_id = %user.id, email = %user.email, role = role.as_str(), "Role updated");
    Ok(())
}
