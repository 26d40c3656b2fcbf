//! Account registration and login.
//!
//! Username/password registration and login backed by Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::SqlitePool;

use novel_cart_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration form as posted by clients. Every field is required.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub confirm_password: Option<SecretString>,
}

/// Login form as posted by clients.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

/// Registers and signs in accounts against the user table.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account.
    ///
    /// Checks run in order: all fields present, passwords match, password
    /// length, email format, username free, email free.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an `AuthError`.
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn register(&self, form: RegisterForm) -> Result<User, AuthError> {
        const MISSING: &str = "all fields are required";

        let username = non_empty(form.username).ok_or(AuthError::MissingFields(MISSING))?;
        let email = non_empty(form.email).ok_or(AuthError::MissingFields(MISSING))?;
        let password = non_empty_secret(form.password).ok_or(AuthError::MissingFields(MISSING))?;
        let confirm =
            non_empty_secret(form.confirm_password).ok_or(AuthError::MissingFields(MISSING))?;

        if password.expose_secret() != confirm.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password.expose_secret())?;

        let email = Email::parse(&email)?;

        if self.users.username_exists(&username).await? {
            return Err(AuthError::UsernameTaken);
        }
        if self.users.email_exists(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(password.expose_secret())?;

        // A concurrent registration can still win the race between the
        // checks above and the insert.
        let user = self
            .users
            .create_with_password(&username, &email, &password_hash)
            .await
            .map_err(already_taken)?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if either field is absent.
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, form: LoginForm) -> Result<User, AuthError> {
        const MISSING: &str = "username and password are required";

        let username = non_empty(form.username).ok_or(AuthError::MissingFields(MISSING))?;
        let password = non_empty_secret(form.password).ok_or(AuthError::MissingFields(MISSING))?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password.expose_secret(), &password_hash)?;

        Ok(user)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn non_empty_secret(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|v| !v.expose_secret().is_empty())
}

/// Length check, counted in characters rather than bytes.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Argon2id PHC string with a fresh salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Unparseable stored hashes count as a mismatch.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Turn an insert conflict into the matching "already exists" error.
fn already_taken(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(column) if column == "email" => AuthError::EmailTaken,
        RepositoryError::Conflict(_) => AuthError::UsernameTaken,
        other => AuthError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn register_form(username: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(SecretString::from(password.to_string())),
            confirm_password: Some(SecretString::from(confirm.to_string())),
        }
    }

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: Some(username.to_string()),
            password: Some(SecretString::from(password.to_string())),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash).is_ok());
        assert!(matches!(
            verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword(6))
        ));
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let pool = test_pool().await;
        let auth = AuthService::new(&pool);

        let user = auth
            .register(register_form("reader", "reader@example.com", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.username, "reader");

        let logged_in = auth.login(login_form("reader", "secret1")).await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login(login_form("reader", "wrong-pass")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(login_form("nobody", "secret1")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let pool = test_pool().await;
        let auth = AuthService::new(&pool);

        let mut missing = register_form("reader", "reader@example.com", "secret1", "secret1");
        missing.confirm_password = None;
        assert!(matches!(
            auth.register(missing).await,
            Err(AuthError::MissingFields(_))
        ));

        assert!(matches!(
            auth.register(register_form("reader", "", "secret1", "secret1")).await,
            Err(AuthError::MissingFields(_))
        ));
        assert!(matches!(
            auth.register(register_form("reader", "r@example.com", "secret1", "secret2"))
                .await,
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            auth.register(register_form("reader", "r@example.com", "short", "short"))
                .await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.register(register_form("reader", "not-an-email", "secret1", "secret1"))
                .await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let pool = test_pool().await;
        let auth = AuthService::new(&pool);
        auth.register(register_form("reader", "reader@example.com", "secret1", "secret1"))
            .await
            .unwrap();

        assert!(matches!(
            auth.register(register_form("reader", "other@example.com", "secret1", "secret1"))
                .await,
            Err(AuthError::UsernameTaken)
        ));
        assert!(matches!(
            auth.register(register_form("other", "reader@example.com", "secret1", "secret1"))
                .await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[test]
    fn test_insert_conflict_names_the_taken_field() {
        assert!(matches!(
            already_taken(RepositoryError::Conflict("email".to_string())),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            already_taken(RepositoryError::Conflict("username".to_string())),
            AuthError::UsernameTaken
        ));
        assert!(matches!(
            already_taken(RepositoryError::NotFound),
            AuthError::Repository(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let pool = test_pool().await;
        let auth = AuthService::new(&pool);

        let form = LoginForm {
            username: Some("reader".to_string()),
            password: None,
        };
        assert!(matches!(
            auth.login(form).await,
            Err(AuthError::MissingFields(_))
        ));
    }
}
