//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use novel_cart_core::{Email, UserId};

use super::{RepositoryError, conflict_or};
use crate::models::User;

/// Columns selected for every user query.
const USER_COLUMNS: &str = "id, username, email, first_name, last_name, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            username: r.username,
            email,
            first_name: r.first_name,
            last_name: r.last_name,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Whether an account already uses this username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = ?)")
                .bind(username)
                .fetch_one(self.pool)
                .await?;
        Ok(exists != 0)
    }

    /// Whether an account already uses this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = ?)")
            .bind(email.as_str())
            .fetch_one(self.pool)
            .await?;
        Ok(exists != 0)
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the taken column (`"email"`
    /// or `"username"`) if either already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(username)
        .bind(email.as_str())
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(taken_column)?;

        User::try_from(row)
    }

    /// Get a user and their password hash by username.
    ///
    /// Returns `None` if no account has this username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let user = User::try_from(r.user)?;
        Ok(Some((user, r.password_hash)))
    }
}

/// Name the column behind a unique violation on `users`.
///
/// SQLite reports it as `UNIQUE constraint failed: users.<column>`.
fn taken_column(err: sqlx::Error) -> RepositoryError {
    let column = match &err {
        sqlx::Error::Database(db_err) if db_err.message().contains("users.email") => "email",
        _ => "username",
    };
    conflict_or(err, column)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_create_and_fetch() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);
        let email = Email::parse("reader@example.com").unwrap();

        let user = repo
            .create_with_password("reader", &email, "$argon2id$fake")
            .await
            .unwrap();
        assert_eq!(user.username, "reader");

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, email);

        let (with_hash, hash) = repo.get_password_hash("reader").await.unwrap().unwrap();
        assert_eq!(with_hash.id, user.id);
        assert_eq!(hash, "$argon2id$fake");

        assert!(repo.username_exists("reader").await.unwrap());
        assert!(repo.email_exists(&email).await.unwrap());
        assert!(!repo.username_exists("someone-else").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);
        let first = Email::parse("one@example.com").unwrap();
        let second = Email::parse("two@example.com").unwrap();

        repo.create_with_password("reader", &first, "h").await.unwrap();
        let err = repo
            .create_with_password("reader", &second, "h")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref column) if column == "username"));
    }

    #[tokio::test]
    async fn test_duplicate_email_names_the_column() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);
        let email = Email::parse("reader@example.com").unwrap();

        repo.create_with_password("reader", &email, "h").await.unwrap();
        let err = repo
            .create_with_password("another", &email, "h")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref column) if column == "email"));
    }

    #[tokio::test]
    async fn test_unknown_username_has_no_hash() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);
        assert!(repo.get_password_hash("ghost").await.unwrap().is_none());
    }
}
