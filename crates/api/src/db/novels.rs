//! Novel (catalog) repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use novel_cart_core::{Money, NovelId};

use super::RepositoryError;
use crate::models::Novel;
use crate::models::novel::NewNovel;

/// Columns selected for every novel query, prefixed for use in joins.
pub(crate) const NOVEL_COLUMNS: &str = "n.id AS novel_id, n.name, n.author, n.publisher, \
                                        n.rank, n.price, n.year";

#[derive(sqlx::FromRow)]
pub(crate) struct NovelRow {
    novel_id: NovelId,
    name: String,
    author: String,
    publisher: String,
    rank: i64,
    price: String,
    year: String,
}

impl TryFrom<NovelRow> for Novel {
    type Error = RepositoryError;

    fn try_from(r: NovelRow) -> Result<Self, Self::Error> {
        let price: Money = r.price.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for novel {}: {e}", r.novel_id))
        })?;

        Ok(Self {
            id: r.novel_id,
            name: r.name,
            author: r.author,
            publisher: r.publisher,
            rank: r.rank,
            price,
            year: r.year,
        })
    }
}

/// Repository for catalog reads and seeding.
pub struct NovelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NovelRepository<'a> {
    /// Create a new novel repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List novels ordered by rank, optionally restricted to one year.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn list(&self, year: Option<&str>) -> Result<Vec<Novel>, RepositoryError> {
        let rows: Vec<NovelRow> = sqlx::query_as(&format!(
            r"
            SELECT {NOVEL_COLUMNS}
            FROM novels n
            WHERE (?1 IS NULL OR n.year = ?1)
            ORDER BY n.rank ASC, n.id ASC
            "
        ))
        .bind(year)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Novel::try_from).collect()
    }

    /// Get a novel by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: NovelId) -> Result<Option<Novel>, RepositoryError> {
        let row: Option<NovelRow> = sqlx::query_as(&format!(
            "SELECT {NOVEL_COLUMNS} FROM novels n WHERE n.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Novel::try_from).transpose()
    }

    /// Insert a novel.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (e.g. a year
    /// longer than four characters).
    pub async fn create(&self, novel: &NewNovel) -> Result<Novel, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let created = insert_in(&mut tx, novel, Utc::now()).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Load a batch of novels in one transaction, optionally replacing the
    /// whole catalog first.
    ///
    /// Either every novel is inserted (and, with `clear_existing`, the old
    /// catalog removed) or nothing changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// catalog is then left as it was.
    pub async fn seed(
        &self,
        novels: &[NewNovel],
        clear_existing: bool,
    ) -> Result<SeedOutcome, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let removed = if clear_existing {
            sqlx::query("DELETE FROM novels")
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };

        let mut inserted = Vec::with_capacity(novels.len());
        for novel in novels {
            inserted.push(insert_in(&mut tx, novel, now).await?);
        }

        tx.commit().await?;
        Ok(SeedOutcome { removed, inserted })
    }

    /// Remove every novel (and, through the cascade, every cart line).
    ///
    /// Returns the number of novels deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM novels").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Result of [`NovelRepository::seed`].
#[derive(Debug)]
pub struct SeedOutcome {
    /// Novels deleted before loading.
    pub removed: u64,
    pub inserted: Vec<Novel>,
}

async fn insert_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    novel: &NewNovel,
    now: DateTime<Utc>,
) -> Result<Novel, RepositoryError> {
    let row: NovelRow = sqlx::query_as(
        r"
        INSERT INTO novels (name, author, publisher, rank, price, year, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id AS novel_id, name, author, publisher, rank, price, year
        ",
    )
    .bind(&novel.name)
    .bind(&novel.author)
    .bind(&novel.publisher)
    .bind(novel.rank)
    .bind(novel.price.to_string())
    .bind(&novel.year)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Novel::try_from(row)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::db::test_pool;

    pub(crate) fn new_novel(name: &str, rank: i64, price: &str, year: &str) -> NewNovel {
        NewNovel {
            name: name.to_string(),
            author: "Author".to_string(),
            publisher: "Publisher".to_string(),
            rank,
            price: price.parse().unwrap(),
            year: year.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_rank() {
        let pool = test_pool().await;
        let repo = NovelRepository::new(&pool);
        repo.create(&new_novel("Third", 3, "10.00", "2025")).await.unwrap();
        repo.create(&new_novel("First", 1, "10.00", "2025")).await.unwrap();
        repo.create(&new_novel("Second", 2, "10.00", "2024")).await.unwrap();

        let names: Vec<String> = repo
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, ["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_list_filters_by_year() {
        let pool = test_pool().await;
        let repo = NovelRepository::new(&pool);
        repo.create(&new_novel("A", 1, "10.00", "2025")).await.unwrap();
        repo.create(&new_novel("B", 2, "10.00", "2024")).await.unwrap();
        repo.create(&new_novel("C", 3, "10.00", "2025")).await.unwrap();

        let novels = repo.list(Some("2025")).await.unwrap();
        assert_eq!(novels.len(), 2);
        assert!(novels.iter().all(|n| n.year == "2025"));

        assert!(repo.list(Some("1999")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_price_round_trips_with_scale() {
        let pool = test_pool().await;
        let repo = NovelRepository::new(&pool);
        let created = repo.create(&new_novel("A", 1, "89", "2025")).await.unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.price.to_string(), "89.00");
        assert!(repo.get_by_id(NovelId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let pool = test_pool().await;
        let repo = NovelRepository::new(&pool);
        repo.create(&new_novel("A", 1, "1.00", "2025")).await.unwrap();
        repo.create(&new_novel("B", 2, "1.00", "2025")).await.unwrap();

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert!(repo.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_replaces_catalog() {
        let pool = test_pool().await;
        let repo = NovelRepository::new(&pool);
        repo.create(&new_novel("Old", 1, "1.00", "2024")).await.unwrap();

        let outcome = repo
            .seed(
                &[
                    new_novel("A", 1, "1.00", "2025"),
                    new_novel("B", 2, "2.00", "2025"),
                ],
                true,
            )
            .await
            .unwrap();
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.inserted.len(), 2);

        let names: Vec<String> = repo
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_failed_seed_leaves_catalog_untouched() {
        let pool = test_pool().await;
        let repo = NovelRepository::new(&pool);
        repo.create(&new_novel("Kept", 1, "1.00", "2025")).await.unwrap();

        let result = repo
            .seed(
                &[
                    new_novel("A", 1, "1.00", "2025"),
                    new_novel("Bad year", 2, "1.00", "20255"),
                ],
                true,
            )
            .await;
        assert!(result.is_err());

        let names: Vec<String> = repo
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, ["Kept"]);
    }
}
