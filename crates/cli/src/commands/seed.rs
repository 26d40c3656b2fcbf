//! Seed the catalog from a YAML file.
//!
//! The file holds a single `novels` list; see `crates/cli/data/novels.yaml`.
//! `rank` defaults to 0 and `year` to `"2025"` when omitted.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use novel_cart_api::db::{self, NovelRepository};
use novel_cart_api::models::novel::NewNovel;

/// Seed file layout.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub novels: Vec<NewNovel>,
}

/// Parse seed YAML and check each entry.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or an entry is invalid.
pub fn parse(content: &str) -> Result<SeedFile, Box<dyn std::error::Error>> {
    let seed: SeedFile = serde_yaml::from_str(content)?;

    for (index, novel) in seed.novels.iter().enumerate() {
        if novel.name.trim().is_empty() {
            return Err(format!("novel #{} has an empty name", index + 1).into());
        }
        if novel.year.chars().count() > 4 {
            return Err(format!("novel '{}' has a year longer than 4 characters", novel.name).into());
        }
    }

    Ok(seed)
}

/// Insert novels from `file_path`.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete the existing catalog first
///
/// The load runs in one transaction, so a failing entry leaves the catalog
/// as it was.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a database
/// operation fails.
pub async fn novels(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading novels from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;

    info!(novels = seed.novels.len(), "Parsed seed file");

    let pool = db::create_pool(&database_url).await?;
    let outcome = NovelRepository::new(&pool)
        .seed(&seed.novels, clear_existing)
        .await?;

    if clear_existing {
        info!(removed = outcome.removed, "Cleared existing catalog");
    }
    for created in &outcome.inserted {
        info!(id = %created.id, rank = created.rank, name = %created.name, "Inserted novel");
    }

    info!("Seeding complete!");
    Ok(())
}
