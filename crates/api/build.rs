//! Build script for the api crate.
//!
//! `sqlx::migrate!` embeds the SQL files at compile time, so Cargo has to be
//! told to rebuild when a migration is added or edited.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
