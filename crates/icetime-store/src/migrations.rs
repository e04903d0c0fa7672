//! SurrealDB schema initialization for the play dataset
//!
//! Safe to call on every connection: all definitions use `IF NOT EXISTS`.

use crate::error::StoreError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Name of the table holding merged rows.
pub const PLAYS_TABLE: &str = "plays";

/// Initialize all icetime tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing icetime SurrealDB schema");
    init_plays_table(db).await?;
    info!("icetime schema initialization complete");
    Ok(())
}

/// Initialize `plays` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE plays {
///   natural_key:  STRING (unique; "{game_id}-{join_key}")
///   game_id:      INT (indexed)
///   join_key:     STRING
///   ...           one field per dataset column, NONE when absent
/// }
/// ```
///
/// Constraints:
/// - `natural_key` is unique, which makes reruns idempotent
/// - Rows are never updated in place
async fn init_plays_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing plays table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS plays SCHEMALESS;

        -- One row per (game, join key)
        DEFINE INDEX IF NOT EXISTS idx_plays_natural_key ON TABLE plays COLUMNS natural_key UNIQUE;

        -- Rerun detection and per-game reads
        DEFINE INDEX IF NOT EXISTS idx_plays_game_id ON TABLE plays COLUMNS game_id;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StoreError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

    debug!("plays table initialized");
    Ok(())
}
