use sqlx::SqlitePool;

/// Creates the SQLite document table and its index. Idempotent.
///
/// Documents are stored as JSON text grouped by collection name, which keeps
/// the SQLite backend schema-flexible like the MongoDB one.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
