use anyhow::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema, Statement};
use std::path::PathBuf;
use tokio::fs;

use crate::entity::{Books, Emails, Purchases};

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Minimal migration runner that executes SQL files in `migrations/` in filename order.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let mut entries = fs::read_dir("migrations").await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let backend = conn.get_database_backend();
    for file in files {
        tracing::debug!(file = %file.display(), "applying migration");
        let sql = fs::read_to_string(&file).await?;
        // Postgres prepared statements cannot contain multiple commands,
        // so split the migration file and run each statement individually.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let statement = format!("{stmt};");
            conn.execute(Statement::from_string(backend, statement))
                .await?;
        }
    }

    Ok(())
}

/// Build the schema straight from the entity definitions.
///
/// Used for throwaway databases (SQLite in tests) where the Postgres migration
/// files do not apply.
pub async fn create_schema_from_entities(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    conn.execute(backend.build(&schema.create_table_from_entity(Books)))
        .await?;
    conn.execute(backend.build(&schema.create_table_from_entity(Purchases)))
        .await?;
    conn.execute(backend.build(&schema.create_table_from_entity(Emails)))
        .await?;

    Ok(())
}
