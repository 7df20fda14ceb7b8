use sqlx::SqlitePool;

const DEFAULT_SETTINGS_SQL: &str =
    "INSERT OR IGNORE INTO salon_settings
         (id, weekday_hours, weekend_hours, lunch_start, lunch_end, timezone_offset, lead_time_min)
     VALUES (1, '09:00 - 20:00', '10:00 - 18:00', '14:00', '15:00', '+03:00', 30)";

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    // Enable WAL mode for better concurrent access
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;

    // Create migrations tracking table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    apply(pool, "001_init", include_str!("../migrations/001_init.sql")).await?;
    apply(pool, "002_default_settings", DEFAULT_SETTINGS_SQL).await?;

    tracing::info!("Database migrations up to date");
    Ok(())
}

/// Run a named migration once; already-applied names are skipped.
async fn apply(pool: &SqlitePool, name: &str, sql: &str) -> anyhow::Result<()> {
    let applied: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    if applied {
        return Ok(());
    }

    for statement in sql.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }

    sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    tracing::info!("Applied migration: {}", name);
    Ok(())
}
