//! Database connection bootstrap.

use crate::error::AppError;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::postgres::PgConnectOptions;
use sqlx::{AnyPool, ConnectOptions};
use std::str::FromStr;

/// Open a pool for any supported database URL.
///
/// In-memory SQLite lives only as long as its connection, so such URLs get a single
/// connection that is never recycled.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<AnyPool, AppError> {
    install_default_drivers();
    let mut opts = AnyPoolOptions::new().max_connections(max_connections.max(1));
    if database_url.contains(":memory:") || database_url.contains("mode=memory") {
        opts = opts
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = opts.connect(database_url).await?;
    tracing::info!(max_connections, "database pool ready");
    Ok(pool)
}

/// Readiness probe.
pub async fn ping(pool: &AnyPool) -> Result<(), AppError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create the PostgreSQL database named in the URL if it does not exist. No-op for other databases.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        return Ok(());
    }
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/blog?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "blog");
    }

    #[tokio::test]
    async fn memory_pool_keeps_its_data() {
        let pool = connect("sqlite::memory:", 5).await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t (x) VALUES (1)").execute(&pool).await.unwrap();
        ping(&pool).await.unwrap();
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t").fetch_one(&pool).await.unwrap();
        assert_eq!(n, 1);
        ensure_database_exists("sqlite::memory:").await.unwrap();
    }
}
