use std::str::FromStr;

use chrono::{DateTime, Utc};
pub use sqlx::Error;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Executor, Row, Sqlite,
};

type Pool = sqlx::Pool<Sqlite>;
const DB_PATH: &str = "sqlite:subscriptions.sqlite";

/// Timestamps are stored as text in this format, in UTC.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct Database {
    pool: Pool,
}

/// One row of the `subscriptions` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub username: String,
    pub telegram_id: i64,
    pub telegram_username: String,
    pub telegram_name: String,
    pub first_seen_at: String,
    pub last_seen_at: String,
}

impl Database {
    pub async fn new() -> Result<Database, Error> {
        Self::with_path(DB_PATH).await
    }

    pub async fn with_path(db_path: &str) -> Result<Database, Error> {
        if !Sqlite::database_exists(db_path).await.unwrap_or(false) {
            Sqlite::create_database(db_path).await?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(32)
            .connect_with(
                SqliteConnectOptions::from_str(db_path)?
                    .busy_timeout(std::time::Duration::from_secs(600)),
            )
            .await?;

        // SUBSCRIPTIONS:
        // username (extracted from a subscription link)
        // telegram_id (of whoever submitted it)
        // telegram_username ("@handle" or empty)
        // telegram_name (first name, possibly with last name)
        // first_seen_at (date+time in UTC, set once)
        // last_seen_at (date+time in UTC, refreshed on resubmission)
        pool.execute(sqlx::query(
            "
                CREATE TABLE IF NOT EXISTS subscriptions (
                    username TEXT NOT NULL,
                    telegram_id INTEGER NOT NULL,
                    telegram_username TEXT NOT NULL,
                    telegram_name TEXT NOT NULL,
                    first_seen_at TEXT NOT NULL,
                    last_seen_at TEXT NOT NULL,
                    PRIMARY KEY (telegram_id, username)
                ) STRICT;",
        ))
        .await?;

        Ok(Database { pool })
    }

    /// Record that this Telegram user submitted a link with this username.
    ///
    /// One row is kept per `(telegram_id, username)` pair. A resubmission
    /// refreshes the sender's metadata and `last_seen_at` on the existing
    /// row, leaving `first_seen_at` alone. The whole thing is a single
    /// statement, so two submissions racing for the same pair can't create
    /// two rows.
    pub async fn save_subscription(
        &self,
        username: &str,
        telegram_id: i64,
        telegram_username: &str,
        telegram_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let now = now.format(TIME_FORMAT).to_string();
        sqlx::query(
            "INSERT INTO subscriptions(username, telegram_id,
                telegram_username, telegram_name, first_seen_at, last_seen_at)
            VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(telegram_id, username) DO
            UPDATE SET telegram_username=?, telegram_name=?, last_seen_at=?;",
        )
        .bind(username)
        .bind(telegram_id)
        .bind(telegram_username)
        .bind(telegram_name)
        .bind(&now)
        .bind(&now)
        .bind(telegram_username)
        .bind(telegram_name)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a single subscription, if it exists.
    pub async fn subscription(
        &self,
        telegram_id: i64,
        username: &str,
    ) -> Result<Option<Subscription>, Error> {
        sqlx::query(
            "SELECT username, telegram_id, telegram_username, telegram_name,
                first_seen_at, last_seen_at
            FROM subscriptions WHERE telegram_id=? AND username=?;",
        )
        .bind(telegram_id)
        .bind(username)
        .map(|row: SqliteRow| Subscription {
            username: row.get("username"),
            telegram_id: row.get("telegram_id"),
            telegram_username: row.get("telegram_username"),
            telegram_name: row.get("telegram_name"),
            first_seen_at: row.get("first_seen_at"),
            last_seen_at: row.get("last_seen_at"),
        })
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn subscription_count(&self) -> Result<i64, Error> {
        sqlx::query("SELECT COUNT(*) AS count FROM subscriptions;")
            .map(|row: SqliteRow| row.get::<i64, _>("count"))
            .fetch_one(&self.pool)
            .await
    }
}
