//! SQLite-backed stores for credentials, estimates, attempts, alerts, audit
//! results, and operator configuration.
//!
//! Ownership of each table's invariant stays with one writer: signup writes
//! `users`, authentication appends `login_attempts`, the detection engine
//! appends `alerts`, and an audit batch clears and rewrites `audit_results`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::Instrument;

use super::error::Error;

/// Table definitions, executed one statement at a time on startup.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        digest TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS guess_estimates (
        user_id INTEGER NOT NULL,
        guesses INTEGER NOT NULL,
        pattern TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS audit_results (
        user_id INTEGER NOT NULL,
        guesses INTEGER NOT NULL,
        cracked INTEGER NOT NULL,
        plaintext TEXT,
        elapsed_secs INTEGER NOT NULL,
        outcome TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS login_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        ip TEXT NOT NULL,
        outcome TEXT NOT NULL,
        fingerprint TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        alert_type TEXT NOT NULL,
        details TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
];

/// Open (creating if missing) the database behind `dsn` and bootstrap the
/// schema.
pub async fn connect(dsn: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(dsn)
        .with_context(|| format!("invalid sqlite dsn: {dsn}"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to open database")?;

    init_schema(&pool).await?;

    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to bootstrap schema")?;
    }
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

/// Outcome of a login attempt, as recorded in the attempt log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    FailNoUser,
    FailWrongPassword,
}

impl AttemptOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::FailNoUser => "fail_no_user",
            Self::FailWrongPassword => "fail_wrong_password",
        }
    }

    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CredentialRecord {
    pub id: i64,
    pub username: String,
    pub digest: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginAttemptRecord {
    pub username: String,
    pub ip: String,
    pub outcome: String,
    pub fingerprint: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AlertRecord {
    pub alert_type: String,
    pub details: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct GuessEstimateRecord {
    pub username: String,
    pub guesses: i64,
    pub pattern: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditResultRecord {
    pub username: String,
    pub guesses: i64,
    pub cracked: bool,
    pub plaintext: Option<String>,
    pub elapsed_secs: i64,
    pub outcome: String,
}

/// Insert a new credential; the digest is the only persisted form of the
/// secret.
///
/// # Errors
/// Returns [`Error::DuplicateCredential`] if the username is taken.
pub async fn create_credential(
    pool: &SqlitePool,
    username: &str,
    digest: &str,
) -> Result<i64, Error> {
    let query = "INSERT INTO users (username, digest) VALUES (?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    let result = sqlx::query(query)
        .bind(username)
        .bind(digest)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(err) if is_unique_violation(&err) => Err(Error::DuplicateCredential),
        Err(err) => Err(Error::Store(err)),
    }
}

/// Absent usernames are a normal negative result, not an error.
pub async fn lookup_credential(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<CredentialRecord>> {
    let query = "SELECT id, username, digest FROM users WHERE username = ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup credential")?;

    Ok(row.map(|row| CredentialRecord {
        id: row.get("id"),
        username: row.get("username"),
        digest: row.get("digest"),
    }))
}

pub async fn list_credentials(pool: &SqlitePool) -> Result<Vec<CredentialRecord>> {
    let query = "SELECT id, username, digest FROM users ORDER BY id";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list credentials")?;

    Ok(rows
        .into_iter()
        .map(|row| CredentialRecord {
            id: row.get("id"),
            username: row.get("username"),
            digest: row.get("digest"),
        })
        .collect())
}

pub async fn append_login_attempt(
    pool: &SqlitePool,
    username: &str,
    ip: &str,
    outcome: AttemptOutcome,
    fingerprint: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let query = "INSERT INTO login_attempts (username, ip, outcome, fingerprint, created_at)
                 VALUES (?, ?, ?, ?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    sqlx::query(query)
        .bind(username)
        .bind(ip)
        .bind(outcome.as_str())
        .bind(fingerprint)
        .bind(at.to_rfc3339())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to append login attempt")?;
    Ok(())
}

/// Most recent attempts, newest first.
pub async fn recent_login_attempts(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<LoginAttemptRecord>> {
    let query = "SELECT username, ip, outcome, fingerprint, created_at
                 FROM login_attempts ORDER BY id DESC LIMIT ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let rows = sqlx::query(query)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch login attempts")?;

    Ok(rows
        .into_iter()
        .map(|row| LoginAttemptRecord {
            username: row.get("username"),
            ip: row.get("ip"),
            outcome: row.get("outcome"),
            fingerprint: row.get("fingerprint"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub async fn append_alert(
    pool: &SqlitePool,
    alert_type: &str,
    details: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let query = "INSERT INTO alerts (alert_type, details, created_at) VALUES (?, ?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    sqlx::query(query)
        .bind(alert_type)
        .bind(details)
        .bind(at.to_rfc3339())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to append alert")?;
    Ok(())
}

pub async fn recent_alerts(pool: &SqlitePool, limit: i64) -> Result<Vec<AlertRecord>> {
    let query = "SELECT alert_type, details, created_at
                 FROM alerts ORDER BY id DESC LIMIT ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let rows = sqlx::query(query)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch alerts")?;

    Ok(rows
        .into_iter()
        .map(|row| AlertRecord {
            alert_type: row.get("alert_type"),
            details: row.get("details"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// One row per estimation event; historical rows are kept as-is.
pub async fn append_guess_estimate(
    pool: &SqlitePool,
    user_id: i64,
    guesses: i64,
    pattern: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let query = "INSERT INTO guess_estimates (user_id, guesses, pattern, created_at)
                 VALUES (?, ?, ?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    sqlx::query(query)
        .bind(user_id)
        .bind(guesses)
        .bind(pattern)
        .bind(at.to_rfc3339())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to append guess estimate")?;
    Ok(())
}

pub async fn all_guess_estimates(pool: &SqlitePool) -> Result<Vec<GuessEstimateRecord>> {
    let query = "SELECT u.username, g.guesses, g.pattern, g.created_at
                 FROM guess_estimates g JOIN users u ON g.user_id = u.id
                 ORDER BY g.created_at DESC";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch guess estimates")?;

    Ok(rows
        .into_iter()
        .map(|row| GuessEstimateRecord {
            username: row.get("username"),
            guesses: row.get("guesses"),
            pattern: row.get("pattern"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub async fn append_audit_result(
    pool: &SqlitePool,
    user_id: i64,
    guesses: i64,
    cracked: bool,
    plaintext: Option<&str>,
    elapsed_secs: i64,
    outcome: &str,
) -> Result<()> {
    let query = "INSERT INTO audit_results (user_id, guesses, cracked, plaintext, elapsed_secs, outcome)
                 VALUES (?, ?, ?, ?, ?, ?)";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    sqlx::query(query)
        .bind(user_id)
        .bind(guesses)
        .bind(cracked)
        .bind(plaintext)
        .bind(elapsed_secs)
        .bind(outcome)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to append audit result")?;
    Ok(())
}

/// A batch replaces the table wholesale; it holds only the latest pass.
pub async fn clear_audit_results(pool: &SqlitePool) -> Result<()> {
    let query = "DELETE FROM audit_results";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "DELETE");
    sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear audit results")?;
    Ok(())
}

pub async fn all_audit_results(pool: &SqlitePool) -> Result<Vec<AuditResultRecord>> {
    let query = "SELECT u.username, a.guesses, a.cracked, a.plaintext, a.elapsed_secs, a.outcome
                 FROM audit_results a JOIN users u ON a.user_id = u.id
                 ORDER BY u.username";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch audit results")?;

    Ok(rows
        .into_iter()
        .map(|row| AuditResultRecord {
            username: row.get("username"),
            guesses: row.get("guesses"),
            cracked: row.get("cracked"),
            plaintext: row.get("plaintext"),
            elapsed_secs: row.get("elapsed_secs"),
            outcome: row.get("outcome"),
        })
        .collect())
}

/// Operator override lookup; the engines only ever read.
pub async fn config_get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let query = "SELECT value FROM config WHERE key = ?";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
    let row = sqlx::query(query)
        .bind(key)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to read config")?;
    Ok(row.map(|row| row.get("value")))
}

pub async fn config_set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    let query = "INSERT INTO config (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    sqlx::query(query)
        .bind(key)
        .bind(value)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to write config")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory pool for tests. One connection, no recycling: SQLite gives
    /// each connection its own `:memory:` database.
    pub(crate) async fn memory_pool() -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        init_schema(&pool).await?;
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::memory_pool;
    use super::*;

    #[tokio::test]
    async fn create_and_lookup_credential() -> Result<()> {
        let pool = memory_pool().await?;

        let id = create_credential(&pool, "alice", "digest-a").await?;
        let found = lookup_credential(&pool, "alice").await?;
        let record = found.expect("credential should exist");
        assert_eq!(record.id, id);
        assert_eq!(record.digest, "digest-a");

        assert!(lookup_credential(&pool, "nobody").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() -> Result<()> {
        let pool = memory_pool().await?;

        create_credential(&pool, "alice", "digest-a").await?;
        let err = create_credential(&pool, "alice", "digest-b")
            .await
            .expect_err("second signup must fail");
        assert!(matches!(err, Error::DuplicateCredential));
        Ok(())
    }

    #[tokio::test]
    async fn recent_attempts_are_newest_first() -> Result<()> {
        let pool = memory_pool().await?;
        let now = Utc::now();

        for (i, name) in ["first", "second", "third"].iter().enumerate() {
            append_login_attempt(
                &pool,
                name,
                "1.2.3.4",
                AttemptOutcome::FailNoUser,
                "fp",
                now + chrono::Duration::seconds(i as i64),
            )
            .await?;
        }

        let attempts = recent_login_attempts(&pool, 2).await?;
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].username, "third");
        assert_eq!(attempts[1].username, "second");
        Ok(())
    }

    #[tokio::test]
    async fn audit_results_are_replaced_not_appended() -> Result<()> {
        let pool = memory_pool().await?;
        let id = create_credential(&pool, "alice", "digest-a").await?;

        append_audit_result(&pool, id, 10, false, None, 1, "not_cracked").await?;
        clear_audit_results(&pool).await?;
        append_audit_result(&pool, id, 20, true, Some("hunter2"), 2, "cracked").await?;

        let results = all_audit_results(&pool).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].guesses, 20);
        assert_eq!(results[0].plaintext.as_deref(), Some("hunter2"));
        Ok(())
    }

    #[tokio::test]
    async fn estimates_accumulate_per_event() -> Result<()> {
        let pool = memory_pool().await?;
        let id = create_credential(&pool, "alice", "digest-a").await?;
        let now = Utc::now();

        append_guess_estimate(&pool, id, 100, "L8", now).await?;
        append_guess_estimate(&pool, id, 200, "L8", now + chrono::Duration::seconds(1)).await?;

        let estimates = all_guess_estimates(&pool).await?;
        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[0].guesses, 200);
        Ok(())
    }

    #[tokio::test]
    async fn config_set_then_get_overrides() -> Result<()> {
        let pool = memory_pool().await?;

        assert_eq!(config_get(&pool, "audit.wordlist").await?, None);
        config_set(&pool, "audit.wordlist", "/tmp/words").await?;
        config_set(&pool, "audit.wordlist", "/tmp/words2").await?;
        assert_eq!(
            config_get(&pool, "audit.wordlist").await?.as_deref(),
            Some("/tmp/words2")
        );
        Ok(())
    }

    #[test]
    fn attempt_outcome_strings_match_log_format() {
        assert_eq!(AttemptOutcome::Success.as_str(), "success");
        assert_eq!(AttemptOutcome::FailNoUser.as_str(), "fail_no_user");
        assert_eq!(
            AttemptOutcome::FailWrongPassword.as_str(),
            "fail_wrong_password"
        );
        assert!(AttemptOutcome::FailNoUser.is_failure());
        assert!(!AttemptOutcome::Success.is_failure());
    }
}
