//! Signup and login flows around the credential store.
//!
//! The plaintext password only exists for the duration of these calls: signup
//! digests it, hands it to the estimator once, persists the estimate, and
//! drops it; login digests and fingerprints it for the attempt log.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::error::Error;
use super::estimator::{estimate, Estimate};
use super::hashing::Hashing;
use super::storage::{self, AttemptOutcome};

/// Outcome of attempting to create a new credential.
#[derive(Debug)]
pub enum SignupOutcome {
    Created { user_id: i64, estimate: Estimate },
    Conflict,
}

/// Create a credential and record its guess estimate.
///
/// # Errors
/// Store failures propagate; a taken username is reported as
/// [`SignupOutcome::Conflict`], not an error.
pub async fn signup(
    pool: &SqlitePool,
    hashing: &Hashing,
    username: &str,
    password: &str,
) -> Result<SignupOutcome> {
    if username.is_empty() || password.is_empty() {
        bail!("username and password are required");
    }

    let digest = hashing.digest(password);
    let user_id = match storage::create_credential(pool, username, &digest).await {
        Ok(user_id) => user_id,
        Err(Error::DuplicateCredential) => {
            debug!("signup conflict for {username}");
            return Ok(SignupOutcome::Conflict);
        }
        Err(err) => return Err(err).context("failed to create credential"),
    };

    // The one place the plaintext meets the estimator; nothing beyond the
    // estimate row survives this call.
    let estimate = estimate(password);
    storage::append_guess_estimate(
        pool,
        user_id,
        i64::try_from(estimate.guesses).unwrap_or(i64::MAX),
        &estimate.pattern,
        Utc::now(),
    )
    .await?;

    info!(user = %username, guesses = estimate.guesses, pattern = %estimate.pattern, "credential created");
    Ok(SignupOutcome::Created { user_id, estimate })
}

/// Verify a credential and append the attempt to the log.
///
/// An absent user is a normal negative result; every path records an attempt
/// with a fingerprint of the *submitted* password so stuffing runs are
/// correlatable without storing plaintext.
pub async fn login(
    pool: &SqlitePool,
    hashing: &Hashing,
    username: &str,
    password: &str,
    ip: &str,
) -> Result<AttemptOutcome> {
    let fingerprint = hashing.fingerprint(password);

    let outcome = match storage::lookup_credential(pool, username).await? {
        None => AttemptOutcome::FailNoUser,
        Some(record) if hashing.verify(password, &record.digest) => AttemptOutcome::Success,
        Some(_) => AttemptOutcome::FailWrongPassword,
    };

    storage::append_login_attempt(pool, username, ip, outcome, &fingerprint, Utc::now()).await?;
    debug!(user = %username, ip = %ip, outcome = outcome.as_str(), "login attempt recorded");

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcdt::storage::testing::memory_pool;
    use secrecy::SecretString;

    fn hashing() -> Hashing {
        Hashing::new(SecretString::from("accounts-test-pepper"))
    }

    #[tokio::test]
    async fn signup_persists_digest_and_estimate_only() -> Result<()> {
        let pool = memory_pool().await?;
        let scheme = hashing();

        let outcome = signup(&pool, &scheme, "alice", "Tr0ub4dor&3").await?;
        let SignupOutcome::Created { user_id, estimate } = outcome else {
            panic!("expected creation");
        };
        assert!(user_id > 0);

        // Stored digest is the keyed digest, never the plaintext.
        let record = storage::lookup_credential(&pool, "alice").await?.expect("record");
        assert_eq!(record.digest, scheme.digest("Tr0ub4dor&3"));
        assert_ne!(record.digest, "Tr0ub4dor&3");

        let estimates = storage::all_guess_estimates(&pool).await?;
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].pattern, estimate.pattern);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_signup_reports_conflict() -> Result<()> {
        let pool = memory_pool().await?;
        let scheme = hashing();

        signup(&pool, &scheme, "alice", "first-password").await?;
        let outcome = signup(&pool, &scheme, "alice", "second-password").await?;
        assert!(matches!(outcome, SignupOutcome::Conflict));

        // The original credential is untouched.
        let record = storage::lookup_credential(&pool, "alice").await?.expect("record");
        assert_eq!(record.digest, scheme.digest("first-password"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected() -> Result<()> {
        let pool = memory_pool().await?;
        assert!(signup(&pool, &hashing(), "", "secret").await.is_err());
        assert!(signup(&pool, &hashing(), "alice", "").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn login_outcomes_cover_the_attempt_taxonomy() -> Result<()> {
        let pool = memory_pool().await?;
        let scheme = hashing();
        signup(&pool, &scheme, "alice", "correct-horse").await?;

        let success = login(&pool, &scheme, "alice", "correct-horse", "10.0.0.1").await?;
        assert_eq!(success, AttemptOutcome::Success);

        let wrong = login(&pool, &scheme, "alice", "wrong-horse", "10.0.0.1").await?;
        assert_eq!(wrong, AttemptOutcome::FailWrongPassword);

        let missing = login(&pool, &scheme, "nobody", "whatever", "10.0.0.1").await?;
        assert_eq!(missing, AttemptOutcome::FailNoUser);

        let attempts = storage::recent_login_attempts(&pool, 10).await?;
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].outcome, "fail_no_user");
        assert_eq!(attempts[2].outcome, "success");
        Ok(())
    }

    #[tokio::test]
    async fn same_submitted_password_shares_a_fingerprint() -> Result<()> {
        let pool = memory_pool().await?;
        let scheme = hashing();

        login(&pool, &scheme, "alice", "stuffed-pass", "10.0.0.1").await?;
        login(&pool, &scheme, "bob", "stuffed-pass", "10.0.0.1").await?;
        login(&pool, &scheme, "carol", "different", "10.0.0.1").await?;

        let attempts = storage::recent_login_attempts(&pool, 10).await?;
        assert_eq!(attempts[1].fingerprint, attempts[2].fingerprint);
        assert_ne!(attempts[0].fingerprint, attempts[1].fingerprint);
        Ok(())
    }
}
