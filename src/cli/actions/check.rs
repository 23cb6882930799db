use crate::pcdt::{estimator, storage};
use anyhow::{bail, Result};
use chrono::Utc;

/// Handle the check action: print the estimate, and record it when asked to
/// attribute it to an existing account.
/// # Errors
/// Returns an error if the store is unreachable or the named user is absent.
pub async fn execute(dsn: &str, password: &str, username: Option<&str>) -> Result<()> {
    let estimate = estimator::estimate(password);

    if let Some(username) = username {
        let pool = storage::connect(dsn).await?;
        let Some(record) = storage::lookup_credential(&pool, username).await? else {
            bail!("no such user: {username}");
        };
        storage::append_guess_estimate(
            &pool,
            record.id,
            i64::try_from(estimate.guesses).unwrap_or(i64::MAX),
            &estimate.pattern,
            Utc::now(),
        )
        .await?;
    }

    println!("{}", serde_json::to_string_pretty(&estimate)?);
    Ok(())
}
