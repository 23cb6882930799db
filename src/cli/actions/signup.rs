use crate::pcdt::{
    accounts::{self, SignupOutcome},
    hashing::Hashing,
    storage,
};
use anyhow::{bail, Result};

/// Handle the signup action.
/// # Errors
/// Returns an error if the store is unreachable or the username is taken.
pub async fn execute(dsn: &str, username: &str, password: &str) -> Result<()> {
    let pool = storage::connect(dsn).await?;
    let hashing = Hashing::from_env();

    match accounts::signup(&pool, &hashing, username, password).await? {
        SignupOutcome::Created { estimate, .. } => {
            println!(
                "account created: {username} (estimated {} guesses, pattern {})",
                estimate.guesses, estimate.pattern
            );
            Ok(())
        }
        SignupOutcome::Conflict => bail!("username already registered: {username}"),
    }
}
