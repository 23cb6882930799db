use crate::pcdt::{accounts, hashing::Hashing, storage, storage::AttemptOutcome};
use anyhow::Result;

/// Handle the login action. Every attempt is logged, whatever its outcome.
/// # Errors
/// Returns an error if the store is unreachable.
pub async fn execute(dsn: &str, username: &str, password: &str, ip: &str) -> Result<()> {
    let pool = storage::connect(dsn).await?;
    let hashing = Hashing::from_env();

    match accounts::login(&pool, &hashing, username, password, ip).await? {
        AttemptOutcome::Success => println!("login successful"),
        // One message for both failure modes so the CLI does not leak which
        // usernames exist.
        AttemptOutcome::FailNoUser | AttemptOutcome::FailWrongPassword => {
            println!("invalid credentials");
        }
    }

    Ok(())
}
