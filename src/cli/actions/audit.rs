use crate::pcdt::{audit, hashing::Hashing, storage};
use anyhow::Result;

/// Handle the audit action: one bounded pass over every stored credential.
/// # Errors
/// Returns an error if the store is unreachable; per-user failures are
/// reported in the results instead.
pub async fn execute(dsn: &str) -> Result<()> {
    let pool = storage::connect(dsn).await?;
    let hashing = Hashing::from_env();

    let results = audit::run_full_audit(&pool, &hashing).await?;

    let mut cracked = 0;
    for (username, outcome) in &results {
        if outcome.cracked() {
            cracked += 1;
        }
        println!(
            "{username}: {} ({} guesses, {}s)",
            outcome.status.as_str(),
            outcome.guesses,
            outcome.elapsed.as_secs()
        );
    }
    println!("audited {} credential(s), {cracked} cracked", results.len());

    Ok(())
}
