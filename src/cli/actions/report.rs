use crate::pcdt::storage;
use anyhow::Result;
use serde_json::json;

/// Handle the report action: the operator dashboard, as JSON.
/// # Errors
/// Returns an error if the store is unreachable.
pub async fn execute(dsn: &str) -> Result<()> {
    let pool = storage::connect(dsn).await?;

    let report = json!({
        "guess_estimates": storage::all_guess_estimates(&pool).await?,
        "audit_results": storage::all_audit_results(&pool).await?,
        "alerts": storage::recent_alerts(&pool, 50).await?,
        "login_attempts": storage::recent_login_attempts(&pool, 200).await?,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
