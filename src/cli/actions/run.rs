use crate::cli::actions::{audit, check, config, login, report, signup, watch, Action};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Signup {
            dsn,
            username,
            password,
        } => signup::execute(&dsn, &username, &password).await,
        Action::Login {
            dsn,
            username,
            password,
            ip,
        } => login::execute(&dsn, &username, &password, &ip).await,
        Action::Check {
            dsn,
            password,
            username,
        } => check::execute(&dsn, &password, username.as_deref()).await,
        Action::Audit { dsn } => audit::execute(&dsn).await,
        Action::Watch { dsn, interval_secs } => watch::execute(&dsn, interval_secs).await,
        Action::Report { dsn } => report::execute(&dsn).await,
        Action::Config { dsn, key, value } => {
            config::execute(&dsn, &key, value.as_deref()).await
        }
    }
}
