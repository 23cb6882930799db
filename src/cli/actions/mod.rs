pub mod audit;
pub mod check;
pub mod config;
pub mod login;
pub mod report;
pub mod signup;
pub mod watch;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more
// actions are added.
mod run;

#[derive(Debug)]
pub enum Action {
    Signup {
        dsn: String,
        username: String,
        password: String,
    },
    Login {
        dsn: String,
        username: String,
        password: String,
        ip: String,
    },
    Check {
        dsn: String,
        password: String,
        username: Option<String>,
    },
    Audit {
        dsn: String,
    },
    Watch {
        dsn: String,
        interval_secs: u64,
    },
    Report {
        dsn: String,
    },
    Config {
        dsn: String,
        key: String,
        value: Option<String>,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
