use crate::cli::actions::Action;
use anyhow::{Context, Result};

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// Map parsed arguments to the action to execute.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = required(matches, "dsn")?;

    let (name, sub) = matches
        .subcommand()
        .context("a subcommand is required")?;

    let action = match name {
        "signup" => Action::Signup {
            dsn,
            username: required(sub, "username")?,
            password: required(sub, "password")?,
        },
        "login" => Action::Login {
            dsn,
            username: required(sub, "username")?,
            password: required(sub, "password")?,
            ip: required(sub, "ip")?,
        },
        "check" => Action::Check {
            dsn,
            password: required(sub, "password")?,
            username: sub.get_one::<String>("username").cloned(),
        },
        "audit" => Action::Audit { dsn },
        "watch" => Action::Watch {
            dsn,
            interval_secs: sub.get_one::<u64>("interval").copied().unwrap_or(5),
        },
        "report" => Action::Report { dsn },
        "config" => Action::Config {
            dsn,
            key: required(sub, "key")?,
            value: sub.get_one::<String>("value").cloned(),
        },
        other => anyhow::bail!("unknown subcommand: {other}"),
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn signup_maps_to_action() {
        let matches = commands::new().get_matches_from(vec![
            "pcdt", "signup", "--username", "alice", "--password", "hunter2",
        ]);
        let action = handler(&matches).expect("action");
        assert!(matches!(
            action,
            Action::Signup { username, password, .. }
                if username == "alice" && password == "hunter2"
        ));
    }

    #[test]
    fn check_username_is_optional() {
        let matches =
            commands::new().get_matches_from(vec!["pcdt", "check", "--password", "hunter2"]);
        let action = handler(&matches).expect("action");
        assert!(matches!(action, Action::Check { username: None, .. }));
    }

    #[test]
    fn watch_carries_interval() {
        let matches =
            commands::new().get_matches_from(vec!["pcdt", "watch", "--interval", "9"]);
        let action = handler(&matches).expect("action");
        assert!(matches!(action, Action::Watch { interval_secs: 9, .. }));
    }
}
