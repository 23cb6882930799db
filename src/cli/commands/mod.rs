use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

fn username_arg() -> Arg {
    Arg::new("username")
        .short('u')
        .long("username")
        .help("Account username")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Plaintext password (never persisted)")
        .required(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pcdt")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .default_value("sqlite://pcdt.db")
                .env("PCDT_DSN")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("signup")
                .about("Create a credential and record its guess estimate")
                .arg(username_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("login")
                .about("Verify a credential and log the attempt")
                .arg(username_arg())
                .arg(password_arg())
                .arg(
                    Arg::new("ip")
                        .long("ip")
                        .help("Source IP recorded with the attempt")
                        .default_value("127.0.0.1"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Estimate how guessable a password is")
                .arg(password_arg())
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .help("Record the estimate against this existing account"),
                ),
        )
        .subcommand(
            Command::new("audit")
                .about("Run a bounded offline audit of every stored credential"),
        )
        .subcommand(
            Command::new("watch")
                .about("Run detection sweeps over the login-attempt log on an interval")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .help("Seconds between sweeps")
                        .default_value("5")
                        .env("PCDT_WATCH_INTERVAL")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Dump estimates, audit results, and recent alerts as JSON"),
        )
        .subcommand(
            Command::new("config")
                .about("Read or write an operator override (e.g. audit.wordlist)")
                .arg(Arg::new("key").help("Configuration key").required(true))
                .arg(Arg::new("value").help("New value; omit to read")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "pcdt");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_signup_args() {
        let matches = new().get_matches_from(vec![
            "pcdt", "signup", "--username", "alice", "--password", "hunter2",
        ]);
        let (name, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(name, "signup");
        assert_eq!(
            sub.get_one::<String>("username").map(String::as_str),
            Some("alice")
        );
        assert_eq!(
            sub.get_one::<String>("password").map(String::as_str),
            Some("hunter2")
        );
    }

    #[test]
    fn test_dsn_default_and_override() {
        temp_env::with_var("PCDT_DSN", None::<String>, || {
            let matches = new().get_matches_from(vec!["pcdt", "report"]);
            assert_eq!(
                matches.get_one::<String>("dsn").map(String::as_str),
                Some("sqlite://pcdt.db")
            );

            let matches =
                new().get_matches_from(vec!["pcdt", "--dsn", "sqlite://other.db", "report"]);
            assert_eq!(
                matches.get_one::<String>("dsn").map(String::as_str),
                Some("sqlite://other.db")
            );
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PCDT_DSN", Some("sqlite:///tmp/lab.db")),
                ("PCDT_WATCH_INTERVAL", Some("30")),
            ],
            || {
                let matches = new().get_matches_from(vec!["pcdt", "watch"]);
                assert_eq!(
                    matches.get_one::<String>("dsn").map(String::as_str),
                    Some("sqlite:///tmp/lab.db")
                );
                let (_, sub) = matches.subcommand().expect("subcommand");
                assert_eq!(sub.get_one::<u64>("interval").copied(), Some(30));
            },
        );
    }

    #[test]
    fn test_login_ip_default() {
        let matches = new().get_matches_from(vec![
            "pcdt", "login", "--username", "alice", "--password", "hunter2",
        ]);
        let (_, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(
            sub.get_one::<String>("ip").map(String::as_str),
            Some("127.0.0.1")
        );
    }

    #[test]
    fn test_watch_interval_default() {
        temp_env::with_var("PCDT_WATCH_INTERVAL", None::<String>, || {
            let matches = new().get_matches_from(vec!["pcdt", "watch"]);
            let (_, sub) = matches.subcommand().expect("subcommand");
            assert_eq!(sub.get_one::<u64>("interval").copied(), Some(5));
        });
    }

    #[test]
    fn test_verbosity_counts() {
        let matches = new().get_matches_from(vec!["pcdt", "-vvv", "report"]);
        assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(3));
    }
}
