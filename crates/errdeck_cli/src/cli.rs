//! Command-line arguments for the errdeck operator CLI.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "errdeck")]
#[command(version)]
#[command(about = "App registry and error deduplication engine")]
pub struct Cli {
    #[arg(
        short = 'c',
        long,
        env = "ERRDECK_CONFIG",
        help = "Path to a TOML config file."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'd',
        long,
        env = "ERRDECK_DB_PATH",
        help = "SQLite database path. Overrides `db_path` from the config."
    )]
    pub db: Option<PathBuf>,

    #[arg(long, help = "Log level: trace|debug|info|warn|error.")]
    pub log_level: Option<String>,

    #[arg(long, help = "Absolute directory for rolling log files.")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Print core linkage and version.")]
    Ping,
    #[command(about = "Register a new app and print its api key.")]
    AppCreate(AppCreateArgs),
    #[command(about = "Show one app by name or api key.")]
    AppShow(AppShowArgs),
    #[command(about = "Record one error occurrence for the app owning the api key.")]
    Report(ReportArgs),
    #[command(about = "List notification recipients of an app.")]
    Recipients(AppNameArgs),
    #[command(about = "Register a user who can receive notifications.")]
    UserCreate(UserCreateArgs),
    #[command(about = "Subscribe a user to an app's notifications.")]
    Watch(WatchArgs),
    #[command(about = "Remove a user's subscription to an app.")]
    Unwatch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct AppCreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, help = "Use this api key instead of generating one.")]
    pub api_key: Option<String>,
    #[arg(long, default_value = "")]
    pub github_url: String,
    #[arg(long)]
    pub notify_all_users: bool,
}

#[derive(Debug, Args)]
pub struct AppShowArgs {
    #[arg(long, conflicts_with = "api_key", required_unless_present = "api_key")]
    pub name: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct AppNameArgs {
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct UserCreateArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, default_value = "")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[arg(long, help = "App name.")]
    pub app: String,
    #[arg(long, help = "Email of an existing user.")]
    pub email: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long, env = "ERRDECK_API_KEY")]
    pub api_key: String,
    #[arg(long, help = "Exception class name.")]
    pub klass: String,
    #[arg(long)]
    pub component: String,
    #[arg(long)]
    pub action: String,
    #[arg(long)]
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn parses_report_arguments() {
        let cli = Cli::try_parse_from([
            "errdeck",
            "--db",
            "/tmp/errdeck.sqlite3",
            "report",
            "--api-key",
            "abc",
            "--klass",
            "Whoops",
            "--component",
            "Foo",
            "--action",
            "bar",
            "--environment",
            "production",
        ])
        .unwrap();

        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.klass, "Whoops");
                assert_eq!(args.environment, "production");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_watch_arguments() {
        let cli = Cli::try_parse_from([
            "errdeck",
            "watch",
            "--app",
            "Errdeck",
            "--email",
            "oncall@example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.app, "Errdeck");
                assert_eq!(args.email, "oncall@example.com");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["errdeck", "watch", "--app", "Errdeck"]).is_err());
        assert!(Cli::try_parse_from(["errdeck", "user-create", "--email", "a@b.c"]).is_ok());
    }

    #[test]
    fn app_show_requires_a_selector() {
        assert!(Cli::try_parse_from(["errdeck", "app-show"]).is_err());
        assert!(Cli::try_parse_from(["errdeck", "app-show", "--name", "Errdeck"]).is_ok());
    }
}
