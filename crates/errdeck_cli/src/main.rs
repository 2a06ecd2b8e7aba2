//! Operator CLI over the errdeck engine.
//!
//! # Responsibility
//! - Wire config, logging and storage the way an embedding service would.
//! - Expose app, user and watcher management plus report ingestion for
//!   local checks.
//! - Print plain `key=value` lines so output stays scriptable.

mod cli;

use clap::Parser;
use cli::{AppCreateArgs, AppShowArgs, Cli, Commands, ReportArgs, UserCreateArgs, WatchArgs};
use errdeck_core::db::open_db_with_options;
use errdeck_core::{
    init_logging, logging_status, App, AppService, CoreConfig, DedupService, Fingerprint,
    IngestService, NewApp, NotificationService, SqliteAppRepository, SqliteProblemRepository,
    SqliteUserRepository, User, UserRepository, Watcher,
};
use log::error;
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if file_logging_active() {
                error!("event=cli_command module=cli status=error error={err}");
            }
            eprintln!("error={err}");
            ExitCode::FAILURE
        }
    }
}

/// Log records only reach a sink once `init_logging` ran with a log dir.
fn file_logging_active() -> bool {
    logging_status().is_some()
}

fn run(cli: Cli) -> CliResult<()> {
    if let Commands::Ping = cli.command {
        println!("errdeck_core ping={}", errdeck_core::ping());
        println!("errdeck_core version={}", errdeck_core::core_version());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }
    let conn = open_db_with_options(&config.db_path, &config.db_options())?;

    match cli.command {
        Commands::Ping => Ok(()),
        Commands::AppCreate(args) => app_create(&conn, &config, args),
        Commands::AppShow(args) => app_show(&conn, args),
        Commands::Report(args) => report(&conn, args),
        Commands::Recipients(args) => recipients(&conn, &args.name),
        Commands::UserCreate(args) => user_create(&conn, args),
        Commands::Watch(args) => watch(&conn, args, true),
        Commands::Unwatch(args) => watch(&conn, args, false),
    }
}

fn resolve_config(cli: &Cli) -> CliResult<CoreConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }
    if let Some(log_dir) = cli.log_dir.clone() {
        config.log_dir = Some(log_dir);
    }
    config.validate()?;
    Ok(config)
}

fn app_create(conn: &Connection, config: &CoreConfig, args: AppCreateArgs) -> CliResult<()> {
    let mut input = NewApp::new(args.name)
        .with_github_url(args.github_url)
        .with_notify_all_users(args.notify_all_users);
    input.api_key = args.api_key;
    input.email_at_notices = config.default_email_at_notices.clone();

    let app = AppService::new(SqliteAppRepository::try_new(conn)?).create_app(input)?;
    print_app(&app);
    Ok(())
}

fn app_show(conn: &Connection, args: AppShowArgs) -> CliResult<()> {
    let service = AppService::new(SqliteAppRepository::try_new(conn)?);
    let app = match (args.name, args.api_key) {
        (Some(name), _) => service.find_app_by_name(&name)?,
        (None, Some(api_key)) => service.authenticate(&api_key)?,
        (None, None) => None,
    };

    match app {
        Some(app) => {
            print_app(&app);
            Ok(())
        }
        None => Err("app not found".into()),
    }
}

fn report(conn: &Connection, args: ReportArgs) -> CliResult<()> {
    let ingest = IngestService::new(
        AppService::new(SqliteAppRepository::try_new(conn)?),
        DedupService::new(SqliteProblemRepository::try_new(conn)?),
        NotificationService::new(SqliteUserRepository::try_new(conn)?),
    );
    let fingerprint = Fingerprint::new(args.klass, args.component, args.action, args.environment);
    let outcome = ingest.report(&args.api_key, &fingerprint)?;

    println!("app_id={}", outcome.app.id);
    println!("problem_id={}", outcome.err.problem_id);
    println!("err_id={}", outcome.err.id);
    println!("created={}", outcome.created);
    println!("notices_count={}", outcome.notices_count);
    for user in &outcome.recipients {
        println!("notify={}", user.email);
    }
    Ok(())
}

fn recipients(conn: &Connection, name: &str) -> CliResult<()> {
    let app = AppService::new(SqliteAppRepository::try_new(conn)?)
        .find_app_by_name(name)?
        .ok_or("app not found")?;
    let users = NotificationService::new(SqliteUserRepository::try_new(conn)?).recipients(&app)?;
    for user in &users {
        println!("recipient={}", user.email);
    }
    println!("count={}", users.len());
    Ok(())
}

fn user_create(conn: &Connection, args: UserCreateArgs) -> CliResult<()> {
    let email = args.email.trim();
    if email.is_empty() {
        return Err("email can't be blank".into());
    }
    let user = User::new(email, args.name.trim());
    SqliteUserRepository::try_new(conn)?.create_user(&user)?;
    println!("user_id={}", user.id);
    println!("email={}", user.email);
    Ok(())
}

fn watch(conn: &Connection, args: WatchArgs, subscribe: bool) -> CliResult<()> {
    let app = AppService::new(SqliteAppRepository::try_new(conn)?)
        .find_app_by_name(&args.app)?
        .ok_or("app not found")?;
    let users = SqliteUserRepository::try_new(conn)?;
    let user = users
        .find_user_by_email(&args.email)?
        .ok_or("user not found")?;
    let watcher = Watcher {
        app_id: app.id,
        user_id: user.id,
    };

    if subscribe {
        users.add_watcher(&watcher)?;
        println!("watching=true");
    } else {
        println!("removed={}", users.remove_watcher(&watcher)?);
    }
    println!("app_id={}", app.id);
    println!("user_id={}", user.id);
    Ok(())
}

fn print_app(app: &App) {
    println!("app_id={}", app.id);
    println!("name={}", app.name);
    println!("api_key={}", app.api_key);
    println!("github_url={}", app.github_url);
    println!("notify_all_users={}", app.notify_all_users);
    if app.has_repository() {
        println!("repository={}", app.github_url);
    }
}
