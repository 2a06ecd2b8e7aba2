use errdeck_core::db::open_db_in_memory;
use errdeck_core::{
    App, AppService, DedupService, Fingerprint, IngestError, IngestService, NewApp,
    NotificationService, SqliteAppRepository, SqliteProblemRepository, SqliteUserRepository,
    User, UserRepository, Watcher,
};
use rusqlite::Connection;

type SqliteIngest<'conn> = IngestService<
    SqliteAppRepository<'conn>,
    SqliteProblemRepository<'conn>,
    SqliteUserRepository<'conn>,
>;

fn ingest(conn: &Connection) -> SqliteIngest<'_> {
    IngestService::new(
        AppService::new(SqliteAppRepository::try_new(conn).unwrap()),
        DedupService::new(SqliteProblemRepository::try_new(conn).unwrap()),
        NotificationService::new(SqliteUserRepository::try_new(conn).unwrap()),
    )
}

fn setup_watched_app(conn: &Connection, input: NewApp) -> (App, User) {
    let app = AppService::new(SqliteAppRepository::try_new(conn).unwrap())
        .create_app(input)
        .unwrap();
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let user = User::new("oncall@example.com", "On Call");
    users.create_user(&user).unwrap();
    users
        .add_watcher(&Watcher {
            app_id: app.id,
            user_id: user.id,
        })
        .unwrap();
    (app, user)
}

fn report() -> Fingerprint {
    Fingerprint::new("NoMethodError", "users", "show", "production")
}

#[test]
fn unknown_api_key_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = ingest(&conn)
        .report("0123456789abcdef0123456789abcdef", &report())
        .unwrap_err();
    assert!(matches!(err, IngestError::UnknownApiKey));
}

#[test]
fn first_occurrence_opens_problem_and_alerts_watchers() {
    let conn = open_db_in_memory().unwrap();
    let (app, user) = setup_watched_app(&conn, NewApp::new("Errdeck"));

    let outcome = ingest(&conn).report(&app.api_key, &report()).unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.app.id, app.id);
    assert_eq!(outcome.err.app_id, app.id);
    assert_eq!(outcome.notices_count, 1);
    assert_eq!(outcome.recipients, vec![user]);
}

#[test]
fn repeated_occurrences_alert_only_at_thresholds() {
    let conn = open_db_in_memory().unwrap();
    let (app, _) = setup_watched_app(&conn, NewApp::new("Errdeck"));
    let service = ingest(&conn);

    let mut alerted_at = Vec::new();
    let mut problem_ids = std::collections::HashSet::new();
    for _ in 0..10 {
        let outcome = service.report(&app.api_key, &report()).unwrap();
        problem_ids.insert(outcome.err.problem_id);
        if !outcome.recipients.is_empty() {
            alerted_at.push(outcome.notices_count);
        }
    }

    assert_eq!(problem_ids.len(), 1);
    assert_eq!(alerted_at, vec![1, 10]);
}

#[test]
fn disabled_notifications_never_resolve_recipients() {
    let conn = open_db_in_memory().unwrap();
    let mut input = NewApp::new("Muted");
    input.notify_on_errs = false;
    let (app, _) = setup_watched_app(&conn, input);

    let outcome = ingest(&conn).report(&app.api_key, &report()).unwrap();
    assert!(outcome.created);
    assert!(outcome.recipients.is_empty());
}

#[test]
fn fingerprint_parses_from_report_json() {
    let conn = open_db_in_memory().unwrap();
    let (app, _) = setup_watched_app(&conn, NewApp::new("Errdeck"));
    let body = r#"{
        "klass": "NoMethodError",
        "component": "users",
        "action": "show",
        "environment": "production"
    }"#;

    let fingerprint: Fingerprint = serde_json::from_str(body).unwrap();
    assert_eq!(fingerprint, report());

    let service = ingest(&conn);
    let first = service.report(&app.api_key, &fingerprint).unwrap();
    let second = service.report(&app.api_key, &report()).unwrap();
    assert_eq!(first.err, second.err);
    assert!(!second.created);
}
