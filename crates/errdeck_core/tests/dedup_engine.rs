use errdeck_core::db::{open_db, open_db_in_memory};
use errdeck_core::{
    App, AppService, DedupService, Fingerprint, NewApp, ProblemRepository, RepoError,
    SqliteAppRepository, SqliteProblemRepository,
};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

fn create_app(conn: &Connection, name: &str) -> App {
    let repo = SqliteAppRepository::try_new(conn).unwrap();
    AppService::new(repo).create_app(NewApp::new(name)).unwrap()
}

fn dedup(conn: &Connection) -> DedupService<SqliteProblemRepository<'_>> {
    DedupService::new(SqliteProblemRepository::try_new(conn).unwrap())
}

fn conditions() -> Fingerprint {
    Fingerprint::new("Whoops", "Foo", "bar", "production")
}

#[test]
fn find_err_returns_none_for_unknown_fingerprint() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    assert!(dedup(&conn).find_err(&app, &conditions()).unwrap().is_none());
}

#[test]
fn returns_the_existing_err_if_one_already_exists() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    let repo = SqliteProblemRepository::try_new(&conn).unwrap();
    let existing = repo.create_problem_with_err(app.id, &conditions()).unwrap();

    let service = dedup(&conn);
    assert_eq!(service.find_err(&app, &conditions()).unwrap(), Some(existing.clone()));

    let outcome = service.find_or_create_err(&app, &conditions()).unwrap();
    assert_eq!(outcome.err, existing);
    assert!(!outcome.created);
}

#[test]
fn assigns_the_returned_err_to_the_given_app() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    let service = dedup(&conn);

    let outcome = service.find_or_create_err(&app, &conditions()).unwrap();
    assert_eq!(outcome.err.app_id, app.id);

    let repo = SqliteProblemRepository::try_new(&conn).unwrap();
    let problem = repo.get_problem(outcome.err.problem_id).unwrap().unwrap();
    assert_eq!(problem.app_id, app.id);
    assert_eq!(problem.notices_count, 0);
}

#[test]
fn creates_a_new_problem_only_for_unseen_fingerprints() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    let service = dedup(&conn);
    assert_eq!(service.count_all_problems().unwrap(), 0);

    let first = service.find_or_create_err(&app, &conditions()).unwrap();
    assert!(first.created);
    assert_eq!(service.count_all_problems().unwrap(), 1);

    let second = service.find_or_create_err(&app, &conditions()).unwrap();
    assert!(!second.created);
    assert_eq!(second.err, first.err);
    assert_eq!(service.count_all_problems().unwrap(), 1);
}

#[test]
fn every_fingerprint_field_participates_in_matching() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    let service = dedup(&conn);
    service.find_or_create_err(&app, &conditions()).unwrap();

    let variants = [
        Fingerprint::new("Whoopsie", "Foo", "bar", "production"),
        Fingerprint::new("Whoops", "Baz", "bar", "production"),
        Fingerprint::new("Whoops", "Foo", "qux", "production"),
        Fingerprint::new("Whoops", "Foo", "bar", "staging"),
        Fingerprint::new("whoops", "Foo", "bar", "production"),
    ];
    for variant in &variants {
        let outcome = service.find_or_create_err(&app, variant).unwrap();
        assert!(outcome.created, "expected new problem for {variant:?}");
    }
    assert_eq!(service.count_problems(&app).unwrap(), 1 + variants.len() as u64);
}

#[test]
fn identical_fingerprints_in_different_apps_are_separate_problems() {
    let conn = open_db_in_memory().unwrap();
    let first_app = create_app(&conn, "First");
    let second_app = create_app(&conn, "Second");
    let service = dedup(&conn);

    let first = service.find_or_create_err(&first_app, &conditions()).unwrap();
    let second = service.find_or_create_err(&second_app, &conditions()).unwrap();

    assert!(first.created);
    assert!(second.created);
    assert_ne!(first.err.problem_id, second.err.problem_id);
    assert_eq!(service.count_problems(&first_app).unwrap(), 1);
    assert_eq!(service.count_problems(&second_app).unwrap(), 1);
}

#[test]
fn racing_create_reports_conflict_and_keeps_one_pair() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    let repo = SqliteProblemRepository::try_new(&conn).unwrap();

    repo.create_problem_with_err(app.id, &conditions()).unwrap();
    let err = repo
        .create_problem_with_err(app.id, &conditions())
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    // The losing problem row must have been rolled back with its err.
    assert_eq!(repo.count_problems(app.id).unwrap(), 1);
    let errs: i64 = conn
        .query_row("SELECT COUNT(*) FROM errs;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(errs, 1);
}

#[test]
fn create_for_unknown_app_leaves_no_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProblemRepository::try_new(&conn).unwrap();
    let missing = uuid::Uuid::new_v4();

    let err = repo
        .create_problem_with_err(missing, &conditions())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "app", id } if id == missing));
    assert_eq!(repo.count_all_problems().unwrap(), 0);
}

#[test]
fn record_notice_increments_problem_counter() {
    let conn = open_db_in_memory().unwrap();
    let app = create_app(&conn, "Errdeck");
    let service = dedup(&conn);
    let outcome = service.find_or_create_err(&app, &conditions()).unwrap();

    assert_eq!(service.record_notice(&outcome.err).unwrap().notices_count, 1);
    let problem = service.record_notice(&outcome.err).unwrap();
    assert_eq!(problem.notices_count, 2);
    assert!(problem.last_notice_at.is_some());
}

#[test]
fn concurrent_first_sightings_create_exactly_one_problem() {
    const WORKERS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errdeck.sqlite3");
    let app = {
        let conn = open_db(&path).unwrap();
        create_app(&conn, "Errdeck")
    };

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let path = path.clone();
            let app = app.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = dedup(&conn);
                barrier.wait();
                service.find_or_create_err(&app, &conditions()).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let created = outcomes.iter().filter(|outcome| outcome.created).count();
    assert_eq!(created, 1);

    let problem_ids: HashSet<_> = outcomes
        .iter()
        .map(|outcome| outcome.err.problem_id)
        .collect();
    assert_eq!(problem_ids.len(), 1);

    let conn = open_db(&path).unwrap();
    assert_eq!(dedup(&conn).count_problems(&app).unwrap(), 1);
}
