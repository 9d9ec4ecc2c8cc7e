use std::{fs, io::Cursor, path::Path};

use bigsql_runner::{
    ConsoleReporter, RunEnd, RunSession,
    config::RunConfig,
    keys::NeverCancel,
    open_connection,
    prompt::Prompter,
    runlog::RunLog,
    script::ScriptReader,
};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

fn session_for(
    db: &Path,
    script: &Path,
    log: Option<RunLog>,
) -> RunSession {
    let (session, endpoint) = open_connection(&sqlite_url(db)).unwrap();
    let reader = ScriptReader::open(script).unwrap();
    RunSession::new(session, endpoint, script.to_path_buf(), reader, log)
}

fn count_rows(db: &Path) -> i64 {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.query_row("SELECT COUNT(*) FROM T", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn runs_script_and_totals_affected_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.db");
    let script = dir.path().join("big.sql");
    fs::write(
        &script,
        "CREATE TABLE T(A INT)\nGO\nINSERT INTO T VALUES(1)\nGO\nINSERT INTO T VALUES(2)\nGO\n",
    )
    .unwrap();

    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let summary = session_for(&db, &script, None).run(&mut reporter, &mut NeverCancel);

    assert_eq!(summary.affected, 2);
    assert_eq!(summary.executed, 3);
    assert_eq!(summary.end, RunEnd::Exhausted);

    let out = String::from_utf8(reporter.into_inner()).unwrap();
    assert_eq!(
        out,
        "Running...\nAdded 1 row(s)\nAdded 2 row(s)\nCompleted\nTotal 2 rows added to database\n"
    );
    assert_eq!(count_rows(&db), 2);
}

#[test]
fn unterminated_tail_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.db");
    let script = dir.path().join("big.sql");
    fs::write(
        &script,
        "CREATE TABLE T(A INT) GO\nINSERT INTO T VALUES(1) GO\nINSERT INTO T VALUES(2)\n",
    )
    .unwrap();

    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let summary = session_for(&db, &script, None).run(&mut reporter, &mut NeverCancel);

    assert_eq!(summary.affected, 1);
    assert_eq!(count_rows(&db), 1);
}

#[test]
fn failed_batch_is_logged_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.db");
    let script = dir.path().join("big.sql");
    let log_path = dir.path().join("run.txt");
    fs::write(
        &script,
        "CREATE TABLE T(A INT) GO\nINSERT INTO Missing VALUES(1) GO\nINSERT INTO T\nVALUES(1), (2), (3)\nGO\n",
    )
    .unwrap();

    let log = RunLog::create(&log_path, &script).unwrap();
    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let summary = session_for(&db, &script, Some(log)).run(&mut reporter, &mut NeverCancel);

    assert_eq!(summary.affected, 3);
    assert_eq!(summary.failed, 1);

    let out = String::from_utf8(reporter.into_inner()).unwrap();
    assert!(out.lines().any(|line| line == "no such table: Missing"));
    assert!(!out.contains("[Error]"));
    assert!(out.contains("1 batch(es) failed"));

    let text = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[1], format!("Running {}...", script.display()));
    assert_eq!(lines[2], "no such table: Missing");
    assert_eq!(lines[3], "Completed");
    assert_eq!(lines[4], "Total 3 rows added to database");
}

#[test]
fn prompts_fill_in_missing_settings() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.db");
    let script = dir.path().join("big.sql");
    let log_path = dir.path().join("run.log");
    fs::write(&script, "CREATE TABLE T(A INT) GO\nINSERT INTO T VALUES(7) GO\n").unwrap();

    let input = format!(
        "oracle://nope\n{}\n{}\nmaybe\nyes\n{}\n",
        sqlite_url(&db),
        script.display(),
        log_path.display()
    );
    let mut prompter = Prompter::new(Cursor::new(input.into_bytes()), Vec::new());
    let session = RunSession::establish(&RunConfig::default(), &mut prompter).unwrap();

    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let summary = session.run(&mut reporter, &mut NeverCancel);
    assert_eq!(summary.affected, 1);

    let shown = String::from_utf8(prompter.into_output()).unwrap();
    assert!(shown.contains("[Error] Invalid connection field"));
    assert!(shown.contains("[Error] Please enter either of two values following: yes or no"));

    let text = fs::read_to_string(&log_path).unwrap();
    assert!(text.ends_with("Completed\nTotal 1 rows added to database\n"));
}

#[test]
fn configured_settings_skip_prompts() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.db");
    let script = dir.path().join("big.sql");
    fs::write(&script, "CREATE TABLE T(A INT) GO\n").unwrap();

    let config = RunConfig {
        connection: Some(sqlite_url(&db)),
        file: Some(script.clone()),
        log: None,
        log_enabled: Some(false),
    };
    let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new());
    let session = RunSession::establish(&config, &mut prompter).unwrap();

    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let summary = session.run(&mut reporter, &mut NeverCancel);
    assert_eq!(summary.executed, 1);
    assert!(prompter.into_output().is_empty());
}
