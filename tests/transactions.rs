use sqlite_object::{Database, Params, Result, SqliteError, Value};
use std::panic::{self, AssertUnwindSafe};
use tempfile::NamedTempFile;

fn create_temp_db() -> Result<(Database, NamedTempFile)> {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = Database::open(temp_file.path())?;
    db.execute(
        "CREATE TABLE tests (test_id INTEGER PRIMARY KEY, title TEXT NOT NULL, description TEXT)",
        &[],
    )?;
    db.set_table("tests");
    Ok((db, temp_file))
}

fn title(value: &str) -> Params {
    Params::new().with_value("title", value)
}

#[test]
fn test_failed_unit_of_work_rolls_back() -> Result<()> {
    let (mut db, _file) = create_temp_db()?;

    let result: Result<()> = db.run_in_transaction(|db| {
        db.insert(&title("transaction test"))?;
        db.insert(&Params::new().with_value("unknown_column_causing_exception", "transaction test"))?;
        db.insert(&title("transaction test"))?;
        Ok(())
    });

    let err = result.unwrap_err();
    assert_eq!(
        err.sqlite_message().as_deref(),
        Some("table tests has no column named unknown_column_causing_exception")
    );
    assert!(db.is_auto_commit());
    assert_eq!(db.count(&title("transaction test"))?, 0);
    Ok(())
}

#[test]
fn test_successful_unit_of_work_commits() -> Result<()> {
    let (mut db, file) = create_temp_db()?;

    let inserted = db.run_in_transaction(|db| {
        assert!(!db.is_auto_commit());
        for _ in 0..3 {
            db.insert(&title("transaction test"))?;
        }
        Ok::<_, SqliteError>(3)
    })?;
    assert_eq!(inserted, 3);
    assert!(db.is_auto_commit());

    // Visible from a second connection, so it really was committed
    let mut other = Database::open(file.path())?;
    other.set_table("tests");
    assert_eq!(other.count(&title("transaction test"))?, 3);
    Ok(())
}

#[test]
fn test_caller_error_type_is_preserved() -> Result<()> {
    #[derive(Debug)]
    enum AppError {
        Db(SqliteError),
        Rejected(&'static str),
    }

    impl From<SqliteError> for AppError {
        fn from(err: SqliteError) -> Self {
            AppError::Db(err)
        }
    }

    let (mut db, _file) = create_temp_db()?;
    let result: std::result::Result<(), AppError> = db.run_in_transaction(|db| {
        db.insert(&title("kept out"))?;
        Err(AppError::Rejected("business rule"))
    });

    assert!(matches!(result, Err(AppError::Rejected("business rule"))));
    assert_eq!(db.count(&title("kept out"))?, 0);

    let result: std::result::Result<(), AppError> =
        db.run_in_transaction(|db| db.delete("title = ?", &[]).map_err(AppError::from));
    assert!(matches!(
        result,
        Err(AppError::Db(SqliteError::PlaceholderMismatch { .. }))
    ));
    Ok(())
}

#[test]
fn test_nested_transaction_is_rejected() -> Result<()> {
    let (mut db, _file) = create_temp_db()?;

    let result: Result<()> = db.run_in_transaction(|db| {
        db.insert(&title("outer"))?;
        db.run_in_transaction(|db| db.insert(&title("inner")))
    });

    assert!(matches!(result, Err(SqliteError::TransactionActive)));
    // The outer unit failed with the nested error, so nothing stays.
    assert_eq!(db.count(&Params::new())?, 0);
    Ok(())
}

#[test]
fn test_panic_rolls_back() -> Result<()> {
    let (mut db, _file) = create_temp_db()?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Result<()> = db.run_in_transaction(|db| {
            db.insert(&title("panicked"))?;
            panic!("boom");
        });
    }));
    assert!(outcome.is_err());

    assert!(db.is_auto_commit());
    assert_eq!(db.count(&title("panicked"))?, 0);

    // The database is still usable
    db.insert(&title("after"))?;
    assert_eq!(db.count(&title("after"))?, 1);
    Ok(())
}

#[test]
fn test_writes_outside_transaction_commit_immediately() -> Result<()> {
    let (mut db, file) = create_temp_db()?;
    db.insert(&title("auto"))?;

    let mut other = Database::open(file.path())?;
    other.set_table("tests");
    assert_eq!(other.count(&title("auto"))?, 1);
    Ok(())
}

#[test]
fn test_execute_commit_commits_hand_opened_transaction() -> Result<()> {
    let (mut db, file) = create_temp_db()?;
    db.execute("BEGIN", &[])?;
    db.execute_commit("INSERT INTO tests (title) VALUES (?)", &[Value::from("by hand")])?;
    assert!(db.is_auto_commit());

    let mut other = Database::open(file.path())?;
    other.set_table("tests");
    assert_eq!(other.count(&title("by hand"))?, 1);
    Ok(())
}

#[test]
fn test_execute_commit_inside_transaction_waits() -> Result<()> {
    let (mut db, file) = create_temp_db()?;
    let mut other = Database::open(file.path())?;
    other.set_table("tests");

    let seen_during = db.run_in_transaction(|db| {
        db.execute_commit("INSERT INTO tests (title) VALUES (?)", &[Value::from("deferred")])?;
        assert!(!db.is_auto_commit());
        other.count(&title("deferred"))
    })?;
    assert_eq!(seen_during, 0);
    assert_eq!(other.count(&title("deferred"))?, 1);
    Ok(())
}
