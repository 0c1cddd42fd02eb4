use sqlite_object::shared::{self, SharedDatabase};
use sqlite_object::{Database, Params, Result};
use std::thread;
use tempfile::NamedTempFile;

#[test]
fn test_global_first_call_wins() -> Result<()> {
    let first_file = NamedTempFile::new().unwrap();
    let second_file = NamedTempFile::new().unwrap();

    // Race the first construction from several threads
    let path = first_file.path().to_path_buf();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || shared::global(&path))
        })
        .collect();
    let databases = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Result<Vec<_>>>()?;
    for database in &databases[1..] {
        assert!(database.ptr_eq(&databases[0]));
    }

    // A different path later still returns the first instance
    let again = shared::global(second_file.path())?;
    assert!(again.ptr_eq(&databases[0]));

    again.with(|db| db.execute("CREATE TABLE t (x INTEGER)", &[]))?;
    let seen = databases[0].with(|db| db.fetch_all_by_query("SELECT name FROM sqlite_master", &[]))?;
    assert_eq!(seen.len(), 1);
    Ok(())
}

#[test]
fn test_shared_database_across_threads() -> Result<()> {
    let mut database = Database::open_in_memory()?;
    database.execute("CREATE TABLE hits (worker INTEGER NOT NULL)", &[])?;
    database.set_table("hits");
    let shared = SharedDatabase::new(database);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    shared.with(|db| db.insert(&Params::new().with_value("worker", worker)))?;
                }
                Ok::<_, sqlite_object::SqliteError>(())
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap()?;
    }

    assert_eq!(shared.with(|db| db.count(&Params::new()))?, 20);
    assert_eq!(
        shared.with(|db| db.count(&Params::new().with_value("worker", 2)))?,
        5
    );
    Ok(())
}
