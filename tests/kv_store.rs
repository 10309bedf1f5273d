use logkv::{CommandLog, KvStore, KvsEngine, KvsError, Operation, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn log_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("commands.log")
}

fn log_lines(temp_dir: &TempDir) -> Vec<String> {
    fs::read_to_string(log_path(temp_dir))
        .expect("unable to read the command log")
        .lines()
        .map(str::to_owned)
        .collect()
}

// Should get previously stored value
#[test]
fn set_then_get() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;

    assert_eq!(store.execute("set foo bar", true)?, "set foo to bar");
    assert_eq!(log_lines(&temp_dir).len(), 1);
    assert_eq!(store.execute("get foo", true)?, "bar");

    // Open from disk again and check persistent data
    drop(store);
    let mut store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.execute("get foo", true)?, "bar");

    Ok(())
}

#[test]
fn get_missing_key() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    match store.execute("get missing", true) {
        Err(KvsError::KeyNotFound(key)) => assert_eq!(key, "missing"),
        other => panic!("expected KeyNotFound, got {:?}", other),
    }
    Ok(())
}

#[test]
fn delete_key() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set foo bar", true)?;
    assert_eq!(store.execute("delete foo", true)?, "deleted foo");
    assert!(store.execute("get foo", true).is_err());

    match store.execute("delete foo", true) {
        Err(KvsError::KeyNotFound(key)) => assert_eq!(key, "foo"),
        other => panic!("expected KeyNotFound, got {:?}", other),
    }
    // A failed delete never reaches the log
    assert_eq!(log_lines(&temp_dir).len(), 2);
    Ok(())
}

#[test]
fn deleted_key_stays_deleted_after_restart() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set foo bar", true)?;
    store.execute("get foo", true)?;
    store.execute("delete foo", true)?;
    assert!(store.execute("get foo", true).is_err());

    drop(store);
    let mut store = KvStore::open(log_path(&temp_dir))?;
    assert!(store.is_empty());
    assert!(store.execute("get foo", true).is_err());
    Ok(())
}

#[test]
fn overwrite_value() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;

    store.execute("set key1 value1", true)?;
    store.execute("set key1 value2", true)?;
    assert_eq!(store.get("key1")?, "value2");

    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.get("key1")?, "value2");
    Ok(())
}

#[test]
fn show_lists_every_pair() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set a 1", true)?;
    store.execute("set b 2", true)?;

    let shown = store.execute("show", true)?;
    assert!(shown.contains("a:1"));
    assert!(shown.contains("b:2"));
    assert_eq!(shown, "database is: {a:1, b:2}");
    Ok(())
}

#[test]
fn reads_are_idempotent() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set a 1", true)?;
    let log_before = log_lines(&temp_dir);

    let shown = store.execute("show", true)?;
    for _ in 0..5 {
        assert_eq!(store.execute("show", true)?, shown);
        assert_eq!(store.execute("get a", true)?, "1");
        assert!(store.execute("get b", true).is_err());
    }
    assert_eq!(store.len(), 1);
    assert_eq!(log_lines(&temp_dir), log_before);
    Ok(())
}

#[test]
fn missing_arguments() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;

    match store.execute("get", true) {
        Err(KvsError::MissingKey(command)) => assert_eq!(command, "get"),
        other => panic!("expected MissingKey, got {:?}", other),
    }
    match store.execute("delete", true) {
        Err(KvsError::MissingKey(_)) => {}
        other => panic!("expected MissingKey, got {:?}", other),
    }
    match store.execute("set foo", true) {
        Err(KvsError::MissingValue(command)) => assert_eq!(command, "set"),
        other => panic!("expected MissingValue, got {:?}", other),
    }
    match store.execute("set a b c", true) {
        Err(KvsError::MalformedOperation(_)) => {}
        other => panic!("expected MalformedOperation, got {:?}", other),
    }
    assert!(store.is_empty());
    assert!(log_lines(&temp_dir).is_empty());
    Ok(())
}

#[test]
fn unknown_command_is_soft() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.execute("frobnicate foo bar", true)?, "invalid command");
    assert_eq!(store.execute("", true)?, "invalid command");
    assert!(log_lines(&temp_dir).is_empty());
    Ok(())
}

#[test]
fn commands_are_case_insensitive() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("SET foo bar", true)?;
    assert_eq!(store.execute("Get foo", true)?, "bar");
    assert_eq!(store.execute(&b"DELETE foo"[..], true)?, "deleted foo");
    Ok(())
}

#[test]
fn unpersisted_operations_are_not_logged() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set foo bar", false)?;
    assert_eq!(store.get("foo")?, "bar");
    assert!(log_lines(&temp_dir).is_empty());

    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert!(store.is_empty());
    Ok(())
}

// Replaying the log must rebuild exactly the map built by direct execution.
#[test]
fn replay_matches_direct_execution() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    for i in 0..200 {
        store.execute(format!("set key{} value{}", i % 37, i), true)?;
        if i % 5 == 0 {
            let _ = store.execute(format!("delete key{}", (i * 7) % 37), true);
        }
    }
    let expected = store.show();
    let expected_len = store.len();

    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.show(), expected);
    assert_eq!(store.len(), expected_len);
    Ok(())
}

#[test]
fn replay_does_not_append() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set a 1", true)?;
    store.execute("set b 2", true)?;
    let before = log_lines(&temp_dir);

    drop(store);
    KvStore::open(log_path(&temp_dir))?;
    KvStore::open(log_path(&temp_dir))?;
    assert_eq!(log_lines(&temp_dir), before);
    Ok(())
}

// An entry that reached the log but was never applied in memory is applied
// on the next open.
#[test]
fn logged_but_unapplied_operation_is_recovered() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set a 1", true)?;

    let mut log = CommandLog::open(log_path(&temp_dir))?;
    log.append(&Operation::parse("set a 2")?)?;
    log.append(&Operation::parse("delete a")?)?;
    log.append(&Operation::parse("set b 3")?)?;
    assert_eq!(store.get("a")?, "1");

    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert!(store.get("a").is_err());
    assert_eq!(store.get("b")?, "3");
    Ok(())
}

#[test]
fn open_creates_log_file_and_directories() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("nested").join("dir").join("commands.log");
    let store = KvStore::open(&path)?;
    assert!(path.is_file());
    assert_eq!(store.log_path(), path.as_path());
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn reads_log_written_elsewhere() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    fs::write(
        log_path(&temp_dir),
        concat!(
            r#"{"command": "set", "key": "foo", "value": "bar"}"#,
            "\n",
            r#"{"command": "get", "key": "foo", "value": null}"#,
            "\n",
            r#"{"command": "delete", "key": "foo", "value": null}"#,
            "\n",
            r#"{"command": "get", "key": "foo", "value": null}"#,
            "\n",
            r#"{"command": "SET", "key": "a", "value": "1"}"#,
            "\n",
        ),
    )?;

    let store = KvStore::open(log_path(&temp_dir))?;
    assert!(store.get("foo").is_err());
    assert_eq!(store.get("a")?, "1");
    assert_eq!(store.len(), 1);
    Ok(())
}

#[test]
fn torn_tail_is_truncated() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set a 1", true)?;
    drop(store);

    let mut file = OpenOptions::new().append(true).open(log_path(&temp_dir))?;
    file.write_all(br#"{"command":"set","key":"b","va"#)?;
    drop(file);

    let mut store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.get("a")?, "1");
    assert!(store.get("b").is_err());
    assert_eq!(log_lines(&temp_dir).len(), 1);

    // Later appends start on a fresh line
    store.execute("set c 3", true)?;
    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.get("c")?, "3");
    assert_eq!(log_lines(&temp_dir).len(), 2);
    Ok(())
}

// A complete entry that only lacks its newline is still applied
#[test]
fn unterminated_valid_last_entry_is_kept() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    fs::write(
        log_path(&temp_dir),
        "{\"command\":\"set\",\"key\":\"a\",\"value\":\"1\"}\n{\"command\":\"set\",\"key\":\"b\",\"value\":\"2\"}",
    )?;

    let mut store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.get("a")?, "1");
    assert_eq!(store.get("b")?, "2");
    let content = fs::read_to_string(log_path(&temp_dir))?;
    assert!(content.ends_with("\"value\":\"2\"}\n"));
    assert_eq!(log_lines(&temp_dir).len(), 2);

    store.execute("set c 3", true)?;
    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert_eq!(store.get("b")?, "2");
    assert_eq!(store.get("c")?, "3");
    assert_eq!(log_lines(&temp_dir).len(), 3);
    Ok(())
}

#[test]
fn corrupt_line_fails_open() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    fs::write(
        log_path(&temp_dir),
        "{\"command\":\"set\",\"key\":\"a\",\"value\":\"1\"}\nnot json\n{\"command\":\"show\"}\n",
    )?;
    match KvStore::open(log_path(&temp_dir)) {
        Err(KvsError::CorruptLog { line }) => assert_eq!(line, 2),
        Err(e) => panic!("expected CorruptLog, got {:?}", e),
        Ok(_) => panic!("expected CorruptLog, got a store"),
    }
    Ok(())
}

// The typed accessors work on memory only; `execute` does the logging
#[test]
fn typed_set_and_delete() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;

    store.set("a".to_owned(), "1".to_owned());
    store.set("a".to_owned(), "2".to_owned());
    assert_eq!(store.get("a")?, "2");
    assert_eq!(store.len(), 1);

    store.delete("a")?;
    assert!(store.is_empty());
    match store.delete("a") {
        Err(KvsError::KeyNotFound(key)) => assert_eq!(key, "a"),
        other => panic!("expected KeyNotFound, got {:?}", other),
    }
    assert!(log_lines(&temp_dir).is_empty());

    drop(store);
    let store = KvStore::open(log_path(&temp_dir))?;
    assert!(store.get("a").is_err());
    Ok(())
}

#[test]
fn failed_delete_is_not_logged() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut store = KvStore::open(log_path(&temp_dir))?;
    store.execute("set a 1", true)?;
    match store.execute("delete b", true) {
        Err(KvsError::KeyNotFound(key)) => assert_eq!(key, "b"),
        other => panic!("expected KeyNotFound, got {:?}", other),
    }
    assert_eq!(store.execute("delete a", true)?, "deleted a");
    assert_eq!(log_lines(&temp_dir).len(), 2);
    Ok(())
}
