//! Unit tests for the history log file

use std::fs;

use morpheus_cli::history::HistoryEntry;
use morpheus_cli::{Error, HistoryLog};
use tempfile::TempDir;

#[test]
fn test_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shell_history");

    let mut log = HistoryLog::open(&path);
    log.record("remote use prod", "admin@prod").unwrap();
    log.record("certificates list --max 5", "admin@prod").unwrap();
    log.record("whoami", "admin@prod").unwrap();

    let reloaded = HistoryLog::load(&path).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded.get(2), Some("certificates list --max 5"));
    assert_eq!(
        reloaded.last(),
        Some(HistoryEntry {
            number: 3,
            text: "whoami".into()
        })
    );
    assert_eq!(reloaded.next_number(), 4);
}

#[test]
fn test_numbers_continue_after_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shell_history");
    fs::write(&path, "admin@prod -- : (cmd 41) whoami\n").unwrap();

    let mut log = HistoryLog::load(&path).unwrap();
    assert_eq!(log.record("remote list", "admin@prod").unwrap(), Some(42));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with("admin@prod -- : (cmd 42) remote list\n"));
}

#[test]
fn test_multiline_text_stays_on_one_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shell_history");

    let mut log = HistoryLog::open(&path);
    log.record("cypher put key 'a\nb'", "ctx").unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert_eq!(HistoryLog::load(&path).unwrap().len(), 1);
}

#[test]
fn test_text_with_separator() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shell_history");

    let mut log = HistoryLog::open(&path);
    log.record("alias add x 'a -- : (cmd 9) b'", "ctx").unwrap();

    let reloaded = HistoryLog::load(&path).unwrap();
    assert_eq!(reloaded.get(1), Some("alias add x 'a -- : (cmd 9) b'"));
    assert_eq!(reloaded.next_number(), 2);
}

#[test]
fn test_history_dedup_is_narrow() {
    let dir = TempDir::new().unwrap();
    let mut log = HistoryLog::open(dir.path().join("shell_history"));

    log.record("history -m 5", "ctx").unwrap();
    log.record("history -m 5", "ctx").unwrap();
    log.record("history -m 10", "ctx").unwrap();
    log.record("remote list", "ctx").unwrap();
    log.record("remote list", "ctx").unwrap();
    assert_eq!(log.len(), 4);
}

#[test]
fn test_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let log = HistoryLog::load(dir.path().join("nested").join("shell_history")).unwrap();
    assert!(log.is_empty());
    assert!(log.paginate(None, 0, 10, false).is_empty());
}

#[test]
fn test_flush_then_record_restarts_numbering() {
    let dir = TempDir::new().unwrap();
    let mut log = HistoryLog::open(dir.path().join("shell_history"));
    assert!(matches!(log.flush(), Err(Error::HistoryFileMissing(_))));

    log.record("whoami", "ctx").unwrap();
    log.record("remote list", "ctx").unwrap();
    log.flush().unwrap();

    assert_eq!(log.record("whoami", "ctx").unwrap(), Some(1));
    assert_eq!(HistoryLog::load(log.path()).unwrap().len(), 1);
}
