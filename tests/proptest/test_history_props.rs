//! Property-based tests for the history log

use morpheus_cli::HistoryLog;
use proptest::prelude::*;
use tempfile::TempDir;

fn command() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 '=-]{0,40}".prop_map(|s| s.trim_end().to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_numbers_strictly_increase(commands in prop::collection::vec(command(), 1..20)) {
        let dir = TempDir::new().unwrap();
        let mut log = HistoryLog::open(dir.path().join("shell_history"));

        let mut last = 0;
        for text in &commands {
            if let Some(number) = log.record(text, "admin@prod").unwrap() {
                prop_assert!(number > last);
                last = number;
            }
        }
        prop_assert_eq!(log.next_number(), last + 1);
    }

    #[test]
    fn test_reload_matches_memory(commands in prop::collection::vec(command(), 0..20)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shell_history");
        let mut log = HistoryLog::open(&path);
        for text in &commands {
            log.record(text, "admin@prod").unwrap();
        }

        let reloaded = HistoryLog::load(&path).unwrap();
        prop_assert_eq!(reloaded.len(), log.len());
        prop_assert_eq!(
            reloaded.paginate(None, 0, usize::MAX, true),
            log.paginate(None, 0, usize::MAX, true)
        );
    }

    #[test]
    fn test_pages_cover_everything(
        count in 0usize..40,
        max in 1usize..10,
        reverse in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let mut log = HistoryLog::open(dir.path().join("shell_history"));
        for i in 0..count {
            log.record(&format!("whoami {}", i), "ctx").unwrap();
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = log.paginate(None, offset, max, reverse);
            prop_assert!(page.len() <= max);
            if page.is_empty() {
                break;
            }
            offset += page.len();
            seen.extend(page.into_iter().map(|e| e.number));
        }
        prop_assert_eq!(seen.len(), count);
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        if !reverse {
            sorted.reverse();
        }
        prop_assert_eq!(seen, sorted);
    }
}
