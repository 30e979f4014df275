//! Integration tests for temporary shell sessions
//!
//! `shell -Z` works on a copy of the home directory and `shell -z` on an
//! empty one; leaving either deletes it and restores the parent.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::fs;

use morpheus_cli::{HistoryLog, SessionContext, ShellArgs};
use test_utils::{home_with_remote, sandbox_dirs, shell, shell_with};

#[tokio::test]
async fn test_temporary_session_isolation() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    assert!(t.shell.execute("shell -Z").await.is_success());
    assert_eq!(t.shell.sessions().depth(), 2);
    assert!(t.output().contains("Starting temporary shell session shell-"));

    let sandbox_home = t.shell.session().home.clone();
    assert!(sandbox_home.starts_with(home.path().join("tmp")));
    assert!(sandbox_home.is_dir());

    // The copy starts with the parent's remotes and history
    t.out.clear();
    assert!(t.shell.execute("remote current").await.is_success());
    assert!(t.output().contains("local https://appliance.test"));
    assert_eq!(t.shell.session().history.len(), 3);

    assert!(t
        .shell
        .execute("remote add other https://other.test --use")
        .await
        .is_success());
    assert_eq!(t.shell.render_prompt(), "morpheus[other]> ");

    assert!(t.shell.execute("exit").await.is_success());
    assert_eq!(t.shell.sessions().depth(), 1);
    assert!(!t.shell.is_terminated());
    assert!(!sandbox_home.exists());
    assert!(t.output().contains("Exited temporary shell session shell-"));

    // Nothing done in the sandbox reached the parent
    assert_eq!(t.shell.render_prompt(), "morpheus[local]> ");
    let reloaded = SessionContext::load(home.path()).unwrap();
    assert!(reloaded.remotes.get("other").is_none());
    let history = HistoryLog::load(home.path().join("shell_history")).unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_clean_session_starts_empty() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    assert!(t.shell.execute("shell -z").await.is_success());
    assert!(t.shell.session().history.is_empty());
    assert!(t.shell.session().remotes.active().is_none());

    let outcome = t.shell.execute("remote current").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("No remote appliance is active"));

    t.shell.execute("exit").await;
    assert!(t.shell.execute("remote current").await.is_success());
    assert!(sandbox_dirs(home.path()).is_empty());
}

#[tokio::test]
async fn test_nested_sessions() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("shell -Z").await;
    t.shell.execute("shell -Z").await;
    assert_eq!(t.shell.sessions().depth(), 3);
    assert_eq!(sandbox_dirs(home.path()).len(), 1);

    t.shell.execute("exit").await;
    assert_eq!(t.shell.sessions().depth(), 2);
    t.shell.execute("exit").await;
    assert_eq!(t.shell.sessions().depth(), 1);
    assert!(!t.shell.is_terminated());

    t.shell.execute("exit").await;
    assert!(t.shell.is_terminated());
    assert!(sandbox_dirs(home.path()).is_empty());
}

#[tokio::test]
async fn test_aliases_carry_into_temporary_session() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("alias add rc 'remote current'").await;
    t.shell.execute("shell -Z").await;
    assert_eq!(t.shell.session().aliases.get("rc"), Some("remote current"));
    t.shell.execute("exit").await;

    t.shell.execute("shell -z").await;
    assert!(t.shell.session().aliases.get("rc").is_none());
}

#[tokio::test]
async fn test_temporary_flag_on_start() {
    let home = home_with_remote();
    let mut t = shell(home.path());
    let args = ShellArgs {
        temporary: true,
        norc: true,
        exec: Some("remote current".into()),
        ..ShellArgs::default()
    };

    let code = t.shell.run(&args).await.unwrap();
    assert_eq!(code, 0);
    assert!(t.output().contains("local https://appliance.test"));
    assert_eq!(t.shell.sessions().depth(), 1);
    assert!(sandbox_dirs(home.path()).is_empty());

    let history = HistoryLog::load(home.path().join("shell_history")).unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_end_of_input_leaves_sandbox_first() {
    let home = home_with_remote();
    let mut t = shell_with(home.path(), &["shell -Z"], "");
    let args = ShellArgs {
        norc: true,
        ..ShellArgs::default()
    };

    let code = t.shell.run(&args).await.unwrap();
    assert_eq!(code, 0);
    assert!(t.output().contains("Exited temporary shell session"));
    assert!(t.shell.is_terminated());
    assert!(sandbox_dirs(home.path()).is_empty());
}

#[tokio::test]
async fn test_exec_in_sandbox_from_shell() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("shell -Z -e 'remote current'").await;
    assert!(outcome.is_success());
    assert!(t.output().contains("local https://appliance.test"));
    assert_eq!(t.shell.sessions().depth(), 1);
    assert!(!t.shell.is_terminated());
}

fn snapshot(home: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(home)
        .unwrap()
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| {
            (
                e.file_name().to_string_lossy().into_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_parent_files_unchanged_with_custom_history_file() {
    let home = home_with_remote();
    fs::write(
        home.path().join("config.toml"),
        "[shell]\nhistory_file = \"audit_history\"\n",
    )
    .unwrap();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    t.shell.execute("whoami --help").await;
    let before = snapshot(home.path());
    assert!(before.iter().any(|(name, _)| name == "audit_history"));

    assert!(t.shell.execute("shell -Z").await.is_success());
    assert_eq!(t.shell.session().history.len(), 3);
    t.shell.execute("remote list").await;
    t.shell.execute("exit").await;

    assert_eq!(t.shell.sessions().depth(), 1);
    assert!(!home.path().join("tmp").exists());

    // Only the `shell -Z` line itself reached the parent's log
    let after = snapshot(home.path());
    assert_eq!(after.len(), before.len());
    for ((name, old), (_, new)) in before.iter().zip(&after) {
        if name == "audit_history" {
            let appended = String::from_utf8_lossy(&new[old.len()..]).into_owned();
            assert!(new.starts_with(old));
            assert_eq!(appended, "admin@local -- : (cmd 3) shell -Z\n");
        } else {
            assert_eq!(old, new, "{} changed", name);
        }
    }
}

#[tokio::test]
async fn test_history_file_outside_home_is_ignored() {
    let home = home_with_remote();
    let outside = tempfile::TempDir::new().unwrap();
    let outside_log = outside.path().join("abs_history");
    fs::write(&outside_log, "admin@local -- : (cmd 1) whoami\n").unwrap();
    fs::write(
        home.path().join("config.toml"),
        format!("[shell]\nhistory_file = {:?}\n", outside_log.display().to_string()),
    )
    .unwrap();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    t.shell.execute("shell -Z").await;
    t.shell.execute("remote list").await;
    t.shell.execute("exit").await;

    // The invalid setting falls back to the default log inside the home
    assert_eq!(
        fs::read_to_string(&outside_log).unwrap(),
        "admin@local -- : (cmd 1) whoami\n"
    );
    let history = HistoryLog::load(home.path().join("shell_history")).unwrap();
    assert_eq!(history.len(), 2);
}
