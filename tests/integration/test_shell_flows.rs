//! Integration tests for interactive shell flows
//!
//! Drives a shell with scripted lines and checks output, exit codes and
//! what ends up in the history log.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::fs;

use morpheus_cli::config::{PROFILE_FILE, RC_FILE};
use morpheus_cli::shell::completion::CompletionProvider;
use morpheus_cli::{HistoryLog, ShellArgs};
use test_utils::{home_with_remote, shell, shell_with};

fn norc() -> ShellArgs {
    ShellArgs {
        norc: true,
        ..ShellArgs::default()
    }
}

#[tokio::test]
async fn test_help_lists_every_command_once() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("help").await;
    assert!(outcome.is_success());

    let output = t.output();
    for name in t.shell.registry().command_names() {
        let count = output
            .lines()
            .filter(|line| line.split_whitespace().next() == Some(name))
            .count();
        assert_eq!(count, 1, "'{}' should be listed once in:\n{}", name, output);
    }
    assert!(output.contains("Shell commands"));
}

#[tokio::test]
async fn test_help_for_one_command() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    assert!(t.shell.execute("help certificates").await.is_success());
    assert!(t.output().contains("Usage: morpheus certificates"));

    let outcome = t.shell.execute("help frobnicate").await;
    assert_eq!(outcome.code, 1);
}

#[tokio::test]
async fn test_empty_line_and_exit_log_nothing() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    assert!(t.shell.execute("").await.is_success());
    assert!(t.shell.execute("    ").await.is_success());
    assert!(t.shell.execute("exit").await.is_success());

    assert!(t.shell.is_terminated());
    assert!(t.shell.session().history.is_empty());
    let log = HistoryLog::load(home.path().join("shell_history")).unwrap();
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_unknown_command_continues() {
    let home = home_with_remote();
    let mut t = shell_with(
        home.path(),
        &["frobnicate now", "remote current", "exit 3"],
        "",
    );

    let code = t.shell.run(&norc()).await.unwrap();
    assert_eq!(code, 3);
    assert!(t
        .errors()
        .contains("'frobnicate' is not a recognized command"));
    assert!(t.output().contains("local https://appliance.test"));
}

#[tokio::test]
async fn test_unknown_command_exit_code() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("frobnicate").await;
    assert_ne!(outcome.code, 0);
    assert!(!t.shell.is_terminated());

    // The failing line is still in history
    assert_eq!(t.shell.session().history.len(), 1);
}

#[tokio::test]
async fn test_parse_error_continues() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("remote current 'oops").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("Failed to parse input"));
    assert!(!t.shell.is_terminated());
}

#[tokio::test]
async fn test_bang_bang_runs_previous_command() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    t.shell.execute("coloring off").await;
    t.out.clear();

    let outcome = t.shell.execute("!!").await;
    assert!(outcome.is_success());
    assert!(t.output().contains("Coloring is off"));

    // `!!` resolved to the line before it, and the expansion was logged
    let history = &t.shell.session().history;
    assert_eq!(history.len(), 3);
    let last = history.last().unwrap();
    assert_eq!(last.number, 3);
    assert_eq!(last.text, "coloring off");
}

#[tokio::test]
async fn test_bang_number_recall() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    t.shell.execute("coloring off").await;
    t.out.clear();

    assert!(t.shell.execute("!1").await.is_success());
    assert!(t.output().contains("local https://appliance.test"));
    assert_eq!(t.shell.session().history.last().unwrap().text, "remote current");
}

#[tokio::test]
async fn test_bang_number_not_found() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("!42").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("Command not found in history: 42"));
    assert!(!t.shell.is_terminated());
    assert!(t.shell.session().history.is_empty());
}

#[tokio::test]
async fn test_history_command_not_logged_twice() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("history").await;
    t.shell.execute("history").await;
    assert_eq!(t.shell.session().history.len(), 1);

    t.shell.execute("remote current").await;
    t.shell.execute("history").await;
    assert_eq!(t.shell.session().history.len(), 3);

    // Repeats of other commands are always logged
    t.shell.execute("remote current").await;
    t.shell.execute("remote current").await;
    assert_eq!(t.shell.session().history.len(), 5);
}

#[tokio::test]
async fn test_history_listing() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    t.shell.execute("remote current").await;
    t.shell.execute("coloring off").await;
    t.out.clear();

    assert!(t.shell.execute("history coloring").await.is_success());
    let output = t.output();
    assert!(output.contains("Morpheus Shell History"));
    assert!(output.contains("    2  coloring off"));
    assert!(!output.contains("    1  remote current"));
}

#[tokio::test]
async fn test_history_flush() {
    let home = home_with_remote();
    let mut t = shell_with(home.path(), &[], "n\n");

    t.shell.execute("remote current").await;
    let declined = t.shell.execute("history --flush").await;
    assert_eq!(declined.code, 9);
    assert_eq!(t.shell.session().history.len(), 2);

    assert!(t.shell.execute("history --flush -y").await.is_success());
    assert!(t.shell.session().history.is_empty());
}

#[tokio::test]
async fn test_completion_candidates() {
    let home = home_with_remote();
    let t = shell(home.path());

    let provider = CompletionProvider::new(t.shell.completion_candidates());
    let result = provider.get_completions("cert", home.path());
    let texts: Vec<&str> = result.suggestions.iter().map(|s| s.text.as_str()).collect();
    assert!(texts.contains(&"certificates"));
    assert!(texts.contains(&"certificates list"));

    let candidates = t.shell.completion_candidates();
    assert!(candidates.contains(&"history".to_string()));
    assert!(candidates.contains(&"schedules".to_string()));
}

#[tokio::test]
async fn test_aliases_expand() {
    let home = home_with_remote();
    let mut t = shell(home.path());
    t.shell.execute("alias add rc 'remote current'").await;
    t.out.clear();

    let outcome = t.shell.execute("rc").await;
    assert!(outcome.is_success());
    assert!(t.output().contains("local https://appliance.test"));
    assert!(t.shell.completion_candidates().contains(&"rc".to_string()));
}

#[tokio::test]
async fn test_startup_scripts() {
    let home = home_with_remote();
    fs::write(
        home.path().join(PROFILE_FILE),
        "alias add rc 'remote current'\n",
    )
    .unwrap();
    fs::write(home.path().join(RC_FILE), "benchmark on\n").unwrap();

    let mut t = shell(home.path());
    let args = ShellArgs {
        exec: Some("rc".into()),
        ..ShellArgs::default()
    };
    let code = t.shell.run(&args).await.unwrap();

    assert_eq!(code, 0);
    assert!(t.output().contains("local https://appliance.test"));
    assert!(t.shell.settings().benchmark);
    assert!(t.output().contains("Command completed in"));

    // Only the typed expression is logged
    let history = &t.shell.session().history;
    assert_eq!(history.len(), 1);
    assert_eq!(history.last().unwrap().text, "rc");

    // Replaying the profile does not rewrite it
    let profile = fs::read_to_string(home.path().join(PROFILE_FILE)).unwrap();
    assert_eq!(profile, "alias add rc 'remote current'\n");
}

#[tokio::test]
async fn test_norc_skips_startup_scripts() {
    let home = home_with_remote();
    fs::write(home.path().join(RC_FILE), "benchmark on\n").unwrap();

    let mut t = shell(home.path());
    let args = ShellArgs {
        exec: Some("remote current".into()),
        ..norc()
    };
    t.shell.run(&args).await.unwrap();
    assert!(!t.shell.settings().benchmark);
}

#[tokio::test]
async fn test_source_file() {
    let home = home_with_remote();
    let script = home.path().join("setup.morpheus");
    fs::write(&script, "# setup\nalias add who whoami\nremote current\n").unwrap();

    let mut t = shell(home.path());
    let line = format!(". {}", script.display());
    assert!(t.shell.execute(&line).await.is_success());

    assert!(t.output().contains("local https://appliance.test"));
    assert!(t.shell.session().aliases.get("who").is_some());
    assert_eq!(t.shell.session().history.len(), 1);
}

#[tokio::test]
async fn test_source_self_stops() {
    let home = home_with_remote();
    let script = home.path().join("loop.morpheus");
    fs::write(&script, format!(". {}\n", script.display())).unwrap();

    let mut t = shell(home.path());
    t.shell.execute(&format!(". {}", script.display())).await;
    assert!(t.errors().contains("nested too deeply"));
    assert!(!t.shell.is_terminated());
}

#[tokio::test]
async fn test_end_of_input_terminates() {
    let home = home_with_remote();
    let mut t = shell_with(home.path(), &["remote current"], "");

    let code = t.shell.run(&norc()).await.unwrap();
    assert_eq!(code, 0);
    assert!(t.shell.is_terminated());
}

#[tokio::test]
async fn test_settings_flags() {
    let home = home_with_remote();
    let mut t = shell(home.path());
    let args = ShellArgs {
        benchmark: true,
        insecure: true,
        exec: Some("remote current".into()),
        ..norc()
    };
    t.shell.run(&args).await.unwrap();
    assert!(t.shell.settings().benchmark);
    assert!(t.shell.session().insecure);
    assert!(t.output().contains("Command completed in"));
}

#[tokio::test]
async fn test_prompt_shows_remote() {
    let home = home_with_remote();
    let t = shell(home.path());
    assert_eq!(t.shell.render_prompt(), "morpheus[local]> ");
}

#[tokio::test]
async fn test_greeting_and_comment() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    assert!(t.shell.execute("# just a note").await.is_success());
    assert!(t.shell.execute("hello").await.is_success());
    assert!(t.output().contains("Hello admin!"));
}

#[tokio::test]
async fn test_program_name_before_builtins() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    assert!(t.shell.execute("morpheus help").await.is_success());
    assert!(t.output().contains("Shell commands"));

    assert!(t.shell.execute("morpheus history").await.is_success());
    assert!(t.output().contains("Morpheus Shell History"));
    assert_eq!(
        t.shell.session().history.last().unwrap().text,
        "history"
    );

    assert!(t.shell.execute("morpheus shell -Z").await.is_success());
    assert_eq!(t.shell.sessions().depth(), 2);
    t.shell.execute("morpheus exit").await;
    assert_eq!(t.shell.sessions().depth(), 1);

    t.shell.execute("morpheus exit 4").await;
    assert!(t.shell.is_terminated());
    assert_eq!(t.shell.exit_code(), 4);
    assert!(!t.errors().contains("not a recognized command"));
}
