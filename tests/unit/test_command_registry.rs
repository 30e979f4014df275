//! Unit tests for the standard command registry

use std::collections::HashSet;
use std::io::Cursor;

use morpheus_cli::{dispatch, CommandContext, CommandRegistry, RuntimeSettings, SessionContext};
use tempfile::TempDir;

#[test]
fn test_standard_names_are_unique() {
    let registry = CommandRegistry::standard();
    let mut seen = HashSet::new();
    for name in registry.command_names() {
        assert!(seen.insert(name), "duplicate command '{}'", name);
    }
    for (alias, _) in registry.aliases() {
        assert!(seen.insert(alias), "alias '{}' clashes", alias);
    }
}

#[test]
fn test_every_name_and_alias_resolves() {
    let registry = CommandRegistry::standard();
    for name in registry.command_names() {
        assert_eq!(registry.resolve(name).unwrap().name(), name);
    }
    for (alias, command) in registry.aliases() {
        assert_eq!(registry.resolve(alias).unwrap().name(), command);
    }
    assert!(registry.resolve("certificate").is_none());
    assert!(registry.resolve("").is_none());
}

#[test]
fn test_list_names_follow_registration_order() {
    let registry = CommandRegistry::standard();
    let names = registry.list_names();

    let position = |name: &str| names.iter().position(|n| n == name).unwrap();
    assert!(position("certificates") < position("certificates list"));
    assert!(position("certificates remove") < position("datastores"));
    assert!(names.contains(&"cypher put".to_string()));
    assert!(names.contains(&"incidents reopen".to_string()));
    assert!(names.contains(&"packages export".to_string()));
    assert!(names.contains(&"whoami".to_string()));
}

#[test]
fn test_expected_commands() {
    let registry = CommandRegistry::standard();
    for name in [
        "remote",
        "whoami",
        "certificates",
        "datastores",
        "cypher",
        "execute-schedules",
        "incidents",
        "packages",
        "alias",
        "log-level",
        "debug",
        "coloring",
        "benchmark",
    ] {
        assert!(registry.resolve(name).is_some(), "missing '{}'", name);
    }
    assert_eq!(registry.resolve("schedules").unwrap().name(), "execute-schedules");
}

#[test]
fn test_usage_lists_subcommands() {
    let registry = CommandRegistry::standard();
    for handler in registry.handlers() {
        let usage = handler.usage();
        assert!(usage.starts_with(&format!("Usage: morpheus {}", handler.name())));
        for sub in handler.subcommands() {
            assert!(usage.contains(sub.name), "{} usage lacks {}", handler.name(), sub.name);
        }
    }
}

#[test]
fn test_dispatch_outside_the_shell() {
    let home = TempDir::new().unwrap();
    let registry = CommandRegistry::standard();
    let mut session = SessionContext::load(home.path()).unwrap();
    let mut settings = RuntimeSettings {
        coloring: false,
        ..RuntimeSettings::default()
    };
    let mut input = Cursor::new(Vec::new());
    let mut out = Vec::new();
    let mut err = Vec::new();

    let mut run = |line: &str| {
        let tokens = dispatch::split_line(line).unwrap();
        let mut ctx = CommandContext {
            session: &mut session,
            settings: &mut settings,
            log: None,
            input: &mut input,
            out: &mut out,
            err: &mut err,
        };
        tokio_test::block_on(dispatch::execute(&registry, &mut ctx, &tokens)).code
    };

    assert_eq!(run("morpheus whoami --help"), 0);
    assert_eq!(run("frobnicate"), 1);
    assert_eq!(run("benchmark exec"), 1);

    assert!(String::from_utf8_lossy(&out).contains("Usage: whoami"));
    assert!(String::from_utf8_lossy(&err).contains("'frobnicate' is not a recognized command"));
}
