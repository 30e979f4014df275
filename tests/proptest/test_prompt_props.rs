//! Property-based tests for prompt rendering
//!
//! Random templates and variable values must never leave placeholders
//! behind or panic.

use morpheus_cli::config::prompt::{PromptFormatter, PromptVars};
use proptest::prelude::*;

fn vars(remote: &str, user: &str) -> PromptVars {
    let mut vars = PromptVars::new();
    vars.set("REMOTE", remote);
    vars.set("USERNAME", user);
    vars
}

proptest! {
    #[test]
    fn test_render_doesnt_panic(template in "\\PC*", remote in "\\PC{0,20}") {
        let formatter = PromptFormatter::new(template);
        let _ = formatter.render(&vars(&remote, "admin"), true);
        let _ = formatter.render(&vars(&remote, "admin"), false);
    }

    #[test]
    fn test_text_without_dollar_is_unchanged(template in "[^$]{0,80}") {
        let formatter = PromptFormatter::new(template.clone());
        prop_assert_eq!(formatter.render(&PromptVars::new(), true), template);
    }

    #[test]
    fn test_known_variable_substituted(remote in "[a-z0-9-]{0,16}", suffix in "[>#:] ?") {
        let formatter = PromptFormatter::new(format!("[$REMOTE]{}", suffix));
        prop_assert_eq!(
            formatter.render(&vars(&remote, "admin"), false),
            format!("[{}]{}", remote, suffix)
        );
    }

    #[test]
    fn test_unknown_variables_collapse(name in "[A-Z][A-Z0-9_]{0,12}") {
        prop_assume!(name != "REMOTE" && name != "USERNAME");
        // Color names render as nothing with coloring off, like unknown names
        let formatter = PromptFormatter::new(format!("<${{{}}}>", name));
        prop_assert_eq!(formatter.render(&vars("prod", "admin"), false), "<>");
    }

    #[test]
    fn test_escaped_dollar(text in "[a-z ]{0,20}") {
        let formatter = PromptFormatter::new(format!("$${}", text));
        prop_assert_eq!(formatter.render(&PromptVars::new(), false), format!("${}", text));
    }
}
