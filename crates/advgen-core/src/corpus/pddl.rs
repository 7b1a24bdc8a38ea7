//! PDDL template handling - init-state parsing and problem materialization.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Placeholder the corpus templates carry in their `(:goal ...)` section.
pub const HYPOTHESIS_PLACEHOLDER: &str = "<HYPOTHESIS>";

const INIT_ANCHOR: &str = "(:init";
const GOAL_ANCHOR: &str = "(:goal";

/// Extract the initial-state predicates from a problem template.
///
/// The section spans from the first case-insensitive `(:init` to the first
/// case-insensitive `(:goal` after it. When either anchor is missing the
/// result is empty rather than an error: consumers treat an empty initial
/// state as "unknown". Each maximal parenthesized group becomes one
/// predicate string, trimmed and uppercased, in source order.
pub fn parse_init_section(template: &str) -> Vec<String> {
    let lower = template.to_lowercase();
    let Some(init_idx) = lower.find(INIT_ANCHOR) else {
        return Vec::new();
    };
    let body_start = init_idx + INIT_ANCHOR.len();
    let Some(goal_rel) = lower[body_start..].find(GOAL_ANCHOR) else {
        return Vec::new();
    };

    let section = &template[body_start..body_start + goal_rel];
    let mut predicates = Vec::new();
    let mut rest = section;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            break;
        };
        let predicate = after[..close].trim().to_uppercase();
        if !predicate.is_empty() {
            predicates.push(predicate);
        }
        rest = &after[close + 1..];
    }
    predicates
}

/// Substitute a goal into the template's `<HYPOTHESIS>` placeholder.
///
/// Comma separators in the goal line become newlines so that a multi-predicate
/// goal lands as one predicate per line inside the `(:goal ...)` section.
pub fn materialize_problem(template: &str, goal_line: &str) -> String {
    let goal = goal_line.trim().replace(',', "\n");
    template.replace(HYPOTHESIS_PLACEHOLDER, &goal)
}

/// Write the materialized problem file into a workspace.
pub fn write_problem(dir: &Path, template: &str, goal_line: &str) -> Result<PathBuf> {
    let path = dir.join("problem.pddl");
    std::fs::write(&path, materialize_problem(template, goal_line))?;
    Ok(path)
}
