//! Corpus access - recorded observations, goal hypotheses and PDDL templates.

pub mod archive;
pub mod pddl;

pub use archive::Workspace;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const OBSERVATIONS_FILE: &str = "obs.dat";
pub const HYPOTHESES_FILE: &str = "hyps.dat";
pub const REAL_GOAL_FILE: &str = "real_hyp.dat";
pub const TEMPLATE_FILE: &str = "template.pddl";
pub const DOMAIN_FILE: &str = "domain.pddl";

/// Line-delimiter convention for goal files.
///
/// The convention is tied to corpus provenance, so it is an explicit input
/// everywhere; nothing attempts to detect it from file content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusFormat {
    /// Predicates separated by comma + space.
    #[default]
    Standard,
    /// Predicates uppercased, separated by bare commas.
    Uppercased,
}

impl CorpusFormat {
    fn split_predicates(&self, line: &str) -> Vec<String> {
        let cleaned = strip_markers(line);
        match self {
            Self::Standard => cleaned.split(", ").map(str::to_string).collect(),
            Self::Uppercased => cleaned
                .to_uppercase()
                .split(',')
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Drop parenthesis markers and surrounding whitespace from one line.
fn strip_markers(line: &str) -> String {
    line.trim().replace(['(', ')'], "")
}

fn read_artifact(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(PipelineError::MissingArtifact(path));
    }
    Ok(std::fs::read_to_string(&path)?)
}

/// Read the observation trace, one action token per line, in recorded order.
pub fn read_observations(dir: &Path) -> Result<Vec<String>> {
    let content = read_artifact(dir, OBSERVATIONS_FILE)?;
    Ok(content
        .lines()
        .map(strip_markers)
        .filter(|l| !l.is_empty())
        .collect())
}

/// Read the goal hypotheses, one hypothesis per line.
pub fn read_hypotheses(dir: &Path, format: CorpusFormat) -> Result<Vec<Vec<String>>> {
    let content = read_artifact(dir, HYPOTHESES_FILE)?;
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| format.split_predicates(l))
        .collect())
}

/// Read the ground-truth goal as predicate tokens.
pub fn read_real_goal(dir: &Path, format: CorpusFormat) -> Result<Vec<String>> {
    let line = read_real_goal_line(dir)?;
    Ok(format.split_predicates(&line))
}

/// Read the raw ground-truth goal line, markers intact.
///
/// Used when materializing a problem file, where the PDDL parentheses must
/// survive into the goal section.
pub fn read_real_goal_line(dir: &Path) -> Result<String> {
    let content = read_artifact(dir, REAL_GOAL_FILE)?;
    Ok(content.lines().next().unwrap_or("").trim().to_string())
}

/// Read the problem template text.
pub fn read_template(dir: &Path) -> Result<String> {
    read_artifact(dir, TEMPLATE_FILE)
}

/// Object names declared in the template's `(:objects ...)` section,
/// types dropped.
pub fn parse_objects(template: &str) -> Vec<String> {
    parse_objects_with_types(template)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

/// Objects with their declared types. Entries without a ` - type`
/// annotation default to `object`.
pub fn parse_objects_with_types(template: &str) -> Vec<(String, String)> {
    let lower = template.to_lowercase();
    let Some(start) = lower.find("(:objects") else {
        return Vec::new();
    };
    let body = &template[start + "(:objects".len()..];
    let Some(end) = body.find(')') else {
        return Vec::new();
    };

    let mut objects = Vec::new();
    for line in body[..end].lines() {
        let line = line.replace('\t', "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (names, object_type) = match line.split_once(" - ") {
            Some((names, ty)) => (names, ty.trim()),
            None => (line, "object"),
        };
        for name in names.split_whitespace() {
            objects.push((name.to_string(), object_type.to_string()));
        }
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn workspace_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_observations_strip_markers_in_order() {
        let dir = workspace_with(&[(
            OBSERVATIONS_FILE,
            "(unstack b a)\n(putdown b)\n  (pickup a)\n",
        )]);
        let obs = read_observations(dir.path()).unwrap();
        assert_eq!(obs, vec!["unstack b a", "putdown b", "pickup a"]);
    }

    #[test]
    fn test_missing_observations_is_distinct_error() {
        let dir = workspace_with(&[]);
        let err = read_observations(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingArtifact(_)));
    }

    #[test]
    fn test_standard_format_splits_on_comma_space() {
        let dir = workspace_with(&[(HYPOTHESES_FILE, "(on a b), (on b c)\n(ontable a)\n")]);
        let goals = read_hypotheses(dir.path(), CorpusFormat::Standard).unwrap();
        assert_eq!(
            goals,
            vec![
                vec!["on a b".to_string(), "on b c".to_string()],
                vec!["ontable a".to_string()],
            ]
        );
    }

    #[test]
    fn test_uppercased_format_uppercases_and_splits_on_comma() {
        let dir = workspace_with(&[(REAL_GOAL_FILE, "(on a b),(on b c)\n")]);
        let goal = read_real_goal(dir.path(), CorpusFormat::Uppercased).unwrap();
        assert_eq!(goal, vec!["ON A B".to_string(), "ON B C".to_string()]);
    }

    #[test]
    fn test_real_goal_line_keeps_markers() {
        let dir = workspace_with(&[(REAL_GOAL_FILE, "(on a b), (on b c)\nsecond line ignored\n")]);
        let line = read_real_goal_line(dir.path()).unwrap();
        assert_eq!(line, "(on a b), (on b c)");
    }

    #[test]
    fn test_objects_with_types() {
        let template = "(define (problem p)\n(:objects\n\ta b - block\n\ttruck1 - truck\n\tx\n)\n(:init))";
        let objects = parse_objects_with_types(template);
        assert_eq!(
            objects,
            vec![
                ("a".to_string(), "block".to_string()),
                ("b".to_string(), "block".to_string()),
                ("truck1".to_string(), "truck".to_string()),
                ("x".to_string(), "object".to_string()),
            ]
        );
        assert_eq!(parse_objects(template), vec!["a", "b", "truck1", "x"]);
    }
}
