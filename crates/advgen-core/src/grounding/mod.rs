//! Grounding - deriving the valid-action universe through an external compiler.

mod external;

pub use external::ExternalGrounder;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// One grounded action instance: a schema name and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInstance {
    pub name: String,
    pub args: Vec<String>,
}

impl ActionInstance {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Whitespace-joined rendering with underscores in the schema name
    /// expanded, matching the surface form grounding engines emit.
    fn flatten(&self) -> String {
        let mut parts = vec![self.name.replace('_', " ")];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Capability for grounding a domain/problem pair into action instances.
///
/// The engine behind it is opaque; errors and timeouts surface as
/// [`crate::PipelineError::GroundingFailure`] and are tagged with the
/// originating item at the call site.
#[async_trait]
pub trait Grounder: Send + Sync {
    async fn ground(&self, domain: &Path, problem: &Path) -> Result<Vec<ActionInstance>>;
}

/// Fixed-universe grounder for tests and dry runs.
pub struct StaticGrounder {
    instances: Vec<ActionInstance>,
}

impl StaticGrounder {
    pub fn new(instances: Vec<ActionInstance>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl Grounder for StaticGrounder {
    async fn ground(&self, _domain: &Path, _problem: &Path) -> Result<Vec<ActionInstance>> {
        Ok(self.instances.clone())
    }
}

/// Verb phrases some grounders render with embedded spaces. These must be
/// collapsed before the name/argument split or argument positions shift.
const MULTIWORD_PHRASES: &[(&str, &str)] = &[
    ("take image", "take_image"),
    ("turn to", "turn_to"),
    ("switch on", "switch_on"),
    ("switch off", "switch_off"),
];

/// Normalize grounded instances into whitespace-joined action strings.
///
/// Instances with any repeated part are dropped: a grounding like
/// `move x x` is syntactically producible but semantically degenerate.
pub fn normalize_instances(instances: &[ActionInstance]) -> Vec<String> {
    let mut actions = Vec::with_capacity(instances.len());
    for instance in instances {
        let mut action = instance.flatten().trim().to_string();
        for (spaced, joined) in MULTIWORD_PHRASES {
            if action.contains(spaced) {
                action = action.replace(spaced, joined);
            }
        }

        let parts: Vec<&str> = action.split(' ').collect();
        let all_distinct = parts
            .iter()
            .all(|p| parts.iter().filter(|q| q.trim() == p.trim()).count() <= 1);
        if all_distinct {
            actions.push(action);
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str, args: &[&str]) -> ActionInstance {
        ActionInstance::new(name, args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_normalization_joins_name_and_args() {
        let actions = normalize_instances(&[instance("fly", &["p1", "c1", "c2"])]);
        assert_eq!(actions, vec!["fly p1 c1 c2"]);
    }

    #[test]
    fn test_multiword_names_collapse_before_split() {
        let actions = normalize_instances(&[instance("take_image", &["sat1", "dir1", "inst1"])]);
        assert_eq!(actions, vec!["take_image sat1 dir1 inst1"]);

        let actions = normalize_instances(&[instance("switch_on", &["inst1", "sat1"])]);
        assert_eq!(actions, vec!["switch_on inst1 sat1"]);
    }

    #[test]
    fn test_degenerate_duplicate_args_filtered() {
        let actions = normalize_instances(&[
            instance("move", &["a", "a"]),
            instance("move", &["a", "b"]),
        ]);
        assert_eq!(actions, vec!["move a b"]);
    }

    #[test]
    fn test_embedded_args_in_name_expand() {
        // Grounders that inline arguments into the instance name still
        // normalize to the same surface form.
        let actions = normalize_instances(&[instance("board_p1_a1", &[])]);
        assert_eq!(actions, vec!["board p1 a1"]);
    }
}
