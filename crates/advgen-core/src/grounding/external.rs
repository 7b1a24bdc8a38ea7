//! External grounder - invokes a grounding compiler CLI.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::GrounderConfig;
use crate::error::{PipelineError, Result};

use super::{ActionInstance, Grounder};

/// Runs a grounding compiler as a child process.
///
/// The command receives the domain and problem paths as its two trailing
/// arguments and is expected to print one grounded instance per stdout line
/// (`name arg1 arg2 ...`, optionally parenthesized). The call is bounded by
/// the configured timeout; grounding is the only unbounded-latency step in
/// the pipeline.
pub struct ExternalGrounder {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalGrounder {
    pub fn new(config: &GrounderConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn parse_output(stdout: &str) -> Vec<ActionInstance> {
        stdout
            .lines()
            .map(|line| line.trim().trim_start_matches('(').trim_end_matches(')'))
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let mut parts = line.split_whitespace().map(str::to_string);
                let name = parts.next()?;
                Some(ActionInstance::new(name, parts.collect()))
            })
            .collect()
    }
}

#[async_trait]
impl Grounder for ExternalGrounder {
    async fn ground(&self, domain: &Path, problem: &Path) -> Result<Vec<ActionInstance>> {
        tracing::debug!(
            command = %self.command,
            domain = %domain.display(),
            problem = %problem.display(),
            "Invoking grounding compiler"
        );

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(domain)
            .arg(problem)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                PipelineError::GroundingFailure(format!(
                    "grounder timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                PipelineError::GroundingFailure(format!("failed to run {}: {e}", self.command))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::GroundingFailure(
                stderr.trim().to_string(),
            ));
        }

        Ok(Self::parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}
