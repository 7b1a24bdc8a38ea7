//! Generator configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::corpus::CorpusFormat;

/// Main generator configuration, loaded from .advgen/config.yaml.
///
/// Everything the pipeline varies on is explicit here and threaded through
/// the entry points; there is no process-global state, and in particular no
/// shared mutable scratch directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Config version
    pub version: Option<String>,

    /// Seed for the run-level deterministic RNG
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Domains to process
    #[serde(default)]
    pub domains: Vec<String>,

    /// Observability levels (percentage of the plan retained in obs files)
    #[serde(default = "default_observability_levels")]
    pub observability_levels: Vec<u8>,

    /// Attack rates (per-position substitution probability, percent)
    #[serde(default = "default_attack_rates")]
    pub attack_rates: Vec<u8>,

    /// Line-delimiter convention of the corpus (explicit, never sniffed)
    #[serde(default)]
    pub format: CorpusFormat,

    /// Directory holding per-domain plan archives (relative to project root)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for generated record and analysis documents
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory holding per-domain vocabulary blobs
    #[serde(default = "default_vocab_dir")]
    pub vocab_dir: PathBuf,

    /// Root for per-item scratch workspaces
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// External grounding compiler
    #[serde(default)]
    pub grounder: GrounderConfig,
}

/// External grounding compiler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrounderConfig {
    /// Command to run; receives the domain and problem paths as trailing args
    #[serde(default = "default_grounder_command")]
    pub command: String,

    /// Extra arguments placed before the file paths
    #[serde(default)]
    pub args: Vec<String>,

    /// Wall-clock bound on one grounding call
    #[serde(default = "default_grounder_timeout")]
    pub timeout_secs: u64,
}

fn default_seed() -> u64 {
    42
}
fn default_observability_levels() -> Vec<u8> {
    vec![10, 30, 50, 70, 100]
}
fn default_attack_rates() -> Vec<u8> {
    vec![10, 20, 30]
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data/validator_testset/noisy_masks")
}
fn default_vocab_dir() -> PathBuf {
    PathBuf::from("data/dictionaries")
}
fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".advgen/tmp")
}
fn default_grounder_command() -> String {
    "fd-ground".to_string()
}
fn default_grounder_timeout() -> u64 {
    60
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            version: None,
            seed: default_seed(),
            domains: Vec::new(),
            observability_levels: default_observability_levels(),
            attack_rates: default_attack_rates(),
            format: CorpusFormat::default(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            vocab_dir: default_vocab_dir(),
            scratch_dir: default_scratch_dir(),
            grounder: GrounderConfig::default(),
        }
    }
}

impl Default for GrounderConfig {
    fn default() -> Self {
        Self {
            command: default_grounder_command(),
            args: Vec::new(),
            timeout_secs: default_grounder_timeout(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .advgen/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".advgen/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve paths relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.data_dir = project_root.join(&self.data_dir);
        self.output_dir = project_root.join(&self.output_dir);
        self.vocab_dir = project_root.join(&self.vocab_dir);
        self.scratch_dir = project_root.join(&self.scratch_dir);
    }

    /// Plan archives for one domain at one observability level
    pub fn plans_dir(&self, domain: &str, level: u8) -> PathBuf {
        self.data_dir.join(domain).join(level.to_string())
    }

    /// Output documents for one domain at one observability level
    pub fn cell_output_dir(&self, domain: &str, level: u8) -> PathBuf {
        self.output_dir.join(domain).join(level.to_string())
    }

    pub fn action_vocab_path(&self, domain: &str) -> PathBuf {
        self.vocab_dir.join(domain).join("actions.vocab")
    }

    pub fn goal_vocab_path(&self, domain: &str) -> PathBuf {
        self.vocab_dir.join(domain).join("goals.vocab")
    }
}
