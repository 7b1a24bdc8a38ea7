//! Pipeline error taxonomy.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the generation pipeline.
///
/// Missing `(:init`/`(:goal` anchors are deliberately not represented here:
/// the section parser degrades to an empty initial state instead of failing
/// (see [`crate::corpus::pddl::parse_init_section`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("expected artifact missing from workspace: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("grounding failed: {0}")]
    GroundingFailure(String),

    #[error("substitution requested but the valid-action pool is empty")]
    EmptyPool,

    #[error("observation token not present in vocabulary: {0}")]
    UnknownToken(String),

    #[error("index {0} not present in vocabulary")]
    UnknownIndex(u32),

    #[error("vocabulary blob has format version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("unsupported archive format: {}", .0.display())]
    UnsupportedArchive(PathBuf),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("record serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("vocabulary codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline steps, named for per-item failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Extract,
    Observations,
    Hypotheses,
    RealGoal,
    InitState,
    Grounding,
    Perturbation,
    Encoding,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Observations => "observations",
            Self::Hypotheses => "hypotheses",
            Self::RealGoal => "real_goal",
            Self::InitState => "init_state",
            Self::Grounding => "grounding",
            Self::Perturbation => "perturbation",
            Self::Encoding => "encoding",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A step failure captured at the orchestrator boundary.
///
/// Failures are recorded per item and never abort the enclosing grid cell.
#[derive(Debug, Error)]
#[error("item {item} failed at {step}: {source}")]
pub struct ItemFailure {
    pub item: String,
    pub step: Step,
    #[source]
    pub source: PipelineError,
}
