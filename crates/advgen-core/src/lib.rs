//! advgen-core - adversarial dataset generation for goal recognition
//!
//! This crate builds labeled datasets for evaluating goal-recognition models
//! under corrupted observability: it extracts recorded plan corpora, derives
//! the grounded-action universe through an external compiler, substitutes
//! actions into observation traces at a controlled rate while recording a
//! position mask, and encodes every symbolic artifact against frozen,
//! deterministically-built vocabularies.

pub mod config;
pub mod corpus;
pub mod error;
pub mod events;
pub mod grounding;
pub mod perturb;
pub mod pipeline;
pub mod rng;
pub mod vocab;

pub use config::{GeneratorConfig, GrounderConfig};
pub use corpus::{CorpusFormat, Workspace};
pub use error::{ItemFailure, PipelineError, Result, Step};
pub use grounding::{ActionInstance, ExternalGrounder, Grounder, StaticGrounder};
pub use perturb::{perturb, Perturbation, MASK_MODIFIED, MASK_ORIGINAL};
pub use vocab::Vocabulary;
