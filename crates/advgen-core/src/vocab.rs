//! Vocabulary - frozen token/index mappings for symbolic artifacts.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Current on-disk vocabulary format.
pub const VOCAB_FORMAT_VERSION: u32 = 1;

/// An injective mapping from normalized token to a dense index `0..N`.
///
/// Built once from a corpus and frozen: indices are assigned by sorting the
/// token set lexicographically, so two builds over the same corpus agree
/// regardless of iteration order. Encoding never mutates a vocabulary, which
/// makes shared read-only use across workers safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    version: u32,
    entries: BTreeMap<String, u32>,
}

impl Vocabulary {
    /// Build from a corpus token set. Empty tokens are discarded before
    /// sorting; the rest are uppercased, deduplicated and indexed.
    pub fn build<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut unique: Vec<String> = tokens
            .into_iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        unique.sort();
        unique.dedup();

        let entries = unique
            .into_iter()
            .enumerate()
            .map(|(idx, token)| (token, idx as u32))
            .collect();

        Self {
            version: VOCAB_FORMAT_VERSION,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.entries.get(&token.trim().to_uppercase()).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index_of(token).is_some()
    }

    /// Total encoding for observation sequences: every token must be known,
    /// an absent one fails the item.
    pub fn encode_observations(&self, tokens: &[String]) -> Result<Vec<u32>> {
        tokens
            .iter()
            .map(|token| {
                self.index_of(token)
                    .ok_or_else(|| PipelineError::UnknownToken(token.clone()))
            })
            .collect()
    }

    /// Partial encoding for goal predicates: tokens outside the vocabulary
    /// are silently dropped. Goal vocabularies are legitimately queried with
    /// predicates from outside their build corpus.
    pub fn encode_goal(&self, tokens: &[String]) -> Vec<u32> {
        tokens
            .iter()
            .filter_map(|token| self.index_of(token))
            .collect()
    }

    /// Inverse lookup, linear over the entries. At most one token matches by
    /// injectivity.
    pub fn decode(&self, indices: &[u32]) -> Result<Vec<String>> {
        indices
            .iter()
            .map(|&idx| {
                self.entries
                    .iter()
                    .find(|(_, &assigned)| assigned == idx)
                    .map(|(token, _)| token.clone())
                    .ok_or(PipelineError::UnknownIndex(idx))
            })
            .collect()
    }

    /// Expand an encoded goal into a 0/1 vector over the whole vocabulary.
    pub fn one_hot(&self, encoded: &[u32]) -> Vec<u8> {
        let mut extended = vec![0u8; self.entries.len()];
        for &idx in encoded {
            if let Some(slot) = extended.get_mut(idx as usize) {
                *slot = 1;
            }
        }
        extended
    }

    /// Persist as a versioned binary blob.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let blob = bincode::serialize(self)?;
        std::fs::write(path, blob)?;
        Ok(())
    }

    /// Load a blob written by [`Vocabulary::save`]; rejects foreign versions.
    pub fn load(path: &Path) -> Result<Self> {
        let blob = std::fs::read(path)?;
        let vocab: Self = bincode::deserialize(&blob)?;
        if vocab.version != VOCAB_FORMAT_VERSION {
            return Err(PipelineError::VersionMismatch {
                found: vocab.version,
                expected: VOCAB_FORMAT_VERSION,
            });
        }
        Ok(vocab)
    }
}
