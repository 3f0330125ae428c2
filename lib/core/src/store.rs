//! Classifier artifact store
//!
//! Explicit path-keyed cache around the serialized model artifact. Owned by
//! the orchestrator or trainer and passed by reference, so there is no hidden
//! process-wide state and tests stay reproducible. An absent artifact is not
//! an error; it selects the rule-based fallback. A corrupt artifact is.

use crate::classifier::{LoadedClassifier, RuleBasedClassifier, TrainedClassifier};
use crate::error::{Error, Result};
use ahash::AHashMap;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use parking_lot::RwLock;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Path-keyed classifier cache with atomic, cache-invalidating saves.
#[derive(Default)]
pub struct ModelStore {
    cache: RwLock<AHashMap<PathBuf, Arc<LoadedClassifier>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the classifier for `path`.
    ///
    /// Results are cached by path so repeated checks do not redeserialize.
    /// A missing file yields the rule-based fallback; anything else that goes
    /// wrong while reading or decoding is a hard failure.
    pub fn load(&self, path: &Path) -> Result<Arc<LoadedClassifier>> {
        if let Some(model) = self.cache.read().get(path) {
            return Ok(model.clone());
        }

        let model = if path.exists() {
            let bytes = std::fs::read(path)?;
            let trained: TrainedClassifier =
                bincode::deserialize(&bytes).map_err(|e| Error::CorruptArtifact {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            debug!(path = %path.display(), "loaded trained classifier artifact");
            Arc::new(LoadedClassifier::Trained(trained))
        } else {
            debug!(path = %path.display(), "no artifact found, using rule-based fallback");
            Arc::new(LoadedClassifier::RuleBased(RuleBasedClassifier::new()))
        };

        self.cache
            .write()
            .insert(path.to_path_buf(), model.clone());
        Ok(model)
    }

    /// Persist a trained classifier, overwriting any artifact at `path`, and
    /// drop the stale cache entry so the next load sees the new model.
    pub fn save(&self, model: &TrainedClassifier, path: &Path) -> Result<()> {
        let bytes =
            bincode::serialize(model).map_err(|e| Error::Serialization(e.to_string()))?;
        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .map_err(|e| match e {
                atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::Io(e),
            })?;
        self.invalidate(path);
        info!(path = %path.display(), "saved classifier artifact");
        Ok(())
    }

    /// Remove the cached entry for `path`, forcing the next load to hit disk.
    pub fn invalidate(&self, path: &Path) {
        self.cache.write().remove(path);
    }
}
