//! Layer cache keys
//!
//! Computes one content-addressed key per build step. Keys chain: each key
//! covers the step's canonical text, the hashes of its declared context
//! inputs, and the previous step's key. A change therefore invalidates its
//! own layer and everything after it, never anything before it - editing
//! application source leaves the dependency-install layer cached, editing
//! the manifest does not.

use super::schema::BuildPlan;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Cache computation errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// A step declared an input the context does not contain
    #[error("Step input not found in build context: {0}")]
    MissingInput(PathBuf),

    /// Reading a context file failed
    #[error("Failed to read context file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walking the context failed
    #[error("Failed to walk build context")]
    Walk(#[from] ignore::Error),
}

/// One step's cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerKey {
    /// Canonical step text the key was computed for
    pub step: String,
    /// Hex SHA-256 key
    pub key: String,
}

/// Compute the chained cache key for every step of the plan
///
/// Deterministic for identical contexts: files are hashed in sorted relative
/// path order, respecting ignore rules, so building twice with unchanged
/// inputs yields identical keys.
pub fn layer_keys(plan: &BuildPlan, context: &Path) -> Result<Vec<LayerKey>, CacheError> {
    let mut keys = Vec::with_capacity(plan.steps.len());
    let mut previous: Option<String> = None;

    for step in &plan.steps {
        let mut hasher = Sha256::new();
        hasher.update(step.canonical().as_bytes());
        if let Some(ref prev) = previous {
            hasher.update(prev.as_bytes());
        }
        for input in step.inputs() {
            hash_input(&mut hasher, context, input)?;
        }

        let key = hex::encode(hasher.finalize());
        previous = Some(key.clone());
        keys.push(LayerKey {
            step: step.canonical(),
            key,
        });
    }

    Ok(keys)
}

/// The index of the first step whose key differs between two runs, if any
pub fn first_invalidated(old: &[LayerKey], new: &[LayerKey]) -> Option<usize> {
    old.iter()
        .zip(new.iter())
        .position(|(a, b)| a != b)
        .or_else(|| (old.len() != new.len()).then_some(old.len().min(new.len())))
}

fn hash_input(hasher: &mut Sha256, context: &Path, input: &str) -> Result<(), CacheError> {
    if input == "." {
        for file in context_files(context)? {
            hash_file(hasher, context, &file)?;
        }
        return Ok(());
    }

    let path = context.join(input);
    if !path.exists() {
        return Err(CacheError::MissingInput(PathBuf::from(input)));
    }
    if path.is_dir() {
        for file in context_files(&path)? {
            hash_file(hasher, &path, &file)?;
        }
        Ok(())
    } else {
        hash_file(hasher, context, Path::new(input))
    }
}

fn hash_file(hasher: &mut Sha256, root: &Path, rel: &Path) -> Result<(), CacheError> {
    let path = root.join(rel);
    let content = std::fs::read(&path).map_err(|source| CacheError::Io {
        path: path.clone(),
        source,
    })?;
    hasher.update(rel.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(&content);
    Ok(())
}

/// Files under `root`, relative paths in sorted order, ignore rules honored
fn context_files(root: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).hidden(false).build() {
        let entry = entry?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push(rel.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::schema::DEFAULT_MANIFEST;
    use std::fs;
    use tempfile::TempDir;

    fn plan() -> BuildPlan {
        BuildPlan::python_web(DEFAULT_MANIFEST, "app:app".parse().unwrap())
    }

    fn write_context(dir: &TempDir) {
        fs::write(dir.path().join("requirements.txt"), "flask\ngunicorn\n").unwrap();
        fs::write(dir.path().join("app.py"), "app = object()\n").unwrap();
    }

    #[test]
    fn test_keys_deterministic() {
        let dir = TempDir::new().unwrap();
        write_context(&dir);
        let first = layer_keys(&plan(), dir.path()).unwrap();
        let second = layer_keys(&plan(), dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }

    #[test]
    fn test_source_change_keeps_install_layer() {
        let dir = TempDir::new().unwrap();
        write_context(&dir);
        let before = layer_keys(&plan(), dir.path()).unwrap();

        fs::write(dir.path().join("app.py"), "app = object()  # edited\n").unwrap();
        let after = layer_keys(&plan(), dir.path()).unwrap();

        // FROM, WORKDIR, COPY manifest, RUN install are untouched.
        assert_eq!(before[..4], after[..4]);
        // The full source copy and everything after it changed.
        assert_eq!(first_invalidated(&before, &after), Some(4));
    }

    #[test]
    fn test_manifest_change_invalidates_install_layer() {
        let dir = TempDir::new().unwrap();
        write_context(&dir);
        let before = layer_keys(&plan(), dir.path()).unwrap();

        fs::write(dir.path().join("requirements.txt"), "flask==3.0\ngunicorn\n").unwrap();
        let after = layer_keys(&plan(), dir.path()).unwrap();

        assert_eq!(before[..2], after[..2]);
        // The manifest copy is step index 2; it and all later layers rebuild.
        assert_eq!(first_invalidated(&before, &after), Some(2));
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "app = object()\n").unwrap();

        let err = layer_keys(&plan(), dir.path()).unwrap_err();
        match err {
            CacheError::MissingInput(path) => {
                assert_eq!(path, PathBuf::from("requirements.txt"))
            }
            other => panic!("Expected MissingInput, got: {}", other),
        }
    }

    #[test]
    fn test_identical_plans_unchanged_context() {
        let dir = TempDir::new().unwrap();
        write_context(&dir);
        let a = layer_keys(&plan(), dir.path()).unwrap();
        let b = layer_keys(&plan(), dir.path()).unwrap();
        assert_eq!(first_invalidated(&a, &b), None);
    }
}
