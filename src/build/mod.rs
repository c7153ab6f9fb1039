//! Image builder
//!
//! Validates a build plan against its context directory, then hands the
//! rendered descriptor to an [`ImageBackend`] for execution. The build is
//! all-or-nothing: pre-flight failures (missing manifest, missing copy
//! source) abort before any backend step runs, and a backend failure means
//! no image reference is reported.

pub mod docker;
pub mod recording;

use crate::plan::{BuildPlan, BuildStep};
use crate::render;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub use docker::DockerCliBackend;
pub use recording::RecordingBackend;

/// Build errors
#[derive(Debug, Error)]
pub enum BuildError {
    /// The plan failed structural validation
    #[error("Invalid build plan: {0}")]
    InvalidPlan(String),

    /// The dependency manifest the plan copies does not exist
    #[error("Dependency manifest not found in context: {0}")]
    MissingManifest(PathBuf),

    /// A COPY step names a context path that does not exist
    #[error("Copy source not found in context: {0}")]
    MissingCopySource(PathBuf),

    /// The context directory itself is missing
    #[error("Build context is not a directory: {0}")]
    InvalidContext(PathBuf),

    /// The backend failed to produce an image
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors surfaced by image backends
#[derive(Debug, Error)]
pub enum BackendError {
    /// The build tool could not be started
    #[error("Failed to invoke build tool '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The build tool ran and reported failure
    #[error("Image build failed with {status}")]
    Failed { status: std::process::ExitStatus },

    /// Anything else a backend needs to report
    #[error("{0}")]
    Other(String),
}

/// A successfully built image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Tag the image was built under
    pub tag: String,
}

/// Executes a rendered build descriptor against a context directory
///
/// The seam between planning and image assembly: the default implementation
/// drives the container build tool as a child process, tests use a recording
/// double.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn build(
        &self,
        dockerfile: &str,
        context: &Path,
        tag: &str,
    ) -> Result<ImageRef, BackendError>;
}

/// Orchestrates validation, rendering and backend execution
pub struct Builder {
    backend: Arc<dyn ImageBackend>,
}

impl Builder {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }

    /// Check the plan against the context before anything executes
    ///
    /// Every COPY source must exist up front, so a missing manifest fails the
    /// build before the dependency-install step ever runs.
    pub fn preflight(&self, plan: &BuildPlan, context: &Path) -> Result<(), BuildError> {
        if !context.is_dir() {
            return Err(BuildError::InvalidContext(context.to_path_buf()));
        }
        plan.validate()
            .map_err(|e| BuildError::InvalidPlan(e.to_string()))?;

        for step in &plan.steps {
            if let BuildStep::Copy { src, .. } = step {
                if src == "." {
                    continue;
                }
                let path = context.join(src);
                if !path.exists() {
                    let rel = PathBuf::from(src);
                    return Err(if Some(src.as_str()) == plan.manifest() {
                        BuildError::MissingManifest(rel)
                    } else {
                        BuildError::MissingCopySource(rel)
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate, render and execute the plan
    pub async fn build(
        &self,
        plan: &BuildPlan,
        context: &Path,
        tag: &str,
    ) -> Result<ImageRef, BuildError> {
        self.preflight(plan, context)?;

        let dockerfile =
            render::dockerfile(plan).map_err(|e| BuildError::InvalidPlan(e.to_string()))?;
        debug!(steps = plan.steps.len(), %tag, "Rendered build descriptor");

        let image = self.backend.build(&dockerfile, context, tag).await?;
        info!(tag = %image.tag, "Image built");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DEFAULT_MANIFEST;
    use std::fs;
    use tempfile::TempDir;

    fn plan() -> BuildPlan {
        BuildPlan::python_web(DEFAULT_MANIFEST, "app:app".parse().unwrap())
    }

    fn builder() -> (Builder, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        (Builder::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_build_records_rendered_descriptor() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();
        fs::write(dir.path().join("app.py"), "app = object()\n").unwrap();

        let (builder, backend) = builder();
        let image = builder
            .build(&plan(), dir.path(), "webapp:latest")
            .await
            .unwrap();

        assert_eq!(image.tag, "webapp:latest");
        let builds = backend.builds();
        assert_eq!(builds.len(), 1);
        assert!(builds[0].dockerfile.starts_with("FROM python:3.11-slim\n"));
        assert!(builds[0]
            .dockerfile
            .contains("RUN pip install --no-cache-dir -r requirements.txt"));
    }

    #[tokio::test]
    async fn test_missing_manifest_fails_before_backend() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "app = object()\n").unwrap();

        let (builder, backend) = builder();
        let err = builder
            .build(&plan(), dir.path(), "webapp:latest")
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::MissingManifest(_)));
        assert!(backend.builds().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_plan_fails_before_backend() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();

        let mut p = plan();
        p.steps.pop();

        let (builder, backend) = builder();
        let err = builder.build(&p, dir.path(), "webapp:latest").await.unwrap_err();

        assert!(matches!(err, BuildError::InvalidPlan(_)));
        assert!(backend.builds().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_reports_no_image() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();

        let backend = Arc::new(RecordingBackend::failing("simulated build failure"));
        let builder = Builder::new(backend.clone());
        let result = builder.build(&plan(), dir.path(), "webapp:latest").await;

        assert!(matches!(result, Err(BuildError::Backend(_))));
    }

    #[test]
    fn test_missing_context_dir() {
        let (builder, _) = builder();
        let err = builder
            .preflight(&plan(), Path::new("/nonexistent/context"))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidContext(_)));
    }

    #[test]
    fn test_missing_extra_copy_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();

        let mut p = plan();
        p.steps.insert(
            4,
            BuildStep::Copy {
                src: "static".to_string(),
                dest: "static".to_string(),
            },
        );

        let (builder, _) = builder();
        let err = builder.preflight(&p, dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::MissingCopySource(p) if p == PathBuf::from("static")));
    }
}
