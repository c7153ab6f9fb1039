//! Docker CLI backend
//!
//! Drives `docker build` as a child process, feeding the rendered descriptor
//! over stdin so nothing is written into the build context. Any non-zero
//! exit from the tool aborts the build with no image reference.

use super::{BackendError, ImageBackend, ImageRef};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Builds images by invoking the `docker` binary
pub struct DockerCliBackend {
    program: String,
}

impl DockerCliBackend {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Use a different docker-compatible binary (e.g. podman)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DockerCliBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageBackend for DockerCliBackend {
    async fn build(
        &self,
        dockerfile: &str,
        context: &Path,
        tag: &str,
    ) -> Result<ImageRef, BackendError> {
        info!(program = %self.program, %tag, context = %context.display(), "Invoking image build");
        debug!(dockerfile, "Build descriptor");

        let mut child = Command::new(&self.program)
            .arg("build")
            .arg("-f")
            .arg("-")
            .arg("-t")
            .arg(tag)
            .arg(context)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(dockerfile.as_bytes())
                .await
                .map_err(|source| BackendError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;
        }

        let status = child.wait().await.map_err(|source| BackendError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(BackendError::Failed { status });
        }

        Ok(ImageRef {
            tag: tag.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_build_tool_is_spawn_error() {
        let backend = DockerCliBackend::with_program("shipbox-no-such-tool");
        let err = backend
            .build("FROM scratch\n", Path::new("."), "t:latest")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }
}
