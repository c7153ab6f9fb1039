//! Recording backend for tests
//!
//! Captures every build request instead of producing an image, with an
//! optional injected failure.

use super::{BackendError, ImageBackend, ImageRef};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One captured build request
#[derive(Debug, Clone)]
pub struct RecordedBuild {
    pub dockerfile: String,
    pub context: PathBuf,
    pub tag: String,
}

/// An [`ImageBackend`] that records requests and succeeds (or fails on demand)
#[derive(Default)]
pub struct RecordingBackend {
    builds: Mutex<Vec<RecordedBuild>>,
    failure: Option<String>,
}

impl RecordingBackend {
    /// A backend whose every build fails with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            builds: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    /// Requests captured so far
    pub fn builds(&self) -> Vec<RecordedBuild> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBackend for RecordingBackend {
    async fn build(
        &self,
        dockerfile: &str,
        context: &Path,
        tag: &str,
    ) -> Result<ImageRef, BackendError> {
        if let Some(ref message) = self.failure {
            return Err(BackendError::Other(message.clone()));
        }
        self.builds.lock().unwrap().push(RecordedBuild {
            dockerfile: dockerfile.to_string(),
            context: context.to_path_buf(),
            tag: tag.to_string(),
        });
        Ok(ImageRef {
            tag: tag.to_string(),
        })
    }
}
