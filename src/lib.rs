//! shipbox - declarative image build planning and typed entrypoint launch
//!
//! This library models the packaging and launch of a single-process web
//! service. The image build is an explicit ordered step list (base layer,
//! dependency install, source copy, port metadata, startup command) instead
//! of a bare instruction file, so layer-cache validity can be computed from
//! each step's declared inputs. The launcher is the typed counterpart of the
//! shell-evaluated startup command: it resolves the listening port from the
//! environment with a `5000` default and starts exactly one server process.
//!
//! # Core Concepts
//!
//! - **Build plan**: ordered [`plan::BuildStep`]s with declared context
//!   inputs; installing dependencies before copying source keeps the install
//!   layer cached across source-only changes
//! - **Image backend**: the seam between planning and image assembly; the
//!   default drives the container build tool as a child process
//! - **Entrypoint launch**: `PORT` resolution via `Option<u16>::unwrap_or`,
//!   one server process bound to `0.0.0.0`, exit status propagated as-is
//!
//! # Example Usage
//!
//! ```ignore
//! use shipbox::plan::BuildPlan;
//! use shipbox::build::{Builder, DockerCliBackend};
//! use std::sync::Arc;
//!
//! async fn build_image(context: &std::path::Path) -> anyhow::Result<()> {
//!     let plan = BuildPlan::python_web("requirements.txt", "app:app".parse()?);
//!     let builder = Builder::new(Arc::new(DockerCliBackend::new()));
//!     let image = builder.build(&plan, context, "webapp:latest").await?;
//!     println!("Built {}", image.tag);
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`plan`]: build plan schema and layer cache keys
//! - [`render`]: Dockerfile rendering
//! - [`build`]: pre-flight validation and backend execution
//! - [`launch`]: entrypoint launcher with typed port resolution

// Public modules
pub mod build;
pub mod cli;
pub mod config;
pub mod launch;
pub mod plan;
pub mod render;
pub mod util;

// Re-export key types for convenient access
pub use build::{BackendError, BuildError, Builder, DockerCliBackend, ImageBackend, ImageRef};
pub use config::{ConfigError, ShipboxConfig};
pub use launch::{AppRef, LaunchConfig, LaunchError, Launcher, DEFAULT_PORT};
pub use plan::{BuildPlan, BuildStep, LayerKey, ProcessDescriptor};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
