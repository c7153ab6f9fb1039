//! Build plan data structures
//!
//! This module defines the schema for a build plan - a declarative container
//! build specification expressed as an explicit, ordered list of steps. Each
//! step declares the context files it reads, which lets the cache module
//! compute per-layer validity instead of relying on instruction order alone.

use crate::launch::{AppRef, DEFAULT_PORT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_version() -> String {
    "1.0".to_string()
}

/// Default base image for Python web services
pub const DEFAULT_BASE_IMAGE: &str = "python:3.11-slim";

/// Default working directory inside the image
pub const DEFAULT_WORKDIR: &str = "/app";

/// Default dependency manifest for Python projects
pub const DEFAULT_MANIFEST: &str = "requirements.txt";

/// Default application server program
pub const DEFAULT_SERVER_PROGRAM: &str = "gunicorn";

/// A complete container build specification
///
/// The plan is the root structure: an ordered sequence of [`BuildStep`]s that
/// a backend turns into an immutable image. Order is a correctness mechanism:
/// dependency installation must precede the full source copy so that source
/// edits do not invalidate the dependency layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Schema version (e.g., "1.0")
    #[serde(default = "default_version")]
    pub version: String,
    /// Optional project name used for the default image tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Ordered build steps; see [`BuildPlan::validate`] for ordering rules
    pub steps: Vec<BuildStep>,
}

/// One build step, producing one image layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildStep {
    /// Select the base runtime layer (fixed version tag)
    From { image: String },
    /// Declare the working directory for subsequent steps
    Workdir { path: String },
    /// Copy a path from the build context into the working directory
    Copy { src: String, dest: String },
    /// Execute a command; `no_cache` marks package installs that must not
    /// persist a download cache into the layer
    Run {
        command: String,
        #[serde(default)]
        no_cache: bool,
    },
    /// Set an environment variable in the image
    Env { name: String, value: String },
    /// Declare the intended listening port (metadata only, binds nothing)
    Expose { port: u16 },
    /// The container startup command
    Cmd { descriptor: ProcessDescriptor },
}

/// The runtime command that launches the application server
///
/// Rendered as a shell-evaluated CMD so the container honors `PORT` at start
/// time; `shipbox launch` is the typed equivalent of the same resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// Server program, e.g. "gunicorn"
    pub program: String,
    /// Application entry reference, `module:callable`
    pub app: AppRef,
    /// Bind address, conventionally "0.0.0.0"
    pub bind: String,
    /// Environment variable consulted for the port at container start
    pub port_env: String,
    /// Port used when the environment variable is unset or empty
    pub default_port: u16,
}

impl ProcessDescriptor {
    /// Descriptor for a conventional web service: binds all interfaces and
    /// resolves the port from `PORT` with a fallback default.
    pub fn web(program: impl Into<String>, app: AppRef, default_port: u16) -> Self {
        Self {
            program: program.into(),
            app,
            bind: "0.0.0.0".to_string(),
            port_env: "PORT".to_string(),
            default_port,
        }
    }

    /// The shell-evaluated startup command line
    pub fn shell_command(&self) -> String {
        format!(
            "{} --bind {}:${{{}:-{}}} {}",
            self.program, self.bind, self.port_env, self.default_port, self.app
        )
    }
}

impl BuildStep {
    /// Context paths this step reads
    ///
    /// `"."` means the whole build context (minus ignore rules). Steps with no
    /// declared inputs are keyed on their text and position alone.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            BuildStep::Copy { src, .. } => vec![src.as_str()],
            _ => vec![],
        }
    }

    /// Canonical single-line form, used for display and cache keying
    pub fn canonical(&self) -> String {
        match self {
            BuildStep::From { image } => format!("FROM {}", image),
            BuildStep::Workdir { path } => format!("WORKDIR {}", path),
            BuildStep::Copy { src, dest } => format!("COPY {} {}", src, dest),
            BuildStep::Run { command, .. } => format!("RUN {}", command),
            BuildStep::Env { name, value } => format!("ENV {}={}", name, value),
            BuildStep::Expose { port } => format!("EXPOSE {}", port),
            BuildStep::Cmd { descriptor } => format!("CMD {}", descriptor.shell_command()),
        }
    }
}

impl BuildPlan {
    /// The canonical plan for a Python web service, matching the layering the
    /// original deployment used: manifest copy and install first so that
    /// source-only changes leave the dependency layer cached.
    pub fn python_web(manifest: &str, app: AppRef) -> Self {
        Self {
            version: default_version(),
            project_name: None,
            steps: vec![
                BuildStep::From {
                    image: DEFAULT_BASE_IMAGE.to_string(),
                },
                BuildStep::Workdir {
                    path: DEFAULT_WORKDIR.to_string(),
                },
                BuildStep::Copy {
                    src: manifest.to_string(),
                    dest: ".".to_string(),
                },
                BuildStep::Run {
                    command: format!("pip install --no-cache-dir -r {}", manifest),
                    no_cache: true,
                },
                BuildStep::Copy {
                    src: ".".to_string(),
                    dest: ".".to_string(),
                },
                BuildStep::Expose { port: DEFAULT_PORT },
                BuildStep::Cmd {
                    descriptor: ProcessDescriptor::web(DEFAULT_SERVER_PROGRAM, app, DEFAULT_PORT),
                },
            ],
        }
    }

    /// Replace the base image of the FROM step
    pub fn with_base_image(mut self, image: impl Into<String>) -> Self {
        if let Some(BuildStep::From { image: current }) = self.steps.first_mut() {
            *current = image.into();
        }
        self
    }

    /// Replace the server program in the startup descriptor
    pub fn with_server_program(mut self, program: impl Into<String>) -> Self {
        let program = program.into();
        for step in &mut self.steps {
            if let BuildStep::Cmd { descriptor } = step {
                descriptor.program = program.clone();
            }
        }
        self
    }

    /// The dependency manifest the plan copies before installing, if any
    pub fn manifest(&self) -> Option<&str> {
        self.steps.iter().find_map(|step| match step {
            BuildStep::Copy { src, .. } if src != "." => Some(src.as_str()),
            _ => None,
        })
    }

    /// The declared listening port, if any
    pub fn exposed_port(&self) -> Option<u16> {
        self.steps.iter().find_map(|step| match step {
            BuildStep::Expose { port } => Some(*port),
            _ => None,
        })
    }

    /// The startup descriptor, if the plan declares one
    pub fn command(&self) -> Option<&ProcessDescriptor> {
        self.steps.iter().find_map(|step| match step {
            BuildStep::Cmd { descriptor } => Some(descriptor),
            _ => None,
        })
    }

    /// Serialize the plan to YAML
    pub fn to_yaml(&self) -> Result<String> {
        use anyhow::Context;
        serde_yaml::to_string(self).context("Failed to serialize build plan to YAML")
    }

    /// Validate the plan's structure and step ordering
    ///
    /// Rules:
    /// - At least one step; exactly one FROM, and it comes first
    /// - Exactly one CMD, and it comes last
    /// - Every RUN precedes the full-context copy (`COPY . ...`), so a
    ///   source-only change cannot invalidate an install layer
    /// - Non-empty image, paths and commands; EXPOSE port is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            anyhow::bail!("Version cannot be empty");
        }
        if self.steps.is_empty() {
            anyhow::bail!("Plan must contain at least one step");
        }

        match &self.steps[0] {
            BuildStep::From { image } if !image.is_empty() => {}
            BuildStep::From { .. } => anyhow::bail!("Base image cannot be empty"),
            other => anyhow::bail!("First step must be FROM, got: {}", other.canonical()),
        }
        let from_count = self
            .steps
            .iter()
            .filter(|s| matches!(s, BuildStep::From { .. }))
            .count();
        if from_count != 1 {
            anyhow::bail!("Plan must contain exactly one FROM step, got {}", from_count);
        }

        let cmd_positions: Vec<usize> = self
            .steps
            .iter()
            .enumerate()
            .filter_map(|(i, s)| matches!(s, BuildStep::Cmd { .. }).then_some(i))
            .collect();
        match cmd_positions.as_slice() {
            [last] if *last == self.steps.len() - 1 => {}
            [] => anyhow::bail!("Plan must declare a startup command (CMD)"),
            [_] => anyhow::bail!("CMD must be the last step"),
            _ => anyhow::bail!("Plan must contain exactly one CMD step"),
        }

        let full_copy = self
            .steps
            .iter()
            .position(|s| matches!(s, BuildStep::Copy { src, .. } if src == "."));
        if let Some(copy_idx) = full_copy {
            if let Some(late_run) = self.steps[copy_idx..]
                .iter()
                .find(|s| matches!(s, BuildStep::Run { .. }))
            {
                anyhow::bail!(
                    "Install step after the full source copy defeats layer caching: {}",
                    late_run.canonical()
                );
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            match step {
                BuildStep::Workdir { path } if path.is_empty() => {
                    anyhow::bail!("Step {}: WORKDIR path cannot be empty", i)
                }
                BuildStep::Copy { src, dest } if src.is_empty() || dest.is_empty() => {
                    anyhow::bail!("Step {}: COPY paths cannot be empty", i)
                }
                BuildStep::Run { command, .. } if command.is_empty() => {
                    anyhow::bail!("Step {}: RUN command cannot be empty", i)
                }
                BuildStep::Env { name, .. } if name.is_empty() => {
                    anyhow::bail!("Step {}: ENV name cannot be empty", i)
                }
                BuildStep::Expose { port: 0 } => {
                    anyhow::bail!("Step {}: EXPOSE port cannot be zero", i)
                }
                BuildStep::Cmd { descriptor } if descriptor.program.is_empty() => {
                    anyhow::bail!("Step {}: CMD program cannot be empty", i)
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build Plan (v{})", self.version)?;
        writeln!(f, "====================")?;
        if let Some(ref name) = self.project_name {
            writeln!(f, "Project: {}", name)?;
        }
        writeln!(f, "Steps:")?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step.canonical())?;
        }
        if let Some(port) = self.exposed_port() {
            writeln!(f)?;
            writeln!(f, "Declared port: {}", port)?;
        }
        if let Some(descriptor) = self.command() {
            writeln!(f, "Startup: {}", descriptor.shell_command())?;
        }
        Ok(())
    }
}
