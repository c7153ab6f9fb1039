//! Entrypoint launcher
//!
//! Resolves the listening port from the environment with a typed default and
//! starts exactly one application-server process bound to all interfaces.
//! Start failures (bad app reference, occupied port) surface as the server
//! process's non-zero exit status; there is no retry or fallback port here,
//! restart policy belongs to the orchestrator.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitStatus;
use std::str::FromStr;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Port used when `PORT` is unset or empty
pub const DEFAULT_PORT: u16 = 5000;

/// Environment variable consulted for the listening port
pub const PORT_ENV: &str = "PORT";

/// Launcher errors
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Application entry reference is not `module:callable`
    #[error("Invalid application reference '{0}': expected module:callable")]
    InvalidAppRef(String),

    /// `PORT` was set to something that is not a valid port number
    #[error("Invalid PORT value '{value}': {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// The server process could not be spawned at all
    #[error("Failed to start server process '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A `module:callable` identifier naming the in-process object the server
/// should serve requests through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppRef {
    module: String,
    callable: String,
}

impl AppRef {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn callable(&self) -> &str {
        &self.callable
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl FromStr for AppRef {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, callable) = s
            .split_once(':')
            .ok_or_else(|| LaunchError::InvalidAppRef(s.to_string()))?;
        if !is_identifier(module) || !is_identifier(callable) || callable.contains('.') {
            return Err(LaunchError::InvalidAppRef(s.to_string()));
        }
        Ok(Self {
            module: module.to_string(),
            callable: callable.to_string(),
        })
    }
}

impl TryFrom<String> for AppRef {
    type Error = LaunchError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AppRef> for String {
    fn from(app: AppRef) -> Self {
        app.to_string()
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.callable)
    }
}

/// Resolved launch configuration
///
/// The port is typed: `None` means "use the default", so resolution is a
/// plain `unwrap_or` rather than shell string substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Application entry reference
    pub app: AppRef,
    /// Listening port; `None` resolves to [`DEFAULT_PORT`]
    pub port: Option<u16>,
    /// Bind address; all interfaces by default
    pub bind: IpAddr,
    /// Server program to invoke
    pub server_program: String,
}

impl LaunchConfig {
    pub fn new(app: AppRef, server_program: impl Into<String>) -> Self {
        Self {
            app,
            port: None,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            server_program: server_program.into(),
        }
    }

    /// Read the port from the `PORT` environment variable
    ///
    /// Unset or empty means the default. A non-empty value that does not
    /// parse as a port fails fast here, rather than handing a garbage string
    /// to the server process.
    pub fn from_env(app: AppRef, server_program: impl Into<String>) -> Result<Self, LaunchError> {
        let mut config = Self::new(app, server_program);
        config.port = resolve_port_env()?;
        Ok(config)
    }

    /// The port the server will bind
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// The socket address the server will bind
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.resolved_port())
    }

    /// Argument vector for the server process
    pub fn command_args(&self) -> Vec<String> {
        vec![
            "--bind".to_string(),
            self.bind_addr().to_string(),
            self.app.to_string(),
        ]
    }
}

fn resolve_port_env() -> Result<Option<u16>, LaunchError> {
    match env::var(PORT_ENV) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => value
            .parse::<u16>()
            .map(Some)
            .map_err(|source| LaunchError::InvalidPort { value, source }),
        Err(_) => Ok(None),
    }
}

/// Starts the single application-server process and waits for it
pub struct Launcher {
    config: LaunchConfig,
}

impl Launcher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Spawn the server process and wait for it to exit
    ///
    /// The returned status is the server's own: an unloadable app reference
    /// or an occupied port shows up as a non-zero exit there. Only a failure
    /// to spawn at all is a launcher error.
    pub async fn run(&self) -> Result<ExitStatus, LaunchError> {
        let args = self.config.command_args();
        info!(
            program = %self.config.server_program,
            addr = %self.config.bind_addr(),
            app = %self.config.app,
            "Starting server process"
        );
        debug!(?args, "Server arguments");

        let mut child = Command::new(&self.config.server_program)
            .args(&args)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.config.server_program.clone(),
                source,
            })?;

        let status = child.wait().await.map_err(|source| LaunchError::Spawn {
            program: self.config.server_program.clone(),
            source,
        })?;

        if status.success() {
            info!("Server process exited cleanly");
        } else {
            info!(%status, "Server process exited with failure");
        }
        Ok(status)
    }
}
