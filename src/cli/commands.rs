use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Declarative image build planning and typed entrypoint launch
#[derive(Parser, Debug)]
#[command(
    name = "shipbox",
    about = "Declarative image build planning and typed entrypoint launch for web services",
    version,
    long_about = "shipbox models a container image build as an explicit ordered step list: \
                  base layer, dependency install, source copy, port metadata and startup \
                  command. It renders the plan as a Dockerfile, executes it via the \
                  container build tool, and doubles as the container entrypoint with \
                  typed PORT resolution."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose output")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Emit the build plan for a context directory",
        long_about = "Builds the canonical web-service plan and prints it in the requested \
                      format.\n\n\
                      Examples:\n  \
                      shipbox plan\n  \
                      shipbox plan /path/to/app --format dockerfile\n  \
                      shipbox plan --app myservice.wsgi:application --cache-keys"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Build the image for a context directory",
        long_about = "Validates the plan against the context (the dependency manifest must \
                      exist before the install step runs), renders it and drives the \
                      container build tool. Any failure aborts with a non-zero status and \
                      no image.\n\n\
                      Examples:\n  \
                      shipbox build\n  \
                      shipbox build /path/to/app --tag webapp:latest"
    )]
    Build(BuildArgs),

    #[command(
        about = "Start the application server (container entrypoint)",
        long_about = "Resolves the listening port from PORT (default 5000, empty counts as \
                      unset, non-numeric fails fast) and starts exactly one server process \
                      bound to 0.0.0.0. The process exit status is propagated; there is no \
                      retry and no fallback port.\n\n\
                      Examples:\n  \
                      shipbox launch\n  \
                      shipbox launch --app app:app --port 8080\n  \
                      shipbox launch --check"
    )]
    Launch(LaunchArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Build context directory (defaults to current directory)"
    )]
    pub context: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'a',
        long,
        value_name = "MODULE:CALLABLE",
        default_value = "app:app",
        help = "Application entry reference"
    )]
    pub app: String,

    #[arg(
        short = 'm',
        long,
        value_name = "FILE",
        help = "Dependency manifest file (defaults to requirements.txt)"
    )]
    pub manifest: Option<String>,

    #[arg(long, help = "Also print per-layer cache keys (reads the context)")]
    pub cache_keys: bool,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Build context directory (defaults to current directory)"
    )]
    pub context: Option<PathBuf>,

    #[arg(
        short = 't',
        long,
        value_name = "TAG",
        help = "Image tag (defaults to the context directory name with :latest)"
    )]
    pub tag: Option<String>,

    #[arg(
        short = 'a',
        long,
        value_name = "MODULE:CALLABLE",
        default_value = "app:app",
        help = "Application entry reference"
    )]
    pub app: String,

    #[arg(
        short = 'm',
        long,
        value_name = "FILE",
        help = "Dependency manifest file (defaults to requirements.txt)"
    )]
    pub manifest: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct LaunchArgs {
    #[arg(
        short = 'a',
        long,
        value_name = "MODULE:CALLABLE",
        default_value = "app:app",
        help = "Application entry reference"
    )]
    pub app: String,

    #[arg(
        short = 'p',
        long,
        value_name = "PORT",
        help = "Listening port (overrides the PORT environment variable)"
    )]
    pub port: Option<u16>,

    #[arg(long, help = "Resolve and print the launch configuration, do not start")]
    pub check: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
    Dockerfile,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
        }
    }
}
