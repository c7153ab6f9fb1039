//! Command handlers
//!
//! Each handler owns one subcommand end to end and returns the process exit
//! code. Failures are terminal by design: a failed build leaves no image, a
//! failed launch stops the container, and retry policy stays with the
//! orchestrator.

use super::commands::{BuildArgs, LaunchArgs, PlanArgs};
use super::output::OutputFormatter;
use crate::build::{Builder, DockerCliBackend};
use crate::config::ShipboxConfig;
use crate::launch::{AppRef, LaunchConfig, Launcher};
use crate::plan::{layer_keys, BuildPlan};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Handle the `plan` subcommand
pub async fn handle_plan(args: &PlanArgs) -> i32 {
    let config = ShipboxConfig::default();
    let app = match parse_app(&args.app) {
        Ok(app) => app,
        Err(code) => return code,
    };

    let plan = plan_from(&config, args.manifest.as_deref(), app);
    let formatter = OutputFormatter::new(args.format.into());

    let mut rendered = match formatter.format_plan(&plan) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to format plan: {:#}", e);
            eprintln!("Error: {:#}", e);
            return 1;
        }
    };

    if args.cache_keys {
        let context = context_dir(args.context.as_deref());
        match layer_keys(&plan, &context) {
            Ok(keys) => {
                if let Some(block) = formatter.format_layer_keys(&keys) {
                    rendered.push('\n');
                    rendered.push_str(&block);
                }
            }
            Err(e) => {
                error!("Failed to compute layer keys: {}", e);
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &rendered) {
                error!("Failed to write output to {}: {}", path.display(), e);
                eprintln!("Error: failed to write {}: {}", path.display(), e);
                return 1;
            }
            info!("Plan written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    0
}

/// Handle the `build` subcommand
pub async fn handle_build(args: &BuildArgs) -> i32 {
    let config = ShipboxConfig::default();
    let app = match parse_app(&args.app) {
        Ok(app) => app,
        Err(code) => return code,
    };

    let context = context_dir(args.context.as_deref());
    let tag = args
        .tag
        .clone()
        .unwrap_or_else(|| default_tag(&context));
    let plan = plan_from(&config, args.manifest.as_deref(), app);

    debug!(context = %context.display(), %tag, "Starting image build");
    let builder = Builder::new(Arc::new(DockerCliBackend::with_program(&config.build_tool)));
    match builder.build(&plan, &context, &tag).await {
        Ok(image) => {
            println!("Built {}", image.tag);
            0
        }
        Err(e) => {
            error!("Build failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Handle the `launch` subcommand
pub async fn handle_launch(args: &LaunchArgs) -> i32 {
    let config = ShipboxConfig::default();
    let app = match parse_app(&args.app) {
        Ok(app) => app,
        Err(code) => return code,
    };

    let launch_config = if let Some(port) = args.port {
        let mut c = LaunchConfig::new(app, &config.server_program);
        c.port = Some(port);
        c
    } else {
        match LaunchConfig::from_env(app, &config.server_program) {
            Ok(c) => c,
            Err(e) => {
                error!("Launch configuration error: {}", e);
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    };

    if args.check {
        println!(
            "{} --bind {} {}",
            launch_config.server_program,
            launch_config.bind_addr(),
            launch_config.app
        );
        return 0;
    }

    match Launcher::new(launch_config).run().await {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            error!("Launch failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn parse_app(raw: &str) -> Result<AppRef, i32> {
    raw.parse().map_err(|e| {
        error!("{}", e);
        eprintln!("Error: {}", e);
        2
    })
}

fn plan_from(config: &ShipboxConfig, manifest: Option<&str>, app: AppRef) -> BuildPlan {
    let manifest = manifest.unwrap_or(&config.manifest);
    BuildPlan::python_web(manifest, app)
        .with_base_image(&config.base_image)
        .with_server_program(&config.server_program)
}

fn context_dir(arg: Option<&Path>) -> PathBuf {
    arg.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_tag(context: &Path) -> String {
    let name = context
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "app".to_string());
    format!("{}:latest", name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tag_from_dir_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let context = dir.path().join("MyApp");
        std::fs::create_dir(&context).unwrap();
        assert_eq!(default_tag(&context), "myapp:latest");
    }

    #[test]
    fn test_default_tag_fallback() {
        assert_eq!(default_tag(Path::new("/nonexistent/ctx")), "app:latest");
    }

    #[test]
    fn test_parse_app_exit_code() {
        assert!(parse_app("app:app").is_ok());
        assert_eq!(parse_app("not-a-ref").unwrap_err(), 2);
    }

    #[tokio::test]
    async fn test_handle_plan_missing_context_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = PlanArgs {
            context: Some(dir.path().to_path_buf()),
            format: crate::cli::commands::OutputFormatArg::Human,
            app: "app:app".to_string(),
            manifest: None,
            cache_keys: true,
            output: None,
        };
        // Empty context: the manifest is missing, so key computation fails.
        assert_eq!(handle_plan(&args).await, 1);
    }

    #[tokio::test]
    async fn test_handle_plan_writes_output_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("Dockerfile");
        let args = PlanArgs {
            context: None,
            format: crate::cli::commands::OutputFormatArg::Dockerfile,
            app: "app:app".to_string(),
            manifest: None,
            cache_keys: false,
            output: Some(out.clone()),
        };
        assert_eq!(handle_plan(&args).await, 0);
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("FROM "));
    }
}
