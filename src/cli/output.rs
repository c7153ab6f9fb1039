//! Output formatting for CLI results

use crate::plan::{BuildPlan, LayerKey};
use crate::render;
use anyhow::{Context, Result};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
    Dockerfile,
}

/// Formats build plans for the terminal or files
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_plan(&self, plan: &BuildPlan) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(plan).context("Failed to serialize plan to JSON")
            }
            OutputFormat::Yaml => plan.to_yaml(),
            OutputFormat::Human => Ok(format!("{}", plan)),
            OutputFormat::Dockerfile => render::dockerfile(plan),
        }
    }

    /// Append per-layer cache keys to human output (keys are appended as a
    /// comment block in dockerfile format, and skipped for json/yaml where
    /// the plan itself is the contract)
    pub fn format_layer_keys(&self, keys: &[LayerKey]) -> Option<String> {
        match self.format {
            OutputFormat::Human => {
                let mut out = String::from("Layer cache keys:\n");
                for layer in keys {
                    out.push_str(&format!("  {}  {}\n", &layer.key[..12], layer.step));
                }
                Some(out)
            }
            OutputFormat::Dockerfile => {
                let mut out = String::new();
                for layer in keys {
                    out.push_str(&format!("# layer {}  {}\n", &layer.key[..12], layer.step));
                }
                Some(out)
            }
            OutputFormat::Json | OutputFormat::Yaml => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DEFAULT_MANIFEST;

    fn plan() -> BuildPlan {
        BuildPlan::python_web(DEFAULT_MANIFEST, "app:app".parse().unwrap())
    }

    #[test]
    fn test_json_format() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_plan(&plan()).unwrap();
        assert!(output.contains("\"version\": \"1.0\""));
        assert!(output.contains("\"kind\": \"from\""));
        let back: BuildPlan = serde_json::from_str(&output).unwrap();
        assert_eq!(back.steps.len(), 7);
    }

    #[test]
    fn test_yaml_format() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_plan(&plan()).unwrap();
        assert!(output.contains("version:"));
        assert!(output.contains("steps:"));
    }

    #[test]
    fn test_human_format() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_plan(&plan()).unwrap();
        assert!(output.contains("Build Plan"));
        assert!(output.contains("EXPOSE 5000"));
    }

    #[test]
    fn test_dockerfile_format() {
        let formatter = OutputFormatter::new(OutputFormat::Dockerfile);
        let output = formatter.format_plan(&plan()).unwrap();
        assert!(output.starts_with("FROM python:3.11-slim\n"));
        assert!(output.ends_with("CMD gunicorn --bind 0.0.0.0:${PORT:-5000} app:app\n"));
    }

    #[test]
    fn test_layer_keys_human_only_prefixes() {
        let keys = vec![LayerKey {
            step: "FROM python:3.11-slim".to_string(),
            key: "0123456789abcdef0123456789abcdef".to_string(),
        }];
        let human = OutputFormatter::new(OutputFormat::Human)
            .format_layer_keys(&keys)
            .unwrap();
        assert!(human.contains("0123456789ab  FROM python:3.11-slim"));

        assert!(OutputFormatter::new(OutputFormat::Json)
            .format_layer_keys(&keys)
            .is_none());
    }
}
