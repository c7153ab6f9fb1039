//! Dockerfile rendering
//!
//! Turns a validated build plan into Dockerfile text, one instruction per
//! step in plan order. The CMD is emitted in shell form so the container
//! resolves `${PORT:-5000}` at start time.

use crate::plan::BuildPlan;
use anyhow::{Context, Result};

/// Render the plan as Dockerfile text
///
/// Each step's canonical form is already a Dockerfile instruction; rendering
/// is the validated plan, one instruction per line. Fails if the plan does
/// not validate; a descriptor with broken step ordering must not be rendered
/// into a buildable file.
pub fn dockerfile(plan: &BuildPlan) -> Result<String> {
    plan.validate()
        .context("Refusing to render an invalid build plan")?;

    let mut out = String::new();
    for step in &plan.steps {
        out.push_str(&step.canonical());
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{BuildStep, DEFAULT_MANIFEST};

    fn plan() -> BuildPlan {
        BuildPlan::python_web(DEFAULT_MANIFEST, "app:app".parse().unwrap())
    }

    #[test]
    fn test_dockerfile_exact_output() {
        let rendered = dockerfile(&plan()).unwrap();
        assert_eq!(
            rendered,
            "FROM python:3.11-slim\n\
             WORKDIR /app\n\
             COPY requirements.txt .\n\
             RUN pip install --no-cache-dir -r requirements.txt\n\
             COPY . .\n\
             EXPOSE 5000\n\
             CMD gunicorn --bind 0.0.0.0:${PORT:-5000} app:app\n"
        );
    }

    #[test]
    fn test_env_step_rendered() {
        let mut p = plan();
        p.steps.insert(
            2,
            BuildStep::Env {
                name: "PYTHONUNBUFFERED".to_string(),
                value: "1".to_string(),
            },
        );
        let rendered = dockerfile(&p).unwrap();
        assert!(rendered.contains("ENV PYTHONUNBUFFERED=1\n"));
    }

    #[test]
    fn test_invalid_plan_not_rendered() {
        let mut p = plan();
        p.steps.pop();
        assert!(dockerfile(&p).is_err());
    }
}
