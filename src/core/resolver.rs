//! Template resolution and step construction.
//!
//! Resolves `{{params.key}}` and `{{host}}` templates in step fields, then
//! turns each `StepSpec` into an immutable `Step`.

use super::types::*;
use std::collections::HashMap;

/// Resolve all template variables in a string.
pub fn resolve_template(
    template: &str,
    params: &HashMap<String, serde_yaml_ng::Value>,
    host: &str,
) -> Result<String, String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..]
            .find("}}")
            .ok_or_else(|| format!("unclosed template at position {}", open))?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim();

        let value = if let Some(param_key) = key.strip_prefix("params.") {
            params
                .get(param_key)
                .map(yaml_value_to_string)
                .ok_or_else(|| format!("unknown param: {}", param_key))?
        } else if key == "host" {
            host.to_string()
        } else {
            return Err(format!("unknown template variable: {}", key));
        };

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

fn resolve_opt(
    field: &Option<String>,
    params: &HashMap<String, serde_yaml_ng::Value>,
    host: &str,
) -> Result<Option<String>, String> {
    field
        .as_deref()
        .map(|s| resolve_template(s, params, host))
        .transpose()
}

/// Resolve templates in a step spec and build the runtime `Step`.
pub fn build_step(
    id: &str,
    spec: &StepSpec,
    params: &HashMap<String, serde_yaml_ng::Value>,
    host: &str,
) -> Result<Step, String> {
    let missing = |field: &str| format!("step '{}' ({}) has no {}", id, spec.step_type, field);

    let step = match spec.step_type {
        StepType::Package => {
            let package = resolve_opt(&spec.package, params, host)?.ok_or_else(|| missing("package"))?;
            let provider = spec.provider.as_deref().unwrap_or("apt");
            Step::package_with(package, provider)
        }
        StepType::Directory => {
            let path = resolve_opt(&spec.path, params, host)?.ok_or_else(|| missing("path"))?;
            Step::directory(path)
        }
        StepType::Execute => {
            let command = resolve_opt(&spec.command, params, host)?.ok_or_else(|| missing("command"))?;
            let mut step = Step::execute(id, command);
            if let Some(cwd) = resolve_opt(&spec.cwd, params, host)? {
                step = step.cwd(cwd);
            }
            if let Some(creates) = resolve_opt(&spec.creates, params, host)? {
                step = step.creates(creates);
            }
            step
        }
    };

    Ok(step.named(spec.name.clone().unwrap_or_else(|| id.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn params() -> HashMap<String, serde_yaml_ng::Value> {
        let mut p = HashMap::new();
        p.insert(
            "base".to_string(),
            serde_yaml_ng::Value::String("/home/vagrant/dev".to_string()),
        );
        p.insert(
            "jobs".to_string(),
            serde_yaml_ng::Value::Number(4u64.into()),
        );
        p
    }

    fn spec(step_type: StepType) -> StepSpec {
        StepSpec {
            step_type,
            name: None,
            package: None,
            provider: None,
            path: None,
            command: None,
            cwd: None,
            creates: None,
        }
    }

    #[test]
    fn test_resolve_params_and_host() {
        let out = resolve_template("{{params.base}}/{{host}}", &params(), "buildbox").unwrap();
        assert_eq!(out, "/home/vagrant/dev/buildbox");
    }

    #[test]
    fn test_resolve_number_param() {
        let out = resolve_template("make -j{{ params.jobs }}", &params(), "h").unwrap();
        assert_eq!(out, "make -j4");
    }

    #[test]
    fn test_resolve_no_templates() {
        let out = resolve_template("cmake ..", &params(), "h").unwrap();
        assert_eq!(out, "cmake ..");
    }

    #[test]
    fn test_resolve_unknown_param() {
        let err = resolve_template("{{params.nope}}", &params(), "h").unwrap_err();
        assert!(err.contains("unknown param"));
    }

    #[test]
    fn test_resolve_unknown_variable() {
        let err = resolve_template("{{machine.addr}}", &params(), "h").unwrap_err();
        assert!(err.contains("unknown template variable"));
    }

    #[test]
    fn test_resolve_unclosed() {
        let err = resolve_template("{{host", &params(), "h").unwrap_err();
        assert!(err.contains("unclosed"));
    }

    #[test]
    fn test_build_directory_step() {
        let mut s = spec(StepType::Directory);
        s.path = Some("{{params.base}}/{{host}}".to_string());
        let step = build_step("workdir", &s, &params(), "buildbox").unwrap();
        assert_eq!(step.name(), "workdir");
        assert_eq!(
            step.precondition(),
            &Precondition::DirectoryExists(PathBuf::from("/home/vagrant/dev/buildbox"))
        );
    }

    #[test]
    fn test_build_execute_step_with_creates() {
        let mut s = spec(StepType::Execute);
        s.name = Some("run cmake".to_string());
        s.command = Some("cmake ..".to_string());
        s.cwd = Some("{{params.base}}/{{host}}".to_string());
        s.creates = Some("{{params.base}}/{{host}}/Makefile".to_string());
        let step = build_step("configure", &s, &params(), "buildbox").unwrap();
        assert_eq!(step.name(), "run cmake");
        assert_eq!(
            step.working_directory(),
            Some(Path::new("/home/vagrant/dev/buildbox"))
        );
        assert_eq!(
            step.precondition(),
            &Precondition::FileExists(PathBuf::from("/home/vagrant/dev/buildbox/Makefile"))
        );
    }

    #[test]
    fn test_build_execute_step_relative_creates() {
        let mut s = spec(StepType::Execute);
        s.command = Some("cmake ..".to_string());
        s.cwd = Some("{{params.base}}/{{host}}".to_string());
        s.creates = Some("Makefile".to_string());
        let step = build_step("configure", &s, &params(), "buildbox").unwrap();
        assert_eq!(
            step.precondition(),
            &Precondition::FileExists(PathBuf::from("/home/vagrant/dev/buildbox/Makefile"))
        );
    }

    #[test]
    fn test_build_execute_step_without_creates_always_runs() {
        let mut s = spec(StepType::Execute);
        s.command = Some("make".to_string());
        let step = build_step("build", &s, &params(), "buildbox").unwrap();
        assert_eq!(step.precondition(), &Precondition::Always);
    }

    #[test]
    fn test_build_package_default_provider() {
        let mut s = spec(StepType::Package);
        s.package = Some("g++".to_string());
        let step = build_step("compiler", &s, &params(), "h").unwrap();
        assert_eq!(
            step.action(),
            &Action::InstallPackage {
                package: "g++".to_string(),
                provider: "apt".to_string()
            }
        );
    }

    #[test]
    fn test_build_missing_field() {
        let s = spec(StepType::Directory);
        let err = build_step("workdir", &s, &params(), "h").unwrap_err();
        assert!(err.contains("has no path"));
    }
}
