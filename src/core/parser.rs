//! YAML parsing and validation.
//!
//! Parses steprun.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - A recipe must declare at least one step or include
//! - Required fields per step type

use super::types::*;
use crate::resources::package::PROVIDERS;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a steprun.yaml file from disk.
pub fn parse_recipe_file(path: &Path) -> Result<RecipeConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_recipe(&content)
}

/// Parse a steprun.yaml from a string.
pub fn parse_recipe(yaml: &str) -> Result<RecipeConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed recipe. Returns a list of errors (empty = valid).
pub fn validate_recipe(config: &RecipeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    if config.version != "1.0" {
        push(format!("version must be \"1.0\", got \"{}\"", config.version));
    }

    if config.name.is_empty() {
        push("name must not be empty".to_string());
    }

    if config.steps.is_empty() && config.include.is_empty() {
        push("recipe has no steps".to_string());
    }

    for inc in &config.include {
        if inc.trim().is_empty() {
            push("include path must not be empty".to_string());
        }
    }

    for (id, step) in &config.steps {
        match step.step_type {
            StepType::Package => {
                if step.package.as_deref().is_none_or(str::is_empty) {
                    push(format!("step '{}' (package) has no package", id));
                }
                if let Some(ref provider) = step.provider {
                    if !PROVIDERS.contains(&provider.as_str()) {
                        push(format!(
                            "step '{}' (package) has unsupported provider '{}'",
                            id, provider
                        ));
                    }
                }
            }
            StepType::Directory => {
                if step.path.as_deref().is_none_or(str::is_empty) {
                    push(format!("step '{}' (directory) has no path", id));
                }
            }
            StepType::Execute => {
                if step.command.as_deref().is_none_or(|c| c.trim().is_empty()) {
                    push(format!("step '{}' (execute) has no command", id));
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  compiler:
    type: package
    package: g++
  build:
    type: execute
    command: make
"#;
        let config = parse_recipe(yaml).unwrap();
        assert_eq!(config.name, "test");
        let errors = validate_recipe(&config);
        assert!(
            errors.is_empty(),
            "unexpected errors: {:?}",
            errors.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_bad_version() {
        let yaml = r#"
version: "2.0"
name: test
steps:
  build:
    type: execute
    command: make
"#;
        let config = parse_recipe(yaml).unwrap();
        let errors = validate_recipe(&config);
        assert!(errors.iter().any(|e| e.message.contains("version")));
    }

    #[test]
    fn test_empty_steps_rejected() {
        let yaml = r#"
version: "1.0"
name: test
steps: {}
"#;
        let config = parse_recipe(yaml).unwrap();
        let errors = validate_recipe(&config);
        assert!(errors.iter().any(|e| e.message.contains("no steps")));
    }

    #[test]
    fn test_include_only_is_valid() {
        let yaml = r#"
version: "1.0"
name: wrapper
include: [cmake-bin.yaml]
"#;
        let config = parse_recipe(yaml).unwrap();
        assert!(validate_recipe(&config).is_empty());
    }

    #[test]
    fn test_misspelled_step_key_rejected() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  configure:
    type: execute
    command: cmake ..
    create: Makefile
"#;
        let err = parse_recipe(yaml).unwrap_err();
        assert!(err.contains("unknown field `create`"), "got: {}", err);
    }

    #[test]
    fn test_package_no_package() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  compiler:
    type: package
"#;
        let config = parse_recipe(yaml).unwrap();
        let errors = validate_recipe(&config);
        assert!(errors.iter().any(|e| e.message.contains("has no package")));
    }

    #[test]
    fn test_unsupported_provider() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  compiler:
    type: package
    package: gcc
    provider: brew
"#;
        let config = parse_recipe(yaml).unwrap();
        let errors = validate_recipe(&config);
        assert!(errors.iter().any(|e| e.message.contains("unsupported provider 'brew'")));
    }

    #[test]
    fn test_directory_no_path() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  workdir:
    type: directory
"#;
        let config = parse_recipe(yaml).unwrap();
        let errors = validate_recipe(&config);
        assert!(errors.iter().any(|e| e.message.contains("has no path")));
    }

    #[test]
    fn test_execute_blank_command() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  build:
    type: execute
    command: "   "
"#;
        let config = parse_recipe(yaml).unwrap();
        let errors = validate_recipe(&config);
        assert!(errors.iter().any(|e| e.message.contains("has no command")));
    }

    #[test]
    fn test_unknown_step_type() {
        let yaml = r#"
version: "1.0"
name: test
steps:
  svc:
    type: service
"#;
        assert!(parse_recipe(yaml).is_err());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steprun.yaml");
        std::fs::write(
            &path,
            r#"
version: "1.0"
name: file-test
steps:
  build:
    type: execute
    command: make
"#,
        )
        .unwrap();
        let config = parse_recipe_file(&path).unwrap();
        assert_eq!(config.name, "file-test");
    }

    #[test]
    fn test_parse_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_recipe_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_recipe("not: [valid: yaml: {{");
        assert!(result.is_err());
    }
}
