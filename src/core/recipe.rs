//! Recipe loading and include expansion into a flat step sequence.
//!
//! A recipe may `include` other recipe files. Included steps are spliced in
//! front of the including recipe's own steps, depth-first, with namespaced
//! names (e.g. `cmake-bin/download`). Inclusion is linear: there is no
//! dependency graph and each file appears at most once on the include stack.

use super::parser;
use super::resolver;
use super::types::{RecipeConfig, Step};
use std::path::{Path, PathBuf};

/// A root recipe plus its fully expanded, ordered step sequence.
#[derive(Debug, Clone)]
pub struct LoadedRecipe {
    pub config: RecipeConfig,
    pub steps: Vec<Step>,
}

/// Load a recipe file, expand includes, and resolve templates for `host`.
pub fn load_steps(path: &Path, host: &str) -> Result<LoadedRecipe, String> {
    let mut stack = Vec::new();
    let config = load_validated(path)?;
    let steps = expand(path, &config, host, None, &mut stack)?;
    Ok(LoadedRecipe { config, steps })
}

fn load_validated(path: &Path) -> Result<RecipeConfig, String> {
    let config = parser::parse_recipe_file(path)?;
    let errors = parser::validate_recipe(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Err(format!("{}: {}", path.display(), joined.join("; ")))
}

fn expand(
    path: &Path,
    config: &RecipeConfig,
    host: &str,
    namespace: Option<&str>,
    stack: &mut Vec<PathBuf>,
) -> Result<Vec<Step>, String> {
    let canonical = path
        .canonicalize()
        .map_err(|e| format!("cannot resolve {}: {}", path.display(), e))?;
    if stack.contains(&canonical) {
        return Err(format!("include cycle at {}", path.display()));
    }
    stack.push(canonical);

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut steps = Vec::new();

    for inc in &config.include {
        let inc_path = base_dir.join(inc);
        let inc_config = load_validated(&inc_path)?;
        let inc_ns = match namespace {
            Some(ns) => format!("{}/{}", ns, inc_config.name),
            None => inc_config.name.clone(),
        };
        steps.extend(expand(&inc_path, &inc_config, host, Some(&inc_ns), stack)?);
    }

    for (id, spec) in &config.steps {
        let step = resolver::build_step(id, spec, &config.params, host)?;
        let step = match namespace {
            Some(ns) => {
                let name = format!("{}/{}", ns, step.name());
                step.named(name)
            }
            None => step,
        };
        steps.push(step);
    }

    stack.pop();
    Ok(steps)
}
