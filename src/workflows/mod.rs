//! Built-in workflows
//!
//! Each submodule exposes a `MODULE` that registers its workflow into a
//! [`Registry`](crate::registry::Registry). Callers pick modules by name; the
//! name [`DEFAULT_WORKFLOW_SOURCE`] stands for the whole set.

pub mod custom_make;
pub mod go_modules;
pub mod nodejs_npm;
pub mod python_pip;
pub mod rust_cargo;

use crate::error::BuilderError;
use crate::registry::WorkflowModule;

/// Name of the full built-in set.
pub const DEFAULT_WORKFLOW_SOURCE: &str = "fnpack.workflows";

static BUILTIN_MODULES: &[WorkflowModule] = &[
    python_pip::MODULE,
    nodejs_npm::MODULE,
    go_modules::MODULE,
    custom_make::MODULE,
    rust_cargo::MODULE,
];

pub fn builtin_modules() -> &'static [WorkflowModule] {
    BUILTIN_MODULES
}

/// Maps workflow source names to modules, keeping first-seen order and
/// dropping repeats.
pub fn find_modules<S: AsRef<str>>(names: &[S]) -> Result<Vec<WorkflowModule>, BuilderError> {
    let mut modules: Vec<WorkflowModule> = Vec::new();

    for name in names {
        let name = name.as_ref();
        let found: Vec<WorkflowModule> = if name == DEFAULT_WORKFLOW_SOURCE {
            BUILTIN_MODULES.to_vec()
        } else {
            let module = BUILTIN_MODULES
                .iter()
                .find(|m| m.name == name)
                .ok_or_else(|| BuilderError::UnknownWorkflowSource(name.to_string()))?;
            vec![*module]
        };

        for module in found {
            if !modules.iter().any(|m| m.name == module.name) {
                modules.push(module);
            }
        }
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::registry::Registry;

    fn names(modules: &[WorkflowModule]) -> Vec<&'static str> {
        modules.iter().map(|m| m.name).collect()
    }

    #[test]
    fn test_default_source_expands_to_all_builtins() {
        let modules = find_modules(&[DEFAULT_WORKFLOW_SOURCE]).unwrap();
        assert_eq!(names(&modules), names(builtin_modules()));
    }

    #[test]
    fn test_single_module_and_dedupe() {
        let modules = find_modules(&[
            "fnpack.workflows.go_modules",
            DEFAULT_WORKFLOW_SOURCE,
            "fnpack.workflows.go_modules",
        ])
        .unwrap();
        assert_eq!(modules.len(), builtin_modules().len());
        assert_eq!(modules[0].name, "fnpack.workflows.go_modules");
    }

    #[test]
    fn test_unknown_source_fails() {
        let err = find_modules(&["fnpack.workflows.cobol"]).unwrap_err();
        assert!(matches!(err, BuilderError::UnknownWorkflowSource(ref n) if n == "fnpack.workflows.cobol"));
    }

    #[test]
    fn test_empty_names_yield_no_modules() {
        let empty: [&str; 0] = [];
        assert!(find_modules(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_builtins_register_distinct_capabilities() {
        let registry = Registry::new();
        for module in builtin_modules() {
            registry.load_module(module).unwrap();
        }
        assert_eq!(registry.len(), builtin_modules().len());
        assert!(registry.contains(&Capability::new(Some("python"), Some("pip"), None)));
        assert!(registry.contains(&Capability::new(Some("provided"), None, None)));
        assert!(registry.contains(&Capability::new(Some("rust"), Some("cargo"), None)));
    }
}
