//! Registry integration tests
//!
//! Covers:
//! - One workflow per capability key
//! - Case-insensitive keys
//! - Lookup of registered and unknown capabilities
//! - Module loading through the process-wide registry

use fnpack::workflows::{builtin_modules, python_pip};
use fnpack::{
    default_registry, BuildParams, Capability, Registry, RegistryError, Workflow, WorkflowError,
    WorkflowSpec,
};
use serial_test::serial;
use yare::parameterized;

fn first(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    Ok(Workflow::new(spec, params))
}

fn second(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    Ok(Workflow::new(spec, params))
}

fn go_modules() -> Capability {
    Capability::new(Some("go"), Some("modules"), None)
}

#[test]
fn test_duplicate_registration_keeps_first() {
    let registry = Registry::new();
    registry
        .register(WorkflowSpec::new("First", go_modules(), first))
        .unwrap();

    let err = registry
        .register(WorkflowSpec::new("Second", go_modules(), second))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateCapability { ref key } if key == "go_modules_"));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get_workflow(&go_modules()).unwrap().name, "First");
}

#[parameterized(
    upper_language = { Some("Go"), Some("modules") },
    upper_everything = { Some("GO"), Some("MODULES") },
)]
fn test_keys_ignore_case(language: Option<&str>, dependency_manager: Option<&str>) {
    let registry = Registry::new();
    registry
        .register(WorkflowSpec::new("First", go_modules(), first))
        .unwrap();

    let shouted = Capability::new(language, dependency_manager, None);
    assert!(registry.contains(&shouted));
    assert!(matches!(
        registry.register(WorkflowSpec::new("Second", shouted, second)),
        Err(RegistryError::DuplicateCapability { .. })
    ));
}

#[test]
fn test_lookup_unknown_reports_requested_fields() {
    let registry = Registry::new();
    let err = registry
        .lookup(&Capability::new(Some("nope"), Some("npm"), None))
        .unwrap_err();

    match &err {
        RegistryError::WorkflowNotFound {
            language,
            dependency_manager,
            application_framework,
        } => {
            assert_eq!(language.as_deref(), Some("nope"));
            assert_eq!(dependency_manager.as_deref(), Some("npm"));
            assert!(application_framework.is_none());
        }
        other => panic!("Expected WorkflowNotFound, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "Unable to find a workflow matching given capability: nope, npm, (none)"
    );
}

#[test]
fn test_blank_name_never_reaches_the_registry() {
    let registry = Registry::new();
    assert!(matches!(
        registry.register(WorkflowSpec::new("  ", go_modules(), first)),
        Err(RegistryError::InvalidName)
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_empty_capability_registers() {
    let registry = Registry::new();
    registry
        .register(WorkflowSpec::new("Empty", Capability::default(), first))
        .unwrap();
    assert!(registry.contains(&Capability::new(None, None, None)));
}

#[test]
fn test_clear_allows_reloading_modules() {
    let registry = Registry::new();
    registry.load_module(&python_pip::MODULE).unwrap();
    assert!(registry.is_module_loaded(python_pip::MODULE.name));

    registry.clear();
    assert!(registry.is_empty());
    assert!(!registry.is_module_loaded(python_pip::MODULE.name));

    registry.load_module(&python_pip::MODULE).unwrap();
    assert_eq!(registry.workflow_names(), vec![python_pip::NAME.to_string()]);
}

#[test]
#[serial]
fn test_default_registry_loads_builtins_once() {
    let registry = default_registry();
    for module in builtin_modules() {
        registry.load_module(module).unwrap();
    }
    let count = registry.len();
    for module in builtin_modules() {
        registry.load_module(module).unwrap();
    }

    assert_eq!(registry.len(), count);
    assert!(registry.contains(&go_modules()));
}
