use std::{fs, sync::Arc};

use lambdachain_registry::{DirectoryWorkflowSource, DocumentFormat, RegistryError, WorkflowRegistry, WorkflowSource};
use tempfile::TempDir;

const SIGNUP_YAML: &str = r#"
name: signup
description: create, verify, cleanup
steps:
  - name: create
    handler: user_create
    input_template: '{"data": {"email": "${{ input.data.email }}"}}'
  - name: verify
    handler: user_read
    input_template: '{"data": {"id": ${{ steps.create.output.data.id }}}}'
  - name: cleanup
    handler: user_delete
    input_template: '{"data": {"id": ${{ steps.create.output.data.id }}}}'
"#;

fn workflows_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("signup.yaml"), SIGNUP_YAML).expect("write yaml");
    fs::write(
        dir.path().join("lookup.json"),
        r#"{"steps":[{"name":"read","handler":"user_read","input_template":"{}"}]}"#,
    )
    .expect("write json");
    fs::write(dir.path().join("notes.txt"), "not a workflow").expect("write txt");
    dir
}

#[test]
fn names_lists_only_workflow_documents() {
    let dir = workflows_dir();
    let source = DirectoryWorkflowSource::new(dir.path());
    assert_eq!(source.names().unwrap(), vec!["lookup".to_string(), "signup".to_string()]);
}

#[test]
fn fetch_detects_format_from_extension() {
    let dir = workflows_dir();
    let source = DirectoryWorkflowSource::new(dir.path());
    assert_eq!(source.fetch("lookup").unwrap().format, DocumentFormat::Json);
    assert_eq!(source.fetch("signup").unwrap().format, DocumentFormat::Yaml);
}

#[test]
fn registry_loads_all_documents_from_directory() {
    let dir = workflows_dir();
    let registry = WorkflowRegistry::new(Arc::new(DirectoryWorkflowSource::new(dir.path())));

    let report = registry.load_all().unwrap();
    assert!(report.is_clean());
    assert_eq!(registry.list(), vec!["lookup".to_string(), "signup".to_string()]);

    let signup = registry.get("signup").unwrap();
    assert_eq!(signup.description, "create, verify, cleanup");
    assert_eq!(signup.steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["create", "verify", "cleanup"]);

    let lookup = registry.get("lookup").unwrap();
    assert_eq!(lookup.name, "lookup");
}

#[test]
fn missing_file_and_malformed_file_are_distinct_errors() {
    let dir = workflows_dir();
    fs::write(dir.path().join("broken.yaml"), "steps:\n  - name: [unclosed\n").unwrap();
    let registry = WorkflowRegistry::new(Arc::new(DirectoryWorkflowSource::new(dir.path())));

    let missing = registry.load("absent").unwrap_err();
    assert!(matches!(missing, RegistryError::NotFound { .. }));
    assert!(!missing.is_definition_error());

    let malformed = registry.load("broken").unwrap_err();
    assert!(matches!(malformed, RegistryError::Parse { .. }));
    assert!(malformed.is_definition_error());
}

#[test]
fn names_cannot_escape_the_workflows_directory() {
    let outer = tempfile::tempdir().unwrap();
    fs::write(outer.path().join("secret.yaml"), SIGNUP_YAML).unwrap();
    let inner = outer.path().join("workflows");
    fs::create_dir(&inner).unwrap();
    fs::write(inner.join("signup.v2.yaml"), SIGNUP_YAML).unwrap();
    let source = DirectoryWorkflowSource::new(&inner);

    for name in ["../secret", "..", "nested/signup", "/etc/passwd", ".hidden", ""] {
        assert!(matches!(source.fetch(name), Err(RegistryError::NotFound { .. })), "{name}");
    }
    assert!(source.fetch("signup.v2").is_ok());

    let registry = WorkflowRegistry::new(Arc::new(source));
    assert!(matches!(registry.load("../secret"), Err(RegistryError::NotFound { .. })));
}

#[test]
fn missing_directory_is_a_read_error() {
    let source = DirectoryWorkflowSource::new("/nonexistent/lambdachain/workflows");
    assert!(matches!(source.names(), Err(RegistryError::Read { .. })));
}
