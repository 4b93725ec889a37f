#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::path::Path;

use xsd_ormgen::generator::CustomTemplates;
use xsd_ormgen::{generate, parse_graph, ClassGraph, GenerationError, GeneratorConfig};

fn address() -> ClassGraph {
    parse_graph(
        r#"
module: address
classes:
  - name: Address
    members:
      - { name: street, type: "xs:string" }
"#,
    )
    .unwrap()
}

fn with_templates(dir: &Path) -> GeneratorConfig {
    GeneratorConfig {
        template_dir: Some(dir.to_path_buf()),
        ..GeneratorConfig::default()
    }
}

#[test]
fn test_custom_templates_override_builtin_ones() {
    let config = with_templates(&common::fixture_path("templates"));
    let output = generate(&address(), &config).unwrap();

    assert_eq!(
        output.files[Path::new("models/__init__.py")],
        "# custom package init\nfrom . import address\n"
    );
    let module = &output.files[Path::new("models/address.py")];
    // module.py.j2 is absent, so the built-in module template wraps the custom model.
    assert!(module.starts_with("# Generated by xsd-ormgen"));
    assert!(module.contains("class Address(models.AbstractModel):\n    _name = \"spec.10.address\"\n    _fields_total = 1\n"));
    assert!(module.contains(
        "    spec10_street = fields.Char(string=\"street\", xsd_required=True, xsd_name=\"street\", xsd_type=\"string\", xsd_min_occurs=1, xsd_max_occurs=1)"
    ));
}

#[test]
fn test_load_reports_missing_templates() {
    let templates = CustomTemplates::load(&common::fixture_path("templates")).unwrap();
    assert!(templates.model.is_some());
    assert!(templates.init.is_some());
    assert!(templates.module.is_none());

    let err = CustomTemplates::load(&common::fixture_path("no-such-dir")).unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)));
}

#[test]
fn test_undefined_variable_is_contract_violation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("model.py.j2"),
        "class {{ class_name }}({{ base_class }}):\n    pass\n",
    )
    .unwrap();
    let err = generate(&address(), &with_templates(dir.path())).unwrap_err();
    assert!(matches!(err, GenerationError::TemplateContractViolation(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_template_syntax_error_fails_before_generation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("init.py.j2"), "{% for m in modules %}\n").unwrap();
    let err = CustomTemplates::load(dir.path()).unwrap_err();
    assert_eq!(err.kind(), "template_contract_violation");
}
