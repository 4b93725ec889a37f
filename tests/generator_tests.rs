#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use pretty_assertions::assert_eq;
use xsd_ormgen::generator::FieldKind;
use xsd_ormgen::{generate, parse_graph, GeneratorConfig};

const ADDRESS: &str = r#"
namespace: urn:example
module: address
classes:
  - name: Address
    doc: A postal address.
    members:
      - { name: street, type: "xs:string", doc: "Street name." }
      - { name: zip, type: "xs:decimal", facets: { totalDigits: 5, fractionDigits: 0 } }
      - { name: country, type: "xs:string", fixed: US }
"#;

#[test]
fn test_address_field_kinds() {
    let output = generate(&parse_graph(ADDRESS).unwrap(), &GeneratorConfig::default()).unwrap();
    let address = output.model("spec.10.address").unwrap();
    let kinds: Vec<(&str, &FieldKind)> = address
        .fields
        .iter()
        .map(|f| (f.name.as_str(), &f.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("spec10_street", &FieldKind::Char),
            ("spec10_zip", &FieldKind::Float),
            (
                "spec10_country",
                &FieldKind::Selection {
                    values: vec!["US".into()],
                    constant: None
                }
            ),
        ]
    );
    assert_eq!(address.field("spec10_zip").unwrap().constraints.digits, Some((5, 0)));
    assert_eq!(address.field("spec10_street").unwrap().label, "Street name");

    let source = &output.files[Path::new("models/address.py")];
    assert!(source.contains("    _name = \"spec.10.address\"\n"));
    assert!(source.contains("    _xsd_namespace = \"urn:example\"\n"));
    assert!(source.contains("        default=\"US\",\n"));
}

#[test]
fn test_generation_is_idempotent() {
    let graph = parse_graph(ADDRESS).unwrap();
    let config = GeneratorConfig::default();
    let first = generate(&graph, &config).unwrap();
    let second = generate(&graph, &config).unwrap();
    assert_eq!(first.files, second.files);
}

#[test]
fn test_builtin_type_mapping() {
    let graph = parse_graph(
        r#"
classes:
  - name: Sample
    members:
      - { name: flag, type: "xs:boolean", default: "true" }
      - { name: count, type: "xs:nonNegativeInteger" }
      - { name: day, type: "xs:date" }
      - { name: at, type: "xs:dateTime" }
      - { name: ratio, type: "xs:double" }
      - { name: code, type: "xs:token", facets: { pattern: "^(A|B|C)$" } }
      - { name: tag, type: "xs:string", facets: { maxLength: 8 } }
"#,
    )
    .unwrap();
    let output = generate(&graph, &GeneratorConfig::default()).unwrap();
    let sample = output.model("spec.10.sample").unwrap();
    let kind = |name: &str| sample.field(name).unwrap().kind.clone();
    assert_eq!(kind("spec10_flag"), FieldKind::Boolean);
    assert_eq!(kind("spec10_count"), FieldKind::Integer);
    assert_eq!(kind("spec10_day"), FieldKind::Date);
    assert_eq!(kind("spec10_at"), FieldKind::Datetime);
    assert_eq!(kind("spec10_ratio"), FieldKind::Float);
    assert_eq!(
        kind("spec10_code"),
        FieldKind::Selection {
            values: vec!["A".into(), "B".into(), "C".into()],
            constant: None
        }
    );
    assert_eq!(sample.field("spec10_tag").unwrap().constraints.size, Some(8));

    let source = &output.files[Path::new("models/models.py")];
    assert!(source.contains("        default=True,\n"));
    assert!(source.contains("        size=8,\n"));
}

#[test]
fn test_snake_case_fields_and_reserved_words() {
    let graph = parse_graph(
        r#"
classes:
  - name: Item
    members:
      - { name: vProd, type: "xs:string" }
"#,
    )
    .unwrap();
    let config = GeneratorConfig {
        profile: "nfe".into(),
        version: "40".into(),
        field_case: xsd_ormgen::config::FieldCase::Snake,
        ..GeneratorConfig::default()
    };
    let output = generate(&graph, &config).unwrap();
    let item = output.model("nfe.40.item").unwrap();
    assert!(item.field("nfe40_v_prod").is_some());
    assert!(output.files[Path::new("models/models.py")].contains("_inherit = \"spec.mixin.nfe\""));
}
