use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use super::types::{
    Derivation, DerivationKind, Facets, MaxOccurs, Occurs, QName, SchemaAttribute, SchemaClass,
    SchemaGroup, SchemaMember, SimpleType, TypeRef,
};
use super::ClassGraph;
use crate::error::GenerationError;

/// Prefixes that mark a type reference as an XSD built-in.
const BUILTIN_PREFIXES: [&str; 3] = ["xs:", "xsd:", "{http://www.w3.org/2001/XMLSchema}"];

/// Module used when neither the class nor the document names one.
pub const DEFAULT_MODULE: &str = "models";

/// Serialized form of the analyzed class graph, as exported by the schema compiler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGraph {
    /// Default target namespace for names written without `{ns}`.
    pub namespace: Option<String>,
    /// Default module for classes that do not name one.
    pub module: Option<String>,
    pub classes: Vec<RawClass>,
    pub simple_types: Vec<RawSimpleType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawClass {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub restricts: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub members: Vec<RawMember>,
    /// Anonymous complex types declared inside this one.
    #[serde(default)]
    pub inner: Vec<RawClass>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMember {
    Group { group: RawGroup },
    Attribute(RawAttribute),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGroup {
    pub name: Option<String>,
    pub members: Vec<RawMember>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RawAttribute {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, alias = "minOccurs")]
    pub min_occurs: Option<u32>,
    #[serde(default, alias = "maxOccurs")]
    pub max_occurs: Option<MaxOccurs>,
    #[serde(default)]
    pub attribute: bool,
    #[serde(default)]
    pub choice: Option<u32>,
    #[serde(default)]
    pub fixed: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSimpleType {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    pub base: String,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub value_docs: BTreeMap<String, String>,
}

struct Names<'a> {
    namespace: Option<&'a str>,
    classes: BTreeSet<QName>,
    simple_types: BTreeSet<QName>,
}

impl Names<'_> {
    fn qualify(&self, raw: &str) -> Result<QName, GenerationError> {
        let q = QName::parse(raw).map_err(GenerationError::Graph)?;
        if q.namespace.is_none() && !raw.trim_start().starts_with('{') {
            return Ok(QName::new(self.namespace, q.local));
        }
        Ok(q)
    }

    fn resolve_type(&self, raw: &str) -> Result<TypeRef, GenerationError> {
        for prefix in BUILTIN_PREFIXES {
            if let Some(local) = raw.strip_prefix(prefix) {
                return Ok(TypeRef::Builtin(local.to_string()));
            }
        }
        let q = self.qualify(raw)?;
        if self.simple_types.contains(&q) {
            Ok(TypeRef::Simple(q))
        } else {
            // Unknown names are kept as class references; the transformer
            // degrades them to untyped fields.
            Ok(TypeRef::Class(q))
        }
    }
}

fn collect_class_names(
    raw: &RawClass,
    outer: Option<&str>,
    names: &mut Names<'_>,
) -> Result<(), GenerationError> {
    let local = match outer {
        Some(outer) => format!("{outer}.{}", raw.name),
        None => raw.name.clone(),
    };
    let q = names.qualify(&local)?;
    let path = q.local.clone();
    names.classes.insert(q);
    for inner in &raw.inner {
        collect_class_names(inner, Some(&path), names)?;
    }
    Ok(())
}

fn build_member(raw: &RawMember, names: &Names<'_>) -> Result<SchemaMember, GenerationError> {
    match raw {
        RawMember::Group { group } => Ok(SchemaMember::Group(SchemaGroup {
            name: group.name.clone(),
            members: group
                .members
                .iter()
                .map(|m| build_member(m, names))
                .collect::<Result<_, _>>()?,
        })),
        RawMember::Attribute(attr) => {
            let occurs = Occurs::new(
                attr.min_occurs.unwrap_or(1),
                attr.max_occurs.unwrap_or(MaxOccurs::Bounded(1)),
            );
            Ok(SchemaMember::Attribute(SchemaAttribute {
                name: attr.name.clone(),
                namespace: attr.namespace.clone(),
                type_ref: names.resolve_type(&attr.type_name)?,
                occurs,
                is_attribute: attr.attribute,
                choice: attr.choice,
                fixed: attr.fixed.clone(),
                default: attr.default.clone(),
                facets: attr.facets.clone(),
                doc: attr.doc.clone(),
            }))
        }
    }
}

fn build_class(
    raw: &RawClass,
    outer: Option<(&QName, &str)>,
    default_module: &str,
    names: &Names<'_>,
    out: &mut Vec<SchemaClass>,
) -> Result<(), GenerationError> {
    let (qname, module) = match outer {
        Some((outer, module)) => (
            QName::new(outer.namespace.as_deref(), format!("{}.{}", outer.local, raw.name)),
            raw.module.clone().unwrap_or_else(|| module.to_string()),
        ),
        None => (
            names.qualify(&raw.name)?,
            raw.module.clone().unwrap_or_else(|| default_module.to_string()),
        ),
    };
    let derivation = match (&raw.extends, &raw.restricts) {
        (Some(_), Some(_)) => {
            return Err(GenerationError::Graph(format!(
                "class '{qname}' declares both an extension and a restriction base"
            )))
        }
        (Some(base), None) => Some(Derivation {
            kind: DerivationKind::Extension,
            base: names.qualify(base)?,
        }),
        (None, Some(base)) => Some(Derivation {
            kind: DerivationKind::Restriction,
            base: names.qualify(base)?,
        }),
        (None, None) => None,
    };
    let members = raw
        .members
        .iter()
        .map(|m| build_member(m, names))
        .collect::<Result<Vec<_>, _>>()?;
    out.push(SchemaClass {
        qname: qname.clone(),
        module: module.clone(),
        members,
        derivation,
        is_abstract: raw.is_abstract,
        doc: raw.doc.clone(),
    });
    for inner in &raw.inner {
        build_class(inner, Some((&qname, &module)), default_module, names, out)?;
    }
    Ok(())
}

/// Resolve the raw document into a [`ClassGraph`].
///
/// Inner classes are flattened to top-level classes named `Outer.Inner` and
/// placed right after their outer class; type references are classified as
/// built-in, simple type or class reference.
pub fn build_graph(raw: &RawGraph) -> Result<ClassGraph, GenerationError> {
    let mut names = Names {
        namespace: raw.namespace.as_deref().filter(|ns| !ns.is_empty()),
        classes: BTreeSet::new(),
        simple_types: BTreeSet::new(),
    };
    for st in &raw.simple_types {
        let q = names.qualify(&st.name)?;
        names.simple_types.insert(q);
    }
    for class in &raw.classes {
        collect_class_names(class, None, &mut names)?;
    }

    let default_module = raw.module.as_deref().unwrap_or(DEFAULT_MODULE);
    let mut simple_types = Vec::with_capacity(raw.simple_types.len());
    for st in &raw.simple_types {
        let base = names.resolve_type(&st.base)?;
        if base.is_class() {
            return Err(GenerationError::Graph(format!(
                "simple type '{}' derives from unknown type '{}'",
                st.name, st.base
            )));
        }
        simple_types.push(SimpleType {
            qname: names.qualify(&st.name)?,
            module: st
                .module
                .clone()
                .unwrap_or_else(|| default_module.to_string()),
            base,
            facets: st.facets.clone(),
            doc: st.doc.clone(),
            value_docs: st.value_docs.clone(),
        });
    }

    let mut classes = Vec::with_capacity(raw.classes.len());
    for class in &raw.classes {
        build_class(class, None, default_module, &names, &mut classes)?;
    }
    ClassGraph::new(classes, simple_types)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(yaml: &str) -> RawGraph {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_type_classification() {
        let g = build_graph(&raw(
            r#"
namespace: urn:test
classes:
  - name: Address
    members:
      - { name: street, type: "xs:string" }
      - { name: zip, type: TZip }
      - { name: owner, type: Person }
      - { name: ghost, type: Missing }
  - name: Person
simple_types:
  - { name: TZip, base: "xs:string", facets: { maxLength: 8 } }
"#,
        ))
        .unwrap();
        let address = g.class_by_local("Address").unwrap();
        let types: Vec<_> = address
            .members
            .iter()
            .map(|m| match m {
                SchemaMember::Attribute(a) => a.type_ref.clone(),
                SchemaMember::Group(_) => panic!("unexpected group"),
            })
            .collect();
        assert_eq!(types[0], TypeRef::Builtin("string".into()));
        assert_eq!(types[1], TypeRef::Simple(QName::new(Some("urn:test"), "TZip")));
        assert_eq!(types[2], TypeRef::Class(QName::new(Some("urn:test"), "Person")));
        assert_eq!(types[3], TypeRef::Class(QName::new(Some("urn:test"), "Missing")));
    }

    #[test]
    fn test_inner_classes_are_flattened_after_outer() {
        let g = build_graph(&raw(
            r#"
module: nfe
classes:
  - name: TNFe
    members:
      - { name: infNFe, type: TNFe.InfNFe }
    inner:
      - name: InfNFe
        members:
          - { name: Id, type: "xs:ID", attribute: true }
  - name: TProt
"#,
        ))
        .unwrap();
        let names: Vec<_> = g.classes.iter().map(|c| c.qname.local.as_str()).collect();
        assert_eq!(names, vec!["TNFe", "TNFe.InfNFe", "TProt"]);
        assert_eq!(g.classes[1].module, "nfe");
    }

    #[test]
    fn test_groups_and_occurs() {
        let g = build_graph(&raw(
            r#"
classes:
  - name: Order
    members:
      - group:
          name: Header
          members:
            - { name: id, type: "xs:int" }
      - { name: line, type: "xs:string", min_occurs: 0, max_occurs: unbounded }
"#,
        ))
        .unwrap();
        let order = g.class_by_local("Order").unwrap();
        assert!(matches!(order.members[0], SchemaMember::Group(_)));
        match &order.members[1] {
            SchemaMember::Attribute(a) => {
                assert_eq!(a.occurs, Occurs::new(0, MaxOccurs::Unbounded));
            }
            SchemaMember::Group(_) => panic!("expected attribute"),
        }
    }

    #[test]
    fn test_both_derivations_rejected() {
        let err = build_graph(&raw(
            r#"
classes:
  - { name: A, extends: B, restricts: C }
  - { name: B }
  - { name: C }
"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("both an extension and a restriction"));
    }
}
