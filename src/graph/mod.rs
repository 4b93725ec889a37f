//! # Schema Graph Module
//!
//! Read-only view over the analyzed XSD class graph produced by an external
//! schema compiler. The generator never inspects the compiler's own objects;
//! it only goes through the [`SchemaGraph`] trait, which exposes:
//!
//! - complex types ([`SchemaClass`]) in schema order
//! - named simple types ([`SimpleType`]) with their facets
//!
//! [`ClassGraph`] is the provided implementation. It is usually loaded from a
//! YAML or JSON export of the class graph (see [`load_graph`]):
//!
//! ```yaml
//! namespace: urn:example
//! module: address
//! classes:
//!   - name: Address
//!     members:
//!       - { name: street, type: "xs:string" }
//!       - { name: zip, type: "xs:decimal", facets: { totalDigits: 5, fractionDigits: 0 } }
//!       - { name: country, type: "xs:string", fixed: US }
//! ```

mod build;
mod load;
mod types;

pub use build::{build_graph, RawAttribute, RawClass, RawGraph, RawGroup, RawMember, DEFAULT_MODULE};
pub use load::{load_graph, parse_graph};
pub use types::*;

use std::collections::BTreeMap;

use crate::error::GenerationError;

/// Fixed-shape access to an analyzed class graph.
pub trait SchemaGraph {
    /// All complex types, in schema order.
    fn classes(&self) -> &[SchemaClass];

    /// Look up a complex type by qualified name.
    fn class(&self, qname: &QName) -> Option<&SchemaClass>;

    /// Look up a named simple type by qualified name.
    fn simple_type(&self, qname: &QName) -> Option<&SimpleType>;

    /// All named simple types, in schema order.
    fn simple_types(&self) -> &[SimpleType];

    /// Follow a simple type down to its built-in base, layering facets from
    /// the most derived type over its bases.
    ///
    /// Returns the built-in local name and the merged facets.
    fn resolve_simple(&self, qname: &QName) -> Result<(String, Facets), GenerationError> {
        let mut facets = Facets::default();
        let mut current = qname.clone();
        let mut seen = Vec::new();
        loop {
            if seen.contains(&current) {
                return Err(GenerationError::Graph(format!(
                    "simple type '{qname}' derives from itself"
                )));
            }
            let st = self.simple_type(&current).ok_or_else(|| {
                GenerationError::Graph(format!("unknown simple type '{current}'"))
            })?;
            facets = facets.over(&st.facets);
            seen.push(current);
            match &st.base {
                TypeRef::Builtin(name) => return Ok((name.clone(), facets)),
                TypeRef::Simple(next) => current = next.clone(),
                TypeRef::Class(other) => {
                    return Err(GenerationError::Graph(format!(
                        "simple type '{qname}' derives from complex type '{other}'"
                    )))
                }
            }
        }
    }
}

/// In-memory class graph indexed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct ClassGraph {
    pub classes: Vec<SchemaClass>,
    pub simple_types: Vec<SimpleType>,
    class_index: BTreeMap<QName, usize>,
    simple_index: BTreeMap<QName, usize>,
}

impl ClassGraph {
    /// Build a graph from already-resolved classes and simple types.
    ///
    /// Fails when two classes (or two simple types) share a qualified name.
    pub fn new(
        classes: Vec<SchemaClass>,
        simple_types: Vec<SimpleType>,
    ) -> Result<Self, GenerationError> {
        let mut class_index = BTreeMap::new();
        for (i, class) in classes.iter().enumerate() {
            if class_index.insert(class.qname.clone(), i).is_some() {
                return Err(GenerationError::Graph(format!(
                    "duplicate class '{}'",
                    class.qname
                )));
            }
        }
        let mut simple_index = BTreeMap::new();
        for (i, st) in simple_types.iter().enumerate() {
            if simple_index.insert(st.qname.clone(), i).is_some() {
                return Err(GenerationError::Graph(format!(
                    "duplicate simple type '{}'",
                    st.qname
                )));
            }
        }
        Ok(ClassGraph {
            classes,
            simple_types,
            class_index,
            simple_index,
        })
    }

    /// First class whose local name matches, regardless of namespace.
    pub fn class_by_local(&self, local: &str) -> Option<&SchemaClass> {
        self.classes.iter().find(|c| c.qname.local == local)
    }
}

impl SchemaGraph for ClassGraph {
    fn classes(&self) -> &[SchemaClass] {
        &self.classes
    }

    fn class(&self, qname: &QName) -> Option<&SchemaClass> {
        self.class_index.get(qname).map(|&i| &self.classes[i])
    }

    fn simple_type(&self, qname: &QName) -> Option<&SimpleType> {
        self.simple_index.get(qname).map(|&i| &self.simple_types[i])
    }

    fn simple_types(&self) -> &[SimpleType] {
        &self.simple_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple_chain() {
        let base = SimpleType::new(QName::local("TString"), "m", "string").with_facets(Facets {
            max_length: Some(60),
            ..Facets::default()
        });
        let mut derived = SimpleType::new(QName::local("TShort"), "m", "string");
        derived.base = TypeRef::Simple(QName::local("TString"));
        derived.facets.max_length = Some(10);
        derived.facets.min_length = Some(2);
        let graph = ClassGraph::new(vec![], vec![base, derived]).unwrap();

        let (builtin, facets) = graph.resolve_simple(&QName::local("TShort")).unwrap();
        assert_eq!(builtin, "string");
        assert_eq!(facets.max_length, Some(10));
        assert_eq!(facets.min_length, Some(2));
    }

    #[test]
    fn test_resolve_simple_cycle() {
        let mut a = SimpleType::new(QName::local("A"), "m", "string");
        a.base = TypeRef::Simple(QName::local("B"));
        let mut b = SimpleType::new(QName::local("B"), "m", "string");
        b.base = TypeRef::Simple(QName::local("A"));
        let graph = ClassGraph::new(vec![], vec![a, b]).unwrap();
        assert!(graph.resolve_simple(&QName::local("A")).is_err());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let a = SchemaClass::new(QName::local("A"), "m");
        let err = ClassGraph::new(vec![a.clone(), a], vec![]).unwrap_err();
        assert!(err.to_string().contains("duplicate class"));
    }

    #[test]
    fn test_lookup() {
        let graph = ClassGraph::new(
            vec![SchemaClass::new(QName::new(Some("urn:x"), "A"), "m")],
            vec![],
        )
        .unwrap();
        assert!(graph.class(&QName::new(Some("urn:x"), "A")).is_some());
        assert!(graph.class(&QName::local("A")).is_none());
        assert!(graph.class_by_local("A").is_some());
    }
}
