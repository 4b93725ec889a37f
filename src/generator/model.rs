//! Intermediate representation of generated models.
//!
//! A [`ModelSpec`] is everything a template needs to emit one ORM model class;
//! each [`FieldSpec`] keeps its [`FieldOrigin`] so the XML serializer can map
//! the field back to the schema member it came from.

use serde::Serialize;

use crate::graph::{DerivationKind, Occurs, QName};

/// Target ORM field kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Char,
    Boolean,
    Integer,
    Float,
    Monetary,
    Date,
    Datetime,
    /// Closed value set. `constant` names the module-level selection constant
    /// when the values come from a named enumerated simple type.
    Selection {
        values: Vec<String>,
        constant: Option<String>,
    },
    /// Single reference to another model, by registry name.
    Many2one { comodel: String },
    /// Multiple references; `inverse` is the implicit key field on the comodel.
    One2many { comodel: String, inverse: String },
    /// Value kept as text because its type could not be resolved.
    Untyped,
}

impl FieldKind {
    /// ORM field constructor, e.g. `Char` for `fields.Char`.
    pub fn ctor(&self) -> &'static str {
        match self {
            FieldKind::Char | FieldKind::Untyped => "Char",
            FieldKind::Boolean => "Boolean",
            FieldKind::Integer => "Integer",
            FieldKind::Float => "Float",
            FieldKind::Monetary => "Monetary",
            FieldKind::Date => "Date",
            FieldKind::Datetime => "Datetime",
            FieldKind::Selection { .. } => "Selection",
            FieldKind::Many2one { .. } => "Many2one",
            FieldKind::One2many { .. } => "One2many",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, FieldKind::Many2one { .. } | FieldKind::One2many { .. })
    }

    /// Registry name of the related model, for relational kinds.
    pub fn comodel(&self) -> Option<&str> {
        match self {
            FieldKind::Many2one { comodel } | FieldKind::One2many { comodel, .. } => {
                Some(comodel)
            }
            _ => None,
        }
    }

    /// Kinds are compatible for a merged choice when they store the same thing.
    pub fn same_storage(&self, other: &FieldKind) -> bool {
        match (self, other) {
            (FieldKind::Selection { .. }, FieldKind::Selection { .. }) => true,
            (a, b) => a == b,
        }
    }
}

/// Numeric bound from an inclusive or exclusive facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bound {
    pub value: String,
    pub inclusive: bool,
}

/// Constraint parameters attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Constraints {
    /// Maximum length (`length` or `maxLength`).
    pub size: Option<u32>,
    pub min_size: Option<u32>,
    /// `(precision, scale)`.
    pub digits: Option<(u32, u32)>,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
    /// Pattern facet that did not reduce to a value list.
    pub pattern: Option<String>,
    /// Currency field of a monetary field.
    pub currency_field: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}

/// Where a schema member came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub qname: QName,
    /// Schema type name written in `xsd_type`.
    pub xsd_type: String,
    pub occurs: Occurs,
    pub is_attribute: bool,
    /// Choice group id, when the member is an alternative.
    pub choice: Option<u32>,
}

/// One alternative of a choice group, as seen by the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternative {
    /// Value used in the merged field or the discriminator.
    pub tag: String,
    pub provenance: Provenance,
}

/// What produced a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum FieldOrigin {
    /// A single schema attribute or element.
    Attribute(Provenance),
    /// Merged field standing for every alternative of a choice group.
    Choice {
        group: u32,
        alternatives: Vec<Alternative>,
    },
    /// Selection recording which alternative of a choice group is present.
    Discriminator {
        group: u32,
        alternatives: Vec<Alternative>,
    },
    /// Implicit many-to-one key backing a one-to-many on another model.
    InverseKey { from_model: String, field: String },
}

impl FieldOrigin {
    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            FieldOrigin::Attribute(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, FieldOrigin::Attribute(_))
    }
}

/// One generated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Schema-level requirement (min-occurs ≥ 1 outside a choice).
    pub required: bool,
    pub multiple: bool,
    pub constraints: Constraints,
    pub label: String,
    pub help: Option<String>,
    pub default: Option<String>,
    pub origin: FieldOrigin,
    /// Narrowed override of an inherited field (restriction).
    pub restricted: bool,
}

/// How a model relates to the schema's type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum InheritanceStrategy {
    None,
    SingleParent {
        /// Python class name of the parent model.
        parent: String,
        /// Registry name of the parent model.
        parent_registry: String,
        derivation: DerivationKind,
    },
    /// The class has choice groups, each tracked by a discriminator
    /// selection.
    SelectionDiscriminated { groups: Vec<u32> },
}

impl InheritanceStrategy {
    pub fn parent(&self) -> Option<&str> {
        match self {
            InheritanceStrategy::SingleParent { parent, .. } => Some(parent),
            _ => None,
        }
    }
}

/// One generated model class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    pub class_name: String,
    /// ORM `_name`.
    pub registry_name: String,
    pub qname: QName,
    pub module: String,
    pub package: String,
    pub strategy: InheritanceStrategy,
    pub fields: Vec<FieldSpec>,
    /// Root-first order of every field visible on the model, own fields last.
    pub field_order: Vec<String>,
    pub doc: Option<String>,
    /// Dotted path of the XML binding class (`Outer.Inner`).
    pub binding_type: String,
    pub namespace: Option<String>,
    pub is_abstract: bool,
    /// Registry names referenced before their model is emitted.
    pub forward_refs: Vec<String>,
}

impl ModelSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Registry names of related models.
    pub fn relation_targets(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| f.kind.comodel())
    }

    pub fn location(&self) -> String {
        format!("{}:{}", self.module, self.qname)
    }
}

/// A selection constant emitted at module level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionConstant {
    pub name: String,
    pub module: String,
    pub values: Vec<(String, String)>,
    pub doc: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kind_ctor_and_comodel() {
        let kind = FieldKind::One2many {
            comodel: "spec.10.line".into(),
            inverse: "spec10_line_order_id".into(),
        };
        assert_eq!(kind.ctor(), "One2many");
        assert_eq!(kind.comodel(), Some("spec.10.line"));
        assert!(kind.is_relational());
        assert_eq!(FieldKind::Untyped.ctor(), "Char");
        assert!(FieldKind::Char.same_storage(&FieldKind::Char));
        assert!(!FieldKind::Char.same_storage(&FieldKind::Integer));
    }

    #[test]
    fn test_origin_serializes_tagged() {
        let origin = FieldOrigin::InverseKey {
            from_model: "spec.10.order".into(),
            field: "spec10_line".into(),
        };
        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["origin"], "inverse_key");
        assert!(origin.is_synthetic());
    }
}
