use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualified schema name: optional namespace plus local name.
///
/// Displays (and deserializes) in Clark notation, `{namespace}local`, the same
/// form the schema compiler uses for its class identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        QName {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            local: local.into(),
        }
    }

    /// A name without namespace.
    pub fn local(local: impl Into<String>) -> Self {
        QName {
            namespace: None,
            local: local.into(),
        }
    }

    /// Parse Clark notation (`{ns}local`) or a bare local name.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('{') {
            let (ns, local) = rest
                .split_once('}')
                .ok_or_else(|| format!("unterminated namespace in qualified name '{raw}'"))?;
            if local.is_empty() {
                return Err(format!("qualified name '{raw}' has an empty local part"));
            }
            return Ok(QName::new(Some(ns), local));
        }
        if raw.is_empty() {
            return Err("qualified name is empty".to_string());
        }
        Ok(QName::local(raw))
    }

    /// Local name split on the `.` separating inner classes from their outer class.
    pub fn path(&self) -> Vec<&str> {
        self.local.split('.').collect()
    }

    /// Last segment of the local name (the innermost class name).
    pub fn leaf(&self) -> &str {
        self.local.rsplit('.').next().unwrap_or(&self.local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

impl TryFrom<String> for QName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        QName::parse(&value)
    }
}

impl From<QName> for String {
    fn from(value: QName) -> Self {
        value.to_string()
    }
}

/// Upper occurrence bound of a schema member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMaxOccurs", into = "RawMaxOccurs")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    pub fn is_many(&self) -> bool {
        match self {
            MaxOccurs::Bounded(n) => *n > 1,
            MaxOccurs::Unbounded => true,
        }
    }

    /// The tighter of two bounds.
    pub fn min(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (MaxOccurs::Unbounded, o) | (o, MaxOccurs::Unbounded) => o,
            (MaxOccurs::Bounded(a), MaxOccurs::Bounded(b)) => MaxOccurs::Bounded(a.min(b)),
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(n) => write!(f, "{n}"),
            MaxOccurs::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawMaxOccurs {
    Number(u32),
    Text(String),
}

impl TryFrom<RawMaxOccurs> for MaxOccurs {
    type Error = String;

    fn try_from(value: RawMaxOccurs) -> Result<Self, Self::Error> {
        match value {
            RawMaxOccurs::Number(n) => Ok(MaxOccurs::Bounded(n)),
            RawMaxOccurs::Text(s) if s == "unbounded" => Ok(MaxOccurs::Unbounded),
            RawMaxOccurs::Text(s) => s
                .parse()
                .map(MaxOccurs::Bounded)
                .map_err(|_| format!("invalid maxOccurs '{s}'")),
        }
    }
}

impl From<MaxOccurs> for RawMaxOccurs {
    fn from(value: MaxOccurs) -> Self {
        match value {
            MaxOccurs::Bounded(n) => RawMaxOccurs::Number(n),
            MaxOccurs::Unbounded => RawMaxOccurs::Text("unbounded".to_string()),
        }
    }
}

/// Occurrence bounds (`minOccurs` / `maxOccurs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurs {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Default for Occurs {
    fn default() -> Self {
        Occurs {
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }
}

impl Occurs {
    pub fn new(min: u32, max: MaxOccurs) -> Self {
        Occurs { min, max }
    }

    pub fn optional() -> Self {
        Occurs::new(0, MaxOccurs::Bounded(1))
    }

    pub fn many() -> Self {
        Occurs::new(0, MaxOccurs::Unbounded)
    }
}

/// Restriction facets carried by a simple type or an inline-restricted member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Facets {
    pub length: Option<u32>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<String>,
    pub enumeration: Vec<String>,
    pub total_digits: Option<u32>,
    pub fraction_digits: Option<u32>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        *self == Facets::default()
    }

    /// Layer `self` (the more derived facets) over `base`.
    pub fn over(&self, base: &Facets) -> Facets {
        Facets {
            length: self.length.or(base.length),
            min_length: self.min_length.or(base.min_length),
            max_length: self.max_length.or(base.max_length),
            pattern: self.pattern.clone().or_else(|| base.pattern.clone()),
            enumeration: if self.enumeration.is_empty() {
                base.enumeration.clone()
            } else {
                self.enumeration.clone()
            },
            total_digits: self.total_digits.or(base.total_digits),
            fraction_digits: self.fraction_digits.or(base.fraction_digits),
            min_inclusive: self.min_inclusive.clone().or_else(|| base.min_inclusive.clone()),
            max_inclusive: self.max_inclusive.clone().or_else(|| base.max_inclusive.clone()),
            min_exclusive: self.min_exclusive.clone().or_else(|| base.min_exclusive.clone()),
            max_exclusive: self.max_exclusive.clone().or_else(|| base.max_exclusive.clone()),
        }
    }
}

/// What a member's type points at, once the adapter has resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A built-in XSD datatype, by local name (`string`, `decimal`, ...).
    Builtin(String),
    /// A named simple type of the graph.
    Simple(QName),
    /// A complex type of the graph (or one the graph does not contain).
    Class(QName),
}

impl TypeRef {
    /// The name written in round-trip metadata (`xsd_type`).
    pub fn type_name(&self) -> &str {
        match self {
            TypeRef::Builtin(name) => name,
            TypeRef::Simple(q) | TypeRef::Class(q) => q.leaf(),
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, TypeRef::Class(_))
    }
}

/// A schema element or XML attribute declared by a complex type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAttribute {
    pub name: String,
    pub namespace: Option<String>,
    pub type_ref: TypeRef,
    pub occurs: Occurs,
    /// `true` for an XML attribute, `false` for a child element.
    pub is_attribute: bool,
    /// Identifier of the `choice` group this member belongs to.
    pub choice: Option<u32>,
    pub fixed: Option<String>,
    pub default: Option<String>,
    pub facets: Facets,
    pub doc: Option<String>,
}

impl SchemaAttribute {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        SchemaAttribute {
            name: name.into(),
            namespace: None,
            type_ref,
            occurs: Occurs::default(),
            is_attribute: false,
            choice: None,
            fixed: None,
            default: None,
            facets: Facets::default(),
            doc: None,
        }
    }

    pub fn qname(&self) -> QName {
        QName::new(self.namespace.as_deref(), self.name.clone())
    }

    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn in_choice(mut self, group: u32) -> Self {
        self.choice = Some(group);
        self
    }

    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.fixed = Some(value.into());
        self
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn as_attribute(mut self) -> Self {
        self.is_attribute = true;
        self
    }
}

/// An `xsd:group` reference or nested `xsd:sequence`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaGroup {
    pub name: Option<String>,
    pub members: Vec<SchemaMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaMember {
    Attribute(SchemaAttribute),
    Group(SchemaGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationKind {
    Extension,
    Restriction,
}

impl fmt::Display for DerivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivationKind::Extension => write!(f, "extension"),
            DerivationKind::Restriction => write!(f, "restriction"),
        }
    }
}

/// `extension` or `restriction` of a base complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub kind: DerivationKind,
    pub base: QName,
}

/// An analyzed complex type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaClass {
    pub qname: QName,
    /// Source unit (generated module) this class belongs to.
    pub module: String,
    pub members: Vec<SchemaMember>,
    pub derivation: Option<Derivation>,
    /// Abstract or choice-only wrapper type.
    pub is_abstract: bool,
    pub doc: Option<String>,
}

impl SchemaClass {
    pub fn new(qname: QName, module: impl Into<String>) -> Self {
        SchemaClass {
            qname,
            module: module.into(),
            members: Vec::new(),
            derivation: None,
            is_abstract: false,
            doc: None,
        }
    }

    pub fn with_attribute(mut self, attr: SchemaAttribute) -> Self {
        self.members.push(SchemaMember::Attribute(attr));
        self
    }

    pub fn with_group(mut self, name: Option<&str>, members: Vec<SchemaMember>) -> Self {
        self.members.push(SchemaMember::Group(SchemaGroup {
            name: name.map(str::to_string),
            members,
        }));
        self
    }

    pub fn extending(mut self, base: QName) -> Self {
        self.derivation = Some(Derivation {
            kind: DerivationKind::Extension,
            base,
        });
        self
    }

    pub fn restricting(mut self, base: QName) -> Self {
        self.derivation = Some(Derivation {
            kind: DerivationKind::Restriction,
            base,
        });
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Source location used in diagnostics.
    pub fn location(&self) -> String {
        format!("{}:{}", self.module, self.qname)
    }
}

/// A named simple type (possibly derived from another named simple type).
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    pub qname: QName,
    pub module: String,
    /// Base type: a built-in or another simple type of the graph.
    pub base: TypeRef,
    pub facets: Facets,
    pub doc: Option<String>,
    /// Documentation of individual enumeration values.
    pub value_docs: BTreeMap<String, String>,
}

impl SimpleType {
    pub fn new(qname: QName, module: impl Into<String>, builtin: &str) -> Self {
        SimpleType {
            qname,
            module: module.into(),
            base: TypeRef::Builtin(builtin.to_string()),
            facets: Facets::default(),
            doc: None,
            value_docs: BTreeMap::new(),
        }
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn is_enumeration(&self) -> bool {
        !self.facets.enumeration.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_clark_roundtrip() {
        let q = QName::parse("{http://www.portalfiscal.inf.br/nfe}TNFe").unwrap();
        assert_eq!(q.namespace.as_deref(), Some("http://www.portalfiscal.inf.br/nfe"));
        assert_eq!(q.local, "TNFe");
        assert_eq!(q.to_string(), "{http://www.portalfiscal.inf.br/nfe}TNFe");
        assert_eq!(QName::parse("Address").unwrap(), QName::local("Address"));
        assert!(QName::parse("{ns").is_err());
        assert!(QName::parse("").is_err());
    }

    #[test]
    fn test_qname_inner_path() {
        let q = QName::local("TNFe.InfNFe.Det");
        assert_eq!(q.path(), vec!["TNFe", "InfNFe", "Det"]);
        assert_eq!(q.leaf(), "Det");
    }

    #[test]
    fn test_max_occurs_parsing() {
        let m: MaxOccurs = serde_json::from_str("\"unbounded\"").unwrap();
        assert_eq!(m, MaxOccurs::Unbounded);
        let m: MaxOccurs = serde_json::from_str("3").unwrap();
        assert_eq!(m, MaxOccurs::Bounded(3));
        let m: MaxOccurs = serde_json::from_str("\"990\"").unwrap();
        assert_eq!(m, MaxOccurs::Bounded(990));
        assert!(serde_json::from_str::<MaxOccurs>("\"many\"").is_err());
    }

    #[test]
    fn test_max_occurs_min() {
        assert_eq!(
            MaxOccurs::Unbounded.min(MaxOccurs::Bounded(4)),
            MaxOccurs::Bounded(4)
        );
        assert_eq!(
            MaxOccurs::Bounded(2).min(MaxOccurs::Bounded(1)),
            MaxOccurs::Bounded(1)
        );
        assert!(MaxOccurs::Unbounded.is_many());
        assert!(!MaxOccurs::Bounded(1).is_many());
    }

    #[test]
    fn test_facets_layering() {
        let base = Facets {
            max_length: Some(60),
            pattern: Some("[0-9]+".into()),
            ..Facets::default()
        };
        let derived = Facets {
            max_length: Some(14),
            ..Facets::default()
        };
        let merged = derived.over(&base);
        assert_eq!(merged.max_length, Some(14));
        assert_eq!(merged.pattern.as_deref(), Some("[0-9]+"));
    }
}
