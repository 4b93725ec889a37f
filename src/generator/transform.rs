//! Turns one schema class into a [`ModelSpec`].
//!
//! Names go through the run's [`NameRegistry`]. Each class is declared first
//! (so collisions are settled over the whole schema) and transformed later.
//! Field scopes are keyed by the class's qualified name, the model scope by
//! the target package.

use std::collections::{BTreeMap, BTreeSet};

use heck::ToUpperCamelCase;
use tracing::debug;

use super::inheritance::{ancestors, choice_strategy, flatten, narrow, ChoiceStrategy};
use super::labels::LabelExtractor;
use super::model::{
    Alternative, FieldKind, FieldOrigin, FieldSpec, InheritanceStrategy, ModelSpec, Provenance,
};
use super::names::{NameKind, NameRegistry};
use super::types::{dedup_case_insensitive, MappedType, TypeMapper};
use crate::config::{GeneratorConfig, SkipFilter};
use crate::diagnostics::Diagnostics;
use crate::error::GenerationError;
use crate::graph::{DerivationKind, QName, SchemaAttribute, SchemaClass, SchemaGraph, TypeRef};

/// Identifier scope holding the fields of a class.
pub fn field_scope(qname: &QName) -> String {
    qname.to_string()
}

fn choice_key(group: u32) -> String {
    format!("choice{group}")
}

fn choice_value_key(group: u32) -> String {
    format!("choice{group}_value")
}

fn inverse_key(from: &QName, member_key: &str) -> String {
    format!("inverse:{from}#{member_key}")
}

fn inverse_raw(attr: &SchemaAttribute, from: &QName) -> String {
    format!("{}_{}_id", attr.name, from.leaf())
}

/// Dotted path of the binding class, `Outer.Inner`.
pub fn binding_type(qname: &QName) -> String {
    qname
        .path()
        .iter()
        .map(|segment| segment.to_upper_camel_case())
        .collect::<Vec<_>>()
        .join(".")
}

pub fn provenance(attr: &SchemaAttribute) -> Provenance {
    Provenance {
        qname: attr.qname(),
        xsd_type: attr.type_ref.type_name().to_string(),
        occurs: attr.occurs,
        is_attribute: attr.is_attribute,
        choice: attr.choice,
    }
}

/// A flattened member with its name key.
#[derive(Debug, Clone)]
struct Member {
    attr: SchemaAttribute,
    /// Qualified member name, `#n` appended for the n-th repeat.
    key: String,
}

#[derive(Debug, Default)]
struct Members {
    kept: Vec<Member>,
    merged: Vec<String>,
    skipped: Vec<String>,
}

enum Slot<'a> {
    Single(&'a Member),
    Choice(u32, Vec<&'a Member>),
}

/// Members in document order, each choice group at its first alternative.
fn slots(members: &[Member]) -> Vec<Slot<'_>> {
    let mut out: Vec<Slot<'_>> = Vec::new();
    let mut group_pos: BTreeMap<u32, usize> = BTreeMap::new();
    for member in members {
        let Some(group) = member.attr.choice else {
            out.push(Slot::Single(member));
            continue;
        };
        match group_pos.get(&group).and_then(|&i| out.get_mut(i)) {
            Some(Slot::Choice(_, alternatives)) => alternatives.push(member),
            _ => {
                group_pos.insert(group, out.len());
                out.push(Slot::Choice(group, vec![member]));
            }
        }
    }
    out
}

fn member_keys(attrs: &[SchemaAttribute]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    attrs
        .iter()
        .map(|attr| {
            let key = attr.qname().to_string();
            let n = counts.entry(key.clone()).or_insert(0);
            *n += 1;
            if *n == 1 {
                key
            } else {
                format!("{key}#{n}")
            }
        })
        .collect()
}

/// Builds [`ModelSpec`]s for the classes of one graph.
pub struct ClassTransformer<'g, G: SchemaGraph + ?Sized> {
    graph: &'g G,
    config: &'g GeneratorConfig,
    mapper: TypeMapper,
    skip: SkipFilter,
    /// Classes that produce no model (skipped or failed).
    unavailable: BTreeSet<QName>,
}

impl<'g, G: SchemaGraph + ?Sized> ClassTransformer<'g, G> {
    pub fn new(graph: &'g G, config: &'g GeneratorConfig) -> Result<Self, GenerationError> {
        Ok(ClassTransformer {
            graph,
            config,
            mapper: TypeMapper::new(config.numeric_rules()?),
            skip: config.skip_filter()?,
            unavailable: BTreeSet::new(),
        })
    }

    /// Does the class match a skip pattern?
    pub fn is_skipped(&self, class: &SchemaClass) -> bool {
        self.skip.skips_class(&class.qname.path())
    }

    /// References to `qname` degrade to untyped fields from now on.
    pub fn mark_unavailable(&mut self, qname: QName) {
        self.unavailable.insert(qname);
    }

    pub fn is_available(&self, qname: &QName) -> bool {
        !self.unavailable.contains(qname) && self.graph.class(qname).is_some()
    }

    /// Python class name of the model generated for `qname`.
    pub fn model_ident(
        &self,
        registry: &mut NameRegistry,
        qname: &QName,
    ) -> Result<String, GenerationError> {
        registry.resolve(
            &self.config.package,
            NameKind::Model,
            &qname.to_string(),
            &qname.local,
        )
    }

    /// Model name of a referenced class, `None` when the class loses an
    /// unresolvable collision. That class reports the failure itself.
    fn target_ident(
        &self,
        registry: &mut NameRegistry,
        qname: &QName,
    ) -> Result<Option<String>, GenerationError> {
        match self.model_ident(registry, qname) {
            Ok(ident) => Ok(Some(ident)),
            Err(GenerationError::NameCollisionUnresolvable { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Module-level constant name for an enumerated simple type.
    pub fn constant_ident(
        &self,
        registry: &mut NameRegistry,
        qname: &QName,
    ) -> Result<String, GenerationError> {
        registry.resolve(
            &self.config.package,
            NameKind::Constant,
            &qname.to_string(),
            &qname.local.replace('.', "_"),
        )
    }

    /// Register every identifier `class` will ask for.
    pub fn declare(
        &self,
        class: &SchemaClass,
        registry: &mut NameRegistry,
    ) -> Result<(), GenerationError> {
        registry.declare(
            &self.config.package,
            NameKind::Model,
            &class.qname.to_string(),
            &class.qname.local,
        );
        let scope = field_scope(&class.qname);
        let mut group_sizes: BTreeMap<u32, usize> = BTreeMap::new();
        for member in self.members(class).kept {
            if self.inherited_member(class, &member.key)?.is_none() {
                registry.declare(&scope, NameKind::Field, &member.key, &member.attr.name);
            }
            if let Some(group) = member.attr.choice {
                *group_sizes.entry(group).or_default() += 1;
            }
            if let TypeRef::Class(target) = &member.attr.type_ref {
                if member.attr.occurs.max.is_many() {
                    registry.declare(
                        &field_scope(target),
                        NameKind::Field,
                        &inverse_key(&class.qname, &member.key),
                        &inverse_raw(&member.attr, &class.qname),
                    );
                }
            }
        }
        for (group, size) in group_sizes {
            if size > 1 {
                registry.declare(&scope, NameKind::Field, &choice_key(group), &choice_key(group));
                let value = choice_value_key(group);
                registry.declare(&scope, NameKind::Field, &value, &value);
            }
        }
        Ok(())
    }

    /// Build the model for `class`.
    ///
    /// Class-scoped failures ([`GenerationError::UnsupportedType`],
    /// [`GenerationError::NameCollisionUnresolvable`]) are returned as errors;
    /// degraded members are reported in `diags`.
    pub fn transform(
        &self,
        class: &SchemaClass,
        registry: &mut NameRegistry,
        diags: &mut Diagnostics,
    ) -> Result<ModelSpec, GenerationError> {
        let location = class.location();
        debug!(class = %class.qname, module = %class.module, "transforming class");

        let class_name = self.model_ident(registry, &class.qname)?;
        let registry_name = self.config.registry_name(&class_name);
        let scope = field_scope(&class.qname);

        let members = self.members(class);
        for name in &members.merged {
            diags.info(
                format!("{location}.{name}"),
                "duplicate_merged",
                format!("repeated member '{name}' merged into its first occurrence"),
            );
        }
        for name in &members.skipped {
            diags.info(
                format!("{location}.{name}"),
                "field_skipped",
                format!("field '{name}' matches a skip pattern"),
            );
        }

        let mut labels = LabelExtractor::new(&self.config.language);
        let mut fields = Vec::new();
        let mut groups = Vec::new();
        for slot in slots(&members.kept) {
            match slot {
                Slot::Single(member) => {
                    fields.push(self.build_field(class, member, registry, &mut labels, diags)?);
                }
                Slot::Choice(_, alternatives) if alternatives.len() == 1 => {
                    for member in alternatives {
                        fields.push(self.build_field(class, member, registry, &mut labels, diags)?);
                    }
                }
                Slot::Choice(group, alternatives) => {
                    let mut built = Vec::with_capacity(alternatives.len());
                    for member in &alternatives {
                        built.push(self.build_field(class, member, registry, &mut labels, diags)?);
                    }
                    let kinds: Vec<&FieldKind> = built.iter().map(|f| &f.kind).collect();
                    let name =
                        registry.resolve(&scope, NameKind::Field, &choice_key(group), &choice_key(group))?;
                    groups.push(group);
                    match choice_strategy(&kinds) {
                        ChoiceStrategy::Merged => {
                            let value_key = choice_value_key(group);
                            let value = registry.resolve(&scope, NameKind::Field, &value_key, &value_key)?;
                            let tagged = alternatives
                                .iter()
                                .map(|m| Alternative {
                                    tag: m.attr.name.clone(),
                                    provenance: provenance(&m.attr),
                                })
                                .collect();
                            fields.push(discriminator(name, group, tagged, &mut labels));
                            fields.push(merged_choice(value, group, &alternatives, built, &mut labels));
                        }
                        ChoiceStrategy::Discriminated => {
                            fields.extend(discriminated_choice(
                                name,
                                group,
                                &alternatives,
                                built,
                                &mut labels,
                            ));
                        }
                    }
                }
            }
        }

        let strategy = match self.parent_strategy(class, registry, diags)? {
            Some(strategy) => strategy,
            None if !groups.is_empty() => InheritanceStrategy::SelectionDiscriminated { groups },
            None => InheritanceStrategy::None,
        };

        Ok(ModelSpec {
            class_name,
            registry_name,
            qname: class.qname.clone(),
            module: class.module.clone(),
            package: self.config.package.clone(),
            strategy,
            fields,
            field_order: Vec::new(),
            doc: class.doc.clone(),
            binding_type: binding_type(&class.qname),
            namespace: class.qname.namespace.clone(),
            is_abstract: class.is_abstract,
            forward_refs: Vec::new(),
        })
    }

    fn members(&self, class: &SchemaClass) -> Members {
        let flat = flatten(class, self.config.merge_duplicates());
        let keys = member_keys(&flat.attributes);
        let path = class.qname.path();
        let mut members = Members {
            merged: flat.merged,
            ..Members::default()
        };
        for (attr, key) in flat.attributes.into_iter().zip(keys) {
            if self.skip.skips_field(&path, &attr.name) {
                members.skipped.push(attr.name);
            } else {
                members.kept.push(Member { attr, key });
            }
        }
        members
    }

    /// The ancestor member a restriction restates, nearest ancestor first.
    fn inherited_member(
        &self,
        class: &SchemaClass,
        key: &str,
    ) -> Result<Option<(&'g SchemaClass, Member)>, GenerationError> {
        let is_restriction = class
            .derivation
            .as_ref()
            .is_some_and(|d| d.kind == DerivationKind::Restriction);
        if !is_restriction {
            return Ok(None);
        }
        for ancestor in ancestors(self.graph, class)? {
            if let Some(member) = self.members(ancestor).kept.into_iter().find(|m| m.key == key) {
                return Ok(Some((ancestor, member)));
            }
        }
        Ok(None)
    }

    /// Restated members keep the identifier of the class that declared them.
    fn field_ident(
        &self,
        class: &SchemaClass,
        member: &Member,
        registry: &mut NameRegistry,
    ) -> Result<String, GenerationError> {
        if let Some((owner, inherited)) = self.inherited_member(class, &member.key)? {
            return self.field_ident(owner, &inherited, registry);
        }
        registry.resolve(
            &field_scope(&class.qname),
            NameKind::Field,
            &member.key,
            &member.attr.name,
        )
    }

    fn build_field(
        &self,
        class: &SchemaClass,
        member: &Member,
        registry: &mut NameRegistry,
        labels: &mut LabelExtractor,
        diags: &mut Diagnostics,
    ) -> Result<FieldSpec, GenerationError> {
        let attr = &member.attr;
        let mapped = self.map_member(class, member, registry, diags)?;
        let name = self.field_ident(class, member, registry)?;
        let (label, help) = labels.extract(&attr.name, attr.doc.as_deref());
        let field = FieldSpec {
            name,
            kind: mapped.kind,
            required: attr.occurs.min >= 1 && attr.choice.is_none(),
            multiple: attr.occurs.max.is_many(),
            constraints: mapped.constraints,
            label,
            help,
            default: attr.fixed.clone().or_else(|| attr.default.clone()),
            origin: FieldOrigin::Attribute(provenance(attr)),
            restricted: false,
        };

        match self.inherited_member(class, &member.key)? {
            Some((owner, inherited)) => {
                // Only the restating class reports on the member.
                let mut scratch = Diagnostics::new();
                let mut owner_labels = LabelExtractor::new(&self.config.language);
                let parent =
                    self.build_field(owner, &inherited, registry, &mut owner_labels, &mut scratch)?;
                Ok(narrow(&parent, field))
            }
            None => Ok(field),
        }
    }

    fn map_member(
        &self,
        class: &SchemaClass,
        member: &Member,
        registry: &mut NameRegistry,
        diags: &mut Diagnostics,
    ) -> Result<MappedType, GenerationError> {
        let attr = &member.attr;
        let location = format!("{}.{}", class.location(), attr.name);
        let unsupported = |type_name: String| GenerationError::UnsupportedType {
            type_name,
            qname: attr.qname(),
            location: location.clone(),
        };

        let mut mapped = match &attr.type_ref {
            TypeRef::Builtin(builtin) => self
                .mapper
                .map_type(builtin, &attr.facets, None, &attr.name)
                .map_err(|e| unsupported(e.0))?,
            TypeRef::Simple(simple) => {
                let (builtin, base_facets) = self.graph.resolve_simple(simple)?;
                let facets = attr.facets.over(&base_facets);
                let mut mapped = self
                    .mapper
                    .map_type(&builtin, &facets, Some(simple.leaf()), &attr.name)
                    .map_err(|e| unsupported(e.0))?;
                let from_type = attr.facets.enumeration.is_empty() && !base_facets.enumeration.is_empty();
                if from_type {
                    if let FieldKind::Selection { constant, .. } = &mut mapped.kind {
                        *constant = Some(self.constant_ident(registry, simple)?);
                    }
                }
                mapped
            }
            TypeRef::Class(target) => {
                return self.map_reference(class, member, target, registry, diags);
            }
        };

        if let Some(fixed) = &attr.fixed {
            mapped.kind = FieldKind::Selection {
                values: vec![fixed.clone()],
                constant: None,
            };
        }
        if !mapped.dropped_values.is_empty() {
            diags.warn(
                location.as_str(),
                "selection_value_dropped",
                format!(
                    "values equal ignoring case dropped: {}",
                    mapped.dropped_values.join(", ")
                ),
            );
        }
        Ok(mapped)
    }

    fn map_reference(
        &self,
        class: &SchemaClass,
        member: &Member,
        target: &QName,
        registry: &mut NameRegistry,
        diags: &mut Diagnostics,
    ) -> Result<MappedType, GenerationError> {
        let attr = &member.attr;
        let target_ident = if self.is_available(target) {
            self.target_ident(registry, target)?
        } else {
            None
        };
        let Some(target_ident) = target_ident else {
            diags.warn(
                format!("{}.{}", class.location(), attr.name),
                "untyped_reference",
                format!("'{target}' produces no model; '{}' is kept as text", attr.name),
            );
            return Ok(MappedType::new(FieldKind::Untyped));
        };
        let comodel = self.config.registry_name(&target_ident);
        let kind = if attr.occurs.max.is_many() {
            let inverse = registry.resolve(
                &field_scope(target),
                NameKind::Field,
                &inverse_key(&class.qname, &member.key),
                &inverse_raw(attr, &class.qname),
            )?;
            FieldKind::One2many { comodel, inverse }
        } else {
            FieldKind::Many2one { comodel }
        };
        Ok(MappedType::new(kind))
    }

    fn parent_strategy(
        &self,
        class: &SchemaClass,
        registry: &mut NameRegistry,
        diags: &mut Diagnostics,
    ) -> Result<Option<InheritanceStrategy>, GenerationError> {
        let Some(derivation) = &class.derivation else {
            return Ok(None);
        };
        let base = &derivation.base;
        let parent = if self.is_available(base) {
            self.target_ident(registry, base)?
        } else {
            None
        };
        let Some(parent) = parent else {
            diags.warn(
                class.location(),
                "missing_parent",
                format!("base class '{base}' produces no model; generated without parent"),
            );
            return Ok(None);
        };
        Ok(Some(InheritanceStrategy::SingleParent {
            parent_registry: self.config.registry_name(&parent),
            parent,
            derivation: derivation.kind,
        }))
    }
}

/// Selection recording which alternative of a choice group is set.
///
/// The tags are the alternatives' field identifiers when each has its own
/// field, or the member names when they share a merged value field.
fn discriminator(
    name: String,
    group: u32,
    alternatives: Vec<Alternative>,
    labels: &mut LabelExtractor,
) -> FieldSpec {
    let (label, help) = labels.extract(&choice_key(group), None);
    FieldSpec {
        name,
        kind: FieldKind::Selection {
            values: alternatives.iter().map(|a| a.tag.clone()).collect(),
            constant: None,
        },
        required: false,
        multiple: false,
        constraints: Default::default(),
        label,
        help,
        default: None,
        origin: FieldOrigin::Discriminator {
            group,
            alternatives,
        },
        restricted: false,
    }
}

/// One field holding the value of whichever alternative is set.
fn merged_choice(
    name: String,
    group: u32,
    alternatives: &[&Member],
    built: Vec<FieldSpec>,
    labels: &mut LabelExtractor,
) -> FieldSpec {
    let kind = match built.first().map(|f| &f.kind) {
        Some(FieldKind::Selection { .. }) => {
            let all: Vec<String> = built
                .iter()
                .filter_map(|f| match &f.kind {
                    FieldKind::Selection { values, .. } => Some(values.iter().cloned()),
                    _ => None,
                })
                .flatten()
                .collect();
            let (values, _) = dedup_case_insensitive(&all);
            FieldKind::Selection {
                values,
                constant: None,
            }
        }
        Some(kind) => kind.clone(),
        None => FieldKind::Untyped,
    };

    let mut constraints = built.first().map(|f| f.constraints.clone()).unwrap_or_default();
    constraints.size = built
        .iter()
        .map(|f| f.constraints.size)
        .collect::<Option<Vec<_>>>()
        .and_then(|sizes| sizes.into_iter().max());
    constraints.min_size = built.iter().filter_map(|f| f.constraints.min_size).min();
    if built.iter().any(|f| f.constraints.pattern != constraints.pattern) {
        constraints.pattern = None;
    }

    let names: Vec<&str> = alternatives.iter().map(|m| m.attr.name.as_str()).collect();
    let (label, help) = labels.extract(&choice_value_key(group), Some(&names.join(" / ")));
    FieldSpec {
        name,
        kind,
        required: false,
        multiple: built.iter().any(|f| f.multiple),
        constraints,
        label,
        help,
        default: None,
        origin: FieldOrigin::Choice {
            group,
            alternatives: alternatives
                .iter()
                .map(|m| Alternative {
                    tag: m.attr.name.clone(),
                    provenance: provenance(&m.attr),
                })
                .collect(),
        },
        restricted: false,
    }
}

/// A discriminator selection followed by one nullable field per alternative.
fn discriminated_choice(
    name: String,
    group: u32,
    alternatives: &[&Member],
    built: Vec<FieldSpec>,
    labels: &mut LabelExtractor,
) -> Vec<FieldSpec> {
    let tagged: Vec<Alternative> = built
        .iter()
        .zip(alternatives)
        .map(|(field, member)| Alternative {
            tag: field.name.clone(),
            provenance: provenance(&member.attr),
        })
        .collect();
    let mut fields = vec![discriminator(name, group, tagged, labels)];
    fields.extend(built.into_iter().map(|mut field| {
        field.required = false;
        field
    }));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassGraph, Facets, MaxOccurs, Occurs, SimpleType};
    use pretty_assertions::assert_eq;

    fn string(name: &str) -> SchemaAttribute {
        SchemaAttribute::new(name, TypeRef::Builtin("string".into()))
    }

    fn run(
        graph: &ClassGraph,
        config: &GeneratorConfig,
        local: &str,
    ) -> (Result<ModelSpec, GenerationError>, Diagnostics) {
        let transformer = ClassTransformer::new(graph, config).unwrap();
        let mut registry = NameRegistry::new(config);
        for class in graph.classes() {
            transformer.declare(class, &mut registry).unwrap();
        }
        let mut diags = Diagnostics::new();
        let class = graph.class_by_local(local).unwrap();
        (transformer.transform(class, &mut registry, &mut diags), diags)
    }

    #[test]
    fn test_plain_fields() {
        let graph = ClassGraph::new(
            vec![SchemaClass::new(QName::local("Address"), "address")
                .with_attribute(string("street").with_doc("Street name."))
                .with_attribute(string("country").with_fixed("US"))
                .with_attribute(
                    SchemaAttribute::new("zip", TypeRef::Builtin("decimal".into()))
                        .with_occurs(Occurs::optional())
                        .with_facets(Facets {
                            total_digits: Some(5),
                            fraction_digits: Some(0),
                            ..Facets::default()
                        }),
                )],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig::default();
        let (spec, diags) = run(&graph, &config, "Address");
        let spec = spec.unwrap();
        assert!(diags.is_empty());
        assert_eq!(spec.class_name, "Address");
        assert_eq!(spec.registry_name, "spec.10.address");
        assert_eq!(spec.binding_type, "Address");

        let street = spec.field("spec10_street").unwrap();
        assert_eq!(street.kind, FieldKind::Char);
        assert!(street.required);
        assert_eq!(street.label, "Street name");

        let country = spec.field("spec10_country").unwrap();
        assert_eq!(
            country.kind,
            FieldKind::Selection {
                values: vec!["US".into()],
                constant: None
            }
        );
        assert_eq!(country.default.as_deref(), Some("US"));

        let zip = spec.field("spec10_zip").unwrap();
        assert_eq!(zip.kind, FieldKind::Float);
        assert_eq!(zip.constraints.digits, Some((5, 0)));
        assert!(!zip.required);
    }

    #[test]
    fn test_references_and_inverse_key() {
        let graph = ClassGraph::new(
            vec![
                SchemaClass::new(QName::local("Order"), "m")
                    .with_attribute(
                        SchemaAttribute::new("line", TypeRef::Class(QName::local("Line")))
                            .with_occurs(Occurs::many()),
                    )
                    .with_attribute(SchemaAttribute::new(
                        "buyer",
                        TypeRef::Class(QName::local("Party")),
                    )),
                SchemaClass::new(QName::local("Line"), "m").with_attribute(string("sku")),
                SchemaClass::new(QName::local("Party"), "m").with_attribute(string("name")),
            ],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig::default();
        let (spec, _) = run(&graph, &config, "Order");
        let spec = spec.unwrap();
        assert_eq!(
            spec.field("spec10_line").unwrap().kind,
            FieldKind::One2many {
                comodel: "spec.10.line".into(),
                inverse: "spec10_line_Order_id".into(),
            }
        );
        assert_eq!(
            spec.field("spec10_buyer").unwrap().kind,
            FieldKind::Many2one {
                comodel: "spec.10.party".into()
            }
        );
    }

    #[test]
    fn test_unavailable_reference_degrades() {
        let graph = ClassGraph::new(
            vec![
                SchemaClass::new(QName::local("Doc"), "m")
                    .with_attribute(string("id"))
                    .with_attribute(SchemaAttribute::new(
                        "Signature",
                        TypeRef::Class(QName::local("Signature")),
                    )),
                SchemaClass::new(QName::local("Signature"), "m").with_attribute(string("value")),
            ],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig {
            skip_signature_classes: false,
            ..GeneratorConfig::default()
        };
        let mut transformer = ClassTransformer::new(&graph, &config).unwrap();
        transformer.mark_unavailable(QName::local("Signature"));
        let mut registry = NameRegistry::new(&config);
        let mut diags = Diagnostics::new();
        let spec = transformer
            .transform(&graph.classes[0], &mut registry, &mut diags)
            .unwrap();
        assert_eq!(spec.field("spec10_Signature").unwrap().kind, FieldKind::Untyped);
        assert_eq!(diags.of_kind("untyped_reference").count(), 1);
    }

    #[test]
    fn test_unsupported_type_fails_class() {
        let graph = ClassGraph::new(
            vec![SchemaClass::new(QName::local("Blob"), "m")
                .with_attribute(SchemaAttribute::new("any", TypeRef::Builtin("anyType".into())))],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig::default();
        let (result, _) = run(&graph, &config, "Blob");
        match result {
            Err(GenerationError::UnsupportedType { type_name, .. }) => {
                assert_eq!(type_name, "anyType")
            }
            other => panic!("expected unsupported type, got {other:?}"),
        }
    }

    #[test]
    fn test_enumerated_simple_type_uses_constant() {
        let graph = ClassGraph::new(
            vec![SchemaClass::new(QName::local("Tax"), "m").with_attribute(SchemaAttribute::new(
                "CST",
                TypeRef::Simple(QName::local("TCst")),
            ))],
            vec![SimpleType::new(QName::local("TCst"), "m", "string").with_facets(Facets {
                enumeration: vec!["00".into(), "10".into()],
                ..Facets::default()
            })],
        )
        .unwrap();
        let config = GeneratorConfig::default();
        let (spec, _) = run(&graph, &config, "Tax");
        let field = spec.unwrap().fields.remove(0);
        assert_eq!(
            field.kind,
            FieldKind::Selection {
                values: vec!["00".into(), "10".into()],
                constant: Some("TCST".into()),
            }
        );
    }

    #[test]
    fn test_mixed_choice_is_discriminated() {
        let graph = ClassGraph::new(
            vec![
                SchemaClass::new(QName::local("Party"), "m")
                    .with_attribute(string("CNPJ").in_choice(1))
                    .with_attribute(
                        SchemaAttribute::new("idEstrangeiro", TypeRef::Class(QName::local("Foreign")))
                            .in_choice(1),
                    )
                    .with_attribute(string("name")),
                SchemaClass::new(QName::local("Foreign"), "m").with_attribute(string("id")),
            ],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig::default();
        let (spec, _) = run(&graph, &config, "Party");
        let spec = spec.unwrap();
        let names: Vec<_> = spec.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["spec10_choice1", "spec10_CNPJ", "spec10_idEstrangeiro", "spec10_name"]
        );
        assert_eq!(
            spec.strategy,
            InheritanceStrategy::SelectionDiscriminated { groups: vec![1] }
        );
        match &spec.fields[0].origin {
            FieldOrigin::Discriminator { group, alternatives } => {
                assert_eq!(*group, 1);
                assert_eq!(alternatives[0].tag, "spec10_CNPJ");
                assert_eq!(alternatives[1].provenance.qname, QName::local("idEstrangeiro"));
            }
            other => panic!("expected discriminator, got {other:?}"),
        }
        assert!(spec.fields.iter().all(|f| !f.required || f.name == "spec10_name"));
    }

    #[test]
    fn test_same_kind_choice_is_merged() {
        let graph = ClassGraph::new(
            vec![SchemaClass::new(QName::local("Doc"), "m")
                .with_attribute(string("CPF").in_choice(2))
                .with_attribute(string("CNPJ").in_choice(2))],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig::default();
        let (spec, _) = run(&graph, &config, "Doc");
        let spec = spec.unwrap();
        let names: Vec<_> = spec.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["spec10_choice2", "spec10_choice2_value"]);

        let tag = &spec.fields[0];
        assert_eq!(
            tag.kind,
            FieldKind::Selection {
                values: vec!["CPF".into(), "CNPJ".into()],
                constant: None,
            }
        );
        assert!(matches!(tag.origin, FieldOrigin::Discriminator { group: 2, .. }));

        let value = &spec.fields[1];
        assert_eq!(value.kind, FieldKind::Char);
        assert!(!value.required);
        match &value.origin {
            FieldOrigin::Choice { alternatives, .. } => {
                let tags: Vec<_> = alternatives.iter().map(|a| a.tag.as_str()).collect();
                assert_eq!(tags, vec!["CPF", "CNPJ"]);
            }
            other => panic!("expected merged choice, got {other:?}"),
        }
        assert_eq!(
            spec.strategy,
            InheritanceStrategy::SelectionDiscriminated { groups: vec![2] }
        );
    }

    #[test]
    fn test_restriction_narrows_inherited_field() {
        let base = SchemaClass::new(QName::local("Base"), "m")
            .with_attribute(string("code").with_facets(Facets {
                max_length: Some(10),
                ..Facets::default()
            }))
            .with_attribute(string("note").with_occurs(Occurs::new(0, MaxOccurs::Unbounded)));
        let narrowed = SchemaClass::new(QName::local("Narrow"), "m")
            .restricting(QName::local("Base"))
            .with_attribute(string("code").with_facets(Facets {
                max_length: Some(4),
                ..Facets::default()
            }));
        let graph = ClassGraph::new(vec![base, narrowed], vec![]).unwrap();
        let config = GeneratorConfig::default();
        let (spec, _) = run(&graph, &config, "Narrow");
        let spec = spec.unwrap();
        assert_eq!(spec.fields.len(), 1);
        let code = &spec.fields[0];
        assert_eq!(code.name, "spec10_code");
        assert!(code.restricted);
        assert_eq!(code.constraints.size, Some(4));
        match &spec.strategy {
            InheritanceStrategy::SingleParent {
                parent, derivation, ..
            } => {
                assert_eq!(parent, "Base");
                assert_eq!(*derivation, DerivationKind::Restriction);
            }
            other => panic!("expected single parent, got {other:?}"),
        }
    }

    #[test]
    fn test_inner_class_binding_type() {
        assert_eq!(binding_type(&QName::local("order.line")), "Order.Line");
        assert_eq!(binding_type(&QName::local("Address")), "Address");
    }

    #[test]
    fn test_skipped_field_reported() {
        let graph = ClassGraph::new(
            vec![SchemaClass::new(QName::local("Doc"), "m")
                .with_attribute(string("id"))
                .with_attribute(string("internalNote"))],
            vec![],
        )
        .unwrap();
        let config = GeneratorConfig {
            skip_pattern: Some("^internal".into()),
            ..GeneratorConfig::default()
        };
        let (spec, diags) = run(&graph, &config, "Doc");
        assert_eq!(spec.unwrap().fields.len(), 1);
        assert_eq!(diags.of_kind("field_skipped").count(), 1);
    }
}
