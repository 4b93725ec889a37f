//! Extension and restriction chains, choice groups and group flattening.

use std::collections::BTreeSet;

use super::model::{
    Constraints, FieldKind, FieldOrigin, FieldSpec, InheritanceStrategy, ModelSpec,
};
use crate::error::GenerationError;
use crate::graph::{SchemaAttribute, SchemaClass, SchemaGraph, SchemaMember};

/// Ancestors of `class`, nearest first.
///
/// The chain stops at a base the graph does not contain; the transformer
/// reports that separately. A chain that loops is a [`GenerationError::CyclicInheritance`].
pub fn ancestors<'g, G>(
    graph: &'g G,
    class: &SchemaClass,
) -> Result<Vec<&'g SchemaClass>, GenerationError>
where
    G: SchemaGraph + ?Sized,
{
    let mut chain = Vec::new();
    let mut seen = vec![class.qname.clone()];
    let mut current = class.derivation.as_ref().map(|d| &d.base);
    while let Some(base) = current {
        if seen.contains(base) {
            let mut names: Vec<String> = seen.iter().map(ToString::to_string).collect();
            names.push(base.to_string());
            return Err(GenerationError::CyclicInheritance {
                qname: class.qname.clone(),
                location: class.location(),
                chain: names,
            });
        }
        let Some(parent) = graph.class(base) else {
            break;
        };
        seen.push(parent.qname.clone());
        chain.push(parent);
        current = parent.derivation.as_ref().map(|d| &d.base);
    }
    Ok(chain)
}

/// Fail on the first class (in schema order) whose extension chain loops.
pub fn check_cycles<G>(graph: &G) -> Result<(), GenerationError>
where
    G: SchemaGraph + ?Sized,
{
    for class in graph.classes() {
        ancestors(graph, class)?;
    }
    Ok(())
}

/// Members of a class after group splicing and duplicate merging.
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub attributes: Vec<SchemaAttribute>,
    /// Names of members folded into an earlier member of the same name.
    pub merged: Vec<String>,
}

fn splice(members: &[SchemaMember], out: &mut Vec<SchemaAttribute>) {
    for member in members {
        match member {
            SchemaMember::Attribute(attr) => out.push(attr.clone()),
            SchemaMember::Group(group) => splice(&group.members, out),
        }
    }
}

/// Splice groups and nested sequences into document order.
///
/// With `merge_duplicates`, repeated elements (same name and namespace) fold
/// into the first one: the smaller min-occurs and max-occurs win, `fixed` is
/// cleared and the first documentation is kept. Repeated XML attributes are
/// dropped.
pub fn flatten(class: &SchemaClass, merge_duplicates: bool) -> Flattened {
    let mut spliced = Vec::new();
    splice(&class.members, &mut spliced);
    if !merge_duplicates {
        return Flattened {
            attributes: spliced,
            merged: Vec::new(),
        };
    }

    let mut result: Vec<SchemaAttribute> = Vec::with_capacity(spliced.len());
    let mut merged = Vec::new();
    for attr in spliced {
        let existing = result
            .iter_mut()
            .find(|e| e.name == attr.name && e.namespace == attr.namespace);
        match existing {
            None => result.push(attr),
            Some(existing) => {
                merged.push(attr.name.clone());
                if attr.is_attribute || !attr.facets.enumeration.is_empty() {
                    continue;
                }
                if existing.doc.is_none() {
                    existing.doc = attr.doc;
                }
                existing.occurs.min = existing.occurs.min.min(attr.occurs.min);
                existing.occurs.max = existing.occurs.max.min(attr.occurs.max);
                existing.fixed = None;
            }
        }
    }
    Flattened {
        attributes: result,
        merged,
    }
}

/// How a choice group is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceStrategy {
    /// One field whose values cover every alternative.
    Merged,
    /// One nullable field per alternative plus a discriminator selection.
    Discriminated,
}

/// Pick the representation of a choice group from the mapped kinds of its
/// alternatives.
///
/// Alternatives merge only when they store the same kind and none refers to
/// a class. Everything else, including mixed kinds, is discriminated.
pub fn choice_strategy(alternatives: &[&FieldKind]) -> ChoiceStrategy {
    let Some(first) = alternatives.first() else {
        return ChoiceStrategy::Merged;
    };
    let mergeable = alternatives
        .iter()
        .all(|k| !k.is_relational() && !matches!(k, FieldKind::Untyped) && k.same_storage(first));
    if mergeable {
        ChoiceStrategy::Merged
    } else {
        ChoiceStrategy::Discriminated
    }
}

fn min_opt<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Narrow an inherited field with the restating member of a restriction.
///
/// The result keeps the inherited identifier. Sizes and digits shrink,
/// enumerations intersect (in the restating order) and occurrence bounds
/// tighten.
pub fn narrow(inherited: &FieldSpec, restated: FieldSpec) -> FieldSpec {
    let kind = match (&inherited.kind, restated.kind) {
        (
            FieldKind::Selection { values: parent, .. },
            FieldKind::Selection { values, constant },
        ) => {
            let allowed: BTreeSet<&str> = parent.iter().map(String::as_str).collect();
            FieldKind::Selection {
                values: values
                    .into_iter()
                    .filter(|v| allowed.contains(v.as_str()))
                    .collect(),
                constant,
            }
        }
        (FieldKind::Selection { .. }, _) => inherited.kind.clone(),
        (_, kind) => kind,
    };

    let constraints = Constraints {
        size: min_opt(inherited.constraints.size, restated.constraints.size),
        min_size: max_opt(inherited.constraints.min_size, restated.constraints.min_size),
        digits: match (inherited.constraints.digits, restated.constraints.digits) {
            (Some((p1, s1)), Some((p2, s2))) => Some((p1.min(p2), s1.min(s2))),
            (a, b) => b.or(a),
        },
        lower: restated
            .constraints
            .lower
            .or_else(|| inherited.constraints.lower.clone()),
        upper: restated
            .constraints
            .upper
            .or_else(|| inherited.constraints.upper.clone()),
        pattern: restated
            .constraints
            .pattern
            .or_else(|| inherited.constraints.pattern.clone()),
        currency_field: restated
            .constraints
            .currency_field
            .or_else(|| inherited.constraints.currency_field.clone()),
    };

    let origin = match (inherited.origin.provenance(), restated.origin) {
        (Some(parent), FieldOrigin::Attribute(mut child)) => {
            child.occurs.min = child.occurs.min.max(parent.occurs.min);
            child.occurs.max = child.occurs.max.min(parent.occurs.max);
            FieldOrigin::Attribute(child)
        }
        (_, origin) => origin,
    };
    let (required, multiple) = match origin.provenance() {
        Some(p) => (p.occurs.min >= 1 && p.choice.is_none(), p.occurs.max.is_many()),
        None => (
            inherited.required || restated.required,
            inherited.multiple && restated.multiple,
        ),
    };

    FieldSpec {
        name: inherited.name.clone(),
        kind,
        required,
        multiple,
        constraints,
        label: restated.label,
        help: restated.help.or_else(|| inherited.help.clone()),
        default: restated.default.or_else(|| inherited.default.clone()),
        origin,
        restricted: true,
    }
}

/// Root-first order of every field visible on `model`.
///
/// `parent_of` looks a model up by registry name. Identifiers restated by a
/// descendant keep the position of their first declaration.
pub fn field_order<'a, F>(model: &'a ModelSpec, parent_of: F) -> Vec<String>
where
    F: Fn(&str) -> Option<&'a ModelSpec>,
{
    let mut chain = vec![model];
    let mut seen_registry = BTreeSet::from([model.registry_name.as_str()]);
    let mut current = model;
    while let InheritanceStrategy::SingleParent {
        parent_registry, ..
    } = &current.strategy
    {
        let Some(parent) = parent_of(parent_registry) else {
            break;
        };
        if !seen_registry.insert(parent.registry_name.as_str()) {
            break;
        }
        chain.push(parent);
        current = parent;
    }

    let mut seen = BTreeSet::new();
    let mut order = Vec::new();
    for spec in chain.iter().rev() {
        for field in &spec.fields {
            if seen.insert(field.name.as_str()) {
                order.push(field.name.clone());
            }
        }
    }
    order
}
