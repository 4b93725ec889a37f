use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::GenerationError;
use crate::generator::inheritance::{check_cycles, field_order};
use crate::generator::model::{
    FieldKind, FieldOrigin, FieldSpec, InheritanceStrategy, ModelSpec, SelectionConstant,
};
use crate::generator::names::{NameKind, NameRegistry};
use crate::generator::templates::{
    render_init, render_model, render_module, ConstantView, ModuleTemplateData, TemplateSet,
};
use crate::generator::transform::ClassTransformer;
use crate::generator::types::dedup_case_insensitive;
use crate::graph::{SchemaGraph, SimpleType};

/// Everything one generation run produced.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    /// Path relative to the output directory -> file contents
    pub files: BTreeMap<PathBuf, String>,
    /// Models in load order
    pub models: Vec<ModelSpec>,
    pub constants: Vec<SelectionConstant>,
    pub diagnostics: Diagnostics,
}

impl GenerationOutput {
    pub fn model(&self, registry_name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.registry_name == registry_name)
    }
}

/// Python module name for a schema module.
pub fn module_stem(module: &str) -> String {
    let mut stem: String = module
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if stem.is_empty() || stem.starts_with(|c: char| c.is_ascii_digit()) {
        stem.insert(0, '_');
    }
    stem
}

/// Generate model sources for every class of `graph`.
///
/// Cyclic inheritance, invalid configuration and template failures abort the
/// run before anything is returned. Problems local to one class are reported
/// in [`GenerationOutput::diagnostics`] and the class is left out.
pub fn generate<G>(graph: &G, config: &GeneratorConfig) -> Result<GenerationOutput, GenerationError>
where
    G: SchemaGraph + ?Sized,
{
    config.validate()?;
    check_cycles(graph)?;
    let templates = TemplateSet::from_config(config)?;
    info!(
        classes = graph.classes().len(),
        simple_types = graph.simple_types().len(),
        package = %config.package,
        "generating models"
    );

    let mut transformer = ClassTransformer::new(graph, config)?;
    let mut registry = NameRegistry::new(config);
    let mut diagnostics = Diagnostics::new();

    let mut candidates = Vec::new();
    for class in graph.classes() {
        if transformer.is_skipped(class) {
            diagnostics.info(
                class.location(),
                "class_skipped",
                format!("class '{}' matches a skip pattern", class.qname),
            );
            transformer.mark_unavailable(class.qname.clone());
        } else {
            candidates.push(class);
        }
    }

    let enumerations = collect_enumerations(graph)?;
    for (st, _) in &enumerations {
        registry.declare(
            &config.package,
            NameKind::Constant,
            &st.qname.to_string(),
            &st.qname.local.replace('.', "_"),
        );
    }
    for class in &candidates {
        transformer.declare(class, &mut registry)?;
    }

    // A failed class becomes unavailable and the remaining classes are
    // transformed again so references to it degrade.
    let mut failures = Diagnostics::new();
    let mut models = loop {
        let mut pass = Diagnostics::new();
        let mut models = Vec::new();
        let mut failed = Vec::new();
        for class in candidates.iter().filter(|c| transformer.is_available(&c.qname)) {
            match transformer.transform(class, &mut registry, &mut pass) {
                Ok(model) => models.push(model),
                Err(err) if !err.is_fatal() => {
                    debug!(class = %class.qname, error = %err, "class failed");
                    failed.push((class.qname.clone(), Diagnostic::from_error(class.location(), &err)));
                }
                Err(err) => return Err(err),
            }
        }
        if failed.is_empty() {
            diagnostics.extend(failures);
            diagnostics.extend(pass);
            break models;
        }
        for (qname, diagnostic) in failed {
            transformer.mark_unavailable(qname);
            failures.push(diagnostic);
        }
    };

    let mut constants = Vec::with_capacity(enumerations.len());
    for (st, values) in &enumerations {
        constants.push(SelectionConstant {
            name: transformer.constant_ident(&mut registry, &st.qname)?,
            module: st.module.clone(),
            values: values
                .iter()
                .map(|v| {
                    let label = st.value_docs.get(v).cloned().unwrap_or_else(|| v.clone());
                    (v.clone(), label)
                })
                .collect(),
            doc: st.doc.clone(),
        });
    }

    add_inverse_keys(&mut models);
    let orders: Vec<Vec<String>> = models
        .iter()
        .map(|m| field_order(m, |r| models.iter().find(|p| p.registry_name == r)))
        .collect();
    for (model, order) in models.iter_mut().zip(orders) {
        model.field_order = order;
    }
    let models = load_order(models);

    let files = render_files(&models, &constants, &templates, config)?;
    diagnostics.log_all();
    info!(
        files = files.len(),
        models = models.len(),
        constants = constants.len(),
        diagnostics = diagnostics.len(),
        "generation finished"
    );
    Ok(GenerationOutput {
        files,
        models,
        constants,
        diagnostics,
    })
}

/// Named simple types whose resolved facets enumerate values, with the
/// de-duplicated values.
fn collect_enumerations<G>(graph: &G) -> Result<Vec<(&SimpleType, Vec<String>)>, GenerationError>
where
    G: SchemaGraph + ?Sized,
{
    let mut out = Vec::new();
    for st in graph.simple_types() {
        let (_, facets) = graph.resolve_simple(&st.qname)?;
        if !facets.enumeration.is_empty() {
            let (values, _) = dedup_case_insensitive(&facets.enumeration);
            out.push((st, values));
        }
    }
    Ok(out)
}

/// Add the implicit many-to-one key on the comodel of every one-to-many.
fn add_inverse_keys(models: &mut [ModelSpec]) {
    let mut keys: Vec<(String, FieldSpec)> = Vec::new();
    for model in models.iter() {
        for field in &model.fields {
            let FieldKind::One2many { comodel, inverse } = &field.kind else {
                continue;
            };
            keys.push((
                comodel.clone(),
                FieldSpec {
                    name: inverse.clone(),
                    kind: FieldKind::Many2one {
                        comodel: model.registry_name.clone(),
                    },
                    required: false,
                    multiple: false,
                    constraints: Default::default(),
                    label: model.class_name.clone(),
                    help: None,
                    default: None,
                    origin: FieldOrigin::InverseKey {
                        from_model: model.registry_name.clone(),
                        field: field.name.clone(),
                    },
                    restricted: false,
                },
            ));
        }
    }
    for (comodel, key) in keys {
        if let Some(target) = models.iter_mut().find(|m| m.registry_name == comodel) {
            if target.field(&key.name).is_none() {
                target.fields.push(key);
            }
        }
    }
}

/// Parents and relation targets before the models that use them.
///
/// Ready models are emitted in schema order. When only cycles remain, the
/// earliest model whose parent is already emitted goes next and its unmet
/// targets are recorded as forward references.
fn load_order(models: Vec<ModelSpec>) -> Vec<ModelSpec> {
    let index: HashMap<&str, usize> = models
        .iter()
        .enumerate()
        .map(|(i, m)| (m.registry_name.as_str(), i))
        .collect();
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(models.len());
    let mut targets: Vec<BTreeSet<usize>> = Vec::with_capacity(models.len());
    for (i, model) in models.iter().enumerate() {
        let parent = match &model.strategy {
            InheritanceStrategy::SingleParent {
                parent_registry, ..
            } => index.get(parent_registry.as_str()).copied().filter(|&j| j != i),
            _ => None,
        };
        parents.push(parent);
        targets.push(
            model
                .fields
                .iter()
                .filter(|f| !matches!(f.origin, FieldOrigin::InverseKey { .. }))
                .filter_map(|f| f.kind.comodel())
                .filter_map(|c| index.get(c).copied())
                .filter(|&j| j != i)
                .collect(),
        );
    }

    // Unmet dependencies per model and the models waiting on each one.
    let n = models.len();
    let mut pending: Vec<usize> = Vec::with_capacity(n);
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        let deps: BTreeSet<usize> = parents[i].into_iter().chain(targets[i].iter().copied()).collect();
        pending.push(deps.len());
        for d in deps {
            dependents[d].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut remaining: BTreeSet<usize> = (0..n).collect();
    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); n];
    while !remaining.is_empty() {
        // Only cycles are left when nothing is ready.
        let next = ready.pop_first().or_else(|| {
            remaining
                .iter()
                .copied()
                .find(|&i| parents[i].map_or(true, |p| emitted[p]))
                .or_else(|| remaining.first().copied())
        });
        let Some(i) = next else {
            break;
        };
        forward[i] = targets[i].iter().copied().filter(|&j| !emitted[j]).collect();
        emitted[i] = true;
        remaining.remove(&i);
        order.push(i);
        for &d in &dependents[i] {
            pending[d] = pending[d].saturating_sub(1);
            if pending[d] == 0 && !emitted[d] {
                ready.insert(d);
            }
        }
    }

    let names: Vec<String> = models.iter().map(|m| m.registry_name.clone()).collect();
    let mut slots: Vec<Option<ModelSpec>> = models.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| {
            let mut model = slots.get_mut(i)?.take()?;
            model.forward_refs = forward[i].iter().map(|&j| names[j].clone()).collect();
            Some(model)
        })
        .collect()
}

fn render_files(
    models: &[ModelSpec],
    constants: &[SelectionConstant],
    templates: &TemplateSet,
    config: &GeneratorConfig,
) -> Result<BTreeMap<PathBuf, String>, GenerationError> {
    let constant_module: HashMap<&str, &str> = constants
        .iter()
        .map(|c| (c.name.as_str(), c.module.as_str()))
        .collect();

    let mut modules: BTreeMap<String, (Vec<&ModelSpec>, Vec<&SelectionConstant>)> = BTreeMap::new();
    for constant in constants {
        modules
            .entry(module_stem(&constant.module))
            .or_default()
            .1
            .push(constant);
    }
    for model in models {
        modules.entry(module_stem(&model.module)).or_default().0.push(model);
    }

    let package_dir: PathBuf = config.package.split('.').collect();
    let mut files = BTreeMap::new();
    for (stem, (module_models, module_constants)) in &modules {
        let mut imports: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for model in module_models {
            for field in &model.fields {
                let FieldKind::Selection {
                    constant: Some(name),
                    ..
                } = &field.kind
                else {
                    continue;
                };
                if let Some(module) = constant_module.get(name.as_str()) {
                    let other = module_stem(module);
                    if &other != stem {
                        imports.entry(other).or_default().insert(name.as_str());
                    }
                }
            }
        }

        let mut rendered = Vec::with_capacity(module_models.len());
        for model in module_models {
            rendered.push(render_model(model, templates, config)?.trim_end().to_string());
        }
        let data = ModuleTemplateData {
            module: stem.clone(),
            uses_textwrap: module_models.iter().any(|m| m.doc.is_some()),
            imports: imports
                .iter()
                .map(|(module, names)| {
                    let names: Vec<&str> = names.iter().copied().collect();
                    format!("from .{module} import {}", names.join(", "))
                })
                .collect(),
            constants: module_constants.iter().map(|c| ConstantView::new(c)).collect(),
            models: rendered,
        };
        files.insert(package_dir.join(format!("{stem}.py")), render_module(&data, templates)?);
        info!(
            module = %stem,
            models = module_models.len(),
            constants = module_constants.len(),
            "rendered module"
        );
    }

    let stems: Vec<String> = modules.keys().cloned().collect();
    files.insert(package_dir.join("__init__.py"), render_init(&stems, templates)?);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::QName;

    fn model(name: &str, parent: Option<&str>, targets: &[&str]) -> ModelSpec {
        ModelSpec {
            class_name: name.to_string(),
            registry_name: name.to_string(),
            qname: QName::local(name),
            module: "m".into(),
            package: "models".into(),
            strategy: match parent {
                Some(p) => InheritanceStrategy::SingleParent {
                    parent: p.to_string(),
                    parent_registry: p.to_string(),
                    derivation: crate::graph::DerivationKind::Extension,
                },
                None => InheritanceStrategy::None,
            },
            fields: targets
                .iter()
                .map(|t| FieldSpec {
                    name: format!("to_{t}"),
                    kind: FieldKind::Many2one {
                        comodel: t.to_string(),
                    },
                    required: false,
                    multiple: false,
                    constraints: Default::default(),
                    label: t.to_string(),
                    help: None,
                    default: None,
                    origin: FieldOrigin::Discriminator {
                        group: 0,
                        alternatives: vec![],
                    },
                    restricted: false,
                })
                .collect(),
            field_order: vec![],
            doc: None,
            binding_type: name.to_string(),
            namespace: None,
            is_abstract: false,
            forward_refs: vec![],
        }
    }

    fn names(models: &[ModelSpec]) -> Vec<&str> {
        models.iter().map(|m| m.registry_name.as_str()).collect()
    }

    #[test]
    fn test_load_order_parents_and_targets_first() {
        let ordered = load_order(vec![
            model("Child", Some("Base"), &[]),
            model("Order", None, &["Line"]),
            model("Line", None, &[]),
            model("Base", None, &[]),
        ]);
        assert_eq!(names(&ordered), vec!["Line", "Order", "Base", "Child"]);
        assert!(ordered.iter().all(|m| m.forward_refs.is_empty()));
    }

    #[test]
    fn test_load_order_breaks_relation_cycle() {
        let ordered = load_order(vec![model("A", None, &["B"]), model("B", None, &["A"])]);
        assert_eq!(names(&ordered), vec!["A", "B"]);
        assert_eq!(ordered[0].forward_refs, vec!["B".to_string()]);
        assert!(ordered[1].forward_refs.is_empty());
    }

    #[test]
    fn test_load_order_releases_dependents_of_a_cycle() {
        let ordered = load_order(vec![
            model("A", None, &["B"]),
            model("B", None, &["A"]),
            model("C", None, &["A"]),
            model("D", Some("C"), &["B"]),
        ]);
        assert_eq!(names(&ordered), vec!["A", "B", "C", "D"]);
        assert_eq!(ordered[0].forward_refs, vec!["B".to_string()]);
        assert!(ordered[1..].iter().all(|m| m.forward_refs.is_empty()));
    }

    #[test]
    fn test_load_order_long_chain() {
        // Each model targets the next one, so the chain loads back to front.
        let count = 2_000;
        let idents: Vec<String> = (0..count).map(|i| format!("M{i:04}")).collect();
        let models: Vec<ModelSpec> = (0..count)
            .map(|i| match idents.get(i + 1) {
                Some(next) => model(&idents[i], None, &[next.as_str()]),
                None => model(&idents[i], None, &[]),
            })
            .collect();
        let ordered = load_order(models);
        let expected: Vec<&str> = idents.iter().rev().map(String::as_str).collect();
        assert_eq!(names(&ordered), expected);
        assert!(ordered.iter().all(|m| m.forward_refs.is_empty()));
    }

    #[test]
    fn test_module_stem() {
        assert_eq!(module_stem("nfe.v4-00"), "nfe_v4_00");
        assert_eq!(module_stem("4x"), "_4x");
        assert_eq!(module_stem("Address"), "address");
    }
}
