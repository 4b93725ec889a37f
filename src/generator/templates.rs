use askama::Template;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::labels::{wrap_doc, DOC_WIDTH};
use super::model::{FieldKind, FieldOrigin, FieldSpec, InheritanceStrategy, ModelSpec, SelectionConstant};
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::graph::MaxOccurs;

/// File names looked up in a custom template directory.
pub const MODEL_TEMPLATE: &str = "model.py.j2";
pub const MODULE_TEMPLATE: &str = "module.py.j2";
pub const INIT_TEMPLATE: &str = "init.py.j2";

/// Class-level attribute such as `_name = "spec.10.address"`
#[derive(Debug, Clone, Serialize)]
pub struct ClassAttr {
    pub name: String,
    /// Python expression
    pub value: String,
}

/// One field definition, arguments already formatted as Python
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: String,
    /// Field constructor under `fields.`
    pub ctor: String,
    pub args: Vec<String>,
}

/// Template data for one model class
#[derive(Debug, Clone, Serialize, Template)]
#[template(path = "model.py.txt", escape = "none")]
pub struct ModelTemplateData {
    pub class_name: String,
    /// Python base class, e.g. `models.AbstractModel`
    pub python_base: String,
    /// Docstring lines, indented; empty lines stay empty
    pub doc_lines: Vec<String>,
    pub class_attrs: Vec<ClassAttr>,
    /// Comma-separated registry names emitted after this model
    pub forward_refs: String,
    pub fields: Vec<FieldView>,
}

/// Module-level selection constant
#[derive(Debug, Clone, Serialize)]
pub struct ConstantView {
    pub name: String,
    /// `("value", "label")` tuples
    pub items: Vec<String>,
}

/// Template data for one `<module>.py` file
#[derive(Debug, Clone, Serialize, Template)]
#[template(path = "module.py.txt", escape = "none")]
pub struct ModuleTemplateData {
    pub module: String,
    pub uses_textwrap: bool,
    /// Relative imports of constants defined in sibling modules
    pub imports: Vec<String>,
    pub constants: Vec<ConstantView>,
    /// Rendered model classes, in load order
    pub models: Vec<String>,
}

/// Template data for the package `__init__.py`
#[derive(Debug, Clone, Serialize, Template)]
#[template(path = "init.py.txt", escape = "none")]
pub struct InitTemplateData {
    pub modules: Vec<String>,
}

/// Runtime templates loaded from a directory. Missing files fall back to the
/// built-in template of the same role.
#[derive(Debug, Clone, Default)]
pub struct CustomTemplates {
    pub model: Option<String>,
    pub module: Option<String>,
    pub init: Option<String>,
}

impl CustomTemplates {
    /// Read `model.py.j2`, `module.py.j2` and `init.py.j2` from `dir`.
    ///
    /// Every template found is compiled once so syntax errors surface before
    /// any class is generated.
    pub fn load(dir: &Path) -> Result<Self, GenerationError> {
        if !dir.is_dir() {
            return Err(GenerationError::Config(format!(
                "template directory not found: {}",
                dir.display()
            )));
        }
        let read = |name: &str| -> Result<Option<String>, GenerationError> {
            let path = dir.join(name);
            if !path.is_file() {
                return Ok(None);
            }
            let source = fs::read_to_string(&path)?;
            {
                let mut env = strict_env();
                env.add_template(name, &source)?;
            }
            Ok(Some(source))
        };
        Ok(CustomTemplates {
            model: read(MODEL_TEMPLATE)?,
            module: read(MODULE_TEMPLATE)?,
            init: read(INIT_TEMPLATE)?,
        })
    }
}

/// Which templates produce the output.
#[derive(Debug, Clone, Default)]
pub enum TemplateSet {
    /// Templates compiled into the generator
    #[default]
    Builtin,
    Custom(CustomTemplates),
}

impl TemplateSet {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        match &config.template_dir {
            Some(dir) => Ok(TemplateSet::Custom(CustomTemplates::load(dir)?)),
            None => Ok(TemplateSet::Builtin),
        }
    }

    fn custom(&self, pick: fn(&CustomTemplates) -> Option<&String>) -> Option<&str> {
        match self {
            TemplateSet::Builtin => None,
            TemplateSet::Custom(custom) => pick(custom).map(String::as_str),
        }
    }
}

fn strict_env<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

fn render_custom<S: Serialize>(name: &str, source: &str, ctx: S) -> Result<String, GenerationError> {
    let mut env = strict_env();
    env.add_template(name, source)?;
    let tmpl = env.get_template(name)?;
    Ok(tmpl.render(ctx)?)
}

/// No leading blank lines, single trailing newline.
fn finish(rendered: String) -> String {
    format!("{}\n", rendered.trim_start_matches('\n').trim_end())
}

/// Double-quoted Python string literal.
pub fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn default_literal(kind: &FieldKind, value: &str) -> String {
    match kind {
        FieldKind::Boolean => {
            if value == "true" || value == "1" {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        FieldKind::Integer if value.parse::<i64>().is_ok() => value.to_string(),
        FieldKind::Float | FieldKind::Monetary if value.parse::<f64>().is_ok() => value.to_string(),
        _ => py_str(value),
    }
}

fn selection_literal(values: &[String]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| format!("({}, {})", py_str(v), py_str(v)))
        .collect();
    format!("[{}]", items.join(", "))
}

fn max_occurs_literal(max: MaxOccurs) -> String {
    match max {
        MaxOccurs::Bounded(n) => n.to_string(),
        MaxOccurs::Unbounded => py_str("unbounded"),
    }
}

/// Keyword arguments of a field, in the order they are emitted.
///
/// `model_namespace` is the target namespace of the owning model; members
/// qualified by any other namespace carry it as `xsd_namespace`.
pub fn field_args(field: &FieldSpec, model_namespace: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    match &field.kind {
        FieldKind::Selection { values, constant } => args.push(match constant {
            Some(constant) => constant.clone(),
            None => selection_literal(values),
        }),
        FieldKind::Many2one { comodel } => args.push(format!("comodel_name={}", py_str(comodel))),
        FieldKind::One2many { comodel, inverse } => {
            args.push(py_str(comodel));
            args.push(py_str(inverse));
        }
        _ => {}
    }
    args.push(format!("string={}", py_str(&field.label)));
    if field.required {
        args.push("xsd_required=True".to_string());
    }

    match &field.origin {
        FieldOrigin::Attribute(p) => {
            args.push(format!("xsd_name={}", py_str(&p.qname.local)));
            if let Some(ns) = p.qname.namespace.as_deref().filter(|ns| Some(*ns) != model_namespace) {
                args.push(format!("xsd_namespace={}", py_str(ns)));
            }
            args.push(format!("xsd_type={}", py_str(&p.xsd_type)));
            if p.is_attribute {
                args.push("xsd_attribute=True".to_string());
            }
            args.push(format!("xsd_min_occurs={}", p.occurs.min));
            args.push(format!("xsd_max_occurs={}", max_occurs_literal(p.occurs.max)));
            if let Some(group) = p.choice {
                args.push(format!("xsd_choice={group}"));
            }
        }
        FieldOrigin::Choice {
            group,
            alternatives,
        } => {
            args.push(format!("xsd_choice={group}"));
            // (tag, qualified name, schema type, min occurs, max occurs)
            let tags: Vec<String> = alternatives
                .iter()
                .map(|a| {
                    let p = &a.provenance;
                    format!(
                        "({}, {}, {}, {}, {})",
                        py_str(&a.tag),
                        py_str(&p.qname.to_string()),
                        py_str(&p.xsd_type),
                        p.occurs.min,
                        max_occurs_literal(p.occurs.max)
                    )
                })
                .collect();
            args.push(format!("xsd_alternatives=[{}]", tags.join(", ")));
        }
        FieldOrigin::Discriminator { group, .. } => {
            args.push(format!("xsd_choice={group}"));
            args.push("xsd_discriminator=True".to_string());
        }
        FieldOrigin::InverseKey { .. } => {
            args.push("xsd_implicit=True".to_string());
            args.push(format!("ondelete={}", py_str("cascade")));
        }
    }

    let c = &field.constraints;
    if let Some(size) = c.size {
        args.push(format!("size={size}"));
    }
    if let Some((precision, scale)) = c.digits {
        args.push(format!("digits=({precision}, {scale})"));
    }
    if let Some(currency) = &c.currency_field {
        args.push(format!("currency_field={}", py_str(currency)));
    }
    if let Some(pattern) = &c.pattern {
        args.push(format!("xsd_pattern={}", py_str(pattern)));
    }
    if let Some(default) = &field.default {
        args.push(format!("default={}", default_literal(&field.kind, default)));
    }
    if let Some(help) = &field.help {
        args.push(format!("help={}", py_str(help)));
    }
    args
}

impl ModelTemplateData {
    pub fn new(model: &ModelSpec, config: &GeneratorConfig) -> Self {
        let doc_lines = model
            .doc
            .as_deref()
            .map(|doc| {
                wrap_doc(doc, DOC_WIDTH, 4)
                    .into_iter()
                    .map(|line| if line.is_empty() { line } else { format!("    {line}") })
                    .collect()
            })
            .unwrap_or_default();

        let description = if model.doc.is_some() {
            "textwrap.dedent(\"    %s\" % (__doc__,))".to_string()
        } else {
            py_str(&model.binding_type)
        };
        let inherit = match &model.strategy {
            InheritanceStrategy::SingleParent {
                parent_registry, ..
            } => parent_registry.clone(),
            _ => config.inherit_model(),
        };
        let mut class_attrs = vec![
            ClassAttr {
                name: "_description".into(),
                value: description,
            },
            ClassAttr {
                name: "_name".into(),
                value: py_str(&model.registry_name),
            },
            ClassAttr {
                name: "_inherit".into(),
                value: py_str(&inherit),
            },
            ClassAttr {
                name: "_binding_type".into(),
                value: py_str(&model.binding_type),
            },
        ];
        if let Some(ns) = &model.namespace {
            class_attrs.push(ClassAttr {
                name: "_xsd_namespace".into(),
                value: py_str(ns),
            });
        }

        ModelTemplateData {
            class_name: model.class_name.clone(),
            python_base: config.python_inherit_model.clone(),
            doc_lines,
            class_attrs,
            forward_refs: model.forward_refs.join(", "),
            fields: model
                .fields
                .iter()
                .map(|f| FieldView {
                    name: f.name.clone(),
                    ctor: f.kind.ctor().to_string(),
                    args: field_args(f, model.namespace.as_deref()),
                })
                .collect(),
        }
    }
}

impl ConstantView {
    pub fn new(constant: &SelectionConstant) -> Self {
        ConstantView {
            name: constant.name.clone(),
            items: constant
                .values
                .iter()
                .map(|(value, label)| format!("({}, {})", py_str(value), py_str(label)))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ModelContext<'a> {
    #[serde(flatten)]
    view: &'a ModelTemplateData,
    model: &'a ModelSpec,
}

/// Render one model class.
pub fn render_model(
    model: &ModelSpec,
    templates: &TemplateSet,
    config: &GeneratorConfig,
) -> Result<String, GenerationError> {
    let view = ModelTemplateData::new(model, config);
    let rendered = match templates.custom(|c| c.model.as_ref()) {
        Some(source) => render_custom(
            MODEL_TEMPLATE,
            source,
            ModelContext {
                view: &view,
                model,
            },
        )?,
        None => view.render()?,
    };
    Ok(finish(rendered))
}

/// Render a module file from its already rendered models.
pub fn render_module(
    data: &ModuleTemplateData,
    templates: &TemplateSet,
) -> Result<String, GenerationError> {
    let rendered = match templates.custom(|c| c.module.as_ref()) {
        Some(source) => render_custom(MODULE_TEMPLATE, source, data)?,
        None => data.render()?,
    };
    Ok(finish(rendered))
}

/// Render the package `__init__.py`.
pub fn render_init(modules: &[String], templates: &TemplateSet) -> Result<String, GenerationError> {
    let data = InitTemplateData {
        modules: modules.to_vec(),
    };
    let rendered = match templates.custom(|c| c.init.as_ref()) {
        Some(source) => render_custom(INIT_TEMPLATE, source, &data)?,
        None => data.render()?,
    };
    Ok(finish(rendered))
}
