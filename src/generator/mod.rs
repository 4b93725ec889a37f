//! # Generator Module
//!
//! The generator turns an analyzed XSD class graph into ORM model classes
//! (Odoo-style Python) that carry enough XML metadata for a companion
//! serializer to read and write conforming documents.
//!
//! ## Architecture
//!
//! ```text
//! SchemaGraph → ClassTransformer → ModelSpec (IR) → Templates → Module files
//!                 │   │     │
//!                 │   │     └─ InheritanceResolver (chains, choices, narrowing)
//!                 │   └─ NameRegistry (sanitizing, collisions)
//!                 └─ TypeMapper (XSD built-ins and facets → field kinds)
//! ```
//!
//! 1. **Validation** - configuration and inheritance cycles are checked first;
//!    a cycle aborts the run before anything is rendered
//! 2. **Declaration** - every class declares the identifiers it will need so
//!    collisions are settled over the whole schema
//! 3. **Transformation** - each class becomes a [`ModelSpec`]; a failing class
//!    is skipped with a diagnostic and references to it degrade to text
//! 4. **Ordering** - models are sorted so parents and relation targets load first
//! 5. **Rendering** - Askama templates (or runtime minijinja templates from
//!    `template_dir`) produce one `<module>.py` per schema module plus the
//!    package `__init__.py`
//!
//! ## Generated Structure
//!
//! ```text
//! models/
//! ├── __init__.py        # from . import <module>
//! └── <module>.py        # selection constants, then models in load order
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xsd_ormgen::{generate, load_graph, write_output, GeneratorConfig};
//!
//! let graph = load_graph("schema.yaml".as_ref())?;
//! let output = generate(&graph, &GeneratorConfig::from_env())?;
//! write_output("out".as_ref(), &output)?;
//! print!("{}", output.diagnostics.report());
//! ```
//!
//! ## Template Customization
//!
//! Built-in templates live in the `templates/` directory:
//!
//! - `model.py.txt` - one model class
//! - `module.py.txt` - module header, imports and selection constants
//! - `init.py.txt` - package `__init__.py`
//!
//! A `template_dir` may provide `model.py.j2`, `module.py.j2` and `init.py.j2`
//! overrides. Undefined variables in those templates are errors.

pub mod inheritance;
pub mod labels;
pub mod model;
pub mod names;
mod project;
pub mod templates;
pub mod transform;
pub mod types;

pub use model::*;
pub use names::{NameKind, NameRegistry};
pub use project::*;
pub use templates::{render_model, CustomTemplates, TemplateSet};
pub use transform::ClassTransformer;
pub use types::TypeMapper;
