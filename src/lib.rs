//! # xsd-ormgen
//!
//! **xsd-ormgen** turns an analyzed XSD class graph into ORM model classes
//! (Odoo-style Python). Every generated field keeps the schema name, type and
//! occurrence bounds it came from, so a companion serializer can rebuild
//! conforming XML from the stored records.
//!
//! ## Overview
//!
//! XSD type systems and ORM type systems disagree in many small ways: choice
//! groups, restriction chains, facet-constrained built-ins, inner classes with
//! clashing names and identifier length limits. The generator resolves each of
//! them deterministically and reports what it had to skip or degrade instead
//! of aborting on the first odd class.
//!
//! ## Architecture
//!
//! - **[`graph`]** - Read-only schema graph (`SchemaGraph` trait, YAML/JSON loading)
//! - **[`generator`]** - Type mapping, naming, inheritance, transformation, rendering
//! - **[`config`]** - Generator configuration (TOML file plus environment overrides)
//! - **[`diagnostics`]** - Class-level problems collected during a run
//! - **[`error`]** - Error kinds and their fatal/class-scoped split
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Graph as graph::load_graph
//!     participant Gen as generator::generate
//!     participant Xform as generator::transform
//!     participant Tpl as generator::templates
//!     participant FS as File System
//!
//!     Caller->>Graph: load_graph("schema.yaml")
//!     Graph-->>Caller: ClassGraph
//!     Caller->>Gen: generate(&graph, &config)
//!     Gen->>Gen: validate config, check inheritance cycles
//!     Gen->>Xform: declare + transform each class
//!     Xform-->>Gen: ModelSpec / class-scoped error
//!     Gen->>Gen: inverse keys, field order, load order
//!     Gen->>Tpl: render models, modules, __init__
//!     Tpl-->>Gen: source text
//!     Gen-->>Caller: GenerationOutput (files + diagnostics)
//!     Caller->>FS: write_output(dir, &output)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xsd_ormgen::{generate, parse_graph, GeneratorConfig};
//!
//! let graph = parse_graph(r#"
//! module: address
//! classes:
//!   - name: Address
//!     members:
//!       - { name: street, type: "xs:string" }
//!       - { name: country, type: "xs:string", fixed: US }
//! "#)?;
//! let output = generate(&graph, &GeneratorConfig::default())?;
//! for (path, source) in &output.files {
//!     println!("# {}\n{source}", path.display());
//! }
//! ```
//!
//! ## Logging
//!
//! The library only emits `tracing` events. Binaries and tests can install
//! the bundled subscriber with [`logging::init_logging`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod graph;
pub mod logging;

pub use config::GeneratorConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::GenerationError;
pub use generator::{generate, write_output, GenerationOutput, ModelSpec, TemplateSet};
pub use graph::{load_graph, parse_graph, ClassGraph, SchemaGraph};
