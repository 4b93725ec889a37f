//! Error kinds raised while turning a class graph into model source.
//!
//! Errors are either class-scoped (the class is skipped, a diagnostic is
//! recorded and generation continues) or schema-scoped and fatal (generation
//! aborts and nothing is written). [`GenerationError::is_fatal`] tells them apart.

use thiserror::Error;

use crate::graph::QName;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// An XSD type with no field mapping.
    #[error("unsupported type '{type_name}' for '{qname}' at {location}")]
    UnsupportedType {
        type_name: String,
        qname: QName,
        location: String,
    },

    /// Identifier length budget leaves no room for a disambiguating suffix.
    #[error("cannot find a unique name for '{name}' in scope '{scope}' at {location}")]
    NameCollisionUnresolvable {
        name: String,
        scope: String,
        location: String,
    },

    /// An extension chain that loops back on itself.
    #[error("cyclic inheritance for '{qname}' at {location}: {}", chain.join(" -> "))]
    CyclicInheritance {
        qname: QName,
        location: String,
        chain: Vec<String>,
    },

    /// A template referenced a variable that was not supplied, or failed to render.
    #[error("template contract violation: {0}")]
    TemplateContractViolation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid class graph: {0}")]
    Graph(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Schema-scoped errors abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GenerationError::CyclicInheritance { .. }
                | GenerationError::TemplateContractViolation(_)
                | GenerationError::Config(_)
                | GenerationError::Graph(_)
                | GenerationError::Io(_)
        )
    }

    /// Short machine-readable kind, used for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::UnsupportedType { .. } => "unsupported_type",
            GenerationError::NameCollisionUnresolvable { .. } => "name_collision_unresolvable",
            GenerationError::CyclicInheritance { .. } => "cyclic_inheritance",
            GenerationError::TemplateContractViolation(_) => "template_contract_violation",
            GenerationError::Config(_) => "config",
            GenerationError::Graph(_) => "graph",
            GenerationError::Io(_) => "io",
        }
    }
}

impl From<askama::Error> for GenerationError {
    fn from(err: askama::Error) -> Self {
        GenerationError::TemplateContractViolation(err.to_string())
    }
}

impl From<minijinja::Error> for GenerationError {
    fn from(err: minijinja::Error) -> Self {
        // `{:#}` includes the template name and line of the failure.
        GenerationError::TemplateContractViolation(format!("{err:#}"))
    }
}
