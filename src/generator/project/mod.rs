mod generate;
mod output;

pub use generate::{generate, module_stem, GenerationOutput};
pub use output::write_output;
