#![allow(dead_code)]

use std::path::{Path, PathBuf};

use xsd_ormgen::{load_graph, ClassGraph};

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load a class graph from `tests/fixtures`.
pub fn fixture(name: &str) -> ClassGraph {
    load_graph(&fixture_path(name)).unwrap()
}
