use anyhow::Context;
use std::path::Path;

use super::build::{build_graph, RawGraph};
use super::ClassGraph;

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false)
}

/// Load a class graph export from a `.yaml`/`.yml` or `.json` file.
pub fn load_graph(path: &Path) -> anyhow::Result<ClassGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read class graph {:?}", path))?;
    let raw: RawGraph = if is_yaml(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML class graph {:?}", path))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON class graph {:?}", path))?
    };
    build_graph(&raw).with_context(|| format!("Invalid class graph {:?}", path))
}

/// Parse a class graph from a YAML (or JSON, which YAML accepts) string.
pub fn parse_graph(source: &str) -> anyhow::Result<ClassGraph> {
    let raw: RawGraph = serde_yaml::from_str(source).context("Failed to parse class graph")?;
    Ok(build_graph(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("graph.json");
        let mut f = std::fs::File::create(&json_path).unwrap();
        f.write_all(br#"{"classes":[{"name":"A","members":[{"name":"x","type":"xs:int"}]}]}"#)
            .unwrap();
        let g = load_graph(&json_path).unwrap();
        assert_eq!(g.classes.len(), 1);

        let yaml_path = dir.path().join("graph.yml");
        std::fs::write(&yaml_path, "classes:\n  - name: B\n").unwrap();
        let g = load_graph(&yaml_path).unwrap();
        assert_eq!(g.classes[0].qname.local, "B");
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "classes: [ {").unwrap();
        let err = load_graph(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.yaml"));
    }
}
