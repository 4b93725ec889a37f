use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use super::generate::GenerationOutput;

/// Directory removed when dropped, whatever happened in between.
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(parent: &Path) -> anyhow::Result<Self> {
        let path = parent.join(format!(".xsd-ormgen-staging-{}", std::process::id()));
        if path.exists() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to clear stale staging dir: {}", path.display()))?;
        }
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create staging dir: {}", path.display()))?;
        Ok(StagingDir { path })
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            debug!(path = %self.path.display(), error = %err, "staging dir not removed");
        }
    }
}

/// Write every generated file under `dir`.
///
/// Files are first written to a staging directory inside `dir` and only moved
/// into place once all of them were written. Returns the final paths.
pub fn write_output(dir: &Path, output: &GenerationOutput) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    let staging = StagingDir::create(dir)?;

    for (rel, contents) in &output.files {
        let staged = staging.path.join(rel);
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&staged, contents)
            .with_context(|| format!("Failed to write {}", staged.display()))?;
    }

    let mut written = Vec::with_capacity(output.files.len());
    for rel in output.files.keys() {
        let target = dir.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(staging.path.join(rel), &target)
            .with_context(|| format!("Failed to move generated file into {}", target.display()))?;
        written.push(target);
    }
    info!(dir = %dir.display(), files = written.len(), "wrote generated files");
    Ok(written)
}
