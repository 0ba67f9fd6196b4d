use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uplift_core::ModelVersions;

/// External record of the highest version each model has reached.
///
/// The store may split its record between cluster-shared and per-node
/// storage internally; `load` always returns the merged map and `save`
/// accepts one. Lifecycle `start`/`stop` are delegated from the upgrade
/// service's own start/stop.
pub trait ModelVersionStore {
    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    /// True when no versions were ever recorded, i.e. a fresh install.
    fn is_new_instance(&self) -> Result<bool>;

    fn load(&self) -> Result<ModelVersions>;

    fn save(&self, versions: &ModelVersions) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionsFile {
    version: u32,
    models: ModelVersions,
}

/// File-backed store keeping the recorded versions in a single JSON file.
/// A missing file means a fresh install.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelVersionStore for JsonFileStore {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn is_new_instance(&self) -> Result<bool> {
        Ok(!self.path.exists())
    }

    fn load(&self) -> Result<ModelVersions> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ModelVersions::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read model versions file: {}", self.path.display())
                });
            }
        };

        let file: VersionsFile = serde_json::from_str(&raw).with_context(|| {
            format!(
                "failed parsing model versions file: {}",
                self.path.display()
            )
        })?;
        Ok(file.models)
    }

    fn save(&self, versions: &ModelVersions) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = VersionsFile {
            version: 1,
            models: versions.clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .context("failed serializing model versions")?;
        fs::write(&self.path, content).with_context(|| {
            format!(
                "failed to write model versions file: {}",
                self.path.display()
            )
        })
    }
}
