use anyhow::Result;

use crate::version::ModelVersion;

/// Reference to an upgrade registered elsewhere, by the model it migrates
/// and the version it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRef {
    pub model: String,
    pub version: ModelVersion,
}

/// Declared metadata of a single upgrade step: the model it migrates, the
/// version it takes that model to, and the upgrades that must run first.
#[derive(Debug, Clone)]
pub struct UpgradeInfo {
    pub model: String,
    pub to_version: ModelVersion,
    pub depends_on: Vec<UpgradeRef>,
}

impl UpgradeInfo {
    pub fn new(model: &str, to_version: &str) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            to_version: ModelVersion::parse(to_version)?,
            depends_on: Vec::new(),
        })
    }

    pub fn depends_on(mut self, model: &str, version: &str) -> Result<Self> {
        self.depends_on.push(UpgradeRef {
            model: model.to_string(),
            version: ModelVersion::parse(version)?,
        });
        Ok(self)
    }
}

/// A single migration step owned by exactly one model.
///
/// Implementations are registered once at process wiring time and supplied
/// to the planner as an explicit list; for a fixed model they must be
/// declared in strictly increasing version order.
pub trait Upgrade {
    fn info(&self) -> &UpgradeInfo;

    /// Performs the migration. Any error aborts the run and rolls back
    /// every checkpoint the run has begun.
    fn apply(&self) -> Result<()>;
}
