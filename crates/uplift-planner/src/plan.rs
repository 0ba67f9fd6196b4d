use uplift_core::{ModelVersions, Upgrade};

/// An ordered sequence of pending upgrades: a topological order of the
/// dependency graph restricted to upgrades whose target version is after
/// the current version of their model. Produced fresh per request and
/// never mutated afterwards.
pub struct UpgradePlan<'a> {
    steps: Vec<&'a dyn Upgrade>,
}

impl<'a> UpgradePlan<'a> {
    pub(crate) fn new(steps: Vec<&'a dyn Upgrade>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[&'a dyn Upgrade] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The version each model in the plan ends up at: its highest target.
    pub fn target_versions(&self) -> ModelVersions {
        let mut targets = ModelVersions::new();
        for step in &self.steps {
            let info = step.info();
            // plan order is increasing per model, so the last write wins
            targets.insert(info.model.clone(), info.to_version.clone());
        }
        targets
    }
}
