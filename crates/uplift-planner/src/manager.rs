use std::collections::{BTreeMap, BTreeSet};

use uplift_core::{Checkpoint, CheckpointClass, ModelVersion, ModelVersions, Upgrade};

use crate::error::PlannerError;
use crate::graph::topo_order;
use crate::plan::UpgradePlan;

/// Holds the registered checkpoints and upgrades, validates the upgrade
/// dependency graph once at construction, and produces ordered upgrade
/// plans against snapshots of current model versions.
pub struct UpgradeManager {
    checkpoints: Vec<Box<dyn Checkpoint>>,
    upgrades: Vec<Box<dyn Upgrade>>,
    checkpoint_by_model: BTreeMap<String, usize>,
    ordered: Vec<usize>,
    local_models: BTreeSet<String>,
    clustered_models: BTreeSet<String>,
}

impl UpgradeManager {
    pub fn new(
        checkpoints: Vec<Box<dyn Checkpoint>>,
        upgrades: Vec<Box<dyn Upgrade>>,
    ) -> Result<Self, PlannerError> {
        let checkpoint_by_model = index_checkpoints(&checkpoints)?;
        check_version_ordering(&upgrades)?;
        check_checkpoint_coverage(&upgrades, &checkpoint_by_model)?;

        let dependencies = build_dependencies(&upgrades)?;
        let versions: Vec<ModelVersion> = upgrades
            .iter()
            .map(|upgrade| upgrade.info().to_version.clone())
            .collect();
        let ordered = topo_order(&versions, &dependencies, |node| {
            let info = upgrades[node].info();
            format!("{}@{}", info.model, info.to_version)
        })?;

        let local_models: BTreeSet<String> = checkpoints
            .iter()
            .filter(|checkpoint| checkpoint.class() == CheckpointClass::Local)
            .map(|checkpoint| checkpoint.model().to_string())
            .collect();

        // every other model named by a checkpoint or an upgrade is
        // assumed to be clustered
        let clustered_models: BTreeSet<String> = checkpoints
            .iter()
            .map(|checkpoint| checkpoint.model().to_string())
            .chain(
                upgrades
                    .iter()
                    .map(|upgrade| upgrade.info().model.clone()),
            )
            .filter(|model| !local_models.contains(model))
            .collect();

        Ok(Self {
            checkpoints,
            upgrades,
            checkpoint_by_model,
            ordered,
            local_models,
            clustered_models,
        })
    }

    /// Ordered plan of every upgrade still pending against `current`.
    /// Missing entries mean the model has never been migrated, so all of
    /// its upgrades are pending. Returns an empty plan when nothing pends.
    pub fn plan(&self, current: &ModelVersions) -> UpgradePlan<'_> {
        self.plan_filtered(current, false)
    }

    /// Like [`plan`](Self::plan), restricted to local models. Used by nodes
    /// joining an existing cluster, which must not re-run clustered-model
    /// upgrades.
    pub fn plan_local(&self, current: &ModelVersions) -> UpgradePlan<'_> {
        self.plan_filtered(current, true)
    }

    fn plan_filtered(&self, current: &ModelVersions, local_only: bool) -> UpgradePlan<'_> {
        let steps = self
            .ordered
            .iter()
            .map(|&node| self.upgrades[node].as_ref())
            .filter(|upgrade| {
                let info = upgrade.info();
                current
                    .get(&info.model)
                    .map_or(true, |version| info.to_version.after(version))
            })
            .filter(|upgrade| !local_only || self.local_models.contains(&upgrade.info().model))
            .collect();
        UpgradePlan::new(steps)
    }

    /// The distinct checkpoints touched by `plan`, in the order their
    /// models first appear in it, which is the order `begin` is called in.
    pub fn prepare<'a>(&'a self, plan: &UpgradePlan<'a>) -> Vec<&'a dyn Checkpoint> {
        let mut remaining: BTreeSet<&str> = self
            .checkpoint_by_model
            .keys()
            .map(String::as_str)
            .collect();

        plan.steps()
            .iter()
            .map(|upgrade| upgrade.info().model.as_str())
            .filter(|model| remaining.remove(model))
            .map(|model| self.checkpoints[self.checkpoint_by_model[model]].as_ref())
            .collect()
    }

    /// Map of model name to the version of its highest registered upgrade.
    /// A fresh install is recorded at these versions without running anything.
    pub fn latest_known_versions(&self) -> ModelVersions {
        let mut latest = ModelVersions::new();
        for upgrade in &self.upgrades {
            let info = upgrade.info();
            match latest.get(&info.model) {
                Some(version) if !info.to_version.after(version) => {}
                _ => {
                    latest.insert(info.model.clone(), info.to_version.clone());
                }
            }
        }
        latest
    }

    /// Models migrated independently on every node.
    pub fn local_models(&self) -> &BTreeSet<String> {
        &self.local_models
    }

    /// Models migrated once and shared across the cluster.
    pub fn clustered_models(&self) -> &BTreeSet<String> {
        &self.clustered_models
    }
}

fn index_checkpoints(
    checkpoints: &[Box<dyn Checkpoint>],
) -> Result<BTreeMap<String, usize>, PlannerError> {
    let mut by_model = BTreeMap::new();
    for (index, checkpoint) in checkpoints.iter().enumerate() {
        if by_model
            .insert(checkpoint.model().to_string(), index)
            .is_some()
        {
            return Err(PlannerError::DuplicateCheckpoint {
                model: checkpoint.model().to_string(),
            });
        }
    }
    Ok(by_model)
}

/// Upgrades for a fixed model must be declared in strictly increasing
/// version order; this also rules out two upgrades sharing a version.
fn check_version_ordering(upgrades: &[Box<dyn Upgrade>]) -> Result<(), PlannerError> {
    let mut previous: BTreeMap<&str, &ModelVersion> = BTreeMap::new();
    for upgrade in upgrades {
        let info = upgrade.info();
        if let Some(last) = previous.get(info.model.as_str()) {
            if !info.to_version.after(last) {
                return Err(PlannerError::VersionNotAfter {
                    model: info.model.clone(),
                    version: info.to_version.to_string(),
                    previous: last.to_string(),
                });
            }
        }
        previous.insert(info.model.as_str(), &info.to_version);
    }
    Ok(())
}

/// Every upgraded model needs a checkpoint, or its migrations would run
/// outside any transactional boundary.
fn check_checkpoint_coverage(
    upgrades: &[Box<dyn Upgrade>],
    checkpoint_by_model: &BTreeMap<String, usize>,
) -> Result<(), PlannerError> {
    for upgrade in upgrades {
        let model = &upgrade.info().model;
        if !checkpoint_by_model.contains_key(model) {
            return Err(PlannerError::MissingCheckpoint {
                model: model.clone(),
            });
        }
    }
    Ok(())
}

/// Builds the dependency sets for each upgrade node: the implicit edge to
/// the same model's preceding upgrade plus the explicitly declared
/// cross-model edges.
fn build_dependencies(upgrades: &[Box<dyn Upgrade>]) -> Result<Vec<BTreeSet<usize>>, PlannerError> {
    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); upgrades.len()];
    let mut last_for_model: BTreeMap<&str, usize> = BTreeMap::new();

    for (node, upgrade) in upgrades.iter().enumerate() {
        let info = upgrade.info();
        if let Some(&predecessor) = last_for_model.get(info.model.as_str()) {
            dependencies[node].insert(predecessor);
        }
        last_for_model.insert(info.model.as_str(), node);

        for dependency in &info.depends_on {
            let producer = upgrades.iter().position(|candidate| {
                let candidate = candidate.info();
                candidate.model == dependency.model
                    && candidate.to_version == dependency.version
            });
            match producer {
                Some(producer) => {
                    dependencies[node].insert(producer);
                }
                None => {
                    return Err(PlannerError::UnresolvedDependency {
                        model: info.model.clone(),
                        dependency: dependency.model.clone(),
                        version: dependency.version.to_string(),
                    });
                }
            }
        }
    }

    Ok(dependencies)
}
