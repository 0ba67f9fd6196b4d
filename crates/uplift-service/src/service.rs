use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use uplift_core::{Checkpoint, ModelVersion};
use uplift_planner::{UpgradeManager, UpgradePlan};

use crate::node::NodeAccess;
use crate::store::ModelVersionStore;

/// Boot-time driver for model upgrades.
///
/// `start` loads the recorded model versions, asks the planner for the
/// pending upgrades, and runs them under the per-model checkpoint protocol:
/// begin every touched checkpoint, apply every step in plan order, commit
/// every checkpoint in begin order, end every checkpoint, then persist the
/// reached versions. Any failure after the begin phase rolls every begun
/// checkpoint back and surfaces the triggering error to the caller; nothing
/// is persisted. The whole run is synchronous on the calling thread and the
/// rest of startup is expected to wait for it.
pub struct UpgradeService {
    manager: UpgradeManager,
    store: Box<dyn ModelVersionStore>,
    nodes: Box<dyn NodeAccess>,
}

impl UpgradeService {
    pub fn new(
        manager: UpgradeManager,
        store: Box<dyn ModelVersionStore>,
        nodes: Box<dyn NodeAccess>,
    ) -> Self {
        Self {
            manager,
            store,
            nodes,
        }
    }

    pub fn start(&self) -> Result<()> {
        self.store
            .start()
            .context("failed to start model version store")?;

        if self
            .store
            .is_new_instance()
            .context("failed to query install state")?
        {
            self.take_inventory()
        } else {
            self.upgrade_if_needed()
        }
    }

    pub fn stop(&self) -> Result<()> {
        self.store
            .stop()
            .context("failed to stop model version store")
    }

    /// A node joining an existing cluster must not re-run or re-record
    /// clustered-model upgrades; the cluster's shared versions are
    /// authoritative.
    fn local_only(&self) -> bool {
        self.nodes.is_clustered() && !self.nodes.is_oldest_node()
    }

    /// Fresh installs are assumed to already be at the latest schema:
    /// record every model at its highest registered upgrade version without
    /// running anything.
    fn take_inventory(&self) -> Result<()> {
        let mut inventory = self.manager.latest_known_versions();
        if self.local_only() {
            let local = self.manager.local_models();
            inventory.retain(|model, _| local.contains(model));
        }

        info!(
            models = inventory.len(),
            "fresh install detected, recording inventory of latest model versions"
        );
        self.store
            .save(&inventory)
            .context("failed to persist model version inventory")
    }

    fn upgrade_if_needed(&self) -> Result<()> {
        let local_only = self.local_only();

        let mut current = self
            .store
            .load()
            .context("failed to load recorded model versions")?;
        if local_only {
            let local = self.manager.local_models();
            current.retain(|model, _| local.contains(model));
        }

        let plan = if local_only {
            self.manager.plan_local(&current)
        } else {
            self.manager.plan(&current)
        };
        if plan.is_empty() {
            debug!("all models are current, no upgrades to run");
            return Ok(());
        }
        info!(steps = plan.len(), "running pending model upgrades");

        let checkpoints = self.manager.prepare(&plan);

        // A begin failure propagates as-is; checkpoints that already began
        // are not rolled back.
        for checkpoint in &checkpoints {
            let at = current
                .get(checkpoint.model())
                .cloned()
                .unwrap_or_else(ModelVersion::zero);
            checkpoint.begin(&at).with_context(|| {
                format!("checkpoint for model '{}' failed to begin", checkpoint.model())
            })?;
        }

        if let Err(err) = apply_and_commit(&plan, &checkpoints) {
            rollback_all(&checkpoints);
            return Err(err);
        }

        for checkpoint in &checkpoints {
            checkpoint.end().with_context(|| {
                format!("checkpoint for model '{}' failed to end", checkpoint.model())
            })?;
        }

        let mut reached = current;
        reached.extend(plan.target_versions());
        self.store
            .save(&reached)
            .context("failed to persist upgraded model versions")?;
        info!(models = reached.len(), "model upgrades complete");
        Ok(())
    }
}

fn apply_and_commit(plan: &UpgradePlan<'_>, checkpoints: &[&dyn Checkpoint]) -> Result<()> {
    for step in plan.steps() {
        let info = step.info();
        debug!(model = %info.model, version = %info.to_version, "applying upgrade");
        step.apply().with_context(|| {
            format!(
                "upgrade of model '{}' to version '{}' failed",
                info.model, info.to_version
            )
        })?;
    }

    for checkpoint in checkpoints {
        checkpoint.commit().with_context(|| {
            format!(
                "checkpoint for model '{}' failed to commit",
                checkpoint.model()
            )
        })?;
    }

    Ok(())
}

/// Rolls back every begun checkpoint, in begin order. Best effort: one
/// checkpoint's rollback failure never stops the others, and never masks
/// the error that triggered the rollback.
fn rollback_all(checkpoints: &[&dyn Checkpoint]) {
    for checkpoint in checkpoints {
        if let Err(err) = checkpoint.rollback() {
            warn!(
                model = checkpoint.model(),
                error = %err,
                "checkpoint rollback failed, continuing with remaining checkpoints"
            );
        }
    }
}
