use anyhow::Result;

use crate::version::ModelVersion;

/// Whether a model is migrated independently on every cluster node or once
/// for the whole cluster. Fixed at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointClass {
    Local,
    Clustered,
}

/// The transactional boundary around all upgrades touching one model in a run.
///
/// Per run the service calls `begin` at most once, then either `commit`
/// followed by `end` (all of a run's checkpoints committed before any ends),
/// or `rollback` if any step of the run failed after the begin phase.
pub trait Checkpoint {
    fn model(&self) -> &str;

    fn class(&self) -> CheckpointClass;

    fn begin(&self, current: &ModelVersion) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    fn end(&self) -> Result<()>;
}
