mod checkpoint;
mod upgrade;
mod version;

pub use checkpoint::{Checkpoint, CheckpointClass};
pub use upgrade::{Upgrade, UpgradeInfo, UpgradeRef};
pub use version::{ModelVersion, ModelVersions};
