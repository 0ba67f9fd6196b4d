mod error;
mod graph;
mod manager;
mod plan;

pub use error::PlannerError;
pub use manager::UpgradeManager;
pub use plan::UpgradePlan;
