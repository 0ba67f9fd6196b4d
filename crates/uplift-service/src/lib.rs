mod node;
mod service;
mod store;

pub use node::{NodeAccess, SingleNodeAccess};
pub use service::UpgradeService;
pub use store::{JsonFileStore, ModelVersionStore};
