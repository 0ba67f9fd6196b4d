use thiserror::Error;

/// Defects in the registered upgrade set itself. Raised while the manager is
/// being constructed, before any plan can be requested, and never retried.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("upgrade of model '{model}': version '{version}' is not after '{previous}'")]
    VersionNotAfter {
        model: String,
        version: String,
        previous: String,
    },

    #[error("checkpoint of model '{model}' registered more than once")]
    DuplicateCheckpoint { model: String },

    #[error("upgrades registered for model '{model}' but no checkpoint guards it")]
    MissingCheckpoint { model: String },

    #[error("upgrade of model '{model}' depends on '{dependency}@{version}', which no registered upgrade produces")]
    UnresolvedDependency {
        model: String,
        dependency: String,
        version: String,
    },

    #[error("upgrade dependency cycle detected involving: {}", nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },
}
