/// Answers the two cluster questions the upgrade service cares about:
/// whether this node is part of a cluster at all, and whether it is the
/// oldest member and therefore responsible for clustered-model upgrades.
pub trait NodeAccess {
    fn is_clustered(&self) -> bool;

    fn is_oldest_node(&self) -> bool;
}

/// Node access for deployments without a cluster layer: never clustered,
/// always responsible for every model.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleNodeAccess;

impl NodeAccess for SingleNodeAccess {
    fn is_clustered(&self) -> bool {
        false
    }

    fn is_oldest_node(&self) -> bool {
        true
    }
}
