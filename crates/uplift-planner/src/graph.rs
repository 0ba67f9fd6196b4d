use std::collections::BTreeSet;

use uplift_core::ModelVersion;

use crate::error::PlannerError;

/// Topologically sorts the upgrade dependency graph.
///
/// Nodes are registration indices; `dependencies[n]` holds the nodes that
/// must come before `n`. Ties between ready nodes are broken by lowest
/// target version first, then registration order, which keeps independent
/// upgrades in a stable, earliest-first sequence.
pub(crate) fn topo_order(
    versions: &[ModelVersion],
    dependencies: &[BTreeSet<usize>],
    label: impl Fn(usize) -> String,
) -> Result<Vec<usize>, PlannerError> {
    let node_count = versions.len();
    let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree: Vec<usize> = vec![0; node_count];

    for (node, deps) in dependencies.iter().enumerate() {
        in_degree[node] = deps.len();
        for &dep in deps {
            reverse[dep].push(node);
        }
    }

    let mut ready: BTreeSet<(ModelVersion, usize)> = in_degree
        .iter()
        .enumerate()
        .filter_map(|(node, degree)| (*degree == 0).then(|| (versions[node].clone(), node)))
        .collect();
    let mut ordered = Vec::with_capacity(node_count);

    while let Some((_, next)) = ready.pop_first() {
        ordered.push(next);
        for &child in &reverse[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert((versions[child].clone(), child));
            }
        }
    }

    if ordered.len() != node_count {
        let ordered_set: BTreeSet<usize> = ordered.iter().copied().collect();
        let nodes = (0..node_count)
            .filter(|node| !ordered_set.contains(node))
            .map(label)
            .collect();
        return Err(PlannerError::CyclicDependency { nodes });
    }

    Ok(ordered)
}
