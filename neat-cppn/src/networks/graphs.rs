//! Graph queries over connection lists, shared by
//! genome mutation and network construction.
use std::collections::BTreeSet;

/// Returns whether adding the connection `test` to the
/// graph described by `connections` would create a cycle.
/// Self-loops count as cycles.
///
/// # Examples
/// ```
/// use neat_cppn::networks::graphs::creates_cycle;
///
/// let connections = [(-1, 1), (1, 0)];
/// assert!(creates_cycle(&connections, (0, 1)));
/// assert!(creates_cycle(&connections, (1, 1)));
/// assert!(!creates_cycle(&connections, (-1, 0)));
/// ```
pub fn creates_cycle<K: Copy + Ord>(connections: &[(K, K)], test: (K, K)) -> bool {
    let (input, output) = test;
    if input == output {
        return true;
    }

    let mut visited = BTreeSet::from([output]);
    loop {
        let mut added = 0;
        for &(a, b) in connections {
            if visited.contains(&a) && !visited.contains(&b) {
                if b == input {
                    return true;
                }
                visited.insert(b);
                added += 1;
            }
        }
        if added == 0 {
            return false;
        }
    }
}

/// Returns the non-input nodes whose values can
/// influence the outputs, outputs included.
pub fn required_for_output<K: Copy + Ord>(
    inputs: &[K],
    outputs: &[K],
    connections: &[(K, K)],
) -> BTreeSet<K> {
    let mut required: BTreeSet<K> = outputs.iter().copied().collect();
    let mut frontier = required.clone();
    loop {
        let layer: BTreeSet<K> = connections
            .iter()
            .filter(|(a, b)| frontier.contains(b) && !frontier.contains(a))
            .map(|&(a, _)| a)
            .collect();
        if layer.is_empty() {
            break;
        }
        let layer_nodes: Vec<K> = layer
            .iter()
            .copied()
            .filter(|n| !inputs.contains(n))
            .collect();
        if layer_nodes.is_empty() {
            break;
        }
        required.extend(layer_nodes);
        frontier.extend(layer);
    }
    required
}

/// Groups the nodes required for the outputs into layers
/// that can be evaluated in order: every node's inputs are
/// network inputs or nodes of earlier layers. Nodes within
/// a layer are sorted.
///
/// # Examples
/// ```
/// use neat_cppn::networks::graphs::feed_forward_layers;
///
/// let connections = [(-1, 2), (-2, 2), (2, 0), (-1, 0), (3, 0)];
/// let layers = feed_forward_layers(&[-1, -2], &[0], &connections);
///
/// // Node 3 has no inputs, so node 0 can never be evaluated.
/// assert_eq!(layers, vec![vec![2]]);
/// ```
pub fn feed_forward_layers<K: Copy + Ord>(
    inputs: &[K],
    outputs: &[K],
    connections: &[(K, K)],
) -> Vec<Vec<K>> {
    let required = required_for_output(inputs, outputs, connections);

    let mut layers = vec![];
    let mut evaluated: BTreeSet<K> = inputs.iter().copied().collect();
    loop {
        let candidates: BTreeSet<K> = connections
            .iter()
            .filter(|(a, b)| evaluated.contains(a) && !evaluated.contains(b))
            .map(|&(_, b)| b)
            .collect();
        let layer: Vec<K> = candidates
            .into_iter()
            .filter(|n| required.contains(n))
            .filter(|n| {
                connections
                    .iter()
                    .filter(|(_, b)| b == n)
                    .all(|(a, _)| evaluated.contains(a))
            })
            .collect();
        if layer.is_empty() {
            break;
        }
        evaluated.extend(layer.iter().copied());
        layers.push(layer);
    }
    layers
}
