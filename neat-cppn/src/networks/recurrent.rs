use super::graphs::required_for_output;
use super::{value_count, Network, NetworkError, NodeEval, NodeIndexer};
use crate::genomics::{CppnGenome, GenomeConfig};
use crate::{ConnectionKey, NodeKey};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// A neural network allowing arbitrary cycles.
///
/// Node values are double-buffered: each activation
/// computes every node from the previous step's values,
/// so a signal advances by one connection per activation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentNetwork {
    input_nodes: Vec<usize>,
    output_nodes: Vec<usize>,
    node_evals: Vec<NodeEval>,
    values: [Vec<f32>; 2],
    active: usize,
}

impl RecurrentNetwork {
    /// Builds a network from explicit node evaluations.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
    /// use neat_cppn::networks::{Network, NodeEval, RecurrentNetwork};
    ///
    /// // in(0) -> hidden(2) -> out(1)
    /// let eval = |node, links| NodeEval {
    ///     node,
    ///     activation: ActivationFunction::Identity,
    ///     aggregation: AggregationFunction::Sum,
    ///     bias: 0.0,
    ///     response: 1.0,
    ///     links,
    /// };
    /// let mut network = RecurrentNetwork::new(
    ///     vec![0],
    ///     vec![1],
    ///     vec![eval(2, vec![(0, 2.0)]), eval(1, vec![(2, 1.0)])],
    /// );
    ///
    /// // The signal needs two steps to reach the output.
    /// assert_eq!(network.activate(&[1.0]).unwrap(), vec![0.0]);
    /// assert_eq!(network.activate(&[1.0]).unwrap(), vec![2.0]);
    /// ```
    pub fn new(
        input_nodes: Vec<usize>,
        output_nodes: Vec<usize>,
        node_evals: Vec<NodeEval>,
    ) -> RecurrentNetwork {
        let count = value_count(&input_nodes, &output_nodes, &node_evals);
        RecurrentNetwork {
            input_nodes,
            output_nodes,
            node_evals,
            values: [vec![0.0; count], vec![0.0; count]],
            active: 0,
        }
    }

    /// Generates the phenotype of `genome`, keeping the
    /// enabled connections that touch a node required
    /// for the outputs.
    pub fn create(genome: &CppnGenome, config: &GenomeConfig) -> RecurrentNetwork {
        let inputs: Vec<NodeKey> = config.input_keys().collect();
        let outputs: Vec<NodeKey> = config.output_keys().collect();
        let connections: Vec<ConnectionKey> = genome
            .connections()
            .filter(|c| c.enabled)
            .map(|c| c.key)
            .collect();
        let required = required_for_output(&inputs, &outputs, &connections);

        let mut node_inputs: BTreeMap<NodeKey, Vec<(NodeKey, f32)>> = BTreeMap::new();
        for connection in genome.connections().filter(|c| c.enabled) {
            let (i, o) = connection.key;
            if !required.contains(&i) && !required.contains(&o) {
                continue;
            }
            node_inputs.entry(o).or_default().push((i, connection.weight));
        }

        let mut indexer = NodeIndexer::new(&inputs, &outputs);
        let node_evals = node_inputs
            .into_iter()
            .filter_map(|(key, links)| {
                let node = genome.node(key)?;
                Some(NodeEval {
                    node: indexer.index(key),
                    activation: node.activation,
                    aggregation: node.aggregation,
                    bias: node.bias,
                    response: node.response,
                    links: links
                        .into_iter()
                        .map(|(i, w)| (indexer.index(i), w))
                        .collect(),
                })
            })
            .collect();

        let input_nodes = inputs.iter().map(|&k| indexer.index(k)).collect();
        let output_nodes = outputs.iter().map(|&k| indexer.index(k)).collect();
        RecurrentNetwork::new(input_nodes, output_nodes, node_evals)
    }

    /// Returns the node evaluations.
    pub fn node_evals(&self) -> &[NodeEval] {
        &self.node_evals
    }
}

impl Network for RecurrentNetwork {
    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        if inputs.len() != self.input_nodes.len() {
            return Err(NetworkError::InputCount {
                expected: self.input_nodes.len(),
                found: inputs.len(),
            });
        }

        let [first, second] = &mut self.values;
        let (previous, current) = if self.active == 0 {
            (first, second)
        } else {
            (second, first)
        };
        self.active = 1 - self.active;

        for (&node, &value) in self.input_nodes.iter().zip(inputs) {
            previous[node] = value;
            current[node] = value;
        }
        for eval in &self.node_evals {
            current[eval.node] = eval.evaluate(previous);
        }
        Ok(self.output_nodes.iter().map(|&o| current[o]).collect())
    }

    fn reset(&mut self) {
        for values in &mut self.values {
            values.iter_mut().for_each(|v| *v = 0.0);
        }
        self.active = 0;
    }

    fn input_count(&self) -> usize {
        self.input_nodes.len()
    }

    fn output_count(&self) -> usize {
        self.output_nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ActivationFunction, AggregationFunction, NodeGene};

    fn identity(key: NodeKey) -> NodeGene {
        NodeGene {
            key,
            bias: 0.0,
            response: 1.0,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
        }
    }

    #[test]
    fn self_loop_accumulates() {
        let config = GenomeConfig::zero();
        let mut genome = CppnGenome::empty(0);
        genome.add_node(identity(0));
        genome.add_connection((-1, 0), 1.0, true, &config).unwrap();
        genome.add_connection((0, 0), 1.0, true, &config).unwrap();

        let mut network = RecurrentNetwork::create(&genome, &config);
        assert_eq!(network.activate(&[1.0]).unwrap(), vec![1.0]);
        assert_eq!(network.activate(&[1.0]).unwrap(), vec![2.0]);
        assert_eq!(network.activate(&[1.0]).unwrap(), vec![3.0]);

        network.reset();
        assert_eq!(network.activate(&[1.0]).unwrap(), vec![1.0]);
    }

    #[test]
    fn unrequired_nodes_are_dropped() {
        let config = GenomeConfig::zero();
        let mut genome = CppnGenome::empty(0);
        genome.add_node(identity(0));
        genome.add_node(identity(1));
        genome.add_node(identity(2));
        genome.add_connection((-1, 0), 1.0, true, &config).unwrap();
        // Node 2 is fed but feeds nothing; 1 is only
        // fed by 2.
        genome.add_connection((-1, 2), 1.0, true, &config).unwrap();
        genome.add_connection((2, 1), 1.0, true, &config).unwrap();

        let network = RecurrentNetwork::create(&genome, &config);
        assert_eq!(network.node_evals().len(), 1);
    }

    #[test]
    fn serializes_to_json() {
        let config = GenomeConfig::zero();
        let mut genome = CppnGenome::empty(0);
        genome.add_node(identity(0));
        genome.add_connection((0, 0), -0.5, true, &config).unwrap();
        let mut network = RecurrentNetwork::create(&genome, &config);
        network.activate(&[1.0]).unwrap();

        let json = serde_json::to_string(&network).unwrap();
        let restored: RecurrentNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, network);
    }
}
