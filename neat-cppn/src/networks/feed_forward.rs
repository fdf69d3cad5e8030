use super::graphs::feed_forward_layers;
use super::{value_count, Network, NetworkError, NodeEval, NodeIndexer};
use crate::genomics::{CppnGenome, GenomeConfig};
use crate::{ConnectionKey, NodeKey};

use serde::{Deserialize, Serialize};

/// A neural network without cycles. Each activation
/// evaluates every node required for the outputs once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    input_nodes: Vec<usize>,
    output_nodes: Vec<usize>,
    node_evals: Vec<NodeEval>,
    values: Vec<f32>,
}

impl FeedForwardNetwork {
    /// Builds a network from explicit node evaluations,
    /// which must be ordered so that every link refers to an
    /// input or to a previously evaluated node.
    pub fn new(
        input_nodes: Vec<usize>,
        output_nodes: Vec<usize>,
        node_evals: Vec<NodeEval>,
    ) -> FeedForwardNetwork {
        let values = vec![0.0; value_count(&input_nodes, &output_nodes, &node_evals)];
        FeedForwardNetwork {
            input_nodes,
            output_nodes,
            node_evals,
            values,
        }
    }

    /// Generates the phenotype of `genome`. Only enabled
    /// connections and the nodes required for the outputs
    /// take part; outputs without a path from the inputs
    /// stay at 0.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{CppnGenome, GenomeConfig, NodeGene, ActivationFunction};
    /// use neat_cppn::networks::{FeedForwardNetwork, Network};
    ///
    /// let config = GenomeConfig::zero();
    /// let mut genome = CppnGenome::empty(0);
    /// genome.add_node(NodeGene {
    ///     activation: ActivationFunction::Identity,
    ///     response: 1.0,
    ///     ..NodeGene::new(0, &config, &mut rand::thread_rng())
    /// });
    /// genome.add_connection((-1, 0), 0.5, true, &config).unwrap();
    ///
    /// let mut network = FeedForwardNetwork::create(&genome, &config);
    /// assert_eq!(network.activate(&[3.0]).unwrap(), vec![1.5]);
    /// ```
    pub fn create(genome: &CppnGenome, config: &GenomeConfig) -> FeedForwardNetwork {
        let inputs: Vec<NodeKey> = config.input_keys().collect();
        let outputs: Vec<NodeKey> = config.output_keys().collect();
        let connections: Vec<ConnectionKey> = genome
            .connections()
            .filter(|c| c.enabled)
            .map(|c| c.key)
            .collect();

        let mut indexer = NodeIndexer::new(&inputs, &outputs);
        let mut node_evals = vec![];
        for layer in feed_forward_layers(&inputs, &outputs, &connections) {
            for key in layer {
                let node = match genome.node(key) {
                    Some(node) => node,
                    None => continue,
                };
                let links = genome
                    .connections()
                    .filter(|c| c.enabled && c.output() == key)
                    .map(|c| (indexer.index(c.input()), c.weight))
                    .collect();
                node_evals.push(NodeEval {
                    node: indexer.index(key),
                    activation: node.activation,
                    aggregation: node.aggregation,
                    bias: node.bias,
                    response: node.response,
                    links,
                });
            }
        }

        let input_nodes = inputs.iter().map(|&k| indexer.index(k)).collect();
        let output_nodes = outputs.iter().map(|&k| indexer.index(k)).collect();
        FeedForwardNetwork::new(input_nodes, output_nodes, node_evals)
    }

    /// Returns the node evaluations, in evaluation order.
    pub fn node_evals(&self) -> &[NodeEval] {
        &self.node_evals
    }
}

impl Network for FeedForwardNetwork {
    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        if inputs.len() != self.input_nodes.len() {
            return Err(NetworkError::InputCount {
                expected: self.input_nodes.len(),
                found: inputs.len(),
            });
        }
        for (&node, &value) in self.input_nodes.iter().zip(inputs) {
            self.values[node] = value;
        }
        for eval in &self.node_evals {
            let value = eval.evaluate(&self.values);
            self.values[eval.node] = value;
        }
        Ok(self.output_nodes.iter().map(|&o| self.values[o]).collect())
    }

    fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
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

    use std::num::NonZeroUsize;

    fn node(key: NodeKey, activation: ActivationFunction) -> NodeGene {
        NodeGene {
            key,
            bias: 0.0,
            response: 1.0,
            activation,
            aggregation: AggregationFunction::Sum,
        }
    }

    fn two_input_config() -> GenomeConfig {
        GenomeConfig {
            num_inputs: NonZeroUsize::new(2).unwrap(),
            ..GenomeConfig::zero()
        }
    }

    #[test]
    fn hidden_layer_is_evaluated_first() {
        let config = two_input_config();
        let mut genome = CppnGenome::empty(0);
        genome.add_node(node(0, ActivationFunction::Identity));
        genome.add_node(node(1, ActivationFunction::Relu));
        genome.add_connection((-1, 1), 1.0, true, &config).unwrap();
        genome.add_connection((-2, 1), -1.0, true, &config).unwrap();
        genome.add_connection((1, 0), 2.0, true, &config).unwrap();
        genome.add_connection((-1, 0), 1.0, true, &config).unwrap();

        let mut network = FeedForwardNetwork::create(&genome, &config);
        assert_eq!(network.activate(&[3.0, 1.0]).unwrap(), vec![3.0 + 2.0 * 2.0]);
        assert_eq!(network.activate(&[1.0, 3.0]).unwrap(), vec![1.0]);
    }

    #[test]
    fn disabled_connections_are_ignored() {
        let config = two_input_config();
        let mut genome = CppnGenome::empty(0);
        genome.add_node(node(0, ActivationFunction::Identity));
        genome.add_connection((-1, 0), 1.0, false, &config).unwrap();
        genome.add_connection((-2, 0), 1.0, true, &config).unwrap();

        let mut network = FeedForwardNetwork::create(&genome, &config);
        assert_eq!(network.activate(&[5.0, 2.0]).unwrap(), vec![2.0]);
        assert_eq!(network.node_evals().len(), 1);
    }

    #[test]
    fn wrong_input_count_is_rejected() {
        let mut network = FeedForwardNetwork::create(&CppnGenome::empty(0), &two_input_config());
        assert_eq!(
            network.activate(&[1.0]),
            Err(NetworkError::InputCount {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(network.activate(&[1.0, 1.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn serializes_to_json() {
        let config = two_input_config();
        let mut genome = CppnGenome::empty(0);
        genome.add_node(node(0, ActivationFunction::Tanh));
        genome.add_connection((-1, 0), 0.3, true, &config).unwrap();
        let network = FeedForwardNetwork::create(&genome, &config);

        let json = serde_json::to_string(&network).unwrap();
        let restored: FeedForwardNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, network);
    }
}
