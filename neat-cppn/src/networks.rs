//! Networks are the phenotypes of genomes: node genes
//! become evaluation steps, enabled connection genes
//! weighted links, and disabled genes are ignored.
//!
//! The [`FeedForwardNetwork`] evaluates each node required
//! for the outputs once per activation, in dependency order.
//! The [`RecurrentNetwork`] advances every node by one time
//! step per activation, and so supports cycles.
mod feed_forward;
pub mod graphs;
mod recurrent;

pub use feed_forward::FeedForwardNetwork;
pub use recurrent::RecurrentNetwork;

use crate::genomics::{ActivationFunction, AggregationFunction};
use crate::NodeKey;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::BTreeMap;

/// An error type indicating a failed network activation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("expected {expected} inputs, got {found}")]
    InputCount { expected: usize, found: usize },
}

/// A neural network driven by successive activations.
pub trait Network {
    /// Sets the inputs, advances the network and
    /// returns the output values.
    ///
    /// # Errors
    /// Returns an error if `inputs` does not hold
    /// exactly [`input_count`](Network::input_count) values.
    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError>;

    /// Clears all node values.
    fn reset(&mut self);

    fn input_count(&self) -> usize;

    fn output_count(&self) -> usize;
}

/// The evaluation of a single node:
/// `activation(bias + response · aggregation(value_i · weight_i))`
/// over its incoming `links`. Nodes are addressed by index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeEval {
    pub node: usize,
    pub activation: ActivationFunction,
    pub aggregation: AggregationFunction,
    pub bias: f32,
    pub response: f32,
    pub links: Vec<(usize, f32)>,
}

impl NodeEval {
    fn evaluate(&self, values: &[f32]) -> f32 {
        let inputs: Vec<f32> = self
            .links
            .iter()
            .map(|&(i, w)| values[i] * w)
            .collect();
        self.activation
            .apply(self.bias + self.response * self.aggregation.apply(&inputs))
    }
}

/// Number of value slots needed to address every
/// node referenced by a network's nodes and evaluations.
fn value_count(input_nodes: &[usize], output_nodes: &[usize], node_evals: &[NodeEval]) -> usize {
    input_nodes
        .iter()
        .chain(output_nodes)
        .copied()
        .chain(
            node_evals
                .iter()
                .flat_map(|e| std::iter::once(e.node).chain(e.links.iter().map(|&(i, _)| i))),
        )
        .max()
        .map_or(0, |m| m + 1)
}

/// Assigns dense indices to node keys: inputs first,
/// then outputs, then any other node on first use.
struct NodeIndexer {
    indices: BTreeMap<NodeKey, usize>,
}

impl NodeIndexer {
    fn new(inputs: &[NodeKey], outputs: &[NodeKey]) -> NodeIndexer {
        let mut indexer = NodeIndexer {
            indices: BTreeMap::new(),
        };
        for &key in inputs.iter().chain(outputs) {
            indexer.index(key);
        }
        indexer
    }

    fn index(&mut self, key: NodeKey) -> usize {
        let next = self.indices.len();
        *self.indices.entry(key).or_insert(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_eval_applies_bias_and_response() {
        let eval = NodeEval {
            node: 2,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias: 0.5,
            response: 2.0,
            links: vec![(0, 1.0), (1, -0.5)],
        };
        assert_eq!(eval.evaluate(&[1.0, 2.0, 0.0]), 0.5 + 2.0 * (1.0 - 1.0));
    }

    #[test]
    fn indexer_orders_inputs_then_outputs() {
        let mut indexer = NodeIndexer::new(&[-1, -2], &[0, 1]);
        assert_eq!(indexer.index(-2), 1);
        assert_eq!(indexer.index(1), 3);
        assert_eq!(indexer.index(7), 4);
        assert_eq!(indexer.index(7), 4);
    }

    #[test]
    fn value_count_covers_links() {
        let eval = NodeEval {
            node: 3,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias: 0.0,
            response: 1.0,
            links: vec![(5, 1.0)],
        };
        assert_eq!(value_count(&[0], &[1], &[eval]), 6);
    }
}
