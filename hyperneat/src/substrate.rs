use crate::query::{check_cppn, query_cppn};
use crate::HyperNeatError;

use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
use neat_cppn::networks::{Network, NodeEval, RecurrentNetwork};
use serde::{Deserialize, Serialize};

/// A point of the substrate plane.
pub type Point = (f32, f32);

/// The geometric arrangement of a network's nodes.
///
/// In the phenotype, input `i` has index `i`, output `j`
/// has index `inputs.len() + j`, and hidden nodes follow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    pub inputs: Vec<Point>,
    /// Hidden layers, from the input side to the output side.
    /// ES-HyperNEAT ignores them.
    pub hidden: Vec<Vec<Point>>,
    pub outputs: Vec<Point>,
    /// Activation function of the substrate's hidden and output nodes.
    pub activation: ActivationFunction,
}

impl Substrate {
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Activations needed for a signal to cross the layered
    /// network: one per hidden layer, plus two.
    pub fn activations(&self) -> usize {
        self.hidden.len() + 2
    }

    /// Builds the HyperNEAT phenotype: every node of a layer
    /// is linked to every node of the previous layer (inputs,
    /// hidden layers, then outputs) with the weight given by
    /// `cppn`, zero weights being left out.
    ///
    /// # Errors
    /// Returns an error if `cppn` does not have 5 inputs
    /// and at least one output.
    pub fn layered_network<N: Network + ?Sized>(
        &self,
        cppn: &mut N,
        max_weight: f32,
    ) -> Result<RecurrentNetwork, HyperNeatError> {
        check_cppn(cppn)?;

        let input_nodes: Vec<usize> = (0..self.inputs.len()).collect();
        let output_nodes: Vec<usize> =
            (self.inputs.len()..self.inputs.len() + self.outputs.len()).collect();

        let mut layers: Vec<(Vec<usize>, &[Point])> = vec![(input_nodes.clone(), self.inputs.as_slice())];
        let mut next_index = self.inputs.len() + self.outputs.len();
        for layer in &self.hidden {
            let indices = (next_index..next_index + layer.len()).collect();
            next_index += layer.len();
            layers.push((indices, layer.as_slice()));
        }
        layers.push((output_nodes.clone(), self.outputs.as_slice()));

        let mut node_evals = vec![];
        for pair in layers.windows(2) {
            let (sources, source_points) = &pair[0];
            let (targets, target_points) = &pair[1];
            for (&node, &target) in targets.iter().zip(target_points.iter()) {
                let mut links = vec![];
                for (&source, &source_point) in sources.iter().zip(source_points.iter()) {
                    let weight = query_cppn(source_point, target, true, cppn, max_weight)?;
                    if weight != 0.0 {
                        links.push((source, weight));
                    }
                }
                node_evals.push(NodeEval {
                    node,
                    activation: self.activation,
                    aggregation: AggregationFunction::Sum,
                    bias: 0.0,
                    response: 1.0,
                    links,
                });
            }
        }

        Ok(RecurrentNetwork::new(input_nodes, output_nodes, node_evals))
    }
}
