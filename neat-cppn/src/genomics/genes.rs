use super::{ActivationFunction, AggregationFunction, GenomeConfig};
use crate::{ConnectionKey, NodeKey};

use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Node genes hold the parameters of a non-input node.
/// Its network equivalent computes
/// `activation(bias + response · aggregation(inputs))`.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeGene {
    pub key: NodeKey,
    pub bias: f32,
    pub response: f32,
    pub activation: ActivationFunction,
    pub aggregation: AggregationFunction,
}

impl NodeGene {
    /// Returns a node with attributes sampled from `config`.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{ActivationFunction, GenomeConfig, NodeGene};
    ///
    /// let node = NodeGene::new(3, &GenomeConfig::zero(), &mut rand::thread_rng());
    /// assert_eq!(node.key, 3);
    /// assert_eq!(node.activation, ActivationFunction::Sigmoid);
    /// ```
    pub fn new<R: Rng + ?Sized>(key: NodeKey, config: &GenomeConfig, rng: &mut R) -> NodeGene {
        NodeGene {
            key,
            bias: config.bias.init_value(rng),
            response: config.response.init_value(rng),
            activation: config.activation.init_value(rng),
            aggregation: config.aggregation.init_value(rng),
        }
    }

    pub(super) fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.bias = config.bias.mutate_value(self.bias, rng);
        self.response = config.response.mutate_value(self.response, rng);
        self.activation = config.activation.mutate_value(self.activation, rng);
        self.aggregation = config.aggregation.mutate_value(self.aggregation, rng);
    }

    /// Attribute distance between two homologous nodes.
    pub(super) fn distance(&self, other: &NodeGene, config: &GenomeConfig) -> f32 {
        let mut d = (self.bias - other.bias).abs() + (self.response - other.response).abs();
        if self.activation != other.activation {
            d += 1.0;
        }
        if self.aggregation != other.aggregation {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }

    /// Inherits each attribute from either node with equal chance.
    pub(super) fn crossover<R: Rng + ?Sized>(&self, other: &NodeGene, rng: &mut R) -> NodeGene {
        NodeGene {
            key: self.key,
            bias: if rng.gen() { self.bias } else { other.bias },
            response: if rng.gen() { self.response } else { other.response },
            activation: if rng.gen() { self.activation } else { other.activation },
            aggregation: if rng.gen() { self.aggregation } else { other.aggregation },
        }
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[bias={:.3}, response={:.3}, {}, {}]",
            self.key, self.bias, self.response, self.activation, self.aggregation,
        )
    }
}

/// Connection genes become weighted links
/// in the genome's phenotype, unless disabled.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub key: ConnectionKey,
    pub weight: f32,
    pub enabled: bool,
}

/// Chance that a connection disabled in either
/// parent is also disabled in the child.
const INHERIT_DISABLED_CHANCE: f32 = 0.75;

impl ConnectionGene {
    /// Returns a connection with attributes sampled from `config`.
    pub fn new<R: Rng + ?Sized>(key: ConnectionKey, config: &GenomeConfig, rng: &mut R) -> ConnectionGene {
        ConnectionGene {
            key,
            weight: config.weight.init_value(rng),
            enabled: config.enabled.init_value(rng),
        }
    }

    /// Returns the connection's input node key.
    pub fn input(&self) -> NodeKey {
        self.key.0
    }

    /// Returns the connection's output node key.
    pub fn output(&self) -> NodeKey {
        self.key.1
    }

    pub(super) fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.weight = config.weight.mutate_value(self.weight, rng);
        self.enabled = config.enabled.mutate_value(self.enabled, rng);
    }

    pub(super) fn distance(&self, other: &ConnectionGene, config: &GenomeConfig) -> f32 {
        let mut d = (self.weight - other.weight).abs();
        if self.enabled != other.enabled {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }

    pub(super) fn crossover<R: Rng + ?Sized>(&self, other: &ConnectionGene, rng: &mut R) -> ConnectionGene {
        let weight = if rng.gen() { self.weight } else { other.weight };
        let enabled = if !self.enabled || !other.enabled {
            rng.gen::<f32>() >= INHERIT_DISABLED_CHANCE
        } else {
            true
        };
        ConnectionGene {
            key: self.key,
            weight,
            enabled,
        }
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{:?}->{:?}, {:.3}]{}",
            if self.enabled { "" } else { "(" },
            self.key.0,
            self.key.1,
            self.weight,
            if self.enabled { "" } else { ")" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::StdRng, SeedableRng};

    fn config() -> GenomeConfig {
        GenomeConfig {
            compatibility_weight_coefficient: 0.5,
            ..GenomeConfig::zero()
        }
    }

    #[test]
    fn node_distance_counts_function_changes() {
        let a = NodeGene {
            key: 0,
            bias: 1.0,
            response: 1.0,
            activation: ActivationFunction::Sigmoid,
            aggregation: AggregationFunction::Sum,
        };
        let b = NodeGene {
            bias: -1.0,
            activation: ActivationFunction::Tanh,
            ..a.clone()
        };
        assert_eq!(a.distance(&b, &config()), (2.0 + 1.0) * 0.5);
        assert_eq!(a.distance(&a, &config()), 0.0);
    }

    #[test]
    fn connection_distance_counts_enabling() {
        let a = ConnectionGene {
            key: (-1, 0),
            weight: 0.5,
            enabled: true,
        };
        let b = ConnectionGene {
            weight: 1.5,
            enabled: false,
            ..a.clone()
        };
        assert_eq!(a.distance(&b, &config()), (1.0 + 1.0) * 0.5);
    }

    #[test]
    fn crossover_mixes_parent_attributes() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = ConnectionGene {
            key: (-1, 0),
            weight: 1.0,
            enabled: true,
        };
        let b = ConnectionGene {
            weight: 2.0,
            ..a.clone()
        };
        let weights: Vec<f32> = (0..100).map(|_| a.crossover(&b, &mut rng).weight).collect();
        assert!(weights.contains(&1.0));
        assert!(weights.contains(&2.0));
        assert!((0..100).all(|_| a.crossover(&b, &mut rng).enabled));
    }

    #[test]
    fn disabled_connections_are_mostly_inherited_disabled() {
        let mut rng = StdRng::seed_from_u64(8);
        let a = ConnectionGene {
            key: (-1, 0),
            weight: 1.0,
            enabled: true,
        };
        let b = ConnectionGene {
            enabled: false,
            ..a.clone()
        };
        let enabled = (0..1000)
            .filter(|_| a.crossover(&b, &mut rng).enabled)
            .count();
        assert!((150..350).contains(&enabled));
    }
}
