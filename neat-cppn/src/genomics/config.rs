use super::errors::GenomeError;
use super::{
    ActivationFunction, AggregationFunction, BoolAttributeConfig, ChoiceAttributeConfig,
    FloatAttributeConfig,
};
use crate::NodeKey;

use serde::{Deserialize, Serialize};

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Initial connectivity of newly created genomes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InitialConnection {
    /// No connections at all.
    Unconnected,
    /// One randomly chosen input connected to every output.
    FsNeatNoHidden,
    /// One randomly chosen input connected to every hidden and output node.
    FsNeatHidden,
    /// Inputs to hidden nodes to outputs, or inputs
    /// to outputs when there are no hidden nodes.
    FullNoDirect,
    /// As [`FullNoDirect`](Self::FullNoDirect), plus
    /// direct input-output connections.
    FullDirect,
    /// A random fraction of the `FullNoDirect` connections.
    PartialNoDirect(f32),
    /// A random fraction of the `FullDirect` connections.
    PartialDirect(f32),
}

impl FromStr for InitialConnection {
    type Err = GenomeError;

    /// Parses the names used in configuration files, e.g.
    /// `full_direct` or `partial_nodirect 0.5`. The legacy
    /// names `fs_neat`, `full` and `partial` stand for their
    /// `nodirect`/`nohidden` variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GenomeError::InvalidInitialConnection(s.to_string());
        let mut words = s.split_whitespace();
        let name = words.next().ok_or_else(invalid)?;
        let probability = words.next();
        if words.next().is_some() {
            return Err(invalid());
        }
        let parse_probability = || -> Result<f32, GenomeError> {
            probability
                .and_then(|p| p.parse::<f32>().ok())
                .filter(|p| (0.0..=1.0).contains(p))
                .ok_or_else(invalid)
        };
        let connection = match name {
            "unconnected" => Self::Unconnected,
            "fs_neat" | "fs_neat_nohidden" => Self::FsNeatNoHidden,
            "fs_neat_hidden" => Self::FsNeatHidden,
            "full" | "full_nodirect" => Self::FullNoDirect,
            "full_direct" => Self::FullDirect,
            "partial" | "partial_nodirect" => return Ok(Self::PartialNoDirect(parse_probability()?)),
            "partial_direct" => return Ok(Self::PartialDirect(parse_probability()?)),
            _ => return Err(invalid()),
        };
        match probability {
            Some(_) => Err(invalid()),
            None => Ok(connection),
        }
    }
}

impl fmt::Display for InitialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::FsNeatNoHidden => write!(f, "fs_neat_nohidden"),
            Self::FsNeatHidden => write!(f, "fs_neat_hidden"),
            Self::FullNoDirect => write!(f, "full_nodirect"),
            Self::FullDirect => write!(f, "full_direct"),
            Self::PartialNoDirect(p) => write!(f, "partial_nodirect {}", p),
            Self::PartialDirect(p) => write!(f, "partial_direct {}", p),
        }
    }
}

/// Whether failed structural mutations fall back to a
/// related change (enabling an existing connection,
/// adding a connection instead of splitting one).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralMutationSurer {
    /// Follows [`single_structural_mutation`](GenomeConfig::single_structural_mutation).
    Default,
    True,
    False,
}

impl StructuralMutationSurer {
    /// Resolves the setting against `single_structural_mutation`.
    pub fn resolve(self, single_structural_mutation: bool) -> bool {
        match self {
            Self::Default => single_structural_mutation,
            Self::True => true,
            Self::False => false,
        }
    }
}

impl FromStr for StructuralMutationSurer {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "true" | "yes" | "on" | "1" => Ok(Self::True),
            "false" | "no" | "off" | "0" => Ok(Self::False),
            _ => Err(GenomeError::InvalidStructuralMutationSurer(s.to_string())),
        }
    }
}

impl fmt::Display for StructuralMutationSurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
        }
    }
}

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenomeConfig {
    /// Number of network inputs.
    pub num_inputs: NonZeroUsize,
    /// Number of network outputs.
    pub num_outputs: NonZeroUsize,
    /// Number of hidden nodes in newly created genomes.
    pub num_hidden: usize,
    /// Forbids recurrent connections when set.
    pub feed_forward: bool,
    pub initial_connection: InitialConnection,
    pub compatibility_disjoint_coefficient: f32,
    pub compatibility_weight_coefficient: f32,
    pub conn_add_prob: f32,
    pub conn_delete_prob: f32,
    pub node_add_prob: f32,
    pub node_delete_prob: f32,
    /// Allows at most one structural mutation per reproduction.
    pub single_structural_mutation: bool,
    pub structural_mutation_surer: StructuralMutationSurer,
    pub activation: ChoiceAttributeConfig<ActivationFunction>,
    pub aggregation: ChoiceAttributeConfig<AggregationFunction>,
    pub bias: FloatAttributeConfig,
    pub response: FloatAttributeConfig,
    pub weight: FloatAttributeConfig,
    pub enabled: BoolAttributeConfig,
}

impl GenomeConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1. Nodes use sigmoid activation
    /// with sum aggregation, and connections start enabled.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::GenomeConfig;
    ///
    /// let cfg = GenomeConfig {
    ///     node_add_prob: 0.2,
    ///     feed_forward: true,
    ///     ..GenomeConfig::zero()
    /// };
    /// assert_eq!(cfg.input_keys().collect::<Vec<_>>(), vec![-1]);
    /// ```
    pub const fn zero() -> GenomeConfig {
        GenomeConfig {
            num_inputs: NonZeroUsize::MIN,
            num_outputs: NonZeroUsize::MIN,
            num_hidden: 0,
            feed_forward: false,
            initial_connection: InitialConnection::Unconnected,
            compatibility_disjoint_coefficient: 0.0,
            compatibility_weight_coefficient: 0.0,
            conn_add_prob: 0.0,
            conn_delete_prob: 0.0,
            node_add_prob: 0.0,
            node_delete_prob: 0.0,
            single_structural_mutation: false,
            structural_mutation_surer: StructuralMutationSurer::Default,
            activation: ChoiceAttributeConfig::fixed(ActivationFunction::Sigmoid),
            aggregation: ChoiceAttributeConfig::fixed(AggregationFunction::Sum),
            bias: FloatAttributeConfig::zero(),
            response: FloatAttributeConfig::zero(),
            weight: FloatAttributeConfig::zero(),
            enabled: BoolAttributeConfig::zero(),
        }
    }

    /// Keys of the input nodes: `-1, -2, …, -num_inputs`.
    pub fn input_keys(&self) -> impl Iterator<Item = NodeKey> {
        (1..=self.num_inputs.get() as NodeKey).map(|k| -k)
    }

    /// Keys of the output nodes: `0, 1, …, num_outputs - 1`.
    pub fn output_keys(&self) -> impl Iterator<Item = NodeKey> {
        0..self.num_outputs.get() as NodeKey
    }

    /// Whether `key` designates an output node.
    pub fn is_output(&self, key: NodeKey) -> bool {
        (0..self.num_outputs.get() as NodeKey).contains(&key)
    }

    /// Whether failed structural mutations should fall back.
    pub fn structural_mutation_surer(&self) -> bool {
        self.structural_mutation_surer
            .resolve(self.single_structural_mutation)
    }
}
