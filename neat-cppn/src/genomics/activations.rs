use super::errors::GenomeError;

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// The activation function applied by a node to
/// its biased, scaled aggregated input.
///
/// Steep functions are pre-scaled and clamped so that
/// they saturate away from overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFunction {
    /// 1 / (1 + exp(-5z))
    Sigmoid,
    /// tanh(2.5z)
    Tanh,
    /// sin(5z)
    Sin,
    /// exp(-5z²)
    Gauss,
    Relu,
    Elu,
    /// Leaky ReLU with slope 0.005 for negative inputs.
    Lelu,
    Selu,
    /// 0.2 · ln(1 + exp(5z))
    Softplus,
    Identity,
    /// z clamped to [-1, 1]
    Clamped,
    /// 1 / z, or 0 at z = 0
    Inv,
    Log,
    Exp,
    Abs,
    /// max(0, 1 - |z|)
    Hat,
    Square,
    Cube,
}

impl ActivationFunction {
    /// All activation functions, in declaration order.
    pub const ALL: [ActivationFunction; 18] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Sin,
        Self::Gauss,
        Self::Relu,
        Self::Elu,
        Self::Lelu,
        Self::Selu,
        Self::Softplus,
        Self::Identity,
        Self::Clamped,
        Self::Inv,
        Self::Log,
        Self::Exp,
        Self::Abs,
        Self::Hat,
        Self::Square,
        Self::Cube,
    ];

    /// Applies the function to `z`.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::ActivationFunction;
    ///
    /// assert_eq!(ActivationFunction::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationFunction::Inv.apply(0.0), 0.0);
    /// assert_eq!(ActivationFunction::Hat.apply(0.25), 0.75);
    /// ```
    pub fn apply(self, z: f32) -> f32 {
        match self {
            Self::Sigmoid => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                1.0 / (1.0 + (-z).exp())
            }
            Self::Tanh => (2.5 * z).clamp(-60.0, 60.0).tanh(),
            Self::Sin => (5.0 * z).clamp(-60.0, 60.0).sin(),
            Self::Gauss => {
                let z = z.clamp(-3.4, 3.4);
                (-5.0 * z * z).exp()
            }
            Self::Relu => z.max(0.0),
            Self::Elu => {
                if z > 0.0 {
                    z
                } else {
                    z.exp() - 1.0
                }
            }
            Self::Lelu => {
                if z > 0.0 {
                    z
                } else {
                    0.005 * z
                }
            }
            Self::Selu => {
                const LAMBDA: f32 = 1.050_701;
                const ALPHA: f32 = 1.673_263_2;
                if z > 0.0 {
                    LAMBDA * z
                } else {
                    LAMBDA * ALPHA * (z.exp() - 1.0)
                }
            }
            Self::Softplus => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                0.2 * (1.0 + z.exp()).ln()
            }
            Self::Identity => z,
            Self::Clamped => z.clamp(-1.0, 1.0),
            Self::Inv => {
                if z == 0.0 {
                    0.0
                } else {
                    1.0 / z
                }
            }
            Self::Log => z.max(1e-7).ln(),
            Self::Exp => z.clamp(-60.0, 60.0).exp(),
            Self::Abs => z.abs(),
            Self::Hat => (1.0 - z.abs()).max(0.0),
            Self::Square => z * z,
            Self::Cube => z * z * z,
        }
    }

    /// Returns the function's configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Sin => "sin",
            Self::Gauss => "gauss",
            Self::Relu => "relu",
            Self::Elu => "elu",
            Self::Lelu => "lelu",
            Self::Selu => "selu",
            Self::Softplus => "softplus",
            Self::Identity => "identity",
            Self::Clamped => "clamped",
            Self::Inv => "inv",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Abs => "abs",
            Self::Hat => "hat",
            Self::Square => "square",
            Self::Cube => "cube",
        }
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        Self::Sigmoid
    }
}

impl FromStr for ActivationFunction {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| GenomeError::UnknownActivation(s.to_string()))
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The function combining a node's weighted inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFunction {
    Sum,
    Product,
    Max,
    Min,
    /// The input of greatest magnitude, sign included.
    MaxAbs,
    Median,
    Mean,
}

impl AggregationFunction {
    /// All aggregation functions, in declaration order.
    pub const ALL: [AggregationFunction; 7] = [
        Self::Sum,
        Self::Product,
        Self::Max,
        Self::Min,
        Self::MaxAbs,
        Self::Median,
        Self::Mean,
    ];

    /// Aggregates `inputs`. An empty input yields the
    /// function's neutral value (1 for products, 0 otherwise).
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::AggregationFunction;
    ///
    /// assert_eq!(AggregationFunction::MaxAbs.apply(&[1.0, -3.0, 2.0]), -3.0);
    /// assert_eq!(AggregationFunction::Median.apply(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    /// assert_eq!(AggregationFunction::Product.apply(&[]), 1.0);
    /// ```
    pub fn apply(self, inputs: &[f32]) -> f32 {
        match self {
            Self::Sum => inputs.iter().sum(),
            Self::Product => inputs.iter().product(),
            Self::Max => inputs.iter().copied().reduce(f32::max).unwrap_or(0.0),
            Self::Min => inputs.iter().copied().reduce(f32::min).unwrap_or(0.0),
            Self::MaxAbs => inputs
                .iter()
                .copied()
                .reduce(|a, b| if b.abs() > a.abs() { b } else { a })
                .unwrap_or(0.0),
            Self::Median => {
                if inputs.is_empty() {
                    return 0.0;
                }
                let mut sorted = inputs.to_vec();
                sorted.sort_by(f32::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 1 {
                    sorted[mid]
                } else {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                }
            }
            Self::Mean => {
                if inputs.is_empty() {
                    0.0
                } else {
                    inputs.iter().sum::<f32>() / inputs.len() as f32
                }
            }
        }
    }

    /// Returns the function's configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Max => "max",
            Self::Min => "min",
            Self::MaxAbs => "maxabs",
            Self::Median => "median",
            Self::Mean => "mean",
        }
    }
}

impl Default for AggregationFunction {
    fn default() -> Self {
        Self::Sum
    }
}

impl FromStr for AggregationFunction {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| GenomeError::UnknownAggregation(s.to_string()))
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
