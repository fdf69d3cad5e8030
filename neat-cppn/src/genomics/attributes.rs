use super::errors::GenomeError;

use rand::prelude::{Rng, SliceRandom};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Distribution used to initialise a float attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitType {
    /// Normal distribution, clamped into the attribute's bounds.
    Gaussian,
    /// Uniform distribution over `mean ± 2·stdev`,
    /// intersected with the attribute's bounds.
    Uniform,
}

impl FromStr for InitType {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gaussian" | "normal" => Ok(Self::Gaussian),
            "uniform" => Ok(Self::Uniform),
            _ => Err(GenomeError::InvalidInitType(s.to_string())),
        }
    }
}

impl fmt::Display for InitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

/// Samples N(mean, stdev). A non-positive or
/// non-finite `stdev` yields `mean`.
pub(crate) fn gauss<R: Rng + ?Sized>(rng: &mut R, mean: f32, stdev: f32) -> f32 {
    match Normal::new(mean, stdev) {
        Ok(normal) if stdev > 0.0 => normal.sample(rng),
        _ => mean,
    }
}

/// Initialisation and mutation parameters of a
/// real-valued gene attribute (bias, response, weight).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatAttributeConfig {
    pub init_mean: f32,
    pub init_stdev: f32,
    pub init_type: InitType,
    pub max_value: f32,
    pub min_value: f32,
    /// Standard deviation of the gaussian perturbation.
    pub mutate_power: f32,
    /// Chance of perturbing the value.
    pub mutate_rate: f32,
    /// Chance of replacing the value with a fresh sample.
    pub replace_rate: f32,
}

impl FloatAttributeConfig {
    /// Returns a "zero-valued" configuration:
    /// every sample and mutation yields 0.
    pub const fn zero() -> FloatAttributeConfig {
        FloatAttributeConfig {
            init_mean: 0.0,
            init_stdev: 0.0,
            init_type: InitType::Gaussian,
            max_value: 0.0,
            min_value: 0.0,
            mutate_power: 0.0,
            mutate_rate: 0.0,
            replace_rate: 0.0,
        }
    }

    fn clamp(&self, value: f32) -> f32 {
        value.max(self.min_value).min(self.max_value)
    }

    /// Samples an initial value.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{FloatAttributeConfig, InitType};
    /// use rand::thread_rng;
    ///
    /// let config = FloatAttributeConfig {
    ///     init_mean: 0.0,
    ///     init_stdev: 1.0,
    ///     init_type: InitType::Uniform,
    ///     max_value: 30.0,
    ///     min_value: -30.0,
    ///     ..FloatAttributeConfig::zero()
    /// };
    /// let value = config.init_value(&mut thread_rng());
    /// assert!((-2.0..=2.0).contains(&value));
    /// ```
    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.init_type {
            InitType::Gaussian => self.clamp(gauss(rng, self.init_mean, self.init_stdev)),
            InitType::Uniform => {
                let low = self.min_value.max(self.init_mean - 2.0 * self.init_stdev);
                let high = self.max_value.min(self.init_mean + 2.0 * self.init_stdev);
                if low < high {
                    rng.gen_range(low..=high)
                } else {
                    self.clamp(self.init_mean)
                }
            }
        }
    }

    /// Returns a possibly mutated copy of `value`: perturbed
    /// with chance `mutate_rate`, otherwise replaced with
    /// chance `replace_rate`.
    pub fn mutate_value<R: Rng + ?Sized>(&self, value: f32, rng: &mut R) -> f32 {
        let r: f32 = rng.gen();
        if r < self.mutate_rate {
            self.clamp(value + gauss(rng, 0.0, self.mutate_power))
        } else if r < self.mutate_rate + self.replace_rate {
            self.init_value(rng)
        } else {
            value
        }
    }
}

/// Initialisation and mutation parameters of a
/// boolean gene attribute (connection enabling).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoolAttributeConfig {
    /// Initial value; `None` draws it at random.
    pub default: Option<bool>,
    pub mutate_rate: f32,
    /// Added to `mutate_rate` when the value is `false`.
    pub rate_to_true_add: f32,
    /// Added to `mutate_rate` when the value is `true`.
    pub rate_to_false_add: f32,
}

impl BoolAttributeConfig {
    /// Returns a configuration that always
    /// yields `true` and never mutates.
    pub const fn zero() -> BoolAttributeConfig {
        BoolAttributeConfig {
            default: Some(true),
            mutate_rate: 0.0,
            rate_to_true_add: 0.0,
            rate_to_false_add: 0.0,
        }
    }

    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.default.unwrap_or_else(|| rng.gen())
    }

    /// Mutation redraws the value at random, so a
    /// mutation keeps the old value half of the time.
    pub fn mutate_value<R: Rng + ?Sized>(&self, value: bool, rng: &mut R) -> bool {
        let rate = self.mutate_rate
            + if value {
                self.rate_to_false_add
            } else {
                self.rate_to_true_add
            };
        if rate > 0.0 && rng.gen::<f32>() < rate {
            rng.gen()
        } else {
            value
        }
    }
}

/// Initialisation and mutation parameters of an
/// attribute chosen from a set of options
/// (activation and aggregation functions).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceAttributeConfig<T> {
    /// Initial value; `None` picks one of the `options` at random.
    pub default: Option<T>,
    pub options: Vec<T>,
    pub mutate_rate: f32,
}

impl<T> ChoiceAttributeConfig<T> {
    /// Returns a configuration that always yields `default`.
    pub const fn fixed(default: T) -> ChoiceAttributeConfig<T> {
        ChoiceAttributeConfig {
            default: Some(default),
            options: Vec::new(),
            mutate_rate: 0.0,
        }
    }
}

impl<T: Copy + Default> ChoiceAttributeConfig<T> {
    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        match self.default {
            Some(value) => value,
            None => self.options.choose(rng).copied().unwrap_or_default(),
        }
    }

    pub fn mutate_value<R: Rng + ?Sized>(&self, value: T, rng: &mut R) -> T {
        if self.mutate_rate > 0.0 && rng.gen::<f32>() < self.mutate_rate {
            self.options.choose(rng).copied().unwrap_or(value)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ActivationFunction;

    use rand::{rngs::StdRng, SeedableRng};

    fn weight_config() -> FloatAttributeConfig {
        FloatAttributeConfig {
            init_mean: 0.0,
            init_stdev: 1.0,
            init_type: InitType::Gaussian,
            max_value: 1.5,
            min_value: -1.5,
            mutate_power: 0.5,
            mutate_rate: 0.8,
            replace_rate: 0.1,
        }
    }

    #[test]
    fn float_values_stay_in_bounds() {
        let config = weight_config();
        let mut rng = StdRng::seed_from_u64(1);
        let mut value = config.init_value(&mut rng);
        for _ in 0..1000 {
            assert!((-1.5..=1.5).contains(&value));
            value = config.mutate_value(value, &mut rng);
        }
    }

    #[test]
    fn uniform_init_respects_stdev_window() {
        let config = FloatAttributeConfig {
            init_type: InitType::Uniform,
            init_mean: 1.0,
            init_stdev: 0.25,
            max_value: 10.0,
            min_value: -10.0,
            ..FloatAttributeConfig::zero()
        };
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            assert!((0.5..=1.5).contains(&config.init_value(&mut rng)));
        }
    }

    #[test]
    fn zero_rates_never_mutate() {
        let config = FloatAttributeConfig {
            mutate_rate: 0.0,
            replace_rate: 0.0,
            ..weight_config()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(config.mutate_value(0.75, &mut rng), 0.75);
    }

    #[test]
    fn zero_stdev_yields_mean() {
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(gauss(&mut rng, 2.0, 0.0), 2.0);
        assert_eq!(gauss(&mut rng, 2.0, -1.0), 2.0);
    }

    #[test]
    fn bool_rate_biases() {
        let config = BoolAttributeConfig {
            default: Some(true),
            mutate_rate: 0.0,
            rate_to_true_add: 1.0,
            rate_to_false_add: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(5);
        // A true value is never mutated, a false one eventually flips.
        assert!((0..100).all(|_| config.mutate_value(true, &mut rng)));
        assert!((0..100).any(|_| config.mutate_value(false, &mut rng)));
    }

    #[test]
    fn choice_defaults_and_options() {
        let mut rng = StdRng::seed_from_u64(6);
        let fixed = ChoiceAttributeConfig::fixed(ActivationFunction::Tanh);
        assert_eq!(fixed.init_value(&mut rng), ActivationFunction::Tanh);
        assert_eq!(
            fixed.mutate_value(ActivationFunction::Tanh, &mut rng),
            ActivationFunction::Tanh
        );

        let random = ChoiceAttributeConfig {
            default: None,
            options: vec![ActivationFunction::Sin, ActivationFunction::Gauss],
            mutate_rate: 1.0,
        };
        for _ in 0..20 {
            let value = random.init_value(&mut rng);
            assert!(random.options.contains(&value));
            assert!(random.options.contains(&random.mutate_value(value, &mut rng)));
        }
    }
}
