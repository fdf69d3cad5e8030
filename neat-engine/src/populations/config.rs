use serde::{Deserialize, Serialize};

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Function used to summarise a set of fitness values,
/// either for the whole population (termination check)
/// or for a single species (stagnation tracking).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessCriterion {
    Max,
    Min,
    Mean,
    Median,
}

impl FitnessCriterion {
    /// Applies the criterion to a sequence of fitness values.
    /// Returns `None` for an empty sequence.
    ///
    /// # Examples
    /// ```
    /// use neat_engine::FitnessCriterion;
    ///
    /// let values = [3.0, 1.0, 2.0, 10.0];
    /// assert_eq!(FitnessCriterion::Max.apply(values.iter().copied()), Some(10.0));
    /// assert_eq!(FitnessCriterion::Min.apply(values.iter().copied()), Some(1.0));
    /// assert_eq!(FitnessCriterion::Mean.apply(values.iter().copied()), Some(4.0));
    /// assert_eq!(FitnessCriterion::Median.apply(values.iter().copied()), Some(2.5));
    /// ```
    pub fn apply(self, values: impl Iterator<Item = f32>) -> Option<f32> {
        let mut values: Vec<f32> = values.collect();
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Self::Max => values.iter().copied().fold(f32::MIN, f32::max),
            Self::Min => values.iter().copied().fold(f32::MAX, f32::min),
            Self::Mean => values.iter().sum::<f32>() / values.len() as f32,
            Self::Median => {
                values.sort_unstable_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        })
    }
}

impl FromStr for FitnessCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(format!("unknown fitness function {:?}", other)),
        }
    }
}

impl fmt::Display for FitnessCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Mean => "mean",
            Self::Median => "median",
        })
    }
}

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Function computing the termination value
    /// from all genome fitnesses.
    pub fitness_criterion: FitnessCriterion,
    /// Evolution stops once the fitness criterion
    /// reaches this value.
    pub fitness_threshold: f32,
    /// Ignore the fitness threshold and run for
    /// the requested number of generations.
    pub no_fitness_termination: bool,
    /// Create a fresh random population instead of
    /// failing when every species goes extinct.
    pub reset_on_extinction: bool,
    /// Speciation parameters.
    pub species: SpeciesConfig,
    /// Stagnation parameters.
    pub stagnation: StagnationConfig,
    /// Reproduction parameters.
    pub reproduction: ReproductionConfig,
}

/// Parameters governing how genomes are
/// grouped into species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    /// Genetic distance threshold, beyond which
    /// genomes are considered as belonging to
    /// different species.
    pub compatibility_threshold: f32,
}

/// Parameters governing the removal of species
/// which stop improving.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagnationConfig {
    /// Function computing a species' fitness from
    /// its members' fitnesses.
    pub species_fitness_func: FitnessCriterion,
    /// Number of generations without improvement
    /// before a species is considered _stagnated_.
    pub max_stagnation: NonZeroUsize,
    /// Number of best species protected from
    /// stagnation.
    pub species_elitism: usize,
}

/// Parameters governing offspring generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Top n of each species which is copied
    /// as-is to the next generation.
    pub elitism: usize,
    /// Top fraction of each species which can
    /// participate in mating.
    pub survival_threshold: f32,
    /// Minimum number of offspring a surviving
    /// species receives.
    pub min_species_size: NonZeroUsize,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, `false`, [`Max`], or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// [`Max`]: FitnessCriterion::Max
    ///
    /// # Examples
    /// ```
    /// use neat_engine::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     fitness_threshold: 100.0,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            fitness_criterion: FitnessCriterion::Max,
            fitness_threshold: 0.0,
            no_fitness_termination: false,
            reset_on_extinction: false,
            species: SpeciesConfig {
                compatibility_threshold: 0.0,
            },
            stagnation: StagnationConfig {
                species_fitness_func: FitnessCriterion::Max,
                max_stagnation: NonZeroUsize::MIN,
                species_elitism: 0,
            },
            reproduction: ReproductionConfig {
                elitism: 0,
                survival_threshold: 0.0,
                min_species_size: NonZeroUsize::MIN,
            },
        }
    }
}
