//! Population management for NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//! and the speciation, stagnation and reproduction policies popularised
//! by the `neat-python` defaults (`DefaultSpeciesSet`, `DefaultStagnation`
//! and `DefaultReproduction`).
//!
//! Genomic structure is left to the user through the [`Genome`] trait.
//! A CPPN/neural-network genome is supplied by the `neat-cppn` crate.
//!
//! # Example usage: evolving genomes towards a fixed target
//! ```
//! use neat_cppn::genomics::{CppnGenome, GenomeConfig};
//! use neat_engine::reporting::StdOutReporter;
//! use neat_engine::{
//!     FitnessCriterion, Population, PopulationConfig, ReproductionConfig, SpeciesConfig,
//!     StagnationConfig,
//! };
//! use std::num::NonZeroUsize;
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(20).unwrap(),
//!     fitness_criterion: FitnessCriterion::Max,
//!     fitness_threshold: 10.0,
//!     reset_on_extinction: true,
//!     species: SpeciesConfig {
//!         compatibility_threshold: 3.0,
//!     },
//!     stagnation: StagnationConfig {
//!         species_fitness_func: FitnessCriterion::Max,
//!         max_stagnation: NonZeroUsize::new(15).unwrap(),
//!         species_elitism: 2,
//!     },
//!     reproduction: ReproductionConfig {
//!         elitism: 2,
//!         survival_threshold: 0.2,
//!         min_species_size: NonZeroUsize::new(2).unwrap(),
//!     },
//!     ..PopulationConfig::zero()
//! };
//! let genetic_config = GenomeConfig {
//!     node_add_prob: 0.2,
//!     conn_add_prob: 0.5,
//!     ..GenomeConfig::zero()
//! };
//!
//! // Reward genomes for growing connections.
//! let mut population = Population::<_, _, CppnGenome>::with_seed(population_config, genetic_config, 7);
//! let winner = population
//!     .run(&|g: &CppnGenome| g.size().1 as f32, Some(3), &mut StdOutReporter::new(false))
//!     .unwrap();
//! assert!(winner.fitness() >= 0.0);
//! ```

mod genome;
mod populations;

pub use genome::*;
pub use populations::*;

#[cfg(test)]
mod tests {
    use super::*;

    use rand::Rng;

    /// Minimal genome carrying a single value, used to
    /// exercise the population machinery.
    #[derive(Clone, Debug)]
    pub(crate) struct TestGenome {
        key: GenomeKey,
        pub(crate) value: f32,
        fitness: f32,
    }

    impl TestGenome {
        pub(crate) fn with_fitness(key: GenomeKey, fitness: f32) -> TestGenome {
            TestGenome {
                key,
                value: fitness,
                fitness,
            }
        }
    }

    /// Counts the generations it was told of.
    #[derive(Default)]
    pub(crate) struct TestHistory {
        pub(crate) generations: usize,
    }

    impl InnovationHistory for TestHistory {
        type Config = ();

        fn new(_: &()) -> TestHistory {
            TestHistory::default()
        }

        fn next_generation(&mut self) {
            self.generations += 1;
        }
    }

    impl Genome for TestGenome {
        type Config = ();
        type InnovationHistory = TestHistory;

        fn new<R: Rng + ?Sized>(key: GenomeKey, _: &(), _: &mut TestHistory, rng: &mut R) -> Self {
            TestGenome {
                key,
                value: rng.gen(),
                fitness: 0.0,
            }
        }

        fn key(&self) -> GenomeKey {
            self.key
        }

        fn genetic_distance(first: &Self, second: &Self, _: &()) -> f32 {
            (first.value - second.value).abs()
        }

        fn mate<R: Rng + ?Sized>(
            key: GenomeKey,
            parent1: &Self,
            parent2: &Self,
            _: &mut TestHistory,
            _: &(),
            _: &mut R,
        ) -> Self {
            TestGenome {
                key,
                value: (parent1.value + parent2.value) / 2.0,
                fitness: 0.0,
            }
        }

        fn set_fitness(&mut self, fitness: f32) {
            self.fitness = fitness;
        }

        fn fitness(&self) -> f32 {
            self.fitness
        }

        fn size(&self) -> (usize, usize) {
            (1, 0)
        }
    }
}
