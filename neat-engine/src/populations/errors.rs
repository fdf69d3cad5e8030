use crate::GenomeKey;

use thiserror::Error;

/// Errors which stop the evolution of a population.
#[derive(Debug, Error, PartialEq)]
pub enum EvolutionError {
    /// Every species stagnated and `reset_on_extinction` is off.
    #[error("all species went extinct in generation {0}")]
    CompleteExtinction(usize),
    /// The evaluator produced NaN or an infinite value.
    #[error("genome {key} was assigned the non-finite fitness {fitness}")]
    NonFiniteFitness { key: GenomeKey, fitness: f32 },
}
