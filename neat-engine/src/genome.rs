use rand::Rng;

/// Identifier of a genome within a population.
/// Keys are handed out sequentially and never reused.
pub type GenomeKey = usize;

/// An interface for genomes that can be used by NEAT.
pub trait Genome {
    type Config;
    type InnovationHistory: InnovationHistory<Config = Self::Config>;

    /// Returns a randomized genome.
    fn new<R: Rng + ?Sized>(
        key: GenomeKey,
        config: &Self::Config,
        history: &mut Self::InnovationHistory,
        rng: &mut R,
    ) -> Self;

    /// Returns the genome's key.
    fn key(&self) -> GenomeKey;

    /// Returns the genetic distance between two genomes.
    fn genetic_distance(first: &Self, second: &Self, config: &Self::Config) -> f32;

    /// Combines two genomes and returns a mutated "child" genome.
    fn mate<R: Rng + ?Sized>(
        key: GenomeKey,
        parent1: &Self,
        parent2: &Self,
        history: &mut Self::InnovationHistory,
        config: &Self::Config,
        rng: &mut R,
    ) -> Self;

    /// Sets the genome's fitness value.
    fn set_fitness(&mut self, fitness: f32);

    /// Returns the genome's fitness value.
    fn fitness(&self) -> f32;

    /// Returns a measure of the genome's complexity,
    /// as `(node count, enabled connection count)`.
    fn size(&self) -> (usize, usize);
}

/// An Innovation History is used to keep track
/// of genetic innovations throught successive
/// generations of genomes.
///
/// The exact function and utility of the
/// InnovationHistory is left to the implementor.
pub trait InnovationHistory {
    type Config;

    fn new(config: &Self::Config) -> Self;

    /// Called before each generation's offspring are
    /// created. Innovations recorded earlier may be
    /// forgotten here.
    fn next_generation(&mut self) {}
}
