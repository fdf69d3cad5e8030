//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! as the source of selective pressure.
mod config;
mod errors;
mod offspring_factory;
pub mod reporting;
mod species;
mod stagnation;

use crate::{Genome, GenomeKey, InnovationHistory};
pub use config::{
    FitnessCriterion, PopulationConfig, ReproductionConfig, SpeciesConfig, StagnationConfig,
};
pub use errors::EvolutionError;
use offspring_factory::{compute_spawn, OffspringFactory};
use reporting::Reporter;
pub use species::{Species, SpeciesID};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

/// A population of genomes.
pub struct Population<C, H, G> {
    genomes: Vec<G>,
    species: Vec<Species<G>>,
    history: H,
    generation: usize,
    next_genome_key: GenomeKey,
    best_genome: Option<G>,
    population_config: PopulationConfig,
    genetic_config: C,
    rng: StdRng,
}

impl<C, H, G> Population<C, H, G>
where
    G: Genome<InnovationHistory = H, Config = C> + Clone,
    H: InnovationHistory<Config = C>,
{
    /// Creates a new population using the passed configurations,
    /// seeding its random number generator from system entropy.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// [`Genome`]: crate::Genome
    pub fn new(population_config: PopulationConfig, genetic_config: C) -> Population<C, H, G> {
        Self::with_rng(population_config, genetic_config, StdRng::from_entropy())
    }

    /// Creates a new population whose evolution is reproducible
    /// for a given `seed` (fitness evaluation aside).
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{CppnGenome, GenomeConfig};
    /// use neat_engine::{Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let pop_config = PopulationConfig {
    ///     size: NonZeroUsize::new(10).unwrap(),
    ///     ..PopulationConfig::zero()
    /// };
    /// let population = Population::<_, _, CppnGenome>::with_seed(pop_config, GenomeConfig::zero(), 42);
    ///
    /// assert_eq!(population.genomes().count(), 10);
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn with_seed(
        population_config: PopulationConfig,
        genetic_config: C,
        seed: u64,
    ) -> Population<C, H, G> {
        Self::with_rng(population_config, genetic_config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        population_config: PopulationConfig,
        genetic_config: C,
        rng: StdRng,
    ) -> Population<C, H, G> {
        let mut population = Population {
            genomes: vec![],
            species: vec![],
            history: H::new(&genetic_config),
            generation: 0,
            next_genome_key: 0,
            best_genome: None,
            population_config,
            genetic_config,
            rng,
        };
        population.genomes = population.create_genomes();
        population.speciate();
        population
    }

    /// Generates a fresh set of randomized genomes.
    fn create_genomes(&mut self) -> Vec<G> {
        (0..self.population_config.size.get())
            .map(|_| {
                let key = self.next_genome_key;
                self.next_genome_key += 1;
                G::new(key, &self.genetic_config, &mut self.history, &mut self.rng)
            })
            .collect()
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator.
    ///
    /// # Errors
    /// Returns an error if the evaluator produces a
    /// non-finite fitness value.
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E) -> Result<(), EvolutionError>
    where
        E: FnMut(&G) -> f32,
    {
        for genome in &mut self.genomes {
            let fitness = evaluator(genome);
            Self::assign_fitness(genome, fitness)?;
        }
        Ok(())
    }

    /// Evaluates the fitness of each genome in the population
    /// in parallel, on the global `rayon` thread pool.
    ///
    /// # Errors
    /// Returns an error if the evaluator produces a
    /// non-finite fitness value.
    pub fn par_evaluate_fitness<E>(&mut self, evaluator: &E) -> Result<(), EvolutionError>
    where
        E: Fn(&G) -> f32 + Sync,
        G: Send + Sync,
    {
        let fitnesses: Vec<f32> = self.genomes.par_iter().map(evaluator).collect();
        for (genome, fitness) in self.genomes.iter_mut().zip(fitnesses) {
            Self::assign_fitness(genome, fitness)?;
        }
        Ok(())
    }

    fn assign_fitness(genome: &mut G, fitness: f32) -> Result<(), EvolutionError> {
        if !fitness.is_finite() {
            return Err(EvolutionError::NonFiniteFitness {
                key: genome.key(),
                fitness,
            });
        }
        genome.set_fitness(fitness);
        Ok(())
    }

    /// Runs evolution for up to `generations` generations (forever
    /// if `None`), evaluating genomes in parallel with `evaluator`.
    ///
    /// Each generation the population is evaluated, the best genome
    /// is recorded, and evolution stops early once the
    /// [fitness criterion] reaches the [fitness threshold] (unless
    /// [`no_fitness_termination`] is set). Otherwise the population
    /// is [evolved].
    ///
    /// Returns the best genome seen during the run.
    ///
    /// # Errors
    /// Returns an error on complete extinction when
    /// [`reset_on_extinction`] is not set, or when the evaluator
    /// produces a non-finite fitness.
    ///
    /// [fitness criterion]: PopulationConfig::fitness_criterion
    /// [fitness threshold]: PopulationConfig::fitness_threshold
    /// [`no_fitness_termination`]: PopulationConfig::no_fitness_termination
    /// [`reset_on_extinction`]: PopulationConfig::reset_on_extinction
    /// [evolved]: Population::evolve
    pub fn run<E>(
        &mut self,
        evaluator: &E,
        generations: Option<usize>,
        reporter: &mut dyn Reporter<G>,
    ) -> Result<G, EvolutionError>
    where
        E: Fn(&G) -> f32 + Sync,
        G: Send + Sync,
    {
        let mut k = 0;
        while generations.map_or(true, |n| k < n) {
            k += 1;
            reporter.start_generation(self.generation);

            self.par_evaluate_fitness(evaluator)?;

            let best = self.champion().clone();
            reporter.post_evaluate(self.generation, &self.genomes, &self.species, &best);
            if self
                .best_genome
                .as_ref()
                .map_or(true, |b| best.fitness() > b.fitness())
            {
                self.best_genome = Some(best.clone());
            }

            if !self.population_config.no_fitness_termination {
                let value = self
                    .population_config
                    .fitness_criterion
                    .apply(self.genomes.iter().map(Genome::fitness))
                    .unwrap_or(f32::MIN);
                if value >= self.population_config.fitness_threshold {
                    reporter.found_solution(self.generation, &best);
                    break;
                }
            }

            self.evolve(reporter)?;
        }

        if self.population_config.no_fitness_termination {
            if let Some(best) = &self.best_genome {
                reporter.found_solution(self.generation, best);
            }
        }

        Ok(self
            .best_genome
            .clone()
            .unwrap_or_else(|| self.champion().clone()))
    }

    /// Evolves an evaluated population by one generation:
    /// species are checked for stagnation, surviving species
    /// reproduce according to their adjusted fitness, and
    /// the offspring are speciated.
    ///
    /// # Errors
    /// Returns an error if every species stagnated and
    /// [`reset_on_extinction`] is not set.
    ///
    /// [`reset_on_extinction`]: PopulationConfig::reset_on_extinction
    pub fn evolve(&mut self, reporter: &mut dyn Reporter<G>) -> Result<(), EvolutionError> {
        self.genomes = self.reproduce(reporter);

        if self.species.is_empty() {
            reporter.complete_extinction(self.generation);
            if !self.population_config.reset_on_extinction {
                return Err(EvolutionError::CompleteExtinction(self.generation));
            }
            self.genomes = self.create_genomes();
        }

        self.generation += 1;
        self.speciate();
        reporter.end_generation(self.generation, &self.genomes, &self.species);
        Ok(())
    }

    /// Removes stagnant species and generates the next
    /// generation's genomes from the remaining ones.
    /// Leaves the species list empty on complete extinction.
    fn reproduce(&mut self, reporter: &mut dyn Reporter<G>) -> Vec<G> {
        let stagnant = stagnation::update(
            &mut self.species,
            &self.genomes,
            self.generation,
            &self.population_config.stagnation,
        );

        let mut remaining = Vec::with_capacity(self.species.len());
        for (species, stagnant) in self.species.drain(..).zip(stagnant) {
            if stagnant {
                reporter.species_stagnant(&species);
            } else {
                remaining.push(species);
            }
        }
        if remaining.is_empty() {
            return vec![];
        }

        let fitnesses = remaining
            .iter()
            .flat_map(|s| s.member_fitnesses(&self.genomes));
        let (min_fitness, max_fitness) = fitnesses.fold((f32::MAX, f32::MIN), |(lo, hi), f| {
            (lo.min(f), hi.max(f))
        });
        let fitness_range = (max_fitness - min_fitness).max(1.0);
        for species in &mut remaining {
            let mean = FitnessCriterion::Mean
                .apply(species.member_fitnesses(&self.genomes))
                .unwrap_or(min_fitness);
            species.adjusted_fitness = Some((mean - min_fitness) / fitness_range);
        }

        let adjusted: Vec<f32> = remaining
            .iter()
            .map(|s| s.adjusted_fitness.unwrap_or(0.0))
            .collect();
        let previous_sizes: Vec<usize> = remaining.iter().map(Species::len).collect();
        let reproduction = &self.population_config.reproduction;
        let min_species_size = reproduction.min_species_size.get().max(reproduction.elitism);
        let spawn_amounts = compute_spawn(
            &adjusted,
            &previous_sizes,
            self.population_config.size.get(),
            min_species_size,
        );
        debug!(?adjusted, ?spawn_amounts, "computed species offspring");

        self.history.next_generation();
        let offspring = OffspringFactory::new(
            &self.genomes,
            &mut self.history,
            &self.genetic_config,
            reproduction,
            &mut self.next_genome_key,
            &mut self.rng,
        )
        .generate_offspring(&remaining.iter().collect::<Vec<_>>(), &spawn_amounts);

        self.species = remaining;
        offspring
    }

    /// Assigns every genome to a species of the current generation.
    /// Each existing species
    /// first picks as its new representative the unassigned genome
    /// closest to its old one; the remaining genomes then join the
    /// closest species within the compatibility threshold, or found
    /// a new species.
    fn speciate(&mut self) {
        let threshold = self.population_config.species.compatibility_threshold;
        let mut unspeciated: Vec<usize> = (0..self.genomes.len()).collect();
        let mut assignments: Vec<(usize, Vec<usize>)> = vec![];

        let mut surviving = Vec::with_capacity(self.species.len());
        for species in self.species.drain(..) {
            let closest = unspeciated
                .iter()
                .enumerate()
                .map(|(pos, &idx)| {
                    let distance = G::genetic_distance(
                        species.representative(),
                        &self.genomes[idx],
                        &self.genetic_config,
                    );
                    (pos, idx, distance)
                })
                .min_by(|a, b| a.2.total_cmp(&b.2));
            if let Some((pos, idx, _)) = closest {
                unspeciated.swap_remove(pos);
                assignments.push((idx, vec![idx]));
                surviving.push(species);
            }
        }

        let mut new_species_count = 0;
        for idx in unspeciated {
            let genome = &self.genomes[idx];
            let closest = assignments
                .iter()
                .enumerate()
                .map(|(s, (rep, _))| {
                    (
                        s,
                        G::genetic_distance(&self.genomes[*rep], genome, &self.genetic_config),
                    )
                })
                .filter(|(_, d)| *d < threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            match closest {
                Some((s, _)) => assignments[s].1.push(idx),
                None => {
                    surviving.push(Species::new(
                        SpeciesID(self.generation, new_species_count),
                        self.generation,
                        genome.clone(),
                    ));
                    new_species_count += 1;
                    assignments.push((idx, vec![idx]));
                }
            }
        }

        for (species, (rep, members)) in surviving.iter_mut().zip(assignments) {
            species.update(self.genomes[rep].clone(), members);
        }
        surviving.sort_unstable_by_key(|s| s.id());
        self.species = surviving;
    }

    /// Resets the population to an initial randomized state,
    /// keeping the random number generator's state.
    pub fn reset(&mut self) {
        self.species.clear();
        self.best_genome = None;
        self.generation = 0;
        self.history = H::new(&self.genetic_config);
        self.genomes = self.create_genomes();
        self.speciate();
    }

    /// Returns the currently best-performing genome.
    pub fn champion(&self) -> &G {
        self.genomes
            .iter()
            .max_by(|g1, g2| g1.fitness().total_cmp(&g2.fitness()))
            .expect("population is never empty")
    }

    /// Returns the best genome seen in any evaluated generation.
    pub fn best_genome(&self) -> Option<&G> {
        self.best_genome.as_ref()
    }

    /// Returns an iterator over all current genomes.
    pub fn genomes(&self) -> impl Iterator<Item = &G> {
        self.genomes.iter()
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.iter()
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Returns the population's configuration.
    pub fn config(&self) -> &PopulationConfig {
        &self.population_config
    }

    /// Returns the genetic configuration.
    pub fn genetic_config(&self) -> &C {
        &self.genetic_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestGenome;

    use std::num::NonZeroUsize;

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            fitness_criterion: FitnessCriterion::Max,
            fitness_threshold: 100.0,
            species: SpeciesConfig {
                compatibility_threshold: 0.25,
            },
            stagnation: StagnationConfig {
                species_fitness_func: FitnessCriterion::Max,
                max_stagnation: NonZeroUsize::new(15).unwrap(),
                species_elitism: 2,
            },
            reproduction: ReproductionConfig {
                elitism: 1,
                survival_threshold: 0.2,
                min_species_size: NonZeroUsize::new(2).unwrap(),
            },
            ..PopulationConfig::zero()
        }
    }

    #[test]
    fn new_population_is_speciated() {
        let population = Population::<_, _, TestGenome>::with_seed(config(30), (), 1);
        assert_eq!(population.genomes().count(), 30);
        let members: usize = population.species().map(Species::len).sum();
        assert_eq!(members, 30);
        let keys: Vec<_> = population.genomes().map(|g| g.key()).collect();
        assert_eq!(keys, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn every_genome_joins_exactly_one_species() {
        let mut population = Population::<_, _, TestGenome>::with_seed(config(40), (), 2);
        population.evaluate_fitness(|g| g.value).unwrap();
        population.evolve(&mut ()).unwrap();

        let mut seen: Vec<usize> = population
            .species()
            .flat_map(|s| s.member_indices().iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..population.genomes().count()).collect::<Vec<_>>());
        assert_eq!(population.generation(), 1);
    }

    #[test]
    fn run_stops_at_threshold() {
        let mut population = Population::<_, _, TestGenome>::with_seed(
            PopulationConfig {
                fitness_threshold: 0.0,
                ..config(20)
            },
            (),
            3,
        );
        let winner = population.run(&|g: &TestGenome| g.value, Some(10), &mut ()).unwrap();
        assert_eq!(population.generation(), 0);
        assert_eq!(winner.fitness(), population.champion().fitness());
    }

    #[test]
    fn run_improves_fitness() {
        let mut population = Population::<_, _, TestGenome>::with_seed(config(50), (), 4);
        let evaluator = |g: &TestGenome| g.value;
        population.evaluate_fitness(evaluator).unwrap();
        let initial = population.champion().fitness();
        let winner = population.run(&evaluator, Some(30), &mut ()).unwrap();
        assert!(winner.fitness() >= initial);
        assert_eq!(population.best_genome().unwrap().fitness(), winner.fitness());
    }

    #[test]
    fn history_is_told_of_each_generation() {
        let mut population = Population::<_, _, TestGenome>::with_seed(config(20), (), 6);
        assert_eq!(population.history().generations, 0);
        population.evaluate_fitness(|g: &TestGenome| g.value).unwrap();
        population.evolve(&mut ()).unwrap();
        population.evaluate_fitness(|g: &TestGenome| g.value).unwrap();
        population.evolve(&mut ()).unwrap();
        assert_eq!(population.history().generations, 2);
    }

    #[test]
    fn non_finite_fitness_is_rejected() {
        let mut population = Population::<_, _, TestGenome>::with_seed(config(5), (), 5);
        let result = population.evaluate_fitness(|_| f32::NAN);
        assert!(matches!(result, Err(EvolutionError::NonFiniteFitness { key: 0, .. })));
    }

    #[test]
    fn extinction_without_reset_is_an_error() {
        let mut population = Population::<_, _, TestGenome>::with_seed(
            PopulationConfig {
                stagnation: StagnationConfig {
                    species_fitness_func: FitnessCriterion::Max,
                    max_stagnation: NonZeroUsize::new(1).unwrap(),
                    species_elitism: 0,
                },
                species: SpeciesConfig {
                    compatibility_threshold: 1.0e6,
                },
                ..config(10)
            },
            (),
            6,
        );
        let constant = |_: &TestGenome| 1.0;
        let result = population.run(&constant, Some(10), &mut ());
        assert!(matches!(result, Err(EvolutionError::CompleteExtinction(_))));
    }

    #[test]
    fn extinction_with_reset_continues() {
        let mut population = Population::<_, _, TestGenome>::with_seed(
            PopulationConfig {
                reset_on_extinction: true,
                stagnation: StagnationConfig {
                    species_fitness_func: FitnessCriterion::Max,
                    max_stagnation: NonZeroUsize::new(1).unwrap(),
                    species_elitism: 0,
                },
                species: SpeciesConfig {
                    compatibility_threshold: 1.0e6,
                },
                ..config(10)
            },
            (),
            7,
        );
        let constant = |_: &TestGenome| 1.0;
        assert!(population.run(&constant, Some(5), &mut ()).is_ok());
        assert_eq!(population.generation(), 5);
        assert_eq!(population.genomes().count(), 10);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut population = Population::<_, _, TestGenome>::with_seed(config(10), (), 8);
        population.evaluate_fitness(|g| g.value).unwrap();
        population.evolve(&mut ()).unwrap();
        population.reset();
        assert_eq!(population.generation(), 0);
        assert!(population.best_genome().is_none());
        assert_eq!(population.genomes().count(), 10);
    }
}
