//! Hooks into the generational loop of a [`Population`].
//!
//! A [`Reporter`] is notified at each stage of [`Population::run`].
//! Two implementations are supplied: [`StdOutReporter`], which emits
//! `tracing` events summarising every generation, and
//! [`StatisticsReporter`], which stores fitness statistics and
//! (depending on its [`ReportingLevel`]) genome snapshots.
//!
//! [`Population`]: crate::Population
//! [`Population::run`]: crate::Population::run
use super::{Species, SpeciesID};
use crate::Genome;

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Receives notifications during evolution.
/// All methods do nothing by default.
pub trait Reporter<G> {
    fn start_generation(&mut self, _generation: usize) {}

    fn post_evaluate(
        &mut self,
        _generation: usize,
        _population: &[G],
        _species: &[Species<G>],
        _best: &G,
    ) {
    }

    fn end_generation(&mut self, _generation: usize, _population: &[G], _species: &[Species<G>]) {}

    fn species_stagnant(&mut self, _species: &Species<G>) {}

    fn complete_extinction(&mut self, _generation: usize) {}

    fn found_solution(&mut self, _generation: usize, _best: &G) {}
}

/// The unit reporter ignores every notification.
impl<G> Reporter<G> for () {}

/// Forwards notifications to several reporters, in order.
pub struct ReporterSet<'a, G> {
    reporters: Vec<&'a mut dyn Reporter<G>>,
}

impl<'a, G> ReporterSet<'a, G> {
    pub fn new() -> ReporterSet<'a, G> {
        ReporterSet { reporters: vec![] }
    }

    pub fn add(&mut self, reporter: &'a mut dyn Reporter<G>) {
        self.reporters.push(reporter);
    }
}

impl<'a, G> Default for ReporterSet<'a, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, G> Reporter<G> for ReporterSet<'a, G> {
    fn start_generation(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.start_generation(generation);
        }
    }

    fn post_evaluate(&mut self, generation: usize, population: &[G], species: &[Species<G>], best: &G) {
        for r in &mut self.reporters {
            r.post_evaluate(generation, population, species, best);
        }
    }

    fn end_generation(&mut self, generation: usize, population: &[G], species: &[Species<G>]) {
        for r in &mut self.reporters {
            r.end_generation(generation, population, species);
        }
    }

    fn species_stagnant(&mut self, species: &Species<G>) {
        for r in &mut self.reporters {
            r.species_stagnant(species);
        }
    }

    fn complete_extinction(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.complete_extinction(generation);
        }
    }

    fn found_solution(&mut self, generation: usize, best: &G) {
        for r in &mut self.reporters {
            r.found_solution(generation, best);
        }
    }
}

/// Logs a summary of each generation through `tracing`.
pub struct StdOutReporter {
    show_species_detail: bool,
    generation_start: Option<Instant>,
    generation_times: Vec<Duration>,
}

impl StdOutReporter {
    pub fn new(show_species_detail: bool) -> StdOutReporter {
        StdOutReporter {
            show_species_detail,
            generation_start: None,
            generation_times: vec![],
        }
    }
}

impl<G: Genome + Clone> Reporter<G> for StdOutReporter {
    fn start_generation(&mut self, generation: usize) {
        info!("****** Running generation {} ******", generation);
        self.generation_start = Some(Instant::now());
    }

    fn post_evaluate(&mut self, _generation: usize, population: &[G], species: &[Species<G>], best: &G) {
        let stats = Stats::from(population.iter().map(Genome::fitness));
        let best_species = species
            .iter()
            .find(|s| s.member_indices().iter().any(|&i| population[i].key() == best.key()))
            .map(|s| s.id());
        info!(
            "Population's average fitness: {:.5} stdev: {:.5}",
            stats.mean, stats.stdev
        );
        info!(
            "Best fitness: {:.5} - size: {:?} - species {:?} - id {}",
            best.fitness(),
            best.size(),
            best_species,
            best.key()
        );
    }

    fn end_generation(&mut self, generation: usize, population: &[G], species: &[Species<G>]) {
        info!(
            "Population of {} members in {} species",
            population.len(),
            species.len()
        );
        if self.show_species_detail {
            info!("   ID    age  size  fitness  adj fit  stag");
            for s in species {
                info!(
                    "{:>5?} {:>4} {:>5} {:>8} {:>8} {:>5}",
                    s.id(),
                    generation - s.created(),
                    s.len(),
                    s.fitness().map_or("--".to_string(), |f| format!("{:.1}", f)),
                    s.adjusted_fitness().map_or("--".to_string(), |f| format!("{:.3}", f)),
                    generation - s.last_improved()
                );
            }
        }
        if let Some(start) = self.generation_start.take() {
            let elapsed = start.elapsed();
            self.generation_times.push(elapsed);
            let recent = &self.generation_times[self.generation_times.len().saturating_sub(10)..];
            let average = recent.iter().sum::<Duration>() / recent.len() as u32;
            info!(
                "Generation time: {:.3} sec ({:.3} average)",
                elapsed.as_secs_f32(),
                average.as_secs_f32()
            );
        }
    }

    fn species_stagnant(&mut self, species: &Species<G>) {
        info!(
            "Species {:?} with {} members is stagnated: removing it",
            species.id(),
            species.len()
        );
    }

    fn complete_extinction(&mut self, generation: usize) {
        warn!("All species extinct in generation {}", generation);
    }

    fn found_solution(&mut self, generation: usize, best: &G) {
        info!(
            "Best individual in generation {} meets fitness threshold - complexity: {:?}",
            generation,
            best.size()
        );
    }
}

/// Defines different possible reporting levels for statistics.
#[derive(Clone, Copy, Debug)]
pub enum ReportingLevel {
    /// Clones the entire population.
    AllGenomes,
    /// Clones species and their champions.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A reporting-level dependant store
/// of genomes from a population.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord<G> {
    /// Species IDs, genomes and stagnation level.
    Species(Vec<(SpeciesID, Vec<G>, usize)>),
    /// Only species IDs, species champions, and stagnation level.
    SpeciesChampions(Vec<(SpeciesID, G, usize)>),
    /// Only population champion.
    PopulationChampion(G),
    /// Empty.
    None,
}

/// A snapshot of an evaluated generation.
#[derive(Clone, Debug)]
pub struct Log<G> {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord<G>,
    pub species_sizes: Vec<(SpeciesID, usize)>,
    pub fitness: Stats,
    pub best: G,
}

impl<G: Genome> fmt::Display for Log<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration_number: {:?}\n\
            \tspecies_count: {:?}\n\
            \tfitness: {:?}\n\
            \tbest_fitness: {:?}\n\
            }}",
            &self.generation_number,
            &self.species_sizes.len(),
            &self.fitness,
            self.best.fitness(),
        )
    }
}

/// Stores per-generation statistics of a population.
#[derive(Clone, Debug)]
pub struct StatisticsReporter<G> {
    reporting_level: ReportingLevel,
    logs: Vec<Log<G>>,
}

impl<G: Genome + Clone> StatisticsReporter<G> {
    /// Returns a reporter with the appropiate reporting level.
    pub fn new(reporting_level: ReportingLevel) -> StatisticsReporter<G> {
        StatisticsReporter {
            reporting_level,
            logs: vec![],
        }
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log<G>> {
        self.logs.iter()
    }

    /// Returns the best genome of each generation.
    pub fn most_fit_genomes(&self) -> impl Iterator<Item = &G> {
        self.logs.iter().map(|log| &log.best)
    }

    /// Returns the best genome seen so far.
    pub fn best_genome(&self) -> Option<&G> {
        self.most_fit_genomes()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    /// Returns the `n` best genomes seen so far, best first.
    pub fn best_genomes(&self, n: usize) -> Vec<&G> {
        let mut genomes: Vec<&G> = self.most_fit_genomes().collect();
        genomes.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        genomes.truncate(n);
        genomes
    }

    /// Returns the mean fitness of each generation.
    pub fn fitness_mean(&self) -> Vec<f32> {
        self.logs.iter().map(|log| log.fitness.mean).collect()
    }
}

impl<G: Genome + Clone> Reporter<G> for StatisticsReporter<G> {
    fn post_evaluate(&mut self, generation: usize, population: &[G], species: &[Species<G>], best: &G) {
        let generation_sample = match self.reporting_level {
            ReportingLevel::AllGenomes => GenerationMemberRecord::Species(
                species
                    .iter()
                    .map(|s| {
                        (
                            s.id(),
                            s.genomes(population).cloned().collect(),
                            generation - s.last_improved(),
                        )
                    })
                    .collect(),
            ),
            ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                species
                    .iter()
                    .filter_map(|s| {
                        s.champion(population)
                            .map(|c| (s.id(), c.clone(), generation - s.last_improved()))
                    })
                    .collect(),
            ),
            ReportingLevel::PopulationChampion => {
                GenerationMemberRecord::PopulationChampion(best.clone())
            }
            ReportingLevel::NoGenomes => GenerationMemberRecord::None,
        };
        self.logs.push(Log {
            generation_number: generation,
            generation_sample,
            species_sizes: species.iter().map(|s| (s.id(), s.len())).collect(),
            fitness: Stats::from(population.iter().map(Genome::fitness)),
            best: best.clone(),
        });
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
    pub stdev: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// An empty sequence yields all-zero statistics.
    ///
    /// # Examples
    /// ```
    /// use neat_engine::reporting::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Stats {
        let mut data: Vec<f32> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
                stdev: 0.0,
            };
        }
        let (mut max, mut min, mut sum) = (f32::MIN, f32::MAX, 0.0);
        for d in &data {
            max = d.max(max);
            min = d.min(min);
            sum += d;
        }
        let mean = sum / data.len() as f32;
        let variance = data.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / data.len() as f32;
        data.sort_unstable_by(|a, b| a.total_cmp(b));
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: max,
            minimum: min,
            mean,
            median,
            stdev: variance.sqrt(),
        }
    }
}
