use super::{ReproductionConfig, Species};
use crate::{Genome, GenomeKey};

use rand::prelude::{Rng, SliceRandom};

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs
/// and the computed spawn amounts.
pub(super) struct OffspringFactory<'a, G: Genome, R: Rng + ?Sized> {
    population: &'a [G],
    history: &'a mut G::InnovationHistory,
    genetic_config: &'a G::Config,
    reproduction_config: &'a ReproductionConfig,
    next_key: &'a mut GenomeKey,
    rng: &'a mut R,
}

impl<'a, G, R> OffspringFactory<'a, G, R>
where
    G: Genome + Clone,
    R: Rng + ?Sized,
{
    pub(super) fn new(
        population: &'a [G],
        history: &'a mut G::InnovationHistory,
        genetic_config: &'a G::Config,
        reproduction_config: &'a ReproductionConfig,
        next_key: &'a mut GenomeKey,
        rng: &'a mut R,
    ) -> OffspringFactory<'a, G, R> {
        OffspringFactory {
            population,
            history,
            genetic_config,
            reproduction_config,
            next_key,
            rng,
        }
    }

    /// Generates the offspring of the surviving species,
    /// given the number of offspring each one spawns.
    pub(super) fn generate_offspring(
        &mut self,
        surviving: &[&Species<G>],
        spawn_amounts: &[usize],
    ) -> Vec<G> {
        let mut offspring = Vec::with_capacity(spawn_amounts.iter().sum());
        for (species, &spawn) in surviving.iter().zip(spawn_amounts) {
            let spawn = spawn.max(self.reproduction_config.elitism);
            let mut members: Vec<&G> = species.genomes(self.population).collect();
            members.sort_by(|g1, g2| g2.fitness().total_cmp(&g1.fitness()));

            let elite = self.reproduction_config.elitism.min(members.len()).min(spawn);
            offspring.extend(members[..elite].iter().map(|g| (*g).clone()));

            let remaining = spawn - elite;
            if remaining == 0 || members.is_empty() {
                continue;
            }
            let cutoff = ((self.reproduction_config.survival_threshold * members.len() as f32).ceil()
                as usize)
                .max(2)
                .min(members.len());
            self.add_mated_offspring(&members[..cutoff], remaining, &mut offspring);
        }
        offspring
    }

    /// Mate randomly chosen pairs of eligible parents,
    /// adding the children to the offspring.
    fn add_mated_offspring(&mut self, eligible_parents: &[&G], count: usize, offspring: &mut Vec<G>) {
        for _ in 0..count {
            let (parent1, parent2) = match (
                eligible_parents.choose(&mut *self.rng),
                eligible_parents.choose(&mut *self.rng),
            ) {
                (Some(p1), Some(p2)) => (*p1, *p2),
                _ => return,
            };
            let key = *self.next_key;
            *self.next_key += 1;
            offspring.push(G::mate(
                key,
                parent1,
                parent2,
                &mut *self.history,
                self.genetic_config,
                &mut *self.rng,
            ));
        }
    }
}

/// Computes the number of offspring for each species from
/// their adjusted fitness and previous size. Each species
/// moves halfway towards its fitness-proportional share,
/// after which the amounts are normalised to `pop_size`.
pub(super) fn compute_spawn(
    adjusted_fitness: &[f32],
    previous_sizes: &[usize],
    pop_size: usize,
    min_species_size: usize,
) -> Vec<usize> {
    let af_sum: f32 = adjusted_fitness.iter().sum();

    let spawn_amounts: Vec<f32> = adjusted_fitness
        .iter()
        .zip(previous_sizes)
        .map(|(&af, &ps)| {
            let target = if af_sum > 0.0 {
                (af / af_sum * pop_size as f32).max(min_species_size as f32)
            } else {
                min_species_size as f32
            };
            let ps = ps as f32;
            let d = (target - ps) * 0.5;
            let c = d.round();
            if c.abs() > 0.0 {
                ps + c
            } else if d > 0.0 {
                ps + 1.0
            } else if d < 0.0 {
                ps - 1.0
            } else {
                ps
            }
        })
        .collect();

    let total_spawn: f32 = spawn_amounts.iter().sum();
    let norm = if total_spawn > 0.0 {
        pop_size as f32 / total_spawn
    } else {
        1.0
    };
    spawn_amounts
        .iter()
        .map(|n| ((n * norm).round().max(0.0) as usize).max(min_species_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{TestGenome, TestHistory};
    use crate::SpeciesID;

    use rand::{rngs::StdRng, SeedableRng};
    use std::num::NonZeroUsize;

    #[test]
    fn spawn_moves_towards_fitness_share() {
        let spawn = compute_spawn(&[1.0, 0.0], &[5, 5], 10, 2);
        assert_eq!(spawn, vec![7, 3]);
        assert_eq!(spawn.iter().sum::<usize>(), 10);
    }

    #[test]
    fn spawn_respects_minimum_species_size() {
        let spawn = compute_spawn(&[0.0, 0.0, 0.0], &[1, 1, 1], 3, 2);
        assert!(spawn.iter().all(|&s| s >= 2));
    }

    #[test]
    fn equal_fitness_keeps_sizes() {
        assert_eq!(compute_spawn(&[0.5, 0.5], &[10, 10], 20, 1), vec![10, 10]);
    }

    #[test]
    fn elite_are_copied_and_offspring_keyed() {
        let population: Vec<TestGenome> = (0..4)
            .map(|k| TestGenome::with_fitness(k, k as f32))
            .collect();
        let mut species = Species::new(SpeciesID(0, 0), 0, population[0].clone());
        species.update(population[0].clone(), vec![0, 1, 2, 3]);

        let config = ReproductionConfig {
            elitism: 1,
            survival_threshold: 0.5,
            min_species_size: NonZeroUsize::new(1).unwrap(),
        };
        let mut history = TestHistory::default();
        let mut next_key = 4;
        let mut rng = StdRng::seed_from_u64(3);
        let offspring = OffspringFactory::new(
            &population,
            &mut history,
            &(),
            &config,
            &mut next_key,
            &mut rng,
        )
        .generate_offspring(&[&species], &[4]);

        assert_eq!(offspring.len(), 4);
        // The fittest member survives unchanged.
        assert_eq!(offspring[0].key(), 3);
        assert_eq!(
            offspring[1..].iter().map(|g| g.key()).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
        assert_eq!(next_key, 7);
        // Children only descend from the top half.
        assert!(offspring[1..].iter().all(|g| g.value >= 2.0));
    }
}
