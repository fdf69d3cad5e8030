use super::{Species, StagnationConfig};
use crate::Genome;

/// Updates each species' fitness record and returns,
/// for every species in `species` (in the same order),
/// whether it is considered stagnant in `generation`.
///
/// A species improves when its fitness exceeds the best
/// value in its history. Species are ranked by fitness, and
/// the `species_elitism` best ones are never marked as
/// stagnant; marking also stops once only
/// `species_elitism` non-stagnant species remain.
pub(super) fn update<G: Genome + Clone>(
    species: &mut [Species<G>],
    population: &[G],
    generation: usize,
    config: &StagnationConfig,
) -> Vec<bool> {
    for s in species.iter_mut() {
        let previous_best = s.fitness_history.iter().copied().reduce(f32::max);
        let fitness = config
            .species_fitness_func
            .apply(s.member_fitnesses(population))
            .unwrap_or(f32::MIN);
        s.fitness = Some(fitness);
        s.fitness_history.push(fitness);
        s.adjusted_fitness = None;
        if previous_best.map_or(true, |best| fitness > best) {
            s.last_improved = generation;
        }
    }

    // Ascending order of fitness.
    let mut ranking: Vec<usize> = (0..species.len()).collect();
    ranking.sort_by(|&a, &b| {
        let fa = species[a].fitness.unwrap_or(f32::MIN);
        let fb = species[b].fitness.unwrap_or(f32::MIN);
        fa.total_cmp(&fb)
    });

    let mut stagnant = vec![false; species.len()];
    let mut non_stagnant = species.len();
    for (rank, &idx) in ranking.iter().enumerate() {
        let stagnant_time = generation - species[idx].last_improved;
        let mut is_stagnant = false;
        if non_stagnant > config.species_elitism {
            is_stagnant = stagnant_time >= config.max_stagnation.get();
        }
        if species.len() - rank <= config.species_elitism {
            is_stagnant = false;
        }
        if is_stagnant {
            non_stagnant -= 1;
        }
        stagnant[idx] = is_stagnant;
    }
    stagnant
}
