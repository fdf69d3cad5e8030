use crate::Genome;

use serde::{Deserialize, Serialize};

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize, pub usize);

/// Species are collections of reproductively
/// compatible (within a certain [compatibility threshold])
/// genomes. Membership is determined by calculating
/// the genetic distance to a _representative_, which is
/// re-chosen every generation as the member closest to
/// the previous representative.
///
/// Members are stored as indices into the population's
/// genome list.
///
/// [compatibility threshold]: crate::SpeciesConfig::compatibility_threshold
#[derive(Debug, Clone)]
pub struct Species<G> {
    id: SpeciesID,
    created: usize,
    pub(super) last_improved: usize,
    pub(super) representative: G,
    pub(super) members: Vec<usize>,
    pub(super) fitness: Option<f32>,
    pub(super) adjusted_fitness: Option<f32>,
    pub(super) fitness_history: Vec<f32>,
}

impl<G: Genome + Clone> Species<G> {
    /// Creates a new, memberless species with the specified
    /// ID and representative, born in `generation`.
    pub(super) fn new(id: SpeciesID, generation: usize, representative: G) -> Species<G> {
        Species {
            id,
            created: generation,
            last_improved: generation,
            representative,
            members: vec![],
            fitness: None,
            adjusted_fitness: None,
            fitness_history: vec![],
        }
    }

    /// Replaces the representative and member list.
    pub(super) fn update(&mut self, representative: G, members: Vec<usize>) {
        self.representative = representative;
        self.members = members;
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the generation in which the species was born.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Returns the last generation in which the
    /// species' fitness improved.
    pub fn last_improved(&self) -> usize {
        self.last_improved
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &G {
        &self.representative
    }

    /// Returns the species' fitness, as computed
    /// by the last stagnation update.
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    /// Returns the species' adjusted fitness, as computed
    /// during the last reproduction.
    pub fn adjusted_fitness(&self) -> Option<f32> {
        self.adjusted_fitness
    }

    /// Returns all fitness values the species has had.
    pub fn fitness_history(&self) -> &[f32] {
        &self.fitness_history
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the population indices of the species' members.
    pub fn member_indices(&self) -> &[usize] {
        &self.members
    }

    /// Returns an iterator over the species' members.
    pub fn genomes<'a>(&'a self, population: &'a [G]) -> impl Iterator<Item = &'a G> + 'a {
        self.members.iter().map(move |&i| &population[i])
    }

    /// Returns the fitness values of the species' members.
    pub fn member_fitnesses<'a>(&'a self, population: &'a [G]) -> impl Iterator<Item = f32> + 'a {
        self.genomes(population).map(Genome::fitness)
    }

    /// Returns the currently best-performing genome.
    pub fn champion<'a>(&self, population: &'a [G]) -> Option<&'a G> {
        self.members
            .iter()
            .map(|&i| &population[i])
            .max_by(|g1, g2| g1.fitness().total_cmp(&g2.fitness()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestGenome;

    #[test]
    fn champion_and_fitnesses() {
        let genomes = vec![
            TestGenome::with_fitness(0, 5.0),
            TestGenome::with_fitness(1, 20.0),
            TestGenome::with_fitness(2, 10.0),
        ];
        let mut species = Species::new(SpeciesID(1, 0), 1, genomes[0].clone());
        species.update(genomes[0].clone(), vec![0, 1, 2]);

        assert_eq!(species.champion(&genomes).unwrap().key(), 1);
        assert_eq!(
            species.member_fitnesses(&genomes).collect::<Vec<_>>(),
            vec![5.0, 20.0, 10.0]
        );
        assert_eq!(species.len(), 3);
        assert_eq!(species.created(), 1);
    }

    #[test]
    fn empty_species_has_no_champion() {
        let genomes = vec![TestGenome::with_fitness(0, 1.0)];
        let species = Species::new(SpeciesID(0, 0), 0, genomes[0].clone());
        assert!(species.champion(&genomes).is_none());
        assert!(species.is_empty());
    }
}
