//! Genomes are the focus of evolution in NEAT.
//! A [`CppnGenome`] holds node genes for its output and hidden
//! nodes, and connection genes between any nodes (input nodes
//! are implicit). Genomes are instantiated as phenotypes
//! (neural networks) by the [`networks`](crate::networks) module.
mod activations;
mod attributes;
mod config;
mod errors;
mod genes;
mod history;

pub use activations::{ActivationFunction, AggregationFunction};
pub use attributes::{BoolAttributeConfig, ChoiceAttributeConfig, FloatAttributeConfig, InitType};
pub use config::{GenomeConfig, InitialConnection, StructuralMutationSurer};
pub use errors::{GenomeError, MutationError};
pub use genes::{ConnectionGene, NodeGene};
pub use history::History;

use crate::networks::graphs::creates_cycle;
use crate::{ConnectionKey, NodeKey};

use neat_engine::{Genome, GenomeKey};
use rand::prelude::{IteratorRandom, Rng, SliceRandom};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

/// A mutable collection of node and connection genes.
///
/// Genes are kept ordered by key, so that evolution
/// driven by a seeded random number generator is
/// reproducible.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CppnGenome {
    key: GenomeKey,
    nodes: BTreeMap<NodeKey, NodeGene>,
    connections: BTreeMap<ConnectionKey, ConnectionGene>,
    fitness: f32,
}

impl Genome for CppnGenome {
    type Config = GenomeConfig;
    type InnovationHistory = History;

    /// Creates a genome with output nodes, `num_hidden` hidden
    /// nodes and the configured initial connections.
    fn new<R: Rng + ?Sized>(
        key: GenomeKey,
        config: &GenomeConfig,
        _history: &mut History,
        rng: &mut R,
    ) -> CppnGenome {
        let mut genome = CppnGenome::empty(key);
        genome.configure_new(config, rng);
        genome
    }

    fn key(&self) -> GenomeKey {
        self.key
    }

    fn genetic_distance(first: &Self, second: &Self, config: &GenomeConfig) -> f32 {
        first.distance(second, config)
    }

    fn mate<R: Rng + ?Sized>(
        key: GenomeKey,
        parent1: &Self,
        parent2: &Self,
        history: &mut History,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Self {
        let mut child = CppnGenome::crossover(key, parent1, parent2, rng);
        child.mutate(config, history, rng);
        child
    }

    fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    fn fitness(&self) -> f32 {
        self.fitness
    }

    fn size(&self) -> (usize, usize) {
        CppnGenome::size(self)
    }
}

impl CppnGenome {
    /// Returns a genome without any genes.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::CppnGenome;
    ///
    /// let genome = CppnGenome::empty(0);
    /// assert_eq!(genome.size(), (0, 0));
    /// ```
    pub fn empty(key: GenomeKey) -> CppnGenome {
        CppnGenome {
            key,
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            fitness: 0.0,
        }
    }

    fn configure_new<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        for key in config.output_keys() {
            self.nodes.insert(key, NodeGene::new(key, config, rng));
        }
        let first_hidden = config.num_outputs.get() as NodeKey;
        for key in first_hidden..first_hidden + config.num_hidden as NodeKey {
            self.nodes.insert(key, NodeGene::new(key, config, rng));
        }

        let connections = match config.initial_connection {
            InitialConnection::Unconnected => vec![],
            InitialConnection::FsNeatNoHidden => self.fs_neat_connections(config, false, rng),
            InitialConnection::FsNeatHidden => self.fs_neat_connections(config, true, rng),
            InitialConnection::FullNoDirect => self.full_connections(config, false),
            InitialConnection::FullDirect => self.full_connections(config, true),
            InitialConnection::PartialNoDirect(p) => {
                self.partial_connections(config, false, p, rng)
            }
            InitialConnection::PartialDirect(p) => self.partial_connections(config, true, p, rng),
        };
        for key in connections {
            self.connections
                .insert(key, ConnectionGene::new(key, config, rng));
        }
    }

    /// Connections from one random input to every output,
    /// and to every hidden node if `hidden` is set.
    fn fs_neat_connections<R: Rng + ?Sized>(
        &self,
        config: &GenomeConfig,
        hidden: bool,
        rng: &mut R,
    ) -> Vec<ConnectionKey> {
        let input = match config.input_keys().choose(rng) {
            Some(input) => input,
            None => return vec![],
        };
        self.nodes
            .keys()
            .filter(|&&k| hidden || config.is_output(k))
            .map(|&k| (input, k))
            .collect()
    }

    fn full_connections(&self, config: &GenomeConfig, direct: bool) -> Vec<ConnectionKey> {
        let (output, hidden): (Vec<NodeKey>, Vec<NodeKey>) =
            self.nodes.keys().copied().partition(|&k| config.is_output(k));
        let mut connections = vec![];
        for i in config.input_keys() {
            connections.extend(hidden.iter().map(|&h| (i, h)));
        }
        for &h in &hidden {
            connections.extend(output.iter().map(|&o| (h, o)));
        }
        if direct || hidden.is_empty() {
            for i in config.input_keys() {
                connections.extend(output.iter().map(|&o| (i, o)));
            }
        }
        if !config.feed_forward {
            connections.extend(self.nodes.keys().map(|&k| (k, k)));
        }
        connections
    }

    fn partial_connections<R: Rng + ?Sized>(
        &self,
        config: &GenomeConfig,
        direct: bool,
        probability: f32,
        rng: &mut R,
    ) -> Vec<ConnectionKey> {
        let mut connections = self.full_connections(config, direct);
        connections.shuffle(rng);
        let count = (connections.len() as f32 * probability).round() as usize;
        connections.truncate(count);
        connections
    }

    /// Returns the child of two parents. The fitter parent
    /// (the second one on ties) supplies the structure, and
    /// genes present in both parents are crossed over.
    pub fn crossover<R: Rng + ?Sized>(
        key: GenomeKey,
        parent1: &CppnGenome,
        parent2: &CppnGenome,
        rng: &mut R,
    ) -> CppnGenome {
        let (fitter, other) = if parent1.fitness > parent2.fitness {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };

        let mut child = CppnGenome::empty(key);
        for (k, c1) in &fitter.connections {
            let gene = match other.connections.get(k) {
                Some(c2) => c1.crossover(c2, rng),
                None => c1.clone(),
            };
            child.connections.insert(*k, gene);
        }
        for (k, n1) in &fitter.nodes {
            let gene = match other.nodes.get(k) {
                Some(n2) => n1.crossover(n2, rng),
                None => n1.clone(),
            };
            child.nodes.insert(*k, gene);
        }
        child
    }

    /// Applies structural mutations according to their
    /// configured probabilities, then mutates every gene's
    /// attributes.
    ///
    /// With `single_structural_mutation`, at most one of the
    /// four structural mutations takes place.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        history: &mut History,
        rng: &mut R,
    ) {
        if config.single_structural_mutation {
            let div = (config.node_add_prob
                + config.node_delete_prob
                + config.conn_add_prob
                + config.conn_delete_prob)
                .max(1.0);
            let r = rng.gen::<f32>();
            if r < config.node_add_prob / div {
                let _ = self.mutate_add_node(config, history, rng);
            } else if r < (config.node_add_prob + config.node_delete_prob) / div {
                let _ = self.mutate_delete_node(config, rng);
            } else if r < (config.node_add_prob + config.node_delete_prob + config.conn_add_prob) / div
            {
                let _ = self.mutate_add_connection(config, rng);
            } else if r < (config.node_add_prob
                + config.node_delete_prob
                + config.conn_add_prob
                + config.conn_delete_prob)
                / div
            {
                let _ = self.mutate_delete_connection(rng);
            }
        } else {
            if rng.gen::<f32>() < config.node_add_prob {
                let _ = self.mutate_add_node(config, history, rng);
            }
            if rng.gen::<f32>() < config.node_delete_prob {
                let _ = self.mutate_delete_node(config, rng);
            }
            if rng.gen::<f32>() < config.conn_add_prob {
                let _ = self.mutate_add_connection(config, rng);
            }
            if rng.gen::<f32>() < config.conn_delete_prob {
                let _ = self.mutate_delete_connection(rng);
            }
        }

        for node in self.nodes.values_mut() {
            node.mutate(config, rng);
        }
        for connection in self.connections.values_mut() {
            connection.mutate(config, rng);
        }
    }

    /// Splits a random enabled connection `i -> o` by
    /// disabling it and adding a node `n` with connections
    /// `i -> n` (weight 1) and `n -> o` (the old weight).
    /// Returns the new node's key.
    ///
    /// # Errors
    /// Returns an error if there is no enabled connection. If
    /// structural mutations are [surer], a connection addition
    /// is attempted instead.
    ///
    /// [surer]: GenomeConfig::structural_mutation_surer
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{CppnGenome, GenomeConfig, History, InitialConnection};
    /// use neat_engine::Genome;
    ///
    /// let config = GenomeConfig {
    ///     initial_connection: InitialConnection::FullDirect,
    ///     feed_forward: true,
    ///     ..GenomeConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let mut genome = CppnGenome::new(0, &config, &mut history, &mut rng);
    ///
    /// let node = genome.mutate_add_node(&config, &mut history, &mut rng).unwrap();
    ///
    /// assert_eq!(genome.size(), (2, 2));
    /// assert!(!genome.connection((-1, 0)).unwrap().enabled);
    /// assert_eq!(genome.connection((-1, node)).unwrap().weight, 1.0);
    /// ```
    pub fn mutate_add_node<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        history: &mut History,
        rng: &mut R,
    ) -> Result<NodeKey, MutationError> {
        let split = self
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.key)
            .choose(rng);
        let split = match split {
            Some(split) => split,
            None => {
                if config.structural_mutation_surer() {
                    let _ = self.mutate_add_connection(config, rng);
                }
                return Err(MutationError::NoConnectionToSplit);
            }
        };

        let nodes = &self.nodes;
        let new_node = history.node_for_split(split, |k| nodes.contains_key(&k));
        let weight = match self.connections.get_mut(&split) {
            Some(connection) => {
                connection.enabled = false;
                connection.weight
            }
            None => return Err(MutationError::NoConnectionToSplit),
        };
        let (input, output) = split;

        self.nodes
            .insert(new_node, NodeGene::new(new_node, config, rng));
        self.connections.insert(
            (input, new_node),
            ConnectionGene {
                key: (input, new_node),
                weight: 1.0,
                enabled: true,
            },
        );
        self.connections.insert(
            (new_node, output),
            ConnectionGene {
                key: (new_node, output),
                weight,
                enabled: true,
            },
        );
        Ok(new_node)
    }

    /// Deletes a random hidden node and all of its connections.
    /// Returns the deleted node's key.
    ///
    /// # Errors
    /// Returns an error if the genome has no hidden nodes.
    pub fn mutate_delete_node<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Result<NodeKey, MutationError> {
        let key = self
            .nodes
            .keys()
            .copied()
            .filter(|&k| !config.is_output(k))
            .choose(rng)
            .ok_or(MutationError::NoHiddenNode)?;
        self.connections
            .retain(|&(input, output), _| input != key && output != key);
        self.nodes.remove(&key);
        Ok(key)
    }

    /// Adds a connection between a random node (input, hidden
    /// or output) and a random non-input node. Returns the
    /// new connection's key.
    ///
    /// # Errors
    /// Fails if the connection already exists (it is enabled
    /// instead when structural mutations are [surer]), joins
    /// two output nodes, or creates a cycle in a feed-forward
    /// genome.
    ///
    /// [surer]: GenomeConfig::structural_mutation_surer
    pub fn mutate_add_connection<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Result<ConnectionKey, MutationError> {
        let output = *self
            .nodes
            .keys()
            .choose(rng)
            .ok_or(MutationError::EmptyGenome)?;
        let input = self
            .nodes
            .keys()
            .copied()
            .chain(config.input_keys())
            .choose(rng)
            .ok_or(MutationError::EmptyGenome)?;
        let key = (input, output);

        if let Some(existing) = self.connections.get_mut(&key) {
            if config.structural_mutation_surer() {
                existing.enabled = true;
            }
            return Err(MutationError::DuplicateConnection(key));
        }
        if config.is_output(input) && config.is_output(output) {
            return Err(MutationError::OutputToOutput(key));
        }
        if config.feed_forward {
            let existing: Vec<ConnectionKey> = self.connections.keys().copied().collect();
            if creates_cycle(&existing, key) {
                return Err(MutationError::CreatesCycle(key));
            }
        }

        self.connections
            .insert(key, ConnectionGene::new(key, config, rng));
        Ok(key)
    }

    /// Deletes a random connection and returns its key.
    ///
    /// # Errors
    /// Returns an error if the genome has no connections.
    pub fn mutate_delete_connection<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<ConnectionKey, MutationError> {
        let key = *self
            .connections
            .keys()
            .choose(rng)
            .ok_or(MutationError::NoConnection)?;
        self.connections.remove(&key);
        Ok(key)
    }

    /// Inserts a node gene, replacing any node with the same key.
    pub fn add_node(&mut self, node: NodeGene) {
        self.nodes.insert(node.key, node);
    }

    /// Inserts a connection gene between existing nodes,
    /// replacing any connection with the same endpoints.
    ///
    /// # Errors
    /// Returns an error if the output node is not in the
    /// genome, or if the input node is neither in the genome
    /// nor an input key of `config`.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{CppnGenome, GenomeConfig, NodeGene};
    ///
    /// let config = GenomeConfig::zero();
    /// let mut genome = CppnGenome::empty(0);
    /// genome.add_node(NodeGene::new(0, &config, &mut rand::thread_rng()));
    ///
    /// assert!(genome.add_connection((-1, 0), 0.5, true, &config).is_ok());
    /// assert!(genome.add_connection((-1, 7), 0.5, true, &config).is_err());
    /// ```
    pub fn add_connection(
        &mut self,
        key: ConnectionKey,
        weight: f32,
        enabled: bool,
        config: &GenomeConfig,
    ) -> Result<(), MutationError> {
        let (input, output) = key;
        let input_exists = self.nodes.contains_key(&input) || config.input_keys().any(|k| k == input);
        if !input_exists || !self.nodes.contains_key(&output) {
            return Err(MutationError::NonexistentEndpoints(input, output));
        }
        self.connections.insert(
            key,
            ConnectionGene {
                key,
                weight,
                enabled,
            },
        );
        Ok(())
    }

    /// Genetic distance: the sum of a node and a connection
    /// term, each being `(Σ homologous gene distance +
    /// disjoint_coefficient × disjoint genes) / larger gene count`.
    pub fn distance(&self, other: &CppnGenome, config: &GenomeConfig) -> f32 {
        fn term<K: Ord, G>(
            own: &BTreeMap<K, G>,
            other: &BTreeMap<K, G>,
            distance: impl Fn(&G, &G) -> f32,
            disjoint_coefficient: f32,
        ) -> f32 {
            if own.is_empty() && other.is_empty() {
                return 0.0;
            }
            let mut disjoint = other.keys().filter(|k| !own.contains_key(k)).count();
            let mut homologous = 0.0;
            for (k, g1) in own {
                match other.get(k) {
                    Some(g2) => homologous += distance(g1, g2),
                    None => disjoint += 1,
                }
            }
            let max_size = own.len().max(other.len()) as f32;
            (homologous + disjoint_coefficient * disjoint as f32) / max_size
        }

        let disjoint = config.compatibility_disjoint_coefficient;
        term(&self.nodes, &other.nodes, |a, b| a.distance(b, config), disjoint)
            + term(
                &self.connections,
                &other.connections,
                |a, b| a.distance(b, config),
                disjoint,
            )
    }

    /// Returns the genome's key.
    pub fn key(&self) -> GenomeKey {
        self.key
    }

    /// Returns the genome's fitness.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Returns `(node count, enabled connection count)`.
    /// Input nodes are not counted.
    pub fn size(&self) -> (usize, usize) {
        (
            self.nodes.len(),
            self.connections.values().filter(|c| c.enabled).count(),
        )
    }

    /// Returns an iterator over the genome's node genes,
    /// ordered by key.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }

    /// Returns an iterator over the genome's connection genes,
    /// ordered by key.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionGene> {
        self.connections.values()
    }

    pub fn node(&self, key: NodeKey) -> Option<&NodeGene> {
        self.nodes.get(&key)
    }

    pub fn connection(&self, key: ConnectionKey) -> Option<&ConnectionGene> {
        self.connections.get(&key)
    }
}

impl fmt::Display for CppnGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Key: {}", self.key)?;
        writeln!(f, "Fitness: {}", self.fitness)?;
        writeln!(f, "Nodes:")?;
        for node in self.nodes.values() {
            writeln!(f, "\t{}", node)?;
        }
        write!(f, "Connections:")?;
        for connection in self.connections.values() {
            write!(f, "\n\t{}", connection)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use neat_engine::InnovationHistory;
    use rand::{rngs::StdRng, SeedableRng};
    use std::num::NonZeroUsize;

    fn config(inputs: usize, outputs: usize, hidden: usize) -> GenomeConfig {
        GenomeConfig {
            num_inputs: NonZeroUsize::new(inputs).unwrap(),
            num_outputs: NonZeroUsize::new(outputs).unwrap(),
            num_hidden: hidden,
            feed_forward: true,
            compatibility_disjoint_coefficient: 1.0,
            compatibility_weight_coefficient: 0.5,
            weight: FloatAttributeConfig {
                init_stdev: 1.0,
                max_value: 30.0,
                min_value: -30.0,
                mutate_power: 0.5,
                mutate_rate: 0.8,
                replace_rate: 0.1,
                ..FloatAttributeConfig::zero()
            },
            ..GenomeConfig::zero()
        }
    }

    fn create(config: &GenomeConfig, seed: u64) -> (CppnGenome, History, StdRng) {
        let mut history = History::new(config);
        let mut rng = StdRng::seed_from_u64(seed);
        let genome = CppnGenome::new(0, config, &mut history, &mut rng);
        (genome, history, rng)
    }

    fn connection_keys(genome: &CppnGenome) -> Vec<ConnectionKey> {
        genome.connections().map(|c| c.key).collect()
    }

    #[test]
    fn new_creates_output_and_hidden_nodes() {
        let (genome, _, _) = create(&config(3, 2, 2), 0);
        assert_eq!(
            genome.nodes().map(|n| n.key).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(genome.size(), (4, 0));
    }

    #[test]
    fn full_nodirect_goes_through_hidden() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullNoDirect,
            ..config(2, 1, 1)
        };
        let (genome, _, _) = create(&cfg, 0);
        assert_eq!(connection_keys(&genome), vec![(-2, 1), (-1, 1), (1, 0)]);
    }

    #[test]
    fn full_direct_adds_input_output_links() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            ..config(2, 1, 1)
        };
        let (genome, _, _) = create(&cfg, 0);
        assert_eq!(genome.size().1, 2 + 1 + 2);
        assert!(genome.connection((-1, 0)).is_some());
    }

    #[test]
    fn full_without_hidden_connects_inputs_to_outputs() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullNoDirect,
            ..config(5, 1, 0)
        };
        let (genome, _, _) = create(&cfg, 0);
        assert_eq!(genome.size(), (1, 5));
    }

    #[test]
    fn recurrent_full_connection_adds_self_loops() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            feed_forward: false,
            ..config(1, 2, 0)
        };
        let (genome, _, _) = create(&cfg, 0);
        assert!(genome.connection((0, 0)).is_some());
        assert!(genome.connection((1, 1)).is_some());
        assert_eq!(genome.size().1, 2 + 2);
    }

    #[test]
    fn fs_neat_uses_a_single_input() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FsNeatHidden,
            ..config(4, 2, 1)
        };
        let (genome, _, _) = create(&cfg, 3);
        let inputs: std::collections::BTreeSet<_> =
            genome.connections().map(|c| c.input()).collect();
        assert_eq!(inputs.len(), 1);
        assert_eq!(genome.size().1, 3);
    }

    #[test]
    fn partial_keeps_a_fraction() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::PartialDirect(0.5),
            ..config(4, 2, 0)
        };
        let (genome, _, _) = create(&cfg, 4);
        assert_eq!(genome.size().1, 4);
    }

    #[test]
    fn add_node_shares_innovations() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            ..config(1, 1, 0)
        };
        let (mut g1, mut history, mut rng) = create(&cfg, 5);
        let mut g2 = g1.clone();
        let n1 = g1.mutate_add_node(&cfg, &mut history, &mut rng).unwrap();
        let n2 = g2.mutate_add_node(&cfg, &mut history, &mut rng).unwrap();
        assert_eq!(n1, n2);
        assert_eq!(g1.connection((n1, 0)).unwrap().weight, g1.connection((-1, 0)).unwrap().weight);
    }

    #[test]
    fn add_node_without_connections_fails() {
        let (mut genome, mut history, mut rng) = create(&config(1, 1, 0), 6);
        assert_eq!(
            genome.mutate_add_node(&config(1, 1, 0), &mut history, &mut rng),
            Err(MutationError::NoConnectionToSplit)
        );
    }

    #[test]
    fn surer_add_node_falls_back_to_add_connection() {
        let cfg = GenomeConfig {
            structural_mutation_surer: StructuralMutationSurer::True,
            ..config(1, 1, 0)
        };
        let (mut genome, mut history, mut rng) = create(&cfg, 6);
        assert!(genome.mutate_add_node(&cfg, &mut history, &mut rng).is_err());
        // Input -> output is the only acyclic candidate; the
        // output self-loop is rejected in feed-forward genomes.
        assert!(genome.size().1 <= 1);
    }

    #[test]
    fn delete_node_never_removes_outputs() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullNoDirect,
            ..config(2, 2, 1)
        };
        let (mut genome, _, mut rng) = create(&cfg, 7);
        assert_eq!(genome.mutate_delete_node(&cfg, &mut rng), Ok(2));
        assert_eq!(genome.size(), (2, 0));
        assert_eq!(
            genome.mutate_delete_node(&cfg, &mut rng),
            Err(MutationError::NoHiddenNode)
        );
    }

    #[test]
    fn add_connection_respects_feed_forward() {
        let cfg = config(2, 2, 1);
        let (mut genome, _, mut rng) = create(&cfg, 8);
        for _ in 0..200 {
            let _ = genome.mutate_add_connection(&cfg, &mut rng);
        }
        let keys = connection_keys(&genome);
        assert!(!keys.is_empty());
        for &(i, o) in &keys {
            assert!(!(cfg.is_output(i) && cfg.is_output(o)));
            assert_ne!(i, o);
            let others: Vec<_> = keys.iter().copied().filter(|&k| k != (i, o)).collect();
            assert!(!creates_cycle(&others, (i, o)));
        }
    }

    #[test]
    fn delete_connection_empties_genome() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            ..config(2, 1, 0)
        };
        let (mut genome, _, mut rng) = create(&cfg, 9);
        assert!(genome.mutate_delete_connection(&mut rng).is_ok());
        assert!(genome.mutate_delete_connection(&mut rng).is_ok());
        assert_eq!(
            genome.mutate_delete_connection(&mut rng),
            Err(MutationError::NoConnection)
        );
    }

    #[test]
    fn crossover_takes_structure_from_fitter_parent() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            ..config(1, 1, 0)
        };
        let (mut fit, mut history, mut rng) = create(&cfg, 10);
        let mut weak = fit.clone();
        weak.mutate_add_node(&cfg, &mut history, &mut rng).unwrap();
        fit.set_fitness(2.0);
        weak.set_fitness(1.0);

        let child = CppnGenome::crossover(7, &weak, &fit, &mut rng);
        assert_eq!(child.key(), 7);
        assert_eq!(connection_keys(&child), connection_keys(&fit));
        assert_eq!(child.size().0, fit.size().0);
    }

    #[test]
    fn distance_of_identical_genomes_is_zero() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            ..config(3, 2, 0)
        };
        let (genome, _, _) = create(&cfg, 11);
        assert_eq!(genome.distance(&genome, &cfg), 0.0);
    }

    #[test]
    fn distance_counts_disjoint_genes() {
        let cfg = config(1, 1, 0);
        let mut a = CppnGenome::empty(0);
        let node = NodeGene {
            key: 0,
            bias: 0.0,
            response: 1.0,
            activation: ActivationFunction::Sigmoid,
            aggregation: AggregationFunction::Sum,
        };
        a.add_node(node.clone());
        let mut b = a.clone();
        a.add_connection((-1, 0), 1.0, true, &cfg).unwrap();
        b.add_node(NodeGene { key: 1, ..node });
        b.add_connection((-1, 1), 1.0, true, &cfg).unwrap();
        b.add_connection((1, 0), 1.0, true, &cfg).unwrap();

        // Nodes: 1 disjoint over 2; connections: 3 disjoint over 2.
        assert_eq!(CppnGenome::genetic_distance(&a, &b, &cfg), 0.5 + 1.5);
    }

    #[test]
    fn mating_is_reproducible() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            node_add_prob: 0.5,
            conn_add_prob: 0.5,
            ..config(3, 2, 0)
        };
        let run = || {
            let (parent, mut history, mut rng) = create(&cfg, 12);
            CppnGenome::mate(1, &parent, &parent, &mut history, &cfg, &mut rng)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn single_structural_mutation_adds_at_most_one_node() {
        let cfg = GenomeConfig {
            initial_connection: InitialConnection::FullDirect,
            single_structural_mutation: true,
            node_add_prob: 1.0,
            conn_add_prob: 1.0,
            ..config(2, 2, 0)
        };
        let (mut genome, mut history, mut rng) = create(&cfg, 13);
        let before = genome.size().0;
        genome.mutate(&cfg, &mut history, &mut rng);
        assert!(genome.size().0 <= before + 1);
    }
}
