use crate::genomics::GenomeConfig;
use crate::{ConnectionKey, NodeKey};

use ahash::RandomState;
use neat_engine::InnovationHistory;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::HashMap;

/// A `History` keeps track of node innovations in a
/// population, so that identical node mutations
/// are assigned the same node key.
///
/// Node innovations are identified by the connection they
/// split. Connections need no separate record, as they are
/// identified by their endpoints. The record only spans one
/// generation: splits in later generations get fresh keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    next_node_key: NodeKey,
    node_innovations: HashMap<ConnectionKey, NodeKey, RandomState>,
}

impl InnovationHistory for History {
    type Config = GenomeConfig;

    fn new(config: &GenomeConfig) -> History {
        Self::new(config)
    }

    fn next_generation(&mut self) {
        self.node_innovations.clear();
    }
}

impl History {
    /// Creates a new History using the specified configuration.
    ///
    /// Keys `0..num_outputs` belong to the output nodes and
    /// the following `num_hidden` keys to the initial hidden
    /// nodes, so new nodes are numbered after them.
    ///
    /// # Examples
    /// ```
    /// use neat_cppn::genomics::{GenomeConfig, History};
    /// use std::num::NonZeroUsize;
    ///
    /// let history = History::new(&GenomeConfig {
    ///     num_outputs: NonZeroUsize::new(6).unwrap(),
    ///     num_hidden: 2,
    ///     ..GenomeConfig::zero()
    /// });
    ///
    /// assert_eq!(history.max_node_key(), 7);
    /// ```
    pub fn new(config: &GenomeConfig) -> History {
        History {
            next_node_key: (config.num_outputs.get() + config.num_hidden) as NodeKey,
            node_innovations: HashMap::default(),
        }
    }

    /// Returns the key of the node created by splitting
    /// `split`, registering a new innovation if needed.
    ///
    /// If the recorded node is already `present` in the
    /// mutating genome (it split the same connection before),
    /// a fresh key is assigned and replaces the record, so
    /// that genomes never hold duplicate nodes.
    pub(crate) fn node_for_split(
        &mut self,
        split: ConnectionKey,
        present: impl Fn(NodeKey) -> bool,
    ) -> NodeKey {
        match self.node_innovations.get(&split) {
            Some(&key) if !present(key) => key,
            _ => {
                let key = self.next_node_key;
                self.next_node_key += 1;
                self.node_innovations.insert(split, key);
                key
            }
        }
    }

    /// Returns the highest node key generated.
    pub fn max_node_key(&self) -> NodeKey {
        self.next_node_key - 1
    }

    /// Returns an iterator over the current generation's
    /// node innovations, in the format
    /// `(split connection, new node)`.
    /// No ordering is guaranteed.
    pub fn node_innovation_history(&self) -> impl Iterator<Item = (&ConnectionKey, &NodeKey)> {
        self.node_innovations.iter()
    }
}
