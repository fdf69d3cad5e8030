//! # neat-cppn
//! The default genome implementation of `neat-engine`'s [`Genome`] trait:
//! node and connection genes whose attributes (bias, response, weight,
//! activation and aggregation functions) are drawn from configurable
//! distributions, in the manner of neat-python's `DefaultGenome`.
//!
//! A [`CppnGenome`] can be expressed as one of two phenotypes:
//! - [`FeedForwardNetwork`]: evaluates the nodes required for the outputs
//!   layer by layer, once per activation.
//! - [`RecurrentNetwork`]: propagates every connection by one step per
//!   activation, allowing cycles.
//!
//! [`Genome`]: neat_engine::Genome
//! [`CppnGenome`]: crate::genomics::CppnGenome
//! [`FeedForwardNetwork`]: crate::networks::FeedForwardNetwork
//! [`RecurrentNetwork`]: crate::networks::RecurrentNetwork
//!
//! # Example usage: evaluating a fully-connected genome
//! ```
//! use neat_cppn::genomics::{CppnGenome, GenomeConfig, History, InitialConnection};
//! use neat_cppn::networks::{FeedForwardNetwork, Network};
//! use neat_engine::{Genome, InnovationHistory};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::num::NonZeroUsize;
//!
//! let config = GenomeConfig {
//!     num_inputs: NonZeroUsize::new(2).unwrap(),
//!     num_outputs: NonZeroUsize::new(1).unwrap(),
//!     initial_connection: InitialConnection::FullDirect,
//!     feed_forward: true,
//!     ..GenomeConfig::zero()
//! };
//! let mut history = History::new(&config);
//! let mut rng = StdRng::seed_from_u64(0);
//! let genome = CppnGenome::new(0, &config, &mut history, &mut rng);
//!
//! // Zero-valued attributes: every weight and bias is 0,
//! // so the sigmoid output sits at its midpoint.
//! let mut network = FeedForwardNetwork::create(&genome, &config);
//! assert_eq!(network.activate(&[1.0, -1.0]).unwrap(), vec![0.5]);
//! ```

pub mod genomics;
pub mod networks;

/// Identifier of a node within a genome. Input nodes
/// have negative keys, output nodes are numbered from 0,
/// and hidden nodes follow the outputs.
pub type NodeKey = i64;

/// Identifier of a connection: its `(input, output)` node pair.
pub type ConnectionKey = (NodeKey, NodeKey);
