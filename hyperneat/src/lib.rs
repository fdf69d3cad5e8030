//! # hyperneat
//! Indirect encodings for `neat-cppn` genomes: a genome's network
//! is treated as a CPPN (compositional pattern producing network)
//! and queried for the weight of every candidate connection between
//! points of a 2-D [`Substrate`].
//!
//! - HyperNEAT ([`Substrate::layered_network`]) connects a fixed,
//!   layered arrangement of nodes.
//! - ES-HyperNEAT ([`EsNetwork`]) discovers the hidden nodes itself,
//!   by a quadtree search for regions of high weight variance.
//!
//! # Example usage: a HyperNEAT phenotype
//! ```
//! use hyperneat::{Substrate, DEFAULT_MAX_WEIGHT};
//! use neat_cppn::genomics::{ActivationFunction, CppnGenome, GenomeConfig, History, InitialConnection};
//! use neat_cppn::networks::{FeedForwardNetwork, Network};
//! use neat_engine::{Genome, InnovationHistory};
//! use std::num::NonZeroUsize;
//!
//! let cppn_config = GenomeConfig {
//!     num_inputs: NonZeroUsize::new(5).unwrap(),
//!     initial_connection: InitialConnection::FullDirect,
//!     feed_forward: true,
//!     ..GenomeConfig::zero()
//! };
//! let mut rng = rand::thread_rng();
//! let genome = CppnGenome::new(0, &cppn_config, &mut History::new(&cppn_config), &mut rng);
//! let mut cppn = FeedForwardNetwork::create(&genome, &cppn_config);
//!
//! let substrate = Substrate {
//!     inputs: vec![(-1.0, -1.0), (1.0, -1.0)],
//!     hidden: vec![vec![(0.0, 0.0)]],
//!     outputs: vec![(0.0, 1.0)],
//!     activation: ActivationFunction::Sigmoid,
//! };
//! let mut network = substrate.layered_network(&mut cppn, DEFAULT_MAX_WEIGHT).unwrap();
//!
//! for _ in 0..substrate.activations() {
//!     network.activate(&[0.5, -0.5]).unwrap();
//! }
//! ```

mod errors;
pub mod es;
mod query;
mod substrate;

pub use errors::HyperNeatError;
pub use es::{EsNetwork, EsParams};
pub use query::{query_cppn, CPPN_INPUTS};
pub use substrate::{Point, Substrate};

/// Weight magnitude of a maximal CPPN output, unless
/// configured otherwise.
pub const DEFAULT_MAX_WEIGHT: f32 = 5.0;
