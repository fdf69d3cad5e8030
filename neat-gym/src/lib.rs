//! # neat-gym
//! Evolves controllers for episodic Gym-style environments with
//! NEAT, HyperNEAT or ES-HyperNEAT, driven by `neat-python` style
//! INI configuration files.
//!
//! - [`config`] reads and validates a configuration file, including
//!   the `[Gym]`, `[Substrate]`, `[ES]` and `[Names]` sections.
//! - [`environments`] simulates `CartPole` and `Pendulum`, and reaches
//!   any other environment through an external bridge process.
//! - [`eval`] runs a network for one episode.
//! - [`evolver`] evolves a population and saves the winner as a
//!   [`model::SavedModel`].
//!
//! The `neat-evolve` and `neat-test` binaries wrap the evolver
//! and the evaluation of a saved model.
//!
//! # Example usage: a short CartPole run
//! ```no_run
//! use neat_gym::evolver::{config_path, EvolveOptions, Evolver, Method};
//! use std::path::Path;
//!
//! let path = config_path(Path::new("config"), "CartPole-v1", Method::Neat);
//! let options = EvolveOptions {
//!     seed: Some(0),
//!     ..EvolveOptions::new(Method::Neat)
//! };
//! let evolver = Evolver::load(path, options).unwrap();
//! let (winner, saved) = evolver.run(Some(20)).unwrap();
//! println!("fitness {} saved to {}", winner.fitness(), saved.display());
//! ```

pub mod config;
pub mod environments;
pub mod eval;
pub mod evolver;
pub mod model;

use tracing_subscriber::{fmt, EnvFilter};

/// Logs to the terminal, filtered by `RUST_LOG`
/// (by default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}
