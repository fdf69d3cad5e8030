//! Evolves a controller for an environment and saves the winner.
use anyhow::Context;
use clap::Parser;
use neat_gym::environments::BridgeCommand;
use neat_gym::evolver::{config_path, EvolveOptions, Evolver, Method};
use tracing::info;

use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "neat-evolve")]
#[command(about = "Evolve NEAT, HyperNEAT or ES-HyperNEAT controllers for gym environments")]
struct Args {
    /// Environment id
    #[arg(long, default_value = "Pendulum-v1")]
    env: String,

    /// Evolution method: neat, hyper or eshyper
    #[arg(long, default_value = "neat")]
    method: Method,

    /// Configuration file, instead of looking one up in --cfgdir
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of configuration files
    #[arg(long, default_value = "./config")]
    cfgdir: PathBuf,

    /// Number of generations to run, instead of running until
    /// the fitness threshold is met
    #[arg(long)]
    ngen: Option<usize>,

    /// Episodes per genome evaluation, instead of [Gym] episode_reps
    #[arg(long)]
    reps: Option<NonZeroUsize>,

    /// Seed for the population and the episodes
    #[arg(long)]
    seed: Option<u64>,

    /// Save the network of each new best genome
    #[arg(long)]
    checkpoint: bool,

    /// Directory of saved models
    #[arg(long, default_value = "models")]
    models: PathBuf,

    /// Command of the environment bridge, e.g. "python3 gym_bridge.py"
    #[arg(long)]
    bridge: Option<BridgeCommand>,
}

fn main() -> anyhow::Result<()> {
    neat_gym::init_logging();
    let args = Args::parse();

    let path = args
        .config
        .unwrap_or_else(|| config_path(&args.cfgdir, &args.env, args.method));
    let options = EvolveOptions {
        method: args.method,
        reps: args.reps,
        seed: args.seed,
        bridge: args.bridge,
        checkpoint: args.checkpoint,
        models_dir: args.models,
    };
    let evolver = Evolver::load(&path, options).with_context(|| format!("loading {}", path.display()))?;
    if evolver.config().gym.environment != args.env {
        info!(
            "{} configures {}, not {}",
            path.display(),
            evolver.config().gym.environment,
            args.env
        );
    }

    let (winner, saved) = evolver.run(args.ngen)?;
    info!(
        "winner {} with fitness {:.6} ({} nodes, {} connections) saved to {}",
        winner.key(),
        winner.fitness(),
        winner.size().0,
        winner.size().1,
        saved.display()
    );
    Ok(())
}
