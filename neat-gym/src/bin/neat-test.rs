//! Runs a saved network for one episode of its environment.
use anyhow::Context;
use clap::Parser;
use neat_gym::environments::{make, BridgeCommand};
use neat_gym::eval::{eval_net, EvalOptions};
use neat_gym::model::SavedModel;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "neat-test")]
#[command(about = "Test a network saved by neat-evolve")]
struct Args {
    /// Saved model (.dat)
    filename: PathBuf,

    /// Do not render the episode
    #[arg(long)]
    nodisplay: bool,

    /// Seed of the episode
    #[arg(long)]
    seed: Option<u64>,

    /// Write the trajectory to this CSV file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Command of the environment bridge, e.g. "python3 gym_bridge.py"
    #[arg(long)]
    bridge: Option<BridgeCommand>,
}

fn main() -> anyhow::Result<()> {
    neat_gym::init_logging();
    let args = Args::parse();

    let mut model = SavedModel::load(&args.filename)?;
    let mut env = make(&model.environment, &model.wrappers, args.bridge.as_ref())
        .with_context(|| format!("making {}", model.environment))?;

    let options = EvalOptions {
        activations: model.activations,
        seed: args.seed,
        render: !args.nodisplay,
        report: true,
        csv: args.save.as_deref(),
        names: model.names.as_ref(),
        ..EvalOptions::default()
    };
    eval_net(&mut model.network, env.as_mut(), &options)?;
    Ok(())
}
