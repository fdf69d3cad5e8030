use neat_engine::FitnessCriterion;
use neat_gym::config::{GymConfig, IniDocument, Layout};
use neat_gym::environments::EnvError;
use neat_gym::evolver::{config_path, EvolveError, EvolveOptions, Evolver, Method};

use std::path::{Path, PathBuf};

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

fn load(environment: &str, method: Method, layout: Layout) -> GymConfig {
    let path = config_path(&config_dir(), environment, method);
    GymConfig::load(&path, layout).unwrap()
}

#[test]
fn space_invaders_sections() {
    let config = load("SpaceInvadersNoFrameskip-v4", Method::EsHyper, Layout::CPPN);

    let sections: Vec<&str> = config.document().sections().map(|s| s.name()).collect();
    assert_eq!(
        sections,
        [
            "NEAT",
            "Gym",
            "Substrate",
            "ES",
            "DefaultGenome",
            "DefaultSpeciesSet",
            "DefaultStagnation",
            "DefaultReproduction",
            "Names"
        ]
    );

    assert_eq!(config.population.size.get(), 150);
    assert_eq!(config.population.fitness_criterion, FitnessCriterion::Max);
    assert!(config.population.species.compatibility_threshold > 0.0);
    assert_eq!(config.gym.environment, "SpaceInvadersNoFrameskip-v4");
    assert_eq!(config.gym.episode_reps.get(), 3);
    assert_eq!(config.gym.wrappers.len(), 1);
    assert_eq!(config.genome.num_inputs.get(), 5);
    assert_eq!(config.genome.num_outputs.get(), 1);
    assert!(config.genome.feed_forward);

    let es = config.require_es().unwrap();
    assert_eq!(es.activations(), 5);
    assert!(es.initial_depth <= es.max_depth);
}

#[test]
fn space_invaders_names_label_the_substrate() {
    let config = load("SpaceInvadersNoFrameskip-v4", Method::EsHyper, Layout::CPPN);
    let substrate = config.require_substrate().unwrap();
    let names = config.names.as_ref().unwrap();

    assert_eq!(substrate.input_count(), 3);
    assert_eq!(substrate.output_count(), 6);
    assert_eq!(names.input.len(), 3);
    assert_eq!(names.output, ["NOOP", "FIRE", "RIGHT", "LEFT", "RIGHTFIRE", "LEFTFIRE"]);

    // Outputs are spread evenly along the top edge.
    let xs: Vec<f32> = substrate.outputs.iter().map(|&(x, _)| x).collect();
    assert!((xs[0] + 1.0).abs() < 1e-6 && (xs[5] - 1.0).abs() < 1e-6);
    assert!(substrate.outputs.iter().all(|&(_, y)| y == 1.0));
}

#[test]
fn shipped_files_round_trip() {
    for (environment, method, layout) in [
        ("SpaceInvadersNoFrameskip-v4", Method::EsHyper, Layout::CPPN),
        ("CartPole-v1", Method::Neat, Layout::new(4, 2)),
        ("Pendulum-v1", Method::Hyper, Layout::CPPN),
    ] {
        let config = load(environment, method, layout);
        let text = config.to_string();

        let document: IniDocument = text.parse().unwrap();
        assert_eq!(&document, config.document());
        assert_eq!(GymConfig::parse(&text, layout).unwrap(), config);
    }
}

#[test]
fn native_environments_load_through_the_evolver() {
    let options = EvolveOptions::new(Method::Neat);
    let evolver = Evolver::load(config_path(&config_dir(), "CartPole-v1", Method::Neat), options).unwrap();
    assert_eq!(evolver.config().genome.num_inputs.get(), 4);
    assert_eq!(evolver.config().genome.num_outputs.get(), 2);

    let options = EvolveOptions::new(Method::Hyper);
    let evolver = Evolver::load(config_path(&config_dir(), "Pendulum-v1", Method::Hyper), options).unwrap();
    assert_eq!(evolver.config().require_substrate().unwrap().activations(), 3);
}

#[test]
fn atari_needs_a_bridge() {
    let path = config_path(&config_dir(), "SpaceInvadersNoFrameskip-v4", Method::EsHyper);
    assert!(matches!(
        Evolver::load(path, EvolveOptions::new(Method::EsHyper)),
        Err(EvolveError::Env(EnvError::Unknown(id))) if id == "SpaceInvadersNoFrameskip-v4"
    ));
}
