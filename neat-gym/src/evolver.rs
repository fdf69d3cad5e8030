//! Evolution of controllers for an environment, with one
//! of three encodings of networks in `neat-cppn` genomes.
use crate::config::{ConfigError, GymConfig, GymSection, IniDocument, Layout};
use crate::environments::{make, BridgeCommand, EnvError, Environment};
use crate::eval::{eval_net, EvalError, EvalOptions};
use crate::model::{ModelError, Phenotype, SavedModel};

use hyperneat::{EsNetwork, HyperNeatError, DEFAULT_MAX_WEIGHT};
use neat_cppn::genomics::{CppnGenome, GenomeConfig, History};
use neat_cppn::networks::{FeedForwardNetwork, Network, RecurrentNetwork};
use neat_engine::reporting::{Reporter, ReporterSet, ReportingLevel, StatisticsReporter, StdOutReporter};
use neat_engine::{EvolutionError, Population, Species};
use thiserror::Error;
use tracing::{error, info};

use std::fmt;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

/// How a genome encodes its network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// The genome's own network (NEAT).
    Neat,
    /// A CPPN connecting the fixed layers of a substrate (HyperNEAT).
    Hyper,
    /// A CPPN whose weight pattern also places the
    /// hidden nodes of a substrate (ES-HyperNEAT).
    EsHyper,
}

impl Method {
    /// Extension of the method's configuration files.
    pub fn extension(self) -> &'static str {
        match self {
            Method::Neat => "neat",
            Method::Hyper => "hyper",
            Method::EsHyper => "eshyper",
        }
    }

    /// Network sizes of the genomes, for an environment
    /// with `observations` inputs and `actions` outputs.
    pub fn layout(self, observations: usize, actions: usize) -> Layout {
        match self {
            Method::Neat => Layout::new(observations, actions),
            Method::Hyper | Method::EsHyper => Layout::CPPN,
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neat" => Ok(Method::Neat),
            "hyper" => Ok(Method::Hyper),
            "eshyper" => Ok(Method::EsHyper),
            other => Err(format!("unknown method {:?}, expected neat, hyper or eshyper", other)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Path of the configuration file for `environment` in `cfgdir`:
/// the lower-cased id up to its version, without a `NoFrameskip`
/// or `Deterministic` suffix, with the method's extension.
///
/// # Examples
/// ```
/// use neat_gym::evolver::{config_path, Method};
/// use std::path::Path;
///
/// assert_eq!(
///     config_path(Path::new("config"), "SpaceInvadersNoFrameskip-v4", Method::EsHyper),
///     Path::new("config/spaceinvaders.eshyper")
/// );
/// assert_eq!(
///     config_path(Path::new("config"), "CartPole-v1", Method::Neat),
///     Path::new("config/cartpole.neat")
/// );
/// ```
pub fn config_path(cfgdir: &Path, environment: &str, method: Method) -> PathBuf {
    let name = environment.to_lowercase();
    let mut stem = name.split('-').next().unwrap_or_default();
    for suffix in ["noframeskip", "deterministic"] {
        stem = stem.strip_suffix(suffix).unwrap_or(stem);
    }
    cfgdir.join(format!("{}.{}", stem, method.extension()))
}

/// An error type indicating a failed evolution run.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    HyperNeat(#[from] HyperNeatError),
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
    #[error(transparent)]
    Model(#[from] ModelError),
    /// A network does not fit the environment.
    #[error("{network} has {found} {kind} but {environment} needs {expected}")]
    SizeMismatch {
        network: &'static str,
        kind: &'static str,
        found: usize,
        expected: usize,
        environment: String,
    },
    #[error("cannot create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Settings of an evolution run that do not come
/// from the configuration file.
#[derive(Clone, Debug)]
pub struct EvolveOptions {
    pub method: Method,
    /// Episodes per fitness evaluation, overriding `[Gym] episode_reps`.
    pub reps: Option<NonZeroUsize>,
    /// Seeds the population and, offset by the episode
    /// number, every evaluation episode.
    pub seed: Option<u64>,
    pub bridge: Option<BridgeCommand>,
    /// Saves every new best network during the run.
    pub checkpoint: bool,
    /// Directory of saved models.
    pub models_dir: PathBuf,
}

impl EvolveOptions {
    pub fn new(method: Method) -> EvolveOptions {
        EvolveOptions {
            method,
            reps: None,
            seed: None,
            bridge: None,
            checkpoint: false,
            models_dir: PathBuf::from("models"),
        }
    }
}

/// Evolves genomes against the environment of a configuration.
pub struct Evolver {
    config: GymConfig,
    options: EvolveOptions,
    reps: NonZeroUsize,
    /// First evaluation failure of the current run.
    failure: Mutex<Option<EvolveError>>,
}

impl Evolver {
    /// Loads the configuration file at `path`, sizing the genomes
    /// after the environment it names when the method needs it.
    pub fn load<P: AsRef<Path>>(path: P, options: EvolveOptions) -> Result<Evolver, EvolveError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = IniDocument::parse(&text).map_err(ConfigError::from)?;
        let layout = match options.method {
            Method::Neat => {
                let gym = GymSection::read(&document)?;
                let mut env = make(&gym.environment, &gym.wrappers, options.bridge.as_ref())?;
                let layout = options
                    .method
                    .layout(env.observation_size(), env.action_space().size());
                env.close()?;
                layout
            }
            method => method.layout(0, 0),
        };
        Evolver::new(GymConfig::from_document(document, layout)?, options)
    }

    /// Checks that the networks of `options.method` fit the
    /// configured environment.
    pub fn new(config: GymConfig, options: EvolveOptions) -> Result<Evolver, EvolveError> {
        let mut env = make(&config.gym.environment, &config.gym.wrappers, options.bridge.as_ref())?;
        let observations = env.observation_size();
        let actions = env.action_space().size();
        env.close()?;

        let check = |network: &'static str, kind: &'static str, found: usize, expected: usize| {
            if found == expected {
                Ok(())
            } else {
                Err(EvolveError::SizeMismatch {
                    network,
                    kind,
                    found,
                    expected,
                    environment: config.gym.environment.clone(),
                })
            }
        };
        match options.method {
            Method::Neat => {
                check("the genome", "inputs", config.genome.num_inputs.get(), observations)?;
                check("the genome", "outputs", config.genome.num_outputs.get(), actions)?;
            }
            Method::Hyper | Method::EsHyper => {
                if options.method == Method::EsHyper {
                    config.require_es()?;
                }
                let substrate = config.require_substrate()?;
                check("the substrate", "inputs", substrate.input_count(), observations)?;
                check("the substrate", "outputs", substrate.output_count(), actions)?;
                check("the CPPN", "inputs", config.genome.num_inputs.get(), Layout::CPPN.num_inputs)?;
            }
        }

        Ok(Evolver {
            reps: options.reps.unwrap_or(config.gym.episode_reps),
            config,
            options,
            failure: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &GymConfig {
        &self.config
    }

    pub fn options(&self) -> &EvolveOptions {
        &self.options
    }

    /// Builds the network `genome` encodes, and the number
    /// of activations it needs per environment step.
    ///
    /// # Errors
    /// Returns an error if a CPPN cannot be queried.
    pub fn phenotype(&self, genome: &CppnGenome) -> Result<(Phenotype, usize), EvolveError> {
        let genome_config = &self.config.genome;
        match self.options.method {
            Method::Neat if genome_config.feed_forward => Ok((
                Phenotype::FeedForward(FeedForwardNetwork::create(genome, genome_config)),
                1,
            )),
            Method::Neat => Ok((
                Phenotype::Recurrent(RecurrentNetwork::create(genome, genome_config)),
                1,
            )),
            Method::Hyper => {
                let substrate = self.config.require_substrate()?;
                let max_weight = self.config.es.map_or(DEFAULT_MAX_WEIGHT, |es| es.max_weight);
                let mut cppn = FeedForwardNetwork::create(genome, genome_config);
                let network = substrate.layered_network(&mut cppn, max_weight)?;
                Ok((Phenotype::Recurrent(network), substrate.activations()))
            }
            Method::EsHyper => {
                let substrate = self.config.require_substrate()?;
                let params = *self.config.require_es()?;
                let mut cppn = FeedForwardNetwork::create(genome, genome_config);
                let network = EsNetwork::new(substrate, &mut cppn, params).create_phenotype_network()?;
                Ok((Phenotype::Recurrent(network), params.activations()))
            }
        }
    }

    /// Fitness of `genome`: its mean reward over the configured
    /// number of episodes. Each episode runs in a fresh environment.
    pub fn eval_genome(&self, genome: &CppnGenome) -> Result<f32, EvolveError> {
        let (mut network, activations) = self.phenotype(genome)?;
        let gym = &self.config.gym;
        let mut total = 0.0;
        for rep in 0..self.reps.get() {
            network.reset();
            let mut env = make(&gym.environment, &gym.wrappers, self.options.bridge.as_ref())?;
            let options = EvalOptions {
                activations,
                seed: self.options.seed.map(|seed| seed.wrapping_add(rep as u64)),
                max_episode_steps: gym.max_episode_steps.map(NonZeroUsize::get),
                ..EvalOptions::default()
            };
            total += eval_net(&mut network, env.as_mut(), &options)?.0;
        }
        Ok(total / self.reps.get() as f32)
    }

    /// Evaluation as a fitness function: failures are logged,
    /// kept for [`run`](Evolver::run) to return, and scored NaN,
    /// which stops the population.
    fn fitness(&self, genome: &CppnGenome) -> f32 {
        match self.eval_genome(genome) {
            Ok(fitness) => fitness,
            Err(e) => {
                error!("evaluation of genome {} failed: {}", genome.key(), e);
                if let Ok(mut failure) = self.failure.lock() {
                    failure.get_or_insert(e);
                }
                f32::NAN
            }
        }
    }

    /// Saves the network of `genome` to the models directory
    /// and returns the file's path.
    pub fn save(&self, genome: &CppnGenome) -> Result<PathBuf, EvolveError> {
        let (network, activations) = self.phenotype(genome)?;
        let environment = &self.config.gym.environment;
        let model = SavedModel {
            network,
            environment: environment.clone(),
            wrappers: self.config.gym.wrappers.clone(),
            activations,
            names: self.config.names.clone(),
        };
        let path = self
            .options
            .models_dir
            .join(SavedModel::file_name(environment, genome.fitness()));
        model.save(&path)?;
        Ok(path)
    }

    /// Evolves a population for up to `generations` generations
    /// (or until the fitness threshold is met), then saves the
    /// best genome's network. Returns the genome and the path
    /// of its saved network.
    ///
    /// # Errors
    /// Returns an error if an evaluation fails, the population
    /// goes extinct, or a model cannot be saved.
    pub fn run(&self, generations: Option<usize>) -> Result<(CppnGenome, PathBuf), EvolveError> {
        let models_dir = &self.options.models_dir;
        fs::create_dir_all(models_dir).map_err(|source| EvolveError::Io {
            path: models_dir.clone(),
            source,
        })?;

        let population_config = self.config.population.clone();
        let genome_config = self.config.genome.clone();
        let mut population: Population<GenomeConfig, History, CppnGenome> = match self.options.seed {
            Some(seed) => Population::with_seed(population_config, genome_config, seed),
            None => Population::new(population_config, genome_config),
        };
        info!(
            "evolving {} genomes ({}) on {} with {} episode(s) each",
            population.genomes().count(),
            self.options.method,
            self.config.gym.environment,
            self.reps
        );

        let mut stdout = StdOutReporter::new(false);
        let mut statistics = StatisticsReporter::new(ReportingLevel::NoGenomes);
        let mut saver = SaveReporter::new(self);
        let mut reporters = ReporterSet::new();
        reporters.add(&mut stdout);
        reporters.add(&mut statistics);
        if self.options.checkpoint {
            reporters.add(&mut saver);
        }

        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
        let result = population.run(&|genome: &CppnGenome| self.fitness(genome), generations, &mut reporters);
        drop(reporters);
        let winner = match result {
            Ok(winner) => winner,
            Err(e) => {
                let failure = self.failure.lock().ok().and_then(|mut f| f.take());
                return Err(failure.unwrap_or(EvolveError::Evolution(e)));
            }
        };

        info!("mean fitness by generation: {:?}", statistics.fitness_mean());
        let path = self.save(&winner)?;
        info!("saved winner with fitness {} to {}", winner.fitness(), path.display());
        Ok((winner, path))
    }
}

/// Saves the network of each new best genome.
struct SaveReporter<'a> {
    evolver: &'a Evolver,
    best: Option<f32>,
}

impl<'a> SaveReporter<'a> {
    fn new(evolver: &'a Evolver) -> SaveReporter<'a> {
        SaveReporter { evolver, best: None }
    }
}

impl Reporter<CppnGenome> for SaveReporter<'_> {
    fn post_evaluate(
        &mut self,
        _generation: usize,
        _population: &[CppnGenome],
        _species: &[Species<CppnGenome>],
        best: &CppnGenome,
    ) {
        if self.best.map_or(true, |b| best.fitness() > b) {
            self.best = Some(best.fitness());
            info!("saving new best {:.6}", best.fitness());
            if let Err(e) = self.evolver.save(best) {
                error!("saving genome {} failed: {}", best.key(), e);
            }
        }
    }
}
