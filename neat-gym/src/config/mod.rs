//! Configuration files in the neat-python format, extended with
//! the `[Gym]`, `[Substrate]`, `[ES]` and `[Names]` sections.
//!
//! A file is first parsed into an [`IniDocument`], then each
//! section is read into the typed configuration of the crate
//! that consumes it: [`PopulationConfig`] for `neat-engine`,
//! [`GenomeConfig`] for `neat-cppn`, [`Substrate`] and
//! [`EsParams`] for `hyperneat`.
//!
//! # Examples
//! ```
//! use neat_gym::config::{GymConfig, Layout};
//!
//! let text = "
//! [NEAT]
//! fitness_criterion = max
//! fitness_threshold = 100
//! pop_size = 50
//! reset_on_extinction = False
//!
//! [Gym]
//! environment = CartPole-v1
//!
//! [DefaultGenome]
//! activation_default = sigmoid
//! activation_mutate_rate = 0.0
//! activation_options = sigmoid
//! aggregation_default = sum
//! aggregation_mutate_rate = 0.0
//! aggregation_options = sum
//! bias_init_mean = 0.0
//! bias_init_stdev = 1.0
//! bias_max_value = 30.0
//! bias_min_value = -30.0
//! bias_mutate_power = 0.5
//! bias_mutate_rate = 0.7
//! bias_replace_rate = 0.1
//! compatibility_disjoint_coefficient = 1.0
//! compatibility_weight_coefficient = 0.5
//! conn_add_prob = 0.5
//! conn_delete_prob = 0.5
//! enabled_default = True
//! enabled_mutate_rate = 0.01
//! feed_forward = True
//! initial_connection = full_direct
//! node_add_prob = 0.2
//! node_delete_prob = 0.2
//! num_hidden = 0
//! response_init_mean = 1.0
//! response_init_stdev = 0.0
//! response_max_value = 30.0
//! response_min_value = -30.0
//! response_mutate_power = 0.0
//! response_mutate_rate = 0.0
//! response_replace_rate = 0.0
//! weight_init_mean = 0.0
//! weight_init_stdev = 1.0
//! weight_max_value = 30
//! weight_min_value = -30
//! weight_mutate_power = 0.5
//! weight_mutate_rate = 0.8
//! weight_replace_rate = 0.1
//!
//! [DefaultSpeciesSet]
//! compatibility_threshold = 3.0
//!
//! [DefaultStagnation]
//! species_fitness_func = max
//! max_stagnation = 20
//!
//! [DefaultReproduction]
//! elitism = 2
//! survival_threshold = 0.2
//! ";
//!
//! // CartPole observes 4 values and chooses between 2 actions.
//! let config = GymConfig::parse(text, Layout::new(4, 2)).unwrap();
//! assert_eq!(config.population.size.get(), 50);
//! assert_eq!(config.genome.num_inputs.get(), 4);
//! assert_eq!(config.gym.environment, "CartPole-v1");
//! assert!(config.substrate.is_none());
//! ```
mod errors;
mod ini;
mod literal;
mod sections;

pub use errors::{ConfigError, IniError};
pub use ini::{IniDocument, IniSection};
pub use literal::{evaluate, LiteralError, Value};

use sections::{parse_bool, SectionReader};

use hyperneat::{EsParams, Substrate, CPPN_INPUTS, DEFAULT_MAX_WEIGHT};
use neat_cppn::genomics::{
    ActivationFunction, AggregationFunction, BoolAttributeConfig, ChoiceAttributeConfig,
    FloatAttributeConfig, GenomeConfig, InitType, InitialConnection, StructuralMutationSurer,
};
use neat_engine::{
    FitnessCriterion, PopulationConfig, ReproductionConfig, SpeciesConfig, StagnationConfig,
};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

const NEAT: &str = "NEAT";
const GYM: &str = "Gym";
const SUBSTRATE: &str = "Substrate";
const ES: &str = "ES";
const GENOME: &str = "DefaultGenome";
const SPECIES_SET: &str = "DefaultSpeciesSet";
const STAGNATION: &str = "DefaultStagnation";
const REPRODUCTION: &str = "DefaultReproduction";
const NAMES: &str = "Names";

const FLOAT_ATTRIBUTES: [&str; 3] = ["bias", "response", "weight"];
const FLOAT_KEYS: [&str; 8] = [
    "init_mean",
    "init_stdev",
    "init_type",
    "max_value",
    "min_value",
    "mutate_power",
    "mutate_rate",
    "replace_rate",
];
const GENOME_KEYS: [&str; 23] = [
    "activation_default",
    "activation_mutate_rate",
    "activation_options",
    "aggregation_default",
    "aggregation_mutate_rate",
    "aggregation_options",
    "compatibility_disjoint_coefficient",
    "compatibility_weight_coefficient",
    "conn_add_prob",
    "conn_delete_prob",
    "enabled_default",
    "enabled_mutate_rate",
    "enabled_rate_to_false_add",
    "enabled_rate_to_true_add",
    "feed_forward",
    "initial_connection",
    "node_add_prob",
    "node_delete_prob",
    "num_hidden",
    "num_inputs",
    "num_outputs",
    "single_structural_mutation",
    "structural_mutation_surer",
];
const MAX_STAGNATION: NonZeroUsize = match NonZeroUsize::new(15) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Network input and output counts supplied by the caller,
/// used when `[DefaultGenome]` leaves them out.
///
/// A count of 0 means the file must state it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    pub num_inputs: usize,
    pub num_outputs: usize,
}

impl Layout {
    /// The inputs `(x1, y1, x2, y2, bias)` and single
    /// weight output of a HyperNEAT CPPN.
    pub const CPPN: Layout = Layout {
        num_inputs: CPPN_INPUTS,
        num_outputs: 1,
    };

    pub const fn new(num_inputs: usize, num_outputs: usize) -> Layout {
        Layout {
            num_inputs,
            num_outputs,
        }
    }
}

/// The `[Gym]` section: which environment to evaluate
/// genomes on, and how.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GymSection {
    /// Environment id, e.g. `CartPole-v1`.
    pub environment: String,
    /// Episodes averaged into each fitness value.
    pub episode_reps: NonZeroUsize,
    pub max_episode_steps: Option<NonZeroUsize>,
    /// Wrapper paths applied by the environment bridge.
    pub wrappers: Vec<String>,
}

impl GymSection {
    /// Reads the `[Gym]` section alone, before the rest
    /// of the document can be sized.
    pub fn read(document: &IniDocument) -> Result<GymSection, ConfigError> {
        gym_section(document)
    }
}

/// The `[Names]` section: labels of the network inputs and outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Names {
    pub input: Vec<String>,
    pub output: Vec<String>,
}

/// A loaded and validated configuration file.
#[derive(Clone, Debug, PartialEq)]
pub struct GymConfig {
    pub population: PopulationConfig,
    pub genome: GenomeConfig,
    pub gym: GymSection,
    pub substrate: Option<Substrate>,
    pub es: Option<EsParams>,
    pub names: Option<Names>,
    document: IniDocument,
}

impl GymConfig {
    /// Reads and validates the configuration file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid
    /// INI text, lacks a required section or key, holds a value
    /// of the wrong type or range, or holds an unknown key.
    pub fn load<P: AsRef<Path>>(path: P, layout: Layout) -> Result<GymConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        GymConfig::parse(&text, layout)
    }

    /// Parses and validates configuration text.
    pub fn parse(text: &str, layout: Layout) -> Result<GymConfig, ConfigError> {
        GymConfig::from_document(text.parse()?, layout)
    }

    /// Validates a parsed document.
    pub fn from_document(document: IniDocument, layout: Layout) -> Result<GymConfig, ConfigError> {
        let population = population_config(&document)?;
        let genome = genome_config(&document, layout)?;
        let gym = gym_section(&document)?;
        let substrate = match SectionReader::optional(&document, SUBSTRATE) {
            Some(section) => Some(substrate(&section)?),
            None => None,
        };
        let es = match SectionReader::optional(&document, ES) {
            Some(section) => Some(es_params(&section)?),
            None => None,
        };
        let names = match SectionReader::optional(&document, NAMES) {
            Some(section) => Some(names(&section)?),
            None => None,
        };

        if let Some(names) = &names {
            let (inputs, outputs) = match &substrate {
                Some(substrate) => (substrate.input_count(), substrate.output_count()),
                None => (genome.num_inputs.get(), genome.num_outputs.get()),
            };
            for (kind, labels, nodes) in [("input", &names.input, inputs), ("output", &names.output, outputs)] {
                if labels.len() != nodes {
                    return Err(ConfigError::NameCountMismatch {
                        kind,
                        names: labels.len(),
                        nodes,
                    });
                }
            }
        }

        Ok(GymConfig {
            population,
            genome,
            gym,
            substrate,
            es,
            names,
            document,
        })
    }

    /// The `[Substrate]` section, required by HyperNEAT methods.
    pub fn require_substrate(&self) -> Result<&Substrate, ConfigError> {
        self.substrate
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection(SUBSTRATE.to_string()))
    }

    /// The `[ES]` section, required by ES-HyperNEAT.
    pub fn require_es(&self) -> Result<&EsParams, ConfigError> {
        self.es
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection(ES.to_string()))
    }

    /// The document the configuration was read from.
    pub fn document(&self) -> &IniDocument {
        &self.document
    }
}

impl fmt::Display for GymConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document)
    }
}

fn population_config(document: &IniDocument) -> Result<PopulationConfig, ConfigError> {
    const CRITERIA: &str = "max, min, mean or median";

    let neat = SectionReader::new(document, NEAT)?;
    neat.reject_unknown(&[
        "fitness_criterion",
        "fitness_threshold",
        "no_fitness_termination",
        "pop_size",
        "reset_on_extinction",
    ])?;
    let species_set = SectionReader::new(document, SPECIES_SET)?;
    species_set.reject_unknown(&["compatibility_threshold"])?;
    let stagnation = SectionReader::new(document, STAGNATION)?;
    stagnation.reject_unknown(&["species_fitness_func", "max_stagnation", "species_elitism"])?;
    let reproduction = SectionReader::new(document, REPRODUCTION)?;
    reproduction.reject_unknown(&["elitism", "survival_threshold", "min_species_size"])?;

    Ok(PopulationConfig {
        size: neat.positive("pop_size")?,
        fitness_criterion: neat.parse::<FitnessCriterion>("fitness_criterion", CRITERIA)?,
        fitness_threshold: neat.float("fitness_threshold")?,
        no_fitness_termination: neat.boolean_or("no_fitness_termination", false)?,
        reset_on_extinction: neat.boolean("reset_on_extinction")?,
        species: SpeciesConfig {
            compatibility_threshold: species_set.float_where(
                "compatibility_threshold",
                "a positive number",
                |t| t > 0.0,
            )?,
        },
        stagnation: StagnationConfig {
            species_fitness_func: stagnation.parse_or(
                "species_fitness_func",
                FitnessCriterion::Mean,
                CRITERIA,
            )?,
            max_stagnation: stagnation.positive_or("max_stagnation", MAX_STAGNATION)?,
            species_elitism: stagnation.count_or("species_elitism", 0)?,
        },
        reproduction: ReproductionConfig {
            elitism: reproduction.count_or("elitism", 0)?,
            survival_threshold: match reproduction.get("survival_threshold") {
                Some(_) => reproduction.float_where(
                    "survival_threshold",
                    "a fraction in (0, 1]",
                    |t| t > 0.0 && t <= 1.0,
                )?,
                None => 0.2,
            },
            min_species_size: reproduction.positive_or("min_species_size", NonZeroUsize::MIN)?,
        },
    })
}

fn gym_section(document: &IniDocument) -> Result<GymSection, ConfigError> {
    let gym = SectionReader::new(document, GYM)?;
    gym.reject_unknown(&["environment", "episode_reps", "max_episode_steps", "wrappers"])?;

    let environment = gym.required("environment")?;
    if environment.is_empty() || environment.contains(char::is_whitespace) {
        return Err(gym.invalid("environment", environment, "an environment id"));
    }
    let max_episode_steps = match gym.get("max_episode_steps") {
        Some(_) => Some(gym.positive("max_episode_steps")?),
        None => None,
    };

    Ok(GymSection {
        environment: environment.to_string(),
        episode_reps: gym.positive_or("episode_reps", NonZeroUsize::MIN)?,
        max_episode_steps,
        wrappers: gym
            .get("wrappers")
            .map(|w| w.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

fn substrate(section: &SectionReader) -> Result<Substrate, ConfigError> {
    section.reject_unknown(&["input", "hidden", "output", "function"])?;

    let hidden = match section.get("hidden") {
        Some(_) => {
            let value = section.literal("hidden")?;
            let layers = value
                .items()
                .ok_or_else(|| section.invalid("hidden", &value.to_string(), "a list of layers"))?;
            if !layers.is_empty() && layers.iter().all(|item| item.as_point().is_some()) {
                // A flat list of points is a single layer.
                vec![section.point_list("hidden", &value)?]
            } else {
                layers
                    .iter()
                    .map(|layer| section.point_list("hidden", layer))
                    .collect::<Result<_, _>>()?
            }
        }
        None => vec![],
    };

    let substrate = Substrate {
        inputs: section.points("input")?,
        hidden,
        outputs: section.points("output")?,
        activation: section.parse_or("function", ActivationFunction::Sigmoid, "an activation function name")?,
    };
    for (key, points) in [("input", &substrate.inputs), ("output", &substrate.outputs)] {
        if points.is_empty() {
            return Err(section.invalid(key, "[]", "at least one point"));
        }
    }
    Ok(substrate)
}

fn es_params(section: &SectionReader) -> Result<EsParams, ConfigError> {
    const MAX_DEPTH: usize = 12;

    section.reject_unknown(&[
        "initial_depth",
        "max_depth",
        "variance_threshold",
        "band_threshold",
        "iteration_level",
        "division_threshold",
        "max_weight",
        "activation",
    ])?;

    let params = EsParams {
        initial_depth: section.count("initial_depth")?,
        max_depth: section.count("max_depth")?,
        variance_threshold: section.float_where("variance_threshold", "a non-negative number", |v| v >= 0.0)?,
        band_threshold: section.float_where("band_threshold", "a non-negative number", |v| v >= 0.0)?,
        iteration_level: section.count("iteration_level")?,
        division_threshold: section.float_where("division_threshold", "a non-negative number", |v| v >= 0.0)?,
        max_weight: match section.get("max_weight") {
            Some(_) => section.float_where("max_weight", "a positive number", |w| w > 0.0)?,
            None => DEFAULT_MAX_WEIGHT,
        },
        activation: section.parse_or("activation", ActivationFunction::Sigmoid, "an activation function name")?,
    };
    if params.max_depth > MAX_DEPTH {
        return Err(section.invalid(
            "max_depth",
            &params.max_depth.to_string(),
            format!("at most {}", MAX_DEPTH),
        ));
    }
    if params.initial_depth > params.max_depth {
        return Err(section.invalid(
            "initial_depth",
            &params.initial_depth.to_string(),
            format!("at most max_depth ({})", params.max_depth),
        ));
    }
    Ok(params)
}

fn names(section: &SectionReader) -> Result<Names, ConfigError> {
    section.reject_unknown(&["input", "output"])?;
    Ok(Names {
        input: section.strings("input")?,
        output: section.strings("output")?,
    })
}

fn genome_config(document: &IniDocument, layout: Layout) -> Result<GenomeConfig, ConfigError> {
    let section = SectionReader::new(document, GENOME)?;
    let known: Vec<String> = GENOME_KEYS
        .iter()
        .map(|k| k.to_string())
        .chain(
            FLOAT_ATTRIBUTES
                .iter()
                .flat_map(|a| FLOAT_KEYS.iter().map(move |k| format!("{}_{}", a, k))),
        )
        .collect();
    section.reject_unknown(&known)?;

    let size = |key: &str, fallback: usize| match section.get(key) {
        Some(_) => section.positive(key),
        None => NonZeroUsize::new(fallback).ok_or_else(|| ConfigError::MissingKey {
            section: GENOME.to_string(),
            key: key.to_string(),
        }),
    };

    Ok(GenomeConfig {
        num_inputs: size("num_inputs", layout.num_inputs)?,
        num_outputs: size("num_outputs", layout.num_outputs)?,
        num_hidden: section.count("num_hidden")?,
        feed_forward: section.boolean("feed_forward")?,
        initial_connection: section.parse_or::<InitialConnection>(
            "initial_connection",
            InitialConnection::Unconnected,
            "an initial connection scheme",
        )?,
        compatibility_disjoint_coefficient: section.float_where(
            "compatibility_disjoint_coefficient",
            "a non-negative number",
            |c| c >= 0.0,
        )?,
        compatibility_weight_coefficient: section.float_where(
            "compatibility_weight_coefficient",
            "a non-negative number",
            |c| c >= 0.0,
        )?,
        conn_add_prob: section.probability("conn_add_prob")?,
        conn_delete_prob: section.probability("conn_delete_prob")?,
        node_add_prob: section.probability("node_add_prob")?,
        node_delete_prob: section.probability("node_delete_prob")?,
        single_structural_mutation: section.boolean_or("single_structural_mutation", false)?,
        structural_mutation_surer: section.parse_or::<StructuralMutationSurer>(
            "structural_mutation_surer",
            StructuralMutationSurer::Default,
            "default, true or false",
        )?,
        activation: choice_attribute::<ActivationFunction>(&section, "activation")?,
        aggregation: choice_attribute::<AggregationFunction>(&section, "aggregation")?,
        bias: float_attribute(&section, "bias")?,
        response: float_attribute(&section, "response")?,
        weight: float_attribute(&section, "weight")?,
        enabled: bool_attribute(&section, "enabled")?,
    })
}

fn float_attribute(section: &SectionReader, name: &str) -> Result<FloatAttributeConfig, ConfigError> {
    let key = |suffix: &str| format!("{}_{}", name, suffix);
    let config = FloatAttributeConfig {
        init_mean: section.float(&key("init_mean"))?,
        init_stdev: section.float_where(&key("init_stdev"), "a non-negative number", |s| s >= 0.0)?,
        init_type: section.parse_or::<InitType>(&key("init_type"), InitType::Gaussian, "gaussian or uniform")?,
        max_value: section.float(&key("max_value"))?,
        min_value: section.float(&key("min_value"))?,
        mutate_power: section.float_where(&key("mutate_power"), "a non-negative number", |p| p >= 0.0)?,
        mutate_rate: section.probability(&key("mutate_rate"))?,
        replace_rate: section.probability(&key("replace_rate"))?,
    };
    if config.min_value > config.max_value {
        return Err(section.invalid(
            &key("min_value"),
            &config.min_value.to_string(),
            format!("at most {} ({})", key("max_value"), config.max_value),
        ));
    }
    Ok(config)
}

fn bool_attribute(section: &SectionReader, name: &str) -> Result<BoolAttributeConfig, ConfigError> {
    let key = |suffix: &str| format!("{}_{}", name, suffix);
    let default_key = key("default");
    let default = section.required(&default_key)?;
    let default = match default.to_lowercase().as_str() {
        "random" | "none" => None,
        _ => Some(
            parse_bool(default)
                .ok_or_else(|| section.invalid(&default_key, default, "a boolean, random or none"))?,
        ),
    };

    Ok(BoolAttributeConfig {
        default,
        mutate_rate: section.probability(&key("mutate_rate"))?,
        rate_to_true_add: section.probability_or(&key("rate_to_true_add"), 0.0)?,
        rate_to_false_add: section.probability_or(&key("rate_to_false_add"), 0.0)?,
    })
}

/// Reads `<name>_options`, `<name>_default` and `<name>_mutate_rate`.
/// The default must be `random`, `none` or one of the options.
fn choice_attribute<T>(section: &SectionReader, name: &str) -> Result<ChoiceAttributeConfig<T>, ConfigError>
where
    T: FromStr + PartialEq,
{
    let options_key = format!("{}_options", name);
    let default_key = format!("{}_default", name);

    let raw_options = section.required(&options_key)?;
    let options = raw_options
        .split_whitespace()
        .map(|option| {
            option
                .parse::<T>()
                .map_err(|_| section.invalid(&options_key, raw_options, format!("{} function names", name)))
        })
        .collect::<Result<Vec<T>, _>>()?;
    if options.is_empty() {
        return Err(section.invalid(&options_key, raw_options, format!("at least one {} function", name)));
    }

    let raw_default = section.required(&default_key)?;
    let default = match raw_default.to_lowercase().as_str() {
        "random" | "none" => None,
        _ => {
            let expected = || format!("random, none or one of {}", options_key);
            let value = raw_default
                .parse::<T>()
                .map_err(|_| section.invalid(&default_key, raw_default, expected()))?;
            if !options.contains(&value) {
                return Err(section.invalid(&default_key, raw_default, expected()));
            }
            Some(value)
        }
    };

    Ok(ChoiceAttributeConfig {
        default,
        options,
        mutate_rate: section.probability(&format!("{}_mutate_rate", name))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "
[NEAT]
fitness_criterion      = max
fitness_threshold      = 1000
pop_size               = 20
reset_on_extinction    = True
no_fitness_termination = yes

[Gym]
environment = Pendulum-v1
episode_reps = 3
max_episode_steps = 200

[Substrate]
input  = [(x, -1.) for x in (-1., 0., 1.)]
hidden = [[(-0.5, 0.), (0.5, 0.)]]
output = [(0., 1.)]
function = tanh

[ES]
initial_depth      = 1
max_depth          = 2
variance_threshold = 0.03
band_threshold     = 0.3
iteration_level    = 1
division_threshold = 0.5
max_weight         = 3.0
activation         = sigmoid

[DefaultGenome]
activation_default      = random
activation_mutate_rate  = 0.1
activation_options      = sigmoid sin gauss
aggregation_default     = sum
aggregation_mutate_rate = 0.0
aggregation_options     = sum
bias_init_mean          = 0.0
bias_init_stdev         = 1.0
bias_init_type          = uniform
bias_max_value          = 30.0
bias_min_value          = -30.0
bias_mutate_power       = 0.5
bias_mutate_rate        = 0.7
bias_replace_rate       = 0.1
compatibility_disjoint_coefficient = 1.0
compatibility_weight_coefficient   = 0.5
conn_add_prob           = 0.5
conn_delete_prob        = 0.5
enabled_default         = True
enabled_mutate_rate     = 0.01
feed_forward            = True
initial_connection      = partial_direct 0.5
node_add_prob           = 0.2
node_delete_prob        = 0.2
num_hidden              = 0
response_init_mean      = 1.0
response_init_stdev     = 0.0
response_max_value      = 30.0
response_min_value      = -30.0
response_mutate_power   = 0.0
response_mutate_rate    = 0.0
response_replace_rate   = 0.0
weight_init_mean        = 0.0
weight_init_stdev       = 1.0
weight_max_value        = 30
weight_min_value        = -30
weight_mutate_power     = 0.5
weight_mutate_rate      = 0.8
weight_replace_rate     = 0.1

[DefaultSpeciesSet]
compatibility_threshold = 3.0

[DefaultStagnation]
species_fitness_func = max
max_stagnation       = 20
species_elitism      = 2

[DefaultReproduction]
elitism            = 2
survival_threshold = 0.2
min_species_size   = 2

[Names]
input  = ['cos', 'sin', 'dtheta']
output = ['torque']
";

    fn with_entry(section: &str, key: &str, value: &str) -> Result<GymConfig, ConfigError> {
        let mut document: IniDocument = CONFIG.parse().unwrap();
        document.section_mut(section).set(key, value);
        GymConfig::from_document(document, Layout::CPPN)
    }

    fn without_entry(section: &str, key: &str) -> Result<GymConfig, ConfigError> {
        let document: IniDocument = CONFIG.parse().unwrap();
        let mut stripped = IniDocument::new();
        for s in document.sections() {
            let target = stripped.section_mut(s.name());
            for (k, v) in s.entries().filter(|(k, _)| !(s.name() == section && *k == key)) {
                target.set(k, v);
            }
        }
        GymConfig::from_document(stripped, Layout::CPPN)
    }

    #[test]
    fn typed_sections() {
        let config = GymConfig::parse(CONFIG, Layout::CPPN).unwrap();

        assert_eq!(config.population.size.get(), 20);
        assert!(config.population.no_fitness_termination);
        assert!(config.population.reset_on_extinction);
        assert_eq!(config.population.stagnation.species_elitism, 2);
        assert_eq!(config.population.reproduction.min_species_size.get(), 2);

        assert_eq!(config.gym.environment, "Pendulum-v1");
        assert_eq!(config.gym.episode_reps.get(), 3);
        assert_eq!(config.gym.max_episode_steps.map(NonZeroUsize::get), Some(200));
        assert!(config.gym.wrappers.is_empty());

        let substrate = config.require_substrate().unwrap();
        assert_eq!(substrate.inputs, vec![(-1.0, -1.0), (0.0, -1.0), (1.0, -1.0)]);
        assert_eq!(substrate.hidden, vec![vec![(-0.5, 0.0), (0.5, 0.0)]]);
        assert_eq!(substrate.activation, ActivationFunction::Tanh);

        let es = config.require_es().unwrap();
        assert_eq!((es.initial_depth, es.max_depth, es.iteration_level), (1, 2, 1));
        assert_eq!(es.max_weight, 3.0);

        assert_eq!(config.genome.num_inputs.get(), 5);
        assert_eq!(config.genome.num_outputs.get(), 1);
        assert_eq!(config.genome.activation.default, None);
        assert_eq!(config.genome.activation.options.len(), 3);
        assert_eq!(config.genome.aggregation.default, Some(AggregationFunction::Sum));
        assert_eq!(config.genome.bias.init_type, InitType::Uniform);
        assert_eq!(config.genome.weight.init_type, InitType::Gaussian);
        assert_eq!(config.genome.initial_connection, InitialConnection::PartialDirect(0.5));
        assert_eq!(config.genome.enabled.default, Some(true));
        assert_eq!(config.genome.enabled.rate_to_true_add, 0.0);

        let names = config.names.as_ref().unwrap();
        assert_eq!(names.output, vec!["torque"]);
    }

    #[test]
    fn file_sizes_win_over_layout() {
        let config = with_entry(GENOME, "num_inputs", "7").unwrap();
        assert_eq!(config.genome.num_inputs.get(), 7);
        assert_eq!(config.genome.num_outputs.get(), 1);

        let document: IniDocument = CONFIG.parse().unwrap();
        assert!(matches!(
            GymConfig::from_document(document, Layout::default()),
            Err(ConfigError::MissingKey { key, .. }) if key == "num_inputs"
        ));
    }

    #[test]
    fn optional_sections_and_defaults() {
        let document: IniDocument = CONFIG.parse().unwrap();
        let mut stripped = IniDocument::new();
        for section in document
            .sections()
            .filter(|s| ![SUBSTRATE, ES, NAMES].contains(&s.name()))
        {
            *stripped.section_mut(section.name()) = section.clone();
        }
        let config = GymConfig::from_document(stripped, Layout::new(3, 1)).unwrap();

        assert!(config.substrate.is_none());
        assert!(matches!(config.require_es(), Err(ConfigError::MissingSection(s)) if s == ES));
        assert!(matches!(
            config.require_substrate(),
            Err(ConfigError::MissingSection(s)) if s == SUBSTRATE
        ));

        let config = without_entry(GYM, "episode_reps").unwrap();
        assert_eq!(config.gym.episode_reps.get(), 1);
        let config = without_entry(NEAT, "no_fitness_termination").unwrap();
        assert!(!config.population.no_fitness_termination);
        let config = without_entry(SUBSTRATE, "hidden").unwrap();
        assert!(config.require_substrate().unwrap().hidden.is_empty());
        let config = without_entry(ES, "max_weight").unwrap();
        assert_eq!(config.require_es().unwrap().max_weight, DEFAULT_MAX_WEIGHT);
    }

    #[test]
    fn flat_hidden_list_is_one_layer() {
        let config = with_entry(SUBSTRATE, "hidden", "[(0, 0), (1, 0)]").unwrap();
        assert_eq!(config.substrate.unwrap().hidden, vec![vec![(0.0, 0.0), (1.0, 0.0)]]);
        let config = with_entry(SUBSTRATE, "hidden", "[[(0, 0)], [(0, .5)]]").unwrap();
        assert_eq!(config.substrate.unwrap().hidden.len(), 2);
        assert!(matches!(
            with_entry(SUBSTRATE, "hidden", "[[(0, 0, 0)]]"),
            Err(ConfigError::InvalidValue { key, .. }) if key == "hidden"
        ));
    }

    #[test]
    fn missing_sections_and_keys() {
        for section in [NEAT, GYM, GENOME, SPECIES_SET, STAGNATION, REPRODUCTION] {
            let document: IniDocument = CONFIG.parse().unwrap();
            let mut stripped = IniDocument::new();
            for s in document.sections().filter(|s| s.name() != section) {
                *stripped.section_mut(s.name()) = s.clone();
            }
            assert!(matches!(
                GymConfig::from_document(stripped, Layout::CPPN),
                Err(ConfigError::MissingSection(s)) if s == section
            ));
        }
        for (section, key) in [
            (NEAT, "pop_size"),
            (GYM, "environment"),
            (GENOME, "weight_mutate_rate"),
            (GENOME, "activation_options"),
            (SUBSTRATE, "input"),
            (ES, "band_threshold"),
            (NAMES, "output"),
        ] {
            assert!(matches!(
                without_entry(section, key),
                Err(ConfigError::MissingKey { section: s, key: k }) if s == section && k == key
            ));
        }
    }

    #[test]
    fn invalid_values() {
        for (section, key, value) in [
            (NEAT, "pop_size", "0"),
            (NEAT, "fitness_criterion", "best"),
            (NEAT, "reset_on_extinction", "perhaps"),
            (SPECIES_SET, "compatibility_threshold", "0"),
            (REPRODUCTION, "survival_threshold", "0"),
            (GENOME, "conn_add_prob", "1.5"),
            (GENOME, "weight_min_value", "31"),
            (GENOME, "activation_default", "relu"),
            (GENOME, "aggregation_options", "sum nothing"),
            (GENOME, "initial_connection", "partial_direct 2"),
            (GENOME, "enabled_default", "sometimes"),
            (ES, "initial_depth", "3"),
            (ES, "max_weight", "-1"),
            (SUBSTRATE, "function", "sigmoidal"),
            (SUBSTRATE, "output", "[]"),
            (GYM, "max_episode_steps", "0"),
        ] {
            assert!(
                matches!(
                    with_entry(section, key, value),
                    Err(ConfigError::InvalidValue { key: k, .. }) if k == key
                ),
                "{} = {} in [{}] should be rejected",
                key,
                value,
                section
            );
        }
        assert!(matches!(
            with_entry(SUBSTRATE, "input", "[(0, 0)"),
            Err(ConfigError::Literal { key, .. }) if key == "input"
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        for section in [NEAT, GYM, SUBSTRATE, ES, GENOME, STAGNATION, NAMES] {
            assert!(matches!(
                with_entry(section, "colour", "blue"),
                Err(ConfigError::UnknownKey { section: s, key }) if s == section && key == "colour"
            ));
        }
    }

    #[test]
    fn names_must_label_every_node() {
        assert!(matches!(
            with_entry(NAMES, "input", "['cos', 'sin']"),
            Err(ConfigError::NameCountMismatch { kind: "input", names: 2, nodes: 3 })
        ));
        assert!(matches!(
            with_entry(NAMES, "output", "['left', 'right']"),
            Err(ConfigError::NameCountMismatch { kind: "output", names: 2, nodes: 1 })
        ));
    }

    #[test]
    fn document_round_trips() {
        let config = GymConfig::parse(CONFIG, Layout::CPPN).unwrap();
        let reloaded = GymConfig::parse(&config.to_string(), Layout::CPPN).unwrap();
        assert_eq!(reloaded, config);
    }
}
