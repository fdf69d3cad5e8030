use crate::config::Names;

use neat_cppn::networks::{FeedForwardNetwork, Network, NetworkError, RecurrentNetwork};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// An error type indicating a model that
/// cannot be saved or loaded.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot serialize model: {0}")]
    Serialize(#[from] ron::Error),
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::Error,
    },
}

/// The network evolved by one of the methods: a genome's
/// own network for NEAT, a substrate network for HyperNEAT.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Phenotype {
    FeedForward(FeedForwardNetwork),
    Recurrent(RecurrentNetwork),
}

impl Network for Phenotype {
    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        match self {
            Phenotype::FeedForward(net) => net.activate(inputs),
            Phenotype::Recurrent(net) => net.activate(inputs),
        }
    }

    fn reset(&mut self) {
        match self {
            Phenotype::FeedForward(net) => net.reset(),
            Phenotype::Recurrent(net) => net.reset(),
        }
    }

    fn input_count(&self) -> usize {
        match self {
            Phenotype::FeedForward(net) => net.input_count(),
            Phenotype::Recurrent(net) => net.input_count(),
        }
    }

    fn output_count(&self) -> usize {
        match self {
            Phenotype::FeedForward(net) => net.output_count(),
            Phenotype::Recurrent(net) => net.output_count(),
        }
    }
}

/// A trained network together with what is
/// needed to run it again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub network: Phenotype,
    /// Id of the environment the network was evolved on.
    pub environment: String,
    /// Wrappers the bridge applied to the environment.
    #[serde(default)]
    pub wrappers: Vec<String>,
    /// Network activations per environment step.
    pub activations: usize,
    pub names: Option<Names>,
}

impl SavedModel {
    /// File name of a model: the environment id
    /// followed by the fitness, e.g. `CartPole-v1+500.000.dat`.
    pub fn file_name(environment: &str, fitness: f32) -> String {
        format!("{}{:+.3}.dat", environment, fitness)
    }

    /// Writes the model to `path` in RON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<SavedModel, ModelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
