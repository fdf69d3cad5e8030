//! Episodic control environments with the Gym interface:
//! `reset` to a start state, then `step` with an action until
//! the episode terminates or is truncated.
//!
//! The classic-control problems `CartPole` and `Pendulum` are
//! simulated natively. Every other environment id is served by an
//! external [bridge process](BridgeEnvironment).
mod bridge;
mod cartpole;
mod pendulum;

pub use bridge::{BridgeCommand, BridgeEnvironment};
pub use cartpole::CartPole;
pub use pendulum::Pendulum;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use std::io;

/// The actions an environment accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSpace {
    /// One of `n` actions, numbered from 0.
    Discrete(usize),
    /// A vector of values, each in `[-high[i], high[i]]`.
    Continuous { high: Vec<f32> },
}

impl ActionSpace {
    /// Number of network outputs needed to choose an action.
    pub fn size(&self) -> usize {
        match self {
            ActionSpace::Discrete(n) => *n,
            ActionSpace::Continuous { high } => high.len(),
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, ActionSpace::Discrete(_))
    }
}

/// An action taken in an environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Discrete(usize),
    Continuous(Vec<f32>),
}

/// The outcome of a single step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f32,
    /// The episode reached a terminal state.
    pub terminated: bool,
    /// The episode was cut short, e.g. by a time limit.
    pub truncated: bool,
}

/// An error type indicating a failure to create
/// or interact with an environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("unknown environment {0:?} (other environments need a bridge command)")]
    Unknown(String),
    #[error("invalid action {action:?} for action space {space:?}")]
    InvalidAction { action: Action, space: ActionSpace },
    #[error("step called before reset")]
    NotReset,
    #[error("bridge error: {0}")]
    Bridge(String),
    #[error("malformed bridge reply: {0}")]
    Protocol(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An episodic environment.
pub trait Environment {
    /// Length of the flattened observation vector.
    fn observation_size(&self) -> usize;

    fn action_space(&self) -> ActionSpace;

    /// Starts a new episode and returns its first observation.
    /// A seed reseeds the environment's random generator; without
    /// one the generator carries on from the previous episode.
    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, EnvError>;

    fn step(&mut self, action: &Action) -> Result<Step, EnvError>;

    fn render(&mut self) -> Result<(), EnvError> {
        Ok(())
    }

    /// Releases any resources held by the environment.
    fn close(&mut self) -> Result<(), EnvError> {
        Ok(())
    }
}

/// Creates the environment called `id`.
///
/// `CartPole-v0`, `CartPole-v1`, `Pendulum-v0` and `Pendulum-v1`
/// are simulated natively unless `wrappers` are requested and a
/// `bridge` is available. Any other id needs a `bridge`.
///
/// # Examples
/// ```
/// use neat_gym::environments::{make, ActionSpace};
///
/// let env = make("CartPole-v1", &[], None).unwrap();
/// assert_eq!(env.observation_size(), 4);
/// assert_eq!(env.action_space(), ActionSpace::Discrete(2));
/// assert!(make("SpaceInvadersNoFrameskip-v4", &[], None).is_err());
/// ```
pub fn make(
    id: &str,
    wrappers: &[String],
    bridge: Option<&BridgeCommand>,
) -> Result<Box<dyn Environment>, EnvError> {
    if let (Some(bridge), false) = (bridge, wrappers.is_empty()) {
        return Ok(Box::new(BridgeEnvironment::spawn(bridge, id, wrappers)?));
    }
    let native: Option<Box<dyn Environment>> = match id {
        "CartPole-v0" => Some(Box::new(CartPole::new(200))),
        "CartPole-v1" => Some(Box::new(CartPole::new(500))),
        "Pendulum-v0" | "Pendulum-v1" => Some(Box::new(Pendulum::new(200))),
        _ => None,
    };
    match (native, bridge) {
        (Some(env), _) => {
            if !wrappers.is_empty() {
                warn!("ignoring wrappers {:?} of native environment {}", wrappers, id);
            }
            Ok(env)
        }
        (None, Some(bridge)) => Ok(Box::new(BridgeEnvironment::spawn(bridge, id, wrappers)?)),
        (None, None) => Err(EnvError::Unknown(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_environments() {
        for (id, inputs, space) in [
            ("CartPole-v0", 4, ActionSpace::Discrete(2)),
            ("CartPole-v1", 4, ActionSpace::Discrete(2)),
            ("Pendulum-v0", 3, ActionSpace::Continuous { high: vec![2.0] }),
            ("Pendulum-v1", 3, ActionSpace::Continuous { high: vec![2.0] }),
        ] {
            let env = make(id, &["Wrapper".to_string()], None).unwrap();
            assert_eq!(env.observation_size(), inputs);
            assert_eq!(env.action_space(), space);
        }
    }

    #[test]
    fn unknown_without_bridge() {
        assert!(matches!(
            make("Breakout-v4", &[], None),
            Err(EnvError::Unknown(id)) if id == "Breakout-v4"
        ));
    }

    #[test]
    fn action_wire_format() {
        assert_eq!(serde_json::to_string(&Action::Discrete(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Action::Continuous(vec![0.5])).unwrap(), "[0.5]");
        assert_eq!(
            serde_json::from_str::<ActionSpace>(r#"{"continuous": {"high": [2.0]}}"#).unwrap(),
            ActionSpace::Continuous { high: vec![2.0] }
        );
        assert_eq!(
            serde_json::from_str::<ActionSpace>(r#"{"discrete": 6}"#).unwrap(),
            ActionSpace::Discrete(6)
        );
    }
}
