//! Environments hosted by an external process.
//!
//! The bridge reads one JSON request per line on its standard input
//! and answers each with one JSON line on its standard output:
//!
//! | request                                          | reply                                                   |
//! |--------------------------------------------------|---------------------------------------------------------|
//! | `{"cmd": "make", "env": id, "wrappers": [...]}`  | `{"observation_size": n, "action_space": space}`        |
//! | `{"cmd": "reset", "seed": s}` (`s` may be null)  | `{"observation": [...]}`                                |
//! | `{"cmd": "step", "action": a}`                   | `{"observation": [...], "reward": r, "terminated": b, "truncated": b}` |
//! | `{"cmd": "render"}` / `{"cmd": "close"}`         | `{}`                                                    |
//!
//! `space` is `{"discrete": n}` or `{"continuous": {"high": [...]}}`,
//! and a discrete action is sent as an integer, a continuous one as
//! an array. Observations are flattened. Any request may instead be
//! answered with `{"error": message}`.
use super::{Action, ActionSpace, EnvError, Environment, Step};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::str::FromStr;

/// The program (and its arguments) that hosts bridged environments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl FromStr for BridgeCommand {
    type Err = String;

    /// Splits a command line on whitespace, e.g. `python3 gym_bridge.py`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| "empty bridge command".to_string())?;
        Ok(BridgeCommand {
            program,
            args: words.collect(),
        })
    }
}

#[derive(Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
enum Request<'a> {
    Make { env: &'a str, wrappers: &'a [String] },
    Reset { seed: Option<u64> },
    Step { action: &'a Action },
    Render,
    Close,
}

#[derive(Deserialize)]
struct MakeReply {
    observation_size: usize,
    action_space: ActionSpace,
}

#[derive(Deserialize)]
struct ResetReply {
    observation: Vec<f32>,
}

#[derive(Deserialize)]
struct Ack {}

/// An environment living in a bridge process.
pub struct BridgeEnvironment {
    child: Child,
    input: ChildStdin,
    output: BufReader<ChildStdout>,
    observation_size: usize,
    action_space: ActionSpace,
    closed: bool,
}

impl BridgeEnvironment {
    /// Starts the bridge and asks it to make environment `id`
    /// with the given wrapper paths.
    ///
    /// # Errors
    /// Returns an error if the process cannot be started or
    /// the bridge cannot make the environment.
    pub fn spawn(command: &BridgeCommand, id: &str, wrappers: &[String]) -> Result<BridgeEnvironment, EnvError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let (input, output) = match (child.stdin.take(), child.stdout.take()) {
            (Some(input), Some(output)) => (input, BufReader::new(output)),
            _ => return Err(EnvError::Protocol("bridge pipes unavailable".to_string())),
        };
        let mut env = BridgeEnvironment {
            child,
            input,
            output,
            observation_size: 0,
            action_space: ActionSpace::Discrete(0),
            closed: false,
        };

        let reply: MakeReply = env.request(&Request::Make { env: id, wrappers })?;
        debug!(
            "bridge made {} with {} observations and action space {:?}",
            id, reply.observation_size, reply.action_space
        );
        env.observation_size = reply.observation_size;
        env.action_space = reply.action_space;
        Ok(env)
    }

    fn request<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, EnvError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.input.write_all(line.as_bytes())?;
        self.input.flush()?;

        line.clear();
        if self.output.read_line(&mut line)? == 0 {
            return Err(EnvError::Protocol("bridge closed its output".to_string()));
        }
        let reply: serde_json::Value = serde_json::from_str(&line)?;
        if let Some(message) = reply.get("error") {
            return Err(EnvError::Bridge(
                message.as_str().map_or_else(|| message.to_string(), str::to_string),
            ));
        }
        serde_json::from_value(reply).map_err(|e| EnvError::Protocol(e.to_string()))
    }

    fn check_observation(&self, observation: &[f32]) -> Result<(), EnvError> {
        if observation.len() != self.observation_size {
            return Err(EnvError::Protocol(format!(
                "expected {} observations, got {}",
                self.observation_size,
                observation.len()
            )));
        }
        Ok(())
    }
}

impl Environment for BridgeEnvironment {
    fn observation_size(&self) -> usize {
        self.observation_size
    }

    fn action_space(&self) -> ActionSpace {
        self.action_space.clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, EnvError> {
        let reply: ResetReply = self.request(&Request::Reset { seed })?;
        self.check_observation(&reply.observation)?;
        Ok(reply.observation)
    }

    fn step(&mut self, action: &Action) -> Result<Step, EnvError> {
        let valid = match (action, &self.action_space) {
            (Action::Discrete(a), ActionSpace::Discrete(n)) => a < n,
            (Action::Continuous(a), ActionSpace::Continuous { high }) => a.len() == high.len(),
            _ => false,
        };
        if !valid {
            return Err(EnvError::InvalidAction {
                action: action.clone(),
                space: self.action_space.clone(),
            });
        }
        let step: Step = self.request(&Request::Step { action })?;
        self.check_observation(&step.observation)?;
        Ok(step)
    }

    fn render(&mut self) -> Result<(), EnvError> {
        self.request::<Ack>(&Request::Render).map(|_| ())
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.request::<Ack>(&Request::Close)?;
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for BridgeEnvironment {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("closing bridge: {}", e);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
