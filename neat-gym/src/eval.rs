//! Running a network for one episode of an environment.
use crate::config::Names;
use crate::environments::{Action, ActionSpace, EnvError, Environment};

use neat_cppn::networks::{Network, NetworkError};
use thiserror::Error;
use tracing::{debug, info};

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Pause after each rendered frame.
const FRAME_DELAY: Duration = Duration::from_millis(20);

/// An error type indicating a failed evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("network has {outputs} outputs but the action space {space:?} needs {expected}")]
    ActionSize {
        outputs: usize,
        expected: usize,
        space: ActionSpace,
    },
    #[error("cannot write trajectory to {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Settings of a single evaluation episode.
#[derive(Clone, Debug, Default)]
pub struct EvalOptions<'a> {
    /// Network activations per step, so that a signal
    /// can cross recurrent or layered networks. At least 1.
    pub activations: usize,
    /// Seed of the episode's initial state.
    pub seed: Option<u64>,
    pub max_episode_steps: Option<usize>,
    /// Renders each step, with a short pause.
    pub render: bool,
    /// Logs the episode's reward and length.
    pub report: bool,
    /// Writes one CSV line per step: the action, then the observation.
    pub csv: Option<&'a Path>,
    /// Labels logged with each rendered action.
    pub names: Option<&'a Names>,
}

/// Index of the first largest value.
fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}

/// Maps network outputs onto an action: the index of the
/// largest output for a discrete space, or the outputs
/// scaled by the bounds of a continuous one.
///
/// Continuous outputs are clamped to `[-1, 1]` first, and a NaN
/// output becomes 0, so the action always lies within the bounds.
pub fn choose_action(outputs: &[f32], space: &ActionSpace) -> Action {
    match space {
        ActionSpace::Discrete(_) => Action::Discrete(argmax(outputs)),
        ActionSpace::Continuous { high } => Action::Continuous(
            outputs
                .iter()
                .zip(high)
                .map(|(&o, h)| if o.is_nan() { 0.0 } else { o.clamp(-1.0, 1.0) * h })
                .collect(),
        ),
    }
}

fn write_row<W: Write>(csv: &mut W, action: &Action, observation: &[f32]) -> io::Result<()> {
    match action {
        Action::Discrete(a) => write!(csv, "{},", a)?,
        Action::Continuous(values) => {
            for v in values {
                write!(csv, "{:.6},", v)?;
            }
        }
    }
    let columns: Vec<String> = observation.iter().map(|v| format!("{:.6}", v)).collect();
    writeln!(csv, "{}", columns.join(","))
}

fn csv_error(path: &Path) -> impl FnOnce(io::Error) -> EvalError {
    let path = path.to_path_buf();
    move |source| EvalError::Csv { path, source }
}

/// Runs `net` for one episode of `env` and returns the total
/// reward and the number of steps taken.
///
/// Each step the network is activated `activations` times on the
/// current observation. The episode ends when the environment
/// terminates or truncates it, or after `max_episode_steps` steps.
/// The final step is not counted. The environment is closed
/// and the CSV file flushed afterwards, even when the episode
/// fails.
///
/// # Errors
/// Returns an error if the network's outputs do not fit the action
/// space, or if the environment, the network or the CSV file fails.
///
/// # Examples
/// ```
/// use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
/// use neat_cppn::networks::{NodeEval, RecurrentNetwork};
/// use neat_gym::environments::CartPole;
/// use neat_gym::eval::{eval_net, EvalOptions};
///
/// // Push the cart towards the side the pole leans to.
/// let output = |node, weight| NodeEval {
///     node,
///     activation: ActivationFunction::Identity,
///     aggregation: AggregationFunction::Sum,
///     bias: 0.0,
///     response: 1.0,
///     links: vec![(2, weight), (3, weight)],
/// };
/// let mut net = RecurrentNetwork::new(vec![0, 1, 2, 3], vec![4, 5], vec![output(4, -1.0), output(5, 1.0)]);
/// let options = EvalOptions {
///     activations: 1,
///     seed: Some(0),
///     ..EvalOptions::default()
/// };
///
/// let (reward, steps) = eval_net(&mut net, &mut CartPole::new(500), &options).unwrap();
/// // Every step pays 1, including the final one.
/// assert_eq!(reward, steps as f32 + 1.0);
/// ```
pub fn eval_net<N: Network + ?Sized>(
    net: &mut N,
    env: &mut dyn Environment,
    options: &EvalOptions,
) -> Result<(f32, usize), EvalError> {
    let space = env.action_space();
    if net.output_count() != space.size() {
        return Err(EvalError::ActionSize {
            outputs: net.output_count(),
            expected: space.size(),
            space,
        });
    }

    let mut csv = match options.csv {
        Some(path) => Some((BufWriter::new(File::create(path).map_err(csv_error(path))?), path)),
        None => None,
    };

    let episode = run_episode(net, env, &space, options, csv.as_mut().map(|(writer, path)| (writer, *path)));

    let flushed = match csv {
        Some((mut writer, path)) => writer.flush().map_err(csv_error(path)),
        None => Ok(()),
    };
    let closed = env.close();

    let (total_reward, steps) = episode?;
    flushed?;
    closed?;

    if options.report {
        info!("Got reward {:+.6} in {} steps", total_reward, steps);
    }

    Ok((total_reward, steps))
}

fn run_episode<N: Network + ?Sized>(
    net: &mut N,
    env: &mut dyn Environment,
    space: &ActionSpace,
    options: &EvalOptions,
    mut csv: Option<(&mut BufWriter<File>, &Path)>,
) -> Result<(f32, usize), EvalError> {
    let mut state = env.reset(options.seed)?;
    let mut total_reward = 0.0;
    let mut steps = 0;

    while options.max_episode_steps.map_or(true, |max| steps < max) {
        let mut outputs = vec![];
        for _ in 0..options.activations.max(1) {
            outputs = net.activate(&state)?;
        }
        let action = choose_action(&outputs, space);

        let step = env.step(&action)?;
        state = step.observation;

        if let Some((writer, path)) = &mut csv {
            write_row(writer, &action, &state).map_err(csv_error(*path))?;
        }

        if options.render {
            if let (Some(names), Action::Discrete(a)) = (options.names, &action) {
                if let Some(name) = names.output.get(*a) {
                    debug!("action {}", name);
                }
            }
            env.render()?;
            thread::sleep(FRAME_DELAY);
        }

        total_reward += step.reward;

        if step.terminated || step.truncated {
            break;
        }

        steps += 1;
    }

    Ok((total_reward, steps))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::environments::{Pendulum, Step};

    use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
    use neat_cppn::networks::{NodeEval, RecurrentNetwork};

    /// Counts steps and pays a reward of 1 per step,
    /// terminating after `length` steps.
    struct Corridor {
        position: usize,
        length: usize,
        /// Step at which the corridor breaks down.
        fails_at: Option<usize>,
        closed: bool,
    }

    impl Corridor {
        fn new(length: usize) -> Corridor {
            Corridor {
                position: 0,
                length,
                fails_at: None,
                closed: false,
            }
        }
    }

    impl Environment for Corridor {
        fn observation_size(&self) -> usize {
            1
        }

        fn action_space(&self) -> ActionSpace {
            ActionSpace::Discrete(2)
        }

        fn reset(&mut self, _seed: Option<u64>) -> Result<Vec<f32>, EnvError> {
            self.position = 0;
            Ok(vec![0.0])
        }

        fn step(&mut self, action: &Action) -> Result<Step, EnvError> {
            assert_eq!(action, &Action::Discrete(1));
            self.position += 1;
            if self.fails_at == Some(self.position) {
                return Err(EnvError::Bridge("corridor collapsed".to_string()));
            }
            Ok(Step {
                observation: vec![self.position as f32],
                reward: 1.0,
                terminated: self.position >= self.length,
                truncated: false,
            })
        }

        fn close(&mut self) -> Result<(), EnvError> {
            self.closed = true;
            Ok(())
        }
    }

    /// Two outputs, the second always larger.
    fn forward_net(delay: bool) -> RecurrentNetwork {
        let eval = |node, bias, links| NodeEval {
            node,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias,
            response: 1.0,
            links,
        };
        if delay {
            // The second output only lights up through a hidden node.
            RecurrentNetwork::new(
                vec![0],
                vec![1, 2],
                vec![eval(1, 0.5, vec![]), eval(3, 1.0, vec![]), eval(2, 0.0, vec![(3, 1.0)])],
            )
        } else {
            RecurrentNetwork::new(vec![0], vec![1, 2], vec![eval(1, 0.0, vec![]), eval(2, 1.0, vec![])])
        }
    }

    #[test]
    fn argmax_picks_the_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, -1.0]), 1);
        assert_eq!(argmax(&[f32::NAN, 0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn continuous_actions_are_scaled() {
        let space = ActionSpace::Continuous { high: vec![2.0, 0.5] };
        assert_eq!(choose_action(&[0.5, -1.0], &space), Action::Continuous(vec![1.0, -0.5]));
        assert_eq!(choose_action(&[3.0, -7.0], &space), Action::Continuous(vec![2.0, -0.5]));
    }

    #[test]
    fn non_finite_outputs_give_bounded_actions() {
        let space = ActionSpace::Continuous { high: vec![2.0, 2.0, 2.0] };
        assert_eq!(
            choose_action(&[f32::NAN, f32::INFINITY, f32::NEG_INFINITY], &space),
            Action::Continuous(vec![0.0, 2.0, -2.0])
        );
    }

    #[test]
    fn diverging_network_keeps_a_finite_reward() {
        // Two identical hidden nodes feed themselves until they
        // overflow, after which their difference is NaN.
        let node = |node, links| NodeEval {
            node,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias: 1.0,
            response: 1.0,
            links,
        };
        let mut net = RecurrentNetwork::new(
            vec![0, 1, 2],
            vec![3],
            vec![
                node(4, vec![(4, 30.0)]),
                node(5, vec![(5, 30.0)]),
                NodeEval {
                    bias: 0.0,
                    ..node(3, vec![(4, 1.0), (5, -1.0)])
                },
            ],
        );
        let options = EvalOptions {
            seed: Some(0),
            ..EvalOptions::default()
        };
        let (reward, steps) = eval_net(&mut net, &mut Pendulum::new(200), &options).unwrap();
        assert!(reward.is_finite());
        assert_eq!(steps, 199);
    }

    #[test]
    fn terminal_step_is_not_counted() {
        let mut env = Corridor::new(5);
        let (reward, steps) = eval_net(&mut forward_net(false), &mut env, &EvalOptions::default()).unwrap();
        assert_eq!((reward, steps), (5.0, 4));
        assert!(env.closed);
    }

    #[test]
    fn step_limit() {
        let options = EvalOptions {
            max_episode_steps: Some(3),
            ..EvalOptions::default()
        };
        let (reward, steps) = eval_net(&mut forward_net(false), &mut Corridor::new(10), &options).unwrap();
        assert_eq!((reward, steps), (3.0, 3));
    }

    #[test]
    fn activations_let_signals_cross() {
        // With a single activation the hidden node has not fired
        // yet, so the first output wins and the corridor panics.
        let options = EvalOptions {
            activations: 2,
            ..EvalOptions::default()
        };
        let (reward, _) = eval_net(&mut forward_net(true), &mut Corridor::new(3), &options).unwrap();
        assert_eq!(reward, 3.0);
    }

    #[test]
    fn output_count_must_match() {
        let mut net = RecurrentNetwork::new(vec![0], vec![1], vec![]);
        assert!(matches!(
            eval_net(&mut net, &mut Corridor::new(3), &EvalOptions::default()),
            Err(EvalError::ActionSize {
                outputs: 1,
                expected: 2,
                ..
            })
        ));
    }

    #[test]
    fn failed_episode_still_closes_and_flushes() {
        let path = std::env::temp_dir().join(format!("neat-gym-failed-{}.csv", std::process::id()));
        let options = EvalOptions {
            csv: Some(&path),
            ..EvalOptions::default()
        };
        let mut env = Corridor {
            fails_at: Some(3),
            ..Corridor::new(10)
        };
        let result = eval_net(&mut forward_net(false), &mut env, &options);
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(EvalError::Env(EnvError::Bridge(_)))));
        assert!(env.closed);
        assert_eq!(text, "1,1.000000\n1,2.000000\n");
    }

    #[test]
    fn trajectory_csv() {
        let path = std::env::temp_dir().join(format!("neat-gym-trajectory-{}.csv", std::process::id()));
        let options = EvalOptions {
            csv: Some(&path),
            ..EvalOptions::default()
        };
        eval_net(&mut forward_net(false), &mut Corridor::new(2), &options).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(text, "1,1.000000\n1,2.000000\n");

        // Continuous actions take one column per component.
        let path = std::env::temp_dir().join(format!("neat-gym-pendulum-{}.csv", std::process::id()));
        let mut net = RecurrentNetwork::new(vec![0, 1, 2], vec![3], vec![]);
        let options = EvalOptions {
            seed: Some(0),
            max_episode_steps: Some(4),
            csv: Some(&path),
            ..EvalOptions::default()
        };
        let (reward, steps) = eval_net(&mut net, &mut Pendulum::new(200), &options).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(reward < 0.0);
        assert_eq!(steps, 4);
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l.starts_with("0.000000,") && l.split(',').count() == 4));
    }
}
