use super::{Action, ActionSpace, EnvError, Environment, Step};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const TOTAL_MASS: f32 = CART_MASS + POLE_MASS;
/// Half the pole's length.
const LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = POLE_MASS * LENGTH;
const FORCE: f32 = 10.0;
/// Seconds between state updates.
const TAU: f32 = 0.02;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const X_THRESHOLD: f32 = 2.4;

/// A pole balanced on a cart moving along a frictionless track.
///
/// The observation is `[x, x_dot, theta, theta_dot]`. Action 0
/// pushes the cart left and action 1 pushes it right. Every step
/// is rewarded with 1 until the pole leans more than 12 degrees
/// or the cart leaves the track.
#[derive(Clone, Debug)]
pub struct CartPole {
    state: Option<[f32; 4]>,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl CartPole {
    /// Creates a cart-pole whose episodes are
    /// truncated after `max_steps` steps.
    pub fn new(max_steps: usize) -> CartPole {
        CartPole {
            state: None,
            steps: 0,
            max_steps,
            rng: StdRng::from_entropy(),
        }
    }

    fn terminated(&self, [x, _, theta, _]: [f32; 4]) -> bool {
        !(-X_THRESHOLD..=X_THRESHOLD).contains(&x)
            || !(-THETA_THRESHOLD..=THETA_THRESHOLD).contains(&theta)
    }
}

impl Environment for CartPole {
    fn observation_size(&self) -> usize {
        4
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(2)
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, EnvError> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let state = [(); 4].map(|_| self.rng.gen_range(-0.05..0.05));
        self.state = Some(state);
        self.steps = 0;
        Ok(state.to_vec())
    }

    fn step(&mut self, action: &Action) -> Result<Step, EnvError> {
        let [x, x_dot, theta, theta_dot] = self.state.ok_or(EnvError::NotReset)?;
        let force = match action {
            Action::Discrete(0) => -FORCE,
            Action::Discrete(1) => FORCE,
            _ => {
                return Err(EnvError::InvalidAction {
                    action: action.clone(),
                    space: self.action_space(),
                })
            }
        };

        let (sin, cos) = theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (LENGTH * (4.0 / 3.0 - POLE_MASS * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        // Explicit Euler integration.
        let state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.state = Some(state);
        self.steps += 1;

        Ok(Step {
            observation: state.to_vec(),
            reward: 1.0,
            terminated: self.terminated(state),
            truncated: self.steps >= self.max_steps,
        })
    }

    fn render(&mut self) -> Result<(), EnvError> {
        const WIDTH: usize = 61;
        let [x, _, theta, _] = self.state.ok_or(EnvError::NotReset)?;
        let column = ((x + X_THRESHOLD) / (2.0 * X_THRESHOLD) * (WIDTH - 1) as f32)
            .round()
            .clamp(0.0, (WIDTH - 1) as f32) as usize;
        let mut track: Vec<char> = vec!['-'; WIDTH];
        track[column] = if theta.abs() < 0.02 {
            '|'
        } else if theta > 0.0 {
            '/'
        } else {
            '\\'
        };
        println!("[{}] theta = {:+.3}", track.into_iter().collect::<String>(), theta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_resets_repeat() {
        let mut env = CartPole::new(500);
        let first = env.reset(Some(3)).unwrap();
        assert!(first.iter().all(|v| v.abs() < 0.05));
        env.step(&Action::Discrete(1)).unwrap();
        assert_eq!(env.reset(Some(3)).unwrap(), first);
        assert_ne!(env.reset(None).unwrap(), first);
    }

    #[test]
    fn pushing_one_way_topples_the_pole() {
        let mut env = CartPole::new(500);
        env.reset(Some(0)).unwrap();
        let mut steps = 0;
        loop {
            let step = env.step(&Action::Discrete(1)).unwrap();
            assert_eq!(step.reward, 1.0);
            steps += 1;
            if step.terminated {
                // Pushing right tips the pole left.
                assert!(step.observation[2] < 0.0);
                break;
            }
            assert!(steps < 100);
        }
        assert!(steps > 5);
    }

    #[test]
    fn episodes_are_truncated() {
        let mut env = CartPole::new(3);
        env.reset(Some(0)).unwrap();
        let steps: Vec<_> = (0..3)
            .map(|i| env.step(&Action::Discrete(i % 2)).unwrap())
            .collect();
        assert!(!steps[1].truncated);
        assert!(steps[2].truncated);
        assert!(!steps[2].terminated);
    }

    #[test]
    fn invalid_actions() {
        let mut env = CartPole::new(10);
        assert!(matches!(env.step(&Action::Discrete(0)), Err(EnvError::NotReset)));
        env.reset(None).unwrap();
        assert!(matches!(
            env.step(&Action::Discrete(2)),
            Err(EnvError::InvalidAction { .. })
        ));
        assert!(matches!(
            env.step(&Action::Continuous(vec![1.0])),
            Err(EnvError::InvalidAction { .. })
        ));
    }
}
