use super::{Action, ActionSpace, EnvError, Environment, Step};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::f32::consts::PI;

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const GRAVITY: f32 = 10.0;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;

/// Wraps an angle into `[-pi, pi)`.
fn normalize_angle(theta: f32) -> f32 {
    (theta + PI).rem_euclid(2.0 * PI) - PI
}

/// A frictionless pendulum swung up by a torque on its pivot.
///
/// The observation is `[cos(theta), sin(theta), theta_dot]` with
/// `theta = 0` upright. The single action is the torque, in
/// `[-2, 2]`. The reward penalises the angle from upright, the
/// angular velocity and the torque, so it is never positive.
/// Episodes never terminate, only truncate.
#[derive(Clone, Debug)]
pub struct Pendulum {
    state: Option<(f32, f32)>,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl Pendulum {
    pub fn new(max_steps: usize) -> Pendulum {
        Pendulum {
            state: None,
            steps: 0,
            max_steps,
            rng: StdRng::from_entropy(),
        }
    }

    fn observation((theta, theta_dot): (f32, f32)) -> Vec<f32> {
        vec![theta.cos(), theta.sin(), theta_dot]
    }
}

impl Environment for Pendulum {
    fn observation_size(&self) -> usize {
        3
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Continuous {
            high: vec![MAX_TORQUE],
        }
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, EnvError> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let state = (self.rng.gen_range(-PI..PI), self.rng.gen_range(-1.0..1.0));
        self.state = Some(state);
        self.steps = 0;
        Ok(Pendulum::observation(state))
    }

    fn step(&mut self, action: &Action) -> Result<Step, EnvError> {
        let (theta, theta_dot) = self.state.ok_or(EnvError::NotReset)?;
        let torque = match action {
            Action::Continuous(values) if values.len() == 1 => values[0].clamp(-MAX_TORQUE, MAX_TORQUE),
            _ => {
                return Err(EnvError::InvalidAction {
                    action: action.clone(),
                    space: self.action_space(),
                })
            }
        };

        let cost = normalize_angle(theta).powi(2) + 0.1 * theta_dot.powi(2) + 0.001 * torque.powi(2);
        let theta_dot = (theta_dot
            + (3.0 * GRAVITY / (2.0 * LENGTH) * theta.sin() + 3.0 / (MASS * LENGTH * LENGTH) * torque) * DT)
            .clamp(-MAX_SPEED, MAX_SPEED);
        let state = (theta + theta_dot * DT, theta_dot);
        self.state = Some(state);
        self.steps += 1;

        Ok(Step {
            observation: Pendulum::observation(state),
            reward: -cost,
            terminated: false,
            truncated: self.steps >= self.max_steps,
        })
    }

    fn render(&mut self) -> Result<(), EnvError> {
        let (theta, theta_dot) = self.state.ok_or(EnvError::NotReset)?;
        println!(
            "theta = {:+7.2} deg, theta_dot = {:+.3}",
            normalize_angle(theta).to_degrees(),
            theta_dot
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angles_wrap() {
        assert!((normalize_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(-0.25) + 0.25).abs() < 1e-6);
    }

    #[test]
    fn observations_lie_on_the_unit_circle() {
        let mut env = Pendulum::new(200);
        let observation = env.reset(Some(1)).unwrap();
        assert!((observation[0].powi(2) + observation[1].powi(2) - 1.0).abs() < 1e-5);
        assert!(observation[2].abs() <= 1.0);
    }

    #[test]
    fn rewards_are_costs() {
        let mut env = Pendulum::new(200);
        env.reset(Some(1)).unwrap();
        for _ in 0..50 {
            let step = env.step(&Action::Continuous(vec![10.0])).unwrap();
            assert!(step.reward <= 0.0);
            assert!(step.reward >= -(PI * PI + 0.1 * 64.0 + 0.001 * 4.0));
            assert!(step.observation[2].abs() <= MAX_SPEED);
            assert!(!step.terminated);
        }
    }

    #[test]
    fn upright_and_still_is_free() {
        let mut env = Pendulum::new(200);
        env.reset(None).unwrap();
        env.state = Some((0.0, 0.0));
        let step = env.step(&Action::Continuous(vec![0.0])).unwrap();
        assert_eq!(step.reward, 0.0);
        assert_eq!(step.observation, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn truncates_after_max_steps() {
        let mut env = Pendulum::new(2);
        env.reset(None).unwrap();
        assert!(!env.step(&Action::Continuous(vec![0.0])).unwrap().truncated);
        assert!(env.step(&Action::Continuous(vec![0.0])).unwrap().truncated);
        assert!(env.step(&Action::Discrete(0)).is_err());
    }
}
