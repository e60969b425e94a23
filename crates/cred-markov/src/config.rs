//! Parameters for building, solving and scaling a cred computation.
//!
//! Provides [`MarkovParameters`], [`SolverOptions`] and the combined
//! [`CredConfig`], all with defaults. Every type deserializes from camelCase
//! JSON with missing fields filled from the defaults, so surrounding tooling
//! can load partial configs.

use cred_core::constants::{
    DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_EPSILON, DEFAULT_GAMMA_BACKWARD, DEFAULT_GAMMA_FORWARD,
    DEFAULT_MAX_ITERATIONS,
};
use cred_core::error::{ConfigError, SolverError};
use serde::{Deserialize, Serialize};

/// Transition-mass parameters of the Markov process graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkovParameters {
    /// Mass every node teleports uniformly to the seed nodes.
    pub alpha: f64,
    /// Mass an epoch node forwards to the participant's next epoch.
    pub beta: f64,
    /// Multiplier on an edge's forwards (src → dst) weight.
    pub gamma_forward: f64,
    /// Multiplier on an edge's backwards (dst → src) weight.
    pub gamma_backward: f64,
}

impl Default for MarkovParameters {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma_forward: DEFAULT_GAMMA_FORWARD,
            gamma_backward: DEFAULT_GAMMA_BACKWARD,
        }
    }
}

impl MarkovParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A strictly positive alpha keeps the chain irreducible and aperiodic.
        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if !(self.beta.is_finite() && self.beta >= 0.0 && self.beta < 1.0) {
            return Err(ConfigError::InvalidBeta(self.beta));
        }
        for gamma in [self.gamma_forward, self.gamma_backward] {
            if !(gamma.is_finite() && gamma >= 0.0) {
                return Err(ConfigError::InvalidGamma(gamma));
            }
        }
        if self.alpha + self.beta > 1.0 {
            return Err(ConfigError::ParametersExceedOne {
                alpha: self.alpha,
                beta: self.beta,
            });
        }
        Ok(())
    }

    /// Mass an epoch node spreads over its graph edges and attributions.
    pub fn epoch_remainder(&self) -> f64 {
        (1.0 - self.alpha - self.beta).max(0.0)
    }
}

/// Termination settings for power iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverOptions {
    /// Converged once the L1 distance between iterates drops below this.
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(SolverError::InvalidOptions(format!(
                "epsilon must be finite and positive, got {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidOptions(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// How raw stationary probabilities are scaled into cred.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CredScale {
    /// Total cred equals the graph's total minted node weight.
    #[default]
    Mint,
    /// Multiply probabilities by a fixed constant.
    Fixed(f64),
}

/// Everything needed to turn graph inputs into a cred graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CredConfig {
    pub parameters: MarkovParameters,
    pub solver: SolverOptions,
    pub scale: CredScale,
}

impl CredConfig {
    /// Tighter convergence for final, published cred runs.
    pub fn precise() -> Self {
        Self {
            solver: SolverOptions {
                epsilon: 1e-10,
                max_iterations: 10_000,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MarkovParameters::default().validate().is_ok());
        assert!(SolverOptions::default().validate().is_ok());
        assert_eq!(CredConfig::default().scale, CredScale::Mint);
    }

    #[test]
    fn alpha_must_be_positive() {
        let p = MarkovParameters { alpha: 0.0, ..Default::default() };
        assert_eq!(p.validate(), Err(ConfigError::InvalidAlpha(0.0)));
        let p = MarkovParameters { alpha: f64::NAN, ..Default::default() };
        assert!(matches!(p.validate(), Err(ConfigError::InvalidAlpha(_))));
    }

    #[test]
    fn beta_range() {
        let p = MarkovParameters { beta: -0.1, ..Default::default() };
        assert_eq!(p.validate(), Err(ConfigError::InvalidBeta(-0.1)));
        let p = MarkovParameters { beta: 1.0, ..Default::default() };
        assert_eq!(p.validate(), Err(ConfigError::InvalidBeta(1.0)));
    }

    #[test]
    fn negative_gamma_rejected() {
        let p = MarkovParameters { gamma_backward: -1.0, ..Default::default() };
        assert_eq!(p.validate(), Err(ConfigError::InvalidGamma(-1.0)));
    }

    #[test]
    fn alpha_plus_beta_over_one_rejected() {
        let p = MarkovParameters { alpha: 0.6, beta: 0.5, ..Default::default() };
        assert_eq!(
            p.validate(),
            Err(ConfigError::ParametersExceedOne { alpha: 0.6, beta: 0.5 })
        );
    }

    #[test]
    fn alpha_plus_beta_exactly_one_allowed() {
        let p = MarkovParameters { alpha: 0.5, beta: 0.5, ..Default::default() };
        assert!(p.validate().is_ok());
        assert_eq!(p.epoch_remainder(), 0.0);
    }

    #[test]
    fn solver_options_validation() {
        let bad_eps = SolverOptions { epsilon: 0.0, ..Default::default() };
        assert!(matches!(bad_eps.validate(), Err(SolverError::InvalidOptions(_))));
        let bad_iter = SolverOptions { max_iterations: 0, ..Default::default() };
        assert!(matches!(bad_iter.validate(), Err(SolverError::InvalidOptions(_))));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: CredConfig =
            serde_json::from_str(r#"{"parameters":{"alpha":0.2},"scale":{"fixed":3.0}}"#).unwrap();
        assert_eq!(cfg.parameters.alpha, 0.2);
        assert_eq!(cfg.parameters.beta, DEFAULT_BETA);
        assert_eq!(cfg.solver, SolverOptions::default());
        assert_eq!(cfg.scale, CredScale::Fixed(3.0));
    }

    #[test]
    fn precise_preset_tightens_solver() {
        let cfg = CredConfig::precise();
        assert!(cfg.solver.epsilon < SolverOptions::default().epsilon);
        assert_eq!(cfg.parameters, MarkovParameters::default());
    }
}
