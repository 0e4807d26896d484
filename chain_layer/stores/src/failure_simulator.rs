// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use rand::Rng;

/// Deterministic-shape, probabilistic fault injection for outbound requests.
///
/// `probability` is fixed at construction; `maybe_fail` is safe to call from any number of
/// threads concurrently since `rand::thread_rng` is itself thread-local.
#[derive(Debug, Clone, Copy)]
pub struct FailureSimulator {
    probability: f64,
}

#[derive(Debug, thiserror::Error)]
#[error("simulated upstream failure")]
pub struct UpstreamSimulatedError;

impl Default for FailureSimulator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl FailureSimulator {
    pub fn new(probability: f64) -> Self {
        Self { probability: probability.clamp(0.0, 1.0) }
    }

    pub fn maybe_fail(&self) -> Result<(), UpstreamSimulatedError> {
        if self.probability <= 0.0 {
            return Ok(());
        }
        if rand::thread_rng().gen_bool(self.probability) {
            return Err(UpstreamSimulatedError);
        }
        Ok(())
    }
}
