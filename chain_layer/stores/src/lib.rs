// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

mod content_store;
mod error;
mod failure_simulator;

pub use content_store::ContentStore;
pub use error::StoreError;
pub use failure_simulator::{FailureSimulator, UpstreamSimulatedError};
