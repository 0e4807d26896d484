// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

mod bus;
mod event;
mod metrics;

pub use bus::EventBus;
pub use event::GatewayEvent;
pub use metrics::Metrics;
