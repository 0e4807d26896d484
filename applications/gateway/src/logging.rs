// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

/// Installs a single console appender at `Info`, with `debug`/`trace` reserved for
/// targeted troubleshooting via `RUST_LOG`-style overrides left for a future pass.
pub fn initialize_logging() -> Result<(), anyhow::Error> {
    let encoder = PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S%.3f)} {l:5} {t} - {m}{n}");
    let console = ConsoleAppender::builder().encoder(Box::new(encoder)).build();

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .build(Root::builder().appender("console").build(LevelFilter::Info))?;

    log4rs::init_config(config)?;
    Ok(())
}
