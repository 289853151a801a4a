// src/main.rs
use std::path::Path;

use anyhow::Context;

use verdant_engine::RenderConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RenderConfig::load(Path::new("verdant.toml")).context("loading config")?;
    verdant_engine::run_native(config).context("running renderer")?;
    Ok(())
}
