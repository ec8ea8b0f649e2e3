use anyhow::Context;
use clap::Parser;

use video_quality_pipeline::config;
use video_quality_pipeline::util;

fn main() -> anyhow::Result<()> {
    util::install_tracing().context("Unable to install tracing subsystem")?;

    let config = config::Config::parse();
    video_quality_pipeline::run(&config).context("Unable to run application")?;

    Ok(())
}
