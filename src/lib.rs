use std::path::Path;

use anyhow::{anyhow, Context};
use tracing::info;

pub mod config;
pub mod error;
pub mod metric;
pub mod naming;
pub mod pipeline;
pub mod planner;
pub mod probe;
pub mod report;
pub mod store;
pub mod transcode;
pub mod util;

use crate::config::Config;
use crate::error::PipelineError;
use crate::metric::ToolMetricEngine;
use crate::pipeline::{PipelineCoordinator, RunSettings, SourceVideo};
use crate::store::DirectoryStore;
use crate::transcode::FfmpegTranscoder;

pub fn run(config: &Config) -> anyhow::Result<()> {
    // Preconditions come before any probing or artifact I/O.
    let variants = config.variants()?;
    let extension = config.container_extension()?;

    if !config.video.is_file() {
        return Err(PipelineError::SourceNotFound {
            path: config.video.clone(),
        }
        .into());
    }

    let video = config
        .video
        .canonicalize()
        .with_context(|| format!("Unable to resolve source path {:?}", config.video))?;

    let directory = video
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("Source file {video:?} has no parent directory"))?;

    let file_name = video
        .file_name()
        .ok_or_else(|| anyhow!("Source path {video:?} has no file name"))?
        .to_string_lossy()
        .into_owned();

    let base_name = video
        .file_stem()
        .ok_or_else(|| anyhow!("Source path {video:?} has no base name"))?
        .to_string_lossy()
        .into_owned();

    info!(
        video = %video.display(),
        codec = %config.codec,
        segment_size = config.segment_size,
        psnr = config.calculate_psnr,
        vmaf = config.calculate_vmaf,
        clean = config.clean,
        "starting quality evaluation"
    );

    let source_info = probe::probe(&video).context("Unable to probe source video")?;

    info!(
        duration = source_info.duration,
        width = source_info.width,
        height = source_info.height,
        "probed source video"
    );

    let offsets = planner::plan(source_info.duration, config.segment_size.into())?;

    let source = SourceVideo {
        file_name,
        base_name,
        codec: config.codec.clone(),
        extension: extension.to_owned(),
        duration: source_info.duration,
        width: source_info.width,
        height: source_info.height,
    };

    let settings = RunSettings {
        segment_length: config.segment_size.into(),
        gop_size: config.gop_size(),
        calculate_psnr: config.calculate_psnr,
        calculate_vmaf: config.calculate_vmaf,
        clean: config.clean,
    };

    let transcoder = FfmpegTranscoder;
    let metrics = ToolMetricEngine;
    let store = DirectoryStore::new(directory.clone());

    let mut coordinator = PipelineCoordinator::new(
        source, offsets, settings, &transcoder, &metrics, &store, directory,
    );

    coordinator
        .run(&variants)
        .context("Quality evaluation run failed")?;

    Ok(())
}
