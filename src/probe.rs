use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Properties of the source video, immutable after probing.
#[derive(Copy, Clone, Debug)]
pub struct SourceInfo {
    /// Whole seconds, truncated from the probed floating-point duration.
    pub duration: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    duration: Option<String>,
    coded_width: Option<u32>,
    coded_height: Option<u32>,
}

pub fn probe(path: &Path) -> Result<SourceInfo> {
    debug!(path = %path.display(), "probing source video");

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(PipelineError::tool_failure("ffprobe", &output));
    }

    parse_probe_document(&output.stdout)
}

#[allow(clippy::as_conversions)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn parse_probe_document(stdout: &[u8]) -> Result<SourceInfo> {
    let document: ProbeDocument = serde_json::from_slice(stdout)
        .map_err(|err| PipelineError::malformed("ffprobe", err.to_string()))?;

    let stream = document
        .streams
        .first()
        .ok_or_else(|| PipelineError::malformed("ffprobe", "no streams in probe output"))?;

    let duration: f64 = stream
        .duration
        .as_deref()
        .ok_or_else(|| PipelineError::malformed("ffprobe", "stream is missing a duration"))?
        .parse()
        .map_err(|err| PipelineError::malformed("ffprobe", format!("bad duration: {err}")))?;

    let width = stream
        .coded_width
        .ok_or_else(|| PipelineError::malformed("ffprobe", "stream is missing coded_width"))?;

    let height = stream
        .coded_height
        .ok_or_else(|| PipelineError::malformed("ffprobe", "stream is missing coded_height"))?;

    Ok(SourceInfo {
        duration: duration as u64,
        width,
        height,
    })
}
