use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// External quality-measurement collaborator. Both operations compare a
/// reference artifact against a processed artifact and return an aggregate
/// score for the segment. Any failure is fatal to the run.
pub trait MetricEngine {
    /// VMAF over two raw frame streams of the given resolution.
    fn vmaf(&self, width: u32, height: u32, reference: &Path, distorted: &Path) -> Result<f64>;

    /// PSNR of an encoded segment against a headered raw reference.
    fn psnr(&self, reference: &Path, distorted: &Path) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct VmafDocument {
    aggregate: VmafAggregate,
}

#[derive(Debug, Deserialize)]
struct VmafAggregate {
    #[serde(rename = "VMAF_score")]
    score: f64,
}

/// Runs the `run_vmaf` tool for VMAF and ffmpeg's `psnr` filter for PSNR.
pub struct ToolMetricEngine;

impl MetricEngine for ToolMetricEngine {
    fn vmaf(&self, width: u32, height: u32, reference: &Path, distorted: &Path) -> Result<f64> {
        debug!(reference = %reference.display(), distorted = %distorted.display(), "running VMAF");

        let output = Command::new("run_vmaf")
            .arg("yuv420p")
            .arg(width.to_string())
            .arg(height.to_string())
            .arg(reference)
            .arg(distorted)
            .args(["--out-fmt", "json"])
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(PipelineError::tool_failure("run_vmaf", &output));
        }

        parse_vmaf_score(&output.stdout)
    }

    fn psnr(&self, reference: &Path, distorted: &Path) -> Result<f64> {
        debug!(reference = %reference.display(), distorted = %distorted.display(), "running PSNR");

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(reference)
            .arg("-i")
            .arg(distorted)
            .args(["-lavfi", "psnr", "-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(PipelineError::tool_failure("ffmpeg", &output));
        }

        parse_psnr_average(&String::from_utf8_lossy(&output.stderr))
    }
}

fn parse_vmaf_score(stdout: &[u8]) -> Result<f64> {
    let document: VmafDocument = serde_json::from_slice(stdout)
        .map_err(|err| PipelineError::malformed("run_vmaf", err.to_string()))?;

    Ok(document.aggregate.score)
}

/// The psnr filter reports its summary on stderr as a space-separated list
/// of `name:value` pairs; the aggregate lives under `average:`.
fn parse_psnr_average(stderr: &str) -> Result<f64> {
    stderr
        .split_whitespace()
        .find_map(|token| token.strip_prefix("average:"))
        .ok_or_else(|| PipelineError::malformed("ffmpeg", "missing PSNR average in filter output"))?
        .parse()
        .map_err(|err: std::num::ParseFloatError| {
            PipelineError::malformed("ffmpeg", format!("bad PSNR average: {err}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vmaf_aggregate_score_is_extracted() {
        let stdout = br#"{
            "aggregate": {
                "VMAF_feature_adm2_score": 0.93,
                "VMAF_score": 87.449861,
                "method": "mean"
            },
            "frames": []
        }"#;

        let score = parse_vmaf_score(stdout).unwrap();
        assert!((score - 87.449_861).abs() < 1e-9);
    }

    #[test]
    fn vmaf_output_without_aggregate_is_rejected() {
        let error = parse_vmaf_score(br#"{"frames": []}"#).unwrap_err();
        assert!(matches!(error, PipelineError::MalformedOutput { .. }));
    }

    #[test]
    fn psnr_average_is_extracted_from_filter_summary() {
        let stderr = "[Parsed_psnr_0 @ 0x5spam] PSNR y:34.171862 u:39.652446 v:40.118114 \
                      average:35.471897 min:29.510518 max:44.391727\n";

        let score = parse_psnr_average(stderr).unwrap();
        assert!((score - 35.471_897).abs() < 1e-9);
    }

    #[test]
    fn psnr_output_without_average_is_rejected() {
        let error = parse_psnr_average("frame= 120 fps=0.0 q=-0.0 size=N/A\n").unwrap_err();
        assert!(matches!(error, PipelineError::MalformedOutput { .. }));
    }

    #[test]
    fn identical_inputs_report_infinite_psnr() {
        let stderr = "PSNR y:inf u:inf v:inf average:inf min:inf max:inf\n";
        assert!(parse_psnr_average(stderr).unwrap().is_infinite());
    }
}
