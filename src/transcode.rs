//! Typed ffmpeg invocations. Each job struct owns its full parameter set and
//! renders an explicit argument vector, so a malformed parameter fails at
//! construction rather than inside a shell string.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::Variant;
use crate::error::{PipelineError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateControl {
    Crf(u32),
    Bitrate(String),
}

impl From<&Variant> for RateControl {
    fn from(variant: &Variant) -> Self {
        match variant {
            Variant::Quality(crf) => Self::Crf(*crf),
            Variant::Bitrate(rate) => Self::Bitrate(rate.clone()),
        }
    }
}

impl RateControl {
    fn arguments(&self) -> Vec<OsString> {
        match self {
            Self::Crf(crf) => vec![
                "-crf".into(),
                crf.to_string().into(),
                "-b:v".into(),
                "0".into(),
            ],
            Self::Bitrate(rate) => vec![
                "-b:v".into(),
                rate.as_str().into(),
                "-maxrate".into(),
                rate.as_str().into(),
                "-bufsize".into(),
                rate.as_str().into(),
            ],
        }
    }
}

/// `-g`/`-keyint_min` fixed to the segment-aligned GOP size and scene-cut
/// detection disabled, so segment boundaries are also GOP boundaries.
fn gop_arguments(gop_size: u32) -> Vec<OsString> {
    vec![
        "-g".into(),
        gop_size.to_string().into(),
        "-keyint_min".into(),
        gop_size.to_string().into(),
        "-sc_threshold".into(),
        "0".into(),
    ]
}

/// Encode of the entire source into one variant.
#[derive(Clone, Debug)]
pub struct FullEncode {
    pub input: PathBuf,
    pub output: PathBuf,
    pub codec: String,
    pub rate: RateControl,
    pub gop_size: u32,
}

impl FullEncode {
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments: Vec<OsString> =
            vec!["-y".into(), "-i".into(), self.input.clone().into()];

        arguments.push("-c:v".into());
        arguments.push(self.codec.as_str().into());
        arguments.extend(self.rate.arguments());
        arguments.extend(gop_arguments(self.gop_size));
        arguments.push(self.output.clone().into());

        arguments
    }
}

/// Time-ranged encode of one segment straight from the source container.
#[derive(Clone, Debug)]
pub struct SegmentEncode {
    pub input: PathBuf,
    pub output: PathBuf,
    pub codec: String,
    pub rate: RateControl,
    pub gop_size: u32,
    pub start: u64,
    pub duration: u64,
}

impl SegmentEncode {
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            self.input.clone().into(),
            "-ss".into(),
            self.start.to_string().into(),
            "-t".into(),
            self.duration.to_string().into(),
        ];

        arguments.push("-c:v".into());
        arguments.push(self.codec.as_str().into());
        arguments.extend(self.rate.arguments());
        arguments.extend(gop_arguments(self.gop_size));
        arguments.push(self.output.clone().into());

        arguments
    }
}

/// Encode of a pre-extracted raw reference segment. The resolution override
/// tells ffmpeg how to interpret the headerless raw input without reprobing.
#[derive(Clone, Debug)]
pub struct RawSegmentEncode {
    pub input: PathBuf,
    pub output: PathBuf,
    pub codec: String,
    pub rate: RateControl,
    pub gop_size: u32,
    pub width: u32,
    pub height: u32,
}

impl RawSegmentEncode {
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments: Vec<OsString> = vec![
            "-s".into(),
            format!("{}x{}", self.width, self.height).into(),
            "-y".into(),
            "-i".into(),
            self.input.clone().into(),
        ];

        arguments.push("-c:v".into());
        arguments.push(self.codec.as_str().into());
        arguments.extend(self.rate.arguments());
        arguments.extend(gop_arguments(self.gop_size));
        arguments.push(self.output.clone().into());

        arguments
    }
}

/// Extraction of one segment of the source into raw frames; the raw format
/// is selected by the output extension.
#[derive(Clone, Debug)]
pub struct RawExtract {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: u64,
    pub duration: u64,
}

impl RawExtract {
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            self.input.clone().into(),
            "-ss".into(),
            self.start.to_string().into(),
            "-t".into(),
            self.duration.to_string().into(),
            self.output.clone().into(),
        ]
    }
}

/// Decode of an encoded segment back into raw frames for comparison.
#[derive(Clone, Debug)]
pub struct RawDecode {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl RawDecode {
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            self.input.clone().into(),
            self.output.clone().into(),
        ]
    }
}

/// External transcoding collaborator. Any failure is fatal to the run.
pub trait Transcoder {
    fn encode_full(&self, job: &FullEncode) -> Result<()>;
    fn encode_segment(&self, job: &SegmentEncode) -> Result<()>;
    fn encode_from_raw(&self, job: &RawSegmentEncode) -> Result<()>;
    fn extract_raw_segment(&self, job: &RawExtract) -> Result<()>;
    fn decode_to_raw(&self, job: &RawDecode) -> Result<()>;
}

pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    fn run(arguments: Vec<OsString>) -> Result<()> {
        debug!(?arguments, "spawning ffmpeg");

        let output = Command::new("ffmpeg")
            .args(&arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            return Err(PipelineError::tool_failure("ffmpeg", &output));
        }

        Ok(())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn encode_full(&self, job: &FullEncode) -> Result<()> {
        Self::run(job.arguments())
    }

    fn encode_segment(&self, job: &SegmentEncode) -> Result<()> {
        Self::run(job.arguments())
    }

    fn encode_from_raw(&self, job: &RawSegmentEncode) -> Result<()> {
        Self::run(job.arguments())
    }

    fn extract_raw_segment(&self, job: &RawExtract) -> Result<()> {
        Self::run(job.arguments())
    }

    fn decode_to_raw(&self, job: &RawDecode) -> Result<()> {
        Self::run(job.arguments())
    }
}
