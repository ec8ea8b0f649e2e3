use std::path::PathBuf;
use std::process::{ExitStatus, Output};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither qualities nor bitrates were supplied.
    #[error("either qualities or bitrates must be provided")]
    MissingVariants,

    /// Both qualities and bitrates were supplied.
    #[error("qualities and bitrates are mutually exclusive")]
    ConflictingVariants,

    #[error("source video not found: {path:?}")]
    SourceNotFound { path: PathBuf },

    /// The codec is not in the closed codec-to-container mapping.
    #[error("no container mapping for codec {codec}")]
    UnsupportedCodec { codec: String },

    #[error("segment size must be greater than zero")]
    InvalidSegmentSize,

    /// An invoked transcode, probe or metric subprocess exited nonzero.
    #[error("{tool} exited unsuccessfully ({status}): {stderr}")]
    ExternalTool {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    /// An invoked subprocess succeeded but produced unparseable output.
    #[error("unable to parse {tool} output: {message}")]
    MalformedOutput {
        tool: &'static str,
        message: String,
    },

    #[error("unable to encode or decode score report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("invalid progress bar template: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn tool_failure(tool: &'static str, output: &Output) -> Self {
        Self::ExternalTool {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }
    }

    pub(crate) fn malformed(tool: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            tool,
            message: message.into(),
        }
    }

    /// True for failures detected before any external process is spawned
    /// or any state is written.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingVariants
                | Self::ConflictingVariants
                | Self::SourceNotFound { .. }
                | Self::UnsupportedCodec { .. }
                | Self::InvalidSegmentSize
        )
    }
}
