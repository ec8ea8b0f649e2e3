use std::path::PathBuf;

use clap::Parser;

use crate::error::{PipelineError, Result};

/// One encoding configuration to evaluate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Constant-quality encode (CRF-style parameter).
    Quality(u32),
    /// Constrained-bitrate encode, expressed the way ffmpeg accepts it
    /// ("500k", "1M", ...).
    Bitrate(String),
}

impl Variant {
    /// Tag used inside artifact names, e.g. `crf23` or `b500k`.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Quality(crf) => format!("crf{crf}"),
            Self::Bitrate(rate) => format!("b{rate}"),
        }
    }

    /// Key used in score reports, e.g. `23` or `500k`.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Quality(crf) => crf.to_string(),
            Self::Bitrate(rate) => rate.clone(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> VariantMode {
        match self {
            Self::Quality(_) => VariantMode::Quality,
            Self::Bitrate(_) => VariantMode::Bitrate,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariantMode {
    Quality,
    Bitrate,
}

impl VariantMode {
    /// Label used in report file names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quality => "crf",
            Self::Bitrate => "bitrate",
        }
    }
}

#[derive(Clone, Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Source video file to evaluate
    pub video: PathBuf,

    /// Encoding qualities (CRF values) to evaluate
    #[arg(short, long, num_args = 1..)]
    pub qualities: Vec<u32>,

    /// Encoding bitrates to evaluate (as ffmpeg accepts them: 500k, 1M, ...)
    #[arg(short, long, num_args = 1..)]
    pub bitrates: Vec<String>,

    /// Video codec (ffmpeg name) used for every variant encode
    #[arg(short, long)]
    pub codec: String,

    /// Segment size in seconds
    #[arg(short, long)]
    pub segment_size: u32,

    /// Source frame rate, used to align GOP size to segment boundaries
    #[arg(long, default_value_t = 24)]
    pub frames_per_second: u32,

    /// Calculate per-segment PSNR scores
    #[arg(long)]
    pub calculate_psnr: bool,

    /// Calculate per-segment VMAF scores
    #[arg(long)]
    pub calculate_vmaf: bool,

    /// Remove intermediate segment artifacts once consumed
    #[arg(long)]
    pub clean: bool,
}

impl Config {
    /// Resolves the variant set. Exactly one of the two collections must be
    /// non-empty; this is validated here, before any probing or I/O.
    pub fn variants(&self) -> Result<Vec<Variant>> {
        match (self.qualities.is_empty(), self.bitrates.is_empty()) {
            (true, true) => Err(PipelineError::MissingVariants),
            (false, false) => Err(PipelineError::ConflictingVariants),
            (false, true) => Ok(self
                .qualities
                .iter()
                .map(|crf| Variant::Quality(*crf))
                .collect()),
            (true, false) => Ok(self
                .bitrates
                .iter()
                .map(|rate| Variant::Bitrate(rate.clone()))
                .collect()),
        }
    }

    /// Closed codec-to-container mapping; anything unmapped is rejected.
    pub fn container_extension(&self) -> Result<&'static str> {
        match self.codec.as_str() {
            "libx264" | "libx265" => Ok("mp4"),
            "vp9" | "libaom-av1" => Ok("webm"),
            _ => Err(PipelineError::UnsupportedCodec {
                codec: self.codec.clone(),
            }),
        }
    }

    /// GOP size in frames, sized so keyframe spacing lands exactly on
    /// segment boundaries.
    #[must_use]
    pub const fn gop_size(&self) -> u32 {
        self.segment_size * self.frames_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(qualities: Vec<u32>, bitrates: Vec<String>) -> Config {
        Config {
            video: PathBuf::from("clip.mp4"),
            qualities,
            bitrates,
            codec: "libx264".to_owned(),
            segment_size: 5,
            frames_per_second: 24,
            calculate_psnr: false,
            calculate_vmaf: false,
            clean: false,
        }
    }

    #[test]
    fn both_variant_collections_are_rejected() {
        let config = config(vec![23], vec!["500k".to_owned()]);
        let error = config.variants().unwrap_err();
        assert!(matches!(error, PipelineError::ConflictingVariants));
        assert!(error.is_precondition());
    }

    #[test]
    fn neither_variant_collection_is_rejected() {
        let config = config(vec![], vec![]);
        let error = config.variants().unwrap_err();
        assert!(matches!(error, PipelineError::MissingVariants));
        assert!(error.is_precondition());
    }

    #[test]
    fn qualities_resolve_in_input_order() {
        let config = config(vec![30, 23, 40], vec![]);
        assert_eq!(
            config.variants().unwrap(),
            vec![
                Variant::Quality(30),
                Variant::Quality(23),
                Variant::Quality(40)
            ]
        );
    }

    #[test]
    fn bitrates_resolve_in_input_order() {
        let config = config(vec![], vec!["500kbps".to_owned(), "1M".to_owned()]);
        assert_eq!(
            config.variants().unwrap(),
            vec![
                Variant::Bitrate("500kbps".to_owned()),
                Variant::Bitrate("1M".to_owned())
            ]
        );
    }

    #[test]
    fn codec_container_mapping_is_closed() {
        let mut config = config(vec![23], vec![]);
        assert_eq!(config.container_extension().unwrap(), "mp4");

        config.codec = "libx265".to_owned();
        assert_eq!(config.container_extension().unwrap(), "mp4");

        config.codec = "vp9".to_owned();
        assert_eq!(config.container_extension().unwrap(), "webm");

        config.codec = "libaom-av1".to_owned();
        assert_eq!(config.container_extension().unwrap(), "webm");

        config.codec = "mpeg2video".to_owned();
        let error = config.container_extension().unwrap_err();
        assert!(matches!(error, PipelineError::UnsupportedCodec { .. }));
        assert!(error.is_precondition());
    }

    #[test]
    fn gop_size_covers_one_segment() {
        let config = config(vec![23], vec![]);
        assert_eq!(config.gop_size(), 120);
    }

    #[test]
    fn variant_tags_and_keys() {
        assert_eq!(Variant::Quality(23).tag(), "crf23");
        assert_eq!(Variant::Quality(23).key(), "23");
        assert_eq!(Variant::Bitrate("500kbps".to_owned()).tag(), "b500kbps");
        assert_eq!(Variant::Bitrate("500kbps".to_owned()).key(), "500kbps");
    }
}
