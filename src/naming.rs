//! Canonical artifact names. Every cache lookup, creation and removal goes
//! through these functions, so the naming scheme is a de facto on-disk
//! contract for other tooling.

const OFFSET_WIDTH: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RawFormat {
    /// Bare raw frames, consumed by the VMAF tool.
    Yuv,
    /// Headered raw frames, consumed by the PSNR filter path.
    Y4m,
}

impl RawFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Yuv => "yuv",
            Self::Y4m => "y4m",
        }
    }
}

/// Zero-padded so lexicographic and chronological order agree.
#[must_use]
pub fn offset_label(offset: u64) -> String {
    format!("{offset:0width$}", width = OFFSET_WIDTH)
}

#[must_use]
pub fn full_encode(base: &str, codec: &str, variant_tag: &str, extension: &str) -> String {
    format!("{base}_{codec}_{variant_tag}.{extension}")
}

#[must_use]
pub fn segment_encode(
    base: &str,
    codec: &str,
    variant_tag: &str,
    offset: u64,
    extension: &str,
) -> String {
    format!(
        "{base}_{codec}_{variant_tag}_{}.{extension}",
        offset_label(offset)
    )
}

#[must_use]
pub fn reference_raw(base: &str, offset: u64, extension: &str) -> String {
    format!("{base}_{}.{extension}", offset_label(offset))
}
