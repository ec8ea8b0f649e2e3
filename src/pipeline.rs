//! The pipeline coordinator. For every (variant, segment) pair it decides
//! which artifacts must exist, creates the missing ones through the
//! transcoder in dependency order, invokes the metric engine, and persists
//! the cumulative score report after each variant completes.
//!
//! Every creation is gated on `ArtifactStore::exists`, so a rerun over a
//! populated store performs no external work, and a killed run resumes from
//! the first missing artifact.

use std::path::PathBuf;

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::config::{Variant, VariantMode};
use crate::error::{PipelineError, Result};
use crate::metric::MetricEngine;
use crate::naming::{self, RawFormat};
use crate::report::{self, MetricKind, ScoreReport};
use crate::store::ArtifactStore;
use crate::transcode::{
    FullEncode, RateControl, RawDecode, RawExtract, RawSegmentEncode, SegmentEncode, Transcoder,
};
use crate::util::create_progress_style;

/// Source description, immutable after probing.
#[derive(Clone, Debug)]
pub struct SourceVideo {
    /// File name of the source within the artifact store.
    pub file_name: String,
    /// Extensionless base name, the prefix of every artifact.
    pub base_name: String,
    pub codec: String,
    /// Container extension for every encoded artifact.
    pub extension: String,
    pub duration: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Copy, Clone, Debug)]
pub struct RunSettings {
    pub segment_length: u64,
    pub gop_size: u32,
    pub calculate_psnr: bool,
    pub calculate_vmaf: bool,
    pub clean: bool,
}

pub struct PipelineCoordinator<'a, T, M, S> {
    source: SourceVideo,
    offsets: Vec<u64>,
    settings: RunSettings,
    transcoder: &'a T,
    metrics: &'a M,
    store: &'a S,
    report_directory: PathBuf,
    vmaf_scores: ScoreReport,
    psnr_scores: ScoreReport,
}

impl<'a, T, M, S> PipelineCoordinator<'a, T, M, S>
where
    T: Transcoder,
    M: MetricEngine,
    S: ArtifactStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: SourceVideo,
        offsets: Vec<u64>,
        settings: RunSettings,
        transcoder: &'a T,
        metrics: &'a M,
        store: &'a S,
        report_directory: PathBuf,
    ) -> Self {
        Self {
            source,
            offsets,
            settings,
            transcoder,
            metrics,
            store,
            report_directory,
            vmaf_scores: ScoreReport::new(),
            psnr_scores: ScoreReport::new(),
        }
    }

    /// Processes every variant in input order, segments in ascending offset
    /// order, one external process in flight at a time. Any collaborator
    /// failure aborts the whole run; reports persisted by previously
    /// completed variants stay on disk.
    pub fn run(&mut self, variants: &[Variant]) -> Result<()> {
        if variants.is_empty() {
            return Err(PipelineError::MissingVariants);
        }

        let mode = variants[0].mode();
        self.load_reports(mode)?;

        let metric_passes =
            u64::from(self.settings.calculate_psnr) + u64::from(self.settings.calculate_vmaf);
        let segment_count = u64::try_from(self.offsets.len()).unwrap_or(u64::MAX);
        let variant_count = u64::try_from(variants.len()).unwrap_or(u64::MAX);

        let progress = ProgressBar::new(variant_count * segment_count * metric_passes);
        progress.set_style(create_progress_style(
            "{spinner:.green} [{elapsed_precise}] Scoring segments... [{wide_bar:.cyan/blue}] {percent:>3}% {human_pos:>6}/{human_len:>6} ({smooth_per_sec:>6} seg/s, ETA: {smooth_eta:>3})",
        )?);

        for variant in variants {
            self.process_variant(variant, mode, &progress)?;
        }

        progress.finish();

        Ok(())
    }

    #[must_use]
    pub const fn vmaf_report(&self) -> &ScoreReport {
        &self.vmaf_scores
    }

    #[must_use]
    pub const fn psnr_report(&self) -> &ScoreReport {
        &self.psnr_scores
    }

    /// Seeds the in-memory mappings from reports persisted by earlier runs,
    /// so completed variants are not re-measured and the rewritten file
    /// keeps their scores.
    fn load_reports(&mut self, mode: VariantMode) -> Result<()> {
        if self.settings.calculate_vmaf {
            let path = self.report_path(mode, MetricKind::Vmaf);

            if path.is_file() {
                self.vmaf_scores = ScoreReport::load(&path)?;
                info!(path = %path.display(), "loaded existing VMAF report");
            }
        }

        if self.settings.calculate_psnr {
            let path = self.report_path(mode, MetricKind::Psnr);

            if path.is_file() {
                self.psnr_scores = ScoreReport::load(&path)?;
                info!(path = %path.display(), "loaded existing PSNR report");
            }
        }

        Ok(())
    }

    fn report_path(&self, mode: VariantMode, kind: MetricKind) -> PathBuf {
        self.report_directory
            .join(report::file_name(&self.source.base_name, mode, kind))
    }

    fn process_variant(
        &mut self,
        variant: &Variant,
        mode: VariantMode,
        progress: &ProgressBar,
    ) -> Result<()> {
        info!(variant = %variant.tag(), "processing variant");

        self.ensure_full_encode(variant)?;

        let segment_count = u64::try_from(self.offsets.len()).unwrap_or(u64::MAX);

        if self.settings.calculate_vmaf {
            if Self::scores_complete(&self.vmaf_scores, variant, self.offsets.len()) {
                info!(variant = %variant.tag(), "VMAF scores already recorded, skipping");
                progress.inc(segment_count);
            } else {
                let scores = self.vmaf_segment_loop(variant, progress)?;
                self.vmaf_scores.insert(variant.key(), scores);
            }

            self.persist(MetricKind::Vmaf, mode)?;
        }

        if self.settings.calculate_psnr {
            if Self::scores_complete(&self.psnr_scores, variant, self.offsets.len()) {
                info!(variant = %variant.tag(), "PSNR scores already recorded, skipping");
                progress.inc(segment_count);
            } else {
                let scores = self.psnr_segment_loop(variant, progress)?;
                self.psnr_scores.insert(variant.key(), scores);
            }

            self.persist(MetricKind::Psnr, mode)?;
        }

        Ok(())
    }

    fn scores_complete(report: &ScoreReport, variant: &Variant, segment_count: usize) -> bool {
        report
            .get(&variant.key())
            .is_some_and(|scores| scores.len() == segment_count)
    }

    /// VMAF compares two raw streams: the extracted reference segment and
    /// the decoded form of the variant's encoded segment.
    fn vmaf_segment_loop(&self, variant: &Variant, progress: &ProgressBar) -> Result<Vec<f64>> {
        // Extraction pre-pass so every offset's reference exists before any
        // encode consumes it.
        for &offset in &self.offsets {
            self.ensure_reference_raw(offset, RawFormat::Yuv)?;
        }

        let mut scores = Vec::with_capacity(self.offsets.len());

        for &offset in &self.offsets {
            // A previous variant's cleanup may have removed the shared
            // reference at this offset.
            let reference = self.ensure_reference_raw(offset, RawFormat::Yuv)?;
            let encoded = self.ensure_raw_segment_encode(variant, offset, &reference)?;
            let decoded = self.ensure_decoded_raw(variant, offset, &encoded)?;

            let score = self.metrics.vmaf(
                self.source.width,
                self.source.height,
                &self.store.path(&reference),
                &self.store.path(&decoded),
            )?;

            debug!(variant = %variant.tag(), offset, score, "VMAF segment scored");
            scores.push(score);

            if self.settings.clean {
                self.store.remove(&decoded)?;
                self.store.remove(&encoded)?;
                self.store.remove(&reference)?;
            }

            progress.inc(1);
        }

        Ok(scores)
    }

    /// PSNR compares the encoded segment directly against a headered raw
    /// reference, so no decode step is needed.
    fn psnr_segment_loop(&self, variant: &Variant, progress: &ProgressBar) -> Result<Vec<f64>> {
        let mut scores = Vec::with_capacity(self.offsets.len());

        for &offset in &self.offsets {
            let encoded = self.ensure_segment_encode(variant, offset)?;
            let reference = self.ensure_reference_raw(offset, RawFormat::Y4m)?;

            let score = self
                .metrics
                .psnr(&self.store.path(&reference), &self.store.path(&encoded))?;

            debug!(variant = %variant.tag(), offset, score, "PSNR segment scored");
            scores.push(score);

            if self.settings.clean {
                self.store.remove(&reference)?;
                self.store.remove(&encoded)?;
            }

            progress.inc(1);
        }

        Ok(scores)
    }

    fn ensure_full_encode(&self, variant: &Variant) -> Result<()> {
        let id = naming::full_encode(
            &self.source.base_name,
            &self.source.codec,
            &variant.tag(),
            &self.source.extension,
        );

        if self.store.exists(&id) {
            info!(artifact = %id, "skipping existing full encode");
            return Ok(());
        }

        self.transcoder.encode_full(&FullEncode {
            input: self.store.path(&self.source.file_name),
            output: self.store.path(&id),
            codec: self.source.codec.clone(),
            rate: RateControl::from(variant),
            gop_size: self.settings.gop_size,
        })
    }

    /// Created at most once per offset and shared by every variant that
    /// reaches the same offset, until cleanup removes it.
    fn ensure_reference_raw(&self, offset: u64, format: RawFormat) -> Result<String> {
        let id = naming::reference_raw(&self.source.base_name, offset, format.extension());

        if self.store.exists(&id) {
            debug!(artifact = %id, "skipping existing raw reference");
        } else {
            self.transcoder.extract_raw_segment(&RawExtract {
                input: self.store.path(&self.source.file_name),
                output: self.store.path(&id),
                start: offset,
                duration: self.settings.segment_length,
            })?;
        }

        Ok(id)
    }

    fn ensure_raw_segment_encode(
        &self,
        variant: &Variant,
        offset: u64,
        reference: &str,
    ) -> Result<String> {
        let id = naming::segment_encode(
            &self.source.base_name,
            &self.source.codec,
            &variant.tag(),
            offset,
            &self.source.extension,
        );

        if self.store.exists(&id) {
            debug!(artifact = %id, "skipping existing segment encode");
        } else {
            self.transcoder.encode_from_raw(&RawSegmentEncode {
                input: self.store.path(reference),
                output: self.store.path(&id),
                codec: self.source.codec.clone(),
                rate: RateControl::from(variant),
                gop_size: self.settings.gop_size,
                width: self.source.width,
                height: self.source.height,
            })?;
        }

        Ok(id)
    }

    fn ensure_decoded_raw(&self, variant: &Variant, offset: u64, encoded: &str) -> Result<String> {
        let id = naming::segment_encode(
            &self.source.base_name,
            &self.source.codec,
            &variant.tag(),
            offset,
            RawFormat::Yuv.extension(),
        );

        if self.store.exists(&id) {
            debug!(artifact = %id, "skipping existing decoded segment");
        } else {
            self.transcoder.decode_to_raw(&RawDecode {
                input: self.store.path(encoded),
                output: self.store.path(&id),
            })?;
        }

        Ok(id)
    }

    /// The PSNR path encodes the segment from the original container with a
    /// time range. The artifact name is shared with the VMAF path, so
    /// whichever loop runs first produces the segment both consume.
    fn ensure_segment_encode(&self, variant: &Variant, offset: u64) -> Result<String> {
        let id = naming::segment_encode(
            &self.source.base_name,
            &self.source.codec,
            &variant.tag(),
            offset,
            &self.source.extension,
        );

        if self.store.exists(&id) {
            debug!(artifact = %id, "skipping existing segment encode");
        } else {
            self.transcoder.encode_segment(&SegmentEncode {
                input: self.store.path(&self.source.file_name),
                output: self.store.path(&id),
                codec: self.source.codec.clone(),
                rate: RateControl::from(variant),
                gop_size: self.settings.gop_size,
                start: offset,
                duration: self.settings.segment_length,
            })?;
        }

        Ok(id)
    }

    fn persist(&self, kind: MetricKind, mode: VariantMode) -> Result<()> {
        let report = match kind {
            MetricKind::Vmaf => &self.vmaf_scores,
            MetricKind::Psnr => &self.psnr_scores,
        };

        let path = self.report_path(mode, kind);
        report.persist(&path)?;
        info!(path = %path.display(), "score report written");

        Ok(())
    }
}
