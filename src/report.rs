use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::VariantMode;
use crate::error::Result;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Psnr,
    Vmaf,
}

impl MetricKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Psnr => "psnr",
            Self::Vmaf => "vmaf",
        }
    }
}

/// Report file name, e.g. `clip_crf_psnr.json`.
#[must_use]
pub fn file_name(base: &str, mode: VariantMode, kind: MetricKind) -> String {
    format!("{base}_{}_{}.json", mode.label(), kind.label())
}

/// Mapping from variant key to per-segment scores, ordered by segment offset
/// ascending. Keys keep insertion order, matching variant input order, so a
/// plain sorted map will not do.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreReport {
    entries: Vec<(String, Vec<f64>)>,
}

impl ScoreReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the score sequence for a variant key.
    pub fn insert(&mut self, key: String, scores: Vec<f64>) {
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            entry.1 = scores;
        } else {
            self.entries.push((key, scores));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, scores)| scores.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the full accumulated mapping, pretty-printed, replacing any
    /// previous file via a temporary-file rename.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let temporary = path.with_extension("tmp.json");

        let file = File::create(&temporary)?;
        serde_json::to_writer_pretty(&file, self)?;
        fs::rename(&temporary, path)?;

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        Ok(serde_json::from_reader(reader)?)
    }
}

impl Serialize for ScoreReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;

        for (key, scores) in &self.entries {
            map.serialize_entry(key, scores)?;
        }

        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ReportVisitor;

        impl<'de> Visitor<'de> for ReportVisitor {
            type Value = ScoreReport;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a map of variant keys to score sequences")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut report = ScoreReport::new();

                while let Some((key, scores)) = access.next_entry::<String, Vec<f64>>()? {
                    report.insert(key, scores);
                }

                Ok(report)
            }
        }

        deserializer.deserialize_map(ReportVisitor)
    }
}
