//! Report generation for collection results.
//!
//! JSON is the persisted artifact; Markdown is a human-readable summary.

pub mod json;
pub mod markdown;

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::EngineResult;
use crate::result::CollectionResult;

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// JSON output plus the dive-down companion.
    Json,
    /// Markdown summary.
    Markdown,
    /// Both formats.
    Both,
}

impl ReportFormat {
    fn json(self) -> bool {
        matches!(self, ReportFormat::Json | ReportFormat::Both)
    }

    fn markdown(self) -> bool {
        matches!(self, ReportFormat::Markdown | ReportFormat::Both)
    }
}

/// Generated report output.
#[derive(Debug, Clone, Default)]
pub struct ReportOutput {
    pub json: Option<String>,
    /// Dive-down companion, present only when some diagnostic has one.
    pub dive_down_json: Option<String>,
    pub markdown: Option<String>,
}

/// Collection report generator.
///
/// # Example
///
/// ```
/// use enso_metrics_core::reports::CollectionReport;
/// use enso_metrics_core::result::CollectionResult;
///
/// let report = CollectionReport::new(CollectionResult::new("ENSO_mini", "model"));
/// let json = report.to_json().unwrap();
/// assert!(json.contains("\"collection\": \"ENSO_mini\""));
/// ```
pub struct CollectionReport {
    result: CollectionResult,
}

impl CollectionReport {
    pub fn new(result: CollectionResult) -> Self {
        Self { result }
    }

    /// Pretty, deterministic JSON of the collection output.
    pub fn to_json(&self) -> EngineResult<String> {
        json::generate_json(&self.result)
    }

    pub fn to_markdown(&self) -> String {
        markdown::generate_markdown(&self.result)
    }

    /// Generate report in specified format.
    pub fn generate(&self, format: ReportFormat) -> EngineResult<ReportOutput> {
        let mut output = ReportOutput::default();
        if format.json() {
            output.json = Some(self.to_json()?);
            output.dive_down_json = json::generate_dive_down_json(&self.result)?;
        }
        if format.markdown() {
            output.markdown = Some(self.to_markdown());
        }
        Ok(output)
    }

    /// Write `<base>.json` (and `<base>_divedown.json` when dive-downs exist)
    /// and/or `<base>.md`. Returns the written paths.
    pub fn write_to_file(&self, format: ReportFormat, base_path: &Path) -> EngineResult<Vec<PathBuf>> {
        let output = self.generate(format)?;
        let mut written = Vec::new();

        if let Some(json_content) = output.json {
            let json_path = base_path.with_extension("json");
            std::fs::write(&json_path, json_content)?;
            written.push(json_path);
        }

        if let Some(dive_content) = output.dive_down_json {
            let dive_path = dive_down_path(base_path);
            std::fs::write(&dive_path, dive_content)?;
            written.push(dive_path);
        }

        if let Some(md_content) = output.markdown {
            let md_path = base_path.with_extension("md");
            std::fs::write(&md_path, md_content)?;
            written.push(md_path);
        }

        info!(
            collection = %self.result.collection,
            files = written.len(),
            "Collection report written"
        );
        Ok(written)
    }

    /// Get result reference.
    pub fn result(&self) -> &CollectionResult {
        &self.result
    }
}

fn dive_down_path(base_path: &Path) -> PathBuf {
    let stem = base_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    base_path.with_file_name(format!("{}_divedown.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::MetricEntry;
    use crate::types::{AxisCoordinates, AxisDescriptor, Diagnostic, DiveDown};
    use ndarray::ArrayD;

    fn with_dive_down() -> CollectionResult {
        let mut result = CollectionResult::new("ENSO_mini", "model");
        let mut entry = MetricEntry::default();
        entry.diagnostic.insert(
            "model".into(),
            Diagnostic::computed(1.0, None).with_dive_down(DiveDown {
                description: "series".into(),
                units: "C".into(),
                data: ArrayD::zeros(vec![2]),
                axes: vec![AxisDescriptor {
                    name: "x".into(),
                    units: None,
                    coordinates: AxisCoordinates::Values(vec![0.0, 1.0]),
                }],
            }),
        );
        result.metrics.insert("EnsoAmpl".into(), entry);
        result
    }

    #[test]
    fn test_write_json_and_dive_down() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("ENSO_mini_model");
        let report = CollectionReport::new(with_dive_down());

        let written = report.write_to_file(ReportFormat::Json, &base).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("ENSO_mini_model.json").exists());
        assert!(dir.path().join("ENSO_mini_model_divedown.json").exists());
    }

    #[test]
    fn test_write_both_without_dive_down() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("out");
        let report = CollectionReport::new(CollectionResult::new("ENSO_mini", "model"));

        let written = report.write_to_file(ReportFormat::Both, &base).unwrap();
        assert_eq!(written, vec![dir.path().join("out.json"), dir.path().join("out.md")]);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let report = CollectionReport::new(CollectionResult::new("ENSO_mini", "model"));
        let err = report
            .write_to_file(ReportFormat::Json, Path::new("/nonexistent/dir/out"))
            .unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Io(_)));
    }
}
