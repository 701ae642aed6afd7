//! Counters for the archive transform
//!
//! Names follow the Prometheus conventions. Nothing is recorded until [`init`]
//! installs the recorder, so library users and tests pay nothing for them.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Every metric the pipeline emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Archive metrics
    ArchivesProcessed,
    MembersExcluded,

    // Document metrics
    DocumentsParsed,
    DocumentsFailed,
    GeneratedPersonIds,

    // Output metrics
    RecordsWritten,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ArchivesProcessed => "ejp_archives_processed_total",
            MetricName::MembersExcluded => "ejp_members_excluded_total",
            MetricName::DocumentsParsed => "ejp_documents_parsed_total",
            MetricName::DocumentsFailed => "ejp_documents_failed_total",
            MetricName::GeneratedPersonIds => "ejp_generated_person_ids_total",
            MetricName::RecordsWritten => "ejp_records_written_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            ArchivesProcessed,
            MembersExcluded,
            DocumentsParsed,
            DocumentsFailed,
            GeneratedPersonIds,
            RecordsWritten,
        ]
        .into_iter()
    }

    /// (phase, description, label key)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::ArchivesProcessed => ("archive", "Archives walked to the end", None),
            MetricName::MembersExcluded => {
                ("archive", "Members skipped by the exclusion pattern", None)
            }
            MetricName::DocumentsParsed => ("document", "Documents transformed", Some("kind")),
            MetricName::DocumentsFailed => ("document", "Documents that failed to transform", None),
            MetricName::GeneratedPersonIds => {
                ("document", "Person records given a generated id", None)
            }
            MetricName::RecordsWritten => ("output", "Records written to a sink", Some("kind")),
        }
    }

    pub fn increment(&self) {
        self.increment_by(1);
    }

    pub fn increment_by(&self, count: u64) {
        ::metrics::counter!(self.as_str()).increment(count);
    }

    /// Increments the series labelled with the metric's label key
    pub fn increment_for(&self, label: &'static str) {
        let key = self.metadata().2.unwrap_or("kind");
        ::metrics::counter!(self.as_str(), key => label).increment(1);
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    for metric in MetricName::all_metrics() {
        let (_, description, _) = metric.metadata();
        ::metrics::describe_counter!(metric.as_str(), description);
    }
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Exposition text, or `None` before [`init`]
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Writes the exposition text to `path`. Returns false before [`init`].
pub fn write_rendered(path: &Path) -> io::Result<bool> {
    let Some(text) = render() else {
        return Ok(false);
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(true)
}

// ============================================================================
// Archive Metrics
// ============================================================================

pub mod archive {
    use super::MetricName;

    pub fn processed() {
        MetricName::ArchivesProcessed.increment();
    }
}

// ============================================================================
// Output Metrics
// ============================================================================

pub mod output {
    use super::MetricName;

    pub fn records_written(kind: &'static str, count: u64) {
        if count == 0 {
            return;
        }
        ::metrics::counter!(MetricName::RecordsWritten.as_str(), "kind" => kind).increment(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_counters() {
        let names: HashSet<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::all_metrics().count());
        assert!(names.iter().all(|name| name.starts_with("ejp_") && name.ends_with("_total")));
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(
            MetricName::DocumentsParsed.to_string(),
            "ejp_documents_parsed_total"
        );
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        MetricName::DocumentsFailed.increment();
        MetricName::DocumentsParsed.increment_for("person");
        output::records_written("person", 3);
    }
}
