use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use crate::app::ports::{ArchiveSourcePort, RecordOutputPort};
use crate::domain::EntityKind;
use crate::observability::metrics;
use crate::pipeline::ingestion::archive::{ArchiveWalker, WalkOptions};

/// Counts for one transformed archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub object_key: String,
    pub documents: usize,
    pub records_by_kind: BTreeMap<EntityKind, usize>,
}

impl TransformSummary {
    pub fn total_records(&self) -> usize {
        self.records_by_kind.values().sum()
    }
}

/// Fetches an archive, walks its documents and writes every record to the
/// output. The first failing document aborts the run.
pub struct TransformArchiveUseCase {
    source: Box<dyn ArchiveSourcePort>,
    output: Box<dyn RecordOutputPort>,
    options: WalkOptions,
}

impl TransformArchiveUseCase {
    pub fn new(
        source: Box<dyn ArchiveSourcePort>,
        output: Box<dyn RecordOutputPort>,
        options: WalkOptions,
    ) -> Self {
        Self {
            source,
            output,
            options,
        }
    }

    pub fn run(&mut self, object_key: &str) -> Result<TransformSummary> {
        let span = info_span!("transform", object_key = %object_key);
        let _enter = span.enter();

        let bytes = self
            .source
            .fetch(object_key)
            .with_context(|| format!("Failed to fetch archive {}", object_key))?;
        info!("fetched {} bytes", bytes.len());

        let walker = ArchiveWalker::open(bytes, object_key, &self.options)
            .with_context(|| format!("Failed to open archive {}", object_key))?;

        let mut summary = TransformSummary {
            object_key: object_key.to_string(),
            ..TransformSummary::default()
        };
        for document in walker {
            let document = document.with_context(|| format!("Failed to transform {}", object_key))?;
            summary.documents += 1;
            for entity in document.into_entities() {
                self.output.write_entity(&entity)?;
                *summary.records_by_kind.entry(entity.kind()).or_insert(0) += 1;
            }
        }
        self.output.finish()?;

        for (kind, count) in &summary.records_by_kind {
            metrics::output::records_written(kind.as_str(), *count as u64);
        }
        metrics::archive::processed();
        info!(
            "transformed {} documents into {} records",
            summary.documents,
            summary.total_records()
        );
        Ok(summary)
    }
}
