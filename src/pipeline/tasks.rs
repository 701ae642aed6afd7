use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::app::transform_use_case::TransformArchiveUseCase;
use crate::config::Config;
use crate::domain::EntityKind;
use crate::infra::archive_store::FilesystemArchiveStore;
use crate::infra::record_output_adapter::FileRecordOutput;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformParams {
    pub object_key: String,
    pub output_dir: Option<String>,
    pub exclusion_pattern: Option<String>,
}

impl TransformParams {
    pub fn new(object_key: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformResult {
    pub object_key: String,
    pub output_dir: String,
    pub documents: usize,
    pub records_by_kind: BTreeMap<EntityKind, usize>,
}

/// Output subdirectory for one archive, so concurrent runs never share files
pub fn output_subdirectory(object_key: &str) -> String {
    object_key
        .trim_matches('/')
        .replace(['/', '\\'], "_")
}

/// Transforms one archive from the configured source root into per-kind
/// files under `<output_dir>/<object key>`
pub fn transform_once(config: &Config, params: TransformParams) -> Result<TransformResult> {
    let base_dir = params
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());
    let output_dir = Path::new(&base_dir).join(output_subdirectory(&params.object_key));

    let options = config.walk_options(params.exclusion_pattern.as_deref())?;
    let source = FilesystemArchiveStore::new(PathBuf::from(&config.source.root_dir));
    let output = FileRecordOutput::create(&output_dir, &config.output.files)?;

    let mut use_case = TransformArchiveUseCase::new(Box::new(source), Box::new(output), options);
    let summary = match use_case.run(&params.object_key) {
        Ok(summary) => summary,
        Err(e) => {
            // A failed walk leaves no output behind
            drop(use_case);
            if let Err(cleanup) = fs::remove_dir_all(&output_dir) {
                warn!("failed to remove {}: {}", output_dir.display(), cleanup);
            }
            return Err(e);
        }
    };

    Ok(TransformResult {
        object_key: summary.object_key,
        output_dir: output_dir.display().to_string(),
        documents: summary.documents,
        records_by_kind: summary.records_by_kind,
    })
}

/// Runs [`transform_once`] for every archive on the blocking pool. Each
/// archive gets its own walker and sink; results come back in input order.
pub async fn transform_many(
    config: Arc<Config>,
    params: Vec<TransformParams>,
) -> Vec<Result<TransformResult>> {
    let handles: Vec<_> = params
        .into_iter()
        .map(|params| {
            let config = config.clone();
            let object_key = params.object_key.clone();
            let handle = tokio::task::spawn_blocking(move || transform_once(&config, params));
            (object_key, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (object_key, handle) in handles {
        let result = handle
            .await
            .map_err(|e| anyhow!("transform task for {} failed: {}", object_key, e))
            .and_then(|result| result);
        match &result {
            Ok(result) => info!(
                "{}: {} documents -> {}",
                result.object_key, result.documents, result.output_dir
            ),
            Err(e) => error!("{:#}", e),
        }
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_subdirectory_flattens_key() {
        assert_eq!(output_subdirectory("2018/01/archive.zip"), "2018_01_archive.zip");
        assert_eq!(output_subdirectory("/archive.zip"), "archive.zip");
    }
}
