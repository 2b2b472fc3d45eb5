//! `waymark batch`: run a directory of request files concurrently.
//!
//! Each `*.json` file holds `{"retrieval": {...}, "spec": {...}}`. Results
//! are printed as one JSON line per file, in file-name order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use waymark_config::AppConfig;
use waymark_core::{ConstraintSpec, RetrievalResult, SpecFormat};
use waymark_pipeline::Pipeline;

#[derive(Debug, Deserialize)]
struct BatchRequest {
    retrieval: RetrievalResult,
    spec: serde_json::Value,
}

pub async fn run(
    config: AppConfig,
    dir: &Path,
    concurrency: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if concurrency == 0 {
        return Err("concurrency must be at least 1".into());
    }

    let files = request_files(dir)?;
    if files.is_empty() {
        println!("📭 No request files in {}", dir.display());
        return Ok(());
    }
    info!(files = files.len(), concurrency, "Starting batch");

    let pipeline = Arc::new(Pipeline::from_config(&config));
    let default_budget = config.pipeline.default_max_tokens;

    let mut results: Vec<Option<serde_json::Value>> = vec![None; files.len()];
    let mut set = JoinSet::new();
    let mut pending = files.iter().cloned().enumerate();

    loop {
        while set.len() < concurrency {
            let Some((idx, path)) = pending.next() else {
                break;
            };
            let pipeline = Arc::clone(&pipeline);
            set.spawn_blocking(move || (idx, process(&pipeline, &path, default_budget)));
        }

        let Some(joined) = set.join_next().await else {
            break;
        };
        let (idx, result) = joined?;
        results[idx] = Some(result);
    }

    let mut failed = 0;
    for (path, result) in files.iter().zip(results) {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let line = match result {
            Some(mut value) => {
                if value.get("error").is_some() {
                    failed += 1;
                }
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("file".into(), serde_json::Value::String(file));
                }
                value
            }
            None => {
                failed += 1;
                serde_json::json!({ "file": file, "error": "request was not processed" })
            }
        };
        println!("{line}");
    }

    let total = files.len();
    eprintln!("✅ {} succeeded, ❌ {failed} failed ({total} total)", total - failed);
    if failed > 0 {
        return Err(format!("{failed} of {total} requests failed").into());
    }
    Ok(())
}

fn request_files(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read batch directory {}: {e}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if path.is_file() && is_json {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run one request file. Failures become an `{"error": ...}` object so a
/// bad file never aborts the batch.
fn process(pipeline: &Pipeline, path: &Path, default_budget: usize) -> serde_json::Value {
    match run_request(pipeline, path, default_budget) {
        Ok(outcome) => serde_json::json!({ "outcome": outcome }),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Batch request failed");
            serde_json::json!({ "error": e })
        }
    }
}

fn run_request(
    pipeline: &Pipeline,
    path: &Path,
    default_budget: usize,
) -> Result<serde_json::Value, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("read failed: {e}"))?;
    let request: BatchRequest =
        serde_json::from_str(&raw).map_err(|e| format!("invalid request: {e}"))?;
    let spec = ConstraintSpec::parse(
        &request.spec.to_string(),
        SpecFormat::Json,
        Some(default_budget),
    )
    .map_err(|e| e.to_string())?;
    let outcome = pipeline
        .run(&request.retrieval, &spec)
        .map_err(|e| e.to_string())?;
    serde_json::to_value(&outcome).map_err(|e| e.to_string())
}
