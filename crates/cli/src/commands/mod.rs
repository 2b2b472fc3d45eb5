pub mod batch;
pub mod config_cmd;
pub mod run;
pub mod validate;

use std::path::Path;

use waymark_config::AppConfig;
use waymark_core::{ConstraintSpec, RetrievalResult, SpecFormat};

/// Read and validate a spec file. A spec without `max_tokens` takes the
/// configured default budget.
pub fn load_spec(
    path: &Path,
    config: &AppConfig,
) -> Result<ConstraintSpec, Box<dyn std::error::Error>> {
    let doc = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read spec {}: {e}", path.display()))?;
    let spec = ConstraintSpec::parse(
        &doc,
        SpecFormat::from_path(path),
        Some(config.pipeline.default_max_tokens),
    )?;
    Ok(spec)
}

pub fn load_retrieval(path: &Path) -> Result<RetrievalResult, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read retrieval result {}: {e}", path.display()))?;
    Ok(RetrievalResult::from_json(&json)?)
}
