//! `waymark run`: one query through the pipeline.

use std::path::PathBuf;

use waymark_config::AppConfig;
use waymark_pipeline::Pipeline;

use super::{load_retrieval, load_spec};

pub struct RunOptions {
    pub retrieval: PathBuf,
    pub spec: PathBuf,
    pub budget: Option<usize>,
    pub report: bool,
    pub pretty: bool,
}

pub async fn run(config: &AppConfig, opts: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let retrieval = load_retrieval(&opts.retrieval)?;
    let mut spec = load_spec(&opts.spec, config)?;
    if let Some(budget) = opts.budget {
        spec.max_tokens = budget;
    }

    let pipeline = Pipeline::from_config(config);
    let outcome = pipeline.run(&retrieval, &spec)?;

    let json = match (opts.report, opts.pretty) {
        (true, true) => serde_json::to_string_pretty(&outcome)?,
        (true, false) => serde_json::to_string(&outcome)?,
        (false, true) => outcome.generator_input().to_json_pretty()?,
        (false, false) => outcome.generator_input().to_json()?,
    };
    println!("{json}");
    Ok(())
}
