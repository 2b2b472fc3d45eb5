//! `waymark config`: configuration management commands.

use waymark_config::{AppConfig, ConfigError};

pub async fn validate(loaded: Result<AppConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match loaded {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.packing.dedup_threshold < 0.5 {
                warnings.push("Dedup threshold below 0.5 will merge loosely related chunks");
            }

            if config.pipeline.low_confidence_threshold == 0.0 {
                warnings.push("Low-confidence threshold is 0; weak evidence will never be flagged");
            }

            if !config.packing.labels {
                warnings.push("Entry labels are off; the generator cannot reference [n] citations");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Default budget:   {} tokens", config.pipeline.default_max_tokens);
            println!("   Low confidence:   {}", config.pipeline.low_confidence_threshold);
            println!(
                "   Packing:          {:?}, dedup ≥ {}",
                config.packing.scan, config.packing.dedup_threshold
            );
            println!("   Estimator:        {:?}", config.packing.estimator);
            println!(
                "   Logging:          {}{}",
                config.logging.level,
                if config.logging.json { " (json)" } else { "" }
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}
