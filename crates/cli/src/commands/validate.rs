//! `waymark validate`: check a constraint spec and summarize it.

use std::path::Path;

use waymark_config::AppConfig;
use waymark_constraints::ConstraintEngine;
use waymark_core::WeightedKeywords;

use super::load_spec;

pub async fn run(config: &AppConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating {}...", path.display());

    let spec = match load_spec(path, config) {
        Ok(spec) => spec,
        Err(e) => {
            println!("   ❌ {e}");
            return Err(e);
        }
    };
    println!("   ✅ Spec is valid");
    println!();

    let engine = ConstraintEngine::new(&spec.hard);
    println!("   Budget:        {} tokens", spec.max_tokens);
    if engine.is_pass_through() {
        println!("   Hard filters:  none (pass-through)");
    } else {
        println!("   Hard filters:  {}", engine.predicates().len());
        for predicate in engine.predicates() {
            println!("     - {}", predicate.kind());
        }
    }

    let soft = &spec.soft;
    if soft.is_empty() {
        println!("   Preferences:   none");
    } else {
        println!("   Preferences:");
        if !soft.interests.is_empty() {
            println!("     - interests: {}", keywords(&soft.interests, config.ranking.interest));
        }
        if let Some(t) = soft.walking_tolerance {
            println!("     - walking tolerance: {t}");
        }
        if let Some(w) = soft.prefers_transit {
            println!("     - transit: +{w}");
        }
        for (chunk_type, weight) in soft.parsed_type_boosts()? {
            println!("     - {chunk_type} chunks: {weight:+}");
        }
        if !soft.avoid_soft_keywords.is_empty() {
            println!(
                "     - soft avoid: {}",
                keywords(&soft.avoid_soft_keywords, config.ranking.soft_avoid_penalty)
            );
        }
    }

    Ok(())
}

fn keywords(set: &WeightedKeywords, default: f32) -> String {
    set.resolve(default)
        .iter()
        .map(|(k, w)| format!("{k} ({w})"))
        .collect::<Vec<_>>()
        .join(", ")
}
