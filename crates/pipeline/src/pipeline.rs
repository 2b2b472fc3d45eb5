use serde::Serialize;
use tracing::{info, info_span, warn};
use waymark_config::AppConfig;
use waymark_constraints::{ConstraintEngine, EliminationReport};
use waymark_context::{ContextPacker, PackingPolicy, PreferenceRanker, RankingWeights};
use waymark_core::{ConstraintSpec, Error, PackedContext, RetrievalResult};

use crate::diagnostics::{Diagnostic, Grounding, diagnose};

/// Immutable settings shared by every run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub low_confidence_threshold: f32,
    pub packing: PackingPolicy,
    pub ranking: RankingWeights,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            low_confidence_threshold: config.pipeline.low_confidence_threshold,
            packing: config.packing.clone(),
            ranking: config.ranking,
        }
    }
}

/// Runs `Retrieved → Filtered → Ranked → Packed` for one query at a time.
///
/// Holds no per-query state, so one instance can serve concurrent queries
/// behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    settings: PipelineSettings,
    packer: ContextPacker,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        let packer = ContextPacker::new(settings.packing.clone());
        Self { settings, packer }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(PipelineSettings::from_config(config))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Validate, filter, rank and pack.
    ///
    /// Fails only on an invalid spec or a retrieval result that breaks the
    /// upstream contract. Empty or weak evidence is reported through
    /// [`PipelineOutcome::diagnostics`].
    pub fn run(
        &self,
        retrieval: &RetrievalResult,
        spec: &ConstraintSpec,
    ) -> Result<PipelineOutcome, Error> {
        spec.validate()?;
        retrieval.validate()?;

        let (filtered, report) = info_span!("filter", candidates = retrieval.len())
            .in_scope(|| ConstraintEngine::new(&spec.hard).apply(retrieval));

        let ranked = info_span!("rank", candidates = filtered.len()).in_scope(|| {
            PreferenceRanker::new(&spec.soft, self.settings.ranking).rank(&filtered)
        });

        let context = info_span!("pack", candidates = ranked.len(), budget = spec.max_tokens)
            .in_scope(|| self.packer.pack(&ranked, spec.max_tokens));

        let diagnostics = diagnose(
            retrieval,
            &filtered,
            &report,
            &context,
            self.settings.low_confidence_threshold,
        );
        for diagnostic in &diagnostics {
            warn!(query = %retrieval.query, ?diagnostic, "Degraded evidence");
        }
        let grounding = Grounding::assess(&context, &diagnostics);

        info!(
            query = %retrieval.query,
            retrieved = retrieval.len(),
            retained = report.retained,
            cited = context.citations.len(),
            tokens = context.token_count,
            %grounding,
            "Pipeline finished"
        );

        Ok(PipelineOutcome {
            query: retrieval.query.clone(),
            spec: spec.clone(),
            report,
            ranked,
            context,
            diagnostics,
            grounding,
        })
    }
}

/// Everything one run produced, for the generator and the evaluation
/// harness alike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub query: String,
    pub spec: ConstraintSpec,
    pub report: EliminationReport,
    /// Survivors of the hard filter in preference order.
    pub ranked: RetrievalResult,
    pub context: PackedContext,
    pub diagnostics: Vec<Diagnostic>,
    pub grounding: Grounding,
}

impl PipelineOutcome {
    /// The generator's input contract.
    pub fn generator_input(&self) -> GeneratorInput<'_> {
        GeneratorInput {
            query: &self.query,
            spec: &self.spec,
            context: &self.context,
            diagnostics: &self.diagnostics,
            grounding: self.grounding,
        }
    }

    pub fn has_diagnostic(&self, pred: impl Fn(&Diagnostic) -> bool) -> bool {
        self.diagnostics.iter().any(pred)
    }
}

/// What the text generator receives.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeneratorInput<'a> {
    pub query: &'a str,
    pub spec: &'a ConstraintSpec,
    pub context: &'a PackedContext,
    pub diagnostics: &'a [Diagnostic],
    pub grounding: Grounding,
}

impl GeneratorInput<'_> {
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
