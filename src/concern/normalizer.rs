use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    amp::error::{ReportingError, illegal_argument},
    concern::{
        catalog::BestPracticeCatalog,
        types::{AccessibilityConcern, RawFinding},
    },
    types::parse_lenient_u64,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizerOptions {
    /// Keep findings the engine flags for manual review (test result code 3).
    #[serde(default)]
    pub include_potential_concerns: bool,
}

pub struct Normalizer<'a> {
    catalog: &'a BestPracticeCatalog,
    options: NormalizerOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(catalog: &'a BestPracticeCatalog, options: NormalizerOptions) -> Self {
        Self { catalog, options }
    }

    /// One concern per finding, except that findings with test result 3 (needs review) are
    /// dropped unless `include_potential_concerns` is set. Engine output that already mixes
    /// definite and potential results is filtered here too.
    pub fn normalize(&self, raw_findings: Vec<RawFinding>) -> Vec<AccessibilityConcern> {
        let total = raw_findings.len();
        let concerns: Vec<AccessibilityConcern> = raw_findings
            .into_iter()
            .filter(|raw| self.options.include_potential_concerns || !raw.needs_review())
            .map(|raw| self.normalize_one(raw))
            .collect();

        tracing::debug!(
            target: "normalizer",
            raw_findings = total,
            concerns = concerns.len(),
            enriched = concerns.iter().filter(|c| c.enrichment().is_some()).count(),
            "findings_normalized"
        );
        concerns
    }

    /// Parses the engine's JSON array of findings. `null` or blank input yields no concerns.
    pub fn normalize_json(&self, text: &str) -> Result<Vec<AccessibilityConcern>, ReportingError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let raw_findings: Option<Vec<RawFinding>> = serde_json::from_str(text)
            .map_err(|err| illegal_argument(format!("invalid engine results: {err}")))?;
        Ok(self.normalize(raw_findings.unwrap_or_default()))
    }

    pub fn normalize_one(&self, raw: RawFinding) -> AccessibilityConcern {
        let best_practice_id = raw.best_practice_id.as_ref().and_then(parse_lenient_u64);
        let engine_test_id = raw.engine_test_id.as_ref().and_then(parse_lenient_u64);
        let enrichment = best_practice_id.and_then(|id| self.catalog.get(id).cloned());

        AccessibilityConcern::new(engine_test_id, best_practice_id, enrichment, raw)
    }
}

/// Convenience for callers holding engine output as a JSON value rather than text.
pub fn raw_findings_from_value(value: Value) -> Result<Vec<RawFinding>, ReportingError> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other)
            .map_err(|err| illegal_argument(format!("invalid engine results: {err}"))),
    }
}
