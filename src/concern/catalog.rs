use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    amp::{
        api::AmpApi,
        error::{ReportingError, http_error},
    },
    concern::types::{
        AccessibilityConcern, BestPracticeEnrichment, Standard, sort_and_dedup_standards,
    },
    types::{BestPracticeId, StandardId, parse_lenient_u64},
};

/// Section 508 (revised 2017), WCAG 2.0 A/AA/AAA plus the A & AA baseline, WCAG 2.1 A/AA/AAA.
pub const DEFAULT_STANDARD_IDS: [StandardId; 8] = [1140, 610, 1471, 611, 612, 1387, 1388, 1389];

const MIN_SCORE: u64 = 1;
const MAX_SCORE: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestPracticeEntry {
    #[serde(default, rename = "bestPracticeID")]
    best_practice_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(default)]
    noticeability: Option<Value>,
    #[serde(default)]
    tractability: Option<Value>,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    standards: Option<BTreeMap<String, Option<String>>>,
}

/// Best-practice metadata keyed by id, loaded once per session.
#[derive(Debug, Clone, Default)]
pub struct BestPracticeCatalog {
    entries: HashMap<BestPracticeId, BestPracticeEnrichment>,
    best_practice_names: BTreeMap<BestPracticeId, String>,
    standard_names: BTreeMap<StandardId, String>,
}

impl BestPracticeCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Never fails: a fetch or decode error leaves the catalog empty and concerns unenriched.
    pub async fn fetch(api: &AmpApi, standard_filter: Option<&[StandardId]>) -> Self {
        match Self::try_fetch(api, standard_filter).await {
            Ok(catalog) => {
                tracing::info!(
                    target: "catalog",
                    best_practices = catalog.len(),
                    standards = catalog.standard_names.len(),
                    "best_practice_catalog_loaded"
                );
                catalog
            }
            Err(err) => {
                tracing::warn!(
                    target: "catalog",
                    error = %err,
                    "best_practice_catalog_unavailable; concerns will not be enriched"
                );
                Self::empty()
            }
        }
    }

    async fn try_fetch(
        api: &AmpApi,
        standard_filter: Option<&[StandardId]>,
    ) -> Result<Self, ReportingError> {
        let payload = api.fetch_best_practices().await?.unwrap_or(Value::Array(Vec::new()));
        Self::from_json(payload, standard_filter)
    }

    pub fn from_json(
        payload: Value,
        standard_filter: Option<&[StandardId]>,
    ) -> Result<Self, ReportingError> {
        let entries: Vec<BestPracticeEntry> = serde_json::from_value(payload).map_err(|err| {
            http_error(format!("unexpected best practice payload shape: {err}"))
        })?;

        let mut catalog = Self::empty();
        for entry in entries {
            catalog.ingest(entry, standard_filter);
        }

        Ok(catalog)
    }

    fn ingest(&mut self, entry: BestPracticeEntry, standard_filter: Option<&[StandardId]>) {
        let Some(best_practice_id) = entry.best_practice_id.as_ref().and_then(parse_lenient_u64)
        else {
            tracing::warn!(target: "catalog", "best_practice_entry_skipped: missing id");
            return;
        };

        let mut standards = Vec::new();
        for (raw_id, raw_name) in entry.standards.iter().flatten() {
            let (Some(standard_id), Some(name)) = (
                parse_lenient_u64(&Value::String(raw_id.clone())),
                raw_name.as_deref().map(str::trim).filter(|name| !name.is_empty()),
            ) else {
                continue;
            };

            if standard_filter.is_none_or(|ids| ids.contains(&standard_id)) {
                standards.push(Standard::new(standard_id, name));
            }
            self.standard_names
                .insert(standard_id, name.to_string());
        }
        sort_and_dedup_standards(&mut standards);

        if let Some(name) = entry.name.as_deref() {
            self.best_practice_names
                .insert(best_practice_id, name.to_string());
        }

        match build_enrichment(&entry, standards) {
            Ok(enrichment) => {
                self.entries.insert(best_practice_id, enrichment);
            }
            Err(field) => tracing::warn!(
                target: "catalog",
                best_practice_id,
                field,
                "best_practice_entry_incomplete; enrichment disabled for this best practice"
            ),
        }
    }

    pub fn insert(&mut self, best_practice_id: BestPracticeId, enrichment: BestPracticeEnrichment) {
        self.best_practice_names
            .insert(best_practice_id, enrichment.description.clone());
        for standard in &enrichment.standards {
            self.standard_names
                .insert(standard.id, standard.name.clone());
        }
        self.entries.insert(best_practice_id, enrichment);
    }

    pub fn get(&self, best_practice_id: BestPracticeId) -> Option<&BestPracticeEnrichment> {
        self.entries.get(&best_practice_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every standard AMP associates with any best practice, id → name.
    pub fn supported_standards(&self) -> &BTreeMap<StandardId, String> {
        &self.standard_names
    }

    pub fn best_practice_names(&self) -> &BTreeMap<BestPracticeId, String> {
        &self.best_practice_names
    }
}

/// Keeps concerns whose best practice maps to at least one of `standard_ids`.
pub fn filter_by_standards(
    concerns: &[AccessibilityConcern],
    standard_ids: &[StandardId],
) -> Vec<AccessibilityConcern> {
    let wanted: HashSet<StandardId> = standard_ids.iter().copied().collect();
    concerns
        .iter()
        .filter(|concern| {
            concern
                .best_practice_standards()
                .is_some_and(|standards| standards.iter().any(|s| wanted.contains(&s.id)))
        })
        .cloned()
        .collect()
}

pub fn filter_by_best_practices(
    concerns: &[AccessibilityConcern],
    best_practice_ids: &[BestPracticeId],
) -> Vec<AccessibilityConcern> {
    concerns
        .iter()
        .filter(|concern| {
            concern
                .best_practice_id()
                .is_some_and(|id| best_practice_ids.contains(&id))
        })
        .cloned()
        .collect()
}

/// All or nothing; the error names the first field that was missing or out of range.
fn build_enrichment(
    entry: &BestPracticeEntry,
    standards: Vec<Standard>,
) -> Result<BestPracticeEnrichment, &'static str> {
    Ok(BestPracticeEnrichment {
        description: entry
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or("name")?,
        severity: parse_score(entry.severity.as_ref()).ok_or("severity")?,
        noticeability: parse_score(entry.noticeability.as_ref()).ok_or("noticeability")?,
        tractability: parse_score(entry.tractability.as_ref()).ok_or("tractability")?,
        details_url: entry
            .href
            .clone()
            .filter(|href| !href.is_empty())
            .ok_or("href")?,
        standards,
    })
}

fn parse_score(value: Option<&Value>) -> Option<u8> {
    value
        .and_then(parse_lenient_u64)
        .filter(|score| (MIN_SCORE..=MAX_SCORE).contains(score))
        .and_then(|score| u8::try_from(score).ok())
}
