use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use serde_json::Value;

use crate::types::{BestPracticeId, EngineTestId, StandardId};

/// Access Engine marks findings that need manual review with this test result code.
pub const NEEDS_REVIEW_TEST_RESULT: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Standard {
    pub id: StandardId,
    pub name: String,
}

impl Standard {
    pub fn new(id: StandardId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Sorts by name and drops repeated ids, keeping the first occurrence in name order.
pub fn sort_and_dedup_standards(standards: &mut Vec<Standard>) {
    standards.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.name.cmp(&right.name))
            .then_with(|| left.id.cmp(&right.id))
    });
    let mut seen = std::collections::HashSet::new();
    standards.retain(|standard| seen.insert(standard.id));
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixType {
    /// `true` when the fix is specific to this page's DOM rather than general guidance.
    pub dom_spec: Option<bool>,
    pub helper_text: Option<String>,
}

/// Best-practice metadata attached to a concern. Either the whole record is present or none of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPracticeEnrichment {
    pub description: String,
    pub severity: u8,
    pub noticeability: u8,
    pub tractability: u8,
    pub details_url: String,
    pub standards: Vec<Standard>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFixType {
    #[serde(default)]
    pub dom_spec: Option<Value>,
    #[serde(default)]
    pub helper_text: Option<String>,
    #[serde(default)]
    pub fix_type: Option<Value>,
    #[serde(default)]
    pub fix: Option<Value>,
}

/// One finding exactly as the rule engine emitted it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFinding {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub engine_test_id: Option<Value>,
    #[serde(default)]
    pub attribute_detail: Option<String>,
    #[serde(default)]
    pub best_practice_id: Option<Value>,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub fix_type: Option<RawFixType>,
    #[serde(default)]
    pub test_result: Option<Value>,
    #[serde(default)]
    pub fingerprint: Option<Value>,
}

impl RawFinding {
    pub fn needs_review(&self) -> bool {
        self.test_result.as_ref().and_then(Value::as_i64) == Some(NEEDS_REVIEW_TEST_RESULT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessibilityConcern {
    path: String,
    engine_test_id: Option<EngineTestId>,
    attribute: String,
    best_practice_id: Option<BestPracticeId>,
    element: String,
    fix_type: Option<FixType>,
    needs_review: bool,
    enrichment: Option<BestPracticeEnrichment>,
    raw: RawFinding,
}

impl AccessibilityConcern {
    pub(crate) fn new(
        engine_test_id: Option<EngineTestId>,
        best_practice_id: Option<BestPracticeId>,
        enrichment: Option<BestPracticeEnrichment>,
        raw: RawFinding,
    ) -> Self {
        let fix_type = raw.fix_type.as_ref().and_then(|fix_type| {
            let has_dom_spec = fix_type.dom_spec.as_ref().is_some_and(|v| !v.is_null());
            (has_dom_spec || fix_type.helper_text.is_some()).then(|| FixType {
                dom_spec: fix_type.dom_spec.as_ref().and_then(Value::as_bool),
                helper_text: fix_type.helper_text.clone(),
            })
        });

        Self {
            path: raw.path.clone().unwrap_or_default(),
            engine_test_id,
            attribute: raw.attribute_detail.clone().unwrap_or_default(),
            best_practice_id,
            element: raw.element.clone().unwrap_or_default(),
            fix_type,
            needs_review: raw.needs_review(),
            enrichment,
            raw,
        }
    }

    /// CSS (web) or XPath (mobile) selector of the offending element.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn engine_test_id(&self) -> Option<EngineTestId> {
        self.engine_test_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn best_practice_id(&self) -> Option<BestPracticeId> {
        self.best_practice_id
    }

    /// Source markup of the offending node.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn fix_type(&self) -> Option<&FixType> {
        self.fix_type.as_ref()
    }

    pub fn needs_review(&self) -> bool {
        self.needs_review
    }

    pub fn enrichment(&self) -> Option<&BestPracticeEnrichment> {
        self.enrichment.as_ref()
    }

    pub fn best_practice_description(&self) -> Option<&str> {
        self.enrichment.as_ref().map(|e| e.description.as_str())
    }

    pub fn severity(&self) -> Option<u8> {
        self.enrichment.as_ref().map(|e| e.severity)
    }

    pub fn noticeability(&self) -> Option<u8> {
        self.enrichment.as_ref().map(|e| e.noticeability)
    }

    pub fn tractability(&self) -> Option<u8> {
        self.enrichment.as_ref().map(|e| e.tractability)
    }

    pub fn best_practice_details_url(&self) -> Option<&str> {
        self.enrichment.as_ref().map(|e| e.details_url.as_str())
    }

    pub fn best_practice_standards(&self) -> Option<&[Standard]> {
        self.enrichment.as_ref().map(|e| e.standards.as_slice())
    }

    pub fn raw(&self) -> &RawFinding {
        &self.raw
    }
}

// Field list is explicit so the raw engine payload never leaks into serialized output.
impl Serialize for AccessibilityConcern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AccessibilityConcern", 13)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("engineTestId", &self.engine_test_id)?;
        state.serialize_field("attribute", &self.attribute)?;
        state.serialize_field("bestPracticeId", &self.best_practice_id)?;
        state.serialize_field("element", &self.element)?;
        state.serialize_field("fixType", &self.fix_type)?;
        state.serialize_field("needsReview", &self.needs_review)?;
        state.serialize_field("bestPracticeDescription", &self.best_practice_description())?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("noticeability", &self.noticeability())?;
        state.serialize_field("tractability", &self.tractability())?;
        state.serialize_field("bestPracticeDetailsUrl", &self.best_practice_details_url())?;
        state.serialize_field("bestPracticeStandards", &self.best_practice_standards())?;
        state.end()
    }
}
