use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    amp::{
        api::AmpApi,
        error::{ReportingError, http_error},
        types::Module,
    },
    concern::AccessibilityConcern,
    types::{BestPracticeId, ModuleId, ReportId},
};

/// AMP rejects instance fields longer than this many characters.
pub const MAX_INSTANCE_FIELD_CHARS: usize = 3000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInstance {
    pub element: String,
    pub attribute: String,
    pub xpath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_test_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    #[serde(rename = "violationID")]
    pub violation_id: Option<BestPracticeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
    pub violation: Violation,
    pub instances: Vec<UploadInstance>,
}

/// Upload records keyed by the best-practice id's string form (`"null"` when unknown).
pub type UploadRecords = BTreeMap<String, ViolationRecord>;

#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest {
    #[serde(rename = "reportID")]
    pub report_id: String,
    #[serde(rename = "moduleID")]
    pub module_id: String,
    pub overwrite: String,
    pub records: UploadRecords,
    #[serde(rename = "moduleName", skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(rename = "moduleLocation", skip_serializing_if = "Option::is_none")]
    pub module_location: Option<String>,
}

impl UploadRequest {
    pub fn new(
        report_id: ReportId,
        module_id: ModuleId,
        overwrite: bool,
        module: &Module,
        concerns: &[AccessibilityConcern],
    ) -> Self {
        Self {
            report_id: report_id.to_string(),
            module_id: module_id.to_string(),
            overwrite: overwrite.to_string(),
            records: build_records(concerns),
            module_name: module.name.clone().filter(|name| !name.is_empty()),
            module_location: module.location.clone().filter(|location| !location.is_empty()),
        }
    }
}

pub fn build_records(concerns: &[AccessibilityConcern]) -> UploadRecords {
    let mut records = UploadRecords::new();
    for concern in concerns {
        let key = concern
            .best_practice_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "null".to_string());
        records
            .entry(key)
            .or_insert_with(|| ViolationRecord {
                violation: Violation {
                    violation_id: concern.best_practice_id(),
                },
                instances: Vec::new(),
            })
            .instances
            .push(build_instance(concern));
    }

    records
}

pub fn build_instance(concern: &AccessibilityConcern) -> UploadInstance {
    let raw = concern.raw();
    let mut instance = UploadInstance {
        element: truncate_chars(concern.element(), MAX_INSTANCE_FIELD_CHARS),
        attribute: truncate_chars(concern.attribute(), MAX_INSTANCE_FIELD_CHARS),
        xpath: concern.path().to_string(),
        test_result: raw.test_result.clone(),
        engine_test_id: raw.engine_test_id.clone(),
        fix_type: None,
        fix: None,
        fingerprint: None,
    };

    // fix data and fingerprints feed downstream deduplication tooling
    if let Some(fix_type) = &raw.fix_type {
        instance.fix_type = fix_type.fix_type.clone().filter(|v| !v.is_null());
        instance.fix = fix_type.fix.clone().filter(|v| !v.is_null());
        instance.fingerprint = raw.fingerprint.clone().filter(|v| !v.is_null());
    }

    instance
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Performs the final upload once the report and module are known to exist.
#[derive(Clone)]
pub struct UploadClient {
    api: AmpApi,
}

impl UploadClient {
    pub fn new(api: AmpApi) -> Self {
        Self { api }
    }

    /// True iff AMP acknowledged the module id in its response.
    pub async fn submit(
        &self,
        report_id: ReportId,
        module_id: ModuleId,
        overwrite: bool,
        module: &Module,
        concerns: &[AccessibilityConcern],
    ) -> Result<bool, ReportingError> {
        let request = UploadRequest::new(report_id, module_id, overwrite, module, concerns);
        let body = serde_json::to_value(&request)
            .map_err(|err| http_error(format!("failed to encode upload body: {err}")))?;

        tracing::info!(
            target: "amp",
            report_id,
            module_id,
            overwrite,
            records = request.records.len(),
            concerns = concerns.len(),
            "module_upload_started"
        );

        let response = self.api.upload_module(&body).await?;
        let accepted = response
            .as_ref()
            .and_then(|value| value.get("moduleId"))
            .is_some_and(is_truthy);

        tracing::info!(target: "amp", report_id, module_id, accepted, "module_upload_completed");
        Ok(accepted)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
