use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{Value, json};

use continuum_amp::{
    amp::{
        AmpTransport, ReportingError, ReportingService,
        error::map_http_status,
        types::{
            ASSET_VALIDATE_PATH, BEST_PRACTICES_PATH, MODULE_CREATE_PATH, MODULE_UPLOAD_PATH,
            MODULE_VALIDATE_PATH, ORGANIZATION_VALIDATE_PATH, REPORT_CREATE_PATH,
            REPORT_OVERWRITE_PATH, REPORT_VALIDATE_PATH,
        },
    },
    concern::{AccessibilityConcern, BestPracticeCatalog, Normalizer, NormalizerOptions},
};

pub const ORGANIZATION_ID: u64 = 12;
pub const ASSET_ID: u64 = 34;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeModule {
    pub name: String,
    pub uploads: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeReport {
    pub asset_id: u64,
    pub name: String,
    pub modules: BTreeMap<u64, FakeModule>,
}

#[derive(Default)]
pub struct FakeState {
    pub organizations: BTreeSet<u64>,
    pub assets: BTreeSet<u64>,
    pub reports: BTreeMap<u64, FakeReport>,
    pub next_id: u64,
    pub requests: Vec<RecordedRequest>,
    pub best_practices: Value,
    /// Replaces the report create response when set.
    pub report_create_response: Option<Value>,
    /// Replaces the (normally empty) overwrite response when set.
    pub overwrite_response: Option<Value>,
    /// Replaces the upload response when set.
    pub upload_response: Option<Value>,
    /// Paths answering with this HTTP status instead of a body.
    pub failing_paths: BTreeMap<String, u16>,
}

/// In-memory AMP instance speaking the same JSON as the real endpoints.
#[derive(Clone, Default)]
pub struct FakeAmp {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAmp {
    pub fn new() -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state();
            state.organizations.insert(ORGANIZATION_ID);
            state.assets.insert(ASSET_ID);
            state.next_id = 100;
            state.best_practices = json!([]);
        }
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake AMP state should not be poisoned")
    }

    pub fn service(&self) -> ReportingService {
        ReportingService::new(Arc::new(self.clone()))
    }

    pub fn add_report(&self, name: &str) -> u64 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.reports.insert(
            id,
            FakeReport {
                asset_id: ASSET_ID,
                name: name.to_string(),
                modules: BTreeMap::new(),
            },
        );
        id
    }

    pub fn add_module(&self, report_id: u64, name: &str) -> u64 {
        let mut state = self.state();
        let id = state.allocate_id();
        state
            .reports
            .get_mut(&report_id)
            .expect("report should exist before adding modules")
            .modules
            .insert(
                id,
                FakeModule {
                    name: name.to_string(),
                    uploads: Vec::new(),
                },
            );
        id
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.path)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.paths().iter().filter(|p| p.as_str() == path).count()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }

    pub fn report(&self, report_id: u64) -> Option<FakeReport> {
        self.state().reports.get(&report_id).cloned()
    }

    pub fn report_names(&self) -> Vec<String> {
        self.state()
            .reports
            .values()
            .map(|report| report.name.clone())
            .collect()
    }
}

impl FakeState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn answer_get(&self, path: &str, query: &[(&str, String)]) -> Option<Value> {
        let param = |name: &str| {
            query
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
        };
        let id_param = |name: &str| param(name).and_then(|value| value.parse::<u64>().ok());

        match path {
            ORGANIZATION_VALIDATE_PATH => {
                let valid = id_param("organizationId")
                    .is_some_and(|id| self.organizations.contains(&id));
                Some(validity(valid, "organization does not exist"))
            }
            ASSET_VALIDATE_PATH => {
                let valid = id_param("assetId").is_some_and(|id| self.assets.contains(&id));
                Some(validity(valid, "asset does not exist"))
            }
            REPORT_VALIDATE_PATH => {
                let asset_id = id_param("assetId");
                let found = self.reports.iter().find(|(id, report)| {
                    Some(report.asset_id) == asset_id
                        && match (id_param("reportId"), param("reportName")) {
                            (Some(report_id), _) => **id == report_id,
                            (None, Some(name)) => report.name == name,
                            (None, None) => false,
                        }
                });
                Some(match found {
                    Some((id, _)) => json!({"valid": true, "reportId": id.to_string()}),
                    None => validity(false, "report does not exist"),
                })
            }
            MODULE_VALIDATE_PATH => {
                let found = id_param("reportId")
                    .and_then(|report_id| self.reports.get(&report_id))
                    .and_then(|report| {
                        report.modules.iter().find(|(id, module)| {
                            match (id_param("moduleId"), param("moduleName")) {
                                (Some(module_id), _) => **id == module_id,
                                (None, Some(name)) => module.name == name,
                                (None, None) => false,
                            }
                        })
                    });
                Some(match found {
                    Some((id, _)) => json!({"valid": true, "moduleId": id}),
                    None => validity(false, "module does not exist"),
                })
            }
            BEST_PRACTICES_PATH => Some(self.best_practices.clone()),
            _ => Some(validity(false, "unknown endpoint")),
        }
    }

    fn answer_post(&mut self, path: &str, body: &Value) -> Option<Value> {
        let id_field = |name: &str| match &body[name] {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.parse::<u64>().ok(),
            _ => None,
        };

        match path {
            REPORT_CREATE_PATH => {
                if let Some(response) = self.report_create_response.clone() {
                    return Some(response);
                }
                let id = self.allocate_id();
                self.reports.insert(
                    id,
                    FakeReport {
                        asset_id: id_field("assetId").unwrap_or_default(),
                        name: body["reportName"].as_str().unwrap_or_default().to_string(),
                        modules: BTreeMap::new(),
                    },
                );
                Some(json!({"valid": true, "reportId": id.to_string()}))
            }
            REPORT_OVERWRITE_PATH => {
                if let Some(response) = self.overwrite_response.clone() {
                    return Some(response);
                }
                if let Some(report) = id_field("reportId").and_then(|id| self.reports.get_mut(&id))
                {
                    report.modules.clear();
                }
                None
            }
            MODULE_CREATE_PATH => {
                let Some(report_id) = id_field("reportId").filter(|id| self.reports.contains_key(id))
                else {
                    return Some(validity(false, "report does not exist"));
                };
                let id = self.allocate_id();
                if let Some(report) = self.reports.get_mut(&report_id) {
                    report.modules.insert(
                        id,
                        FakeModule {
                            name: body["moduleName"].as_str().unwrap_or_default().to_string(),
                            uploads: Vec::new(),
                        },
                    );
                }
                Some(json!({"valid": true, "moduleId": id}))
            }
            MODULE_UPLOAD_PATH => {
                if let Some(response) = self.upload_response.clone() {
                    return Some(response);
                }
                let module = id_field("reportID")
                    .and_then(|report_id| self.reports.get_mut(&report_id))
                    .zip(id_field("moduleID"))
                    .and_then(|(report, module_id)| report.modules.get_mut(&module_id));
                match module {
                    Some(module) => {
                        module.uploads.push(body.clone());
                        Some(json!({"moduleId": body["moduleID"].clone()}))
                    }
                    None => Some(json!({})),
                }
            }
            _ => Some(validity(false, "unknown endpoint")),
        }
    }
}

fn validity(valid: bool, message: &str) -> Value {
    if valid {
        json!({"valid": true})
    } else {
        json!({"valid": false, "message": message})
    }
}

#[async_trait]
impl AmpTransport for FakeAmp {
    fn instance(&self) -> &str {
        "amp.test"
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        _include_token: bool,
    ) -> Result<Option<Value>, ReportingError> {
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            body: None,
        });
        if let Some(status) = state.failing_paths.get(path) {
            return Err(map_http_status(*status, path, "fake failure"));
        }
        Ok(state.answer_get(path, query))
    }

    async fn post(
        &self,
        path: &str,
        body: &Value,
        _include_token: bool,
    ) -> Result<Option<Value>, ReportingError> {
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        });
        if let Some(status) = state.failing_paths.get(path) {
            return Err(map_http_status(*status, path, "fake failure"));
        }
        Ok(state.answer_post(path, body))
    }
}

/// Service with organization and asset already active.
pub async fn service_on_asset(fake: &FakeAmp) -> ReportingService {
    let mut service = fake.service();
    service
        .set_active_organization(ORGANIZATION_ID)
        .await
        .expect("organization should validate");
    service
        .set_active_asset(ASSET_ID)
        .await
        .expect("asset should validate");
    service
}

/// Unenriched concerns built from engine-shaped findings.
pub fn concerns(findings: Value) -> Vec<AccessibilityConcern> {
    let catalog = BestPracticeCatalog::empty();
    let raw = serde_json::from_value(findings).expect("findings should deserialize");
    Normalizer::new(&catalog, NormalizerOptions::default()).normalize(raw)
}

pub fn sample_concerns() -> Vec<AccessibilityConcern> {
    concerns(json!([
        {"path": "html > body > img", "bestPracticeId": 336, "element": "<img>", "attributeDetail": "missing alt", "testResult": 1, "engineTestId": 350},
        {"path": "html > body > a", "bestPracticeId": 72, "element": "<a></a>", "attributeDetail": "empty link", "testResult": 1, "engineTestId": 20}
    ]))
}
