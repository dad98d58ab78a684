use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AssetId, ModuleId, ReportId, deserialize_lenient_id};

pub const DEFAULT_AMP_ENDPOINT: &str = "https://amp.levelaccess.net";
pub const WEB_MEDIA_TYPE_ID: u64 = 1;
pub const TRANSPORT_TIMEOUT_MS: u64 = 10_000;

pub const ORGANIZATION_VALIDATE_PATH: &str = "/api/cont/organization/validate";
pub const ASSET_VALIDATE_PATH: &str = "/api/cont/asset/validate";
pub const REPORT_VALIDATE_PATH: &str = "/api/cont/report/validate";
pub const MODULE_VALIDATE_PATH: &str = "/api/cont/module/validate";
pub const REPORT_CREATE_PATH: &str = "/api/cont/report/create";
pub const REPORT_OVERWRITE_PATH: &str = "/api/cont/report/overwrite";
pub const MODULE_CREATE_PATH: &str = "/api/cont/module/create";
pub const MODULE_UPLOAD_PATH: &str = "/api/cont/module/upload";
pub const BEST_PRACTICES_PATH: &str = "/api/cont/bestpractices";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportManagementStrategy {
    /// Reuse the report when it exists, create it otherwise. Never deletes anything.
    #[default]
    Append,
    /// Delete every module of an existing report before repopulating it.
    Overwrite,
    /// Always create a new report, suffixing its name with the current timestamp.
    Unique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleManagementStrategy {
    #[default]
    Append,
    Overwrite,
    /// Skip the upload when the module already exists.
    Abort,
}

impl fmt::Display for ReportManagementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => write!(f, "APPEND"),
            Self::Overwrite => write!(f, "OVERWRITE"),
            Self::Unique => write!(f, "UNIQUE"),
        }
    }
}

impl fmt::Display for ModuleManagementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => write!(f, "APPEND"),
            Self::Overwrite => write!(f, "OVERWRITE"),
            Self::Abort => write!(f, "ABORT"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: Option<ReportId>,
    pub name: Option<String>,
}

impl Report {
    pub fn new(id: Option<ReportId>, name: Option<String>) -> Self {
        Self { id, name }
    }

    /// `'name'` when the report has a name, `ID <id>` otherwise.
    pub fn describe(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => format!("'{name}'"),
            (None, Some(id)) => format!("ID {id}"),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: Option<ModuleId>,
    pub name: Option<String>,
    /// Where on the tested asset this module's findings apply.
    pub location: Option<String>,
}

impl Module {
    pub fn new(id: Option<ModuleId>, name: Option<String>, location: Option<String>) -> Self {
        Self { id, name, location }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiTokenRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

impl Default for ApiTokenRef {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_AMP_ENDPOINT.to_string()
}

fn default_web_media_type_id() -> u64 {
    WEB_MEDIA_TYPE_ID
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmpConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: ApiTokenRef,
    #[serde(default = "default_web_media_type_id")]
    pub web_media_type_id: u64,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

impl Default for AmpConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_token: ApiTokenRef::None,
            web_media_type_id: default_web_media_type_id(),
            proxy: None,
        }
    }
}

/// Shared response shape of the validate and create endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub report_id: Option<ReportId>,
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub module_id: Option<ModuleId>,
}

impl ValidationResponse {
    /// `"; <message>"` when the server explained itself, empty otherwise.
    pub fn message_suffix(&self) -> String {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => format!("; {message}"),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLookup<'a> {
    Id(ReportId),
    Name(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLookup<'a> {
    Id(ModuleId),
    Name(&'a str),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub asset_id: AssetId,
    pub report_name: String,
    pub media_type_id: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverwriteReportRequest {
    pub asset_id: AssetId,
    pub report_id: ReportId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    pub asset_id: String,
    pub report_id: String,
    pub module_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionOutcome {
    /// The upload was sent and AMP acknowledged the module.
    Uploaded {
        report_id: ReportId,
        module_id: ModuleId,
        overwrite: bool,
    },
    /// The upload was sent but AMP did not acknowledge a module id.
    NotAccepted {
        report_id: ReportId,
        module_id: ModuleId,
    },
    /// The module already existed and the module strategy is `Abort`; nothing was uploaded.
    Skipped {
        report_id: ReportId,
        module_id: ModuleId,
    },
}

impl SubmissionOutcome {
    pub fn submitted(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }

    pub fn report_id(&self) -> ReportId {
        match self {
            Self::Uploaded { report_id, .. }
            | Self::NotAccepted { report_id, .. }
            | Self::Skipped { report_id, .. } => *report_id,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        match self {
            Self::Uploaded { module_id, .. }
            | Self::NotAccepted { module_id, .. }
            | Self::Skipped { module_id, .. } => *module_id,
        }
    }
}
