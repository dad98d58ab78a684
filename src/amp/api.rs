use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    amp::{
        error::{ReportingError, http_error},
        transport::AmpTransport,
        types::{
            ASSET_VALIDATE_PATH, BEST_PRACTICES_PATH, CreateModuleRequest, CreateReportRequest,
            MODULE_CREATE_PATH, MODULE_UPLOAD_PATH, MODULE_VALIDATE_PATH, ModuleLookup,
            ORGANIZATION_VALIDATE_PATH, OverwriteReportRequest, REPORT_CREATE_PATH,
            REPORT_OVERWRITE_PATH, REPORT_VALIDATE_PATH, ReportLookup, ValidationResponse,
        },
    },
    types::{AssetId, OrganizationId, ReportId},
};

/// Typed view of the AMP endpoints on top of a raw transport.
#[derive(Clone)]
pub struct AmpApi {
    transport: Arc<dyn AmpTransport>,
}

impl AmpApi {
    pub fn new(transport: Arc<dyn AmpTransport>) -> Self {
        Self { transport }
    }

    pub fn instance(&self) -> &str {
        self.transport.instance()
    }

    pub async fn validate_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<ValidationResponse, ReportingError> {
        self.get_json(
            ORGANIZATION_VALIDATE_PATH,
            &[("organizationId", organization_id.to_string())],
        )
        .await
    }

    pub async fn validate_asset(
        &self,
        asset_id: AssetId,
    ) -> Result<ValidationResponse, ReportingError> {
        self.get_json(ASSET_VALIDATE_PATH, &[("assetId", asset_id.to_string())])
            .await
    }

    pub async fn validate_report(
        &self,
        asset_id: AssetId,
        lookup: ReportLookup<'_>,
    ) -> Result<ValidationResponse, ReportingError> {
        let selector = match lookup {
            ReportLookup::Id(report_id) => ("reportId", report_id.to_string()),
            ReportLookup::Name(name) => ("reportName", name.to_string()),
        };
        self.get_json(
            REPORT_VALIDATE_PATH,
            &[("assetId", asset_id.to_string()), selector],
        )
        .await
    }

    pub async fn validate_module(
        &self,
        asset_id: AssetId,
        report_id: ReportId,
        lookup: ModuleLookup<'_>,
    ) -> Result<ValidationResponse, ReportingError> {
        let selector = match lookup {
            ModuleLookup::Id(module_id) => ("moduleId", module_id.to_string()),
            ModuleLookup::Name(name) => ("moduleName", name.to_string()),
        };
        self.get_json(
            MODULE_VALIDATE_PATH,
            &[
                ("assetId", asset_id.to_string()),
                ("reportId", report_id.to_string()),
                selector,
            ],
        )
        .await
    }

    pub async fn create_report(
        &self,
        request: &CreateReportRequest,
    ) -> Result<ValidationResponse, ReportingError> {
        self.post_json(REPORT_CREATE_PATH, request).await
    }

    /// Deletes every module of a report. AMP answers success with an empty body, so the raw
    /// body is returned for the caller to interpret.
    pub async fn overwrite_report(
        &self,
        request: &OverwriteReportRequest,
    ) -> Result<Option<Value>, ReportingError> {
        self.transport
            .post(REPORT_OVERWRITE_PATH, &to_body(request)?, true)
            .await
    }

    pub async fn create_module(
        &self,
        request: &CreateModuleRequest,
    ) -> Result<ValidationResponse, ReportingError> {
        self.post_json(MODULE_CREATE_PATH, request).await
    }

    pub async fn upload_module(&self, body: &Value) -> Result<Option<Value>, ReportingError> {
        self.transport.post(MODULE_UPLOAD_PATH, body, true).await
    }

    /// Best-practice metadata is public, so the token is never sent.
    pub async fn fetch_best_practices(&self) -> Result<Option<Value>, ReportingError> {
        self.transport.get(BEST_PRACTICES_PATH, &[], false).await
    }

    async fn get_json<T: DeserializeOwned + Default>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ReportingError> {
        match self.transport.get(path, query, true).await? {
            Some(value) => decode(path, value),
            None => Ok(T::default()),
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned + Default>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ReportingError> {
        match self.transport.post(path, &to_body(body)?, true).await? {
            Some(value) => decode(path, value),
            None => Ok(T::default()),
        }
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ReportingError> {
    serde_json::to_value(body)
        .map_err(|err| http_error(format!("failed to encode request body: {err}")))
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ReportingError> {
    serde_json::from_value(value)
        .map_err(|err| http_error(format!("unexpected response shape from {path}: {err}")))
}
