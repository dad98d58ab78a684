use std::sync::Arc;

use crate::{
    amp::{
        api::AmpApi,
        error::{ReportingError, illegal_argument, illegal_state, not_found},
        transport::AmpTransport,
        types::{
            Module, ModuleLookup, ModuleManagementStrategy, Report, ReportLookup,
            ReportManagementStrategy, WEB_MEDIA_TYPE_ID,
        },
        upload::UploadClient,
    },
    types::{AssetId, ModuleId, OrganizationId, ReportId},
};

/// Everything the caller has made active so far. Nothing here expires on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub organization_id: Option<OrganizationId>,
    pub asset_id: Option<AssetId>,
    pub report: Option<Report>,
    pub module: Option<Module>,
    pub report_strategy: ReportManagementStrategy,
    pub module_strategy: ModuleManagementStrategy,
    /// Name passed to `set_active_report_by_name`, before any unique suffix.
    pub requested_report_name: Option<String>,
}

/// Stateful AMP reporting client for one test flow.
///
/// Set the organization, asset, report, and module in that order, pick the management
/// strategies, then call [`ReportingService::submit`]. Each setter validates against AMP and
/// fails fast when a predecessor in the chain has not been set. Mutation goes through
/// `&mut self`; flows that need to report concurrently each construct their own service.
pub struct ReportingService {
    pub(crate) api: AmpApi,
    pub(crate) uploader: UploadClient,
    pub(crate) web_media_type_id: u64,
    pub(crate) state: SessionState,
}

impl ReportingService {
    pub fn new(transport: Arc<dyn AmpTransport>) -> Self {
        let api = AmpApi::new(transport);
        Self {
            uploader: UploadClient::new(api.clone()),
            api,
            web_media_type_id: WEB_MEDIA_TYPE_ID,
            state: SessionState::default(),
        }
    }

    pub fn with_web_media_type_id(mut self, media_type_id: u64) -> Self {
        self.web_media_type_id = media_type_id;
        self
    }

    pub fn active_instance(&self) -> &str {
        self.api.instance()
    }

    pub fn active_organization_id(&self) -> Option<OrganizationId> {
        self.state.organization_id
    }

    pub fn active_asset_id(&self) -> Option<AssetId> {
        self.state.asset_id
    }

    pub fn active_report(&self) -> Option<&Report> {
        self.state.report.as_ref()
    }

    pub fn active_module(&self) -> Option<&Module> {
        self.state.module.as_ref()
    }

    pub fn report_management_strategy(&self) -> ReportManagementStrategy {
        self.state.report_strategy
    }

    pub fn module_management_strategy(&self) -> ModuleManagementStrategy {
        self.state.module_strategy
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Forgets every active entity and strategy.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }

    pub fn set_report_management_strategy(&mut self, strategy: ReportManagementStrategy) {
        self.state.report_strategy = strategy;
    }

    pub fn set_module_management_strategy(&mut self, strategy: ModuleManagementStrategy) {
        self.state.module_strategy = strategy;
    }

    pub async fn set_active_organization(
        &mut self,
        organization_id: OrganizationId,
    ) -> Result<(), ReportingError> {
        if organization_id == 0 {
            return Err(illegal_argument("active organization cannot be null"));
        }

        let response = self.api.validate_organization(organization_id).await?;
        if !response.valid {
            return Err(not_found(format!(
                "organization with ID '{}' not found in active AMP instance '{}'{}",
                organization_id,
                self.active_instance(),
                response.message_suffix()
            )));
        }

        self.state.organization_id = Some(organization_id);
        tracing::info!(target: "amp", organization_id, "active_organization_set");
        Ok(())
    }

    pub async fn set_active_asset(&mut self, asset_id: AssetId) -> Result<(), ReportingError> {
        self.require_organization()?;
        if asset_id == 0 {
            return Err(illegal_argument("active asset cannot be null"));
        }

        let response = self.api.validate_asset(asset_id).await?;
        if !response.valid {
            return Err(not_found(format!(
                "asset with ID '{}' not found in active AMP instance '{}'{}",
                asset_id,
                self.active_instance(),
                response.message_suffix()
            )));
        }

        self.state.asset_id = Some(asset_id);
        tracing::info!(target: "amp", asset_id, "active_asset_set");
        Ok(())
    }

    pub async fn set_active_report_by_id(
        &mut self,
        report_id: ReportId,
    ) -> Result<(), ReportingError> {
        self.require_organization()?;
        let asset_id = self.require_asset()?;
        if report_id == 0 {
            return Err(illegal_argument("active report cannot be null"));
        }

        self.validate_report_id(asset_id, report_id).await?;
        self.state.report = Some(Report::new(Some(report_id), None));
        self.state.requested_report_name = None;
        tracing::info!(target: "amp", report_id, "active_report_set");
        Ok(())
    }

    /// Unlike [`Self::set_active_report_by_id`], a report that does not exist yet is not an
    /// error; it is created on the next submission. Returns the id when it already exists.
    pub async fn set_active_report_by_name(
        &mut self,
        report_name: &str,
    ) -> Result<Option<ReportId>, ReportingError> {
        self.require_organization()?;
        let asset_id = self.require_asset()?;
        if report_name.trim().is_empty() {
            return Err(illegal_argument("active report cannot be null"));
        }

        let report_id = self.lookup_report_by_name(asset_id, report_name).await?;
        self.state.report = Some(Report::new(report_id, Some(report_name.to_string())));
        self.state.requested_report_name = Some(report_name.to_string());
        tracing::info!(
            target: "amp",
            report_name = %report_name,
            report_id = ?report_id,
            "active_report_set"
        );
        Ok(report_id)
    }

    pub async fn set_active_module_by_id(
        &mut self,
        module_id: ModuleId,
    ) -> Result<(), ReportingError> {
        self.require_organization()?;
        let asset_id = self.require_asset()?;
        let report_id = self
            .state
            .report
            .as_ref()
            .and_then(|report| report.id)
            .ok_or_else(|| illegal_state("active report has not been set"))?;
        if module_id == 0 {
            return Err(illegal_argument("active module cannot be null"));
        }

        self.validate_module_id(asset_id, report_id, module_id)
            .await?;
        self.state.module = Some(Module::new(Some(module_id), None, None));
        tracing::info!(target: "amp", report_id, module_id, "active_module_set");
        Ok(())
    }

    /// The name is only validated when the active report already has an id; otherwise the
    /// module is created on the next submission. Returns the id when it already exists.
    pub async fn set_active_module_by_name(
        &mut self,
        module_name: &str,
        module_location: &str,
    ) -> Result<Option<ModuleId>, ReportingError> {
        self.require_organization()?;
        let asset_id = self.require_asset()?;
        let report_id = self.require_report()?.id;
        if module_name.trim().is_empty() {
            return Err(illegal_argument("active module cannot be null"));
        }
        if module_location.trim().is_empty() {
            return Err(illegal_argument("active module location cannot be null"));
        }

        let module_id = match report_id {
            Some(report_id) => {
                self.lookup_module_by_name(asset_id, report_id, module_name)
                    .await?
            }
            None => None,
        };

        self.state.module = Some(Module::new(
            module_id,
            Some(module_name.to_string()),
            Some(module_location.to_string()),
        ));
        tracing::info!(
            target: "amp",
            module_name = %module_name,
            module_id = ?module_id,
            "active_module_set"
        );
        Ok(module_id)
    }

    pub(crate) fn require_organization(&self) -> Result<OrganizationId, ReportingError> {
        self.state
            .organization_id
            .ok_or_else(|| illegal_state("active organization has not been set"))
    }

    pub(crate) fn require_asset(&self) -> Result<AssetId, ReportingError> {
        self.state
            .asset_id
            .ok_or_else(|| illegal_state("active asset has not been set"))
    }

    pub(crate) fn require_report(&self) -> Result<&Report, ReportingError> {
        self.state
            .report
            .as_ref()
            .ok_or_else(|| illegal_state("active report has not been set"))
    }

    pub(crate) async fn validate_report_id(
        &self,
        asset_id: AssetId,
        report_id: ReportId,
    ) -> Result<(), ReportingError> {
        let response = self
            .api
            .validate_report(asset_id, ReportLookup::Id(report_id))
            .await?;
        if !response.valid {
            return Err(not_found(format!(
                "report with ID '{}' not found in active AMP instance '{}'{}",
                report_id,
                self.active_instance(),
                response.message_suffix()
            )));
        }
        Ok(())
    }

    pub(crate) async fn lookup_report_by_name(
        &self,
        asset_id: AssetId,
        report_name: &str,
    ) -> Result<Option<ReportId>, ReportingError> {
        let response = self
            .api
            .validate_report(asset_id, ReportLookup::Name(report_name))
            .await?;
        Ok(response.report_id.filter(|_| response.valid))
    }

    pub(crate) async fn validate_module_id(
        &self,
        asset_id: AssetId,
        report_id: ReportId,
        module_id: ModuleId,
    ) -> Result<(), ReportingError> {
        let response = self
            .api
            .validate_module(asset_id, report_id, ModuleLookup::Id(module_id))
            .await?;
        if !response.valid {
            return Err(not_found(format!(
                "module with ID '{}' not found in report {} of active AMP instance '{}'{}",
                module_id,
                report_id,
                self.active_instance(),
                response.message_suffix()
            )));
        }
        Ok(())
    }

    pub(crate) async fn lookup_module_by_name(
        &self,
        asset_id: AssetId,
        report_id: ReportId,
        module_name: &str,
    ) -> Result<Option<ModuleId>, ReportingError> {
        let response = self
            .api
            .validate_module(asset_id, report_id, ModuleLookup::Name(module_name))
            .await?;
        Ok(response.module_id.filter(|_| response.valid))
    }
}
