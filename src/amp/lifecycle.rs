use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    amp::{
        error::{ReportingError, illegal_argument, illegal_state, not_found},
        service::ReportingService,
        types::{
            CreateModuleRequest, CreateReportRequest, ModuleManagementStrategy,
            OverwriteReportRequest, Report, ReportManagementStrategy, SubmissionOutcome,
            ValidationResponse,
        },
    },
    concern::AccessibilityConcern,
    types::{AssetId, ModuleId, ReportId},
};

/// What to do with a module once the report side of the cycle is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleAction {
    Upload { overwrite: bool },
    Skip,
}

/// Modules that did not exist before this cycle are always uploaded without overwrite.
pub fn decide_module_action(
    module_existed: bool,
    strategy: ModuleManagementStrategy,
) -> ModuleAction {
    match (module_existed, strategy) {
        (false, _) => ModuleAction::Upload { overwrite: false },
        (true, ModuleManagementStrategy::Append) => ModuleAction::Upload { overwrite: false },
        (true, ModuleManagementStrategy::Overwrite) => ModuleAction::Upload { overwrite: true },
        (true, ModuleManagementStrategy::Abort) => ModuleAction::Skip,
    }
}

/// `"<base> (<RFC 3339 timestamp>)"`, always derived from the caller's base name.
pub fn unique_report_name(
    base_name: &str,
    now: OffsetDateTime,
) -> Result<String, ReportingError> {
    let timestamp = now
        .format(&Rfc3339)
        .map_err(|err| illegal_state(format!("failed to format report timestamp: {err}")))?;
    Ok(format!("{base_name} ({timestamp})"))
}

impl ReportingService {
    /// Makes sure the active report and module exist in AMP according to the management
    /// strategies, then uploads `concerns` into the module.
    ///
    /// A failure part way through keeps whatever ids were already learned or created, so a
    /// retry reuses them instead of creating duplicates.
    pub async fn submit(
        &mut self,
        concerns: &[AccessibilityConcern],
    ) -> Result<SubmissionOutcome, ReportingError> {
        let organization_id = self.require_organization()?;
        let asset_id = self.require_asset()?;
        self.require_report()?;
        if self.state.module.is_none() {
            return Err(illegal_state("active module has not been set"));
        }

        self.set_active_organization(organization_id).await?;
        self.set_active_asset(asset_id).await?;

        let (report_id, report_existed) = self.resolve_report(asset_id).await?;
        if report_existed && self.state.report_strategy == ReportManagementStrategy::Overwrite {
            // The module is recreated by name once the report is cleared.
            let has_name = self
                .state
                .module
                .as_ref()
                .and_then(|module| module.name.as_deref())
                .is_some_and(|name| !name.trim().is_empty());
            if !has_name {
                return Err(illegal_argument("active module name cannot be null"));
            }
            self.delete_all_modules(asset_id, report_id).await?;
            self.clear_module_id();
        }

        let (module_id, module_existed) = self.resolve_module(asset_id, report_id).await?;
        let overwrite = match decide_module_action(module_existed, self.state.module_strategy) {
            ModuleAction::Upload { overwrite } => overwrite,
            ModuleAction::Skip => {
                tracing::info!(
                    target: "amp",
                    report_id,
                    module_id,
                    "module_upload_skipped: module already exists and strategy is ABORT"
                );
                return Ok(SubmissionOutcome::Skipped {
                    report_id,
                    module_id,
                });
            }
        };

        let module = self
            .state
            .module
            .clone()
            .ok_or_else(|| illegal_state("active module has not been set"))?;
        let accepted = self
            .uploader
            .submit(report_id, module_id, overwrite, &module, concerns)
            .await?;

        Ok(if accepted {
            SubmissionOutcome::Uploaded {
                report_id,
                module_id,
                overwrite,
            }
        } else {
            tracing::warn!(target: "amp", report_id, module_id, "module_upload_not_accepted");
            SubmissionOutcome::NotAccepted {
                report_id,
                module_id,
            }
        })
    }

    /// Returns the report id and whether it existed before this cycle.
    async fn resolve_report(
        &mut self,
        asset_id: AssetId,
    ) -> Result<(ReportId, bool), ReportingError> {
        let strategy = self.state.report_strategy;
        let report = self.require_report()?.clone();

        if let Some(report_id) = report.id
            && strategy != ReportManagementStrategy::Unique
        {
            self.validate_report_id(asset_id, report_id).await?;
            return Ok((report_id, true));
        }

        let base_name = self
            .state
            .requested_report_name
            .clone()
            .or(report.name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| illegal_argument("active report name cannot be null"))?;
        let report_name = match strategy {
            ReportManagementStrategy::Unique => {
                unique_report_name(&base_name, OffsetDateTime::now_utc())?
            }
            ReportManagementStrategy::Append | ReportManagementStrategy::Overwrite => base_name,
        };

        let existing = self.lookup_report_by_name(asset_id, &report_name).await?;
        self.state.report = Some(Report::new(existing, Some(report_name.clone())));
        if let Some(report_id) = existing {
            tracing::info!(target: "amp", report_id, report_name = %report_name, "report_resolved");
            return Ok((report_id, true));
        }

        let report_id = self.create_report(asset_id, &report_name).await?;
        self.state.report = Some(Report::new(Some(report_id), Some(report_name)));
        self.clear_module_id();
        Ok((report_id, false))
    }

    async fn create_report(
        &self,
        asset_id: AssetId,
        report_name: &str,
    ) -> Result<ReportId, ReportingError> {
        let response = self
            .api
            .create_report(&CreateReportRequest {
                asset_id,
                report_name: report_name.to_string(),
                media_type_id: self.web_media_type_id,
            })
            .await?;

        let report_id = created_id(&response, response.report_id).ok_or_else(|| {
            rejection(
                &response,
                format!(
                    "could not create new report '{}' in active AMP instance '{}'",
                    report_name,
                    self.active_instance()
                ),
            )
        })?;

        tracing::info!(target: "amp", report_id, report_name = %report_name, "report_created");
        Ok(report_id)
    }

    async fn delete_all_modules(
        &self,
        asset_id: AssetId,
        report_id: ReportId,
    ) -> Result<(), ReportingError> {
        let body = self
            .api
            .overwrite_report(&OverwriteReportRequest {
                asset_id,
                report_id,
            })
            .await?;

        if let Some(body) = body {
            let fallback = format!(
                "could not delete existing modules from report {} in active AMP instance '{}'",
                self.state
                    .report
                    .as_ref()
                    .map(Report::describe)
                    .unwrap_or_else(|| format!("ID {report_id}")),
                self.active_instance()
            );
            let response: ValidationResponse = match body {
                Value::Object(_) => serde_json::from_value(body).unwrap_or_default(),
                _ => ValidationResponse::default(),
            };
            return Err(rejection(&response, fallback));
        }

        tracing::info!(target: "amp", report_id, "report_modules_deleted");
        Ok(())
    }

    /// Returns the module id and whether it existed before this cycle.
    async fn resolve_module(
        &mut self,
        asset_id: AssetId,
        report_id: ReportId,
    ) -> Result<(ModuleId, bool), ReportingError> {
        let module = self
            .state
            .module
            .clone()
            .ok_or_else(|| illegal_state("active module has not been set"))?;

        if let Some(module_id) = module.id {
            self.validate_module_id(asset_id, report_id, module_id)
                .await?;
            return Ok((module_id, true));
        }

        let module_name = module
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| illegal_argument("active module name cannot be null"))?;

        let (module_id, existed) = match self
            .lookup_module_by_name(asset_id, report_id, &module_name)
            .await?
        {
            Some(module_id) => {
                tracing::info!(target: "amp", module_id, module_name = %module_name, "module_resolved");
                (module_id, true)
            }
            None => (
                self.create_module(asset_id, report_id, &module_name)
                    .await?,
                false,
            ),
        };

        if let Some(active) = self.state.module.as_mut() {
            active.id = Some(module_id);
        }
        Ok((module_id, existed))
    }

    async fn create_module(
        &self,
        asset_id: AssetId,
        report_id: ReportId,
        module_name: &str,
    ) -> Result<ModuleId, ReportingError> {
        let response = self
            .api
            .create_module(&CreateModuleRequest {
                asset_id: asset_id.to_string(),
                report_id: report_id.to_string(),
                module_name: module_name.to_string(),
            })
            .await?;

        let module_id = created_id(&response, response.module_id).ok_or_else(|| {
            rejection(
                &response,
                format!(
                    "could not create new module '{}' in report {} of active AMP instance '{}'",
                    module_name,
                    report_id,
                    self.active_instance()
                ),
            )
        })?;

        tracing::info!(target: "amp", report_id, module_id, module_name = %module_name, "module_created");
        Ok(module_id)
    }

    fn clear_module_id(&mut self) {
        if let Some(module) = self.state.module.as_mut() {
            module.id = None;
        }
    }
}

fn created_id(response: &ValidationResponse, id: Option<u64>) -> Option<u64> {
    id.filter(|_| response.valid)
}

/// AMP's own message when it rejected the call, `fallback` otherwise.
fn rejection(response: &ValidationResponse, fallback: String) -> ReportingError {
    match response.message.as_deref() {
        Some(message) if !response.valid && !message.is_empty() => not_found(message),
        _ => not_found(fallback),
    }
}
