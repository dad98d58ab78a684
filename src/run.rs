use std::{fmt, fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use crate::{
    amp::{
        AmpApi, AmpTransport, HttpAmpTransport, ReportingError, ReportingService,
        SubmissionOutcome,
    },
    cli::CliArgs,
    concern::{AccessibilityConcern, BestPracticeCatalog, Normalizer},
    config::{Config, ModuleSelector, ReportSelector, ReportingConfig},
    export::write_continuum_csv_file,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub concerns: usize,
    pub enriched: usize,
    pub csv_path: Option<PathBuf>,
    pub outcome: Option<SubmissionOutcome>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} concerns ({} enriched)", self.concerns, self.enriched)?;
        if let Some(path) = &self.csv_path {
            write!(f, ", csv: {}", path.display())?;
        }
        match self.outcome {
            Some(SubmissionOutcome::Uploaded {
                report_id,
                module_id,
                overwrite,
            }) => write!(
                f,
                ", uploaded to report {report_id} module {module_id} (overwrite: {overwrite})"
            ),
            Some(SubmissionOutcome::NotAccepted {
                report_id,
                module_id,
            }) => write!(
                f,
                ", upload to report {report_id} module {module_id} was not acknowledged"
            ),
            Some(SubmissionOutcome::Skipped {
                report_id,
                module_id,
            }) => write!(
                f,
                ", skipped: module {module_id} already exists in report {report_id}"
            ),
            None => write!(f, ", not submitted"),
        }
    }
}

pub async fn run(config: &Config, args: &CliArgs) -> Result<RunSummary> {
    let transport =
        HttpAmpTransport::new(&config.amp).context("failed to build AMP transport")?;
    run_with_transport(config, args, Arc::new(transport)).await
}

/// Load findings, enrich them, optionally export CSV, optionally submit to AMP.
pub async fn run_with_transport(
    config: &Config,
    args: &CliArgs,
    transport: Arc<dyn AmpTransport>,
) -> Result<RunSummary> {
    let findings_text = fs::read_to_string(&args.findings_path)
        .with_context(|| format!("failed to read {}", args.findings_path.display()))?;

    let catalog = if config.best_practices.enabled {
        BestPracticeCatalog::fetch(
            &AmpApi::new(Arc::clone(&transport)),
            config.best_practices.standard_filter(),
        )
        .await
    } else {
        BestPracticeCatalog::empty()
    };

    let concerns = Normalizer::new(&catalog, config.normalizer.clone())
        .normalize_json(&findings_text)
        .with_context(|| format!("failed to normalize {}", args.findings_path.display()))?;
    let enriched = concerns
        .iter()
        .filter(|concern| concern.enrichment().is_some())
        .count();

    let csv_path = match &config.export.csv_dir {
        Some(dir) => write_continuum_csv_file(dir, &args.page_label(), &concerns)
            .context("failed to export continuum csv")?,
        None => None,
    };

    let outcome = match &config.reporting {
        Some(reporting) => Some(
            submit(
                reporting,
                transport,
                config.amp.web_media_type_id,
                &concerns,
            )
            .await
            .context("failed to submit concerns to AMP")?,
        ),
        None => None,
    };

    Ok(RunSummary {
        concerns: concerns.len(),
        enriched,
        csv_path,
        outcome,
    })
}

async fn submit(
    reporting: &ReportingConfig,
    transport: Arc<dyn AmpTransport>,
    web_media_type_id: u64,
    concerns: &[AccessibilityConcern],
) -> Result<SubmissionOutcome, ReportingError> {
    let mut service = ReportingService::new(transport).with_web_media_type_id(web_media_type_id);
    service.set_report_management_strategy(reporting.report_strategy);
    service.set_module_management_strategy(reporting.module_strategy);

    service
        .set_active_organization(reporting.organization_id)
        .await?;
    service.set_active_asset(reporting.asset_id).await?;
    match &reporting.report {
        ReportSelector::Id { id } => service.set_active_report_by_id(*id).await?,
        ReportSelector::Name { name } => {
            service.set_active_report_by_name(name).await?;
        }
    }
    match &reporting.module {
        ModuleSelector::Id { id } => service.set_active_module_by_id(*id).await?,
        ModuleSelector::Name { name, location } => {
            service.set_active_module_by_name(name, location).await?;
        }
    }

    service.submit(concerns).await
}
