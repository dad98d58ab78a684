use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    amp::types::{AmpConfig, ModuleManagementStrategy, ReportManagementStrategy},
    concern::{DEFAULT_STANDARD_IDS, NormalizerOptions},
    types::{AssetId, ModuleId, OrganizationId, ReportId, StandardId},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub amp: AmpConfig,
    #[serde(default)]
    pub best_practices: BestPracticesConfig,
    #[serde(default)]
    pub normalizer: NormalizerOptions,
    #[serde(default)]
    pub reporting: Option<ReportingConfig>,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_enabled_true() -> bool {
    true
}

fn default_standard_ids() -> Option<Vec<StandardId>> {
    Some(DEFAULT_STANDARD_IDS.to_vec())
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/continuum")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestPracticesConfig {
    #[serde(default = "default_enabled_true")]
    pub enabled: bool,
    /// Standards kept on each enriched concern. `null` keeps every standard.
    #[serde(default = "default_standard_ids")]
    pub standard_ids: Option<Vec<StandardId>>,
}

impl Default for BestPracticesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            standard_ids: default_standard_ids(),
        }
    }
}

impl BestPracticesConfig {
    pub fn standard_filter(&self) -> Option<&[StandardId]> {
        self.standard_ids.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReportSelector {
    Id { id: ReportId },
    Name { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ModuleSelector {
    Id { id: ModuleId },
    Name { name: String, location: String },
}

/// Where findings go when the binary submits them to AMP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    pub organization_id: OrganizationId,
    pub asset_id: AssetId,
    pub report: ReportSelector,
    pub module: ModuleSelector,
    #[serde(default)]
    pub report_strategy: ReportManagementStrategy,
    #[serde(default)]
    pub module_strategy: ModuleManagementStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub csv_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config = serde_json::from_value(config_value)
            .context("failed to deserialize continuum config")?;

        if let Some(csv_dir) = config.export.csv_dir.as_mut()
            && !csv_dir.is_absolute()
        {
            *csv_dir = config_base.join(&*csv_dir);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("continuum.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or continuum.schema.json next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
