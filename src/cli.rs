use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: continuum-amp [--config <path>] --findings <raw.json> [--page <label>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    /// JSON array of findings exactly as the rule engine produced them.
    pub findings_path: PathBuf,
    /// Label for CSV export; defaults to the findings file stem.
    pub page: Option<String>,
}

impl CliArgs {
    pub fn page_label(&self) -> String {
        self.page.clone().unwrap_or_else(|| {
            self.findings_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "page".to_string())
        })
    }
}

pub fn args_from_env() -> Result<CliArgs> {
    parse_args(env::args().skip(1))
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut findings_path = None;
    let mut page = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(flag_value(&mut args, "--config")?)),
            "--findings" => {
                findings_path = Some(PathBuf::from(flag_value(&mut args, "--findings")?))
            }
            "--page" => page = Some(flag_value(&mut args, "--page")?),
            other => return Err(anyhow!("unknown argument: {other}. {USAGE}")),
        }
    }

    let findings_path =
        findings_path.ok_or_else(|| anyhow!("missing required --findings. {USAGE}"))?;

    Ok(CliArgs {
        config_path: config_path.unwrap_or_else(|| PathBuf::from("./continuum.jsonc")),
        findings_path,
        page,
    })
}

fn flag_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("missing value for {flag}"))
}
