use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::concern::{AccessibilityConcern, Standard};

pub const CONTINUUM_CSV_HEADER: [&str; 7] = [
    "page",
    "path",
    "element",
    "attribute",
    "bestPracticeDescription",
    "Standard",
    "Notes-Comments",
];

/// Reviewers replace this with their own notes.
pub const NOTES_PLACEHOLDER: &str = "**";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn write_continuum_csv<W: Write>(
    writer: W,
    page: &str,
    concerns: &[AccessibilityConcern],
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CONTINUUM_CSV_HEADER)?;

    for concern in concerns {
        let standards: &[Standard] = concern.best_practice_standards().unwrap_or_default();
        let standards = serde_json::to_string(standards)?;
        csv_writer.write_record([
            page,
            concern.path(),
            concern.element(),
            concern.attribute(),
            concern.best_practice_description().unwrap_or_default(),
            standards.as_str(),
            NOTES_PLACEHOLDER,
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes `<dir>/<page>-continuum-report.csv`. Returns `None` without touching the disk when
/// there is nothing to report.
pub fn write_continuum_csv_file(
    dir: &Path,
    page: &str,
    concerns: &[AccessibilityConcern],
) -> Result<Option<PathBuf>, ExportError> {
    if concerns.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}-continuum-report.csv", file_stem(page)));
    let file = fs::File::create(&path)?;
    write_continuum_csv(file, page, concerns)?;

    tracing::info!(
        target: "export",
        path = %path.display(),
        concerns = concerns.len(),
        "continuum_csv_written"
    );
    Ok(Some(path))
}

// page titles may contain separators
fn file_stem(page: &str) -> String {
    page.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}
