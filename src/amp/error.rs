use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingErrorKind {
    /// A required argument was missing or invalid at the call site.
    IllegalArgument,
    /// A predecessor in the organization/asset/report/module chain is not set.
    IllegalState,
    /// The remote entity does not exist, is inaccessible, or could not be created.
    NotFound,
    /// Transport failure: non-200 status, timeout, connection error, malformed body.
    HttpError,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ReportingError {
    pub kind: ReportingErrorKind,
    pub message: String,
    pub retryable: bool,
    pub http_status: Option<u16>,
}

impl ReportingError {
    pub fn new(kind: ReportingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(kind, ReportingErrorKind::HttpError),
            http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

pub fn illegal_argument(message: impl Into<String>) -> ReportingError {
    ReportingError::new(ReportingErrorKind::IllegalArgument, message)
}

pub fn illegal_state(message: impl Into<String>) -> ReportingError {
    ReportingError::new(ReportingErrorKind::IllegalState, message)
}

pub fn not_found(message: impl Into<String>) -> ReportingError {
    ReportingError::new(ReportingErrorKind::NotFound, message)
}

pub fn http_error(message: impl Into<String>) -> ReportingError {
    ReportingError::new(ReportingErrorKind::HttpError, message)
}

pub fn map_http_status(status: u16, url: &str, body: &str) -> ReportingError {
    let normalized_body = body.chars().take(240).collect::<String>();
    let mut message = format!("unexpected status {status} while requesting {url}");
    if !normalized_body.is_empty() {
        message = format!("{message}: {normalized_body}");
    }

    http_error(message)
        .with_http_status(status)
        .with_retryable(status == 408 || status == 429 || status >= 500)
}
