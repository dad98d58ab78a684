pub mod api;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod service;
pub mod transport;
pub mod types;
pub mod upload;

pub use api::AmpApi;
pub use error::{ReportingError, ReportingErrorKind};
pub use service::ReportingService;
pub use transport::{AmpTransport, HttpAmpTransport};
pub use types::{
    AmpConfig, Module, ModuleManagementStrategy, Report, ReportManagementStrategy,
    SubmissionOutcome,
};
