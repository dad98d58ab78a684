use std::env;

use crate::amp::{
    error::{ReportingError, illegal_argument},
    types::ApiTokenRef,
};

/// Resolves the configured AMP API token. `Ok(None)` means requests go out unauthenticated.
pub fn resolve_api_token(reference: &ApiTokenRef) -> Result<Option<String>, ReportingError> {
    match reference {
        ApiTokenRef::Env { var } => {
            let token = env::var(var).map_err(|_| {
                illegal_argument(format!(
                    "missing AMP API token environment variable {var}"
                ))
            })?;
            if token.trim().is_empty() {
                return Err(illegal_argument(format!(
                    "AMP API token environment variable {var} is empty"
                )));
            }
            Ok(Some(token))
        }
        ApiTokenRef::InlineToken { token } => {
            if token.trim().is_empty() {
                return Err(illegal_argument("inline AMP API token cannot be empty"));
            }
            Ok(Some(token.clone()))
        }
        ApiTokenRef::None => Ok(None),
    }
}
