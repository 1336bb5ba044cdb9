//! Tracking service errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type returned by the tracking core.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The location source refused access.
    #[error("code: permission_denied, description: {0}")]
    PermissionDenied(String),

    /// No usable location source exists on this device.
    #[error("code: source_unavailable, description: {0}")]
    SourceUnavailable(String),

    /// An externally bounded wait elapsed.
    #[error("code: timeout, description: {0}")]
    Timeout(String),

    /// The requested record could not be found.
    #[error("code: not_found, description: {0}")]
    NotFound(String),

    /// The record store failed while loading a record.
    #[error("code: load_error, description: {0}")]
    LoadError(String),

    /// The route planner returned no feasible route.
    #[error("code: route_unavailable, description: {0}")]
    RouteUnavailable(String),

    /// Speech synthesis failed; never fatal to navigation.
    #[error("code: synthesis_failed, description: {0}")]
    SynthesisFailed(String),

    /// A transient network failure.
    #[error("code: network_error, description: {0}")]
    NetworkError(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::Timeout(_) => "timeout",
            Self::NotFound(_) => "not_found",
            Self::LoadError(_) => "load_error",
            Self::RouteUnavailable(_) => "route_unavailable",
            Self::SynthesisFailed(_) => "synthesis_failed",
            Self::NetworkError(_) => "network_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// True for failures the caller must resolve before retrying.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::SourceUnavailable(_) | Self::RouteUnavailable(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::PermissionDenied(_) => Self::PermissionDenied(chain),
                Self::SourceUnavailable(_) => Self::SourceUnavailable(chain),
                Self::Timeout(_) => Self::Timeout(chain),
                Self::NotFound(_) => Self::NotFound(chain),
                Self::LoadError(_) => Self::LoadError(chain),
                Self::RouteUnavailable(_) => Self::RouteUnavailable(chain),
                Self::SynthesisFailed(_) => Self::SynthesisFailed(chain),
                Self::NetworkError(_) => Self::NetworkError(chain),
            };
        }

        // otherwise, treat the failure as a store/load fault
        Self::LoadError(chain)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::LoadError(format!("failed to deserialize record: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result, anyhow};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry, fmt};

    use super::Error;

    #[test]
    fn error_display() {
        let err = Error::PermissionDenied("location access denied".to_string());
        assert_eq!(format!("{err}"), "code: permission_denied, description: location access denied");
    }

    #[test]
    fn with_context() {
        Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).init();

        let context_error = || -> Result<(), Error> {
            Err(Error::NotFound("trip missing".to_string()))
                .context("loading trip")
                .context("watching trip")?;
            Ok(())
        };

        let result = context_error();
        assert_eq!(
            result.unwrap_err(),
            Error::NotFound(
                "watching trip -> loading trip -> code: not_found, description: trip missing"
                    .to_string()
            )
        );
    }

    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("one-off error")).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.to_string(), "code: load_error, description: error context -> one-off error");
    }

    #[test]
    fn serde_context() {
        let result: Result<Value, serde_json::Error> = serde_json::from_str(r#"{"foo": "bar""#);
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.code(), "load_error");
    }

    #[test]
    fn permanence() {
        assert!(Error::PermissionDenied(String::new()).is_permanent());
        assert!(Error::RouteUnavailable(String::new()).is_permanent());
        assert!(!Error::NetworkError(String::new()).is_permanent());
        assert!(!Error::Timeout(String::new()).is_permanent());
    }
}
