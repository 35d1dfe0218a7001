//! Application error types.

use std::fmt;

use crate::cache::ServiceCacheError;
use crate::remote::RemoteError;

/// Errors that can occur while starting the application.
#[derive(Debug)]
pub enum AppError {
    /// Failed to start the tile cache service.
    TileCacheStart(ServiceCacheError),

    /// Failed to start the metadata cache service.
    MetadataCacheStart(ServiceCacheError),

    /// Failed to build an HTTP collaborator client.
    Remote(RemoteError),

    /// Failed to encode the placeholder tiles.
    Placeholder(String),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::TileCacheStart(e) => {
                write!(f, "Failed to start tile cache service: {}", e)
            }
            AppError::MetadataCacheStart(e) => {
                write!(f, "Failed to start metadata cache service: {}", e)
            }
            AppError::Remote(e) => write!(f, "Failed to create collaborator client: {}", e),
            AppError::Placeholder(msg) => {
                write!(f, "Failed to encode placeholder tiles: {}", msg)
            }
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::TileCacheStart(e) | AppError::MetadataCacheStart(e) => Some(e),
            AppError::Remote(e) => Some(e),
            AppError::Placeholder(_) | AppError::Config(_) => None,
        }
    }
}

impl From<RemoteError> for AppError {
    fn from(e: RemoteError) -> Self {
        AppError::Remote(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config("server.host 'x'".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_app_error_from_remote_error() {
        let remote = RemoteError::InvalidEndpoint {
            url: "::".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        let app_err: AppError = remote.into();
        assert!(matches!(app_err, AppError::Remote(_)));
        assert!(std::error::Error::source(&app_err).is_some());
    }
}
