//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use pile::app::AppError;
use pile::config::ConfigFileError;
use pile::coord::CoordError;

#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Configuration values do not form a runnable setup
    InvalidConfig(String),
    /// Failed to start the engine
    Startup(AppError),
    /// HTTP listener failed
    Serve(std::io::Error),
    /// Command-line values are out of range
    InvalidTile(CoordError),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidTile(_) => 64,
            CliError::Config(_) | CliError::InvalidConfig(_) => 78,
            CliError::LoggingInit(_) | CliError::Runtime(_) => 70,
            CliError::Startup(_) => 69,
            CliError::Serve(_) => 74,
        }
    }

    /// Prints the error and exits with [`exit_code`](Self::exit_code).
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in config.ini or run 'pile init --force' to");
                eprintln!("write a fresh default file.");
            }
            CliError::Serve(_) => {
                eprintln!();
                eprintln!("Is another process listening on the configured port?");
                eprintln!("Use --port to pick a different one.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::InvalidConfig(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Startup(e) => write!(f, "{}", e),
            CliError::Serve(e) => write!(f, "HTTP server error: {}", e),
            CliError::InvalidTile(e) => write!(f, "Invalid tile: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) | CliError::Serve(e) | CliError::Runtime(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Startup(e) => Some(e),
            CliError::InvalidTile(e) => Some(e),
            CliError::InvalidConfig(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidTile(e)
    }
}
