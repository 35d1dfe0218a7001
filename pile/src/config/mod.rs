//! User configuration in `~/.pile/config.ini`.
//!
//! Every key is optional; missing keys fall back to [`defaults`].

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::ConfigFileError;
pub use settings::{
    CacheBackend, CacheSettings, ConfigFile, DatasourceSettings, IngestionSettings,
    LoggingSettings, RenderSettings, ServerSettings,
};
pub use size::{format_size, parse_size, SizeParseError};
