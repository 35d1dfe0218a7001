//! Init command - write a default configuration file.

use std::path::PathBuf;

use pile::config::ConfigFile;

use crate::error::CliError;

pub fn run(config: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = super::config_path(config);

    if force {
        ConfigFile::default().save_to(&path)?;
        println!("Wrote default configuration: {}", path.display());
    } else if ConfigFile::ensure_exists_at(&path)? {
        println!("Created configuration file: {}", path.display());
    } else {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    println!();
    println!("Edit this file to point pile at your renderer and ingestion service.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_then_keeps_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        run(Some(path.clone()), false).unwrap();
        std::fs::write(&path, "[server]\nport = 4100\n").unwrap();
        run(Some(path.clone()), false).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap().server.port, 4100);
    }

    #[test]
    fn test_force_resets_to_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[server]\nport = 4100\n").unwrap();

        run(Some(path.clone()), true).unwrap();

        assert_eq!(
            ConfigFile::load_from(&path).unwrap().server.port,
            ConfigFile::default().server.port
        );
    }
}
