//! Loading what a command works on
//!
//! The infrastructure configuration is optional for `generate`, which can
//! run from defaults, and required by every command that reaches a host or
//! the state directory.

use crate::error::{CliError, Result};
use mon_core::{ConfigOverrides, InfraConfig};
use mon_fs::NormalizedPath;
use mon_model::ServiceDescriptor;
use std::path::Path;

/// Load the configuration file and apply command-line overrides.
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<InfraConfig> {
    if !path.is_file() {
        return Err(CliError::user(format!(
            "configuration file {} not found (use --config or MONFORGE_CONFIG)",
            path.display()
        )));
    }
    let mut config = InfraConfig::load(&NormalizedPath::new(path))?;
    config.apply(overrides);
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], falling back to defaults when the file is absent.
pub fn load_config_or_default(path: &Path, overrides: &ConfigOverrides) -> Result<InfraConfig> {
    if path.is_file() {
        return load_config(path, overrides);
    }
    tracing::debug!(path = %path.display(), "no configuration file; using defaults");
    let mut config = InfraConfig::default();
    config.apply(overrides);
    Ok(config)
}

pub fn load_descriptor(path: &Path) -> Result<ServiceDescriptor> {
    if !path.is_file() {
        return Err(CliError::user(format!("descriptor {} not found", path.display())));
    }
    Ok(mon_model::load_descriptor(&NormalizedPath::new(path))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_is_a_user_error() {
        let temp = TempDir::new().unwrap();
        let error = load_config(&temp.path().join("monforge.toml"), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(error, CliError::User { .. }));
    }

    #[test]
    fn defaults_take_overrides() {
        let temp = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            strict_patterns: true,
            ..Default::default()
        };
        let config = load_config_or_default(&temp.path().join("absent.toml"), &overrides).unwrap();
        assert!(config.synthesis.strict_patterns);
    }

    #[test]
    fn file_values_yield_to_flags() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("monforge.toml");
        std::fs::write(&path, "[general]\nconcurrency = 2\nbackup_before_deploy = true\n").unwrap();
        let overrides = ConfigOverrides {
            concurrency: Some(6),
            no_backup: true,
            ..Default::default()
        };
        let config = load_config(&path, &overrides).unwrap();
        assert_eq!(config.general.concurrency, 6);
        assert!(!config.general.backup_before_deploy);
    }
}
