use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use nsc_core::sync_contracts::{AcceptancePolicy, DEFAULT_REMOVAL_WINDOW_HOURS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NscConfig {
    pub database_path: Option<PathBuf>,
    pub removal_window_hours: i64,
    pub log_level: Option<String>,
    pub acceptance: AcceptancePolicy,
}

impl Default for NscConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            removal_window_hours: DEFAULT_REMOVAL_WINDOW_HOURS,
            log_level: None,
            acceptance: AcceptancePolicy::default(),
        }
    }
}

impl NscConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("nsc/treatments.sqlite"))
    }

    /// Age limit for removals kept by `enqueue`.
    pub fn removal_window(&self) -> Result<TimeDelta> {
        let hours = self.removal_window_hours;
        if hours <= 0 {
            bail!("removal_window_hours must be positive, got {hours}");
        }
        TimeDelta::try_hours(hours)
            .with_context(|| format!("removal_window_hours {hours} is out of range"))
    }
}

pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var("NSC_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("nsc/config.toml")
}

pub fn load_config(path: &Path) -> Result<NscConfig> {
    if !path.exists() {
        return Ok(NscConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: NscConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .removal_window()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".local/share"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/nsc/config.toml")).expect("defaults");
        assert_eq!(config, NscConfig::default());
        assert!(!config.acceptance.accepts_remote_data());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = NamedTempFile::new().expect("temp config");
        writeln!(
            file,
            "database_path = \"/tmp/nsc.sqlite\"\n\n[acceptance]\nnsclient_build = true"
        )
        .expect("write config");

        let config = load_config(file.path()).expect("load config");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/nsc.sqlite"));
        assert_eq!(config.removal_window_hours, 24);
        assert!(config.acceptance.upload_only);
        assert!(config.acceptance.accepts_remote_data());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().expect("temp config");
        writeln!(file, "removal_window_hours = \"soon\"").expect("write config");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn non_positive_window_is_rejected() {
        for hours in ["0", "-6"] {
            let mut file = NamedTempFile::new().expect("temp config");
            writeln!(file, "removal_window_hours = {hours}").expect("write config");
            let err = load_config(file.path()).expect_err("window rejected");
            assert!(format!("{err:#}").contains("must be positive"));
        }
    }

    #[test]
    fn out_of_range_window_is_rejected() {
        let mut file = NamedTempFile::new().expect("temp config");
        writeln!(file, "removal_window_hours = 9000000000000").expect("write config");
        let err = load_config(file.path()).expect_err("window rejected");
        assert!(format!("{err:#}").contains("out of range"));
    }

    #[test]
    fn default_window_is_one_day() {
        let window = NscConfig::default().removal_window().expect("default window");
        assert_eq!(window, TimeDelta::hours(24));
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(
            config_path(Some(Path::new("/etc/nsc.toml"))),
            PathBuf::from("/etc/nsc.toml")
        );
    }
}
