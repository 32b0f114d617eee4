use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TimetableError};
use crate::normalizer::Normalizer;

// Constants
const CONFIG_FILE: &str = "timetable.json";
const CONFIG_ENV: &str = "TIMETABLE_CONFIG";
const BIND_ENV: &str = "TIMETABLE_BIND";
const DATA_ENV: &str = "TIMETABLE_DATA";

/// Runtime configuration: the grid domains plus server settings.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableConfig {
    /// Ordered teaching days (grid rows).
    #[serde(default = "default_days")]
    pub days: Vec<String>,

    /// Ordered time slots within a day (grid columns).
    #[serde(default = "default_time_slots")]
    pub time_slots: Vec<String>,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Snapshot file used by save/load.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Directory with the browser UI.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Extra misspelling -> canonical teacher name pairs.
    #[serde(default)]
    pub teacher_aliases: BTreeMap<String, String>,
}

fn default_days() -> Vec<String> {
    ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_time_slots() -> Vec<String> {
    [
        "08:30-10:00",
        "10:00-11:30",
        "11:30-13:00",
        "13:00-14:30",
        "14:30-16:00",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("database/timetable.bin.gz")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for TimetableConfig {
    fn default() -> Self {
        TimetableConfig {
            days: default_days(),
            time_slots: default_time_slots(),
            bind_addr: default_bind_addr(),
            data_file: default_data_file(),
            static_dir: default_static_dir(),
            teacher_aliases: BTreeMap::new(),
        }
    }
}

impl TimetableConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Result<TimetableConfig>` - The parsed config or a `Config` error
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TimetableError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: TimetableConfig = serde_json::from_str(&content).map_err(|e| {
            TimetableError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the configuration the server starts with.
    ///
    /// Uses `$TIMETABLE_CONFIG` if set, else `timetable.json` in the working
    /// directory if present, else the defaults. `$TIMETABLE_BIND` and
    /// `$TIMETABLE_DATA` then override the bind address and snapshot file.
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(CONFIG_FILE).exists() => Self::from_file(CONFIG_FILE)?,
            Err(_) => {
                info!("no {} found, using default grid", CONFIG_FILE);
                Self::default()
            }
        };

        if let Ok(bind) = env::var(BIND_ENV) {
            config.bind_addr = bind;
        }
        if let Ok(data) = env::var(DATA_ENV) {
            config.data_file = PathBuf::from(data);
        }
        Ok(config)
    }

    /// Checks that both grid domains are non-empty and duplicate-free.
    pub fn validate(&self) -> Result<()> {
        check_domain("days", &self.days)?;
        check_domain("time_slots", &self.time_slots)?;
        Ok(())
    }

    /// Normalizer with the built-in aliases plus the configured ones.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::default().with_aliases(&self.teacher_aliases)
    }
}

fn check_domain(name: &str, values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Err(TimetableError::Config(format!("`{}` must not be empty", name)));
    }
    let mut seen = HashSet::new();
    for value in values {
        if value.trim().is_empty() {
            return Err(TimetableError::Config(format!(
                "`{}` contains a blank value",
                name
            )));
        }
        if !seen.insert(value.as_str()) {
            return Err(TimetableError::Config(format!(
                "`{}` lists `{}` twice",
                name, value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TimetableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.days.len(), 5);
        assert_eq!(config.time_slots[0], "08:30-10:00");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "days": ["Mon", "Tue"], "teacher_aliases": {{ "dr. smth": "Dr. Smith" }} }}"#
        )
        .unwrap();

        let config = TimetableConfig::from_file(file.path()).unwrap();
        assert_eq!(config.days, vec!["Mon", "Tue"]);
        assert_eq!(config.time_slots, default_time_slots());
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.normalizer().normalize("Dr.Smth B1"), "Dr. Smith");
    }

    #[test]
    fn duplicate_slots_are_rejected() {
        let config = TimetableConfig {
            time_slots: vec!["08:30".into(), "08:30".into()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TimetableError::Config(_))));
    }

    #[test]
    fn empty_days_are_rejected() {
        let config = TimetableConfig {
            days: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = TimetableConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, TimetableError::Config(_)));
    }
}
