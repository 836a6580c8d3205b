use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "DoctorScheduler";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Slots are offered on a fixed grid of this many minutes.
pub const SLOT_INCREMENT_MINUTES: u32 = 30;

/// Minimum similarity for a free-text category to be accepted.
pub const CATEGORY_MATCH_THRESHOLD: f64 = 0.5;

/// Practitioner categories offered when nothing else is configured.
pub const DEFAULT_CATEGORIES: &[&str] = &["Radiologist", "Psychiatrist", "Cardiologist", "Dermatologist"];

/// Longest time menu shown to the user (before the "pick different" option).
pub const MAX_TIME_OPTIONS: usize = 11;

/// Longest day menu shown to the user (before the "pick different" option).
pub const MAX_DAY_OPTIONS: usize = 4;

/// Intent score thresholds, mirroring the recognizer trigger configuration.
pub const SCHEDULE_INTENT_THRESHOLD: f64 = 0.79;
pub const HELP_INTENT_THRESHOLD: f64 = 0.9;
pub const CANCEL_INTENT_THRESHOLD: f64 = 0.65;

/// Default NLU request timeout.
pub const DEFAULT_NLU_TIMEOUT_SECS: u64 = 10;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "appointment_scheduler=info,warn"
}

/// Get the application data directory
/// ~/DoctorScheduler/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the on-disk schedule database.
pub fn schedule_db_path() -> PathBuf {
    app_data_dir().join("schedule.db")
}

// ═══════════════════════════════════════════════════════════
// SchedulerConfig
// ═══════════════════════════════════════════════════════════

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Full recognizer endpoint (including app id and key). `None` disables NLU calls.
    pub luis_model_url: Option<String>,
    /// SQLite schedule database.
    pub schedule_db_path: PathBuf,
    /// Practitioner categories users may ask for.
    pub categories: Vec<String>,
    /// Fuzzy-match acceptance threshold, in `0.0..=1.0`.
    pub category_threshold: f64,
    /// Timeout for recognizer HTTP calls.
    pub nlu_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            luis_model_url: None,
            schedule_db_path: schedule_db_path(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            category_threshold: CATEGORY_MATCH_THRESHOLD,
            nlu_timeout_secs: DEFAULT_NLU_TIMEOUT_SECS,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a number between 0 and 1, got '{value}'")]
    InvalidThreshold { name: &'static str, value: String },
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidInteger { name: &'static str, value: String },
    #[error("{0} must list at least one category")]
    EmptyCategories(&'static str),
}

impl SchedulerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `LUIS_MODEL_URL` (optional): recognizer endpoint
    /// - `SCHEDULE_DB_PATH` (optional, default: `~/DoctorScheduler/schedule.db`)
    /// - `SCHEDULER_CATEGORIES` (optional): comma-separated category list
    /// - `CATEGORY_MATCH_THRESHOLD` (optional, default: 0.5)
    /// - `NLU_TIMEOUT_SECS` (optional, default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.luis_model_url = lookup("LUIS_MODEL_URL").filter(|url| !url.trim().is_empty());

        if let Some(path) = lookup("SCHEDULE_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.schedule_db_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("SCHEDULER_CATEGORIES") {
            let categories: Vec<String> = raw
                .split(',')
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            if categories.is_empty() {
                return Err(ConfigError::EmptyCategories("SCHEDULER_CATEGORIES"));
            }
            config.categories = categories;
        }

        if let Some(raw) = lookup("CATEGORY_MATCH_THRESHOLD") {
            let threshold = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or_else(|| ConfigError::InvalidThreshold {
                    name: "CATEGORY_MATCH_THRESHOLD",
                    value: raw.clone(),
                })?;
            config.category_threshold = threshold;
        }

        if let Some(raw) = lookup("NLU_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidInteger {
                    name: "NLU_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
            config.nlu_timeout_secs = secs;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn schedule_db_under_app_data() {
        let db = schedule_db_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("schedule.db"));
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = SchedulerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.categories.len(), 4);
        assert_eq!(config.category_threshold, 0.5);
        assert!(config.luis_model_url.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = SchedulerConfig::from_lookup(lookup_from(&[
            ("LUIS_MODEL_URL", "https://nlu.example/apps/1?subscription-key=k"),
            ("SCHEDULE_DB_PATH", "/tmp/sched.db"),
            ("SCHEDULER_CATEGORIES", "Radiologist, Neurologist ,,"),
            ("CATEGORY_MATCH_THRESHOLD", "0.7"),
            ("NLU_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(
            config.luis_model_url.as_deref(),
            Some("https://nlu.example/apps/1?subscription-key=k")
        );
        assert_eq!(config.schedule_db_path, PathBuf::from("/tmp/sched.db"));
        assert_eq!(config.categories, vec!["Radiologist", "Neurologist"]);
        assert_eq!(config.category_threshold, 0.7);
        assert_eq!(config.nlu_timeout_secs, 3);
    }

    #[test]
    fn blank_model_url_is_ignored() {
        let config = SchedulerConfig::from_lookup(lookup_from(&[("LUIS_MODEL_URL", "  ")])).unwrap();
        assert!(config.luis_model_url.is_none());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let err = SchedulerConfig::from_lookup(lookup_from(&[("CATEGORY_MATCH_THRESHOLD", "1.5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = SchedulerConfig::from_lookup(lookup_from(&[("NLU_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInteger { .. }));
    }

    #[test]
    fn empty_category_list_rejected() {
        let err = SchedulerConfig::from_lookup(lookup_from(&[("SCHEDULER_CATEGORIES", " , ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyCategories("SCHEDULER_CATEGORIES"));
    }
}
