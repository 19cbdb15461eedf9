use crate::core::engine::{DEFAULT_LABEL, DEFAULT_MAX_RECEIVERS};
use crate::domain::model::DatabaseInfo;
use crate::utils::error::{Result, SeismoError};
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_EXTRACTION_WORKERS: usize = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSection,
    pub events: Option<EndpointSection>,
    pub travel_times: Option<EndpointSection>,
    pub stations: Option<StationsSection>,
    pub database: Option<DatabaseSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSection {
    pub default_label: Option<String>,
    pub max_receivers: Option<usize>,
    pub extraction_workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSection {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
}

impl EndpointSection {
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsSection {
    pub catalog_path: String,
}

/// Description of the waveform database, as it would report itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub reciprocal: bool,
    pub planet_radius_m: f64,
    pub min_radius_m: f64,
    pub max_radius_m: f64,
    pub source_depth_m: Option<f64>,
    #[serde(default)]
    pub time_shift_s: f64,
    pub length_s: f64,
}

impl DatabaseSection {
    pub fn info(&self) -> DatabaseInfo {
        DatabaseInfo {
            is_reciprocal: self.reciprocal,
            planet_radius_m: self.planet_radius_m,
            min_radius_m: self.min_radius_m,
            max_radius_m: self.max_radius_m,
            source_depth_m: self.source_depth_m,
            time_shift_s: self.time_shift_s,
            length_s: self.length_s,
        }
    }
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| SeismoError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EVENT_SERVICE})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(label) = &self.service.default_label {
            if label.trim().is_empty() {
                return Err(SeismoError::ConfigError {
                    message: "service.default_label: Label cannot be empty".to_string(),
                });
            }
        }
        if let Some(max) = self.service.max_receivers {
            validate_positive_number("service.max_receivers", max, 1)?;
        }
        if let Some(workers) = self.service.extraction_workers {
            validate_positive_number("service.extraction_workers", workers, 1)?;
        }

        for (name, section) in [("events", &self.events), ("travel_times", &self.travel_times)] {
            if let Some(section) = section {
                validate_url(&format!("{}.endpoint", name), &section.endpoint)?;
                validate_positive_number(
                    &format!("{}.timeout_seconds", name),
                    section.timeout_seconds() as usize,
                    1,
                )?;
            }
        }

        if let Some(stations) = &self.stations {
            validate_path("stations.catalog_path", &stations.catalog_path)?;
        }

        if let Some(db) = &self.database {
            let radii_ok = db.planet_radius_m > 0.0
                && db.min_radius_m >= 0.0
                && db.min_radius_m < db.max_radius_m
                && db.max_radius_m <= db.planet_radius_m;
            if !radii_ok {
                return Err(SeismoError::ConfigError {
                    message: "database: radii must satisfy 0 <= min < max <= planet radius"
                        .to_string(),
                });
            }
            if db.length_s.is_nan() || db.length_s <= 0.0 || db.time_shift_s < 0.0 {
                return Err(SeismoError::ConfigError {
                    message: "database: length must be positive and time shift non-negative"
                        .to_string(),
                });
            }
            if !db.reciprocal && db.source_depth_m.is_none() {
                return Err(SeismoError::ConfigError {
                    message: "database.source_depth_m: required for forward databases".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn default_label(&self) -> &str {
        self.service.default_label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn max_receivers(&self) -> usize {
        self.service.max_receivers.unwrap_or(DEFAULT_MAX_RECEIVERS)
    }

    pub fn extraction_workers(&self) -> usize {
        self.service
            .extraction_workers
            .unwrap_or(DEFAULT_EXTRACTION_WORKERS)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
