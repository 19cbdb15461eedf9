use crate::utils::error::{Result, SeismoError};
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "seismo-stream")]
#[command(about = "Validate and resolve a synthetic seismogram request without extracting it")]
pub struct CliConfig {
    #[arg(long, short = 'c', help = "Service configuration (TOML)")]
    pub config: String,

    #[arg(
        long,
        short = 'q',
        help = "Request query string, e.g. 'sourcelatitude=10&sourcelongitude=20&...'"
    )]
    pub query: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("config", &self.config)?;
        if self.query.trim().trim_start_matches('?').is_empty() {
            return Err(SeismoError::ConfigError {
                message: "query: Request query cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
