pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ServiceConfig;

pub use core::{ExtractionOrchestrator, Outcome, RawSeismogramParams, SeismogramEngine};
pub use utils::error::{Result, SeismoError};
