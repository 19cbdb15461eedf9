pub mod engine;
pub mod geometry;
pub mod orchestrator;
pub mod params;
pub mod receiver;
pub mod rotation;
pub mod source;
pub mod time_window;

pub use crate::utils::error::Result;
pub use engine::SeismogramEngine;
pub use orchestrator::{ExtractionOrchestrator, ExtractionRequest, Outcome};
pub use params::{ParameterValidator, RawSeismogramParams, SeismogramQuery};
