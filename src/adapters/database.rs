use crate::adapters::worker_pool::BlockingExtract;
use crate::domain::model::{DatabaseInfo, Extraction, ExtractionJob};
use crate::utils::error::{Result, SeismoError};

/// Database known only by its description. Enough to validate and plan a
/// request; every extraction attempt is refused.
#[derive(Debug, Clone)]
pub struct DescribedDatabase {
    info: DatabaseInfo,
}

impl DescribedDatabase {
    pub fn new(info: DatabaseInfo) -> Self {
        Self { info }
    }
}

impl BlockingExtract for DescribedDatabase {
    fn info(&self) -> &DatabaseInfo {
        &self.info
    }

    fn extract(&self, job: ExtractionJob) -> Result<Extraction> {
        Err(SeismoError::unsupported(format!(
            "No waveform data is attached; cannot extract {}.",
            job.receiver.seed_id()
        )))
    }
}
