use crate::domain::model::StationRecord;
use crate::domain::ports::StationLookup;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Station coordinates read once from a CSV file with the header
/// `network,station,latitude,longitude`.
#[derive(Debug, Clone)]
pub struct CsvStationCatalog {
    records: Vec<StationRecord>,
}

impl CsvStationCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        Self::from_reader(&mut reader)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        Self::from_reader(&mut reader)
    }

    fn from_reader<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Self> {
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<StationRecord>, csv::Error>>()?;
        tracing::debug!("Loaded {} stations", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn matches(pattern: &str, code: &str) -> bool {
    pattern == "*" || pattern.eq_ignore_ascii_case(code)
}

#[async_trait]
impl StationLookup for CsvStationCatalog {
    /// Catalog order is kept; `*` matches any code.
    async fn stations(
        &self,
        networks: &[String],
        stations: &[String],
    ) -> Result<Vec<StationRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| networks.iter().any(|n| matches(n, &r.network)))
            .filter(|r| stations.iter().any(|s| matches(s, &r.station)))
            .cloned()
            .collect())
    }
}
