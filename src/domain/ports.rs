use crate::domain::model::{
    DatabaseInfo, Extraction, ExtractionJob, Receiver, Source, StationRecord,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The opaque waveform database. Implementations may dispatch to a worker
/// pool or an external process; callers only ever await the result.
#[async_trait]
pub trait WaveformExtractor: Send + Sync {
    fn info(&self) -> &DatabaseInfo;

    async fn extract(&self, job: ExtractionJob) -> Result<Extraction>;
}

#[async_trait]
pub trait EventLookup: Send + Sync {
    /// `Ok(None)` 表示查無此事件；回傳值的欄位由呼叫端檢查
    async fn event(&self, event_id: &str) -> Result<Option<serde_json::Value>>;
}

#[async_trait]
pub trait StationLookup: Send + Sync {
    async fn stations(
        &self,
        networks: &[String],
        stations: &[String],
    ) -> Result<Vec<StationRecord>>;
}

#[async_trait]
pub trait TravelTimeLookup: Send + Sync {
    /// Seconds after origin time, or `None` when the phase does not exist
    /// for this geometry. Unknown phase names are `NotFound` errors.
    async fn travel_time(
        &self,
        source: &Source,
        receiver: &Receiver,
        phase: &str,
    ) -> Result<Option<f64>>;
}

/// 回應輸出端，由傳輸層實作
#[async_trait]
pub trait ResponseSink: Send {
    fn set_header(&mut self, name: &str, value: String);

    async fn write(&mut self, chunk: Vec<u8>) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    /// Signals that the body delivered so far is truncated.
    async fn abort(&mut self, reason: &str);
}
