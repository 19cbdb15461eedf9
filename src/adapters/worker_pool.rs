use crate::domain::model::{DatabaseInfo, Extraction, ExtractionJob};
use crate::domain::ports::WaveformExtractor;
use crate::utils::error::{Result, SeismoError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A waveform database whose reads block the calling thread.
pub trait BlockingExtract: Send + Sync + 'static {
    fn info(&self) -> &DatabaseInfo;

    fn extract(&self, job: ExtractionJob) -> Result<Extraction>;
}

/// 以有限數量的阻塞執行緒執行萃取，避免卡住非同步排程器
pub struct BlockingExtractor<D: BlockingExtract> {
    database: Arc<D>,
    permits: Arc<Semaphore>,
}

impl<D: BlockingExtract> BlockingExtractor<D> {
    pub fn new(database: D, workers: usize) -> Self {
        Self {
            database: Arc::new(database),
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl<D: BlockingExtract> WaveformExtractor for BlockingExtractor<D> {
    fn info(&self) -> &DatabaseInfo {
        self.database.info()
    }

    async fn extract(&self, job: ExtractionJob) -> Result<Extraction> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| {
                tracing::error!("Extraction worker pool is closed");
                SeismoError::extraction_failed()
            })?;

        let database = Arc::clone(&self.database);
        let station = job.receiver.seed_id();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            database.extract(job)
        })
        .await
        .map_err(|e| {
            tracing::error!("Extraction worker for {} failed: {}", station, e);
            SeismoError::extraction_failed()
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::source_receiver_geometry;
    use crate::core::time_window::default_origin_time;
    use crate::domain::model::{
        Mechanism, MomentTensor, OutputFormat, Payload, Receiver, Source, TimeWindow, Units,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowDatabase {
        info: DatabaseInfo,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl BlockingExtract for SlowDatabase {
        fn info(&self) -> &DatabaseInfo {
            &self.info
        }

        fn extract(&self, job: ExtractionJob) -> Result<Extraction> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.running.fetch_sub(1, Ordering::SeqCst);
            if job.receiver.station == "PANIC" {
                panic!("database handle poisoned");
            }
            if job.receiver.station == "FAIL" {
                return Err(SeismoError::Extraction {
                    message: "corrupt database block".to_string(),
                });
            }
            Ok(Extraction {
                payload: Payload::Stream(job.receiver.station.into_bytes()),
                mu: 3.0e10,
            })
        }
    }

    fn job(station: &str, info: &DatabaseInfo) -> ExtractionJob {
        let m = MomentTensor::from_components([1.0, 1.0, 1.0, 0.0, 0.0, 0.0]).unwrap();
        let source = Source::new(
            0.0,
            0.0,
            0.0,
            default_origin_time(),
            Mechanism::MomentTensor(m),
        )
        .unwrap();
        let receiver = Receiver::new(10.0, 10.0, 0.0, "XX", station, "").unwrap();
        ExtractionJob {
            geometry: source_receiver_geometry(&source, &receiver, info),
            window: TimeWindow {
                start: source.origin_time,
                end: source.origin_time + chrono::Duration::seconds(60),
            },
            source,
            receiver,
            components: "Z".to_string(),
            units: Units::Displacement,
            dt: None,
            kernelwidth: 12,
            scale: 1.0,
            format: OutputFormat::SingleStream,
            label: "test".to_string(),
        }
    }

    fn database() -> SlowDatabase {
        SlowDatabase {
            info: DatabaseInfo {
                is_reciprocal: true,
                planet_radius_m: 6_371_000.0,
                min_radius_m: 5_671_000.0,
                max_radius_m: 6_371_000.0,
                source_depth_m: None,
                time_shift_s: 0.0,
                length_s: 600.0,
            },
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounds_concurrency() {
        let pool = Arc::new(BlockingExtractor::new(database(), 2));
        let mut handles = Vec::new();
        for i in 0..6 {
            let pool = Arc::clone(&pool);
            let job = job(&format!("S{}", i), pool.info());
            handles.push(tokio::spawn(async move { pool.extract(job).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(pool.database.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available_workers(), 2);
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let pool = BlockingExtractor::new(database(), 1);
        let err = pool.extract(job("FAIL", pool.info())).await.unwrap_err();
        assert_eq!(err.to_string(), "corrupt database block");
        assert_eq!(pool.available_workers(), 1);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_an_extraction_error() {
        let pool = BlockingExtractor::new(database(), 1);
        let err = pool.extract(job("PANIC", pool.info())).await.unwrap_err();
        assert!(matches!(err, SeismoError::Extraction { .. }));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), crate::utils::error::EXTRACTION_FAILED);
        assert_eq!(pool.available_workers(), 1);
    }
}
