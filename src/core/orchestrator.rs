use crate::core::geometry::validate_geometry;
use crate::core::params::SeismogramQuery;
use crate::core::time_window::TimeWindowResolver;
use crate::domain::model::{ExtractionJob, OutputFormat, Payload, Receiver, Source};
use crate::domain::ports::{ResponseSink, TravelTimeLookup, WaveformExtractor};
use crate::utils::error::{Result, SeismoError};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use zip::write::{SimpleFileOptions, StreamWriter, ZipWriter};
use zip::CompressionMethod;

pub const MU_HEADER: &str = "Seismo-Mu";

/// Everything resolved for one request before any output is produced.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub query: SeismogramQuery,
    pub label: String,
    pub source: Source,
    pub receivers: Vec<Receiver>,
    pub windows: TimeWindowResolver,
    pub requested_at: DateTime<Utc>,
}

impl ExtractionRequest {
    pub fn attachment_name(&self) -> String {
        format!(
            "{}_{}.{}",
            self.label,
            self.requested_at.format("%Y-%m-%dT%H-%M-%S"),
            self.query.format.file_extension()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed { count: usize },
    /// The client went away; `count` receivers were delivered before that.
    Cancelled { count: usize },
}

/// 壓縮檔寫入端，寫入的位元組暫存於此直到送出
#[derive(Clone, Default)]
struct QueuedBuffer(Arc<Mutex<Vec<u8>>>);

impl QueuedBuffer {
    fn drain(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Write for QueuedBuffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("archive buffer lock poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

enum Output {
    Stream,
    Archive {
        writer: ZipWriter<StreamWriter<QueuedBuffer>>,
        buffer: QueuedBuffer,
    },
}

impl Output {
    fn open(format: OutputFormat) -> Self {
        match format {
            OutputFormat::SingleStream => Output::Stream,
            OutputFormat::Archive => {
                let buffer = QueuedBuffer::default();
                Output::Archive {
                    writer: ZipWriter::new_stream(buffer.clone()),
                    buffer,
                }
            }
        }
    }

    /// Bytes ready to be sent for this payload.
    fn append(&mut self, payload: Payload) -> Result<Vec<u8>> {
        match (self, payload) {
            (Output::Stream, Payload::Stream(data)) => Ok(data),
            (Output::Archive { writer, buffer }, Payload::Entries(entries)) => {
                for entry in entries {
                    let options = SimpleFileOptions::default()
                        .compression_method(CompressionMethod::Stored);
                    writer.start_file(entry.filename, options)?;
                    writer.write_all(&entry.data)?;
                }
                writer.flush()?;
                Ok(buffer.drain())
            }
            (Output::Stream, Payload::Entries(_)) => Err(SeismoError::upstream(
                "Extractor returned archive entries for a single-stream request.",
            )),
            (Output::Archive { .. }, Payload::Stream(_)) => Err(SeismoError::upstream(
                "Extractor returned a single stream for an archive request.",
            )),
        }
    }

    fn close(self) -> Result<Vec<u8>> {
        match self {
            Output::Stream => Ok(Vec::new()),
            Output::Archive { writer, buffer } => {
                writer.finish()?;
                Ok(buffer.drain())
            }
        }
    }
}

/// A failing sink means the client is gone.
async fn deliver(sink: &mut dyn ResponseSink, bytes: Vec<u8>) -> Result<()> {
    if !bytes.is_empty() {
        sink.write(bytes).await?;
    }
    sink.flush().await
}

/// Streams one request's seismograms, receiver by receiver, into a sink.
pub struct ExtractionOrchestrator<'a> {
    extractor: &'a dyn WaveformExtractor,
    travel_times: Option<&'a dyn TravelTimeLookup>,
    cancel: CancellationToken,
}

impl<'a> ExtractionOrchestrator<'a> {
    pub fn new(
        extractor: &'a dyn WaveformExtractor,
        travel_times: Option<&'a dyn TravelTimeLookup>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            extractor,
            travel_times,
            cancel,
        }
    }

    pub async fn run(
        &self,
        request: &ExtractionRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<Outcome> {
        let format = request.query.format;
        sink.set_header("Content-Type", format.content_type().to_string());
        sink.set_header(
            "Content-Disposition",
            format!("attachment; filename={}", request.attachment_name()),
        );

        let mut output = Output::open(format);
        let mut count = 0usize;
        let mut flushed = false;

        let result = self
            .stream_receivers(request, sink, &mut output, &mut count, &mut flushed)
            .await;
        let result = match result {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) if count == 0 => Err(SeismoError::NoSeismograms),
            Ok(None) => self.finalize(sink, output, count).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if flushed {
                tracing::error!("Aborting stream after {} receivers: {}", count, e);
                sink.abort(&e.client_message()).await;
            } else {
                tracing::error!("Request failed before any output: {}", e);
            }
        }
        result
    }

    /// `Some` when the loop ended early because of cancellation.
    async fn stream_receivers(
        &self,
        request: &ExtractionRequest,
        sink: &mut dyn ResponseSink,
        output: &mut Output,
        count: &mut usize,
        flushed: &mut bool,
    ) -> Result<Option<Outcome>> {
        let info = self.extractor.info();

        for receiver in &request.receivers {
            if self.cancel.is_cancelled() {
                return Ok(Some(self.cancelled(sink, *count).await));
            }

            let Some(window) = request
                .windows
                .resolve(&request.source, receiver, self.travel_times)
                .await?
            else {
                tracing::warn!("No time window for {}; skipping receiver", receiver.seed_id());
                continue;
            };

            let geometry = validate_geometry(&request.source, receiver, info)?;
            tracing::debug!(
                "Extracting {} at {:.3} deg, window {} - {}",
                receiver.seed_id(),
                geometry.epicentral_distance_deg,
                window.start,
                window.end
            );

            let job = ExtractionJob {
                source: request.source.clone(),
                receiver: receiver.clone(),
                geometry,
                components: request.query.components.clone(),
                units: request.query.units,
                dt: request.query.dt,
                kernelwidth: request.query.kernelwidth,
                window,
                scale: request.query.scale,
                format: request.query.format,
                label: request.label.clone(),
            };
            let extraction = self.extractor.extract(job).await;

            if self.cancel.is_cancelled() {
                return Ok(Some(self.cancelled(sink, *count).await));
            }

            let extraction = extraction.map_err(|e| match e {
                SeismoError::Extraction { .. } => e,
                other => {
                    tracing::error!("Extraction for {} failed: {}", receiver.seed_id(), other);
                    SeismoError::extraction_failed()
                }
            })?;
            if *count == 0 {
                sink.set_header(MU_HEADER, format!("{:.6}", extraction.mu));
            }

            let bytes = output.append(extraction.payload)?;
            if let Err(e) = deliver(sink, bytes).await {
                tracing::warn!("Response sink failed while sending {}: {}", receiver.seed_id(), e);
                return Ok(Some(Outcome::Cancelled { count: *count }));
            }
            *flushed = true;
            *count += 1;
            tracing::info!("Delivered {} ({} so far)", receiver.seed_id(), count);
        }
        Ok(None)
    }

    async fn finalize(
        &self,
        sink: &mut dyn ResponseSink,
        output: Output,
        count: usize,
    ) -> Result<Outcome> {
        let tail = output.close()?;
        if let Err(e) = deliver(sink, tail).await {
            tracing::warn!("Response sink failed while closing the stream: {}", e);
            return Ok(Outcome::Cancelled { count });
        }
        tracing::info!("Finished streaming {} receivers", count);
        Ok(Outcome::Completed { count })
    }

    async fn cancelled(&self, sink: &mut dyn ResponseSink, count: usize) -> Outcome {
        tracing::warn!("Client disconnected after {} receivers; stopping", count);
        if let Err(e) = sink.flush().await {
            tracing::debug!("Flush after disconnect failed: {}", e);
        }
        Outcome::Cancelled { count }
    }
}
