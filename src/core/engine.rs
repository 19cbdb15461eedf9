use crate::core::geometry::validate_geometry;
use crate::core::orchestrator::{ExtractionOrchestrator, ExtractionRequest, Outcome};
use crate::core::params::{ParameterValidator, RawSeismogramParams};
use crate::core::receiver::ReceiverResolver;
use crate::core::source::SourceResolver;
use crate::core::time_window::TimeWindowResolver;
use crate::domain::model::{OutputFormat, Receiver, Source, TimeWindow, Units};
use crate::domain::ports::{
    EventLookup, ResponseSink, StationLookup, TravelTimeLookup, WaveformExtractor,
};
use crate::utils::error::{Result, SeismoError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LABEL: &str = "synthetic_seismogram";
pub const DEFAULT_MAX_RECEIVERS: usize = 1000;

/// Resolved request as reported by the planning CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RequestPlan {
    pub label: String,
    pub format: OutputFormat,
    pub components: String,
    pub units: Units,
    pub attachment: String,
    pub source: Source,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub receivers: Vec<ReceiverPlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiverPlan {
    pub receiver: Receiver,
    pub epicentral_distance_deg: f64,
    /// Absent when the receiver would be skipped.
    pub window: Option<TimeWindow>,
}

pub struct SeismogramEngine {
    extractor: Arc<dyn WaveformExtractor>,
    events: Option<Arc<dyn EventLookup>>,
    stations: Option<Arc<dyn StationLookup>>,
    travel_times: Option<Arc<dyn TravelTimeLookup>>,
    default_label: String,
    max_receivers: usize,
}

impl SeismogramEngine {
    pub fn new(extractor: Arc<dyn WaveformExtractor>) -> Self {
        Self {
            extractor,
            events: None,
            stations: None,
            travel_times: None,
            default_label: DEFAULT_LABEL.to_string(),
            max_receivers: DEFAULT_MAX_RECEIVERS,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventLookup>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_stations(mut self, stations: Arc<dyn StationLookup>) -> Self {
        self.stations = Some(stations);
        self
    }

    pub fn with_travel_times(mut self, travel_times: Arc<dyn TravelTimeLookup>) -> Self {
        self.travel_times = Some(travel_times);
        self
    }

    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    pub fn with_max_receivers(mut self, max_receivers: usize) -> Self {
        self.max_receivers = max_receivers;
        self
    }

    /// Validation and resolution; fails before any output is produced.
    pub async fn prepare(&self, raw: &RawSeismogramParams) -> Result<ExtractionRequest> {
        let query = ParameterValidator::validate(raw)?;
        let label = query
            .label
            .clone()
            .unwrap_or_else(|| self.default_label.clone());

        let source = SourceResolver::new(self.events.as_deref())
            .resolve(&query)
            .await?;

        let windows = TimeWindowResolver::new(
            query.start.as_ref(),
            query.end.as_ref(),
            source.origin_time,
            self.extractor.info(),
        )?;
        if windows.needs_travel_times() && self.travel_times.is_none() {
            return Err(SeismoError::unsupported(
                "Server does not support travel time calculations and thus no phase \
                 relative times.",
            ));
        }

        let receivers = ReceiverResolver::new(self.stations.as_deref(), self.max_receivers)
            .resolve(&query.receivers)
            .await?;
        tracing::info!(
            "Resolved request '{}': {} receivers, format {:?}",
            label,
            receivers.len(),
            query.format
        );

        Ok(ExtractionRequest {
            query,
            label,
            source,
            receivers,
            windows,
            requested_at: Utc::now(),
        })
    }

    /// Streams every receiver's seismograms into `sink` until done or
    /// until `cancel` fires.
    pub async fn run(
        &self,
        raw: &RawSeismogramParams,
        sink: &mut dyn ResponseSink,
        cancel: CancellationToken,
    ) -> Result<Outcome> {
        let request = self.prepare(raw).await?;
        ExtractionOrchestrator::new(
            self.extractor.as_ref(),
            self.travel_times.as_deref(),
            cancel,
        )
        .run(&request, sink)
        .await
    }

    /// Resolves windows and geometry per receiver without extracting.
    pub async fn plan(&self, raw: &RawSeismogramParams) -> Result<RequestPlan> {
        let request = self.prepare(raw).await?;
        let info = self.extractor.info();

        let mut receivers = Vec::with_capacity(request.receivers.len());
        for receiver in &request.receivers {
            let geometry = validate_geometry(&request.source, receiver, info)?;
            let window = request
                .windows
                .resolve(&request.source, receiver, self.travel_times.as_deref())
                .await?;
            receivers.push(ReceiverPlan {
                receiver: receiver.clone(),
                epicentral_distance_deg: geometry.epicentral_distance_deg,
                window,
            });
        }

        Ok(RequestPlan {
            attachment: request.attachment_name(),
            label: request.label,
            format: request.query.format,
            components: request.query.components,
            units: request.query.units,
            source: request.source,
            earliest: request.windows.earliest(),
            latest: request.windows.latest(),
            receivers,
        })
    }
}
