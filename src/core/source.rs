use crate::core::params::{MechanismSpec, SeismogramQuery, SourceSpec};
use crate::core::time_window::default_origin_time;
use crate::domain::model::{
    EventRecord, ForceVector, Mechanism, MomentTensor, Source, DEFAULT_SCALAR_MOMENT,
};
use crate::domain::ports::EventLookup;
use crate::utils::error::{Result, SeismoError};
use chrono::{DateTime, Utc};

const EVENT_FIELDS: [&str; 10] = [
    "depth_in_m",
    "latitude",
    "longitude",
    "m_pp",
    "m_rp",
    "m_rr",
    "m_rt",
    "m_tp",
    "m_tt",
    "origin_time",
];

/// 建構失敗時保留原因，但改寫成指向請求欄位的訊息
fn construction_error(field: &str, what: &str, err: SeismoError) -> SeismoError {
    let reason = match err {
        SeismoError::InvalidValue { field: inner, reason } => format!("'{}': {}", inner, reason),
        other => other.to_string(),
    };
    SeismoError::invalid(
        field,
        format!(
            "Could not construct {} with passed parameters ({}). Check parameters for sanity.",
            what, reason
        ),
    )
}

pub struct SourceResolver<'a> {
    events: Option<&'a dyn EventLookup>,
}

impl<'a> SourceResolver<'a> {
    pub fn new(events: Option<&'a dyn EventLookup>) -> Self {
        Self { events }
    }

    /// Fetches an event and checks the record has exactly the expected shape.
    pub async fn lookup_event(&self, event_id: &str) -> Result<EventRecord> {
        let events = self.events.ok_or_else(|| {
            SeismoError::unsupported(
                "Server does not support event information and thus no event queries.",
            )
        })?;

        let value = events
            .event(event_id)
            .await?
            .ok_or_else(|| SeismoError::not_found("Event not found."))?;

        let keys = value.as_object().map(|obj| {
            let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
            keys.sort();
            keys
        });
        if keys.as_deref() != Some(&EVENT_FIELDS[..]) {
            tracing::error!(
                "Event lookup returned an invalid record for '{}': {}",
                event_id,
                value
            );
            return Err(SeismoError::upstream("Event callback returned an invalid result."));
        }

        serde_json::from_value(value).map_err(|e| {
            SeismoError::upstream(format!("Event callback returned an invalid result: {}", e))
        })
    }

    pub fn from_event(event: &EventRecord) -> Result<Source> {
        let source = MomentTensor::from_components([
            event.m_rr, event.m_tt, event.m_pp, event.m_rt, event.m_rp, event.m_tp,
        ])
        .and_then(|m| {
            Source::new(
                event.latitude,
                event.longitude,
                event.depth_in_m,
                event.origin_time,
                Mechanism::MomentTensor(m),
            )
        });
        source.map_err(|e| {
            SeismoError::upstream(format!("Event record is not a valid source: {}", e))
        })
    }

    pub fn from_spec(
        latitude: f64,
        longitude: f64,
        depth_in_m: f64,
        mechanism: &MechanismSpec,
        origin_time: DateTime<Utc>,
    ) -> Result<Source> {
        match mechanism {
            MechanismSpec::MomentTensor(m) => MomentTensor::from_components(*m)
                .and_then(|m| {
                    Source::new(
                        latitude,
                        longitude,
                        depth_in_m,
                        origin_time,
                        Mechanism::MomentTensor(m),
                    )
                })
                .map_err(|e| construction_error("sourcemomenttensor", "moment tensor source", e)),
            MechanismSpec::DoubleCouple {
                strike,
                dip,
                rake,
                m0,
            } => {
                let m0 = m0.unwrap_or(DEFAULT_SCALAR_MOMENT);
                if m0 < 0.0 {
                    return Err(SeismoError::invalid(
                        "sourcedoublecouple",
                        "Seismic moment must not be negative.",
                    ));
                }
                Mechanism::double_couple(*strike, *dip, *rake, m0)
                    .and_then(|mechanism| {
                        Source::new(latitude, longitude, depth_in_m, origin_time, mechanism)
                    })
                    .map_err(|e| {
                        construction_error(
                            "sourcedoublecouple",
                            "the source from the strike/dip/rake parameters",
                            e,
                        )
                    })
            }
            MechanismSpec::Force([f_r, f_t, f_p]) => Source::new(
                latitude,
                longitude,
                depth_in_m,
                origin_time,
                Mechanism::Force(ForceVector {
                    f_r: *f_r,
                    f_t: *f_t,
                    f_p: *f_p,
                }),
            )
            .map_err(|e| construction_error("sourceforce", "force source", e)),
        }
    }

    pub async fn resolve(&self, query: &SeismogramQuery) -> Result<Source> {
        let source = match &query.source {
            SourceSpec::Event { event_id } => {
                let event = self.lookup_event(event_id).await?;
                tracing::debug!("Resolved event '{}' at {}", event_id, event.origin_time);
                Self::from_event(&event)?
            }
            SourceSpec::Explicit {
                latitude,
                longitude,
                depth_in_m,
                mechanism,
            } => Self::from_spec(
                *latitude,
                *longitude,
                *depth_in_m,
                mechanism,
                query.origin_time.unwrap_or_else(default_origin_time),
            )?,
        };

        if let Some(m) = source.mechanism.moment_tensor() {
            tracing::debug!(
                "Source at ({:.3}, {:.3}) depth {:.1} m, Mw {:.2}",
                source.latitude,
                source.longitude,
                source.depth_in_m,
                m.moment_magnitude()
            );
        }
        Ok(source)
    }
}
