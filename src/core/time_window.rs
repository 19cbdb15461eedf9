use crate::domain::model::{DatabaseInfo, Receiver, Source, TimeWindow};
use crate::domain::ports::TravelTimeLookup;
use crate::utils::error::{Result, SeismoError};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// 未指定 origintime 也沒有事件時使用的起始時間
pub fn default_origin_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeSetting {
    Absolute(DateTime<Utc>),
    /// Seconds relative to the origin time.
    Offset(f64),
    Phase { phase: String, offset: f64 },
}

fn phase_regex() -> &'static Regex {
    static PHASE: OnceLock<Regex> = OnceLock::new();
    PHASE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9]*)\s*(?:([+-])\s*(\d+(?:\.\d*)?|\.\d+))?$")
            .expect("phase pattern is valid")
    })
}

pub fn seconds(value: f64) -> Duration {
    Duration::nanoseconds((value * 1.0e9).round() as i64)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Datetime string, float seconds, or `phase[+-offset]`.
pub fn parse_time_setting(field: &str, value: &str) -> Result<TimeSetting> {
    if let Some(t) = parse_timestamp(value) {
        return Ok(TimeSetting::Absolute(t));
    }
    if let Ok(offset) = value.trim().parse::<f64>() {
        if !offset.is_finite() {
            return Err(SeismoError::invalid(field, "Offset must be a finite number"));
        }
        return Ok(TimeSetting::Offset(offset));
    }
    let caps = phase_regex().captures(value.trim()).ok_or_else(|| {
        SeismoError::invalid(
            field,
            format!(
                "Could not parse '{}'. Expected format: Datetime String/Float/Phase+-Offset",
                value
            ),
        )
    })?;
    let phase = caps[1].to_string();
    let offset = match (caps.get(2), caps.get(3)) {
        (Some(sign), Some(amount)) => {
            let amount: f64 = amount
                .as_str()
                .parse()
                .map_err(|_| SeismoError::invalid(field, "Invalid phase offset"))?;
            if sign.as_str() == "-" {
                -amount
            } else {
                amount
            }
        }
        _ => 0.0,
    };
    Ok(TimeSetting::Phase { phase, offset })
}

/// One side of the window after origin-relative values were applied.
#[derive(Debug, Clone, PartialEq)]
enum Bound {
    At(DateTime<Utc>),
    Phase { phase: String, offset: f64 },
}

#[derive(Debug, Clone)]
pub struct TimeWindowResolver {
    start: Bound,
    end: Bound,
    earliest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl TimeWindowResolver {
    pub fn new(
        start: Option<&TimeSetting>,
        end: Option<&TimeSetting>,
        origin_time: DateTime<Utc>,
        info: &DatabaseInfo,
    ) -> Result<Self> {
        let earliest = origin_time - seconds(info.time_shift_s);
        let latest = origin_time + seconds(info.length_s - info.time_shift_s);

        let bound = |setting: Option<&TimeSetting>, default: DateTime<Utc>| match setting {
            None => Bound::At(default),
            Some(TimeSetting::Absolute(t)) => Bound::At(*t),
            Some(TimeSetting::Offset(o)) => Bound::At(origin_time + seconds(*o)),
            Some(TimeSetting::Phase { phase, offset }) => Bound::Phase {
                phase: phase.clone(),
                offset: *offset,
            },
        };
        let start = bound(start, earliest);
        let end = bound(end, latest);

        if let Bound::At(s) = &start {
            if *s > latest {
                return Err(SeismoError::invalid(
                    "starttime",
                    format!(
                        "The start time lies after the end of the available data ({}).",
                        latest
                    ),
                ));
            }
        }
        if let Bound::At(e) = &end {
            if *e < earliest {
                return Err(SeismoError::invalid(
                    "endtime",
                    format!(
                        "The end time lies before the beginning of the available data ({}).",
                        earliest
                    ),
                ));
            }
        }
        if let (Bound::At(s), Bound::At(e)) = (&start, &end) {
            if s >= e {
                return Err(SeismoError::invalid(
                    "endtime",
                    "The end time must be after the start time.",
                ));
            }
        }

        Ok(Self {
            start,
            end,
            earliest,
            latest,
        })
    }

    pub fn needs_travel_times(&self) -> bool {
        matches!(self.start, Bound::Phase { .. }) || matches!(self.end, Bound::Phase { .. })
    }

    pub fn earliest(&self) -> DateTime<Utc> {
        self.earliest
    }

    pub fn latest(&self) -> DateTime<Utc> {
        self.latest
    }

    async fn instant(
        &self,
        bound: &Bound,
        source: &Source,
        receiver: &Receiver,
        travel_times: Option<&dyn TravelTimeLookup>,
    ) -> Result<Option<DateTime<Utc>>> {
        match bound {
            Bound::At(t) => Ok(Some(*t)),
            Bound::Phase { phase, offset } => {
                let lookup = travel_times.ok_or_else(|| {
                    SeismoError::unsupported(
                        "Server does not support travel time calculations and thus no \
                         phase relative times.",
                    )
                })?;
                let travel_time = lookup.travel_time(source, receiver, phase).await?;
                Ok(travel_time.map(|tt| source.origin_time + seconds(tt + offset)))
            }
        }
    }

    /// `None` when a phase does not exist for this geometry or the window
    /// falls outside the available data after clipping.
    pub async fn resolve(
        &self,
        source: &Source,
        receiver: &Receiver,
        travel_times: Option<&dyn TravelTimeLookup>,
    ) -> Result<Option<TimeWindow>> {
        let Some(start) = self.instant(&self.start, source, receiver, travel_times).await? else {
            return Ok(None);
        };
        let Some(end) = self.instant(&self.end, source, receiver, travel_times).await? else {
            return Ok(None);
        };

        let start = start.max(self.earliest);
        let end = end.min(self.latest);
        if start >= end {
            return Ok(None);
        }
        Ok(Some(TimeWindow { start, end }))
    }
}
