use crate::core::time_window::{parse_time_setting, parse_timestamp, TimeSetting};
use crate::domain::model::{OutputFormat, Units};
use crate::utils::error::{quoted, Result, SeismoError};
use crate::utils::validation::{validate_finite, validate_non_empty_string};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_COMPONENTS: &str = "ZNE";
pub const DEFAULT_KERNEL_WIDTH: u32 = 12;
pub const MAX_KERNEL_WIDTH: u32 = 20;
pub const DEFAULT_NETWORK_CODE: &str = "XX";
pub const DEFAULT_STATION_CODE: &str = "SYN";
pub const DEFAULT_LOCATION_CODE: &str = "SE";

const SOURCE_FIELDS: [&str; 6] = [
    "sourcemomenttensor",
    "sourcedoublecouple",
    "sourceforce",
    "sourcelatitude",
    "sourcelongitude",
    "sourcedepthinmeters",
];
const SOURCE_LOCATION_FIELDS: [&str; 3] =
    ["sourcelatitude", "sourcelongitude", "sourcedepthinmeters"];
const MECHANISM_FIELDS: [&str; 4] = [
    "sourcemomenttensor",
    "sourcedoublecouple",
    "sourceforce",
    "eventid",
];

/// Every recognised request field, still as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeismogramParams {
    pub components: Option<String>,
    pub units: Option<String>,
    pub dt: Option<String>,
    pub kernelwidth: Option<String>,
    pub label: Option<String>,
    pub scale: Option<String>,
    pub format: Option<String>,

    // 震源：位置加上四種機制之一
    pub sourcelatitude: Option<String>,
    pub sourcelongitude: Option<String>,
    pub sourcedepthinmeters: Option<String>,
    pub sourcemomenttensor: Option<String>,
    pub sourcedoublecouple: Option<String>,
    pub sourceforce: Option<String>,
    pub eventid: Option<String>,

    pub origintime: Option<String>,
    pub starttime: Option<String>,
    pub endtime: Option<String>,

    // 接收站：座標或是 network/station 查詢
    pub receiverlatitude: Option<String>,
    pub receiverlongitude: Option<String>,
    pub receiverdepthinmeters: Option<String>,
    pub networkcode: Option<String>,
    pub stationcode: Option<String>,
    pub locationcode: Option<String>,
    pub network: Option<String>,
    pub station: Option<String>,
}

impl RawSeismogramParams {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        let slot = match name {
            "components" => &mut self.components,
            "units" => &mut self.units,
            "dt" => &mut self.dt,
            "kernelwidth" => &mut self.kernelwidth,
            "label" => &mut self.label,
            "scale" => &mut self.scale,
            "format" => &mut self.format,
            "sourcelatitude" => &mut self.sourcelatitude,
            "sourcelongitude" => &mut self.sourcelongitude,
            "sourcedepthinmeters" => &mut self.sourcedepthinmeters,
            "sourcemomenttensor" => &mut self.sourcemomenttensor,
            "sourcedoublecouple" => &mut self.sourcedoublecouple,
            "sourceforce" => &mut self.sourceforce,
            "eventid" => &mut self.eventid,
            "origintime" => &mut self.origintime,
            "starttime" => &mut self.starttime,
            "endtime" => &mut self.endtime,
            "receiverlatitude" => &mut self.receiverlatitude,
            "receiverlongitude" => &mut self.receiverlongitude,
            "receiverdepthinmeters" => &mut self.receiverdepthinmeters,
            "networkcode" => &mut self.networkcode,
            "stationcode" => &mut self.stationcode,
            "locationcode" => &mut self.locationcode,
            "network" => &mut self.network,
            "station" => &mut self.station,
            _ => return None,
        };
        Some(slot)
    }

    fn is_given(&self, name: &str) -> bool {
        let value = match name {
            "sourcelatitude" => &self.sourcelatitude,
            "sourcelongitude" => &self.sourcelongitude,
            "sourcedepthinmeters" => &self.sourcedepthinmeters,
            "sourcemomenttensor" => &self.sourcemomenttensor,
            "sourcedoublecouple" => &self.sourcedoublecouple,
            "sourceforce" => &self.sourceforce,
            "eventid" => &self.eventid,
            _ => return false,
        };
        value.is_some()
    }

    /// Builds the parameter set from key/value pairs. Unknown and repeated
    /// names are rejected.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        let mut unknown = Vec::new();
        let mut repeated = Vec::new();

        for (key, value) in pairs {
            let name = key.as_ref().to_ascii_lowercase();
            match params.slot(&name) {
                Some(slot) if slot.is_some() => repeated.push(name),
                Some(slot) => *slot = Some(value.into()),
                None => unknown.push(name),
            }
        }

        if !unknown.is_empty() {
            unknown.sort();
            return Err(SeismoError::InvalidValue {
                field: unknown.join(","),
                reason: format!(
                    "The following parameters are not recognised: {}",
                    quoted(&unknown)
                ),
            });
        }
        if !repeated.is_empty() {
            repeated.sort();
            repeated.dedup();
            return Err(SeismoError::conflict(
                repeated.clone(),
                format!(
                    "The following parameters were given more than once: {}",
                    quoted(&repeated)
                ),
            ));
        }
        Ok(params)
    }

    /// `sourcelatitude=10&sourcelongitude=...` 形式的查詢字串
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.trim_start_matches('?');
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MechanismSpec {
    MomentTensor([f64; 6]),
    DoubleCouple {
        strike: f64,
        dip: f64,
        rake: f64,
        m0: Option<f64>,
    },
    Force([f64; 3]),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Event {
        event_id: String,
    },
    Explicit {
        latitude: f64,
        longitude: f64,
        depth_in_m: f64,
        mechanism: MechanismSpec,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverSpec {
    Coordinates {
        latitude: f64,
        longitude: f64,
        depth_in_m: f64,
        network: String,
        station: String,
        location: String,
    },
    Query {
        networks: Vec<String>,
        stations: Vec<String>,
    },
}

/// Typed, internally consistent request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SeismogramQuery {
    pub components: String,
    pub units: Units,
    pub dt: Option<f64>,
    pub kernelwidth: u32,
    pub label: Option<String>,
    pub scale: f64,
    pub format: OutputFormat,
    pub source: SourceSpec,
    pub origin_time: Option<DateTime<Utc>>,
    pub start: Option<TimeSetting>,
    pub end: Option<TimeSetting>,
    pub receivers: ReceiverSpec,
}

fn parse_float(field: &str, value: &str) -> Result<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        SeismoError::invalid(field, format!("Could not parse '{}' as a float", value))
    })?;
    validate_finite(field, parsed)?;
    Ok(parsed)
}

fn parse_float_list(field: &str, value: &str, counts: &[usize], format: &str) -> Result<Vec<f64>> {
    let values = value
        .split(',')
        .map(|v| parse_float(field, v))
        .collect::<Result<Vec<f64>>>()
        .map_err(|_| SeismoError::invalid(field, format!("Expected format: {}", format)))?;
    if !counts.contains(&values.len()) {
        return Err(SeismoError::invalid(
            field,
            format!("Expected format: {}", format),
        ));
    }
    Ok(values)
}

fn parse_code_list(field: &str, value: &str) -> Result<Vec<String>> {
    let codes: Vec<String> = value
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        return Err(SeismoError::invalid(field, "At least one code is required"));
    }
    Ok(codes)
}

fn parse_components(value: &str) -> Result<String> {
    let components = value.trim().to_ascii_uppercase();
    if components.is_empty() {
        return Err(SeismoError::invalid("components", "At least one component is required"));
    }
    let mut seen = BTreeSet::new();
    for c in components.chars() {
        if !"ZNERT".contains(c) {
            return Err(SeismoError::invalid(
                "components",
                format!("Unknown component '{}'. Valid components: Z, N, E, R, T", c),
            ));
        }
        if !seen.insert(c) {
            return Err(SeismoError::invalid(
                "components",
                format!("Component '{}' given more than once", c),
            ));
        }
    }
    Ok(components)
}

fn parse_label(value: &str) -> Result<String> {
    validate_non_empty_string("label", value)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(SeismoError::invalid(
            "label",
            "Only ASCII letters, digits, '_', '-' and '.' are allowed",
        ));
    }
    Ok(value.to_string())
}

pub struct ParameterValidator;

impl ParameterValidator {
    pub fn validate(raw: &RawSeismogramParams) -> Result<SeismogramQuery> {
        let components = match &raw.components {
            Some(v) => parse_components(v)?,
            None => DEFAULT_COMPONENTS.to_string(),
        };
        let units = match &raw.units {
            Some(v) => Units::parse(v).ok_or_else(|| {
                SeismoError::invalid(
                    "units",
                    "Must be one of 'displacement', 'velocity', 'acceleration'",
                )
            })?,
            None => Units::Displacement,
        };
        let dt = match &raw.dt {
            Some(v) => {
                let dt = parse_float("dt", v)?;
                if dt <= 0.0 {
                    return Err(SeismoError::invalid("dt", "Sampling interval must be positive"));
                }
                Some(dt)
            }
            None => None,
        };
        let kernelwidth = match &raw.kernelwidth {
            Some(v) => {
                let width: u32 = v.trim().parse().map_err(|_| {
                    SeismoError::invalid(
                        "kernelwidth",
                        format!("Could not parse '{}' as an integer", v),
                    )
                })?;
                if width == 0 || width > MAX_KERNEL_WIDTH {
                    return Err(SeismoError::invalid(
                        "kernelwidth",
                        format!("Must be between 1 and {}", MAX_KERNEL_WIDTH),
                    ));
                }
                width
            }
            None => DEFAULT_KERNEL_WIDTH,
        };
        let label = raw.label.as_deref().map(parse_label).transpose()?;
        let scale = match &raw.scale {
            Some(v) => parse_float("scale", v)?,
            None => 1.0,
        };
        let format = match &raw.format {
            Some(v) => OutputFormat::parse(v).ok_or_else(|| {
                SeismoError::invalid("format", "Must be one of 'single-stream', 'archive'")
            })?,
            None => OutputFormat::Archive,
        };
        let origin_time = raw
            .origintime
            .as_deref()
            .map(|v| {
                parse_timestamp(v).ok_or_else(|| {
                    SeismoError::invalid(
                        "origintime",
                        format!("Could not parse '{}' as a datetime", v),
                    )
                })
            })
            .transpose()?;
        let start = raw
            .starttime
            .as_deref()
            .map(|v| parse_time_setting("starttime", v))
            .transpose()?;
        let end = raw
            .endtime
            .as_deref()
            .map(|v| parse_time_setting("endtime", v))
            .transpose()?;

        if scale == 0.0 {
            return Err(SeismoError::invalid(
                "scale",
                "A scale of zero means all seismograms have an amplitude of zero. \
                 No need to get it in the first place.",
            ));
        }

        let receivers = Self::validate_receivers(raw)?;
        let source = Self::validate_source(raw)?;

        Ok(SeismogramQuery {
            components,
            units,
            dt,
            kernelwidth,
            label,
            scale,
            format,
            source,
            origin_time,
            start,
            end,
            receivers,
        })
    }

    fn validate_receivers(raw: &RawSeismogramParams) -> Result<ReceiverSpec> {
        let coordinate_fields: Vec<&str> = [
            ("receiverlatitude", raw.receiverlatitude.is_some()),
            ("receiverlongitude", raw.receiverlongitude.is_some()),
        ]
        .iter()
        .filter(|(_, given)| *given)
        .map(|(name, _)| *name)
        .collect();
        let query_fields: Vec<&str> = [
            ("network", raw.network.is_some()),
            ("station", raw.station.is_some()),
        ]
        .iter()
        .filter(|(_, given)| *given)
        .map(|(name, _)| *name)
        .collect();

        if !coordinate_fields.is_empty() && !query_fields.is_empty() {
            let names: Vec<&str> = coordinate_fields
                .iter()
                .chain(query_fields.iter())
                .copied()
                .collect();
            return Err(SeismoError::conflict(
                names.clone(),
                format!(
                    "Receiver coordinates and a network/station query cannot be combined: {}",
                    names.iter().map(|n| format!("'{}'", n)).collect::<Vec<_>>().join(", ")
                ),
            ));
        }

        if !coordinate_fields.is_empty() {
            let (Some(lat), Some(lon)) = (&raw.receiverlatitude, &raw.receiverlongitude) else {
                let missing = ["receiverlatitude", "receiverlongitude"]
                    .into_iter()
                    .filter(|n| !coordinate_fields.contains(n));
                return Err(SeismoError::missing(missing));
            };
            let depth_in_m = match &raw.receiverdepthinmeters {
                Some(v) => parse_float("receiverdepthinmeters", v)?,
                None => 0.0,
            };
            return Ok(ReceiverSpec::Coordinates {
                latitude: parse_float("receiverlatitude", lat)?,
                longitude: parse_float("receiverlongitude", lon)?,
                depth_in_m,
                network: raw
                    .networkcode
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NETWORK_CODE.to_string()),
                station: raw
                    .stationcode
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STATION_CODE.to_string()),
                location: raw
                    .locationcode
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LOCATION_CODE.to_string()),
            });
        }

        if !query_fields.is_empty() {
            let (Some(network), Some(station)) = (&raw.network, &raw.station) else {
                let missing = ["network", "station"]
                    .into_iter()
                    .filter(|n| !query_fields.contains(n));
                return Err(SeismoError::missing(missing));
            };
            return Ok(ReceiverSpec::Query {
                networks: parse_code_list("network", network)?,
                stations: parse_code_list("station", station)?,
            });
        }

        Err(SeismoError::MissingParameters {
            parameters: vec![
                "network".to_string(),
                "receiverlatitude".to_string(),
                "receiverlongitude".to_string(),
                "station".to_string(),
            ],
            message: "Receivers must be specified either via 'receiverlatitude' and \
                      'receiverlongitude' or via 'network' and 'station'."
                .to_string(),
        })
    }

    fn validate_source(raw: &RawSeismogramParams) -> Result<SourceSpec> {
        let given: Vec<&str> = SOURCE_FIELDS
            .into_iter()
            .filter(|name| raw.is_given(name))
            .collect();

        if let Some(event_id) = &raw.eventid {
            if raw.origintime.is_some() {
                return Err(SeismoError::conflict(
                    ["eventid", "origintime"],
                    "'eventid' and 'origintime' parameters cannot both be passed at the same time.",
                ));
            }
            if !given.is_empty() {
                let mut names: Vec<String> = given.iter().map(|n| n.to_string()).collect();
                names.sort();
                return Err(SeismoError::conflict(
                    names.clone(),
                    format!(
                        "The following parameters cannot be used if 'eventid' is a parameter: {}",
                        quoted(&names)
                    ),
                ));
            }
            validate_non_empty_string("eventid", event_id)?;
            return Ok(SourceSpec::Event {
                event_id: event_id.trim().to_string(),
            });
        }

        if given.is_empty() {
            return Err(SeismoError::MissingParameters {
                parameters: SOURCE_FIELDS.iter().map(|n| n.to_string()).collect(),
                message: "No source specified".to_string(),
            });
        }

        let missing: Vec<&str> = SOURCE_LOCATION_FIELDS
            .into_iter()
            .filter(|name| !given.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(SeismoError::missing(missing));
        }

        let mut mechanisms: Vec<String> = MECHANISM_FIELDS
            .into_iter()
            .filter(|name| raw.is_given(name))
            .map(String::from)
            .collect();
        mechanisms.sort();
        if mechanisms.len() > 1 {
            return Err(SeismoError::conflict(
                mechanisms.clone(),
                format!(
                    "Only one of these parameters can be given simultaneously: {}",
                    quoted(&mechanisms)
                ),
            ));
        }
        if mechanisms.is_empty() {
            let mut options: Vec<String> = MECHANISM_FIELDS.iter().map(|n| n.to_string()).collect();
            options.sort();
            let message = format!("One of the following has to be given: {}", quoted(&options));
            return Err(SeismoError::MissingParameters {
                parameters: options,
                message,
            });
        }

        let mechanism = if let Some(v) = &raw.sourcemomenttensor {
            let m = parse_float_list("sourcemomenttensor", v, &[6], "Mrr,Mtt,Mpp,Mrt,Mrp,Mtp")?;
            MechanismSpec::MomentTensor([m[0], m[1], m[2], m[3], m[4], m[5]])
        } else if let Some(v) = &raw.sourcedoublecouple {
            let m = parse_float_list("sourcedoublecouple", v, &[3, 4], "strike,dip,rake[,M0]")?;
            MechanismSpec::DoubleCouple {
                strike: m[0],
                dip: m[1],
                rake: m[2],
                m0: m.get(3).copied(),
            }
        } else if let Some(v) = &raw.sourceforce {
            let f = parse_float_list("sourceforce", v, &[3], "Fr,Ft,Fp")?;
            MechanismSpec::Force([f[0], f[1], f[2]])
        } else {
            return Err(SeismoError::missing(["sourcemomenttensor"]));
        };

        // 上面已確認三個位置欄位都存在
        let field = |name: &str, value: &Option<String>| match value {
            Some(v) => parse_float(name, v),
            None => Err(SeismoError::missing([name])),
        };
        Ok(SourceSpec::Explicit {
            latitude: field("sourcelatitude", &raw.sourcelatitude)?,
            longitude: field("sourcelongitude", &raw.sourcelongitude)?,
            depth_in_m: field("sourcedepthinmeters", &raw.sourcedepthinmeters)?,
            mechanism,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("sourcelatitude", "10"),
            ("sourcelongitude", "20"),
            ("sourcedepthinmeters", "1000"),
            ("receiverlatitude", "30"),
            ("receiverlongitude", "40"),
        ]
    }

    fn with(extra: &[(&'static str, &'static str)]) -> RawSeismogramParams {
        let mut pairs = base_pairs();
        pairs.extend_from_slice(extra);
        RawSeismogramParams::from_pairs(pairs).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let query = ParameterValidator::validate(&with(&[(
            "sourcemomenttensor",
            "1,2,3,4,5,6",
        )]))
        .unwrap();
        assert_eq!(query.components, "ZNE");
        assert_eq!(query.units, Units::Displacement);
        assert_eq!(query.kernelwidth, 12);
        assert_eq!(query.scale, 1.0);
        assert_eq!(query.format, OutputFormat::Archive);
        assert_eq!(query.dt, None);
        assert_eq!(
            query.receivers,
            ReceiverSpec::Coordinates {
                latitude: 30.0,
                longitude: 40.0,
                depth_in_m: 0.0,
                network: "XX".to_string(),
                station: "SYN".to_string(),
                location: "SE".to_string(),
            }
        );
        assert_eq!(
            query.source,
            SourceSpec::Explicit {
                latitude: 10.0,
                longitude: 20.0,
                depth_in_m: 1000.0,
                mechanism: MechanismSpec::MomentTensor([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            }
        );
    }

    #[test]
    fn test_exactly_one_mechanism_succeeds() {
        for extra in [
            ("sourcemomenttensor", "1,2,3,4,5,6"),
            ("sourcedoublecouple", "10,20,30"),
            ("sourcedoublecouple", "10,20,30,1e20"),
            ("sourceforce", "1e10,0,0"),
        ] {
            assert!(ParameterValidator::validate(&with(&[extra])).is_ok(), "{:?}", extra);
        }
    }

    #[test]
    fn test_zero_mechanisms_is_missing() {
        let err = ParameterValidator::validate(&with(&[])).unwrap_err();
        assert!(matches!(err, SeismoError::MissingParameters { .. }));
        assert_eq!(
            err.to_string(),
            "One of the following has to be given: 'eventid', 'sourcedoublecouple', \
             'sourceforce', 'sourcemomenttensor'"
        );
    }

    #[test]
    fn test_two_or_more_mechanisms_conflict() {
        let combos: [&[(&'static str, &'static str)]; 3] = [
            &[("sourcemomenttensor", "1,2,3,4,5,6"), ("sourceforce", "1,2,3")],
            &[("sourcedoublecouple", "1,2,3"), ("sourceforce", "1,2,3")],
            &[
                ("sourcemomenttensor", "1,2,3,4,5,6"),
                ("sourcedoublecouple", "1,2,3"),
                ("sourceforce", "1,2,3"),
            ],
        ];
        for combo in combos {
            let err = ParameterValidator::validate(&with(combo)).unwrap_err();
            assert!(matches!(err, SeismoError::ConflictingParameters { .. }));
            assert!(err.to_string().starts_with("Only one of these parameters"));
        }
    }

    #[test]
    fn test_event_id_rejects_other_source_fields() {
        let err = ParameterValidator::validate(&with(&[("eventid", "B071791B")])).unwrap_err();
        assert_eq!(
            err.parameters(),
            vec!["sourcedepthinmeters", "sourcelatitude", "sourcelongitude"]
        );
        assert!(err.to_string().contains("cannot be used if 'eventid'"));
    }

    #[test]
    fn test_event_id_with_origin_time_conflicts() {
        let raw = RawSeismogramParams::from_pairs([
            ("eventid", "B071791B"),
            ("origintime", "2010-01-01T00:00:00Z"),
            ("receiverlatitude", "1"),
            ("receiverlongitude", "2"),
        ])
        .unwrap();
        let err = ParameterValidator::validate(&raw).unwrap_err();
        assert_eq!(err.parameters(), vec!["eventid", "origintime"]);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_event_id_alone_is_valid() {
        let raw = RawSeismogramParams::from_pairs([
            ("eventid", "B071791B"),
            ("network", "IU,II"),
            ("station", "ANMO"),
        ])
        .unwrap();
        let query = ParameterValidator::validate(&raw).unwrap();
        assert_eq!(
            query.source,
            SourceSpec::Event {
                event_id: "B071791B".to_string()
            }
        );
        assert_eq!(
            query.receivers,
            ReceiverSpec::Query {
                networks: vec!["IU".to_string(), "II".to_string()],
                stations: vec!["ANMO".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_location_fields_are_named() {
        let raw = RawSeismogramParams::from_pairs([
            ("sourcelatitude", "10"),
            ("sourcemomenttensor", "1,2,3,4,5,6"),
            ("receiverlatitude", "1"),
            ("receiverlongitude", "2"),
        ])
        .unwrap();
        let err = ParameterValidator::validate(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following required parameters are missing: 'sourcedepthinmeters', 'sourcelongitude'"
        );
    }

    #[test]
    fn test_no_source() {
        let raw = RawSeismogramParams::from_pairs([
            ("receiverlatitude", "1"),
            ("receiverlongitude", "2"),
        ])
        .unwrap();
        let err = ParameterValidator::validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "No source specified");
    }

    #[test]
    fn test_zero_scale_rejected() {
        let err = ParameterValidator::validate(&with(&[
            ("sourceforce", "1,2,3"),
            ("scale", "0.0"),
        ]))
        .unwrap_err();
        assert_eq!(err.parameters(), vec!["scale"]);
        let ok =
            ParameterValidator::validate(&with(&[("sourceforce", "1,2,3"), ("scale", "-2.5")]));
        assert_eq!(ok.unwrap().scale, -2.5);
    }

    #[test]
    fn test_receiver_specification_required() {
        let raw = RawSeismogramParams::from_pairs([
            ("sourcelatitude", "10"),
            ("sourcelongitude", "20"),
            ("sourcedepthinmeters", "1000"),
            ("sourceforce", "1,2,3"),
        ])
        .unwrap();
        let err = ParameterValidator::validate(&raw).unwrap_err();
        assert!(matches!(err, SeismoError::MissingParameters { .. }));

        let err =
            ParameterValidator::validate(&with(&[("sourceforce", "1,2,3"), ("network", "IU")]))
                .unwrap_err();
        assert!(matches!(err, SeismoError::ConflictingParameters { .. }));

        let raw = RawSeismogramParams::from_pairs([
            ("eventid", "abc"),
            ("receiverlatitude", "10"),
        ])
        .unwrap();
        let err = ParameterValidator::validate(&raw).unwrap_err();
        assert_eq!(err.parameters(), vec!["receiverlongitude"]);
    }

    #[test]
    fn test_malformed_values_name_the_field() {
        let cases: [(&'static str, &'static str); 8] = [
            ("sourcemomenttensor", "1,2,3"),
            ("sourcedoublecouple", "1,2"),
            ("components", "ZXY"),
            ("components", "ZZ"),
            ("units", "furlongs"),
            ("kernelwidth", "0"),
            ("dt", "-0.1"),
            ("format", "tarball"),
        ];
        for (field, value) in cases {
            let mut extra = vec![(field, value)];
            if !field.starts_with("source") {
                extra.push(("sourceforce", "1,2,3"));
            }
            let err = ParameterValidator::validate(&with(&extra)).unwrap_err();
            assert_eq!(err.parameters(), vec![field.to_string()], "{}={}", field, value);
        }
    }

    #[test]
    fn test_unknown_and_repeated_parameters() {
        let err = RawSeismogramParams::from_pairs([("sourcelat", "1")]).unwrap_err();
        assert!(err.to_string().contains("'sourcelat'"));

        let err = RawSeismogramParams::from_pairs([("scale", "1"), ("scale", "2")]).unwrap_err();
        assert_eq!(err.parameters(), vec!["scale"]);
    }

    #[test]
    fn test_from_query_decodes_values() {
        let raw = RawSeismogramParams::from_query(
            "?sourcelatitude=10&sourcelongitude=20&starttime=P%2B10&label=my_label",
        )
        .unwrap();
        assert_eq!(raw.sourcelatitude.as_deref(), Some("10"));
        assert_eq!(raw.starttime.as_deref(), Some("P+10"));
        assert_eq!(raw.label.as_deref(), Some("my_label"));
    }

    #[test]
    fn test_time_settings_are_typed() {
        let query = ParameterValidator::validate(&with(&[
            ("sourceforce", "1,2,3"),
            ("origintime", "2011-03-11T05:46:23Z"),
            ("starttime", "P-10"),
            ("endtime", "3600"),
        ]))
        .unwrap();
        assert!(query.origin_time.is_some());
        assert_eq!(
            query.start,
            Some(TimeSetting::Phase {
                phase: "P".to_string(),
                offset: -10.0
            })
        );
        assert_eq!(query.end, Some(TimeSetting::Offset(3600.0)));
    }
}
