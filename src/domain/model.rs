use crate::utils::error::{Result, SeismoError};
use crate::utils::validation::{validate_finite, validate_range};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 雙力偶未給定純量地震矩時的預設值 (N m)
pub const DEFAULT_SCALAR_MOMENT: f64 = 1.0e19;

/// Moment tensor in spherical (r, theta, phi) components, N m.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentTensor {
    pub m_rr: f64,
    pub m_tt: f64,
    pub m_pp: f64,
    pub m_rt: f64,
    pub m_rp: f64,
    pub m_tp: f64,
}

impl MomentTensor {
    /// Components in request order: Mrr, Mtt, Mpp, Mrt, Mrp, Mtp.
    pub fn from_components(m: [f64; 6]) -> Result<Self> {
        let names = ["Mrr", "Mtt", "Mpp", "Mrt", "Mrp", "Mtp"];
        for (name, value) in names.iter().zip(m.iter()) {
            validate_finite(name, *value)?;
        }
        Ok(Self {
            m_rr: m[0],
            m_tt: m[1],
            m_pp: m[2],
            m_rt: m[3],
            m_rp: m[4],
            m_tp: m[5],
        })
    }

    /// Aki & Richards convention, angles in degrees.
    pub fn from_strike_dip_rake(strike: f64, dip: f64, rake: f64, m0: f64) -> Result<Self> {
        validate_finite("strike", strike)?;
        validate_finite("dip", dip)?;
        validate_finite("rake", rake)?;
        validate_finite("M0", m0)?;
        if m0 < 0.0 {
            return Err(SeismoError::invalid(
                "sourcedoublecouple",
                "Seismic moment must not be negative.",
            ));
        }

        let (ss, cs) = strike.to_radians().sin_cos();
        let (ss2, cs2) = (2.0 * strike.to_radians()).sin_cos();
        let (sd, cd) = dip.to_radians().sin_cos();
        let (sd2, cd2) = (2.0 * dip.to_radians()).sin_cos();
        let (sr, cr) = rake.to_radians().sin_cos();

        Ok(Self {
            m_rr: m0 * sd2 * sr,
            m_tt: -m0 * (sd * cr * ss2 + sd2 * sr * ss * ss),
            m_pp: m0 * (sd * cr * ss2 - sd2 * sr * cs * cs),
            m_rt: -m0 * (cd * cr * cs + cd2 * sr * ss),
            m_rp: m0 * (cd * cr * ss - cd2 * sr * cs),
            m_tp: -m0 * (sd * cr * cs2 + 0.5 * sd2 * sr * ss2),
        })
    }

    /// Voigt form (xx, yy, zz, yz, xz, xy) in the local source frame where
    /// x points south (theta), y east (phi) and z up (r).
    pub fn tensor_voigt(&self) -> [f64; 6] {
        [self.m_tt, self.m_pp, self.m_rr, self.m_rp, self.m_rt, self.m_tp]
    }

    pub fn trace(&self) -> f64 {
        self.m_rr + self.m_tt + self.m_pp
    }

    /// M0 = sqrt(sum(M_ij^2) / 2)
    pub fn scalar_moment(&self) -> f64 {
        let diagonal = self.m_rr.powi(2) + self.m_tt.powi(2) + self.m_pp.powi(2);
        let off = self.m_rt.powi(2) + self.m_rp.powi(2) + self.m_tp.powi(2);
        ((diagonal + 2.0 * off) / 2.0).sqrt()
    }

    pub fn moment_magnitude(&self) -> f64 {
        2.0 / 3.0 * (self.scalar_moment().log10() - 9.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceVector {
    pub f_r: f64,
    pub f_t: f64,
    pub f_p: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mechanism {
    MomentTensor(MomentTensor),
    DoubleCouple {
        strike: f64,
        dip: f64,
        rake: f64,
        m0: f64,
        tensor: MomentTensor,
    },
    Force(ForceVector),
}

impl Mechanism {
    pub fn double_couple(strike: f64, dip: f64, rake: f64, m0: f64) -> Result<Self> {
        let tensor = MomentTensor::from_strike_dip_rake(strike, dip, rake, m0)?;
        Ok(Mechanism::DoubleCouple {
            strike,
            dip,
            rake,
            m0,
            tensor,
        })
    }

    /// 力源沒有對應的矩張量
    pub fn moment_tensor(&self) -> Option<&MomentTensor> {
        match self {
            Mechanism::MomentTensor(m) => Some(m),
            Mechanism::DoubleCouple { tensor, .. } => Some(tensor),
            Mechanism::Force(_) => None,
        }
    }
}

fn cartesian(latitude: f64, longitude: f64, radius: f64) -> [f64; 3] {
    let colatitude = (90.0 - latitude).to_radians();
    let longitude = longitude.to_radians();
    [
        radius * colatitude.sin() * longitude.cos(),
        radius * colatitude.sin() * longitude.sin(),
        radius * colatitude.cos(),
    ]
}

fn check_location(prefix: &str, latitude: f64, longitude: f64, depth_in_m: f64) -> Result<()> {
    validate_range(&format!("{}latitude", prefix), latitude, -90.0, 90.0)?;
    validate_range(&format!("{}longitude", prefix), longitude, -180.0, 180.0)?;
    validate_finite(&format!("{}depthinmeters", prefix), depth_in_m)?;
    if depth_in_m < 0.0 {
        return Err(SeismoError::invalid(
            &format!("{}depthinmeters", prefix),
            "Depth must not be negative",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_in_m: f64,
    pub origin_time: DateTime<Utc>,
    pub mechanism: Mechanism,
}

impl Source {
    pub fn new(
        latitude: f64,
        longitude: f64,
        depth_in_m: f64,
        origin_time: DateTime<Utc>,
        mechanism: Mechanism,
    ) -> Result<Self> {
        check_location("source", latitude, longitude, depth_in_m)?;
        Ok(Self {
            latitude,
            longitude,
            depth_in_m,
            origin_time,
            mechanism,
        })
    }

    pub fn colatitude(&self) -> f64 {
        90.0 - self.latitude
    }

    pub fn cartesian(&self, planet_radius_m: f64) -> [f64; 3] {
        cartesian(self.latitude, self.longitude, planet_radius_m - self.depth_in_m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_in_m: f64,
    pub network: String,
    pub station: String,
    pub location: String,
}

impl Receiver {
    pub fn new(
        latitude: f64,
        longitude: f64,
        depth_in_m: f64,
        network: &str,
        station: &str,
        location: &str,
    ) -> Result<Self> {
        check_location("receiver", latitude, longitude, depth_in_m)?;
        if network.len() > 2 {
            return Err(SeismoError::invalid(
                "networkcode",
                "Network code must have at most 2 characters",
            ));
        }
        if station.len() > 5 {
            return Err(SeismoError::invalid(
                "stationcode",
                "Station code must have at most 5 characters",
            ));
        }
        if location.len() > 2 {
            return Err(SeismoError::invalid(
                "locationcode",
                "Location code must have at most 2 characters",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
            depth_in_m,
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
        })
    }

    pub fn colatitude(&self) -> f64 {
        90.0 - self.latitude
    }

    pub fn cartesian(&self, planet_radius_m: f64) -> [f64; 3] {
        cartesian(self.latitude, self.longitude, planet_radius_m - self.depth_in_m)
    }

    pub fn seed_id(&self) -> String {
        format!("{}.{}.{}", self.network, self.station, self.location)
    }

    /// 壓縮檔內的檔名，例如 `label_XX.SYN.SE.LXZ.sac`
    pub fn archive_entry_name(&self, label: &str, channel: &str) -> String {
        format!("{}_{}.{}.sac", label, self.seed_id(), channel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Displacement,
    Velocity,
    Acceleration,
}

impl Units {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "displacement" | "d" => Some(Units::Displacement),
            "velocity" | "v" => Some(Units::Velocity),
            "acceleration" | "a" => Some(Units::Acceleration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Displacement => "displacement",
            Units::Velocity => "velocity",
            Units::Acceleration => "acceleration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    SingleStream,
    Archive,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "single-stream" | "miniseed" => Some(OutputFormat::SingleStream),
            "archive" | "saczip" => Some(OutputFormat::Archive),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::SingleStream => "application/vnd.fdsn.mseed",
            OutputFormat::Archive => "application/zip",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::SingleStream => "mseed",
            OutputFormat::Archive => "zip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// 波場資料庫自行回報的基本資訊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub is_reciprocal: bool,
    pub planet_radius_m: f64,
    pub min_radius_m: f64,
    pub max_radius_m: f64,
    /// Fixed source depth of a forward database.
    pub source_depth_m: Option<f64>,
    /// Seconds of data before the origin time.
    pub time_shift_s: f64,
    /// Total length of every trace in seconds.
    pub length_s: f64,
}

/// Receiver position expressed in the frame centred on the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceReceiverGeometry {
    pub s: f64,
    pub phi: f64,
    pub z: f64,
    pub epicentral_distance_deg: f64,
    /// Voigt tensor rotated to the receiver azimuth; absent for force sources.
    pub rotated_tensor: Option<[f64; 6]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Stream(Vec<u8>),
    Entries(Vec<ArchiveEntry>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub payload: Payload,
    pub mu: f64,
}

/// 單一接收站的萃取工作
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub source: Source,
    pub receiver: Receiver,
    pub geometry: SourceReceiverGeometry,
    pub components: String,
    pub units: Units,
    pub dt: Option<f64>,
    pub kernelwidth: u32,
    pub window: TimeWindow,
    pub scale: f64,
    pub format: OutputFormat,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub network: String,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Exact record shape an event lookup must return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventRecord {
    pub m_rr: f64,
    pub m_tt: f64,
    pub m_pp: f64,
    pub m_rt: f64,
    pub m_rp: f64,
    pub m_tp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_in_m: f64,
    pub origin_time: DateTime<Utc>,
}
