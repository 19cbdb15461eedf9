use crate::core::rotation::{
    rotate_frame, rotate_moment_tensor_earth_to_source, rotate_moment_tensor_source_to_earth,
    rotate_moment_tensor_to_source_azimuth,
};
use crate::domain::model::{DatabaseInfo, Receiver, Source, SourceReceiverGeometry};
use crate::utils::error::{Result, SeismoError};

/// 小於此距離視為震源與接收站重合
const MIN_EPICENTRAL_DISTANCE_DEG: f64 = 1.0e-6;

fn invalid(message: String) -> SeismoError {
    SeismoError::InvalidGeometry { message }
}

/// Reciprocal databases are centred on the receiver, forward databases on
/// the source; the position and tensor are expressed in that frame.
pub fn source_receiver_geometry(
    source: &Source,
    receiver: &Receiver,
    info: &DatabaseInfo,
) -> SourceReceiverGeometry {
    let (s, phi, z) = if info.is_reciprocal {
        let [x, y, z] = source.cartesian(info.planet_radius_m);
        rotate_frame(x, y, z, receiver.longitude, receiver.colatitude())
    } else {
        let [x, y, z] = receiver.cartesian(info.planet_radius_m);
        rotate_frame(x, y, z, source.longitude, source.colatitude())
    };

    let rotated_tensor = source.mechanism.moment_tensor().map(|m| {
        let voigt = m.tensor_voigt();
        if info.is_reciprocal {
            let earth = rotate_moment_tensor_source_to_earth(
                &voigt,
                source.longitude.to_radians(),
                source.colatitude().to_radians(),
            );
            let at_receiver = rotate_moment_tensor_earth_to_source(
                &earth,
                receiver.longitude.to_radians(),
                receiver.colatitude().to_radians(),
            );
            rotate_moment_tensor_to_source_azimuth(&at_receiver, phi)
        } else {
            rotate_moment_tensor_to_source_azimuth(&voigt, phi)
        }
    });

    SourceReceiverGeometry {
        s,
        phi,
        z,
        epicentral_distance_deg: s.atan2(z).to_degrees(),
        rotated_tensor,
    }
}

pub fn validate_geometry(
    source: &Source,
    receiver: &Receiver,
    info: &DatabaseInfo,
) -> Result<SourceReceiverGeometry> {
    if info.is_reciprocal {
        if receiver.depth_in_m != 0.0 {
            return Err(invalid(format!(
                "Receiver {} must be at the surface for reciprocal databases.",
                receiver.seed_id()
            )));
        }
        let min_depth = info.planet_radius_m - info.max_radius_m;
        let max_depth = info.planet_radius_m - info.min_radius_m;
        if source.depth_in_m < min_depth || source.depth_in_m > max_depth {
            return Err(invalid(format!(
                "Source depth must be within the database range: {:.1} - {:.1} meters.",
                min_depth, max_depth
            )));
        }
    } else if let Some(depth) = info.source_depth_m {
        if (source.depth_in_m - depth).abs() > 1.0e-3 {
            return Err(invalid(format!(
                "Source depth must be: {:.1} km",
                depth / 1000.0
            )));
        }
    }

    let geometry = source_receiver_geometry(source, receiver, info);
    if geometry.epicentral_distance_deg < MIN_EPICENTRAL_DISTANCE_DEG {
        return Err(invalid(format!(
            "Source and receiver {} coincide; the epicentral distance must be non-zero.",
            receiver.seed_id()
        )));
    }
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rotation::tensor_invariants;
    use crate::core::time_window::default_origin_time;
    use crate::domain::model::{ForceVector, Mechanism, MomentTensor};

    fn reciprocal() -> DatabaseInfo {
        DatabaseInfo {
            is_reciprocal: true,
            planet_radius_m: 6_371_000.0,
            min_radius_m: 5_671_000.0,
            max_radius_m: 6_371_000.0,
            source_depth_m: None,
            time_shift_s: 0.0,
            length_s: 3600.0,
        }
    }

    fn forward() -> DatabaseInfo {
        DatabaseInfo {
            is_reciprocal: false,
            source_depth_m: Some(10_000.0),
            ..reciprocal()
        }
    }

    fn mt_source(latitude: f64, longitude: f64, depth_in_m: f64) -> Source {
        let m = MomentTensor::from_components([1.0e19, -2.0e19, 1.0e19, 3.0e18, -4.0e18, 5.0e18])
            .unwrap();
        Source::new(
            latitude,
            longitude,
            depth_in_m,
            default_origin_time(),
            Mechanism::MomentTensor(m),
        )
        .unwrap()
    }

    fn receiver(latitude: f64, longitude: f64, depth_in_m: f64) -> Receiver {
        Receiver::new(latitude, longitude, depth_in_m, "XX", "SYN", "SE").unwrap()
    }

    #[test]
    fn test_epicentral_distance_along_equator() {
        let geometry = validate_geometry(
            &mt_source(0.0, 0.0, 0.0),
            &receiver(0.0, 90.0, 0.0),
            &reciprocal(),
        )
        .unwrap();
        assert!((geometry.epicentral_distance_deg - 90.0).abs() < 1e-9);

        let geometry = validate_geometry(
            &mt_source(0.0, 0.0, 10_000.0),
            &receiver(0.0, 45.0, 0.0),
            &forward(),
        )
        .unwrap();
        assert!((geometry.epicentral_distance_deg - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_tensor_keeps_invariants() {
        let source = mt_source(12.0, -40.0, 5_000.0);
        let geometry =
            validate_geometry(&source, &receiver(-30.0, 100.0, 0.0), &reciprocal()).unwrap();
        let original = source.mechanism.moment_tensor().unwrap().tensor_voigt();
        let rotated = geometry.rotated_tensor.unwrap();
        let (t1, s1, d1) = tensor_invariants(&original);
        let (t2, s2, d2) = tensor_invariants(&rotated);
        assert!((t1 - t2).abs() <= 1e-9 * t1.abs().max(1.0e19));
        assert!((s1 - s2).abs() <= 1e-9 * s1.abs());
        assert!((d1 - d2).abs() <= 1e-9 * d1.abs());
    }

    #[test]
    fn test_force_source_has_no_tensor() {
        let source = Source::new(
            0.0,
            0.0,
            0.0,
            default_origin_time(),
            Mechanism::Force(ForceVector {
                f_r: 1.0,
                f_t: 0.0,
                f_p: 0.0,
            }),
        )
        .unwrap();
        let geometry =
            validate_geometry(&source, &receiver(10.0, 10.0, 0.0), &reciprocal()).unwrap();
        assert!(geometry.rotated_tensor.is_none());
    }

    #[test]
    fn test_invalid_geometries() {
        let info = reciprocal();
        let err = validate_geometry(&mt_source(0.0, 0.0, 0.0), &receiver(0.0, 0.0, 0.0), &info)
            .unwrap_err();
        assert!(matches!(err, SeismoError::InvalidGeometry { .. }));

        let err = validate_geometry(&mt_source(0.0, 0.0, 0.0), &receiver(10.0, 0.0, 100.0), &info)
            .unwrap_err();
        assert!(err.to_string().contains("surface"));

        let err = validate_geometry(
            &mt_source(0.0, 0.0, 800_000.0),
            &receiver(10.0, 0.0, 0.0),
            &info,
        )
        .unwrap_err();
        assert!(err.to_string().contains("0.0 - 700000.0 meters"));

        let err = validate_geometry(
            &mt_source(0.0, 0.0, 0.0),
            &receiver(10.0, 0.0, 0.0),
            &forward(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("10.0 km"));
        assert_eq!(err.status_code(), 400);
    }
}
