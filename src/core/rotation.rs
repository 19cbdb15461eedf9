//! Reference-frame rotations between the geographic (earth) frame and a
//! frame aligned with the source.
//!
//! The rotation is the composition of a longitude rotation `phi` about the
//! polar axis followed by a colatitude rotation `theta`. Symmetric tensors
//! use Voigt order `(xx, yy, zz, yz, xz, xy)`.

use std::f64::consts::PI;

type Matrix3 = [[f64; 3]; 3];

/// Ry(theta) * Rz(phi), angles in radians.
fn frame_matrix(phi: f64, theta: f64) -> Matrix3 {
    let (sp, cp) = phi.sin_cos();
    let (st, ct) = theta.sin_cos();
    [
        [ct * cp, ct * sp, -st],
        [-sp, cp, 0.0],
        [st * cp, st * sp, ct],
    ]
}

fn azimuth_matrix(phi: f64) -> Matrix3 {
    frame_matrix(phi, 0.0)
}

fn transpose(m: &Matrix3) -> Matrix3 {
    let mut t = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            t[j][i] = *value;
        }
    }
    t
}

fn apply(m: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn voigt_to_matrix(v: &[f64; 6]) -> Matrix3 {
    [[v[0], v[5], v[4]], [v[5], v[1], v[3]], [v[4], v[3], v[2]]]
}

fn matrix_to_voigt(m: &Matrix3) -> [f64; 6] {
    [m[0][0], m[1][1], m[2][2], m[1][2], m[0][2], m[0][1]]
}

/// R * T * R^T
fn conjugate(r: &Matrix3, tensor: &[f64; 6]) -> [f64; 6] {
    let t = voigt_to_matrix(tensor);
    let mut rt = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            rt[i][j] = (0..3).map(|k| r[i][k] * t[k][j]).sum();
        }
    }
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = (0..3).map(|k| rt[i][k] * r[j][k]).sum();
        }
    }
    matrix_to_voigt(&out)
}

/// Rotates a Cartesian point into the frame defined by `phi_deg`
/// (longitude) and `theta_deg` (colatitude).
pub fn rotate_frame_cartesian(x: f64, y: f64, z: f64, phi_deg: f64, theta_deg: f64) -> [f64; 3] {
    let r = frame_matrix(phi_deg.to_radians(), theta_deg.to_radians());
    apply(&r, [x, y, z])
}

/// Inverse of [`rotate_frame_cartesian`].
pub fn unrotate_frame_cartesian(x: f64, y: f64, z: f64, phi_deg: f64, theta_deg: f64) -> [f64; 3] {
    let r = frame_matrix(phi_deg.to_radians(), theta_deg.to_radians());
    apply(&transpose(&r), [x, y, z])
}

/// Rotated point in cylindrical form `(s, phi, z)` with `phi` in `[0, 2pi)`.
pub fn rotate_frame(x: f64, y: f64, z: f64, phi_deg: f64, theta_deg: f64) -> (f64, f64, f64) {
    let [xp, yp, zp] = rotate_frame_cartesian(x, y, z, phi_deg, theta_deg);
    let s = (xp * xp + yp * yp).sqrt();
    let mut phi = yp.atan2(xp);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    (s, phi, zp)
}

/// Earth frame to source frame, angles in radians.
pub fn rotate_moment_tensor_earth_to_source(mt: &[f64; 6], phi: f64, theta: f64) -> [f64; 6] {
    conjugate(&frame_matrix(phi, theta), mt)
}

/// Source frame to earth frame, angles in radians.
pub fn rotate_moment_tensor_source_to_earth(mt: &[f64; 6], phi: f64, theta: f64) -> [f64; 6] {
    conjugate(&transpose(&frame_matrix(phi, theta)), mt)
}

/// 只修正方位角，角度單位為弧度
pub fn rotate_moment_tensor_to_source_azimuth(mt: &[f64; 6], phi: f64) -> [f64; 6] {
    conjugate(&azimuth_matrix(phi), mt)
}

/// Trace, second invariant and determinant; together they fix the
/// eigenvalue spectrum of a symmetric tensor.
pub fn tensor_invariants(mt: &[f64; 6]) -> (f64, f64, f64) {
    let m = voigt_to_matrix(mt);
    let trace = m[0][0] + m[1][1] + m[2][2];
    let second = m[0][0] * m[1][1] + m[1][1] * m[2][2] + m[0][0] * m[2][2]
        - m[0][1] * m[0][1]
        - m[1][2] * m[1][2]
        - m[0][2] * m[0][2];
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    (trace, second, det)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
    }

    const TENSORS: [[f64; 6]; 3] = [
        [1.0, -2.0, 0.5, 0.3, -0.7, 1.1],
        [3.2e19, -1.1e19, -2.1e19, 4.0e18, -6.5e18, 9.9e18],
        [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    ];

    const ANGLES: [(f64, f64); 4] = [(0.0, 0.0), (1.3, 0.4), (-2.7, 2.9), (5.9, 1.5707963)];

    #[test]
    fn test_rotate_frame_literal() {
        let (s, phi, z) = rotate_frame(
            9988.68973438214700,
            0.0,
            6358992.1548998145,
            74.494,
            47.3609999,
        );
        assert!((s - 4676105.76848060).abs() < 1e-2);
        assert!((phi - 3.14365101866993).abs() < 1e-5);
        assert!((z - 4309398.5475913).abs() < 1e-2);
    }

    #[test]
    fn test_rotate_frame_round_trip() {
        let points = [
            (1.0, 2.0, 3.0),
            (-6.3e6, 1.2e5, 4.0e4),
            (0.0, 0.0, 6.371e6),
            (1e-3, -5.0, 2.5),
        ];
        for (x, y, z) in points {
            for (phi, theta) in [(0.0, 0.0), (74.494, 47.36), (-120.0, 170.0), (359.0, 90.0)] {
                let [xp, yp, zp] = rotate_frame_cartesian(x, y, z, phi, theta);
                let [xb, yb, zb] = unrotate_frame_cartesian(xp, yp, zp, phi, theta);
                let scale = (x * x + y * y + z * z).sqrt();
                assert!((xb - x).abs() <= 1e-6 * scale);
                assert!((yb - y).abs() <= 1e-6 * scale);
                assert!((zb - z).abs() <= 1e-6 * scale);
            }
        }
    }

    #[test]
    fn test_rotate_frame_azimuth_is_normalised() {
        let (_, phi, _) = rotate_frame(0.0, -1.0, 0.0, 0.0, 0.0);
        assert!((phi - 1.5 * PI).abs() < 1e-12);
        let (s, phi, z) = rotate_frame(1.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!((s, phi, z), (1.0, 0.0, 0.0));
    }

    #[test]
    fn test_tensor_round_trip_is_identity() {
        for mt in TENSORS {
            for (phi, theta) in ANGLES {
                let src = rotate_moment_tensor_earth_to_source(&mt, phi, theta);
                let back = rotate_moment_tensor_source_to_earth(&src, phi, theta);
                let norm = mt.iter().map(|v| v.abs()).fold(0.0, f64::max);
                for (a, b) in back.iter().zip(mt.iter()) {
                    assert!((a - b).abs() <= 1e-10 * norm.max(1.0));
                }
            }
        }
    }

    #[test]
    fn test_tensor_rotation_preserves_invariants() {
        for mt in TENSORS {
            let (trace, second, det) = tensor_invariants(&mt);
            for (phi, theta) in ANGLES {
                let rotated = rotate_moment_tensor_earth_to_source(&mt, phi, theta);
                let (t2, s2, d2) = tensor_invariants(&rotated);
                assert!(close(trace, t2, 1e-9));
                assert!(close(second, s2, 1e-9));
                assert!(close(det, d2, 1e-9));

                let azimuthal = rotate_moment_tensor_to_source_azimuth(&mt, phi);
                let (t3, s3, d3) = tensor_invariants(&azimuthal);
                assert!(close(trace, t3, 1e-9));
                assert!(close(second, s3, 1e-9));
                assert!(close(det, d3, 1e-9));
            }
        }
    }

    #[test]
    fn test_azimuth_rotation_matches_zero_colatitude() {
        let mt = TENSORS[0];
        let a = rotate_moment_tensor_to_source_azimuth(&mt, 0.83);
        let b = rotate_moment_tensor_earth_to_source(&mt, 0.83, 0.0);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_radial_tensor_at_source_location() {
        // 源點在 (經度 30, 餘緯 60)，地球座標下的徑向單位張量轉到源座標後應只剩 zz
        let (phi, theta) = (30f64.to_radians(), 60f64.to_radians());
        let n = [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()];
        let earth = [
            n[0] * n[0],
            n[1] * n[1],
            n[2] * n[2],
            n[1] * n[2],
            n[0] * n[2],
            n[0] * n[1],
        ];
        let src = rotate_moment_tensor_earth_to_source(&earth, phi, theta);
        assert!((src[2] - 1.0).abs() < 1e-12);
        for i in [0, 1, 3, 4, 5] {
            assert!(src[i].abs() < 1e-12);
        }
    }
}
