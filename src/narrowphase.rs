use glam::Vec3;

use crate::api::NarrowphaseApi;
use crate::error::PhysError;
use crate::types::*;

/// Sphere-vs-surface contact tests.
pub struct Narrowphase;

/// Divide `v` by `len`, refusing near-zero denominators.
pub fn safe_norm_div(v: Vec3, len: f32) -> Result<Vec3, PhysError> {
    if len < NORM_TOLERANCE || !len.is_finite() {
        return Err(PhysError::DegenerateGeometry);
    }
    Ok(v / len)
}

fn closest_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let l2 = ab.length_squared();
    if l2 < NORM_TOLERANCE {
        return a;
    }
    let t = ((p - a).dot(ab) / l2).clamp(0.0, 1.0);
    a + ab * t
}

fn inside_convex(p: Vec3, verts: &[Vec3], n: Vec3) -> bool {
    let count = verts.len();
    (0..count).all(|i| {
        let a = verts[i];
        let b = verts[(i + 1) % count];
        (b - a).cross(p - a).dot(n) >= -NORM_TOLERANCE
    })
}

impl NarrowphaseApi for Narrowphase {
    fn sphere_plane(c: Vec3, r: f32, normal: Vec3, offset: f32) -> Option<Contact> {
        let n = safe_norm_div(normal, normal.length()).ok()?;
        let dist = n.dot(c) - offset;
        if dist >= r {
            return None;
        }
        Some(Contact {
            normal: n,
            point: c - n * dist,
            depth: r - dist,
        })
    }

    fn sphere_polygon(c: Vec3, r: f32, verts: &[Vec3], thickness: f32, prev: Vec3) -> Option<Contact> {
        if verts.len() < 3 {
            return None;
        }
        let v0 = verts[0];
        let raw_n = (verts[1] - v0).cross(verts[2] - v0);
        let n = safe_norm_div(raw_n, raw_n.length()).ok()?;
        let half = thickness.max(0.0) * 0.5;
        let d = n.dot(c - v0);
        if d.abs() >= r + half {
            return None;
        }

        let proj = c - n * d;
        if inside_convex(proj, verts, n) {
            // Side comes from where the sphere was, so a fast sphere that already
            // crossed the mid-plane is still pushed back the way it came.
            let dp = n.dot(prev - v0);
            let side = if dp.abs() > NORM_TOLERANCE {
                dp.signum()
            } else if d.abs() > NORM_TOLERANCE {
                d.signum()
            } else {
                1.0
            };
            let normal = n * side;
            let depth = r + half - side * d;
            if depth <= 0.0 {
                return None;
            }
            return Some(Contact {
                normal,
                point: proj + normal * half,
                depth,
            });
        }

        let count = verts.len();
        let mut best: Option<(Vec3, f32)> = None;
        for i in 0..count {
            let q = closest_on_segment(c, verts[i], verts[(i + 1) % count]);
            let d2 = (c - q).length_squared();
            match best {
                Some((_, bd2)) if d2 >= bd2 => {}
                _ => best = Some((q, d2)),
            }
        }
        let (q, d2) = best?;
        let dist = d2.sqrt();
        if dist >= r {
            return None;
        }
        let normal = safe_norm_div(c - q, dist).ok()?;
        Some(Contact {
            normal,
            point: q,
            depth: r - dist,
        })
    }

    fn sphere_cylinder(c: Vec3, r: f32, p0: Vec3, p1: Vec3, cyl_r: f32) -> Option<Contact> {
        let axis = p1 - p0;
        let h = axis.length();
        let a = safe_norm_div(axis, h).ok()?;
        let rel = c - p0;
        let t = rel.dot(a);
        let radial = rel - a * t;
        let rad = radial.length();

        if (0.0..=h).contains(&t) {
            if rad >= cyl_r {
                let dist = rad - cyl_r;
                if dist >= r {
                    return None;
                }
                let normal = safe_norm_div(radial, rad).ok()?;
                return Some(Contact {
                    normal,
                    point: p0 + a * t + normal * cyl_r,
                    depth: r - dist,
                });
            }
            // Center is inside the solid: leave through the nearest face.
            let side_exit = cyl_r - rad;
            let (cap_exit, cap_n) = if t < h - t { (t, -a) } else { (h - t, a) };
            if side_exit <= cap_exit {
                let normal = safe_norm_div(radial, rad).ok()?;
                return Some(Contact {
                    normal,
                    point: p0 + a * t + normal * cyl_r,
                    depth: r + side_exit,
                });
            }
            return Some(Contact {
                normal: cap_n,
                point: c + cap_n * cap_exit,
                depth: r + cap_exit,
            });
        }

        let (cap_n, cap_dist, cap_center) = if t < 0.0 { (-a, -t, p0) } else { (a, t - h, p1) };
        if rad <= cyl_r {
            if cap_dist >= r {
                return None;
            }
            return Some(Contact {
                normal: cap_n,
                point: c - cap_n * cap_dist,
                depth: r - cap_dist,
            });
        }
        let rim = cap_center + safe_norm_div(radial, rad).ok()? * cyl_r;
        let diff = c - rim;
        let dist = diff.length();
        if dist >= r {
            return None;
        }
        let normal = safe_norm_div(diff, dist).ok()?;
        Some(Contact {
            normal,
            point: rim,
            depth: r - dist,
        })
    }

    fn sphere_sphere(c: Vec3, r: f32, center: Vec3, sr: f32) -> Option<Contact> {
        let diff = c - center;
        let dist = diff.length();
        if dist >= r + sr {
            return None;
        }
        let normal = safe_norm_div(diff, dist).ok()?;
        Some(Contact {
            normal,
            point: center + normal * sr,
            depth: r + sr - dist,
        })
    }

    fn sphere_cube(c: Vec3, r: f32, min: Vec3, max: Vec3) -> Option<Contact> {
        let q = c.clamp(min, max);
        let diff = c - q;
        let d2 = diff.length_squared();
        if d2 > 0.0 {
            let dist = d2.sqrt();
            if dist >= r {
                return None;
            }
            let normal = safe_norm_div(diff, dist).ok()?;
            return Some(Contact {
                normal,
                point: q,
                depth: r - dist,
            });
        }

        // Inside: push out through the face of least penetration.
        let to_min = c - min;
        let to_max = max - c;
        let mut best = (to_min.x, -Vec3::X);
        for (d, n) in [
            (to_max.x, Vec3::X),
            (to_min.y, -Vec3::Y),
            (to_max.y, Vec3::Y),
            (to_min.z, -Vec3::Z),
            (to_max.z, Vec3::Z),
        ] {
            if d < best.0 {
                best = (d, n);
            }
        }
        let (d, normal) = best;
        Some(Contact {
            normal,
            point: c + normal * d,
            depth: r + d,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_safe_norm_div_rejects_tiny() {
        assert!(matches!(
            safe_norm_div(Vec3::X, 0.0),
            Err(PhysError::DegenerateGeometry)
        ));
        let v = safe_norm_div(Vec3::new(0.0, 3.0, 4.0), 5.0).unwrap();
        assert_abs_diff_eq!(v.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sphere_plane_contact() {
        let c = Narrowphase::sphere_plane(Vec3::new(1.0, 2.0, 0.3), 0.5, Vec3::Z, 0.0).unwrap();
        assert_abs_diff_eq!(c.depth, 0.2, epsilon = 1e-6);
        assert_eq!(c.normal, Vec3::Z);
        assert_abs_diff_eq!(c.point.z, 0.0, epsilon = 1e-6);
        assert!(Narrowphase::sphere_plane(Vec3::new(0.0, 0.0, 0.6), 0.5, Vec3::Z, 0.0).is_none());
    }

    #[test]
    fn test_sphere_plane_unnormalized_normal() {
        let c = Narrowphase::sphere_plane(Vec3::new(0.0, 0.0, 0.25), 0.5, Vec3::new(0.0, 0.0, 4.0), 0.0)
            .unwrap();
        assert_abs_diff_eq!(c.normal.z, 1.0, epsilon = 1e-6);
        assert!(Narrowphase::sphere_plane(Vec3::ZERO, 0.5, Vec3::ZERO, 0.0).is_none());
    }

    fn wall() -> [Vec3; 4] {
        // Vertical wall in the x = 0 plane, normal +X.
        [
            Vec3::new(0.0, -5.0, 0.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, 5.0, 5.0),
            Vec3::new(0.0, -5.0, 5.0),
        ]
    }

    #[test]
    fn test_polygon_side_follows_previous_position() {
        let verts = wall();
        // Center just past the mid-plane, but the sphere came from -X.
        let c = Narrowphase::sphere_polygon(Vec3::new(0.05, 0.0, 2.0), 0.5, &verts, 0.4, Vec3::new(-1.0, 0.0, 2.0))
            .unwrap();
        assert_abs_diff_eq!(c.normal.x, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c.depth, 0.5 + 0.2 + 0.05, epsilon = 1e-5);
        assert_abs_diff_eq!(c.point.x, -0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_polygon_edge_contact() {
        let verts = wall();
        let c = Narrowphase::sphere_polygon(Vec3::new(0.3, 0.0, 5.3), 0.5, &verts, 0.0, Vec3::new(0.3, 0.0, 6.0))
            .unwrap();
        assert!(c.normal.x > 0.0 && c.normal.z > 0.0);
        assert_abs_diff_eq!(c.point.z, 5.0, epsilon = 1e-6);
        assert!(Narrowphase::sphere_polygon(Vec3::new(0.0, 0.0, 6.0), 0.5, &verts, 0.0, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_cylinder_side_and_cap() {
        let p0 = Vec3::ZERO;
        let p1 = Vec3::new(0.0, 0.0, 4.0);
        let side = Narrowphase::sphere_cylinder(Vec3::new(1.3, 0.0, 2.0), 0.5, p0, p1, 1.0).unwrap();
        assert_abs_diff_eq!(side.normal.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(side.depth, 0.2, epsilon = 1e-5);

        let cap = Narrowphase::sphere_cylinder(Vec3::new(0.2, 0.0, 4.4), 0.5, p0, p1, 1.0).unwrap();
        assert_abs_diff_eq!(cap.normal.z, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cap.depth, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_cylinder_center_on_axis_is_skipped() {
        let p0 = Vec3::ZERO;
        let p1 = Vec3::new(0.0, 0.0, 10.0);
        assert!(Narrowphase::sphere_cylinder(Vec3::new(0.0, 0.0, 5.0), 0.5, p0, p1, 1.0).is_none());
        // Zero-length axis.
        assert!(Narrowphase::sphere_cylinder(Vec3::ZERO, 0.5, p0, p0, 1.0).is_none());
    }

    #[test]
    fn test_sphere_sphere_and_concentric() {
        let c = Narrowphase::sphere_sphere(Vec3::new(1.5, 0.0, 0.0), 0.5, Vec3::ZERO, 1.25).unwrap();
        assert_abs_diff_eq!(c.depth, 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(c.point.x, 1.25, epsilon = 1e-6);
        assert!(Narrowphase::sphere_sphere(Vec3::ZERO, 0.5, Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn test_sphere_cube_outside_and_inside() {
        let min = Vec3::splat(-1.0);
        let max = Vec3::splat(1.0);
        let out = Narrowphase::sphere_cube(Vec3::new(0.0, 0.0, 1.4), 0.5, min, max).unwrap();
        assert_eq!(out.normal, Vec3::Z);
        assert_abs_diff_eq!(out.depth, 0.1, epsilon = 1e-5);

        let inside = Narrowphase::sphere_cube(Vec3::new(0.8, 0.0, 0.0), 0.5, min, max).unwrap();
        assert_eq!(inside.normal, Vec3::X);
        assert_abs_diff_eq!(inside.depth, 0.7, epsilon = 1e-5);
    }

    #[test]
    fn test_shape_dispatch() {
        let shape = SurfaceShape::Sphere { center: Vec3::ZERO, radius: 1.0 };
        let c = Narrowphase::sphere_shape(Vec3::new(0.0, 1.2, 0.0), 0.5, &shape, Vec3::ZERO).unwrap();
        assert_abs_diff_eq!(c.normal.y, 1.0, epsilon = 1e-6);
    }
}
