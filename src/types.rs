use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Cloud particles stop growing at this radius and are retired.
pub const MAX_PART_CLOUD_RAD: f32 = 0.25;

/// Speed below which an object supported by a floor is considered still.
pub const REST_EPSILON: f32 = 0.05;

/// Normal component (after bounce) below which it is zeroed.
pub const BOUNCE_VEL_FLOOR: f32 = 0.02;

/// Minimum z of a contact normal for the surface to count as a floor.
pub const FLOOR_NORMAL_Z: f32 = 0.7;

/// Denominators below this are treated as degenerate in contact math.
pub const NORM_TOLERANCE: f32 = 1e-6;

/// Slot status. Only the store moves a slot out of `Dead`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotStatus {
    #[default]
    Dead = 0,
    Alive = 1,
    /// Disabled but not yet recycled.
    Reserved = 2,
}

/// Motion state of a dynamic object.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MotionState {
    #[default]
    Inactive,
    Flying,
    Sliding,
    Resting,
    Destroyed,
}

/// Which record variant a group stores.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjKind {
    Dynamic,
    Spark,
    Bubble,
    Fire,
    Cloud,
    Decal,
}

/// Weak reference to a surface owned by the geometry collaborator.
/// Must be revalidated with `GeometryQuery::is_live` before each use.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceHandle {
    pub id: u32,
    pub generation: u32,
}

/// Identity of one pooled object: group index + slot index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub group: u16,
    pub index: u32,
}

/// Bounding sphere swept from `start` to `end`.
#[derive(Copy, Clone, Debug)]
pub struct SweptSphere {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

impl SweptSphere {
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let r = Vec3::splat(self.radius);
        (self.start.min(self.end) - r, self.start.max(self.end) + r)
    }
}

/// Exact shape of a collaborator surface, in world space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SurfaceShape {
    /// Solid half-space below `normal . p = offset`.
    Plane { normal: Vec3, offset: f32 },
    /// Convex polygon (3 or 4 vertices, `count` used) extruded by `thickness`
    /// centered on its plane.
    Polygon {
        verts: [Vec3; 4],
        count: u8,
        thickness: f32,
    },
    /// Capped cylinder from `p0` to `p1`.
    Cylinder { p0: Vec3, p1: Vec3, radius: f32 },
    Sphere { center: Vec3, radius: f32 },
    Cube { min: Vec3, max: Vec3 },
}

impl SurfaceShape {
    pub fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3, thickness: f32) -> Self {
        SurfaceShape::Polygon { verts: [a, b, c, d], count: 4, thickness }
    }

    pub fn triangle(a: Vec3, b: Vec3, c: Vec3, thickness: f32) -> Self {
        SurfaceShape::Polygon { verts: [a, b, c, c], count: 3, thickness }
    }

    /// Vertices a polygon actually uses. `None` when fewer than three remain
    /// after clamping `count` to the array.
    pub fn polygon_verts(verts: &[Vec3; 4], count: u8) -> Option<&[Vec3]> {
        let n = (count as usize).min(verts.len());
        (n >= 3).then(|| &verts[..n])
    }

    /// Polygons with fewer than three vertices; they never collide.
    pub fn is_degenerate(&self) -> bool {
        match self {
            SurfaceShape::Polygon { verts, count, .. } => Self::polygon_verts(verts, *count).is_none(),
            _ => false,
        }
    }

    /// Axis-aligned bounds; `None` for unbounded planes and degenerate polygons.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        match *self {
            SurfaceShape::Plane { .. } => None,
            SurfaceShape::Polygon { verts, count, thickness } => {
                let vs = Self::polygon_verts(&verts, count)?;
                let mut min = vs[0];
                let mut max = vs[0];
                for v in vs {
                    min = min.min(*v);
                    max = max.max(*v);
                }
                let t = Vec3::splat(thickness * 0.5);
                Some((min - t, max + t))
            }
            SurfaceShape::Cylinder { p0, p1, radius } => {
                let r = Vec3::splat(radius);
                Some((p0.min(p1) - r, p0.max(p1) + r))
            }
            SurfaceShape::Sphere { center, radius } => {
                Some((center - Vec3::splat(radius), center + Vec3::splat(radius)))
            }
            SurfaceShape::Cube { min, max } => Some((min, max)),
        }
    }

    pub fn translated(&self, d: Vec3) -> Self {
        match *self {
            SurfaceShape::Plane { normal, offset } => SurfaceShape::Plane {
                normal,
                offset: offset + normal.dot(d),
            },
            SurfaceShape::Polygon { verts, count, thickness } => SurfaceShape::Polygon {
                verts: verts.map(|v| v + d),
                count,
                thickness,
            },
            SurfaceShape::Cylinder { p0, p1, radius } => SurfaceShape::Cylinder {
                p0: p0 + d,
                p1: p1 + d,
                radius,
            },
            SurfaceShape::Sphere { center, radius } => SurfaceShape::Sphere { center: center + d, radius },
            SurfaceShape::Cube { min, max } => SurfaceShape::Cube { min: min + d, max: max + d },
        }
    }
}

/// Sphere-vs-surface contact.
#[derive(Copy, Clone, Debug)]
pub struct Contact {
    /// Unit normal pointing out of the surface toward the sphere.
    pub normal: Vec3,
    /// Point on the surface closest to the sphere center.
    pub point: Vec3,
    /// Penetration depth (> 0).
    pub depth: f32,
}

/// Terminal classification of a collision.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Terminal {
    Flying,
    Stopped,
    Destroyed,
}

/// Stair-step adjustment applied to player-controlled objects instead of a bounce.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StepAdjust {
    None,
    Up(f32),
    Down,
}

/// Transient result of resolving one sub-step; consumed immediately by the caller.
#[derive(Copy, Clone, Debug)]
pub struct CollisionOutcome {
    pub surface: SurfaceHandle,
    pub normal: Vec3,
    pub point: Vec3,
    pub depth: f32,
    /// Corrected sphere center.
    pub position: Vec3,
    pub velocity: Vec3,
    /// Incoming speed along the normal (>= 0).
    pub impact_speed: f32,
    pub step: StepAdjust,
    pub terminal: Terminal,
}

/// Why an object left the simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DestroyCause {
    Impact,
    Collision,
    Water,
    Expired,
    SurfaceRemoved,
    /// Hit the water too fast.
    WaterImpact,
    InvalidNumericState,
}

/// Events emitted for gameplay/audio/VFX layers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WorldEvent {
    ObjectDestroyed {
        id: ObjectId,
        kind: ObjKind,
        obj_type: u16,
        position: Vec3,
        cause: DestroyCause,
    },
    EnteredWater { id: ObjectId, position: Vec3 },
    ExitedWater { id: ObjectId, position: Vec3 },
    Rests {
        id: ObjectId,
        position: Vec3,
        surface: SurfaceHandle,
    },
    Impact {
        id: ObjectId,
        position: Vec3,
        normal: Vec3,
        surface: SurfaceHandle,
        speed: f32,
        leaves_decal: bool,
    },
    /// An object of an exploding type was destroyed.
    Exploded { id: ObjectId, position: Vec3 },
}

/// Render-facing snapshot of one live object.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub kind: ObjKind,
    pub position: Vec3,
    pub radius: f32,
    pub color: Vec4,
    /// Intensity for emissive kinds, alpha for decals, density for clouds.
    pub intensity: f32,
    pub orientation: Vec3,
}

/// Per-group tick counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub advanced: usize,
    pub spawned: usize,
    pub destroyed: usize,
    pub resting: usize,
}

impl std::ops::AddAssign for TickStats {
    fn add_assign(&mut self, rhs: Self) {
        self.advanced += rhs.advanced;
        self.spawned += rhs.spawned;
        self.destroyed += rhs.destroyed;
        self.resting += rhs.resting;
    }
}

/// Wall-clock breakdown of the last tick, when timing is enabled.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldTiming {
    pub tick_ms: f64,
    pub groups_ms: f64,
    pub reactions_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swept_aabb_covers_both_ends() {
        let s = SweptSphere {
            start: Vec3::new(0.0, 0.0, 5.0),
            end: Vec3::new(1.0, -1.0, 2.0),
            radius: 0.5,
        };
        let (min, max) = s.aabb();
        assert_eq!(min, Vec3::new(-0.5, -1.5, 1.5));
        assert_eq!(max, Vec3::new(1.5, 0.5, 5.5));
    }

    #[test]
    fn test_translate_plane_moves_offset() {
        let p = SurfaceShape::Plane { normal: Vec3::Z, offset: 0.0 };
        let moved = p.translated(Vec3::new(3.0, 0.0, 2.0));
        assert_eq!(moved, SurfaceShape::Plane { normal: Vec3::Z, offset: 2.0 });
        assert!(moved.bounds().is_none());
    }

    #[test]
    fn test_triangle_bounds_include_thickness() {
        let t = SurfaceShape::triangle(Vec3::ZERO, Vec3::X, Vec3::Y, 0.2);
        let (min, max) = t.bounds().unwrap();
        assert!((min.z + 0.1).abs() < 1e-6);
        assert!((max.x - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_count_out_of_range_is_degenerate() {
        let v = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE];
        let empty = SurfaceShape::Polygon { verts: v, count: 0, thickness: 0.1 };
        assert!(empty.is_degenerate());
        assert!(empty.bounds().is_none());
        let line = SurfaceShape::Polygon { verts: v, count: 2, thickness: 0.1 };
        assert!(line.is_degenerate());

        let wide = SurfaceShape::Polygon { verts: v, count: 9, thickness: 0.0 };
        assert!(!wide.is_degenerate());
        assert_eq!(SurfaceShape::polygon_verts(&v, 9).map(|vs| vs.len()), Some(4));
        assert_eq!(wide.bounds(), Some((Vec3::ZERO, Vec3::ONE)));
    }

    #[test]
    fn test_stats_accumulate() {
        let mut a = TickStats { advanced: 1, spawned: 2, destroyed: 0, resting: 1 };
        a += TickStats { advanced: 3, spawned: 0, destroyed: 1, resting: 0 };
        assert_eq!(a, TickStats { advanced: 4, spawned: 2, destroyed: 1, resting: 1 });
    }
}
