use glam::Vec3;

use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Contract the pooled store needs from its slot type.
pub trait Poolable {
    fn status(&self) -> SlotStatus;

    /// Age counter; larger means staler.
    fn time(&self) -> i32;

    fn is_dead(&self) -> bool {
        self.status() == SlotStatus::Dead
    }

    fn is_alive(&self) -> bool {
        self.status() == SlotStatus::Alive
    }
}

/// Read-only query surface into world geometry. Implementations must not mutate
/// during a tick; every group shares the same reference.
pub trait GeometryQuery {
    /// Append surfaces that may touch the swept sphere to `out` (broad phase).
    /// `out` is cleared by the caller.
    fn query_candidate_surfaces(&self, swept: &SweptSphere, out: &mut Vec<SurfaceHandle>);

    /// Current world-space shape, or `None` if the handle is stale.
    fn surface_shape(&self, h: SurfaceHandle) -> Option<SurfaceShape>;

    /// Exact contact between a sphere at `point` and the surface. `prev` is the
    /// sphere's previous position and selects the side of thin surfaces.
    fn surface_normal_and_depth(
        &self,
        h: SurfaceHandle,
        point: Vec3,
        radius: f32,
        prev: Vec3,
    ) -> Option<Contact> {
        let shape = self.surface_shape(h)?;
        Narrowphase::sphere_shape(point, radius, &shape, prev)
    }

    fn is_water_at(&self, p: Vec3) -> bool;

    fn surface_elasticity(&self, h: SurfaceHandle) -> f32;

    /// Displacement the surface underwent during the current tick.
    fn platform_delta(&self, h: SurfaceHandle) -> Vec3;

    /// Object that owns the surface (player hulls etc.), if any.
    fn surface_owner(&self, _h: SurfaceHandle) -> Option<ObjectId> {
        None
    }

    fn is_live(&self, h: SurfaceHandle) -> bool {
        self.surface_shape(h).is_some()
    }
}

/// Sphere-vs-primitive contact tests.
pub trait NarrowphaseApi {
    fn sphere_plane(c: Vec3, r: f32, normal: Vec3, offset: f32) -> Option<Contact>;

    fn sphere_polygon(c: Vec3, r: f32, verts: &[Vec3], thickness: f32, prev: Vec3) -> Option<Contact>;

    fn sphere_cylinder(c: Vec3, r: f32, p0: Vec3, p1: Vec3, cyl_r: f32) -> Option<Contact>;

    fn sphere_sphere(c: Vec3, r: f32, center: Vec3, sr: f32) -> Option<Contact>;

    fn sphere_cube(c: Vec3, r: f32, min: Vec3, max: Vec3) -> Option<Contact>;

    fn sphere_shape(c: Vec3, r: f32, shape: &SurfaceShape, prev: Vec3) -> Option<Contact> {
        match *shape {
            SurfaceShape::Plane { normal, offset } => Self::sphere_plane(c, r, normal, offset),
            SurfaceShape::Polygon { verts, count, thickness } => {
                Self::sphere_polygon(c, r, SurfaceShape::polygon_verts(&verts, count)?, thickness, prev)
            }
            SurfaceShape::Cylinder { p0, p1, radius } => Self::sphere_cylinder(c, r, p0, p1, radius),
            SurfaceShape::Sphere { center, radius } => Self::sphere_sphere(c, r, center, radius),
            SurfaceShape::Cube { min, max } => Self::sphere_cube(c, r, min, max),
        }
    }
}
