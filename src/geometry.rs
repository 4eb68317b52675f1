//! In-memory geometry collaborator: a flat list of surfaces with generation-checked
//! handles, optional per-tick platform motion, and axis-aligned water volumes.

use glam::Vec3;

use crate::api::GeometryQuery;
use crate::types::*;

/// Builder for one surface.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceDesc {
    pub shape: SurfaceShape,
    pub elasticity: f32,
    pub owner: Option<ObjectId>,
    /// Platform velocity (units per second); zero for static geometry.
    pub velocity: Vec3,
}

impl SurfaceDesc {
    pub fn new(shape: SurfaceShape) -> Self {
        Self {
            shape,
            elasticity: 1.0,
            owner: None,
            velocity: Vec3::ZERO,
        }
    }

    pub fn elasticity(mut self, e: f32) -> Self {
        self.elasticity = e;
        self
    }

    pub fn owner(mut self, id: ObjectId) -> Self {
        self.owner = Some(id);
        self
    }

    pub fn moving(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

#[derive(Clone, Debug)]
struct Entry {
    generation: u32,
    desc: Option<SurfaceDesc>,
    delta: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct StaticScene {
    entries: Vec<Entry>,
    water: Vec<(Vec3, Vec3)>,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, desc: SurfaceDesc) -> SurfaceHandle {
        if let Some(id) = self.entries.iter().position(|e| e.desc.is_none()) {
            let e = &mut self.entries[id];
            e.generation = e.generation.wrapping_add(1);
            e.desc = Some(desc);
            e.delta = Vec3::ZERO;
            return SurfaceHandle { id: id as u32, generation: e.generation };
        }
        self.entries.push(Entry {
            generation: 0,
            desc: Some(desc),
            delta: Vec3::ZERO,
        });
        SurfaceHandle {
            id: (self.entries.len() - 1) as u32,
            generation: 0,
        }
    }

    /// Remove a surface. Outstanding handles to it go stale.
    pub fn remove(&mut self, h: SurfaceHandle) -> bool {
        match self.entries.get_mut(h.id as usize) {
            Some(e) if e.generation == h.generation && e.desc.is_some() => {
                e.desc = None;
                e.delta = Vec3::ZERO;
                true
            }
            _ => false,
        }
    }

    pub fn add_water(&mut self, min: Vec3, max: Vec3) {
        self.water.push((min, max));
    }

    /// Move platforms by `velocity * dt` and record the per-tick delta.
    /// Call between ticks, never during one.
    pub fn advance(&mut self, dt: f32) {
        for e in &mut self.entries {
            if let Some(desc) = e.desc.as_mut() {
                e.delta = desc.velocity * dt;
                if e.delta != Vec3::ZERO {
                    desc.shape = desc.shape.translated(e.delta);
                }
            }
        }
    }

    fn desc(&self, h: SurfaceHandle) -> Option<&SurfaceDesc> {
        let e = self.entries.get(h.id as usize)?;
        if e.generation != h.generation {
            return None;
        }
        e.desc.as_ref()
    }
}

impl GeometryQuery for StaticScene {
    fn query_candidate_surfaces(&self, swept: &SweptSphere, out: &mut Vec<SurfaceHandle>) {
        let (min, max) = swept.aabb();
        for (i, e) in self.entries.iter().enumerate() {
            let Some(desc) = &e.desc else { continue };
            if desc.shape.is_degenerate() {
                continue;
            }
            let hit = match desc.shape.bounds() {
                None => true,
                Some((bmin, bmax)) => min.cmple(bmax).all() && max.cmpge(bmin).all(),
            };
            if hit {
                out.push(SurfaceHandle { id: i as u32, generation: e.generation });
            }
        }
    }

    fn surface_shape(&self, h: SurfaceHandle) -> Option<SurfaceShape> {
        self.desc(h).map(|d| d.shape)
    }

    fn is_water_at(&self, p: Vec3) -> bool {
        self.water
            .iter()
            .any(|(min, max)| p.cmpge(*min).all() && p.cmple(*max).all())
    }

    fn surface_elasticity(&self, h: SurfaceHandle) -> f32 {
        self.desc(h).map_or(0.0, |d| d.elasticity)
    }

    fn platform_delta(&self, h: SurfaceHandle) -> Vec3 {
        match self.entries.get(h.id as usize) {
            Some(e) if e.generation == h.generation && e.desc.is_some() => e.delta,
            _ => Vec3::ZERO,
        }
    }

    fn surface_owner(&self, h: SurfaceHandle) -> Option<ObjectId> {
        self.desc(h).and_then(|d| d.owner)
    }
}
