//! Sub-step collision resolution for one sphere against collaborator geometry.
//!
//! The resolver only reads: it returns a `CollisionOutcome` and the caller
//! applies position/velocity changes.

use glam::Vec3;

use crate::api::GeometryQuery;
use crate::flags::TypeFlags;
use crate::types::*;

/// Per-sub-step description of the moving sphere.
#[derive(Copy, Clone, Debug)]
pub struct ResolveInput {
    pub pos: Vec3,
    /// Position at the start of the sub-step.
    pub pold: Vec3,
    pub radius: f32,
    pub velocity: Vec3,
    /// Object elasticity; combined multiplicatively with the surface's.
    pub elasticity: f32,
    pub type_flags: TypeFlags,
    pub self_id: Option<ObjectId>,
    pub step_height: f32,
    /// Speed gravity adds in one tick. A floor rebound no faster than this
    /// would only come back next tick, so it is dropped.
    pub rest_bound: f32,
}

pub struct CollisionResolver<'a, G: GeometryQuery + ?Sized> {
    geom: &'a G,
    candidates: &'a mut Vec<SurfaceHandle>,
}

impl<'a, G: GeometryQuery + ?Sized> CollisionResolver<'a, G> {
    /// `candidates` is reused scratch space for broad-phase results.
    pub fn new(geom: &'a G, candidates: &'a mut Vec<SurfaceHandle>) -> Self {
        Self { geom, candidates }
    }

    /// Deepest contact among the broad-phase candidates; ties go to the lower handle.
    pub fn deepest_contact(&mut self, input: &ResolveInput) -> Option<(SurfaceHandle, Contact)> {
        let swept = SweptSphere {
            start: input.pold,
            end: input.pos,
            radius: input.radius,
        };
        self.candidates.clear();
        self.geom.query_candidate_surfaces(&swept, self.candidates);

        let player = input.type_flags.player_controlled();
        let mut best: Option<(SurfaceHandle, Contact)> = None;
        for &h in self.candidates.iter() {
            if !self.geom.is_live(h) {
                continue;
            }
            if player && input.self_id.is_some() && self.geom.surface_owner(h) == input.self_id {
                continue;
            }
            let Some(c) = self.geom.surface_normal_and_depth(h, input.pos, input.radius, input.pold) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((bh, bc)) => {
                    if (c.depth - bc.depth).abs() <= NORM_TOLERANCE {
                        h < *bh
                    } else {
                        c.depth > bc.depth
                    }
                }
            };
            if better {
                best = Some((h, c));
            }
        }
        best
    }

    pub fn resolve(&mut self, input: &ResolveInput) -> Option<CollisionOutcome> {
        let (surface, contact) = self.deepest_contact(input)?;
        let n = contact.normal;
        let v = input.velocity;
        let vn = v.dot(n);
        let impact_speed = (-vn).max(0.0);
        let pushed = input.pos + n * contact.depth;

        let (position, velocity, step) = if input.type_flags.player_controlled() {
            self.step_response(input, surface, n, pushed)
        } else {
            let mut vel = v;
            if vn < 0.0 {
                let e = input.elasticity * self.geom.surface_elasticity(surface);
                vel = (v - n * (2.0 * vn)) * e;
                let out_n = vel.dot(n);
                let floor = BOUNCE_VEL_FLOOR.max(input.rest_bound * n.z.max(0.0));
                if out_n.abs() <= floor {
                    vel -= n * out_n;
                }
            }
            (pushed, vel, StepAdjust::None)
        };

        let terminal = if input.type_flags.destroyed_by_collision() {
            Terminal::Destroyed
        } else if n.z >= FLOOR_NORMAL_Z && velocity.length() < REST_EPSILON {
            Terminal::Stopped
        } else {
            Terminal::Flying
        };

        log::trace!(
            "contact surface={} depth={:.4} n=({:.2},{:.2},{:.2}) impact={:.3}",
            surface.id,
            contact.depth,
            n.x,
            n.y,
            n.z,
            impact_speed
        );

        Some(CollisionOutcome {
            surface,
            normal: n,
            point: contact.point,
            depth: contact.depth,
            position,
            velocity,
            impact_speed,
            step,
            terminal,
        })
    }

    /// Player response: stand on floors, climb low obstacles, slide along walls.
    fn step_response(
        &self,
        input: &ResolveInput,
        surface: SurfaceHandle,
        n: Vec3,
        pushed: Vec3,
    ) -> (Vec3, Vec3, StepAdjust) {
        let v = input.velocity;
        let into = v.dot(n).min(0.0);
        if n.z >= FLOOR_NORMAL_Z {
            return (pushed, v - n * into, StepAdjust::Down);
        }
        if input.step_height > 0.0 {
            let raised = input.pos + Vec3::Z * input.step_height;
            let blocked = self
                .geom
                .surface_normal_and_depth(surface, raised, input.radius, raised)
                .is_some();
            if !blocked {
                return (raised, v, StepAdjust::Up(input.step_height));
            }
        }
        (pushed, v - n * into, StepAdjust::None)
    }
}
