//! Dynamic world object: the general-purpose physics record.
//!
//! `advance` integrates forces once per tick, then moves the sphere in
//! sub-steps no longer than its radius, resolving collisions after each.

use glam::Vec3;

use crate::api::GeometryQuery;
use crate::config::ObjTypeProps;
use crate::error::PhysError;
use crate::flags::{ObjFlag, ObjFlags, TypeFlag};
use crate::record::{PhysBase, StepCtx};
use crate::resolver::{CollisionResolver, ResolveInput};
use crate::types::*;

/// How far below a resting object to look for the floor still holding it.
const SUPPORT_DEPTH: f32 = 0.01;

/// Fraction of velocity lost per second while submerged.
const WATER_DRAG: f32 = 1.0;

/// Impacts slower than this emit no `Impact` event.
const IMPACT_EVENT_SPEED: f32 = 1.0;

const MAX_DEFORM: f32 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct DynObject {
    /// Last surface touched. Weak: revalidate before use.
    pub coll_id: Option<SurfaceHandle>,
    pub obj_type: u16,
    pub source: i16,
    pub flags: ObjFlags,
    pub health: f32,
    pub angle: f32,
    pub velocity: Vec3,
    pub orientation: Vec3,
    pub init_dir: Vec3,
    pub vdeform: Vec3,
    pub motion: MotionState,
}

impl Default for DynObject {
    fn default() -> Self {
        Self {
            coll_id: None,
            obj_type: 0,
            source: -2,
            flags: ObjFlags::empty(),
            health: 0.0,
            angle: 0.0,
            velocity: Vec3::ZERO,
            orientation: Vec3::NEG_Z,
            init_dir: Vec3::NEG_Z,
            vdeform: Vec3::ZERO,
            motion: MotionState::Inactive,
        }
    }
}

impl DynObject {
    pub fn generate(obj_type: u16, velocity: Vec3, props: &ObjTypeProps) -> Self {
        Self {
            obj_type,
            health: props.health,
            velocity,
            motion: MotionState::Flying,
            ..Default::default()
        }
    }

    /// Zero everything that marks the object as live.
    pub fn disable(&mut self) {
        self.health = 0.0;
        self.velocity = Vec3::ZERO;
        self.motion = MotionState::Inactive;
        self.coll_id = None;
    }

    pub fn is_still(&self) -> bool {
        matches!(self.motion, MotionState::Resting)
    }

    /// Add a velocity change (explosion, push). Large enough impulses wake
    /// resting or sliding objects.
    pub fn apply_impulse(&mut self, dv: Vec3) {
        self.velocity += dv;
        if dv.length() >= REST_EPSILON && matches!(self.motion, MotionState::Resting | MotionState::Sliding) {
            self.wake();
            self.flags.add(ObjFlag::WasPushed);
        }
    }

    fn wake(&mut self) {
        self.motion = MotionState::Flying;
        self.flags.remove_many(&[ObjFlag::XyStopped, ObjFlag::ZStopped]);
    }

    /// Subtract health; returns true when the object has none left.
    pub fn damage_object(&mut self, damage: f32) -> bool {
        if damage > 0.0 {
            self.health = (self.health - damage).max(0.0);
        }
        self.health <= 0.0
    }

    /// Excess kinetic energy of an impact above the type's threshold.
    pub fn impact_damage(impact_speed: f32, props: &ObjTypeProps) -> f32 {
        let excess = impact_speed - props.damage_threshold;
        if excess <= 0.0 {
            return 0.0;
        }
        0.5 * props.mass * excess * excess
    }

    fn destroy<G: GeometryQuery + ?Sized>(
        &mut self,
        base: &mut PhysBase,
        ctx: &mut StepCtx<'_, G>,
        index: usize,
        cause: DestroyCause,
    ) {
        ctx.events.push(WorldEvent::ObjectDestroyed {
            id: ctx.id(index),
            kind: ObjKind::Dynamic,
            obj_type: self.obj_type,
            position: base.pos,
            cause,
        });
        if ctx.type_flags.explodes() && cause != DestroyCause::InvalidNumericState {
            ctx.events.push(WorldEvent::Exploded {
                id: ctx.id(index),
                position: base.pos,
            });
        }
        self.disable();
        self.motion = MotionState::Destroyed;
        base.status = SlotStatus::Dead;
        base.time = 0;
    }

    /// Force-terminate on non-finite state instead of letting NaNs reach rendering.
    fn verify<G: GeometryQuery + ?Sized>(
        &mut self,
        base: &mut PhysBase,
        ctx: &mut StepCtx<'_, G>,
        index: usize,
    ) -> Result<(), PhysError> {
        if base.pos.is_finite() && self.velocity.is_finite() {
            return Ok(());
        }
        log::error!(
            "object {}:{} has invalid state pos={:?} vel={:?}; terminating",
            ctx.group,
            index,
            base.pos,
            self.velocity
        );
        self.destroy(base, ctx, index, DestroyCause::InvalidNumericState);
        Err(PhysError::InvalidNumericState { index })
    }

    /// Advance one tick. `iter` is the pass number within the tick; `index` is
    /// the slot in the owning group. Objects that come to rest are released
    /// unless `allow_motionless` is set.
    pub fn advance<G: GeometryQuery + ?Sized>(
        &mut self,
        base: &mut PhysBase,
        ctx: &mut StepCtx<'_, G>,
        allow_motionless: bool,
        iter: u32,
        index: usize,
    ) -> Result<MotionState, PhysError> {
        if base.status != SlotStatus::Alive {
            return Ok(self.motion);
        }
        self.verify(base, ctx, index)?;
        let props = ctx.props;
        let dt = ctx.params.dt;

        if iter == 0 && self.vdeform != Vec3::ZERO {
            self.vdeform *= (1.0 - props.deform_recover * dt).clamp(0.0, 1.0);
        }

        match self.motion {
            MotionState::Destroyed => return Ok(self.motion),
            MotionState::Inactive => self.motion = MotionState::Flying,
            MotionState::Resting => {
                if self.velocity.length() < REST_EPSILON && self.still_supported(base, ctx) {
                    if !allow_motionless {
                        self.disable();
                        base.status = SlotStatus::Dead;
                        base.time = 0;
                        return Ok(MotionState::Inactive);
                    }
                    return Ok(MotionState::Resting);
                }
                self.wake();
            }
            MotionState::Flying | MotionState::Sliding => {}
        }

        if !ctx.type_flags.has(TypeFlag::NoFall) {
            self.velocity.z -= ctx.params.gravity * props.gravity_scale * dt;
        }
        if props.air_factor > 0.0 {
            self.velocity *= (1.0 - props.air_factor * dt).clamp(0.0, 1.0);
        }
        if self.flags.in_water() {
            self.velocity *= (1.0 - WATER_DRAG * dt).clamp(0.0, 1.0);
        }
        let speed = self.velocity.length();
        if props.terminal_vel > 0.0 && speed > props.terminal_vel {
            self.velocity *= props.terminal_vel / speed;
        }

        let travel = self.velocity.length() * dt;
        let mut nsteps = ((travel / props.radius).ceil() as u32).max(1);
        if nsteps > ctx.params.max_substeps {
            log::warn!(
                "object {}:{} needs {} sub-steps, capped at {}",
                ctx.group,
                index,
                nsteps,
                ctx.params.max_substeps
            );
            nsteps = ctx.params.max_substeps;
        }
        self.multistep_coll(base, ctx, index, nsteps, allow_motionless)?;
        self.verify(base, ctx, index)?;
        Ok(self.motion)
    }

    fn multistep_coll<G: GeometryQuery + ?Sized>(
        &mut self,
        base: &mut PhysBase,
        ctx: &mut StepCtx<'_, G>,
        index: usize,
        nsteps: u32,
        allow_motionless: bool,
    ) -> Result<(), PhysError> {
        let props = ctx.props;
        let step_dt = ctx.params.dt / nsteps as f32;
        let id = ctx.id(index);
        let rest_bound = if ctx.type_flags.has(TypeFlag::NoFall) {
            0.0
        } else {
            ctx.params.gravity * props.gravity_scale * ctx.params.dt
        };
        self.flags.remove(ObjFlag::Collided);
        let mut touched = false;

        for _ in 0..nsteps {
            let pold = base.pos;
            base.pos += self.velocity * step_dt;
            if self.check_water(base, ctx, id, pold) {
                self.destroy(base, ctx, index, DestroyCause::WaterImpact);
                return Ok(());
            }

            let input = ResolveInput {
                pos: base.pos,
                pold,
                radius: props.radius,
                velocity: self.velocity,
                elasticity: props.elasticity,
                type_flags: ctx.type_flags,
                self_id: Some(id),
                step_height: props.step_height,
                rest_bound,
            };
            let Some(out) = CollisionResolver::new(ctx.geom, &mut *ctx.scratch).resolve(&input) else {
                continue;
            };

            touched = true;
            base.pos = out.position;
            self.velocity = out.velocity;
            self.coll_id = Some(out.surface);
            self.flags.add(ObjFlag::Collided);
            self.flags.set(ObjFlag::PlatformColl, ctx.geom.platform_delta(out.surface) != Vec3::ZERO);

            if ctx.type_flags.has(TypeFlag::ObjIsFlat) {
                self.orientation = out.normal;
            }
            if ctx.type_flags.has(TypeFlag::Deformable) {
                self.vdeform -= out.normal * (out.impact_speed * props.deform);
                self.vdeform = self.vdeform.clamp_length_max(MAX_DEFORM);
            }
            if out.impact_speed >= IMPACT_EVENT_SPEED {
                ctx.events.push(WorldEvent::Impact {
                    id,
                    position: out.point,
                    normal: out.normal,
                    surface: out.surface,
                    speed: out.impact_speed,
                    leaves_decal: ctx.type_flags.has(TypeFlag::LeavesDecal),
                });
            }

            if out.terminal == Terminal::Destroyed {
                self.destroy(base, ctx, index, DestroyCause::Collision);
                return Ok(());
            }
            if self.damage_object(Self::impact_damage(out.impact_speed, props)) {
                self.destroy(base, ctx, index, DestroyCause::Impact);
                return Ok(());
            }

            if out.terminal == Terminal::Stopped {
                self.velocity = Vec3::ZERO;
                self.motion = MotionState::Resting;
                self.flags.add_many(&[ObjFlag::XyStopped, ObjFlag::ZStopped]);
                ctx.events.push(WorldEvent::Rests {
                    id,
                    position: base.pos,
                    surface: out.surface,
                });
                if !allow_motionless {
                    self.disable();
                    base.status = SlotStatus::Dead;
                    base.time = 0;
                }
                return Ok(());
            }

            let on_floor = out.normal.z >= FLOOR_NORMAL_Z;
            if on_floor && self.velocity.dot(out.normal).abs() < REST_EPSILON {
                self.motion = MotionState::Sliding;
                let vn = out.normal * self.velocity.dot(out.normal);
                let vt = self.velocity - vn;
                let keep = (1.0 - props.friction * step_dt).clamp(0.0, 1.0);
                self.velocity = vn + vt * keep;
                if ctx.type_flags.has(TypeFlag::ObjRolls) {
                    self.angle += vt.length() * step_dt / props.radius;
                }
            } else {
                self.motion = MotionState::Flying;
            }
        }
        if !touched {
            self.motion = MotionState::Flying;
        }
        Ok(())
    }

    /// Track water entry/exit for one sub-step. Returns true when the entry
    /// was hard enough to destroy the object.
    fn check_water<G: GeometryQuery + ?Sized>(
        &mut self,
        base: &PhysBase,
        ctx: &mut StepCtx<'_, G>,
        id: ObjectId,
        pold: Vec3,
    ) -> bool {
        let was = ctx.geom.is_water_at(pold);
        let now = ctx.geom.is_water_at(base.pos);
        let submerged = now && ctx.geom.is_water_at(base.pos + Vec3::Z * ctx.props.radius);
        self.flags.set(ObjFlag::InWater, now);
        self.flags.set(ObjFlag::Underwater, submerged);
        self.flags.set(ObjFlag::Floating, now && !submerged);

        if now && !was {
            let entry_speed = (-self.velocity.z).max(0.0);
            self.velocity *= ctx.params.water_damping;
            ctx.events.push(WorldEvent::EnteredWater { id, position: base.pos });
            if !ctx.type_flags.has(TypeFlag::NoWaterDamage) {
                let damage = Self::impact_damage(entry_speed, ctx.props);
                return damage > 0.0 && self.damage_object(damage);
            }
        } else if was && !now {
            ctx.events.push(WorldEvent::ExitedWater { id, position: base.pos });
        }
        false
    }

    /// A resting object follows its platform and stays put while something
    /// below still holds it up.
    fn still_supported<G: GeometryQuery + ?Sized>(&mut self, base: &mut PhysBase, ctx: &mut StepCtx<'_, G>) -> bool {
        if let Some(h) = self.coll_id {
            if !ctx.geom.is_live(h) {
                self.coll_id = None;
                return false;
            }
            base.pos += ctx.geom.platform_delta(h);
        }
        let input = ResolveInput {
            pos: base.pos - Vec3::Z * SUPPORT_DEPTH,
            pold: base.pos,
            radius: ctx.props.radius,
            velocity: Vec3::ZERO,
            elasticity: 0.0,
            type_flags: ctx.type_flags,
            self_id: None,
            step_height: 0.0,
            rest_bound: 0.0,
        };
        CollisionResolver::new(ctx.geom, &mut *ctx.scratch)
            .deepest_contact(&input)
            .is_some_and(|(_, c)| c.normal.z >= FLOOR_NORMAL_Z)
    }

    pub fn draw(&self, pos: Vec3, props: &ObjTypeProps) -> DrawItem {
        let health_frac = if props.health > 0.0 {
            (self.health / props.health).clamp(0.0, 1.0)
        } else {
            1.0
        };
        DrawItem {
            kind: ObjKind::Dynamic,
            position: pos + self.vdeform * props.radius,
            radius: props.radius,
            color: props.color,
            intensity: health_frac,
            orientation: self.orientation,
        }
    }
}
