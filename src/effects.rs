//! Short-lived effect records driven by the group tick: sparks, bubbles,
//! fire, particle clouds and surface decals.

use glam::{Vec3, Vec4};

use crate::api::GeometryQuery;
use crate::record::{PhysBase, StepCtx};
use crate::resolver::{CollisionResolver, ResolveInput};
use crate::types::*;

/// Ticks a spark lives when its type sets no lifetime.
const SPARK_LIFETIME: i32 = 8;
const BUBBLE_LIFETIME: i32 = 600;
/// Fraction of heat a fire loses per second.
const FIRE_COOL_RATE: f32 = 0.25;
const CLOUD_GROWTH_RATE: f32 = 0.05;

fn retire(base: &mut PhysBase) {
    base.status = SlotStatus::Dead;
    base.time = 0;
}

fn lifetime_or(lifetime: i32, fallback: i32) -> i32 {
    if lifetime > 0 { lifetime } else { fallback }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spark {
    pub color: Vec4,
    pub size: f32,
    pub velocity: Vec3,
}

impl Spark {
    pub fn generate(color: Vec4, size: f32, velocity: Vec3) -> Self {
        Self { color, size, velocity }
    }

    /// Ballistic, no collision. Fades out over its lifetime.
    pub fn apply_physics<G: GeometryQuery + ?Sized>(&mut self, base: &mut PhysBase, ctx: &mut StepCtx<'_, G>) {
        if base.time >= lifetime_or(ctx.props.lifetime, SPARK_LIFETIME) {
            retire(base);
            return;
        }
        let dt = ctx.params.dt;
        self.velocity.z -= ctx.params.gravity * ctx.props.gravity_scale * dt;
        base.pos += self.velocity * dt;
        self.color.w *= 0.85;
    }

    pub fn draw(&self, pos: Vec3) -> DrawItem {
        DrawItem {
            kind: ObjKind::Spark,
            position: pos,
            radius: self.size,
            color: self.color,
            intensity: self.color.w,
            orientation: self.velocity.normalize_or_zero(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bubble {
    pub radius: f32,
    /// Rise speed along +z.
    pub velocity: f32,
    pub color: Vec4,
}

impl Bubble {
    pub fn generate(radius: f32, velocity: f32, color: Vec4) -> Self {
        Self { radius, velocity, color }
    }

    /// Rise until the bubble leaves the water, then pop.
    pub fn apply_physics<G: GeometryQuery + ?Sized>(&mut self, base: &mut PhysBase, ctx: &mut StepCtx<'_, G>) {
        if base.time >= lifetime_or(ctx.props.lifetime, BUBBLE_LIFETIME) {
            retire(base);
            return;
        }
        base.pos.z += self.velocity * ctx.params.dt;
        if !ctx.geom.is_water_at(base.pos) {
            retire(base);
        }
    }

    pub fn draw(&self, pos: Vec3) -> DrawItem {
        DrawItem {
            kind: ObjKind::Bubble,
            position: pos,
            radius: self.radius,
            color: self.color,
            intensity: 1.0,
            orientation: Vec3::Z,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fire {
    pub source: i16,
    pub is_static: bool,
    pub radius: f32,
    /// Remaining heat in [0, 1]; the fire dies at 0.
    pub heat: f32,
    pub intensity: f32,
    pub velocity: Vec3,
}

impl Fire {
    pub fn generate(size: f32, intensity: f32, source: i16, is_static: bool) -> Self {
        Self {
            source,
            is_static,
            radius: size,
            heat: 1.0,
            intensity,
            velocity: Vec3::ZERO,
        }
    }

    pub fn extinguish(&mut self) {
        self.heat = 0.0;
        self.intensity = 0.0;
    }

    pub fn apply_physics<G: GeometryQuery + ?Sized>(
        &mut self,
        base: &mut PhysBase,
        ctx: &mut StepCtx<'_, G>,
        index: usize,
    ) {
        if ctx.geom.is_water_at(base.pos) {
            self.extinguish();
            ctx.events.push(WorldEvent::ObjectDestroyed {
                id: ctx.id(index),
                kind: ObjKind::Fire,
                obj_type: ctx.obj_type,
                position: base.pos,
                cause: DestroyCause::Water,
            });
            retire(base);
            return;
        }
        let dt = ctx.params.dt;
        self.heat -= FIRE_COOL_RATE * dt;
        if self.heat <= 0.0 || (ctx.props.lifetime > 0 && base.time >= ctx.props.lifetime) {
            self.extinguish();
            retire(base);
            return;
        }
        if self.is_static {
            return;
        }

        let pold = base.pos;
        self.velocity.z -= ctx.params.gravity * ctx.props.gravity_scale * dt;
        base.pos += self.velocity * dt;
        let input = ResolveInput {
            pos: base.pos,
            pold,
            radius: self.radius,
            velocity: self.velocity,
            elasticity: 0.0,
            type_flags: ctx.type_flags,
            self_id: None,
            step_height: 0.0,
            rest_bound: 0.0,
        };
        // Fire sticks where it lands.
        if let Some((_, c)) = CollisionResolver::new(ctx.geom, &mut *ctx.scratch).deepest_contact(&input) {
            base.pos += c.normal * c.depth;
            self.velocity = Vec3::ZERO;
        }
    }

    pub fn draw(&self, pos: Vec3) -> DrawItem {
        let heat = self.heat.clamp(0.0, 1.0);
        DrawItem {
            kind: ObjKind::Fire,
            position: pos,
            radius: self.radius,
            color: Vec4::new(1.0, 0.3 + 0.6 * heat, 0.1 * heat, 1.0),
            intensity: self.intensity * heat,
            orientation: Vec3::Z,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleCloud {
    pub radius: f32,
    pub init_radius: f32,
    pub density: f32,
    pub darkness: f32,
    pub damage: f32,
    pub init_vel: Vec3,
    pub base_color: Vec4,
    pub fire: bool,
}

impl ParticleCloud {
    pub fn generate(
        base_color: Vec4,
        init_vel: Vec3,
        radius: f32,
        density: f32,
        darkness: f32,
        damage: f32,
        fire: bool,
    ) -> Self {
        Self {
            radius,
            init_radius: radius,
            density,
            darkness,
            damage,
            init_vel,
            base_color,
            fire,
        }
    }

    /// 1.0 at birth, falling to 0.0 as the cloud reaches full size.
    pub fn rscale(&self) -> f32 {
        let span = MAX_PART_CLOUD_RAD - self.init_radius;
        if span <= 0.0 {
            return 0.0;
        }
        (1.0 - (self.radius - self.init_radius) / span).clamp(0.0, 1.0)
    }

    pub fn is_fire(&self) -> bool {
        self.fire
    }

    /// Drift and grow; retired once full size is reached.
    pub fn apply_physics<G: GeometryQuery + ?Sized>(&mut self, base: &mut PhysBase, ctx: &mut StepCtx<'_, G>) {
        let dt = ctx.params.dt;
        self.radius += CLOUD_GROWTH_RATE * dt;
        if self.radius >= MAX_PART_CLOUD_RAD
            || (ctx.props.lifetime > 0 && base.time >= ctx.props.lifetime)
        {
            retire(base);
            return;
        }
        let drift = self.init_vel * self.rscale();
        base.pos += drift * dt;
    }

    pub fn draw(&self, pos: Vec3) -> DrawItem {
        let rscale = self.rscale();
        let shade = 1.0 - self.darkness.clamp(0.0, 1.0);
        DrawItem {
            kind: ObjKind::Cloud,
            position: pos,
            radius: self.radius,
            color: Vec4::new(
                self.base_color.x * shade,
                self.base_color.y * shade,
                self.base_color.z * shade,
                self.base_color.w,
            ),
            intensity: self.density * rscale,
            orientation: Vec3::Z,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decal {
    /// Surface the decal is stuck to. Weak; checked every tick.
    pub surface: Option<SurfaceHandle>,
    pub radius: f32,
    pub alpha: f32,
    pub init_alpha: f32,
    pub color: Vec4,
    pub orient: Vec3,
}

impl Decal {
    pub fn generate(radius: f32, orient: Vec3, surface: Option<SurfaceHandle>, alpha: f32, color: Vec4) -> Self {
        Self {
            surface,
            radius,
            alpha,
            init_alpha: alpha,
            color,
            orient,
        }
    }

    /// Follow the owning surface; die with it. Fades over the type's lifetime.
    pub fn apply_physics<G: GeometryQuery + ?Sized>(&mut self, base: &mut PhysBase, ctx: &mut StepCtx<'_, G>) {
        if let Some(h) = self.surface {
            if !ctx.geom.is_live(h) {
                log::debug!("decal lost surface {}", h.id);
                self.surface = None;
                retire(base);
                return;
            }
            base.pos += ctx.geom.platform_delta(h);
        }
        let lifetime = ctx.props.lifetime;
        if lifetime > 0 {
            self.alpha = self.init_alpha * (1.0 - base.time as f32 / lifetime as f32);
            if self.alpha <= 0.0 {
                retire(base);
            }
        }
    }

    pub fn draw(&self, pos: Vec3) -> DrawItem {
        DrawItem {
            kind: ObjKind::Decal,
            position: pos,
            radius: self.radius,
            color: self.color,
            intensity: self.alpha.clamp(0.0, 1.0),
            orientation: self.orient,
        }
    }
}
