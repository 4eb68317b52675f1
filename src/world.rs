use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::collections::HashMap;
use std::time::Instant;

use crate::api::GeometryQuery;
use crate::config::SimConfig;
use crate::effects::{Bubble, Decal, Fire, ParticleCloud, Spark};
use crate::error::PhysError;
use crate::group::ObjGroup;
use crate::record::{ObjBody, SimParams};
use crate::types::*;

/// Bubbles released when an object drops into water.
const SPLASH_BUBBLES: usize = 3;
const BUBBLE_RISE_SPEED: f32 = 1.0;
/// Decals sit this far off their surface to avoid z-fighting.
const DECAL_OFFSET: f32 = 0.001;
/// Blast applied when an exploding type is destroyed.
const BLAST_RADIUS: f32 = 2.0;
const BLAST_STRENGTH: f32 = 8.0;

/// Owns every object group for one loaded world. Build with `load`, drive with
/// `tick`, tear down with `unload`.
pub struct SimWorld {
    pub cfg: SimConfig,
    pub frame_counter: u32,

    groups: Vec<ObjGroup>,
    by_name: HashMap<String, u16>,

    // Event buffer, drained by the caller between ticks.
    events: Vec<WorldEvent>,
    // Broad-phase scratch shared by all groups.
    scratch: Vec<SurfaceHandle>,
    rng: StdRng,

    last_timing: Option<WorldTiming>,
}

impl SimWorld {
    pub fn load(cfg: SimConfig) -> Result<Self, PhysError> {
        cfg.validate()?;
        let mut groups = Vec::with_capacity(cfg.groups.len());
        let mut by_name = HashMap::new();
        for (i, gc) in cfg.groups.iter().enumerate() {
            let id = i as u16;
            groups.push(ObjGroup::create(id, gc, &cfg)?);
            if by_name.insert(gc.name.clone(), id).is_some() {
                log::warn!("duplicate group name '{}'; lookups resolve to the last", gc.name);
            }
        }
        let total: usize = groups.iter().map(|g| g.capacity()).sum();
        log::info!("world loaded: {} groups, {} slots", groups.len(), total);
        Ok(Self {
            rng: StdRng::seed_from_u64(cfg.seed),
            cfg,
            frame_counter: 0,
            groups,
            by_name,
            events: Vec::new(),
            scratch: Vec::new(),
            last_timing: None,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, PhysError> {
        Self::load(SimConfig::from_json(json)?)
    }

    /// Kill every object and drop pending events. Groups and capacity stay.
    pub fn unload(&mut self) {
        for g in &mut self.groups {
            g.clear();
        }
        self.events.clear();
        self.last_timing = None;
        log::info!("world unloaded after {} ticks", self.frame_counter);
        self.frame_counter = 0;
    }

    fn params(&self) -> SimParams {
        SimParams {
            dt: self.cfg.dt,
            gravity: self.cfg.gravity,
            water_damping: self.cfg.water_damping,
            max_substeps: self.cfg.max_substeps,
        }
    }

    /// Advance every enabled group once against read-only geometry, then run
    /// world reactions to this tick's events. All groups are ticked even if one
    /// reports an error; the first error is returned.
    pub fn tick<G: GeometryQuery + ?Sized>(&mut self, geom: &G) -> Result<TickStats, PhysError> {
        let t_all = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        let params = self.params();
        let first_new = self.events.len();
        let mut stats = TickStats::default();
        let mut first_err = None;

        for g in &mut self.groups {
            match g.tick(geom, params, &mut self.events, &mut self.scratch) {
                Ok(s) => stats += s,
                Err(e) => {
                    log::error!("group '{}' tick failed: {}", g.name(), e);
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        let groups_ms = t_all.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let t_react = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        if let Err(e) = self.react(first_new) {
            log::error!("world reactions failed: {}", e);
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
        let reactions_ms = t_react.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        self.frame_counter = self.frame_counter.wrapping_add(1);
        if let Some(t_all) = t_all {
            self.last_timing = Some(WorldTiming {
                tick_ms: t_all.elapsed().as_secs_f64() * 1000.0,
                groups_ms,
                reactions_ms,
            });
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Splash bubbles on water entry, decals where decal-leaving types hit,
    /// pushes around explosions.
    fn react(&mut self, from: usize) -> Result<(), PhysError> {
        for k in from..self.events.len() {
            let ev = self.events[k];
            match ev {
                WorldEvent::EnteredWater { position, .. } => {
                    for _ in 0..SPLASH_BUBBLES {
                        let jitter = Vec3::new(
                            self.rng.random_range(-0.05..=0.05),
                            self.rng.random_range(-0.05..=0.05),
                            self.rng.random_range(-0.1..=0.0),
                        );
                        let radius = self.rng.random_range(0.005..=0.02);
                        self.gen_bubble(position + jitter, radius, Vec4::new(0.8, 0.9, 1.0, 0.5))?;
                    }
                }
                WorldEvent::Impact { position, normal, surface, leaves_decal: true, .. } => {
                    let Some(ix) = self.first_group(ObjKind::Decal) else { continue };
                    let props = self.groups[ix].props();
                    let (radius, color) = (props.radius, props.color);
                    self.gen_decal(position + normal * DECAL_OFFSET, radius, normal, Some(surface), 1.0, color)?;
                }
                WorldEvent::Exploded { position, .. } => {
                    self.apply_explosion(position, BLAST_RADIUS, BLAST_STRENGTH);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Events emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, WorldEvent> {
        self.events.drain(..)
    }

    pub fn draw(&self, out: &mut Vec<DrawItem>) {
        for g in &self.groups {
            if g.is_enabled() {
                g.draw(out);
            }
        }
    }

    pub fn groups(&self) -> &[ObjGroup] {
        &self.groups
    }

    pub fn group(&self, id: u16) -> Option<&ObjGroup> {
        self.groups.get(id as usize)
    }

    pub fn group_mut(&mut self, id: u16) -> Option<&mut ObjGroup> {
        self.groups.get_mut(id as usize)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&ObjGroup> {
        self.by_name.get(name).and_then(|&id| self.group(id))
    }

    pub fn group_by_name_mut(&mut self, name: &str) -> Option<&mut ObjGroup> {
        let id = *self.by_name.get(name)?;
        self.group_mut(id)
    }

    pub fn timing(&self) -> Option<WorldTiming> {
        self.last_timing
    }

    fn first_group(&self, kind: ObjKind) -> Option<usize> {
        self.groups.iter().position(|g| g.kind() == kind && g.is_enabled())
    }

    /// Spawn into the first enabled group of the body's kind. `None` if there
    /// is no such group.
    fn spawn(&mut self, pos: Vec3, body: ObjBody) -> Result<Option<ObjectId>, PhysError> {
        let Some(ix) = self.first_group(body.kind()) else {
            log::debug!("no enabled {:?} group; spawn dropped", body.kind());
            return Ok(None);
        };
        let g = &mut self.groups[ix];
        Ok(g.spawn(pos, body)?.map(|index| ObjectId {
            group: g.id(),
            index: index as u32,
        }))
    }

    pub fn gen_spark(&mut self, pos: Vec3, velocity: Vec3, color: Vec4, size: f32) -> Result<Option<ObjectId>, PhysError> {
        self.spawn(pos, ObjBody::Spark(Spark::generate(color, size, velocity)))
    }

    pub fn gen_bubble(&mut self, pos: Vec3, radius: f32, color: Vec4) -> Result<Option<ObjectId>, PhysError> {
        let speed = BUBBLE_RISE_SPEED * self.rng.random_range(0.8..=1.2);
        self.spawn(pos, ObjBody::Bubble(Bubble::generate(radius, speed, color)))
    }

    pub fn gen_fire(
        &mut self,
        pos: Vec3,
        size: f32,
        intensity: f32,
        source: i16,
        is_static: bool,
    ) -> Result<Option<ObjectId>, PhysError> {
        self.spawn(pos, ObjBody::Fire(Fire::generate(size, intensity, source, is_static)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn gen_cloud(
        &mut self,
        pos: Vec3,
        color: Vec4,
        init_vel: Vec3,
        radius: f32,
        density: f32,
        darkness: f32,
        damage: f32,
        fire: bool,
    ) -> Result<Option<ObjectId>, PhysError> {
        let cloud = ParticleCloud::generate(color, init_vel, radius, density, darkness, damage, fire);
        self.spawn(pos, ObjBody::Cloud(cloud))
    }

    pub fn gen_decal(
        &mut self,
        pos: Vec3,
        radius: f32,
        orient: Vec3,
        surface: Option<SurfaceHandle>,
        alpha: f32,
        color: Vec4,
    ) -> Result<Option<ObjectId>, PhysError> {
        self.spawn(pos, ObjBody::Decal(Decal::generate(radius, orient, surface, alpha, color)))
    }

    /// Push dynamic objects within `radius` of `center` away from it, with
    /// linear falloff. Returns how many objects were pushed.
    pub fn apply_explosion(&mut self, center: Vec3, radius: f32, strength: f32) -> usize {
        if !(radius > 0.0) {
            return 0;
        }
        let mut pushed = 0;
        for g in self.groups.iter_mut().filter(|g| g.is_enabled() && g.kind() == ObjKind::Dynamic) {
            for (_, obj) in g.live_mut() {
                let offset = obj.pos() - center;
                let dist = offset.length();
                if dist >= radius {
                    continue;
                }
                let dir = offset.try_normalize().unwrap_or(Vec3::Z);
                if let Some(d) = obj.as_dynamic_mut() {
                    d.apply_impulse(dir * strength * (1.0 - dist / radius));
                    pushed += 1;
                }
            }
        }
        log::debug!("explosion at {:?} pushed {} objects", center, pushed);
        pushed
    }
}
