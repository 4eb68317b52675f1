//! A named group of same-kind objects backed by one pooled store.

use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::{GeometryQuery, Poolable};
use crate::config::{GroupConfig, ObjTypeProps, SimConfig};
use crate::effects::{Bubble, Decal, Fire, ParticleCloud, Spark};
use crate::error::PhysError;
use crate::flags::{GroupFlag, GroupFlags, TypeFlag, TypeFlags};
use crate::object::DynObject;
use crate::pool::{ObjStore, Recyclable};
use crate::record::{ObjBody, SimObject, SimParams, StepCtx};
use crate::types::*;

/// Fixed spawn location. `obj_used` is the slot of the object it last spawned;
/// it is only trusted while that slot is still alive.
#[derive(Clone, Debug, PartialEq)]
pub struct PredefSlot {
    pub pos: Vec3,
    pub obj_type: u16,
    pub obj_used: Option<usize>,
    /// Seconds between losing the representative and respawning it.
    pub regen_time: f32,
    pub cur_time: f32,
}

impl PredefSlot {
    pub fn new(pos: Vec3, obj_type: u16, regen_time: f32) -> Self {
        Self {
            pos,
            obj_type,
            obj_used: None,
            regen_time,
            cur_time: 0.0,
        }
    }
}

pub struct ObjGroup {
    id: u16,
    name: String,
    kind: ObjKind,
    obj_type: u16,
    props: ObjTypeProps,
    type_flags: TypeFlags,
    pub flags: GroupFlags,
    store: ObjStore<SimObject>,
    predef: Vec<PredefSlot>,
    enabled: bool,
    reorderable: bool,
    spawn_rate: u32,
    spawn_min: Vec3,
    spawn_max: Vec3,
    rng: StdRng,
    chosen: Vec<usize>,
}

impl ObjGroup {
    /// Build the store, size it from the global budget when asked, and bring
    /// `initial_live_count` objects to life at random spawn positions.
    pub fn create(id: u16, cfg: &GroupConfig, sim: &SimConfig) -> Result<Self, PhysError> {
        let capacity = cfg.effective_capacity(&sim.global_budget) as usize;
        let initial = cfg.initial_live_count as usize;
        if initial > capacity {
            return Err(PhysError::CapacityExceeded { requested: initial, capacity });
        }
        let type_flags = cfg.props.type_flags();
        let mut flags = GroupFlags::from_tags(&[GroupFlag::JustInit]);
        flags.set(GroupFlag::Precipitation, type_flags.has(TypeFlag::IsPrecip));

        let mut group = Self {
            id,
            name: cfg.name.clone(),
            kind: cfg.kind,
            obj_type: cfg.obj_type,
            props: cfg.props.clone(),
            type_flags,
            flags,
            store: ObjStore::new(capacity, SimObject::empty(cfg.kind)),
            predef: cfg
                .predefined
                .iter()
                .map(|p| PredefSlot::new(p.pos, p.obj_type, p.regen_time))
                .collect(),
            enabled: cfg.start_enabled,
            reorderable: cfg.reorderable,
            spawn_rate: cfg.spawn_rate_per_tick,
            spawn_min: sim.spawn_min,
            spawn_max: sim.spawn_max,
            rng: StdRng::seed_from_u64(sim.seed ^ ((id as u64) << 32)),
            chosen: Vec::with_capacity(capacity),
        };
        group.init_objects(initial)?;
        log::info!(
            "created group {} '{}' ({:?}): capacity {}, {} live, {} predefined",
            id,
            group.name,
            group.kind,
            capacity,
            initial,
            group.predef.len()
        );
        Ok(group)
    }

    /// Reorderable groups take whatever slots the store picks; fixed-order
    /// groups fill from index 0 so early objects keep stable indices.
    fn init_objects(&mut self, count: usize) -> Result<(), PhysError> {
        let mut chosen = std::mem::take(&mut self.chosen);
        if self.reorderable {
            self.store.choose_elements(&mut chosen, count)?;
        } else {
            chosen.clear();
            chosen.extend(0..count);
        }
        for &ix in &chosen {
            let pos = self.random_spawn_pos();
            let body = self.fresh_body(self.obj_type, Vec3::ZERO);
            let obj = self.store.get_mut(ix)?;
            obj.activate();
            obj.init(pos, body);
        }
        self.chosen = chosen;
        Ok(())
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjKind {
        self.kind
    }

    pub fn props(&self) -> &ObjTypeProps {
        &self.props
    }

    pub fn type_flags(&self) -> TypeFlags {
        self.type_flags
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn live_count(&self) -> usize {
        self.store.live_count()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_reorderable(&self) -> bool {
        self.reorderable
    }

    pub fn spawn_rate(&self) -> u32 {
        self.spawn_rate
    }

    /// Live objects keep their state while disabled; tick just skips them.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_enable(&mut self, enabled: bool) {
        if enabled { self.enable() } else { self.disable() }
    }

    /// Scale the per-tick spawn rate, clamped to `[min_rate, max_rate]`.
    pub fn update_spawn_rate(&mut self, scale: f32, min_rate: u32, max_rate: u32) {
        let scaled = (self.spawn_rate as f32 * scale.max(0.0)).round() as u32;
        self.spawn_rate = scaled.clamp(min_rate, max_rate.max(min_rate));
    }

    pub fn choose_object(&mut self, peek: bool) -> Result<usize, PhysError> {
        self.store.choose_element(peek)
    }

    pub fn get_obj(&self, index: usize) -> Result<&SimObject, PhysError> {
        if !self.enabled {
            log::error!("group '{}': access to object {} while disabled", self.name, index);
            return Err(PhysError::OutOfRange { index, len: 0 });
        }
        self.store.get(index).inspect_err(|e| log::error!("group '{}': {}", self.name, e))
    }

    pub fn get_obj_mut(&mut self, index: usize) -> Result<&mut SimObject, PhysError> {
        if !self.enabled {
            log::error!("group '{}': access to object {} while disabled", self.name, index);
            return Err(PhysError::OutOfRange { index, len: 0 });
        }
        let name = &self.name;
        self.store.get_mut(index).inspect_err(|e| log::error!("group '{}': {}", name, e))
    }

    /// Whether live object `index` is within `dist` of `pos`.
    pub fn obj_within_dist(&self, index: usize, pos: Vec3, dist: f32) -> bool {
        self.store
            .get(index)
            .is_ok_and(|o| o.is_alive() && o.pos().distance_squared(pos) <= dist * dist)
    }

    /// Grow the store. Shrinking would drop live objects and is ignored.
    pub fn resize(&mut self, new_capacity: usize) {
        let cap = self.store.capacity();
        if new_capacity < cap {
            log::warn!("group '{}': ignoring shrink from {} to {}", self.name, cap, new_capacity);
            return;
        }
        if new_capacity > cap {
            self.store.grow(new_capacity, SimObject::empty(self.kind));
            log::info!("group '{}' resized {} -> {}", self.name, cap, new_capacity);
        }
    }

    pub fn add_predef(&mut self, pos: Vec3, obj_type: u16, regen_time: f32) {
        self.predef.push(PredefSlot::new(pos, obj_type, regen_time));
    }

    pub fn predef_slots(&self) -> &[PredefSlot] {
        &self.predef
    }

    /// Move every live object and predefined slot by `delta`.
    pub fn shift(&mut self, delta: Vec3) {
        self.store.for_each_live_mut(|_, o| o.base.pos += delta);
        for p in &mut self.predef {
            p.pos += delta;
        }
    }

    /// Body a fresh spawn of this group's kind starts with.
    fn fresh_body(&self, obj_type: u16, velocity: Vec3) -> ObjBody {
        let p = &self.props;
        match self.kind {
            ObjKind::Dynamic => ObjBody::Dynamic(DynObject::generate(obj_type, velocity, p)),
            ObjKind::Spark => ObjBody::Spark(Spark::generate(p.color, p.radius, velocity)),
            ObjKind::Bubble => ObjBody::Bubble(Bubble::generate(p.radius, 1.0, p.color)),
            ObjKind::Fire => ObjBody::Fire(Fire::generate(p.radius, 1.0, -1, false)),
            ObjKind::Cloud => ObjBody::Cloud(ParticleCloud::generate(
                p.color,
                velocity,
                p.radius,
                1.0,
                0.0,
                0.0,
                false,
            )),
            ObjKind::Decal => ObjBody::Decal(Decal::generate(p.radius, Vec3::Z, None, 1.0, Vec4::ONE)),
        }
    }

    fn random_spawn_pos(&mut self) -> Vec3 {
        let (lo, hi) = (self.spawn_min, self.spawn_max);
        Vec3::new(
            self.rng.random_range(lo.x..=hi.x),
            self.rng.random_range(lo.y..=hi.y),
            self.rng.random_range(lo.z..=hi.z),
        )
    }

    /// Place `body` in a chosen slot at `pos`. A stale live occupant is evicted.
    /// Disabled groups ignore the request.
    pub fn spawn(&mut self, pos: Vec3, body: ObjBody) -> Result<Option<usize>, PhysError> {
        if !self.enabled {
            return Ok(None);
        }
        if body.kind() != self.kind {
            log::warn!("group '{}' holds {:?}, not {:?}", self.name, self.kind, body.kind());
            return Ok(None);
        }
        let ix = self.store.allocate()?;
        for p in &mut self.predef {
            if p.obj_used == Some(ix) {
                p.obj_used = None;
            }
        }
        self.store.get_mut(ix)?.init(pos, body);
        Ok(Some(ix))
    }

    /// Spawn a default object of this group's kind.
    pub fn spawn_default(&mut self, pos: Vec3, velocity: Vec3) -> Result<Option<usize>, PhysError> {
        let body = self.fresh_body(self.obj_type, velocity);
        self.spawn(pos, body)
    }

    /// Predefined slots whose countdown has run out go first; any remaining
    /// budget spawns at random positions.
    fn spawn_pending(&mut self, dt: f32) -> Result<usize, PhysError> {
        let mut budget = self.spawn_rate as usize;
        let mut spawned = 0;

        for k in 0..self.predef.len() {
            if let Some(ix) = self.predef[k].obj_used {
                if self.store.get(ix).is_ok_and(|o| o.is_alive()) {
                    continue;
                }
                self.predef[k].obj_used = None;
                self.predef[k].cur_time = 0.0;
            }
            self.predef[k].cur_time += dt;
            if budget == 0 || self.predef[k].cur_time < self.predef[k].regen_time {
                continue;
            }
            let (pos, obj_type) = (self.predef[k].pos, self.predef[k].obj_type);
            let body = self.fresh_body(obj_type, Vec3::ZERO);
            if let Some(ix) = self.spawn(pos, body)? {
                self.predef[k].obj_used = Some(ix);
                self.predef[k].cur_time = 0.0;
                budget -= 1;
                spawned += 1;
            }
        }

        for _ in 0..budget {
            let pos = self.random_spawn_pos();
            if self.spawn_default(pos, Vec3::ZERO)?.is_some() {
                spawned += 1;
            }
        }
        Ok(spawned)
    }

    /// One simulation step for the whole group. Every live object is advanced
    /// even if one fails; the first failure is returned.
    pub fn tick<G: GeometryQuery + ?Sized>(
        &mut self,
        geom: &G,
        params: SimParams,
        events: &mut Vec<WorldEvent>,
        scratch: &mut Vec<SurfaceHandle>,
    ) -> Result<TickStats, PhysError> {
        let mut stats = TickStats::default();
        if !self.enabled {
            return Ok(stats);
        }
        stats.spawned = self.spawn_pending(params.dt)?;

        let allow_motionless = !self.flags.has(GroupFlag::Precipitation);
        let mut ctx = StepCtx {
            geom,
            params,
            props: &self.props,
            type_flags: self.type_flags,
            group: self.id,
            obj_type: self.obj_type,
            events,
            scratch,
        };
        let mut first_err = None;
        for (i, obj) in self.store.iter_mut().enumerate() {
            if !obj.is_alive() {
                continue;
            }
            obj.base.time = obj.base.time.saturating_add(1);
            let res = obj.apply_physics(i, &mut ctx, allow_motionless, 0);
            stats.advanced += 1;
            if let Err(e) = res {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
            if !obj.is_alive() {
                stats.destroyed += 1;
            } else if obj.as_dynamic().is_some_and(|d| d.is_still()) {
                stats.resting += 1;
            }
        }
        self.flags.remove(GroupFlag::JustInit);
        self.flags.add(GroupFlag::WasAdvanced);
        log::trace!("group '{}' tick: {:?}", self.name, stats);

        match first_err {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Live objects with their slot indices.
    pub fn live(&self) -> impl Iterator<Item = (usize, &SimObject)> {
        self.store.iter().enumerate().filter(|(_, o)| o.is_alive())
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = (usize, &mut SimObject)> {
        self.store.iter_mut().enumerate().filter(|(_, o)| o.is_alive())
    }

    pub fn draw(&self, out: &mut Vec<DrawItem>) {
        self.store.for_each_live(|_, o| out.extend(o.draw(&self.props)));
    }

    /// Kill every object, keeping capacity and predefined slots.
    pub fn clear(&mut self) {
        for o in self.store.iter_mut() {
            o.deactivate();
        }
        for p in &mut self.predef {
            p.obj_used = None;
            p.cur_time = 0.0;
        }
    }
}
