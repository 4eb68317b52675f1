//! Pooled record: shared base (position, time, status) plus a body variant
//! selected by the stored kind tag.

use glam::Vec3;

use crate::api::{GeometryQuery, Poolable};
use crate::config::ObjTypeProps;
use crate::effects::{Bubble, Decal, Fire, ParticleCloud, Spark};
use crate::error::PhysError;
use crate::flags::TypeFlags;
use crate::object::DynObject;
use crate::pool::Recyclable;
use crate::types::*;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhysBase {
    pub pos: Vec3,
    pub time: i32,
    pub status: SlotStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjBody {
    Dynamic(DynObject),
    Spark(Spark),
    Bubble(Bubble),
    Fire(Fire),
    Cloud(ParticleCloud),
    Decal(Decal),
}

impl ObjBody {
    pub fn empty(kind: ObjKind) -> Self {
        match kind {
            ObjKind::Dynamic => ObjBody::Dynamic(DynObject::default()),
            ObjKind::Spark => ObjBody::Spark(Spark::default()),
            ObjKind::Bubble => ObjBody::Bubble(Bubble::default()),
            ObjKind::Fire => ObjBody::Fire(Fire::default()),
            ObjKind::Cloud => ObjBody::Cloud(ParticleCloud::default()),
            ObjKind::Decal => ObjBody::Decal(Decal::default()),
        }
    }

    pub fn kind(&self) -> ObjKind {
        match self {
            ObjBody::Dynamic(_) => ObjKind::Dynamic,
            ObjBody::Spark(_) => ObjKind::Spark,
            ObjBody::Bubble(_) => ObjKind::Bubble,
            ObjBody::Fire(_) => ObjKind::Fire,
            ObjBody::Cloud(_) => ObjKind::Cloud,
            ObjBody::Decal(_) => ObjKind::Decal,
        }
    }
}

/// Tick constants shared by every group.
#[derive(Copy, Clone, Debug)]
pub struct SimParams {
    pub dt: f32,
    pub gravity: f32,
    pub water_damping: f32,
    pub max_substeps: u32,
}

/// Everything one object's physics hook may read or emit during a tick.
pub struct StepCtx<'a, G: GeometryQuery + ?Sized> {
    pub geom: &'a G,
    pub params: SimParams,
    pub props: &'a ObjTypeProps,
    pub type_flags: TypeFlags,
    pub group: u16,
    /// Group's configured object type, reported in events.
    pub obj_type: u16,
    pub events: &'a mut Vec<WorldEvent>,
    pub scratch: &'a mut Vec<SurfaceHandle>,
}

impl<G: GeometryQuery + ?Sized> StepCtx<'_, G> {
    pub fn id(&self, index: usize) -> ObjectId {
        ObjectId {
            group: self.group,
            index: index as u32,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimObject {
    pub base: PhysBase,
    pub body: ObjBody,
}

impl SimObject {
    pub fn empty(kind: ObjKind) -> Self {
        Self {
            base: PhysBase::default(),
            body: ObjBody::empty(kind),
        }
    }

    pub fn kind(&self) -> ObjKind {
        self.body.kind()
    }

    pub fn pos(&self) -> Vec3 {
        self.base.pos
    }

    pub fn as_dynamic(&self) -> Option<&DynObject> {
        match &self.body {
            ObjBody::Dynamic(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dynamic_mut(&mut self) -> Option<&mut DynObject> {
        match &mut self.body {
            ObjBody::Dynamic(d) => Some(d),
            _ => None,
        }
    }

    /// Put a freshly allocated slot at `pos` with the given body.
    pub fn init(&mut self, pos: Vec3, body: ObjBody) {
        debug_assert_eq!(self.kind(), body.kind());
        self.base.pos = pos;
        self.body = body;
    }

    /// Per-tick physics hook, dispatched on the body variant.
    pub fn apply_physics<G: GeometryQuery + ?Sized>(
        &mut self,
        index: usize,
        ctx: &mut StepCtx<'_, G>,
        allow_motionless: bool,
        iter: u32,
    ) -> Result<(), PhysError> {
        if self.base.status != SlotStatus::Alive {
            return Ok(());
        }
        let base = &mut self.base;
        match &mut self.body {
            ObjBody::Dynamic(d) => d.advance(base, ctx, allow_motionless, iter, index).map(|_| ()),
            ObjBody::Spark(s) => {
                s.apply_physics(base, ctx);
                Ok(())
            }
            ObjBody::Bubble(b) => {
                b.apply_physics(base, ctx);
                Ok(())
            }
            ObjBody::Fire(f) => {
                f.apply_physics(base, ctx, index);
                Ok(())
            }
            ObjBody::Cloud(c) => {
                c.apply_physics(base, ctx);
                Ok(())
            }
            ObjBody::Decal(d) => {
                d.apply_physics(base, ctx);
                Ok(())
            }
        }
    }

    /// Render data for a live object; `None` for dead or reserved slots.
    pub fn draw(&self, props: &ObjTypeProps) -> Option<DrawItem> {
        if self.base.status != SlotStatus::Alive {
            return None;
        }
        let pos = self.base.pos;
        Some(match &self.body {
            ObjBody::Dynamic(d) => d.draw(pos, props),
            ObjBody::Spark(s) => s.draw(pos),
            ObjBody::Bubble(b) => b.draw(pos),
            ObjBody::Fire(f) => f.draw(pos),
            ObjBody::Cloud(c) => c.draw(pos),
            ObjBody::Decal(d) => d.draw(pos),
        })
    }
}

impl Poolable for SimObject {
    fn status(&self) -> SlotStatus {
        self.base.status
    }

    fn time(&self) -> i32 {
        self.base.time
    }
}

impl Recyclable for SimObject {
    fn activate(&mut self) {
        let kind = self.kind();
        self.base = PhysBase {
            pos: Vec3::ZERO,
            time: 0,
            status: SlotStatus::Alive,
        };
        self.body = ObjBody::empty(kind);
        if let ObjBody::Dynamic(d) = &mut self.body {
            d.motion = MotionState::Flying;
        }
    }

    fn deactivate(&mut self) {
        self.base.status = SlotStatus::Dead;
        self.base.time = 0;
        if let ObjBody::Dynamic(d) = &mut self.body {
            d.disable();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_keeps_kind_and_resets() {
        let mut o = SimObject::empty(ObjKind::Fire);
        o.base.time = 40;
        o.activate();
        assert_eq!(o.kind(), ObjKind::Fire);
        assert_eq!(o.base.status, SlotStatus::Alive);
        assert_eq!(o.base.time, 0);
        o.deactivate();
        assert!(o.is_dead());
    }

    #[test]
    fn test_dead_slot_never_draws() {
        let o = SimObject::empty(ObjKind::Spark);
        assert!(o.draw(&ObjTypeProps::default()).is_none());
    }

    #[test]
    fn test_deactivate_zeroes_dynamic_health() {
        let mut o = SimObject::empty(ObjKind::Dynamic);
        o.activate();
        if let Some(d) = o.as_dynamic_mut() {
            d.health = 50.0;
        }
        o.deactivate();
        assert_eq!(o.as_dynamic().unwrap().health, 0.0);
        assert_eq!(o.as_dynamic().unwrap().motion, MotionState::Inactive);
    }
}
