use std::collections::HashMap;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flags::{TypeFlag, TypeFlags};
use crate::types::ObjKind;

/// Physical properties shared by every object of one type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjTypeProps {
    pub radius: f32,
    pub mass: f32,
    /// Bounce coefficient in [0, 1]; multiplied with the surface's.
    pub elasticity: f32,
    pub gravity_scale: f32,
    /// Fraction of velocity lost per second to drag.
    pub air_factor: f32,
    /// Fraction of tangential velocity lost per second while sliding.
    pub friction: f32,
    pub terminal_vel: f32,
    pub health: f32,
    /// Impact speed above which excess kinetic energy becomes damage.
    pub damage_threshold: f32,
    pub deform: f32,
    pub deform_recover: f32,
    /// Ticks an effect lives; 0 means unbounded.
    pub lifetime: i32,
    /// Extra height a player-controlled object may step onto.
    pub step_height: f32,
    pub color: Vec4,
    pub flags: Vec<TypeFlag>,
}

impl Default for ObjTypeProps {
    fn default() -> Self {
        Self {
            radius: 0.1,
            mass: 1.0,
            elasticity: 0.5,
            gravity_scale: 1.0,
            air_factor: 0.0,
            friction: 2.0,
            terminal_vel: 50.0,
            health: 100.0,
            damage_threshold: 20.0,
            deform: 0.0,
            deform_recover: 0.0,
            lifetime: 0,
            step_height: 0.0,
            color: Vec4::ONE,
            flags: Vec::new(),
        }
    }
}

impl ObjTypeProps {
    pub fn type_flags(&self) -> TypeFlags {
        TypeFlags::from_tags(&self.flags)
    }
}

/// A fixed spawn location that regenerates its object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredefConfig {
    pub pos: Vec3,
    #[serde(default)]
    pub obj_type: u16,
    /// Seconds between the representative dying and the next spawn.
    pub regen_time: f32,
}

/// One object group, as recognized in configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub kind: ObjKind,
    pub obj_type: u16,
    pub max_capacity: u32,
    pub initial_live_count: u32,
    pub spawn_rate_per_tick: u32,
    pub start_enabled: bool,
    pub reorderable: bool,
    pub auto_size_from_global_budget: bool,
    pub props: ObjTypeProps,
    pub predefined: Vec<PredefConfig>,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ObjKind::Dynamic,
            obj_type: 0,
            max_capacity: 64,
            initial_live_count: 0,
            spawn_rate_per_tick: 0,
            start_enabled: true,
            reorderable: true,
            auto_size_from_global_budget: false,
            props: ObjTypeProps::default(),
            predefined: Vec::new(),
        }
    }
}

impl GroupConfig {
    pub fn new(name: &str, kind: ObjKind, max_capacity: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            max_capacity,
            ..Default::default()
        }
    }

    /// Capacity after applying the global per-type budget, if enabled.
    pub fn effective_capacity(&self, global_budget: &HashMap<String, u32>) -> u32 {
        if self.auto_size_from_global_budget {
            if let Some(&budget) = global_budget.get(&self.name) {
                return budget.max(self.initial_live_count).max(1);
            }
        }
        self.max_capacity
    }

    fn validate(&self, global_budget: &HashMap<String, u32>) -> Result<(), ConfigError> {
        let capacity = self.effective_capacity(global_budget);
        if capacity == 0 {
            return Err(ConfigError::Invalid(format!("group '{}' has zero capacity", self.name)));
        }
        if self.initial_live_count > capacity {
            return Err(ConfigError::Invalid(format!(
                "group '{}' starts {} objects but holds {}",
                self.name, self.initial_live_count, capacity
            )));
        }
        if !(self.props.radius > 0.0) {
            return Err(ConfigError::Invalid(format!("group '{}' radius must be > 0", self.name)));
        }
        if !(0.0..=1.0).contains(&self.props.elasticity) {
            return Err(ConfigError::Invalid(format!(
                "group '{}' elasticity {} outside [0, 1]",
                self.name, self.props.elasticity
            )));
        }
        Ok(())
    }
}

/// World-level simulation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds per tick.
    pub dt: f32,
    /// Downward acceleration along -z.
    pub gravity: f32,
    pub seed: u64,
    /// Bounds for spawns that have no predefined slot.
    pub spawn_min: Vec3,
    pub spawn_max: Vec3,
    /// Velocity multiplier applied on water entry.
    pub water_damping: f32,
    /// Safety cap on sub-steps per advance.
    pub max_substeps: u32,
    /// Record wall-clock timings for each tick.
    pub enable_timing: bool,
    /// Per-type capacity budget, keyed by group name.
    pub global_budget: HashMap<String, u32>,
    pub groups: Vec<GroupConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: 9.81,
            seed: 0x5eed,
            spawn_min: Vec3::new(-10.0, -10.0, 5.0),
            spawn_max: Vec3::new(10.0, 10.0, 10.0),
            water_damping: 0.5,
            max_substeps: 512,
            enable_timing: false,
            global_budget: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: SimConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0) {
            return Err(ConfigError::Invalid(format!("dt must be > 0, got {}", self.dt)));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid("max_substeps must be > 0".to_string()));
        }
        if !self.spawn_min.cmple(self.spawn_max).all() {
            return Err(ConfigError::Invalid(format!(
                "spawn_min {:?} exceeds spawn_max {:?}",
                self.spawn_min, self.spawn_max
            )));
        }
        if self.groups.len() > u16::MAX as usize {
            return Err(ConfigError::Invalid("too many groups".to_string()));
        }
        for g in &self.groups {
            g.validate(&self.global_budget)?;
        }
        Ok(())
    }
}
