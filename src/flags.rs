//! Named capability/state bits backed by a primitive integer.
//!
//! Each flag enum's discriminant is its bit index, so combining flags keeps the
//! usual bitwise semantics without magic constants at the call sites.

use std::ops::{BitAnd, BitOr};

use num_traits::{One, PrimInt, Zero};

/// Implemented by flag enums. `bit_index()` must be below the bit width of `Storage`.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Union of the masks of `tags`; zero for an empty slice.
fn union_mask<U: FlagBitmask + Copy>(tags: &[U]) -> U::Storage {
    tags.iter().fold(U::Storage::zero(), |acc, t| acc | t.mask())
}

/// Bit-set over one flag enum.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub fn empty() -> Self {
        Self { bits: T::zero() }
    }

    pub fn from_tags<U: FlagBitmask<Storage = T> + Copy>(tags: &[U]) -> Self {
        Self { bits: union_mask(tags) }
    }

    pub fn set<U: FlagBitmask<Storage = T>>(&mut self, tag: U, on: bool) {
        let m = tag.mask();
        self.bits = if on { self.bits | m } else { self.bits & !m };
    }

    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, tag: U) {
        self.set(tag, true);
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, tag: U) {
        self.set(tag, false);
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, tag: U) -> bool {
        !(self.bits & tag.mask()).is_zero()
    }

    pub fn add_many<U: FlagBitmask<Storage = T> + Copy>(&mut self, tags: &[U]) {
        self.bits = self.bits | union_mask(tags);
    }

    pub fn remove_many<U: FlagBitmask<Storage = T> + Copy>(&mut self, tags: &[U]) {
        self.bits = self.bits & !union_mask(tags);
    }

    pub fn has_all<U: FlagBitmask<Storage = T> + Copy>(&self, tags: &[U]) -> bool {
        let m = union_mask(tags);
        self.bits & m == m
    }

    pub fn has_any<U: FlagBitmask<Storage = T> + Copy>(&self, tags: &[U]) -> bool {
        !(self.bits & union_mask(tags)).is_zero()
    }
}

impl<T: PrimInt> BitOr for BitmaskFlags<T> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self { bits: self.bits | rhs.bits }
    }
}

impl<T: PrimInt> BitAnd for BitmaskFlags<T> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self { bits: self.bits & rhs.bits }
    }
}

/// Declare a flag enum with explicit bit indices and implement `FlagBitmask` for it.
#[macro_export]
macro_rules! define_bitmask_flags {
    ($(#[$meta:meta])* $name:ident, $storage:ty, { $($(#[$vmeta:meta])* $variant:ident = $bit:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $bit),*
        }

        impl $crate::flags::FlagBitmask for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

define_bitmask_flags!(
    /// Per-object state bits.
    ObjFlag, u16, {
    XyStopped = 0,
    ZStopped = 2,
    /// In water with the top of the sphere above the surface.
    Floating = 3,
    Underwater = 4,
    InWater = 6,
    Collided = 11,
    PlatformColl = 12,
    WasPushed = 14,
});

define_bitmask_flags!(
    /// Per-type capability bits, read from configuration.
    TypeFlag, u32, {
    NoFall = 5,
    ObjRolls = 9,
    Deformable = 10,
    ObjExplodes = 12,
    ExplOnColl = 13,
    CollDestroys = 14,
    IsPrecip = 15,
    /// Hard water entry does no damage.
    NoWaterDamage = 16,
    ObjIsFlat = 17,
    PlayerControlled = 19,
    LeavesDecal = 20,
});

define_bitmask_flags!(
    /// Per-group bookkeeping bits.
    GroupFlag, u8, {
    JustInit = 0,
    WasAdvanced = 1,
    Precipitation = 2,
});

pub type ObjFlags = BitmaskFlags<u16>;
pub type TypeFlags = BitmaskFlags<u32>;
pub type GroupFlags = BitmaskFlags<u8>;

impl ObjFlags {
    pub fn is_stopped(&self) -> bool {
        self.has_all(&[ObjFlag::XyStopped, ObjFlag::ZStopped])
    }

    pub fn in_water(&self) -> bool {
        self.has(ObjFlag::InWater)
    }

    pub fn is_submerged(&self) -> bool {
        self.has(ObjFlag::Underwater)
    }
}

impl TypeFlags {
    pub fn player_controlled(&self) -> bool {
        self.has(TypeFlag::PlayerControlled)
    }

    pub fn destroyed_by_collision(&self) -> bool {
        self.has_any(&[TypeFlag::CollDestroys, TypeFlag::ExplOnColl])
    }

    /// Destruction of this type blasts nearby objects.
    pub fn explodes(&self) -> bool {
        self.has_any(&[TypeFlag::ObjExplodes, TypeFlag::ExplOnColl])
    }
}
