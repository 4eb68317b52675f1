//! Fixed-capacity slot array with stalest-occupant reuse.
//!
//! Scanning is always circular from a rotating cursor so bursts of allocations
//! spread over the whole array instead of hammering the low indices.

use crate::api::Poolable;
use crate::error::PhysError;

#[derive(Clone, Debug)]
pub struct ObjStore<T> {
    slots: Vec<T>,
    cursor: usize,
    /// Scratch for batch eviction; keeps `choose_elements` allocation-free once warm.
    by_time: Vec<(i32, usize)>,
}

impl<T: Poolable + Clone> ObjStore<T> {
    /// Build a store of `capacity` copies of `proto` (which should be dead).
    pub fn new(capacity: usize, proto: T) -> Self {
        Self {
            slots: vec![proto; capacity],
            cursor: 0,
            by_time: Vec::with_capacity(capacity),
        }
    }

    /// Append dead slots. Existing slots and the cursor are untouched.
    pub fn grow(&mut self, new_capacity: usize, proto: T) {
        if new_capacity > self.slots.len() {
            self.slots.resize(new_capacity, proto);
            self.by_time.reserve(new_capacity.saturating_sub(self.by_time.len()));
        }
    }
}

impl<T: Poolable> ObjStore<T> {
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn advance_cursor(&mut self) {
        self.cursor += 1;
        if self.cursor == self.slots.len() {
            self.cursor = 0;
        }
    }

    /// Pick a slot: the first dead one in cursor order, otherwise the occupant
    /// with the largest time (ties go to the first met in cursor order).
    /// The cursor moves past the result unless `peek` is set.
    pub fn choose_element(&mut self, peek: bool) -> Result<usize, PhysError> {
        let sz = self.slots.len();
        if sz == 0 {
            return Err(PhysError::CapacityExceeded { requested: 1, capacity: 0 });
        }
        debug_assert!(self.cursor < sz);
        let start = self.cursor;
        let mut chosen = start;

        for i in 0..sz {
            let mut ix = i + start;
            if ix >= sz {
                ix -= sz;
            }
            if self.slots[ix].is_dead() {
                chosen = ix;
                break;
            }
            if self.slots[ix].time() > self.slots[chosen].time() {
                chosen = ix;
            }
        }
        self.cursor = chosen;
        if !peek {
            self.advance_cursor();
        }
        Ok(chosen)
    }

    /// Pick `num` distinct slots into `out` (cleared first). Dead slots are taken in
    /// cursor order; the remainder evicts occupants by descending time, ties by index.
    /// Fails without touching `out` or the cursor when `num` exceeds the capacity.
    pub fn choose_elements(&mut self, out: &mut Vec<usize>, num: usize) -> Result<(), PhysError> {
        let sz = self.slots.len();
        if num > sz {
            return Err(PhysError::CapacityExceeded { requested: num, capacity: sz });
        }
        out.clear();
        if num == 0 {
            return Ok(());
        }
        out.reserve(num);
        let start = self.cursor;
        let mut last_dead = None;

        for i in 0..sz {
            let mut ix = i + start;
            if ix >= sz {
                ix -= sz;
            }
            if !self.slots[ix].is_dead() {
                continue;
            }
            out.push(ix);
            last_dead = Some(ix);
            if out.len() == num {
                break;
            }
        }
        if let Some(ix) = last_dead {
            self.cursor = ix;
            self.advance_cursor();
        }
        if out.len() == num {
            return Ok(());
        }

        let remaining = num - out.len();
        self.by_time.clear();
        self.by_time.extend(
            self.slots
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.is_dead())
                .map(|(i, s)| (s.time(), i)),
        );
        // Stable: equal times keep ascending index order.
        self.by_time.sort_by(|a, b| b.0.cmp(&a.0));
        out.extend(self.by_time.iter().take(remaining).map(|&(_, i)| i));
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&T, PhysError> {
        let len = self.slots.len();
        self.slots.get(index).ok_or(PhysError::OutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, PhysError> {
        let len = self.slots.len();
        self.slots.get_mut(index).ok_or(PhysError::OutOfRange { index, len })
    }

    /// Visit live slots only, in index order.
    pub fn for_each_live(&self, mut visit: impl FnMut(usize, &T)) {
        for (i, s) in self.slots.iter().enumerate() {
            if s.is_alive() {
                visit(i, s);
            }
        }
    }

    pub fn for_each_live_mut(&mut self, mut visit: impl FnMut(usize, &mut T)) {
        for (i, s) in self.slots.iter_mut().enumerate() {
            if s.is_alive() {
                visit(i, s);
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_alive()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}

/// Slot types the store can recycle in place.
pub trait Recyclable: Poolable {
    /// Reset to a fresh live record.
    fn activate(&mut self);

    /// Return to the dead state, zeroing time.
    fn deactivate(&mut self);
}

impl<T: Recyclable> ObjStore<T> {
    /// Choose a slot, recycle it and mark it alive.
    pub fn allocate(&mut self) -> Result<usize, PhysError> {
        let ix = self.choose_element(false)?;
        self.slots[ix].activate();
        Ok(ix)
    }

    pub fn release(&mut self, index: usize) -> Result<(), PhysError> {
        self.get_mut(index)?.deactivate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlotStatus;

    #[derive(Clone, Debug, Default)]
    struct Slot {
        status: SlotStatus,
        time: i32,
    }

    impl Poolable for Slot {
        fn status(&self) -> SlotStatus {
            self.status
        }

        fn time(&self) -> i32 {
            self.time
        }
    }

    impl Recyclable for Slot {
        fn activate(&mut self) {
            self.status = SlotStatus::Alive;
            self.time = 0;
        }

        fn deactivate(&mut self) {
            self.status = SlotStatus::Dead;
            self.time = 0;
        }
    }

    fn store_with_times(times: &[Option<i32>]) -> ObjStore<Slot> {
        let mut s = ObjStore::new(times.len(), Slot::default());
        for (slot, t) in s.iter_mut().zip(times) {
            if let Some(t) = t {
                slot.status = SlotStatus::Alive;
                slot.time = *t;
            }
        }
        s
    }

    #[test]
    fn test_allocate_walks_cursor() {
        let mut s = ObjStore::new(4, Slot::default());
        assert_eq!(s.allocate().unwrap(), 0);
        assert_eq!(s.allocate().unwrap(), 1);
        s.release(0).unwrap();
        // Cursor is at 2; dead slot 2 comes before the released slot 0.
        assert_eq!(s.allocate().unwrap(), 2);
        assert_eq!(s.allocate().unwrap(), 3);
        assert_eq!(s.allocate().unwrap(), 0);
        assert_eq!(s.live_count(), 4);
    }

    #[test]
    fn test_full_store_evicts_oldest() {
        let mut s = ObjStore::new(5, Slot::default());
        for _ in 0..5 {
            s.allocate().unwrap();
        }
        // Age them unevenly; slot 3 is the stalest.
        for (i, slot) in s.iter_mut().enumerate() {
            slot.time = [4, 9, 2, 17, 5][i];
        }
        assert_eq!(s.choose_element(false).unwrap(), 3);
        assert_eq!(s.cursor(), 4);
    }

    #[test]
    fn test_peek_leaves_cursor() {
        let mut s = store_with_times(&[Some(1), None, Some(3)]);
        assert_eq!(s.choose_element(true).unwrap(), 1);
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.choose_element(false).unwrap(), 1);
        assert_eq!(s.cursor(), 2);
    }

    #[test]
    fn test_eviction_tie_prefers_cursor_order() {
        let mut s = store_with_times(&[Some(7), Some(7), Some(7)]);
        s.choose_element(false).unwrap();
        assert_eq!(s.cursor(), 1);
        // All equal: the slot at the cursor wins.
        assert_eq!(s.choose_element(true).unwrap(), 1);
    }

    #[test]
    fn test_choose_elements_dead_first_then_oldest() {
        let mut s = store_with_times(&[Some(3), None, Some(8), Some(8), None, Some(1)]);
        let mut out = Vec::new();
        s.choose_elements(&mut out, 4).unwrap();
        assert_eq!(out, vec![1, 4, 2, 3]);
        // Cursor sits past the last dead slot consumed.
        assert_eq!(s.cursor(), 5);
    }

    #[test]
    fn test_choose_elements_all_dead_moves_cursor() {
        let mut s = ObjStore::new(6, Slot::default());
        let mut out = Vec::new();
        s.choose_elements(&mut out, 3).unwrap();
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(s.cursor(), 3);
        s.choose_elements(&mut out, 4).unwrap();
        assert_eq!(out, vec![3, 4, 5, 0]);
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn test_choose_elements_only_alive_keeps_cursor() {
        let mut s = store_with_times(&[Some(2), Some(5), Some(4)]);
        let mut out = Vec::new();
        s.choose_elements(&mut out, 2).unwrap();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_choose_elements_distinct_for_every_k() {
        let times = [Some(5), None, Some(2), Some(9), None, Some(9), Some(0), None];
        for k in 0..=times.len() {
            let mut s = store_with_times(&times);
            let mut out = Vec::new();
            s.choose_elements(&mut out, k).unwrap();
            assert_eq!(out.len(), k);
            let mut sorted = out.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), k, "duplicate index for k={k}: {out:?}");
        }
    }

    #[test]
    fn test_choose_elements_capacity_exceeded() {
        let mut s = store_with_times(&[None, Some(1)]);
        let mut out = vec![42];
        let err = s.choose_elements(&mut out, 3).unwrap_err();
        assert!(matches!(err, PhysError::CapacityExceeded { requested: 3, capacity: 2 }));
        assert_eq!(out, vec![42]);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_grow_preserves_live() {
        let mut s = store_with_times(&[Some(1), Some(2)]);
        s.grow(4, Slot::default());
        assert_eq!(s.capacity(), 4);
        assert_eq!(s.live_count(), 2);
        assert_eq!(s.allocate().unwrap(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut s = ObjStore::new(2, Slot::default());
        assert!(matches!(s.get(2), Err(PhysError::OutOfRange { index: 2, len: 2 })));
        assert!(s.release(5).is_err());
    }
}
