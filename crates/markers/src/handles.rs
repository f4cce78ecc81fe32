use std::collections::BTreeMap;
use std::ops::Range;

use foundation::coord::LatLng;
use foundation::handles::Generation;

use crate::layer::MarkerKey;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerHandle {
    pub key: MarkerKey,
    pub position: LatLng,
}

/// Per-index entry of the handle table.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MarkerSlot {
    Placed(MarkerHandle),
    /// The entity is listed but has no usable coordinate, so no marker exists.
    Unplaced,
}

/// Generation-tagged map from filtered-set index to marker handle.
///
/// There is exactly one slot per index of the set it was built from, so the
/// index domain is always `0..len`. Lookups carry the caller's generation and
/// fail for any other generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandleTable {
    generation: Generation,
    slots: Vec<MarkerSlot>,
    by_key: BTreeMap<MarkerKey, usize>,
}

impl HandleTable {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            slots: Vec::new(),
            by_key: BTreeMap::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn indices(&self) -> Range<usize> {
        0..self.slots.len()
    }

    pub fn placed_count(&self) -> usize {
        self.by_key.len()
    }

    /// Appends the slot for the next index.
    pub fn push(&mut self, slot: MarkerSlot) -> usize {
        let index = self.slots.len();
        if let MarkerSlot::Placed(h) = slot {
            self.by_key.insert(h.key, index);
        }
        self.slots.push(slot);
        index
    }

    pub fn slot(&self, generation: Generation, index: usize) -> Option<&MarkerSlot> {
        if generation != self.generation {
            return None;
        }
        self.slots.get(index)
    }

    /// The marker for `index`, if the generation matches and it was placed.
    pub fn get(&self, generation: Generation, index: usize) -> Option<&MarkerHandle> {
        match self.slot(generation, index)? {
            MarkerSlot::Placed(h) => Some(h),
            MarkerSlot::Unplaced => None,
        }
    }

    /// Reverse lookup; keys from an older table are simply unknown here.
    pub fn index_of(&self, key: MarkerKey) -> Option<usize> {
        self.by_key.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{HandleTable, MarkerHandle, MarkerSlot};
    use crate::layer::MarkerKey;
    use foundation::coord::LatLng;
    use foundation::handles::Generation;

    fn placed(key: u64) -> MarkerSlot {
        MarkerSlot::Placed(MarkerHandle {
            key: MarkerKey(key),
            position: LatLng::new(1.0, 2.0),
        })
    }

    #[test]
    fn domain_covers_unplaced_slots() {
        let g = Generation::new(3);
        let mut t = HandleTable::new(g);
        t.push(placed(10));
        t.push(MarkerSlot::Unplaced);
        t.push(placed(11));

        assert_eq!(t.indices(), 0..3);
        assert_eq!(t.placed_count(), 2);
        assert_eq!(t.get(g, 0).map(|h| h.key), Some(MarkerKey(10)));
        assert_eq!(t.slot(g, 1), Some(&MarkerSlot::Unplaced));
        assert_eq!(t.get(g, 1), None);
        assert_eq!(t.index_of(MarkerKey(11)), Some(2));
        assert_eq!(t.get(g, 3), None);
    }

    #[test]
    fn stale_generation_is_rejected() {
        let mut t = HandleTable::new(Generation::new(1));
        t.push(placed(1));
        assert!(t.get(Generation::new(0), 0).is_none());
        assert!(t.slot(Generation::new(2), 0).is_none());
    }
}
