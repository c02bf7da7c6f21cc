//! Fixed-capacity object pool
//!
//! Particles and pickups are recycled instead of reallocated: the slot array
//! is allocated once, a free-index stack hands out slots, and releasing a
//! slot resets it through `Recycle`. Generational handles make any reference
//! to a released slot a harmless miss.

/// Reset of a pooled value on release. The default resets to
/// `Self::default()`; types owning buffers keep their capacity.
pub trait Recycle: Default {
    fn recycle(&mut self) {
        *self = Self::default();
    }
}

/// Generational reference into an `Arena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    generation: u32,
    live: bool,
}

/// Slot array + free-index stack
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T: Recycle> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                value: T::default(),
                generation: 0,
                live: false,
            })
            .collect();
        // Reversed so slot 0 is handed out first
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            live: 0,
        }
    }

    /// Take a fresh slot, or `None` when the pool is exhausted
    pub fn spawn(&mut self) -> Option<(Handle, &mut T)> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.live = true;
        self.live += 1;
        let handle = Handle {
            index,
            generation: slot.generation,
        };
        Some((handle, &mut slot.value))
    }

    /// Return a slot to the pool; false if the handle was already stale
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return false;
        };
        if !slot.live || slot.generation != handle.generation {
            return false;
        }
        slot.value.recycle();
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        true
    }

    /// Release everything
    pub fn clear(&mut self) {
        for i in 0..self.slots.len() {
            if let Some(handle) = self.handle_at(i) {
                self.release(handle);
            }
        }
    }
}

impl<T> Arena<T> {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &mut slot.value)
    }

    /// Handle of the live object in slot `index`, if any
    pub fn handle_at(&self, index: usize) -> Option<Handle> {
        self.slots.get(index).filter(|slot| slot.live).map(|slot| Handle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Live objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.live).map(|(i, s)| {
            (
                Handle {
                    index: i as u32,
                    generation: s.generation,
                },
                &s.value,
            )
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| {
                (
                    Handle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &mut s.value,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Thing {
        value: u32,
    }

    impl Recycle for Thing {}

    #[derive(Debug, Default)]
    struct Buffered {
        items: Vec<u32>,
    }

    impl Recycle for Buffered {
        fn recycle(&mut self) {
            self.items.clear();
        }
    }

    #[test]
    fn test_spawn_until_full() {
        let mut arena: Arena<Thing> = Arena::with_capacity(2);
        assert!(arena.spawn().is_some());
        assert!(arena.spawn().is_some());
        assert!(arena.spawn().is_none());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_release_resets_and_recycles() {
        let mut arena: Arena<Thing> = Arena::with_capacity(1);
        let (first, thing) = arena.spawn().unwrap();
        thing.value = 7;
        assert!(arena.release(first));

        let (second, thing) = arena.spawn().unwrap();
        assert_eq!(thing.value, 0, "released slot must come back reset");
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
    }

    #[test]
    fn test_recycle_keeps_buffer_capacity() {
        let mut arena: Arena<Buffered> = Arena::with_capacity(1);
        let (h, b) = arena.spawn().unwrap();
        b.items.extend([1, 2, 3]);
        arena.release(h);

        let (_, b) = arena.spawn().unwrap();
        assert!(b.items.is_empty());
        assert!(b.items.capacity() >= 3);
    }

    #[test]
    fn test_stale_handle_is_noop() {
        let mut arena: Arena<Thing> = Arena::with_capacity(1);
        let (stale, _) = arena.spawn().unwrap();
        arena.release(stale);
        let (_fresh, _) = arena.spawn().unwrap();

        assert!(arena.get(stale).is_none());
        assert!(!arena.release(stale), "double release must be ignored");
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut arena: Arena<Thing> = Arena::with_capacity(3);
        let (a, _) = arena.spawn().unwrap();
        let (_b, _) = arena.spawn().unwrap();
        arena.release(a);
        assert_eq!(arena.iter().count(), 1);
    }

    #[test]
    fn test_clear_frees_everything() {
        let mut arena: Arena<Thing> = Arena::with_capacity(4);
        for _ in 0..4 {
            arena.spawn();
        }
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.iter().count(), 0);
        assert!(arena.spawn().is_some());
    }
}
