//! Slot Pool
//!
//! An array-backed pool where records are addressed by [`Handle`]. Live
//! records are threaded on an intrusive doubly-linked list so iteration
//! touches only occupied slots, newest first.
//!
//! Deletion is deferred: `free` only marks a record dead and queues it. The
//! record stays readable, writable, and iterable until `drain` runs, which is
//! what lets a caller delete one of the records it is currently visiting
//! without invalidating the walk.

use super::handle::Handle;
use crate::error::{try_reserve, PhysicsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// On the live list, not scheduled for removal
    Live,
    /// Still on the live list, queued for the next drain
    Dead,
    /// On the free list
    Free,
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    generation: u32,
    state: SlotState,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Handle-indexed object pool with deferred deletion.
#[derive(Debug)]
pub struct SlotPool<T> {
    slots: Vec<Slot<T>>,
    /// Recycled slot positions (LIFO)
    free: Vec<u32>,
    /// Handles freed since the last drain, in free order
    pending: Vec<Handle>,
    /// Most recently allocated live slot
    head: Option<u32>,
    /// Records on the live list (includes pending ones)
    len: usize,
}

impl<T: Default> SlotPool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            pending: Vec::new(),
            head: None,
            len: 0,
        }
    }

    /// Allocate a record reset to `T::default()` and return its handle.
    ///
    /// Reuses a drained slot when one is available, otherwise grows the
    /// backing store by one slot.
    pub fn alloc(&mut self) -> Result<Handle, PhysicsError> {
        let pos = match self.free.pop() {
            Some(pos) => {
                let slot = &mut self.slots[pos as usize];
                slot.value = T::default();
                slot.state = SlotState::Live;
                pos
            }
            None => self.grow()?,
        };

        self.link_front(pos);
        self.len += 1;

        let slot = &self.slots[pos as usize];
        Ok(Handle::new(pos + 1, slot.generation))
    }

    /// Append one fresh slot. The free list and pending queue are grown in
    /// step so that `free` and `drain` never need to allocate.
    fn grow(&mut self) -> Result<u32, PhysicsError> {
        let pos = self.slots.len();
        if pos >= (u32::MAX - 1) as usize {
            return Err(PhysicsError::OutOfMemory { requested: 1 });
        }
        try_reserve(&mut self.slots, 1)?;
        let target = pos + 1;
        let extra_free = target - self.free.len();
        try_reserve(&mut self.free, extra_free)?;
        let extra_pending = target - self.pending.len();
        try_reserve(&mut self.pending, extra_pending)?;

        self.slots.push(Slot {
            value: T::default(),
            generation: 0,
            state: SlotState::Live,
            prev: None,
            next: None,
        });
        Ok(pos as u32)
    }
}

impl<T> SlotPool<T> {
    /// Map a handle to its slot position, rejecting null, out-of-range,
    /// stale, and already reclaimed handles.
    fn resolve(&self, handle: Handle) -> Result<usize, PhysicsError> {
        let pos = handle.slot().ok_or(PhysicsError::InvalidHandle(handle))?;
        match self.slots.get(pos) {
            Some(slot)
                if slot.generation == handle.generation() && slot.state != SlotState::Free =>
            {
                Ok(pos)
            }
            _ => Err(PhysicsError::InvalidHandle(handle)),
        }
    }

    /// Mark a record dead and queue it for the next drain.
    ///
    /// The record is NOT unlinked or recycled here; it stays valid until
    /// [`drain`](Self::drain). Freeing a record that is already dead is a
    /// no-op.
    pub fn free(&mut self, handle: Handle) -> Result<(), PhysicsError> {
        let pos = self.resolve(handle)?;
        let slot = &mut self.slots[pos];
        if slot.state == SlotState::Dead {
            return Ok(());
        }
        slot.state = SlotState::Dead;
        self.pending.push(handle);
        Ok(())
    }

    /// Reclaim every record queued by `free`.
    ///
    /// For each pending handle, in the order it was freed: run `teardown`
    /// on the record, unlink it from the live list, advance the slot
    /// generation, and push the slot on the free list. Returns the number of
    /// records reclaimed.
    pub fn drain(&mut self, mut teardown: impl FnMut(Handle, &mut T)) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let mut pending = std::mem::take(&mut self.pending);
        for &handle in &pending {
            let Ok(pos) = self.resolve(handle) else {
                continue;
            };
            teardown(handle, &mut self.slots[pos].value);
            self.release(pos as u32);
        }
        let count = pending.len();
        pending.clear();
        self.pending = pending;
        count
    }

    /// Tear down and reclaim every record, live or pending.
    ///
    /// All outstanding handles become stale.
    pub fn clear(&mut self, mut teardown: impl FnMut(Handle, &mut T)) {
        let mut cursor = self.head;
        while let Some(pos) = cursor {
            let slot = &mut self.slots[pos as usize];
            cursor = slot.next;
            teardown(Handle::new(pos + 1, slot.generation), &mut slot.value);
        }

        self.free.clear();
        for (pos, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.state != SlotState::Free {
                slot.generation = slot.generation.wrapping_add(1);
                slot.state = SlotState::Free;
            }
            slot.prev = None;
            slot.next = None;
            self.free.push(pos as u32);
        }
        self.pending.clear();
        self.head = None;
        self.len = 0;
    }

    /// Unlink a slot from the live list and put it on the free list.
    fn release(&mut self, pos: u32) {
        self.unlink(pos);
        let slot = &mut self.slots[pos as usize];
        slot.state = SlotState::Free;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(pos);
        self.len -= 1;
    }

    fn link_front(&mut self, pos: u32) {
        let old_head = self.head;
        {
            let slot = &mut self.slots[pos as usize];
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h as usize].prev = Some(pos);
        }
        self.head = Some(pos);
    }

    fn unlink(&mut self, pos: u32) {
        let (prev, next) = {
            let slot = &mut self.slots[pos as usize];
            (slot.prev.take(), slot.next.take())
        };
        match prev {
            Some(p) => self.slots[p as usize].next = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.slots[n as usize].prev = prev;
        }
    }

    /// Get a record. Dead-but-undrained records are still returned.
    pub fn get(&self, handle: Handle) -> Result<&T, PhysicsError> {
        let pos = self.resolve(handle)?;
        Ok(&self.slots[pos].value)
    }

    /// Get a record mutably. Dead-but-undrained records are still returned.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, PhysicsError> {
        let pos = self.resolve(handle)?;
        Ok(&mut self.slots[pos].value)
    }

    /// Borrow two distinct records mutably at once.
    pub fn get_pair_mut(&mut self, a: Handle, b: Handle) -> Result<(&mut T, &mut T), PhysicsError> {
        let pa = self.resolve(a)?;
        let pb = self.resolve(b)?;
        if pa == pb {
            return Err(PhysicsError::InvalidHandle(b));
        }
        if pa < pb {
            let (lo, hi) = self.slots.split_at_mut(pb);
            Ok((&mut lo[pa].value, &mut hi[0].value))
        } else {
            let (lo, hi) = self.slots.split_at_mut(pa);
            Ok((&mut hi[0].value, &mut lo[pb].value))
        }
    }

    /// Record exists and has not been freed.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.resolve(handle)
            .map(|pos| self.slots[pos].state == SlotState::Live)
            .unwrap_or(false)
    }

    /// Record has been freed but not yet drained.
    pub fn is_pending(&self, handle: Handle) -> bool {
        self.resolve(handle)
            .map(|pos| self.slots[pos].state == SlotState::Dead)
            .unwrap_or(false)
    }

    /// Handle still resolves (live or pending).
    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Number of records on the live list, including pending ones.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of records waiting for the next drain.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total slots ever allocated (live, pending, and free).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Walk the live list, newest first. Pending records are included.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            pool: self,
            cursor: self.head,
        }
    }

    /// Handles on the live list, newest first.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.iter().map(|(h, _)| h)
    }

    /// Visit every record on the live list mutably, newest first.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(Handle, &mut T)) {
        let mut cursor = self.head;
        while let Some(pos) = cursor {
            let slot = &mut self.slots[pos as usize];
            cursor = slot.next;
            f(Handle::new(pos + 1, slot.generation), &mut slot.value);
        }
    }
}

impl<T: Default> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(Handle, &T)` in live-list order.
pub struct Iter<'a, T> {
    pool: &'a SlotPool<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.cursor?;
        let slot = &self.pool.slots[pos as usize];
        self.cursor = slot.next;
        Some((Handle::new(pos + 1, slot.generation), &slot.value))
    }
}

impl<'a, T> IntoIterator for &'a SlotPool<T> {
    type Item = (Handle, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
