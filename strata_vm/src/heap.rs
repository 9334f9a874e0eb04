// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod heap_gc;
pub mod indexes;

pub(crate) use heap_gc::{WorkQueues, heap_gc};
pub use indexes::{BaseIndex, EnvironmentIndex, FunctionIndex, ObjectIndex};

use crate::ecmascript::{
    execution::Environments,
    types::{FunctionHeapData, ObjectHeapData},
};

/// Runtime storage of everything a [`Value`](crate::ecmascript::types::Value)
/// can point to.
#[derive(Debug, Default)]
pub struct Heap {
    pub environments: Environments,
    pub functions: Arena<FunctionHeapData>,
    pub objects: Arena<ObjectHeapData>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn create_function(&mut self, data: FunctionHeapData) -> FunctionIndex {
        self.functions.push(data)
    }

    pub(crate) fn create_object(&mut self, data: ObjectHeapData) -> ObjectIndex {
        self.objects.push(data)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// Generational slot storage. Freed slots are reused, but only after their
/// generation has moved on so that old indexes stop resolving.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: T) -> BaseIndex<T> {
        if let Some(free) = self.free_list.pop() {
            let slot = &mut self.slots[free as usize];
            debug_assert!(slot.data.is_none());
            slot.data = Some(data);
            return BaseIndex::from_parts(free as usize, slot.generation);
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            data: Some(data),
        });
        BaseIndex::from_parts(index, 0)
    }

    pub fn get(&self, index: BaseIndex<T>) -> Option<&T> {
        let slot = self.slots.get(index.into_index())?;
        if slot.generation != index.generation() {
            return None;
        }
        slot.data.as_ref()
    }

    pub fn get_mut(&mut self, index: BaseIndex<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(index.into_index())?;
        if slot.generation != index.generation() {
            return None;
        }
        slot.data.as_mut()
    }

    pub fn contains(&self, index: BaseIndex<T>) -> bool {
        self.get(index).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BaseIndex<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.data
                .as_ref()
                .map(|data| (BaseIndex::from_parts(index, slot.generation), data))
        })
    }

    /// Frees every live slot whose mark is unset and returns how many were
    /// freed.
    pub(crate) fn sweep(&mut self, marks: &[bool]) -> usize {
        debug_assert_eq!(marks.len(), self.slots.len());
        let mut freed = 0;
        for (index, (slot, marked)) in self.slots.iter_mut().zip(marks).enumerate() {
            if *marked || slot.data.is_none() {
                continue;
            }
            slot.data = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(index as u32);
            freed += 1;
        }
        freed
    }
}
