// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt::Debug;
use std::{
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::NonZeroU32,
};

use crate::ecmascript::{
    execution::EnvironmentRecord,
    types::{FunctionHeapData, ObjectHeapData},
};

/// A struct containing a non-zero index into an [`Arena`] of `T`s together
/// with the generation of the slot at the time the index was handed out.
///
/// Due to the non-zero value, the offset in the arena is offset by one. A
/// slot that is freed by the garbage collector bumps its generation, so an
/// index that outlived its target no longer resolves to anything.
pub struct BaseIndex<T: ?Sized> {
    index: NonZeroU32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> Debug for BaseIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.index.get() - 1, self.generation)
    }
}

impl<T: ?Sized> Clone for BaseIndex<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for BaseIndex<T> {}

impl<T: ?Sized> PartialEq for BaseIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T: ?Sized> Eq for BaseIndex<T> {}

impl<T: ?Sized> Hash for BaseIndex<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T: ?Sized> BaseIndex<T> {
    pub(crate) const fn from_parts(index: usize, generation: u32) -> Self {
        assert!(index < u32::MAX as usize);
        // SAFETY: Number is not max value and will not overflow to zero.
        let index = unsafe { NonZeroU32::new_unchecked(index as u32 + 1) };
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub const fn into_index(self) -> usize {
        self.index.get() as usize - 1
    }

    pub const fn into_u32_index(self) -> u32 {
        self.index.get() - 1
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

pub type EnvironmentIndex = BaseIndex<EnvironmentRecord>;
pub type FunctionIndex = BaseIndex<FunctionHeapData>;
pub type ObjectIndex = BaseIndex<ObjectHeapData>;
