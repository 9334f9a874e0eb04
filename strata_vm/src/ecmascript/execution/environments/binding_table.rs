// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use ahash::AHashMap;

use super::EnvironmentError;

/// Index of a hoisted function declaration in the declaration table of the
/// compilation unit that declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionDeclarationIndex(pub(crate) u32);

impl FunctionDeclarationIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn into_index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: Rc<str>,
    /// Slot of the binding in its environment. Assigned in declaration order
    /// and never changed afterwards.
    pub index: u32,
    /// Function declaration whose closure must be stored into this binding
    /// when the environment is entered.
    pub hoisted_initializer: Option<FunctionDeclarationIndex>,
}

/// The declared names of a single environment, in declaration order.
///
/// `lookup` and the index order together form a bijection between the names
/// and `0..len()`.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: Vec<Binding>,
    lookup: AHashMap<Rc<str>, u32>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`, returning its index.
    ///
    /// Redeclaring an existing name keeps its index. A supplied initializer
    /// replaces a previously recorded one, so the last function declaration
    /// of a name wins; a plain declaration leaves any initializer in place.
    pub fn declare(
        &mut self,
        name: &str,
        hoisted_initializer: Option<FunctionDeclarationIndex>,
    ) -> Result<u32, EnvironmentError> {
        if let Some(&index) = self.lookup.get(name) {
            if hoisted_initializer.is_some() {
                self.bindings[index as usize].hoisted_initializer = hoisted_initializer;
            }
            return Ok(index);
        }
        let index =
            u32::try_from(self.bindings.len()).map_err(|_| EnvironmentError::TooManyBindings)?;
        let name: Rc<str> = Rc::from(name);
        self.lookup.insert(name.clone(), index);
        self.bindings.push(Binding {
            name,
            index,
            hoisted_initializer,
        });
        Ok(index)
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    pub fn has_any(&self, predicate: impl FnMut(&Binding) -> bool) -> bool {
        self.bindings.iter().any(predicate)
    }

    pub fn get(&self, index: u32) -> Option<&Binding> {
        self.bindings.get(index as usize)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }

    /// Binding names in index order; the name array that runtime
    /// reconstruction consumes.
    pub fn names(&self) -> Box<[Rc<str>]> {
        self.bindings.iter().map(|binding| binding.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'a> IntoIterator for &'a BindingTable {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
