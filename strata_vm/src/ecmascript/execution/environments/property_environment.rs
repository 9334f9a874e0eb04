// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environments backed by a dynamic property store; bindings can appear in
//! them at any time. The global environment is one. Sloppy functions that
//! contain a direct eval get another per activation, holding the `var` and
//! function declarations of the eval code they run.

use std::rc::Rc;

use ahash::AHashMap;

use super::{BindingTable, EnvironmentError, EnvironmentIndex, FunctionDeclarationIndex};
use crate::ecmascript::types::Value;

#[derive(Debug, Clone)]
pub struct PropertyEnvironmentRecord {
    outer_env: Option<EnvironmentIndex>,
    bindings: BindingTable,
    properties: Option<AHashMap<Rc<str>, Value>>,
}

impl PropertyEnvironmentRecord {
    /// A compile-time record without a property store.
    pub fn new(outer_env: Option<EnvironmentIndex>) -> Self {
        Self {
            outer_env,
            bindings: BindingTable::new(),
            properties: None,
        }
    }

    pub fn with_storage(outer_env: Option<EnvironmentIndex>) -> Self {
        Self {
            outer_env,
            bindings: BindingTable::new(),
            properties: Some(AHashMap::default()),
        }
    }

    pub fn outer_env(&self) -> Option<EnvironmentIndex> {
        self.outer_env
    }

    pub(crate) fn set_outer_env(&mut self, outer_env: EnvironmentIndex) {
        self.outer_env = Some(outer_env);
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn has_storage(&self) -> bool {
        self.properties.is_some()
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.lookup(name).is_some()
    }

    pub fn declare(
        &mut self,
        name: &str,
        hoisted_initializer: Option<FunctionDeclarationIndex>,
    ) -> Result<u32, EnvironmentError> {
        self.bindings.declare(name, hoisted_initializer)
    }

    pub fn read(&self, name: &str) -> Result<Option<Value>, EnvironmentError> {
        let properties = self.properties.as_ref().ok_or(EnvironmentError::InvalidState(
            "property-backed environment has no storage".into(),
        ))?;
        if !self.has_binding(name) {
            return Ok(None);
        }
        Ok(Some(properties.get(name).cloned().unwrap_or_default()))
    }

    /// Stores `value`, declaring `name` first if this is the first time
    /// it is assigned.
    pub fn write(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        let properties = self.properties.as_mut().ok_or(EnvironmentError::InvalidState(
            "property-backed environment has no storage".into(),
        ))?;
        let index = self.bindings.declare(name, None)?;
        let Some(binding) = self.bindings.get(index) else {
            return Err(EnvironmentError::InvalidState("binding table is inconsistent".into()));
        };
        properties.insert(binding.name.clone(), value);
        Ok(())
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Value> {
        self.properties.iter().flat_map(|properties| properties.values())
    }
}
