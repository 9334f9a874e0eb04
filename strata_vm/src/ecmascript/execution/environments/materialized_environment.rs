// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environments whose bindings are addressed by position.
//!
//! Function bodies, catch clauses with a parameter, and strict eval code all
//! get one. At compile time the record only carries the binding table; at
//! runtime it is rebuilt from the table's name array and gets a dense value
//! slot per binding.

use std::rc::Rc;

use super::{BindingTable, EnvironmentError, EnvironmentIndex, FunctionDeclarationIndex};
use crate::ecmascript::types::Value;

#[derive(Debug, Clone)]
pub struct MaterializedEnvironmentRecord {
    outer_env: EnvironmentIndex,
    bindings: BindingTable,
    /// One slot per binding. Absent for compile-time records.
    values: Option<Box<[Value]>>,
}

fn require_parent(parent: Option<EnvironmentIndex>) -> Result<EnvironmentIndex, EnvironmentError> {
    parent.ok_or(EnvironmentError::InvalidArgument(
        "materialized environment requires a parent environment",
    ))
}

impl MaterializedEnvironmentRecord {
    /// Environment of a function body: the function's own name (when it has
    /// one), `this`, `arguments`, then the parameters in order.
    ///
    /// A parameter name that repeats keeps the index of its first occurrence;
    /// the prologue stores arguments in order, so the last argument bound to
    /// that name is the one observed.
    pub fn new_function(
        parent: Option<EnvironmentIndex>,
        name: &str,
        parameters: &[&str],
    ) -> Result<Self, EnvironmentError> {
        let outer_env = require_parent(parent)?;
        let mut bindings = BindingTable::new();
        if !name.is_empty() {
            bindings.declare(name, None)?;
        }
        bindings.declare("this", None)?;
        bindings.declare("arguments", None)?;
        for parameter in parameters {
            bindings.declare(parameter, None)?;
        }
        Ok(Self {
            outer_env,
            bindings,
            values: None,
        })
    }

    /// Environment of a catch clause. Starts empty; the catch parameter is
    /// declared into it by scope analysis.
    pub fn new_catch(parent: Option<EnvironmentIndex>) -> Result<Self, EnvironmentError> {
        Ok(Self {
            outer_env: require_parent(parent)?,
            bindings: BindingTable::new(),
            values: None,
        })
    }

    /// Variable environment of strict eval code.
    pub fn new_strict_eval(parent: Option<EnvironmentIndex>) -> Result<Self, EnvironmentError> {
        Ok(Self {
            outer_env: require_parent(parent)?,
            bindings: BindingTable::new(),
            values: None,
        })
    }

    /// Rebuilds an environment from the name array emitted at compile time
    /// and allocates its storage, every slot holding `undefined`.
    pub fn reconstruct(
        parent: Option<EnvironmentIndex>,
        names: &[Rc<str>],
    ) -> Result<Self, EnvironmentError> {
        let outer_env = require_parent(parent)?;
        let mut bindings = BindingTable::new();
        for name in names {
            bindings.declare(name, None)?;
        }
        let values = vec![Value::Undefined; bindings.len()].into_boxed_slice();
        Ok(Self {
            outer_env,
            bindings,
            values: Some(values),
        })
    }

    pub fn outer_env(&self) -> EnvironmentIndex {
        self.outer_env
    }

    pub(crate) fn set_outer_env(&mut self, outer_env: EnvironmentIndex) {
        self.outer_env = outer_env;
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn has_storage(&self) -> bool {
        self.values.is_some()
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.lookup(name).is_some()
    }

    /// Declares a binding in a compile-time record. Records with storage have
    /// a fixed shape.
    pub fn declare(
        &mut self,
        name: &str,
        hoisted_initializer: Option<FunctionDeclarationIndex>,
    ) -> Result<u32, EnvironmentError> {
        if self.has_storage() {
            return Err(EnvironmentError::InvalidState(
                "cannot declare into a materialized environment with storage".into(),
            ));
        }
        self.bindings.declare(name, hoisted_initializer)
    }

    pub fn read(&self, name: &str) -> Result<Option<Value>, EnvironmentError> {
        let values = self.storage()?;
        Ok(self
            .bindings
            .lookup(name)
            .map(|index| values[index as usize].clone()))
    }

    pub fn write(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        self.storage()?;
        let index = self.bindings.lookup(name).ok_or_else(|| {
            EnvironmentError::InvalidState(
                format!("binding '{name}' is not declared in this environment").into(),
            )
        })?;
        self.set_binding_value(index, value)
    }

    pub fn get_binding_value(&self, index: u32) -> Result<Value, EnvironmentError> {
        self.storage()?
            .get(index as usize)
            .cloned()
            .ok_or(EnvironmentError::InvalidState("binding index out of range".into()))
    }

    pub fn set_binding_value(&mut self, index: u32, value: Value) -> Result<(), EnvironmentError> {
        let slot = self
            .values
            .as_mut()
            .ok_or(EnvironmentError::InvalidState(
                "materialized environment has no storage".into(),
            ))?
            .get_mut(index as usize)
            .ok_or(EnvironmentError::InvalidState("binding index out of range".into()))?;
        *slot = value;
        Ok(())
    }

    pub(crate) fn values(&self) -> &[Value] {
        self.values.as_deref().unwrap_or_default()
    }

    fn storage(&self) -> Result<&[Value], EnvironmentError> {
        self.values.as_deref().ok_or(EnvironmentError::InvalidState(
            "materialized environment has no storage".into(),
        ))
    }
}
