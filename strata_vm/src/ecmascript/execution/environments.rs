// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [9.1 Environment Records](https://tc39.es/ecma262/#sec-environment-records)
//!
//! Environment Record is a specification type used to define the association
//! of Identifiers to specific variables and functions, based upon the lexical
//! nesting structure of ECMAScript code. Usually an Environment Record is
//! associated with some specific syntactic structure of ECMAScript code such
//! as a FunctionDeclaration, a BlockStatement, or a Catch clause of a
//! TryStatement. Each time such code is evaluated, a new Environment Record is
//! created to record the identifier bindings that are created by that code.
//!
//! Two kinds of record exist here. A [`MaterializedEnvironmentRecord`] has a
//! fixed set of bindings known at compile time and stores their values by
//! position. A [`PropertyEnvironmentRecord`] stores values by name and grows
//! when an undeclared name is assigned; the global environment is one.
//!
//! The same record types describe the compile-time environment tree (records
//! without storage, owned by the compilation unit) and the runtime scope
//! chain (records with storage, owned by the heap). Runtime records are
//! rebuilt from the name arrays of the compile-time ones, so indices resolved
//! at compile time are valid at runtime.

mod binding_table;
mod materialized_environment;
mod property_environment;

use std::{borrow::Cow, rc::Rc};

pub use binding_table::{Binding, BindingTable, FunctionDeclarationIndex};
pub use materialized_environment::MaterializedEnvironmentRecord;
pub use property_environment::PropertyEnvironmentRecord;

pub use crate::heap::EnvironmentIndex;
use crate::{
    ecmascript::types::Value,
    engine::bytecode::{CompileContext, CompileError, ExecutableContext, Instruction},
    heap::Arena,
};

/// Internal failures of environment handling. These indicate a bug in the
/// compiler or in the caller and are never visible to running programs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(Cow<'static, str>),
    #[error("too many bindings in one environment")]
    TooManyBindings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    Materialized,
    PropertyBacked,
}

impl EnvironmentKind {
    /// Property-backed bindings do not exist until something is stored into
    /// them, so entering such an environment has to store `undefined` into
    /// every binding without a hoisted initializer.
    pub const fn needs_default_initialization(self) -> bool {
        matches!(self, Self::PropertyBacked)
    }
}

/// Where an identifier reference resolves to, as seen from some environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingLocation {
    /// Slot `index` of the materialized environment `depth` links up the
    /// scope chain.
    Environment { depth: u32, index: u32 },
    /// Not declared in the chain; looked up by name in the property-backed
    /// global environment.
    Global,
    /// Possibly shadowed by a binding that direct eval code creates at
    /// runtime; looked up by name along the runtime scope chain.
    Dynamic,
}

/// Compile-time shape of one environment of a live scope chain, used to
/// rebuild the caller's chain for direct eval code.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeLink {
    /// A materialized environment, as its names in index order.
    Materialized(Box<[Rc<str>]>),
    /// The property-backed variable environment of a sloppy function.
    Variable,
}

#[derive(Debug, Clone)]
pub enum EnvironmentRecord {
    Materialized(MaterializedEnvironmentRecord),
    Property(PropertyEnvironmentRecord),
}

impl EnvironmentRecord {
    pub fn kind(&self) -> EnvironmentKind {
        match self {
            Self::Materialized(_) => EnvironmentKind::Materialized,
            Self::Property(_) => EnvironmentKind::PropertyBacked,
        }
    }

    pub fn needs_default_initialization(&self) -> bool {
        self.kind().needs_default_initialization()
    }

    pub fn outer_env(&self) -> Option<EnvironmentIndex> {
        match self {
            Self::Materialized(record) => Some(record.outer_env()),
            Self::Property(record) => record.outer_env(),
        }
    }

    pub fn bindings(&self) -> &BindingTable {
        match self {
            Self::Materialized(record) => record.bindings(),
            Self::Property(record) => record.bindings(),
        }
    }

    pub fn has_storage(&self) -> bool {
        match self {
            Self::Materialized(record) => record.has_storage(),
            Self::Property(record) => record.has_storage(),
        }
    }

    /// Whether `name` is declared directly in this environment.
    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings().lookup(name).is_some()
    }

    pub fn declare(
        &mut self,
        name: &str,
        hoisted_initializer: Option<FunctionDeclarationIndex>,
    ) -> Result<u32, EnvironmentError> {
        match self {
            Self::Materialized(record) => record.declare(name, hoisted_initializer),
            Self::Property(record) => record.declare(name, hoisted_initializer),
        }
    }

    /// Re-parents a compile-time record.
    pub(crate) fn set_outer_env(&mut self, outer_env: EnvironmentIndex) {
        match self {
            Self::Materialized(record) => record.set_outer_env(outer_env),
            Self::Property(record) => record.set_outer_env(outer_env),
        }
    }

    /// Reads `name` from this environment only. `Ok(None)` means the name
    /// is not declared here.
    pub fn read(&self, name: &str) -> Result<Option<Value>, EnvironmentError> {
        match self {
            Self::Materialized(record) => record.read(name),
            Self::Property(record) => record.read(name),
        }
    }

    /// Writes `name` in this environment only. Property-backed environments
    /// declare unknown names; materialized ones reject them.
    pub fn write(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        match self {
            Self::Materialized(record) => record.write(name, value),
            Self::Property(record) => record.write(name, value),
        }
    }

    pub(crate) fn get_binding_value(&self, index: u32) -> Result<Value, EnvironmentError> {
        match self {
            Self::Materialized(record) => record.get_binding_value(index),
            Self::Property(_) => Err(EnvironmentError::InvalidState(
                "positional access to a property-backed environment".into(),
            )),
        }
    }

    pub(crate) fn set_binding_value(
        &mut self,
        index: u32,
        value: Value,
    ) -> Result<(), EnvironmentError> {
        match self {
            Self::Materialized(record) => record.set_binding_value(index, value),
            Self::Property(_) => Err(EnvironmentError::InvalidState(
                "positional access to a property-backed environment".into(),
            )),
        }
    }

    /// Emits the instructions that create this environment at runtime and
    /// make it the current one.
    ///
    /// A materialized environment emits its name array and `EnterEnvironment`,
    /// which reconstructs it with the current environment as parent. A
    /// variable environment emits `EnterVariableEnvironment`. The global
    /// environment is created with the agent and emits nothing.
    pub(crate) fn emit_construction(
        &self,
        executable: &mut ExecutableContext,
    ) -> Result<(), CompileError> {
        match self {
            Self::Materialized(record) => executable.add_instruction_with_name_array(
                Instruction::EnterEnvironment,
                record.bindings().names(),
            ),
            Self::Property(record) if record.outer_env().is_some() => {
                executable.add_instruction(Instruction::EnterVariableEnvironment);
                Ok(())
            }
            Self::Property(_) => Ok(()),
        }
    }

    /// Emits the stores that initialize hoisted bindings. Must run while the
    /// compile context resolves from this environment or from a variable
    /// environment directly inside it.
    ///
    /// Bindings with a hoisted function declaration get a fresh closure,
    /// stored with a defining write so strict code can create them. Other
    /// bindings are only touched in property-backed environments, where
    /// `undefined` is stored to create them.
    pub(crate) fn emit_hoist_initialization(
        &self,
        ctx: &mut CompileContext<'_, '_>,
    ) -> Result<(), CompileError> {
        for binding in self.bindings() {
            match binding.hoisted_initializer {
                Some(declaration) => {
                    ctx.instantiate_function_declaration(declaration)?;
                    self.emit_store(ctx, binding)?;
                }
                None if self.needs_default_initialization() => {
                    ctx.executable.emit_undefined();
                    ctx.executable.add_instruction_with_identifier(
                        Instruction::CreateVarBinding,
                        &binding.name,
                    )?;
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Stores the value on top of the stack into `binding` of this
    /// environment.
    fn emit_store(
        &self,
        ctx: &mut CompileContext<'_, '_>,
        binding: &Binding,
    ) -> Result<(), CompileError> {
        match self {
            Self::Materialized(_) => ctx.emit_set_binding(&binding.name),
            Self::Property(_) => ctx
                .executable
                .add_instruction_with_identifier(Instruction::DefineVarBinding, &binding.name),
        }
    }
}

/// Arena of environment records, addressed by generational
/// [`EnvironmentIndex`] handles.
#[derive(Debug, Default)]
pub struct Environments {
    records: Arena<EnvironmentRecord>,
}

impl Environments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: EnvironmentIndex) -> Option<&EnvironmentRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: EnvironmentIndex) -> Option<&mut EnvironmentRecord> {
        self.records.get_mut(index)
    }

    pub fn record(&self, index: EnvironmentIndex) -> Result<&EnvironmentRecord, EnvironmentError> {
        self.records
            .get(index)
            .ok_or(EnvironmentError::InvalidState("environment is no longer live".into()))
    }

    pub fn record_mut(
        &mut self,
        index: EnvironmentIndex,
    ) -> Result<&mut EnvironmentRecord, EnvironmentError> {
        self.records
            .get_mut(index)
            .ok_or(EnvironmentError::InvalidState("environment is no longer live".into()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnvironmentIndex, &EnvironmentRecord)> {
        self.records.iter()
    }

    pub fn push(&mut self, record: EnvironmentRecord) -> EnvironmentIndex {
        let index = self.records.push(record);
        tracing::trace!(?index, "environment created");
        index
    }

    /// The compile-time view of the global environment.
    pub fn new_global_environment(&mut self) -> EnvironmentIndex {
        self.push(EnvironmentRecord::Property(PropertyEnvironmentRecord::new(None)))
    }

    pub(crate) fn new_runtime_global_environment(&mut self) -> EnvironmentIndex {
        self.push(EnvironmentRecord::Property(
            PropertyEnvironmentRecord::with_storage(None),
        ))
    }

    /// The compile-time view of the property-backed variable environment a
    /// sloppy function with a direct eval enters after its prologue.
    pub fn new_variable_environment(
        &mut self,
        parent: Option<EnvironmentIndex>,
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        let parent = parent.ok_or(EnvironmentError::InvalidArgument(
            "variable environment requires a parent environment",
        ))?;
        self.check_parent(Some(parent))?;
        Ok(self.push(EnvironmentRecord::Property(PropertyEnvironmentRecord::new(
            Some(parent),
        ))))
    }

    pub(crate) fn new_runtime_variable_environment(
        &mut self,
        parent: EnvironmentIndex,
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        self.check_parent(Some(parent))?;
        Ok(self.push(EnvironmentRecord::Property(
            PropertyEnvironmentRecord::with_storage(Some(parent)),
        )))
    }

    pub fn new_function_environment(
        &mut self,
        parent: Option<EnvironmentIndex>,
        name: &str,
        parameters: &[&str],
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        self.check_parent(parent)?;
        let record = MaterializedEnvironmentRecord::new_function(parent, name, parameters)?;
        Ok(self.push(EnvironmentRecord::Materialized(record)))
    }

    pub fn new_catch_environment(
        &mut self,
        parent: Option<EnvironmentIndex>,
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        self.check_parent(parent)?;
        let record = MaterializedEnvironmentRecord::new_catch(parent)?;
        Ok(self.push(EnvironmentRecord::Materialized(record)))
    }

    pub fn new_strict_eval_environment(
        &mut self,
        parent: Option<EnvironmentIndex>,
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        self.check_parent(parent)?;
        let record = MaterializedEnvironmentRecord::new_strict_eval(parent)?;
        Ok(self.push(EnvironmentRecord::Materialized(record)))
    }

    pub fn reconstruct(
        &mut self,
        parent: Option<EnvironmentIndex>,
        names: &[Rc<str>],
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        self.check_parent(parent)?;
        let record = MaterializedEnvironmentRecord::reconstruct(parent, names)?;
        Ok(self.push(EnvironmentRecord::Materialized(record)))
    }

    /// Follows `depth` parent links starting from `index`.
    pub fn ancestor(
        &self,
        mut index: EnvironmentIndex,
        depth: u32,
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        for _ in 0..depth {
            index = self.record(index)?.outer_env().ok_or(EnvironmentError::InvalidState(
                "scope chain is shorter than the resolved depth".into(),
            ))?;
        }
        Ok(index)
    }

    /// Resolves `name` by walking the chain outwards from `from`.
    ///
    /// Once a variable environment has been passed, every environment beyond
    /// the function environment it belongs to resolves dynamically: eval code
    /// may declare a shadowing binding in it at runtime. The function
    /// environment itself cannot be shadowed, as eval declarations of its
    /// names reuse its bindings.
    pub fn resolve(
        &self,
        from: EnvironmentIndex,
        name: &str,
    ) -> Result<BindingLocation, EnvironmentError> {
        let mut depth = 0;
        let mut dynamic_from: Option<u32> = None;
        let mut current = from;
        loop {
            let record = self.record(current)?;
            let shadowable = dynamic_from.is_some_and(|start| depth >= start);
            if let Some(index) = record.bindings().lookup(name) {
                return Ok(match record {
                    EnvironmentRecord::Materialized(_) if !shadowable => {
                        BindingLocation::Environment { depth, index }
                    }
                    EnvironmentRecord::Property(_)
                        if record.outer_env().is_none() && dynamic_from.is_none() =>
                    {
                        BindingLocation::Global
                    }
                    _ => BindingLocation::Dynamic,
                });
            }
            let Some(outer_env) = record.outer_env() else {
                return Ok(match dynamic_from {
                    Some(_) => BindingLocation::Dynamic,
                    None => BindingLocation::Global,
                });
            };
            if let EnvironmentRecord::Property(_) = record {
                dynamic_from.get_or_insert(depth + 2);
            }
            depth += 1;
            current = outer_env;
        }
    }

    /// Shape of the chain between `from` and the global environment,
    /// innermost first.
    pub fn chain_shape(&self, from: EnvironmentIndex) -> Result<Vec<ScopeLink>, EnvironmentError> {
        let mut links = Vec::new();
        let mut current = from;
        loop {
            let record = self.record(current)?;
            let Some(outer_env) = record.outer_env() else {
                return Ok(links);
            };
            links.push(match record {
                EnvironmentRecord::Materialized(record) => {
                    ScopeLink::Materialized(record.bindings().names())
                }
                EnvironmentRecord::Property(_) => ScopeLink::Variable,
            });
            current = outer_env;
        }
    }

    /// The innermost property-backed environment of the chain starting at
    /// `from`. `var` and function declarations of sloppy eval code land in it.
    pub fn variable_environment(
        &self,
        from: EnvironmentIndex,
    ) -> Result<EnvironmentIndex, EnvironmentError> {
        let mut current = from;
        loop {
            match self.record(current)? {
                EnvironmentRecord::Property(_) => return Ok(current),
                EnvironmentRecord::Materialized(record) => current = record.outer_env(),
            }
        }
    }

    /// The innermost environment of the chain starting at `from` that
    /// declares `name`.
    pub fn find_binding(
        &self,
        from: EnvironmentIndex,
        name: &str,
    ) -> Result<Option<EnvironmentIndex>, EnvironmentError> {
        let mut current = from;
        loop {
            let record = self.record(current)?;
            if record.has_binding(name) {
                return Ok(Some(current));
            }
            match record.outer_env() {
                Some(outer_env) => current = outer_env,
                None => return Ok(None),
            }
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.records.slot_count()
    }

    pub(crate) fn sweep(&mut self, marks: &[bool]) -> usize {
        self.records.sweep(marks)
    }

    fn check_parent(&self, parent: Option<EnvironmentIndex>) -> Result<(), EnvironmentError> {
        match parent {
            Some(parent) if !self.records.contains(parent) => Err(
                EnvironmentError::InvalidArgument("parent environment is no longer live"),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn names(list: &[&str]) -> Box<[Rc<str>]> {
        list.iter().map(|name| Rc::from(*name)).collect()
    }

    #[test]
    fn function_environment_layout() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let env = environments
            .new_function_environment(Some(global), "f", &["a", "b", "c"])
            .unwrap();
        let record = environments.get(env).unwrap();
        for (name, index) in [("f", 0), ("this", 1), ("arguments", 2), ("a", 3), ("b", 4), ("c", 5)] {
            assert_eq!(record.bindings().lookup(name), Some(index), "{name}");
        }
        assert_eq!(record.bindings().len(), 6);
        assert_eq!(record.outer_env(), Some(global));
        assert_eq!(record.kind(), EnvironmentKind::Materialized);
    }

    #[test]
    fn anonymous_function_environment_starts_with_this() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let env = environments
            .new_function_environment(Some(global), "", &["x"])
            .unwrap();
        let names = environments.get(env).unwrap().bindings().names();
        assert_eq!(&*names, &*self::names(&["this", "arguments", "x"]));
    }

    #[test]
    fn duplicate_parameters_share_a_slot() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let env = environments
            .new_function_environment(Some(global), "", &["a", "a"])
            .unwrap();
        let bindings = environments.get(env).unwrap().bindings();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.lookup("a"), Some(2));
    }

    #[test]
    fn materialized_constructors_require_a_parent() {
        let mut environments = Environments::new();
        assert_eq!(
            environments.new_function_environment(None, "f", &[]),
            Err(EnvironmentError::InvalidArgument(
                "materialized environment requires a parent environment"
            ))
        );
        assert!(matches!(
            environments.new_catch_environment(None),
            Err(EnvironmentError::InvalidArgument(_))
        ));
        assert!(matches!(
            environments.new_strict_eval_environment(None),
            Err(EnvironmentError::InvalidArgument(_))
        ));
        assert!(matches!(
            environments.reconstruct(None, &names(&["a"])),
            Err(EnvironmentError::InvalidArgument(_))
        ));
        assert!(environments.is_empty());
    }

    #[test]
    fn catch_and_strict_eval_environments_start_empty() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let catch = environments.new_catch_environment(Some(global)).unwrap();
        let eval = environments.new_strict_eval_environment(Some(catch)).unwrap();
        assert!(environments.get(catch).unwrap().bindings().is_empty());
        assert!(environments.get(eval).unwrap().bindings().is_empty());
        assert_eq!(environments.get(eval).unwrap().outer_env(), Some(catch));
    }

    #[test]
    fn reconstruction_preserves_lookup() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let original = environments
            .new_function_environment(Some(global), "g", &["x", "y", "x"])
            .unwrap();
        environments
            .record_mut(original)
            .unwrap()
            .declare("local", None)
            .unwrap();
        let names = environments.get(original).unwrap().bindings().names();
        let rebuilt = environments.reconstruct(Some(global), &names).unwrap();

        let original = environments.get(original).unwrap();
        let rebuilt = environments.get(rebuilt).unwrap();
        assert_eq!(original.bindings().len(), rebuilt.bindings().len());
        for binding in original.bindings() {
            assert_eq!(rebuilt.bindings().lookup(&binding.name), Some(binding.index));
        }
        assert!(rebuilt.has_storage());
        assert!(!original.has_storage());
        assert_eq!(rebuilt.read("local"), Ok(Some(Value::Undefined)));
    }

    #[test]
    fn compile_time_records_have_no_storage() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let env = environments
            .new_function_environment(Some(global), "", &["a"])
            .unwrap();
        assert!(matches!(
            environments.get(env).unwrap().read("a"),
            Err(EnvironmentError::InvalidState(_))
        ));
        assert!(matches!(
            environments.get_mut(env).unwrap().write("a", Value::Null),
            Err(EnvironmentError::InvalidState(_))
        ));
        assert!(matches!(
            environments.get_mut(global).unwrap().write("a", Value::Null),
            Err(EnvironmentError::InvalidState(_))
        ));
        assert!(!environments.get(global).unwrap().has_binding("a"));
    }

    #[test]
    fn materialized_write_to_undeclared_name_fails() {
        let mut environments = Environments::new();
        let global = environments.new_runtime_global_environment();
        let env = environments.reconstruct(Some(global), &names(&["a"])).unwrap();
        let record = environments.get_mut(env).unwrap();
        record.write("a", Value::Integer(1)).unwrap();
        assert_eq!(record.read("a"), Ok(Some(Value::Integer(1))));
        assert_eq!(record.read("b"), Ok(None));
        assert!(matches!(
            record.write("b", Value::Integer(2)),
            Err(EnvironmentError::InvalidState(_))
        ));
        assert_eq!(record.bindings().len(), 1);
    }

    #[test]
    fn property_write_declares_unknown_names() {
        let mut environments = Environments::new();
        let global = environments.new_runtime_global_environment();
        let record = environments.get_mut(global).unwrap();
        assert_eq!(record.read("x"), Ok(None));
        record.write("x", Value::Integer(1)).unwrap();
        record.write("y", Value::Boolean(true)).unwrap();
        assert_eq!(record.bindings().lookup("y"), Some(1));
        assert_eq!(record.read("x"), Ok(Some(Value::Integer(1))));
        assert!(record.needs_default_initialization());
    }

    #[test]
    fn resolution_counts_materialized_links() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let outer = environments
            .new_function_environment(Some(global), "outer", &["a"])
            .unwrap();
        let catch = environments.new_catch_environment(Some(outer)).unwrap();
        environments.record_mut(catch).unwrap().declare("e", None).unwrap();
        let inner = environments
            .new_function_environment(Some(catch), "", &["b"])
            .unwrap();

        assert_eq!(
            environments.resolve(inner, "b"),
            Ok(BindingLocation::Environment { depth: 0, index: 2 })
        );
        assert_eq!(
            environments.resolve(inner, "e"),
            Ok(BindingLocation::Environment { depth: 1, index: 0 })
        );
        assert_eq!(
            environments.resolve(inner, "a"),
            Ok(BindingLocation::Environment { depth: 2, index: 3 })
        );
        assert_eq!(environments.resolve(inner, "nope"), Ok(BindingLocation::Global));
        assert_eq!(environments.ancestor(inner, 2), Ok(outer));
        assert_eq!(environments.chain_shape(inner).unwrap().len(), 3);
    }

    #[test]
    fn variable_environments_make_outer_lookups_dynamic() {
        let mut environments = Environments::new();
        let global = environments.new_global_environment();
        let outer = environments
            .new_function_environment(Some(global), "outer", &["a"])
            .unwrap();
        let variables = environments.new_variable_environment(Some(outer)).unwrap();
        environments.record_mut(variables).unwrap().declare("v", None).unwrap();
        let catch = environments.new_catch_environment(Some(variables)).unwrap();
        environments.record_mut(catch).unwrap().declare("e", None).unwrap();
        let inner = environments
            .new_function_environment(Some(catch), "", &["b"])
            .unwrap();

        assert_eq!(
            environments.resolve(inner, "e"),
            Ok(BindingLocation::Environment { depth: 1, index: 0 })
        );
        assert_eq!(environments.resolve(inner, "v"), Ok(BindingLocation::Dynamic));
        assert_eq!(
            environments.resolve(inner, "a"),
            Ok(BindingLocation::Environment { depth: 3, index: 3 })
        );
        assert_eq!(environments.resolve(inner, "nope"), Ok(BindingLocation::Dynamic));
        assert_eq!(environments.resolve(outer, "nope"), Ok(BindingLocation::Global));
        assert!(matches!(
            environments.new_variable_environment(None),
            Err(EnvironmentError::InvalidArgument(_))
        ));

        let shape = environments.chain_shape(inner).unwrap();
        assert_eq!(shape.len(), 4);
        assert_eq!(shape[1], ScopeLink::Materialized(names(&["e"])));
        assert_eq!(shape[2], ScopeLink::Variable);
        assert_eq!(environments.variable_environment(inner), Ok(variables));
        assert_eq!(environments.variable_environment(outer), Ok(global));
    }

    #[test]
    fn name_lookup_walks_the_runtime_chain() {
        let mut environments = Environments::new();
        let global = environments.new_runtime_global_environment();
        let outer = environments.reconstruct(Some(global), &names(&["a"])).unwrap();
        let variables = environments.new_runtime_variable_environment(outer).unwrap();
        let inner = environments.reconstruct(Some(variables), &names(&["b"])).unwrap();
        environments
            .record_mut(variables)
            .unwrap()
            .write("v", Value::Integer(1))
            .unwrap();
        environments
            .record_mut(global)
            .unwrap()
            .write("g", Value::Integer(2))
            .unwrap();

        assert_eq!(environments.find_binding(inner, "b"), Ok(Some(inner)));
        assert_eq!(environments.find_binding(inner, "v"), Ok(Some(variables)));
        assert_eq!(environments.find_binding(inner, "a"), Ok(Some(outer)));
        assert_eq!(environments.find_binding(inner, "g"), Ok(Some(global)));
        assert_eq!(environments.find_binding(inner, "missing"), Ok(None));
    }
}
