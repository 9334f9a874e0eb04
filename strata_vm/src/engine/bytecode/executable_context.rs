// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use ahash::AHashMap;

use super::{CompileError, Executable, FunctionTemplate, IndexType, Instruction};
use crate::ecmascript::types::Value;

/// Position in the instruction stream: either a jump slot waiting for its
/// target or a target to jump back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpIndex {
    pub(crate) index: usize,
}

/// Context for executable creation only. This struct contains the things
/// needed for adding instructions and nothing else; scope tracking lives in
/// the compile context.
#[derive(Debug, Default)]
pub struct ExecutableContext {
    /// Instructions being built
    instructions: Vec<u8>,
    /// Constants being built
    constants: Vec<Value>,
    identifiers: Vec<Rc<str>>,
    identifier_lookup: AHashMap<Rc<str>, IndexType>,
    name_arrays: Vec<Box<[Rc<str>]>>,
    functions: Vec<Rc<FunctionTemplate>>,
    strict: bool,
}

pub(super) fn to_index(index: usize, what: &'static str) -> Result<IndexType, CompileError> {
    IndexType::try_from(index).map_err(|_| CompileError::TooManyEntries(what))
}

/// Constants are deduplicated by SameValue, so `0` and `-0` stay apart.
fn is_same_constant(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
        (a, b) => a == b,
    }
}

impl ExecutableContext {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Default::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn finish(self) -> Executable {
        Executable {
            instructions: self.instructions.into_boxed_slice(),
            constants: self.constants.into_boxed_slice(),
            identifiers: self.identifiers.into_boxed_slice(),
            name_arrays: self.name_arrays.into_boxed_slice(),
            functions: self.functions.into_boxed_slice(),
            strict: self.strict,
        }
    }

    fn push_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction.as_u8());
    }

    fn add_index(&mut self, index: IndexType) {
        self.instructions.extend_from_slice(&index.to_ne_bytes());
    }

    fn add_constant(&mut self, constant: Value) -> Result<IndexType, CompileError> {
        if let Some(index) = self
            .constants
            .iter()
            .position(|existing| is_same_constant(existing, &constant))
        {
            return to_index(index, "constants");
        }
        let index = to_index(self.constants.len(), "constants")?;
        self.constants.push(constant);
        Ok(index)
    }

    fn add_identifier(&mut self, identifier: &str) -> Result<IndexType, CompileError> {
        if let Some(&index) = self.identifier_lookup.get(identifier) {
            return Ok(index);
        }
        let index = to_index(self.identifiers.len(), "identifiers")?;
        let identifier: Rc<str> = Rc::from(identifier);
        self.identifiers.push(identifier.clone());
        self.identifier_lookup.insert(identifier, index);
        Ok(index)
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        debug_assert_eq!(instruction.argument_count(), 0);
        debug_assert!(!instruction.has_jump_slot());
        self.push_instruction(instruction);
    }

    pub fn add_instruction_with_immediate(&mut self, instruction: Instruction, immediate: IndexType) {
        debug_assert_eq!(instruction.argument_count(), 1);
        self.push_instruction(instruction);
        self.add_index(immediate);
    }

    pub fn add_instruction_with_immediate_and_immediate(
        &mut self,
        instruction: Instruction,
        immediate1: IndexType,
        immediate2: IndexType,
    ) {
        debug_assert_eq!(instruction.argument_count(), 2);
        self.push_instruction(instruction);
        self.add_index(immediate1);
        self.add_index(immediate2);
    }

    /// Adds a `GetBinding` or `SetBinding` for a resolved binding location.
    pub fn add_binding_instruction(
        &mut self,
        instruction: Instruction,
        depth: u32,
        index: u32,
    ) -> Result<(), CompileError> {
        debug_assert!(matches!(
            instruction,
            Instruction::GetBinding | Instruction::SetBinding
        ));
        let depth = to_index(depth as usize, "nested environments")?;
        let index = to_index(index as usize, "bindings")?;
        self.add_instruction_with_immediate_and_immediate(instruction, depth, index);
        Ok(())
    }

    pub fn add_instruction_with_constant(
        &mut self,
        instruction: Instruction,
        constant: impl Into<Value>,
    ) -> Result<(), CompileError> {
        debug_assert_eq!(instruction.argument_count(), 1);
        debug_assert!(instruction.has_constant_index());
        let constant = self.add_constant(constant.into())?;
        self.push_instruction(instruction);
        self.add_index(constant);
        Ok(())
    }

    pub fn add_instruction_with_identifier(
        &mut self,
        instruction: Instruction,
        identifier: &str,
    ) -> Result<(), CompileError> {
        debug_assert_eq!(instruction.argument_count(), 1);
        debug_assert!(instruction.has_identifier_index());
        let identifier = self.add_identifier(identifier)?;
        self.push_instruction(instruction);
        self.add_index(identifier);
        Ok(())
    }

    pub fn add_instruction_with_name_array(
        &mut self,
        instruction: Instruction,
        names: Box<[Rc<str>]>,
    ) -> Result<(), CompileError> {
        debug_assert_eq!(instruction.argument_count(), 1);
        debug_assert!(instruction.has_name_array_index());
        let index = to_index(self.name_arrays.len(), "name arrays")?;
        self.name_arrays.push(names);
        self.push_instruction(instruction);
        self.add_index(index);
        Ok(())
    }

    pub fn add_instruction_with_function(
        &mut self,
        instruction: Instruction,
        function: Rc<FunctionTemplate>,
    ) -> Result<(), CompileError> {
        debug_assert_eq!(instruction.argument_count(), 1);
        debug_assert!(instruction.has_function_index());
        let index = to_index(self.functions.len(), "functions")?;
        self.functions.push(function);
        self.push_instruction(instruction);
        self.add_index(index);
        Ok(())
    }

    pub fn add_instruction_with_jump_slot(&mut self, instruction: Instruction) -> JumpIndex {
        debug_assert!(instruction.has_jump_slot());
        self.push_instruction(instruction);
        let index = self.instructions.len();
        self.instructions.extend_from_slice(&0u32.to_ne_bytes());
        JumpIndex { index }
    }

    pub fn add_jump_instruction_to_index(
        &mut self,
        instruction: Instruction,
        jump_index: JumpIndex,
    ) -> Result<(), CompileError> {
        debug_assert!(instruction.has_jump_slot());
        let target = jump_target(jump_index.index)?;
        self.push_instruction(instruction);
        self.instructions.extend_from_slice(&target);
        Ok(())
    }

    pub fn get_jump_index_to_here(&self) -> JumpIndex {
        JumpIndex {
            index: self.instructions.len(),
        }
    }

    pub fn set_jump_target_here(&mut self, jump: JumpIndex) -> Result<(), CompileError> {
        let target = jump_target(self.instructions.len())?;
        self.instructions[jump.index..jump.index + 4].copy_from_slice(&target);
        Ok(())
    }
}

fn jump_target(target: usize) -> Result<[u8; 4], CompileError> {
    u32::try_from(target)
        .map(u32::to_ne_bytes)
        .map_err(|_| CompileError::TooManyEntries("instruction bytes"))
}
