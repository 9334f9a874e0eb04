// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical value loads shared by every code generation site.

use std::rc::Rc;

use super::{CompileError, ExecutableContext, Instruction};
use crate::ecmascript::{
    execution::ExceptionType,
    types::{StaticType, Value},
};

impl ExecutableContext {
    pub fn emit_undefined(&mut self) {
        self.add_instruction(Instruction::LoadUndefined);
    }

    pub fn emit_null(&mut self) {
        self.add_instruction(Instruction::LoadNull);
    }

    /// Pushes a well-typed dummy for `static_type`. Used on paths that
    /// cannot complete normally but still have to leave a value behind.
    pub fn emit_placeholder(&mut self, static_type: StaticType) -> Result<(), CompileError> {
        match static_type {
            StaticType::Boolean => self.add_instruction(Instruction::LoadFalse),
            StaticType::Integer => {
                self.add_instruction_with_constant(Instruction::LoadConstant, Value::Integer(0))?
            }
            StaticType::Null => self.emit_null(),
            StaticType::Float => {
                self.add_instruction_with_constant(Instruction::LoadConstant, Value::Number(0.0))?
            }
            StaticType::Undefined => self.emit_undefined(),
            reference if reference.is_reference() => self.add_instruction(Instruction::LoadEmpty),
            unsupported => return Err(CompileError::UnsupportedType(unsupported)),
        }
        Ok(())
    }

    /// Throws a new error object of category `kind` when executed.
    pub fn emit_throw(&mut self, kind: ExceptionType, message: &str) -> Result<(), CompileError> {
        self.add_instruction_with_constant(
            Instruction::LoadConstant,
            Value::String(Rc::from(message)),
        )?;
        self.add_instruction_with_immediate(Instruction::ThrowError, kind as u16);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::bytecode::Executable;

    fn kinds(executable: &Executable) -> Vec<Instruction> {
        executable.instructions().map(|(_, instr)| instr.kind).collect()
    }

    #[test]
    fn placeholders_for_supported_types() {
        let mut ctx = ExecutableContext::new(false);
        for static_type in [
            StaticType::Boolean,
            StaticType::Integer,
            StaticType::Null,
            StaticType::Float,
            StaticType::Undefined,
            StaticType::Object,
            StaticType::Value,
        ] {
            ctx.emit_placeholder(static_type).unwrap();
        }
        let executable = ctx.finish();
        assert_eq!(
            kinds(&executable),
            [
                Instruction::LoadFalse,
                Instruction::LoadConstant,
                Instruction::LoadNull,
                Instruction::LoadConstant,
                Instruction::LoadUndefined,
                Instruction::LoadEmpty,
                Instruction::LoadEmpty,
            ]
        );
        assert_eq!(executable.constants(), [Value::Integer(0), Value::Number(0.0)]);
    }

    #[test]
    fn placeholder_for_unsupported_types_fails() {
        let mut ctx = ExecutableContext::new(false);
        for static_type in [StaticType::Void, StaticType::BigInt, StaticType::Symbol] {
            assert_eq!(
                ctx.emit_placeholder(static_type),
                Err(CompileError::UnsupportedType(static_type))
            );
        }
        assert!(ctx.finish().instructions().next().is_none());
    }

    #[test]
    fn throw_loads_the_message_then_raises() {
        let mut ctx = ExecutableContext::new(true);
        ctx.emit_throw(ExceptionType::TypeError, "boom").unwrap();
        let executable = ctx.finish();
        let decoded: Vec<_> = executable.instructions().map(|(_, instr)| instr).collect();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].kind, Instruction::LoadConstant);
        assert_eq!(decoded[1].kind, Instruction::ThrowError);
        assert_eq!(
            decoded[1].get_first_index(),
            ExceptionType::TypeError as usize
        );
        assert_eq!(executable.constants(), [Value::from_str("boom")]);
    }
}
