// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::IndexType;

/// Operations of the stack machine.
///
/// Operands are taken from and results pushed to the value stack. Immediate
/// arguments are encoded after the opcode: `IndexType` sized for most
/// instructions, a 32-bit absolute offset for jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    /// Push a value from the constant table.
    LoadConstant,
    /// Push `undefined`.
    LoadUndefined,
    /// Push `null`.
    LoadNull,
    LoadTrue,
    LoadFalse,
    /// Push the empty reference.
    LoadEmpty,
    Pop,
    /// Push a copy of the top of the stack.
    Dup,
    /// Pop a value and remember it as the completion value of the script or
    /// eval code.
    StoreCompletion,
    /// Push the remembered completion value.
    LoadCompletion,
    /// Push the argument at the immediate index, or `undefined`.
    LoadArgument,
    /// Push the `this` value of the running frame.
    LoadThis,
    /// Push the function object of the running frame.
    LoadCallee,
    /// Push a new unmapped arguments object for the running frame.
    CreateArgumentsObject,
    /// Push the value of a binding in the current scope chain. The first
    /// immediate is the number of parent links to follow, the second the
    /// binding index in the environment found there.
    GetBinding,
    /// Pop a value and store it into a binding addressed like `GetBinding`.
    SetBinding,
    /// Push the named global binding; throws a ReferenceError if it does not
    /// exist.
    GetGlobal,
    /// Push the named global binding, or `undefined` if it does not exist.
    TryGetGlobal,
    /// Pop a value and store it into the named global binding. Strict code
    /// throws a ReferenceError for undeclared names.
    SetGlobal,
    /// Push the named binding of the innermost environment in the current
    /// scope chain that declares it; throws a ReferenceError if none does.
    GetName,
    /// Like `GetName`, but pushes `undefined` for an unresolvable name.
    TryGetName,
    /// Pop a value and store it into the innermost binding of that name in
    /// the current scope chain. Unresolvable names behave like `SetGlobal`.
    SetName,
    /// Pop a value and store it into the named binding of the nearest
    /// property-backed environment unless that binding already exists.
    CreateVarBinding,
    /// Pop a value and store it into the named binding of the nearest
    /// property-backed environment, declaring it if needed.
    DefineVarBinding,
    /// Reconstruct an environment from the name array at the immediate index,
    /// with the current environment as parent, and make it current.
    EnterEnvironment,
    /// Create an empty property-backed environment with the current
    /// environment as parent and make it current.
    EnterVariableEnvironment,
    /// Make the parent of the current environment current.
    ExitEnvironment,
    /// Push a closure over the current environment for the function at the
    /// immediate index.
    InstantiateFunction,
    /// Replace the top of the stack with its named property.
    GetProperty,
    /// Pop a key and an object, push the property.
    GetComputedProperty,
    /// Call with the immediate number of arguments. The stack holds the
    /// `this` value, the callee, then the arguments.
    Call,
    /// Like `Call`, but performs a direct eval if the callee is the
    /// intrinsic `eval` function.
    DirectEval,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    IsStrictlyEqual,
    IsLooselyEqual,
    /// Unary `-`.
    Negate,
    /// Unary `+`.
    ToNumber,
    LogicalNot,
    Typeof,
    Jump,
    /// Pop a value and jump if it is falsy.
    JumpIfFalse,
    /// Pop a value and jump if it is truthy.
    JumpIfTrue,
    /// Install an exception handler at the jump target. The handler runs
    /// with the current environment and stack height restored and the
    /// thrown value pushed.
    PushExceptionJumpTarget,
    PopExceptionJumpTarget,
    /// Pop a value and throw it.
    Throw,
    /// Pop a message and throw a new error object of the exception type at
    /// the immediate.
    ThrowError,
    /// Pop a value and return it from the running frame.
    Return,
}

impl Instruction {
    pub(crate) const ALL: [Instruction; 55] = [
        Instruction::LoadConstant,
        Instruction::LoadUndefined,
        Instruction::LoadNull,
        Instruction::LoadTrue,
        Instruction::LoadFalse,
        Instruction::LoadEmpty,
        Instruction::Pop,
        Instruction::Dup,
        Instruction::StoreCompletion,
        Instruction::LoadCompletion,
        Instruction::LoadArgument,
        Instruction::LoadThis,
        Instruction::LoadCallee,
        Instruction::CreateArgumentsObject,
        Instruction::GetBinding,
        Instruction::SetBinding,
        Instruction::GetGlobal,
        Instruction::TryGetGlobal,
        Instruction::SetGlobal,
        Instruction::GetName,
        Instruction::TryGetName,
        Instruction::SetName,
        Instruction::CreateVarBinding,
        Instruction::DefineVarBinding,
        Instruction::EnterEnvironment,
        Instruction::EnterVariableEnvironment,
        Instruction::ExitEnvironment,
        Instruction::InstantiateFunction,
        Instruction::GetProperty,
        Instruction::GetComputedProperty,
        Instruction::Call,
        Instruction::DirectEval,
        Instruction::Add,
        Instruction::Subtract,
        Instruction::Multiply,
        Instruction::Divide,
        Instruction::Remainder,
        Instruction::LessThan,
        Instruction::LessThanEquals,
        Instruction::GreaterThan,
        Instruction::GreaterThanEquals,
        Instruction::IsStrictlyEqual,
        Instruction::IsLooselyEqual,
        Instruction::Negate,
        Instruction::ToNumber,
        Instruction::LogicalNot,
        Instruction::Typeof,
        Instruction::Jump,
        Instruction::JumpIfFalse,
        Instruction::JumpIfTrue,
        Instruction::PushExceptionJumpTarget,
        Instruction::PopExceptionJumpTarget,
        Instruction::Throw,
        Instruction::ThrowError,
        Instruction::Return,
    ];

    /// Number of `IndexType` immediates. Jump instructions carry a jump slot
    /// instead, see [`Instruction::has_jump_slot`].
    pub fn argument_count(self) -> u8 {
        match self {
            Self::GetBinding | Self::SetBinding => 2,
            Self::LoadConstant
            | Self::LoadArgument
            | Self::GetGlobal
            | Self::TryGetGlobal
            | Self::SetGlobal
            | Self::GetName
            | Self::TryGetName
            | Self::SetName
            | Self::CreateVarBinding
            | Self::DefineVarBinding
            | Self::EnterEnvironment
            | Self::InstantiateFunction
            | Self::GetProperty
            | Self::Call
            | Self::DirectEval
            | Self::ThrowError => 1,
            _ => 0,
        }
    }

    pub fn has_constant_index(self) -> bool {
        matches!(self, Self::LoadConstant)
    }

    pub fn has_identifier_index(self) -> bool {
        matches!(
            self,
            Self::GetGlobal
                | Self::TryGetGlobal
                | Self::SetGlobal
                | Self::GetName
                | Self::TryGetName
                | Self::SetName
                | Self::CreateVarBinding
                | Self::DefineVarBinding
                | Self::GetProperty
        )
    }

    pub fn has_name_array_index(self) -> bool {
        matches!(self, Self::EnterEnvironment)
    }

    pub fn has_function_index(self) -> bool {
        matches!(self, Self::InstantiateFunction)
    }

    pub fn has_jump_slot(self) -> bool {
        matches!(
            self,
            Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue | Self::PushExceptionJumpTarget
        )
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Instruction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let instruction = *Self::ALL.get(value as usize).ok_or(())?;
        if instruction.as_u8() == value {
            Ok(instruction)
        } else {
            Err(())
        }
    }
}

/// A decoded instruction together with its immediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub kind: Instruction,
    args: [u32; 2],
}

impl Instr {
    pub(super) fn consume_instruction(instructions: &[u8], ip: &mut usize) -> Option<Instr> {
        let kind = Instruction::try_from(*instructions.get(*ip)?).ok()?;
        let mut position = *ip + 1;
        let mut args = [0; 2];
        if kind.has_jump_slot() {
            let bytes = instructions.get(position..position + 4)?;
            args[0] = u32::from_ne_bytes(<[u8; 4]>::try_from(bytes).ok()?);
            position += 4;
        } else {
            for arg in args.iter_mut().take(kind.argument_count() as usize) {
                let bytes = instructions.get(position..position + 2)?;
                *arg = u32::from(IndexType::from_ne_bytes([bytes[0], bytes[1]]));
                position += 2;
            }
        }
        *ip = position;
        Some(Instr { kind, args })
    }

    pub fn get_first_index(&self) -> usize {
        debug_assert!(self.kind.argument_count() >= 1);
        self.args[0] as usize
    }

    pub fn get_second_index(&self) -> usize {
        debug_assert!(self.kind.argument_count() == 2);
        self.args[1] as usize
    }

    pub fn get_jump_slot(&self) -> usize {
        debug_assert!(self.kind.has_jump_slot());
        self.args[0] as usize
    }

    pub(crate) fn first_u32(&self) -> u32 {
        self.args[0]
    }

    pub(crate) fn second_u32(&self) -> u32 {
        self.args[1]
    }
}

/// Walks an encoded instruction stream, yielding each instruction with the
/// offset it starts at.
pub struct InstructionIter<'a> {
    instructions: &'a [u8],
    ip: usize,
}

impl<'a> InstructionIter<'a> {
    pub(crate) fn new(instructions: &'a [u8]) -> Self {
        Self {
            instructions,
            ip: 0,
        }
    }
}

impl Iterator for InstructionIter<'_> {
    type Item = (usize, Instr);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.ip;
        Instr::consume_instruction(self.instructions, &mut self.ip).map(|instr| (start, instr))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opcode_table_matches_discriminants() {
        for value in 0..=Instruction::Return.as_u8() {
            let instruction = Instruction::try_from(value).unwrap();
            assert_eq!(instruction.as_u8(), value);
        }
        assert!(Instruction::try_from(Instruction::Return.as_u8() + 1).is_err());
        assert!(Instruction::try_from(u8::MAX).is_err());
    }

    #[test]
    fn jumps_carry_no_index_immediates() {
        for instruction in Instruction::ALL {
            if instruction.has_jump_slot() {
                assert_eq!(instruction.argument_count(), 0, "{instruction:?}");
            }
        }
    }

    #[test]
    fn truncated_stream_stops_decoding() {
        let bytes = [Instruction::GetBinding.as_u8(), 1, 0];
        let mut ip = 0;
        assert_eq!(Instr::consume_instruction(&bytes, &mut ip), None);
        assert_eq!(ip, 0);
    }
}
