// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{fmt::Write, rc::Rc};

use super::{Instr, Instruction, InstructionIter};
use crate::ecmascript::{execution::ExceptionType, types::Value};

pub type IndexType = u16;

/// Compiled code of a function, ready to be closed over an environment.
#[derive(Debug)]
pub struct FunctionTemplate {
    pub name: Rc<str>,
    /// Number of formal parameters.
    pub length: u32,
    pub strict: bool,
    pub executable: Rc<Executable>,
}

/// An immutable, finished instruction stream with the tables its immediates
/// refer to.
#[derive(Debug)]
pub struct Executable {
    pub(crate) instructions: Box<[u8]>,
    pub(crate) constants: Box<[Value]>,
    pub(crate) identifiers: Box<[Rc<str>]>,
    pub(crate) name_arrays: Box<[Box<[Rc<str>]>]>,
    pub(crate) functions: Box<[Rc<FunctionTemplate>]>,
    pub(crate) strict: bool,
}

impl Executable {
    pub fn instructions(&self) -> InstructionIter<'_> {
        InstructionIter::new(&self.instructions)
    }

    pub fn instruction_bytes(&self) -> &[u8] {
        &self.instructions
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn identifiers(&self) -> &[Rc<str>] {
        &self.identifiers
    }

    pub fn name_arrays(&self) -> &[Box<[Rc<str>]>] {
        &self.name_arrays
    }

    pub fn functions(&self) -> &[Rc<FunctionTemplate>] {
        &self.functions
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub(crate) fn get_instruction(&self, ip: &mut usize) -> Option<Instr> {
        Instr::consume_instruction(&self.instructions, ip)
    }

    /// Disassembly of this executable and, after it, every nested function.
    pub fn debug_print(&self) -> String {
        let mut out = String::new();
        self.debug_print_into(&mut out, "<top level>");
        out
    }

    fn debug_print_into(&self, out: &mut String, name: &str) {
        let _ = writeln!(
            out,
            "== {name}{} ==",
            if self.strict { " (strict)" } else { "" }
        );
        for (ip, instr) in self.instructions() {
            let _ = writeln!(out, "{ip:>5}: {}", self.describe(&instr));
        }
        for function in self.functions.iter() {
            let name: &str = if function.name.is_empty() {
                "<anonymous>"
            } else {
                &function.name
            };
            function.executable.debug_print_into(out, name);
        }
    }

    fn describe(&self, instr: &Instr) -> String {
        let kind = instr.kind;
        if kind.has_jump_slot() {
            return format!("{kind:?} -> {}", instr.get_jump_slot());
        }
        match kind.argument_count() {
            0 => format!("{kind:?}"),
            2 => format!(
                "{kind:?} {} {}",
                instr.get_first_index(),
                instr.get_second_index()
            ),
            _ => {
                let index = instr.get_first_index();
                let detail = if kind.has_constant_index() {
                    self.constants.get(index).map(debug_print_constant)
                } else if kind.has_identifier_index() {
                    self.identifiers.get(index).map(|name| name.to_string())
                } else if kind.has_name_array_index() {
                    self.name_arrays.get(index).map(|names| format!("{:?}", names))
                } else if kind.has_function_index() {
                    self.functions
                        .get(index)
                        .map(|function| format!("function {}", function.name))
                } else if kind == Instruction::ThrowError {
                    ExceptionType::from_u16(index as IndexType).map(|kind| kind.as_str().to_string())
                } else {
                    None
                };
                match detail {
                    Some(detail) => format!("{kind:?} {index} ({detail})"),
                    None => format!("{kind:?} {index}"),
                }
            }
        }
    }
}

fn debug_print_constant(constant: &Value) -> String {
    match constant {
        Value::String(string) => format!("{string:?}"),
        Value::Integer(integer) => integer.to_string(),
        Value::Number(number) => ryu_js::Buffer::new().format(*number).to_string(),
        other => format!("{other:?}"),
    }
}
