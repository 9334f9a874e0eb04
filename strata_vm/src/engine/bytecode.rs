// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod bytecode_compiler;
mod executable;
mod executable_context;
mod instructions;
mod value_emission;
mod vm;

pub(crate) use bytecode_compiler::{CompileContext, compile_eval};
pub use bytecode_compiler::{CompileError, compile_script};
pub use executable::{Executable, FunctionTemplate, IndexType};
pub use executable_context::{ExecutableContext, JumpIndex};
pub use instructions::{Instr, Instruction, InstructionIter};
pub(crate) use vm::{CallFrame, Vm};
