// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::Ordering;

use super::{Executable, Instruction, instructions::Instr};
use crate::{
    ecmascript::{
        builtins::perform_eval,
        execution::{Agent, EnvironmentIndex, ExceptionType, ExecutionError, JsError},
        types::{FunctionHeapData, ObjectHeapData, Value},
    },
    heap::FunctionIndex,
};

/// What an executable runs with: the environment its code starts in and the
/// values of the call that started it.
#[derive(Debug)]
pub(crate) struct CallFrame<'a> {
    pub(crate) environment: EnvironmentIndex,
    pub(crate) this: Value,
    pub(crate) arguments: &'a [Value],
    pub(crate) callee: Option<FunctionIndex>,
}

/// Indicates how the execution of an instruction should affect the remainder of
/// execution that contains it.
#[must_use]
enum ContinuationKind {
    Normal,
    Return(Value),
}

/// Indicates a place to jump after an exception is thrown.
#[derive(Debug)]
struct ExceptionJumpTarget {
    /// Instruction pointer.
    ip: usize,
    /// The environment that was current when the handler was installed.
    environment: EnvironmentIndex,
    stack_depth: usize,
}

#[derive(Debug)]
pub(crate) struct Vm<'a> {
    /// Instruction pointer.
    ip: usize,
    stack: Vec<Value>,
    /// Current runtime environment.
    environment: EnvironmentIndex,
    /// Completion value of script and eval code.
    completion: Value,
    exception_jump_target_stack: Vec<ExceptionJumpTarget>,
    frame: CallFrame<'a>,
}

impl<'a> Vm<'a> {
    fn new(frame: CallFrame<'a>) -> Self {
        Self {
            ip: 0,
            stack: Vec::with_capacity(32),
            environment: frame.environment,
            completion: Value::Undefined,
            exception_jump_target_stack: Vec::new(),
            frame,
        }
    }

    /// Executes an executable using the virtual machine.
    pub(crate) fn execute(
        agent: &mut Agent,
        executable: &Executable,
        frame: CallFrame<'a>,
    ) -> Result<Value, ExecutionError> {
        if agent.options.print_internals {
            eprintln!();
            eprintln!("=== Executing Executable ===");
            eprint!("{}", executable.debug_print());
            eprintln!();
        }

        let mut vm = Vm::new(frame);
        loop {
            let Some(instr) = executable.get_instruction(&mut vm.ip) else {
                if vm.ip < executable.instructions.len() {
                    return Err(ExecutionError::InvalidBytecode("undecodable instruction"));
                }
                return Ok(Value::Undefined);
            };
            match vm.execute_instruction(agent, executable, &instr) {
                Ok(ContinuationKind::Normal) => {}
                Ok(ContinuationKind::Return(value)) => return Ok(value),
                Err(ExecutionError::Throw(error)) => vm.handle_error(error)?,
                Err(error) => return Err(error),
            }
        }
    }

    /// Unwinds to the innermost exception handler of this frame, or hands the
    /// error back if there is none.
    fn handle_error(&mut self, error: JsError) -> Result<(), JsError> {
        let Some(target) = self.exception_jump_target_stack.pop() else {
            return Err(error);
        };
        tracing::trace!(ip = target.ip, "exception caught");
        self.ip = target.ip;
        self.environment = target.environment;
        self.stack.truncate(target.stack_depth);
        self.stack.push(error.into_value());
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, ExecutionError> {
        self.stack
            .pop()
            .ok_or(ExecutionError::InvalidBytecode("value stack underflow"))
    }

    fn peek(&self) -> Result<&Value, ExecutionError> {
        self.stack
            .last()
            .ok_or(ExecutionError::InvalidBytecode("value stack underflow"))
    }

    /// Pops `count` call arguments, then the callee and the `this` value.
    fn pop_call(&mut self, count: usize) -> Result<(Value, Value, Vec<Value>), ExecutionError> {
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(ExecutionError::InvalidBytecode("value stack underflow"))?;
        let arguments = self.stack.split_off(start);
        let callee = self.pop()?;
        let this = self.pop()?;
        Ok((this, callee, arguments))
    }

    fn binding_environment(
        &self,
        agent: &Agent,
        depth: u32,
    ) -> Result<EnvironmentIndex, ExecutionError> {
        Ok(agent.heap.environments.ancestor(self.environment, depth)?)
    }

    fn execute_instruction(
        &mut self,
        agent: &mut Agent,
        executable: &Executable,
        instr: &Instr,
    ) -> Result<ContinuationKind, ExecutionError> {
        if agent.options.print_internals {
            eprintln!("Executing instruction {:?}", instr.kind);
        }
        match instr.kind {
            Instruction::LoadConstant => {
                let constant = executable
                    .constants
                    .get(instr.get_first_index())
                    .ok_or(ExecutionError::InvalidBytecode("constant index out of range"))?;
                self.stack.push(constant.clone());
            }
            Instruction::LoadUndefined => self.stack.push(Value::Undefined),
            Instruction::LoadNull => self.stack.push(Value::Null),
            Instruction::LoadTrue => self.stack.push(Value::Boolean(true)),
            Instruction::LoadFalse => self.stack.push(Value::Boolean(false)),
            Instruction::LoadEmpty => self.stack.push(Value::Empty),
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let value = self.peek()?.clone();
                self.stack.push(value);
            }
            Instruction::StoreCompletion => self.completion = self.pop()?,
            Instruction::LoadCompletion => self.stack.push(self.completion.clone()),
            Instruction::LoadArgument => {
                let argument = self
                    .frame
                    .arguments
                    .get(instr.get_first_index())
                    .cloned()
                    .unwrap_or_default();
                self.stack.push(argument);
            }
            Instruction::LoadThis => self.stack.push(self.frame.this.clone()),
            Instruction::LoadCallee => self
                .stack
                .push(self.frame.callee.map_or(Value::Undefined, Value::Function)),
            Instruction::CreateArgumentsObject => {
                let object = agent
                    .heap
                    .create_object(ObjectHeapData::arguments(self.frame.arguments));
                self.stack.push(Value::Object(object));
            }
            Instruction::GetBinding => {
                let environment = self.binding_environment(agent, instr.first_u32())?;
                let value = agent
                    .heap
                    .environments
                    .record(environment)?
                    .get_binding_value(instr.second_u32())?;
                self.stack.push(value);
            }
            Instruction::SetBinding => {
                let value = self.pop()?;
                let environment = self.binding_environment(agent, instr.first_u32())?;
                agent
                    .heap
                    .environments
                    .record_mut(environment)?
                    .set_binding_value(instr.second_u32(), value)?;
            }
            Instruction::GetGlobal | Instruction::TryGetGlobal => {
                let name = fetch_identifier(executable, instr)?;
                let value = agent
                    .heap
                    .environments
                    .record(agent.global_env)?
                    .read(name)?;
                match value {
                    Some(value) => self.stack.push(value),
                    None if instr.kind == Instruction::TryGetGlobal => {
                        self.stack.push(Value::Undefined)
                    }
                    None => return Err(not_defined(agent, name)),
                }
            }
            Instruction::SetGlobal => {
                let value = self.pop()?;
                let name = fetch_identifier(executable, instr)?;
                set_global(agent, executable.strict, name, value)?;
            }
            Instruction::GetName | Instruction::TryGetName => {
                let name = fetch_identifier(executable, instr)?;
                let environments = &agent.heap.environments;
                let value = match environments.find_binding(self.environment, name)? {
                    Some(environment) => environments.record(environment)?.read(name)?,
                    None => None,
                };
                match value {
                    Some(value) => self.stack.push(value),
                    None if instr.kind == Instruction::TryGetName => {
                        self.stack.push(Value::Undefined)
                    }
                    None => return Err(not_defined(agent, name)),
                }
            }
            Instruction::SetName => {
                let value = self.pop()?;
                let name = fetch_identifier(executable, instr)?;
                let environments = &mut agent.heap.environments;
                match environments.find_binding(self.environment, name)? {
                    Some(environment) => environments.record_mut(environment)?.write(name, value)?,
                    None => set_global(agent, executable.strict, name, value)?,
                }
            }
            Instruction::CreateVarBinding | Instruction::DefineVarBinding => {
                let value = self.pop()?;
                let name = fetch_identifier(executable, instr)?;
                let environments = &mut agent.heap.environments;
                let environment = environments.variable_environment(self.environment)?;
                let record = environments.record_mut(environment)?;
                if instr.kind == Instruction::DefineVarBinding || !record.has_binding(name) {
                    record.write(name, value)?;
                }
            }
            Instruction::EnterEnvironment => {
                let names = executable
                    .name_arrays
                    .get(instr.get_first_index())
                    .ok_or(ExecutionError::InvalidBytecode("name array index out of range"))?;
                self.environment = agent
                    .heap
                    .environments
                    .reconstruct(Some(self.environment), names)?;
            }
            Instruction::EnterVariableEnvironment => {
                self.environment = agent
                    .heap
                    .environments
                    .new_runtime_variable_environment(self.environment)?;
            }
            Instruction::ExitEnvironment => {
                self.environment = agent
                    .heap
                    .environments
                    .record(self.environment)?
                    .outer_env()
                    .ok_or(ExecutionError::InvalidBytecode(
                        "exited the outermost environment",
                    ))?;
            }
            Instruction::InstantiateFunction => {
                let template = executable
                    .functions
                    .get(instr.get_first_index())
                    .ok_or(ExecutionError::InvalidBytecode("function index out of range"))?
                    .clone();
                let function = agent.heap.create_function(FunctionHeapData::ECMAScript {
                    template,
                    environment: self.environment,
                });
                self.stack.push(Value::Function(function));
            }
            Instruction::GetProperty => {
                let object = self.pop()?;
                let key = fetch_identifier(executable, instr)?;
                let value = agent.get_property(&object, key)?;
                self.stack.push(value);
            }
            Instruction::GetComputedProperty => {
                let key = self.pop()?;
                let object = self.pop()?;
                let key = key.to_js_string(agent);
                let value = agent.get_property(&object, &key)?;
                self.stack.push(value);
            }
            Instruction::Call => {
                let (this, callee, arguments) = self.pop_call(instr.get_first_index())?;
                let result = agent.call(&callee, this, &arguments)?;
                self.stack.push(result);
            }
            Instruction::DirectEval => {
                let (this, callee, arguments) = self.pop_call(instr.get_first_index())?;
                let result = if callee == Value::Function(agent.intrinsic_eval) {
                    let source = arguments.into_iter().next().unwrap_or_default();
                    perform_eval(agent, source, Some((self.environment, executable.strict)))?
                } else {
                    agent.call(&callee, this, &arguments)?
                };
                self.stack.push(result);
            }
            Instruction::Add => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let result = if is_string_like(&lhs) || is_string_like(&rhs) {
                    let mut string = lhs.to_js_string(agent).to_string();
                    string.push_str(&rhs.to_js_string(agent));
                    Value::from_str(&string)
                } else {
                    Value::from_f64(lhs.to_number() + rhs.to_number())
                };
                self.stack.push(result);
            }
            Instruction::Subtract => self.apply_numeric(|a, b| a - b)?,
            Instruction::Multiply => self.apply_numeric(|a, b| a * b)?,
            Instruction::Divide => self.apply_numeric(|a, b| a / b)?,
            Instruction::Remainder => self.apply_numeric(|a, b| a % b)?,
            Instruction::LessThan => self.apply_relational(|order| order == Ordering::Less)?,
            Instruction::LessThanEquals => {
                self.apply_relational(|order| order != Ordering::Greater)?
            }
            Instruction::GreaterThan => {
                self.apply_relational(|order| order == Ordering::Greater)?
            }
            Instruction::GreaterThanEquals => {
                self.apply_relational(|order| order != Ordering::Less)?
            }
            Instruction::IsStrictlyEqual => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.stack.push(Value::Boolean(lhs.is_strictly_equal(&rhs)));
            }
            Instruction::IsLooselyEqual => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.stack.push(Value::Boolean(lhs.is_loosely_equal(&rhs)));
            }
            Instruction::Negate => {
                let value = self.pop()?;
                self.stack.push(Value::from_f64(-value.to_number()));
            }
            Instruction::ToNumber => {
                let value = self.pop()?;
                self.stack.push(Value::from_f64(value.to_number()));
            }
            Instruction::LogicalNot => {
                let value = self.pop()?;
                self.stack.push(Value::Boolean(!value.to_boolean()));
            }
            Instruction::Typeof => {
                let value = self.pop()?;
                self.stack.push(Value::from_str(value.type_of()));
            }
            Instruction::Jump => self.ip = instr.get_jump_slot(),
            Instruction::JumpIfFalse => {
                if !self.pop()?.to_boolean() {
                    self.ip = instr.get_jump_slot();
                }
            }
            Instruction::JumpIfTrue => {
                if self.pop()?.to_boolean() {
                    self.ip = instr.get_jump_slot();
                }
            }
            Instruction::PushExceptionJumpTarget => {
                self.exception_jump_target_stack.push(ExceptionJumpTarget {
                    ip: instr.get_jump_slot(),
                    environment: self.environment,
                    stack_depth: self.stack.len(),
                });
            }
            Instruction::PopExceptionJumpTarget => {
                self.exception_jump_target_stack
                    .pop()
                    .ok_or(ExecutionError::InvalidBytecode("no exception handler to pop"))?;
            }
            Instruction::Throw => {
                let value = self.pop()?;
                return Err(JsError::new(value).into());
            }
            Instruction::ThrowError => {
                let message = self.pop()?;
                let kind = u16::try_from(instr.get_first_index())
                    .ok()
                    .and_then(ExceptionType::from_u16)
                    .ok_or(ExecutionError::InvalidBytecode("unknown exception type"))?;
                let message = message.to_js_string(agent);
                return Err(agent.throw_exception(kind, &message).into());
            }
            Instruction::Return => return Ok(ContinuationKind::Return(self.pop()?)),
        }
        Ok(ContinuationKind::Normal)
    }

    fn apply_numeric(&mut self, operation: impl FnOnce(f64, f64) -> f64) -> Result<(), ExecutionError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        self.stack
            .push(Value::from_f64(operation(lhs.to_number(), rhs.to_number())));
        Ok(())
    }

    /// ### [7.2.13 IsLessThan ( x, y, LeftFirst )](https://tc39.es/ecma262/#sec-islessthan)
    ///
    /// Two strings compare by code units; anything else compares as numbers,
    /// and NaN on either side makes every comparison false.
    fn apply_relational(&mut self, test: impl FnOnce(Ordering) -> bool) -> Result<(), ExecutionError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let order = match (&lhs, &rhs) {
            (Value::String(a), Value::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
            _ => lhs.to_number().partial_cmp(&rhs.to_number()),
        };
        self.stack
            .push(Value::Boolean(order.is_some_and(test)));
        Ok(())
    }
}

fn fetch_identifier<'e>(executable: &'e Executable, instr: &Instr) -> Result<&'e str, ExecutionError> {
    executable
        .identifiers
        .get(instr.get_first_index())
        .map(|name| &**name)
        .ok_or(ExecutionError::InvalidBytecode("identifier index out of range"))
}

/// Operands that make `+` concatenate. Objects have no ToPrimitive here and
/// convert straight to their string form.
fn not_defined(agent: &mut Agent, name: &str) -> ExecutionError {
    let message = format!("{name} is not defined");
    agent
        .throw_exception(ExceptionType::ReferenceError, &message)
        .into()
}

/// Assignment to an unresolvable name. Sloppy code creates the global,
/// strict code throws.
fn set_global(
    agent: &mut Agent,
    strict: bool,
    name: &str,
    value: Value,
) -> Result<(), ExecutionError> {
    let global = agent.heap.environments.record_mut(agent.global_env)?;
    if strict && !global.has_binding(name) {
        return Err(not_defined(agent, name));
    }
    global.write(name, value)?;
    Ok(())
}

fn is_string_like(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Object(_) | Value::Function(_))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::bytecode::ExecutableContext;

    fn run(ctx: ExecutableContext) -> Result<Value, ExecutionError> {
        let mut agent = Agent::default();
        let executable = ctx.finish();
        let frame = CallFrame {
            environment: agent.global_env(),
            this: Value::Undefined,
            arguments: &[],
            callee: None,
        };
        agent.run_frame(&executable, frame)
    }

    #[test]
    fn arithmetic_on_the_stack() {
        let mut ctx = ExecutableContext::new(false);
        ctx.add_instruction_with_constant(Instruction::LoadConstant, Value::Integer(7))
            .unwrap();
        ctx.add_instruction_with_constant(Instruction::LoadConstant, Value::Integer(2))
            .unwrap();
        ctx.add_instruction(Instruction::Remainder);
        ctx.add_instruction(Instruction::Return);
        assert_eq!(run(ctx).unwrap(), Value::Integer(1));
    }

    #[test]
    fn handler_restores_stack_height() {
        let mut ctx = ExecutableContext::new(false);
        let handler = ctx.add_instruction_with_jump_slot(Instruction::PushExceptionJumpTarget);
        ctx.add_instruction(Instruction::LoadNull);
        ctx.add_instruction(Instruction::LoadNull);
        ctx.add_instruction(Instruction::LoadTrue);
        ctx.add_instruction(Instruction::Throw);
        ctx.set_jump_target_here(handler).unwrap();
        ctx.add_instruction(Instruction::Return);
        assert_eq!(run(ctx).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn uncaught_throw_leaves_the_frame() {
        let mut ctx = ExecutableContext::new(false);
        ctx.add_instruction_with_constant(Instruction::LoadConstant, Value::from_str("boom"))
            .unwrap();
        ctx.add_instruction(Instruction::Throw);
        let Err(ExecutionError::Throw(error)) = run(ctx) else {
            panic!("expected a throw");
        };
        assert_eq!(error.into_value(), Value::from_str("boom"));
    }

    #[test]
    fn string_comparison_uses_code_units() {
        let mut ctx = ExecutableContext::new(false);
        ctx.add_instruction_with_constant(Instruction::LoadConstant, Value::from_str("10"))
            .unwrap();
        ctx.add_instruction_with_constant(Instruction::LoadConstant, Value::from_str("9"))
            .unwrap();
        ctx.add_instruction(Instruction::LessThan);
        ctx.add_instruction(Instruction::Return);
        assert_eq!(run(ctx).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn missing_global_is_a_reference_error() {
        let mut ctx = ExecutableContext::new(false);
        ctx.add_instruction_with_identifier(Instruction::GetGlobal, "nope")
            .unwrap();
        ctx.add_instruction(Instruction::Return);
        assert!(matches!(run(ctx), Err(ExecutionError::Throw(_))));

        let mut ctx = ExecutableContext::new(false);
        ctx.add_instruction_with_identifier(Instruction::TryGetGlobal, "nope")
            .unwrap();
        ctx.add_instruction(Instruction::Return);
        assert_eq!(run(ctx).unwrap(), Value::Undefined);
    }

    #[test]
    fn stack_underflow_is_invalid_bytecode() {
        let mut ctx = ExecutableContext::new(false);
        ctx.add_instruction(Instruction::Pop);
        assert!(matches!(run(ctx), Err(ExecutionError::InvalidBytecode(_))));
    }
}
