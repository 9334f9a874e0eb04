// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use oxc_diagnostics::OxcDiagnostic;

use crate::{
    ecmascript::{
        builtins::{Behaviour, global_object},
        execution::{EnvironmentError, EnvironmentIndex},
        types::{FunctionHeapData, ObjectHeapData, ObjectKind, Value},
    },
    engine::bytecode::{CallFrame, CompileError, Executable, Vm},
    heap::{FunctionIndex, Heap, WorkQueues, heap_gc},
};

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Print disassembled bytecode to stderr before executing it.
    pub print_internals: bool,
    pub disable_gc: bool,
    /// Number of nested ECMAScript calls (direct eval included) after which
    /// a RangeError is thrown.
    pub max_call_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            print_internals: false,
            disable_gc: false,
            max_call_depth: 512,
        }
    }
}

/// A thrown ECMAScript value.
#[derive(Debug, Clone, PartialEq)]
pub struct JsError(Value);

impl JsError {
    pub(crate) fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

pub type JsResult<T> = std::result::Result<T, JsError>;

/// Abrupt completion of running bytecode.
///
/// Only `Throw` is visible to the running program; the other variants are
/// internal failures and are never caught by `try` statements.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("uncaught exception")]
    Throw(JsError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(&'static str),
    #[error("stale heap reference")]
    StaleReference,
}

impl From<JsError> for ExecutionError {
    fn from(value: JsError) -> Self {
        Self::Throw(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to parse script")]
    Parse(Vec<OxcDiagnostic>),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ExceptionType {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ExceptionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::EvalError => "EvalError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
            Self::TypeError => "TypeError",
            Self::UriError => "URIError",
        }
    }

    pub(crate) const fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::Error,
            1 => Self::EvalError,
            2 => Self::RangeError,
            3 => Self::ReferenceError,
            4 => Self::SyntaxError,
            5 => Self::TypeError,
            6 => Self::UriError,
            _ => return None,
        })
    }
}

/// Owner of the heap and the global environment. Everything that runs
/// bytecode goes through an agent.
#[derive(Debug)]
pub struct Agent {
    pub heap: Heap,
    pub(crate) options: Options,
    pub(crate) global_env: EnvironmentIndex,
    pub(crate) intrinsic_eval: FunctionIndex,
    /// Number of executables currently running. Garbage collection only
    /// happens while this is zero.
    pub(crate) execution_depth: usize,
}

impl Agent {
    pub fn new(options: Options) -> Self {
        let mut heap = Heap::new();
        let global_env = heap.environments.new_runtime_global_environment();
        let intrinsic_eval = heap.create_function(FunctionHeapData::Builtin {
            name: Rc::from("eval"),
            length: 1,
            behaviour: global_object::eval,
        });
        let global = heap
            .environments
            .get_mut(global_env)
            .expect("global environment was just created");
        for (name, value) in [
            ("undefined", Value::Undefined),
            ("NaN", Value::Number(f64::NAN)),
            ("Infinity", Value::Number(f64::INFINITY)),
            ("eval", Value::Function(intrinsic_eval)),
        ] {
            global
                .write(name, value)
                .expect("global environment has storage");
        }
        Self {
            heap,
            options,
            global_env,
            intrinsic_eval,
            execution_depth: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn global_env(&self) -> EnvironmentIndex {
        self.global_env
    }

    pub fn global_value(&self, name: &str) -> Option<Value> {
        self.heap
            .environments
            .get(self.global_env)?
            .read(name)
            .ok()
            .flatten()
    }

    pub fn define_global(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        self.heap
            .environments
            .record_mut(self.global_env)?
            .write(name, value)
    }

    pub fn define_global_function(
        &mut self,
        name: &str,
        length: u32,
        behaviour: Behaviour,
    ) -> Result<FunctionIndex, EnvironmentError> {
        let function = self.heap.create_function(FunctionHeapData::Builtin {
            name: Rc::from(name),
            length,
            behaviour,
        });
        self.define_global(name, Value::Function(function))?;
        Ok(function)
    }

    /// Creates an error object of the given kind and returns it as a thrown
    /// value.
    pub fn throw_exception(&mut self, kind: ExceptionType, message: &str) -> JsError {
        let object = self.heap.create_object(ObjectHeapData::error(kind, message));
        JsError::new(Value::Object(object))
    }

    pub fn exception_type(&self, error: &JsError) -> Option<ExceptionType> {
        let Value::Object(object) = error.value() else {
            return None;
        };
        match self.heap.objects.get(*object)?.kind {
            ObjectKind::Error(kind) => Some(kind),
            _ => None,
        }
    }

    /// Renders a thrown value the way an uncaught exception is reported.
    pub fn error_message(&self, error: &JsError) -> String {
        error.value().to_js_string(self).to_string()
    }

    pub fn get_property(&mut self, target: &Value, key: &str) -> JsResult<Value> {
        match target {
            Value::Undefined | Value::Null | Value::Empty => {
                let message = format!(
                    "Cannot read properties of {} (reading '{key}')",
                    target.to_js_string(self)
                );
                Err(self.throw_exception(ExceptionType::TypeError, &message))
            }
            Value::String(string) if key == "length" => {
                Ok(Value::from_f64(string.encode_utf16().count() as f64))
            }
            Value::Object(object) => Ok(self
                .heap
                .objects
                .get(*object)
                .map(|data| data.get(key))
                .unwrap_or_default()),
            Value::Function(function) => {
                let Some(data) = self.heap.functions.get(*function) else {
                    return Ok(Value::Undefined);
                };
                Ok(match key {
                    "name" => Value::from_str(data.name()),
                    "length" => Value::from_f64(f64::from(data.length())),
                    _ => Value::Undefined,
                })
            }
            _ => Ok(Value::Undefined),
        }
    }

    /// ### [7.3.13 Call ( F, V \[ , argumentsList \] )](https://tc39.es/ecma262/#sec-call)
    pub fn call(
        &mut self,
        function: &Value,
        this: Value,
        arguments: &[Value],
    ) -> Result<Value, ExecutionError> {
        let Value::Function(index) = function else {
            let message = format!("{} is not a function", function.to_js_string(self));
            return Err(self.throw_exception(ExceptionType::TypeError, &message).into());
        };
        let data = self
            .heap
            .functions
            .get(*index)
            .ok_or(ExecutionError::StaleReference)?;
        match data {
            FunctionHeapData::Builtin { behaviour, .. } => {
                let behaviour = *behaviour;
                behaviour(self, this, arguments)
            }
            FunctionHeapData::ECMAScript {
                template,
                environment,
            } => {
                let template = template.clone();
                let frame = CallFrame {
                    environment: *environment,
                    this,
                    arguments,
                    callee: Some(*index),
                };
                self.run_frame(&template.executable, frame)
            }
        }
    }

    /// Runs an executable in a new frame, enforcing the call depth limit.
    pub(crate) fn run_frame(
        &mut self,
        executable: &Executable,
        frame: CallFrame<'_>,
    ) -> Result<Value, ExecutionError> {
        if self.execution_depth >= self.options.max_call_depth {
            return Err(self
                .throw_exception(
                    ExceptionType::RangeError,
                    "Maximum call stack size exceeded",
                )
                .into());
        }
        self.execution_depth += 1;
        let result = Vm::execute(self, executable, frame);
        self.execution_depth -= 1;
        result
    }

    /// Collects everything not reachable from the global environment, the
    /// intrinsics, or `roots`. Does nothing while bytecode is running.
    pub fn gc(&mut self, roots: &[Value]) {
        if self.options.disable_gc || self.execution_depth > 0 {
            return;
        }
        let mut queues = WorkQueues::default();
        queues.environments.push(self.global_env);
        queues.functions.push(self.intrinsic_eval);
        for root in roots {
            queues.push_value(root);
        }
        let freed = heap_gc(&mut self.heap, queues);
        tracing::debug!(freed, "garbage collection finished");
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(Options::default())
    }
}
