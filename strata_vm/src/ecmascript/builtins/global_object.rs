// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::{
    ecmascript::{
        execution::{Agent, EnvironmentIndex, ExceptionType, ExecutionError},
        types::Value,
    },
    engine::bytecode::{CallFrame, compile_eval},
};

/// Native implementation of a builtin function: receives the agent, the
/// `this` value and the arguments.
pub type Behaviour = fn(&mut Agent, Value, &[Value]) -> Result<Value, ExecutionError>;

/// ### [19.2.1 eval ( x )](https://tc39.es/ecma262/#sec-eval-x)
///
/// Reached only through indirect calls; direct calls are intercepted by the
/// VM and go through [`perform_eval`] with the caller's environment.
pub(crate) fn eval(
    agent: &mut Agent,
    _this: Value,
    arguments: &[Value],
) -> Result<Value, ExecutionError> {
    // 1. Return ? PerformEval(x, false, false).
    perform_eval(agent, arguments.first().cloned().unwrap_or_default(), None)
}

/// ### [19.2.1.1 PerformEval ( x, strictCaller, direct )](https://tc39.es/ecma262/#sec-performeval)
///
/// `direct` carries the caller's current environment and strictness. An
/// indirect eval runs as sloppy code in the global environment.
///
/// The compile-time view of the caller's scope chain is rebuilt from the
/// shape of the live environments, so bindings of the caller resolve to the
/// same `(depth, index)` pairs the caller itself uses.
pub fn perform_eval(
    agent: &mut Agent,
    source: Value,
    direct: Option<(EnvironmentIndex, bool)>,
) -> Result<Value, ExecutionError> {
    // 2. If x is not a String, return x.
    let Value::String(source) = source else {
        return Ok(source);
    };
    let (caller_env, strict_caller) = direct.unwrap_or((agent.global_env, false));

    // 11. Perform the following substeps in an implementation-defined order,
    //     possibly interleaving parsing and error detection:
    //     a. Let script be ParseText(x, Script).
    //     b. If script is a List of errors, throw a SyntaxError exception.
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, &source, SourceType::default().with_script(true)).parse();
    if let Some(error) = parsed.errors.first() {
        let message = error.to_string();
        return Err(agent
            .throw_exception(ExceptionType::SyntaxError, &message)
            .into());
    }

    let caller_chain = agent.heap.environments.chain_shape(caller_env)?;
    let executable = compile_eval(&parsed.program, &caller_chain, strict_caller)?;
    tracing::debug!(
        direct = direct.is_some(),
        strict = executable.is_strict(),
        "evaluating eval code"
    );

    // 29. Let result be Completion(EvalDeclarationInstantiation(...)).
    // 30. If result is a normal completion, then
    //     a. Set result to Completion(Evaluation of body).
    let frame = CallFrame {
        environment: caller_env,
        this: Value::Undefined,
        arguments: &[],
        callee: None,
    };
    agent.run_frame(&executable, frame)
}
