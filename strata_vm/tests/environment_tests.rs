// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use strata_vm::{
    Agent, ExecutionError, RunError, Value,
    ecmascript::{
        execution::{ExceptionType, Options},
        scripts_and_modules::script::script_evaluation,
        types::{FunctionHeapData, StaticType},
    },
    engine::bytecode::{ExecutableContext, Instruction},
};

fn run(agent: &mut Agent, source: &str) -> Value {
    match agent.run_script(source) {
        Ok(value) => value,
        Err(RunError::Execution(ExecutionError::Throw(error))) => {
            panic!("uncaught exception: {}", agent.error_message(&error))
        }
        Err(error) => panic!("{error}"),
    }
}

fn closure_environment(agent: &Agent, value: &Value) -> strata_vm::ecmascript::execution::EnvironmentIndex {
    let Value::Function(function) = value else {
        panic!("expected a function, got {value:?}");
    };
    match agent.heap.functions.get(*function) {
        Some(FunctionHeapData::ECMAScript { environment, .. }) => *environment,
        _ => panic!("expected an ECMAScript function"),
    }
}

#[test]
fn closures_share_their_activation() {
    let mut agent = Agent::default();
    let result = run(
        &mut agent,
        "function counter() { var n = 0; return function () { n = n + 1; return n; }; }
        var a = counter();
        var b = counter();
        a(); a(); b();
        a() * 10 + b()",
    );
    assert_eq!(result, Value::Integer(32));

    let a = agent.global_value("a").unwrap();
    let b = agent.global_value("b").unwrap();
    assert_ne!(closure_environment(&agent, &a), closure_environment(&agent, &b));
}

#[test]
fn closures_created_by_one_activation_share_it() {
    let mut agent = Agent::default();
    let result = run(
        &mut agent,
        "var get; var set;
        function pair() { var v = 1; get = function () { return v; }; set = function (x) { v = x; }; }
        pair();
        set(9);
        get()",
    );
    assert_eq!(result, Value::Integer(9));
    let get = agent.global_value("get").unwrap();
    let set = agent.global_value("set").unwrap();
    assert_eq!(closure_environment(&agent, &get), closure_environment(&agent, &set));
}

#[test]
fn duplicate_parameters_observe_the_last_argument() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "function f(a, a) { return a; } f(1, 2)"),
        Value::Integer(2)
    );
    assert_eq!(run(&mut agent, "f(1)"), Value::Undefined);
    assert_eq!(
        run(&mut agent, "function g(a, a) { return arguments.length; } g(1, 2)"),
        Value::Integer(2)
    );
}

#[test]
fn function_declarations_win_over_plain_vars() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "var g; function g() { return 1; } typeof g"),
        Value::from_str("function")
    );
    assert_eq!(
        run(&mut agent, "function h() { return 1; } var h = 5; h"),
        Value::Integer(5)
    );
    assert_eq!(
        run(
            &mut agent,
            "function outer() { var k; function k() {} return typeof k; } outer()"
        ),
        Value::from_str("function")
    );
}

#[test]
fn global_hoisting_keeps_existing_values() {
    let mut agent = Agent::default();
    run(&mut agent, "var x = 5;");
    assert_eq!(run(&mut agent, "var x; x"), Value::Integer(5));
}

#[test]
fn function_locals_start_undefined() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "function f() { var seen = local; var local = 1; return seen; } f()"),
        Value::Undefined
    );
}

#[test]
fn arguments_and_this() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "function f() { return arguments[1]; } f('a', 'b')"),
        Value::from_str("b")
    );
    assert_eq!(
        run(&mut agent, "function t() { return this; } t()"),
        Value::Undefined
    );
    assert_eq!(
        run(&mut agent, "var s = 'str'; function len() { return this.length; } len.length"),
        Value::Integer(0)
    );
}

#[test]
fn named_function_expressions_see_themselves() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); }; fact(5)"
        ),
        Value::Integer(120)
    );
}

#[test]
fn try_catch_binds_the_thrown_value() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "var r; try { nope; } catch (e) { r = e.name; } r"),
        Value::from_str("ReferenceError")
    );
    assert_eq!(
        run(&mut agent, "try { throw 1; } catch (e) {} typeof e"),
        Value::from_str("undefined")
    );
    assert_eq!(
        run(
            &mut agent,
            "function f() { try { throw 7; } catch (e) { return function () { return e; }; } } f()()"
        ),
        Value::Integer(7)
    );
    assert_eq!(
        run(
            &mut agent,
            "function t() { throw 'x'; } var r2; try { t(); } catch (e) { r2 = e; } r2"
        ),
        Value::from_str("x")
    );
    assert_eq!(
        run(&mut agent, "var c = 0; try { throw 1; } catch { c = 2; } c"),
        Value::Integer(2)
    );
}

#[test]
fn uncaught_exceptions_reach_the_embedder() {
    let mut agent = Agent::default();
    let Err(RunError::Execution(ExecutionError::Throw(error))) = agent.run_script("null.x") else {
        panic!("expected an uncaught TypeError");
    };
    assert_eq!(agent.exception_type(&error), Some(ExceptionType::TypeError));
}

#[test]
fn strict_assignment_to_undeclared_global_throws() {
    let mut agent = Agent::default();
    let Err(RunError::Execution(ExecutionError::Throw(error))) =
        agent.run_script("'use strict'; undeclared = 1;")
    else {
        panic!("expected a ReferenceError");
    };
    assert_eq!(agent.exception_type(&error), Some(ExceptionType::ReferenceError));
    assert_eq!(run(&mut agent, "implicit = 3; implicit"), Value::Integer(3));
}

#[test]
fn strict_scripts_hoist_global_declarations() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "'use strict'; function f() { return 1; } f()"),
        Value::Integer(1)
    );
    assert_eq!(run(&mut agent, "'use strict'; var x; x"), Value::Undefined);
    assert_eq!(
        run(&mut agent, "'use strict'; var early = late; var late = 2; typeof early + late"),
        Value::from_str("undefined2")
    );
    assert_eq!(agent.global_value("late"), Some(Value::Integer(2)));
}

#[test]
fn strict_scripts_redeclare_functions() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "'use strict'; function g() { return 1; } function g() { return 2; } g()"
        ),
        Value::Integer(2)
    );
    assert_eq!(
        run(&mut agent, "'use strict'; var h; function h() {} typeof h"),
        Value::from_str("function")
    );
    // A later script replaces the global function.
    assert_eq!(
        run(&mut agent, "'use strict'; function g() { return 3; } g()"),
        Value::Integer(3)
    );
}

#[test]
fn call_depth_is_bounded() {
    let mut agent = Agent::new(Options {
        max_call_depth: 16,
        ..Options::default()
    });
    assert_eq!(
        run(
            &mut agent,
            "function r() { return r(); } var m; try { r(); } catch (e) { m = e.name; } m"
        ),
        Value::from_str("RangeError")
    );
    let Err(RunError::Execution(ExecutionError::Throw(error))) = agent.run_script("r()") else {
        panic!("expected a RangeError");
    };
    assert_eq!(agent.exception_type(&error), Some(ExceptionType::RangeError));
}

#[test]
fn emitted_throw_raises_an_error_object() {
    let mut agent = Agent::default();
    let mut ctx = ExecutableContext::new(false);
    ctx.emit_throw(ExceptionType::TypeError, "custom").unwrap();
    let executable = ctx.finish();
    let Err(ExecutionError::Throw(error)) = script_evaluation(&mut agent, &executable) else {
        panic!("expected a thrown TypeError");
    };
    assert_eq!(agent.error_message(&error), "TypeError: custom");
}

#[test]
fn emitted_placeholders_evaluate_to_their_defaults() {
    let mut agent = Agent::default();
    for (ty, expected) in [
        (StaticType::Boolean, Value::Boolean(false)),
        (StaticType::Integer, Value::Integer(0)),
        (StaticType::Float, Value::Number(0.0)),
        (StaticType::Null, Value::Null),
        (StaticType::Undefined, Value::Undefined),
        (StaticType::Object, Value::Empty),
    ] {
        let mut ctx = ExecutableContext::new(false);
        ctx.emit_placeholder(ty).unwrap();
        ctx.add_instruction(Instruction::Return);
        let executable = ctx.finish();
        assert_eq!(script_evaluation(&mut agent, &executable).unwrap(), expected, "{ty:?}");
    }
}
