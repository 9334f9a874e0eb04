// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use strata_vm::{Agent, ExecutionError, RunError, Value};

fn run(agent: &mut Agent, source: &str) -> Value {
    match agent.run_script(source) {
        Ok(value) => value,
        Err(RunError::Execution(ExecutionError::Throw(error))) => {
            panic!("uncaught exception: {}", agent.error_message(&error))
        }
        Err(error) => panic!("{error}"),
    }
}

#[test]
fn direct_eval_reads_caller_bindings() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "function g(a) { return eval('a * 2'); } g(21)"),
        Value::Integer(42)
    );
}

#[test]
fn sloppy_direct_eval_mutates_caller_bindings() {
    let mut agent = Agent::default();
    assert_eq!(
        run(&mut agent, "function f() { var x = 1; eval('x = 2'); return x; } f()"),
        Value::Integer(2)
    );
    assert_eq!(
        run(
            &mut agent,
            "function h() { var k = 1; eval('function k() { return 9; }'); return k(); } h()"
        ),
        Value::Integer(9)
    );
}

#[test]
fn sloppy_eval_in_a_function_declares_into_the_activation() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function f() { eval('var z = 5'); return typeof z; } f() + ':' + typeof z"
        ),
        Value::from_str("number:undefined")
    );
    assert_eq!(agent.global_value("z"), None);
}

#[test]
fn sloppy_eval_at_top_level_declares_globals() {
    let mut agent = Agent::default();
    run(&mut agent, "eval('var top = 3; function topFn() { return top; }');");
    assert_eq!(agent.global_value("top"), Some(Value::Integer(3)));
    assert_eq!(run(&mut agent, "topFn()"), Value::Integer(3));
}

#[test]
fn eval_declarations_are_per_activation() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function f(n) { if (n) { eval('var v = ' + n); } return typeof v; }
            f(1) + ':' + f(0)"
        ),
        Value::from_str("number:undefined")
    );
}

#[test]
fn nested_eval_declares_into_the_same_activation() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function f() { eval(\"eval('var deep = 7')\"); return deep; } f()"
        ),
        Value::Integer(7)
    );
    assert_eq!(agent.global_value("deep"), None);
}

#[test]
fn closures_see_eval_declared_variables() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function f() {
                eval('var hidden = 4');
                return function () { hidden = hidden + 1; return hidden; };
            }
            var g = f(); g(); g()"
        ),
        Value::Integer(6)
    );
    assert_eq!(
        run(
            &mut agent,
            "function m() { eval('var base = 10; function add(x) { return base + x; }'); return add(5); } m()"
        ),
        Value::Integer(15)
    );
}

#[test]
fn catch_parameters_shadow_eval_declarations() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function f() {
                try { throw 1; } catch (e) { eval('var e = 2; var other = e'); }
                return other;
            }
            f()"
        ),
        Value::Integer(2)
    );
}

#[test]
fn eval_assignment_to_undeclared_names_creates_globals_in_sloppy_code() {
    let mut agent = Agent::default();
    run(&mut agent, "function f() { eval('implicit = 8'); } f();");
    assert_eq!(agent.global_value("implicit"), Some(Value::Integer(8)));
}

#[test]
fn eval_returns_the_completion_value() {
    let mut agent = Agent::default();
    assert_eq!(run(&mut agent, "eval('1; 2')"), Value::Integer(2));
    assert_eq!(run(&mut agent, "eval('var unused = 1')"), Value::Undefined);
    assert_eq!(run(&mut agent, "eval(5)"), Value::Integer(5));
    assert_eq!(run(&mut agent, "eval()"), Value::Undefined);
}

#[test]
fn strict_eval_declarations_do_not_leak() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function s() { 'use strict'; eval('var z = 1'); return typeof z; } s()"
        ),
        Value::from_str("undefined")
    );
    assert_eq!(
        run(&mut agent, "eval('\"use strict\"; var q = 1; q')"),
        Value::Integer(1)
    );
    assert_eq!(agent.global_value("q"), None);
}

#[test]
fn strict_eval_still_sees_caller_bindings() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "function s(n) { 'use strict'; return eval('var d = 2; n * d'); } s(4)"
        ),
        Value::Integer(8)
    );
}

#[test]
fn indirect_eval_runs_in_the_global_environment() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "var e = eval; function f() { var local = 1; return e('typeof local'); } f()"
        ),
        Value::from_str("undefined")
    );
    run(&mut agent, "(0, eval)('var w = 4');");
    assert_eq!(agent.global_value("w"), Some(Value::Integer(4)));
}

#[test]
fn eval_syntax_errors_are_catchable() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "var r; try { eval('var = ;'); } catch (e) { r = e.name; } r"
        ),
        Value::from_str("SyntaxError")
    );
}

#[test]
fn strict_eval_rejects_assignment_to_protected_names() {
    let mut agent = Agent::default();
    assert_eq!(
        run(
            &mut agent,
            "'use strict'; var r; try { eval('arguments = 1'); } catch (e) { r = e.name; } r"
        ),
        Value::from_str("SyntaxError")
    );
}
