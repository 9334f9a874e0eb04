// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::{Parser, ParserReturn};
use oxc_span::SourceType;

use crate::{
    ecmascript::{
        execution::{Agent, ExecutionError, RunError},
        types::Value,
    },
    engine::bytecode::{CallFrame, Executable, compile_script},
};

/// ### [16.1.5 ParseScript ( sourceText, realm, hostDefined )](https://tc39.es/ecma262/#sec-parse-script)
pub fn parse_script<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
) -> Result<Program<'a>, Vec<OxcDiagnostic>> {
    // 1. Let script be ParseText(sourceText, Script).
    let parser = Parser::new(allocator, source_text, SourceType::default().with_script(true));
    let ParserReturn {
        errors, program, ..
    } = parser.parse();

    // 2. If script is a List of errors, return script.
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(program)
}

/// ### [16.1.6 ScriptEvaluation ( scriptRecord )](https://tc39.es/ecma262/#sec-runtime-semantics-scriptevaluation)
///
/// Runs compiled script code with the global environment as both variable
/// and lexical environment. Global declarations are instantiated by the
/// prologue of the executable itself.
pub fn script_evaluation(agent: &mut Agent, script: &Executable) -> Result<Value, ExecutionError> {
    // 1. Let globalEnv be scriptRecord.[[Realm]].[[GlobalEnv]].
    // 2. Let scriptContext be a new ECMAScript code execution context.
    let script_context = CallFrame {
        environment: agent.global_env,
        this: Value::Undefined,
        arguments: &[],
        callee: None,
    };
    // 12. Let result be Completion(GlobalDeclarationInstantiation(script, globalEnv)).
    // 13. If result is a normal completion, then
    //     a. Set result to Completion(Evaluation of script).
    agent.run_frame(script, script_context)
}

impl Agent {
    /// Parses, compiles and evaluates a script, returning its completion
    /// value.
    pub fn run_script(&mut self, source_text: &str) -> Result<Value, RunError> {
        let allocator = Allocator::default();
        let program = parse_script(&allocator, source_text).map_err(RunError::Parse)?;
        let executable = compile_script(&program)?;
        tracing::debug!(
            instructions = executable.instruction_bytes().len(),
            functions = executable.functions().len(),
            "compiled script"
        );
        if self.options.print_internals {
            eprintln!("{}", executable.debug_print());
        }
        Ok(script_evaluation(self, &executable)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::execution::Options;

    fn evaluate(source: &str) -> Value {
        let allocator = Allocator::default();
        let mut agent = Agent::new(Options::default());
        let program = parse_script(&allocator, source).unwrap();
        let script = compile_script(&program).unwrap();
        script_evaluation(&mut agent, &script).unwrap()
    }

    #[test]
    fn empty_script() {
        assert_eq!(evaluate(""), Value::Undefined);
    }

    #[test]
    fn basic_constants() {
        assert_eq!(evaluate("true"), Value::Boolean(true));
        assert_eq!(evaluate("null"), Value::Null);
        assert_eq!(evaluate("'str'"), Value::from_str("str"));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(evaluate("-2"), Value::Integer(-2));
    }

    #[test]
    fn unary_void() {
        assert_eq!(evaluate("void (2 + 2 + 6)"), Value::Undefined);
    }

    #[test]
    fn unary_plus() {
        assert_eq!(evaluate("+(54)"), Value::Integer(54));
        assert_eq!(evaluate("+'7'"), Value::Integer(7));
    }

    #[test]
    fn logical_not() {
        assert_eq!(evaluate("!true"), Value::Boolean(false));
        assert_eq!(evaluate("!''"), Value::Boolean(true));
    }

    #[test]
    fn addition_concatenates_strings() {
        assert_eq!(evaluate("1 + 2"), Value::Integer(3));
        assert_eq!(evaluate("'a' + 1"), Value::from_str("a1"));
        assert_eq!(evaluate("0.5 + 0.25"), Value::Number(0.75));
    }

    #[test]
    fn var_is_hoisted_as_undefined() {
        assert_eq!(evaluate("var before = x; var x = 1; before"), Value::Undefined);
    }

    #[test]
    fn function_declarations_are_callable_before_their_position() {
        assert_eq!(evaluate("f(); function f() { return 3; }"), Value::Integer(3));
    }

    #[test]
    fn while_loop() {
        assert_eq!(
            evaluate("var i = 0; var s = 0; while (i < 5) { s += i; i++; } s"),
            Value::Integer(10)
        );
    }

    #[test]
    fn for_loop() {
        assert_eq!(
            evaluate("var s = 0; for (var i = 0; i < 4; i++) s = s + i; s"),
            Value::Integer(6)
        );
    }

    #[test]
    fn typeof_unresolvable_reference() {
        assert_eq!(evaluate("typeof nope"), Value::from_str("undefined"));
        assert_eq!(evaluate("typeof function () {}"), Value::from_str("function"));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(evaluate("null || 'x'"), Value::from_str("x"));
        assert_eq!(evaluate("0 && nope"), Value::Integer(0));
        assert_eq!(evaluate("1 ? 'yes' : 'no'"), Value::from_str("yes"));
    }

    #[test]
    fn top_level_this_is_undefined() {
        assert_eq!(evaluate("this"), Value::Undefined);
    }

    #[test]
    fn string_length() {
        assert_eq!(evaluate("'abc'.length"), Value::Integer(3));
    }

    #[test]
    fn run_script_reports_parse_errors() {
        let mut agent = Agent::default();
        assert!(matches!(agent.run_script("var = ;"), Err(RunError::Parse(_))));
        assert!(matches!(agent.run_script("let x;"), Err(RunError::Compile(_))));
    }
}
