// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use console::Style;
use oxc_diagnostics::OxcDiagnostic;
use strata_vm::{
    Agent, ExecutionError, Value,
    ecmascript::execution::EnvironmentError,
};

/// Initialize the global environment with the built-in functions.
pub fn initialize_global_object(agent: &mut Agent) -> Result<(), EnvironmentError> {
    // `print` function
    fn print(agent: &mut Agent, _this: Value, args: &[Value]) -> Result<Value, ExecutionError> {
        match args.first() {
            None => println!(),
            Some(value) => println!("{}", value.to_js_string(agent)),
        }
        Ok(Value::Undefined)
    }
    agent.define_global_function("print", 1, print)?;
    Ok(())
}

/// Exit the program with parse errors.
pub fn exit_with_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &str, source: &str) -> ! {
    assert!(!errors.is_empty());

    // This seems to be needed for color and Unicode output.
    miette::set_hook(Box::new(|_| {
        Box::new(oxc_diagnostics::GraphicalReportHandler::new())
    }))
    .unwrap();

    eprintln!("{}", Style::new().red().bold().apply_to("Parse errors:"));

    let named_source = miette::NamedSource::new(source_path, source.to_string());
    for error in errors {
        let report = error.with_source_code(named_source.clone());
        eprint!("{:?}", report);
    }
    eprintln!();

    std::process::exit(1);
}

/// Exit the program reporting an uncaught exception or an internal error.
pub fn exit_with_execution_error(agent: &Agent, error: ExecutionError) -> ! {
    let style = Style::new().red().bold();
    match error {
        ExecutionError::Throw(error) => eprintln!(
            "{} {}",
            style.apply_to("Uncaught exception:"),
            agent.error_message(&error)
        ),
        error => eprintln!("{} {error}", style.apply_to("Internal error:")),
    }
    std::process::exit(1);
}
