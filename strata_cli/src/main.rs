// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
mod helper;

use clap::{Parser as ClapParser, Subcommand};
use console::Style;
use helper::{exit_with_execution_error, exit_with_parse_errors, initialize_global_object};
use oxc_allocator::Allocator;
use strata_vm::{
    Agent, Options, RunError,
    ecmascript::{
        scripts_and_modules::script::parse_script, syntax_directed_operations::ScopeTree,
    },
    engine::bytecode::compile_script,
};

/// Scope resolution and bytecode for a JavaScript subset
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "strata")]
#[command(about = "Scope resolution and bytecode for a JavaScript subset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parses a file and logs out the AST
    Parse {
        /// The path of the file to parse
        path: String,
    },

    /// Prints the compile-time environment tree of a file
    Scopes {
        /// The path of the file to analyze
        path: String,
    },

    /// Compiles a file and prints its bytecode
    Dis {
        /// The path of the file to compile
        path: String,
    },

    /// Evaluates files in one agent, in order
    Eval {
        #[arg(short, long)]
        verbose: bool,
        #[arg(short, long)]
        nogc: bool,

        /// Maximum depth of nested calls
        #[arg(long, default_value_t = Options::default().max_call_depth)]
        max_call_depth: usize,

        /// The files to evaluate
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    match args.command {
        Command::Parse { path } => {
            let file = std::fs::read_to_string(&path)?;
            let allocator = Allocator::default();
            let program = match parse_script(&allocator, &file) {
                Ok(program) => program,
                Err(errors) => exit_with_parse_errors(errors, &path, &file),
            };
            println!("{:#?}", program);
        }
        Command::Scopes { path } => {
            let file = std::fs::read_to_string(&path)?;
            let allocator = Allocator::default();
            let program = match parse_script(&allocator, &file) {
                Ok(program) => program,
                Err(errors) => exit_with_parse_errors(errors, &path, &file),
            };
            let scopes = ScopeTree::analyze_script(&program)?;
            print!("{}", scopes.debug_print());
        }
        Command::Dis { path } => {
            let file = std::fs::read_to_string(&path)?;
            let allocator = Allocator::default();
            let program = match parse_script(&allocator, &file) {
                Ok(program) => program,
                Err(errors) => exit_with_parse_errors(errors, &path, &file),
            };
            let executable = compile_script(&program)?;
            print!("{}", executable.debug_print());
        }
        Command::Eval {
            verbose,
            nogc,
            max_call_depth,
            paths,
        } => {
            let mut agent = Agent::new(Options {
                print_internals: verbose,
                disable_gc: nogc,
                max_call_depth,
            });
            initialize_global_object(&mut agent)?;
            assert!(!paths.is_empty());
            let mut is_first = true;
            for path in paths {
                if is_first {
                    is_first = false;
                } else {
                    agent.gc(&[]);
                }
                let file = std::fs::read_to_string(&path)?;
                match agent.run_script(&file) {
                    Ok(result) => {
                        if verbose {
                            println!("{:?}", result);
                        }
                        println!(
                            "{}",
                            Style::new().dim().apply_to(result.to_js_string(&agent))
                        );
                    }
                    Err(RunError::Parse(errors)) => exit_with_parse_errors(errors, &path, &file),
                    Err(RunError::Compile(error)) => return Err(error.into()),
                    Err(RunError::Execution(error)) => exit_with_execution_error(&agent, error),
                }
            }
        }
    }
    Ok(())
}
