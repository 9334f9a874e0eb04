// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Second compilation pass: walks the AST together with the environment
//! tree built by scope analysis and emits bytecode.
//!
//! Every identifier reference is resolved at compile time to a
//! `(depth, index)` pair into the materialized scope chain, a by-name global
//! lookup, or, where direct eval code may shadow it, a by-name walk of the
//! runtime scope chain.

use std::rc::Rc;

use oxc_ast::ast::{
    AssignmentTarget, CallExpression, Expression, ForStatementInit, Function, Program,
    SimpleAssignmentTarget, Statement, TryStatement, VariableDeclaration,
};
use oxc_syntax::operator::{
    AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};

use super::{
    Executable, ExecutableContext, FunctionTemplate, Instruction, executable_context::to_index,
};
use crate::ecmascript::{
    execution::{
        BindingLocation, EnvironmentError, EnvironmentIndex, EnvironmentKind, ExceptionType,
        FunctionDeclarationIndex, ScopeLink,
    },
    syntax_directed_operations::{
        ScopeTree,
        scope_analysis::{binding_identifier_name, has_use_strict},
    },
    types::{StaticType, Value},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Environment(EnvironmentError),
    #[error("cannot emit a placeholder for {0:?}")]
    UnsupportedType(StaticType),
    #[error("unsupported syntax: {0}")]
    UnsupportedSyntax(&'static str),
    #[error("too many {0} in one executable")]
    TooManyEntries(&'static str),
}

impl From<EnvironmentError> for CompileError {
    fn from(value: EnvironmentError) -> Self {
        match value {
            EnvironmentError::TooManyBindings => Self::TooManyEntries("bindings"),
            error => Self::Environment(error),
        }
    }
}

/// Compiles a parsed script into the executable that runs its top-level
/// code in the global environment.
pub fn compile_script(program: &Program<'_>) -> Result<Executable, CompileError> {
    let scopes = ScopeTree::analyze_script(program)?;
    let strict = has_use_strict(&program.directives);
    compile_top_level(&scopes, &program.body, strict)
}

/// Compiles direct eval code. `caller_chain` is the shape of the caller's
/// scope chain, innermost first.
pub(crate) fn compile_eval(
    program: &Program<'_>,
    caller_chain: &[ScopeLink],
    caller_strict: bool,
) -> Result<Executable, CompileError> {
    let strict = caller_strict || has_use_strict(&program.directives);
    let scopes = ScopeTree::analyze_eval(program, caller_chain, strict)?;
    compile_top_level(&scopes, &program.body, strict)
}

fn compile_top_level(
    scopes: &ScopeTree<'_>,
    body: &[Statement<'_>],
    strict: bool,
) -> Result<Executable, CompileError> {
    let mut ctx = CompileContext {
        executable: ExecutableContext::new(strict),
        scopes,
        lexical_env: scopes.top_level_env(),
        completion: true,
    };
    let var_env = scopes.environment(scopes.var_env())?;
    // Sloppy eval code declares into a property-backed environment that
    // already exists.
    if var_env.kind() == EnvironmentKind::Materialized {
        var_env.emit_construction(&mut ctx.executable)?;
    }
    var_env.emit_hoist_initialization(&mut ctx)?;
    for &declaration in scopes.rebound_functions() {
        let name = declared_function_name(scopes, declaration)?;
        ctx.instantiate_function_declaration(declaration)?;
        ctx.emit_set_binding(name)?;
    }
    ctx.compile_body(body)?;
    ctx.executable.add_instruction(Instruction::LoadCompletion);
    ctx.executable.add_instruction(Instruction::Return);
    Ok(ctx.executable.finish())
}

fn declared_function_name<'a>(
    scopes: &ScopeTree<'a>,
    declaration: FunctionDeclarationIndex,
) -> Result<&'a str, CompileError> {
    scopes
        .function_declaration(declaration)
        .and_then(|function| function.id.as_ref())
        .map(|id| id.name.as_str())
        .ok_or_else(|| {
            EnvironmentError::InvalidState("unknown function declaration index".into()).into()
        })
}

/// State of compiling one function body or top-level code.
pub(crate) struct CompileContext<'a, 's> {
    pub(crate) executable: ExecutableContext,
    scopes: &'s ScopeTree<'a>,
    /// Compile-time environment identifiers are resolved from.
    lexical_env: EnvironmentIndex,
    /// Expression statements record their value as the completion value
    /// instead of discarding it.
    completion: bool,
}

impl<'a, 's> CompileContext<'a, 's> {
    /// Pushes a closure for a hoisted function declaration over the current
    /// runtime environment.
    pub(crate) fn instantiate_function_declaration(
        &mut self,
        declaration: FunctionDeclarationIndex,
    ) -> Result<(), CompileError> {
        let function = self.scopes.function_declaration(declaration).ok_or(
            EnvironmentError::InvalidState("unknown function declaration index".into()),
        )?;
        self.instantiate_function(function)
    }

    fn instantiate_function(&mut self, function: &Function<'_>) -> Result<(), CompileError> {
        let template = self.compile_function(function)?;
        self.executable
            .add_instruction_with_function(Instruction::InstantiateFunction, template)
    }

    /// ### [10.2.11 FunctionDeclarationInstantiation ( func, argumentsList )](https://tc39.es/ecma262/#sec-functiondeclarationinstantiation)
    ///
    /// The prologue reconstructs the function environment, then stores the
    /// callee (for named functions), `this`, the arguments object and each
    /// argument in that order, enters the variable environment if the
    /// function has one, then initializes hoisted declarations.
    fn compile_function(
        &mut self,
        function: &Function<'_>,
    ) -> Result<Rc<FunctionTemplate>, CompileError> {
        let environment = self.scopes.function_environment(function).ok_or(
            EnvironmentError::InvalidState("function was not seen by scope analysis".into()),
        )?;
        let Some(body) = &function.body else {
            return Err(CompileError::UnsupportedSyntax("function without a body"));
        };
        let strict = self.executable.is_strict() || has_use_strict(&body.directives);
        let name = function.id.as_ref().map_or("", |id| id.name.as_str());

        let mut ctx = CompileContext {
            executable: ExecutableContext::new(strict),
            scopes: self.scopes,
            lexical_env: environment,
            completion: false,
        };
        let record = self.scopes.environment(environment)?;
        record.emit_construction(&mut ctx.executable)?;
        if !name.is_empty() {
            ctx.executable.add_instruction(Instruction::LoadCallee);
            ctx.emit_set_binding(name)?;
        }
        ctx.executable.add_instruction(Instruction::LoadThis);
        ctx.emit_set_binding("this")?;
        ctx.executable
            .add_instruction(Instruction::CreateArgumentsObject);
        ctx.emit_set_binding("arguments")?;
        for (position, parameter) in function.params.items.iter().enumerate() {
            let position = to_index(position, "parameters")?;
            ctx.executable
                .add_instruction_with_immediate(Instruction::LoadArgument, position);
            ctx.emit_set_binding(binding_identifier_name(&parameter.pattern)?)?;
        }
        if let Some(variable_env) = self.scopes.variable_environment(function) {
            self.scopes
                .environment(variable_env)?
                .emit_construction(&mut ctx.executable)?;
            ctx.lexical_env = variable_env;
        }
        record.emit_hoist_initialization(&mut ctx)?;
        ctx.compile_body(&body.statements)?;
        ctx.executable.emit_undefined();
        ctx.executable.add_instruction(Instruction::Return);

        let length = u32::try_from(function.params.items.len())
            .map_err(|_| CompileError::TooManyEntries("parameters"))?;
        Ok(Rc::new(FunctionTemplate {
            name: Rc::from(name),
            length,
            strict,
            executable: Rc::new(ctx.executable.finish()),
        }))
    }

    /// Statements of a function, script or eval body. Function declarations
    /// directly in the body were hoisted and evaluate to nothing here.
    fn compile_body(&mut self, statements: &[Statement<'_>]) -> Result<(), CompileError> {
        for statement in statements {
            if !matches!(statement, Statement::FunctionDeclaration(_)) {
                statement.compile(self)?;
            }
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<BindingLocation, CompileError> {
        Ok(self.scopes.resolve(self.lexical_env, name)?)
    }

    fn emit_get_binding(&mut self, name: &str) -> Result<(), CompileError> {
        match self.resolve(name)? {
            BindingLocation::Environment { depth, index } => {
                self.executable
                    .add_binding_instruction(Instruction::GetBinding, depth, index)
            }
            BindingLocation::Global => self
                .executable
                .add_instruction_with_identifier(Instruction::GetGlobal, name),
            BindingLocation::Dynamic => self
                .executable
                .add_instruction_with_identifier(Instruction::GetName, name),
        }
    }

    /// Pops the top of the stack into `name`.
    pub(crate) fn emit_set_binding(&mut self, name: &str) -> Result<(), CompileError> {
        match self.resolve(name)? {
            BindingLocation::Environment { depth, index } => {
                self.executable
                    .add_binding_instruction(Instruction::SetBinding, depth, index)
            }
            BindingLocation::Global => self
                .executable
                .add_instruction_with_identifier(Instruction::SetGlobal, name),
            BindingLocation::Dynamic => self
                .executable
                .add_instruction_with_identifier(Instruction::SetName, name),
        }
    }

    /// Strict mode code may not assign to `eval` or `arguments`. The
    /// assignment compiles to a throw, and a placeholder keeps the stack
    /// shape of the expression.
    fn emit_protected_assignment_check(&mut self, name: &str) -> Result<bool, CompileError> {
        if self.executable.is_strict() && matches!(name, "eval" | "arguments") {
            self.executable.emit_throw(
                ExceptionType::SyntaxError,
                &format!("Unexpected {name} in strict mode"),
            )?;
            self.executable.emit_placeholder(StaticType::Value)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn compile_variable_declaration(
        &mut self,
        declaration: &VariableDeclaration<'_>,
    ) -> Result<(), CompileError> {
        for declarator in declaration.declarations.iter() {
            let Some(init) = &declarator.init else {
                continue;
            };
            let name = binding_identifier_name(&declarator.id)?;
            init.compile(self)?;
            self.emit_set_binding(name)?;
        }
        Ok(())
    }

    /// ### [14.15.3 Runtime Semantics: Evaluation](https://tc39.es/ecma262/#sec-try-statement-runtime-semantics-evaluation)
    fn compile_try_statement(&mut self, statement: &TryStatement<'_>) -> Result<(), CompileError> {
        if statement.finalizer.is_some() {
            return Err(CompileError::UnsupportedSyntax("finally blocks"));
        }
        let Some(handler) = &statement.handler else {
            return Err(CompileError::UnsupportedSyntax("try without catch"));
        };
        let jump_to_catch = self
            .executable
            .add_instruction_with_jump_slot(Instruction::PushExceptionJumpTarget);
        for statement in statement.block.body.iter() {
            statement.compile(self)?;
        }
        self.executable
            .add_instruction(Instruction::PopExceptionJumpTarget);
        let jump_to_end = self.executable.add_instruction_with_jump_slot(Instruction::Jump);

        self.executable.set_jump_target_here(jump_to_catch)?;
        match &handler.param {
            Some(parameter) => {
                let scopes = self.scopes;
                let catch_env = scopes.catch_environment(handler).ok_or(
                    EnvironmentError::InvalidState("catch clause was not seen by scope analysis".into()),
                )?;
                let name = binding_identifier_name(&parameter.pattern)?;
                scopes
                    .environment(catch_env)?
                    .emit_construction(&mut self.executable)?;
                let outer_env = std::mem::replace(&mut self.lexical_env, catch_env);
                let result = self
                    .emit_set_binding(name)
                    .and_then(|()| {
                        handler
                            .body
                            .body
                            .iter()
                            .try_for_each(|statement| statement.compile(self))
                    });
                self.lexical_env = outer_env;
                result?;
                self.executable.add_instruction(Instruction::ExitEnvironment);
            }
            None => {
                self.executable.add_instruction(Instruction::Pop);
                for statement in handler.body.body.iter() {
                    statement.compile(self)?;
                }
            }
        }
        self.executable.set_jump_target_here(jump_to_end)?;
        Ok(())
    }

    /// Leaves `this`, the callee and the arguments on the stack, then calls.
    fn compile_call(&mut self, call: &CallExpression<'_>) -> Result<(), CompileError> {
        if call.optional {
            return Err(CompileError::UnsupportedSyntax("optional calls"));
        }
        let mut instruction = Instruction::Call;
        match call.callee.get_inner_expression() {
            Expression::StaticMemberExpression(member) => {
                member.object.compile(self)?;
                self.executable.add_instruction(Instruction::Dup);
                self.executable.add_instruction_with_identifier(
                    Instruction::GetProperty,
                    member.property.name.as_str(),
                )?;
            }
            Expression::ComputedMemberExpression(member) => {
                member.object.compile(self)?;
                self.executable.add_instruction(Instruction::Dup);
                member.expression.compile(self)?;
                self.executable
                    .add_instruction(Instruction::GetComputedProperty);
            }
            callee => {
                if matches!(&call.callee, Expression::Identifier(id) if id.name.as_str() == "eval") {
                    instruction = Instruction::DirectEval;
                }
                self.executable.emit_undefined();
                callee.compile(self)?;
            }
        }
        for argument in call.arguments.iter() {
            argument
                .as_expression()
                .ok_or(CompileError::UnsupportedSyntax("spread arguments"))?
                .compile(self)?;
        }
        let argument_count = to_index(call.arguments.len(), "call arguments")?;
        self.executable
            .add_instruction_with_immediate(instruction, argument_count);
        Ok(())
    }
}

pub(crate) trait CompileEvaluation {
    fn compile(&self, ctx: &mut CompileContext<'_, '_>) -> Result<(), CompileError>;
}

impl CompileEvaluation for Statement<'_> {
    fn compile(&self, ctx: &mut CompileContext<'_, '_>) -> Result<(), CompileError> {
        match self {
            Statement::ExpressionStatement(statement) => {
                statement.expression.compile(ctx)?;
                ctx.executable.add_instruction(if ctx.completion {
                    Instruction::StoreCompletion
                } else {
                    Instruction::Pop
                });
            }
            Statement::VariableDeclaration(declaration) => {
                ctx.compile_variable_declaration(declaration)?;
            }
            // Not directly in a body, so not hoisted: the binding is assigned
            // when the declaration is reached.
            Statement::FunctionDeclaration(function) => {
                let name = function
                    .id
                    .as_ref()
                    .map(|id| id.name.as_str())
                    .ok_or(CompileError::UnsupportedSyntax("anonymous function declaration"))?;
                ctx.instantiate_function(function)?;
                ctx.emit_set_binding(name)?;
            }
            Statement::BlockStatement(block) => {
                for statement in block.body.iter() {
                    statement.compile(ctx)?;
                }
            }
            Statement::IfStatement(statement) => {
                statement.test.compile(ctx)?;
                let jump_to_else = ctx
                    .executable
                    .add_instruction_with_jump_slot(Instruction::JumpIfFalse);
                statement.consequent.compile(ctx)?;
                match &statement.alternate {
                    Some(alternate) => {
                        let jump_to_end =
                            ctx.executable.add_instruction_with_jump_slot(Instruction::Jump);
                        ctx.executable.set_jump_target_here(jump_to_else)?;
                        alternate.compile(ctx)?;
                        ctx.executable.set_jump_target_here(jump_to_end)?;
                    }
                    None => ctx.executable.set_jump_target_here(jump_to_else)?,
                }
            }
            Statement::WhileStatement(statement) => {
                let start = ctx.executable.get_jump_index_to_here();
                statement.test.compile(ctx)?;
                let jump_to_end = ctx
                    .executable
                    .add_instruction_with_jump_slot(Instruction::JumpIfFalse);
                statement.body.compile(ctx)?;
                ctx.executable
                    .add_jump_instruction_to_index(Instruction::Jump, start)?;
                ctx.executable.set_jump_target_here(jump_to_end)?;
            }
            Statement::ForStatement(statement) => {
                match &statement.init {
                    Some(ForStatementInit::VariableDeclaration(declaration)) => {
                        ctx.compile_variable_declaration(declaration)?;
                    }
                    Some(init) => {
                        init.as_expression()
                            .ok_or(CompileError::UnsupportedSyntax("for statement initializer"))?
                            .compile(ctx)?;
                        ctx.executable.add_instruction(Instruction::Pop);
                    }
                    None => {}
                }
                let start = ctx.executable.get_jump_index_to_here();
                let jump_to_end = match &statement.test {
                    Some(test) => {
                        test.compile(ctx)?;
                        Some(
                            ctx.executable
                                .add_instruction_with_jump_slot(Instruction::JumpIfFalse),
                        )
                    }
                    None => None,
                };
                statement.body.compile(ctx)?;
                if let Some(update) = &statement.update {
                    update.compile(ctx)?;
                    ctx.executable.add_instruction(Instruction::Pop);
                }
                ctx.executable
                    .add_jump_instruction_to_index(Instruction::Jump, start)?;
                if let Some(jump_to_end) = jump_to_end {
                    ctx.executable.set_jump_target_here(jump_to_end)?;
                }
            }
            Statement::ReturnStatement(statement) => {
                match &statement.argument {
                    Some(argument) => argument.compile(ctx)?,
                    None => ctx.executable.emit_undefined(),
                }
                ctx.executable.add_instruction(Instruction::Return);
            }
            Statement::ThrowStatement(statement) => {
                statement.argument.compile(ctx)?;
                ctx.executable.add_instruction(Instruction::Throw);
            }
            Statement::TryStatement(statement) => ctx.compile_try_statement(statement)?,
            Statement::EmptyStatement(_) => {}
            Statement::BreakStatement(_) | Statement::ContinueStatement(_) => {
                return Err(CompileError::UnsupportedSyntax("break and continue"));
            }
            _ => return Err(CompileError::UnsupportedSyntax("statement")),
        }
        Ok(())
    }
}

impl CompileEvaluation for Expression<'_> {
    fn compile(&self, ctx: &mut CompileContext<'_, '_>) -> Result<(), CompileError> {
        match self {
            Expression::BooleanLiteral(literal) => ctx.executable.add_instruction(if literal.value {
                Instruction::LoadTrue
            } else {
                Instruction::LoadFalse
            }),
            Expression::NullLiteral(_) => ctx.executable.emit_null(),
            Expression::NumericLiteral(literal) => ctx
                .executable
                .add_instruction_with_constant(Instruction::LoadConstant, Value::from_f64(literal.value))?,
            Expression::StringLiteral(literal) => ctx.executable.add_instruction_with_constant(
                Instruction::LoadConstant,
                Value::from_str(literal.value.as_str()),
            )?,
            Expression::Identifier(identifier) => ctx.emit_get_binding(identifier.name.as_str())?,
            // Top-level code has no `this` binding and sees undefined.
            Expression::ThisExpression(_) => match ctx.resolve("this")? {
                BindingLocation::Environment { depth, index } => ctx
                    .executable
                    .add_binding_instruction(Instruction::GetBinding, depth, index)?,
                BindingLocation::Global => ctx.executable.emit_undefined(),
                BindingLocation::Dynamic => ctx
                    .executable
                    .add_instruction_with_identifier(Instruction::TryGetName, "this")?,
            },
            Expression::ParenthesizedExpression(parenthesized) => {
                parenthesized.expression.compile(ctx)?
            }
            Expression::SequenceExpression(sequence) => {
                for (position, expression) in sequence.expressions.iter().enumerate() {
                    if position > 0 {
                        ctx.executable.add_instruction(Instruction::Pop);
                    }
                    expression.compile(ctx)?;
                }
            }
            Expression::FunctionExpression(function) => ctx.instantiate_function(function)?,
            Expression::CallExpression(call) => ctx.compile_call(call)?,
            Expression::StaticMemberExpression(member) => {
                member.object.compile(ctx)?;
                ctx.executable.add_instruction_with_identifier(
                    Instruction::GetProperty,
                    member.property.name.as_str(),
                )?;
            }
            Expression::ComputedMemberExpression(member) => {
                member.object.compile(ctx)?;
                member.expression.compile(ctx)?;
                ctx.executable
                    .add_instruction(Instruction::GetComputedProperty);
            }
            Expression::AssignmentExpression(assignment) => {
                let AssignmentTarget::AssignmentTargetIdentifier(target) = &assignment.left else {
                    return Err(CompileError::UnsupportedSyntax("assignment target"));
                };
                let name = target.name.as_str();
                if ctx.emit_protected_assignment_check(name)? {
                    return Ok(());
                }
                if assignment.operator == AssignmentOperator::Assign {
                    assignment.right.compile(ctx)?;
                } else {
                    let operator = match assignment.operator {
                        AssignmentOperator::Addition => Instruction::Add,
                        AssignmentOperator::Subtraction => Instruction::Subtract,
                        AssignmentOperator::Multiplication => Instruction::Multiply,
                        AssignmentOperator::Division => Instruction::Divide,
                        AssignmentOperator::Remainder => Instruction::Remainder,
                        _ => return Err(CompileError::UnsupportedSyntax("assignment operator")),
                    };
                    ctx.emit_get_binding(name)?;
                    assignment.right.compile(ctx)?;
                    ctx.executable.add_instruction(operator);
                }
                ctx.executable.add_instruction(Instruction::Dup);
                ctx.emit_set_binding(name)?;
            }
            Expression::UpdateExpression(update) => {
                let SimpleAssignmentTarget::AssignmentTargetIdentifier(target) = &update.argument
                else {
                    return Err(CompileError::UnsupportedSyntax("update target"));
                };
                let name = target.name.as_str();
                if ctx.emit_protected_assignment_check(name)? {
                    return Ok(());
                }
                let operator = match update.operator {
                    UpdateOperator::Increment => Instruction::Add,
                    UpdateOperator::Decrement => Instruction::Subtract,
                };
                ctx.emit_get_binding(name)?;
                ctx.executable.add_instruction(Instruction::ToNumber);
                if update.prefix {
                    ctx.executable
                        .add_instruction_with_constant(Instruction::LoadConstant, Value::Integer(1))?;
                    ctx.executable.add_instruction(operator);
                    ctx.executable.add_instruction(Instruction::Dup);
                } else {
                    ctx.executable.add_instruction(Instruction::Dup);
                    ctx.executable
                        .add_instruction_with_constant(Instruction::LoadConstant, Value::Integer(1))?;
                    ctx.executable.add_instruction(operator);
                }
                ctx.emit_set_binding(name)?;
            }
            Expression::UnaryExpression(unary) => match unary.operator {
                UnaryOperator::LogicalNot => {
                    unary.argument.compile(ctx)?;
                    ctx.executable.add_instruction(Instruction::LogicalNot);
                }
                UnaryOperator::UnaryNegation => {
                    unary.argument.compile(ctx)?;
                    ctx.executable.add_instruction(Instruction::Negate);
                }
                UnaryOperator::UnaryPlus => {
                    unary.argument.compile(ctx)?;
                    ctx.executable.add_instruction(Instruction::ToNumber);
                }
                UnaryOperator::Typeof => {
                    // typeof of an unresolvable reference is "undefined"
                    // rather than a ReferenceError.
                    match unary.argument.get_inner_expression() {
                        Expression::Identifier(identifier) => {
                            let name = identifier.name.as_str();
                            match ctx.resolve(name)? {
                                BindingLocation::Global => ctx
                                    .executable
                                    .add_instruction_with_identifier(Instruction::TryGetGlobal, name)?,
                                BindingLocation::Dynamic => ctx
                                    .executable
                                    .add_instruction_with_identifier(Instruction::TryGetName, name)?,
                                BindingLocation::Environment { .. } => ctx.emit_get_binding(name)?,
                            }
                        }
                        argument => argument.compile(ctx)?,
                    }
                    ctx.executable.add_instruction(Instruction::Typeof);
                }
                UnaryOperator::Void => {
                    unary.argument.compile(ctx)?;
                    ctx.executable.add_instruction(Instruction::Pop);
                    ctx.executable.emit_undefined();
                }
                UnaryOperator::BitwiseNot | UnaryOperator::Delete => {
                    return Err(CompileError::UnsupportedSyntax("unary operator"));
                }
            },
            Expression::BinaryExpression(binary) => {
                let (instruction, negate) = match binary.operator {
                    BinaryOperator::Addition => (Instruction::Add, false),
                    BinaryOperator::Subtraction => (Instruction::Subtract, false),
                    BinaryOperator::Multiplication => (Instruction::Multiply, false),
                    BinaryOperator::Division => (Instruction::Divide, false),
                    BinaryOperator::Remainder => (Instruction::Remainder, false),
                    BinaryOperator::LessThan => (Instruction::LessThan, false),
                    BinaryOperator::LessEqualThan => (Instruction::LessThanEquals, false),
                    BinaryOperator::GreaterThan => (Instruction::GreaterThan, false),
                    BinaryOperator::GreaterEqualThan => (Instruction::GreaterThanEquals, false),
                    BinaryOperator::StrictEquality => (Instruction::IsStrictlyEqual, false),
                    BinaryOperator::StrictInequality => (Instruction::IsStrictlyEqual, true),
                    BinaryOperator::Equality => (Instruction::IsLooselyEqual, false),
                    BinaryOperator::Inequality => (Instruction::IsLooselyEqual, true),
                    _ => return Err(CompileError::UnsupportedSyntax("binary operator")),
                };
                binary.left.compile(ctx)?;
                binary.right.compile(ctx)?;
                ctx.executable.add_instruction(instruction);
                if negate {
                    ctx.executable.add_instruction(Instruction::LogicalNot);
                }
            }
            Expression::LogicalExpression(logical) => {
                let jump = match logical.operator {
                    LogicalOperator::And => Instruction::JumpIfFalse,
                    LogicalOperator::Or => Instruction::JumpIfTrue,
                    LogicalOperator::Coalesce => {
                        return Err(CompileError::UnsupportedSyntax("nullish coalescing"));
                    }
                };
                logical.left.compile(ctx)?;
                ctx.executable.add_instruction(Instruction::Dup);
                let jump_to_end = ctx.executable.add_instruction_with_jump_slot(jump);
                ctx.executable.add_instruction(Instruction::Pop);
                logical.right.compile(ctx)?;
                ctx.executable.set_jump_target_here(jump_to_end)?;
            }
            Expression::ConditionalExpression(conditional) => {
                conditional.test.compile(ctx)?;
                let jump_to_alternate = ctx
                    .executable
                    .add_instruction_with_jump_slot(Instruction::JumpIfFalse);
                conditional.consequent.compile(ctx)?;
                let jump_to_end = ctx.executable.add_instruction_with_jump_slot(Instruction::Jump);
                ctx.executable.set_jump_target_here(jump_to_alternate)?;
                conditional.alternate.compile(ctx)?;
                ctx.executable.set_jump_target_here(jump_to_end)?;
            }
            _ => return Err(CompileError::UnsupportedSyntax("expression")),
        }
        Ok(())
    }
}
