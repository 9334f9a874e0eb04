// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! First compilation pass: builds the compile-time environment tree of a
//! script or eval body and declares every name in the environment that owns
//! it.
//!
//! Functions get a function-body environment, catch clauses with a parameter
//! get a catch environment, strict eval code gets its own variable
//! environment. `var` and function declarations land in the nearest
//! variable environment: the enclosing function, the strict eval
//! environment, or the global environment. Only function declarations
//! directly in a function, script or eval body are hoisted with an
//! initializer; nested ones are plain variables assigned where the
//! declaration is evaluated.
//!
//! A sloppy function whose body calls `eval` directly also gets a
//! property-backed variable environment between its function environment
//! and everything nested in its body. Sloppy eval code run by that
//! activation declares new names there, so they stay local to the call.

use std::fmt::Write;

use ahash::AHashMap;
use oxc_ast::ast::{
    BindingPattern, BindingPatternKind, CatchClause, Directive, Expression, ForStatementInit,
    Function, Program, Statement, VariableDeclaration, VariableDeclarationKind,
};
use oxc_span::Span;

use crate::{
    ecmascript::execution::{
        BindingLocation, EnvironmentError, EnvironmentIndex, EnvironmentRecord, Environments,
        FunctionDeclarationIndex, ScopeLink,
    },
    engine::bytecode::CompileError,
};

/// The compile-time environment tree of one compilation unit.
#[derive(Debug)]
pub struct ScopeTree<'a> {
    environments: Environments,
    global_env: EnvironmentIndex,
    /// Environment the top-level statements resolve identifiers from.
    top_level_env: EnvironmentIndex,
    /// Environment receiving top-level `var` and function declarations.
    var_env: EnvironmentIndex,
    function_scopes: AHashMap<Span, EnvironmentIndex>,
    /// Variable environments of sloppy functions containing a direct eval.
    variable_scopes: AHashMap<Span, EnvironmentIndex>,
    catch_scopes: AHashMap<Span, EnvironmentIndex>,
    function_declarations: Vec<&'a Function<'a>>,
    /// Hoisted function declarations of sloppy eval code whose name is
    /// already bound in the calling function's environment.
    rebound_functions: Vec<FunctionDeclarationIndex>,
}

impl<'a> ScopeTree<'a> {
    pub fn analyze_script(program: &'a Program<'a>) -> Result<Self, CompileError> {
        let mut environments = Environments::new();
        let global_env = environments.new_global_environment();
        let mut tree = Self::new(environments, global_env, global_env, global_env);
        let strict = has_use_strict(&program.directives);
        ScopeAnalysis::new(&mut tree, strict).analyze_body(&program.body)?;
        Ok(tree)
    }

    /// Analyzes direct eval code. `caller_chain` is the shape of the calling
    /// code's scope chain, innermost first; it is rebuilt so that resolved
    /// depths match the live scope chain.
    ///
    /// Strict eval code declares into its own environment. Sloppy eval code
    /// declares into the innermost property-backed environment of the
    /// caller: the calling function's variable environment, or the global
    /// one.
    pub fn analyze_eval(
        program: &'a Program<'a>,
        caller_chain: &[ScopeLink],
        strict: bool,
    ) -> Result<Self, CompileError> {
        let mut environments = Environments::new();
        let global_env = environments.new_global_environment();
        let mut caller_env = global_env;
        for link in caller_chain.iter().rev() {
            caller_env = match link {
                ScopeLink::Materialized(names) => {
                    environments.reconstruct(Some(caller_env), names)?
                }
                ScopeLink::Variable => environments.new_variable_environment(Some(caller_env))?,
            };
        }
        let mut tree = if strict {
            let eval_env = environments.new_strict_eval_environment(Some(caller_env))?;
            Self::new(environments, global_env, eval_env, eval_env)
        } else {
            let var_env = environments.variable_environment(caller_env)?;
            Self::new(environments, global_env, caller_env, var_env)
        };
        let mut analysis = ScopeAnalysis::new(&mut tree, strict);
        analysis.sloppy_eval = !strict;
        analysis.analyze_body(&program.body)?;
        Ok(tree)
    }

    fn new(
        environments: Environments,
        global_env: EnvironmentIndex,
        top_level_env: EnvironmentIndex,
        var_env: EnvironmentIndex,
    ) -> Self {
        Self {
            environments,
            global_env,
            top_level_env,
            var_env,
            function_scopes: AHashMap::default(),
            variable_scopes: AHashMap::default(),
            catch_scopes: AHashMap::default(),
            function_declarations: Vec::new(),
            rebound_functions: Vec::new(),
        }
    }

    pub fn environments(&self) -> &Environments {
        &self.environments
    }

    pub fn global_env(&self) -> EnvironmentIndex {
        self.global_env
    }

    pub fn top_level_env(&self) -> EnvironmentIndex {
        self.top_level_env
    }

    pub fn var_env(&self) -> EnvironmentIndex {
        self.var_env
    }

    pub fn environment(&self, index: EnvironmentIndex) -> Result<&EnvironmentRecord, EnvironmentError> {
        self.environments.record(index)
    }

    pub fn function_environment(&self, function: &Function<'_>) -> Option<EnvironmentIndex> {
        self.function_scopes.get(&function.span).copied()
    }

    /// The variable environment the function's body runs in, if it has one.
    pub fn variable_environment(&self, function: &Function<'_>) -> Option<EnvironmentIndex> {
        self.variable_scopes.get(&function.span).copied()
    }

    pub fn catch_environment(&self, clause: &CatchClause<'_>) -> Option<EnvironmentIndex> {
        self.catch_scopes.get(&clause.span).copied()
    }

    pub fn function_declaration(&self, index: FunctionDeclarationIndex) -> Option<&'a Function<'a>> {
        self.function_declarations.get(index.into_index()).copied()
    }

    pub fn rebound_functions(&self) -> &[FunctionDeclarationIndex] {
        &self.rebound_functions
    }

    pub fn resolve(
        &self,
        from: EnvironmentIndex,
        name: &str,
    ) -> Result<BindingLocation, EnvironmentError> {
        self.environments.resolve(from, name)
    }

    /// One line per environment: its handle, kind, parent and bindings.
    pub fn debug_print(&self) -> String {
        let mut out = String::new();
        for (index, record) in self.environments.iter() {
            let role = if index == self.global_env {
                " global"
            } else if index == self.top_level_env {
                " top-level"
            } else {
                ""
            };
            let _ = write!(out, "{index:?}{role} {:?}", record.kind());
            if let Some(outer_env) = record.outer_env() {
                let _ = write!(out, " <- {outer_env:?}");
            }
            out.push_str(" {");
            for (position, binding) in record.bindings().iter().enumerate() {
                let separator = if position == 0 { " " } else { ", " };
                let _ = write!(out, "{separator}{}: {}", binding.name, binding.index);
                if let Some(declaration) = binding.hoisted_initializer {
                    let _ = write!(out, " = function#{}", declaration.into_index());
                }
            }
            out.push_str(" }\n");
        }
        out
    }
}

pub(crate) fn has_use_strict(directives: &[Directive<'_>]) -> bool {
    directives
        .iter()
        .any(|directive| directive.directive.as_str() == "use strict")
}

/// Returns the name of a simple binding pattern.
pub(crate) fn binding_identifier_name<'a>(
    pattern: &'a BindingPattern<'_>,
) -> Result<&'a str, CompileError> {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(identifier) => Ok(identifier.name.as_str()),
        _ => Err(CompileError::UnsupportedSyntax("destructuring patterns")),
    }
}

struct ScopeAnalysis<'a, 't> {
    tree: &'t mut ScopeTree<'a>,
    lexical_env: EnvironmentIndex,
    var_env: EnvironmentIndex,
    strict: bool,
    /// Analyzing the top level of sloppy eval code.
    sloppy_eval: bool,
    /// The function body being analyzed calls `eval` directly.
    direct_eval: bool,
}

impl<'a, 't> ScopeAnalysis<'a, 't> {
    fn new(tree: &'t mut ScopeTree<'a>, strict: bool) -> Self {
        let lexical_env = tree.top_level_env;
        let var_env = tree.var_env;
        Self {
            tree,
            lexical_env,
            var_env,
            strict,
            sloppy_eval: false,
            direct_eval: false,
        }
    }

    fn declare_var(
        &mut self,
        name: &str,
        initializer: Option<FunctionDeclarationIndex>,
    ) -> Result<(), CompileError> {
        // Sloppy eval code cannot grow the materialized environment of the
        // calling function, so names that environment binds are reused.
        if self.sloppy_eval && self.var_env == self.tree.var_env {
            let var_env = self.tree.environments.record(self.var_env)?;
            if let Some(function_env) = var_env.outer_env() {
                if self.tree.environments.record(function_env)?.has_binding(name) {
                    if let Some(initializer) = initializer {
                        self.tree.rebound_functions.push(initializer);
                    }
                    return Ok(());
                }
            }
        }
        self.tree
            .environments
            .record_mut(self.var_env)?
            .declare(name, initializer)?;
        Ok(())
    }

    fn analyze_body(&mut self, statements: &'a [Statement<'a>]) -> Result<(), CompileError> {
        for statement in statements {
            match statement {
                Statement::FunctionDeclaration(function) => {
                    let name = function_name(function)?;
                    let index = u32::try_from(self.tree.function_declarations.len())
                        .map_err(|_| CompileError::TooManyEntries("function declarations"))?;
                    let index = FunctionDeclarationIndex::new(index);
                    self.tree.function_declarations.push(function);
                    self.declare_var(name, Some(index))?;
                    self.analyze_function(function)?;
                }
                statement => self.analyze_statement(statement)?,
            }
        }
        Ok(())
    }

    fn analyze_statement(&mut self, statement: &'a Statement<'a>) -> Result<(), CompileError> {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                self.analyze_variable_declaration(declaration)
            }
            Statement::FunctionDeclaration(function) => {
                self.declare_var(function_name(function)?, None)?;
                self.analyze_function(function)
            }
            Statement::ExpressionStatement(statement) => {
                self.analyze_expression(&statement.expression)
            }
            Statement::BlockStatement(block) => {
                for statement in block.body.iter() {
                    self.analyze_statement(statement)?;
                }
                Ok(())
            }
            Statement::IfStatement(statement) => {
                self.analyze_expression(&statement.test)?;
                self.analyze_statement(&statement.consequent)?;
                if let Some(alternate) = &statement.alternate {
                    self.analyze_statement(alternate)?;
                }
                Ok(())
            }
            Statement::WhileStatement(statement) => {
                self.analyze_expression(&statement.test)?;
                self.analyze_statement(&statement.body)
            }
            Statement::ForStatement(statement) => {
                match &statement.init {
                    Some(ForStatementInit::VariableDeclaration(declaration)) => {
                        self.analyze_variable_declaration(declaration)?;
                    }
                    Some(init) => {
                        if let Some(expression) = init.as_expression() {
                            self.analyze_expression(expression)?;
                        }
                    }
                    None => {}
                }
                if let Some(test) = &statement.test {
                    self.analyze_expression(test)?;
                }
                if let Some(update) = &statement.update {
                    self.analyze_expression(update)?;
                }
                self.analyze_statement(&statement.body)
            }
            Statement::ReturnStatement(statement) => match &statement.argument {
                Some(argument) => self.analyze_expression(argument),
                None => Ok(()),
            },
            Statement::ThrowStatement(statement) => self.analyze_expression(&statement.argument),
            Statement::TryStatement(statement) => {
                for statement in statement.block.body.iter() {
                    self.analyze_statement(statement)?;
                }
                if let Some(handler) = &statement.handler {
                    self.analyze_catch_clause(handler)?;
                }
                if let Some(finalizer) = &statement.finalizer {
                    for statement in finalizer.body.iter() {
                        self.analyze_statement(statement)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn analyze_variable_declaration(
        &mut self,
        declaration: &'a VariableDeclaration<'a>,
    ) -> Result<(), CompileError> {
        if declaration.kind != VariableDeclarationKind::Var {
            return Err(CompileError::UnsupportedSyntax("lexical declarations"));
        }
        for declarator in declaration.declarations.iter() {
            self.declare_var(binding_identifier_name(&declarator.id)?, None)?;
            if let Some(init) = &declarator.init {
                self.analyze_expression(init)?;
            }
        }
        Ok(())
    }

    fn analyze_catch_clause(&mut self, clause: &'a CatchClause<'a>) -> Result<(), CompileError> {
        let saved_lexical_env = self.lexical_env;
        if let Some(parameter) = &clause.param {
            let name = binding_identifier_name(&parameter.pattern)?;
            let catch_env = self
                .tree
                .environments
                .new_catch_environment(Some(self.lexical_env))?;
            self.tree
                .environments
                .record_mut(catch_env)?
                .declare(name, None)?;
            self.tree.catch_scopes.insert(clause.span, catch_env);
            self.lexical_env = catch_env;
        }
        let result = clause
            .body
            .body
            .iter()
            .try_for_each(|statement| self.analyze_statement(statement));
        self.lexical_env = saved_lexical_env;
        result
    }

    fn analyze_function(&mut self, function: &'a Function<'a>) -> Result<(), CompileError> {
        if function.generator || function.r#async {
            return Err(CompileError::UnsupportedSyntax("generator and async functions"));
        }
        if function.params.rest.is_some() {
            return Err(CompileError::UnsupportedSyntax("rest parameters"));
        }
        let Some(body) = &function.body else {
            return Err(CompileError::UnsupportedSyntax("function without a body"));
        };
        let name = function.id.as_ref().map_or("", |id| id.name.as_str());
        let parameters = function
            .params
            .items
            .iter()
            .map(|parameter| binding_identifier_name(&parameter.pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let function_env =
            self.tree
                .environments
                .new_function_environment(Some(self.lexical_env), name, &parameters)?;
        self.tree.function_scopes.insert(function.span, function_env);

        let saved = (
            self.lexical_env,
            self.var_env,
            self.strict,
            self.sloppy_eval,
            self.direct_eval,
        );
        self.lexical_env = function_env;
        self.var_env = function_env;
        self.strict = self.strict || has_use_strict(&body.directives);
        self.sloppy_eval = false;
        self.direct_eval = false;
        let result = self.analyze_body(&body.statements).and_then(|()| {
            if self.direct_eval && !self.strict {
                self.insert_variable_environment(function, function_env)
            } else {
                Ok(())
            }
        });
        (
            self.lexical_env,
            self.var_env,
            self.strict,
            self.sloppy_eval,
            self.direct_eval,
        ) = saved;
        result
    }

    /// Places a variable environment between `function_env` and the
    /// environments created while analyzing the function's body.
    fn insert_variable_environment(
        &mut self,
        function: &Function<'_>,
        function_env: EnvironmentIndex,
    ) -> Result<(), CompileError> {
        let children: Vec<EnvironmentIndex> = self
            .tree
            .environments
            .iter()
            .filter(|(_, record)| record.outer_env() == Some(function_env))
            .map(|(index, _)| index)
            .collect();
        let variable_env = self
            .tree
            .environments
            .new_variable_environment(Some(function_env))?;
        for child in children {
            self.tree
                .environments
                .record_mut(child)?
                .set_outer_env(variable_env);
        }
        self.tree.variable_scopes.insert(function.span, variable_env);
        Ok(())
    }

    fn analyze_expression(&mut self, expression: &'a Expression<'a>) -> Result<(), CompileError> {
        match expression {
            Expression::FunctionExpression(function) => self.analyze_function(function),
            Expression::AssignmentExpression(assignment) => {
                self.analyze_expression(&assignment.right)
            }
            Expression::BinaryExpression(binary) => {
                self.analyze_expression(&binary.left)?;
                self.analyze_expression(&binary.right)
            }
            Expression::LogicalExpression(logical) => {
                self.analyze_expression(&logical.left)?;
                self.analyze_expression(&logical.right)
            }
            Expression::UnaryExpression(unary) => self.analyze_expression(&unary.argument),
            Expression::ConditionalExpression(conditional) => {
                self.analyze_expression(&conditional.test)?;
                self.analyze_expression(&conditional.consequent)?;
                self.analyze_expression(&conditional.alternate)
            }
            Expression::CallExpression(call) => {
                if matches!(&call.callee, Expression::Identifier(id) if id.name.as_str() == "eval")
                {
                    self.direct_eval = true;
                }
                self.analyze_expression(&call.callee)?;
                for argument in call.arguments.iter() {
                    if let Some(argument) = argument.as_expression() {
                        self.analyze_expression(argument)?;
                    }
                }
                Ok(())
            }
            Expression::StaticMemberExpression(member) => self.analyze_expression(&member.object),
            Expression::ComputedMemberExpression(member) => {
                self.analyze_expression(&member.object)?;
                self.analyze_expression(&member.expression)
            }
            Expression::ParenthesizedExpression(parenthesized) => {
                self.analyze_expression(&parenthesized.expression)
            }
            Expression::SequenceExpression(sequence) => sequence
                .expressions
                .iter()
                .try_for_each(|expression| self.analyze_expression(expression)),
            _ => Ok(()),
        }
    }
}

fn function_name<'a>(function: &'a Function<'_>) -> Result<&'a str, CompileError> {
    function
        .id
        .as_ref()
        .map(|id| id.name.as_str())
        .ok_or(CompileError::UnsupportedSyntax("anonymous function declaration"))
}
