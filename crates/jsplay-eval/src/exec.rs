//! Statement execution and declaration hoisting.
//!
//! `break`, `continue` and `return` unwind as [`EvalError`] variants until
//! the enclosing loop, `switch` or function catches them.

use std::rc::Rc;

use jsplay_types::ast::{
    ForEachKind, ForEachStmt, ForInit, ForStmt, Stmt, SwitchStmt, TryStmt, VarDecl, VarKind,
    WhileStmt,
};

use crate::env::{Scope, ScopeKind};
use crate::error::{EvalError, EvalResult};
use crate::interpreter::{enumerable_entries, expression_label, find_in_chain, Interpreter, THIS};
use crate::stack;
use crate::value::{ObjectKind, Value};

/// What a loop does after one pass of its body.
enum Flow {
    Next,
    Break,
}

impl Interpreter {
    /// Run a script body in a fresh function scope under the realm globals.
    pub(crate) fn run_program(&mut self, globals: &Rc<Scope>, stmts: &[Stmt]) -> EvalResult<Value> {
        let scope = Scope::child(globals, ScopeKind::Function);
        scope.declare(THIS, Value::Undefined, false);
        self.hoist_function_scope(&scope, stmts);
        match self.exec_stmts(&scope, stmts) {
            Ok(()) => Ok(Value::Undefined),
            Err(EvalError::Return(value)) => Ok(value),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn exec_stmts(&mut self, scope: &Rc<Scope>, stmts: &[Stmt]) -> EvalResult<()> {
        for stmt in stmts {
            self.exec_stmt(scope, stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, scope: &Rc<Scope>, stmt: &Stmt) -> EvalResult<()> {
        stack::guarded(|| self.exec_stmt_inner(scope, stmt))
    }

    fn exec_stmt_inner(&mut self, scope: &Rc<Scope>, stmt: &Stmt) -> EvalResult<()> {
        self.tick()?;
        match stmt {
            Stmt::Var(decl) => self.exec_var_decl(scope, decl),
            // Hoisted when the enclosing scope was entered.
            Stmt::Function(_) => Ok(()),
            Stmt::Expr(s) => self.eval_expr(scope, &s.expr).map(drop),
            Stmt::Block(block) => self.exec_block(scope, &block.stmts),
            Stmt::If(s) => {
                if self.eval_expr(scope, &s.condition)?.to_boolean() {
                    self.exec_stmt(scope, &s.then_branch)
                } else if let Some(else_branch) = &s.else_branch {
                    self.exec_stmt(scope, else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::For(s) => self.exec_for(scope, s),
            Stmt::ForEach(s) => self.exec_for_each(scope, s),
            Stmt::While(s) => self.exec_while(scope, s),
            Stmt::DoWhile(s) => self.exec_do_while(scope, s),
            Stmt::Return(s) => {
                let value = match &s.value {
                    Some(expr) => self.eval_expr(scope, expr)?,
                    None => Value::Undefined,
                };
                Err(EvalError::Return(value))
            }
            Stmt::Break(_) => Err(EvalError::Break),
            Stmt::Continue(_) => Err(EvalError::Continue),
            Stmt::Throw(s) => {
                let value = self.eval_expr(scope, &s.value)?;
                Err(EvalError::Thrown(value))
            }
            Stmt::Try(s) => self.exec_try(scope, s),
            Stmt::Switch(s) => self.exec_switch(scope, s),
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn exec_block(&mut self, scope: &Rc<Scope>, stmts: &[Stmt]) -> EvalResult<()> {
        let block_scope = Scope::child(scope, ScopeKind::Block);
        self.hoist_lexical(&block_scope, stmts);
        self.exec_stmts(&block_scope, stmts)
    }

    fn exec_var_decl(&mut self, scope: &Rc<Scope>, decl: &VarDecl) -> EvalResult<()> {
        for declarator in &decl.declarators {
            let name = &declarator.name.name;
            match decl.kind {
                VarKind::Var => {
                    if let Some(init) = &declarator.init {
                        let value = self.eval_named(scope, init, name)?;
                        self.assign_identifier(scope, name, value)?;
                    }
                }
                VarKind::Let | VarKind::Const => {
                    let value = match &declarator.init {
                        Some(init) => self.eval_named(scope, init, name)?,
                        None => Value::Undefined,
                    };
                    if scope.has_own(name) {
                        scope.initialize(name, value);
                    } else {
                        scope.declare(name, value, decl.kind == VarKind::Let);
                    }
                }
            }
        }
        Ok(())
    }

    // ── Loops ─────────────────────────────────────────────────────────────────

    fn loop_body(&mut self, scope: &Rc<Scope>, body: &Stmt) -> EvalResult<Flow> {
        match self.exec_stmt(scope, body) {
            Ok(()) | Err(EvalError::Continue) => Ok(Flow::Next),
            Err(EvalError::Break) => Ok(Flow::Break),
            Err(e) => Err(e),
        }
    }

    fn exec_while(&mut self, scope: &Rc<Scope>, s: &WhileStmt) -> EvalResult<()> {
        while self.eval_expr(scope, &s.condition)?.to_boolean() {
            if let Flow::Break = self.loop_body(scope, &s.body)? {
                break;
            }
        }
        Ok(())
    }

    fn exec_do_while(&mut self, scope: &Rc<Scope>, s: &WhileStmt) -> EvalResult<()> {
        loop {
            if let Flow::Break = self.loop_body(scope, &s.body)? {
                break;
            }
            if !self.eval_expr(scope, &s.condition)?.to_boolean() {
                break;
            }
        }
        Ok(())
    }

    /// `for (init; test; update)`. A `let`/`const` in the head gets a fresh
    /// copy per iteration, so closures in the body capture that iteration's value.
    fn exec_for(&mut self, scope: &Rc<Scope>, s: &ForStmt) -> EvalResult<()> {
        let loop_scope = Scope::child(scope, ScopeKind::Block);
        let mut per_iteration: Vec<(String, bool)> = Vec::new();
        match &s.init {
            Some(ForInit::Var(decl)) => {
                if decl.kind != VarKind::Var {
                    let mutable = decl.kind == VarKind::Let;
                    for declarator in &decl.declarators {
                        loop_scope.declare_uninitialized(&declarator.name.name, mutable);
                        per_iteration.push((declarator.name.name.clone(), mutable));
                    }
                }
                self.exec_var_decl(&loop_scope, decl)?;
            }
            Some(ForInit::Expr(expr)) => {
                self.eval_expr(&loop_scope, expr)?;
            }
            None => {}
        }

        let mut iteration = copy_iteration_scope(scope, &loop_scope, &per_iteration);
        loop {
            if let Some(test) = &s.test {
                if !self.eval_expr(&iteration, test)?.to_boolean() {
                    break;
                }
            }
            if let Flow::Break = self.loop_body(&iteration, &s.body)? {
                break;
            }
            iteration = copy_iteration_scope(scope, &iteration, &per_iteration);
            if let Some(update) = &s.update {
                self.eval_expr(&iteration, update)?;
            }
        }
        Ok(())
    }

    fn exec_for_each(&mut self, scope: &Rc<Scope>, s: &ForEachStmt) -> EvalResult<()> {
        let target = self.eval_expr(scope, &s.iterable)?;
        match s.kind {
            ForEachKind::Of => {
                if let Value::Object(obj) = &target {
                    if obj.is_array() {
                        // Index-based so pushes during the loop are visited.
                        let mut index = 0;
                        loop {
                            let item = match &obj.borrow().kind {
                                ObjectKind::Array(items) => items.get(index).cloned(),
                                _ => None,
                            };
                            let Some(item) = item else { break };
                            index += 1;
                            if let Flow::Break = self.for_each_pass(scope, s, item)? {
                                break;
                            }
                        }
                        return Ok(());
                    }
                }
                let items = self.iterable_items(&target, &expression_label(&s.iterable))?;
                for item in items {
                    if let Flow::Break = self.for_each_pass(scope, s, item)? {
                        break;
                    }
                }
            }
            ForEachKind::In => {
                for key in enumerable_keys(&target) {
                    if let Flow::Break = self.for_each_pass(scope, s, Value::String(key))? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn for_each_pass(
        &mut self,
        scope: &Rc<Scope>,
        s: &ForEachStmt,
        value: Value,
    ) -> EvalResult<Flow> {
        let iteration = Scope::child(scope, ScopeKind::Block);
        match s.declaration {
            Some(kind @ (VarKind::Let | VarKind::Const)) => {
                iteration.declare(&s.binding.name, value, kind == VarKind::Let);
            }
            Some(VarKind::Var) | None => self.assign_identifier(scope, &s.binding.name, value)?,
        }
        self.loop_body(&iteration, &s.body)
    }

    // ── try / switch ──────────────────────────────────────────────────────────

    fn exec_try(&mut self, scope: &Rc<Scope>, s: &TryStmt) -> EvalResult<()> {
        let result = self.exec_block(scope, &s.block.stmts);
        let result = match (result, &s.handler) {
            (Err(EvalError::Thrown(value)), Some(handler)) => {
                let catch_scope = Scope::child(scope, ScopeKind::Block);
                if let Some(param) = &handler.param {
                    catch_scope.declare(&param.name, value, true);
                }
                self.exec_block(&catch_scope, &handler.body.stmts)
            }
            (result, _) => result,
        };
        // An exhausted budget unwinds straight to the host.
        if matches!(result, Err(EvalError::StepLimitExceeded { .. })) {
            return result;
        }
        if let Some(finalizer) = &s.finalizer {
            self.exec_block(scope, &finalizer.stmts)?;
        }
        result
    }

    fn exec_switch(&mut self, scope: &Rc<Scope>, s: &SwitchStmt) -> EvalResult<()> {
        let discriminant = self.eval_expr(scope, &s.discriminant)?;
        let switch_scope = Scope::child(scope, ScopeKind::Block);
        for case in &s.cases {
            self.hoist_lexical(&switch_scope, &case.body);
        }

        let mut start = None;
        for (i, case) in s.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.eval_expr(&switch_scope, test)?.strict_equals(&discriminant) {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| s.cases.iter().position(|c| c.test.is_none())) else {
            return Ok(());
        };

        for case in &s.cases[start..] {
            match self.exec_stmts(&switch_scope, &case.body) {
                Ok(()) => {}
                Err(EvalError::Break) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ── Hoisting ──────────────────────────────────────────────────────────────

    /// Function entry: `var` names anywhere in the body (outside nested
    /// functions) become `undefined`, then block-level declarations.
    pub(crate) fn hoist_function_scope(&mut self, scope: &Rc<Scope>, stmts: &[Stmt]) {
        let mut names = Vec::new();
        collect_var_names(stmts, &mut names);
        for name in names {
            if !scope.has_own(&name) {
                scope.declare(&name, Value::Undefined, true);
            }
        }
        self.hoist_lexical(scope, stmts);
    }

    /// Block entry: `let`/`const` enter their dead zone and function
    /// declarations are bound, so they can be called before their statement.
    fn hoist_lexical(&mut self, scope: &Rc<Scope>, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Var(decl) if decl.kind != VarKind::Var => {
                    for declarator in &decl.declarators {
                        scope.declare_uninitialized(&declarator.name.name, decl.kind == VarKind::Let);
                    }
                }
                Stmt::Function(function) => {
                    if let Some(name) = &function.name {
                        let closure = self.make_closure(scope, function, None);
                        scope.declare(&name.name, closure, true);
                    }
                }
                _ => {}
            }
        }
    }
}

fn copy_iteration_scope(
    outer: &Rc<Scope>,
    from: &Rc<Scope>,
    names: &[(String, bool)],
) -> Rc<Scope> {
    if names.is_empty() {
        return Rc::clone(from);
    }
    let next = Scope::child(outer, ScopeKind::Block);
    for (name, mutable) in names {
        next.declare(name, from.own_value(name).unwrap_or_default(), *mutable);
    }
    next
}

fn collect_var_names(stmts: &[Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        collect_stmt_var_names(stmt, out);
    }
}

fn collect_stmt_var_names(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Var(decl) if decl.kind == VarKind::Var => {
            out.extend(decl.declarators.iter().map(|d| d.name.name.clone()));
        }
        Stmt::Block(block) => collect_var_names(&block.stmts, out),
        Stmt::If(s) => {
            collect_stmt_var_names(&s.then_branch, out);
            if let Some(else_branch) = &s.else_branch {
                collect_stmt_var_names(else_branch, out);
            }
        }
        Stmt::For(s) => {
            if let Some(ForInit::Var(decl)) = &s.init {
                if decl.kind == VarKind::Var {
                    out.extend(decl.declarators.iter().map(|d| d.name.name.clone()));
                }
            }
            collect_stmt_var_names(&s.body, out);
        }
        Stmt::ForEach(s) => {
            if s.declaration == Some(VarKind::Var) {
                out.push(s.binding.name.clone());
            }
            collect_stmt_var_names(&s.body, out);
        }
        Stmt::While(s) | Stmt::DoWhile(s) => collect_stmt_var_names(&s.body, out),
        Stmt::Try(s) => {
            collect_var_names(&s.block.stmts, out);
            if let Some(handler) = &s.handler {
                collect_var_names(&handler.body.stmts, out);
            }
            if let Some(finalizer) = &s.finalizer {
                collect_var_names(&finalizer.stmts, out);
            }
        }
        Stmt::Switch(s) => {
            for case in &s.cases {
                collect_var_names(&case.body, out);
            }
        }
        _ => {}
    }
}

/// Keys visited by `for…in`: own enumerable keys, then inherited ones.
fn enumerable_keys(target: &Value) -> Vec<String> {
    let mut keys: Vec<String> = enumerable_entries(target).into_iter().map(|(k, _)| k).collect();
    if let Value::Object(obj) = target {
        let mut proto = obj.borrow().proto.clone();
        while let Some(link) = proto {
            for (key, _) in enumerable_entries(&Value::Object(link.clone())) {
                if !keys.contains(&key) && find_in_chain(obj, &key).is_some() {
                    keys.push(key);
                }
            }
            proto = link.borrow().proto.clone();
        }
    }
    keys
}
