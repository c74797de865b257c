pub mod builtins;
pub mod env;
pub mod host;
pub mod value;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::*;
use crate::error::EzError;
use crate::imports::ModuleLoader;
use crate::span::Position;
use crate::stack::ensure_sufficient_stack;
use crate::stdlib;

use env::Env;
use host::{Host, StdHost};
use value::{Function, Value};

/// Nested user calls beyond this depth abort with a runtime error.
pub const MAX_CALL_DEPTH: usize = 256;

/// Outcome of running a statement.
#[derive(Debug)]
enum Flow {
    Normal,
    Return(Value),
}

#[derive(Clone)]
struct Listener {
    event: String,
    param: String,
    body: Rc<Block>,
    env: Env,
    origin: Option<PathBuf>,
}

/// Tree-walking interpreter. One runtime owns one global frame; every
/// imported file executes into that same frame.
pub struct Runtime {
    program: Rc<Program>,
    globals: Env,
    host: Rc<dyn Host>,
    loader: ModuleLoader,
    /// File the program was parsed from, if any.
    entry: Option<PathBuf>,
    /// Files currently executing, innermost last. Imports resolve against
    /// the directory of the last entry.
    files: Vec<PathBuf>,
    listeners: Vec<Listener>,
    depth: usize,
    /// Imported file in which the last error was raised.
    error_file: Option<PathBuf>,
    /// Set once the innermost file of the current error has been recorded.
    error_located: bool,
}

impl Runtime {
    pub fn new(program: Program) -> Self {
        let host: Rc<dyn Host> = Rc::new(StdHost::new());
        let globals = Env::new();
        stdlib::register_stdlib(&globals, host.clone());
        Runtime {
            program: Rc::new(program),
            globals,
            host,
            loader: ModuleLoader::new(),
            entry: None,
            files: Vec::new(),
            listeners: Vec::new(),
            depth: 0,
            error_file: None,
            error_located: false,
        }
    }

    /// Build a runtime for a program parsed from `path`. Relative imports
    /// resolve against that file's directory, and importing the file itself
    /// is a no-op.
    pub fn from_file(program: Program, path: impl AsRef<Path>) -> Self {
        let mut runtime = Runtime::new(program);
        let path = path.as_ref();
        let origin = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        runtime.loader.mark_loaded(origin.clone());
        runtime.files.push(origin.clone());
        runtime.entry = Some(origin);
        runtime
    }

    pub fn with_host(mut self, host: Rc<dyn Host>) -> Self {
        stdlib::register_stdlib(&self.globals, host.clone());
        self.host = host;
        self
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    /// Read a binding from the global frame.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.globals.get_local(name)
    }

    /// The imported file that raised the most recent error, if the error did
    /// not come from the entry program.
    pub fn error_file(&self) -> Option<&Path> {
        self.error_file.as_deref()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.iter().filter(|l| l.event == event).count()
    }

    /// Run every top-level statement of the program in order. Calling this
    /// twice runs the statements again against the same globals.
    pub fn execute(&mut self) -> Result<(), EzError> {
        tracing::debug!(
            statements = self.program.body.len(),
            "runtime: starting execution"
        );
        let program = self.program.clone();
        let globals = self.globals.clone();
        self.reset_error_location();
        self.exec_top_level(&program.body, &globals).map_err(|e| {
            tracing::error!("{}", e.summary());
            e
        })?;
        tracing::debug!("runtime: execution completed");
        Ok(())
    }

    /// Run additional top-level statements against the global frame and
    /// return the value of the final expression statement, or null.
    pub fn eval_program(&mut self, program: &Program) -> Result<Value, EzError> {
        let globals = self.globals.clone();
        self.reset_error_location();
        let mut last = Value::Null;
        for stmt in &program.body {
            last = match &stmt.node {
                Stmt::Expr(expr) => self.eval_expr(expr, &globals)?,
                _ => {
                    self.exec_stmt(stmt, &globals)?;
                    Value::Null
                }
            };
        }
        Ok(last)
    }

    /// Deliver `payload` to every listener registered for `event`, in
    /// registration order. Returns how many listeners ran.
    pub fn dispatch(&mut self, event: &str, payload: Value) -> Result<usize, EzError> {
        let matching: Vec<Listener> = self
            .listeners
            .iter()
            .filter(|l| l.event == event)
            .cloned()
            .collect();
        self.reset_error_location();
        for listener in &matching {
            let frame = listener.env.extend();
            frame.declare(listener.param.clone(), payload.clone());
            self.within_file(listener.origin.clone(), |rt| {
                rt.exec_block(&listener.body, &frame)
            })?;
        }
        Ok(matching.len())
    }

    fn reset_error_location(&mut self) {
        self.error_file = None;
        self.error_located = false;
    }

    /// Run `body` with `file` as the innermost executing file. The first
    /// failing frame on the way out records where the error was raised;
    /// errors raised in the entry program leave `error_file` empty.
    fn within_file<T>(
        &mut self,
        file: Option<PathBuf>,
        body: impl FnOnce(&mut Self) -> Result<T, EzError>,
    ) -> Result<T, EzError> {
        let pushed = file.is_some();
        if let Some(path) = &file {
            self.files.push(path.clone());
        }
        let result = body(self);
        if pushed {
            self.files.pop();
        }
        if result.is_err() && !self.error_located {
            self.locate_error(file);
        }
        result
    }

    fn locate_error(&mut self, file: Option<PathBuf>) {
        self.error_located = true;
        self.error_file = file.filter(|path| Some(path) != self.entry.as_ref());
    }

    fn current_file(&self) -> Option<PathBuf> {
        self.files.last().cloned()
    }

    // ── Statements ──

    /// A `return` outside any function has nothing to return from and is
    /// skipped.
    fn exec_top_level(&mut self, stmts: &[SpannedStmt], env: &Env) -> Result<(), EzError> {
        for stmt in stmts {
            self.exec_stmt(stmt, env)?;
        }
        Ok(())
    }

    fn exec_block(&mut self, block: &Block, env: &Env) -> Result<Flow, EzError> {
        let frame = env.extend();
        for stmt in &block.statements {
            if let Flow::Return(value) = self.exec_stmt(stmt, &frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &SpannedStmt, env: &Env) -> Result<Flow, EzError> {
        ensure_sufficient_stack(|| self.exec_stmt_inner(stmt, env))
    }

    fn exec_stmt_inner(&mut self, stmt: &SpannedStmt, env: &Env) -> Result<Flow, EzError> {
        match &stmt.node {
            Stmt::VarDecl { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                env.declare(name.clone(), value);
                Ok(Flow::Normal)
            }

            Stmt::FunctionDecl { name, params, body } => {
                let func = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: env.clone(),
                    origin: self.current_file(),
                };
                env.declare(name.clone(), Value::Function(Rc::new(func)));
                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                consequent,
                alternate,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    self.exec_block(consequent, env)
                } else if let Some(alt) = alternate {
                    self.exec_block(alt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                let items = match self.eval_expr(iterable, env)? {
                    Value::Array(items) => {
                        let snapshot = items.borrow().clone();
                        snapshot
                    }
                    other => {
                        return Err(EzError::type_mismatch(
                            format!("for loop expects an array, got {}", other.type_name()),
                            iterable.pos,
                        ))
                    }
                };
                // One frame for the loop variable; the body block opens its
                // own frame per iteration.
                let frame = env.extend();
                for item in items {
                    frame.declare(variable.clone(), item);
                    if let Flow::Return(value) = self.exec_block(body, &frame)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.eval_expr(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Block(block) => self.exec_block(block, env),

            Stmt::Expr(expr) => {
                self.eval_expr(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Listen { event, param, body } => {
                tracing::debug!(event = %event, "registered listener");
                self.listeners.push(Listener {
                    event: event.clone(),
                    param: param.clone(),
                    body: body.clone(),
                    env: env.clone(),
                    origin: self.current_file(),
                });
                Ok(Flow::Normal)
            }

            Stmt::Use { module, alias } => {
                let value = self
                    .host
                    .load_module(module)
                    .map_err(|message| EzError::runtime(message, stmt.pos))?;
                env.declare(alias.clone(), value);
                Ok(Flow::Normal)
            }

            Stmt::Import { path } => {
                self.exec_import(path, stmt.pos)?;
                Ok(Flow::Normal)
            }

            Stmt::Send { target, message } => {
                let target = self.eval_expr(target, env)?;
                let message = self.eval_expr(message, env)?;
                self.host
                    .send(&target, &message)
                    .map_err(|m| EzError::runtime(m, stmt.pos))?;
                Ok(Flow::Normal)
            }

            Stmt::Reply { target, message } => {
                let target = self.eval_expr(target, env)?;
                let message = self.eval_expr(message, env)?;
                self.host
                    .reply(&target, &message)
                    .map_err(|m| EzError::runtime(m, stmt.pos))?;
                Ok(Flow::Normal)
            }

            Stmt::React { target, emoji } => {
                let target = self.eval_expr(target, env)?;
                let emoji = self.eval_expr(emoji, env)?;
                self.host
                    .react(&target, &emoji)
                    .map_err(|m| EzError::runtime(m, stmt.pos))?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Imported statements run in the global frame, wherever the `import`
    /// appears. The path resolves against the file containing the `import`.
    /// A file that fails to lex or parse is not executed at all.
    fn exec_import(&mut self, request: &str, pos: Position) -> Result<(), EzError> {
        let importer = self.current_file();
        let path = self.loader.resolve(request, importer.as_deref(), pos)?;
        let mut module = match self.loader.load_path(path.clone()) {
            Ok(Some(module)) => module,
            Ok(None) => return Ok(()),
            Err(e) => {
                self.locate_error(Some(path));
                return Err(e);
            }
        };

        if !module.errors.is_empty() {
            for e in &module.errors {
                tracing::error!(path = %module.path.display(), "{}", e.summary());
            }
            let first = module.errors.remove(0);
            self.locate_error(Some(module.path));
            return Err(first);
        }

        let globals = self.globals.clone();
        let program = module.program;
        self.within_file(Some(module.path), |rt| {
            rt.exec_top_level(&program.body, &globals)
        })
    }

    // ── Expressions ──

    fn eval_expr(&mut self, expr: &SpannedExpr, env: &Env) -> Result<Value, EzError> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr, env))
    }

    fn eval_expr_inner(&mut self, expr: &SpannedExpr, env: &Env) -> Result<Value, EzError> {
        match &expr.node {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
            }),

            Expr::Ident(name) => env.lookup(name).ok_or_else(|| EzError::UndefinedVariable {
                name: name.clone(),
                pos: expr.pos,
            }),

            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval_expr(element, env)?);
                }
                Ok(Value::array(items))
            }

            Expr::Object(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.eval_expr(value, env)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::object(map))
            }

            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(EzError::type_mismatch(
                            format!("Unary '-' requires a number, got {}", other.type_name()),
                            expr.pos,
                        )),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }

            // Both operands are always evaluated, `&&` and `||` included.
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                eval_binop(*op, l, r, expr.pos)
            }

            Expr::Call { callee, args } => {
                let func = self.eval_expr(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, env)?);
                }
                self.call_value(func, values, callee, expr.pos)
            }

            Expr::Member {
                object,
                property,
                computed,
            } => {
                let object = self.eval_expr(object, env)?;
                let key = self.member_key(property, *computed, env)?;
                get_member(&object, &key, expr.pos)
            }

            Expr::Assign { target, value } => {
                let value = self.eval_expr(value, env)?;
                match &target.node {
                    Expr::Ident(name) => {
                        env.assign(name, value.clone())
                            .map_err(|_| EzError::UndefinedVariable {
                                name: name.clone(),
                                pos: target.pos,
                            })?;
                    }
                    Expr::Member {
                        object,
                        property,
                        computed,
                    } => {
                        let object = self.eval_expr(object, env)?;
                        let key = self.member_key(property, *computed, env)?;
                        set_member(&object, &key, value.clone(), expr.pos)?;
                    }
                    _ => return Err(EzError::runtime("invalid assignment target", expr.pos)),
                }
                Ok(value)
            }
        }
    }

    fn member_key(
        &mut self,
        property: &SpannedExpr,
        computed: bool,
        env: &Env,
    ) -> Result<Value, EzError> {
        if computed {
            return self.eval_expr(property, env);
        }
        match &property.node {
            Expr::Ident(name) => Ok(Value::String(name.clone())),
            _ => Err(EzError::runtime("invalid property access", property.pos)),
        }
    }

    fn call_value(
        &mut self,
        func: Value,
        args: Vec<Value>,
        callee: &SpannedExpr,
        pos: Position,
    ) -> Result<Value, EzError> {
        match func {
            Value::Native(native) => (native.func)(&args).map_err(|e| e.at(pos)),
            Value::Function(func) => self.call_function(&func, args, pos),
            other => {
                let callee = match &callee.node {
                    Expr::Ident(name) => name.clone(),
                    _ => other.to_string(),
                };
                Err(EzError::NotCallable { callee, pos })
            }
        }
    }

    fn call_function(
        &mut self,
        func: &Function,
        args: Vec<Value>,
        pos: Position,
    ) -> Result<Value, EzError> {
        if args.len() != func.params.len() {
            return Err(EzError::ArityMismatch {
                name: func.name.clone(),
                expected: func.params.len(),
                found: args.len(),
                pos,
            });
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EzError::runtime(
                format!("maximum call depth of {} exceeded", MAX_CALL_DEPTH),
                pos,
            ));
        }

        let frame = func.closure.extend();
        for (param, arg) in func.params.iter().zip(args) {
            frame.declare(param.clone(), arg);
        }

        self.depth += 1;
        let result = self.within_file(func.origin.clone(), |rt| {
            rt.exec_block(&func.body, &frame)
        });
        self.depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }
}

fn eval_binop(op: BinOp, lhs: Value, rhs: Value, pos: Position) -> Result<Value, EzError> {
    match op {
        BinOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", lhs, rhs)))
            }
            _ => Err(EzError::type_mismatch(
                format!("Cannot add {} and {}", lhs.type_name(), rhs.type_name()),
                pos,
            )),
        },

        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let (a, b) = numeric_operands(op, &lhs, &rhs, pos, "Arithmetic operation")?;
            Ok(Value::Number(match op {
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => a % b,
            }))
        }

        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (a, b) = numeric_operands(op, &lhs, &rhs, pos, "Comparison")?;
            Ok(Value::Bool(match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                _ => a >= b,
            }))
        }

        BinOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinOp::NotEq => Ok(Value::Bool(lhs != rhs)),

        BinOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
    }
}

fn numeric_operands(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
    pos: Position,
    what: &str,
) -> Result<(f64, f64), EzError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(EzError::type_mismatch(
            format!(
                "{} '{}' requires numbers, got {} and {}",
                what,
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ),
            pos,
        )),
    }
}

fn array_index(key: &Value, length: usize, pos: Position) -> Result<usize, EzError> {
    let n = match key {
        Value::Number(n) => n.floor(),
        other => {
            return Err(EzError::type_mismatch(
                format!("Array index must be a number, got {}", other.type_name()),
                pos,
            ))
        }
    };
    if n.is_nan() || n < 0.0 || n >= length as f64 {
        return Err(EzError::IndexOutOfBounds {
            index: n as i64,
            length,
            pos,
        });
    }
    Ok(n as usize)
}

fn get_member(object: &Value, key: &Value, pos: Position) -> Result<Value, EzError> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let index = array_index(key, items.len(), pos)?;
            Ok(items[index].clone())
        }
        Value::Object(entries) => Ok(entries
            .borrow()
            .get(&key.to_string())
            .cloned()
            .unwrap_or(Value::Null)),
        other => Err(EzError::type_mismatch(
            format!("Cannot access property of {}", other.type_name()),
            pos,
        )),
    }
}

fn set_member(object: &Value, key: &Value, value: Value, pos: Position) -> Result<(), EzError> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let index = array_index(key, items.len(), pos)?;
            items[index] = value;
            Ok(())
        }
        Value::Object(entries) => {
            entries.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        other => Err(EzError::type_mismatch(
            format!("Cannot assign property of {}", other.type_name()),
            pos,
        )),
    }
}
