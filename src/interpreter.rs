//! Tree‑walking evaluator.
//!
//! Statements return a [`Flow`] in the `Ok` channel so that `return`,
//! `break` and `continue` unwind through nested blocks without ever being
//! visible to `try/catch`, which only inspects the `Err` channel.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use log::{debug, info};
use memchr::memchr;

use crate::ast::{BinaryOp, Expr, FunctionDecl, LiteralValue, Program, Stmt, UnaryOp};
use crate::builtins;
use crate::environment::{EnvRef, Environment};
use crate::error::{Result, ShravError};
use crate::host::{FsSourceStore, Output, SourceStore, StdoutOutput};
use crate::modules::{ModuleRegistry, NativeModules};
use crate::parser;
use crate::stack::ensure_sufficient_stack;
use crate::value::{
    container_id, Class, Dict, Function, Instance, Module, Value, VisitingPairs,
    INITIALIZER_NAME, SELF_NAME,
};

/// Default limit on nested script calls before a `CallError` is raised.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Upper bound on the length (bytes or elements) produced by `*` repetition.
pub const MAX_REPEAT_LEN: usize = 1 << 28;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Host collaborators and limits an [`Interpreter`] runs with.  Cloning is
/// cheap; module evaluators share their parent's configuration.
#[derive(Clone)]
pub struct InterpreterConfig {
    pub registry: Rc<dyn ModuleRegistry>,
    pub sources: Rc<dyn SourceStore>,
    pub output: Rc<RefCell<dyn Output>>,
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            registry: Rc::new(NativeModules),
            sources: Rc::new(FsSourceStore::default()),
            output: Rc::new(RefCell::new(StdoutOutput)),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl InterpreterConfig {
    pub fn with_output<O: Output + 'static>(mut self, output: O) -> Self {
        self.output = Rc::new(RefCell::new(output));
        self
    }

    pub fn with_sources<S: SourceStore + 'static>(mut self, sources: S) -> Self {
        self.sources = Rc::new(sources);
        self
    }

    /// Load user modules from `<root>/<name>.shs`.
    pub fn with_module_root<P: AsRef<Path>>(self, root: P) -> Self {
        self.with_sources(FsSourceStore::new(root))
    }

    pub fn with_registry<R: ModuleRegistry + 'static>(mut self, registry: R) -> Self {
        self.registry = Rc::new(registry);
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    modules: HashMap<String, Rc<Module>>,

    /// Source modules currently being loaded, shared with nested module
    /// evaluators to detect import cycles.
    loading: Rc<RefCell<Vec<String>>>,

    config: InterpreterConfig,
    call_depth: usize,

    /// Line of the innermost call expression, for natives that call back.
    line: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter writing to stdout and loading modules from the working
    /// directory.
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::nested(config, Rc::new(RefCell::new(Vec::new())))
    }

    fn nested(config: InterpreterConfig, loading: Rc<RefCell<Vec<String>>>) -> Self {
        info!("Initializing Interpreter");

        let builtins: EnvRef = Environment::new_ref();
        builtins::define_globals(&mut builtins.borrow_mut());

        let globals: EnvRef = Environment::child_of(&builtins);

        Self {
            environment: Rc::clone(&globals),
            globals,
            modules: HashMap::new(),
            loading,
            config,
            call_depth: 0,
            line: 0,
        }
    }

    /// Top‑level scope of this interpreter (user bindings only).
    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Lex, parse and run `source` against the persistent global scope.
    /// Returns the value of the final statement when it is an expression
    /// statement, `null` otherwise.
    pub fn run_source(&mut self, source: &str) -> Result<Value> {
        let program: Program = parser::parse_source(source)?;
        self.interpret(&program)
    }

    pub fn interpret(&mut self, program: &Program) -> Result<Value> {
        debug!("Interpreting {} statements", program.statements.len());

        let result: Result<Value> = self.run_program(program);

        if let Err(err) = &result {
            info!("Program aborted: {}", err);
            self.environment = Rc::clone(&self.globals);
            self.call_depth = 0;
        }

        result
    }

    fn run_program(&mut self, program: &Program) -> Result<Value> {
        let mut last: Value = Value::Null;

        for stmt in &program.statements {
            last = match stmt {
                Stmt::Expression(expr) => self.evaluate(expr)?,
                other => {
                    self.execute(other)?;
                    Value::Null
                }
            };
        }

        info!("Interpretation completed successfully");
        Ok(last)
    }

    // ───────────────────────────── statements ─────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                let text: String = self.stringify(&value);
                self.config.output.borrow_mut().write_line(&text)?;
                Ok(Flow::Normal)
            }

            Stmt::Let { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                debug!("Defining variable '{}'", name);
                self.environment.borrow_mut().define(name, value);
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name);
                let function: Value = self.closure(decl, false);
                self.environment.borrow_mut().define(&decl.name, function);
                Ok(Flow::Normal)
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}' with {} methods", name, methods.len());

                let methods: HashMap<String, Rc<Function>> = methods
                    .iter()
                    .map(|decl| {
                        let function = Function::new(
                            Rc::clone(decl),
                            Rc::clone(&self.environment),
                            decl.name == INITIALIZER_NAME,
                        );
                        (decl.name.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class {
                    name: name.clone(),
                    methods,
                };
                self.environment
                    .borrow_mut()
                    .define(name, Value::Class(Rc::new(class)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            Stmt::If {
                branches,
                else_branch,
            } => {
                for (condition, body) in branches {
                    if self.evaluate(condition)?.is_truthy() {
                        return self.execute_scoped(body);
                    }
                }

                match else_branch {
                    Some(body) => self.execute_scoped(body),
                    None => Ok(Flow::Normal),
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute_scoped(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For {
                variable,
                start,
                end,
                body,
                line,
            } => {
                let start: i64 = self.range_bound(start, "start", *line)?;
                let end: i64 = self.range_bound(end, "end", *line)?;
                debug!("For loop over {}..{}", start, end);

                for i in start..end {
                    let scope: EnvRef = Environment::child_of(&self.environment);
                    scope.borrow_mut().define(variable, Value::Int(i));

                    match self.execute_block(body, scope)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Switch {
                subject,
                cases,
                default,
            } => {
                let subject: Value = self.evaluate(subject)?;

                for case in cases {
                    if self.evaluate(&case.value)? == subject {
                        return self.execute_scoped(&case.body);
                    }
                }

                match default {
                    Some(body) => self.execute_scoped(body),
                    None => Ok(Flow::Normal),
                }
            }

            Stmt::With {
                resource,
                name,
                body,
            } => {
                let resource: Value = self.evaluate(resource)?;

                let scope: EnvRef = Environment::child_of(&self.environment);
                scope.borrow_mut().define(name, resource.clone());

                let outcome: Result<Flow> = self.execute_block(body, scope);
                let closed: Result<()> = self.close_resource(&resource);

                match (outcome, closed) {
                    (Err(err), Err(close_err)) => {
                        info!("Ignoring close failure after body error: {}", close_err);
                        Err(err)
                    }
                    (Err(err), Ok(())) => Err(err),
                    (Ok(_), Err(close_err)) => Err(close_err),
                    (Ok(flow), Ok(())) => Ok(flow),
                }
            }

            Stmt::Break => Ok(Flow::Break),

            Stmt::Continue => Ok(Flow::Continue),

            Stmt::Try {
                body,
                catch_name,
                handler,
            } => match self.execute_scoped(body) {
                Ok(flow) => Ok(flow),
                Err(err) => {
                    debug!("Caught error into '{}': {}", catch_name, err);

                    let scope: EnvRef = Environment::child_of(&self.environment);
                    scope
                        .borrow_mut()
                        .define(catch_name, Value::Str(err.to_string()));
                    self.execute_block(handler, scope)
                }
            },

            Stmt::Import { module, line } => {
                let loaded: Rc<Module> = self.import(module, *line)?;
                self.environment
                    .borrow_mut()
                    .define(module, Value::Module(loaded));
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` in a fresh child of the current scope.
    fn execute_scoped(&mut self, statements: &[Stmt]) -> Result<Flow> {
        let scope: EnvRef = Environment::child_of(&self.environment);
        self.execute_block(statements, scope)
    }

    /// Run `statements` with `environment` as the current scope.  The
    /// previous scope is restored on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);
        let result: Result<Flow> = self.run_statements(statements);
        self.environment = previous;
        result
    }

    fn run_statements(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn range_bound(&mut self, expr: &Expr, which: &str, line: usize) -> Result<i64> {
        let value: Value = self.evaluate(expr)?;

        builtins::to_int(&value).ok_or_else(|| {
            ShravError::type_error(
                line,
                format!(
                    "For-loop {} must be an integer, got {} '{}'",
                    which,
                    value.type_name(),
                    value
                ),
            )
        })
    }

    /// Invoke the zero‑argument `close` capability of a `with` resource, if
    /// it has a callable one.
    fn close_resource(&mut self, resource: &Value) -> Result<()> {
        match self.attribute(resource, "close") {
            Some(close) if close.is_callable() => {
                debug!("Closing resource {}", resource);
                self.call(&close, Vec::new())?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ───────────────────────────── expressions ────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Integer(n) => Value::Int(*n),
                LiteralValue::Float(n) => Value::Float(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Null => Value::Null,
            }),

            Expr::Variable { name, line } => self.environment.borrow().get(name, *line),

            Expr::Assign {
                target,
                value,
                line,
            } => self.assign(target, value, *line),

            Expr::Binary {
                left,
                operator: BinaryOp::And,
                right,
                ..
            } => {
                let result: bool =
                    self.evaluate(left)?.is_truthy() && self.evaluate(right)?.is_truthy();
                Ok(Value::Bool(result))
            }

            Expr::Binary {
                left,
                operator: BinaryOp::Or,
                right,
                ..
            } => {
                let result: bool =
                    self.evaluate(left)?.is_truthy() || self.evaluate(right)?.is_truthy();
                Ok(Value::Bool(result))
            }

            Expr::Binary {
                left,
                operator,
                right,
                line,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(*operator, &left, &right, *line)
            }

            Expr::Unary {
                operator,
                operand,
                line,
            } => {
                let operand: Value = self.evaluate(operand)?;

                match (operator, operand) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Negate, Value::Int(n)) => Ok(n
                        .checked_neg()
                        .map_or_else(|| Value::Float(-(n as f64)), Value::Int)),
                    (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
                    (UnaryOp::Negate, value) => Err(ShravError::type_error(
                        *line,
                        format!("Operand of '-' must be a number, got {}", value.type_name()),
                    )),
                }
            }

            Expr::Call {
                callee,
                arguments,
                line,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let arguments: Vec<Value> = arguments
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<_>>()?;

                self.call_value(&callee, arguments, *line)
            }

            Expr::List(items) => {
                let items: Vec<Value> = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<_>>()?;
                Ok(Value::list(items))
            }

            Expr::Dict(entries) => {
                let dict: Dict = entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.evaluate(value)?)))
                    .collect::<Result<_>>()?;
                Ok(Value::dict(dict))
            }

            Expr::Index {
                object,
                index,
                line,
            } => {
                let object: Value = self.evaluate(object)?;
                let index: Value = self.evaluate(index)?;
                get_index(&object, &index, *line)
            }

            Expr::Property { object, name, line } => {
                let object: Value = self.evaluate(object)?;
                self.get_property(&object, name, *line)
            }

            Expr::Lambda(decl) => Ok(self.closure(decl, false)),
        }
    }

    fn closure(&self, decl: &Rc<FunctionDecl>, is_initializer: bool) -> Value {
        Value::Function(Rc::new(Function::new(
            Rc::clone(decl),
            Rc::clone(&self.environment),
            is_initializer,
        )))
    }

    fn assign(&mut self, target: &Expr, value: &Expr, line: usize) -> Result<Value> {
        match target {
            Expr::Variable { name, .. } => {
                let value: Value = self.evaluate(value)?;
                self.environment
                    .borrow_mut()
                    .assign(name, value.clone(), line)?;
                Ok(value)
            }

            Expr::Property { object, name, .. } => {
                let object: Value = self.evaluate(object)?;
                let value: Value = self.evaluate(value)?;
                set_property(&object, name, value.clone(), line)?;
                Ok(value)
            }

            Expr::Index { object, index, .. } => {
                let object: Value = self.evaluate(object)?;
                let index: Value = self.evaluate(index)?;
                let value: Value = self.evaluate(value)?;
                set_index(&object, &index, value.clone(), line)?;
                Ok(value)
            }

            _ => Err(ShravError::type_error(line, "Invalid assignment target")),
        }
    }

    // ───────────────────────────── calls ──────────────────────────────────

    /// Call `callee` from native code, attributing errors to the line of the
    /// innermost script call.
    pub fn call(&mut self, callee: &Value, arguments: Vec<Value>) -> Result<Value> {
        let line: usize = self.line;
        self.call_value(callee, arguments, line)
    }

    pub fn call_value(
        &mut self,
        callee: &Value,
        mut arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        self.line = line;

        match callee {
            Value::Function(function) => self.call_function(function, arguments, line),

            Value::NativeFunction(native) => {
                debug!("Calling native function '{}'", native.name);
                arguments.resize(native.arity, Value::Null);
                (native.func)(self, &arguments)
            }

            Value::Class(class) => {
                let instance: Value =
                    Value::Instance(Rc::new(RefCell::new(Instance::new(Rc::clone(class)))));

                if let Some(initializer) = class.find_method(INITIALIZER_NAME) {
                    let bound: Function = initializer.bind(instance.clone());
                    self.call_function(&bound, arguments, line)?;
                }

                Ok(instance)
            }

            Value::Module(module) => Err(ShravError::Call(format!(
                "Module '{}' is not callable [line {}]",
                module.name, line
            ))),

            other => Err(ShravError::Call(format!(
                "Can only call functions and classes, got {} [line {}]",
                other.type_name(),
                line
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        mut arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(ShravError::Call(format!(
                "Maximum call depth {} exceeded calling '{}' [line {}]",
                self.config.max_call_depth,
                function.name(),
                line
            )));
        }

        let decl: &FunctionDecl = &function.declaration;
        arguments.resize(decl.params.len(), Value::Null);

        let scope: EnvRef = Environment::child_of(&function.closure);
        {
            let mut scope = scope.borrow_mut();
            for (param, argument) in decl.params.iter().zip(arguments) {
                scope.define(param, argument);
            }
        }

        self.call_depth += 1;
        let outcome: Result<Flow> = self.execute_block(&decl.body, scope);
        self.call_depth -= 1;

        let flow: Flow = outcome?;

        if function.is_initializer {
            return Environment::get_at(&function.closure, 0, SELF_NAME);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    // ───────────────────────────── properties ─────────────────────────────

    /// Attribute lookup shared by property access and `with`: instance
    /// fields, then bound methods; module exports; host attributes; builtin
    /// methods of lists, strings and dicts.
    fn attribute(&self, object: &Value, name: &str) -> Option<Value> {
        match object {
            Value::Instance(instance) => {
                let instance = instance.borrow();

                if let Some(value) = instance.fields.get(name) {
                    return Some(value.clone());
                }

                instance
                    .class
                    .find_method(name)
                    .map(|method| Value::Function(Rc::new(method.bind(object.clone()))))
            }

            Value::Module(module) => module.get(name).cloned(),

            Value::Object(host) => Rc::clone(host).get_attr(name),

            Value::List(_) | Value::Str(_) | Value::Dict(_) => builtins::method(object, name),

            _ => None,
        }
    }

    pub fn get_property(&self, object: &Value, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.attribute(object, name) {
            return Ok(value);
        }

        Err(match object {
            Value::Module(module) => ShravError::Attribute(format!(
                "Module '{}' has no attribute '{}'; available: {} [line {}]",
                module.name,
                name,
                module.names().join(", "),
                line
            )),

            Value::Instance(_) => ShravError::Attribute(format!(
                "Undefined property '{}' on {} [line {}]",
                name, object, line
            )),

            other => ShravError::Attribute(format!(
                "{} value has no property '{}' [line {}]",
                other.type_name(),
                name,
                line
            )),
        })
    }

    // ───────────────────────────── modules ────────────────────────────────

    fn import(&mut self, name: &str, line: usize) -> Result<Rc<Module>> {
        if let Some(module) = self.modules.get(name) {
            debug!("Module '{}' served from cache", name);
            return Ok(Rc::clone(module));
        }

        let module: Module = if self.config.registry.is_native(name) {
            self.config.registry.load(name)?
        } else {
            self.load_source_module(name, line)?
        };

        info!("Imported module '{}'", name);

        let module: Rc<Module> = Rc::new(module);
        self.modules.insert(name.to_owned(), Rc::clone(&module));
        Ok(module)
    }

    /// Run `<name>.shs` in an isolated evaluator and export every callable
    /// left in its global scope.
    fn load_source_module(&mut self, name: &str, line: usize) -> Result<Module> {
        if self.loading.borrow().iter().any(|loading| loading == name) {
            let chain: String = self.loading.borrow().join(" -> ");
            return Err(ShravError::Module(format!(
                "Circular import of '{}' ({} -> {}) [line {}]",
                name, chain, name, line
            )));
        }

        let source: String = self.config.sources.read(name)?;

        self.loading.borrow_mut().push(name.to_owned());
        let mut evaluator = Interpreter::nested(self.config.clone(), Rc::clone(&self.loading));
        let outcome: Result<Value> = evaluator.run_source(&source);
        self.loading.borrow_mut().pop();

        outcome.map_err(|err| {
            ShravError::Module(format!("Error in module '{}': {}", name, err))
        })?;

        let exports: HashMap<String, Value> = evaluator
            .globals
            .borrow()
            .bindings()
            .filter(|(_, value)| value.is_callable())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        debug!("Module '{}' exports {} names", name, exports.len());

        Ok(Module::new(name, exports))
    }

    // ───────────────────────────── rendering ──────────────────────────────

    /// Text used by `print`, the REPL echo and `${…}` markers: strings have
    /// their markers expanded from the current scope.
    pub fn stringify(&self, value: &Value) -> String {
        value.render(&|text| self.interpolate(text))
    }

    /// Replace each `${name}` whose name resolves in the current scope.
    /// Substituted text is not scanned again.
    fn interpolate(&self, text: &str) -> String {
        let bytes: &[u8] = text.as_bytes();
        let mut out: String = String::with_capacity(text.len());
        let mut copied: usize = 0;
        let mut search: usize = 0;

        while let Some(offset) = memchr(b'$', &bytes[search..]) {
            let dollar: usize = search + offset;
            search = dollar + 1;

            if bytes.get(dollar + 1) != Some(&b'{') {
                continue;
            }

            let name_start: usize = dollar + 2;
            let name_end: usize = name_start
                + bytes[name_start..]
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                    .count();

            let well_formed: bool = name_end > name_start
                && !bytes[name_start].is_ascii_digit()
                && bytes.get(name_end) == Some(&b'}');
            if !well_formed {
                continue;
            }

            let name: &str = &text[name_start..name_end];
            let lookup: Result<Value> = self.environment.borrow().get(name, 0);

            if let Ok(value) = lookup {
                out.push_str(&text[copied..dollar]);
                out.push_str(&value.to_string());
                copied = name_end + 1;
                search = copied;
            }
        }

        out.push_str(&text[copied..]);
        out
    }
}

// ───────────────────────────── operators ──────────────────────────────────

fn binary(operator: BinaryOp, left: &Value, right: &Value, line: usize) -> Result<Value> {
    match operator {
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),

        BinaryOp::Less => Ok(Value::Bool(compare(left, right, line)? == Some(Ordering::Less))),
        BinaryOp::Greater => Ok(Value::Bool(
            compare(left, right, line)? == Some(Ordering::Greater),
        )),
        BinaryOp::LessEqual => Ok(Value::Bool(matches!(
            compare(left, right, line)?,
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOp::GreaterEqual => Ok(Value::Bool(matches!(
            compare(left, right, line)?,
            Some(Ordering::Greater | Ordering::Equal)
        ))),

        BinaryOp::Add => match (left, right) {
            (Value::Str(a), b) => Ok(Value::Str(format!("{}{}", a, b))),
            (a, Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                let mut joined: Vec<Value> = a.borrow().clone();
                joined.extend(b.borrow().iter().cloned());
                Ok(Value::list(joined))
            }
            _ => arithmetic(operator, left, right, line),
        },

        BinaryOp::Multiply => match (left, right) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let count: usize = repeat_count(s.len(), *n, line)?;
                Ok(Value::Str(s.repeat(count)))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                let items = items.borrow();
                let count: usize = repeat_count(items.len(), *n, line)?;
                let repeated: Vec<Value> = std::iter::repeat(items.iter().cloned())
                    .take(count)
                    .flatten()
                    .collect();
                Ok(Value::list(repeated))
            }
            _ => arithmetic(operator, left, right, line),
        },

        BinaryOp::Subtract | BinaryOp::Divide | BinaryOp::Modulo | BinaryOp::Power => {
            arithmetic(operator, left, right, line)
        }

        // Short‑circuiting operators never reach here.
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

/// Repeat count for `len`-sized strings and lists; non-positive counts give
/// an empty result, and results past [`MAX_REPEAT_LEN`] are refused.
fn repeat_count(len: usize, n: i64, line: usize) -> Result<usize> {
    let count: usize = usize::try_from(n).unwrap_or(0);

    match len.checked_mul(count) {
        Some(0) => Ok(0),
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(ShravError::Overflow(format!(
            "Repetition of {} items by {} is too large [line {}]",
            len, n, line
        ))),
    }
}

fn arithmetic(operator: BinaryOp, left: &Value, right: &Value, line: usize) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return integer_arithmetic(operator, *a, *b, line);
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => float_arithmetic(operator, a, b, line),
        _ => Err(ShravError::type_error(
            line,
            format!(
                "Unsupported operand types for {}: {} and {}",
                operator.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

/// Integer operations stay integral until they overflow, then fall back to
/// float.  `/` is always real division.
fn integer_arithmetic(operator: BinaryOp, a: i64, b: i64, line: usize) -> Result<Value> {
    let checked: Option<i64> = match operator {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Modulo => {
            if b == 0 {
                return Err(zero_division("Modulo by zero", line));
            }
            // i64::MIN % -1 overflows but is mathematically 0
            let r: i64 = a.checked_rem(b).unwrap_or(0);
            Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        BinaryOp::Power if b >= 0 => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
        _ => None,
    };

    match checked {
        Some(n) => Ok(Value::Int(n)),
        None => float_arithmetic(operator, a as f64, b as f64, line),
    }
}

fn float_arithmetic(operator: BinaryOp, a: f64, b: f64, line: usize) -> Result<Value> {
    let n: f64 = match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => {
            if b == 0.0 {
                return Err(zero_division("Division by zero", line));
            }
            a / b
        }
        BinaryOp::Modulo => {
            if b == 0.0 {
                return Err(zero_division("Modulo by zero", line));
            }
            let r: f64 = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Power => a.powf(b),
        other => {
            return Err(ShravError::type_error(
                line,
                format!("'{}' is not an arithmetic operator", other.symbol()),
            ))
        }
    };

    Ok(Value::Float(n))
}

fn zero_division(message: &str, line: usize) -> ShravError {
    ShravError::ZeroDivision(format!("{} [line {}]", message, line))
}

/// Natural ordering of two values; `None` for unordered floats (NaN).
fn compare(left: &Value, right: &Value, line: usize) -> Result<Option<Ordering>> {
    compare_nested(left, right, line, &mut Vec::new())
}

/// A list pair met again while comparing itself orders as equal.
fn compare_nested(
    left: &Value,
    right: &Value,
    line: usize,
    visiting: &mut VisitingPairs,
) -> Result<Option<Ordering>> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),

        (Value::List(a), Value::List(b)) => {
            let pair = (container_id(a), container_id(b));
            if Rc::ptr_eq(a, b) || visiting.contains(&pair) {
                return Ok(Some(Ordering::Equal));
            }

            visiting.push(pair);
            let (a, b) = (a.borrow(), b.borrow());
            let mut ordering: Option<Ordering> = Some(a.len().cmp(&b.len()));

            for (x, y) in a.iter().zip(b.iter()) {
                match ensure_sufficient_stack(|| compare_nested(x, y, line, visiting)) {
                    Ok(Some(Ordering::Equal)) => {}
                    Ok(other) => {
                        ordering = other;
                        break;
                    }
                    Err(err) => {
                        visiting.pop();
                        return Err(err);
                    }
                }
            }

            visiting.pop();
            Ok(ordering)
        }

        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(ShravError::type_error(
                line,
                format!(
                    "Cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ),
            )),
        },
    }
}

// ───────────────────────────── indexing ───────────────────────────────────

/// Position for `index` in a sequence of `len`; negative counts from the end.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len: i64 = i64::try_from(len).ok()?;
    let position: i64 = if index < 0 { len + index } else { index };
    (0..len).contains(&position).then_some(position as usize)
}

fn integer_index(index: &Value, what: &str, line: usize) -> Result<i64> {
    match index {
        Value::Int(n) => Ok(*n),
        other => Err(ShravError::type_error(
            line,
            format!("{} index must be an integer, got {}", what, other.type_name()),
        )),
    }
}

fn string_key(index: &Value, line: usize) -> Result<&str> {
    match index {
        Value::Str(key) => Ok(key.as_str()),
        other => Err(ShravError::type_error(
            line,
            format!("Dict key must be a string, got {}", other.type_name()),
        )),
    }
}

fn out_of_range(what: &str, index: i64, line: usize) -> ShravError {
    ShravError::Index(format!("{} index {} out of range [line {}]", what, index, line))
}

fn get_index(object: &Value, index: &Value, line: usize) -> Result<Value> {
    match object {
        Value::List(items) => {
            let i: i64 = integer_index(index, "List", line)?;
            let items = items.borrow();
            normalize_index(i, items.len())
                .map(|position| items[position].clone())
                .ok_or_else(|| out_of_range("List", i, line))
        }

        Value::Str(s) => {
            let i: i64 = integer_index(index, "String", line)?;
            normalize_index(i, s.chars().count())
                .and_then(|position| s.chars().nth(position))
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| out_of_range("String", i, line))
        }

        Value::Dict(dict) => {
            let key: &str = string_key(index, line)?;
            dict.borrow().get(key).cloned().ok_or_else(|| {
                ShravError::Index(format!("Key '{}' not found [line {}]", key, line))
            })
        }

        other => Err(ShravError::type_error(
            line,
            format!("Cannot index into {}", other.type_name()),
        )),
    }
}

fn set_index(object: &Value, index: &Value, value: Value, line: usize) -> Result<()> {
    match object {
        Value::List(items) => {
            let i: i64 = integer_index(index, "List", line)?;
            let mut items = items.borrow_mut();
            let position: usize =
                normalize_index(i, items.len()).ok_or_else(|| out_of_range("List", i, line))?;
            items[position] = value;
            Ok(())
        }

        Value::Dict(dict) => {
            let key: &str = string_key(index, line)?;
            dict.borrow_mut().insert(key.to_owned(), value);
            Ok(())
        }

        Value::Str(_) => Err(ShravError::type_error(line, "Strings are immutable")),

        other => Err(ShravError::type_error(
            line,
            format!("Cannot assign into {}", other.type_name()),
        )),
    }
}

fn set_property(object: &Value, name: &str, value: Value, line: usize) -> Result<()> {
    match object {
        Value::Instance(instance) => {
            instance.borrow_mut().fields.insert(name.to_owned(), value);
            Ok(())
        }
        other => Err(ShravError::Attribute(format!(
            "Cannot set property '{}' on {} [line {}]",
            name,
            other.type_name(),
            line
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_follows_divisor_sign() {
        let rem = |a, b| integer_arithmetic(BinaryOp::Modulo, a, b, 1).unwrap();
        assert_eq!(rem(-7, 3), Value::Int(2));
        assert_eq!(rem(7, -3), Value::Int(-2));
        assert_eq!(rem(7, 3), Value::Int(1));
        assert_eq!(rem(i64::MIN, -1), Value::Int(0));
    }

    #[test]
    fn integer_overflow_falls_back_to_float() {
        let sum = integer_arithmetic(BinaryOp::Add, i64::MAX, 1, 1).unwrap();
        assert!(matches!(sum, Value::Float(_)));

        let power = integer_arithmetic(BinaryOp::Power, 2, 10, 1).unwrap();
        assert_eq!(power, Value::Int(1024));
        assert!(matches!(
            integer_arithmetic(BinaryOp::Power, 2, -1, 1).unwrap(),
            Value::Float(n) if n == 0.5
        ));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }
}
