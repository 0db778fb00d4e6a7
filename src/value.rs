//! Runtime values of the evaluator.
//!
//! Scalars are stored inline; lists and dicts are shared, mutable
//! containers (`Rc<RefCell<_>>`) so that aliasing behaves like in other
//! dynamic languages.  Callables keep their captured scope alive through
//! an [`EnvRef`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;

/// Containers on the path currently being walked, by address.
type Visiting = Vec<*const ()>;

/// Container pairs currently being compared, by address.
pub(crate) type VisitingPairs = Vec<(*const (), *const ())>;

/// Address identifying a shared container while walking nested values.
pub(crate) fn container_id<T>(container: &Rc<RefCell<T>>) -> *const () {
    Rc::as_ptr(container) as *const ()
}

/// Reserved name under which bound methods see their receiver.
pub const SELF_NAME: &str = "this";

/// Name of the method run when a class is called.
pub const INITIALIZER_NAME: &str = "init";

/// Host implementation behind a [`NativeFunction`].  Receives the calling
/// interpreter so natives such as `map` can call back into script code.
pub type NativeFn = dyn Fn(&mut Interpreter, &[Value]) -> Result<Value>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Function(Rc<Function>),
    NativeFunction(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
    Module(Rc<Module>),
    Object(Rc<dyn HostObject>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(dict: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn native<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&mut Interpreter, &[Value]) -> Result<Value> + 'static,
    {
        Value::NativeFunction(Rc::new(NativeFunction::new(name, arity, func)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            Value::Function(_)
            | Value::NativeFunction(_)
            | Value::Class(_)
            | Value::Instance(_)
            | Value::Module(_)
            | Value::Object(_) => true,
        }
    }

    /// Functions, natives and classes; modules are deliberately excluded.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::NativeFunction(_) | Value::Class(_)
        )
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "string".into(),
            Value::List(_) => "list".into(),
            Value::Dict(_) => "dict".into(),
            Value::Function(_) => "function".into(),
            Value::NativeFunction(_) => "native function".into(),
            Value::Class(_) => "class".into(),
            Value::Instance(instance) => instance.borrow().class.name.clone(),
            Value::Module(_) => "module".into(),
            Value::Object(object) => object.type_name().to_owned(),
        }
    }

    /// Numeric view used by arithmetic and comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl Value {
    /// Text of a value with `text` applied to every string inside it.  A list
    /// or dict met again while rendering itself prints as `[...]` / `{...}`.
    pub fn render(&self, text: &dyn Fn(&str) -> String) -> String {
        let mut out: String = String::new();
        self.render_into(&mut out, &mut Vec::new(), text);
        out
    }

    fn render_into(
        &self,
        out: &mut String,
        visiting: &mut Visiting,
        text: &dyn Fn(&str) -> String,
    ) {
        match self {
            Value::Str(s) => out.push_str(&text(s)),

            Value::List(items) => {
                let id: *const () = container_id(items);
                if visiting.contains(&id) {
                    out.push_str("[...]");
                    return;
                }

                visiting.push(id);
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    ensure_sufficient_stack(|| item.render_into(out, visiting, text));
                }
                out.push(']');
                visiting.pop();
            }

            Value::Dict(dict) => {
                let id: *const () = container_id(dict);
                if visiting.contains(&id) {
                    out.push_str("{...}");
                    return;
                }

                visiting.push(id);
                out.push('{');
                for (i, (key, value)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    ensure_sufficient_stack(|| value.render_into(out, visiting, text));
                }
                out.push('}');
                visiting.pop();
            }

            other => out.push_str(&other.to_string()),
        }
    }

    /// Equality that assumes a container pair already under comparison is
    /// equal, so self-referencing lists and dicts terminate.
    fn equals(&self, other: &Value, visiting: &mut VisitingPairs) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                let pair = (container_id(a), container_id(b));
                if Rc::ptr_eq(a, b) || visiting.contains(&pair) {
                    return true;
                }

                visiting.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal: bool = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| {
                        ensure_sufficient_stack(|| x.equals(y, visiting))
                    });
                visiting.pop();
                equal
            }

            (Value::Dict(a), Value::Dict(b)) => {
                let pair = (container_id(a), container_id(b));
                if Rc::ptr_eq(a, b) || visiting.contains(&pair) {
                    return true;
                }

                visiting.push(pair);
                let equal: bool = a.borrow().equals(&b.borrow(), visiting);
                visiting.pop();
                equal
            }

            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

/// Render a float the way the language prints numbers: integral values drop
/// the trailing `.0`.
pub fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Plain textual rendering: no `${…}` interpolation (that needs a scope,
/// see `Interpreter::stringify`).  Used by `+` concatenation and `str()`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Int(n) => f.write_str(itoa::Buffer::new().format(*n)),

            Value::Float(n) => f.write_str(&format_float(*n)),

            Value::Str(s) => f.write_str(s),

            Value::List(_) | Value::Dict(_) => f.write_str(&self.render(&|text| text.to_owned())),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::NativeFunction(native) => write!(f, "<native fn {}>", native.name),

            Value::Class(class) => f.write_str(&class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),

            Value::Module(module) => write!(f, "<module '{}'>", module.name),

            Value::Object(object) => f.write_str(&object.render()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(n) => write!(f, "Float({})", n),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Null => write!(f, "Null"),
            other => write!(f, "{}", other),
        }
    }
}

/// Structural equality: numbers compare across int/float, containers compare
/// element‑wise, and everything with identity compares by reference.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

// ───────────────────────────── containers ──────────────────────────────

/// Insertion‑ordered string‑keyed map backing dict values.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Overwrite in place, or append a new entry at the end.
    pub fn insert(&mut self, key: String, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl Dict {
    fn equals(&self, other: &Dict, visiting: &mut VisitingPairs) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .get(key)
                    .is_some_and(|v| ensure_sufficient_stack(|| value.equals(v, visiting)))
            })
    }
}

impl PartialEq for Dict {
    /// Same keys with equal values, regardless of insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl FromIterator<(String, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}

// ───────────────────────────── callables ───────────────────────────────

/// A function declared in script code together with the scope it closes over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,

    /// Set for a class's `init` method: calls always yield the receiver.
    pub is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure gains exactly one scope binding
    /// [`SELF_NAME`] to `receiver`.
    pub fn bind(&self, receiver: Value) -> Function {
        let scope: EnvRef = Environment::child_of(&self.closure);
        scope.borrow_mut().define(SELF_NAME, receiver);

        Function::new(Rc::clone(&self.declaration), scope, self.is_initializer)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}/{}>", self.name(), self.arity())
    }
}

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&mut Interpreter, &[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: name.to_owned(),
            arity,
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}/{}>", self.name, self.arity)
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn find_method(&self, name: &str) -> Option<&Rc<Function>> {
        self.methods.get(name)
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }
}

/// A named table of exported callables; immutable once built.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    functions: HashMap<String, Value>,
}

impl Module {
    pub fn new(name: &str, functions: HashMap<String, Value>) -> Self {
        Self {
            name: name.to_owned(),
            functions,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.functions.get(name)
    }

    /// Export names, sorted for stable diagnostics.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Host‑provided capability object (open files and similar).  Attribute
/// lookup is entirely up to the host; a `close` attribute that resolves to a
/// callable makes the object usable with `with`.
pub trait HostObject {
    fn type_name(&self) -> &str;

    /// Host‑defined attribute lookup; `None` means no such attribute.
    fn get_attr(self: Rc<Self>, name: &str) -> Option<Value>;

    fn render(&self) -> String {
        format!("<{}>", self.type_name())
    }
}
