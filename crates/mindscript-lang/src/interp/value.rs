use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::env::Env;
use super::Interpreter;
use crate::ast::Lambda;
use crate::errors::MsError;
use crate::syntax::Span;
use crate::types::{subtype, Ty, TypeVal};

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<Vec<(String, Value)>>>;

/// A user function: the lowered unary lambda, its captured frame, and its
/// declared types evaluated at creation time.
pub struct Closure {
    pub def: Rc<Lambda>,
    pub env: Env,
    pub param_ty: Rc<Ty>,
    pub ret_ty: Rc<Ty>,
}

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &[Value], &Env, Span) -> Result<Value, MsError>>;

/// A native function with a declared MindScript signature, so builtins
/// check argument types and curry exactly like user functions.
pub struct NativeDef {
    pub name: String,
    pub params: Vec<Rc<Ty>>,
    pub ret: Rc<Ty>,
    pub func: NativeFn,
}

/// A builtin value: definition plus the arguments collected so far.
pub struct BuiltinVal {
    pub def: Rc<NativeDef>,
    pub applied: Vec<Value>,
}

/// An oracle definition evaluated from its literal: declared types and
/// validated examples. The informal annotation lives on the value itself
/// and travels with partial applications.
pub struct OracleSig {
    pub params: Vec<(String, Rc<Ty>)>,
    pub ret: Rc<Ty>,
    /// Declared return type widened to nullable; a refusing backend may
    /// answer null.
    pub wide_ret: Rc<Ty>,
    pub examples: Vec<Value>,
    pub env: Env,
}

/// An oracle value: definition plus the arguments collected so far.
pub struct OracleVal {
    pub sig: Rc<OracleSig>,
    pub applied: Vec<Value>,
}

#[derive(Clone)]
pub enum ValueKind {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Closure>),
    Builtin(Rc<BuiltinVal>),
    Oracle(Rc<OracleVal>),
    Type(Rc<TypeVal>),
}

/// A runtime value together with its optional informal annotation. The
/// annotation travels with the value through rebinding and is ignored by
/// equality.
#[derive(Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub note: Option<Rc<str>>,
}

impl Value {
    pub fn plain(kind: ValueKind) -> Self {
        Self { kind, note: None }
    }

    pub fn null() -> Self {
        Self::plain(ValueKind::Null)
    }

    pub fn bool(b: bool) -> Self {
        Self::plain(ValueKind::Bool(b))
    }

    pub fn int(n: i64) -> Self {
        Self::plain(ValueKind::Int(n))
    }

    pub fn num(n: f64) -> Self {
        Self::plain(ValueKind::Num(n))
    }

    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::plain(ValueKind::Str(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self::plain(ValueKind::Array(Rc::new(RefCell::new(items))))
    }

    pub fn object(items: Vec<(String, Value)>) -> Self {
        Self::plain(ValueKind::Object(Rc::new(RefCell::new(items))))
    }

    pub fn with_note(mut self, note: impl Into<Rc<str>>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    /// Only `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self.kind, ValueKind::Null | ValueKind::Bool(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Function(_) | ValueKind::Builtin(_) | ValueKind::Oracle(_)
        )
    }

    /// The kind word used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Null => "null",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Int(_) => "integer",
            ValueKind::Num(_) => "number",
            ValueKind::Str(_) => "string",
            ValueKind::Array(_) => "array",
            ValueKind::Object(_) => "object",
            ValueKind::Function(_) => "function",
            ValueKind::Builtin(_) => "function",
            ValueKind::Oracle(_) => "oracle",
            ValueKind::Type(_) => "type",
        }
    }
}

/// Ordered-object lookup.
pub fn object_get(object: &ObjectRef, key: &str) -> Option<Value> {
    object
        .borrow()
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// Insert or replace, keeping the position of an existing key.
pub fn object_set(object: &ObjectRef, key: &str, value: Value) {
    let mut items = object.borrow_mut();
    match items.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => items.push((key.to_string(), value)),
    }
}

/// Deep structural equality. Numbers compare across Int/Num, objects by
/// key set, callables by identity, types by mutual subtyping. A visited
/// set makes cyclic arrays and objects terminate.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool, MsError> {
    let mut visited = Vec::new();
    equal_rec(a, b, &mut visited)
}

fn equal_rec(
    a: &Value,
    b: &Value,
    visited: &mut Vec<(usize, usize)>,
) -> Result<bool, MsError> {
    match (&a.kind, &b.kind) {
        (ValueKind::Null, ValueKind::Null) => Ok(true),
        (ValueKind::Bool(x), ValueKind::Bool(y)) => Ok(x == y),
        (ValueKind::Int(x), ValueKind::Int(y)) => Ok(x == y),
        (ValueKind::Num(x), ValueKind::Num(y)) => Ok(x == y),
        (ValueKind::Int(x), ValueKind::Num(y)) => Ok(*x as f64 == *y),
        (ValueKind::Num(x), ValueKind::Int(y)) => Ok(*x == *y as f64),
        (ValueKind::Str(x), ValueKind::Str(y)) => Ok(x == y),
        (ValueKind::Array(x), ValueKind::Array(y)) => {
            let pair = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if Rc::ptr_eq(x, y) || visited.contains(&pair) {
                return Ok(true);
            }
            visited.push(pair);
            let xs = x.borrow();
            let ys = y.borrow();
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (xv, yv) in xs.iter().zip(ys.iter()) {
                if !equal_rec(xv, yv, visited)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ValueKind::Object(x), ValueKind::Object(y)) => {
            let pair = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if Rc::ptr_eq(x, y) || visited.contains(&pair) {
                return Ok(true);
            }
            visited.push(pair);
            let xs = x.borrow();
            let ys = y.borrow();
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (key, xv) in xs.iter() {
                match ys.iter().find(|(k, _)| k == key) {
                    Some((_, yv)) => {
                        if !equal_rec(xv, yv, visited)? {
                            return Ok(false);
                        }
                    }
                    None => return Ok(false),
                }
            }
            Ok(true)
        }
        (ValueKind::Type(x), ValueKind::Type(y)) => {
            Ok(subtype(x, y)? && subtype(y, x)?)
        }
        (ValueKind::Function(x), ValueKind::Function(y)) => Ok(Rc::ptr_eq(x, y)),
        (ValueKind::Builtin(x), ValueKind::Builtin(y)) => Ok(Rc::ptr_eq(x, y)),
        (ValueKind::Oracle(x), ValueKind::Oracle(y)) => Ok(Rc::ptr_eq(x, y)),
        _ => Ok(false),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other).unwrap_or(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::fmt::display_value(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
