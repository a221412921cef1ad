//! The builtin seed installed in the root environment. Every builtin
//! carries a declared signature, so argument checking and partial
//! application behave exactly as they do for user functions.

use std::cell::RefCell;
use std::rc::Rc;

use super::env::{Env, EnvInner};
use super::value::{object_get, object_set, BuiltinVal, NativeDef, Value, ValueKind};
use super::Interpreter;
use crate::ast::Prim;
use crate::errors::{ErrorKind, MsError};
use crate::fmt::display_value;
use crate::oracle;
use crate::syntax::Span;
use crate::types::{conforms, subtype, type_of, Ty, TyKind};

fn any() -> Rc<Ty> {
    Ty::prim(Prim::Any)
}

fn null_ty() -> Rc<Ty> {
    Ty::prim(Prim::Null)
}

fn int_ty() -> Rc<Ty> {
    Ty::prim(Prim::Int)
}

fn num_ty() -> Rc<Ty> {
    Ty::prim(Prim::Num)
}

fn str_ty() -> Rc<Ty> {
    Ty::prim(Prim::Str)
}

fn bool_ty() -> Rc<Ty> {
    Ty::prim(Prim::Bool)
}

fn type_ty() -> Rc<Ty> {
    Ty::prim(Prim::Type)
}

fn array_ty() -> Rc<Ty> {
    Ty::new(TyKind::Array(any()))
}

fn object_ty() -> Rc<Ty> {
    Ty::new(TyKind::Object(Vec::new()))
}

fn optional(inner: Rc<Ty>) -> Rc<Ty> {
    Ty::new(TyKind::Option(inner))
}

fn value_error(message: impl Into<String>, span: Span) -> MsError {
    MsError::new(ErrorKind::Value, message, Some(span))
}

fn native(
    env: &Env,
    name: &str,
    params: Vec<Rc<Ty>>,
    ret: Rc<Ty>,
    note: &str,
    func: impl Fn(&mut Interpreter, &[Value], &Env, Span) -> Result<Value, MsError> + 'static,
) {
    let def = NativeDef {
        name: name.to_string(),
        params,
        ret,
        func: Rc::new(func),
    };
    let value = Value {
        kind: ValueKind::Builtin(Rc::new(BuiltinVal {
            def: Rc::new(def),
            applied: Vec::new(),
        })),
        note: Some(Rc::from(note)),
    };
    env.borrow_mut().define(name, value);
}

fn as_f64(value: &Value) -> Option<f64> {
    match value.kind {
        ValueKind::Int(n) => Some(n as f64),
        ValueKind::Num(n) => Some(n),
        _ => None,
    }
}

/// Python-style slice bounds: negatives count from the end, out-of-range
/// clamps.
fn slice_bounds(len: usize, start: i64, end: i64) -> (usize, usize) {
    let len = len as i64;
    let norm = |i: i64| -> usize {
        let i = if i < 0 { i + len } else { i };
        i.clamp(0, len) as usize
    };
    let s = norm(start);
    let e = norm(end);
    (s, e.max(s))
}

pub fn install(interpreter: &mut Interpreter) {
    let env = interpreter.globals.clone();

    // ── core ─────────────────────────────────────────────────────────

    native(&env, "print", vec![any()], any(), "Prints a value.", |_, args, _, _| {
        match &args[0].kind {
            ValueKind::Str(s) => print!("{s}"),
            _ => print!("{}", display_value(&args[0])),
        }
        Ok(args[0].clone())
    });

    native(
        &env,
        "println",
        vec![any()],
        any(),
        "Prints a value followed by a newline.",
        |_, args, _, _| {
            match &args[0].kind {
                ValueKind::Str(s) => println!("{s}"),
                _ => println!("{}", display_value(&args[0])),
            }
            Ok(args[0].clone())
        },
    );

    native(
        &env,
        "str",
        vec![any()],
        str_ty(),
        "Converts a value into a string.",
        |_, args, _, _| Ok(Value::str(display_value(&args[0]))),
    );

    native(
        &env,
        "bool",
        vec![any()],
        optional(bool_ty()),
        "Converts a value into a boolean.",
        |_, args, _, _| {
            let out = match &args[0].kind {
                ValueKind::Null => false,
                ValueKind::Bool(b) => *b,
                ValueKind::Int(n) => *n != 0,
                ValueKind::Num(n) => *n != 0.0,
                ValueKind::Str(s) => !s.is_empty(),
                ValueKind::Array(items) => !items.borrow().is_empty(),
                ValueKind::Object(items) => !items.borrow().is_empty(),
                _ => return Ok(Value::null()),
            };
            Ok(Value::bool(out))
        },
    );

    native(
        &env,
        "int",
        vec![any()],
        optional(int_ty()),
        "Converts a value into an integer.",
        |_, args, _, _| {
            let out = match &args[0].kind {
                ValueKind::Bool(b) => Some(*b as i64),
                ValueKind::Int(n) => Some(*n),
                ValueKind::Num(n) => Some(*n as i64),
                ValueKind::Str(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            Ok(out.map(Value::int).unwrap_or_else(Value::null))
        },
    );

    native(
        &env,
        "num",
        vec![any()],
        optional(num_ty()),
        "Converts a value into a number.",
        |_, args, _, _| {
            let out = match &args[0].kind {
                ValueKind::Bool(b) => Some(*b as i64 as f64),
                ValueKind::Int(n) => Some(*n as f64),
                ValueKind::Num(n) => Some(*n),
                ValueKind::Str(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            Ok(out.map(Value::num).unwrap_or_else(Value::null))
        },
    );

    native(
        &env,
        "assert",
        vec![any()],
        null_ty(),
        "Raises unless the condition holds.",
        |_, args, _, span| {
            if args[0].is_truthy() {
                Ok(Value::null())
            } else {
                Err(value_error("assertion failed", span))
            }
        },
    );

    native(
        &env,
        "error",
        vec![optional(str_ty())],
        null_ty(),
        "Raises a runtime error.",
        |_, args, _, span| {
            let message = match &args[0].kind {
                ValueKind::Str(s) => s.to_string(),
                _ => String::new(),
            };
            Err(value_error(message, span))
        },
    );

    native(
        &env,
        "typeOf",
        vec![any()],
        type_ty(),
        "Returns the type of the value.",
        |_, args, _, _| Ok(type_of(&args[0]).into_value()),
    );

    native(
        &env,
        "isType",
        vec![any(), type_ty()],
        bool_ty(),
        "Checks whether a value conforms to a given type.",
        |_, args, _, span| {
            let target = match &args[1].kind {
                ValueKind::Type(tv) => tv.clone(),
                _ => return Err(value_error("expected a type", span)),
            };
            let ok = conforms(&args[0], &target).map_err(|mut e| {
                e.span = e.span.or(Some(span));
                e
            })?;
            Ok(Value::bool(ok))
        },
    );

    native(
        &env,
        "isSubtype",
        vec![type_ty(), type_ty()],
        bool_ty(),
        "Checks whether a type is a subtype of another type.",
        |_, args, _, span| {
            let (sub, sup) = match (&args[0].kind, &args[1].kind) {
                (ValueKind::Type(a), ValueKind::Type(b)) => (a.clone(), b.clone()),
                _ => return Err(value_error("expected two types", span)),
            };
            let ok = subtype(&sub, &sup).map_err(|mut e| {
                e.span = e.span.or(Some(span));
                e
            })?;
            Ok(Value::bool(ok))
        },
    );

    native(
        &env,
        "schema",
        vec![type_ty()],
        str_ty(),
        "Returns the JSON schema of a type.",
        |_, args, _, span| {
            let target = match &args[0].kind {
                ValueKind::Type(tv) => tv.clone(),
                _ => return Err(value_error("expected a type", span)),
            };
            let schema = oracle::schema_of(&target.term, &target.env, span)?;
            let text = serde_json::to_string_pretty(&schema)
                .map_err(|e| value_error(format!("cannot render schema: {e}"), span))?;
            Ok(Value::str(text))
        },
    );

    native(
        &env,
        "getEnv",
        vec![null_ty()],
        object_ty(),
        "Returns the current environment.",
        |_, _, env, _| Ok(Value::object(EnvInner::flatten(env, None))),
    );

    native(
        &env,
        "size",
        vec![any()],
        optional(int_ty()),
        "Returns the size of a collection or a string.",
        |_, args, _, _| {
            let out = match &args[0].kind {
                ValueKind::Str(s) => Some(s.chars().count() as i64),
                ValueKind::Array(items) => Some(items.borrow().len() as i64),
                ValueKind::Object(items) => Some(items.borrow().len() as i64),
                _ => None,
            };
            Ok(out.map(Value::int).unwrap_or_else(Value::null))
        },
    );

    native(
        &env,
        "clone",
        vec![any()],
        any(),
        "Makes a deep clone of a value.",
        |_, args, _, _| {
            let mut memo = Vec::new();
            Ok(deep_clone(&args[0], &mut memo))
        },
    );

    native(
        &env,
        "setNote",
        vec![any(), optional(str_ty())],
        any(),
        "Annotates a value.",
        |_, args, _, _| {
            let mut out = args[0].clone();
            out.note = match &args[1].kind {
                ValueKind::Str(s) => Some(s.clone()),
                _ => None,
            };
            Ok(out)
        },
    );

    native(
        &env,
        "getNote",
        vec![any()],
        optional(str_ty()),
        "Gets a value's annotation.",
        |_, args, _, _| {
            Ok(args[0]
                .note
                .clone()
                .map(|note| Value::plain(ValueKind::Str(note)))
                .unwrap_or_else(Value::null))
        },
    );

    native(
        &env,
        "import",
        vec![str_ty()],
        object_ty(),
        "Imports a file at a given path as a module.",
        |interpreter, args, _, span| {
            let path = match &args[0].kind {
                ValueKind::Str(s) => s.to_string(),
                _ => unreachable!("argument is checked against Str"),
            };
            let source = std::fs::read_to_string(&path)
                .map_err(|_| value_error(format!("file not found: {path}"), span))?;
            interpreter.eval_module(&source, &path)
        },
    );

    native(
        &env,
        "netImport",
        vec![str_ty()],
        object_ty(),
        "Imports a module from a URL.",
        |interpreter, args, _, span| {
            let url = match &args[0].kind {
                ValueKind::Str(s) => s.to_string(),
                _ => unreachable!("argument is checked against Str"),
            };
            let source = ureq::get(&url)
                .call()
                .map_err(|e| value_error(format!("cannot fetch {url}: {e}"), span))?
                .into_string()
                .map_err(|e| value_error(format!("cannot read {url}: {e}"), span))?;
            interpreter.eval_module(&source, &url)
        },
    );

    native(
        &env,
        "codeImport",
        vec![str_ty(), str_ty()],
        object_ty(),
        "Evaluates code as a module.",
        |interpreter, args, _, _| {
            let (code, name) = match (&args[0].kind, &args[1].kind) {
                (ValueKind::Str(code), ValueKind::Str(name)) => {
                    (code.to_string(), name.to_string())
                }
                _ => unreachable!("arguments are checked against Str"),
            };
            interpreter.eval_module(&code, &name)
        },
    );

    native(
        &env,
        "exit",
        vec![null_ty()],
        null_ty(),
        "Exits the program.",
        |_, _, _, _| std::process::exit(0),
    );

    // ── collections ──────────────────────────────────────────────────

    native(
        &env,
        "iter",
        vec![any()],
        any(),
        "Creates an iterator function from the value.",
        |_, args, _, _| Ok(make_iterator(&args[0])),
    );

    native(
        &env,
        "push",
        vec![array_ty(), any()],
        array_ty(),
        "Adds a value to the end of an array.",
        |_, args, _, _| {
            if let ValueKind::Array(items) = &args[0].kind {
                items.borrow_mut().push(args[1].clone());
            }
            Ok(args[0].clone())
        },
    );

    native(
        &env,
        "pop",
        vec![array_ty()],
        any(),
        "Pops the last value from the array.",
        |_, args, _, _| {
            if let ValueKind::Array(items) = &args[0].kind {
                if let Some(value) = items.borrow_mut().pop() {
                    return Ok(value);
                }
            }
            Ok(Value::null().with_note("can't pop a value from an empty array"))
        },
    );

    native(
        &env,
        "shift",
        vec![array_ty(), any()],
        array_ty(),
        "Inserts a value at the front of an array.",
        |_, args, _, _| {
            if let ValueKind::Array(items) = &args[0].kind {
                items.borrow_mut().insert(0, args[1].clone());
            }
            Ok(args[0].clone())
        },
    );

    native(
        &env,
        "unshift",
        vec![array_ty()],
        any(),
        "Pops the first value from the array.",
        |_, args, _, _| {
            if let ValueKind::Array(items) = &args[0].kind {
                let mut items = items.borrow_mut();
                if !items.is_empty() {
                    return Ok(items.remove(0));
                }
            }
            Ok(Value::null().with_note("can't unshift a value from an empty array"))
        },
    );

    native(
        &env,
        "slice",
        vec![array_ty(), int_ty(), int_ty()],
        array_ty(),
        "Slices an array between two indexes.",
        |_, args, _, _| {
            if let (ValueKind::Array(items), ValueKind::Int(s), ValueKind::Int(e)) =
                (&args[0].kind, &args[1].kind, &args[2].kind)
            {
                let items = items.borrow();
                let (s, e) = slice_bounds(items.len(), *s, *e);
                return Ok(Value::array(items[s..e].to_vec()));
            }
            Ok(Value::array(Vec::new()))
        },
    );

    native(
        &env,
        "delete",
        vec![object_ty(), str_ty()],
        optional(object_ty()),
        "Deletes a property from an object.",
        |_, args, _, _| {
            let (items, prop) = match (&args[0].kind, &args[1].kind) {
                (ValueKind::Object(items), ValueKind::Str(prop)) => (items, prop),
                _ => unreachable!("arguments are checked against {{}} and Str"),
            };
            let at = items.borrow().iter().position(|(k, _)| k.as_str() == &**prop);
            match at {
                Some(at) => {
                    items.borrow_mut().remove(at);
                    Ok(args[0].clone())
                }
                None => {
                    Ok(Value::null()
                        .with_note(format!("the property '{prop}' does not exist")))
                }
            }
        },
    );

    native(
        &env,
        "keys",
        vec![object_ty()],
        Ty::new(TyKind::Arrow(null_ty(), optional(str_ty()))),
        "Returns an iterator over an object's keys.",
        |_, args, _, _| {
            let keys: Vec<Value> = match &args[0].kind {
                ValueKind::Object(items) => items
                    .borrow()
                    .iter()
                    .map(|(k, _)| Value::str(k.as_str()))
                    .collect(),
                _ => unreachable!("argument is checked against {{}}"),
            };
            let index = Rc::new(RefCell::new(0usize));
            Ok(iterator_value(
                "object key iterator",
                optional(str_ty()),
                move |_, _, _, _| {
                    let at = *index.borrow();
                    if at < keys.len() {
                        *index.borrow_mut() += 1;
                        Ok(keys[at].clone())
                    } else {
                        Ok(Value::null())
                    }
                },
            ))
        },
    );

    native(
        &env,
        "values",
        vec![object_ty()],
        Ty::new(TyKind::Arrow(null_ty(), any())),
        "Returns an iterator over an object's values.",
        |_, args, _, _| {
            let values: Vec<Value> = match &args[0].kind {
                ValueKind::Object(items) => {
                    items.borrow().iter().map(|(_, v)| v.clone()).collect()
                }
                _ => unreachable!("argument is checked against {{}}"),
            };
            let index = Rc::new(RefCell::new(0usize));
            Ok(iterator_value(
                "object value iterator",
                any(),
                move |_, _, _, _| {
                    let at = *index.borrow();
                    if at < values.len() {
                        *index.borrow_mut() += 1;
                        Ok(values[at].clone())
                    } else {
                        Ok(Value::null())
                    }
                },
            ))
        },
    );

    native(
        &env,
        "exists",
        vec![object_ty(), str_ty()],
        bool_ty(),
        "Checks whether a key exists.",
        |_, args, _, _| match (&args[0].kind, &args[1].kind) {
            (ValueKind::Object(items), ValueKind::Str(key)) => Ok(Value::bool(
                items.borrow().iter().any(|(k, _)| k.as_str() == &**key),
            )),
            _ => unreachable!("arguments are checked against {{}} and Str"),
        },
    );

    native(
        &env,
        "get",
        vec![object_ty(), str_ty()],
        any(),
        "Returns a property.",
        |_, args, _, _| match (&args[0].kind, &args[1].kind) {
            (ValueKind::Object(items), ValueKind::Str(key)) => {
                Ok(object_get(items, key).unwrap_or_else(|| {
                    Value::null().with_note(format!("the property '{key}' does not exist"))
                }))
            }
            _ => unreachable!("arguments are checked against {{}} and Str"),
        },
    );

    native(
        &env,
        "set",
        vec![object_ty(), str_ty(), any()],
        any(),
        "Sets a property to a given value.",
        |_, args, _, _| match (&args[0].kind, &args[1].kind) {
            (ValueKind::Object(items), ValueKind::Str(key)) => {
                object_set(items, key, args[2].clone());
                Ok(args[2].clone())
            }
            _ => unreachable!("arguments are checked against {{}} and Str"),
        },
    );

    // ── strings ──────────────────────────────────────────────────────

    native(
        &env,
        "substr",
        vec![str_ty(), int_ty(), int_ty()],
        str_ty(),
        "Extracts a substring between two indexes.",
        |_, args, _, _| {
            if let (ValueKind::Str(s), ValueKind::Int(a), ValueKind::Int(b)) =
                (&args[0].kind, &args[1].kind, &args[2].kind)
            {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = slice_bounds(chars.len(), *a, *b);
                let out: String = chars[start..end].iter().collect();
                return Ok(Value::str(out));
            }
            Ok(Value::str(""))
        },
    );

    native(
        &env,
        "toLower",
        vec![str_ty()],
        str_ty(),
        "Converts a string to lower case.",
        |_, args, _, _| match &args[0].kind {
            ValueKind::Str(s) => Ok(Value::str(s.to_lowercase())),
            _ => Ok(args[0].clone()),
        },
    );

    native(
        &env,
        "toUpper",
        vec![str_ty()],
        str_ty(),
        "Converts a string to upper case.",
        |_, args, _, _| match &args[0].kind {
            ValueKind::Str(s) => Ok(Value::str(s.to_uppercase())),
            _ => Ok(args[0].clone()),
        },
    );

    native(
        &env,
        "strip",
        vec![str_ty()],
        str_ty(),
        "Removes surrounding whitespace.",
        |_, args, _, _| match &args[0].kind {
            ValueKind::Str(s) => Ok(Value::str(s.trim())),
            _ => Ok(args[0].clone()),
        },
    );

    native(
        &env,
        "split",
        vec![str_ty(), str_ty()],
        Ty::new(TyKind::Array(str_ty())),
        "Splits a string on a separator.",
        |_, args, _, span| {
            if let (ValueKind::Str(s), ValueKind::Str(sep)) = (&args[0].kind, &args[1].kind) {
                if sep.is_empty() {
                    return Err(value_error("empty separator", span));
                }
                let parts = s.split(&**sep).map(Value::str).collect();
                return Ok(Value::array(parts));
            }
            Ok(Value::array(Vec::new()))
        },
    );

    native(
        &env,
        "join",
        vec![Ty::new(TyKind::Array(str_ty())), str_ty()],
        str_ty(),
        "Joins an array of strings with a separator.",
        |_, args, _, _| {
            if let (ValueKind::Array(items), ValueKind::Str(sep)) =
                (&args[0].kind, &args[1].kind)
            {
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| match &item.kind {
                        ValueKind::Str(s) => s.to_string(),
                        _ => display_value(item),
                    })
                    .collect();
                return Ok(Value::str(parts.join(sep)));
            }
            Ok(Value::str(""))
        },
    );

    native(
        &env,
        "replace",
        vec![str_ty(), str_ty(), str_ty()],
        str_ty(),
        "Replaces every occurrence of a pattern.",
        |_, args, _, _| {
            if let (ValueKind::Str(s), ValueKind::Str(from), ValueKind::Str(to)) =
                (&args[0].kind, &args[1].kind, &args[2].kind)
            {
                return Ok(Value::str(s.replace(&**from, to)));
            }
            Ok(args[0].clone())
        },
    );

    // ── math ─────────────────────────────────────────────────────────

    env.borrow_mut()
        .define("PI", Value::num(std::f64::consts::PI));
    env.borrow_mut().define("E", Value::num(std::f64::consts::E));

    let unary_math: [(&str, fn(f64) -> f64); 6] = [
        ("sqrt", f64::sqrt),
        ("log", f64::ln),
        ("exp", f64::exp),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
    ];
    for (name, op) in unary_math {
        native(
            &env,
            name,
            vec![num_ty()],
            num_ty(),
            "A numeric function.",
            move |_, args, _, _| {
                let x = as_f64(&args[0]).unwrap_or(f64::NAN);
                Ok(Value::num(op(x)))
            },
        );
    }

    native(
        &env,
        "pow",
        vec![num_ty(), num_ty()],
        num_ty(),
        "Raises a number to a power.",
        |_, args, _, _| {
            let a = as_f64(&args[0]).unwrap_or(f64::NAN);
            let b = as_f64(&args[1]).unwrap_or(f64::NAN);
            Ok(Value::num(a.powf(b)))
        },
    );

    native(
        &env,
        "abs",
        vec![num_ty()],
        num_ty(),
        "The absolute value of a number.",
        |_, args, _, _| match args[0].kind {
            ValueKind::Int(n) => Ok(Value::int(n.wrapping_abs())),
            ValueKind::Num(n) => Ok(Value::num(n.abs())),
            _ => Ok(Value::num(f64::NAN)),
        },
    );

    native(
        &env,
        "min",
        vec![num_ty(), num_ty()],
        num_ty(),
        "The smaller of two numbers.",
        |_, args, _, _| {
            let a = as_f64(&args[0]).unwrap_or(f64::NAN);
            let b = as_f64(&args[1]).unwrap_or(f64::NAN);
            Ok(if a <= b { args[0].clone() } else { args[1].clone() })
        },
    );

    native(
        &env,
        "max",
        vec![num_ty(), num_ty()],
        num_ty(),
        "The larger of two numbers.",
        |_, args, _, _| {
            let a = as_f64(&args[0]).unwrap_or(f64::NAN);
            let b = as_f64(&args[1]).unwrap_or(f64::NAN);
            Ok(if a >= b { args[0].clone() } else { args[1].clone() })
        },
    );
}

/// Build the iterator for `iter`: arrays yield their elements, objects
/// yield `[key, value]` pairs in insertion order, callables pass through,
/// anything else yields null.
fn make_iterator(value: &Value) -> Value {
    match &value.kind {
        ValueKind::Array(items) => {
            let items = items.clone();
            let index = Rc::new(RefCell::new(0usize));
            iterator_value("array iterator", any(), move |_, _, _, _| {
                let at = *index.borrow();
                let items = items.borrow();
                if at < items.len() {
                    *index.borrow_mut() += 1;
                    Ok(items[at].clone())
                } else {
                    Ok(Value::null())
                }
            })
        }
        ValueKind::Object(items) => {
            let pairs: Vec<Value> = items
                .borrow()
                .iter()
                .map(|(key, sub)| Value::array(vec![Value::str(key.as_str()), sub.clone()]))
                .collect();
            let index = Rc::new(RefCell::new(0usize));
            iterator_value("object iterator", any(), move |_, _, _, _| {
                let at = *index.borrow();
                if at < pairs.len() {
                    *index.borrow_mut() += 1;
                    Ok(pairs[at].clone())
                } else {
                    Ok(Value::null())
                }
            })
        }
        _ if value.is_callable() => value.clone(),
        _ => Value::null(),
    }
}

fn iterator_value(
    note: &str,
    ret: Rc<Ty>,
    func: impl Fn(&mut Interpreter, &[Value], &Env, Span) -> Result<Value, MsError> + 'static,
) -> Value {
    let def = NativeDef {
        name: "next".to_string(),
        params: vec![null_ty()],
        ret,
        func: Rc::new(func),
    };
    Value {
        kind: ValueKind::Builtin(Rc::new(BuiltinVal {
            def: Rc::new(def),
            applied: Vec::new(),
        })),
        note: Some(Rc::from(note)),
    }
}

/// Deep copy; shared and cyclic structure is preserved through the memo.
fn deep_clone(value: &Value, memo: &mut Vec<(usize, Value)>) -> Value {
    match &value.kind {
        ValueKind::Array(items) => {
            let id = Rc::as_ptr(items) as usize;
            if let Some((_, copy)) = memo.iter().find(|(k, _)| *k == id) {
                return copy.clone();
            }
            let copy = Value {
                kind: ValueKind::Array(Rc::new(RefCell::new(Vec::new()))),
                note: value.note.clone(),
            };
            memo.push((id, copy.clone()));
            let cloned: Vec<Value> = items
                .borrow()
                .iter()
                .map(|item| deep_clone(item, memo))
                .collect();
            if let ValueKind::Array(target) = &copy.kind {
                *target.borrow_mut() = cloned;
            }
            copy
        }
        ValueKind::Object(items) => {
            let id = Rc::as_ptr(items) as usize;
            if let Some((_, copy)) = memo.iter().find(|(k, _)| *k == id) {
                return copy.clone();
            }
            let copy = Value {
                kind: ValueKind::Object(Rc::new(RefCell::new(Vec::new()))),
                note: value.note.clone(),
            };
            memo.push((id, copy.clone()));
            let cloned: Vec<(String, Value)> = items
                .borrow()
                .iter()
                .map(|(key, item)| (key.clone(), deep_clone(item, memo)))
                .collect();
            if let ValueKind::Object(target) = &copy.kind {
                *target.borrow_mut() = cloned;
            }
            copy
        }
        _ => value.clone(),
    }
}
