pub mod builtins;
pub mod env;
pub mod value;

pub use env::{Env, EnvInner};
pub use value::Value;

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, ExprKind, Prim, TypeExpr, TypeExprKind, UnaryOp};
use crate::errors::{ErrorKind, MsError};
use crate::fmt::{display_type, display_value};
use crate::oracle::{self, Backend};
use crate::parser;
use crate::syntax::Span;
use crate::types::{conforms, type_of, Field, Ty, TyKind, TypeVal};
use value::{object_get, object_set, values_equal, BuiltinVal, Closure, OracleSig, OracleVal, ValueKind};

/// Evaluation either yields a value or unwinds: through `return`, through
/// `break`/`continue` (caught by the enclosing function or loop), or with
/// an error that terminates the current top-level expression.
pub enum Flow {
    Return(Value),
    Break(Value, Span),
    Continue(Value, Span),
    Error(MsError),
}

impl From<MsError> for Flow {
    fn from(error: MsError) -> Self {
        Flow::Error(error)
    }
}

type IResult = Result<Value, Flow>;

fn err(kind: ErrorKind, message: impl Into<String>, span: Span) -> Flow {
    Flow::Error(MsError::new(kind, message, Some(span)))
}

pub struct Interpreter {
    pub globals: Env,
    pub backend: Rc<dyn Backend>,
}

impl Interpreter {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        let globals = EnvInner::root();
        let mut interpreter = Self { globals, backend };
        builtins::install(&mut interpreter);
        interpreter
    }

    /// Parse and evaluate a source text in the global environment.
    pub fn eval_source(&mut self, source: &str) -> Result<Value, MsError> {
        let program = parser::parse(source)?;
        let env = self.globals.clone();
        self.eval_program(&program, &env)
    }

    /// Evaluate a program, mapping stray unwinds to errors. A top-level
    /// `return` yields its value.
    pub fn eval_program(&mut self, program: &[Expr], env: &Env) -> Result<Value, MsError> {
        let mut value = Value::null();
        for expr in program {
            match self.eval(expr, env) {
                Ok(v) => value = v,
                Err(Flow::Return(v)) => return Ok(v),
                Err(Flow::Break(_, span)) | Err(Flow::Continue(_, span)) => {
                    return Err(MsError::new(
                        ErrorKind::Value,
                        "unexpected control flow expression outside a loop",
                        Some(span),
                    ))
                }
                Err(Flow::Error(e)) => return Err(e),
            }
        }
        Ok(value)
    }

    /// Evaluate a source text as a module: a fresh environment seeded
    /// from the globals, returned as an object of the module's bindings.
    pub fn eval_module(&mut self, source: &str, origin: &str) -> Result<Value, MsError> {
        let program = parser::parse(source)?;
        let module_env = EnvInner::with_parent(&self.globals);
        self.eval_program(&program, &module_env)?;
        let bindings = EnvInner::flatten(&module_env, Some(&self.globals));
        Ok(Value::object(bindings).with_note(format!("module \"{origin}\"")))
    }

    pub fn eval(&mut self, expr: &Expr, env: &Env) -> IResult {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Null => Ok(Value::null()),
            ExprKind::Bool(b) => Ok(Value::bool(*b)),
            ExprKind::Int(n) => Ok(Value::int(*n)),
            ExprKind::Num(n) => Ok(Value::num(*n)),
            ExprKind::Str(s) => Ok(Value::str(s.as_str())),

            ExprKind::Ident(name) => env.borrow().get(name).ok_or_else(|| {
                err(ErrorKind::Name, format!("undefined variable '{name}'"), span)
            }),

            ExprKind::Declare(name) => {
                env.borrow_mut().define(name.clone(), Value::null());
                Ok(Value::null())
            }

            ExprKind::Annotate { note, expr } => {
                let value = self.eval(expr, env)?;
                Ok(value.with_note(note.as_str()))
            }

            ExprKind::Assign { target, expr } => {
                let value = self.eval(expr, env)?;
                self.destructure(target, value.clone(), env, false)?;
                Ok(value)
            }

            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::array(values))
            }

            ExprKind::Object(items) => {
                let mut values: Vec<(String, Value)> = Vec::with_capacity(items.len());
                for (key, item) in items {
                    let value = self.eval(item, env)?;
                    match values.iter_mut().find(|(k, _)| k == key) {
                        Some(slot) => slot.1 = value,
                        None => values.push((key.clone(), value)),
                    }
                }
                Ok(Value::object(values))
            }

            ExprKind::Member { expr, name } => {
                let object = self.eval(expr, env)?;
                match &object.kind {
                    ValueKind::Object(items) => object_get(items, name).ok_or_else(|| {
                        err(ErrorKind::Value, format!("unknown property '{name}'"), span)
                    }),
                    _ => Err(err(
                        ErrorKind::Type,
                        format!("attempted to access a property on a {}", object.kind_name()),
                        span,
                    )),
                }
            }

            ExprKind::Index { expr, index } => {
                let target = self.eval(expr, env)?;
                let index = self.eval(index, env)?;
                match (&target.kind, &index.kind) {
                    (ValueKind::Array(items), ValueKind::Int(i)) => {
                        let items = items.borrow();
                        let len = items.len() as i64;
                        if len == 0 || i.unsigned_abs() >= len as u64 {
                            return Err(err(
                                ErrorKind::Value,
                                format!("array index {i} out of range"),
                                span,
                            ));
                        }
                        let at = i.rem_euclid(len) as usize;
                        Ok(items[at].clone())
                    }
                    (ValueKind::Array(_), _) => Err(err(
                        ErrorKind::Type,
                        "array index must be an integer",
                        span,
                    )),
                    _ => Err(err(
                        ErrorKind::Type,
                        format!("attempted to index a {}", target.kind_name()),
                        span,
                    )),
                }
            }

            ExprKind::Call { callee, args } => {
                // A member call passes its receiver as `this` for the
                // first application.
                let (function, receiver) = match &callee.kind {
                    ExprKind::Member { expr, name } => {
                        let object = self.eval(expr, env)?;
                        let method = match &object.kind {
                            ValueKind::Object(items) => {
                                object_get(items, name).ok_or_else(|| {
                                    err(
                                        ErrorKind::Value,
                                        format!("unknown property '{name}'"),
                                        callee.span,
                                    )
                                })?
                            }
                            _ => {
                                return Err(err(
                                    ErrorKind::Type,
                                    format!(
                                        "attempted to access a property on a {}",
                                        object.kind_name()
                                    ),
                                    callee.span,
                                ))
                            }
                        };
                        (method, Some(object))
                    }
                    _ => (self.eval(callee, env)?, None),
                };
                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.eval(arg, env)?);
                }
                let mut value = function;
                for (i, arg) in arguments.into_iter().enumerate() {
                    let this = if i == 0 { receiver.clone() } else { None };
                    value = self.apply(value, arg, this, env, span)?;
                }
                Ok(value)
            }

            ExprKind::Unary { op, expr } => {
                let value = self.eval(expr, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::bool(!value.is_truthy())),
                    UnaryOp::Neg => match value.kind {
                        ValueKind::Int(n) => Ok(Value::int(n.wrapping_neg())),
                        ValueKind::Num(n) => Ok(Value::num(-n)),
                        _ => Err(err(
                            ErrorKind::Type,
                            format!("expected a number, got a {}", value.kind_name()),
                            span,
                        )),
                    },
                }
            }

            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, env, span),

            ExprKind::Block(exprs) => {
                let frame = EnvInner::with_parent(env);
                self.eval_block(exprs, &frame)
            }

            ExprKind::If { arms, default } => {
                for (cond, body) in arms {
                    let guard = self.eval(cond, env)?;
                    if guard.is_truthy() {
                        return self.eval(body, env);
                    }
                }
                match default {
                    Some(body) => self.eval(body, env),
                    None => Ok(Value::null()),
                }
            }

            ExprKind::For {
                target,
                iterator,
                body,
            } => self.for_loop(target, iterator, body, env, span),

            ExprKind::Return(inner) => {
                let value = self.eval(inner, env)?;
                Err(Flow::Return(value))
            }
            ExprKind::Break(inner) => {
                let value = self.eval(inner, env)?;
                Err(Flow::Break(value, span))
            }
            ExprKind::Continue(inner) => {
                let value = self.eval(inner, env)?;
                Err(Flow::Continue(value, span))
            }

            ExprKind::Lambda(def) => {
                let param_ty = self.eval_type(&def.param_ty, env)?;
                let ret_ty = self.eval_type(&def.ret_ty, env)?;
                Ok(Value::plain(ValueKind::Function(Rc::new(Closure {
                    def: def.clone(),
                    env: env.clone(),
                    param_ty,
                    ret_ty,
                }))))
            }

            ExprKind::Oracle(def) => {
                let mut params = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    params.push((param.name.clone(), self.eval_type(&param.ty, env)?));
                }
                let ret = self.eval_type(&def.ret_ty, env)?;
                let wide_ret = match ret.kind {
                    TyKind::Option(_) | TyKind::Prim(Prim::Any) => ret.clone(),
                    _ => Ty::new(TyKind::Option(ret.clone())),
                };
                let examples = match &def.examples {
                    Some(expr) => {
                        let value = self.eval(expr, env)?;
                        self.validate_examples(&value, &params, &ret, env, expr.span)?
                    }
                    None => Vec::new(),
                };
                let sig = OracleSig {
                    params,
                    ret,
                    wide_ret,
                    examples,
                    env: env.clone(),
                };
                Ok(Value::plain(ValueKind::Oracle(Rc::new(OracleVal {
                    sig: Rc::new(sig),
                    applied: Vec::new(),
                }))))
            }

            ExprKind::TypeLit(texpr) => {
                let term = self.eval_type(texpr, env)?;
                Ok(TypeVal::new(term, Some(env.clone())).into_value())
            }
        }
    }

    fn eval_block(&mut self, exprs: &[Expr], env: &Env) -> IResult {
        let mut value = Value::null();
        for expr in exprs {
            value = self.eval(expr, env)?;
        }
        Ok(value)
    }

    // ── assignment and destructuring ─────────────────────────────────

    fn destructure(
        &mut self,
        target: &Expr,
        value: Value,
        env: &Env,
        define: bool,
    ) -> IResult {
        let span = target.span;
        match &target.kind {
            ExprKind::Ident(name) => {
                if define {
                    env.borrow_mut().define(name.clone(), value.clone());
                } else if !env.borrow_mut().assign(name, value.clone()) {
                    return Err(err(
                        ErrorKind::Name,
                        format!("assignment to undeclared variable '{name}'"),
                        span,
                    ));
                }
                Ok(value)
            }
            ExprKind::Declare(name) => {
                env.borrow_mut().define(name.clone(), value.clone());
                Ok(value)
            }
            ExprKind::Annotate { note, expr } => {
                let value = value.with_note(note.as_str());
                self.destructure(expr, value, env, define)
            }
            ExprKind::Member { expr, name } => {
                let object = self.eval(expr, env)?;
                match &object.kind {
                    ValueKind::Object(items) => {
                        object_set(items, name, value.clone());
                        Ok(value)
                    }
                    _ => Err(err(
                        ErrorKind::Type,
                        format!("attempted to set a property on a {}", object.kind_name()),
                        span,
                    )),
                }
            }
            ExprKind::Index { expr, index } => {
                let array = self.eval(expr, env)?;
                let index = self.eval(index, env)?;
                match (&array.kind, &index.kind) {
                    (ValueKind::Array(items), ValueKind::Int(i)) => {
                        let mut items = items.borrow_mut();
                        let len = items.len() as i64;
                        if len == 0 || i.unsigned_abs() >= len as u64 {
                            return Err(err(
                                ErrorKind::Value,
                                format!("array index {i} out of range"),
                                span,
                            ));
                        }
                        let at = i.rem_euclid(len) as usize;
                        items[at] = value.clone();
                        Ok(value)
                    }
                    (ValueKind::Array(_), _) => Err(err(
                        ErrorKind::Type,
                        "array index must be an integer",
                        span,
                    )),
                    _ => Err(err(
                        ErrorKind::Type,
                        format!("attempted to index a {}", array.kind_name()),
                        span,
                    )),
                }
            }
            ExprKind::Array(patterns) => {
                let items = match &value.kind {
                    ValueKind::Array(items) => items.borrow().clone(),
                    _ => {
                        return Err(err(
                            ErrorKind::Type,
                            format!(
                                "cannot destructure a {} against an array pattern",
                                value.kind_name()
                            ),
                            span,
                        ))
                    }
                };
                if patterns.len() > items.len() {
                    return Err(err(
                        ErrorKind::Value,
                        "the assignment expects a larger array on the right-hand side",
                        span,
                    ));
                }
                for (pattern, item) in patterns.iter().zip(items.into_iter()) {
                    self.destructure(pattern, item, env, define)?;
                }
                Ok(value)
            }
            ExprKind::Object(patterns) => {
                let items = match &value.kind {
                    ValueKind::Object(items) => items.clone(),
                    _ => {
                        return Err(err(
                            ErrorKind::Type,
                            format!(
                                "cannot destructure a {} against an object pattern",
                                value.kind_name()
                            ),
                            span,
                        ))
                    }
                };
                for (key, pattern) in patterns {
                    let sub = object_get(&items, key).ok_or_else(|| {
                        err(
                            ErrorKind::Value,
                            format!("cannot extract unknown key '{key}' from the right-hand side"),
                            span,
                        )
                    })?;
                    self.destructure(pattern, sub, env, define)?;
                }
                Ok(value)
            }
            _ => Err(err(ErrorKind::Type, "invalid assignment target", span)),
        }
    }

    // ── application ──────────────────────────────────────────────────

    /// One unary application. Parameter and result types are enforced at
    /// the boundary; oracles delegate their result to the backend.
    pub fn apply(
        &mut self,
        function: Value,
        arg: Value,
        this: Option<Value>,
        env: &Env,
        span: Span,
    ) -> IResult {
        match &function.kind {
            ValueKind::Function(closure) => {
                let expected = TypeVal::new(closure.param_ty.clone(), Some(closure.env.clone()));
                self.check_argument(&arg, &expected, span)?;
                let frame = EnvInner::with_parent(&closure.env);
                frame
                    .borrow_mut()
                    .define(closure.def.param.clone(), arg);
                frame
                    .borrow_mut()
                    .define("this", this.unwrap_or_else(Value::null));
                let result = match self.eval(&closure.def.body, &frame) {
                    Ok(value) => value,
                    Err(Flow::Return(value)) => value,
                    Err(other) => return Err(other),
                };
                let declared = TypeVal::new(closure.ret_ty.clone(), Some(closure.env.clone()));
                self.check_result(&result, &declared, span)?;
                Ok(result)
            }
            ValueKind::Builtin(builtin) => {
                let at = builtin.applied.len();
                let expected = TypeVal::new(builtin.def.params[at].clone(), None);
                self.check_argument(&arg, &expected, span)?;
                let mut applied = builtin.applied.clone();
                applied.push(arg);
                if applied.len() < builtin.def.params.len() {
                    return Ok(Value {
                        kind: ValueKind::Builtin(Rc::new(BuiltinVal {
                            def: builtin.def.clone(),
                            applied,
                        })),
                        note: function.note.clone(),
                    });
                }
                let func = builtin.def.func.clone();
                let result = func.as_ref()(self, &applied, env, span).map_err(Flow::Error)?;
                let declared = TypeVal::new(builtin.def.ret.clone(), None);
                self.check_result(&result, &declared, span)?;
                Ok(result)
            }
            ValueKind::Oracle(oracle) => {
                let at = oracle.applied.len();
                let (_, param_ty) = &oracle.sig.params[at];
                let expected = TypeVal::new(param_ty.clone(), Some(oracle.sig.env.clone()));
                self.check_argument(&arg, &expected, span)?;
                let mut applied = oracle.applied.clone();
                applied.push(arg);
                if applied.len() < oracle.sig.params.len() {
                    return Ok(Value {
                        kind: ValueKind::Oracle(Rc::new(OracleVal {
                            sig: oracle.sig.clone(),
                            applied,
                        })),
                        note: function.note.clone(),
                    });
                }
                let result = oracle::consult(
                    self,
                    &oracle.sig,
                    function.note.as_deref(),
                    &applied,
                    span,
                )
                .map_err(Flow::Error)?;
                let declared =
                    TypeVal::new(oracle.sig.wide_ret.clone(), Some(oracle.sig.env.clone()));
                if !conforms(&result, &declared).map_err(Flow::Error)? {
                    return Err(err(
                        ErrorKind::Oracle,
                        format!(
                            "the oracle returned {} which does not conform to {}",
                            display_value(&result),
                            display_type(&declared.term)
                        ),
                        span,
                    ));
                }
                Ok(result)
            }
            _ => Err(err(
                ErrorKind::Type,
                format!("a {} is not a function", function.kind_name()),
                span,
            )),
        }
    }

    fn check_argument(&mut self, arg: &Value, expected: &TypeVal, span: Span) -> Result<(), Flow> {
        if conforms(arg, expected).map_err(Flow::Error)? {
            Ok(())
        } else {
            Err(err(
                ErrorKind::Type,
                format!(
                    "wrong type of function argument: expected {} but got value {} of {}",
                    display_type(&expected.term),
                    display_value(arg),
                    display_type(&type_of(arg).term)
                ),
                span,
            ))
        }
    }

    fn check_result(&mut self, result: &Value, declared: &TypeVal, span: Span) -> Result<(), Flow> {
        if conforms(result, declared).map_err(Flow::Error)? {
            Ok(())
        } else {
            Err(err(
                ErrorKind::Type,
                format!(
                    "wrong type of function output: expected {} but got value {} of {}",
                    display_type(&declared.term),
                    display_value(result),
                    display_type(&type_of(result).term)
                ),
                span,
            ))
        }
    }

    // ── loops ────────────────────────────────────────────────────────

    fn for_loop(
        &mut self,
        target: &Expr,
        iterator: &Expr,
        body: &Expr,
        env: &Env,
        span: Span,
    ) -> IResult {
        let source = self.eval(iterator, env)?;
        if !source.is_callable() {
            return Err(err(
                ErrorKind::Value,
                format!(
                    "can only iterate over an iterator function, got a {}",
                    source.kind_name()
                ),
                span,
            ));
        }
        let loop_env = EnvInner::with_parent(env);
        let mut value = Value::null();
        loop {
            let next = self.apply(source.clone(), Value::null(), None, env, span)?;
            if next.is_null() {
                break;
            }
            self.destructure(target, next, &loop_env, true)?;
            match self.eval(body, &loop_env) {
                Ok(v) => value = v,
                Err(Flow::Break(v, _)) => {
                    value = v;
                    break;
                }
                Err(Flow::Continue(_, _)) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(value)
    }

    // ── operators ────────────────────────────────────────────────────

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        env: &Env,
        span: Span,
    ) -> IResult {
        // short-circuit operators first
        match op {
            BinaryOp::And => {
                let lhs = self.eval(left, env)?;
                if !lhs.is_truthy() {
                    return Ok(lhs);
                }
                return self.eval(right, env);
            }
            BinaryOp::Or => {
                let lhs = self.eval(left, env)?;
                if lhs.is_truthy() {
                    return Ok(lhs);
                }
                return self.eval(right, env);
            }
            _ => {}
        }

        let lhs = self.eval(left, env)?;
        let rhs = self.eval(right, env)?;

        match op {
            BinaryOp::Eq => {
                return Ok(Value::bool(values_equal(&lhs, &rhs).map_err(Flow::Error)?))
            }
            BinaryOp::Ne => {
                return Ok(Value::bool(!values_equal(&lhs, &rhs).map_err(Flow::Error)?))
            }
            _ => {}
        }

        match (&lhs.kind, &rhs.kind) {
            (ValueKind::Int(a), ValueKind::Int(b)) => {
                let (a, b) = (*a, *b);
                match op {
                    BinaryOp::Add => Ok(Value::int(a.wrapping_add(b))),
                    BinaryOp::Sub => Ok(Value::int(a.wrapping_sub(b))),
                    BinaryOp::Mul => Ok(Value::int(a.wrapping_mul(b))),
                    BinaryOp::Div => {
                        if b == 0 {
                            Err(err(ErrorKind::Value, "division by zero", span))
                        } else {
                            Ok(Value::int(a.wrapping_div(b)))
                        }
                    }
                    BinaryOp::Rem => {
                        if b == 0 {
                            Err(err(ErrorKind::Value, "division by zero", span))
                        } else {
                            Ok(Value::int(a.wrapping_rem_euclid(b)))
                        }
                    }
                    BinaryOp::Lt => Ok(Value::bool(a < b)),
                    BinaryOp::Le => Ok(Value::bool(a <= b)),
                    BinaryOp::Gt => Ok(Value::bool(a > b)),
                    BinaryOp::Ge => Ok(Value::bool(a >= b)),
                    _ => Err(err(ErrorKind::Type, "wrong operand types", span)),
                }
            }
            (ValueKind::Int(_) | ValueKind::Num(_), ValueKind::Int(_) | ValueKind::Num(_)) => {
                let a = match lhs.kind {
                    ValueKind::Int(n) => n as f64,
                    ValueKind::Num(n) => n,
                    _ => unreachable!(),
                };
                let b = match rhs.kind {
                    ValueKind::Int(n) => n as f64,
                    ValueKind::Num(n) => n,
                    _ => unreachable!(),
                };
                match op {
                    BinaryOp::Add => Ok(Value::num(a + b)),
                    BinaryOp::Sub => Ok(Value::num(a - b)),
                    BinaryOp::Mul => Ok(Value::num(a * b)),
                    BinaryOp::Div => {
                        if b == 0.0 {
                            Err(err(ErrorKind::Value, "division by zero", span))
                        } else {
                            Ok(Value::num(a / b))
                        }
                    }
                    BinaryOp::Rem => {
                        if b == 0.0 {
                            Err(err(ErrorKind::Value, "division by zero", span))
                        } else {
                            Ok(Value::num(a.rem_euclid(b)))
                        }
                    }
                    BinaryOp::Lt => Ok(Value::bool(a < b)),
                    BinaryOp::Le => Ok(Value::bool(a <= b)),
                    BinaryOp::Gt => Ok(Value::bool(a > b)),
                    BinaryOp::Ge => Ok(Value::bool(a >= b)),
                    _ => Err(err(ErrorKind::Type, "wrong operand types", span)),
                }
            }
            (ValueKind::Str(a), ValueKind::Str(b)) => match op {
                BinaryOp::Add => Ok(Value::str(format!("{a}{b}"))),
                BinaryOp::Lt => Ok(Value::bool(a < b)),
                BinaryOp::Le => Ok(Value::bool(a <= b)),
                BinaryOp::Gt => Ok(Value::bool(a > b)),
                BinaryOp::Ge => Ok(Value::bool(a >= b)),
                _ => Err(err(
                    ErrorKind::Type,
                    "unexpected operator for string operands",
                    span,
                )),
            },
            (ValueKind::Array(a), ValueKind::Array(b)) => match op {
                BinaryOp::Add => {
                    let mut items = a.borrow().clone();
                    items.extend(b.borrow().iter().cloned());
                    Ok(Value::array(items))
                }
                _ => Err(err(
                    ErrorKind::Type,
                    "unexpected operator for array operands",
                    span,
                )),
            },
            (ValueKind::Object(a), ValueKind::Object(b)) => match op {
                BinaryOp::Add => {
                    let mut items = a.borrow().clone();
                    for (key, value) in b.borrow().iter() {
                        match items.iter_mut().find(|(k, _)| k == key) {
                            Some(slot) => slot.1 = value.clone(),
                            None => items.push((key.clone(), value.clone())),
                        }
                    }
                    Ok(Value::object(items))
                }
                _ => Err(err(
                    ErrorKind::Type,
                    "unexpected operator for object operands",
                    span,
                )),
            },
            _ => Err(err(
                ErrorKind::Type,
                format!(
                    "wrong operand types: {} {} {}",
                    lhs.kind_name(),
                    op.symbol(),
                    rhs.kind_name()
                ),
                span,
            )),
        }
    }

    // ── types ────────────────────────────────────────────────────────

    /// Evaluate a type expression into a runtime type term. Enum value
    /// lists are evaluated and snapshotted here.
    pub fn eval_type(&mut self, texpr: &TypeExpr, env: &Env) -> Result<Rc<Ty>, Flow> {
        let kind = match &texpr.kind {
            TypeExprKind::Prim(prim) => TyKind::Prim(*prim),
            TypeExprKind::Name(name) => TyKind::Name(name.clone()),
            TypeExprKind::Array(inner) => TyKind::Array(self.eval_type(inner, env)?),
            TypeExprKind::Object(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    out.push(Field {
                        name: field.name.clone(),
                        required: field.required,
                        ty: self.eval_type(&field.ty, env)?,
                    });
                }
                TyKind::Object(out)
            }
            TypeExprKind::Arrow(left, right) => {
                TyKind::Arrow(self.eval_type(left, env)?, self.eval_type(right, env)?)
            }
            TypeExprKind::Option(inner) => TyKind::Option(self.eval_type(inner, env)?),
            TypeExprKind::Enum { base, values } => {
                let base = self.eval_type(base, env)?;
                let evaluated = self.eval(values, env)?;
                let items = match &evaluated.kind {
                    ValueKind::Array(items) if !items.borrow().is_empty() => {
                        items.borrow().clone()
                    }
                    _ => {
                        return Err(err(
                            ErrorKind::Value,
                            "expected a non-empty array of possible values",
                            values.span,
                        ))
                    }
                };
                TyKind::Enum {
                    base,
                    values: items,
                }
            }
        };
        Ok(Rc::new(Ty {
            kind,
            note: texpr.note.as_deref().map(Rc::from),
        }))
    }

    fn validate_examples(
        &mut self,
        examples: &Value,
        params: &[(String, Rc<Ty>)],
        ret: &Rc<Ty>,
        env: &Env,
        span: Span,
    ) -> Result<Vec<Value>, Flow> {
        let rows = match &examples.kind {
            ValueKind::Array(items) => items.borrow().clone(),
            _ => {
                return Err(err(
                    ErrorKind::Type,
                    "the examples must be of type [[Any]]",
                    span,
                ))
            }
        };
        let width = params.len() + 1;
        for row in &rows {
            let cells = match &row.kind {
                ValueKind::Array(items) => items.borrow().clone(),
                _ => {
                    return Err(err(
                        ErrorKind::Type,
                        format!(
                            "each example must be an array of length {width}, but found {}",
                            display_value(row)
                        ),
                        span,
                    ))
                }
            };
            if cells.len() != width {
                return Err(err(
                    ErrorKind::Type,
                    format!(
                        "each example must be an array of length {width}, but found {}",
                        display_value(row)
                    ),
                    span,
                ));
            }
            for ((_, param_ty), cell) in params.iter().zip(cells.iter()) {
                let expected = TypeVal::new(param_ty.clone(), Some(env.clone()));
                if !conforms(cell, &expected).map_err(Flow::Error)? {
                    return Err(err(
                        ErrorKind::Type,
                        format!(
                            "expected example value of type {} but found {}",
                            display_type(param_ty),
                            display_value(cell)
                        ),
                        span,
                    ));
                }
            }
            let declared = TypeVal::new(ret.clone(), Some(env.clone()));
            let output = cells.last().expect("width >= 1");
            if !conforms(output, &declared).map_err(Flow::Error)? {
                return Err(err(
                    ErrorKind::Type,
                    format!(
                        "expected example output of type {} but found {}",
                        display_type(ret),
                        display_value(output)
                    ),
                    span,
                ));
            }
        }
        Ok(rows)
    }
}
