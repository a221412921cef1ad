use std::rc::Rc;

use crate::ast::Prim;
use crate::errors::{ErrorKind, MsError};
use crate::interp::env::Env;
use crate::interp::value::{values_equal, Value, ValueKind};

/// A field of an object shape.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub required: bool,
    pub ty: Rc<Ty>,
}

/// A runtime type term. Enum value lists are already evaluated; `Name`
/// references stay lazy and are resolved against the environment captured
/// by the type value, which is what makes recursive types work.
pub struct Ty {
    pub kind: TyKind,
    pub note: Option<Rc<str>>,
}

pub enum TyKind {
    Prim(Prim),
    Name(String),
    Array(Rc<Ty>),
    Object(Vec<Field>),
    Arrow(Rc<Ty>, Rc<Ty>),
    Option(Rc<Ty>),
    Enum { base: Rc<Ty>, values: Vec<Value> },
}

impl Ty {
    pub fn new(kind: TyKind) -> Rc<Ty> {
        Rc::new(Ty { kind, note: None })
    }

    pub fn prim(prim: Prim) -> Rc<Ty> {
        Ty::new(TyKind::Prim(prim))
    }
}

impl std::fmt::Debug for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::fmt::display_type(self))
    }
}

/// A reified type: the term plus the environment its names resolve in.
pub struct TypeVal {
    pub term: Rc<Ty>,
    pub env: Option<Env>,
}

impl TypeVal {
    pub fn new(term: Rc<Ty>, env: Option<Env>) -> Self {
        Self { term, env }
    }

    pub fn into_value(self) -> Value {
        Value::plain(ValueKind::Type(Rc::new(self)))
    }
}

/// Follow name references until a structural term is reached.
fn resolve(
    term: &Rc<Ty>,
    env: &Option<Env>,
) -> Result<(Rc<Ty>, Option<Env>), MsError> {
    let mut term = term.clone();
    let mut env = env.clone();
    loop {
        let name = match &term.kind {
            TyKind::Name(name) => name.clone(),
            _ => return Ok((term, env)),
        };
        let looked_up = env
            .as_ref()
            .and_then(|e| e.borrow().get(&name))
            .ok_or_else(|| {
                MsError::new(ErrorKind::Name, format!("unknown type '{name}'"), None)
            })?;
        match looked_up.kind {
            ValueKind::Type(tv) => {
                term = tv.term.clone();
                env = tv.env.clone();
            }
            _ => {
                return Err(MsError::new(
                    ErrorKind::Type,
                    format!("'{name}' does not name a type"),
                    None,
                ))
            }
        }
    }
}

/// Decide `a <= b` structurally.
pub fn subtype(a: &TypeVal, b: &TypeVal) -> Result<bool, MsError> {
    let mut visited = Vec::new();
    subtype_rec(&a.term, &b.term, &a.env, &b.env, &mut visited)
}

fn subtype_rec(
    t1: &Rc<Ty>,
    t2: &Rc<Ty>,
    env1: &Option<Env>,
    env2: &Option<Env>,
    visited: &mut Vec<(usize, usize)>,
) -> Result<bool, MsError> {
    let (t1, env1) = resolve(t1, env1)?;
    let (t2, env2) = resolve(t2, env2)?;

    // Recursive types: a revisited pair holds coinductively.
    let pair = (Rc::as_ptr(&t1) as usize, Rc::as_ptr(&t2) as usize);
    if visited.contains(&pair) {
        return Ok(true);
    }
    visited.push(pair);

    match (&t1.kind, &t2.kind) {
        (_, TyKind::Prim(Prim::Any)) => Ok(true),
        (TyKind::Prim(p1), TyKind::Prim(p2)) => {
            Ok(p1 == p2 || (*p1 == Prim::Int && *p2 == Prim::Num))
        }
        (TyKind::Array(a), TyKind::Array(b)) => subtype_rec(a, b, &env1, &env2, visited),
        (TyKind::Object(fields1), TyKind::Object(fields2)) => {
            for field2 in fields2 {
                let field1 = fields1.iter().find(|f| f.name == field2.name);
                match field1 {
                    Some(field1) => {
                        if field2.required && !field1.required {
                            return Ok(false);
                        }
                        if !subtype_rec(&field1.ty, &field2.ty, &env1, &env2, visited)? {
                            return Ok(false);
                        }
                    }
                    None => {
                        if field2.required {
                            return Ok(false);
                        }
                    }
                }
            }
            Ok(true)
        }
        // Enums first: Enum(T, S) <= U when every member conforms to U.
        (TyKind::Enum { values: v1, .. }, TyKind::Enum { values: v2, .. }) => {
            for value1 in v1 {
                let mut found = false;
                for value2 in v2 {
                    if values_equal(value1, value2)? {
                        found = true;
                        break;
                    }
                }
                if !found {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (TyKind::Enum { values, .. }, _) => {
            for value in values {
                if !conforms_env(value, &t2, &env2)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (_, TyKind::Option(inner2)) => match &t1.kind {
            TyKind::Option(inner1) => subtype_rec(inner1, inner2, &env1, &env2, visited),
            TyKind::Prim(Prim::Null) => Ok(true),
            _ => subtype_rec(&t1, inner2, &env1, &env2, visited),
        },
        (TyKind::Arrow(a1, a2), TyKind::Arrow(b1, b2)) => {
            // contravariant in the argument, covariant in the result
            Ok(subtype_rec(b1, a1, &env2, &env1, visited)?
                && subtype_rec(a2, b2, &env1, &env2, visited)?)
        }
        _ => Ok(false),
    }
}

/// Does a concrete value conform to a type? Enums check by membership,
/// object shapes ignore extra keys, callables check their arrow type.
pub fn conforms(value: &Value, ty: &TypeVal) -> Result<bool, MsError> {
    let mut visited = Vec::new();
    conforms_rec(value, &ty.term, &ty.env, &mut visited)
}

fn conforms_env(value: &Value, term: &Rc<Ty>, env: &Option<Env>) -> Result<bool, MsError> {
    let mut visited = Vec::new();
    conforms_rec(value, term, env, &mut visited)
}

fn conforms_rec(
    value: &Value,
    term: &Rc<Ty>,
    env: &Option<Env>,
    visited: &mut Vec<(usize, usize)>,
) -> Result<bool, MsError> {
    let (term, env) = resolve(term, env)?;

    if let TyKind::Prim(Prim::Any) = term.kind {
        return Ok(true);
    }

    match (&value.kind, &term.kind) {
        (ValueKind::Null, TyKind::Prim(Prim::Null)) => Ok(true),
        (ValueKind::Bool(_), TyKind::Prim(Prim::Bool)) => Ok(true),
        (ValueKind::Int(_), TyKind::Prim(Prim::Int)) => Ok(true),
        (ValueKind::Int(_), TyKind::Prim(Prim::Num)) => Ok(true),
        (ValueKind::Num(_), TyKind::Prim(Prim::Num)) => Ok(true),
        (ValueKind::Str(_), TyKind::Prim(Prim::Str)) => Ok(true),
        (ValueKind::Type(_), TyKind::Prim(Prim::Type)) => Ok(true),
        (ValueKind::Array(items), TyKind::Array(elem)) => {
            let pair = (Rc::as_ptr(items) as usize, Rc::as_ptr(&term) as usize);
            if visited.contains(&pair) {
                return Ok(true);
            }
            visited.push(pair);
            for item in items.borrow().iter() {
                if !conforms_rec(item, elem, &env, visited)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ValueKind::Object(items), TyKind::Object(fields)) => {
            let pair = (Rc::as_ptr(items) as usize, Rc::as_ptr(&term) as usize);
            if visited.contains(&pair) {
                return Ok(true);
            }
            visited.push(pair);
            for field in fields {
                let entry = items
                    .borrow()
                    .iter()
                    .find(|(k, _)| *k == field.name)
                    .map(|(_, v)| v.clone());
                match entry {
                    Some(sub) => {
                        if !conforms_rec(&sub, &field.ty, &env, visited)? {
                            return Ok(false);
                        }
                    }
                    None => {
                        if field.required {
                            return Ok(false);
                        }
                    }
                }
            }
            Ok(true)
        }
        (_, TyKind::Enum { base, values }) => {
            let mut member = false;
            for allowed in values {
                if values_equal(value, allowed)? {
                    member = true;
                    break;
                }
            }
            Ok(member && conforms_rec(value, base, &env, visited)?)
        }
        (_, TyKind::Option(inner)) => {
            if value.is_null() {
                Ok(true)
            } else {
                conforms_rec(value, inner, &env, visited)
            }
        }
        (ValueKind::Function(_), _) | (ValueKind::Builtin(_), _) | (ValueKind::Oracle(_), _) => {
            let own = type_of(value);
            let target = TypeVal::new(term.clone(), env.clone());
            subtype(&own, &target)
        }
        _ => Ok(false),
    }
}

/// The most precise type term describing a value.
pub fn type_of(value: &Value) -> TypeVal {
    match &value.kind {
        ValueKind::Null => TypeVal::new(Ty::prim(Prim::Null), None),
        ValueKind::Bool(_) => TypeVal::new(Ty::prim(Prim::Bool), None),
        ValueKind::Int(_) => TypeVal::new(Ty::prim(Prim::Int), None),
        ValueKind::Num(_) => TypeVal::new(Ty::prim(Prim::Num), None),
        ValueKind::Str(_) => TypeVal::new(Ty::prim(Prim::Str), None),
        ValueKind::Type(_) => TypeVal::new(Ty::prim(Prim::Type), None),
        ValueKind::Array(items) => {
            let elem = array_element_type(&items.borrow());
            TypeVal::new(Ty::new(TyKind::Array(elem)), None)
        }
        ValueKind::Object(items) => {
            let fields = items
                .borrow()
                .iter()
                .map(|(name, sub)| Field {
                    name: name.clone(),
                    required: true,
                    ty: type_of(sub).term,
                })
                .collect();
            TypeVal::new(Ty::new(TyKind::Object(fields)), None)
        }
        ValueKind::Function(closure) => TypeVal::new(
            Ty::new(TyKind::Arrow(
                closure.param_ty.clone(),
                closure.ret_ty.clone(),
            )),
            Some(closure.env.clone()),
        ),
        ValueKind::Builtin(builtin) => {
            let remaining = &builtin.def.params[builtin.applied.len()..];
            TypeVal::new(fold_arrow(remaining, &builtin.def.ret), None)
        }
        ValueKind::Oracle(oracle) => {
            let remaining: Vec<Rc<Ty>> = oracle.sig.params[oracle.applied.len()..]
                .iter()
                .map(|(_, ty)| ty.clone())
                .collect();
            TypeVal::new(
                fold_arrow(&remaining, &oracle.sig.wide_ret),
                Some(oracle.sig.env.clone()),
            )
        }
    }
}

fn fold_arrow(params: &[Rc<Ty>], ret: &Rc<Ty>) -> Rc<Ty> {
    let mut out = ret.clone();
    for param in params.iter().rev() {
        out = Ty::new(TyKind::Arrow(param.clone(), out));
    }
    out
}

/// Least upper bound of the element types: nulls make the element type
/// optional, incomparable elements widen to Any, no elements means Any.
fn array_element_type(items: &[Value]) -> Rc<Ty> {
    let mut nullable = false;
    let mut general: Option<Rc<Ty>> = None;
    for item in items {
        let sub = type_of(item).term;
        if matches!(sub.kind, TyKind::Prim(Prim::Null)) {
            nullable = true;
            continue;
        }
        match &general {
            None => general = Some(sub),
            Some(best) => {
                let mut visited = Vec::new();
                if subtype_rec(&sub, best, &None, &None, &mut visited).unwrap_or(false) {
                    continue;
                }
                let mut visited = Vec::new();
                if subtype_rec(best, &sub, &None, &None, &mut visited).unwrap_or(false) {
                    general = Some(sub);
                } else {
                    return Ty::prim(Prim::Any);
                }
            }
        }
    }
    match general {
        None if nullable => Ty::prim(Prim::Null),
        None => Ty::prim(Prim::Any),
        Some(ty) if nullable => Ty::new(TyKind::Option(ty)),
        Some(ty) => ty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(term: Rc<Ty>) -> TypeVal {
        TypeVal::new(term, None)
    }

    #[test]
    fn primitives_and_any() {
        assert!(subtype(&tv(Ty::prim(Prim::Int)), &tv(Ty::prim(Prim::Int))).unwrap());
        assert!(subtype(&tv(Ty::prim(Prim::Int)), &tv(Ty::prim(Prim::Num))).unwrap());
        assert!(!subtype(&tv(Ty::prim(Prim::Num)), &tv(Ty::prim(Prim::Int))).unwrap());
        assert!(subtype(&tv(Ty::prim(Prim::Str)), &tv(Ty::prim(Prim::Any))).unwrap());
    }

    #[test]
    fn arrays_are_covariant() {
        let ints = Ty::new(TyKind::Array(Ty::prim(Prim::Int)));
        let nums = Ty::new(TyKind::Array(Ty::prim(Prim::Num)));
        assert!(subtype(&tv(ints.clone()), &tv(nums.clone())).unwrap());
        assert!(!subtype(&tv(nums), &tv(ints)).unwrap());
    }

    #[test]
    fn arrows_are_contravariant_in_the_argument() {
        let num_to_int = Ty::new(TyKind::Arrow(Ty::prim(Prim::Num), Ty::prim(Prim::Int)));
        let int_to_num = Ty::new(TyKind::Arrow(Ty::prim(Prim::Int), Ty::prim(Prim::Num)));
        assert!(subtype(&tv(num_to_int.clone()), &tv(int_to_num.clone())).unwrap());
        assert!(!subtype(&tv(int_to_num), &tv(num_to_int)).unwrap());
    }

    #[test]
    fn object_width_and_required() {
        let named = Ty::new(TyKind::Object(vec![Field {
            name: "name".into(),
            required: false,
            ty: Ty::prim(Prim::Str),
        }]));
        let empty = Ty::new(TyKind::Object(vec![]));
        let must_name = Ty::new(TyKind::Object(vec![Field {
            name: "name".into(),
            required: true,
            ty: Ty::prim(Prim::Str),
        }]));
        assert!(subtype(&tv(named.clone()), &tv(empty.clone())).unwrap());
        assert!(!subtype(&tv(empty), &tv(must_name.clone())).unwrap());
        // optional may not stand in for required
        assert!(!subtype(&tv(named), &tv(must_name)).unwrap());
    }

    #[test]
    fn optionals_admit_null_and_the_base() {
        let int_opt = Ty::new(TyKind::Option(Ty::prim(Prim::Int)));
        assert!(subtype(&tv(Ty::prim(Prim::Null)), &tv(int_opt.clone())).unwrap());
        assert!(subtype(&tv(Ty::prim(Prim::Int)), &tv(int_opt.clone())).unwrap());
        assert!(!subtype(&tv(int_opt), &tv(Ty::prim(Prim::Int))).unwrap());
    }

    #[test]
    fn enums_are_value_sets() {
        let small = Ty::new(TyKind::Enum {
            base: Ty::prim(Prim::Int),
            values: vec![Value::int(1)],
        });
        let big = Ty::new(TyKind::Enum {
            base: Ty::prim(Prim::Int),
            values: vec![Value::int(1), Value::int(2)],
        });
        assert!(subtype(&tv(small.clone()), &tv(big.clone())).unwrap());
        assert!(!subtype(&tv(big.clone()), &tv(small)).unwrap());
        assert!(subtype(&tv(big), &tv(Ty::prim(Prim::Int))).unwrap());
    }

    #[test]
    fn enum_conformance_is_membership() {
        let words = TypeVal::new(
            Ty::new(TyKind::Enum {
                base: Ty::prim(Prim::Str),
                values: vec![Value::str("yes"), Value::str("no")],
            }),
            None,
        );
        assert!(conforms(&Value::str("yes"), &words).unwrap());
        assert!(!conforms(&Value::str("maybe"), &words).unwrap());
    }

    #[test]
    fn typeof_array_lubs_elements() {
        let mixed = Value::array(vec![Value::int(1), Value::num(2.0)]);
        let ty = type_of(&mixed);
        match &ty.term.kind {
            TyKind::Array(elem) => assert!(matches!(elem.kind, TyKind::Prim(Prim::Num))),
            _ => panic!("expected array type"),
        }

        let with_null = Value::array(vec![Value::int(1), Value::null()]);
        let ty = type_of(&with_null);
        match &ty.term.kind {
            TyKind::Array(elem) => assert!(matches!(elem.kind, TyKind::Option(_))),
            _ => panic!("expected array type"),
        }
    }

    #[test]
    fn object_values_conform_with_extra_keys() {
        let shape = TypeVal::new(
            Ty::new(TyKind::Object(vec![Field {
                name: "x".into(),
                required: true,
                ty: Ty::prim(Prim::Int),
            }])),
            None,
        );
        let value = Value::object(vec![
            ("x".to_string(), Value::int(1)),
            ("y".to_string(), Value::int(2)),
        ]);
        assert!(conforms(&value, &shape).unwrap());
        let missing = Value::object(vec![("y".to_string(), Value::int(2))]);
        assert!(!conforms(&missing, &shape).unwrap());
    }
}
