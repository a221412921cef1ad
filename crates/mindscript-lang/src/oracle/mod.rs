//! The oracle capability: what the interpreter hands to a backend when an
//! oracle value is applied, and the conversions between runtime values,
//! JSON and JSON schemas. Prompt wording lives in backend implementations,
//! not here.

use std::rc::Rc;

use serde::Serialize;
use serde_json::{json, Map, Value as Json};

use crate::ast::Prim;
use crate::errors::{ErrorKind, MsError};
use crate::interp::value::{OracleSig, Value, ValueKind};
use crate::interp::Interpreter;
use crate::syntax::Span;
use crate::types::{Ty, TyKind};

/// One worked example: named inputs and the expected output.
#[derive(Debug, Clone, Serialize)]
pub struct OracleExample {
    pub input: Json,
    pub output: Json,
}

/// Everything a backend gets to see for one consultation.
#[derive(Debug, Clone, Serialize)]
pub struct OracleQuery {
    /// The informal annotation attached to the oracle value, if any.
    pub task: Option<String>,
    /// Object schema of parameter name -> parameter type.
    pub input_schema: Json,
    /// The declared return schema wrapped as `{"result": ...}`, since
    /// several backends only accept object-rooted schemas.
    pub output_schema: Json,
    pub examples: Vec<OracleExample>,
    /// Object of parameter name -> argument value.
    pub input: Json,
}

/// An inductive computation provider. The returned JSON must be the
/// wrapped output object; the interpreter unwraps `result` and enforces
/// conformance against the oracle's declared return type.
pub trait Backend {
    fn consult(&self, query: &OracleQuery) -> Result<Json, String>;
}

/// The default capability when no model is configured: refuses every
/// request.
pub struct NoBackend;

impl Backend for NoBackend {
    fn consult(&self, _query: &OracleQuery) -> Result<Json, String> {
        Err("no oracle backend is configured".to_string())
    }
}

fn oracle_error(message: impl Into<String>, span: Span) -> MsError {
    MsError::new(ErrorKind::Oracle, message, Some(span))
}

/// Run one saturated oracle application through the backend.
pub fn consult(
    interpreter: &mut Interpreter,
    sig: &OracleSig,
    note: Option<&str>,
    args: &[Value],
    span: Span,
) -> Result<Value, MsError> {
    let env = Some(sig.env.clone());

    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, ty) in &sig.params {
        properties.insert(name.clone(), schema_of(ty, &env, span)?);
        required.push(Json::String(name.clone()));
    }
    let input_schema = json!({
        "type": "object",
        "properties": properties,
        "required": required,
    });
    let output_schema = json!({
        "type": "object",
        "properties": { "result": schema_of(&sig.ret, &env, span)? },
        "required": ["result"],
    });

    let mut examples = Vec::with_capacity(sig.examples.len());
    for row in &sig.examples {
        let cells = match &row.kind {
            ValueKind::Array(items) => items.borrow().clone(),
            _ => continue,
        };
        let mut input = Map::new();
        for ((name, _), cell) in sig.params.iter().zip(cells.iter()) {
            input.insert(name.clone(), value_to_json(cell, span)?);
        }
        let output = value_to_json(cells.last().expect("validated examples"), span)?;
        examples.push(OracleExample {
            input: Json::Object(input),
            output,
        });
    }

    let mut input = Map::new();
    for ((name, _), arg) in sig.params.iter().zip(args.iter()) {
        input.insert(name.clone(), value_to_json(arg, span)?);
    }

    let query = OracleQuery {
        task: note.map(str::to_string),
        input_schema,
        output_schema,
        examples,
        input: Json::Object(input),
    };

    let backend = interpreter.backend.clone();
    let reply = backend
        .consult(&query)
        .map_err(|message| oracle_error(message, span))?;

    let result = match &reply {
        Json::Object(fields) => fields
            .get("result")
            .cloned()
            .ok_or_else(|| oracle_error("the backend reply has no 'result' member", span))?,
        _ => return Err(oracle_error("the backend reply is not an object", span)),
    };
    Ok(json_to_value(&result))
}

/// JSON schema of a type term. Name references resolve against the
/// oracle's environment; schemas cannot express recursive types or
/// function types.
pub fn schema_of(term: &Rc<Ty>, env: &Option<crate::interp::Env>, span: Span) -> Result<Json, MsError> {
    let mut visited = Vec::new();
    schema_rec(term, env, &mut visited, span)
}

fn schema_rec(
    term: &Rc<Ty>,
    env: &Option<crate::interp::Env>,
    visited: &mut Vec<usize>,
    span: Span,
) -> Result<Json, MsError> {
    // resolve name references, guarding against recursion
    let mut term = term.clone();
    let mut env = env.clone();
    loop {
        let name = match &term.kind {
            TyKind::Name(name) => name.clone(),
            _ => break,
        };
        let id = Rc::as_ptr(&term) as usize;
        if visited.contains(&id) {
            return Err(MsError::new(
                ErrorKind::Type,
                format!("recursive types such as '{name}' have no JSON schema"),
                Some(span),
            ));
        }
        visited.push(id);
        let looked_up = env
            .as_ref()
            .and_then(|e| e.borrow().get(&name))
            .ok_or_else(|| {
                MsError::new(ErrorKind::Name, format!("unknown type '{name}'"), Some(span))
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
                    Some(span),
                ))
            }
        }
    }

    let mut object = Map::new();
    if let Some(note) = &term.note {
        object.insert("description".to_string(), Json::String(note.to_string()));
    }

    match &term.kind {
        TyKind::Prim(prim) => {
            let ty = match prim {
                Prim::Int => json!("integer"),
                Prim::Num => json!("number"),
                Prim::Str => json!("string"),
                Prim::Bool => json!("boolean"),
                Prim::Null => json!("null"),
                Prim::Any => json!(["array", "boolean", "number", "null", "object", "string"]),
                Prim::Type => {
                    return Err(MsError::new(
                        ErrorKind::Type,
                        "type values have no JSON schema",
                        Some(span),
                    ))
                }
            };
            object.insert("type".to_string(), ty);
        }
        TyKind::Option(inner) => {
            let mut inner_schema = schema_rec(inner, &env, visited, span)?;
            if let Some(fields) = inner_schema.as_object_mut() {
                match fields.get_mut("type") {
                    Some(Json::String(name)) => {
                        let name = name.clone();
                        fields.insert("type".to_string(), json!([name, "null"]));
                    }
                    Some(Json::Array(names)) => {
                        if !names.iter().any(|n| n == "null") {
                            names.push(json!("null"));
                        }
                    }
                    _ => {
                        if let Some(Json::Array(allowed)) = fields.get_mut("enum") {
                            if !allowed.iter().any(|v| v.is_null()) {
                                allowed.push(Json::Null);
                            }
                        }
                    }
                }
            }
            return Ok(merge_description(inner_schema, object));
        }
        TyKind::Array(elem) => {
            object.insert("type".to_string(), json!("array"));
            object.insert("items".to_string(), schema_rec(elem, &env, visited, span)?);
        }
        TyKind::Object(fields) => {
            object.insert("type".to_string(), json!("object"));
            let mut properties = Map::new();
            let mut required = Vec::new();
            for field in fields {
                if field.required {
                    required.push(Json::String(field.name.clone()));
                }
                properties.insert(
                    field.name.clone(),
                    schema_rec(&field.ty, &env, visited, span)?,
                );
            }
            object.insert("properties".to_string(), Json::Object(properties));
            object.insert("required".to_string(), Json::Array(required));
        }
        TyKind::Enum { values, .. } => {
            let mut allowed = Vec::with_capacity(values.len());
            for value in values {
                allowed.push(value_to_json(value, span)?);
            }
            object.insert("enum".to_string(), Json::Array(allowed));
        }
        TyKind::Arrow(..) => {
            return Err(MsError::new(
                ErrorKind::Type,
                "function types have no JSON schema",
                Some(span),
            ))
        }
        TyKind::Name(_) => unreachable!("names are resolved above"),
    }

    Ok(Json::Object(object))
}

fn merge_description(mut schema: Json, extra: Map<String, Json>) -> Json {
    if let (Some(fields), Some(description)) = (schema.as_object_mut(), extra.get("description")) {
        fields
            .entry("description".to_string())
            .or_insert_with(|| description.clone());
    }
    schema
}

/// Convert a data value to JSON. Callables and types are not data.
pub fn value_to_json(value: &Value, span: Span) -> Result<Json, MsError> {
    match &value.kind {
        ValueKind::Null => Ok(Json::Null),
        ValueKind::Bool(b) => Ok(Json::Bool(*b)),
        ValueKind::Int(n) => Ok(json!(n)),
        ValueKind::Num(n) => Ok(json!(n)),
        ValueKind::Str(s) => Ok(Json::String(s.to_string())),
        ValueKind::Array(items) => {
            let mut out = Vec::new();
            for item in items.borrow().iter() {
                out.push(value_to_json(item, span)?);
            }
            Ok(Json::Array(out))
        }
        ValueKind::Object(items) => {
            let mut out = Map::new();
            for (key, item) in items.borrow().iter() {
                out.insert(key.clone(), value_to_json(item, span)?);
            }
            Ok(Json::Object(out))
        }
        _ => Err(MsError::new(
            ErrorKind::Type,
            format!("a {} cannot be converted to JSON", value.kind_name()),
            Some(span),
        )),
    }
}

/// Convert backend JSON into a runtime value. Whole numbers come back as
/// integers, which the nullable-widened conformance check then narrows.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::null(),
        Json::Bool(b) => Value::bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::int(i)
            } else {
                Value::num(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::str(s.as_str()),
        Json::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        Json::Object(fields) => Value::object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn span() -> Span {
        Span::point(0)
    }

    #[test]
    fn primitive_schemas() {
        let schema = schema_of(&Ty::prim(Prim::Int), &None, span()).unwrap();
        assert_eq!(schema, json!({"type": "integer"}));
    }

    #[test]
    fn optional_schemas_are_nullable() {
        let opt = Ty::new(TyKind::Option(Ty::prim(Prim::Str)));
        let schema = schema_of(&opt, &None, span()).unwrap();
        assert_eq!(schema, json!({"type": ["string", "null"]}));
    }

    #[test]
    fn object_schema_lists_required() {
        let shape = Ty::new(TyKind::Object(vec![
            Field {
                name: "name".into(),
                required: true,
                ty: Ty::prim(Prim::Str),
            },
            Field {
                name: "age".into(),
                required: false,
                ty: Ty::prim(Prim::Int),
            },
        ]));
        let schema = schema_of(&shape, &None, span()).unwrap();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["age"], json!({"type": "integer"}));
    }

    #[test]
    fn enum_schema_is_a_value_set() {
        let words = Ty::new(TyKind::Enum {
            base: Ty::prim(Prim::Str),
            values: vec![Value::str("yes"), Value::str("no")],
        });
        let schema = schema_of(&words, &None, span()).unwrap();
        assert_eq!(schema, json!({"enum": ["yes", "no"]}));
    }

    #[test]
    fn arrow_schemas_are_rejected() {
        let arrow = Ty::new(TyKind::Arrow(Ty::prim(Prim::Int), Ty::prim(Prim::Int)));
        assert!(schema_of(&arrow, &None, span()).is_err());
    }

    #[test]
    fn json_round_trips_data() {
        let value = Value::object(vec![
            ("xs".to_string(), Value::array(vec![Value::int(1)])),
            ("ok".to_string(), Value::bool(true)),
        ]);
        let json = value_to_json(&value, span()).unwrap();
        let back = json_to_value(&json);
        assert!(crate::interp::value::values_equal(&value, &back).unwrap());
    }
}
