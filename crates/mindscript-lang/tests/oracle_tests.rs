use std::cell::RefCell;
use std::rc::Rc;

use mindscript_lang::{Backend, ErrorKind, Interpreter, OracleQuery, Value};
use serde_json::{json, Value as Json};

/// Replies with a fixed wrapped result and records the query it saw.
struct FixedBackend {
    reply: Result<Json, String>,
    seen: RefCell<Option<OracleQuery>>,
}

impl FixedBackend {
    fn new(reply: Result<Json, String>) -> Rc<Self> {
        Rc::new(Self {
            reply,
            seen: RefCell::new(None),
        })
    }
}

impl Backend for FixedBackend {
    fn consult(&self, query: &OracleQuery) -> Result<Json, String> {
        *self.seen.borrow_mut() = Some(query.clone());
        self.reply.clone()
    }
}

fn eval_with(backend: Rc<FixedBackend>, source: &str) -> Result<Value, mindscript_lang::MsError> {
    let mut interpreter = Interpreter::new(backend);
    interpreter.eval_source(source)
}

#[test]
fn an_oracle_call_reaches_the_backend() {
    let backend = FixedBackend::new(Ok(json!({ "result": 8 })));
    let v = eval_with(
        backend.clone(),
        "let double = # \"Double the number.\"\n oracle(x: Int) -> Int; double(4)",
    )
    .unwrap();
    assert_eq!(v, Value::int(8));

    let seen = backend.seen.borrow();
    let query = seen.as_ref().expect("the backend was consulted");
    assert_eq!(query.task.as_deref(), Some("Double the number."));
    assert_eq!(query.input, json!({ "x": 4 }));
    assert_eq!(query.input_schema["properties"]["x"], json!({"type": "integer"}));
    assert_eq!(
        query.output_schema["properties"]["result"],
        json!({"type": "integer"})
    );
    assert_eq!(query.output_schema["required"], json!(["result"]));
}

#[test]
fn oracles_curry_like_functions() {
    let backend = FixedBackend::new(Ok(json!({ "result": 3 })));
    let v = eval_with(
        backend.clone(),
        "let add = oracle(a: Int, b: Int) -> Int; add(1)(2)",
    )
    .unwrap();
    assert_eq!(v, Value::int(3));
    let seen = backend.seen.borrow();
    assert_eq!(seen.as_ref().unwrap().input, json!({ "a": 1, "b": 2 }));
}

#[test]
fn examples_are_validated_and_forwarded() {
    let backend = FixedBackend::new(Ok(json!({ "result": "negative" })));
    let v = eval_with(
        backend.clone(),
        "let sign = # \"Name the sign.\"\n oracle(x: Int) -> Str from [[1, \"positive\"], [0, \"zero\"]]; \
         sign(0 - 5)",
    )
    .unwrap();
    assert_eq!(v, Value::str("negative"));
    let seen = backend.seen.borrow();
    let query = seen.as_ref().unwrap();
    assert_eq!(query.examples.len(), 2);
    assert_eq!(query.examples[0].input, json!({ "x": 1 }));
    assert_eq!(query.examples[0].output, json!("positive"));
}

#[test]
fn malformed_examples_are_rejected_at_definition() {
    let backend = FixedBackend::new(Ok(json!({ "result": 0 })));
    let err = eval_with(
        backend,
        "oracle(x: Int) -> Str from [[1, 2]]",
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn nonconforming_replies_are_oracle_errors() {
    let backend = FixedBackend::new(Ok(json!({ "result": "not a number" })));
    let err = eval_with(backend, "let f = oracle(x: Int) -> Int; f(1)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Oracle);
}

#[test]
fn a_null_reply_satisfies_the_widened_return_type() {
    let backend = FixedBackend::new(Ok(json!({ "result": null })));
    let v = eval_with(backend, "let f = oracle(x: Int) -> Int; f(1)").unwrap();
    assert_eq!(v, Value::null());
}

#[test]
fn backend_refusal_is_an_oracle_error() {
    let backend = FixedBackend::new(Err("model unavailable".to_string()));
    let err = eval_with(backend, "let f = oracle(x: Int) -> Int; f(1)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Oracle);
    assert!(err.message.contains("model unavailable"));
}

#[test]
fn replies_without_a_result_member_are_oracle_errors() {
    let backend = FixedBackend::new(Ok(json!({ "unexpected": 1 })));
    let err = eval_with(backend, "let f = oracle(x: Int) -> Int; f(1)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Oracle);
}

#[test]
fn oracle_arguments_are_type_checked() {
    let backend = FixedBackend::new(Ok(json!({ "result": 1 })));
    let err = eval_with(backend, "let f = oracle(x: Int) -> Int; f(\"one\")").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn oracles_are_indistinguishable_at_the_call_site() {
    // user code treats oracles exactly like functions, including typeOf
    let backend = FixedBackend::new(Ok(json!({ "result": 2 })));
    let v = eval_with(
        backend,
        "let f = oracle(x: Int) -> Int; isSubtype(typeOf(f), type Int -> Int?)",
    )
    .unwrap();
    assert_eq!(v, Value::bool(true));
}

#[test]
fn enum_return_schemas_constrain_the_reply() {
    let backend = FixedBackend::new(Ok(json!({ "result": "yes" })));
    let v = eval_with(
        backend.clone(),
        "let judge = oracle(x: Str) -> Enum(Str, [\"yes\", \"no\"]); judge(\"ok?\")",
    )
    .unwrap();
    assert_eq!(v, Value::str("yes"));
    let seen = backend.seen.borrow();
    let query = seen.as_ref().unwrap();
    assert_eq!(
        query.output_schema["properties"]["result"]["enum"],
        json!(["yes", "no"])
    );
}
