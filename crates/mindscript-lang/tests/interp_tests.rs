use std::rc::Rc;

use mindscript_lang::{ErrorKind, Interpreter, MsError, NoBackend, Value};

fn eval(source: &str) -> Value {
    let mut interpreter = Interpreter::new(Rc::new(NoBackend));
    match interpreter.eval_source(source) {
        Ok(value) => value,
        Err(error) => panic!("evaluation failed: {error}\nsource: {source}"),
    }
}

fn eval_err(source: &str) -> MsError {
    let mut interpreter = Interpreter::new(Rc::new(NoBackend));
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected an error, got {value}\nsource: {source}"),
        Err(error) => error,
    }
}

// ── the end-to-end scenarios ─────────────────────────────────────────

#[test]
fn factorial() {
    let v = eval(
        "let factorial = fun(n: Int) -> Int do \
           if n==0 or n==1 do 1 else n*factorial(n-1) end \
         end; factorial(5)",
    );
    assert_eq!(v, Value::int(120));
}

#[test]
fn currying_nested_closures() {
    let v = eval(
        "let mk = fun(n: Int) -> Int -> Int do \
           fun(m: Int) -> Int do n + m end \
         end; mk(5)(3)",
    );
    assert_eq!(v, Value::int(8));
}

#[test]
fn array_destructuring_introduces_bindings() {
    let v = eval("[let x, let y] = [0, 1]; x + y");
    assert_eq!(v, Value::int(1));
}

#[test]
fn point_addition() {
    let v = eval(
        "let p = {x: 1., y: -1.}; let q = {x: -1., y: 1.}; \
         {x: p.x + q.x, y: p.y + q.y}",
    );
    assert_eq!(
        v,
        Value::object(vec![
            ("x".to_string(), Value::num(0.0)),
            ("y".to_string(), Value::num(0.0)),
        ])
    );
}

#[test]
fn closure_backed_range_iterator() {
    let v = eval(
        "let r = fun(s: Int, e: Int) do \
           fun() do if s < e do let v = s; s = s + 1; v else null end end \
         end; \
         let out = []; \
         for let v in r(1,4) do out = out + [v] end; \
         out",
    );
    assert_eq!(
        v,
        Value::array(vec![Value::int(1), Value::int(2), Value::int(3)])
    );
}

#[test]
fn structural_subtyping_judgments() {
    assert_eq!(eval("isSubtype(type [Int], type [Any])"), Value::bool(true));
    assert_eq!(
        eval("isSubtype(type {name: Str}, type {})"),
        Value::bool(true)
    );
    assert_eq!(
        eval("isSubtype(type {}, type {name!: Str})"),
        Value::bool(false)
    );
}

// ── expressions and control flow ─────────────────────────────────────

#[test]
fn block_value_is_the_last_expression() {
    assert_eq!(eval("do 1; 2; 3 end"), Value::int(3));
    assert_eq!(eval("do end"), Value::null());
}

#[test]
fn let_is_an_expression() {
    assert_eq!(eval("(let x = true)"), Value::bool(true));
    assert_eq!(eval("let x = 5; x"), Value::int(5));
}

#[test]
fn conditionals_take_the_first_truthy_arm() {
    assert_eq!(eval("if true do 1 else 2 end"), Value::int(1));
    assert_eq!(eval("if false do 1 elif true do 2 else 3 end"), Value::int(2));
    assert_eq!(eval("if false do 1 end"), Value::null());
}

#[test]
fn only_false_and_null_are_falsy() {
    assert_eq!(eval("if 0 do 1 else 2 end"), Value::int(1));
    assert_eq!(eval("if \"\" do 1 else 2 end"), Value::int(1));
    assert_eq!(eval("if null do 1 else 2 end"), Value::int(2));
    assert_eq!(eval("not null"), Value::bool(true));
    assert_eq!(eval("not 0"), Value::bool(false));
}

#[test]
fn logic_returns_operands() {
    assert_eq!(eval("null or 3"), Value::int(3));
    assert_eq!(eval("2 or 3"), Value::int(2));
    assert_eq!(eval("null and 3"), Value::null());
    assert_eq!(eval("2 and 3"), Value::int(3));
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let v = eval(
        "let n = 0; \
         let bump = fun() do n = n + 1; true end; \
         false and bump(); \
         true or bump(); \
         n",
    );
    assert_eq!(v, Value::int(0));
}

#[test]
fn loops_support_break_and_continue_values() {
    let v = eval(
        "let total = 0; \
         for let x in iter([1, 2, 3, 4]) do \
           if x == 2 do continue(0) end \
           if x == 4 do break(total) end \
           total = total + x \
         end",
    );
    assert_eq!(v, Value::int(4));
}

#[test]
fn loop_value_defaults_to_null_when_empty() {
    assert_eq!(eval("for let x in iter([]) do x end"), Value::null());
}

#[test]
fn for_loop_destructures_object_pairs() {
    let v = eval(
        "let out = []; \
         for [let k, let v] in iter({a: 1, b: 2}) do out = out + [k] end; \
         out",
    );
    assert_eq!(v, Value::array(vec![Value::str("a"), Value::str("b")]));
}

#[test]
fn return_unwinds_nested_blocks() {
    let v = eval(
        "let f = fun(x: Int) do \
           do do return(x + 1) end end; \
           99 \
         end; f(1)",
    );
    assert_eq!(v, Value::int(2));
}

#[test]
fn stray_break_is_an_error() {
    let err = eval_err("do break(1) end");
    assert_eq!(err.kind, ErrorKind::Value);
    let err = eval_err("1 + break(1)");
    assert_eq!(err.kind, ErrorKind::Parse);
}

// ── environments and closures ────────────────────────────────────────

#[test]
fn closures_capture_their_defining_frame() {
    let v = eval(
        "let x = 1; \
         let f = fun() do x end; \
         do let x = 2; f() end",
    );
    assert_eq!(v, Value::int(1));
}

#[test]
fn closures_observe_mutation_of_the_captured_frame() {
    let v = eval(
        "let n = 0; \
         let bump = fun() do n = n + 1 end; \
         bump(); bump(); n",
    );
    assert_eq!(v, Value::int(2));
}

#[test]
fn assignment_needs_a_declared_cell() {
    let err = eval_err("y = 5");
    assert_eq!(err.kind, ErrorKind::Name);
}

#[test]
fn undefined_variable_is_a_name_error() {
    let err = eval_err("nope");
    assert_eq!(err.kind, ErrorKind::Name);
}

#[test]
fn object_destructuring_rebinding_and_nesting() {
    let v = eval("{a: let u, b: [let v, let w]} = {a: 1, b: [2, 3]}; u + v + w");
    assert_eq!(v, Value::int(6));
    let err = eval_err("{missing: let m} = {a: 1}");
    assert_eq!(err.kind, ErrorKind::Value);
}

#[test]
fn array_destructuring_ignores_surplus_elements() {
    assert_eq!(eval("[let x] = [7, 8, 9]; x"), Value::int(7));
    let err = eval_err("[let x, let y] = [1]");
    assert_eq!(err.kind, ErrorKind::Value);
}

// ── values, members, indexes ─────────────────────────────────────────

#[test]
fn member_and_index_places_assign() {
    assert_eq!(eval("let o = {x: 1}; o.x = 5; o.x"), Value::int(5));
    assert_eq!(eval("let o = {}; o.fresh = 1; o.fresh"), Value::int(1));
    assert_eq!(eval("let a = [1, 2]; a[1] = 9; a[1]"), Value::int(9));
}

#[test]
fn negative_indexes_wrap() {
    assert_eq!(eval("[10, 20, 30][-1]"), Value::int(30));
    let err = eval_err("[1, 2][5]");
    assert_eq!(err.kind, ErrorKind::Value);
}

#[test]
fn unknown_property_is_an_error() {
    let err = eval_err("{x: 1}.y");
    assert_eq!(err.kind, ErrorKind::Value);
}

#[test]
fn arrays_and_objects_are_shared_references() {
    assert_eq!(
        eval("let a = [1]; let b = a; push(b, 2); a"),
        Value::array(vec![Value::int(1), Value::int(2)])
    );
    assert_eq!(eval("let o = {x: 1}; let p = o; p.x = 2; o.x"), Value::int(2));
}

#[test]
fn this_is_the_receiver_of_a_member_call() {
    let v = eval(
        "let o = {n: 41, bump: fun() do this.n + 1 end}; \
         o.bump()",
    );
    assert_eq!(v, Value::int(42));
}

#[test]
fn this_is_null_outside_member_calls() {
    let v = eval("let f = fun() do this end; f()");
    assert_eq!(v, Value::null());
}

// ── operators ────────────────────────────────────────────────────────

#[test]
fn arithmetic_keeps_ints_exact() {
    assert_eq!(eval("7 / 2"), Value::int(3));
    assert_eq!(eval("7 % 3"), Value::int(1));
    assert_eq!(eval("2 + 3 * 4"), Value::int(14));
    assert_eq!(eval("1 + 2.5"), Value::num(3.5));
}

#[test]
fn division_by_zero_raises() {
    assert_eq!(eval_err("1 / 0").kind, ErrorKind::Value);
    assert_eq!(eval_err("1.0 / 0.0").kind, ErrorKind::Value);
}

#[test]
fn plus_concatenates_and_merges() {
    assert_eq!(eval("\"ab\" + \"cd\""), Value::str("abcd"));
    assert_eq!(
        eval("[1] + [2]"),
        Value::array(vec![Value::int(1), Value::int(2)])
    );
    assert_eq!(eval("({a: 1} + {a: 2, b: 3}).a"), Value::int(2));
}

#[test]
fn equality_is_deep_and_numeric() {
    assert_eq!(eval("1 == 1.0"), Value::bool(true));
    assert_eq!(eval("[1, [2]] == [1, [2]]"), Value::bool(true));
    assert_eq!(eval("{a: 1, b: 2} == {b: 2, a: 1}"), Value::bool(true));
    assert_eq!(eval("{a: 1} == {a: 2}"), Value::bool(false));
    assert_eq!(eval("type Int? == type Int?"), Value::bool(true));
}

#[test]
fn functions_compare_by_identity() {
    assert_eq!(eval("let f = fun() do 1 end; f == f"), Value::bool(true));
    assert_eq!(
        eval("fun() do 1 end == fun() do 1 end"),
        Value::bool(false)
    );
}

#[test]
fn wrong_operand_types_raise() {
    assert_eq!(eval_err("1 + \"x\"").kind, ErrorKind::Type);
    assert_eq!(eval_err("-\"x\"").kind, ErrorKind::Type);
}

// ── formal types at boundaries ───────────────────────────────────────

#[test]
fn parameter_types_are_enforced() {
    let err = eval_err("let f = fun(n: Int) -> Int do n end; f(\"x\")");
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(err.message.contains("argument"));
}

#[test]
fn return_types_are_enforced() {
    let err = eval_err("let f = fun(n: Int) -> Str do n end; f(1)");
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(err.message.contains("output"));
}

#[test]
fn int_flows_where_num_is_expected() {
    assert_eq!(eval("let f = fun(x: Num) -> Num do x end; f(3)"), Value::int(3));
}

#[test]
fn optional_parameters_accept_null() {
    assert_eq!(
        eval("let f = fun(x: Int?) do x end; f(null)"),
        Value::null()
    );
}

#[test]
fn enum_types_check_membership() {
    let v = eval(
        "let answer = fun(w: Enum(Str, [\"yes\", \"no\"])) -> Str do w end; \
         answer(\"yes\")",
    );
    assert_eq!(v, Value::str("yes"));
    let err = eval_err(
        "let answer = fun(w: Enum(Str, [\"yes\", \"no\"])) -> Str do w end; \
         answer(\"maybe\")",
    );
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn named_types_resolve_recursively() {
    let v = eval(
        "let Tree = type {value!: Int, children!: [Tree]}; \
         isType({value: 1, children: [{value: 2, children: []}]}, Tree)",
    );
    assert_eq!(v, Value::bool(true));
    let v = eval(
        "let Tree = type {value!: Int, children!: [Tree]}; \
         isType({value: 1, children: [{value: \"x\", children: []}]}, Tree)",
    );
    assert_eq!(v, Value::bool(false));
}

#[test]
fn typeof_matches_subtyping() {
    assert_eq!(eval("isSubtype(typeOf(3), type Int)"), Value::bool(true));
    assert_eq!(eval("isSubtype(typeOf([1, 2]), type [Int])"), Value::bool(true));
    assert_eq!(
        eval("isSubtype(typeOf({x: 1}), type {x: Int})"),
        Value::bool(true)
    );
    assert_eq!(
        eval("isSubtype(typeOf(fun(n: Int) -> Int do n end), type Int -> Int)"),
        Value::bool(true)
    );
}

// ── annotations ──────────────────────────────────────────────────────

#[test]
fn annotations_attach_and_survive_rebinding() {
    assert_eq!(eval("let x = # \"the answer\"\n 42; getNote(x)"), Value::str("the answer"));
    assert_eq!(
        eval("let x = # \"note\"\n 1; let y = x; getNote(y)"),
        Value::str("note")
    );
}

#[test]
fn bare_annotations_take_the_rest_of_the_line() {
    assert_eq!(eval("let x = # the answer\n 42; getNote(x)"), Value::str("the answer"));
}

#[test]
fn annotations_do_not_affect_equality() {
    assert_eq!(eval("(# \"a\"\n 1) == 1"), Value::bool(true));
}

#[test]
fn str_renders_annotations_as_comment_lines() {
    assert_eq!(eval("str(# \"hint\"\n 7)"), Value::str("# hint\n7"));
}

// ── currying ─────────────────────────────────────────────────────────

#[test]
fn grouped_and_spread_calls_agree() {
    let v = eval(
        "let add = fun(a: Int, b: Int) -> Int do a + b end; \
         [add(2, 3), add(2)(3)]",
    );
    assert_eq!(v, Value::array(vec![Value::int(5), Value::int(5)]));
}

#[test]
fn partial_application_is_a_function() {
    let v = eval(
        "let add = fun(a: Int, b: Int) -> Int do a + b end; \
         let add2 = add(2); \
         isSubtype(typeOf(add2), type Int -> Int)",
    );
    assert_eq!(v, Value::bool(true));
}

#[test]
fn builtins_curry_too() {
    let v = eval("let halve = pow(0.5); halve(2)");
    // 0.5^2, applied in declaration order
    assert_eq!(v, Value::num(0.25));
}

// ── modules ──────────────────────────────────────────────────────────

#[test]
fn code_import_returns_the_module_environment() {
    let v = eval(
        "let m = codeImport(\"let a = 1; let double = fun(x: Int) -> Int do 2*x end\", \"m\"); \
         m.double(m.a) + 1",
    );
    assert_eq!(v, Value::int(3));
}

#[test]
fn modules_do_not_leak_into_the_caller() {
    let err = eval_err("codeImport(\"let hidden = 1\", \"m\"); hidden");
    assert_eq!(err.kind, ErrorKind::Name);
}

#[test]
fn get_env_snapshots_bindings() {
    assert_eq!(eval("let q = 17; getEnv().q"), Value::int(17));
}

// ── stringification ──────────────────────────────────────────────────

#[test]
fn str_of_scalars_and_containers() {
    assert_eq!(eval("str(1)"), Value::str("1"));
    assert_eq!(eval("str(2.0)"), Value::str("2.0"));
    assert_eq!(eval("str(null)"), Value::str("null"));
    assert_eq!(eval("str([1, 2])"), Value::str("[1, 2]"));
    assert_eq!(eval("str(type [Int])"), Value::str("type [Int]"));
}

#[test]
fn cyclic_values_stringify_and_compare() {
    // a self-referential array must not hang equality or printing
    let v = eval("let a = []; push(a, a); a == a");
    assert_eq!(v, Value::bool(true));
    let v = eval("let a = []; push(a, a); size(str(a)) > 0");
    assert_eq!(v, Value::bool(true));
}
