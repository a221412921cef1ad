use mindscript_lang::ast::{ExprKind, Prim, TypeExprKind};
use mindscript_lang::parser::{parse, parse_interactive};
use mindscript_lang::ErrorKind;

#[test]
fn a_program_is_a_sequence_of_expressions() {
    let program = parse("let x = 1\nlet y = 2; x + y").unwrap();
    assert_eq!(program.len(), 3);
}

#[test]
fn annotations_prefix_expressions() {
    let program = parse("# the answer\n42").unwrap();
    match &program[0].kind {
        ExprKind::Annotate { note, expr } => {
            assert_eq!(note, "the answer");
            assert!(matches!(expr.kind, ExprKind::Int(42)));
        }
        _ => panic!("expected an annotation"),
    }
}

#[test]
fn multi_line_annotations_fold() {
    let program = parse("# first line\n# second line\n1").unwrap();
    match &program[0].kind {
        ExprKind::Annotate { note, .. } => assert_eq!(note, "first line\nsecond line"),
        _ => panic!("expected an annotation"),
    }
}

#[test]
fn object_members_can_be_annotated() {
    let program = parse("{# the x coordinate\n x: 1}").unwrap();
    match &program[0].kind {
        ExprKind::Object(items) => {
            assert_eq!(items.len(), 1);
            assert!(matches!(items[0].1.kind, ExprKind::Annotate { .. }));
        }
        _ => panic!("expected an object"),
    }
}

#[test]
fn member_access_accepts_strings_and_keywords() {
    let program = parse("obj.\"a key\".type").unwrap();
    match &program[0].kind {
        ExprKind::Member { expr, name } => {
            assert_eq!(name, "type");
            assert!(matches!(&expr.kind, ExprKind::Member { name, .. } if name == "a key"));
        }
        _ => panic!("expected a member access"),
    }
}

#[test]
fn chained_postfix_operators() {
    let program = parse("rows[0].cells[1](x)").unwrap();
    assert!(matches!(program[0].kind, ExprKind::Call { .. }));
}

#[test]
fn oracle_literals_carry_examples() {
    let program = parse("oracle(x: Int) -> Str from [[1, \"one\"]]").unwrap();
    match &program[0].kind {
        ExprKind::Oracle(def) => {
            assert_eq!(def.params.len(), 1);
            assert_eq!(def.params[0].name, "x");
            assert!(def.examples.is_some());
            assert!(matches!(def.ret_ty.kind, TypeExprKind::Prim(Prim::Str)));
        }
        _ => panic!("expected an oracle literal"),
    }
}

#[test]
fn oracle_without_arrow_defaults_to_any() {
    let program = parse("oracle(x: Int)").unwrap();
    match &program[0].kind {
        ExprKind::Oracle(def) => {
            assert!(matches!(def.ret_ty.kind, TypeExprKind::Prim(Prim::Any)))
        }
        _ => panic!("expected an oracle literal"),
    }
}

#[test]
fn parameters_can_carry_annotations() {
    let program = parse("fun(# a number\n x: Int) do x end").unwrap();
    match &program[0].kind {
        ExprKind::Lambda(lambda) => {
            assert_eq!(lambda.param_ty.note.as_deref(), Some("a number"));
        }
        _ => panic!("expected a lambda"),
    }
}

#[test]
fn destructuring_targets_parse() {
    let program = parse("[let a, {b: let c}] = rows").unwrap();
    assert!(matches!(program[0].kind, ExprKind::Assign { .. }));
}

#[test]
fn nested_member_assignment_targets_parse() {
    let program = parse("grid.rows[0] = 1").unwrap();
    match &program[0].kind {
        ExprKind::Assign { target, .. } => {
            assert!(matches!(target.kind, ExprKind::Index { .. }))
        }
        _ => panic!("expected an assignment"),
    }
}

#[test]
fn enum_type_expressions_parse() {
    let program = parse("type Enum(Str, [\"a\", \"b\"])").unwrap();
    match &program[0].kind {
        ExprKind::TypeLit(ty) => assert!(matches!(ty.kind, TypeExprKind::Enum { .. })),
        _ => panic!("expected a type literal"),
    }
}

#[test]
fn parenthesized_arrow_types_group() {
    let program = parse("type (Int -> Int) -> Str").unwrap();
    match &program[0].kind {
        ExprKind::TypeLit(ty) => match &ty.kind {
            TypeExprKind::Arrow(left, right) => {
                assert!(matches!(left.kind, TypeExprKind::Arrow(..)));
                assert!(matches!(right.kind, TypeExprKind::Prim(Prim::Str)));
            }
            _ => panic!("expected an arrow type"),
        },
        _ => panic!("expected a type literal"),
    }
}

#[test]
fn type_atoms_outside_type_position_are_rejected() {
    let err = parse("Int + 1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.message.contains("type"));
}

#[test]
fn errors_carry_positions() {
    let err = parse("let = 5").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    let span = err.span.expect("parse errors have spans");
    assert_eq!(span.start, 4);
}

#[test]
fn lex_errors_surface_with_kind() {
    let err = parse("let x = \u{1}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lex);
}

#[test]
fn comments_do_not_reach_the_grammar() {
    let program = parse("## heading\n1 ## trailing\n2").unwrap();
    assert_eq!(program.len(), 2);
}

#[test]
fn incomplete_interactive_input() {
    for source in ["fun(x: Int) do", "if x do 1", "[1, 2", "{a: 1,", "# note"] {
        let err = parse_interactive(source).unwrap_err();
        assert!(err.is_incomplete(), "expected incomplete for {source:?}");
    }
}

#[test]
fn complete_interactive_errors_are_not_incomplete() {
    let err = parse_interactive("let = 5").unwrap_err();
    assert!(!err.is_incomplete());
}
