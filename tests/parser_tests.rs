use ezlang::ast::*;
use ezlang::error::EzError;
use ezlang::lexer::tokenize;
use ezlang::parser::{parse, Parsed};
use ezlang::span::Position;
use pretty_assertions::assert_eq;

fn parse_src(source: &str) -> Parsed {
    parse(tokenize(source).expect("lexer should succeed"))
}

fn parse_ok(source: &str) -> Program {
    let parsed = parse_src(source);
    assert!(parsed.is_clean(), "unexpected errors: {:?}", parsed.errors);
    parsed.program
}

fn first_expr(source: &str) -> SpannedExpr {
    let program = parse_ok(source);
    match program.body.into_iter().next().map(|s| s.node) {
        Some(Stmt::Expr(e)) => e,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

#[test]
fn parse_var_with_and_without_initializer() {
    let program = parse_ok("var a = 1\nvar b");
    assert_eq!(program.body.len(), 2);
    assert_eq!(
        program.body[0].node,
        Stmt::VarDecl {
            name: "a".into(),
            initializer: Some(SpannedExpr::new(
                Expr::Literal(Literal::Number(1.0)),
                Position::new(1, 9)
            )),
        }
    );
    assert_eq!(
        program.body[1].node,
        Stmt::VarDecl {
            name: "b".into(),
            initializer: None,
        }
    );
    assert_eq!(program.body[1].pos, Position::new(2, 1));
}

#[test]
fn parse_precedence_comparison_over_logic() {
    // a < b && c == d || e  ==>  ((a < b) && (c == d)) || e
    let expr = first_expr("a < b && c == d || e");
    match expr.node {
        Expr::Binary { op: BinOp::Or, lhs, .. } => match lhs.node {
            Expr::Binary { op: BinOp::And, lhs, rhs } => {
                assert!(matches!(lhs.node, Expr::Binary { op: BinOp::Lt, .. }));
                assert!(matches!(rhs.node, Expr::Binary { op: BinOp::Eq, .. }));
            }
            other => panic!("expected &&, got {:?}", other),
        },
        other => panic!("expected ||, got {:?}", other),
    }
}

#[test]
fn parse_binary_takes_operator_position() {
    let expr = first_expr("1 +\n  2");
    assert_eq!(expr.pos, Position::new(1, 3));
}

#[test]
fn parse_not_keyword_spelling() {
    let expr = first_expr("not done");
    match expr.node {
        Expr::Unary { op: UnaryOp::Not, operand } => {
            assert_eq!(operand.node, Expr::Ident("done".into()));
        }
        other => panic!("expected unary not, got {:?}", other),
    }
}

#[test]
fn parse_object_literal_with_string_keys() {
    let program = parse_ok("var user = { name: \"Ada\", \"age\": 36 }");
    match &program.body[0].node {
        Stmt::VarDecl {
            initializer: Some(init),
            ..
        } => match &init.node {
            Expr::Object(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["name", "age"]);
                assert_eq!(entries[1].1.node, Expr::Literal(Literal::Number(36.0)));
            }
            other => panic!("expected object, got {:?}", other),
        },
        other => panic!("expected var, got {:?}", other),
    }
}

#[test]
fn parse_function_and_listener() {
    let program = parse_ok(
        "function add(a, b) {\n  return a + b\n}\nlisten \"message\" (msg) {\n  reply msg \"pong\"\n}",
    );
    match &program.body[0].node {
        Stmt::FunctionDecl { name, params, body } => {
            assert_eq!(name, "add");
            assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
            assert!(matches!(body.statements[0].node, Stmt::Return(Some(_))));
        }
        other => panic!("expected function, got {:?}", other),
    }
    match &program.body[1].node {
        Stmt::Listen { event, param, body } => {
            assert_eq!(event, "message");
            assert_eq!(param, "msg");
            assert!(matches!(body.statements[0].node, Stmt::Reply { .. }));
        }
        other => panic!("expected listen, got {:?}", other),
    }
}

#[test]
fn parse_use_and_import() {
    let program = parse_ok("use \"math\" as m\nimport \"lib/util\"");
    assert_eq!(
        program.body[0].node,
        Stmt::Use {
            module: "math".into(),
            alias: "m".into(),
        }
    );
    assert_eq!(
        program.body[1].node,
        Stmt::Import {
            path: "lib/util".into(),
        }
    );
}

#[test]
fn parse_for_requires_in() {
    let parsed = parse_src("for x of items { }");
    match &parsed.errors[0] {
        EzError::UnexpectedToken { expected, found, pos } => {
            assert_eq!(expected, "'in'");
            assert_eq!(found, "'of'");
            assert_eq!(*pos, Position::new(1, 7));
        }
        other => panic!("expected UnexpectedToken, got {:?}", other),
    }
}

#[test]
fn parse_invalid_assignment_target() {
    let parsed = parse_src("1 = 2");
    assert_eq!(
        parsed.errors,
        vec![EzError::InvalidAssignmentTarget {
            pos: Position::new(1, 3)
        }]
    );
}

#[test]
fn parse_recovers_at_next_statement() {
    let parsed = parse_src("var = 5\nvar y = 2\nprint(y)");
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(
        parsed.errors[0],
        EzError::UnexpectedToken {
            expected: "variable name".into(),
            found: "'='".into(),
            pos: Position::new(1, 5),
        }
    );
    assert!(matches!(
        parsed.program.body[0].node,
        Stmt::VarDecl { ref name, .. } if name == "y"
    ));
    assert!(matches!(parsed.program.body[1].node, Stmt::Expr(_)));
}

#[test]
fn parse_unclosed_block_reports_end_of_input() {
    let parsed = parse_src("function f() {\n  var a = 1\n");
    assert!(!parsed.is_clean());
    match parsed.errors.last() {
        Some(EzError::UnexpectedToken { found, .. }) => assert_eq!(found, "end of input"),
        other => panic!("expected UnexpectedToken, got {:?}", other),
    }
    assert!(parsed.into_result().is_err());
}
