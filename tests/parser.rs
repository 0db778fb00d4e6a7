use pretty_assertions::assert_eq;

use shrav::ast::*;
use shrav::error::ShravError;
use shrav::parser::parse_source;

fn parse_expr(source: &str) -> Expr {
    let program = parse_source(source).expect("source should parse");
    match program.statements.into_iter().next() {
        Some(Stmt::Expression(expr)) => expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

fn int(n: i64) -> Expr {
    Expr::Literal(LiteralValue::Integer(n))
}

fn var(name: &str) -> Expr {
    Expr::Variable {
        name: name.to_owned(),
        line: 1,
    }
}

fn bin(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        line: 1,
    }
}

fn parse_error(source: &str) -> (String, String) {
    match parse_source(source) {
        Err(ShravError::Parse { message, found, .. }) => (message, found),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn multiplicative_binds_tighter_than_additive() {
    assert_eq!(
        parse_expr("1 + 2 * 3"),
        bin(int(1), BinaryOp::Add, bin(int(2), BinaryOp::Multiply, int(3)))
    );
}

#[test]
fn power_is_right_associative_and_above_unary() {
    assert_eq!(
        parse_expr("2 ** 3 ** 2"),
        bin(int(2), BinaryOp::Power, bin(int(3), BinaryOp::Power, int(2)))
    );

    // -2 ** 2 negates the power
    assert_eq!(
        parse_expr("-2 ** 2"),
        Expr::Unary {
            operator: UnaryOp::Negate,
            operand: Box::new(bin(int(2), BinaryOp::Power, int(2))),
            line: 1,
        }
    );
}

#[test]
fn logical_operators_sit_below_equality() {
    assert_eq!(
        parse_expr("a == 1 or not b and c"),
        bin(
            bin(var("a"), BinaryOp::Equal, int(1)),
            BinaryOp::Or,
            bin(
                Expr::Unary {
                    operator: UnaryOp::Not,
                    operand: Box::new(var("b")),
                    line: 1,
                },
                BinaryOp::And,
                var("c")
            )
        )
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        parse_expr("a = b = 1"),
        Expr::Assign {
            target: Box::new(var("a")),
            value: Box::new(Expr::Assign {
                target: Box::new(var("b")),
                value: Box::new(int(1)),
                line: 1,
            }),
            line: 1,
        }
    );
}

#[test]
fn postfix_chain_is_left_to_right() {
    assert_eq!(
        parse_expr("a.b[0](1)"),
        Expr::Call {
            callee: Box::new(Expr::Index {
                object: Box::new(Expr::Property {
                    object: Box::new(var("a")),
                    name: "b".to_owned(),
                    line: 1,
                }),
                index: Box::new(int(0)),
                line: 1,
            }),
            arguments: vec![int(1)],
            line: 1,
        }
    );
}

#[test]
fn lambda_and_parenthesized_expressions_are_distinguished() {
    match parse_expr("(a, b) => a + b") {
        Expr::Lambda(decl) => {
            assert_eq!(decl.params, vec!["a", "b"]);
            assert_eq!(decl.body.len(), 1);
            assert!(matches!(decl.body[0], Stmt::Return { .. }));
        }
        other => panic!("expected lambda, got {:?}", other),
    }

    assert!(matches!(parse_expr("() => { return 1 }"), Expr::Lambda(_)));
    assert_eq!(parse_expr("(a)"), var("a"));
}

#[test]
fn dict_literals_keep_source_order() {
    assert_eq!(
        parse_expr("{b: 1, \"a\": 2}"),
        Expr::Dict(vec![("b".to_owned(), int(1)), ("a".to_owned(), int(2))])
    );
    assert_eq!(parse_expr("{}"), Expr::Dict(Vec::new()));
}

#[test]
fn statements_by_leading_keyword() {
    let program = parse_source(
        r#"
        let x = 1;
        fn f(a) { return a }
        class P { fn init(v) { this.v = v } }
        if x { print 1 } elif y { print 2 } else { print 3 }
        for i in 0..3 { continue }
        while false { break }
        switch x { case 1 { print "one" } default { print "other" } }
        with open() as h { print h }
        try { boom() } catch (e) { print e }
        import mathex
        import "util"
        "#,
    )
    .unwrap();

    let kinds: Vec<&str> = program
        .statements
        .iter()
        .map(|stmt| match stmt {
            Stmt::Let { .. } => "let",
            Stmt::Function(_) => "fn",
            Stmt::Class { .. } => "class",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::While { .. } => "while",
            Stmt::Switch { .. } => "switch",
            Stmt::With { .. } => "with",
            Stmt::Try { .. } => "try",
            Stmt::Import { .. } => "import",
            _ => "other",
        })
        .collect();

    assert_eq!(
        kinds,
        vec!["let", "fn", "class", "if", "for", "while", "switch", "with", "try", "import", "import"]
    );

    match &program.statements[3] {
        Stmt::If {
            branches,
            else_branch,
        } => {
            assert_eq!(branches.len(), 2);
            assert!(else_branch.is_some());
        }
        other => panic!("expected if, got {:?}", other),
    }

    match &program.statements[10] {
        Stmt::Import { module, .. } => assert_eq!(module, "util"),
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn catch_parentheses_are_optional() {
    let program = parse_source("try { x } catch e { print e }").unwrap();
    assert!(matches!(
        &program.statements[0],
        Stmt::Try { catch_name, .. } if catch_name == "e"
    ));
}

#[test]
fn invalid_assignment_target_is_rejected() {
    let (message, found) = parse_error("1 = 2");
    assert_eq!(message, "Invalid assignment target");
    assert_eq!(found, "=");

    assert!(parse_source("this = 1").is_err());
}

#[test]
fn for_loop_requires_in_and_range() {
    let (message, _) = parse_error("for i 0..3 { }");
    assert_eq!(message, "Expected 'in' keyword in for loop");

    let (message, _) = parse_error("for i in 3 { }");
    assert_eq!(message, "Expected '..' operator in range");
}

#[test]
fn stray_control_statements_are_rejected() {
    let (message, found) = parse_error("break");
    assert_eq!(message, "Expected 'break' to appear inside a loop");
    assert_eq!(found, "break");

    assert!(parse_source("fn f() { continue }").is_err());
    assert!(parse_source("while true { fn g() { break } }").is_err());
    assert!(parse_source("return 1").is_err());

    assert!(parse_source("while true { if x { break } }").is_ok());
    assert!(parse_source("let f = () => { return 1 }").is_ok());
}

#[test]
fn switch_allows_a_single_default() {
    let (message, _) = parse_error("switch x { default { } default { } }");
    assert_eq!(message, "Expected at most one 'default' in switch statement");
}

#[test]
fn errors_report_position_of_the_offending_token() {
    match parse_source("let x = 1\nlet = 2") {
        Err(ShravError::Parse {
            line, column, found, ..
        }) => {
            assert_eq!((line, column), (2, 5));
            assert_eq!(found, "=");
        }
        other => panic!("expected parse error, got {:?}", other),
    }

    let (_, found) = parse_error("print (1 + ");
    assert_eq!(found, "end of input");
}

#[test]
fn parsing_is_deterministic() {
    let source = "fn f(n) { if n < 2 { return n } return f(n - 1) + f(n - 2) }";
    assert_eq!(parse_source(source).unwrap(), parse_source(source).unwrap());
}
