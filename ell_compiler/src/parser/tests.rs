use proptest::prelude::*;

use super::{ast::*, expected::Expected, parse, Parser, LOOKAHEAD};
use crate::{
    errors::{CompileError, ErrorKind, SourceBuffer, Span},
    lexer::{keyword::Keyword, token::TokenKind},
};

/// Creates a parser over a source stream.
macro_rules! parser {
    ($parser:ident, $src:expr) => {
        let source = SourceBuffer::new($src, None);
        let mut $parser = Parser::new(&source);
    };
}

fn parse_str(src: &str) -> Result<Script, CompileError> {
    parse(&SourceBuffer::new(src, None))
}

fn parse_ok(src: &str) -> Script {
    match parse_str(src) {
        Ok(script) => script,
        Err(err) => panic!("failed to parse {:?}: {}", src, err),
    }
}

fn parse_err(src: &str) -> CompileError {
    parse_str(src).expect_err("Expected a failed parse")
}

/// Parses a single expression statement and unparses it.
fn expr(src: &str) -> String {
    let script = parse_ok(src);
    assert_eq!(script.statements.len(), 1, "{:?}", script);

    match &script.statements[0].kind {
        StatementKind::Expression(expr) => expr.to_string(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

/// Unparsing then parsing again must be a fixpoint.
fn assert_round_trip(src: &str) {
    let first = parse_ok(src).to_string();
    let second = parse_ok(&first).to_string();
    assert_eq!(first, second, "unparse of {:?} is not stable", src);
}

#[test]
fn eat_keyword() {
    parser!(parser, "fn");

    // Let isn't here
    assert!(!parser.eat(Expected::Keyword(Keyword::Let)));
    // Shouldn't have eaten our token
    assert_eq!(parser.pos, 0);
    // Fn should be here
    assert!(parser.eat(Expected::Keyword(Keyword::Fn)));
    // Should've eaten our token
    assert_eq!(parser.pos, 1);
    // No longer here
    assert!(!parser.eat(Expected::Keyword(Keyword::Fn)));
    // EOF is sticky
    assert!(parser.eat(Expected::Eof));
    assert!(parser.eat(Expected::Eof));
}

#[test]
fn tokens_are_pulled_as_needed() {
    parser!(parser, "a b c d e f");

    assert_eq!(parser.lookahead.len(), LOOKAHEAD);
    parser.bump();
    assert_eq!(parser.pos, 1);
    assert_eq!(parser.look(3).kind, TokenKind::Ident("e".into()));

    // The parser gives up before the lexer ever reaches `∅`
    let err = parse_err("let = 1\nlet b = 2\nlet c = ∅");
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.span.start, 4);

    // A lex error the parser runs into is reported as such
    let err = parse_err("let a = ∅");
    assert_eq!(err.kind, ErrorKind::Lex);
    assert_eq!(err.span, Span::new(8, 9));
}

#[test]
fn unexpected_token() {
    parser!(parser, "fujiwara no 12345");

    // Should be cleared by `parser.bump()`
    parser.expected_items.insert(Expected::Expression);
    parser.bump();
    parser.bump();
    parser.expected_items.insert(Expected::Ident);
    let err = parser.unexpected();

    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.message, "unexpected token `12345`");
    assert_eq!(err.notes().collect::<Vec<_>>(), ["expected identifier"]);
}

#[test]
fn unexpected_eof() {
    parser!(parser, "mokou x ");

    parser.bump();
    parser.bump();
    let err = parser.unexpected();

    assert_eq!(err.message, "unexpected end of file");
    assert_eq!(err.span.start, 8);
}

#[test]
fn expected_name_is_reported() {
    let err = parse_err("interface { }");
    assert_eq!(err.message, "expected interface name, found `{`");
    assert_eq!(err.to_string(), "expected interface name, found `{` (1:11)");
}

#[test]
fn empty_script() {
    assert!(parse_ok("").statements.is_empty());
    assert!(parse_ok("\n// nothing\n;;").statements.is_empty());
}

#[test]
fn single_variable_declaration() {
    let script = parse_ok("let a = 1");
    assert_eq!(script.statements.len(), 1);

    match &script.statements[0].kind {
        StatementKind::Variable(VariableDecl {
            public: false,
            constant: false,
            name,
            kind: None,
            init: Some(Expression {
                kind: ExpressionKind::Number(n),
                ..
            }),
        }) => {
            assert_eq!(name.name, "a");
            assert_eq!(*n, 1.0);
        },

        other => panic!("unexpected statement {:?}", other),
    }

    assert_eq!(script.statements[0].span.start, 0);
    assert_eq!(script.statements[0].span.end, 9);
}

#[test]
fn variable_declarations_need_a_type_or_value() {
    assert_eq!(parse_err("let a").kind, ErrorKind::Parse);
    assert!(parse_ok("let a: number").statements.len() == 1);
    assert!(parse_err("const c: number").message.contains("needs a value"));
}

#[test]
fn inferred_array_length() {
    assert_round_trip("let a: []number = [1, 2]");
    assert!(parse_err("let a: []number").message.contains("inferred length"));
    assert!(parse_err("fn f(x: []number) {}").message.contains("inferred length"));
    assert!(parse_err("let a: [][]number = [[1]]").message.contains("inferred length"));
    assert!(parse_err("type T = []number").message.contains("inferred length"));
}

#[test]
fn statement_boundaries() {
    assert_eq!(parse_ok("let a = 1; let b = 2").statements.len(), 2);
    assert_eq!(parse_ok("let a = 1\nlet b = 2").statements.len(), 2);
    assert_eq!(parse_ok("fn f() {} fn g() {}").statements.len(), 2);
    assert_eq!(parse_ok("fn f() { a; b;; }").statements.len(), 1);
    assert_eq!(parse_ok("fn f() { return }").statements.len(), 1);

    let err = parse_err("let a = 1 let b = 2");
    assert_eq!(err.message, "expected `;` or a line break");
    assert_eq!(err.span.start, 10);
}

#[test]
fn terminators_before_brace_and_eof_are_optional() {
    let variants = [
        "fn f() { a = 1; b() }",
        "fn f() { a = 1; b(); }",
        "fn f() { a = 1\nb()\n}",
        "fn f() { a = 1\n b();; }\n",
    ];

    let expected = parse_ok(variants[0]).to_string();

    for variant in &variants[1..] {
        assert_eq!(parse_ok(variant).to_string(), expected, "{:?}", variant);
    }

    assert_eq!(parse_ok("let x = 1").to_string(), parse_ok("let x = 1;\n").to_string());
}

#[test]
fn precedence() {
    assert_eq!(expr("a + b * c"), "(a + (b * c))");
    assert_eq!(expr("a * b + c"), "((a * b) + c)");
    assert_eq!(expr("a - b - c"), "((a - b) - c)");
    assert_eq!(expr("a < b == c > d"), "((a < b) == (c > d))");
    assert_eq!(expr("a | b ^ c & d"), "(a | (b ^ (c & d)))");
    assert_eq!(expr("!a && b || c"), "(((!a) && b) || c)");
    assert_eq!(expr("-a.b(1)[2]"), "(-a.b(1)[2])");
    assert_eq!(expr("x++ + ++y"), "((x++) + (++y))");
    assert_eq!(expr("~-x % 2"), "((~(-x)) % 2)");
}

#[test]
fn assignment_is_right_associative() {
    let script = parse_ok("a = b = c + 1");
    assert_eq!(script.to_string(), "a = (b = (c + 1))\n");
}

#[test]
fn pointer_operators() {
    assert_eq!(expr("a * *b"), "(a * (*b))");
    assert_eq!(expr("a & &b"), "(a & (&b))");
    assert_eq!(expr("*p = 1"), "((*p) = 1)");
    // A statement may start with `*` even after a closing brace
    assert_eq!(parse_ok("fn f() {\n if x {}\n *p = 2\n}").statements.len(), 1);
}

#[test]
fn postfix_operators_stop_at_newlines() {
    assert_eq!(parse_ok("a\n(b)").statements.len(), 2);
    assert_eq!(parse_ok("a\n[1]").statements.len(), 2);
    assert_eq!(parse_ok("a\n++b").statements.len(), 2);
    assert_eq!(expr("a\n+ b"), "(a + b)");
    assert_eq!(expr("a\n.b"), "a.b");
}

#[test]
fn struct_literals() {
    assert_eq!(expr("P{x: 1, y: 2}"), "P{x: 1, y: 2}");
    assert_eq!(expr("P{\n x: 1\n y: {z: 2}\n}"), "P{x: 1, y: {z: 2}}");

    let script = parse_ok("let x: B = { a: 1, b: \"s\" }");
    match &script.statements[0].kind {
        StatementKind::Variable(VariableDecl {
            init: Some(Expression {
                kind: ExpressionKind::Struct(None, fields),
                ..
            }),
            ..
        }) => assert_eq!(fields.len(), 2),

        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn no_struct_literals_in_headers() {
    let script = parse_ok("fn f() { for x { break } }");

    match &script.statements[0].kind {
        StatementKind::Function(FunctionDecl { body, .. }) => match &body.statements[0].kind {
            StatementKind::For(ForStatement {
                kind: ForKind::While(cond),
                ..
            }) => assert_eq!(cond.to_string(), "x"),

            other => panic!("unexpected statement {:?}", other),
        },

        other => panic!("unexpected statement {:?}", other),
    }

    assert_eq!(parse_ok("if x {} else {}").statements.len(), 1);
    // Parentheses lift the restriction
    assert_round_trip("if (P{a: 1}).a {}");
    assert_round_trip("if f(P{a: 1}) {}");
}

#[test]
fn struct_literals_in_loop_headers_keep_their_parentheses() {
    let update = |src: &str| match parse_ok(src).statements.remove(0).kind {
        StatementKind::For(ForStatement {
            kind: ForKind::CStyle { update: Some(update), .. },
            body,
            ..
        }) => {
            assert_eq!(body.statements.len(), 1, "body of {:?} swallowed", src);
            update.to_string()
        },

        other => panic!("unexpected statement {:?}", other),
    };

    let src = "for ; ; x = (S{}) { break }";
    let first = parse_ok(src).to_string();
    assert_eq!(update(src), update(&first));
    assert_round_trip(src);

    assert_round_trip("for let s = (S{a: 1}); s.a < 3; s = ({a: 2}) { break }");
    assert_round_trip("for let s: S = ({a: 1}); ; (S{a: 1}).f() { break }");
    assert_round_trip("for (P{a: 1}).a = 2; ; { break }");
    assert_round_trip("for x = (P{a: 1}).a { break }");
}

#[test]
fn labels() {
    let script = parse_ok("for l: for { break l }");
    assert_eq!(script.statements.len(), 1);

    match &script.statements[0].kind {
        StatementKind::For(ForStatement {
            label: Some(label),
            kind: ForKind::Infinite,
            body,
        }) => {
            assert_eq!(label.name, "l");

            match &body.statements[0].kind {
                StatementKind::Break(Some(target)) => assert_eq!(target.name, "l"),
                other => panic!("unexpected statement {:?}", other),
            }
        },

        other => panic!("unexpected statement {:?}", other),
    }

    assert_eq!(parse_ok("l: for { continue l }").to_string(), "l: for {\ncontinue l\n}\n");
    assert_eq!(parse_ok("outer: for x : xs { for { break outer } }").statements.len(), 1);
}

#[test]
fn labels_only_attach_to_loops() {
    let err = parse_err("l: let x = 1");
    assert_eq!(err.message, "expected `for` after label `l`");

    let err = parse_err("for a: for b: for {}");
    assert_eq!(err.message, "a loop can only have one label");
}

#[test]
fn break_and_continue_need_a_loop() {
    let err = parse_err("fn f() { break }");
    assert_eq!(err.kind, ErrorKind::LabelNotInLoop);

    let err = parse_err("for { continue nope }");
    assert_eq!(err.kind, ErrorKind::LabelNotInLoop);
    assert_eq!(err.message, "no enclosing loop is labelled `nope`");

    // Labels don't leak into function literals
    let err = parse_err("l: for { let f = fn() { break l } }");
    assert_eq!(err.kind, ErrorKind::LabelNotInLoop);

    // Labels go out of scope with their loop
    let err = parse_err("l: for {}\nfor { break l }");
    assert_eq!(err.kind, ErrorKind::LabelNotInLoop);
}

#[test]
fn for_shapes() {
    let shapes = |src: &str| match &parse_ok(src).statements[0].kind {
        StatementKind::For(ForStatement { kind, .. }) => kind.clone(),
        other => panic!("unexpected statement {:?}", other),
    };

    assert!(matches!(shapes("for {}"), ForKind::Infinite));
    assert!(matches!(shapes("for a < b {}"), ForKind::While(_)));
    assert!(matches!(
        shapes("for x : xs {}"),
        ForKind::Iterate { index: None, .. }
    ));
    assert!(matches!(
        shapes("for x, i : xs {}"),
        ForKind::Iterate { index: Some(_), .. }
    ));
    assert!(matches!(
        shapes("for let i = 0; i < 3; i++ {}"),
        ForKind::CStyle {
            init: Some(_),
            cond: Some(_),
            update: Some(_),
        }
    ));
    assert!(matches!(
        shapes("for ; ; {}"),
        ForKind::CStyle {
            init: None,
            cond: None,
            update: None,
        }
    ));
}

#[test]
fn type_declarations() {
    let body = |src: &str| match &parse_ok(src).statements[0].kind {
        StatementKind::Type(decl) => decl.body.clone(),
        other => panic!("unexpected statement {:?}", other),
    };

    assert!(matches!(body("type T = number"), TypeBody::Alias(_)));
    assert!(matches!(body("type T [4]number"), TypeBody::Alias(_)));
    assert!(matches!(body("type F = fn(number, ..[..]string) -> bool"), TypeBody::Alias(_)));
    assert!(matches!(body("type E {A, B}"), TypeBody::Enum(choices) if choices.len() == 2));
    assert!(matches!(body("type E {\n A\n B\n}"), TypeBody::Enum(choices) if choices.len() == 2));
    assert!(matches!(body("enum E {A}"), TypeBody::Enum(_)));
    assert!(matches!(body("type S {}"), TypeBody::Struct { .. }));

    match body("type B extends A, m.C { b: string }") {
        TypeBody::Struct {
            implements: None,
            extends,
            props,
        } => {
            assert_eq!(extends.len(), 2);
            assert_eq!(props[0].name.name, "b");
        },

        other => panic!("unexpected body {:?}", other),
    }

    match body("struct S: I { v: number, w: [..]S }") {
        TypeBody::Struct {
            implements: Some(_),
            props,
            ..
        } => assert_eq!(props.len(), 2),

        other => panic!("unexpected body {:?}", other),
    }

    match body("interface I extends J { f(x: number) -> bool\n g: fn() }") {
        TypeBody::Interface { extends, props } => {
            assert_eq!(extends.len(), 1);
            assert_eq!(props[0].kind.to_string(), "fn(x: number) -> bool");
            assert_eq!(props[1].kind.to_string(), "fn()");
        },

        other => panic!("unexpected body {:?}", other),
    }
}

#[test]
fn enums_cannot_have_extras() {
    let err = parse_err("type E: I { A, B }");
    assert_eq!(err.kind, ErrorKind::EnumWithExtras);
    assert_eq!(err.span.start, 5);

    assert_eq!(parse_err("type E extends F { A }").kind, ErrorKind::EnumWithExtras);
}

#[test]
fn methods() {
    let script = parse_ok("fn S f(x: number) -> bool { return true }\nimpl S { fn g() {} fn h() {} }");

    match &script.statements[0].kind {
        StatementKind::Function(FunctionDecl {
            target: Some(target),
            name,
            ..
        }) => {
            assert_eq!(target.name, "S");
            assert_eq!(name.name, "f");
        },

        other => panic!("unexpected statement {:?}", other),
    }

    match &script.statements[1].kind {
        StatementKind::Impl(ImplBlock { target, methods }) => {
            assert_eq!(target.name, "S");
            assert_eq!(methods.len(), 2);
        },

        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn rest_parameters_come_last() {
    assert_round_trip("fn f(a: number, ..rest: [..]number) {}");

    let err = parse_err("fn f(..rest: [..]number, a: number) {}");
    assert_eq!(err.message, "unexpected parameter after a rest parameter");
}

#[test]
fn declarations_are_top_level_only() {
    assert!(parse_err("fn f() { pub let x = 1 }").message.contains("top level"));
    assert!(parse_err("fn f() { type T = number }").message.contains("top level"));
    assert!(parse_err("fn f() { fn g() {} }").message.contains("top level"));
    assert!(parse_err("fn f() { import \"a\" as a }").message.contains("top level"));
    assert_eq!(parse_err("return 1").message, "`return` outside of a function");
}

#[test]
fn imports() {
    let script = parse_ok("import \"./util\" as util");

    match &script.statements[0].kind {
        StatementKind::Import(Import { path, alias, .. }) => {
            assert_eq!(path, "./util");
            assert_eq!(alias.name, "util");
        },

        other => panic!("unexpected statement {:?}", other),
    }

    assert_eq!(parse_err("import util").message, "expected import path, found `util`");
}

#[test]
fn kind_expressions() {
    let kind = |src: &str| match &parse_ok(src).statements[0].kind {
        StatementKind::Type(TypeDecl {
            body: TypeBody::Alias(kind),
            ..
        }) => kind.to_string(),
        other => panic!("unexpected statement {:?}", other),
    };

    assert_eq!(kind("type T = [3][..]byte"), "[3][..]byte");
    assert_eq!(kind("type T = fn(self, ..xs: [..]any) -> self"), "fn(self, ..xs: [..]any) -> self");
    assert_eq!(kind("type T = struct<-A, b.B {x: char}"), "struct<-A, b.B {x: char}");
    assert_eq!(kind("type T = a.b.C"), "a.b.C");
    assert!(parse_err("type T = [1.5]number").message.contains("array length"));
}

#[test]
fn script_round_trip() {
    assert_round_trip(
        r#"
        import "lib/util" as util
        pub type Point { x: number, y: number }
        type Shape: Drawable extends Base, util.Thing { name: string }
        enum Color { Red, Green, Blue }
        interface Drawable extends Base { draw(on: Canvas) -> bool }
        type Callback = fn(number) -> void_like
        pub const origin = Point{x: 0, y: 0}
        let scale: number = 2
        let names: [..]string = ["a", "b\n", """raw"""]

        fn Point len() -> number {
            return self.x * self.x + self.y * self.y
        }

        impl Point {
            fn add(other: Point) -> Point {
                return Point{x: self.x + other.x, y: self.y + other.y}
            }
        }

        pub fn main(..args: [..]string) {
            let total = 0
            outer: for x, i : args {
                for let j = 0; j < i; j++ {
                    if j == 3 { continue outer } else if j > 4 { break outer } else { total = total + 1 }
                }
            }
            for { break }
            for total < 10 { total++ }
            let f = fn(c: char) -> bool { return c == 'x' }
            ({a: 1}).a
            *(&total) = ~total ^ -1
            {
                util.log(names[0], Color.Red, null, true, false)
            }
        }
        "#,
    );
}

fn identifier() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "foo", "$x", "_y"]).prop_map(str::to_owned)
}

fn arb_expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        identifier(),
        (0u32..1000).prop_map(|n| n.to_string()),
        "[a-z ]{0,8}".prop_map(|s| format!("\"{}\"", s)),
        Just("true".to_owned()),
        Just("null".to_owned()),
        Just("self".to_owned()),
        Just("'c'".to_owned()),
    ];

    leaf.prop_recursive(4, 32, 4, |inner| {
        let binary_ops = prop::sample::select(vec![
            "+", "-", "*", "/", "%", "<", "<=", ">", ">=", "==", "!=", "&", "^", "|", "&&", "||",
        ]);
        let prefix_ops = prop::sample::select(vec!["!", "~", "-", "+", "&", "*", "++", "--"]);

        prop_oneof![
            (inner.clone(), binary_ops, inner.clone()).prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            (prefix_ops, inner.clone()).prop_map(|(op, x)| format!("{}({})", op, x)),
            inner.clone().prop_map(|x| format!("({})++", x)),
            (inner.clone(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(f, args)| format!("({})({})", f, args.join(", "))),
            (inner.clone(), identifier()).prop_map(|(x, name)| format!("({}).{}", x, name)),
            (inner.clone(), inner.clone()).prop_map(|(x, i)| format!("({})[{}]", x, i)),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|xs| format!("[{}]", xs.join(", "))),
            (identifier(), inner.clone()).prop_map(|(name, x)| format!("P{{{}: {}}}", name, x)),
            (identifier(), inner).prop_map(|(name, x)| format!("({} = {})", name, x)),
        ]
    })
}

/// Single statements whose expressions may need parentheses to stay out
/// of a header's body.
fn arb_statement() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_expression().prop_map(|e| format!("let v = {}", e)),
        arb_expression().prop_map(|e| format!("({})", e)),
        arb_expression().prop_map(|e| format!("v = ({})", e)),
        (arb_expression(), arb_expression()).prop_map(|(c, d)| format!("if ({}) {{}} else if ({}) {{}}", c, d)),
        arb_expression().prop_map(|c| format!("for ({}) {{ break }}", c)),
        (arb_expression(), arb_expression(), arb_expression())
            .prop_map(|(i, c, u)| format!("for let v = ({}); ({}); v = ({}) {{ break }}", i, c, u)),
        (arb_expression(), arb_expression()).prop_map(|(i, u)| format!("for ({}); ; ({}) {{ break }}", i, u)),
        arb_expression().prop_map(|t| format!("for x, i : ({}) {{}}", t)),
    ]
}

proptest! {
    #[test]
    fn fuzz(src in ".{0,1024}") {
        let _ = parse_str(&src);
    }

    #[test]
    fn expression_round_trip(src in arb_expression()) {
        let src = format!("let v = {}", src);
        let first = parse_str(&src).expect("Expected a successful parse").to_string();
        let second = parse_str(&first).expect("Expected a successful reparse").to_string();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn statement_round_trip(src in arb_statement()) {
        let first = parse_str(&src).expect("Expected a successful parse").to_string();
        let second = match parse_str(&first) {
            Ok(res) => res.to_string(),
            Err(err) => panic!("unparse of {:?} doesn't parse: {:?}\n{}", src, first, err),
        };

        prop_assert_eq!(first, second);
    }

    #[test]
    fn spans_stay_in_bounds(src in arb_expression()) {
        let source = SourceBuffer::new(format!("let v = {}", src), None);
        let script = parse(&source).expect("Expected a successful parse");

        for statement in &script.statements {
            prop_assert!(statement.span.start <= statement.span.end);
            prop_assert!(statement.span.end <= source.len());
        }
    }
}
