use proptest::prelude::*;

use super::{
    keyword::{Constant, Keyword},
    token::{DelimKind, Symbol, Token, TokenKind},
    tokenize, Lexer,
};
use crate::errors::{CompileError, ErrorKind, SourceBuffer, Span};

fn lex(src: &str) -> Result<Vec<Token>, CompileError> {
    tokenize(&SourceBuffer::new(src, None))
}

fn kinds(src: &str) -> Vec<TokenKind> {
    lex(src)
        .expect("Expected a successful lex")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn string(value: &str) -> TokenKind {
    TokenKind::String {
        value: value.into(),
        raw: false,
    }
}

macro_rules! assert_lex_result {
    ($_res:expr,) => {};

    ($res:expr, $token:expr) => {
        assert_eq!($res.next().unwrap().kind, $token);
    };

    ($res:expr, $token:expr, $($rest:tt)*) => {
        assert_lex_result!($res, $token);
        assert_lex_result!($res, $($rest)*)
    };
}

#[test]
fn lexing_works() {
    let mut res = lex("foo = bar(1, 2, 3);")
        .expect("Expected a successful lex")
        .into_iter();

    assert_lex_result!(
        res,
        TokenKind::Ident("foo".into()),
        TokenKind::Symbol(Symbol::Equals),
        TokenKind::Ident("bar".into()),
        TokenKind::OpenDelim(DelimKind::Paren),
        TokenKind::Number(1.0),
        TokenKind::Symbol(Symbol::Comma),
        TokenKind::Number(2.0),
        TokenKind::Symbol(Symbol::Comma),
        TokenKind::Number(3.0),
        TokenKind::CloseDelim(DelimKind::Paren),
        TokenKind::Symbol(Symbol::Semicolon),
        TokenKind::Eof,
    );
}

#[test]
fn eof_repeats() {
    let source = SourceBuffer::new("x", None);
    let mut lexer = Lexer::new(&source);

    assert_eq!(lexer.next().unwrap().kind, TokenKind::Ident("x".into()));

    for _ in 0..3 {
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Eof);
        assert_eq!(token.span, Span::point(1));
    }
}

#[test]
fn look_does_not_consume() {
    let source = SourceBuffer::new("ab", None);
    let mut lexer = Lexer::new(&source);

    assert_eq!(lexer.look(0), Some('a'));
    assert_eq!(lexer.look(1), Some('b'));
    assert_eq!(lexer.look(2), None);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Ident("ab".into()));
    assert_eq!(lexer.look(0), None);
}

#[test]
fn lex_failure_works() {
    let err = lex("let foo = ∅;").expect_err("Expected a failed lex");
    assert_eq!(err.kind, ErrorKind::Lex);
    assert_eq!(err.span, Span::new(10, 11));
    assert_eq!(err.to_string(), "unexpected character `∅` (1:11)");
}

#[test]
fn keywords_and_constants() {
    assert_eq!(
        kinds("pub fn impl import is self null true false iffy"),
        [
            TokenKind::Keyword(Keyword::Pub),
            TokenKind::Keyword(Keyword::Fn),
            TokenKind::Keyword(Keyword::Impl),
            TokenKind::Keyword(Keyword::Import),
            TokenKind::Keyword(Keyword::Is),
            TokenKind::Const(Constant::SelfValue),
            TokenKind::Const(Constant::Null),
            TokenKind::Const(Constant::True),
            TokenKind::Const(Constant::False),
            TokenKind::Ident("iffy".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn identifiers_allow_dollar() {
    assert_eq!(
        kinds("$a _b c$1"),
        [
            TokenKind::Ident("$a".into()),
            TokenKind::Ident("_b".into()),
            TokenKind::Ident("c$1".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lex_string() {
    let mut res = lex(r#"let cool_name = "fujiwara no mokou";"#)
        .expect("Expected a successful lex")
        .into_iter();

    assert_lex_result!(
        res,
        TokenKind::Keyword(Keyword::Let),
        TokenKind::Ident("cool_name".into()),
        TokenKind::Symbol(Symbol::Equals),
        string("fujiwara no mokou"),
        TokenKind::Symbol(Symbol::Semicolon)
    );
}

#[test]
fn lex_string_escapes() {
    assert_eq!(kinds(r#""hina\nkagiyama""#)[0], string("hina\nkagiyama"));
    assert_eq!(kinds(r#""\a\b\f\r\t\v""#)[0], string("\u{7}\u{8}\u{c}\r\t\u{b}"));
    assert_eq!(kinds(r#""\\\'\"\?""#)[0], string("\\'\"?"));
    assert_eq!(kinds(r#""\x41\x7a""#)[0], string("Az"));
    assert_eq!(kinds(r#""\101\60\0""#)[0], string("A0\0"));
    // Unknown escapes are taken literally
    assert_eq!(kinds(r#""\q""#)[0], string("q"));
}

#[test]
fn lex_invalid_hex_escape() {
    let err = lex(r#""\x4""#).expect_err("Expected a failed lex");
    assert_eq!(err.kind, ErrorKind::Lex);
    assert_eq!(err.span.start, 1);
    assert!(err.message.contains("hex escape"));
}

#[test]
fn lex_string_no_eof() {
    let err = lex("\"hello").expect_err("Expected a failed lex");
    assert_eq!(err.message, "unterminated string");
    assert_eq!(err.span.start, 0);
}

#[test]
fn lex_string_no_line_breaks() {
    let err = lex("\"hello\nworld\"").expect_err("Expected a failed lex");
    assert_eq!(err.message, "unterminated string");
}

#[test]
fn lex_raw_string() {
    let res = lex("\"\"\"a\nb\"\"\"").expect("Expected a successful lex");

    assert_eq!(res.len(), 2);
    assert_eq!(
        res[0].kind,
        TokenKind::String {
            value: "a\nb".into(),
            raw: true,
        }
    );
    assert_eq!(res[0].span, Span::new(0, 9));
}

#[test]
fn raw_strings_skip_escapes() {
    assert_eq!(
        kinds(r#""""\n""""#)[0],
        TokenKind::String {
            value: "\\n".into(),
            raw: true,
        }
    );
}

#[test]
fn empty_string_is_not_raw() {
    assert_eq!(kinds(r#""" + x"#)[..2], [string(""), TokenKind::Symbol(Symbol::Plus)]);
}

#[test]
fn lex_char() {
    assert_eq!(kinds("'a'")[0], TokenKind::Char('a'));
    assert_eq!(kinds(r"'\n'")[0], TokenKind::Char('\n'));
    assert_eq!(kinds(r"'\''")[0], TokenKind::Char('\''));
    assert_eq!(kinds("'π'")[0], TokenKind::Char('π'));

    assert!(lex("''").is_err());
    assert!(lex("'ab'").is_err());
    assert!(lex("'a").is_err());
}

#[test]
fn lex_numbers() {
    assert_eq!(kinds("12345")[0], TokenKind::Number(12345.0));
    assert_eq!(kinds("1.5")[0], TokenKind::Number(1.5));

    assert_eq!(
        kinds("1..2"),
        [
            TokenKind::Number(1.0),
            TokenKind::Symbol(Symbol::DotDot),
            TokenKind::Number(2.0),
            TokenKind::Eof,
        ]
    );

    // A trailing `.` is member access, not part of the number
    assert_eq!(
        kinds("1.x")[..2],
        [TokenKind::Number(1.0), TokenKind::Symbol(Symbol::Dot)]
    );
}

#[test]
fn malformed_numbers() {
    assert_eq!(lex("1.2.3").unwrap_err().message, "malformed number");
    assert_eq!(lex("12abc").unwrap_err().message, "malformed number");
}

#[test]
fn minus_is_always_an_operator() {
    assert_eq!(
        kinds("-1 - -2"),
        [
            TokenKind::Symbol(Symbol::Minus),
            TokenKind::Number(1.0),
            TokenKind::Symbol(Symbol::Minus),
            TokenKind::Symbol(Symbol::Minus),
            TokenKind::Number(2.0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn multi_char_symbols() {
    assert_eq!(
        kinds("-> .. <= >= == != && || ++ -- . !"),
        [
            TokenKind::Symbol(Symbol::Arrow),
            TokenKind::Symbol(Symbol::DotDot),
            TokenKind::Symbol(Symbol::LessEqual),
            TokenKind::Symbol(Symbol::GreaterEqual),
            TokenKind::Symbol(Symbol::DoubleEquals),
            TokenKind::Symbol(Symbol::ExclEqual),
            // After an operator `&&` reads as two address-of operators
            TokenKind::Symbol(Symbol::AddressOf),
            TokenKind::Symbol(Symbol::AddressOf),
            TokenKind::Symbol(Symbol::PipePipe),
            TokenKind::Symbol(Symbol::PlusPlus),
            TokenKind::Symbol(Symbol::MinusMinus),
            TokenKind::Symbol(Symbol::Dot),
            TokenKind::Symbol(Symbol::Exclamation),
            TokenKind::Eof,
        ]
    );

    assert_eq!(kinds("a && b")[1], TokenKind::Symbol(Symbol::AndAnd));
}

#[test]
fn star_and_ampersand_depend_on_context() {
    assert_eq!(
        kinds("a * *b & &c"),
        [
            TokenKind::Ident("a".into()),
            TokenKind::Symbol(Symbol::Star),
            TokenKind::Symbol(Symbol::Deref),
            TokenKind::Ident("b".into()),
            TokenKind::Symbol(Symbol::And),
            TokenKind::Symbol(Symbol::AddressOf),
            TokenKind::Ident("c".into()),
            TokenKind::Eof,
        ]
    );

    assert_eq!(kinds("(x) * 2")[3], TokenKind::Symbol(Symbol::Star));
    assert_eq!(kinds("return *p")[1], TokenKind::Symbol(Symbol::Deref));
    assert_eq!(kinds("f(&x)")[2], TokenKind::Symbol(Symbol::AddressOf));
}

#[test]
fn allow_expr_follows_the_meta_table() {
    let source = SourceBuffer::new("x = y++", None);
    let mut lexer = Lexer::new(&source);

    assert!(lexer.allow_expr());
    lexer.next().unwrap();
    assert!(!lexer.allow_expr());
    lexer.next().unwrap();
    assert!(lexer.allow_expr());
    lexer.next().unwrap();
    lexer.next().unwrap();
    assert!(!lexer.allow_expr());
}

#[test]
fn lex_comment() {
    assert_eq!(kinds("//"), [TokenKind::Eof]);
    assert_eq!(kinds("// hello world"), [TokenKind::Eof]);
    assert_eq!(kinds("/* a */ /* b */"), [TokenKind::Eof]);

    let mut res = lex(r#"
        // i want hello world cake
        fn main() {
            /* (w/ chocolate sauce) */
            println("Hello world!");
        }
        // This is a comment // Commented out comment
    "#)
    .expect("Expected a successful lex")
    .into_iter();

    assert_lex_result!(
        res,
        TokenKind::Keyword(Keyword::Fn),
        TokenKind::Ident("main".into()),
        TokenKind::OpenDelim(DelimKind::Paren),
        TokenKind::CloseDelim(DelimKind::Paren),
        TokenKind::OpenDelim(DelimKind::Brace),
        TokenKind::Ident("println".into()),
        TokenKind::OpenDelim(DelimKind::Paren),
        string("Hello world!"),
        TokenKind::CloseDelim(DelimKind::Paren),
        TokenKind::Symbol(Symbol::Semicolon),
        TokenKind::CloseDelim(DelimKind::Brace),
        TokenKind::Eof,
    );
}

#[test]
fn block_comments_do_not_nest() {
    assert_eq!(
        kinds("/* /* */ x */"),
        [
            TokenKind::Ident("x".into()),
            TokenKind::Symbol(Symbol::Star),
            TokenKind::Symbol(Symbol::Slash),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_block_comment() {
    let err = lex("x /* never closed").expect_err("Expected a failed lex");
    assert_eq!(err.message, "unterminated block comment");
    assert_eq!(err.span, Span::new(2, 4));
}

#[test]
fn seen_newline_is_recorded() {
    let res = lex("a b\nc /*\n*/ d // e\nf\r\ng").expect("Expected a successful lex");
    let flags: Vec<bool> = res.iter().map(|t| t.seen_newline).collect();

    assert_eq!(flags, [false, false, true, true, true, true, false]);
}

/// Small lexemes which are lexed the same regardless of context.
fn lexeme() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "foo", "$bar", "12", "3.25", "\"s\\n\"", "'c'", "(", ")", "{", "}", "[", "]", "+", "-",
        "/", "%", "==", "!=", "<=", "<", "->", "..", ".", ",", ":", ";", "fn", "self", "++",
        "\"\"\"r\"\"\"",
    ])
}

/// Trivia along with whether it contains a line break.
fn trivia() -> impl Strategy<Value = (&'static str, bool)> {
    prop::sample::select(vec![
        (" ", false),
        ("\t", false),
        (" /* x */", false),
        ("\n", true),
        ("\r\n", true),
        (" // comment\n", true),
        (" /*\n*/", true),
    ])
}

proptest! {
    // Inspired by proptest's README
    #[test]
    fn fuzz(src in ".{0,4096}") {
        let _ = lex(&src);
    }

    #[test]
    fn spans_stay_in_bounds(src in ".{0,512}") {
        let source = SourceBuffer::new(src, None);

        if let Ok(tokens) = tokenize(&source) {
            let mut last_end = 0;

            for token in &tokens {
                prop_assert!(token.span.start <= token.span.end);
                prop_assert!(token.span.end <= source.len());
                prop_assert!(token.span.start >= last_end);
                last_end = token.span.end;
            }
        }
    }

    // Tries filling a string with random characters (except for \ and ")
    #[test]
    fn string_stress(src in "\"[^\\\\\"\r\n]{0,4096}\"") {
        let res = lex(&src).expect("Expected a successful lex");

        prop_assert!(
            matches!(&res[0].kind, TokenKind::String { raw: false, .. }),
            "expected a plain string, got {:?}",
            res[0].kind
        );
        prop_assert_eq!(res.len(), 2);
    }

    #[test]
    fn number_stress(src in "[0-9]{1,8}(\\.[0-9]{1,8})?") {
        let res = lex(&src).expect("Expected a successful lex");
        let expected: f64 = src.parse().unwrap();

        prop_assert_eq!(&res[0].kind, &TokenKind::Number(expected));
    }

    #[test]
    fn seen_newline_matches_trivia(
        parts in prop::collection::vec((trivia(), lexeme()), 1..32)
    ) {
        let mut src = String::new();

        for ((trivia, _), lexeme) in &parts {
            src.push_str(trivia);
            src.push_str(lexeme);
        }

        let tokens = lex(&src).expect("Expected a successful lex");
        prop_assert_eq!(tokens.len(), parts.len() + 1);

        for (token, ((_, newline), _)) in tokens.iter().zip(&parts) {
            prop_assert_eq!(token.seen_newline, *newline);
        }
    }

    #[test]
    fn tokens_and_trivia_rebuild_the_source(
        parts in prop::collection::vec((trivia(), lexeme()), 1..32)
    ) {
        let src: String = parts
            .iter()
            .flat_map(|((trivia, _), lexeme)| [*trivia, *lexeme])
            .collect();
        let source = SourceBuffer::new(src.as_str(), None);
        let tokens = tokenize(&source).expect("Expected a successful lex");
        let mut rebuilt = String::new();
        let mut last_end = 0;

        for token in &tokens {
            // Whatever lies between two tokens must be pure trivia
            let gap = source.slice(Span::new(last_end, token.span.start));
            prop_assert_eq!(kinds(&gap), vec![TokenKind::Eof]);

            rebuilt.push_str(&gap);
            rebuilt.push_str(&source.slice(token.span));
            last_end = token.span.end;
        }

        prop_assert_eq!(rebuilt, src);
    }

    #[test]
    fn relexing_a_span_gives_the_same_token(
        parts in prop::collection::vec((trivia(), lexeme()), 1..32)
    ) {
        let src: String = parts
            .iter()
            .flat_map(|((trivia, _), lexeme)| [*trivia, *lexeme])
            .collect();
        let source = SourceBuffer::new(src.as_str(), None);

        for token in tokenize(&source).expect("Expected a successful lex") {
            if token.kind.is_eof() {
                continue;
            }

            let alone = kinds(&source.slice(token.span));
            prop_assert_eq!(&alone[0], &token.kind);
        }
    }
}
