// tests/lexer_tests.rs

use cfglang::lexer::Lexer;
use cfglang::location::Location;
use cfglang::value::{Complex, Value};
use cfglang::TokenKind;

fn kinds(input: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(input);
    let mut result = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        let done = token.kind == TokenKind::Eof;
        result.push(token.kind);
        if done {
            break;
        }
    }
    result
}

fn single(input: &str) -> (TokenKind, String, Option<Value>) {
    let mut lexer = Lexer::new(input);
    let token = lexer.next_token().unwrap();
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    (token.kind, token.text, token.value)
}

fn error_of(input: &str) -> String {
    let mut lexer = Lexer::new(input);
    loop {
        match lexer.next_token() {
            Ok(t) if t.kind == TokenKind::Eof => panic!("no error for input: {}", input),
            Ok(_) => continue,
            Err(e) => return e.to_string(),
        }
    }
}

// ============================================================================
// Punctuation and Operators
// ============================================================================

#[test]
fn test_punctuation() {
    let test_cases = vec![
        ("{", TokenKind::LeftCurly),
        ("}", TokenKind::RightCurly),
        ("[", TokenKind::LeftBracket),
        ("]", TokenKind::RightBracket),
        ("(", TokenKind::LeftParenthesis),
        (")", TokenKind::RightParenthesis),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        (".", TokenKind::Dot),
        ("=", TokenKind::Assign),
        ("@", TokenKind::At),
        ("$", TokenKind::Dollar),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Modulo),
        ("<", TokenKind::LessThan),
        (">", TokenKind::GreaterThan),
        ("!", TokenKind::Not),
        ("&", TokenKind::BitwiseAnd),
        ("|", TokenKind::BitwiseOr),
        ("^", TokenKind::BitwiseXor),
        ("~", TokenKind::BitwiseComplement),
    ];

    for (input, expected) in test_cases {
        let (kind, text, _) = single(input);
        assert_eq!(kind, expected, "failed for input: {}", input);
        assert_eq!(text, input);
    }
}

#[test]
fn test_compound_operators() {
    assert_eq!(
        kinds("== != <> <= >= << >> ** // && ||"),
        vec![
            TokenKind::Equal,
            TokenKind::Unequal,
            TokenKind::AltUnequal,
            TokenKind::LessThanOrEqual,
            TokenKind::GreaterThanOrEqual,
            TokenKind::LeftShift,
            TokenKind::RightShift,
            TokenKind::Power,
            TokenKind::SlashSlash,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_keywords() {
    assert_eq!(
        kinds("true false null is in not and or"),
        vec![
            TokenKind::True,
            TokenKind::False,
            TokenKind::None,
            TokenKind::Is,
            TokenKind::In,
            TokenKind::Not,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Eof,
        ]
    );
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_integers() {
    let test_cases = vec![
        ("0", 0),
        ("42", 42),
        ("-7", -7),
        ("1_000_000", 1_000_000),
        ("0x1F", 31),
        ("0X1f", 31),
        ("0o17", 15),
        ("0b101", 5),
        ("017", 15), // bare leading zero is octal
    ];

    for (input, expected) in test_cases {
        let (kind, _, value) = single(input);
        assert_eq!(kind, TokenKind::Integer, "failed for input: {}", input);
        assert_eq!(value, Some(Value::Integer(expected)), "input: {}", input);
    }
}

#[test]
fn test_floats() {
    let test_cases = vec![
        ("1.5", 1.5),
        (".5", 0.5),
        ("-.5", -0.5),
        ("2e3", 2000.0),
        ("1e-3", 0.001),
        ("2.5E2", 250.0),
    ];

    for (input, expected) in test_cases {
        let (kind, _, value) = single(input);
        assert_eq!(kind, TokenKind::Float, "failed for input: {}", input);
        assert_eq!(value, Some(Value::Float(expected)), "input: {}", input);
    }
}

#[test]
fn test_complex_literals() {
    let (kind, text, value) = single("3j");
    assert_eq!(kind, TokenKind::Complex);
    assert_eq!(text, "3j");
    assert_eq!(value, Some(Value::Complex(Complex::new(0.0, 3.0))));

    let (kind, _, value) = single("2.5J");
    assert_eq!(kind, TokenKind::Complex);
    assert_eq!(value, Some(Value::Complex(Complex::new(0.0, 2.5))));
}

#[test]
fn test_number_errors() {
    assert_eq!(error_of("1__2"), "(1, 3): invalid '_' in number: 1__");
    assert_eq!(error_of("1_ "), "(1, 2): invalid '_' at end of number: 1_");
    assert_eq!(error_of("1z"), "(1, 2): invalid character in number: 1z");
    assert_eq!(error_of("1.2.3"), "(1, 4): invalid character in number: 1.2.");
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_quoted_strings() {
    let test_cases = vec![
        ("'abc'", "abc"),
        ("\"abc\"", "abc"),
        ("''", ""),
        ("'it\\'s'", "it's"),
        ("'a\\nb'", "a\nb"),
        ("'\\u0041'", "A"),
        ("'\\x41'", "A"),
    ];

    for (input, expected) in test_cases {
        let (kind, _, value) = single(input);
        assert_eq!(kind, TokenKind::String, "failed for input: {}", input);
        assert_eq!(
            value,
            Some(Value::Str(expected.to_string())),
            "input: {}",
            input
        );
    }
}

#[test]
fn test_triple_quoted_strings() {
    let (kind, _, value) = single("'''ab\ncd'''");
    assert_eq!(kind, TokenKind::String);
    assert_eq!(value, Some(Value::Str("ab\ncd".to_string())));

    // embedded single quotes are fine
    let (_, _, value) = single("'''it's'''");
    assert_eq!(value, Some(Value::Str("it's".to_string())));
}

#[test]
fn test_backtick_strings() {
    let (kind, text, value) = single("`foo.bar`");
    assert_eq!(kind, TokenKind::BackTick);
    assert_eq!(text, "`foo.bar`");
    assert_eq!(value, Some(Value::Str("foo.bar".to_string())));
}

#[test]
fn test_string_errors() {
    assert_eq!(
        error_of("'abc"),
        "(1, 1): unterminated quoted string: 'abc"
    );
    assert_eq!(error_of("`abc"), "(1, 1): unterminated `-string: `abc");
    assert_eq!(
        error_of("'\\q'"),
        "(1, 1): invalid escape sequence at index 0"
    );
}

// ============================================================================
// Newlines, Comments, Continuations
// ============================================================================

#[test]
fn test_comment_becomes_newline() {
    let mut lexer = Lexer::new("# a comment\nx");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Newline);
    assert_eq!(token.text, "# a comment");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Word);
    assert_eq!(token.start, Location::new(2, 1));
}

#[test]
fn test_crlf_folds_to_one_newline() {
    assert_eq!(
        kinds("a\r\nb"),
        vec![
            TokenKind::Word,
            TokenKind::Newline,
            TokenKind::Word,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_line_continuation() {
    assert_eq!(
        kinds("a \\\nb"),
        vec![TokenKind::Word, TokenKind::Word, TokenKind::Eof]
    );
}

// ============================================================================
// Locations
// ============================================================================

#[test]
fn test_token_locations() {
    let mut lexer = Lexer::new("foo bar\nbaz");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.start, Location::new(1, 1));
    assert_eq!(token.end, Location::new(1, 3));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.start, Location::new(1, 5));
    assert_eq!(token.end, Location::new(1, 7));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Newline);
    let token = lexer.next_token().unwrap();
    assert_eq!(token.start, Location::new(2, 1));
    assert_eq!(token.end, Location::new(2, 3));
}

#[test]
fn test_pushback_preserves_location() {
    // the '<' lookahead reads 'x' and pushes it back; 'x' must still be
    // reported at its own column
    let mut lexer = Lexer::new("<x");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::LessThan);
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Word);
    assert_eq!(token.start, Location::new(1, 2));
}

#[test]
fn test_eof_is_sticky() {
    let mut lexer = Lexer::new("x");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Word);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
}
