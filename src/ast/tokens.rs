use crate::location::Location;
use crate::value::Value;

/// Lexical categories produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input. The tokenizer keeps returning this once the source is
    /// exhausted.
    Eof,
    /// A physical newline, `\r`, `\r\n`, or a `#` comment running to the end
    /// of its line.
    Newline,

    // Literals
    /// Identifier or unrecognized keyword
    Word,
    Integer,
    Float,
    /// Imaginary literal (`3j`); the decoded value has a zero real part.
    Complex,
    /// Quoted string, single- or triple-quoted
    String,
    /// Back-quoted string, converted at evaluation time
    BackTick,

    // Keywords
    True,
    False,
    None,
    Is,
    In,
    Not,
    And,
    Or,
    /// Synthetic: `is not` collapsed by the parser
    IsNot,
    /// Synthetic: `not in` collapsed by the parser
    NotIn,

    // Structural punctuation
    LeftCurly,
    RightCurly,
    LeftBracket,
    RightBracket,
    LeftParenthesis,
    RightParenthesis,
    Comma,
    Colon,
    Dot,
    /// `=`, accepted as a key-value separator alongside `:`
    Assign,
    At,
    Dollar,

    // Operators
    Plus,
    Minus,
    Star,
    Power,
    Slash,
    SlashSlash,
    Modulo,
    LeftShift,
    RightShift,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    Unequal,
    /// `<>`, same meaning as `!=`
    AltUnequal,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseComplement,
}

/// A single token: its kind, the exact source text it covers, the decoded
/// literal value (for literals and keywords), and its start/end locations.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: Option<Value>,
    pub start: Location,
    pub end: Location,
}
