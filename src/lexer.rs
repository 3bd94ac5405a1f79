use crate::ast::{Token, TokenKind};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::value::{Complex, Value};

/// The tokenizer. Call [`next_token`](Lexer::next_token) repeatedly; once the
/// input is exhausted it keeps returning EOF tokens.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Location of the next character to be read.
    location: Location,
    /// Location of the character most recently returned by `get_char`.
    char_location: Location,
    pushed_back: Vec<(char, Location)>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            location: Location::default(),
            char_location: Location::default(),
            pushed_back: Vec::new(),
        }
    }

    fn get_char(&mut self) -> Option<char> {
        let result = if let Some((c, loc)) = self.pushed_back.pop() {
            self.char_location = loc;
            self.location = loc;
            Some(c)
        } else {
            self.char_location = self.location;
            let c = self.input.get(self.position).copied();
            if c.is_some() {
                self.position += 1;
            }
            c
        };
        if let Some(c) = result {
            if c == '\n' {
                self.location.next_line();
            } else {
                self.location.column += 1;
            }
        }
        result
    }

    fn push_back(&mut self, c: char) {
        self.pushed_back.push((c, self.char_location));
    }

    /// The next token in the input. Lexical errors carry the location of the
    /// offending character (or of the token start, for unterminated strings).
    pub fn next_token(&mut self) -> Result<Token> {
        let mut kind = TokenKind::Eof;
        let mut text = String::new();
        let mut value: Option<Value> = None;
        let mut start = self.location;
        let mut end = self.location;

        loop {
            let Some(c) = self.get_char() else {
                start = self.char_location;
                end = self.char_location;
                break;
            };
            start = self.char_location;
            end = self.char_location;

            match c {
                '#' => {
                    text.push('#');
                    while let Some(ch) = self.get_char() {
                        if ch == '\n' {
                            break;
                        }
                        text.push(ch);
                        end = self.char_location;
                    }
                    kind = TokenKind::Newline;
                }
                '\n' => {
                    text.push('\n');
                    kind = TokenKind::Newline;
                }
                '\r' => {
                    // \r\n folds into a single newline; a lone \r also
                    // terminates the line
                    let c2 = self.get_char();
                    self.location = Location::new(start.line + 1, 1);
                    if c2 != Some('\n') {
                        if let Some(c2) = c2 {
                            self.pushed_back.push((c2, self.location));
                        }
                    }
                    kind = TokenKind::Newline;
                }
                '\\' => {
                    if self.get_char() == Some('\n') {
                        end = self.location;
                        continue;
                    }
                    return Err(Error::tokenizer(
                        "unexpected character: \\",
                        self.char_location,
                    ));
                }
                c if c.is_whitespace() => continue,
                '`' => {
                    text.push(c);
                    loop {
                        let Some(ch) = self.get_char() else {
                            return Err(Error::tokenizer(
                                format!("unterminated `-string: {text}"),
                                start,
                            ));
                        };
                        if ch.is_control() {
                            return Err(Error::tokenizer(
                                format!("invalid character in `-string: {text}"),
                                self.char_location,
                            ));
                        }
                        text.push(ch);
                        end = self.char_location;
                        if ch == '`' {
                            break;
                        }
                    }
                    value = Some(Value::Str(parse_escapes(
                        &text[1..text.len() - 1],
                        start,
                    )?));
                    kind = TokenKind::BackTick;
                }
                '\'' | '"' => {
                    let quote = c;
                    text.push(c);
                    let mut multi_line = false;
                    let c1 = self.get_char();
                    let c1_loc = self.char_location;
                    if c1 == Some(quote) {
                        let c2 = self.get_char();
                        if c2 == Some(quote) {
                            multi_line = true;
                            text.push(quote);
                            text.push(quote);
                            end = self.char_location;
                        } else {
                            if let Some(c2) = c2 {
                                self.pushed_back.push((c2, self.char_location));
                            }
                            self.pushed_back.push((quote, c1_loc));
                        }
                    } else if let Some(c1) = c1 {
                        self.pushed_back.push((c1, c1_loc));
                    }

                    let quoter = if multi_line { 3 } else { 1 };
                    let mut escaped = false;
                    loop {
                        let Some(ch) = self.get_char() else {
                            return Err(Error::tokenizer(
                                format!("unterminated quoted string: {text}"),
                                start,
                            ));
                        };
                        text.push(ch);
                        end = self.char_location;
                        if ch == quote && !escaped {
                            if !multi_line {
                                break;
                            }
                            let chars: Vec<char> = text.chars().collect();
                            let n = chars.len();
                            if n >= 6
                                && chars[n - 2] == quote
                                && chars[n - 3] == quote
                                && chars[n - 4] != '\\'
                            {
                                break;
                            }
                        }
                        escaped = if ch == '\\' { !escaped } else { false };
                    }
                    let chars: Vec<char> = text.chars().collect();
                    let inner: String = chars[quoter..chars.len() - quoter].iter().collect();
                    value = Some(Value::Str(parse_escapes(&inner, start)?));
                    kind = TokenKind::String;
                }
                c if c.is_alphabetic() || c == '_' => {
                    text.push(c);
                    while let Some(ch) = self.get_char() {
                        if ch.is_alphanumeric() || ch == '_' {
                            text.push(ch);
                            end = self.char_location;
                        } else {
                            self.push_back(ch);
                            break;
                        }
                    }
                    kind = TokenKind::Word;
                    match text.as_str() {
                        "true" => {
                            kind = TokenKind::True;
                            value = Some(Value::Bool(true));
                        }
                        "false" => {
                            kind = TokenKind::False;
                            value = Some(Value::Bool(false));
                        }
                        "null" => {
                            kind = TokenKind::None;
                            value = Some(Value::Null);
                        }
                        "is" => kind = TokenKind::Is,
                        "in" => kind = TokenKind::In,
                        "not" => kind = TokenKind::Not,
                        "and" => kind = TokenKind::And,
                        "or" => kind = TokenKind::Or,
                        _ => {}
                    }
                }
                c if c.is_ascii_digit() => {
                    text.push(c);
                    let (k, v) = self.read_number(&mut text, start, &mut end)?;
                    kind = k;
                    value = Some(v);
                }
                '=' => {
                    text.push(c);
                    match self.get_char() {
                        Some('=') => {
                            text.push('=');
                            end = self.char_location;
                            kind = TokenKind::Equal;
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::Assign;
                        }
                    }
                }
                '<' => {
                    text.push(c);
                    match self.get_char() {
                        Some(ch @ ('=' | '>' | '<')) => {
                            text.push(ch);
                            end = self.char_location;
                            kind = match ch {
                                '=' => TokenKind::LessThanOrEqual,
                                '>' => TokenKind::AltUnequal,
                                _ => TokenKind::LeftShift,
                            };
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::LessThan;
                        }
                    }
                }
                '>' => {
                    text.push(c);
                    match self.get_char() {
                        Some(ch @ ('=' | '>')) => {
                            text.push(ch);
                            end = self.char_location;
                            kind = if ch == '=' {
                                TokenKind::GreaterThanOrEqual
                            } else {
                                TokenKind::RightShift
                            };
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::GreaterThan;
                        }
                    }
                }
                '!' => {
                    text.push(c);
                    match self.get_char() {
                        Some('=') => {
                            text.push('=');
                            end = self.char_location;
                            kind = TokenKind::Unequal;
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::Not;
                        }
                    }
                }
                '/' => {
                    text.push(c);
                    match self.get_char() {
                        Some('/') => {
                            text.push('/');
                            end = self.char_location;
                            kind = TokenKind::SlashSlash;
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::Slash;
                        }
                    }
                }
                '*' => {
                    text.push(c);
                    match self.get_char() {
                        Some('*') => {
                            text.push('*');
                            end = self.char_location;
                            kind = TokenKind::Power;
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::Star;
                        }
                    }
                }
                '&' => {
                    text.push(c);
                    match self.get_char() {
                        Some('&') => {
                            text.push('&');
                            end = self.char_location;
                            kind = TokenKind::And;
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::BitwiseAnd;
                        }
                    }
                }
                '|' => {
                    text.push(c);
                    match self.get_char() {
                        Some('|') => {
                            text.push('|');
                            end = self.char_location;
                            kind = TokenKind::Or;
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::BitwiseOr;
                        }
                    }
                }
                '.' => {
                    text.push(c);
                    match self.get_char() {
                        Some(ch) if ch.is_ascii_digit() => {
                            text.push(ch);
                            end = self.char_location;
                            let (k, v) = self.read_number(&mut text, start, &mut end)?;
                            kind = k;
                            value = Some(v);
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::Dot;
                        }
                    }
                }
                '-' => {
                    text.push(c);
                    match self.get_char() {
                        Some(ch) if ch.is_ascii_digit() || ch == '.' => {
                            text.push(ch);
                            end = self.char_location;
                            let (k, v) = self.read_number(&mut text, start, &mut end)?;
                            kind = k;
                            value = Some(v);
                        }
                        other => {
                            if let Some(ch) = other {
                                self.push_back(ch);
                            }
                            kind = TokenKind::Minus;
                        }
                    }
                }
                '{' => {
                    text.push(c);
                    kind = TokenKind::LeftCurly;
                }
                '}' => {
                    text.push(c);
                    kind = TokenKind::RightCurly;
                }
                '[' => {
                    text.push(c);
                    kind = TokenKind::LeftBracket;
                }
                ']' => {
                    text.push(c);
                    kind = TokenKind::RightBracket;
                }
                '(' => {
                    text.push(c);
                    kind = TokenKind::LeftParenthesis;
                }
                ')' => {
                    text.push(c);
                    kind = TokenKind::RightParenthesis;
                }
                '+' => {
                    text.push(c);
                    kind = TokenKind::Plus;
                }
                '%' => {
                    text.push(c);
                    kind = TokenKind::Modulo;
                }
                ',' => {
                    text.push(c);
                    kind = TokenKind::Comma;
                }
                ':' => {
                    text.push(c);
                    kind = TokenKind::Colon;
                }
                '@' => {
                    text.push(c);
                    kind = TokenKind::At;
                }
                '$' => {
                    text.push(c);
                    kind = TokenKind::Dollar;
                }
                '^' => {
                    text.push(c);
                    kind = TokenKind::BitwiseXor;
                }
                '~' => {
                    text.push(c);
                    kind = TokenKind::BitwiseComplement;
                }
                _ => {
                    return Err(Error::tokenizer(
                        format!("unexpected character: {c}"),
                        self.char_location,
                    ));
                }
            }
            break;
        }

        Ok(Token {
            kind,
            text,
            value,
            start,
            end,
        })
    }

    /// Scan the rest of a numeric literal. `text` already holds the leading
    /// digit, `.digit` or `-` prefix.
    fn read_number(
        &mut self,
        text: &mut String,
        start: Location,
        end: &mut Location,
    ) -> Result<(TokenKind, Value)> {
        let mut kind = TokenKind::Integer;
        let mut in_exponent = false;
        let mut radix: u32 = 0;
        let mut last_was_digit = text.chars().last().is_some_and(|c| c.is_ascii_digit());
        let mut last_char: Option<char> = None;

        loop {
            let Some(c) = self.get_char() else {
                break;
            };
            if c == '_' {
                if last_was_digit {
                    text.push(c);
                    *end = self.char_location;
                    last_was_digit = false;
                    continue;
                }
                return Err(Error::tokenizer(
                    format!("invalid '_' in number: {text}{c}"),
                    self.char_location,
                ));
            }
            last_was_digit = false;
            let accepted = match radix {
                0 => c.is_ascii_digit(),
                2 => matches!(c, '0' | '1'),
                8 => matches!(c, '0'..='7'),
                _ => c.is_ascii_hexdigit(),
            };
            if accepted {
                text.push(c);
                *end = self.char_location;
                last_was_digit = true;
            } else if matches!(c, 'o' | 'O' | 'x' | 'X' | 'b' | 'B')
                && text.len() == 1
                && text.starts_with('0')
            {
                radix = match c.to_ascii_lowercase() {
                    'x' => 16,
                    'o' => 8,
                    _ => 2,
                };
                text.push(c);
                *end = self.char_location;
            } else if radix == 0 && c == '.' && !in_exponent && !text.contains('.') {
                text.push(c);
                *end = self.char_location;
            } else if radix == 0 && c == '-' && in_exponent && !text[1..].contains('-') {
                text.push(c);
                *end = self.char_location;
            } else if radix == 0
                && matches!(c, 'e' | 'E')
                && !text.contains(['e', 'E'])
                && !text.ends_with('_')
            {
                text.push(c);
                *end = self.char_location;
                in_exponent = true;
            } else {
                last_char = Some(c);
                break;
            }
        }

        if text.ends_with('_') {
            let mut loc = self.char_location;
            loc.column = loc.column.saturating_sub(1);
            return Err(Error::tokenizer(
                format!("invalid '_' at end of number: {text}"),
                loc,
            ));
        }
        if let Some(c) = last_char {
            if radix == 0 && matches!(c, 'j' | 'J') {
                kind = TokenKind::Complex;
                text.push(c);
                *end = self.char_location;
            } else if c != '.' && !c.is_alphanumeric() {
                self.push_back(c);
            } else {
                return Err(Error::tokenizer(
                    format!("invalid character in number: {text}{c}"),
                    self.char_location,
                ));
            }
        }

        let digits: String = text.chars().filter(|&c| c != '_').collect();
        let bad = |s: &str| Error::tokenizer(format!("invalid character in number: {s}"), start);
        let value = if radix != 0 {
            let n = i64::from_str_radix(&digits[2..], radix).map_err(|_| bad(&digits))?;
            Value::Integer(n)
        } else if kind == TokenKind::Complex {
            let im: f64 = digits[..digits.len() - 1]
                .parse()
                .map_err(|_| bad(&digits))?;
            Value::Complex(Complex::new(0.0, im))
        } else if in_exponent || digits.contains('.') {
            kind = TokenKind::Float;
            Value::Float(digits.parse().map_err(|_| bad(&digits))?)
        } else {
            // a bare leading zero means octal
            let r = if digits.starts_with('0') && digits.len() > 1 {
                8
            } else {
                10
            };
            Value::Integer(i64::from_str_radix(&digits, r).map_err(|_| bad(&digits))?)
        };
        Ok((kind, value))
    }
}

/// Decode the escape sequences of a scanned string body.
fn parse_escapes(s: &str, location: Location) -> Result<String> {
    if !s.contains('\\') {
        return Ok(s.to_string());
    }
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let at = i;
        let invalid =
            move || Error::tokenizer(format!("invalid escape sequence at index {at}"), location);
        let Some(&e) = chars.get(i + 1) else {
            return Err(invalid());
        };
        let simple = match e {
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\u{b}'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            _ => None,
        };
        if let Some(ch) = simple {
            out.push(ch);
            i += 2;
            continue;
        }
        let width = match e {
            'x' | 'X' => 2,
            'u' => 4,
            'U' => 8,
            _ => return Err(invalid()),
        };
        if i + 2 + width > chars.len() {
            return Err(invalid());
        }
        let hex: String = chars[i + 2..i + 2 + width].iter().collect();
        let cp = u32::from_str_radix(&hex, 16).map_err(|_| invalid())?;
        if (0xd800..0xe000).contains(&cp) || cp >= 0x0011_0000 {
            return Err(invalid());
        }
        match char::from_u32(cp) {
            Some(ch) => out.push(ch),
            None => return Err(invalid()),
        }
        i += 2 + width;
    }
    Ok(out)
}
