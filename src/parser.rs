use std::rc::Rc;

use crate::ast::{AstNode, BinaryNode, ListItems, MappingItems, SliceNode, Token, TokenKind, UnaryNode};
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::location::Location;
use crate::value::Value;

/// Recursive-descent parser with one public method per grammar rule, so any
/// fragment (a path, a bare expression, a list body) can be parsed on its
/// own. [`parse`] dispatches on the rule name.
pub struct Parser {
    lexer: Lexer,
    next: Token,
}

/// Parse `text` starting from the named grammar rule.
pub fn parse(text: &str, rule: &str) -> Result<Rc<AstNode>> {
    let mut parser = Parser::new(Lexer::new(text))?;
    match rule {
        "mapping_body" => parser.mapping_body(),
        "mapping" => parser.mapping(),
        "list_body" => parser.list_body(),
        "list" => parser.list(),
        "container" => parser.container(),
        "value" => parser.value().map(|t| Rc::new(AstNode::Token(t))),
        "atom" => parser.atom(),
        "primary" => parser.primary(),
        "power" => parser.power(),
        "unary_expr" => parser.unary_expr(),
        "mul_expr" => parser.mul_expr(),
        "add_expr" => parser.add_expr(),
        "shift_expr" => parser.shift_expr(),
        "bit_and_expr" => parser.bit_and_expr(),
        "bit_xor_expr" => parser.bit_xor_expr(),
        "bit_or_expr" => parser.bit_or_expr(),
        "comparison" => parser.comparison(),
        "not_expr" => parser.not_expr(),
        "and_expr" => parser.and_expr(),
        "expr" => parser.expr(),
        _ => Err(Error::Argument(format!("no such rule: {rule}"))),
    }
}

fn binary(kind: TokenKind, left: Rc<AstNode>, right: Rc<AstNode>, start: Location) -> Rc<AstNode> {
    Rc::new(AstNode::Binary(BinaryNode {
        kind,
        left,
        right,
        start,
    }))
}

fn is_expression_starter(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Word
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Complex
            | TokenKind::String
            | TokenKind::BackTick
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None
            | TokenKind::LeftCurly
            | TokenKind::LeftBracket
            | TokenKind::LeftParenthesis
            | TokenKind::Dollar
            | TokenKind::At
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::BitwiseComplement
            | TokenKind::Not
    )
}

fn is_comparison_op(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LessThan
            | TokenKind::LessThanOrEqual
            | TokenKind::GreaterThan
            | TokenKind::GreaterThanOrEqual
            | TokenKind::Equal
            | TokenKind::Unequal
            | TokenKind::AltUnequal
            | TokenKind::Is
            | TokenKind::In
            | TokenKind::Not
    )
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let next = lexer.next_token()?;
        Ok(Parser { lexer, next })
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Parser::new(Lexer::new(text))
    }

    pub fn at_end(&self) -> bool {
        self.next.kind == TokenKind::Eof
    }

    /// Location of the upcoming token.
    pub fn position(&self) -> Location {
        self.next.start
    }

    fn advance(&mut self) -> Result<Token> {
        let upcoming = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.next, upcoming))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.next.kind != kind {
            return Err(Error::parser(
                format!("expected {:?} but got {:?}", kind, self.next.kind),
                self.next.start,
            ));
        }
        self.advance()
    }

    fn consume_newlines(&mut self) -> Result<TokenKind> {
        while self.next.kind == TokenKind::Newline {
            self.advance()?;
        }
        Ok(self.next.kind)
    }

    /// A run of adjacent string tokens collapses into one token whose value
    /// is the concatenation.
    fn strings(&mut self) -> Result<Token> {
        let mut token = self.advance()?;
        if self.next.kind == TokenKind::String {
            let start = token.start;
            let mut end = token.end;
            let mut all_text = token.text.clone();
            let mut all_value = match token.value.take() {
                Some(Value::Str(s)) => s,
                _ => String::new(),
            };
            while self.next.kind == TokenKind::String {
                let t = self.advance()?;
                all_text.push_str(&t.text);
                if let Some(Value::Str(s)) = t.value {
                    all_value.push_str(&s);
                }
                end = t.end;
            }
            token = Token {
                kind: TokenKind::String,
                text: all_text,
                value: Some(Value::Str(all_value)),
                start,
                end,
            };
        }
        Ok(token)
    }

    /// A scalar value token: string (with concatenation), word, number,
    /// keyword literal, or back-tick string.
    pub fn value(&mut self) -> Result<Token> {
        match self.next.kind {
            TokenKind::String => self.strings(),
            TokenKind::Word
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Complex
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None
            | TokenKind::BackTick => self.advance(),
            kind => Err(Error::parser(
                format!("unexpected when looking for value: {kind:?}"),
                self.next.start,
            )),
        }
    }

    pub fn atom(&mut self) -> Result<Rc<AstNode>> {
        match self.next.kind {
            TokenKind::LeftCurly => self.mapping(),
            TokenKind::LeftBracket => self.list(),
            TokenKind::Dollar => {
                self.advance()?;
                let braced = self.next.kind == TokenKind::LeftCurly;
                if braced {
                    self.advance()?;
                }
                let start = self.next.start;
                let operand = self.primary()?;
                if braced {
                    self.expect(TokenKind::RightCurly)?;
                }
                Ok(Rc::new(AstNode::Unary(UnaryNode {
                    kind: TokenKind::Dollar,
                    operand,
                    start,
                })))
            }
            TokenKind::Word
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Complex
            | TokenKind::String
            | TokenKind::BackTick
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None => Ok(Rc::new(AstNode::Token(self.value()?))),
            TokenKind::LeftParenthesis => {
                self.advance()?;
                let result = self.expr()?;
                self.expect(TokenKind::RightParenthesis)?;
                Ok(result)
            }
            kind => Err(Error::parser(
                format!("unexpected: {kind:?}"),
                self.next.start,
            )),
        }
    }

    /// An atom followed by `.word`, `[index]` and `[start:stop:step]`
    /// trailers.
    pub fn primary(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.atom()?;
        loop {
            match self.next.kind {
                TokenKind::Dot => {
                    let start = result.start();
                    self.advance()?;
                    let word = self.expect(TokenKind::Word)?;
                    result = binary(
                        TokenKind::Dot,
                        result,
                        Rc::new(AstNode::Token(word)),
                        start,
                    );
                }
                TokenKind::LeftBracket => {
                    let start = result.start();
                    let (kind, operand) = self.trailer()?;
                    result = binary(kind, result, operand, start);
                }
                _ => break,
            }
        }
        Ok(result)
    }

    /// A bracket trailer: either a one-element index or a slice. Returns the
    /// operator kind (LeftBracket for indexing, Colon for slicing) and the
    /// operand node.
    fn trailer(&mut self) -> Result<(TokenKind, Rc<AstNode>)> {
        self.expect(TokenKind::LeftBracket)?;
        let loc = self.next.start;
        let mut start_index = None;
        let mut stop_index = None;
        let mut step = None;
        let mut is_slice = false;

        if self.next.kind != TokenKind::Colon {
            start_index = Some(self.slice_element()?);
        }
        if self.next.kind == TokenKind::Colon {
            is_slice = true;
            self.advance()?;
            if !matches!(self.next.kind, TokenKind::Colon | TokenKind::RightBracket) {
                stop_index = Some(self.slice_element()?);
            }
            if self.next.kind == TokenKind::Colon {
                self.advance()?;
                if self.next.kind != TokenKind::RightBracket {
                    step = Some(self.slice_element()?);
                }
            }
        }
        self.expect(TokenKind::RightBracket)?;

        if is_slice {
            Ok((
                TokenKind::Colon,
                Rc::new(AstNode::Slice(SliceNode {
                    start_index,
                    stop_index,
                    step,
                    start: loc,
                })),
            ))
        } else if let Some(index) = start_index {
            Ok((TokenKind::LeftBracket, index))
        } else {
            Err(Error::parser("empty index", loc))
        }
    }

    /// One part of an index or slice: parsed as a list body that must hold
    /// exactly one value.
    fn slice_element(&mut self) -> Result<Rc<AstNode>> {
        let loc = self.next.start;
        let body = self.list_body()?;
        match &*body {
            AstNode::List(items) if items.items.len() == 1 => Ok(items.items[0].clone()),
            AstNode::List(items) => Err(Error::parser(
                format!("invalid index: expected one value, {} found", items.items.len()),
                loc,
            )),
            _ => Err(Error::parser("invalid index", loc)),
        }
    }

    pub fn power(&mut self) -> Result<Rc<AstNode>> {
        let result = self.primary()?;
        if self.next.kind == TokenKind::Power {
            let start = result.start();
            self.advance()?;
            // right-associative: recurse through the unary level
            let rhs = self.unary_expr()?;
            return Ok(binary(TokenKind::Power, result, rhs, start));
        }
        Ok(result)
    }

    pub fn unary_expr(&mut self) -> Result<Rc<AstNode>> {
        match self.next.kind {
            kind @ (TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::BitwiseComplement
            | TokenKind::At) => {
                let start = self.next.start;
                self.advance()?;
                let operand = self.unary_expr()?;
                Ok(Rc::new(AstNode::Unary(UnaryNode {
                    kind,
                    operand,
                    start,
                })))
            }
            _ => self.power(),
        }
    }

    pub fn mul_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.unary_expr()?;
        while matches!(
            self.next.kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::SlashSlash | TokenKind::Modulo
        ) {
            let start = result.start();
            let op = self.advance()?.kind;
            result = binary(op, result, self.unary_expr()?, start);
        }
        Ok(result)
    }

    pub fn add_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.mul_expr()?;
        while matches!(self.next.kind, TokenKind::Plus | TokenKind::Minus) {
            let start = result.start();
            let op = self.advance()?.kind;
            result = binary(op, result, self.mul_expr()?, start);
        }
        Ok(result)
    }

    pub fn shift_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.add_expr()?;
        while matches!(self.next.kind, TokenKind::LeftShift | TokenKind::RightShift) {
            let start = result.start();
            let op = self.advance()?.kind;
            result = binary(op, result, self.add_expr()?, start);
        }
        Ok(result)
    }

    pub fn bit_and_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.shift_expr()?;
        while self.next.kind == TokenKind::BitwiseAnd {
            let start = result.start();
            self.advance()?;
            result = binary(TokenKind::BitwiseAnd, result, self.shift_expr()?, start);
        }
        Ok(result)
    }

    pub fn bit_xor_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.bit_and_expr()?;
        while self.next.kind == TokenKind::BitwiseXor {
            let start = result.start();
            self.advance()?;
            result = binary(TokenKind::BitwiseXor, result, self.bit_and_expr()?, start);
        }
        Ok(result)
    }

    pub fn bit_or_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.bit_xor_expr()?;
        while self.next.kind == TokenKind::BitwiseOr {
            let start = result.start();
            self.advance()?;
            result = binary(TokenKind::BitwiseOr, result, self.bit_xor_expr()?, start);
        }
        Ok(result)
    }

    /// `is not` and `not in` collapse into the synthetic IsNot / NotIn
    /// operators.
    fn comp_op(&mut self) -> Result<TokenKind> {
        let mut kind = self.advance()?.kind;
        if kind == TokenKind::Is && self.next.kind == TokenKind::Not {
            kind = TokenKind::IsNot;
            self.advance()?;
        } else if kind == TokenKind::Not && self.next.kind == TokenKind::In {
            kind = TokenKind::NotIn;
            self.advance()?;
        }
        Ok(kind)
    }

    pub fn comparison(&mut self) -> Result<Rc<AstNode>> {
        let result = self.bit_or_expr()?;
        if is_comparison_op(self.next.kind) {
            let start = result.start();
            let op = self.comp_op()?;
            let rhs = self.bit_or_expr()?;
            return Ok(binary(op, result, rhs, start));
        }
        Ok(result)
    }

    pub fn not_expr(&mut self) -> Result<Rc<AstNode>> {
        if self.next.kind == TokenKind::Not {
            let start = self.next.start;
            self.advance()?;
            let operand = self.not_expr()?;
            return Ok(Rc::new(AstNode::Unary(UnaryNode {
                kind: TokenKind::Not,
                operand,
                start,
            })));
        }
        self.comparison()
    }

    pub fn and_expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.not_expr()?;
        while self.next.kind == TokenKind::And {
            let start = result.start();
            self.advance()?;
            result = binary(TokenKind::And, result, self.not_expr()?, start);
        }
        Ok(result)
    }

    pub fn expr(&mut self) -> Result<Rc<AstNode>> {
        let mut result = self.and_expr()?;
        while self.next.kind == TokenKind::Or {
            let start = result.start();
            self.advance()?;
            result = binary(TokenKind::Or, result, self.and_expr()?, start);
        }
        Ok(result)
    }

    pub fn list_body(&mut self) -> Result<Rc<AstNode>> {
        let start = self.next.start;
        let mut items: Vec<Rc<AstNode>> = Vec::new();
        let mut kind = self.consume_newlines()?;
        while is_expression_starter(kind) {
            items.push(self.expr()?);
            kind = self.next.kind;
            if !matches!(kind, TokenKind::Newline | TokenKind::Comma) {
                break;
            }
            self.advance()?;
            kind = self.consume_newlines()?;
        }
        Ok(Rc::new(AstNode::List(ListItems { items, start })))
    }

    pub fn list(&mut self) -> Result<Rc<AstNode>> {
        self.expect(TokenKind::LeftBracket)?;
        let result = self.list_body()?;
        self.expect(TokenKind::RightBracket)?;
        Ok(result)
    }

    pub fn mapping_body(&mut self) -> Result<Rc<AstNode>> {
        let start = self.next.start;
        let mut items: Vec<(Token, Rc<AstNode>)> = Vec::new();
        let kind = self.consume_newlines()?;
        if kind == TokenKind::RightCurly || kind == TokenKind::Eof {
            return Ok(Rc::new(AstNode::Mapping(MappingItems { items, start })));
        }
        if !matches!(kind, TokenKind::Word | TokenKind::String) {
            return Err(Error::parser(
                format!("unexpected type for key: {kind:?}"),
                self.next.start,
            ));
        }
        while matches!(self.next.kind, TokenKind::Word | TokenKind::String) {
            let key = if self.next.kind == TokenKind::Word {
                self.advance()?
            } else {
                self.strings()?
            };
            if !matches!(self.next.kind, TokenKind::Colon | TokenKind::Assign) {
                return Err(Error::parser(
                    format!("key-value separator expected, but found {:?}", self.next.kind),
                    self.next.start,
                ));
            }
            self.advance()?;
            self.consume_newlines()?;
            items.push((key, self.expr()?));
            match self.next.kind {
                TokenKind::Newline | TokenKind::Comma => {
                    self.advance()?;
                    self.consume_newlines()?;
                }
                TokenKind::RightCurly | TokenKind::Eof => {}
                kind => {
                    return Err(Error::parser(
                        format!("unexpected after key-value: {kind:?}"),
                        self.next.start,
                    ));
                }
            }
        }
        Ok(Rc::new(AstNode::Mapping(MappingItems { items, start })))
    }

    pub fn mapping(&mut self) -> Result<Rc<AstNode>> {
        self.expect(TokenKind::LeftCurly)?;
        let result = self.mapping_body()?;
        self.expect(TokenKind::RightCurly)?;
        Ok(result)
    }

    /// A whole configuration: `{...}`, `[...]`, or a bare mapping body.
    pub fn container(&mut self) -> Result<Rc<AstNode>> {
        let kind = self.consume_newlines()?;
        let result = match kind {
            TokenKind::LeftCurly => self.mapping()?,
            TokenKind::LeftBracket => self.list()?,
            TokenKind::Word | TokenKind::String | TokenKind::Eof => self.mapping_body()?,
            _ => {
                return Err(Error::parser(
                    format!("unexpected type for container: {kind:?}"),
                    self.next.start,
                ));
            }
        };
        self.consume_newlines()?;
        Ok(result)
    }
}
