use std::rc::Rc;

use crate::ast::tokens::{Token, TokenKind};
use crate::location::Location;

/// A parsed expression or container body.
///
/// Leaf values stay as [`Token`]s so their decoded literal value and exact
/// source span survive into evaluation.
#[derive(Debug, Clone)]
pub enum AstNode {
    Token(Token),
    Unary(UnaryNode),
    Binary(BinaryNode),
    Slice(SliceNode),
    Mapping(MappingItems),
    List(ListItems),
}

impl AstNode {
    /// The token kind that classifies this node: the operator for unary and
    /// binary nodes, the token kind for leaves, and the opening punctuation
    /// for containers and slices.
    pub fn kind(&self) -> TokenKind {
        match self {
            AstNode::Token(t) => t.kind,
            AstNode::Unary(u) => u.kind,
            AstNode::Binary(b) => b.kind,
            AstNode::Slice(_) => TokenKind::Colon,
            AstNode::Mapping(_) => TokenKind::LeftCurly,
            AstNode::List(_) => TokenKind::LeftBracket,
        }
    }

    pub fn start(&self) -> Location {
        match self {
            AstNode::Token(t) => t.start,
            AstNode::Unary(u) => u.start,
            AstNode::Binary(b) => b.start,
            AstNode::Slice(s) => s.start,
            AstNode::Mapping(m) => m.start,
            AstNode::List(l) => l.start,
        }
    }
}

/// A prefix operation: `-x`, `+x`, `~x`, `not x`, `@'file'`, `$ref`.
#[derive(Debug, Clone)]
pub struct UnaryNode {
    pub kind: TokenKind,
    pub operand: Rc<AstNode>,
    pub start: Location,
}

#[derive(Debug, Clone)]
pub struct BinaryNode {
    pub kind: TokenKind,
    pub left: Rc<AstNode>,
    pub right: Rc<AstNode>,
    pub start: Location,
}

/// A `[start:stop:step]` trailer; every part is optional.
#[derive(Debug, Clone)]
pub struct SliceNode {
    pub start_index: Option<Rc<AstNode>>,
    pub stop_index: Option<Rc<AstNode>>,
    pub step: Option<Rc<AstNode>>,
    pub start: Location,
}

/// The body of a mapping: key token paired with the unevaluated value node,
/// in document order.
#[derive(Debug, Clone)]
pub struct MappingItems {
    pub items: Vec<(Token, Rc<AstNode>)>,
    pub start: Location,
}

/// The body of a list: unevaluated element nodes in document order.
#[derive(Debug, Clone)]
pub struct ListItems {
    pub items: Vec<Rc<AstNode>>,
    pub start: Location,
}
