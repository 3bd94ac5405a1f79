//! # Configuration Language - Abstract Syntax Tree
//!
//! This module defines the AST for the configuration language: the lexical
//! tokens produced by the tokenizer and the node shapes assembled by the
//! parser.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - `TokenKind` and `Token` (kind, source text, decoded
//!   literal value, start/end locations)
//! - **[nodes]** - `AstNode` and the node payloads: unary and binary
//!   expressions, slices, mapping bodies, list bodies
//!
//! ## Core Concepts
//!
//! Nodes are shared via `Rc<AstNode>`. The evaluator is lazy: container
//! values hold on to their unevaluated sub-trees until something looks at
//! them, and circular `$` references are detected by node identity, so the
//! same `Rc` must flow from the parser through every later stage.
//!
//! A `$` reference is a unary node whose operand is a path-shaped expression
//! tree built from `.`, `[...]` and slice trailers:
//!
//! ```text
//! ${server.hosts[0]}      Unary(Dollar, Binary(LeftBracket, Binary(Dot, ...), 0))
//! logging.level           Binary(Dot, Word(logging), Word(level))
//! ```

pub mod nodes;
pub mod tokens;

pub use nodes::{AstNode, BinaryNode, ListItems, MappingItems, SliceNode, UnaryNode};
pub use tokens::{Token, TokenKind};
