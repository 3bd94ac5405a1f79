pub mod ast;
pub mod config;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod value;

pub use ast::{AstNode, Token, TokenKind};
pub use config::Config;
pub use convert::{StringConverter, SymbolResolver};
pub use error::{Error, Result};
pub use evaluator::{parse_path, to_source};
pub use lexer::Lexer;
pub use location::Location;
pub use parser::{parse, Parser};
pub use value::{Complex, DictWrapper, ListWrapper, Value};
