use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{AstNode, BinaryNode, SliceNode, Token, TokenKind, UnaryNode};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::Parser;
use crate::value::{Complex, DictWrapper, Entry, ListWrapper, Value};

/// Evaluates AST nodes in the context of a [`Config`]: arithmetic and
/// merging, `@` includes, `$` references, and the path walk behind both `$`
/// references and string-path lookups.
pub(crate) struct Evaluator {
    config: Config,
}

/// The key text of a mapping key or leading path token.
pub(crate) fn key_of(token: &Token) -> String {
    match &token.value {
        Some(Value::Str(s)) => s.clone(),
        _ => token.text.clone(),
    }
}

impl Evaluator {
    pub(crate) fn new(config: Config) -> Self {
        Evaluator { config }
    }

    pub(crate) fn evaluate(&self, node: &Rc<AstNode>) -> Result<Value> {
        match &**node {
            AstNode::Token(t) => self.eval_token(t),
            AstNode::Mapping(items) => Ok(Value::Mapping(self.config.wrap_mapping(items)?)),
            AstNode::List(items) => Ok(Value::List(self.config.wrap_list(items))),
            // every reference is guarded by the cycle stack, keyed on node
            // identity, so a reference re-entered before it completes fails
            // instead of recursing forever
            AstNode::Unary(u) if u.kind == TokenKind::Dollar => {
                self.config.push_ref(node)?;
                let result = self.get_from_path(node);
                self.config.pop_ref();
                result
            }
            AstNode::Unary(u) => self.eval_unary(u),
            AstNode::Binary(b) => self.eval_binary(b),
            AstNode::Slice(s) => Err(Error::evaluation(
                "unable to evaluate a bare slice",
                Some(s.start),
            )),
        }
    }

    fn eval_token(&self, t: &Token) -> Result<Value> {
        match t.kind {
            TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Complex
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None => t.value.clone().ok_or_else(|| {
                Error::evaluation(
                    format!("missing literal value for {:?}", t.kind),
                    Some(t.start),
                )
            }),
            TokenKind::Word => self
                .config
                .lookup_context(&t.text)
                .ok_or_else(|| {
                    Error::evaluation(format!("unknown variable '{}'", t.text), Some(t.start))
                }),
            TokenKind::BackTick => {
                let s = match &t.value {
                    Some(Value::Str(s)) => s.clone(),
                    _ => t.text.clone(),
                };
                self.config.convert_string(&s)
            }
            kind => Err(Error::evaluation(
                format!("unable to evaluate {kind:?}"),
                Some(t.start),
            )),
        }
    }

    fn eval_unary(&self, u: &UnaryNode) -> Result<Value> {
        match u.kind {
            TokenKind::At => self.eval_include(u),
            TokenKind::Minus => match self.evaluate(&u.operand)? {
                Value::Integer(n) => n
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| Error::evaluation("integer overflow", Some(u.start))),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Complex(c) => Ok(Value::Complex(-c)),
                v => Err(Error::evaluation(
                    format!("unable to negate {}", v.type_name()),
                    Some(u.start),
                )),
            },
            TokenKind::Plus => match self.evaluate(&u.operand)? {
                v @ (Value::Integer(_) | Value::Float(_) | Value::Complex(_)) => Ok(v),
                v => Err(Error::evaluation(
                    format!("unable to apply unary + to {}", v.type_name()),
                    Some(u.start),
                )),
            },
            TokenKind::BitwiseComplement => match self.evaluate(&u.operand)? {
                Value::Integer(n) => Ok(Value::Integer(!n)),
                v => Err(Error::evaluation(
                    format!("unable to complement {}", v.type_name()),
                    Some(u.start),
                )),
            },
            TokenKind::Not => match self.evaluate(&u.operand)?.as_bool() {
                Some(b) => Ok(Value::Bool(!b)),
                None => Err(Error::evaluation(
                    "'not' requires a boolean operand",
                    Some(u.start),
                )),
            },
            kind => Err(Error::evaluation(
                format!("unable to evaluate {kind:?}"),
                Some(u.start),
            )),
        }
    }

    fn eval_binary(&self, b: &BinaryNode) -> Result<Value> {
        match b.kind {
            TokenKind::And => {
                let lhs = self.boolean(&b.left, "and")?;
                if !lhs {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.boolean(&b.right, "and")?))
            }
            TokenKind::Or => {
                let lhs = self.boolean(&b.left, "or")?;
                if lhs {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.boolean(&b.right, "or")?))
            }
            _ => {
                let lhs = self.evaluate(&b.left)?;
                let rhs = self.evaluate(&b.right)?;
                match b.kind {
                    TokenKind::Plus => self.add(lhs, rhs, b),
                    TokenKind::Minus => self.subtract(lhs, rhs, b),
                    TokenKind::Star => self.multiply(lhs, rhs, b),
                    TokenKind::Slash => self.divide(lhs, rhs, b),
                    TokenKind::SlashSlash => self.int_divide(lhs, rhs, b),
                    TokenKind::Modulo => self.modulo(lhs, rhs, b),
                    TokenKind::LeftShift => self.shift(lhs, rhs, b, true),
                    TokenKind::RightShift => self.shift(lhs, rhs, b, false),
                    TokenKind::Power => self.power(lhs, rhs, b),
                    TokenKind::BitwiseOr => self.bit_or(lhs, rhs, b),
                    TokenKind::BitwiseAnd => self.bit_op(lhs, rhs, b, "bitwise-and"),
                    TokenKind::BitwiseXor => self.bit_op(lhs, rhs, b, "bitwise-xor"),
                    kind => Err(Error::evaluation(
                        format!("unable to evaluate {kind:?}"),
                        Some(b.start),
                    )),
                }
            }
        }
    }

    fn boolean(&self, node: &Rc<AstNode>, op: &str) -> Result<bool> {
        self.evaluate(node)?.as_bool().ok_or_else(|| {
            Error::evaluation(
                format!("'{op}' requires boolean operands"),
                Some(node.start()),
            )
        })
    }

    fn add(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        if let (Value::Mapping(l), Value::Mapping(r)) = (&lhs, &rhs) {
            return Ok(Value::Mapping(merge_wrappers(l, r)?));
        }
        if let (Value::List(l), Value::List(r)) = (&lhs, &rhs) {
            // force each side against its own configuration before joining,
            // so references inside an included list keep their anchoring
            let mut items = l.as_list()?;
            items.extend(r.as_list()?);
            return Ok(Value::List(Rc::new(ListWrapper::from_values(
                self.config.clone(),
                items,
            ))));
        }
        if let (Value::Str(l), Value::Str(r)) = (&lhs, &rhs) {
            return Ok(Value::Str(format!("{l}{r}")));
        }
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(a, c)) => a
                .checked_add(c)
                .map(Value::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow", Some(b.start))),
            Some(Nums::Floats(a, c)) => Ok(Value::Float(a + c)),
            Some(Nums::Complexes(a, c)) => Ok(Value::Complex(a + c)),
            None => Err(Error::evaluation(
                format!("unable to add {} to {}", rhs.type_name(), lhs.type_name()),
                Some(b.start),
            )),
        }
    }

    fn subtract(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        if let (Value::Mapping(l), Value::Mapping(r)) = (&lhs, &rhs) {
            // shallow difference: keys of the left not present in the right
            let mut entries = IndexMap::new();
            for (k, e) in l.entries() {
                if !r.contains_key(k) {
                    entries.insert(k.clone(), e.clone());
                }
            }
            return Ok(Value::Mapping(Rc::new(DictWrapper::new(
                l.config().clone(),
                entries,
            ))));
        }
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(a, c)) => a
                .checked_sub(c)
                .map(Value::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow", Some(b.start))),
            Some(Nums::Floats(a, c)) => Ok(Value::Float(a - c)),
            Some(Nums::Complexes(a, c)) => Ok(Value::Complex(a - c)),
            None => Err(Error::evaluation(
                format!(
                    "unable to subtract {} from {}",
                    rhs.type_name(),
                    lhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    fn multiply(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(a, c)) => a
                .checked_mul(c)
                .map(Value::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow", Some(b.start))),
            Some(Nums::Floats(a, c)) => Ok(Value::Float(a * c)),
            Some(Nums::Complexes(a, c)) => Ok(Value::Complex(a * c)),
            None => Err(Error::evaluation(
                format!(
                    "unable to multiply {} by {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    /// `/` always yields a float for integer operands.
    fn divide(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(a, c)) => Ok(Value::Float(a as f64 / c as f64)),
            Some(Nums::Floats(a, c)) => Ok(Value::Float(a / c)),
            Some(Nums::Complexes(a, c)) => Ok(Value::Complex(a / c)),
            None => Err(Error::evaluation(
                format!(
                    "unable to divide {} by {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    fn int_divide(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(_, 0)) => {
                Err(Error::evaluation("integer division by zero", Some(b.start)))
            }
            Some(Nums::Ints(a, c)) => a
                .checked_div(c)
                .map(Value::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow", Some(b.start))),
            _ => Err(Error::evaluation(
                format!(
                    "unable to integer divide {} by {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    fn modulo(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(_, 0)) => {
                Err(Error::evaluation("integer division by zero", Some(b.start)))
            }
            Some(Nums::Ints(a, c)) => a
                .checked_rem(c)
                .map(Value::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow", Some(b.start))),
            _ => Err(Error::evaluation(
                format!(
                    "unable to determine {} modulo {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    fn shift(&self, lhs: Value, rhs: Value, b: &BinaryNode, left: bool) -> Result<Value> {
        let out_of_range = || Error::evaluation("shift count out of range", Some(b.start));
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(a, c)) => {
                let count = u32::try_from(c).map_err(|_| out_of_range())?;
                let shifted = if left {
                    a.checked_shl(count)
                } else {
                    a.checked_shr(count)
                };
                shifted.map(Value::Integer).ok_or_else(out_of_range)
            }
            _ => Err(Error::evaluation(
                format!(
                    "unable to {} {} by {}",
                    if left { "left-shift" } else { "right-shift" },
                    lhs.type_name(),
                    rhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    fn power(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        match numeric(&lhs, &rhs) {
            Some(Nums::Ints(a, c)) => {
                // int ** int goes through f64 and truncates back
                let f = (a as f64).powf(c as f64);
                Ok(Value::Integer(f as i64))
            }
            Some(Nums::Floats(a, c)) => Ok(Value::Float(a.powf(c))),
            Some(Nums::Complexes(a, c)) => Ok(Value::Complex(a.pow(c))),
            None => Err(Error::evaluation(
                format!(
                    "unable to raise {} to the power of {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    /// `|` deep-merges mappings and bitwise-ors integers.
    fn bit_or(&self, lhs: Value, rhs: Value, b: &BinaryNode) -> Result<Value> {
        if let (Value::Mapping(l), Value::Mapping(r)) = (&lhs, &rhs) {
            return Ok(Value::Mapping(merge_wrappers(l, r)?));
        }
        match (&lhs, &rhs) {
            (Value::Integer(a), Value::Integer(c)) => Ok(Value::Integer(a | c)),
            _ => Err(Error::evaluation(
                format!(
                    "unable to bitwise-or {} to {}",
                    rhs.type_name(),
                    lhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    fn bit_op(&self, lhs: Value, rhs: Value, b: &BinaryNode, name: &str) -> Result<Value> {
        match (&lhs, &rhs) {
            (Value::Integer(a), Value::Integer(c)) => Ok(Value::Integer(if name.ends_with("and") {
                a & c
            } else {
                a ^ c
            })),
            _ => Err(Error::evaluation(
                format!(
                    "unable to {name} {} to {}",
                    rhs.type_name(),
                    lhs.type_name()
                ),
                Some(b.start),
            )),
        }
    }

    /// `@'file'`: locate, parse and wrap an included configuration. A mapping
    /// root becomes a child [`Config`]; any other root evaluates in place.
    fn eval_include(&self, u: &UnaryNode) -> Result<Value> {
        let operand = self.evaluate(&u.operand)?;
        let Value::Str(fname) = operand else {
            return Err(Error::evaluation(
                format!("@ operand must be a string, but is {}", operand.type_name()),
                Some(u.start),
            ));
        };
        let Some(path) = self.config.find_include(&fname) else {
            return Err(Error::evaluation(
                format!("unable to locate {fname}"),
                Some(u.start),
            ));
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::evaluation(format!("unable to read {}: {e}", path.display()), Some(u.start))
        })?;
        let mut parser = Parser::from_text(&text)?;
        let node = parser.container()?;
        if let AstNode::Mapping(items) = &*node {
            let child = self.config.new_child(&path);
            child.set_data(child.wrap_mapping(items)?);
            Ok(Value::Config(child))
        } else {
            self.evaluate(&node)
        }
    }

    /// Walk a path-shaped node from the enclosing configuration's root.
    /// Crossing into an included sub-configuration re-anchors the walk, so
    /// that file's own references resolve relative to its root.
    pub(crate) fn get_from_path(&self, node: &Rc<AstNode>) -> Result<Value> {
        let (first, elements) = path_elements(node)?;
        let mut current = self.config.clone();
        let mut result = current.get_inner(&key_of(&first))?;

        for element in &elements {
            result = match element {
                PathElement::Attr(token) => {
                    let key = key_of(token);
                    self.step_key(&mut current, result, &key, token.start)?
                }
                PathElement::Index(index_node) => {
                    let operand = match &**index_node {
                        AstNode::Token(t)
                            if matches!(t.kind, TokenKind::Integer | TokenKind::String)
                                && t.value.is_some() =>
                        {
                            t.value.clone().unwrap_or(Value::Null)
                        }
                        AstNode::Token(t) if t.kind == TokenKind::Word => {
                            Value::Str(t.text.clone())
                        }
                        _ => Evaluator::new(current.clone()).evaluate(index_node)?,
                    };
                    let loc = index_node.start();
                    // the container decides what kind of operand it takes:
                    // lists want integers, mappings and configurations want
                    // strings
                    match result {
                        container @ (Value::Mapping(_) | Value::Config(_)) => match operand {
                            Value::Str(key) => {
                                self.step_key(&mut current, container, &key, loc)?
                            }
                            other => {
                                return Err(Error::bad_index(
                                    format!("string required, but found {}", other.type_name()),
                                    Some(loc),
                                ));
                            }
                        },
                        Value::List(lw) => match operand {
                            Value::Integer(n) => {
                                let size = lw.len() as i64;
                                let mut i = n;
                                if i < 0 && i >= -size {
                                    i += size;
                                }
                                if i < 0 || i >= size {
                                    return Err(Error::bad_index(
                                        format!(
                                            "index out of range: is {n}, must be between 0 and {size}"
                                        ),
                                        Some(loc),
                                    ));
                                }
                                match lw.item(i as usize) {
                                    Some(entry) => current.force_entry(entry)?,
                                    None => return Err(Error::NotFound(n.to_string())),
                                }
                            }
                            other => {
                                return Err(Error::bad_index(
                                    format!("integer required, but found {}", other.type_name()),
                                    Some(loc),
                                ));
                            }
                        },
                        other => {
                            return Err(Error::evaluation(
                                format!("unable to index into {}", other.type_name()),
                                Some(loc),
                            ));
                        }
                    }
                }
                PathElement::Slice(slice_node) => {
                    let AstNode::Slice(sn) = &**slice_node else {
                        return Err(Error::evaluation(
                            "malformed slice in path",
                            Some(slice_node.start()),
                        ));
                    };
                    match &result {
                        Value::List(lw) => {
                            Value::List(self.get_slice(&current, lw, sn)?)
                        }
                        _ => {
                            return Err(Error::bad_index(
                                "slices can only operate on lists",
                                Some(sn.start),
                            ));
                        }
                    }
                }
            };
        }
        Ok(result)
    }

    fn step_key(
        &self,
        current: &mut Config,
        container: Value,
        key: &str,
        loc: crate::location::Location,
    ) -> Result<Value> {
        match container {
            Value::Mapping(dw) => match dw.entry(key) {
                Some(entry) => current.force_entry(entry),
                None => Err(Error::NotFound(key.to_string())),
            },
            Value::Config(cfg) => {
                // re-anchor: references inside the included file resolve
                // against that file's root
                *current = cfg.clone();
                cfg.get_inner(key)
            }
            other => Err(Error::evaluation(
                format!("unable to get {key} from {}", other.type_name()),
                Some(loc),
            )),
        }
    }

    fn get_slice(
        &self,
        current: &Config,
        source: &ListWrapper,
        slice: &SliceNode,
    ) -> Result<Rc<ListWrapper>> {
        let evaluator = Evaluator::new(current.clone());
        let index_of = |node: &Option<Rc<AstNode>>| -> Result<Option<i64>> {
            match node {
                Some(n) => match evaluator.evaluate(n)? {
                    Value::Integer(i) => Ok(Some(i)),
                    v => Err(Error::bad_index(
                        format!("integer required, but found {}", v.type_name()),
                        Some(n.start()),
                    )),
                },
                None => Ok(None),
            }
        };

        let size = source.len() as i64;
        let step = index_of(&slice.step)?.unwrap_or(1);
        if step == 0 {
            return Err(Error::evaluation("slice step cannot be zero", Some(slice.start)));
        }

        let mut start = match index_of(&slice.start_index)? {
            None => 0,
            Some(mut i) => {
                if i < 0 {
                    i = if i >= -size { i + size } else { 0 };
                } else if i >= size {
                    i = size - 1;
                }
                i
            }
        };
        let mut stop = match index_of(&slice.stop_index)? {
            None => size - 1,
            Some(mut i) => {
                if i < 0 {
                    i = if i >= -size { i + size } else { 0 };
                }
                if i > size {
                    i = size;
                }
                if step < 0 { i + 1 } else { i - 1 }
            }
        };
        if step < 0 && start < stop {
            std::mem::swap(&mut start, &mut stop);
        }

        let mut items: Vec<Entry> = Vec::new();
        let mut i = start;
        while if step > 0 { i <= stop } else { i >= stop } {
            match source.item(i as usize) {
                Some(entry) => items.push(entry.clone()),
                None => break,
            }
            i += step;
        }
        Ok(Rc::new(ListWrapper::new(source.config().clone(), items)))
    }
}

enum Nums {
    Ints(i64, i64),
    Floats(f64, f64),
    Complexes(Complex, Complex),
}

/// Promote a pair of numeric operands: complex wins over float, float over
/// integer.
fn numeric(l: &Value, r: &Value) -> Option<Nums> {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => Some(Nums::Ints(*a, *b)),
        (Value::Complex(a), Value::Complex(b)) => Some(Nums::Complexes(*a, *b)),
        (Value::Complex(a), _) => r.as_f64().map(|b| Nums::Complexes(*a, b.into())),
        (_, Value::Complex(b)) => l.as_f64().map(|a| Nums::Complexes(a.into(), *b)),
        (Value::Float(_), _) | (_, Value::Float(_)) => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => Some(Nums::Floats(a, b)),
            _ => None,
        },
        _ => None,
    }
}

/// Recursive merge: keys of the right override the left, except that two
/// mapping values merge recursively.
fn merge_wrappers(lhs: &DictWrapper, rhs: &DictWrapper) -> Result<Rc<DictWrapper>> {
    let mut out: IndexMap<String, Value> = IndexMap::with_capacity(lhs.len() + rhs.len());
    for key in lhs.keys() {
        out.insert(key.clone(), lhs.get(key)?);
    }
    for key in rhs.keys() {
        let value = rhs.get(key)?;
        let merged = match (out.get(key.as_str()), &value) {
            (Some(Value::Mapping(a)), Value::Mapping(b)) => Value::Mapping(merge_wrappers(a, b)?),
            _ => value,
        };
        out.insert(key.clone(), merged);
    }
    Ok(Rc::new(DictWrapper::from_map(lhs.config().clone(), out)))
}

/// One step of a path after its leading word.
pub(crate) enum PathElement {
    Attr(Token),
    Index(Rc<AstNode>),
    Slice(Rc<AstNode>),
}

/// Flatten a path-shaped node into its leading token and trailer steps.
pub(crate) fn path_elements(node: &AstNode) -> Result<(Token, Vec<PathElement>)> {
    let mut first: Option<Token> = None;
    let mut elements = Vec::new();
    visit(node, &mut first, &mut elements)?;
    match first {
        Some(token) => Ok((token, elements)),
        None => Err(Error::evaluation("unable to compute path", None)),
    }
}

fn visit(node: &AstNode, first: &mut Option<Token>, out: &mut Vec<PathElement>) -> Result<()> {
    match node {
        AstNode::Token(t) => {
            *first = Some(t.clone());
            Ok(())
        }
        AstNode::Unary(u) => visit(&u.operand, first, out),
        AstNode::Binary(b) => {
            visit(&b.left, first, out)?;
            match b.kind {
                TokenKind::Dot => match &*b.right {
                    AstNode::Token(t) => {
                        out.push(PathElement::Attr(t.clone()));
                        Ok(())
                    }
                    _ => Err(Error::evaluation(
                        "unexpected node after '.' in path",
                        Some(b.start),
                    )),
                },
                TokenKind::LeftBracket => {
                    out.push(PathElement::Index(b.right.clone()));
                    Ok(())
                }
                TokenKind::Colon => {
                    out.push(PathElement::Slice(b.right.clone()));
                    Ok(())
                }
                kind => Err(Error::evaluation(
                    format!("unexpected node kind in path: {kind:?}"),
                    Some(b.start),
                )),
            }
        }
        _ => Err(Error::evaluation("unable to compute path", None)),
    }
}

/// Parse a string-form path (`server.hosts[0]`). The first token must be a
/// word, and the whole string must be consumed.
pub fn parse_path(source: &str) -> Result<Rc<AstNode>> {
    let invalid = || Error::InvalidPath(source.to_string());
    let mut parser = Parser::from_text(source).map_err(|_| invalid())?;
    let node = parser.primary().map_err(|_| invalid())?;
    if !parser.at_end() {
        return Err(invalid());
    }
    let (first, _) = path_elements(&node).map_err(|_| invalid())?;
    if first.kind != TokenKind::Word {
        return Err(invalid());
    }
    Ok(node)
}

/// Canonical source rendering of a path-shaped node; round-trips with
/// [`parse_path`].
pub fn to_source(node: &AstNode) -> String {
    if let AstNode::Token(t) = node {
        return t.text.clone();
    }
    if let AstNode::Slice(s) = node {
        return slice_source(s);
    }
    match path_elements(node) {
        Ok((first, elements)) => {
            let mut out = first.text;
            for element in &elements {
                match element {
                    PathElement::Attr(t) => {
                        out.push('.');
                        out.push_str(&t.text);
                    }
                    PathElement::Index(n) => {
                        out.push('[');
                        out.push_str(&to_source(n));
                        out.push(']');
                    }
                    PathElement::Slice(n) => {
                        out.push('[');
                        out.push_str(&to_source(n));
                        out.push(']');
                    }
                }
            }
            out
        }
        Err(_) => format!("<{:?}>", node.kind()),
    }
}

fn slice_source(s: &SliceNode) -> String {
    let mut out = String::new();
    if let Some(n) = &s.start_index {
        out.push_str(&to_source(n));
    }
    out.push(':');
    if let Some(n) = &s.stop_index {
        out.push_str(&to_source(n));
    }
    if let Some(n) = &s.step {
        out.push(':');
        out.push_str(&to_source(n));
    }
    out
}
