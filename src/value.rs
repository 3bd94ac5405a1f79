use std::cell::RefCell;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

use crate::ast::AstNode;
use crate::config::Config;
use crate::error::{Error, Result};

/// A complex number with `f64` components, produced by `j`-suffixed literals
/// and kept through arithmetic promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    /// `z ** w` computed as `exp(w * ln z)`.
    pub fn pow(self, w: Complex) -> Complex {
        if self.re == 0.0 && self.im == 0.0 {
            // 0 ** 0 is 1 by convention, 0 ** w is 0 otherwise
            if w.re == 0.0 && w.im == 0.0 {
                return Complex::new(1.0, 0.0);
            }
            return Complex::new(0.0, 0.0);
        }
        let ln_r = (self.re * self.re + self.im * self.im).sqrt().ln();
        let theta = self.im.atan2(self.re);
        let scale = (w.re * ln_r - w.im * theta).exp();
        let angle = w.im * ln_r + w.re * theta;
        Complex::new(scale * angle.cos(), scale * angle.sin())
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Complex::new(re, 0.0)
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Complex;
    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Div for Complex {
    type Output = Complex;
    fn div(self, rhs: Complex) -> Complex {
        let d = rhs.re * rhs.re + rhs.im * rhs.im;
        Complex::new(
            (self.re * rhs.re + self.im * rhs.im) / d,
            (self.im * rhs.re - self.re * rhs.im) / d,
        )
    }
}

impl Neg for Complex {
    type Output = Complex;
    fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "({}{}j)", self.re, self.im)
        } else {
            write!(f, "({}+{}j)", self.re, self.im)
        }
    }
}

/// A configuration value.
///
/// Containers are lazy: `List` and `Mapping` hold wrappers whose elements are
/// evaluated on first access and memoized. `Config` appears for included
/// sub-configurations (`@'other.cfg'` with a mapping root).
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Complex(Complex),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
    List(Rc<ListWrapper>),
    Mapping(Rc<DictWrapper>),
    Config(Config),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) | Value::DateTimeTz(_) => "datetime",
            Value::List(_) => "list",
            Value::Mapping(_) => "mapping",
            Value::Config(_) => "configuration",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Containers compare by forced contents, so two independently built
    /// structures are equal when they resolve to the same plain values.
    /// Sub-configurations compare by identity.
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Complex(a), Value::Complex(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::DateTimeTz(a), Value::DateTimeTz(b)) => a == b,
            (Value::List(a), Value::List(b)) => match (a.as_list(), b.as_list()) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            },
            (Value::Mapping(a), Value::Mapping(b)) => match (a.as_dict(), b.as_dict()) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            },
            (Value::Config(a), Value::Config(b)) => a.same_as(b),
            _ => false,
        }
    }
}

/// One element of a lazy container: the unevaluated node and the memoized
/// result of evaluating it. Entries built from already-plain values carry no
/// node.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    node: Option<Rc<AstNode>>,
    value: RefCell<Option<Value>>,
}

impl Entry {
    pub(crate) fn from_node(node: Rc<AstNode>) -> Self {
        Entry {
            node: Some(node),
            value: RefCell::new(None),
        }
    }

    pub(crate) fn from_value(value: Value) -> Self {
        Entry {
            node: None,
            value: RefCell::new(Some(value)),
        }
    }

    pub(crate) fn node(&self) -> Option<&Rc<AstNode>> {
        self.node.as_ref()
    }

    pub(crate) fn memo(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    pub(crate) fn remember(&self, value: Value) {
        *self.value.borrow_mut() = Some(value);
    }
}

/// A lazily evaluated mapping, bound to the [`Config`] its elements resolve
/// against.
#[derive(Debug)]
pub struct DictWrapper {
    config: Config,
    entries: IndexMap<String, Entry>,
}

impl DictWrapper {
    pub(crate) fn new(config: Config, entries: IndexMap<String, Entry>) -> Self {
        DictWrapper { config, entries }
    }

    pub(crate) fn from_map(config: Config, values: IndexMap<String, Value>) -> Self {
        let entries = values
            .into_iter()
            .map(|(k, v)| (k, Entry::from_value(v)))
            .collect();
        DictWrapper { config, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Evaluate (once) and return the element stored under `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        match self.entries.get(key) {
            Some(entry) => self.config.force_entry(entry),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    /// Force every element, recursively, into a plain snapshot.
    pub fn as_dict(&self) -> Result<IndexMap<String, Value>> {
        let mut result = IndexMap::with_capacity(self.entries.len());
        for (key, entry) in &self.entries {
            let value = snapshot(self.config.force_entry(entry)?)?;
            result.insert(key.clone(), value);
        }
        Ok(result)
    }

    pub(crate) fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub(crate) fn entries(&self) -> &IndexMap<String, Entry> {
        &self.entries
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }
}

/// A lazily evaluated list, bound to the [`Config`] its elements resolve
/// against.
#[derive(Debug)]
pub struct ListWrapper {
    config: Config,
    items: Vec<Entry>,
}

impl ListWrapper {
    pub(crate) fn new(config: Config, items: Vec<Entry>) -> Self {
        ListWrapper { config, items }
    }

    pub(crate) fn from_values(config: Config, values: Vec<Value>) -> Self {
        let items = values.into_iter().map(Entry::from_value).collect();
        ListWrapper { config, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Evaluate (once) and return the element at `index`.
    pub fn get(&self, index: usize) -> Result<Value> {
        match self.items.get(index) {
            Some(entry) => self.config.force_entry(entry),
            None => Err(Error::bad_index(
                format!(
                    "index out of range: is {index}, must be between 0 and {}",
                    self.items.len()
                ),
                None,
            )),
        }
    }

    /// Force every element, recursively, into a plain snapshot.
    pub fn as_list(&self) -> Result<Vec<Value>> {
        let mut result = Vec::with_capacity(self.items.len());
        for entry in &self.items {
            result.push(snapshot(self.config.force_entry(entry)?)?);
        }
        Ok(result)
    }

    pub(crate) fn item(&self, index: usize) -> Option<&Entry> {
        self.items.get(index)
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }
}

/// Replace container values with fully forced copies.
pub(crate) fn snapshot(value: Value) -> Result<Value> {
    match value {
        Value::Mapping(dw) => Ok(Value::Mapping(Rc::new(DictWrapper::from_map(
            dw.config().clone(),
            dw.as_dict()?,
        )))),
        Value::List(lw) => Ok(Value::List(Rc::new(ListWrapper::from_values(
            lw.config().clone(),
            lw.as_list()?,
        )))),
        Value::Config(cfg) => {
            let data = cfg.as_dict()?;
            Ok(Value::Mapping(Rc::new(DictWrapper::from_map(cfg, data))))
        }
        other => Ok(other),
    }
}
