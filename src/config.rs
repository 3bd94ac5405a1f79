use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::ast::{AstNode, ListItems, MappingItems};
use crate::convert::{default_string_converter, StringConverter, SymbolResolver};
use crate::error::{Error, Result};
use crate::evaluator::{key_of, parse_path, to_source, Evaluator};
use crate::location::Location;
use crate::parser::Parser;
use crate::value::{DictWrapper, Entry, ListWrapper, Value};

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\W\d]\w*$").unwrap());

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(s)
}

/// A loaded configuration.
///
/// Values evaluate lazily on first access and are memoized in place; an
/// optional per-key cache sits in front of that. Cloning a `Config` yields a
/// handle to the same underlying configuration.
#[derive(Clone)]
pub struct Config {
    inner: Rc<ConfigInner>,
}

struct ConfigInner {
    data: RefCell<Option<Rc<DictWrapper>>>,
    cache: RefCell<Option<IndexMap<String, Value>>>,
    context: RefCell<IndexMap<String, Value>>,
    include_path: RefCell<Vec<PathBuf>>,
    path: RefCell<Option<PathBuf>>,
    root_dir: RefCell<Option<PathBuf>>,
    parent: RefCell<Weak<ConfigInner>>,
    no_duplicates: Cell<bool>,
    strict_conversions: Cell<bool>,
    converter: RefCell<StringConverter>,
    resolver: RefCell<Option<Rc<dyn SymbolResolver>>>,
    // $-reference nodes on the active evaluation stack, for cycle detection
    refs_seen: RefCell<Vec<Rc<AstNode>>>,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.path.borrow().as_ref() {
            Some(p) => write!(f, "Config({})", p.display()),
            None => write!(f, "Config"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config {
            inner: Rc::new(ConfigInner {
                data: RefCell::new(None),
                cache: RefCell::new(None),
                context: RefCell::new(IndexMap::new()),
                include_path: RefCell::new(Vec::new()),
                path: RefCell::new(None),
                root_dir: RefCell::new(None),
                parent: RefCell::new(Weak::new()),
                no_duplicates: Cell::new(true),
                strict_conversions: Cell::new(true),
                converter: RefCell::new(Rc::new(|s, cfg| default_string_converter(s, cfg))),
                resolver: RefCell::new(None),
                refs_seen: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::new();
        config.load_file(path)?;
        Ok(config)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let config = Config::new();
        config.load(text)?;
        Ok(config)
    }

    /// Parse `text` as a configuration document and replace any existing
    /// data. The root must be a mapping.
    pub fn load(&self, text: &str) -> Result<()> {
        let mut parser = Parser::from_text(text)?;
        let node = parser.container()?;
        let AstNode::Mapping(items) = &*node else {
            return Err(Error::evaluation("root configuration must be a mapping", None));
        };
        if !parser.at_end() {
            return Err(Error::parser(
                "unexpected input after configuration",
                parser.position(),
            ));
        }
        let data = self.wrap_mapping(items)?;
        *self.inner.data.borrow_mut() = Some(data);
        Ok(())
    }

    /// Load from a file; the file's directory becomes the root for relative
    /// includes.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Argument(format!("unable to read {}: {e}", path.display())))?;
        let full = std::path::absolute(path)
            .map_err(|e| Error::Argument(format!("unable to resolve {}: {e}", path.display())))?;
        *self.inner.root_dir.borrow_mut() = full.parent().map(Path::to_path_buf);
        *self.inner.path.borrow_mut() = Some(full);
        self.load(&text)
    }

    /// Fetch by key or path, error if absent. Plain string results pass
    /// through the string converter (leniently: an unconvertible string is
    /// returned as is).
    pub fn get(&self, key: &str) -> Result<Value> {
        let value = self.get_opt(key, None)?;
        Ok(self.converted(value))
    }

    /// Fetch by key or path, substituting `default` when the key is absent.
    /// Malformed paths, bad indexes and circular references still error.
    pub fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        let value = self.get_opt(key, Some(&default))?;
        Ok(self.converted(value))
    }

    /// Force the whole configuration, recursively, into plain values.
    pub fn as_dict(&self) -> Result<IndexMap<String, Value>> {
        let data = self.inner.data.borrow().clone();
        match data {
            Some(dw) => dw.as_dict(),
            None => Err(Error::evaluation("no data in configuration", None)),
        }
    }

    /// Apply the string converter to `s`. Under strict conversions a string
    /// no rule matches is an error; otherwise it is returned unchanged.
    pub fn convert_string(&self, s: &str) -> Result<Value> {
        let converter = self.inner.converter.borrow().clone();
        match converter(s, self) {
            Some(v) => Ok(v),
            None => {
                if self.inner.strict_conversions.get() {
                    Err(Error::Conversion(s.to_string()))
                } else {
                    Ok(Value::Str(s.to_string()))
                }
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        self.inner.cache.borrow().is_some()
    }

    /// Enable or disable the per-key result cache. Disabling discards any
    /// cached results.
    pub fn set_cached(&self, cached: bool) {
        let mut cache = self.inner.cache.borrow_mut();
        if cached {
            if cache.is_none() {
                *cache = Some(IndexMap::new());
            }
        } else {
            *cache = None;
        }
    }

    pub fn no_duplicates(&self) -> bool {
        self.inner.no_duplicates.get()
    }

    /// When disabled, a repeated key silently replaces the earlier entry
    /// instead of failing the load.
    pub fn set_no_duplicates(&self, no_duplicates: bool) {
        self.inner.no_duplicates.set(no_duplicates);
    }

    pub fn strict_conversions(&self) -> bool {
        self.inner.strict_conversions.get()
    }

    pub fn set_strict_conversions(&self, strict: bool) {
        self.inner.strict_conversions.set(strict);
    }

    /// Variables visible to bare words in expressions.
    pub fn set_context(&self, context: IndexMap<String, Value>) {
        *self.inner.context.borrow_mut() = context;
    }

    pub fn add_include_path(&self, dir: impl Into<PathBuf>) {
        self.inner.include_path.borrow_mut().push(dir.into());
    }

    pub fn set_string_converter(&self, converter: StringConverter) {
        *self.inner.converter.borrow_mut() = converter;
    }

    pub fn set_symbol_resolver(&self, resolver: Rc<dyn SymbolResolver>) {
        *self.inner.resolver.borrow_mut() = Some(resolver);
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.path.borrow().clone()
    }

    pub fn root_dir(&self) -> Option<PathBuf> {
        self.inner.root_dir.borrow().clone()
    }

    /// The including configuration, for configurations created by `@`.
    pub fn parent(&self) -> Option<Config> {
        self.inner.parent.borrow().upgrade().map(|inner| Config { inner })
    }

    /// Whether two handles refer to the same underlying configuration.
    pub fn same_as(&self, other: &Config) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn get_opt(&self, key: &str, default: Option<&Value>) -> Result<Value> {
        if let Some(cache) = self.inner.cache.borrow().as_ref() {
            if let Some(v) = cache.get(key) {
                return Ok(v.clone());
            }
        }
        let data = self.inner.data.borrow().clone();
        let Some(dw) = data else {
            return Err(Error::evaluation("no data in configuration", None));
        };
        let result = if dw.contains_key(key) {
            dw.get(key)?
        } else if is_identifier(key) {
            match default {
                Some(v) => v.clone(),
                None => return Err(Error::NotFound(key.to_string())),
            }
        } else {
            // treat as a path
            match self.get_from_path_str(key) {
                Ok(v) => v,
                Err(
                    e @ (Error::InvalidPath(_)
                    | Error::BadIndex { .. }
                    | Error::CircularReference(_)),
                ) => return Err(e),
                Err(_) => match default {
                    Some(v) => v.clone(),
                    None => return Err(Error::NotFound(key.to_string())),
                },
            }
        };
        if let Some(cache) = self.inner.cache.borrow_mut().as_mut() {
            cache.insert(key.to_string(), result.clone());
        }
        Ok(result)
    }

    fn get_from_path_str(&self, path: &str) -> Result<Value> {
        self.inner.refs_seen.borrow_mut().clear();
        let node = parse_path(path)?;
        Evaluator::new(self.clone()).get_from_path(&node)
    }

    fn converted(&self, value: Value) -> Value {
        if let Value::Str(s) = &value {
            let converter = self.inner.converter.borrow().clone();
            if let Some(v) = converter(s, self) {
                return v;
            }
        }
        value
    }

    /// Path lookup that leaves the reference stack alone, for use during an
    /// evaluation already in progress (string interpolation).
    pub(crate) fn lookup_path(&self, path: &str) -> Result<Value> {
        let node = parse_path(path)?;
        Evaluator::new(self.clone()).get_from_path(&node)
    }

    /// Fetch a top-level key without surface conversion; the entry point for
    /// path walks.
    pub(crate) fn get_inner(&self, key: &str) -> Result<Value> {
        let data = self.inner.data.borrow().clone();
        let Some(dw) = data else {
            return Err(Error::evaluation("no data in configuration", None));
        };
        match dw.entry(key) {
            Some(entry) => self.force_entry(entry),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    /// Evaluate an element once, memoizing the result. Failures are not
    /// memoized, so a later access retries.
    pub(crate) fn force_entry(&self, entry: &Entry) -> Result<Value> {
        if let Some(v) = entry.memo() {
            return Ok(v);
        }
        let Some(node) = entry.node() else {
            return Ok(Value::Null);
        };
        let value = Evaluator::new(self.clone()).evaluate(node)?;
        entry.remember(value.clone());
        Ok(value)
    }

    /// Track a `$`-reference for the duration of its evaluation; finding the
    /// same node already on the stack is a cycle, reported with every
    /// reference that participates.
    pub(crate) fn push_ref(&self, node: &Rc<AstNode>) -> Result<()> {
        let mut refs = self.inner.refs_seen.borrow_mut();
        if refs.iter().any(|seen| Rc::ptr_eq(seen, node)) {
            let mut parts: Vec<String> = refs.iter().map(|n| describe_ref(n)).collect();
            parts.sort();
            return Err(Error::CircularReference(parts.join(", ")));
        }
        refs.push(node.clone());
        Ok(())
    }

    pub(crate) fn pop_ref(&self) {
        self.inner.refs_seen.borrow_mut().pop();
    }

    pub(crate) fn lookup_context(&self, name: &str) -> Option<Value> {
        self.inner.context.borrow().get(name).cloned()
    }

    pub(crate) fn symbol_resolver(&self) -> Option<Rc<dyn SymbolResolver>> {
        self.inner.resolver.borrow().clone()
    }

    pub(crate) fn wrap_mapping(&self, node: &MappingItems) -> Result<Rc<DictWrapper>> {
        let mut entries = IndexMap::with_capacity(node.items.len());
        let mut seen: Option<IndexMap<String, Location>> = if self.inner.no_duplicates.get() {
            Some(IndexMap::new())
        } else {
            None
        };
        for (token, value) in &node.items {
            let key = key_of(token);
            if let Some(seen) = seen.as_mut() {
                if let Some(original) = seen.get(&key) {
                    return Err(Error::DuplicateKey {
                        key,
                        location: token.start,
                        original: *original,
                    });
                }
                seen.insert(key.clone(), token.start);
            }
            entries.insert(key, Entry::from_node(value.clone()));
        }
        Ok(Rc::new(DictWrapper::new(self.clone(), entries)))
    }

    pub(crate) fn wrap_list(&self, node: &ListItems) -> Rc<ListWrapper> {
        let items = node.items.iter().cloned().map(Entry::from_node).collect();
        Rc::new(ListWrapper::new(self.clone(), items))
    }

    /// Resolve an include name against the loading file's directory, then
    /// each configured include directory.
    pub(crate) fn find_include(&self, fname: &str) -> Option<PathBuf> {
        let p = Path::new(fname);
        if p.is_absolute() {
            return p.exists().then(|| p.to_path_buf());
        }
        let mut dirs: Vec<PathBuf> = Vec::new();
        match self.inner.root_dir.borrow().as_ref() {
            Some(rd) => dirs.push(rd.clone()),
            None => dirs.push(PathBuf::from(".")),
        }
        dirs.extend(self.inner.include_path.borrow().iter().cloned());
        for dir in dirs {
            let candidate = dir.join(fname);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    /// A configuration for an included file: shares the parent's context,
    /// cache policy and include path, starts from default policies
    /// otherwise.
    pub(crate) fn new_child(&self, path: &Path) -> Config {
        let child = Config::new();
        *child.inner.context.borrow_mut() = self.inner.context.borrow().clone();
        *child.inner.include_path.borrow_mut() = self.inner.include_path.borrow().clone();
        if self.is_cached() {
            child.set_cached(true);
        }
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        *child.inner.root_dir.borrow_mut() = path.parent().map(Path::to_path_buf);
        *child.inner.path.borrow_mut() = Some(path.to_path_buf());
        child
    }

    pub(crate) fn set_data(&self, data: Rc<DictWrapper>) {
        *self.inner.data.borrow_mut() = Some(data);
    }
}

fn describe_ref(node: &AstNode) -> String {
    match node {
        AstNode::Unary(u) => format!("{} {}", to_source(&u.operand), u.start),
        other => to_source(other),
    }
}
