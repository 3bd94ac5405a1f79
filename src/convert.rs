//! Backtick-string conversion: the default converter recognizes ISO-8601
//! dates, environment-variable references, dotted symbol references and
//! `${path}` interpolations.

use std::rc::Rc;
use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use regex::Regex;

use crate::config::Config;
use crate::value::Value;

/// A string converter: returns `None` when the string is not in a
/// recognized form, leaving strictness handling to the caller.
pub type StringConverter = Rc<dyn Fn(&str, &Config) -> Option<Value>>;

/// Resolves `package,name:member` strings from the colon-object form of a
/// backtick string. The default configuration has no resolver, so such
/// strings pass through unconverted.
pub trait SymbolResolver {
    fn resolve(&self, package: Option<&str>, name: &str, member: Option<&str>) -> Option<Value>;
}

static ISO_DATETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(([ T])(((\d{2}):(\d{2}):(\d{2}))(\.\d{1,6})?(([+-])(\d{2}):(\d{2})(:(\d{2})(\.\d{1,6})?)?)?))?$",
    )
    .unwrap()
});

static ENV_VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$(\w+)(\|(.*))?$").unwrap());

static COLON_OBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z_]\w*(\.[A-Za-z_]\w*)*),)?([A-Za-z_]\w*(\.[A-Za-z_]\w*)*)(:([A-Za-z_]\w*))?$")
        .unwrap()
});

static INTERPOLATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

pub(crate) fn default_string_converter(s: &str, cfg: &Config) -> Option<Value> {
    if let Some(m) = ISO_DATETIME_PATTERN.captures(s) {
        return convert_datetime(&m);
    }
    if let Some(m) = ENV_VALUE_PATTERN.captures(s) {
        let name = m.get(1).map(|g| g.as_str()).unwrap_or_default();
        return match std::env::var(name) {
            Ok(v) => Some(Value::Str(v)),
            Err(_) => {
                if m.get(2).is_some() {
                    Some(Value::Str(
                        m.get(3).map(|g| g.as_str()).unwrap_or_default().to_string(),
                    ))
                } else {
                    Some(Value::Null)
                }
            }
        };
    }
    if let Some(m) = COLON_OBJECT_PATTERN.captures(s) {
        let package = m.get(2).map(|g| g.as_str());
        let name = m.get(4).map(|g| g.as_str()).unwrap_or_default();
        let member = m.get(7).map(|g| g.as_str());
        return cfg
            .symbol_resolver()
            .and_then(|r| r.resolve(package, name, member));
    }
    interpolate(s, cfg)
}

fn convert_datetime(m: &regex::Captures<'_>) -> Option<Value> {
    let group = |i: usize| m.get(i).map(|g| g.as_str());
    let int = |i: usize| group(i).and_then(|v| v.parse::<u32>().ok());

    let year = group(1)?.parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, int(2)?, int(3)?)?;
    if group(5).is_none() {
        return Some(Value::Date(date));
    }

    let micros = match group(11) {
        // the group includes the leading dot
        Some(frac) => (frac.parse::<f64>().ok()? * 1_000_000.0).round() as u32,
        None => 0,
    };
    let dt = date.and_hms_micro_opt(int(8)?, int(9)?, int(10)?, micros)?;
    let Some(sign) = group(13) else {
        return Some(Value::DateTime(dt));
    };

    // offset seconds, when present, are ignored
    let seconds = (int(14)? * 3600 + int(15)? * 60) as i32;
    let offset = if sign == "-" {
        FixedOffset::west_opt(seconds)?
    } else {
        FixedOffset::east_opt(seconds)?
    };
    offset.from_local_datetime(&dt).single().map(Value::DateTimeTz)
}

/// Replace each `${path}` with the looked-up value; any failing path leaves
/// the whole string unconverted.
fn interpolate(s: &str, cfg: &Config) -> Option<Value> {
    let mut out = String::new();
    let mut cp = 0;
    let mut any = false;
    for m in INTERPOLATION_PATTERN.captures_iter(s) {
        any = true;
        let whole = m.get(0)?;
        let path = m.get(1)?.as_str();
        out.push_str(&s[cp..whole.start()]);
        let value = cfg.lookup_path(path).ok()?;
        out.push_str(&stringify(&value)?);
        cp = whole.end();
    }
    if !any {
        return None;
    }
    out.push_str(&s[cp..]);
    Some(Value::Str(out))
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Integer(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Complex(c) => Some(c.to_string()),
        Value::Str(s) => Some(s.clone()),
        Value::Date(d) => Some(d.to_string()),
        Value::DateTime(dt) => Some(dt.to_string()),
        Value::DateTimeTz(dt) => Some(dt.to_string()),
        Value::List(lw) => {
            let items = lw
                .as_list()
                .ok()?
                .iter()
                .map(|v| stringify(v))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("[{}]", items.join(", ")))
        }
        Value::Mapping(dw) => {
            let items = dw
                .as_dict()
                .ok()?
                .iter()
                .map(|(k, v)| Some(format!("{k}: {}", stringify(v)?)))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("{{{}}}", items.join(", ")))
        }
        Value::Config(cfg) => {
            let items = cfg
                .as_dict()
                .ok()?
                .iter()
                .map(|(k, v)| Some(format!("{k}: {}", stringify(v)?)))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("{{{}}}", items.join(", ")))
        }
    }
}
