// tests/config_tests.rs

use std::rc::Rc;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use indexmap::IndexMap;

use cfglang::error::Error;
use cfglang::value::Complex;
use cfglang::{Config, SymbolResolver, Value};

fn config(text: &str) -> Config {
    Config::from_text(text).unwrap()
}

fn get(cfg: &Config, key: &str) -> Value {
    cfg.get(key).unwrap()
}

fn get_err(cfg: &Config, key: &str) -> Error {
    cfg.get(key).unwrap_err()
}

fn as_ints(v: &Value) -> Vec<i64> {
    match v {
        Value::List(lw) => lw
            .as_list()
            .unwrap()
            .iter()
            .map(|x| x.as_i64().unwrap())
            .collect(),
        other => panic!("expected a list, got {}", other.type_name()),
    }
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_scalar_values() {
    let cfg = config("a: 1\nb: 1.5\nc: true\nd: null\ne: 'some text'");
    assert_eq!(get(&cfg, "a"), Value::Integer(1));
    assert_eq!(get(&cfg, "b"), Value::Float(1.5));
    assert_eq!(get(&cfg, "c"), Value::Bool(true));
    assert_eq!(get(&cfg, "d"), Value::Null);
    assert_eq!(get(&cfg, "e"), Value::Str("some text".to_string()));
}

#[test]
fn test_missing_key() {
    let cfg = config("a: 1");
    assert_eq!(
        get_err(&cfg, "missing").to_string(),
        "not found in configuration: missing"
    );
}

#[test]
fn test_no_data() {
    let err = Config::new().get("a").unwrap_err();
    assert_eq!(err.to_string(), "no data in configuration");
}

#[test]
fn test_root_must_be_mapping() {
    let err = Config::from_text("[1, 2]").unwrap_err();
    assert_eq!(err.to_string(), "root configuration must be a mapping");
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_arithmetic() {
    let cfg = config(concat!(
        "total: 1 + 2 * 3\n",
        "quotient: 7 / 2\n",
        "floored: 7 // 2\n",
        "remainder: 7 % 4\n",
        "big: 2 ** 10\n",
        "shifted: 1 << 4\n",
        "masked: 6 & 3\n",
        "either: 6 | 1\n",
        "toggled: 6 ^ 3\n",
        "negated: -(1 + 2)\n",
    ));
    assert_eq!(get(&cfg, "total"), Value::Integer(7));
    assert_eq!(get(&cfg, "quotient"), Value::Float(3.5));
    assert_eq!(get(&cfg, "floored"), Value::Integer(3));
    assert_eq!(get(&cfg, "remainder"), Value::Integer(3));
    assert_eq!(get(&cfg, "big"), Value::Integer(1024));
    assert_eq!(get(&cfg, "shifted"), Value::Integer(16));
    assert_eq!(get(&cfg, "masked"), Value::Integer(2));
    assert_eq!(get(&cfg, "either"), Value::Integer(7));
    assert_eq!(get(&cfg, "toggled"), Value::Integer(5));
    assert_eq!(get(&cfg, "negated"), Value::Integer(-3));
}

#[test]
fn test_complex_arithmetic() {
    let cfg = config("z: 1.5 + 3j\nw: 2j * 3j");
    assert_eq!(get(&cfg, "z"), Value::Complex(Complex::new(1.5, 3.0)));
    assert_eq!(get(&cfg, "w"), Value::Complex(Complex::new(-6.0, 0.0)));
}

#[test]
fn test_division_by_zero() {
    let cfg = config("x: 1 // 0\ny: 1 % 0");
    assert_eq!(get_err(&cfg, "x").to_string(), "integer division by zero");
    assert_eq!(get_err(&cfg, "y").to_string(), "integer division by zero");
}

#[test]
fn test_boolean_operators() {
    let cfg = config("t: true and false\nu: true || false\nn: not true");
    assert_eq!(get(&cfg, "t"), Value::Bool(false));
    assert_eq!(get(&cfg, "u"), Value::Bool(true));
    assert_eq!(get(&cfg, "n"), Value::Bool(false));
}

#[test]
fn test_string_concatenation() {
    let cfg = config("s: 'foo' 'bar'\nt: 'foo' + 'baz'");
    assert_eq!(get(&cfg, "s"), Value::Str("foobar".to_string()));
    assert_eq!(get(&cfg, "t"), Value::Str("foobaz".to_string()));
}

// ============================================================================
// References and Paths
// ============================================================================

#[test]
fn test_references() {
    let cfg = config("a: 1\nb: $a + 2\nc: $b * $b");
    assert_eq!(get(&cfg, "b"), Value::Integer(3));
    assert_eq!(get(&cfg, "c"), Value::Integer(9));
}

#[test]
fn test_nested_paths() {
    let cfg = config("server: {hosts: ['a', 'b', 'c'], port: 80}");
    assert_eq!(get(&cfg, "server.port"), Value::Integer(80));
    assert_eq!(get(&cfg, "server.hosts[0]"), Value::Str("a".to_string()));
    assert_eq!(get(&cfg, "server.hosts[-1]"), Value::Str("c".to_string()));
}

#[test]
fn test_index_out_of_range() {
    let cfg = config("hosts: ['a', 'b', 'c']");
    let err = get_err(&cfg, "hosts[3]");
    assert_eq!(
        err.to_string(),
        "index out of range: is 3, must be between 0 and 3"
    );
    let err = get_err(&cfg, "hosts[-4]");
    assert_eq!(
        err.to_string(),
        "index out of range: is -4, must be between 0 and 3"
    );
    // bad indexes are never silenced by a default
    let err = cfg.get_or("hosts[3]", Value::Null).unwrap_err();
    assert!(matches!(err, Error::BadIndex { .. }));
}

#[test]
fn test_index_type_errors() {
    let cfg = config("hosts: ['a']\nports: {web: 80}");
    assert_eq!(
        get_err(&cfg, "hosts['x']").to_string(),
        "integer required, but found string"
    );
    assert_eq!(
        get_err(&cfg, "ports[0]").to_string(),
        "string required, but found integer"
    );
    let cfg = config("m: {a: 1}");
    assert_eq!(
        get_err(&cfg, "m[1:2]").to_string(),
        "slices can only operate on lists"
    );
}

#[test]
fn test_invalid_path() {
    let cfg = config("a: 1");
    let err = get_err(&cfg, "a b");
    assert_eq!(err.to_string(), "invalid path: a b");
}

// ============================================================================
// Slices
// ============================================================================

#[test]
fn test_slices() {
    let cfg = config("nums: [0, 1, 2, 3, 4, 5, 6]");
    assert_eq!(as_ints(&get(&cfg, "nums[:]")), vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(as_ints(&get(&cfg, "nums[1:4]")), vec![1, 2, 3]);
    assert_eq!(as_ints(&get(&cfg, "nums[::2]")), vec![0, 2, 4, 6]);
    assert_eq!(as_ints(&get(&cfg, "nums[::-1]")), vec![6, 5, 4, 3, 2, 1, 0]);
    assert_eq!(as_ints(&get(&cfg, "nums[2:-2:2]")), vec![2, 4]);
    assert_eq!(as_ints(&get(&cfg, "nums[-3:]")), vec![4, 5, 6]);
}

#[test]
fn test_slice_step_cannot_be_zero() {
    let cfg = config("nums: [1, 2, 3]");
    assert_eq!(
        get_err(&cfg, "nums[::0]").to_string(),
        "slice step cannot be zero"
    );
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_mapping_merge() {
    let cfg = config("merged: {a: 1, b: {x: 1}} + {b: {y: 2}, c: 3}");
    assert_eq!(get(&cfg, "merged.a"), Value::Integer(1));
    assert_eq!(get(&cfg, "merged.b.x"), Value::Integer(1));
    assert_eq!(get(&cfg, "merged.b.y"), Value::Integer(2));
    assert_eq!(get(&cfg, "merged.c"), Value::Integer(3));
}

#[test]
fn test_reference_merge() {
    let cfg = config("defaults: {timeout: 10, retries: 3}\nservice: $defaults + {retries: 5}");
    assert_eq!(get(&cfg, "service.timeout"), Value::Integer(10));
    assert_eq!(get(&cfg, "service.retries"), Value::Integer(5));
}

#[test]
fn test_mapping_subtract() {
    let cfg = config("d: {a: 1, b: 2} - {b: 0}");
    match get(&cfg, "d") {
        Value::Mapping(dw) => {
            let keys: Vec<&String> = dw.keys().collect();
            assert_eq!(keys, vec!["a"]);
            assert_eq!(dw.get("a").unwrap(), Value::Integer(1));
        }
        other => panic!("expected a mapping, got {}", other.type_name()),
    }
}

#[test]
fn test_list_concatenation() {
    let cfg = config("l: [1, 2] + [3]");
    assert_eq!(as_ints(&get(&cfg, "l")), vec![1, 2, 3]);
}

// ============================================================================
// Circular References
// ============================================================================

#[test]
fn test_self_reference() {
    let cfg = config("a: $a");
    assert_eq!(
        get_err(&cfg, "a").to_string(),
        "circular reference: a (1, 5)"
    );
}

#[test]
fn test_three_way_cycle() {
    let cfg = config("a: $b\nb: $c\nc: $a");
    assert_eq!(
        get_err(&cfg, "a").to_string(),
        "circular reference: a (3, 5), b (1, 5), c (2, 5)"
    );
}

#[test]
fn test_cycle_through_expressions() {
    let cfg = config("a: $b + 1\nb: $a + 1");
    assert_eq!(
        get_err(&cfg, "a").to_string(),
        "circular reference: a (2, 5), b (1, 5)"
    );
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let cfg = config("base: {x: 1}\nleft: $base\nright: $base\nboth: $left + $right");
    assert_eq!(get(&cfg, "both.x"), Value::Integer(1));
}

// ============================================================================
// Duplicate Keys
// ============================================================================

#[test]
fn test_duplicate_keys_rejected() {
    let err = Config::from_text("a: 1\na: 2").unwrap_err();
    assert_eq!(
        err.to_string(),
        "duplicate key a seen at (2, 1) (previously at (1, 1))"
    );
}

#[test]
fn test_duplicate_keys_allowed_when_disabled() {
    let cfg = Config::new();
    cfg.set_no_duplicates(false);
    cfg.load("a: 1\na: 2").unwrap();
    assert_eq!(get(&cfg, "a"), Value::Integer(2));
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn test_cache_holds_defaults() {
    let cfg = config("a: 1");
    cfg.set_cached(true);
    assert_eq!(
        cfg.get_or("missing", Value::Integer(42)).unwrap(),
        Value::Integer(42)
    );
    // the substituted default was cached under the key
    assert_eq!(get(&cfg, "missing"), Value::Integer(42));

    cfg.set_cached(false);
    assert!(cfg.get("missing").is_err());
}

#[test]
fn test_cache_shadows_reload() {
    let cfg = config("a: 1");
    cfg.set_cached(true);
    assert_eq!(get(&cfg, "a"), Value::Integer(1));
    // the cached result wins over reloaded data until the cache is dropped
    cfg.load("a: 2").unwrap();
    assert_eq!(get(&cfg, "a"), Value::Integer(1));
    cfg.set_cached(false);
    assert_eq!(get(&cfg, "a"), Value::Integer(2));
}

#[test]
fn test_get_or() {
    let cfg = config("a: 1\nm: {x: 2}");
    assert_eq!(cfg.get_or("a", Value::Null).unwrap(), Value::Integer(1));
    assert_eq!(
        cfg.get_or("missing", Value::Integer(9)).unwrap(),
        Value::Integer(9)
    );
    // a missing path (as opposed to a malformed one) also takes the default
    assert_eq!(
        cfg.get_or("m.nope", Value::Integer(9)).unwrap(),
        Value::Integer(9)
    );
}

// ============================================================================
// Context Variables
// ============================================================================

#[test]
fn test_context() {
    let cfg = config("w: width * 2");
    cfg.set_context(IndexMap::from([(
        "width".to_string(),
        Value::Integer(21),
    )]));
    assert_eq!(get(&cfg, "w"), Value::Integer(42));
}

#[test]
fn test_unknown_variable() {
    let cfg = config("w: width * 2");
    assert_eq!(get_err(&cfg, "w").to_string(), "unknown variable 'width'");
}

// ============================================================================
// String Conversion
// ============================================================================

#[test]
fn test_date_conversion() {
    let cfg = config(concat!(
        "d: `2019-03-28`\n",
        "dt: `2019-03-28 23:27:04.314159`\n",
        "dtz: `2019-03-28T23:27:04+05:30`\n",
    ));
    let date = NaiveDate::from_ymd_opt(2019, 3, 28).unwrap();
    assert_eq!(get(&cfg, "d"), Value::Date(date));
    assert_eq!(
        get(&cfg, "dt"),
        Value::DateTime(date.and_hms_micro_opt(23, 27, 4, 314_159).unwrap())
    );
    let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
    let expected = offset
        .from_local_datetime(&date.and_hms_opt(23, 27, 4).unwrap())
        .unwrap();
    assert_eq!(get(&cfg, "dtz"), Value::DateTimeTz(expected));
}

#[test]
fn test_surface_conversion_of_plain_strings() {
    // a plain string fetched through get also goes through the converter
    let cfg = config("when: '2019-03-28'");
    assert_eq!(
        get(&cfg, "when"),
        Value::Date(NaiveDate::from_ymd_opt(2019, 3, 28).unwrap())
    );
}

#[test]
fn test_env_conversion() {
    unsafe {
        std::env::set_var("CFGLANG_TEST_HOME", "/home/test");
    }
    let cfg = config(concat!(
        "home: `$CFGLANG_TEST_HOME`\n",
        "missing: `$CFGLANG_TEST_ABSENT|fallback`\n",
        "gone: `$CFGLANG_TEST_ABSENT`\n",
    ));
    assert_eq!(get(&cfg, "home"), Value::Str("/home/test".to_string()));
    assert_eq!(get(&cfg, "missing"), Value::Str("fallback".to_string()));
    assert_eq!(get(&cfg, "gone"), Value::Null);
}

#[test]
fn test_interpolation() {
    let cfg = config(concat!(
        "name: 'world'\n",
        "greeting: `Hello, ${name}!`\n",
        "xs: [1, 2]\n",
        "rendered: `${xs}`\n",
    ));
    assert_eq!(
        get(&cfg, "greeting"),
        Value::Str("Hello, world!".to_string())
    );
    assert_eq!(get(&cfg, "rendered"), Value::Str("[1, 2]".to_string()));
}

#[test]
fn test_failed_interpolation_is_strict_failure() {
    let cfg = config("s: `${nope}`");
    let err = get_err(&cfg, "s");
    assert_eq!(err.to_string(), "unable to convert string ${nope}");

    let cfg = config("s: `${nope}`");
    cfg.set_strict_conversions(false);
    assert_eq!(get(&cfg, "s"), Value::Str("${nope}".to_string()));
}

#[test]
fn test_symbol_resolver() {
    struct TestResolver;

    impl SymbolResolver for TestResolver {
        fn resolve(
            &self,
            package: Option<&str>,
            name: &str,
            member: Option<&str>,
        ) -> Option<Value> {
            match (package, name, member) {
                (None, "math.pi", None) => Some(Value::Float(std::f64::consts::PI)),
                _ => None,
            }
        }
    }

    let cfg = config("pi: `math.pi`");
    assert_eq!(
        get_err(&cfg, "pi").to_string(),
        "unable to convert string math.pi"
    );

    let cfg = config("pi: `math.pi`");
    cfg.set_symbol_resolver(Rc::new(TestResolver));
    assert_eq!(get(&cfg, "pi"), Value::Float(std::f64::consts::PI));
}

// ============================================================================
// Includes
// ============================================================================

#[test]
fn test_include_file() {
    let cfg = Config::from_file("tests/data/main.cfg").unwrap();
    assert_eq!(
        get(&cfg, "server.host"),
        Value::Str("example.com".to_string())
    );
    // $host inside server.cfg resolves against that file's own root
    assert_eq!(
        get(&cfg, "server.url"),
        Value::Str("http://example.com".to_string())
    );
    assert_eq!(get(&cfg, "port"), Value::Integer(8081));
}

#[test]
fn test_included_config_has_parent() {
    let cfg = Config::from_file("tests/data/main.cfg").unwrap();
    match get(&cfg, "server") {
        Value::Config(child) => {
            assert!(child.parent().unwrap().same_as(&cfg));
            assert!(child.path().unwrap().ends_with("server.cfg"));
        }
        other => panic!("expected a configuration, got {}", other.type_name()),
    }
}

#[test]
fn test_include_path() {
    let cfg = Config::new();
    cfg.add_include_path("tests/data/sub");
    cfg.load("extra: @'extra.cfg'").unwrap();
    assert_eq!(get(&cfg, "extra.flavor"), Value::Str("vanilla".to_string()));
}

#[test]
fn test_include_list_root() {
    let cfg = Config::new();
    cfg.add_include_path("tests/data");
    cfg.load("nums: @'lists.cfg'").unwrap();
    assert_eq!(get(&cfg, "nums[1]"), Value::Integer(2));
}

#[test]
fn test_list_concat_across_include() {
    let cfg = Config::new();
    cfg.add_include_path("tests/data");
    cfg.load("inc: @'parts.cfg'\ncombined: [1] + $inc.xs").unwrap();
    // $base inside parts.cfg resolves against that file's own root, even
    // after its list is concatenated into this one
    assert_eq!(get(&cfg, "combined[1]"), Value::Integer(10));
    assert_eq!(as_ints(&get(&cfg, "combined")), vec![1, 10]);
}

#[test]
fn test_missing_include() {
    let cfg = config("x: @'does-not-exist.cfg'");
    assert_eq!(
        get_err(&cfg, "x").to_string(),
        "unable to locate does-not-exist.cfg"
    );
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_as_dict() {
    let cfg = config("a: 1\nb: {c: $a + 1, d: [1, 'two']}");
    let d = cfg.as_dict().unwrap();
    assert_eq!(d["a"], Value::Integer(1));
    match &d["b"] {
        Value::Mapping(dw) => {
            assert_eq!(dw.get("c").unwrap(), Value::Integer(2));
            match dw.get("d").unwrap() {
                Value::List(lw) => {
                    assert_eq!(lw.get(0).unwrap(), Value::Integer(1));
                    assert_eq!(lw.get(1).unwrap(), Value::Str("two".to_string()));
                }
                other => panic!("expected a list, got {}", other.type_name()),
            }
        }
        other => panic!("expected a mapping, got {}", other.type_name()),
    }
}
