//! Built-in placeholder rules: how values are rendered for `?`, `@` and the
//! built-in `%type` families.

use sha2::Digest;

use crate::error::{Error, Result};
use crate::escape::Escaper;
use crate::registry::{Modifiers, RangeSpec, Registry};
use crate::value::{format_float, Category, Number, Value};

const JSON_ENCODE: &[&str] = &["json_encode", "jsonencode", "jsonify", "to_json"];
const JSON_DECODE: &[&str] = &["json_decode", "from_json", "fromjson"];

/// Where in a template a value is being rendered; used to build errors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Site<'a> {
    pub template: &'a str,
    pub token: &'a str,
    pub index: usize,
}

impl Site<'_> {
    pub fn type_error(&self, value: &Value, expected: impl Into<String>) -> Error {
        Error::Type {
            template: self.template.to_owned(),
            index: self.index,
            found: value.category().name(),
            expected: expected.into(),
        }
    }

    pub fn range_error(&self, reason: impl Into<String>) -> Error {
        Error::Range {
            template: self.template.to_owned(),
            token: self.token.to_owned(),
            index: self.index,
            reason: reason.into(),
        }
    }
}

/// Numeric text for integers, finite floats and numeric-looking strings.
pub(crate) fn numeric_literal(value: &Value) -> Option<String> {
    match value {
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) if f.is_finite() => Some(format_float(*f)),
        Value::Str(s) if value.is_numeric() => Some(s.clone()),
        _ => None,
    }
}

fn scalar_escaped(value: &Value, escaper: &dyn Escaper) -> Option<String> {
    match value.category() {
        Category::Integer | Category::Float => numeric_literal(value),
        Category::String => value.as_str().map(|s| escaper.quote(s)),
        Category::Null => Some("NULL".to_owned()),
        Category::Bool => Some(bool_literal(value)),
        _ => None,
    }
}

fn bool_literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_owned(),
        _ => "0".to_owned(),
    }
}

/// Renders a value for `?`: numbers bare, strings quoted, lists element by element.
pub(crate) fn render_escaped(value: &Value, escaper: &dyn Escaper, site: Site<'_>) -> Result<String> {
    if let Some(out) = scalar_escaped(value, escaper) {
        return Ok(out);
    }
    match value {
        Value::List(items) => render_escaped_list(items, escaper, site),
        _ => Err(site.type_error(
            value,
            "only scalar (int, float, string, bool), NULL and single dimension arrays are allowed in `?` statements",
        )),
    }
}

pub(crate) fn render_escaped_list(items: &[Value], escaper: &dyn Escaper, site: Site<'_>) -> Result<String> {
    let rendered = items
        .iter()
        .map(|item| {
            scalar_escaped(item, escaper).ok_or_else(|| {
                site.type_error(
                    item,
                    "only scalar (int, float, string, bool) and NULL values are allowed in arrays",
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

/// Renders a value for `@`: no quoting or escaping at all.
///
/// List elements are joined without escaping; this is deliberately weaker than `?`.
pub(crate) fn render_raw(value: &Value, site: Site<'_>) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Null => Ok("NULL".to_owned()),
        Value::Bool(_) => Ok(bool_literal(value)),
        Value::List(items) => render_raw_list(items, site),
        _ => numeric_literal(value).ok_or_else(|| {
            site.type_error(
                value,
                "only scalar (int, float, string, bool), NULL and single dimension arrays are allowed in `@` (raw output) statements",
            )
        }),
    }
}

pub(crate) fn render_raw_list(items: &[Value], site: Site<'_>) -> Result<String> {
    let rendered = items
        .iter()
        .map(|item| match item {
            Value::List(_) | Value::Map(_) | Value::Handler(_) => Err(site.type_error(
                item,
                "only scalar values are allowed in arrays",
            )),
            _ => render_raw(item, site),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

/// `s`, `string`, `varchar`, `char`, `text`.
///
/// `whole` carries the unpacked parameter list when the JSON encoders should
/// encode all of it instead of the single consumed value.
pub(crate) fn apply_text(
    value: Value,
    whole: Option<&Value>,
    modifiers: &Modifiers<'_>,
    registry: &Registry,
    escaper: &dyn Escaper,
    site: Site<'_>,
) -> Result<String> {
    let mut value = value;

    if registry.builtin_modifier_any(modifiers, JSON_ENCODE) {
        if let Some(whole) = whole {
            value = whole.clone();
        }
        if registry.builtin_modifier(modifiers, "pack") {
            value = map_strings(value, &pack);
        } else if registry.builtin_modifier(modifiers, "trim") {
            value = map_strings(value, &|s: &str| s.trim().to_owned());
        }
        value = Value::Str(serde_json::to_string(&value.to_json())?);
    } else if registry.builtin_modifier_any(modifiers, JSON_DECODE) {
        let text = value
            .as_str()
            .ok_or_else(|| site.type_error(&value, "only string values can be JSON decoded"))?;
        value = Value::from(serde_json::from_str::<serde_json::Value>(text)?);
    }

    let mut text = match value {
        Value::Str(s) => s,
        other => {
            return Err(site.type_error(
                &other,
                "only string values are allowed for %s statements",
            ))
        }
    };

    if registry.builtin_modifier(modifiers, "pack") {
        text = pack(&text);
    } else if registry.builtin_modifier(modifiers, "trim") {
        text = text.trim().to_owned();
    }

    if registry.builtin_modifier(modifiers, "enull") && text.is_empty() {
        return Ok("NULL".to_owned());
    }

    text = transform_case(text, modifiers, registry);
    text = transform_hash(text, modifiers, registry);

    for name in modifiers.segments() {
        if let Some(rule) = registry.custom_modifier(name) {
            text = rule.apply(&text);
        }
    }

    if let Some(range) = modifiers.range() {
        text = check_length(text, range, registry.builtin_modifier(modifiers, "crop"), site)?;
    }

    if registry.builtin_modifier(modifiers, "raw") {
        return Ok(text);
    }
    let body = if registry.builtin_modifier(modifiers, "noescape") {
        text
    } else {
        escaper.escape(&text)
    };
    if registry.builtin_modifier(modifiers, "noquot") {
        return Ok(body);
    }
    let q = escaper.quote_char();
    Ok(format!("{q}{body}{q}"))
}

/// `d`, `int`, `float`, ... and `u`, `unsigned`.
pub(crate) fn apply_numeric(
    value: &Value,
    unsigned: bool,
    modifiers: &Modifiers<'_>,
    registry: &Registry,
    site: Site<'_>,
) -> Result<String> {
    let number = value.as_number().ok_or_else(|| {
        site.type_error(
            value,
            "only numeric data types (integer and float) are allowed for %d and %f statements",
        )
    })?;
    if unsigned && number.is_negative() {
        return Err(site.range_error(format!("unsigned value required, got {number}")));
    }

    if registry.builtin_modifier(modifiers, "clamp") {
        let range = modifiers.range_after("clamp").ok_or_else(|| {
            site.range_error("`:clamp` requires a numeric range, eg. :clamp:10 or :clamp:1:10")
        })?;
        let (min, max) = clamp_bounds(range, site)?;
        return finite(number.clamp(min, max), value, site);
    }

    numeric_literal(value).ok_or_else(|| site.type_error(value, "finite numeric value required"))
}

/// `clamp`: `%clamp:1:10`, `%clamp:10`, `%clamp::10`.
pub(crate) fn apply_clamp(value: &Value, modifiers: &Modifiers<'_>, site: Site<'_>) -> Result<String> {
    let number = value.as_number().ok_or_else(|| {
        site.type_error(
            value,
            "only numeric data types (integer and float) are allowed for %clamp statements",
        )
    })?;
    let range = modifiers.range().ok_or_else(|| {
        site.range_error("%clamp requires a numeric range, eg. %clamp:1:10 or %clamp::100")
    })?;
    let (min, max) = clamp_bounds(range, site)?;
    finite(number.clamp(min, max), value, site)
}

fn finite(number: Number, value: &Value, site: Site<'_>) -> Result<String> {
    if number.as_f64().is_finite() {
        Ok(number.to_string())
    } else {
        Err(site.type_error(value, "finite numeric value required"))
    }
}

fn clamp_bounds(range: RangeSpec<'_>, site: Site<'_>) -> Result<(Option<Number>, Option<Number>)> {
    let parse = |s: &str| {
        Number::parse(s).ok_or_else(|| site.range_error(format!("invalid clamp bound `{s}`")))
    };
    match range {
        RangeSpec::Single(max) => Ok((Some(Number::Int(0)), Some(parse(max)?))),
        RangeSpec::Bounds(min, max) => Ok((min.map(parse).transpose()?, max.map(parse).transpose()?)),
    }
}

fn check_length(text: String, range: RangeSpec<'_>, crop: bool, site: Site<'_>) -> Result<String> {
    let parse = |s: &str| {
        s.parse::<usize>().map_err(|_| {
            site.range_error("length ranges require valid numeric values, eg. %s:10 or %s:8:50")
        })
    };
    let (min, max) = match range {
        RangeSpec::Single(max) => (None, Some(parse(max)?)),
        RangeSpec::Bounds(min, max) => (min.map(parse).transpose()?, max.map(parse).transpose()?),
    };
    // a zero bound means no bound
    let (min, max) = (min.filter(|&n| n > 0), max.filter(|&n| n > 0));

    let len = text.chars().count();
    if let Some(min) = min {
        if len < min {
            return Err(site.range_error(format!(
                "string must be a minimum of {min} characters in length; input has only {len}"
            )));
        }
    }
    match max {
        Some(max) if len > max && crop => Ok(text.chars().take(max).collect()),
        Some(max) if len > max => Err(site.range_error(format!(
            "string must be at most {max} characters and cropping is not enabled; add `:crop` to crop automatically"
        ))),
        _ => Ok(text),
    }
}

fn pack(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn map_strings(value: Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Str(s) => Value::Str(f(&s)),
        Value::List(items) => Value::List(items.into_iter().map(|v| map_strings(v, f)).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, map_strings(v, f)))
                .collect(),
        ),
        other => other,
    }
}

fn transform_case(text: String, modifiers: &Modifiers<'_>, registry: &Registry) -> String {
    let mut text = text;
    if registry.builtin_modifier_any(modifiers, &["lower", "tolower", "lcase"]) {
        text = text.to_lowercase();
    }
    if registry.builtin_modifier_any(modifiers, &["upper", "toupper", "ucase"]) {
        text = text.to_uppercase();
    }
    if registry.builtin_modifier(modifiers, "ucfirst") {
        text = ucfirst(&text);
    }
    if registry.builtin_modifier(modifiers, "ucwords") {
        text = ucwords(&text);
    }
    text
}

fn transform_hash(text: String, modifiers: &Modifiers<'_>, registry: &Registry) -> String {
    let mut text = text;
    if registry.builtin_modifier(modifiers, "md5") {
        text = hex_digest::<md5::Md5>(&text);
    }
    if registry.builtin_modifier(modifiers, "sha1") {
        text = hex_digest::<sha1::Sha1>(&text);
    } else if registry.builtin_modifier(modifiers, "sha256") {
        text = hex_digest::<sha2::Sha256>(&text);
    } else if registry.builtin_modifier(modifiers, "sha384") {
        text = hex_digest::<sha2::Sha384>(&text);
    } else if registry.builtin_modifier(modifiers, "sha512") {
        text = hex_digest::<sha2::Sha512>(&text);
    }
    text
}

fn hex_digest<D: Digest>(text: &str) -> String {
    hex::encode(D::digest(text.as_bytes()))
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ucwords(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphanumeric() || c == '\'';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::MySqlEscaper;

    const SITE: Site<'static> = Site {
        template: "%s",
        token: "%s",
        index: 0,
    };

    fn text(value: impl Into<Value>, modifiers: &str) -> Result<String> {
        let registry = Registry::new();
        let m = Modifiers::parse(modifiers, None);
        apply_text(value.into(), None, &m, &registry, &MySqlEscaper::default(), SITE)
    }

    #[test]
    fn test_render_escaped_scalars() {
        let e = MySqlEscaper::default();
        assert_eq!(render_escaped(&Value::from(5), &e, SITE).unwrap(), "5");
        assert_eq!(render_escaped(&Value::from("5"), &e, SITE).unwrap(), "5");
        assert_eq!(render_escaped(&Value::from("a'b"), &e, SITE).unwrap(), r#""a\'b""#);
        assert_eq!(render_escaped(&Value::Null, &e, SITE).unwrap(), "NULL");
        assert_eq!(render_escaped(&Value::Bool(false), &e, SITE).unwrap(), "0");
        assert_eq!(
            render_escaped(&Value::from(vec![Value::from(1), Value::from("x"), Value::Null]), &e, SITE)
                .unwrap(),
            r#"1, "x", NULL"#
        );
    }

    #[test]
    fn test_render_escaped_rejects_nested_and_maps() {
        let e = MySqlEscaper::default();
        let nested = Value::List(vec![Value::List(vec![])]);
        assert!(matches!(render_escaped(&nested, &e, SITE), Err(Error::Type { .. })));
        let map = Value::Map(vec![]);
        assert!(matches!(render_escaped(&map, &e, SITE), Err(Error::Type { found: "map", .. })));
        assert!(matches!(
            render_escaped(&Value::Float(f64::NAN), &e, SITE),
            Err(Error::Type { .. })
        ));
    }

    #[test]
    fn test_render_raw() {
        assert_eq!(render_raw(&Value::from("CURDATE()"), SITE).unwrap(), "CURDATE()");
        assert_eq!(render_raw(&Value::Null, SITE).unwrap(), "NULL");
        assert_eq!(render_raw(&Value::Bool(true), SITE).unwrap(), "1");
        assert_eq!(render_raw(&Value::from(vec!["a", "b'"]), SITE).unwrap(), "a, b'");
    }

    #[test]
    fn test_text_trim_pack_enull() {
        assert_eq!(text("  a  b  ", ":trim").unwrap(), "\"a  b\"");
        assert_eq!(text("  a  \n b  ", ":pack").unwrap(), "\"a b\"");
        assert_eq!(text("   ", ":trim:enull").unwrap(), "NULL");
        assert_eq!(text("", "").unwrap(), "\"\"");
    }

    #[test]
    fn test_text_rejects_non_strings() {
        assert!(matches!(text(5, ""), Err(Error::Type { found: "integer", .. })));
    }

    #[test]
    fn test_text_case_modifiers() {
        assert_eq!(text("HeLLo", ":lower").unwrap(), "\"hello\"");
        assert_eq!(text("hello", ":upper").unwrap(), "\"HELLO\"");
        assert_eq!(text("élan vital", ":ucfirst").unwrap(), "\"Élan vital\"");
        assert_eq!(text("o'NEIL of the YARD", ":ucwords").unwrap(), r#""O\'neil Of The Yard""#);
        assert_eq!(ucwords("o'NEIL of the YARD"), "O'neil Of The Yard");
    }

    #[test]
    fn test_text_hashes() {
        assert_eq!(text("abc", ":md5").unwrap(), "\"900150983cd24fb0d6963f7d28e17f72\"");
        assert_eq!(
            text("abc", ":sha1").unwrap(),
            "\"a9993e364706816aba3e25717850c26c9cd0d89d\""
        );
        assert_eq!(
            text("abc", ":sha256").unwrap(),
            "\"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\""
        );
        assert_eq!(text("abc", ":sha512").unwrap().len(), 128 + 2);
    }

    #[test]
    fn test_text_length_range() {
        assert_eq!(text("abcdef", ":3:10").unwrap(), "\"abcdef\"");
        assert!(matches!(text("ab", ":3:10"), Err(Error::Range { .. })));
        assert!(matches!(text("abcdef", ":4"), Err(Error::Range { .. })));
        assert_eq!(text("abcdef", ":4:crop").unwrap(), "\"abcd\"");
        assert_eq!(text("ab", "::4").unwrap(), "\"ab\"");
        assert_eq!(text("abcdef", ":2:").unwrap(), "\"abcdef\"");
        assert!(matches!(text("abc", ":-1:4"), Err(Error::Range { .. })));
    }

    #[test]
    fn test_text_zero_length_bound_is_ignored() {
        assert_eq!(text("abc", ":0").unwrap(), "\"abc\"");
        assert_eq!(text("abc", ":0:5").unwrap(), "\"abc\"");
        assert_eq!(text("", ":0:5").unwrap(), "\"\"");
        assert!(matches!(text("abcdef", ":0:5"), Err(Error::Range { .. })));
        assert_eq!(text("abcdef", ":2:0").unwrap(), "\"abcdef\"");
    }

    #[test]
    fn test_text_quoting_policy() {
        assert_eq!(text("a'b", ":raw").unwrap(), "a'b");
        assert_eq!(text("a'b", ":noquot").unwrap(), r"a\'b");
        assert_eq!(text("a'b", ":noescape").unwrap(), "\"a'b\"");
    }

    #[test]
    fn test_text_json() {
        let v = Value::from(vec!["  a ", "b"]);
        assert_eq!(text(v, ":trim:json_encode:noescape").unwrap(), r#""["a","b"]""#);
        assert_eq!(text(r#""decoded""#, ":json_decode").unwrap(), "\"decoded\"");
        assert!(matches!(text("[1,2]", ":json_decode"), Err(Error::Type { .. })));
        assert!(matches!(text("{oops", ":from_json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_custom_modifier_applies_in_order() {
        let mut registry = Registry::new();
        registry.register_modifier("reverse", |s: &str| s.chars().rev().collect::<String>());
        let m = Modifiers::parse(":upper:reverse", None);
        let out = apply_text(
            Value::from("abc"),
            None,
            &m,
            &registry,
            &MySqlEscaper::default(),
            SITE,
        )
        .unwrap();
        assert_eq!(out, "\"CBA\"");
    }

    #[test]
    fn test_numeric() {
        let registry = Registry::new();
        let none = Modifiers::default();
        assert_eq!(apply_numeric(&Value::from(5), false, &none, &registry, SITE).unwrap(), "5");
        assert_eq!(apply_numeric(&Value::from("2.5"), false, &none, &registry, SITE).unwrap(), "2.5");
        assert!(matches!(
            apply_numeric(&Value::from("5x"), false, &none, &registry, SITE),
            Err(Error::Type { .. })
        ));
        assert!(matches!(
            apply_numeric(&Value::from(-1), true, &none, &registry, SITE),
            Err(Error::Range { .. })
        ));
    }

    #[test]
    fn test_numeric_clamp_modifier() {
        let registry = Registry::new();
        let clamp = |v: i64, m: &str| {
            apply_numeric(&Value::from(v), false, &Modifiers::parse(m, None), &registry, SITE)
        };
        assert_eq!(clamp(50, ":clamp:1:10").unwrap(), "10");
        assert_eq!(clamp(-5, ":clamp:10").unwrap(), "0");
        assert_eq!(clamp(-5, ":clamp:-3:3").unwrap(), "-3");
        assert!(matches!(clamp(5, ":clamp"), Err(Error::Range { .. })));

        let m = Modifiers::parse(":clamp:1:", None);
        assert!(matches!(
            apply_numeric(&Value::Float(f64::INFINITY), false, &m, &registry, SITE),
            Err(Error::Type { .. })
        ));
        assert!(matches!(
            apply_numeric(&Value::Float(f64::NAN), false, &m, &registry, SITE),
            Err(Error::Type { .. })
        ));
    }

    #[test]
    fn test_clamp_type() {
        let clamp = |v: Value, m: &str| apply_clamp(&v, &Modifiers::parse(m, None), SITE);
        assert_eq!(clamp(Value::from(0.5), ":0.0:1.0").unwrap(), "0.5");
        assert_eq!(clamp(Value::from(7), ":1:5").unwrap(), "5");
        assert_eq!(clamp(Value::from(-7), ":5").unwrap(), "0");
        assert_eq!(clamp(Value::from(700), "::100").unwrap(), "100");
        assert!(matches!(clamp(Value::from(1), ""), Err(Error::Range { .. })));
        assert!(matches!(clamp(Value::from("x"), ":1:2"), Err(Error::Type { .. })));
        assert!(matches!(clamp(Value::Float(f64::NAN), ":1:"), Err(Error::Type { .. })));
        assert!(matches!(clamp(Value::Float(f64::INFINITY), ":1:"), Err(Error::Type { .. })));
        assert_eq!(clamp(Value::Float(f64::INFINITY), ":1:10").unwrap(), "10");
    }
}
