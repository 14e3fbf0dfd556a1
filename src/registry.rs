use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Number, Value};

/// Types with built-in handling in `%type` placeholders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinType {
    /// `s`, `string`, `varchar`, `char`, `text`: quoted and escaped, length ranges.
    Text,
    /// `d`, `f`, `e`, `float`, `id`, `int`, `integer`, `byte`, `bit`: bare numbers.
    Numeric,
    /// `u`, `unsigned`: bare numbers, negatives rejected.
    Unsigned,
    /// `clamp`: numbers forced into the `:min:max` range.
    Clamp,
    /// `bool`, `boolean`, `date`, `datetime`, `timestamp`: emitted as given.
    Passthrough,
}

impl BuiltinType {
    pub fn lookup(name: &str) -> Option<Self> {
        let ty = match name {
            "s" | "string" | "varchar" | "char" | "text" => BuiltinType::Text,
            "d" | "f" | "e" | "float" | "id" | "int" | "integer" | "byte" | "bit" => {
                BuiltinType::Numeric
            }
            "u" | "unsigned" => BuiltinType::Unsigned,
            "clamp" => BuiltinType::Clamp,
            "bool" | "boolean" | "date" | "datetime" | "timestamp" => BuiltinType::Passthrough,
            _ => return None,
        };
        Some(ty)
    }
}

/// Bounds parsed from `:min:max`, `:max`, `:min:` or `::max` modifier segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpec<'t> {
    /// A lone bound; string types read it as a maximum, clamps as `0..=n`.
    Single(&'t str),
    Bounds(Option<&'t str>, Option<&'t str>),
}

/// Modifier segments of a typed placeholder, with the `{...}` argument appended.
///
/// `%varchar:trim:crop{8:100}` has the segments `trim`, `crop`, `8`, `100`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers<'t> {
    segments: Vec<&'t str>,
}

impl<'t> Modifiers<'t> {
    pub fn parse(modifiers: &'t str, arg: Option<&'t str>) -> Self {
        let mut segments: Vec<&'t str> = modifiers.split(':').skip(1).collect();
        if let Some(arg) = arg {
            segments.extend(arg.split(':'));
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[&'t str] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.segments.iter().any(|s| *s == name)
    }

    pub fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has(name))
    }

    pub fn is_nullable(&self) -> bool {
        self.has_any(&["n", "null", "nullable"])
    }

    /// First numeric range among all segments.
    pub fn range(&self) -> Option<RangeSpec<'t>> {
        parse_range(&self.segments)
    }

    /// Numeric range directly following the `name` segment, e.g. `:clamp:1:10`.
    pub fn range_after(&self, name: &str) -> Option<RangeSpec<'t>> {
        let at = self.segments.iter().position(|s| *s == name)?;
        let tail = &self.segments[at + 1..];
        match tail.first() {
            Some(first) if first.is_empty() || is_bound(first) => parse_range(tail),
            _ => None,
        }
    }
}

fn is_bound(s: &str) -> bool {
    Number::parse(s).is_some()
}

fn parse_range<'t>(segments: &[&'t str]) -> Option<RangeSpec<'t>> {
    let i = segments.iter().position(|s| is_bound(s))?;
    if i > 0 && segments[i - 1].is_empty() {
        return Some(RangeSpec::Bounds(None, Some(segments[i])));
    }
    let spec = match segments.get(i + 1) {
        Some(next) if is_bound(next) => RangeSpec::Bounds(Some(segments[i]), Some(next)),
        Some(next) if next.is_empty() => RangeSpec::Bounds(Some(segments[i]), None),
        _ => RangeSpec::Single(segments[i]),
    };
    Some(spec)
}

/// Custom handling for a `%type` placeholder.
///
/// Returning `Some` splices the string verbatim; `None` falls back to the
/// built-in handling of the same name, or pass-through if there is none.
pub trait TypeRule: Send + Sync {
    fn apply(&self, value: &Value, modifiers: &Modifiers<'_>) -> Option<String>;
}

impl<F> TypeRule for F
where
    F: Fn(&Value, &Modifiers<'_>) -> Option<String> + Send + Sync,
{
    fn apply(&self, value: &Value, modifiers: &Modifiers<'_>) -> Option<String> {
        self(value, modifiers)
    }
}

/// Custom text modifier, applied to string values of text types.
pub trait ModifierRule: Send + Sync {
    fn apply(&self, value: &str) -> String;
}

impl<F> ModifierRule for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn apply(&self, value: &str) -> String {
        self(value)
    }
}

/// Custom type and modifier rules, keyed by name. Later registrations replace earlier ones.
#[derive(Clone, Default)]
pub struct Registry {
    types: HashMap<String, Arc<dyn TypeRule>>,
    modifiers: HashMap<String, Arc<dyn ModifierRule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type<R>(&mut self, name: impl Into<String>, rule: R)
    where
        R: TypeRule + 'static,
    {
        self.types.insert(name.into(), Arc::new(rule));
    }

    pub fn register_modifier<R>(&mut self, name: impl Into<String>, rule: R)
    where
        R: ModifierRule + 'static,
    {
        self.modifiers.insert(name.into(), Arc::new(rule));
    }

    pub fn custom_type(&self, name: &str) -> Option<&dyn TypeRule> {
        self.types.get(name).map(|rule| rule.as_ref())
    }

    pub fn custom_modifier(&self, name: &str) -> Option<&dyn ModifierRule> {
        self.modifiers.get(name).map(|rule| rule.as_ref())
    }

    /// True when `name` is present and not shadowed by a custom modifier.
    pub fn builtin_modifier(&self, modifiers: &Modifiers<'_>, name: &str) -> bool {
        modifiers.has(name) && !self.modifiers.contains_key(name)
    }

    pub fn builtin_modifier_any(&self, modifiers: &Modifiers<'_>, names: &[&str]) -> bool {
        names.iter().any(|name| self.builtin_modifier(modifiers, name))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.types.keys().collect();
        let mut modifiers: Vec<_> = self.modifiers.keys().collect();
        types.sort();
        modifiers.sort();
        f.debug_struct("Registry")
            .field("types", &types)
            .field("modifiers", &modifiers)
            .finish()
    }
}
